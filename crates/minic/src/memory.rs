//! Program memory: a global frame plus a stack of call frames, each a chain
//! of lexical scopes.
//!
//! Name resolution walks the current frame's scopes innermost-out and then
//! falls through to the global frame, which models the "bottom scope anchored
//! to the global scope" chain. Declarations always bind in the current scope;
//! assignments update the nearest enclosing scope that already binds the name
//! and never create bindings.
//!
//! All state here is plain data with serde derives, so a snapshot is an
//! ordinary deep copy that can be handed to another thread.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::value::Value;

/// A lexical name-to-value map. The parent relationship is positional: a
/// scope's parent is the one below it in its frame, and the bottom scope of
/// every frame chains to the global frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scope {
    pub(crate) scope_name: String,
    values: IndexMap<String, Value>,
}

impl Scope {
    fn new(scope_name: String) -> Self {
        Self {
            scope_name,
            values: IndexMap::new(),
        }
    }

    fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    fn insert(&mut self, key: String, value: Value) {
        self.values.insert(key, value);
    }

    /// Names bound directly in this scope, in declaration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.scope_name
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.scope_name)?;
        for (key, value) in &self.values {
            writeln!(f, "{key}:{value}")?;
        }
        Ok(())
    }
}

/// A per-call record holding a stack of scopes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub(crate) frame_name: String,
    scopes: Vec<Scope>,
}

impl Frame {
    fn new(frame_name: &str) -> Self {
        Self {
            frame_name: frame_name.to_owned(),
            scopes: vec![Scope::new(format!("{frame_name}.scope_00"))],
        }
    }

    fn new_scope(&mut self) {
        let name = format!("{}.scope_{:02}", self.frame_name, self.scopes.len());
        self.scopes.push(Scope::new(name));
    }

    fn del_scope(&mut self) {
        debug_assert!(self.scopes.len() > 1, "cannot pop a frame's root scope");
        self.scopes.pop();
    }

    fn current_scope_mut(&mut self) -> &mut Scope {
        self.scopes.last_mut().expect("frame always has a root scope")
    }

    /// The scopes of this frame, innermost last.
    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.frame_name
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Frame: {}", self.frame_name)?;
        writeln!(f, "{}", "*".repeat(40))?;
        for scope in &self.scopes {
            write!(f, "{scope}")?;
            writeln!(f, "{}", "-".repeat(40))?;
        }
        Ok(())
    }
}

/// The interpreter's memory: one global frame for the life of the program
/// plus the call stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    global_frame: Frame,
    stack: Vec<Frame>,
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl Memory {
    #[must_use]
    pub fn new() -> Self {
        Self {
            global_frame: Frame::new("GLOBAL_MEMORY"),
            stack: vec![],
        }
    }

    fn current_frame_mut(&mut self) -> &mut Frame {
        self.stack.last_mut().unwrap_or(&mut self.global_frame)
    }

    /// Binds `key` in the current scope. The analyzer has already proven
    /// uniqueness, so collisions simply overwrite.
    pub fn declare(&mut self, key: impl Into<String>, value: Value) {
        self.current_frame_mut().current_scope_mut().insert(key.into(), value);
    }

    /// Iterates scopes from the innermost of the current frame out to the
    /// global frame's root.
    fn lookup_chain(&self) -> impl Iterator<Item = &Scope> {
        let frame_scopes = self.stack.last().map(|f| f.scopes.as_slice()).unwrap_or_default();
        frame_scopes.iter().rev().chain(self.global_frame.scopes.iter().rev())
    }

    /// Resolves a name through the scope chain.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.lookup_chain().find_map(|scope| scope.get(key))
    }

    /// Resolves `container` and walks `path` through its fields.
    #[must_use]
    pub fn get_field(&self, container: &str, path: &[String]) -> Option<&Value> {
        match self.get(container)? {
            Value::Record(record) => record.get_path(path),
            _ => None,
        }
    }

    /// Writes `value` through the scope chain: the nearest enclosing scope
    /// that already binds the name is updated in place. If `key` contains a
    /// dot it is split once; the left part names a struct binding and the
    /// remainder a field path within it.
    ///
    /// Returns false when no defining scope binds the name (or the field path
    /// is invalid), which is a runtime error at the caller.
    #[must_use]
    pub fn set(&mut self, key: &str, value: Value) -> bool {
        match key.split_once('.') {
            Some((container, field)) => {
                let path: Vec<String> = field.split('.').map(str::to_owned).collect();
                self.set_field(container, &path, value)
            }
            None => self.set_plain(key, value),
        }
    }

    fn set_plain(&mut self, key: &str, value: Value) -> bool {
        let frame_scopes = self
            .stack
            .last_mut()
            .map(|f| f.scopes.as_mut_slice())
            .unwrap_or_default();
        for scope in frame_scopes.iter_mut().rev().chain(self.global_frame.scopes.iter_mut().rev()) {
            if scope.contains(key) {
                scope.insert(key.to_owned(), value);
                return true;
            }
        }
        false
    }

    /// Writes a struct field through the scope chain.
    #[must_use]
    pub fn set_field(&mut self, container: &str, path: &[String], value: Value) -> bool {
        let frame_scopes = self
            .stack
            .last_mut()
            .map(|f| f.scopes.as_mut_slice())
            .unwrap_or_default();
        for scope in frame_scopes.iter_mut().rev().chain(self.global_frame.scopes.iter_mut().rev()) {
            if scope.contains(container) {
                return match scope.values.get_mut(container) {
                    Some(Value::Record(record)) => record.set_path(path, value),
                    _ => false,
                };
            }
        }
        false
    }

    /// Pushes a call frame whose root scope chains to the global scope.
    pub fn new_frame(&mut self, frame_name: &str) {
        self.stack.push(Frame::new(frame_name));
    }

    pub fn del_frame(&mut self) {
        debug_assert!(!self.stack.is_empty(), "no call frame to pop");
        self.stack.pop();
    }

    pub fn new_scope(&mut self) {
        self.current_frame_mut().new_scope();
    }

    pub fn del_scope(&mut self) {
        self.current_frame_mut().del_scope();
    }

    /// Current call-stack depth (excluding the global frame).
    #[must_use]
    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    /// The global frame.
    #[must_use]
    pub fn global_frame(&self) -> &Frame {
        &self.global_frame
    }

    /// Frames of the call stack, outermost first.
    #[must_use]
    pub fn frames(&self) -> &[Frame] {
        &self.stack
    }

    /// All names visible from the current scope, innermost first.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.lookup_chain().flat_map(Scope::keys)
    }

    /// Returns a structurally independent copy of the whole memory.
    ///
    /// Every binding is duplicated; mutating the original afterwards cannot
    /// be observed through the snapshot. This is what crosses the thread
    /// boundary to a breakpoint controller.
    #[must_use]
    pub fn snapshot(&self) -> Self {
        self.clone()
    }
}

impl fmt::Display for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.global_frame)?;
        writeln!(f, "Stack")?;
        writeln!(f, "{}", "=".repeat(40))?;
        for frame in &self.stack {
            write!(f, "{frame}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::number::Number;

    fn num(value: u32) -> Value {
        Value::Num(Number::new(value))
    }

    #[test]
    fn declarations_bind_in_current_scope_until_popped() {
        let mut memory = Memory::new();
        memory.new_frame("f");
        memory.declare("a", num(1));
        memory.new_scope();
        memory.declare("b", num(2));
        assert_eq!(memory.get("b"), Some(&num(2)));
        memory.del_scope();
        assert_eq!(memory.get("b"), None);
        assert_eq!(memory.get("a"), Some(&num(1)));
    }

    #[test]
    fn assignment_updates_the_defining_scope() {
        let mut memory = Memory::new();
        memory.new_frame("f");
        memory.declare("a", num(1));
        memory.new_scope();
        assert!(memory.set("a", num(9)));
        memory.del_scope();
        assert_eq!(memory.get("a"), Some(&num(9)));
    }

    #[test]
    fn assignment_never_creates_bindings() {
        let mut memory = Memory::new();
        memory.new_frame("f");
        assert!(!memory.set("ghost", num(1)));
        assert_eq!(memory.get("ghost"), None);
    }

    #[test]
    fn shadowing_resolves_to_the_innermost_binding() {
        let mut memory = Memory::new();
        memory.declare("a", num(1));
        memory.new_frame("f");
        memory.declare("a", num(2));
        memory.new_scope();
        memory.declare("a", num(3));
        assert_eq!(memory.get("a"), Some(&num(3)));
        memory.del_scope();
        assert_eq!(memory.get("a"), Some(&num(2)));
        memory.del_frame();
        assert_eq!(memory.get("a"), Some(&num(1)));
    }

    #[test]
    fn frames_fall_through_to_globals_not_caller_locals() {
        let mut memory = Memory::new();
        memory.declare("g", num(7));
        memory.new_frame("caller");
        memory.declare("local", num(1));
        memory.new_frame("callee");
        assert_eq!(memory.get("g"), Some(&num(7)));
        assert_eq!(memory.get("local"), None);
    }

    #[test]
    fn dotted_set_writes_a_struct_field() {
        let mut memory = Memory::new();
        let mut record = crate::value::StructRecord::default();
        record.insert("x", num(0));
        memory.declare("p", Value::Record(record));
        assert!(memory.set("p.x", num(3)));
        assert_eq!(
            memory.get_field("p", &["x".to_owned()]),
            Some(&num(3))
        );
    }

    #[test]
    fn snapshot_is_structurally_independent() {
        let mut memory = Memory::new();
        memory.declare("a", num(1));
        let snapshot = memory.snapshot();
        assert!(memory.set("a", num(2)));
        assert_eq!(snapshot.get("a"), Some(&num(1)));
        assert_eq!(memory.get("a"), Some(&num(2)));
    }
}
