//! Execution limits.

use serde::{Deserialize, Serialize};

use crate::error::{CodeLoc, Exception, RunResult};

/// Default bound on call-stack depth.
pub const DEFAULT_MAX_STACK_DEPTH: usize = 1000;

/// Limits applied while a program runs.
///
/// The only bounded resource in this interpreter is call-stack depth; every
/// call frame checks it before being pushed so runaway recursion fails with a
/// diagnostic instead of exhausting the host stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    pub max_stack_depth: usize,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_stack_depth: DEFAULT_MAX_STACK_DEPTH,
        }
    }
}

impl ResourceLimits {
    pub(crate) fn check_stack_depth(&self, current_depth: usize, position: CodeLoc) -> RunResult<()> {
        if current_depth >= self.max_stack_depth {
            return Err(Exception::runtime(
                format!("Maximum call depth of {} exceeded", self.max_stack_depth),
                position,
            ));
        }
        Ok(())
    }
}
