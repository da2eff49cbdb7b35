//! I/O seams for the built-in library.
//!
//! `printf` output flows through [`PrintWriter`] and `scanf`/`getchar` input
//! through [`InputReader`], so programs are fully testable without a
//! terminal. The default implementations talk to the real stdin/stdout.

use std::io::{self, BufRead, Read, Write as _};

use crate::error::{CodeLoc, Exception, RunResult};

/// Trait for handling output from the `printf` built-in.
///
/// Implement this to capture or redirect program output. The default
/// implementation [`StdPrint`] writes to stdout.
pub trait PrintWriter {
    /// Called with the fully formatted text of one `printf` call.
    fn stdout_write(&mut self, output: &str) -> RunResult<()>;
}

/// Default `PrintWriter` that buffers and writes to stdout.
///
/// Output is buffered and flushed when the writer is dropped, so diagnostics
/// on stderr are not interleaved into partially written lines.
#[derive(Debug, Default)]
pub struct StdPrint {
    buffer: String,
}

impl StdPrint {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PrintWriter for StdPrint {
    fn stdout_write(&mut self, output: &str) -> RunResult<()> {
        self.buffer.push_str(output);
        Ok(())
    }
}

impl Drop for StdPrint {
    fn drop(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let _ = io::stdout().write_all(self.buffer.as_bytes());
        let _ = io::stdout().flush();
        self.buffer.clear();
    }
}

/// A `PrintWriter` that collects all output into a string.
///
/// Useful for testing or capturing program output programmatically.
#[derive(Debug, Default)]
pub struct CollectStringPrint(String);

impl CollectStringPrint {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the collected output so far.
    #[must_use]
    pub fn output(&self) -> &str {
        &self.0
    }

    /// Consumes the writer and returns the collected output.
    #[must_use]
    pub fn into_output(self) -> String {
        self.0
    }
}

impl PrintWriter for CollectStringPrint {
    fn stdout_write(&mut self, output: &str) -> RunResult<()> {
        self.0.push_str(output);
        Ok(())
    }
}

/// `PrintWriter` that ignores all output.
#[derive(Debug, Default)]
pub struct NoPrint;

impl PrintWriter for NoPrint {
    fn stdout_write(&mut self, _output: &str) -> RunResult<()> {
        Ok(())
    }
}

/// Trait supplying input to `scanf` and `getchar`.
pub trait InputReader {
    /// Reads the next whitespace-separated field, or `None` at end of input.
    fn read_field(&mut self) -> RunResult<Option<String>>;

    /// Reads a single byte, or `None` at end of input.
    fn read_char(&mut self) -> RunResult<Option<u8>>;
}

fn input_error(err: &io::Error, position: CodeLoc) -> Exception {
    Exception::runtime(format!("Failed to read input: {err}"), position)
}

/// Default `InputReader` backed by stdin.
#[derive(Debug, Default)]
pub struct StdInput {
    /// Fields read but not yet consumed from the current line.
    pending: Vec<String>,
}

impl StdInput {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl InputReader for StdInput {
    fn read_field(&mut self) -> RunResult<Option<String>> {
        loop {
            if !self.pending.is_empty() {
                return Ok(Some(self.pending.remove(0)));
            }
            let mut line = String::new();
            let read = io::stdin()
                .lock()
                .read_line(&mut line)
                .map_err(|e| input_error(&e, CodeLoc::new(0, 0)))?;
            if read == 0 {
                return Ok(None);
            }
            self.pending.extend(line.split_whitespace().map(str::to_owned));
        }
    }

    fn read_char(&mut self) -> RunResult<Option<u8>> {
        let mut byte = [0u8; 1];
        let read = io::stdin()
            .lock()
            .read(&mut byte)
            .map_err(|e| input_error(&e, CodeLoc::new(0, 0)))?;
        Ok((read == 1).then_some(byte[0]))
    }
}

/// `InputReader` over a fixed string, for tests and embedding.
#[derive(Debug)]
pub struct StrInput {
    data: Vec<u8>,
    cursor: usize,
}

impl StrInput {
    #[must_use]
    pub fn new(data: &str) -> Self {
        Self {
            data: data.as_bytes().to_vec(),
            cursor: 0,
        }
    }
}

impl InputReader for StrInput {
    fn read_field(&mut self) -> RunResult<Option<String>> {
        while self.cursor < self.data.len() && self.data[self.cursor].is_ascii_whitespace() {
            self.cursor += 1;
        }
        if self.cursor >= self.data.len() {
            return Ok(None);
        }
        let start = self.cursor;
        while self.cursor < self.data.len() && !self.data[self.cursor].is_ascii_whitespace() {
            self.cursor += 1;
        }
        Ok(Some(String::from_utf8_lossy(&self.data[start..self.cursor]).into_owned()))
    }

    fn read_char(&mut self) -> RunResult<Option<u8>> {
        if self.cursor >= self.data.len() {
            return Ok(None);
        }
        let byte = self.data[self.cursor];
        self.cursor += 1;
        Ok(Some(byte))
    }
}
