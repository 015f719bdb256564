//! Output channel for instructions that print.

use std::cell::RefCell;
use std::rc::Rc;

/// Where a machine writes its textual output.
pub trait Sink {
    fn write_str(&mut self, text: &str);
}

/// Writes to the process's standard output.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl Sink for StdoutSink {
    fn write_str(&mut self, text: &str) {
        print!("{text}");
    }
}

/// Collects output in memory. Clones share the same buffer, so a test can
/// keep one handle and give the other to the machine.
#[derive(Debug, Default, Clone)]
pub struct BufferSink {
    buffer: Rc<RefCell<String>>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        self.buffer.borrow().clone()
    }

    pub fn lines(&self) -> Vec<String> {
        self.buffer.borrow().lines().map(str::to_string).collect()
    }
}

impl Sink for BufferSink {
    fn write_str(&mut self, text: &str) {
        self.buffer.borrow_mut().push_str(text);
    }
}
