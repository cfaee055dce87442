use std::cell::RefCell;
use std::rc::Rc;

/// The output sink for help documents, error text, and completion lines.
///
/// The default implementation writes to the standard streams; swap in an
/// [`InMemoryInterface`] to capture output in tests.
pub trait UserInterface {
    /// Write a line of regular output.
    fn print(&self, message: String);

    /// Write a line of error output.
    fn print_error(&self, message: String);
}

/// Writes regular output to stdout and errors to stderr.
pub struct ConsoleInterface;

impl UserInterface for ConsoleInterface {
    fn print(&self, message: String) {
        println!("{message}");
    }

    fn print_error(&self, message: String) {
        eprintln!("{message}");
    }
}

/// Captures output in memory; the cloned handle observes everything the
/// application wrote.
#[derive(Default, Clone)]
pub struct InMemoryInterface {
    messages: Rc<RefCell<Vec<String>>>,
    errors: Rc<RefCell<Vec<String>>>,
}

impl InMemoryInterface {
    /// Create an empty capture.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything printed so far, joined by newlines.
    pub fn consume(&self) -> String {
        self.messages.borrow().join("\n")
    }

    /// Every error printed so far, joined by newlines.
    pub fn consume_errors(&self) -> String {
        self.errors.borrow().join("\n")
    }
}

impl UserInterface for InMemoryInterface {
    fn print(&self, message: String) {
        self.messages.borrow_mut().push(message);
    }

    fn print_error(&self, message: String) {
        self.errors.borrow_mut().push(message);
    }
}
