//! Destination for user-visible text.
//!
//! Status confirmations, `show`/`debug`/`profile` reports and loop-guard
//! notices all go through a [`PrintHandler`]. Embedders pick stdout,
//! tests capture into a buffer, and benchmarks silence output entirely.

use std::sync::Arc;

use parking_lot::Mutex;

/// Output sink, dispatched by enum rather than trait object.
pub enum PrintHandler {
    Stdout,
    /// Captures every line; parallel-loop workers append concurrently.
    Buffer(Mutex<String>),
    Silent,
}

impl PrintHandler {
    /// Emit `msg` followed by a newline.
    pub fn println(&self, msg: &str) {
        match self {
            Self::Stdout => println!("{msg}"),
            Self::Buffer(buf) => {
                let mut buf = buf.lock();
                buf.push_str(msg);
                buf.push('\n');
            }
            Self::Silent => {}
        }
    }

    /// Captured text; empty for handlers that don't capture.
    pub fn get_output(&self) -> String {
        match self {
            Self::Buffer(buf) => buf.lock().clone(),
            Self::Stdout | Self::Silent => String::new(),
        }
    }

    /// Captured text split into lines.
    pub fn lines(&self) -> Vec<String> {
        self.get_output().lines().map(str::to_owned).collect()
    }

    /// Discard captured text; no-op for stdout.
    pub fn clear(&self) {
        if let Self::Buffer(buf) = self {
            buf.lock().clear();
        }
    }

    /// Whether output goes to a buffer rather than stdout.
    pub fn is_capturing(&self) -> bool {
        matches!(self, Self::Buffer(_))
    }
}

pub type SharedPrintHandler = Arc<PrintHandler>;

/// Handler writing to standard output.
pub fn stdout_handler() -> SharedPrintHandler {
    Arc::new(PrintHandler::Stdout)
}

/// Handler capturing output for [`PrintHandler::get_output`].
pub fn buffer_handler() -> SharedPrintHandler {
    Arc::new(PrintHandler::Buffer(Mutex::new(String::new())))
}

/// Handler discarding everything.
pub fn silent_handler() -> SharedPrintHandler {
    Arc::new(PrintHandler::Silent)
}
