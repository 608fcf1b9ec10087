//! Test doubles for the emission sink and the termination hook.
//!
//! `RecordingExit` unwinds instead of exiting, so a test can run the
//! complete fatal sequence under `std::panic::catch_unwind` and then
//! assert on what was emitted and drained.
//!
//! # Usage
//!
//! ```
//! use std::panic::{self, AssertUnwindSafe};
//! use std::sync::Arc;
//! use bailout::testing::{CaptureSink, RecordingExit};
//! use bailout::FatalHandler;
//!
//! let sink = CaptureSink::new();
//! let lines = sink.lines();
//! let exit = RecordingExit::new();
//! let statuses = exit.statuses();
//!
//! let mut handler = FatalHandler::new("toolx")
//!     .with_sink(Box::new(sink))
//!     .with_exit(Arc::new(exit));
//!
//! let _ = panic::catch_unwind(AssertUnwindSafe(|| {
//!     handler.fatal(Some(format_args!("boom")));
//! }));
//!
//! assert_eq!(lines.lock().unwrap()[0].1, "toolx: boom\n");
//! assert_eq!(*statuses.lock().unwrap(), vec![1]);
//! ```

use std::panic;
use std::sync::{Arc, Mutex};

use crate::handler::Terminate;
use crate::report::{Channel, ReportSink};

/// Sink that records every emitted line.
#[derive(Default)]
pub struct CaptureSink {
    lines: Arc<Mutex<Vec<(Channel, String)>>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle to the recorded lines. Take one before moving the
    /// sink into a reporter or handler.
    pub fn lines(&self) -> Arc<Mutex<Vec<(Channel, String)>>> {
        Arc::clone(&self.lines)
    }
}

impl ReportSink for CaptureSink {
    fn emit_line(&mut self, channel: Channel, line: &str) {
        self.lines.lock().unwrap().push((channel, line.to_string()));
    }
}

/// Termination hook that records the exit status and unwinds.
///
/// Uses `resume_unwind` so the panic hook stays quiet; the payload is the
/// recorded status.
#[derive(Default)]
pub struct RecordingExit {
    statuses: Arc<Mutex<Vec<i32>>>,
}

impl RecordingExit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle to the statuses passed to `terminate`.
    pub fn statuses(&self) -> Arc<Mutex<Vec<i32>>> {
        Arc::clone(&self.statuses)
    }
}

impl Terminate for RecordingExit {
    fn terminate(&self, status: i32) -> ! {
        self.statuses.lock().unwrap().push(status);
        panic::resume_unwind(Box::new(status))
    }
}
