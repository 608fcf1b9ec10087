//! # Fatal flow
//!
//! Composes the reporter, the cleanup registry, and process termination
//! into the single-owner [`FatalHandler`]. Most programs use the
//! process-wide instance through the crate-root macros; embedders that
//! thread their own context (and tests) own a handler directly.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::cleanup::{CleanupFn, CleanupRegistry};
use crate::error::Result;
use crate::report::{ReportSink, Reporter};

/// Failure status passed to [`Terminate::terminate`] on the fatal path.
pub const EXIT_FAILURE: i32 = 1;

/// Process termination. The never type makes code after a fatal call
/// provably unreachable.
pub trait Terminate: Send + Sync {
    fn terminate(&self, status: i32) -> !;
}

/// Real termination via `std::process::exit`.
#[derive(Debug, Default)]
pub struct ProcessExit;

impl Terminate for ProcessExit {
    fn terminate(&self, status: i32) -> ! {
        std::process::exit(status)
    }
}

/// Fatal-error handler: reporter, cleanup registry, and exit hook.
///
/// Assumes one logical thread of control per call; the handler itself
/// holds no lock. The crate-root layer wraps one instance in a mutex for
/// process-wide use.
pub struct FatalHandler {
    reporter: Reporter,
    cleanups: CleanupRegistry,
    exit: Arc<dyn Terminate>,
}

impl FatalHandler {
    /// Handler reporting to the standard streams and terminating via
    /// `std::process::exit`.
    pub fn new(progname: impl Into<String>) -> Self {
        Self {
            reporter: Reporter::new(progname),
            cleanups: CleanupRegistry::new(),
            exit: Arc::new(ProcessExit),
        }
    }

    /// Replace the emission sink.
    pub fn with_sink(mut self, sink: Box<dyn ReportSink>) -> Self {
        self.reporter.set_sink(sink);
        self
    }

    /// Replace the termination hook.
    pub fn with_exit(mut self, exit: Arc<dyn Terminate>) -> Self {
        self.exit = exit;
        self
    }

    pub fn progname(&self) -> &str {
        self.reporter.progname()
    }

    pub fn set_progname(&mut self, progname: impl Into<String>) {
        self.reporter.set_progname(progname);
    }

    /// Register a cleanup action to run on the fatal path.
    pub fn register(&mut self, action: &CleanupFn) -> Result<()> {
        self.cleanups.register(action)
    }

    /// Remove a registered cleanup action without invoking it.
    pub fn deregister(&mut self, action: &CleanupFn) -> Result<()> {
        self.cleanups.deregister(action)
    }

    /// Number of cleanup actions currently pending.
    pub fn pending_cleanups(&self) -> usize {
        self.cleanups.len()
    }

    /// Emit one diagnostic line and return to the caller.
    pub fn warn(&mut self, msg: Option<fmt::Arguments<'_>>) {
        self.reporter.report(None, msg);
    }

    /// Emit one diagnostic line including the OS error text for `code`.
    pub fn warn_code(&mut self, code: i32, msg: Option<fmt::Arguments<'_>>) {
        self.reporter.report(Some(code), msg);
    }

    /// Emit, drain every pending cleanup action, terminate.
    pub fn fatal(&mut self, msg: Option<fmt::Arguments<'_>>) -> ! {
        self.fatal_report(None, msg)
    }

    /// Like [`FatalHandler::fatal`], with the OS error text for `code`
    /// appended to the diagnostic.
    pub fn fatal_code(&mut self, code: i32, msg: Option<fmt::Arguments<'_>>) -> ! {
        self.fatal_report(Some(code), msg)
    }

    fn fatal_report(&mut self, code: Option<i32>, msg: Option<fmt::Arguments<'_>>) -> ! {
        self.reporter.report(code, msg);
        debug!(
            pending = self.cleanups.len(),
            "fatal report, draining cleanup actions"
        );
        self.cleanups.drain_and_run();
        self.exit.terminate(EXIT_FAILURE)
    }

    // The process-wide layer drives the fatal sequence itself so it can
    // release its lock around every action and around the exit hook.
    pub(crate) fn report(&mut self, code: Option<i32>, msg: Option<fmt::Arguments<'_>>) {
        self.reporter.report(code, msg);
    }

    pub(crate) fn take_next(&mut self) -> Option<CleanupFn> {
        self.cleanups.take_next()
    }

    pub(crate) fn exit_hook(&self) -> Arc<dyn Terminate> {
        Arc::clone(&self.exit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleanup::cleanup_fn;
    use crate::testing::{CaptureSink, RecordingExit};
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::Mutex;

    fn test_handler() -> (
        FatalHandler,
        Arc<Mutex<Vec<(crate::Channel, String)>>>,
        Arc<Mutex<Vec<i32>>>,
    ) {
        let sink = CaptureSink::new();
        let lines = sink.lines();
        let exit = RecordingExit::new();
        let statuses = exit.statuses();
        let handler = FatalHandler::new("toolx")
            .with_sink(Box::new(sink))
            .with_exit(Arc::new(exit));
        (handler, lines, statuses)
    }

    #[test]
    fn test_warn_does_not_touch_registry() {
        let (mut handler, lines, statuses) = test_handler();
        let a = cleanup_fn(|| {});
        handler.register(&a).unwrap();

        handler.warn(Some(format_args!("disk full")));

        assert_eq!(handler.pending_cleanups(), 1);
        assert_eq!(lines.lock().unwrap().len(), 1);
        assert_eq!(lines.lock().unwrap()[0].1, "toolx: disk full\n");
        assert!(statuses.lock().unwrap().is_empty());
    }

    #[test]
    fn test_fatal_emits_drains_then_terminates() {
        let (mut handler, lines, statuses) = test_handler();
        let log = Arc::new(Mutex::new(Vec::new()));
        let x = {
            let log = Arc::clone(&log);
            cleanup_fn(move || log.lock().unwrap().push("x"))
        };
        let y = {
            let log = Arc::clone(&log);
            cleanup_fn(move || log.lock().unwrap().push("y"))
        };
        handler.register(&x).unwrap();
        handler.register(&y).unwrap();

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            handler.fatal(Some(format_args!("giving up")));
        }));
        assert!(result.is_err());

        // One line, both actions in reverse order, one failure status.
        assert_eq!(lines.lock().unwrap().len(), 1);
        assert_eq!(lines.lock().unwrap()[0].1, "toolx: giving up\n");
        assert_eq!(*log.lock().unwrap(), vec!["y", "x"]);
        assert_eq!(*statuses.lock().unwrap(), vec![EXIT_FAILURE]);
        assert_eq!(handler.pending_cleanups(), 0);
    }

    #[test]
    fn test_fatal_code_appends_error_text() {
        let (mut handler, lines, _statuses) = test_handler();

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            handler.fatal_code(2, Some(format_args!("open failed")));
        }));
        assert!(result.is_err());

        assert_eq!(
            lines.lock().unwrap()[0].1,
            "toolx: open failed: No such file or directory\n"
        );
    }

    #[test]
    fn test_deregistered_action_skipped_on_fatal() {
        let (mut handler, _lines, _statuses) = test_handler();
        let log = Arc::new(Mutex::new(Vec::new()));
        let keep = {
            let log = Arc::clone(&log);
            cleanup_fn(move || log.lock().unwrap().push("keep"))
        };
        let drop_me = {
            let log = Arc::clone(&log);
            cleanup_fn(move || log.lock().unwrap().push("dropped"))
        };
        handler.register(&keep).unwrap();
        handler.register(&drop_me).unwrap();
        handler.deregister(&drop_me).unwrap();

        let _ = panic::catch_unwind(AssertUnwindSafe(|| {
            handler.fatal(None);
        }));

        assert_eq!(*log.lock().unwrap(), vec!["keep"]);
    }
}
