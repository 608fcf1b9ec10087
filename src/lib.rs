//! # bailout
//!
//! Process-wide fatal-error reporting and orderly shutdown.
//!
//! Every subsystem in a host program reports unrecoverable conditions
//! through this crate. A report is one diagnostic line on the configured
//! conversation sink; a fatal report additionally runs every registered
//! cleanup action (last registered first, each exactly once) and then
//! terminates the process with a failure status, so in-progress resources
//! such as lock files, open log streams, or secure memory are released
//! even on the fatal path.
//!
//! ## Components
//! - [`Reporter`] / [`ReportSink`] — diagnostic formatting and emission.
//! - [`CleanupRegistry`] — identity-keyed, ordered cleanup actions.
//! - [`FatalHandler`] — single-owner composition of both plus the
//!   termination hook, for embedders that thread their own context.
//! - Crate-root free functions and the [`warn!`], [`warn_code!`],
//!   [`fatal!`], [`fatal_code!`] macros — the process-wide instance most
//!   programs use.
//!
//! ## Example
//! ```
//! use bailout::cleanup_fn;
//!
//! bailout::init("mytool");
//!
//! let release_lock = cleanup_fn(|| {
//!     // remove the lock file
//! });
//! bailout::register_cleanup(&release_lock).unwrap();
//!
//! // Reports and returns; the process keeps running.
//! bailout::warn!("lock contended, retrying");
//!
//! // A fatal report would run `release_lock` and exit:
//! // bailout::fatal_code!(libc::EIO, "cannot read {}", path);
//!
//! bailout::deregister_cleanup(&release_lock).unwrap();
//! ```
//!
//! ## Re-entrancy
//! The fatal path never holds the process-wide lock while a cleanup
//! action runs. An action may register or deregister other actions, or
//! trigger a nested fatal report; because every action is removed from
//! the registry before it is invoked, no action ever runs twice.
//!
//! Calls are otherwise expected to come from one logical thread of
//! control at a time; the crate adds no ordering between concurrent
//! reporters beyond the mutex on the process-wide handler.

mod cleanup;
mod error;
mod handler;
mod report;
pub mod testing;

pub use cleanup::{cleanup_fn, CleanupFn, CleanupRegistry};
pub use error::{RegistryError, Result};
pub use handler::{FatalHandler, ProcessExit, Terminate, EXIT_FAILURE};
pub use report::{
    error_text, Channel, Diagnostic, ReportSink, Reporter, StderrSink, WriterSink,
};

use std::fmt;
use std::path::Path;
use std::sync::Mutex;

use once_cell::sync::Lazy;

/// The process-wide handler. Alive for the life of the process, lazily
/// populated, never torn down on the success path.
static HANDLER: Lazy<Mutex<FatalHandler>> =
    Lazy::new(|| Mutex::new(FatalHandler::new(default_progname())));

fn default_progname() -> String {
    std::env::args()
        .next()
        .and_then(|arg0| {
            Path::new(&arg0)
                .file_name()
                .and_then(|name| name.to_str())
                .map(str::to_owned)
        })
        .unwrap_or_else(|| "unknown".to_string())
}

/// Set the display name used in diagnostics.
///
/// Call once at startup; the default is derived from `argv[0]`.
pub fn init(progname: impl Into<String>) {
    HANDLER.lock().unwrap().set_progname(progname);
}

/// Replace the process-wide handler (custom sink or termination hook).
pub fn install(handler: FatalHandler) {
    *HANDLER.lock().unwrap() = handler;
}

/// Register a cleanup action with the process-wide handler.
pub fn register_cleanup(action: &CleanupFn) -> Result<()> {
    HANDLER.lock().unwrap().register(action)
}

/// Deregister a cleanup action without invoking it.
pub fn deregister_cleanup(action: &CleanupFn) -> Result<()> {
    HANDLER.lock().unwrap().deregister(action)
}

/// Emit one warning line. Prefer the [`warn!`] macro.
pub fn warn_args(msg: Option<fmt::Arguments<'_>>) {
    HANDLER.lock().unwrap().warn(msg);
}

/// Emit one warning line with OS error text. Prefer [`warn_code!`].
pub fn warn_code_args(code: i32, msg: Option<fmt::Arguments<'_>>) {
    HANDLER.lock().unwrap().warn_code(code, msg);
}

/// Fatal report through the process-wide handler. Prefer [`fatal!`].
pub fn fatal_args(msg: Option<fmt::Arguments<'_>>) -> ! {
    fatal_impl(None, msg)
}

/// Fatal report with OS error text. Prefer [`fatal_code!`].
pub fn fatal_code_args(code: i32, msg: Option<fmt::Arguments<'_>>) -> ! {
    fatal_impl(Some(code), msg)
}

fn fatal_impl(code: Option<i32>, msg: Option<fmt::Arguments<'_>>) -> ! {
    let exit = {
        let mut handler = HANDLER.lock().unwrap();
        handler.report(code, msg);
        handler.exit_hook()
    };
    // The lock is released around every invocation: an action may
    // re-enter register/deregister or trigger a nested fatal report. A
    // nested report finds only the actions this loop has not yet taken.
    loop {
        let next = HANDLER.lock().unwrap().take_next();
        match next {
            Some(action) => action(),
            None => break,
        }
    }
    exit.terminate(EXIT_FAILURE)
}
