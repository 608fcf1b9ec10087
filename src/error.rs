//! Registry error taxonomy.

use thiserror::Error;

/// Errors returned by cleanup registration and deregistration.
///
/// None of these terminate the process. Escalating one of them to a fatal
/// report is always the caller's decision.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    /// The action is already registered (identity match).
    #[error("cleanup action already registered")]
    Duplicate,

    /// The action is not currently registered.
    #[error("cleanup action not registered")]
    NotFound,

    /// The registry could not reserve storage for a new entry.
    #[error("cleanup registry allocation failed")]
    Alloc,
}

pub type Result<T> = std::result::Result<T, RegistryError>;
