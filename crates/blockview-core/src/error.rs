use crate::Address;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ViewError {
    /// Requested data is absent from the knowledge base or the current scene.
    /// Callers degrade to "display nothing".
    #[error("No {what} found at {addr}")]
    LookupFailure { what: &'static str, addr: Address },

    /// Caller and engine disagree about what is displayed.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}

impl ViewError {
    pub fn lookup(what: &'static str, addr: Address) -> Self {
        ViewError::LookupFailure { what, addr }
    }
}

/// Surface a contract violation: logged at error level, fatal in debug builds.
pub fn report_invariant_violation(message: impl Into<String>) -> ViewError {
    let message = message.into();
    tracing::error!("{}", message);
    debug_assert!(false, "{}", message);
    ViewError::InvariantViolation(message)
}
