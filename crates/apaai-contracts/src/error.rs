//! Error taxonomy for the APAAI client.
//!
//! Every fallible client operation returns `ApaaiResult<T>`. Local input
//! problems surface as `Validation` before anything is sent; remote failures
//! surface as `Transport` with the remote status preserved when there is one.

use thiserror::Error;

/// The unified error type for the APAAI client crates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApaaiError {
    /// Caller-supplied input could not be normalized into a wire shape.
    ///
    /// Raised before any network call is attempted.
    #[error("validation error: {reason}")]
    Validation { reason: String },

    /// The remote call failed, returned a non-success status, or returned a
    /// body that does not match the expected shape.
    ///
    /// `status` is the remote HTTP status when the server answered at all,
    /// and `None` for connectivity failures.
    #[error("transport error{}: {}", fmt_status(.status), .reason)]
    Transport { status: Option<u16>, reason: String },

    /// A client configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    Config { reason: String },
}

fn fmt_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (status {code})"),
        None => String::new(),
    }
}

impl ApaaiError {
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation { reason: reason.into() }
    }

    pub fn transport(status: Option<u16>, reason: impl Into<String>) -> Self {
        Self::Transport { status, reason: reason.into() }
    }

    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config { reason: reason.into() }
    }

    /// The remote status carried by a `Transport` error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => *status,
            _ => None,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

/// Convenience alias used throughout the APAAI crates.
pub type ApaaiResult<T> = Result<T, ApaaiError>;
