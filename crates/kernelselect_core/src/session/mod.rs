//! Session collaborator contract.
//!
//! The session owns the live connection between a document and its kernel.
//! This crate only asks it to start a kernel and discriminates on one error
//! kind.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Session start errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// A previous start request is still pending. Expected and recoverable.
    AlreadyStarting,
    /// Any other failure reported by the session layer.
    Failed(String),
}

impl SessionError {
    pub fn is_already_starting(&self) -> bool {
        matches!(self, Self::AlreadyStarting)
    }
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyStarting => write!(f, "session is already starting"),
            Self::Failed(message) => write!(f, "session start failed: {message}"),
        }
    }
}

impl Error for SessionError {}

/// Live document session.
pub trait SessionClient: Send + Sync {
    /// Starts (or restarts) the session with the named kernel.
    ///
    /// Implementations may publish `KernelEvent::KernelCreated` before
    /// returning or at any later point.
    fn start_session(&self, kernel_name: &str) -> Result<(), SessionError>;
}
