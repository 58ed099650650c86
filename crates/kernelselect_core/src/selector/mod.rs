//! Kernel selection and switching.
//!
//! # Responsibility
//! - Tie the kernelspec registry, the session and the UI together.
//!
//! # See also
//! - `events` for the event kinds the selector publishes and consumes.

pub mod coordinator;
