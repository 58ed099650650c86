//! UI-facing synchronization.
//!
//! Rendering itself belongs to the host; this module only decides what the
//! indicator, logo and stylesheet should show.

pub mod sync;
