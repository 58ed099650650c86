//! Kernel specification catalog.
//!
//! # Responsibility
//! - Model catalog entries returned by the kernelspec endpoint.
//! - Fetch, decode and cache them in display order.
//!
//! # See also
//! - `selector::coordinator` for how lookups gate kernel switches.

pub mod catalog;
pub mod model;
pub mod registry;
