//! Per-kernel extension modules.
//!
//! Extensions are optional scripts declared by a kernelspec's `kernel.js`
//! resource. Loading is fire-and-forget and isolated from the switch path.

pub mod loader;
