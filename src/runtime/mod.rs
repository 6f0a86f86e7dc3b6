//! GPU runtime probe
//!
//! Loads a vendor compute runtime by path at run time, resolves its entry
//! points and exposes a small query surface over it.

pub mod ffi;
pub mod handle;
pub mod loader;
pub mod query;
pub mod traits;

#[cfg(test)]
pub(crate) mod stubs;

pub use handle::{HandleStatus, InitResult, RuntimeHandle};
pub use loader::{CudartApi, DynamicLibrary};
pub use traits::GpuRuntime;
