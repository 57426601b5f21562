//! Runtime Adapters
//!
//! Execution context managers for concrete managed runtimes. Each adapter
//! implements `ExecutionContextManager` and performs the marshalling its
//! runtime's calling convention needs.

#[cfg(feature = "coreclr")]
pub mod coreclr;

#[cfg(feature = "coreclr")]
pub use coreclr::CoreClrContexts;
