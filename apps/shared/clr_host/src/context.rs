//! Execution Context Manager contract
//!
//! The bridge never talks to the embedded runtime directly. It asks an
//! `ExecutionContextManager` for one isolated context per resource and for the
//! callables exported by that context.

use std::path::Path;

use crate::entry_points::{EntryPoint, ResolvedEntryPoint};

/// Opaque handle of one execution context
///
/// `host` identifies the runtime host instance, `id` the context inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextHandle {
    pub host: usize,
    pub id: u32,
}

impl ContextHandle {
    pub fn new(host: usize, id: u32) -> Self {
        Self { host, id }
    }
}

/// Fully-qualified name of an entry point inside a context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPointDescriptor {
    /// Assembly / namespace holding the wrapper type
    pub namespace: String,
    pub type_name: String,
    pub method_name: &'static str,
    pub entry_point: EntryPoint,
}

impl EntryPointDescriptor {
    pub fn new(namespace: &str, type_name: &str, entry_point: EntryPoint) -> Self {
        Self {
            namespace: namespace.to_string(),
            type_name: type_name.to_string(),
            method_name: entry_point.method_name(),
            entry_point,
        }
    }
}

/// Creates, resolves from and destroys execution contexts
///
/// Implementations are shared between every resource of the host, so all
/// methods take `&self`.
pub trait ExecutionContextManager: Send + Sync {
    /// Create a context rooted at `resource_root`
    ///
    /// Returns `None` when the runtime cannot be located or the root is
    /// invalid; the resource then stays non-functional.
    fn create_context(&self, resource_root: &Path, runtime_library: &Path) -> Option<ContextHandle>;

    /// Resolve one entry point, or `None` when the symbol does not exist
    fn resolve(
        &self,
        handle: &ContextHandle,
        descriptor: &EntryPointDescriptor,
    ) -> Option<ResolvedEntryPoint>;

    /// Release a context created by `create_context`
    fn destroy_context(&self, handle: ContextHandle);
}
