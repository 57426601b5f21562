//! CLR Host Bridge
//!
//! Hosts resources written for a managed .NET runtime inside the game server
//! process. Each resource owns an isolated execution context, a table of
//! entry points resolved from it and the invokers it registered while running.
//!
//! # Architecture
//!
//! - **ExecutionContextManager**: Trait implemented by managed runtime backends
//! - **EntryPointTable**: Typed callbacks resolved once per resource
//! - **Resource**: Lifecycle controller (construct, start, stop, destroy)
//! - **events**: Translation of host events into entry-point calls
//! - **ResourceManager**: Owns every resource of the host in load order

pub mod adapters;
pub mod config;
pub mod context;
pub mod entry_points;
pub mod error;
pub mod events;
pub mod host;
pub mod invoker;
pub mod manager;
pub mod resource;
pub mod value;

#[cfg(test)]
mod testing;

pub use config::BridgeConfig;
pub use context::{ContextHandle, EntryPointDescriptor, ExecutionContextManager};
pub use entry_points::{EntryPoint, EntryPointTable, ResolvedEntryPoint, Signature, Slot};
pub use error::{BridgeError, CallResult, Result};
pub use events::{Dispatch, EventKind, HostEvent, IgnoredKind};
pub use host::{Entity, EntityKind, HostHandle, ResourceDescriptor};
pub use invoker::{Invoker, InvokerId, InvokerRegistry};
pub use manager::{ResourceManager, SharedResource};
pub use resource::{BridgeEnv, HostResource, Resource, ResourceState};
pub use value::MValue;

/// Runtime type reported in every log line emitted for a resource
pub const RUNTIME_TYPE: &str = "clr";
