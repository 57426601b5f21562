//! Resource Lifecycle Controller
//!
//! A `Resource` owns one execution context, the entry points resolved from
//! it and the invokers created while it runs.
//!
//! ```text
//! Constructed ──start──▶ Started ──stop──▶ Stopped
//!      │                                     ▲
//!      └──start (main missing)──▶ StartFailed ┘ stop
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::BridgeConfig;
use crate::context::{ContextHandle, ExecutionContextManager};
use crate::entry_points::{EntryPoint, EntryPointTable};
use crate::error::{BridgeError, Result};
use crate::events::{self, Dispatch, HostEvent};
use crate::host::{CurrentDirProvider, HostHandle, HostLog, PathProvider, ResourceDescriptor, TracingLog};
use crate::invoker::InvokerRegistry;
use crate::RUNTIME_TYPE;

/// Message sent to the host log when the working directory is unavailable
pub const WORKING_DIR_UNAVAILABLE: &str = "[.NET] Unable to find the working directory";

/// Lifecycle surface the host drives
pub trait HostResource {
    /// Start the resource; `false` means it did not launch
    fn start(&mut self) -> bool;

    /// Stop the resource; `false` means the stop entry point was unavailable or failed
    fn stop(&mut self) -> bool;

    /// Deliver one event; returns whether the event was handled
    fn on_event(&mut self, event: &HostEvent) -> bool;

    /// Periodic host tick
    fn on_tick(&mut self);
}

/// Everything a resource needs from its host
#[derive(Clone)]
pub struct BridgeEnv {
    pub config: BridgeConfig,
    pub host: HostHandle,
    pub contexts: Arc<dyn ExecutionContextManager>,
    pub paths: Arc<dyn PathProvider>,
    pub log: Arc<dyn HostLog>,
}

impl BridgeEnv {
    /// Environment using the process working directory and a tracing host log
    pub fn new(
        config: BridgeConfig,
        host: HostHandle,
        contexts: Arc<dyn ExecutionContextManager>,
    ) -> Self {
        Self {
            config,
            host,
            contexts,
            paths: Arc::new(CurrentDirProvider),
            log: Arc::new(TracingLog),
        }
    }

    pub fn with_paths(mut self, paths: Arc<dyn PathProvider>) -> Self {
        self.paths = paths;
        self
    }

    pub fn with_log(mut self, log: Arc<dyn HostLog>) -> Self {
        self.log = log;
        self
    }
}

/// Lifecycle state of a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceState {
    Constructed,
    Started,
    /// Start was attempted but the resource did not launch
    StartFailed,
    Stopped,
}

/// Name and filesystem root of a resource
#[derive(Debug, Clone, PartialEq, Eq)]
struct ResourceIdentity {
    name: String,
    /// `None` when the working directory or the name is unusable
    root_path: Option<PathBuf>,
}

pub struct Resource {
    identity: ResourceIdentity,
    main: String,
    host: HostHandle,
    state: ResourceState,
    contexts: Arc<dyn ExecutionContextManager>,
    context: Option<ContextHandle>,
    entry_points: EntryPointTable,
    invokers: InvokerRegistry,
}

impl Resource {
    /// Construct a resource: compute its root, create its context and
    /// resolve every entry point
    ///
    /// Never fails. Environment and runtime problems leave the resource
    /// without a context and with no entry points, so `start` reports failure.
    pub fn new(env: &BridgeEnv, descriptor: &ResourceDescriptor) -> Self {
        let mut resource = Self {
            identity: ResourceIdentity {
                name: descriptor.name.clone(),
                root_path: None,
            },
            main: descriptor.main.clone(),
            host: env.host,
            state: ResourceState::Constructed,
            contexts: Arc::clone(&env.contexts),
            context: None,
            entry_points: EntryPointTable::empty(),
            invokers: InvokerRegistry::new(),
        };

        let working_dir = match env.paths.working_dir() {
            Ok(dir) => dir,
            Err(_) => {
                env.log.log_info(WORKING_DIR_UNAVAILABLE);
                return resource;
            }
        };

        let root = match env.config.resource_root(&working_dir, &descriptor.name) {
            Ok(root) => root,
            Err(e) => {
                env.log.log_info(&format!("[.NET] {}", e));
                return resource;
            }
        };
        resource.identity.root_path = Some(root.clone());

        let Some(handle) = env
            .contexts
            .create_context(&root, &env.config.runtime_library_path)
        else {
            warn!(
                runtime_type = RUNTIME_TYPE,
                resource = %descriptor.name,
                "Failed to create execution context at {}",
                root.display()
            );
            return resource;
        };
        resource.context = Some(handle);

        resource.entry_points = EntryPointTable::resolve(
            env.contexts.as_ref(),
            &handle,
            &env.config.entry_namespace,
            &env.config.entry_type,
        );

        let missing = resource.entry_points.missing();
        if missing.is_empty() {
            debug!(
                runtime_type = RUNTIME_TYPE,
                resource = %descriptor.name,
                "All entry points resolved"
            );
        } else {
            let names: Vec<&str> = missing.iter().map(|ep| ep.method_name()).collect();
            warn!(
                runtime_type = RUNTIME_TYPE,
                resource = %descriptor.name,
                "Unresolved entry points: {}",
                names.join(", ")
            );
        }

        resource
    }

    pub fn name(&self) -> &str {
        &self.identity.name
    }

    pub fn root_path(&self) -> Option<&Path> {
        self.identity.root_path.as_deref()
    }

    pub fn state(&self) -> ResourceState {
        self.state
    }

    pub fn context(&self) -> Option<ContextHandle> {
        self.context
    }

    pub fn entry_points(&self) -> &EntryPointTable {
        &self.entry_points
    }

    /// Handle used by resource code to register the invokers it creates
    pub fn invokers(&self) -> InvokerRegistry {
        self.invokers.clone()
    }

    /// Invoke "main" and enter `Started`
    pub fn try_start(&mut self) -> Result<()> {
        if self.state != ResourceState::Constructed {
            return Err(BridgeError::InvalidTransition {
                state: self.state,
                operation: "start",
            });
        }

        let main = match self.entry_points.main.callable(EntryPoint::Main) {
            Ok(main) => main,
            Err(e) => {
                self.state = ResourceState::StartFailed;
                return Err(e);
            }
        };

        // Invokers created from inside "main" belong to this run
        self.invokers.lock()?.set_accepting(true);

        if let Err(message) = main(self.host, &self.identity.name, &self.main) {
            self.state = ResourceState::StartFailed;
            self.invokers.lock()?.set_accepting(false);
            return Err(BridgeError::Callback {
                entry_point: EntryPoint::Main,
                message,
            });
        }

        self.state = ResourceState::Started;
        Ok(())
    }

    /// Release every invoker, invoke "on-stop" and enter `Stopped`
    ///
    /// Invokers are released even when "on-stop" is unresolved. Returns the
    /// number of invokers released.
    pub fn try_stop(&mut self) -> Result<usize> {
        if !matches!(self.state, ResourceState::Started | ResourceState::StartFailed) {
            return Err(BridgeError::InvalidTransition {
                state: self.state,
                operation: "stop",
            });
        }
        self.state = ResourceState::Stopped;

        let released = {
            let mut invokers = self.invokers.lock()?;
            invokers.set_accepting(false);
            invokers.release_all()
        };
        debug!(
            runtime_type = RUNTIME_TYPE,
            resource = %self.identity.name,
            "Released {} invoker(s)",
            released
        );

        let on_stop = self.entry_points.on_stop.callable(EntryPoint::OnStop)?;
        on_stop().map_err(|message| BridgeError::Callback {
            entry_point: EntryPoint::OnStop,
            message,
        })?;

        Ok(released)
    }

    /// Route one event to its entry point
    pub fn dispatch(&mut self, event: &HostEvent) -> Result<Dispatch> {
        if self.state != ResourceState::Started {
            return Err(BridgeError::InvalidTransition {
                state: self.state,
                operation: "dispatch events to",
            });
        }
        events::dispatch(&mut self.entry_points, event)
    }
}

impl HostResource for Resource {
    fn start(&mut self) -> bool {
        match self.try_start() {
            Ok(()) => {
                info!(runtime_type = RUNTIME_TYPE, resource = %self.identity.name, "Started");
                true
            }
            Err(e) => {
                warn!(runtime_type = RUNTIME_TYPE, resource = %self.identity.name, "Start failed: {}", e);
                false
            }
        }
    }

    fn stop(&mut self) -> bool {
        match self.try_stop() {
            Ok(_) => {
                info!(runtime_type = RUNTIME_TYPE, resource = %self.identity.name, "Stopped");
                true
            }
            Err(e) => {
                warn!(runtime_type = RUNTIME_TYPE, resource = %self.identity.name, "Stop failed: {}", e);
                false
            }
        }
    }

    fn on_event(&mut self, event: &HostEvent) -> bool {
        if let Err(e) = self.dispatch(event) {
            warn!(
                runtime_type = RUNTIME_TYPE,
                resource = %self.identity.name,
                "Event {:?} not delivered: {}",
                event.kind(),
                e
            );
        }
        true
    }

    fn on_tick(&mut self) {}
}

impl Drop for Resource {
    fn drop(&mut self) {
        // Invokers may reference the context, so they go first
        if let Ok(mut invokers) = self.invokers.lock() {
            invokers.set_accepting(false);
            invokers.release_all();
        }
        if let Some(handle) = self.context.take() {
            self.contexts.destroy_context(handle);
        }
    }
}
