//! Resource manager
//!
//! Keeps every resource of the host by name, in load order. Each resource sits
//! behind its own mutex so a multi-threaded host can deliver calls from any
//! thread while a single resource still sees them one at a time.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info};

use crate::error::{BridgeError, Result};
use crate::events::HostEvent;
use crate::host::ResourceDescriptor;
use crate::resource::{BridgeEnv, HostResource, Resource, ResourceState};

pub type SharedResource = Arc<Mutex<Resource>>;

pub struct ResourceManager {
    env: BridgeEnv,
    /// Map of resource name to resource instance
    resources: HashMap<String, SharedResource>,
    /// Resource names in load order
    order: Vec<String>,
}

impl ResourceManager {
    pub fn new(env: BridgeEnv) -> Self {
        Self {
            env,
            resources: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Construct a resource and register it under its name
    pub fn create(&mut self, descriptor: &ResourceDescriptor) -> Result<SharedResource> {
        if self.resources.contains_key(&descriptor.name) {
            return Err(BridgeError::DuplicateResource(descriptor.name.clone()));
        }

        debug!("Creating resource '{}'", descriptor.name);
        let resource = Arc::new(Mutex::new(Resource::new(&self.env, descriptor)));
        self.resources
            .insert(descriptor.name.clone(), Arc::clone(&resource));
        self.order.push(descriptor.name.clone());
        Ok(resource)
    }

    pub fn get(&self, name: &str) -> Option<SharedResource> {
        self.resources.get(name).cloned()
    }

    /// Resource names in load order
    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn start(&self, name: &str) -> Result<()> {
        self.lock(name)?.try_start()
    }

    /// Stop a resource, returning how many invokers were released
    pub fn stop(&self, name: &str) -> Result<usize> {
        self.lock(name)?.try_stop()
    }

    /// Start every constructed resource in load order, returning the names
    /// that failed to launch
    pub fn start_all(&self) -> Vec<String> {
        let mut failed = Vec::new();
        for name in &self.order {
            let launched = match self.lock(name) {
                Ok(mut resource) if resource.state() == ResourceState::Constructed => resource.start(),
                Ok(_) => continue,
                Err(_) => false,
            };
            if !launched {
                failed.push(name.clone());
            }
        }
        failed
    }

    /// Stop every running resource in reverse load order
    pub fn stop_all(&self) {
        for name in self.order.iter().rev() {
            if let Ok(mut resource) = self.lock(name) {
                if matches!(
                    resource.state(),
                    ResourceState::Started | ResourceState::StartFailed
                ) {
                    resource.stop();
                }
            }
        }
        info!("All resources stopped");
    }

    /// Deliver an event to every started resource in load order
    ///
    /// Returns how many resources received it.
    pub fn broadcast(&self, event: &HostEvent) -> usize {
        let mut delivered = 0;
        for name in &self.order {
            if let Ok(mut resource) = self.lock(name) {
                if resource.state() == ResourceState::Started {
                    resource.on_event(event);
                    delivered += 1;
                }
            }
        }
        delivered
    }

    pub fn tick_all(&self) {
        for name in &self.order {
            if let Ok(mut resource) = self.lock(name) {
                if resource.state() == ResourceState::Started {
                    resource.on_tick();
                }
            }
        }
    }

    /// Unregister a resource; it is destroyed once the last handle is dropped
    pub fn remove(&mut self, name: &str) -> Result<SharedResource> {
        let resource = self
            .resources
            .remove(name)
            .ok_or_else(|| BridgeError::UnknownResource(name.to_string()))?;
        self.order.retain(|n| n != name);
        Ok(resource)
    }

    fn lock(&self, name: &str) -> Result<MutexGuard<'_, Resource>> {
        let resource = self
            .resources
            .get(name)
            .ok_or_else(|| BridgeError::UnknownResource(name.to_string()))?;
        resource
            .lock()
            .map_err(|_| BridgeError::Poisoned(name.to_string()))
    }
}
