//! Invoker ownership
//!
//! Invokers are objects created by resource code while the resource is
//! running. The bridge owns them and releases all of them, in creation order,
//! when the resource stops. Releasing is dropping: an invoker frees whatever it
//! holds in its `Drop` implementation.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::error::{BridgeError, Result};

/// An object whose teardown is driven by the bridge
pub trait Invoker: Send {
    /// Name used in logs
    fn name(&self) -> &str {
        "invoker"
    }
}

/// Identifier returned when an invoker is registered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InvokerId(pub u64);

/// Owning, insertion-ordered collection of invokers
///
/// Dropping the set releases everything still in it.
#[derive(Default)]
pub struct InvokerSet {
    invokers: Vec<(InvokerId, Box<dyn Invoker>)>,
    next_id: u64,
    accepting: bool,
}

impl InvokerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow or refuse new registrations
    pub fn set_accepting(&mut self, accepting: bool) {
        self.accepting = accepting;
    }

    pub fn push(&mut self, invoker: Box<dyn Invoker>) -> Result<InvokerId> {
        if !self.accepting {
            return Err(BridgeError::InvokerRejected);
        }
        self.next_id += 1;
        let id = InvokerId(self.next_id);
        self.invokers.push((id, invoker));
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.invokers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.invokers.is_empty()
    }

    /// Release every invoker in creation order, returning how many were released
    pub fn release_all(&mut self) -> usize {
        let count = self.invokers.len();
        for (id, invoker) in self.invokers.drain(..) {
            debug!("Releasing {} #{}", invoker.name(), id.0);
            drop(invoker);
        }
        count
    }
}

impl Drop for InvokerSet {
    fn drop(&mut self) {
        self.release_all();
    }
}

/// Shared handle to a resource's invoker set
///
/// Handed to the code running inside the execution context so it can register
/// the invokers it creates.
#[derive(Clone, Default)]
pub struct InvokerRegistry {
    inner: Arc<Mutex<InvokerSet>>,
}

impl InvokerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an invoker; rejected unless the owning resource is started
    pub fn register(&self, invoker: Box<dyn Invoker>) -> Result<InvokerId> {
        self.lock()?.push(invoker)
    }

    pub fn len(&self) -> usize {
        self.lock().map(|set| set.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, InvokerSet>> {
        self.inner
            .lock()
            .map_err(|_| BridgeError::Poisoned("invokers".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Tracked {
        label: &'static str,
        released: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Invoker for Tracked {
        fn name(&self) -> &str {
            self.label
        }
    }

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.released.lock().unwrap().push(self.label);
        }
    }

    fn tracked(label: &'static str, released: &Arc<Mutex<Vec<&'static str>>>) -> Box<dyn Invoker> {
        Box::new(Tracked {
            label,
            released: Arc::clone(released),
        })
    }

    #[test]
    fn test_rejects_when_not_accepting() {
        let mut set = InvokerSet::new();
        let released = Arc::new(Mutex::new(Vec::new()));
        assert!(matches!(
            set.push(tracked("early", &released)),
            Err(BridgeError::InvokerRejected)
        ));
        // The rejected invoker is dropped immediately
        assert_eq!(*released.lock().unwrap(), vec!["early"]);
    }

    #[test]
    fn test_release_in_creation_order() {
        let released = Arc::new(Mutex::new(Vec::new()));
        let mut set = InvokerSet::new();
        set.set_accepting(true);
        set.push(tracked("a", &released)).unwrap();
        set.push(tracked("b", &released)).unwrap();
        set.push(tracked("c", &released)).unwrap();

        assert_eq!(set.release_all(), 3);
        assert_eq!(*released.lock().unwrap(), vec!["a", "b", "c"]);
        assert!(set.is_empty());
        assert_eq!(set.release_all(), 0);
    }

    #[test]
    fn test_ids_are_sequential() {
        let released = Arc::new(Mutex::new(Vec::new()));
        let mut set = InvokerSet::new();
        set.set_accepting(true);
        let first = set.push(tracked("a", &released)).unwrap();
        let second = set.push(tracked("b", &released)).unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_drop_releases_remaining() {
        let released = Arc::new(Mutex::new(Vec::new()));
        {
            let registry = InvokerRegistry::new();
            registry.lock().unwrap().set_accepting(true);
            registry.register(tracked("x", &released)).unwrap();
            registry.register(tracked("y", &released)).unwrap();
            assert_eq!(registry.len(), 2);
        }
        assert_eq!(*released.lock().unwrap(), vec!["x", "y"]);
    }
}
