//! CoreCLR execution contexts
//!
//! Every resource gets its own runtime host created through the native hosting
//! API. The runtime library is loaded once per runtime directory and shared by
//! all the contexts created from it.

mod delegates;
mod library;
mod marshal;

use std::collections::HashMap;
use std::env;
use std::ffi::{CString, c_void};
use std::fs;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use crate::context::{ContextHandle, EntryPointDescriptor, ExecutionContextManager};
use crate::entry_points::ResolvedEntryPoint;
use crate::error::{BridgeError, Result};

pub use library::{CoreClrLibrary, LIBRARY_NAME};
pub use marshal::FfiEntity;

struct Context {
    library: Arc<CoreClrLibrary>,
    host: *mut c_void,
    domain_id: u32,
    root: PathBuf,
}

// SAFETY: the host pointer is an opaque token owned by the runtime. It is only
// passed back to the hosting API, which accepts calls from any thread.
unsafe impl Send for Context {}

/// [`ExecutionContextManager`] backed by the CoreCLR hosting API
#[derive(Default)]
pub struct CoreClrContexts {
    libraries: Mutex<HashMap<PathBuf, Arc<CoreClrLibrary>>>,
    contexts: Mutex<HashMap<ContextHandle, Context>>,
}

impl CoreClrContexts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live contexts
    pub fn len(&self) -> usize {
        self.contexts.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn library(&self, runtime_dir: &Path) -> Result<Arc<CoreClrLibrary>> {
        let mut libraries = self
            .libraries
            .lock()
            .map_err(|_| BridgeError::Poisoned("coreclr libraries".into()))?;
        if let Some(library) = libraries.get(runtime_dir) {
            return Ok(Arc::clone(library));
        }
        let library = Arc::new(CoreClrLibrary::load(runtime_dir)?);
        libraries.insert(runtime_dir.to_path_buf(), Arc::clone(&library));
        Ok(library)
    }

    fn create(&self, resource_root: &Path, runtime_dir: &Path) -> Result<ContextHandle> {
        if !resource_root.is_dir() {
            return Err(BridgeError::Runtime(format!(
                "Resource root {} is not a directory",
                resource_root.display()
            )));
        }

        let library = self.library(runtime_dir)?;
        let properties = runtime_properties(resource_root, runtime_dir)?;

        let exe = env::current_exe()
            .map_err(|e| BridgeError::Runtime(format!("Cannot locate host executable: {}", e)))?;
        let exe = marshal::path_string(&exe).map_err(BridgeError::Marshal)?;
        let friendly_name = resource_root
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("resource");
        let friendly_name = marshal::c_string(friendly_name).map_err(BridgeError::Marshal)?;

        let (host, domain_id) = library.initialize(&exe, &friendly_name, &properties)?;
        let handle = ContextHandle::new(host as usize, domain_id);

        self.contexts
            .lock()
            .map_err(|_| BridgeError::Poisoned("coreclr contexts".into()))?
            .insert(
                handle,
                Context {
                    library,
                    host,
                    domain_id,
                    root: resource_root.to_path_buf(),
                },
            );
        Ok(handle)
    }
}

impl ExecutionContextManager for CoreClrContexts {
    fn create_context(&self, resource_root: &Path, runtime_library: &Path) -> Option<ContextHandle> {
        match self.create(resource_root, runtime_library) {
            Ok(handle) => {
                info!(
                    "Created CoreCLR context {} for {}",
                    handle.id,
                    resource_root.display()
                );
                Some(handle)
            }
            Err(e) => {
                warn!("Cannot create CoreCLR context for {}: {}", resource_root.display(), e);
                None
            }
        }
    }

    fn resolve(
        &self,
        handle: &ContextHandle,
        descriptor: &EntryPointDescriptor,
    ) -> Option<ResolvedEntryPoint> {
        let contexts = self.contexts.lock().ok()?;
        let context = contexts.get(handle)?;

        let names = (
            marshal::c_string(&descriptor.namespace),
            marshal::c_string(&descriptor.type_name),
            marshal::c_string(descriptor.method_name),
        );
        let (Ok(assembly), Ok(type_name), Ok(method)) = names else {
            warn!("Entry point name for {} is not representable", descriptor.entry_point);
            return None;
        };

        let raw = context.library.create_delegate(
            context.host,
            context.domain_id,
            &assembly,
            &type_name,
            &method,
        )?;
        let delegate = NonNull::new(raw)?;
        debug!(
            "Resolved {}.{} in {}",
            descriptor.type_name,
            descriptor.method_name,
            context.root.display()
        );

        // SAFETY: the delegate was created for this entry point's method and
        // stays valid until the context is destroyed, which happens only after
        // the owning resource has dropped its entry-point table.
        Some(unsafe { delegates::wrap(descriptor.entry_point.signature(), delegate) })
    }

    fn destroy_context(&self, handle: ContextHandle) {
        let removed = match self.contexts.lock() {
            Ok(mut contexts) => contexts.remove(&handle),
            Err(_) => {
                warn!("CoreCLR context table poisoned; context {} leaked", handle.id);
                return;
            }
        };
        let Some(context) = removed else {
            debug!("Context {} already destroyed", handle.id);
            return;
        };

        let status = context.library.shutdown(context.host, context.domain_id);
        if status < 0 {
            warn!(
                "coreclr_shutdown for {} returned 0x{:08x}",
                context.root.display(),
                status as u32
            );
        } else {
            debug!("Destroyed CoreCLR context for {}", context.root.display());
        }
    }
}

fn runtime_properties(resource_root: &Path, runtime_dir: &Path) -> Result<Vec<(CString, CString)>> {
    let tpa = marshal::assembly_list(dll_files(runtime_dir).into_iter().chain(dll_files(resource_root)));
    let app_paths = marshal::directory_list(&[resource_root]);
    let native_paths = marshal::directory_list(&[resource_root, runtime_dir]);

    [
        ("TRUSTED_PLATFORM_ASSEMBLIES", tpa),
        ("APP_PATHS", app_paths.clone()),
        ("APP_NI_PATHS", app_paths.clone()),
        ("NATIVE_DLL_SEARCH_DIRECTORIES", native_paths),
        ("PLATFORM_RESOURCE_ROOTS", app_paths),
    ]
    .into_iter()
    .map(|(key, value)| -> Result<(CString, CString)> {
        let key = marshal::c_string(key).map_err(BridgeError::Marshal)?;
        let value = marshal::c_string(&value).map_err(BridgeError::Marshal)?;
        Ok((key, value))
    })
    .collect()
}

/// `.dll` files directly inside `dir`, sorted by path
fn dll_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("dll"))
        })
        .collect();
    files.sort();
    files
}
