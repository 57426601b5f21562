//! Dynamically loaded CoreCLR hosting API

use std::ffi::{CStr, CString, c_char, c_int, c_uint, c_void};
use std::path::Path;
use std::ptr;

use libloading::Library;
use tracing::debug;

use crate::error::{BridgeError, Result};

#[cfg(target_os = "linux")]
pub const LIBRARY_NAME: &str = "libcoreclr.so";
#[cfg(target_os = "macos")]
pub const LIBRARY_NAME: &str = "libcoreclr.dylib";
#[cfg(target_os = "windows")]
pub const LIBRARY_NAME: &str = "coreclr.dll";
#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
pub const LIBRARY_NAME: &str = "libcoreclr.so";

type InitializeFn = unsafe extern "C" fn(
    exe_path: *const c_char,
    app_domain_friendly_name: *const c_char,
    property_count: c_int,
    property_keys: *const *const c_char,
    property_values: *const *const c_char,
    host_handle: *mut *mut c_void,
    domain_id: *mut c_uint,
) -> c_int;

type ShutdownFn = unsafe extern "C" fn(host_handle: *mut c_void, domain_id: c_uint) -> c_int;

type CreateDelegateFn = unsafe extern "C" fn(
    host_handle: *mut c_void,
    domain_id: c_uint,
    entry_point_assembly_name: *const c_char,
    entry_point_type_name: *const c_char,
    entry_point_method_name: *const c_char,
    delegate: *mut *mut c_void,
) -> c_int;

/// The three hosting functions exported by the runtime library
pub struct CoreClrLibrary {
    initialize: InitializeFn,
    shutdown: ShutdownFn,
    create_delegate: CreateDelegateFn,
    // Keeps the function pointers above valid
    _library: Library,
}

impl CoreClrLibrary {
    /// Load the runtime library from `runtime_dir`
    pub fn load(runtime_dir: &Path) -> Result<Self> {
        let path = runtime_dir.join(LIBRARY_NAME);
        debug!("Loading CoreCLR from {}", path.display());

        // SAFETY: loading the runtime runs its initializers; the library is
        // the .NET runtime the configuration points at.
        let library = unsafe { Library::new(&path) }
            .map_err(|e| BridgeError::Runtime(format!("Cannot load {}: {}", path.display(), e)))?;

        // SAFETY: the symbol types match the documented CoreCLR hosting API.
        let (initialize, shutdown, create_delegate) = unsafe {
            (
                *library
                    .get::<InitializeFn>(b"coreclr_initialize\0")
                    .map_err(|e| missing_symbol("coreclr_initialize", e))?,
                *library
                    .get::<ShutdownFn>(b"coreclr_shutdown\0")
                    .map_err(|e| missing_symbol("coreclr_shutdown", e))?,
                *library
                    .get::<CreateDelegateFn>(b"coreclr_create_delegate\0")
                    .map_err(|e| missing_symbol("coreclr_create_delegate", e))?,
            )
        };

        Ok(Self {
            initialize,
            shutdown,
            create_delegate,
            _library: library,
        })
    }

    /// Start a runtime host with the given properties
    ///
    /// Returns the host handle and the default domain id.
    pub fn initialize(
        &self,
        exe_path: &CStr,
        friendly_name: &CStr,
        properties: &[(CString, CString)],
    ) -> Result<(*mut c_void, u32)> {
        let keys: Vec<*const c_char> = properties.iter().map(|(k, _)| k.as_ptr()).collect();
        let values: Vec<*const c_char> = properties.iter().map(|(_, v)| v.as_ptr()).collect();
        let mut host_handle: *mut c_void = ptr::null_mut();
        let mut domain_id: c_uint = 0;

        // SAFETY: every pointer refers to a live, NUL-terminated string for the
        // duration of the call and the out-pointers point at locals.
        let status = unsafe {
            (self.initialize)(
                exe_path.as_ptr(),
                friendly_name.as_ptr(),
                properties.len() as c_int,
                keys.as_ptr(),
                values.as_ptr(),
                &mut host_handle,
                &mut domain_id,
            )
        };

        if status < 0 || host_handle.is_null() {
            return Err(BridgeError::Runtime(format!(
                "coreclr_initialize failed with status 0x{:08x}",
                status as u32
            )));
        }
        Ok((host_handle, domain_id))
    }

    /// Resolve a static method as a native-callable function pointer
    pub fn create_delegate(
        &self,
        host_handle: *mut c_void,
        domain_id: u32,
        assembly: &CStr,
        type_name: &CStr,
        method: &CStr,
    ) -> Option<*mut c_void> {
        let mut delegate: *mut c_void = ptr::null_mut();

        // SAFETY: the host handle comes from a successful `initialize` and has
        // not been shut down; the names are NUL-terminated.
        let status = unsafe {
            (self.create_delegate)(
                host_handle,
                domain_id,
                assembly.as_ptr(),
                type_name.as_ptr(),
                method.as_ptr(),
                &mut delegate,
            )
        };

        if status < 0 || delegate.is_null() {
            None
        } else {
            Some(delegate)
        }
    }

    /// Shut a runtime host down, returning the runtime's status code
    pub fn shutdown(&self, host_handle: *mut c_void, domain_id: u32) -> i32 {
        // SAFETY: called once per handle returned by `initialize`.
        unsafe { (self.shutdown)(host_handle, domain_id) }
    }
}

fn missing_symbol(name: &str, error: libloading::Error) -> BridgeError {
    BridgeError::Runtime(format!("Symbol '{}' not found: {}", name, error))
}
