//! Runtime library loading and symbol resolution
//!
//! Opens a shared library by path with `libloading` and resolves the fixed
//! set of cudart entry points the probe needs. Resolution is all-or-nothing:
//! the first missing symbol aborts the load and the library is closed again
//! before the error is returned.

use crate::error::ProbeError;
use crate::runtime::ffi::{
    CudaDeviceGetAttributeFn, CudaDeviceResetFn, CudaDeviceSynchronizeFn, CudaDriverGetVersionFn,
    CudaGetDeviceCountFn, CudaGetDevicePropertiesFn, CudaMemGetInfoFn, CudaSetDeviceFn,
};

use libloading::{Library, Symbol};
use std::ffi::c_void;
use std::path::{Path, PathBuf};

/// Emit a diagnostic record only when the owning probe is verbose
macro_rules! verbose_log {
    ($verbose:expr, $($arg:tt)+) => {
        if $verbose {
            log::debug!($($arg)+);
        }
    };
}
pub(crate) use verbose_log;

/// An opened shared library
#[derive(Debug)]
pub struct DynamicLibrary {
    library: Library,
    path: PathBuf,
    verbose: bool,
}

impl DynamicLibrary {
    /// Open the library at `path`
    pub fn open(path: &Path, verbose: bool) -> Result<Self, ProbeError> {
        verbose_log!(verbose, "dlopen {}", path.display());

        // SAFETY: loading a library runs its initialisers. The probe only
        // targets GPU runtime libraries, whose initialisers are benign.
        let library = unsafe { Library::new(path) }.map_err(|e| {
            verbose_log!(verbose, "dlopen {} failed: {}", path.display(), e);
            ProbeError::LibraryNotFound {
                path: path.display().to_string(),
                reason: e.to_string(),
            }
        })?;

        Ok(Self {
            library,
            path: path.to_path_buf(),
            verbose,
        })
    }

    /// Path the library was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolve `name` into a function pointer of type `F`.
    ///
    /// # Safety
    ///
    /// `F` must be a function pointer type matching the exported symbol's
    /// real signature, and the returned pointer must not outlive `self`.
    pub unsafe fn resolve<F: Copy>(&self, name: &'static str) -> Result<F, ProbeError> {
        debug_assert_eq!(std::mem::size_of::<F>(), std::mem::size_of::<*const c_void>());
        verbose_log!(self.verbose, "dlsym: {}", name);

        let symbol: Symbol<*const c_void> = self.library.get(name.as_bytes()).map_err(|e| {
            verbose_log!(self.verbose, "dlsym {} failed: {}", name, e);
            ProbeError::SymbolNotFound(name.to_string())
        })?;

        let raw = *symbol;
        if raw.is_null() {
            verbose_log!(self.verbose, "dlsym {} resolved to null", name);
            return Err(ProbeError::SymbolNotFound(name.to_string()));
        }

        Ok(std::mem::transmute_copy::<*const c_void, F>(&raw))
    }

    /// Unload the library
    pub fn close(self) {
        verbose_log!(self.verbose, "dlclose {}", self.path.display());
        if let Err(e) = self.library.close() {
            log::warn!("Failed to unload {}: {}", self.path.display(), e);
        }
    }
}

/// Declares the resolved function table together with the symbol names
/// backing each entry. Adding an entry point is one line here.
macro_rules! cudart_api {
    ($($field:ident => $symbol:literal : $ty:ty,)+) => {
        /// Resolved cudart entry points. Every field is a live, non-null
        /// function pointer into the library it was resolved from.
        #[derive(Debug, Clone, Copy)]
        pub struct CudartApi {
            $(pub(crate) $field: $ty,)+
        }

        impl CudartApi {
            /// Symbols every usable runtime library must export, in
            /// resolution order
            pub const REQUIRED_SYMBOLS: &'static [&'static str] = &[$($symbol),+];

            /// Resolve every required symbol from `library`, stopping at the
            /// first one that is missing
            ///
            /// # Safety
            ///
            /// The returned table must not be used after `library` is closed.
            pub(crate) unsafe fn resolve(library: &DynamicLibrary) -> Result<Self, ProbeError> {
                Ok(Self {
                    $($field: library.resolve::<$ty>($symbol)?,)+
                })
            }
        }
    };
}

cudart_api! {
    set_device => "cudaSetDevice": CudaSetDeviceFn,
    device_synchronize => "cudaDeviceSynchronize": CudaDeviceSynchronizeFn,
    device_reset => "cudaDeviceReset": CudaDeviceResetFn,
    mem_get_info => "cudaMemGetInfo": CudaMemGetInfoFn,
    get_device_count => "cudaGetDeviceCount": CudaGetDeviceCountFn,
    device_get_attribute => "cudaDeviceGetAttribute": CudaDeviceGetAttributeFn,
    driver_get_version => "cudaDriverGetVersion": CudaDriverGetVersionFn,
    get_device_properties => "cudaGetDeviceProperties": CudaGetDevicePropertiesFn,
}

/// Open `path` and resolve the full cudart table.
///
/// On any resolution failure the library is closed before returning, so a
/// half-populated table never escapes.
pub fn load_runtime(path: &Path, verbose: bool) -> Result<(DynamicLibrary, CudartApi), ProbeError> {
    let library = DynamicLibrary::open(path, verbose)?;

    // SAFETY: the table is only handed out paired with the library it was
    // resolved from, and the pair is dropped together.
    match unsafe { CudartApi::resolve(&library) } {
        Ok(api) => Ok((library, api)),
        Err(e) => {
            library.close();
            Err(e)
        }
    }
}
