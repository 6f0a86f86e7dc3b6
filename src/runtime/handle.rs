//! Runtime handle lifecycle
//!
//! [`RuntimeHandle::init`] opens a runtime library, resolves its entry
//! points and counts devices. The handle it produces is the only way to
//! query devices and is released exactly once.
//!
//! ```text
//! Uninitialized -> Ready -> Released
//!               \-> Failed
//! ```

use crate::error::ProbeError;
use crate::runtime::ffi::{
    CudartReturn, CUDART_SUCCESS, CUDA_ERROR_INSUFFICIENT_DRIVER, CUDA_ERROR_NO_DEVICE,
};
use crate::runtime::loader::{load_runtime, verbose_log, CudartApi, DynamicLibrary};

use std::ffi::c_int;
use std::fmt;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Observable lifecycle state of a [`RuntimeHandle`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleStatus {
    /// Library loaded and every entry point resolved
    Ready,
    /// Init failed; no library is held
    Failed,
    /// Library unloaded by [`RuntimeHandle::release`]
    Released,
}

impl fmt::Display for HandleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandleStatus::Ready => write!(f, "ready"),
            HandleStatus::Failed => write!(f, "failed"),
            HandleStatus::Released => write!(f, "released"),
        }
    }
}

/// Resolved table plus the library that keeps it valid.
///
/// Field order matters: the table is dropped before the library.
pub(crate) struct LoadedRuntime {
    pub(crate) api: CudartApi,
    library: Option<DynamicLibrary>,
}

impl LoadedRuntime {
    fn unload(self) {
        if let Some(library) = self.library {
            library.close();
        }
    }
}

enum HandleState {
    Ready(LoadedRuntime),
    Failed,
    Released,
}

/// Handle to a loaded GPU compute runtime
pub struct RuntimeHandle {
    state: HandleState,
    verbose: bool,
    device_count: usize,
    /// Serialises "set active device, then query" sequences
    context_lock: Mutex<()>,
}

/// Outcome of [`RuntimeHandle::init`]
///
/// `error` is set exactly when `handle` is unusable, in which case
/// `device_count` is 0.
pub struct InitResult {
    pub error: Option<ProbeError>,
    pub handle: RuntimeHandle,
    pub device_count: usize,
}

impl InitResult {
    /// Error message owned by the caller, if init failed
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(|e| e.to_string())
    }

    /// Convert into a `Result`, discarding the unusable handle on failure
    pub fn into_result(self) -> Result<(RuntimeHandle, usize), ProbeError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok((self.handle, self.device_count)),
        }
    }
}

impl fmt::Debug for InitResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitResult")
            .field("error", &self.error)
            .field("handle", &self.handle.status())
            .field("device_count", &self.device_count)
            .finish()
    }
}

impl RuntimeHandle {
    /// Load the runtime at `path`, resolve its entry points and count
    /// devices. Never retried; probe another path on failure.
    pub fn init(path: impl AsRef<Path>, verbose: bool) -> InitResult {
        let path = path.as_ref();
        let started = load_runtime(path, verbose).and_then(|(library, api)| {
            let loaded = LoadedRuntime {
                api,
                library: Some(library),
            };
            Self::start(loaded, verbose)
        });
        Self::into_init_result(started, verbose)
    }

    /// Init against an already-resolved table with no backing library
    #[cfg(test)]
    pub(crate) fn init_with_api(api: CudartApi, verbose: bool) -> InitResult {
        let loaded = LoadedRuntime { api, library: None };
        Self::into_init_result(Self::start(loaded, verbose), verbose)
    }

    fn into_init_result(started: Result<(Self, usize), ProbeError>, verbose: bool) -> InitResult {
        match started {
            Ok((handle, device_count)) => InitResult {
                error: None,
                handle,
                device_count,
            },
            Err(error) => {
                verbose_log!(verbose, "runtime init failed: {}", error);
                InitResult {
                    error: Some(error),
                    handle: Self::failed(verbose),
                    device_count: 0,
                }
            }
        }
    }

    fn start(loaded: LoadedRuntime, verbose: bool) -> Result<(Self, usize), ProbeError> {
        let api = loaded.api;

        if verbose {
            // Opportunistic; failures here do not affect init
            let mut raw: c_int = 0;
            let status = unsafe { (api.driver_get_version)(&mut raw) };
            verbose_log!(verbose, "cudaDriverGetVersion status {} version {}", status, raw);
        }

        let mut count: c_int = 0;
        // SAFETY: the table was resolved from the library held by `loaded`.
        let status = unsafe { (api.get_device_count)(&mut count) };
        verbose_log!(verbose, "cudaGetDeviceCount status {} count {}", status, count);

        if let Err(e) = device_count_status(status) {
            loaded.unload();
            return Err(e);
        }

        let device_count = usize::try_from(count).unwrap_or(0);
        let handle = Self {
            state: HandleState::Ready(loaded),
            verbose,
            device_count,
            context_lock: Mutex::new(()),
        };
        Ok((handle, device_count))
    }

    fn failed(verbose: bool) -> Self {
        Self {
            state: HandleState::Failed,
            verbose,
            device_count: 0,
            context_lock: Mutex::new(()),
        }
    }

    /// Current lifecycle state
    pub fn status(&self) -> HandleStatus {
        match self.state {
            HandleState::Ready(_) => HandleStatus::Ready,
            HandleState::Failed => HandleStatus::Failed,
            HandleState::Released => HandleStatus::Released,
        }
    }

    /// Whether queries may be issued against this handle
    pub fn is_usable(&self) -> bool {
        self.status() == HandleStatus::Ready
    }

    /// Number of devices reported at init (0 unless ready)
    pub fn device_count(&self) -> usize {
        if self.is_usable() {
            self.device_count
        } else {
            0
        }
    }

    /// Path the runtime library was loaded from, while ready
    pub fn library_path(&self) -> Option<&Path> {
        match &self.state {
            HandleState::Ready(loaded) => loaded.library.as_ref().map(DynamicLibrary::path),
            _ => None,
        }
    }

    /// Unload the library and invalidate the handle.
    ///
    /// Releasing a handle that is not ready is a caller bug and reported as
    /// [`ProbeError::InvalidHandleUse`]. The device is not reset first.
    pub fn release(&mut self) -> Result<(), ProbeError> {
        match std::mem::replace(&mut self.state, HandleState::Released) {
            HandleState::Ready(loaded) => {
                verbose_log!(self.verbose, "releasing runtime handle");
                loaded.unload();
                Ok(())
            }
            previous => {
                self.state = previous;
                Err(self.misuse("release"))
            }
        }
    }

    /// Resolved table, or a loud error if the handle is not ready
    pub(crate) fn api(&self, operation: &'static str) -> Result<&CudartApi, ProbeError> {
        match &self.state {
            HandleState::Ready(loaded) => Ok(&loaded.api),
            _ => Err(self.misuse(operation)),
        }
    }

    pub(crate) fn lock_context(&self) -> MutexGuard<'_, ()> {
        self.context_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Log a raw native status code when verbose
    pub(crate) fn trace_status(&self, call: &str, status: CudartReturn) {
        verbose_log!(self.verbose, "{} status {}", call, status);
    }

    fn misuse(&self, operation: &'static str) -> ProbeError {
        let err = ProbeError::InvalidHandleUse {
            operation,
            state: self.status(),
        };
        log::error!("{}", err);
        err
    }
}

impl fmt::Debug for RuntimeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeHandle")
            .field("status", &self.status())
            .field("verbose", &self.verbose)
            .field("device_count", &self.device_count())
            .field("library_path", &self.library_path())
            .finish()
    }
}

fn device_count_status(status: CudartReturn) -> Result<(), ProbeError> {
    match status {
        CUDART_SUCCESS => Ok(()),
        CUDA_ERROR_INSUFFICIENT_DRIVER => Err(ProbeError::DriverInsufficient),
        CUDA_ERROR_NO_DEVICE => Err(ProbeError::NoDevices),
        other => Err(ProbeError::DeviceCountFailed(other)),
    }
}
