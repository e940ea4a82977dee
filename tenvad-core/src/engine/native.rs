//! TEN VAD native library backend.
//!
//! Loads `libten_vad` at runtime with `libloading` and forwards frames over
//! its C ABI:
//!
//! ```text
//! int ten_vad_create(void **handle, size_t hop_size, float threshold);
//! int ten_vad_process(void *handle, const int16_t *audio, size_t len,
//!                     float *out_probability, int *out_flag);
//! int ten_vad_destroy(void **handle);
//! const char *ten_vad_get_version(void);   // optional
//! ```

#![allow(unsafe_code)]

use std::ffi::{c_char, c_float, c_int, c_void, CStr};
use std::path::Path;
use std::ptr;
use std::sync::Arc;

use libloading::Library;
use tracing::{debug, info, warn};

use super::library::LibraryResolver;
use super::{EngineInstance, EngineOutput, EngineStatus, StatusCode, VadEngine};
use crate::error::{Result, VadError};

type CreateFn = unsafe extern "C" fn(*mut *mut c_void, usize, c_float) -> c_int;
type ProcessFn =
    unsafe extern "C" fn(*mut c_void, *const i16, usize, *mut c_float, *mut c_int) -> c_int;
type DestroyFn = unsafe extern "C" fn(*mut *mut c_void) -> c_int;
type VersionFn = unsafe extern "C" fn() -> *const c_char;

/// Resolved entry points. The function pointers stay valid for as long as
/// `_library` is alive, which every instance guarantees through its `Arc`.
struct NativeApi {
    create: CreateFn,
    process: ProcessFn,
    destroy: DestroyFn,
    version: Option<VersionFn>,
    _library: Library,
}

impl NativeApi {
    fn load(path: &Path) -> Result<Self> {
        // SAFETY: loading runs the library's initialisers; the TEN VAD binary
        // has none with preconditions on the caller.
        let library = unsafe { Library::new(path) }.map_err(|e| VadError::LibraryLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        // SAFETY: the declared signatures match ten_vad.h.
        let create = unsafe { library.get::<CreateFn>(b"ten_vad_create\0") }
            .map(|s| *s)
            .map_err(|_| VadError::MissingSymbol("ten_vad_create"))?;
        let process = unsafe { library.get::<ProcessFn>(b"ten_vad_process\0") }
            .map(|s| *s)
            .map_err(|_| VadError::MissingSymbol("ten_vad_process"))?;
        let destroy = unsafe { library.get::<DestroyFn>(b"ten_vad_destroy\0") }
            .map(|s| *s)
            .map_err(|_| VadError::MissingSymbol("ten_vad_destroy"))?;
        let version = unsafe { library.get::<VersionFn>(b"ten_vad_get_version\0") }
            .map(|s| *s)
            .ok();

        Ok(Self {
            create,
            process,
            destroy,
            version,
            _library: library,
        })
    }
}

/// Engine backed by the precompiled TEN VAD library.
pub struct NativeEngine {
    api: Arc<NativeApi>,
    path: std::path::PathBuf,
}

impl NativeEngine {
    /// Locate the library with [`LibraryResolver::from_env`] and load it.
    ///
    /// # Errors
    /// - `VadError::LibraryNotFound` if no candidate path exists.
    /// - `VadError::LibraryLoad` / `VadError::MissingSymbol` if it cannot be used.
    pub fn discover() -> Result<Self> {
        Self::with_resolver(&LibraryResolver::from_env())
    }

    pub fn with_resolver(resolver: &LibraryResolver) -> Result<Self> {
        let path = resolver.resolve()?;
        Self::load(path)
    }

    /// Load the library from an explicit path.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(VadError::LibraryNotFound {
                searched: vec![path.to_path_buf()],
            });
        }
        let api = NativeApi::load(path)?;
        let engine = Self {
            api: Arc::new(api),
            path: path.to_path_buf(),
        };
        info!(
            "TEN VAD library loaded from {} (version {})",
            engine.path.display(),
            engine.version().as_deref().unwrap_or("unknown")
        );
        Ok(engine)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for NativeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeEngine")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl VadEngine for NativeEngine {
    fn name(&self) -> &str {
        "ten-vad"
    }

    fn create(
        &self,
        hop_size: usize,
        threshold: f32,
    ) -> std::result::Result<Box<dyn EngineInstance>, StatusCode> {
        let mut handle: *mut c_void = ptr::null_mut();
        // SAFETY: `handle` is a valid out-pointer for the duration of the call.
        let code = unsafe { (self.api.create)(&mut handle, hop_size, threshold) };
        if code != 0 {
            return Err(code);
        }
        if handle.is_null() {
            return Err(EngineStatus::OutOfMemory.code());
        }
        debug!(hop_size, threshold, "native handle created");
        Ok(Box::new(NativeInstance {
            api: Arc::clone(&self.api),
            handle,
            hop_size,
        }))
    }

    fn version(&self) -> Option<String> {
        let version = self.api.version?;
        // SAFETY: returns a static NUL-terminated string or NULL.
        let raw = unsafe { version() };
        if raw.is_null() {
            return None;
        }
        // SAFETY: non-null pointer to a NUL-terminated string owned by the library.
        let text = unsafe { CStr::from_ptr(raw) };
        Some(text.to_string_lossy().into_owned())
    }
}

struct NativeInstance {
    api: Arc<NativeApi>,
    handle: *mut c_void,
    hop_size: usize,
}

// SAFETY: the native handle is only touched through `&mut self`, so it is
// never used from two threads at once; the library keeps no thread affinity.
unsafe impl Send for NativeInstance {}

impl EngineInstance for NativeInstance {
    fn process(&mut self, samples: &[i16]) -> std::result::Result<EngineOutput, StatusCode> {
        if self.handle.is_null() {
            return Err(EngineStatus::InvalidState.code());
        }
        if samples.len() != self.hop_size {
            return Err(EngineStatus::InvalidParam.code());
        }
        let mut probability: c_float = 0.0;
        let mut flag: c_int = 0;
        // SAFETY: `samples` holds exactly `hop_size` contiguous int16 values and
        // outlives the call; both out-pointers are valid locals.
        let code = unsafe {
            (self.api.process)(
                self.handle,
                samples.as_ptr(),
                samples.len(),
                &mut probability,
                &mut flag,
            )
        };
        if code != 0 {
            return Err(code);
        }
        Ok(EngineOutput { probability, flag })
    }

    fn destroy(&mut self) -> std::result::Result<(), StatusCode> {
        if self.handle.is_null() {
            return Ok(());
        }
        // SAFETY: `handle` came from `ten_vad_create` and has not been destroyed.
        let code = unsafe { (self.api.destroy)(&mut self.handle) };
        // The library consumes the handle even when it reports an error.
        self.handle = ptr::null_mut();
        if code != 0 {
            return Err(code);
        }
        Ok(())
    }
}

impl Drop for NativeInstance {
    fn drop(&mut self) {
        if let Err(code) = self.destroy() {
            warn!(
                "native handle release failed: {}",
                EngineStatus::from_code(code)
            );
        }
    }
}
