//! Locating the native TEN VAD library on disk.
//!
//! ## Search order
//!
//! | # | Location |
//! |---|----------|
//! | 1 | `<install_dir>/ten_vad_library/<lib>` |
//! | 2 | `<project_root>/lib/<System>/<arch>/<lib>` |
//! | 3 | `<project_root>/lib/<system>/<arch>/<lib>` |
//! | 4 | `$TEN_VAD_LIB_PATH` |
//!
//! The first path that exists wins.

use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::error::{Result, VadError};

/// Environment variable holding an explicit library path.
pub const LIB_PATH_ENV: &str = "TEN_VAD_LIB_PATH";

/// Platform file name of the native library.
pub fn library_file_name() -> &'static str {
    #[cfg(target_os = "linux")]
    {
        "libten_vad.so"
    }
    #[cfg(target_os = "windows")]
    {
        "ten_vad.dll"
    }
    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        "libten_vad.dylib"
    }
}

/// Directory name for the host OS inside the development `lib/` tree.
pub fn os_dir_name() -> &'static str {
    match std::env::consts::OS {
        "linux" => "Linux",
        "windows" => "Windows",
        "macos" => "macOS",
        "ios" => "iOS",
        "android" => "Android",
        other => other,
    }
}

/// Directory name for a CPU architecture inside the development `lib/` tree.
pub fn arch_dir_name(arch: &str) -> &str {
    match arch {
        "x86_64" => "x64",
        "x86" | "i386" | "i686" => "x86",
        "aarch64" => "arm64",
        other => other,
    }
}

/// Candidate locations for the native library, checked in order.
#[derive(Debug, Clone, Default)]
pub struct LibraryResolver {
    install_dir: Option<PathBuf>,
    project_root: Option<PathBuf>,
    env_override: Option<PathBuf>,
}

impl LibraryResolver {
    /// Resolver seeded from the running process: the executable's directory,
    /// the workspace this crate was built from, and `$TEN_VAD_LIB_PATH`.
    pub fn from_env() -> Self {
        let install_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf));
        let project_root = Path::new(env!("CARGO_MANIFEST_DIR"))
            .parent()
            .map(Path::to_path_buf);
        let env_override = std::env::var_os(LIB_PATH_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        Self {
            install_dir,
            project_root,
            env_override,
        }
    }

    pub fn with_install_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.install_dir = Some(dir.into());
        self
    }

    pub fn with_project_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.project_root = Some(dir.into());
        self
    }

    pub fn with_env_override(mut self, path: Option<PathBuf>) -> Self {
        self.env_override = path.filter(|p| !p.as_os_str().is_empty());
        self
    }

    /// All candidate paths, in search order.
    pub fn candidates(&self) -> Vec<PathBuf> {
        let lib = library_file_name();
        let arch = arch_dir_name(std::env::consts::ARCH);
        let system = os_dir_name();

        let mut paths = Vec::with_capacity(4);
        if let Some(dir) = &self.install_dir {
            paths.push(dir.join("ten_vad_library").join(lib));
        }
        if let Some(root) = &self.project_root {
            paths.push(root.join("lib").join(system).join(arch).join(lib));
            let lower = system.to_lowercase();
            if lower != system {
                paths.push(root.join("lib").join(lower).join(arch).join(lib));
            }
        }
        if let Some(path) = &self.env_override {
            paths.push(path.clone());
        }
        paths
    }

    /// First existing candidate.
    ///
    /// # Errors
    /// `VadError::LibraryNotFound` listing every path searched.
    pub fn resolve(&self) -> Result<PathBuf> {
        let searched = self.candidates();
        match searched.iter().find(|p| p.exists()) {
            Some(found) => {
                info!("loading TEN VAD library from {}", found.display());
                Ok(found.clone())
            }
            None => {
                error!(
                    "could not find {}; searched paths: {:?}",
                    library_file_name(),
                    searched
                );
                Err(VadError::LibraryNotFound { searched })
            }
        }
    }
}
