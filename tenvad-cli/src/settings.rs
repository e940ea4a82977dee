//! Persistent CLI defaults (JSON file in the user config directory).
//!
//! Command-line flags override whatever is loaded here.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tenvad_core::{DEFAULT_HOP_SIZE, DEFAULT_THRESHOLD};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct CliSettings {
    pub hop_size: usize,
    pub threshold: f32,
    /// `"native"` or `"energy"`.
    pub engine: String,
    pub library_path: Option<PathBuf>,
}

impl Default for CliSettings {
    fn default() -> Self {
        Self {
            hop_size: DEFAULT_HOP_SIZE,
            threshold: DEFAULT_THRESHOLD,
            engine: "native".into(),
            library_path: None,
        }
    }
}

impl CliSettings {
    pub fn normalize(&mut self) {
        if self.hop_size == 0 {
            self.hop_size = DEFAULT_HOP_SIZE;
        }
        self.threshold = if self.threshold.is_finite() {
            self.threshold.clamp(0.0, 1.0)
        } else {
            DEFAULT_THRESHOLD
        };
        self.engine = normalize_engine(&self.engine);
        self.library_path = self
            .library_path
            .take()
            .filter(|p| !p.as_os_str().is_empty());
    }
}

pub fn normalize_engine(raw: &str) -> String {
    match raw.trim().to_ascii_lowercase().as_str() {
        "energy" | "rms" | "reference" => "energy".into(),
        _ => "native".into(),
    }
}

pub fn default_settings_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tenvad")
            .join("settings.json")
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                std::env::var_os("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
                    .join(".config")
            })
            .join("tenvad")
            .join("settings.json")
    }
}

/// Missing or unreadable files fall back to defaults.
pub fn load_settings(path: &Path) -> CliSettings {
    let mut settings = fs::read_to_string(path)
        .ok()
        .and_then(|raw| serde_json::from_str::<CliSettings>(&raw).ok())
        .unwrap_or_default();
    settings.normalize();
    settings
}

pub fn save_settings(path: &Path, settings: &CliSettings) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings).map_err(std::io::Error::other)?;
    fs::write(path, json)
}
