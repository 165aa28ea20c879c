// ============================================================================
// EDITOR SETTINGS - key=value settings file
// ============================================================================

use std::path::{Path, PathBuf};

use crate::ops::transform::Interpolation;

const SETTINGS_FILE: &str = "retouch_settings.cfg";

/// Settings that persist across sessions.
#[derive(Clone, Debug, PartialEq)]
pub struct EditorSettings {
    /// Maximum number of undo steps kept in history
    pub max_undo_steps: usize,
    /// Canvas size of a fresh, empty document
    pub default_width: u32,
    pub default_height: u32,
    /// Resampling used by the resize operation
    pub resize_interpolation: Interpolation,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            max_undo_steps: 50,
            default_width: 800,
            default_height: 600,
            resize_interpolation: Interpolation::Bilinear,
        }
    }
}

impl EditorSettings {
    /// Path to the settings file.
    /// On Linux:   ~/.config/retouch/retouch_settings.cfg  (XDG_CONFIG_HOME respected)
    /// On Windows: %APPDATA%\Retouch\retouch_settings.cfg
    /// On macOS:   ~/Library/Application Support/Retouch/retouch_settings.cfg
    pub fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA").ok()?;
            return Some(PathBuf::from(appdata).join("Retouch").join(SETTINGS_FILE));
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").ok()?;
            return Some(
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
                    .join("Retouch")
                    .join(SETTINGS_FILE),
            );
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .or_else(|_| std::env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
                .ok()?;
            Some(config_dir.join("retouch").join(SETTINGS_FILE))
        }
    }

    /// Load from the platform settings path (defaults if missing or corrupt).
    pub fn load() -> Self {
        match Self::settings_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load from `path`. Unknown keys and unparsable values are ignored.
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(_) => Self::default(),
        }
    }

    pub fn parse(content: &str) -> Self {
        let mut s = Self::default();
        for line in content.lines() {
            let line = line.trim();
            if line.starts_with('#') {
                continue;
            }
            let Some((key, val)) = line.split_once('=') else { continue };
            let val = val.trim();
            match key.trim() {
                "max_undo_steps" => {
                    if let Ok(v) = val.parse::<usize>() {
                        s.max_undo_steps = v.max(1);
                    }
                }
                "default_width" => {
                    if let Ok(v) = val.parse::<u32>()
                        && v > 0
                    {
                        s.default_width = v;
                    }
                }
                "default_height" => {
                    if let Ok(v) = val.parse::<u32>()
                        && v > 0
                    {
                        s.default_height = v;
                    }
                }
                "resize_interpolation" => {
                    if let Some(interp) = Interpolation::from_label(val) {
                        s.resize_interpolation = interp;
                    }
                }
                other => {
                    tracing::warn!("ignoring unknown setting '{}'", other);
                }
            }
        }
        s
    }

    pub fn to_config_string(&self) -> String {
        format!(
            "max_undo_steps={}\n\
             default_width={}\n\
             default_height={}\n\
             resize_interpolation={}\n",
            self.max_undo_steps,
            self.default_width,
            self.default_height,
            self.resize_interpolation.label(),
        )
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_config_string())
    }

    /// Save to the platform settings path. Failures are logged, not returned.
    pub fn save(&self) {
        let Some(path) = Self::settings_path() else { return };
        if let Err(e) = self.save_to(&path) {
            crate::log_warn!("could not save settings to {}: {}", path.display(), e);
        }
    }
}
