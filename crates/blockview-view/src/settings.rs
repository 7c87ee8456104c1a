use crate::viewport::ViewportConfig;
use blockview_graph::{BlockMode, FontMetrics, LayoutConfig, RenderOptions, Theme};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Settings I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("No configuration directory on this platform")]
    NoConfigDir,
}

/// Everything the views need at construction time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewSettings {
    pub show_address: bool,
    pub layout: LayoutConfig,
    pub font: FontMetrics,
    /// Monospace TTF/OTF used for exported images and, when set, for metrics.
    pub font_path: Option<PathBuf>,
    #[serde(default = "default_font_size")]
    pub font_size: f32,
    pub theme: Theme,
    pub viewport: ViewportConfig,
    #[serde(default = "default_edge_tolerance")]
    pub edge_tolerance: f32,
}

fn default_font_size() -> f32 {
    13.0
}

fn default_edge_tolerance() -> f32 {
    4.0
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            show_address: true,
            layout: LayoutConfig::default(),
            font: FontMetrics::default(),
            font_path: None,
            font_size: default_font_size(),
            theme: Theme::default(),
            viewport: ViewportConfig::default(),
            edge_tolerance: default_edge_tolerance(),
        }
    }
}

impl ViewSettings {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("blockview").join("settings.json"))
    }

    /// Load from the platform config directory, falling back to defaults.
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_or_default(&path),
            None => {
                tracing::info!("No config directory, using default settings");
                Self::default()
            }
        }
    }

    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            tracing::info!("Settings file {:?} not found, using defaults", path);
            return Self::default();
        }
        match Self::load_from(path) {
            Ok(settings) => {
                tracing::info!("Settings loaded from {:?}", path);
                settings
            }
            Err(e) => {
                tracing::error!("{}; using defaults", e);
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self) -> Result<PathBuf, SettingsError> {
        let path = Self::default_path().ok_or(SettingsError::NoConfigDir)?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// The configured font, if one is set and loads.
    pub fn load_font(&self) -> Option<fontdue::Font> {
        let path = self.font_path.as_ref()?;
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Failed to read font {:?}: {}", path, e);
                return None;
            }
        };
        match fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default()) {
            Ok(font) => Some(font),
            Err(e) => {
                tracing::warn!("Failed to parse font {:?}: {}", path, e);
                None
            }
        }
    }

    /// Metrics from the configured font, or the explicit metrics.
    pub fn resolved_metrics(&self) -> FontMetrics {
        self.load_font()
            .map(|font| FontMetrics::from_font(&font, self.font_size))
            .unwrap_or(self.font)
    }

    pub fn render_options(&self, mode: BlockMode) -> RenderOptions {
        RenderOptions {
            metrics: self.resolved_metrics(),
            show_address: self.show_address,
            mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut settings = ViewSettings::default();
        settings.show_address = false;
        settings.layout.node_spacing = 64.0;
        settings.save_to(&path).unwrap();

        let loaded = ViewSettings::load_from(&path).unwrap();
        assert!(!loaded.show_address);
        assert_eq!(loaded.layout.node_spacing, 64.0);
        assert_eq!(loaded.viewport.min_scale, ViewportConfig::default().min_scale);
    }

    #[test]
    fn test_malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(ViewSettings::load_from(&path), Err(SettingsError::Parse(_))));
        let settings = ViewSettings::load_or_default(&path);
        assert!(settings.show_address);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = ViewSettings::load_or_default(&dir.path().join("absent.json"));
        assert_eq!(settings.font_size, 13.0);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let settings: ViewSettings = serde_json::from_str(r#"{"viewport": {"lod_threshold": 0.5}}"#).unwrap();
        assert_eq!(settings.viewport.lod_threshold, 0.5);
        assert_eq!(settings.viewport.min_scale, 0.015);
        assert_eq!(settings.edge_tolerance, 4.0);
    }

    #[test]
    fn test_render_options_without_font() {
        let settings = ViewSettings::default();
        let options = settings.render_options(BlockMode::Linear);
        assert_eq!(options.metrics, FontMetrics::default());
        assert_eq!(options.mode, BlockMode::Linear);
    }
}
