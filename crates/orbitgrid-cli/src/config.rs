use std::path::{Path, PathBuf};

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Default, PartialEq)]
pub(crate) struct AppConfig {
    #[serde(default)]
    pub timeline: TimelineConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub(crate) struct TimelineConfig {
    /// Width of one bar cell in the arrangement view
    pub cell_pixel_width: f64,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self { cell_pixel_width: 40.0 }
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub(crate) struct TransportConfig {
    /// How close (in bars) a press must be to grab a loop handle
    pub handle_tolerance_bars: f64,
    pub pixels_per_bar: f64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            handle_tolerance_bars: 0.25,
            pixels_per_bar: 40.0,
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub(crate) struct LoggingConfig {
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "orbitgrid=info".to_string(),
        }
    }
}

pub(crate) fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("orbitgrid")
        .join("config.toml")
}

/// Missing or unreadable files fall back to defaults
pub(crate) fn load_config(path: Option<&Path>) -> AppConfig {
    let path = path.map(Path::to_path_buf).unwrap_or_else(config_path);
    std::fs::read_to_string(&path)
        .ok()
        .and_then(|s| toml::from_str(&s).ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(Some(&dir.path().join("nope.toml")));
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[timeline]\ncell_pixel_width = 24.0\n").unwrap();

        let config = load_config(Some(&path));
        assert_eq!(config.timeline.cell_pixel_width, 24.0);
        assert_eq!(config.transport, TransportConfig::default());
        assert_eq!(config.logging.filter, "orbitgrid=info");
    }

    #[test]
    fn test_malformed_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[timeline\ncell_pixel_width = ").unwrap();
        assert_eq!(load_config(Some(&path)), AppConfig::default());
    }
}
