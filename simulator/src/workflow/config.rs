use crate::generator::scenario::MockScenario;
use anyhow::Context;
use ecobotcore::detection::DEFAULT_MAX_UPLOAD_BYTES;
use ecobotcore::overlay::CategoryPalette;
use ecobotcore::prelude::BackendConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Artificial processing time before the mock answers.
    pub delay_ms: u64,
    pub max_upload_bytes: u64,
    pub min_confidence: f32,
    pub bind_address: String,
    /// Layout used for offline renders: the image is shown at most this
    /// wide and this tall, centered horizontally.
    pub container_width: f32,
    pub max_display_height: f32,
    pub output_dir: PathBuf,
    pub font_path: Option<PathBuf>,
    /// `class -> #RRGGBB` overrides; `fallback` replaces the fallback color.
    pub palette: BTreeMap<String, String>,
    pub scenario: MockScenario,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            delay_ms: 2000,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            min_confidence: 0.0,
            bind_address: "127.0.0.1:9000".into(),
            container_width: 800.0,
            max_display_height: 500.0,
            output_dir: PathBuf::from("tools/data"),
            font_path: None,
            palette: BTreeMap::new(),
            scenario: MockScenario::default(),
        }
    }
}

impl SimulatorConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading simulator config {}", path_ref.display()))?;
        let config: SimulatorConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing simulator config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn to_backend_config(&self) -> BackendConfig {
        BackendConfig {
            max_upload_bytes: self.max_upload_bytes,
            min_confidence: self.min_confidence,
        }
    }

    pub fn category_palette(&self) -> anyhow::Result<CategoryPalette> {
        CategoryPalette::default()
            .with_overrides(&self.palette)
            .context("applying palette overrides")
    }

    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        self.bind_address
            .parse()
            .with_context(|| format!("parsing bind address {}", self.bind_address))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_match_demo_behaviour() {
        let cfg = SimulatorConfig::default();
        assert_eq!(cfg.delay(), Duration::from_secs(2));
        assert_eq!(cfg.to_backend_config().max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(cfg.bind_addr().unwrap().port(), 9000);
    }

    #[test]
    fn config_load_reads_yaml_with_defaults() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(
            b"delay_ms: 0\nmin_confidence: 0.8\npalette:\n  debris: \"#123456\"\nscenario:\n  seed: 7\n",
        )
        .unwrap();
        let path = temp.into_temp_path();
        let cfg = SimulatorConfig::load(&path).unwrap();
        assert_eq!(cfg.delay_ms, 0);
        assert_eq!(cfg.scenario.seed, Some(7));
        assert_eq!(cfg.container_width, 800.0);
        let palette = cfg.category_palette().unwrap();
        assert_eq!(palette.color_for("debris").to_string(), "#123456");
    }

    #[test]
    fn bad_palette_entry_is_a_config_error() {
        let cfg = SimulatorConfig {
            palette: [("bottle".to_string(), "red".to_string())].into_iter().collect(),
            ..Default::default()
        };
        assert!(cfg.category_palette().is_err());
    }
}
