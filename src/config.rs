// config.rs — 运行配置 (分辨率 / 控制方式 / 地图资源 / 光照)
//
// Loaded from a JSON file; every field falls back to its default, so a partial
// file (or none at all) is valid.
//
// Lookup:
// - CLI: --config <path>
// - Env: GLOBE_CONFIG
// - CLI: --map <path> (repeatable, appended to map_assets)

use crate::error::{GlobeError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Latitude/longitude grid divisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub struct GridResolution {
    /// Longitude divisions.
    pub slices: u32,
    /// Latitude divisions.
    pub stacks: u32,
}

impl GridResolution {
    pub const fn new(slices: u32, stacks: u32) -> Self {
        Self { slices, stacks }
    }

    pub fn validate(&self, what: &str) -> Result<()> {
        if self.slices == 0 || self.stacks == 0 {
            return Err(GlobeError::Configuration(format!(
                "{what} must have positive slices and stacks, got {}x{}",
                self.slices, self.stacks
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlScheme {
    Keyboard,
    MouseDrag,
    Both,
}

impl ControlScheme {
    pub fn keyboard(self) -> bool {
        matches!(self, ControlScheme::Keyboard | ControlScheme::Both)
    }

    pub fn mouse(self) -> bool {
        matches!(self, ControlScheme::MouseDrag | ControlScheme::Both)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReprojectionConfig {
    pub width: u32,
    pub height: u32,
    /// Sampling granularity, independent of the output size.
    pub reference: GridResolution,
}

impl Default for ReprojectionConfig {
    fn default() -> Self {
        Self {
            width: 256,
            height: 128,
            reference: GridResolution::new(200, 200),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GlobeConfig {
    pub resolution: GridResolution,
    pub radius: f32,
    pub control_scheme: ControlScheme,
    pub map_assets: Vec<PathBuf>,
    pub enable_sun_light: bool,
    pub sun_step_deg: f64,
    pub spin_deg_per_tick: f64,
    pub key_step_deg: f64,
    pub mouse_sensitivity: f64,
    pub reprojection: ReprojectionConfig,
}

impl Default for GlobeConfig {
    fn default() -> Self {
        Self {
            resolution: GridResolution::new(200, 100),
            radius: 1.0,
            control_scheme: ControlScheme::Both,
            map_assets: Vec::new(),
            enable_sun_light: true,
            sun_step_deg: 1.5,
            spin_deg_per_tick: 0.0,
            key_step_deg: 5.0,
            mouse_sensitivity: 0.1,
            reprojection: ReprojectionConfig::default(),
        }
    }
}

impl GlobeConfig {
    pub fn from_json(text: &str, path: &Path) -> Result<Self> {
        let config: GlobeConfig =
            serde_json::from_str(text).map_err(|source| GlobeError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| GlobeError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text, path)
    }

    /// Resolve config from CLI/env, then append any `--map` arguments.
    pub fn from_args(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let args: Vec<String> = args.into_iter().collect();

        let mut config_path = None;
        let mut maps = Vec::new();
        let mut it = args.iter();
        while let Some(a) = it.next() {
            match a.as_str() {
                "--config" => config_path = it.next().map(PathBuf::from),
                "--map" => {
                    if let Some(v) = it.next() {
                        maps.push(PathBuf::from(v));
                    }
                }
                _ => {}
            }
        }

        if config_path.is_none() {
            if let Ok(v) = std::env::var("GLOBE_CONFIG") {
                if !v.trim().is_empty() {
                    config_path = Some(PathBuf::from(v));
                }
            }
        }

        let mut config = match config_path {
            Some(p) => Self::load(&p)?,
            None => Self::default(),
        };
        config.map_assets.extend(maps);
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.resolution.validate("sphere resolution")?;
        self.reprojection.reference.validate("reprojection reference grid")?;
        if self.reprojection.width == 0 || self.reprojection.height == 0 {
            return Err(GlobeError::Configuration(format!(
                "reprojection output must be non-empty, got {}x{}",
                self.reprojection.width, self.reprojection.height
            )));
        }
        if !(self.radius > 0.0) {
            return Err(GlobeError::Configuration(format!(
                "sphere radius must be positive, got {}",
                self.radius
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = GlobeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.resolution, GridResolution::new(200, 100));
        assert_eq!(config.reprojection.reference, GridResolution::new(200, 200));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let text = r#"{ "control_scheme": "mouse_drag", "resolution": { "slices": 64, "stacks": 32 } }"#;
        let config = GlobeConfig::from_json(text, Path::new("test.json")).unwrap();
        assert_eq!(config.control_scheme, ControlScheme::MouseDrag);
        assert_eq!(config.resolution, GridResolution::new(64, 32));
        assert!((config.key_step_deg - 5.0).abs() < 1e-12);
        assert!(config.enable_sun_light);
    }

    #[test]
    fn zero_resolution_is_rejected() {
        let text = r#"{ "resolution": { "slices": 0, "stacks": 32 } }"#;
        let err = GlobeConfig::from_json(text, Path::new("test.json")).unwrap_err();
        assert!(matches!(err, GlobeError::Configuration(_)));
    }

    #[test]
    fn zero_output_size_is_rejected() {
        let mut config = GlobeConfig::default();
        config.reprojection.height = 0;
        assert!(matches!(config.validate(), Err(GlobeError::Configuration(_))));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = GlobeConfig::from_json("{ not json", Path::new("bad.json")).unwrap_err();
        assert!(matches!(err, GlobeError::ConfigParse { .. }));
    }

    #[test]
    fn map_arguments_are_appended() {
        let args = ["globe", "--map", "a.jpg", "--lang", "en", "--map", "b.png"]
            .iter()
            .map(|s| s.to_string());
        let config = GlobeConfig::from_args(args).unwrap();
        assert_eq!(
            config.map_assets,
            vec![PathBuf::from("a.jpg"), PathBuf::from("b.png")]
        );
    }

    #[test]
    fn control_scheme_flags() {
        assert!(ControlScheme::Both.keyboard() && ControlScheme::Both.mouse());
        assert!(!ControlScheme::Keyboard.mouse());
        assert!(!ControlScheme::MouseDrag.keyboard());
    }
}
