// src/config.rs - Segmentation run configuration

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::adjacency::MAX_RADIUS;
use crate::errors::{IftError, Result};

/// Configuration for the IFT segmentation tool
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub input_path: String,
    pub output_base_dir: String,

    /// Seed file; `None` seeds the watershed at the gradient's local minima
    #[serde(default)]
    pub seeds_path: Option<String>,

    #[serde(default = "default_method")]
    pub method: SegmentationMethod,

    #[serde(default = "default_adjacency_radius")]
    pub adjacency_radius: f64,

    // Oriented watershed
    #[serde(default = "default_alpha")]
    pub alpha: f64,

    // Edge-max regions
    #[serde(default)]
    pub force_root: bool,

    /// Live-wire end point as `[x, y]`
    #[serde(default)]
    pub live_wire_target: Option<[usize; 2]>,

    #[serde(default = "default_parallel")]
    pub use_parallel: bool,

    #[serde(default = "default_write_csv")]
    pub write_csv: bool,
}

/// Segmentation operator run on every image
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SegmentationMethod {
    Watershed,
    LiveWire,
    EdgeMax,
    Oriented,
}

impl SegmentationMethod {
    pub fn name(&self) -> &'static str {
        match self {
            SegmentationMethod::Watershed => "watershed",
            SegmentationMethod::LiveWire => "live_wire",
            SegmentationMethod::EdgeMax => "edge_max",
            SegmentationMethod::Oriented => "oriented",
        }
    }

    /// Whether the method cannot run without a seed file
    pub fn needs_seeds(&self) -> bool {
        !matches!(self, SegmentationMethod::Watershed)
    }
}

fn default_method() -> SegmentationMethod {
    SegmentationMethod::Watershed
}

fn default_adjacency_radius() -> f64 {
    1.5
}

fn default_alpha() -> f64 {
    0.5
}

fn default_parallel() -> bool {
    true
}

fn default_write_csv() -> bool {
    true
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            IftError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| IftError::ConfigLoad {
            source: e,
            path: path.to_path_buf(),
        })?;

        Ok(config)
    }

    /// Create default configuration
    pub fn default() -> Self {
        Self {
            input_path: "./input".to_string(),
            output_base_dir: "./output".to_string(),
            seeds_path: None,
            method: default_method(),
            adjacency_radius: default_adjacency_radius(),
            alpha: default_alpha(),
            force_root: false,
            live_wire_target: None,
            use_parallel: true,
            write_csv: true,
        }
    }

    /// Check parameter ranges without touching the filesystem
    pub fn check(&self) -> Result<()> {
        if !(1.0..=MAX_RADIUS).contains(&self.adjacency_radius) {
            return Err(IftError::Config(format!(
                "adjacency_radius must be between 1.0 and {}",
                MAX_RADIUS
            )));
        }

        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(IftError::Config(
                "alpha must be between 0.0 and 1.0".to_string(),
            ));
        }

        if self.method.needs_seeds() && self.seeds_path.is_none() {
            return Err(IftError::Config(format!(
                "method '{}' requires seeds_path",
                self.method.name()
            )));
        }

        if self.live_wire_target.is_some() && self.method != SegmentationMethod::LiveWire {
            log::warn!(
                "live_wire_target is ignored by method '{}'",
                self.method.name()
            );
        }

        Ok(())
    }

    /// Validate configuration and create the output directory
    pub fn validate(&self) -> Result<()> {
        let input_path = PathBuf::from(&self.input_path);
        if !input_path.exists() {
            return Err(IftError::InvalidPath(input_path));
        }

        if let Some(seeds_path) = &self.seeds_path {
            let seeds_path = PathBuf::from(seeds_path);
            if !seeds_path.is_file() {
                return Err(IftError::InvalidPath(seeds_path));
            }
        }

        self.check()?;

        fs::create_dir_all(&self.output_base_dir)?;

        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| {
            IftError::Config(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(path, content)?;

        Ok(())
    }
}
