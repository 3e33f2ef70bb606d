use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

// How snapshot files are named on disk
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct SnapshotConfig {
    #[serde(default = "default_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default = "default_digits")]
    pub digits: usize,
    #[serde(default = "default_extension")]
    pub extension: String,
}

// Figure layout and colours
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct RenderConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_colormap")]
    pub colormap: String,
    #[serde(default = "default_vorticity_colormap")]
    pub vorticity_colormap: String,
    /// `None` lets the geometry decide (polar plots use equal aspect).
    #[serde(default)]
    pub equal_aspect: Option<bool>,
    /// "auto", "native" or "polar"
    #[serde(default = "default_projection")]
    pub projection: String,
    #[serde(default = "default_background")]
    pub background: String,
}

// Derived vorticity field
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct VorticityConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_vx1")]
    pub vx1: String,
    #[serde(default = "default_vx2")]
    pub vx2: String,
    #[serde(default = "default_vorticity_name")]
    pub name: String,
}

// Where figures are written
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct OutputConfig {
    #[serde(default = "default_output_directory")]
    pub directory: PathBuf,
    #[serde(default)]
    pub sheet: bool,
    #[serde(default = "default_sheet_columns")]
    pub sheet_columns: u32,
    /// Restrict plotting to these fields (empty = all fields in file order).
    #[serde(default)]
    pub fields: Vec<String>,
}

// Main plot configuration structure, loaded from a TOML file.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct PlotConfig {
    #[serde(default)]
    pub snapshot: SnapshotConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub vorticity: VorticityConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        SnapshotConfig {
            directory: default_directory(),
            prefix: default_prefix(),
            digits: default_digits(),
            extension: default_extension(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            width: default_width(),
            height: default_height(),
            colormap: default_colormap(),
            vorticity_colormap: default_vorticity_colormap(),
            equal_aspect: None,
            projection: default_projection(),
            background: default_background(),
        }
    }
}

impl Default for VorticityConfig {
    fn default() -> Self {
        VorticityConfig {
            enabled: false,
            vx1: default_vx1(),
            vx2: default_vx2(),
            name: default_vorticity_name(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            directory: default_output_directory(),
            sheet: false,
            sheet_columns: default_sheet_columns(),
            fields: Vec::new(),
        }
    }
}

impl PlotConfig {
    /// Loads the plot configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();

        let config_str = std::fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: path_ref.to_path_buf(),
            source,
        })?;
        let config: PlotConfig = toml::from_str(&config_str).map_err(|source| ConfigError::Parse {
            path: path_ref.to_path_buf(),
            source,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.snapshot.digits == 0 {
            return Err(ConfigError::Invalid("snapshot.digits must be greater than 0.".into()));
        }
        if self.snapshot.prefix.is_empty() {
            return Err(ConfigError::Invalid("snapshot.prefix must not be empty.".into()));
        }
        if self.render.width < MIN_FIGURE_SIZE || self.render.height < MIN_FIGURE_SIZE {
            return Err(ConfigError::Invalid(format!(
                "render.width and render.height must be at least {} pixels.",
                MIN_FIGURE_SIZE
            )));
        }
        if self.output.sheet_columns == 0 {
            return Err(ConfigError::Invalid("output.sheet_columns must be greater than 0.".into()));
        }
        if !matches!(self.render.projection.as_str(), "auto" | "native" | "polar") {
            return Err(ConfigError::Invalid(format!(
                "render.projection must be one of auto, native, polar (got '{}').",
                self.render.projection
            )));
        }
        if self.vorticity.enabled && self.vorticity.vx1 == self.vorticity.vx2 {
            return Err(ConfigError::Invalid("vorticity.vx1 and vorticity.vx2 must differ.".into()));
        }
        Ok(())
    }
}

/// Smallest figure edge that still leaves room for axes and the colour bar.
pub const MIN_FIGURE_SIZE: u32 = 240;

fn default_directory() -> PathBuf {
    PathBuf::from(".")
}

fn default_prefix() -> String {
    "data".to_string()
}

fn default_digits() -> usize {
    4
}

fn default_extension() -> String {
    "vtk".to_string()
}

fn default_width() -> u32 {
    640
}

fn default_height() -> u32 {
    480
}

fn default_colormap() -> String {
    "viridis".to_string()
}

fn default_vorticity_colormap() -> String {
    "bwr".to_string()
}

fn default_projection() -> String {
    "auto".to_string()
}

fn default_background() -> String {
    "white".to_string()
}

fn default_vx1() -> String {
    "VX1".to_string()
}

fn default_vx2() -> String {
    "VX2".to_string()
}

fn default_vorticity_name() -> String {
    "omega_z".to_string()
}

fn default_output_directory() -> PathBuf {
    PathBuf::from("plots")
}

fn default_sheet_columns() -> u32 {
    2
}
