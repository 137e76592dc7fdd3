use crate::data::DatasetSource;
use crate::render::RenderConfig;
use crate::repair::{RecordLocator, RepairTarget};
use crate::wrangle::Selection;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub source: SourceConfig,
    pub selection: Selection,
    pub repair: Vec<RepairTarget>,
    pub classification: ClassificationConfig,
    pub render: RenderConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    #[serde(flatten)]
    pub dataset: DatasetSource,
    pub cache_dir: PathBuf,
    /// Download even when a cached copy exists
    pub refresh: bool,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationConfig {
    pub classes: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,
    pub stem: String,
    /// Also write a static SVG globe next to the HTML page
    pub svg_snapshot: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            selection: Selection::default(),
            repair: vec![RepairTarget {
                locator: RecordLocator::Name("Russia".to_string()),
                min_hole_area_km2: 1000.0,
            }],
            classification: ClassificationConfig::default(),
            render: RenderConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            dataset: DatasetSource::default(),
            cache_dir: std::env::temp_dir().join("globe-choropleth"),
            refresh: false,
            timeout_secs: 60,
        }
    }
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self { classes: 8 }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("output"),
            stem: "population_globe".to_string(),
            svg_snapshot: true,
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).with_context(|| "Failed to parse TOML configuration")
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}
