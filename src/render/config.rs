use crate::palette::PaletteConfig;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectionKind {
    Orthographic,
    NaturalEarth,
    Equirectangular,
}

impl ProjectionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProjectionKind::Orthographic => "orthographic",
            ProjectionKind::NaturalEarth => "natural earth",
            ProjectionKind::Equirectangular => "equirectangular",
        }
    }
}

/// Globe orientation in degrees
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rotation {
    pub lon: f64,
    pub lat: f64,
    pub roll: f64,
}

impl Default for Rotation {
    fn default() -> Self {
        Self {
            lon: 30.0,
            lat: 20.0,
            roll: 0.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    pub kind: ProjectionKind,
    pub rotation: Rotation,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            kind: ProjectionKind::Orthographic,
            rotation: Rotation::default(),
        }
    }
}

/// Base map layers drawn under the choropleth
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoConfig {
    pub projection: ProjectionConfig,
    pub show_land: bool,
    pub land_color: String,
    pub show_ocean: bool,
    pub ocean_color: String,
    pub show_lakes: bool,
    pub lake_color: String,
    pub show_coastlines: bool,
    pub coastline_color: String,
    pub show_frame: bool,
    pub show_grid: bool,
    pub grid_color: String,
    pub bg_color: String,
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            projection: ProjectionConfig::default(),
            show_land: true,
            land_color: "#f2f2f2".to_string(),
            show_ocean: true,
            ocean_color: "#d6e9f5".to_string(),
            show_lakes: false,
            lake_color: "#d6e9f5".to_string(),
            show_coastlines: false,
            coastline_color: "#ffffff".to_string(),
            show_frame: false,
            show_grid: true,
            grid_color: "#c5d8e6".to_string(),
            bg_color: "#ffffff".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    pub family: String,
    pub size: f64,
    pub color: String,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            family: "Helvetica, Arial, sans-serif".to_string(),
            size: 12.0,
            color: "#3f3f3f".to_string(),
        }
    }
}

/// Legend position in paper coordinates (0..1)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegendConfig {
    pub x: f64,
    pub y: f64,
    pub x_anchor: String,
    pub y_anchor: String,
    pub title: String,
    pub font: FontConfig,
    pub bg_color: String,
    pub border_color: String,
    pub border_width: f64,
}

impl Default for LegendConfig {
    fn default() -> Self {
        Self {
            x: 0.02,
            y: 0.5,
            x_anchor: "left".to_string(),
            y_anchor: "middle".to_string(),
            title: "Population (millions)".to_string(),
            font: FontConfig::default(),
            bg_color: "rgba(255,255,255,0)".to_string(),
            border_color: "rgba(255,255,255,0)".to_string(),
            border_width: 0.0,
        }
    }
}

/// Title annotation anchored in paper coordinates
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TitleConfig {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub x_anchor: String,
    pub y_anchor: String,
    pub font: FontConfig,
}

impl Default for TitleConfig {
    fn default() -> Self {
        Self {
            text: "World population by country".to_string(),
            x: 0.5,
            y: 0.97,
            x_anchor: "center".to_string(),
            y_anchor: "top".to_string(),
            font: FontConfig {
                size: 22.0,
                ..FontConfig::default()
            },
        }
    }
}

/// Country boundary line
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrokeConfig {
    pub color: String,
    pub width: f64,
}

impl Default for StrokeConfig {
    fn default() -> Self {
        Self {
            color: "#ffffff".to_string(),
            width: 0.5,
        }
    }
}

/// Everything the renderer needs besides the data
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub geo: GeoConfig,
    pub legend: LegendConfig,
    pub title: TitleConfig,
    pub stroke: StrokeConfig,
    pub palette: PaletteConfig,
    pub show_toolbar: bool,
    pub width: u32,
    pub height: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            geo: GeoConfig::default(),
            legend: LegendConfig::default(),
            title: TitleConfig::default(),
            stroke: StrokeConfig::default(),
            palette: PaletteConfig::default(),
            show_toolbar: false,
            width: 900,
            height: 700,
        }
    }
}
