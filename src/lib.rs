//! Population choropleth maps on an orthographic globe, built from Natural
//! Earth country boundaries.

pub mod classify;
pub mod config;
pub mod data;
pub mod error;
pub mod features;
pub mod palette;
pub mod pipeline;
pub mod render;
pub mod repair;
pub mod wrangle;

pub use config::AppConfig;
pub use error::{PipelineError, Result};
pub use pipeline::{Pipeline, RunSummary};
