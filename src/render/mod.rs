mod config;
mod globe;
mod html;
mod plotly;
mod svg;

pub use config::{
    FontConfig, GeoConfig, LegendConfig, ProjectionConfig, ProjectionKind, RenderConfig,
    Rotation, StrokeConfig, TitleConfig,
};
pub use globe::{walk_great_circle, GlobeViewport};
pub use html::render_html;
pub use plotly::{build_figure, ChoroplethTrace, Figure};
pub use svg::render_svg;

use crate::classify::ClassificationScheme;
use crate::error::{PipelineError, Result};
use crate::features::FeatureCollection;
use crate::palette::Rgb;
use log::info;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// The rendered artifacts, held in memory until written
#[derive(Debug, Clone)]
pub struct RenderOutput {
    pub html: String,
    pub svg: Option<String>,
}

/// Reject inputs the renderer cannot draw faithfully. Runs before any
/// output is produced.
pub fn validate(
    collection: &FeatureCollection,
    scheme: &ClassificationScheme,
    colors: &[Rgb],
) -> Result<()> {
    if collection.is_empty() {
        return Err(PipelineError::Render("feature collection is empty".into()));
    }
    if colors.len() != scheme.len() {
        return Err(PipelineError::Render(format!(
            "palette has {} colors for {} intervals",
            colors.len(),
            scheme.len()
        )));
    }
    let unique: HashSet<&Rgb> = colors.iter().collect();
    if unique.len() != colors.len() {
        return Err(PipelineError::Render("palette repeats a color".into()));
    }
    for record in &collection.records {
        match record.interval {
            Some(i) if i < scheme.len() => {}
            Some(i) => {
                return Err(PipelineError::Render(format!(
                    "'{}' assigned to interval {} of {}",
                    record.name,
                    i,
                    scheme.len()
                )))
            }
            None => {
                return Err(PipelineError::Render(format!(
                    "'{}' has not been classified",
                    record.name
                )))
            }
        }
        if record.multi_polygon().is_none() {
            return Err(PipelineError::Render(format!(
                "'{}' has no polygon geometry",
                record.name
            )));
        }
    }
    Ok(())
}

/// Validate, then build the interactive page and optionally the SVG snapshot
pub fn render(
    collection: &FeatureCollection,
    scheme: &ClassificationScheme,
    config: &RenderConfig,
    snapshot: bool,
) -> Result<RenderOutput> {
    let colors = config
        .palette
        .colors(scheme.len())
        .map_err(PipelineError::Render)?;
    validate(collection, scheme, &colors)?;

    let figure = build_figure(collection, scheme, &colors, config);
    let html = render_html(&figure, &config.title.text)
        .map_err(|e| PipelineError::Render(format!("{e:#}")))?;
    let svg = snapshot.then(|| render_svg(collection, scheme, &colors, config));

    info!(
        "Rendered {} records in {} legend entries",
        collection.len(),
        figure.data.len()
    );
    Ok(RenderOutput { html, svg })
}

/// Write `{stem}.html` (and `{stem}.svg`) into `dir`
pub fn write_outputs(output: &RenderOutput, dir: &Path, stem: &str) -> Result<Vec<PathBuf>> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| PipelineError::Io { path, source }
    };

    fs::create_dir_all(dir).map_err(io_err(dir))?;
    let mut written = Vec::new();

    let html_path = dir.join(format!("{stem}.html"));
    fs::write(&html_path, &output.html).map_err(io_err(&html_path))?;
    written.push(html_path);

    if let Some(svg) = &output.svg {
        let svg_path = dir.join(format!("{stem}.svg"));
        fs::write(&svg_path, svg).map_err(io_err(&svg_path))?;
        written.push(svg_path);
    }

    for path in &written {
        info!("Wrote {:?}", path);
    }
    Ok(written)
}
