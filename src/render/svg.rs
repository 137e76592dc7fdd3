use super::config::RenderConfig;
use super::globe::{limb_arc, walk_great_circle, GlobeViewport};
use super::html::escape_html;
use crate::classify::ClassificationScheme;
use crate::features::FeatureCollection;
use crate::palette::Rgb;
use geo::{Coord, LineString};
use rayon::prelude::*;
use std::fmt::Write;

/// Edge subdivision step in degrees
const EDGE_STEP_DEG: f64 = 2.0;
const GRATICULE_STEP_DEG: f64 = 30.0;
const MARGIN: f64 = 20.0;

/// Project a closed ring onto the globe. Stretches behind the horizon are
/// replaced by arcs along the limb so the ring stays closed.
pub fn ring_path(globe: &GlobeViewport, ring: &LineString<f64>) -> Option<String> {
    let coords: Vec<Coord<f64>> = ring.coords().copied().collect();
    if coords.len() < 3 {
        return None;
    }

    // densify along great circles, tracking visibility per point
    let mut points: Vec<(f64, f64, bool)> = Vec::with_capacity(coords.len() * 2);
    let mut push = |lon: f64, lat: f64| {
        points.push((lon, lat, globe.depth(lon, lat) >= 0.0));
    };
    push(coords[0].x, coords[0].y);
    for pair in coords.windows(2) {
        walk_great_circle(pair[0].x, pair[0].y, pair[1].x, pair[1].y, EDGE_STEP_DEG, &mut push);
    }

    if points.iter().all(|p| !p.2) {
        return None;
    }

    let mut screen: Vec<(f64, f64)> = Vec::with_capacity(points.len());
    let mut hidden_from: Option<(f64, f64)> = None;
    for &(lon, lat, visible) in &points {
        if visible {
            let p = globe.project(lon, lat).unwrap_or_else(|| globe.project_to_limb(lon, lat));
            if let Some(exit) = hidden_from.take() {
                let entry = globe.project_to_limb(lon, lat);
                screen.push(exit);
                screen.extend(limb_arc(globe, exit, entry));
                screen.push(entry);
            }
            screen.push(p);
        } else if hidden_from.is_none() {
            hidden_from = Some(globe.project_to_limb(lon, lat));
        }
    }
    if let Some(exit) = hidden_from {
        // ring ends behind the horizon: walk the limb back to the start
        if let Some(&first) = screen.first() {
            screen.push(exit);
            screen.extend(limb_arc(globe, exit, first));
        }
    }

    let mut d = String::new();
    for (i, (x, y)) in screen.iter().enumerate() {
        let cmd = if i == 0 { 'M' } else { 'L' };
        let _ = write!(d, "{cmd}{x:.1},{y:.1}");
    }
    d.push('Z');
    Some(d)
}

/// Open polyline on the visible hemisphere, split where it crosses the horizon
fn polyline_paths(globe: &GlobeViewport, line: &[(f64, f64)]) -> String {
    let mut d = String::new();
    let mut drawing = false;
    for &(lon, lat) in line {
        match globe.project(lon, lat) {
            Some((x, y)) => {
                let cmd = if drawing { 'L' } else { 'M' };
                let _ = write!(d, "{cmd}{x:.1},{y:.1}");
                drawing = true;
            }
            None => drawing = false,
        }
    }
    d
}

fn text_anchor(anchor: &str) -> &'static str {
    match anchor {
        "left" => "start",
        "right" => "end",
        _ => "middle",
    }
}

/// Static orthographic snapshot of the choropleth, with `<title>` tooltips
pub fn render_svg(
    collection: &FeatureCollection,
    scheme: &ClassificationScheme,
    colors: &[Rgb],
    config: &RenderConfig,
) -> String {
    let width = config.width as f64;
    let height = config.height as f64;
    let geo = &config.geo;
    let globe = GlobeViewport::fit(&geo.projection.rotation, width, height, MARGIN);
    let (cx, cy) = globe.center();

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = config.width,
        h = config.height,
    );
    let _ = writeln!(svg, r#"<rect width="100%" height="100%" fill="{}"/>"#, geo.bg_color);

    let sphere_fill = if geo.show_ocean {
        &geo.ocean_color
    } else if geo.show_land {
        &geo.land_color
    } else {
        &geo.bg_color
    };
    let _ = writeln!(
        svg,
        r#"<circle cx="{cx:.1}" cy="{cy:.1}" r="{r:.1}" fill="{sphere_fill}"/>"#,
        r = globe.radius,
    );

    if geo.show_grid {
        let _ = writeln!(
            svg,
            r#"<g fill="none" stroke="{}" stroke-width="0.5">"#,
            geo.grid_color
        );
        for line in GlobeViewport::graticule(GRATICULE_STEP_DEG) {
            let d = polyline_paths(&globe, &line);
            if !d.is_empty() {
                let _ = writeln!(svg, r#"<path d="{d}"/>"#);
            }
        }
        svg.push_str("</g>\n");
    }

    // countries, projected in parallel
    let paths: Vec<String> = collection
        .records
        .par_iter()
        .filter_map(|record| {
            let interval = record.interval?;
            let mp = record.multi_polygon()?;
            let mut d = String::new();
            for polygon in mp.iter() {
                for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
                    if let Some(part) = ring_path(&globe, ring) {
                        d.push_str(&part);
                    }
                }
            }
            if d.is_empty() {
                return None;
            }
            let tooltip = record.hover_text.as_deref().unwrap_or(&record.name);
            Some(format!(
                r#"<path d="{d}" fill="{fill}" fill-rule="evenodd"><title>{title}</title></path>"#,
                fill = colors[interval].to_hex(),
                title = escape_html(tooltip),
            ))
        })
        .collect();

    let _ = writeln!(
        svg,
        r#"<g stroke="{}" stroke-width="{}" stroke-linejoin="round">"#,
        config.stroke.color, config.stroke.width
    );
    for path in paths {
        svg.push_str(&path);
        svg.push('\n');
    }
    svg.push_str("</g>\n");

    write_legend(&mut svg, scheme, colors, config);

    let title = &config.title;
    let _ = writeln!(
        svg,
        r#"<text x="{x:.1}" y="{y:.1}" text-anchor="{anchor}" dominant-baseline="hanging" font-family="{family}" font-size="{size}" fill="{color}">{text}</text>"#,
        x = title.x * width,
        y = (1.0 - title.y) * height,
        anchor = text_anchor(&title.x_anchor),
        family = escape_html(&title.font.family),
        size = title.font.size,
        color = title.font.color,
        text = escape_html(&title.text),
    );

    svg.push_str("</svg>\n");
    svg
}

/// Swatches and labels, highest interval first
fn write_legend(svg: &mut String, scheme: &ClassificationScheme, colors: &[Rgb], config: &RenderConfig) {
    let legend = &config.legend;
    let row = legend.font.size * 1.6;
    let rows = scheme.len() as f64 + 1.0;
    let x = legend.x * config.width as f64;
    let mut y = (1.0 - legend.y) * config.height as f64;
    y -= match legend.y_anchor.as_str() {
        "middle" => rows * row / 2.0,
        "bottom" => rows * row,
        _ => 0.0,
    };

    let _ = writeln!(
        svg,
        r#"<g font-family="{}" font-size="{}" fill="{}">"#,
        escape_html(&legend.font.family),
        legend.font.size,
        legend.font.color
    );
    let _ = writeln!(svg, r#"<text x="{x:.1}" y="{:.1}">{}</text>"#, y + row * 0.8, escape_html(&legend.title));
    for (slot, interval) in (0..scheme.len()).rev().enumerate() {
        let top = y + row * (slot as f64 + 1.0);
        let _ = writeln!(
            svg,
            r#"<rect x="{x:.1}" y="{top:.1}" width="{s:.1}" height="{s:.1}" fill="{fill}"/><text x="{tx:.1}" y="{ty:.1}">{label}</text>"#,
            s = legend.font.size,
            fill = colors[interval].to_hex(),
            tx = x + legend.font.size * 1.5,
            ty = top + legend.font.size * 0.9,
            label = escape_html(&scheme.labels[interval]),
        );
    }
    svg.push_str("</g>\n");
}
