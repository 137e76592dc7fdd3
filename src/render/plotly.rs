use super::config::{FontConfig, RenderConfig};
use crate::classify::ClassificationScheme;
use crate::features::{FeatureCollection, FeatureRecord};
use crate::palette::Rgb;
use geojson::feature::Id;
use serde::Serialize;
use serde_json::{json, Map, Value};

/// A plotly.js figure: traces, layout and the plot config
#[derive(Debug, Serialize)]
pub struct Figure {
    pub data: Vec<ChoroplethTrace>,
    pub layout: Value,
    pub config: Value,
}

#[derive(Debug, Serialize)]
pub struct LineStyle {
    pub color: String,
    pub width: f64,
}

#[derive(Debug, Serialize)]
pub struct Marker {
    pub line: LineStyle,
}

/// One legend entry: every record of a single interval, drawn in one color
#[derive(Debug, Serialize)]
pub struct ChoroplethTrace {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub name: String,
    pub legendgroup: String,
    pub geojson: geojson::FeatureCollection,
    pub featureidkey: &'static str,
    pub locations: Vec<String>,
    pub z: Vec<f64>,
    pub zmin: f64,
    pub zmax: f64,
    pub colorscale: Vec<(f64, String)>,
    pub showscale: bool,
    pub showlegend: bool,
    pub text: Vec<String>,
    pub hoverinfo: &'static str,
    pub marker: Marker,
}

/// Stable feature id used to join trace locations to GeoJSON features
fn feature_id(idx: usize) -> String {
    format!("f{idx}")
}

fn to_feature(idx: usize, record: &FeatureRecord) -> Option<geojson::Feature> {
    let mp = record.multi_polygon()?;
    let mut properties = Map::new();
    properties.insert("name".to_string(), Value::String(record.name.clone()));
    properties.insert("population".to_string(), json!(record.population));
    Some(geojson::Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(geojson::Value::from(&mp))),
        id: Some(Id::String(feature_id(idx))),
        properties: Some(properties),
        foreign_members: None,
    })
}

/// Plotly renders pseudo-HTML in hover labels
fn hover_label(record: &FeatureRecord) -> String {
    record
        .hover_text
        .as_deref()
        .unwrap_or(&record.name)
        .replace('\n', "<br>")
}

fn font(font: &FontConfig) -> Value {
    json!({ "family": font.family, "size": font.size, "color": font.color })
}

/// Build the figure. Traces appear highest interval first so the legend
/// reads from large to small populations.
pub fn build_figure(
    collection: &FeatureCollection,
    scheme: &ClassificationScheme,
    colors: &[Rgb],
    config: &RenderConfig,
) -> Figure {
    let mut data = Vec::with_capacity(scheme.len());

    for interval in (0..scheme.len()).rev() {
        let color = colors[interval].to_hex();
        let mut features = Vec::new();
        let mut locations = Vec::new();
        let mut text = Vec::new();

        for (idx, record) in collection.records.iter().enumerate() {
            if record.interval != Some(interval) {
                continue;
            }
            if let Some(feature) = to_feature(idx, record) {
                features.push(feature);
                locations.push(feature_id(idx));
                text.push(hover_label(record));
            }
        }

        data.push(ChoroplethTrace {
            kind: "choropleth",
            name: scheme.labels[interval].clone(),
            legendgroup: scheme.labels[interval].clone(),
            geojson: geojson::FeatureCollection {
                bbox: None,
                features,
                foreign_members: None,
            },
            featureidkey: "id",
            z: vec![1.0; locations.len()],
            locations,
            zmin: 0.0,
            zmax: 1.0,
            colorscale: vec![(0.0, color.clone()), (1.0, color)],
            showscale: false,
            showlegend: true,
            text,
            hoverinfo: "text",
            marker: Marker {
                line: LineStyle {
                    color: config.stroke.color.clone(),
                    width: config.stroke.width,
                },
            },
        });
    }

    Figure {
        data,
        layout: layout(config),
        config: json!({
            "displayModeBar": config.show_toolbar,
            "displaylogo": false,
            "responsive": true,
        }),
    }
}

fn layout(config: &RenderConfig) -> Value {
    let geo = &config.geo;
    let legend = &config.legend;
    let title = &config.title;
    let rotation = &geo.projection.rotation;

    json!({
        "width": config.width,
        "height": config.height,
        "margin": { "l": 0, "r": 0, "t": 0, "b": 0 },
        "paper_bgcolor": geo.bg_color,
        "showlegend": true,
        "geo": {
            "projection": {
                "type": geo.projection.kind.as_str(),
                "rotation": { "lon": rotation.lon, "lat": rotation.lat, "roll": rotation.roll },
            },
            "showland": geo.show_land,
            "landcolor": geo.land_color,
            "showocean": geo.show_ocean,
            "oceancolor": geo.ocean_color,
            "showlakes": geo.show_lakes,
            "lakecolor": geo.lake_color,
            "showcoastlines": geo.show_coastlines,
            "coastlinecolor": geo.coastline_color,
            "showcountries": false,
            "showframe": geo.show_frame,
            "bgcolor": geo.bg_color,
            "lataxis": { "showgrid": geo.show_grid, "gridcolor": geo.grid_color },
            "lonaxis": { "showgrid": geo.show_grid, "gridcolor": geo.grid_color },
        },
        "legend": {
            "x": legend.x,
            "y": legend.y,
            "xanchor": legend.x_anchor,
            "yanchor": legend.y_anchor,
            "traceorder": "normal",
            "title": { "text": legend.title },
            "font": font(&legend.font),
            "bgcolor": legend.bg_color,
            "bordercolor": legend.border_color,
            "borderwidth": legend.border_width,
        },
        "annotations": [{
            "text": title.text,
            "x": title.x,
            "y": title.y,
            "xref": "paper",
            "yref": "paper",
            "xanchor": title.x_anchor,
            "yanchor": title.y_anchor,
            "showarrow": false,
            "font": font(&title.font),
        }],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;
    use geo::{polygon, Geometry};
    use std::collections::HashSet;

    fn fixture() -> (FeatureCollection, ClassificationScheme) {
        let square = polygon![(x: 0.0, y: 0.0), (x: 5.0, y: 0.0), (x: 5.0, y: 5.0), (x: 0.0, y: 0.0)];
        let records = [("Tuvalu", 1.0), ("Peru", 50.0), ("India", 1400.0)]
            .into_iter()
            .map(|(n, p)| FeatureRecord::new(n, p, Geometry::Polygon(square.clone())))
            .collect();
        let mut fc = FeatureCollection::new(vec!["name".into(), "population".into()], records);
        let scheme = classify(&mut fc, 3).unwrap();
        (fc, scheme)
    }

    #[test]
    fn test_one_trace_per_interval_in_legend_order() {
        let (fc, scheme) = fixture();
        let config = RenderConfig::default();
        let colors = config.palette.colors(3).unwrap();
        let figure = build_figure(&fc, &scheme, &colors, &config);

        let names: Vec<_> = figure.data.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["above 725.00", "25.50 - 725.00", "below 25.50"]);
        assert_eq!(figure.data[0].text, ["India<br>1400.00 million"]);

        let fills: HashSet<_> = figure.data.iter().map(|t| t.colorscale[0].1.clone()).collect();
        assert_eq!(fills.len(), 3);
    }

    #[test]
    fn test_serialized_figure() {
        let (fc, scheme) = fixture();
        let config = RenderConfig::default();
        let colors = config.palette.colors(3).unwrap();
        let value = serde_json::to_value(build_figure(&fc, &scheme, &colors, &config)).unwrap();

        assert_eq!(value["layout"]["geo"]["projection"]["type"], "orthographic");
        assert_eq!(value["config"]["displayModeBar"], false);
        assert_eq!(value["data"][0]["hoverinfo"], "text");
        assert_eq!(value["data"][0]["type"], "choropleth");
        assert_eq!(value["data"][0]["marker"]["line"]["color"], "#ffffff");
        let feature = &value["data"][0]["geojson"]["features"][0];
        assert_eq!(feature["geometry"]["type"], "MultiPolygon");
        assert_eq!(feature["id"], value["data"][0]["locations"][0]);
    }
}
