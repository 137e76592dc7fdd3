use geo::{Geometry, MultiPolygon};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A feature as read from the boundary dataset, with every original attribute
#[derive(Debug, Clone)]
pub struct SourceFeature {
    pub geometry: Geometry<f64>,
    pub properties: Map<String, Value>,
}

/// Loader output: areal features in file order
#[derive(Debug, Clone, Default)]
pub struct SourceCollection {
    pub features: Vec<SourceFeature>,
}

impl SourceCollection {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// One country after wrangling
#[derive(Debug, Clone)]
pub struct FeatureRecord {
    /// Polygon or MultiPolygon; always MultiPolygon once repaired
    pub geometry: Geometry<f64>,
    pub name: String,
    /// Millions, rounded to two decimals
    pub population: f64,
    /// Extra mapped columns, keyed by target name
    pub attributes: BTreeMap<String, Value>,
    /// Index into the classification scheme
    pub interval: Option<usize>,
    pub hover_text: Option<String>,
}

impl FeatureRecord {
    pub fn new(name: impl Into<String>, population: f64, geometry: Geometry<f64>) -> Self {
        Self {
            geometry,
            name: name.into(),
            population,
            attributes: BTreeMap::new(),
            interval: None,
            hover_text: None,
        }
    }

    /// Areal view of the geometry, `None` for points and lines
    pub fn multi_polygon(&self) -> Option<MultiPolygon<f64>> {
        as_multi_polygon(&self.geometry)
    }
}

/// Cast an areal geometry into a MultiPolygon
pub fn as_multi_polygon(geometry: &Geometry<f64>) -> Option<MultiPolygon<f64>> {
    match geometry {
        Geometry::MultiPolygon(mp) => Some(mp.clone()),
        Geometry::Polygon(p) => Some(MultiPolygon::new(vec![p.clone()])),
        Geometry::Rect(r) => Some(MultiPolygon::new(vec![r.to_polygon()])),
        Geometry::Triangle(t) => Some(MultiPolygon::new(vec![t.to_polygon()])),
        Geometry::GeometryCollection(gc) => {
            let mut polygons = Vec::new();
            for g in gc.iter() {
                polygons.extend(as_multi_polygon(g)?.0);
            }
            Some(MultiPolygon::new(polygons))
        }
        _ => None,
    }
}

/// Ordered table of country records, sorted by population after wrangling
#[derive(Debug, Clone, Default)]
pub struct FeatureCollection {
    /// Target column names besides geometry, in mapping order
    pub columns: Vec<String>,
    pub records: Vec<FeatureRecord>,
}

impl FeatureCollection {
    pub fn new(columns: Vec<String>, records: Vec<FeatureRecord>) -> Self {
        Self { columns, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn populations(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.population).collect()
    }

    pub fn position_by_name(&self, name: &str) -> Option<usize> {
        self.records.iter().position(|r| r.name == name)
    }
}
