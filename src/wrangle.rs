use crate::error::{PipelineError, Result};
use crate::features::{FeatureCollection, FeatureRecord, SourceCollection};
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

const PER_MILLION: f64 = 1_000_000.0;

/// Maps a source attribute onto an output column
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub source: String,
    pub target: String,
}

impl ColumnMapping {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// Columns kept from the source dataset
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Selection {
    pub name: ColumnMapping,
    pub population: ColumnMapping,
    pub extra: Vec<ColumnMapping>,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            name: ColumnMapping::new("name", "name"),
            population: ColumnMapping::new("pop_est", "population"),
            extra: Vec::new(),
        }
    }
}

impl Selection {
    /// Output column names in mapping order
    pub fn targets(&self) -> Vec<String> {
        let mut targets = vec![self.name.target.clone(), self.population.target.clone()];
        targets.extend(self.extra.iter().map(|m| m.target.clone()));
        targets
    }
}

#[inline]
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Project the dataset down to geometry plus the mapped columns, rescale
/// population to millions and sort ascending by population.
pub fn select_and_normalize(
    source: &SourceCollection,
    selection: &Selection,
) -> Result<FeatureCollection> {
    let mut records = Vec::with_capacity(source.len());

    for (idx, feature) in source.features.iter().enumerate() {
        let props = &feature.properties;
        let name = read_name(props, &selection.name.source, idx)?;
        let raw = read_number(props, &selection.population.source, idx)?;
        if raw < 0.0 {
            return Err(schema_error(
                &selection.population.source,
                idx,
                format!("negative population {raw}"),
            ));
        }

        let mut attributes = BTreeMap::new();
        for mapping in &selection.extra {
            let value = props
                .get(&mapping.source)
                .ok_or_else(|| schema_error(&mapping.source, idx, "column absent"))?;
            attributes.insert(mapping.target.clone(), value.clone());
        }

        let mut record =
            FeatureRecord::new(name, round_to(raw / PER_MILLION, 2), feature.geometry.clone());
        record.attributes = attributes;
        records.push(record);
    }

    // stable: equal populations keep dataset order
    records.sort_by(|a, b| a.population.total_cmp(&b.population));

    info!("Normalized {} records", records.len());
    Ok(FeatureCollection::new(selection.targets(), records))
}

fn schema_error(column: &str, feature: usize, reason: impl Into<String>) -> PipelineError {
    PipelineError::Schema {
        column: column.to_string(),
        feature,
        reason: reason.into(),
    }
}

fn read_name(props: &Map<String, Value>, column: &str, idx: usize) -> Result<String> {
    match props.get(column) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(other) => Err(schema_error(column, idx, format!("not a name: {other}"))),
        None => Err(schema_error(column, idx, "column absent")),
    }
}

fn read_number(props: &Map<String, Value>, column: &str, idx: usize) -> Result<f64> {
    let value = props
        .get(column)
        .ok_or_else(|| schema_error(column, idx, "column absent"))?;
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number
        .filter(|n| n.is_finite())
        .ok_or_else(|| schema_error(column, idx, format!("not a number: {value}")))
}
