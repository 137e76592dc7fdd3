use crate::error::{PipelineError, Result};
use crate::features::{as_multi_polygon, FeatureCollection};
use geo::{
    unary_union, GeodesicArea, Geometry, LineString, MultiPolygon, Polygon, Validation, Winding,
};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fmt;

const M2_PER_KM2: f64 = 1_000_000.0;

/// Identifies the record a repair applies to
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordLocator {
    /// Position in the population-sorted collection
    Index(usize),
    Name(String),
}

impl fmt::Display for RecordLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordLocator::Index(i) => write!(f, "index {i}"),
            RecordLocator::Name(n) => write!(f, "name '{n}'"),
        }
    }
}

/// A known malformed record and the hole size below which holes are filled
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RepairTarget {
    #[serde(flatten)]
    pub locator: RecordLocator,
    pub min_hole_area_km2: f64,
}

/// Geodesic area enclosed by a ring in km², whatever its winding.
/// Interior rings are clockwise in GeoJSON, and a clockwise ring
/// measures the rest of the globe.
fn ring_area_km2(ring: &LineString<f64>) -> f64 {
    let mut ring = ring.clone();
    ring.make_ccw_winding();
    Polygon::new(ring, vec![]).geodesic_area_unsigned() / M2_PER_KM2
}

/// Drop interior rings smaller than `threshold_km2`
pub fn fill_holes(mp: &MultiPolygon<f64>, threshold_km2: f64) -> MultiPolygon<f64> {
    let polygons = mp
        .iter()
        .map(|polygon| {
            let kept: Vec<LineString<f64>> = polygon
                .interiors()
                .iter()
                .filter(|ring| ring_area_km2(ring) >= threshold_km2)
                .cloned()
                .collect();
            Polygon::new(polygon.exterior().clone(), kept)
        })
        .collect();
    MultiPolygon::new(polygons)
}

/// Fill small holes and return a valid MultiPolygon
pub fn repair_geometry(geometry: &Geometry<f64>, threshold_km2: f64) -> Option<MultiPolygon<f64>> {
    let mp = as_multi_polygon(geometry)?;
    let filled = fill_holes(&mp, threshold_km2);
    if filled.is_valid() {
        return Some(filled);
    }

    // self-intersections and overlapping parts: rebuild through a union
    debug!("Geometry invalid after hole filling, rebuilding with a union");
    let rebuilt = unary_union(filled.0.iter());
    Some(fill_holes(&rebuilt, threshold_km2))
}

/// Replace the located record's geometry with its repaired form
pub fn repair_record(collection: &mut FeatureCollection, target: &RepairTarget) -> Result<()> {
    let idx = match &target.locator {
        RecordLocator::Index(i) if *i < collection.len() => Some(*i),
        RecordLocator::Index(_) => None,
        RecordLocator::Name(name) => collection.position_by_name(name),
    }
    .ok_or_else(|| PipelineError::NotFound(target.locator.to_string()))?;

    let record = &mut collection.records[idx];
    let before: usize = count_interiors(&record.geometry);
    let repaired = repair_geometry(&record.geometry, target.min_hole_area_km2).ok_or_else(|| {
        PipelineError::Repair {
            name: record.name.clone(),
            reason: "geometry is not a polygon".into(),
        }
    })?;
    let after: usize = repaired.iter().map(|p| p.interiors().len()).sum();
    info!(
        "Repaired '{}': {} -> {} interior rings",
        record.name, before, after
    );
    record.geometry = Geometry::MultiPolygon(repaired);
    Ok(())
}

/// Apply each repair in order, stopping at the first failure
pub fn repair_all(collection: &mut FeatureCollection, targets: &[RepairTarget]) -> Result<()> {
    for target in targets {
        repair_record(collection, target)?;
    }
    Ok(())
}

fn count_interiors(geometry: &Geometry<f64>) -> usize {
    as_multi_polygon(geometry)
        .map(|mp| mp.iter().map(|p| p.interiors().len()).sum())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureRecord;
    use approx::assert_relative_eq;
    use geo::{line_string, point, polygon};

    /// 20°x20° square near the equator with a ~0.1° hole and a 10° hole
    fn holed() -> Polygon<f64> {
        polygon!(
            exterior: [(x: 0.0, y: 0.0), (x: 20.0, y: 0.0), (x: 20.0, y: 20.0), (x: 0.0, y: 20.0)],
            interiors: [
                [(x: 1.0, y: 1.0), (x: 1.1, y: 1.0), (x: 1.1, y: 1.1), (x: 1.0, y: 1.1)],
                [(x: 5.0, y: 5.0), (x: 15.0, y: 5.0), (x: 15.0, y: 15.0), (x: 5.0, y: 15.0)]
            ]
        )
    }

    fn bowtie() -> Polygon<f64> {
        polygon![(x: 0.0, y: 0.0), (x: 2.0, y: 2.0), (x: 2.0, y: 0.0), (x: 0.0, y: 2.0)]
    }

    fn collection(geometry: Geometry<f64>) -> FeatureCollection {
        let records = vec![
            FeatureRecord::new("Lesser", 1.0, Geometry::Polygon(holed())),
            FeatureRecord::new("Target", 2.0, geometry),
        ];
        FeatureCollection::new(vec!["name".into(), "population".into()], records)
    }

    fn interiors(geometry: &Geometry<f64>) -> usize {
        count_interiors(geometry)
    }

    #[test]
    fn test_ring_area_ignores_winding() {
        let ccw = line_string![(x: 1.0, y: 1.0), (x: 1.1, y: 1.0), (x: 1.1, y: 1.1), (x: 1.0, y: 1.1), (x: 1.0, y: 1.0)];
        let cw = line_string![(x: 1.0, y: 1.0), (x: 1.0, y: 1.1), (x: 1.1, y: 1.1), (x: 1.1, y: 1.0), (x: 1.0, y: 1.0)];
        let a = ring_area_km2(&ccw);
        assert!(a > 100.0 && a < 150.0);
        assert_relative_eq!(ring_area_km2(&cw), a, max_relative = 1e-9);
    }

    #[test]
    fn test_clockwise_hole_is_filled() {
        let exterior = line_string![(x: 0.0, y: 0.0), (x: 4.0, y: 0.0), (x: 4.0, y: 4.0), (x: 0.0, y: 4.0), (x: 0.0, y: 0.0)];
        let hole = line_string![(x: 1.0, y: 1.0), (x: 1.0, y: 1.1), (x: 1.1, y: 1.1), (x: 1.1, y: 1.0), (x: 1.0, y: 1.0)];
        let mp = MultiPolygon::new(vec![Polygon::new(exterior, vec![hole])]);

        let filled = fill_holes(&mp, 1_000.0);
        assert!(filled.0[0].interiors().is_empty());
    }

    #[test]
    fn test_fill_holes_keeps_large_holes() {
        let mp = MultiPolygon::new(vec![holed()]);
        let filled = fill_holes(&mp, 1_000.0);
        assert_eq!(filled.0[0].interiors().len(), 1);

        let all = fill_holes(&mp, f64::INFINITY);
        assert!(all.0[0].interiors().is_empty());
    }

    #[test]
    fn test_repair_by_name_casts_to_multi_polygon() {
        let mut fc = collection(Geometry::Polygon(holed()));
        let target = RepairTarget {
            locator: RecordLocator::Name("Target".into()),
            min_hole_area_km2: 1_000.0,
        };
        repair_record(&mut fc, &target).unwrap();

        assert!(matches!(fc.records[1].geometry, Geometry::MultiPolygon(_)));
        assert_eq!(interiors(&fc.records[1].geometry), 1);
        // untouched
        assert!(matches!(fc.records[0].geometry, Geometry::Polygon(_)));
    }

    #[test]
    fn test_repair_is_idempotent() {
        let mut fc = collection(Geometry::Polygon(holed()));
        let target = RepairTarget {
            locator: RecordLocator::Index(1),
            min_hole_area_km2: 1_000.0,
        };
        repair_record(&mut fc, &target).unwrap();
        let once = fc.records[1].geometry.clone();
        repair_record(&mut fc, &target).unwrap();
        assert_eq!(fc.records[1].geometry, once);
    }

    #[test]
    fn test_self_intersecting_polygon_is_rebuilt() {
        let mut fc = collection(Geometry::Polygon(bowtie()));
        let target = RepairTarget {
            locator: RecordLocator::Name("Target".into()),
            min_hole_area_km2: 1_000.0,
        };
        repair_record(&mut fc, &target).unwrap();

        let Geometry::MultiPolygon(mp) = &fc.records[1].geometry else {
            panic!("expected a multi-polygon");
        };
        assert!(!mp.0.is_empty());
        assert!(mp.iter().all(|p| p.interiors().is_empty()));
    }

    #[test]
    fn test_small_hole_is_removed_entirely() {
        let single = polygon!(
            exterior: [(x: 0.0, y: 0.0), (x: 4.0, y: 0.0), (x: 4.0, y: 4.0), (x: 0.0, y: 4.0)],
            interiors: [[(x: 1.0, y: 1.0), (x: 1.1, y: 1.0), (x: 1.1, y: 1.1), (x: 1.0, y: 1.1)]]
        );
        let mut fc = collection(Geometry::Polygon(single));
        let target = RepairTarget {
            locator: RecordLocator::Name("Target".into()),
            min_hole_area_km2: 1_000.0,
        };
        repair_record(&mut fc, &target).unwrap();
        assert!(matches!(fc.records[1].geometry, Geometry::MultiPolygon(_)));
        assert_eq!(interiors(&fc.records[1].geometry), 0);
    }

    #[test]
    fn test_missing_record_is_not_found() {
        let mut fc = collection(Geometry::Polygon(holed()));
        for locator in [RecordLocator::Name("Atlantis".into()), RecordLocator::Index(9)] {
            let target = RepairTarget {
                locator,
                min_hole_area_km2: 1.0,
            };
            let err = repair_record(&mut fc, &target).unwrap_err();
            assert!(matches!(err, PipelineError::NotFound(_)));
        }
    }

    #[test]
    fn test_non_areal_geometry_cannot_be_repaired() {
        assert!(repair_geometry(&Geometry::Point(point!(x: 1.0, y: 1.0)), 1.0).is_none());
        let line = line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)];
        assert!(repair_geometry(&Geometry::LineString(line), 1.0).is_none());
    }
}
