use criterion::{black_box, criterion_group, criterion_main, Criterion};
use geo::{LineString, MultiPolygon, Polygon};
use globe_choropleth::classify::ClassificationScheme;
use globe_choropleth::render::GlobeViewport;
use globe_choropleth::repair::fill_holes;

/// Roughly the shape of country populations: a long tail of small values
fn populations(count: usize) -> Vec<f64> {
    (0..count)
        .map(|i| {
            let t = i as f64 / count as f64;
            (1400.0 * t.powi(6) * 100.0).round() / 100.0 + 0.01 * (i % 7) as f64
        })
        .collect()
}

fn square(x: f64, y: f64, size: f64) -> LineString<f64> {
    LineString::from(vec![
        (x, y),
        (x + size, y),
        (x + size, y + size),
        (x, y + size),
        (x, y),
    ])
}

/// One large polygon riddled with holes of increasing size
fn holed_land() -> MultiPolygon<f64> {
    let holes = (0..400)
        .map(|i| {
            let (row, col) = ((i / 20) as f64, (i % 20) as f64);
            square(1.0 + col * 2.0, 1.0 + row * 2.0, 0.01 + 0.002 * i as f64)
        })
        .collect();
    MultiPolygon::new(vec![Polygon::new(square(0.0, 0.0, 42.0), holes)])
}

fn bench_classify(c: &mut Criterion) {
    let values = populations(250);
    c.bench_function("kmeans_250_values_8_classes", |b| {
        b.iter(|| ClassificationScheme::kmeans(black_box(&values), 8))
    });
}

fn bench_fill_holes(c: &mut Criterion) {
    let land = holed_land();
    c.bench_function("fill_holes_400_rings", |b| {
        b.iter(|| fill_holes(black_box(&land), 1000.0))
    });
}

fn bench_projection(c: &mut Criterion) {
    let globe = GlobeViewport::new(30.0, 20.0, 330.0, 450.0, 350.0);
    c.bench_function("project_graticule", |b| {
        b.iter(|| {
            GlobeViewport::graticule(10.0)
                .iter()
                .flatten()
                .filter_map(|&(lon, lat)| globe.project(black_box(lon), black_box(lat)))
                .count()
        })
    });
}

criterion_group!(benches, bench_classify, bench_fill_holes, bench_projection);
criterion_main!(benches);
