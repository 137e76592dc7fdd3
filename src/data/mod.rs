mod fetch;

pub use fetch::{Fetch, HttpFetcher, OfflineFetcher};

use crate::error::{PipelineError, Result};
use crate::features::{SourceCollection, SourceFeature};
use anyhow::{anyhow, Context};
use geojson::{Feature, GeoJson};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Natural Earth publishes every layer at three resolutions
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Scale {
    Small,  // 110m - world view
    Medium, // 50m - continental
    Large,  // 10m - regional
}

impl Scale {
    /// Resolution in metres-per-unit as used in Natural Earth file names
    pub fn resolution(self) -> u32 {
        match self {
            Scale::Small => 110,
            Scale::Medium => 50,
            Scale::Large => 10,
        }
    }
}

impl TryFrom<String> for Scale {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        match value.trim().to_lowercase().as_str() {
            "small" | "110" | "110m" => Ok(Scale::Small),
            "medium" | "50" | "50m" => Ok(Scale::Medium),
            "large" | "10" | "10m" => Ok(Scale::Large),
            other => Err(format!("unknown scale '{other}', expected small, medium or large")),
        }
    }
}

impl From<Scale> for String {
    fn from(scale: Scale) -> Self {
        scale.to_string()
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Scale::Small => "small",
            Scale::Medium => "medium",
            Scale::Large => "large",
        };
        f.write_str(name)
    }
}

pub const DEFAULT_URL_TEMPLATE: &str =
    "https://raw.githubusercontent.com/nvkelso/natural-earth-vector/master/geojson/{stem}.geojson";

/// Where the boundary dataset lives, keyed by (scale, kind, category)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetSource {
    pub scale: Scale,
    /// Layer name, e.g. `admin_0_countries`
    pub kind: String,
    /// `cultural` or `physical`
    pub category: String,
    /// Supports `{scale}`, `{kind}`, `{category}` and `{stem}` placeholders
    pub url_template: String,
}

impl Default for DatasetSource {
    fn default() -> Self {
        Self {
            scale: Scale::Small,
            kind: "admin_0_countries".to_string(),
            category: "cultural".to_string(),
            url_template: DEFAULT_URL_TEMPLATE.to_string(),
        }
    }
}

impl DatasetSource {
    /// Natural Earth file stem, e.g. `ne_110m_admin_0_countries`
    pub fn file_stem(&self) -> String {
        format!("ne_{}m_{}", self.scale.resolution(), self.kind)
    }

    pub fn url(&self) -> String {
        self.url_template
            .replace("{stem}", &self.file_stem())
            .replace("{scale}", &self.scale.resolution().to_string())
            .replace("{kind}", &self.kind)
            .replace("{category}", &self.category)
    }
}

/// Fetches boundary datasets, keeping a copy on local disk
pub struct DatasetLoader {
    cache_dir: PathBuf,
    refresh: bool,
    fetcher: Box<dyn Fetch>,
}

impl DatasetLoader {
    pub fn new(cache_dir: impl Into<PathBuf>, fetcher: Box<dyn Fetch>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            refresh: false,
            fetcher,
        }
    }

    /// Always try the network first, using the cache only as a fallback
    pub fn with_refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    pub fn cache_path(&self, source: &DatasetSource) -> PathBuf {
        self.cache_dir
            .join(&source.category)
            .join(format!("{}.geojson", source.file_stem()))
    }

    /// Load the dataset, reusing the cached copy when there is one.
    /// Downloads reach the cache only after they parse.
    pub fn load(&self, source: &DatasetSource) -> Result<SourceCollection> {
        let url = source.url();
        let cache_path = self.cache_path(source);
        let cached = cache_path.is_file();

        let collection = if cached && !self.refresh {
            debug!("Using cached dataset {:?}", cache_path);
            load_cache(&cache_path, &url)?
        } else {
            info!("Downloading {}", url);
            match self.download(&url) {
                Ok((bytes, collection)) => {
                    if let Err(e) = write_cache(&cache_path, &bytes) {
                        warn!("Could not cache dataset at {:?}: {:#}", cache_path, e);
                    }
                    collection
                }
                Err(e) if cached => {
                    warn!("Download failed ({:#}), falling back to {:?}", e, cache_path);
                    load_cache(&cache_path, &url)?
                }
                Err(e) => {
                    return Err(PipelineError::Load {
                        url,
                        reason: format!("{e:#}"),
                    })
                }
            }
        };

        info!("Loaded {} features from {}", collection.len(), source.file_stem());
        Ok(collection)
    }

    fn download(&self, url: &str) -> anyhow::Result<(Vec<u8>, SourceCollection)> {
        let bytes = self.fetcher.fetch(url)?;
        let collection = parse_geojson(&bytes)?;
        Ok((bytes, collection))
    }
}

fn load_cache(path: &Path, url: &str) -> Result<SourceCollection> {
    let load_err = |reason: String| PipelineError::Load {
        url: url.to_string(),
        reason,
    };
    let bytes =
        fs::read(path).map_err(|e| load_err(format!("cannot read cache {path:?}: {e}")))?;
    parse_geojson(&bytes).map_err(|e| load_err(format!("cache {path:?}: {e:#}")))
}

/// Write through a sibling file and rename, so readers never see a partial cache
fn write_cache(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let partial = path.with_extension("geojson.part");
    fs::write(&partial, bytes).with_context(|| format!("Failed to write {partial:?}"))?;
    fs::rename(&partial, path).with_context(|| format!("Failed to move {partial:?} into place"))?;
    Ok(())
}

/// Parse a GeoJSON document and keep its areal features
pub fn parse_geojson(bytes: &[u8]) -> anyhow::Result<SourceCollection> {
    // simd-json parses in place
    let mut buf = bytes.to_vec();
    let geojson: GeoJson =
        simd_json::serde::from_slice(&mut buf).context("Failed to parse GeoJSON")?;

    let features = match geojson {
        GeoJson::FeatureCollection(fc) => fc.features,
        GeoJson::Feature(f) => vec![f],
        GeoJson::Geometry(_) => {
            return Err(anyhow!("GeoJSON must be a FeatureCollection, found a bare geometry"))
        }
    };

    let mut collection = SourceCollection::default();
    for (idx, feature) in features.into_iter().enumerate() {
        if let Some(f) = process_feature(idx, feature)? {
            collection.features.push(f);
        }
    }
    Ok(collection)
}

fn process_feature(idx: usize, feature: Feature) -> anyhow::Result<Option<SourceFeature>> {
    let Some(geometry) = feature.geometry else {
        warn!("Skipping feature {} without geometry", idx);
        return Ok(None);
    };

    let geometry: geo::Geometry<f64> = geometry
        .value
        .try_into()
        .map_err(|e| anyhow!("Failed to convert geometry of feature {}: {:?}", idx, e))?;

    match geometry {
        geo::Geometry::Polygon(_) | geo::Geometry::MultiPolygon(_) => Ok(Some(SourceFeature {
            geometry,
            properties: feature.properties.unwrap_or_default(),
        })),
        _ => {
            warn!("Skipping non-areal feature {}", idx);
            Ok(None)
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    pub const TWO_COUNTRIES: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature",
             "properties": {"name": "Alpha", "pop_est": 1500000},
             "geometry": {"type": "Polygon", "coordinates": [[[0,0],[10,0],[10,10],[0,10],[0,0]]]}},
            {"type": "Feature",
             "properties": {"name": "Beta", "pop_est": 250000},
             "geometry": {"type": "MultiPolygon", "coordinates": [[[[20,0],[30,0],[30,10],[20,0]]]]}},
            {"type": "Feature",
             "properties": {"name": "Capital"},
             "geometry": {"type": "Point", "coordinates": [5,5]}}
        ]
    }"#;

    /// Serves a fixed payload and counts calls
    pub struct StaticFetcher {
        pub body: Option<String>,
        pub calls: Rc<Cell<usize>>,
    }

    impl Fetch for StaticFetcher {
        fn fetch(&self, url: &str) -> anyhow::Result<Vec<u8>> {
            self.calls.set(self.calls.get() + 1);
            match &self.body {
                Some(body) => Ok(body.clone().into_bytes()),
                None => Err(anyhow!("connection refused: {url}")),
            }
        }
    }

    fn loader(dir: &Path, body: Option<&str>) -> (DatasetLoader, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        let fetcher = StaticFetcher {
            body: body.map(str::to_string),
            calls: calls.clone(),
        };
        (DatasetLoader::new(dir, Box::new(fetcher)), calls)
    }

    #[test]
    fn test_url_and_stem() {
        let source = DatasetSource {
            scale: Scale::Medium,
            url_template: "https://example.org/{category}/{scale}/{kind}.zip".into(),
            ..Default::default()
        };
        assert_eq!(source.file_stem(), "ne_50m_admin_0_countries");
        assert_eq!(
            source.url(),
            "https://example.org/cultural/50/admin_0_countries.zip"
        );
    }

    #[test]
    fn test_scale_parsing() {
        assert_eq!(Scale::try_from("110".to_string()), Ok(Scale::Small));
        assert_eq!(Scale::try_from("Large".to_string()), Ok(Scale::Large));
        assert!(Scale::try_from("huge".to_string()).is_err());
    }

    #[test]
    fn test_parse_keeps_areal_features() {
        let collection = parse_geojson(TWO_COUNTRIES.as_bytes()).unwrap();
        assert_eq!(collection.len(), 2);
        assert_eq!(collection.features[0].properties["name"], "Alpha");
        assert!(matches!(
            collection.features[1].geometry,
            geo::Geometry::MultiPolygon(_)
        ));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_geojson(b"not json").is_err());
        let bare = r#"{"type": "Point", "coordinates": [1, 2]}"#;
        assert!(parse_geojson(bare.as_bytes()).is_err());
    }

    #[test]
    fn test_download_populates_cache() {
        let dir = tempfile::tempdir().unwrap();
        let source = DatasetSource::default();
        let (loader, calls) = loader(dir.path(), Some(TWO_COUNTRIES));

        let first = loader.load(&source).unwrap();
        assert_eq!(first.len(), 2);
        assert!(loader.cache_path(&source).is_file());

        let second = loader.load(&source).unwrap();
        assert_eq!(second.len(), 2);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_fetch_failure_without_cache_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let (loader, _) = loader(dir.path(), None);
        let err = loader.load(&DatasetSource::default()).unwrap_err();
        assert!(matches!(err, PipelineError::Load { .. }));
        assert_eq!(err.stage(), "load");
    }

    #[test]
    fn test_unparseable_download_is_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let source = DatasetSource::default();

        let (broken, _) = loader(dir.path(), Some("<html>rate limited</html>"));
        let err = broken.load(&source).unwrap_err();
        assert!(matches!(err, PipelineError::Load { .. }));
        assert!(!broken.cache_path(&source).exists());

        let (healthy, calls) = loader(dir.path(), Some(TWO_COUNTRIES));
        assert_eq!(healthy.load(&source).unwrap().len(), 2);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_refresh_keeps_good_cache_when_download_is_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let source = DatasetSource::default();
        let (seed, _) = loader(dir.path(), Some(TWO_COUNTRIES));
        seed.load(&source).unwrap();

        let (garbage, _) = loader(dir.path(), Some("not json"));
        let collection = garbage.with_refresh(true).load(&source).unwrap();
        assert_eq!(collection.len(), 2);

        let cache = fs::read_to_string(seed.cache_path(&source)).unwrap();
        assert_eq!(cache, TWO_COUNTRIES);
    }

    #[test]
    fn test_refresh_falls_back_to_cache() {
        let dir = tempfile::tempdir().unwrap();
        let source = DatasetSource::default();
        let (seed, _) = loader(dir.path(), Some(TWO_COUNTRIES));
        seed.load(&source).unwrap();

        let (offline, calls) = loader(dir.path(), None);
        let offline = offline.with_refresh(true);
        let collection = offline.load(&source).unwrap();
        assert_eq!(collection.len(), 2);
        assert_eq!(calls.get(), 1);
    }
}
