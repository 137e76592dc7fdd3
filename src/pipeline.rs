use crate::classify::{classify, ClassificationScheme};
use crate::config::AppConfig;
use crate::data::{DatasetLoader, Fetch, HttpFetcher};
use crate::error::{PipelineError, Result};
use crate::features::FeatureCollection;
use crate::render::{render, write_outputs};
use crate::repair::repair_all;
use crate::wrangle::select_and_normalize;
use log::info;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// What a completed run produced
#[derive(Debug)]
pub struct RunSummary {
    pub records: usize,
    pub scheme: ClassificationScheme,
    pub written: Vec<PathBuf>,
}

/// Load -> normalize -> repair -> classify -> render, failing fast
pub struct Pipeline {
    config: AppConfig,
    fetcher: Option<Box<dyn Fetch>>,
}

impl Pipeline {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            fetcher: None,
        }
    }

    /// Replace the HTTP client, e.g. for offline runs or tests
    pub fn with_fetcher(mut self, fetcher: Box<dyn Fetch>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Stages 1-4: everything up to a classified collection
    pub fn prepare(&mut self) -> Result<(FeatureCollection, ClassificationScheme)> {
        let source = &self.config.source;
        let fetcher: Box<dyn Fetch> = match self.fetcher.take() {
            Some(fetcher) => fetcher,
            None => {
                let timeout = Duration::from_secs(source.timeout_secs);
                let http = HttpFetcher::new(timeout).map_err(|e| PipelineError::Load {
                    url: source.dataset.url(),
                    reason: format!("{e:#}"),
                })?;
                Box::new(http)
            }
        };

        info!("[1/5] load");
        let loader =
            DatasetLoader::new(source.cache_dir.clone(), fetcher).with_refresh(source.refresh);
        let raw = loader.load(&source.dataset)?;

        info!("[2/5] normalize");
        let mut collection = select_and_normalize(&raw, &self.config.selection)?;

        info!("[3/5] repair ({} targets)", self.config.repair.len());
        repair_all(&mut collection, &self.config.repair)?;

        info!("[4/5] classify");
        let scheme = classify(&mut collection, self.config.classification.classes)?;

        Ok((collection, scheme))
    }

    pub fn run(mut self) -> Result<RunSummary> {
        let start = Instant::now();
        let (collection, scheme) = self.prepare()?;

        info!("[5/5] render");
        let output = &self.config.output;
        let rendered = render(&collection, &scheme, &self.config.render, output.svg_snapshot)?;
        let written = write_outputs(&rendered, &output.directory, &output.stem)?;

        info!("Finished in {:.2?}", start.elapsed());
        Ok(RunSummary {
            records: collection.len(),
            scheme,
            written,
        })
    }
}
