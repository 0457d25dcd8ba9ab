//! Pipeline orchestrator.
//!
//! Walks the extracted applications in order: cached or freshly classified tags,
//! write-through to the tag cache, embedding, then one clustering pass over every
//! surviving vector.

use tracing::{debug, info, warn};

use crate::error::{EmptyInput, Error, Result};
use crate::models::{ApplicationRecord, GroupedResult, Tags};
use crate::services::cache::TagCache;
use crate::services::classifier::TagClassifier;
use crate::services::clustering::Clusterer;
use crate::services::embedder::Embedder;

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub applications: usize,
    pub cache_hits: usize,
    pub classified: usize,
    pub insufficient: usize,
    pub embedding_failures: usize,
    pub dimension_mismatches: usize,
    pub persistence_failures: usize,
    pub clustered: usize,
}

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub groups: GroupedResult,
    /// The applications that were clustered, with tags and vectors filled in.
    pub applications: Vec<ApplicationRecord>,
    pub stats: RunStats,
}

/// Sequences classification, caching, embedding and clustering.
///
/// Owns the tag cache for the whole run, so every cache write lands before the
/// next lookup.
pub struct Orchestrator {
    classifier: TagClassifier,
    embedder: Embedder,
    clusterer: Box<dyn Clusterer>,
    cache: TagCache,
}

impl Orchestrator {
    pub fn new(
        classifier: TagClassifier,
        embedder: Embedder,
        clusterer: Box<dyn Clusterer>,
        cache: TagCache,
    ) -> Self {
        Self {
            classifier,
            embedder,
            clusterer,
            cache,
        }
    }

    pub fn cache(&self) -> &TagCache {
        &self.cache
    }

    /// Run the pipeline over `apps` in order.
    ///
    /// Fails with [`Error::EmptyInput`] when there is nothing to cluster; the
    /// clusterer is not invoked in that case.
    pub async fn run(&mut self, apps: Vec<ApplicationRecord>) -> Result<PipelineOutput> {
        let mut stats = RunStats {
            applications: apps.len(),
            ..RunStats::default()
        };
        if apps.is_empty() {
            return Err(Error::EmptyInput(EmptyInput::NoApplications));
        }

        let mut survivors: Vec<ApplicationRecord> = Vec::new();
        let mut dimension: Option<usize> = None;

        for mut app in apps {
            info!("Processing {} ({})", app.name, app.package);

            let tags = self.resolve_tags(&app, &mut stats).await;
            if tags.is_insufficient() {
                info!("Skipping {}: insufficient information", app.package);
                stats.insufficient += 1;
                continue;
            }

            let text = tags.to_string();
            app.tags = Some(tags);

            let Some(vector) = self.embedder.embed(&text).await else {
                warn!("Skipping {}: no embedding", app.package);
                stats.embedding_failures += 1;
                continue;
            };

            match dimension {
                Some(expected) if expected != vector.len() => {
                    warn!(
                        "Skipping {}: embedding has {} dimensions, expected {}",
                        app.package,
                        vector.len(),
                        expected
                    );
                    stats.dimension_mismatches += 1;
                    continue;
                }
                Some(_) => {}
                None => dimension = Some(vector.len()),
            }

            app.vector = Some(vector);
            survivors.push(app);
        }

        if survivors.is_empty() {
            log_stats(&stats);
            return Err(Error::EmptyInput(EmptyInput::NoVectors));
        }

        stats.clustered = survivors.len();
        log_stats(&stats);

        let matrix: Vec<Vec<f32>> = survivors
            .iter()
            .filter_map(|app| app.vector.clone())
            .collect();
        info!("Clustering {} vectors", matrix.len());
        let labels = self.clusterer.cluster(&matrix)?;

        let groups = GroupedResult::from_assignment(&survivors, &labels);
        info!("Formed {} groups", groups.len());

        Ok(PipelineOutput {
            groups,
            applications: survivors,
            stats,
        })
    }

    /// Cached tags when present, otherwise classify and write through.
    async fn resolve_tags(&mut self, app: &ApplicationRecord, stats: &mut RunStats) -> Tags {
        if let Some(cached) = self.cache.get(&app.package) {
            debug!("Cache hit for {}", app.package);
            stats.cache_hits += 1;
            return Tags::parse(cached);
        }

        let tags = self.classifier.classify(&app.name, &app.package).await;
        stats.classified += 1;
        info!("Tags for {}: {}", app.package, tags);

        if let Err(e) = self.cache.put_and_persist(&app.package, &tags.to_string()) {
            warn!("{}; continuing with the in-memory cache", e);
            stats.persistence_failures += 1;
        }
        tags
    }
}

fn log_stats(stats: &RunStats) {
    info!(
        "Processed {} applications: {} cached, {} classified, {} insufficient, {} embedding failures, {} clustered",
        stats.applications,
        stats.cache_hits,
        stats.classified,
        stats.insufficient,
        stats.embedding_failures + stats.dimension_mismatches,
        stats.clustered
    );
}
