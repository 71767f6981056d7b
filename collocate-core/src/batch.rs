//! # Batch Runner — Whole-Corpus Processing
//!
//! Runs one pipeline stage over every story of a [`Corpus`] on a rayon pool.
//! Each story is handled end-to-end by a single worker and shares nothing
//! with the others.
//!
//! A story is **skipped** when its inputs are missing, or when its output
//! already exists and `force` is off. A story that fails is logged and
//! reported; the rest of the batch carries on.

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::corpus::{Artifact, Corpus};
use crate::entity::EntityType;
use crate::error::{Error, Result};
use crate::pipeline::DocumentPipeline;

/// Outcome of a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub processed: Vec<String>,
    pub skipped: Vec<String>,
    /// Story id and error message.
    pub failed: Vec<(String, String)>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.processed.len() + self.skipped.len() + self.failed.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

enum Outcome {
    Processed,
    Skipped(&'static str),
}

pub struct BatchRunner {
    corpus: Corpus,
    pipeline: DocumentPipeline,
    config: PipelineConfig,
}

impl BatchRunner {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            corpus: Corpus::new(config.root.clone()),
            pipeline: DocumentPipeline::from_config(&config),
            config,
        }
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Alias stage for the configured entity type.
    pub fn identify_configured_aliases(&self) -> Result<BatchReport> {
        self.identify_aliases(self.config.entity_type)
    }

    /// Collocate stage for the configured entity type.
    pub fn extract_configured_collocates(&self) -> Result<BatchReport> {
        self.extract_collocates(self.config.entity_type)
    }

    /// Writes `aliases/<type>.json` for every story.
    pub fn identify_aliases(&self, entity_type: EntityType) -> Result<BatchReport> {
        self.run("aliases", |id| self.aliases_for(id, entity_type))
    }

    /// Writes `collocates/<type>.tsv` for every story.
    pub fn extract_collocates(&self, entity_type: EntityType) -> Result<BatchReport> {
        self.run("collocates", |id| self.collocates_for(id, entity_type))
    }

    fn aliases_for(&self, id: &str, entity_type: EntityType) -> Result<Outcome> {
        let corpus = &self.corpus;
        if !corpus.saved(id, Artifact::Annotation) || !corpus.saved(id, Artifact::Entities(entity_type)) {
            return Ok(Outcome::Skipped("missing annotation or entity list"));
        }
        if corpus.saved(id, Artifact::Aliases(entity_type)) && !self.config.force {
            return Ok(Outcome::Skipped("already saved"));
        }

        let document = corpus.load_document(id)?;
        let entities = corpus.load_entities(id, entity_type)?;
        let mentions = if entity_type == EntityType::Character && self.config.coreference {
            corpus.load_mentions(id)?
        } else {
            None
        };

        let occurrences = self
            .pipeline
            .identify_aliases(&document, &entities, mentions.as_deref())?;
        let path = corpus.save_aliases(id, entity_type, &occurrences)?;
        debug!(story = id, found = occurrences.len(), path = %path.display(), "aliases saved");
        Ok(Outcome::Processed)
    }

    fn collocates_for(&self, id: &str, entity_type: EntityType) -> Result<Outcome> {
        let corpus = &self.corpus;
        if !corpus.saved(id, Artifact::Annotation)
            || !corpus.saved(id, Artifact::Aliases(entity_type))
            || !corpus.saved(id, Artifact::Aliases(EntityType::Character))
        {
            return Ok(Outcome::Skipped("missing annotation or alias tables"));
        }
        if corpus.saved(id, Artifact::Collocates(entity_type)) && !self.config.force {
            return Ok(Outcome::Skipped("already saved"));
        }

        let document = corpus.load_document(id)?;
        let occurrences = corpus.load_aliases(id, entity_type)?;
        let characters = if entity_type == EntityType::Character {
            occurrences.clone()
        } else {
            corpus.load_aliases(id, EntityType::Character)?
        };

        let collocates = self.pipeline.extract_collocates(&document, &occurrences, &characters)?;
        let path = corpus.save_collocates(id, entity_type, &collocates)?;
        debug!(story = id, found = collocates.len(), path = %path.display(), "collocates saved");
        Ok(Outcome::Processed)
    }

    fn run<F>(&self, stage: &str, process: F) -> Result<BatchReport>
    where
        F: Fn(&str) -> Result<Outcome> + Sync,
    {
        let ids = self.corpus.story_ids()?;
        info!(stage, stories = ids.len(), root = %self.corpus.root().display(), "starting batch");

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.workers)
            .thread_name(|i| format!("worker-{i}"))
            .build()
            .map_err(|e| Error::invalid_input(format!("cannot start worker pool: {e}")))?;

        let outcomes: Vec<(String, Result<Outcome>)> = pool.install(|| {
            ids.par_iter()
                .map(|id| {
                    let worker = rayon::current_thread_index().unwrap_or(0);
                    debug!(stage, story = %id, worker, "processing");
                    (id.clone(), process(id))
                })
                .collect()
        });

        let mut report = BatchReport::default();
        for (id, outcome) in outcomes {
            match outcome {
                Ok(Outcome::Processed) => report.processed.push(id),
                Ok(Outcome::Skipped(reason)) => {
                    debug!(stage, story = %id, reason, "skipped");
                    report.skipped.push(id);
                }
                Err(e) => {
                    warn!(stage, story = %id, error = %e, "story failed");
                    report.failed.push((id, e.to_string()));
                }
            }
        }

        info!(
            stage,
            processed = report.processed.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "batch finished"
        );
        Ok(report)
    }
}
