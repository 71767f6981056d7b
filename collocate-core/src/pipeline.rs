//! # Document Pipeline — Orchestration with Observable Events
//!
//! The pipeline runs the two stages for one document and emits a
//! [`PipelineEvent`] after each step over a `mpsc` channel, so a caller can
//! follow progress while a large book is processed.
//!
//! 1. **Alias identification**: entities → [`AliasTrie`]; token stream →
//!    [`CorefTable`]; document + trie + table → [`AliasOccurrence`]s.
//! 2. **Collocate extraction**: occurrences + character occurrences +
//!    dependency graphs → [`Collocate`]s.
//!
//! Each stage has a streaming form and a synchronous wrapper that only
//! returns the final result.

use std::sync::mpsc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::annotation::Document;
use crate::assembler::{Collocate, CollocateAssembler};
use crate::config::PipelineConfig;
use crate::coref::{self, CorefTable, MentionToken};
use crate::dependency::DependencyExtractor;
use crate::entity::Entity;
use crate::error::Result;
use crate::relation::RuleGroup;
use crate::scanner::{self, AliasOccurrence};
use crate::trie::AliasTrie;

/// Events emitted while a document is processed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PipelineEvent {
    /// Alias trie built from the entity list.
    TrieBuilt { entities: usize, nodes: usize },
    /// Pronouns resolved from the coreference stream.
    CorefResolved { pronouns: usize },
    /// Alias scan finished.
    AliasesDone {
        occurrences: Vec<AliasOccurrence>,
        processing_ms: u64,
    },
    /// Annotation checked before the graphs are traversed.
    DocumentValidated { sentences: usize, tokens: usize },
    /// Collocates of one occurrence.
    CollocatesExtracted {
        begin_offset: usize,
        end_offset: usize,
        alias: String,
        count: usize,
    },
    /// Collocate extraction finished.
    CollocatesDone {
        collocates: Vec<Collocate>,
        processing_ms: u64,
    },
    /// The document could not be processed.
    Error { message: String },
}

/// Runs both stages on one document.
#[derive(Debug, Clone, Default)]
pub struct DocumentPipeline {
    extractor: DependencyExtractor,
    groups: Option<Vec<RuleGroup>>,
}

impl DocumentPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            extractor: DependencyExtractor::with_max_depth(config.max_depth),
            groups: config.groups.clone(),
        }
    }

    /// Restricts extraction to `groups`.
    pub fn with_groups(mut self, groups: Vec<RuleGroup>) -> Self {
        self.groups = Some(groups);
        self
    }

    /// Locates every alias (and resolved pronoun) of `entities` in `document`.
    pub fn identify_aliases(
        &self,
        document: &Document,
        entities: &[Entity],
        mentions: Option<&[MentionToken]>,
    ) -> Result<Vec<AliasOccurrence>> {
        let (tx, rx) = mpsc::channel();
        self.identify_aliases_streaming(document, entities, mentions, &tx)?;
        drop(tx);
        Ok(rx
            .into_iter()
            .find_map(|event| match event {
                PipelineEvent::AliasesDone { occurrences, .. } => Some(occurrences),
                _ => None,
            })
            .unwrap_or_default())
    }

    /// Streaming form of [`identify_aliases`](Self::identify_aliases).
    ///
    /// Events: `TrieBuilt`, `CorefResolved` (when a stream is given),
    /// `AliasesDone`.
    pub fn identify_aliases_streaming(
        &self,
        document: &Document,
        entities: &[Entity],
        mentions: Option<&[MentionToken]>,
        tx: &mpsc::Sender<PipelineEvent>,
    ) -> Result<()> {
        let start = Instant::now();

        let trie = AliasTrie::build(entities);
        let _ = tx.send(PipelineEvent::TrieBuilt {
            entities: entities.len(),
            nodes: trie.len(),
        });

        let table: Option<CorefTable> = mentions.map(|stream| coref::resolve(stream, entities));
        if let Some(table) = &table {
            let _ = tx.send(PipelineEvent::CorefResolved { pronouns: table.len() });
        }

        let occurrences = scanner::scan(&trie, document, table.as_ref());
        debug!(found = occurrences.len(), "alias scan done");
        let _ = tx.send(PipelineEvent::AliasesDone {
            occurrences,
            processing_ms: start.elapsed().as_millis() as u64,
        });
        Ok(())
    }

    /// Extracts the collocates of `occurrences`, anonymizing tokens covered by
    /// `characters`.
    pub fn extract_collocates(
        &self,
        document: &Document,
        occurrences: &[AliasOccurrence],
        characters: &[AliasOccurrence],
    ) -> Result<Vec<Collocate>> {
        let (tx, rx) = mpsc::channel();
        self.extract_collocates_streaming(document, occurrences, characters, &tx)?;
        drop(tx);
        Ok(rx
            .into_iter()
            .find_map(|event| match event {
                PipelineEvent::CollocatesDone { collocates, .. } => Some(collocates),
                _ => None,
            })
            .unwrap_or_default())
    }

    /// Streaming form of [`extract_collocates`](Self::extract_collocates).
    ///
    /// A malformed annotation fails the whole document: an `Error` event is
    /// sent and the error returned.
    pub fn extract_collocates_streaming(
        &self,
        document: &Document,
        occurrences: &[AliasOccurrence],
        characters: &[AliasOccurrence],
        tx: &mpsc::Sender<PipelineEvent>,
    ) -> Result<()> {
        let start = Instant::now();
        let fail = |e: crate::error::Error| {
            let _ = tx.send(PipelineEvent::Error { message: e.to_string() });
            e
        };

        document.validate().map_err(fail)?;
        let _ = tx.send(PipelineEvent::DocumentValidated {
            sentences: document.sentences.len(),
            tokens: document.token_count(),
        });

        let assembler = CollocateAssembler::new(characters);
        let groups = self.groups.as_deref();
        let mut collocates = Vec::new();
        for occurrence in occurrences {
            let found = assembler
                .assemble_occurrence(document, occurrence, &self.extractor, groups)
                .map_err(fail)?;
            let _ = tx.send(PipelineEvent::CollocatesExtracted {
                begin_offset: occurrence.begin_offset,
                end_offset: occurrence.end_offset,
                alias: occurrence.span.clone(),
                count: found.len(),
            });
            collocates.extend(found);
        }

        let _ = tx.send(PipelineEvent::CollocatesDone {
            collocates,
            processing_ms: start.elapsed().as_millis() as u64,
        });
        Ok(())
    }
}
