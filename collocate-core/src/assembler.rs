//! # Collocate Assembler — Joining Occurrences and Collocates
//!
//! Runs the [`DependencyExtractor`] over every alias occurrence of a document
//! and turns each raw collocate into a [`Collocate`] that carries its owning
//! occurrence.
//!
//! ## Anonymization
//!
//! A collocate whose token lies inside a *character* occurrence of the same
//! sentence ("Mary saw **John**") says something about that other character,
//! not about the word "John". Its lemma is rewritten to `CHAR-<rank>` so that
//! downstream statistics count relationships between characters instead of
//! their names. The owning occurrence itself is never used for the rewrite,
//! compared by offset pair. When several character occurrences cover the
//! token, the last one in document order decides.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::annotation::Document;
use crate::dependency::{DependencyExtractor, RawCollocate, Satellite, TokenRef};
use crate::error::Result;
use crate::relation::{Relation, RuleGroup};
use crate::scanner::AliasOccurrence;

/// Prefix of the lemma given to collocates that name another character.
pub const ANONYMIZED_PREFIX: &str = "CHAR-";

/// Anonymized lemma for a character rank (`3` → `"CHAR-3"`).
pub fn anonymized_marker(rank: usize) -> String {
    format!("{ANONYMIZED_PREFIX}{rank}")
}

/// A finalized collocate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collocate {
    pub relation: Relation,
    pub token: TokenRef,
    pub particle: Option<Satellite>,
    pub vmod: Option<Satellite>,
    /// Occurrence the collocate was extracted for.
    pub alias: AliasOccurrence,
}

impl Collocate {
    pub fn new(raw: RawCollocate, alias: AliasOccurrence) -> Self {
        Self {
            relation: raw.relation,
            token: raw.token,
            particle: raw.particle,
            vmod: raw.vmod,
            alias,
        }
    }

    /// Whether the lemma was replaced by a character marker.
    pub fn is_anonymized(&self) -> bool {
        self.token.lemma.starts_with(ANONYMIZED_PREFIX)
    }
}

/// Character occurrences indexed by sentence, for anonymization.
#[derive(Debug, Default)]
pub struct CollocateAssembler<'a> {
    characters: HashMap<usize, Vec<&'a AliasOccurrence>>,
}

impl<'a> CollocateAssembler<'a> {
    /// `characters` are the character alias occurrences of the document.
    pub fn new(characters: &'a [AliasOccurrence]) -> Self {
        let mut by_sentence: HashMap<usize, Vec<&'a AliasOccurrence>> = HashMap::new();
        for occurrence in characters {
            by_sentence.entry(occurrence.sentence_index).or_default().push(occurrence);
        }
        Self {
            characters: by_sentence,
        }
    }

    /// Character rank to anonymize `local_index` of `sentence` with, if any.
    pub fn character_at(&self, sentence: usize, local_index: usize, owner: &AliasOccurrence) -> Option<usize> {
        self.characters
            .get(&sentence)?
            .iter()
            .rev()
            .find(|c| c.covers(local_index) && c.key() != owner.key())
            .map(|c| c.entity.rank)
    }

    /// Finalizes one raw collocate for `owner`.
    pub fn finalize(&self, raw: RawCollocate, owner: &AliasOccurrence) -> Collocate {
        let mut collocate = Collocate::new(raw, owner.clone());
        if let Some(rank) = self.character_at(owner.sentence_index, collocate.token.index, owner) {
            collocate.token.lemma = anonymized_marker(rank);
        }
        collocate
    }

    /// Extracts and finalizes the collocates of every occurrence, in
    /// occurrence order then rule order.
    pub fn assemble(
        &self,
        document: &Document,
        occurrences: &[AliasOccurrence],
        extractor: &DependencyExtractor,
        groups: Option<&[RuleGroup]>,
    ) -> Result<Vec<Collocate>> {
        let mut collocates = Vec::new();
        for occurrence in occurrences {
            collocates.extend(self.assemble_occurrence(document, occurrence, extractor, groups)?);
        }
        Ok(collocates)
    }

    /// Collocates of a single occurrence.
    pub fn assemble_occurrence(
        &self,
        document: &Document,
        occurrence: &AliasOccurrence,
        extractor: &DependencyExtractor,
        groups: Option<&[RuleGroup]>,
    ) -> Result<Vec<Collocate>> {
        let sentence = document.sentence(occurrence.sentence_index)?;
        let raw = extractor.extract(sentence, &occurrence.local_indices, groups)?;
        debug!(
            sentence = occurrence.sentence_index,
            alias = %occurrence.span,
            found = raw.len(),
            "collocates extracted"
        );
        Ok(raw.into_iter().map(|r| self.finalize(r, occurrence)).collect())
    }
}
