//! # collocate-core — Entity Collocate Extraction for Narrative Text
//!
//! This crate finds, for every tracked entity of a story (characters,
//! concepts, common nouns), the grammatical contexts it takes part in: the
//! verbs it is the subject or object of, the adjectives that modify it, the
//! things it possesses. These **collocates** feed per-entity statistics
//! computed elsewhere.
//!
//! ## Pipeline
//!
//! The data flows through two stages, each one a pure function of its inputs:
//!
//! 1.  **Alias identification**
//!     *   [`trie`]: ranked entity aliases → token-level prefix trie.
//!     *   [`coref`]: BookNLP coreference stream → pronoun table.
//!     *   [`scanner`]: greedy longest match of the trie over the document,
//!         plus pronouns → [`AliasOccurrence`]s.
//! 2.  **Collocate extraction**
//!     *   [`dependency`]: one occurrence + its sentence's dependency graph →
//!         typed raw collocates.
//!     *   [`assembler`]: raw collocates → [`Collocate`]s, with tokens naming
//!         another character rewritten to `CHAR-<rank>`.
//!
//! [`pipeline`] runs both stages on one document with progress events,
//! [`batch`] runs them over a whole [`corpus`] in parallel, and [`table`]
//! persists the results.
//!
//! ## Example
//!
//! ```rust
//! use collocate_core::annotation::{sentence_tokens, DependencyGraph, Document};
//! use collocate_core::entity::{Alias, Entity};
//! use collocate_core::{DocumentPipeline, Relation};
//!
//! let mut offset = 0;
//! let mut graph = DependencyGraph::default();
//! graph.add("nsubj", 2, 1);
//! graph.add("acomp", 2, 3);
//! let tokens = sentence_tokens(
//!     &[("Mary", "Mary", "NNP"), ("was", "be", "VBD"), ("happy", "happy", "JJ")],
//!     &mut offset,
//! );
//! let document = Document::from_sentences(vec![(tokens, graph)]);
//! let entities = vec![Entity::new("Mary", 1, vec![Alias::new("Mary", 3)])];
//!
//! let pipeline = DocumentPipeline::new();
//! let aliases = pipeline.identify_aliases(&document, &entities, None).unwrap();
//! let collocates = pipeline.extract_collocates(&document, &aliases, &aliases).unwrap();
//!
//! assert_eq!(collocates[0].relation, Relation::Acomp);
//! assert_eq!(collocates[0].token.lemma, "happy");
//! ```

pub mod annotation;
pub mod assembler;
pub mod batch;
pub mod config;
pub mod coref;
pub mod corpus;
pub mod dependency;
pub mod entity;
pub mod error;
pub mod pipeline;
pub mod relation;
pub mod scanner;
pub mod table;
pub mod trie;

pub use assembler::Collocate;
pub use batch::{BatchReport, BatchRunner};
pub use config::PipelineConfig;
pub use entity::{Entity, EntityType};
pub use error::{Error, Result};
pub use pipeline::{DocumentPipeline, PipelineEvent};
pub use relation::{Relation, Role, RuleGroup};
pub use scanner::AliasOccurrence;
