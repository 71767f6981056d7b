//! # Syntactic Annotation — Tokens, Sentences and Dependency Graphs
//!
//! The pipeline never tokenizes or parses text itself. It reads the output of
//! an external annotator (Stanford CoreNLP, JSON output format) and exposes it
//! as a read-only [`Document`]: an ordered list of [`Sentence`]s, each owning
//! its [`Token`]s and a labeled [`DependencyGraph`].
//!
//! ## Indexing
//!
//! - **Local index**: 1-based position of a token inside its sentence (the
//!   same numbering the dependency edges use; 0 is ROOT).
//! - **Global index**: 0-based position of a token across the whole document,
//!   the numbering the coreference stream uses.
//!
//! ## CoreNLP JSON
//!
//! ```json
//! {"sentences": [{"index": 0,
//!   "tokens": [{"index": 1, "word": "Mary", "lemma": "Mary", "pos": "NNP",
//!               "characterOffsetBegin": 0, "characterOffsetEnd": 4}],
//!   "collapsed-ccprocessed-dependencies": [{"dep": "nsubj", "governor": 3, "dependent": 1}]}]}
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};

/// An annotated token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Token {
    /// 1-based index within the sentence.
    pub index: usize,
    /// 0-based index within the document.
    pub global: usize,
    pub word: String,
    pub lemma: String,
    /// Penn Treebank tag (e.g. "VBD", "NN", "JJ").
    pub pos: String,
    /// Character offset of the first character (inclusive).
    pub start: usize,
    /// Character offset past the last character (exclusive).
    pub end: usize,
}

/// A labeled dependency edge between two local token indices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub relation: String,
    pub governor: usize,
    pub dependent: usize,
}

/// Dependency graph of a single sentence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DependencyGraph {
    edges: Vec<Edge>,
}

impl DependencyGraph {
    pub fn new(edges: Vec<Edge>) -> Self {
        Self { edges }
    }

    /// Adds an edge `relation(governor → dependent)`.
    pub fn add(&mut self, relation: &str, governor: usize, dependent: usize) {
        self.edges.push(Edge {
            relation: relation.to_string(),
            governor,
            dependent,
        });
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Edges of one relation type, in annotation order.
    pub fn links_by_type<'a>(&'a self, relation: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.relation == relation)
    }

    /// Dependents of `governor` reached through `relation`.
    pub fn dependents_by_type<'a>(&'a self, governor: usize, relation: &'a str) -> impl Iterator<Item = usize> + 'a {
        self.links_by_type(relation)
            .filter(move |e| e.governor == governor)
            .map(|e| e.dependent)
    }
}

/// A sentence: tokens plus their dependency graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sentence {
    /// 1-based index within the document.
    pub index: usize,
    pub tokens: Vec<Token>,
    pub graph: DependencyGraph,
}

impl Sentence {
    /// Looks up a token by local index.
    ///
    /// A missing token means the annotation is malformed.
    pub fn token(&self, index: usize) -> Result<&Token> {
        index
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .filter(|t| t.index == index)
            .or_else(|| self.tokens.iter().find(|t| t.index == index))
            .ok_or(Error::MalformedAnnotation {
                sentence: self.index,
                token: index,
            })
    }

    /// Checks that every edge references tokens the sentence has.
    pub fn validate(&self) -> Result<()> {
        for edge in self.graph.edges() {
            self.token(edge.governor)?;
            self.token(edge.dependent)?;
        }
        Ok(())
    }
}

/// An annotated document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub sentences: Vec<Sentence>,
}

impl Document {
    /// Builds a document from per-sentence tokens and graphs, numbering
    /// sentences and global token positions.
    pub fn from_sentences(sentences: Vec<(Vec<Token>, DependencyGraph)>) -> Self {
        let mut global = 0;
        let sentences = sentences
            .into_iter()
            .enumerate()
            .map(|(i, (mut tokens, graph))| {
                for token in &mut tokens {
                    token.global = global;
                    global += 1;
                }
                Sentence {
                    index: i + 1,
                    tokens,
                    graph,
                }
            })
            .collect();
        Self { sentences }
    }

    /// Looks up a sentence by 1-based index.
    pub fn sentence(&self, index: usize) -> Result<&Sentence> {
        index
            .checked_sub(1)
            .and_then(|i| self.sentences.get(i))
            .ok_or(Error::MissingSentence(index))
    }

    pub fn token_count(&self) -> usize {
        self.sentences.iter().map(|s| s.tokens.len()).sum()
    }

    /// Checks every sentence graph.
    pub fn validate(&self) -> Result<()> {
        self.sentences.iter().try_for_each(Sentence::validate)
    }

    /// Parses CoreNLP JSON output.
    pub fn from_corenlp_json(json: &str) -> Result<Self> {
        let raw: CoreNlpDocument = serde_json::from_str(json)?;
        let sentences = raw
            .sentences
            .into_iter()
            .map(|s| {
                let tokens = s
                    .tokens
                    .into_iter()
                    .map(|t| Token {
                        index: t.index,
                        global: 0,
                        word: t.word,
                        lemma: t.lemma,
                        pos: t.pos,
                        start: t.begin,
                        end: t.end,
                    })
                    .collect();
                let edges = s
                    .dependencies
                    .into_iter()
                    .filter(|d| d.governor != 0)
                    .map(|d| Edge {
                        relation: d.dep,
                        governor: d.governor,
                        dependent: d.dependent,
                    })
                    .collect();
                (tokens, DependencyGraph::new(edges))
            })
            .collect();
        Ok(Self::from_sentences(sentences))
    }

    /// Reads a CoreNLP JSON file.
    ///
    /// Invalid UTF-8 is decoded lossily with a warning; only tokens containing
    /// the undecodable bytes are affected.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        let text = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => {
                warn!(path = %path.display(), "annotation is not valid UTF-8, decoding lossily");
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        };
        Self::from_corenlp_json(&text)
    }
}

#[derive(Deserialize)]
struct CoreNlpDocument {
    sentences: Vec<CoreNlpSentence>,
}

#[derive(Deserialize)]
struct CoreNlpSentence {
    tokens: Vec<CoreNlpToken>,
    #[serde(rename = "collapsed-ccprocessed-dependencies", default)]
    dependencies: Vec<CoreNlpDependency>,
}

#[derive(Deserialize)]
struct CoreNlpToken {
    index: usize,
    word: String,
    #[serde(default)]
    lemma: String,
    #[serde(default)]
    pos: String,
    #[serde(rename = "characterOffsetBegin")]
    begin: usize,
    #[serde(rename = "characterOffsetEnd")]
    end: usize,
}

#[derive(Deserialize)]
struct CoreNlpDependency {
    dep: String,
    governor: usize,
    dependent: usize,
}

/// Builds a token whose offsets are derived from a running cursor.
///
/// Used by tests and fixtures that describe sentences as `(word, lemma, pos)`.
pub fn sentence_tokens(words: &[(&str, &str, &str)], offset: &mut usize) -> Vec<Token> {
    words
        .iter()
        .enumerate()
        .map(|(i, (word, lemma, pos))| {
            let start = *offset;
            let end = start + word.chars().count();
            *offset = end + 1;
            Token {
                index: i + 1,
                global: 0,
                word: word.to_string(),
                lemma: lemma.to_string(),
                pos: pos.to_string(),
                start,
                end,
            }
        })
        .collect()
}
