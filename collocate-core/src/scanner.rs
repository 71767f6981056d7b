//! # Alias Scanner — Locating Entity Mentions in a Document
//!
//! A single left-to-right pass over the document that walks the [`AliasTrie`]
//! token by token and consults the [`CorefTable`] for pronouns.
//!
//! ## Algorithm
//!
//! ```text
//! for each token:
//!     pronoun here and nothing buffered  → emit pronoun occurrence
//!     token is a child of the trie cursor → buffer it, advance the cursor
//!     something buffered                 → close the match, reset the cursor
//! ```
//!
//! Closing a match emits an occurrence when the cursor sits on a terminal and
//! silently drops the buffer otherwise. The token that closed the match is not
//! retried from the root, so "Mary Mary" with a `Mary` alias and a stray
//! `Mary Jane` path behaves greedily. A match that is still open at the end of
//! a sentence is closed there: aliases never span sentences.
//!
//! Because the buffer only closes when the cursor has no child for the next
//! token, the longest alias available at a start position always wins.

use serde::{Deserialize, Serialize};

use crate::annotation::{Document, Sentence, Token};
use crate::coref::{CorefEntry, CorefTable};
use crate::trie::{AliasTrie, NodeId};

/// Entity an occurrence resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub name: String,
    pub rank: usize,
}

/// One located alias (or pronoun) in a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasOccurrence {
    /// 1-based sentence index.
    pub sentence_index: usize,
    /// Global (document) token indices covered.
    pub indices: Vec<usize>,
    /// Local (sentence, 1-based) token indices covered.
    pub local_indices: Vec<usize>,
    pub begin_offset: usize,
    pub end_offset: usize,
    /// Alias span as listed for the entity, or the pronoun text.
    pub span: String,
    pub entity: EntityRef,
    /// Usage count of the alias (or pronoun form) for the entity.
    pub count: usize,
}

impl AliasOccurrence {
    /// Offset pair that identifies the occurrence within a document and type.
    pub fn key(&self) -> (usize, usize) {
        (self.begin_offset, self.end_offset)
    }

    /// Whether the local token index falls inside this occurrence.
    pub fn covers(&self, local_index: usize) -> bool {
        self.local_indices.contains(&local_index)
    }

    fn from_pronoun(sentence: &Sentence, token: &Token, entry: &CorefEntry) -> Self {
        Self {
            sentence_index: sentence.index,
            indices: vec![token.global],
            local_indices: vec![token.index],
            begin_offset: entry.start,
            end_offset: entry.end,
            span: entry.pronoun.clone(),
            entity: EntityRef {
                name: entry.entity.clone(),
                rank: entry.rank,
            },
            count: entry.frequency,
        }
    }
}

/// Trie cursor plus the tokens matched so far.
struct Matcher<'t> {
    trie: &'t AliasTrie,
    cursor: NodeId,
    buffer: Vec<&'t Token>,
}

impl<'t> Matcher<'t> {
    fn new(trie: &'t AliasTrie) -> Self {
        Self {
            trie,
            cursor: trie.root(),
            buffer: Vec::new(),
        }
    }

    fn is_idle(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Tries to extend the match with `token`.
    fn advance(&mut self, token: &'t Token) -> bool {
        match self.trie.child(self.cursor, &token.word) {
            Some(child) => {
                self.buffer.push(token);
                self.cursor = child;
                true
            }
            None => false,
        }
    }

    /// Ends the current match, emitting it when the cursor is on a terminal.
    fn close(&mut self, sentence: &Sentence) -> Option<AliasOccurrence> {
        let buffer = std::mem::take(&mut self.buffer);
        let cursor = std::mem::replace(&mut self.cursor, self.trie.root());
        let terminal = self.trie.terminal(cursor)?;
        let (first, last) = (buffer.first()?, buffer.last()?);
        Some(AliasOccurrence {
            sentence_index: sentence.index,
            indices: buffer.iter().map(|t| t.global).collect(),
            local_indices: buffer.iter().map(|t| t.index).collect(),
            begin_offset: first.start,
            end_offset: last.end,
            span: terminal.span.clone(),
            entity: EntityRef {
                name: terminal.entity.clone(),
                rank: terminal.rank,
            },
            count: terminal.count,
        })
    }
}

/// Finds every alias occurrence in `document`, in document order.
pub fn scan(trie: &AliasTrie, document: &Document, coref: Option<&CorefTable>) -> Vec<AliasOccurrence> {
    let mut occurrences = Vec::new();
    let mut matcher = Matcher::new(trie);

    for sentence in &document.sentences {
        for token in &sentence.tokens {
            if matcher.is_idle() {
                if let Some(entry) = coref.and_then(|table| table.get(token.global)) {
                    occurrences.push(AliasOccurrence::from_pronoun(sentence, token, entry));
                    continue;
                }
            }

            if matcher.advance(token) {
                continue;
            }

            if !matcher.is_idle() {
                occurrences.extend(matcher.close(sentence));
            }
        }

        if !matcher.is_idle() {
            occurrences.extend(matcher.close(sentence));
        }
    }

    occurrences
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{sentence_tokens, DependencyGraph};
    use crate::entity::{Alias, Entity};

    fn doc(sentences: &[&[&str]]) -> Document {
        let mut offset = 0;
        Document::from_sentences(
            sentences
                .iter()
                .map(|words| {
                    let triples: Vec<(&str, &str, &str)> = words.iter().map(|w| (*w, *w, "NN")).collect();
                    (sentence_tokens(&triples, &mut offset), DependencyGraph::default())
                })
                .collect(),
        )
    }

    fn trie() -> AliasTrie {
        AliasTrie::build(&[
            Entity::new("John Smith", 1, vec![Alias::new("John Smith", 5), Alias::new("John", 2)]),
            Entity::new("Mary", 2, vec![Alias::new("Mary", 4)]),
        ])
    }

    #[test]
    fn test_multi_token_alias() {
        let d = doc(&[&["Then", "John", "Smith", "entered", "."]]);
        let occ = scan(&trie(), &d, None);
        assert_eq!(occ.len(), 1);
        let o = &occ[0];
        assert_eq!(o.entity.name, "John Smith");
        assert_eq!(o.entity.rank, 1);
        assert_eq!(o.count, 5);
        assert_eq!(o.local_indices, vec![2, 3]);
        assert_eq!(o.indices, vec![1, 2]);
        assert_eq!(o.begin_offset, d.sentences[0].tokens[1].start);
        assert_eq!(o.end_offset, d.sentences[0].tokens[2].end);
    }

    #[test]
    fn test_prefix_alias_when_longer_path_fails() {
        let d = doc(&[&["John", "left", "."]]);
        let occ = scan(&trie(), &d, None);
        assert_eq!(occ.len(), 1);
        assert_eq!(occ[0].span, "John");
        assert_eq!(occ[0].count, 2);
    }

    #[test]
    fn test_repeated_alias_gives_independent_occurrences() {
        let d = doc(&[&["Mary", "and", "Mary", "."], &["Mary", "slept"]]);
        let occ = scan(&trie(), &d, None);
        assert_eq!(occ.len(), 3);
        assert_eq!(occ[2].sentence_index, 2);
        assert_eq!(occ[2].local_indices, vec![1]);
    }

    #[test]
    fn test_closing_token_is_not_retried() {
        // "Mary" closes the "John" match and is skipped.
        let d = doc(&[&["John", "Mary", "Mary", "."]]);
        let occ = scan(&trie(), &d, None);
        let spans: Vec<&str> = occ.iter().map(|o| o.span.as_str()).collect();
        assert_eq!(spans, vec!["John", "Mary"]);
        assert_eq!(occ[1].local_indices, vec![3]);
    }

    #[test]
    fn test_partial_match_without_terminal_is_dropped() {
        let t = AliasTrie::build(&[Entity::new("New York", 1, vec![Alias::new("New York City", 1)])]);
        let d = doc(&[&["New", "York", "is", "big"]]);
        assert!(scan(&t, &d, None).is_empty());
    }

    #[test]
    fn test_match_closed_at_sentence_end() {
        let d = doc(&[&["Ask", "John"], &["Smith", "came"]]);
        let occ = scan(&trie(), &d, None);
        assert_eq!(occ.len(), 1);
        assert_eq!(occ[0].span, "John");
        assert_eq!(occ[0].sentence_index, 1);
    }

    #[test]
    fn test_pronoun_from_coref_table() {
        let d = doc(&[&["John", "Smith", "entered", "."], &["He", "left", "."]]);
        let mut table = CorefTable::default();
        let he = &d.sentences[1].tokens[0];
        table.insert(
            he.global,
            CorefEntry {
                pronoun: "He".into(),
                start: he.start,
                end: he.end,
                entity: "John Smith".into(),
                rank: 1,
                frequency: 3,
            },
        );
        let occ = scan(&trie(), &d, Some(&table));
        assert_eq!(occ.len(), 2);
        let p = &occ[1];
        assert_eq!(p.span, "He");
        assert_eq!(p.entity.rank, 1);
        assert_eq!(p.count, 3);
        assert_eq!(p.sentence_index, 2);
        assert_eq!(p.local_indices, vec![1]);
        assert_ne!(p.key(), occ[0].key());
    }

    #[test]
    fn test_pronoun_ignored_inside_open_match() {
        let d = doc(&[&["John", "he", "ran"]]);
        let mut table = CorefTable::default();
        table.insert(
            1,
            CorefEntry {
                pronoun: "he".into(),
                start: 0,
                end: 0,
                entity: "Mary".into(),
                rank: 2,
                frequency: 1,
            },
        );
        let occ = scan(&trie(), &d, Some(&table));
        assert_eq!(occ.len(), 1);
        assert_eq!(occ[0].span, "John");
    }
}
