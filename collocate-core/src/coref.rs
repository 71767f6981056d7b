//! # Coreference Resolver — Pronouns Pointing at Tracked Entities
//!
//! The alias trie only finds names. Pronouns ("he", "her", "themselves") are
//! recovered from an external coreference annotation (BookNLP), which labels
//! every token with the id of the cluster it belongs to.
//!
//! ## Algorithm
//!
//! 1. Consecutive tokens with the same cluster id form one mention span.
//! 2. A cluster denotes the first entity, in rank order, whose identity string
//!    is one of the cluster's mention texts. Clusters matching no entity are
//!    dropped.
//! 3. Every mention of a matched cluster whose text is a pronoun becomes a
//!    [`CorefEntry`], keyed by the global position of its first token, along
//!    with how often that exact pronoun form occurs in the cluster.
//!
//! Exact text match on identities means two entities sharing an alias string
//! can swap clusters; the first in rank order always wins.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::entity::Entity;
use crate::error::{Error, Result};

/// Closed pronoun lexicon (lowercase).
pub const PRONOUNS: &[&str] = &[
    "he", "her", "hers", "herself", "him", "himself", "his", "i", "me", "my", "myself", "our",
    "ours", "ourselves", "she", "their", "theirs", "them", "themselves", "they", "us", "we",
    "who", "whoever", "whom", "whomever", "you", "your", "yourself", "yourselves",
];

/// Case-insensitive pronoun test.
pub fn is_pronoun(text: &str) -> bool {
    let lower = text.to_lowercase();
    PRONOUNS.contains(&lower.as_str())
}

/// One token of the mention stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentionToken {
    /// Cluster id, `None` when the token refers to no entity.
    pub cluster: Option<i64>,
    /// 0-based global token position.
    pub position: usize,
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// A resolved pronoun.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorefEntry {
    pub pronoun: String,
    pub start: usize,
    pub end: usize,
    /// Identity of the resolved entity.
    pub entity: String,
    pub rank: usize,
    /// Occurrences of this exact pronoun form in the cluster.
    pub frequency: usize,
}

/// Global token position → resolved pronoun.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorefTable {
    entries: HashMap<usize, CorefEntry>,
}

impl CorefTable {
    pub fn get(&self, position: usize) -> Option<&CorefEntry> {
        self.entries.get(&position)
    }

    pub fn insert(&mut self, position: usize, entry: CorefEntry) {
        self.entries.insert(position, entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug)]
struct Mention {
    position: usize,
    text: String,
    start: usize,
    end: usize,
}

/// Groups consecutive same-cluster tokens into mentions, per cluster.
fn group_mentions(stream: &[MentionToken]) -> BTreeMap<i64, Vec<Mention>> {
    let mut clusters: BTreeMap<i64, Vec<Mention>> = BTreeMap::new();
    let mut current: Option<(i64, Mention)> = None;

    for token in stream {
        if let (Some(id), Some((open, mention))) = (token.cluster, current.as_mut()) {
            if *open == id {
                mention.text.push(' ');
                mention.text.push_str(&token.text);
                mention.end = token.end;
                continue;
            }
        }
        if let Some((id, mention)) = current.take() {
            clusters.entry(id).or_default().push(mention);
        }
        current = token.cluster.map(|id| {
            (
                id,
                Mention {
                    position: token.position,
                    text: token.text.clone(),
                    start: token.start,
                    end: token.end,
                },
            )
        });
    }
    if let Some((id, mention)) = current {
        clusters.entry(id).or_default().push(mention);
    }
    clusters
}

/// Builds the pronoun table for a ranked entity list.
pub fn resolve(stream: &[MentionToken], entities: &[Entity]) -> CorefTable {
    let mut table = CorefTable::default();

    for (cluster, mentions) in group_mentions(stream) {
        let Some(entity) = entities
            .iter()
            .find(|e| mentions.iter().any(|m| m.text == e.identity))
        else {
            debug!(cluster, "coreference cluster matches no tracked entity");
            continue;
        };

        let mut forms: HashMap<&str, usize> = HashMap::new();
        for m in mentions.iter().filter(|m| is_pronoun(&m.text)) {
            *forms.entry(m.text.as_str()).or_insert(0) += 1;
        }

        for m in mentions.iter().filter(|m| is_pronoun(&m.text)) {
            table.insert(
                m.position,
                CorefEntry {
                    pronoun: m.text.clone(),
                    start: m.start,
                    end: m.end,
                    entity: entity.identity.clone(),
                    rank: entity.rank,
                    frequency: forms[m.text.as_str()],
                },
            );
        }
    }

    table
}

/// Reads a BookNLP `.tokens` file.
///
/// Columns used: token id (2), begin offset (3), end offset (4), original word
/// (7) and the character id in the last column (`-1` for none). Bytes that are
/// not valid UTF-8 are replaced with a warning; the row still takes its place
/// in the mention stream.
pub fn read_booknlp_tokens<R: Read>(reader: R) -> Result<Vec<MentionToken>> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .quoting(false)
        .from_reader(reader);

    let mut tokens = Vec::new();
    for record in rdr.byte_records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let fields: Vec<Cow<'_, str>> = record.iter().map(String::from_utf8_lossy).collect();
        if fields.iter().any(|f| matches!(f, Cow::Owned(_))) {
            warn!(line, "undecodable bytes in token row replaced");
        }
        if fields.len() < 8 {
            return Err(Error::parse(format!("token row {line} has {} columns", fields.len())));
        }

        let number = |i: usize| -> Result<usize> {
            fields[i]
                .trim()
                .parse()
                .map_err(|_| Error::parse(format!("token row {line}: bad number {:?}", fields[i])))
        };
        let cluster: i64 = fields[fields.len() - 1]
            .trim()
            .parse()
            .map_err(|_| Error::parse(format!("token row {line}: bad cluster id")))?;

        tokens.push(MentionToken {
            cluster: (cluster >= 0).then_some(cluster),
            position: number(2)?,
            start: number(3)?,
            end: number(4)?,
            text: fields[7].to_string(),
        });
    }
    Ok(tokens)
}

/// Opens and reads a BookNLP `.tokens` file.
pub fn load_booknlp_tokens(path: &Path) -> Result<Vec<MentionToken>> {
    read_booknlp_tokens(File::open(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Alias;

    fn tok(cluster: i64, position: usize, text: &str, start: usize) -> MentionToken {
        MentionToken {
            cluster: (cluster >= 0).then_some(cluster),
            position,
            text: text.to_string(),
            start,
            end: start + text.len(),
        }
    }

    fn entities() -> Vec<Entity> {
        vec![
            Entity::new("John Smith", 1, vec![Alias::new("John Smith", 5)]),
            Entity::new("Mary", 2, vec![Alias::new("Mary", 3)]),
        ]
    }

    #[test]
    fn test_is_pronoun() {
        assert!(is_pronoun("He"));
        assert!(is_pronoun("I"));
        assert!(!is_pronoun("it"));
        assert!(!is_pronoun("John"));
    }

    #[test]
    fn test_resolve_cluster() {
        let stream = vec![
            tok(7, 0, "John", 0),
            tok(7, 1, "Smith", 5),
            tok(-1, 2, "entered", 11),
            tok(-1, 3, ".", 18),
            tok(7, 4, "He", 20),
            tok(-1, 5, "saw", 23),
            tok(7, 6, "him", 27),
            tok(-1, 7, ".", 30),
            tok(7, 8, "He", 32),
        ];
        let table = resolve(&stream, &entities());
        assert_eq!(table.len(), 3);
        let he = table.get(4).unwrap();
        assert_eq!(he.entity, "John Smith");
        assert_eq!(he.rank, 1);
        assert_eq!(he.frequency, 2);
        assert_eq!(table.get(6).unwrap().frequency, 1);
        assert_eq!(table.get(6).unwrap().pronoun, "him");
        assert!(table.get(0).is_none());
    }

    #[test]
    fn test_adjacent_clusters_split_mentions() {
        // "Mary" immediately followed by a token of another cluster.
        let stream = vec![tok(2, 0, "Mary", 0), tok(3, 1, "her", 5), tok(2, 2, "she", 9)];
        let table = resolve(&stream, &entities());
        // Cluster 3 never names a tracked entity.
        assert!(table.get(1).is_none());
        assert_eq!(table.get(2).unwrap().entity, "Mary");
    }

    #[test]
    fn test_unmatched_cluster_dropped() {
        let stream = vec![tok(1, 0, "Bob", 0), tok(1, 1, "he", 4)];
        assert!(resolve(&stream, &entities()).is_empty());
    }

    #[test]
    fn test_cluster_without_pronouns() {
        let stream = vec![tok(1, 0, "Mary", 0), tok(-1, 1, "ran", 5)];
        assert!(resolve(&stream, &entities()).is_empty());
    }

    #[test]
    fn test_first_rank_wins() {
        let list = vec![
            Entity::new("Tom", 1, vec![Alias::new("Tom", 1)]),
            Entity::new("Sawyer", 2, vec![Alias::new("Sawyer", 1)]),
        ];
        let stream = vec![
            tok(4, 0, "Sawyer", 0),
            tok(-1, 1, "said", 7),
            tok(4, 2, "Tom", 12),
            tok(-1, 3, "and", 16),
            tok(4, 4, "he", 20),
        ];
        let he = resolve(&stream, &list).get(4).cloned().unwrap();
        assert_eq!(he.rank, 1);
        assert_eq!(he.entity, "Tom");
    }

    #[test]
    fn test_read_booknlp_tokens() {
        let data = "paragraphId\tsentenceID\ttokenId\tbeginOffset\tendOffset\twhitespaceAfter\theadTokenId\toriginalWord\tnormalizedWord\tlemma\tpos\tner\tdeprel\tinQuotation\tcharacterId\n\
                    0\t0\t0\t0\t4\tS\t1\tJohn\tJohn\tJohn\tNNP\tPERSON\tnsubj\tO\t3\n\
                    0\t0\t1\t5\t10\tS\t2\tsmiled\tsmiled\tsmile\tVBD\tO\tROOT\tO\t-1\n";
        let tokens = read_booknlp_tokens(data.as_bytes()).unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].cluster, Some(3));
        assert_eq!(tokens[0].text, "John");
        assert_eq!(tokens[1].cluster, None);
        assert_eq!(tokens[1].start, 5);
    }

    #[test]
    fn test_undecodable_word_keeps_mention_break() {
        let header = "paragraphId\tsentenceID\ttokenId\tbeginOffset\tendOffset\twhitespaceAfter\theadTokenId\toriginalWord\tnormalizedWord\tlemma\tpos\tner\tdeprel\tinQuotation\tcharacterId\n";
        let mut data = header.as_bytes().to_vec();
        let rows: [(usize, usize, &[u8], i64); 5] = [
            (0, 0, b"Mary".as_slice(), 2),
            (1, 5, b"said".as_slice(), -1),
            (2, 10, b"she".as_slice(), 2),
            (3, 14, b"caf\xe9".as_slice(), -1),
            (4, 19, b"her".as_slice(), 2),
        ];
        for (id, begin, word, cluster) in rows {
            data.extend_from_slice(format!("0\t0\t{id}\t{begin}\t{}\tS\t0\t", begin + word.len()).as_bytes());
            data.extend_from_slice(word);
            data.extend_from_slice(format!("\tw\tw\tX\tO\tdep\tO\t{cluster}\n").as_bytes());
        }

        let tokens = read_booknlp_tokens(data.as_slice()).unwrap();
        assert_eq!(tokens.len(), 5);
        assert_eq!(tokens[3].cluster, None);
        assert_eq!(tokens[3].text, "caf\u{FFFD}");

        let table = resolve(&tokens, &entities());
        assert_eq!(table.get(2).unwrap().entity, "Mary");
        assert_eq!(table.get(4).unwrap().pronoun, "her");
    }

    #[test]
    fn test_short_row_is_parse_error() {
        let data = "h\n0\t1\t2\n";
        assert!(matches!(read_booknlp_tokens(data.as_bytes()), Err(Error::Parse(_))));
    }
}
