//! # Entities — Ranked Characters, Concepts and Nouns
//!
//! An [`Entity`] is anything tracked across a story: a character, a concept or
//! a common noun. Entities arrive already ranked by salience; their position
//! in the list is their rank (1-based).
//!
//! ## Input formats
//!
//! - **JSON list**: `[{"entity": "...", "count": n, "aliases": [{"alias": "...", "count": m}]}]`
//! - **BookNLP character listing**: the HTML page BookNLP writes for a book,
//!   one character per line as `<count> Name (n) Other Name (m) ...`.
//!
//! ## Rank groups
//!
//! | Group | Ranks |
//! |-------|-------|
//! | Top   | 1     |
//! | Top-2 | 1–2   |
//! | Top-5 | 1–5   |
//! | All   | 1–20  |

use std::fs;
use std::ops::RangeInclusive;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};

/// Kind of entity whose aliases are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Character,
    Concept,
    Noun,
}

impl EntityType {
    pub const ALL: [EntityType; 3] = [EntityType::Character, EntityType::Concept, EntityType::Noun];

    /// Name used in file names and on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            EntityType::Character => "character",
            EntityType::Concept => "concept",
            EntityType::Noun => "noun",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "character" => Some(EntityType::Character),
            "concept" => Some(EntityType::Concept),
            "noun" => Some(EntityType::Noun),
            _ => None,
        }
    }
}

/// One surface form of an entity, already whitespace-tokenized on use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alias {
    #[serde(rename = "alias")]
    pub span: String,
    pub count: usize,
}

impl Alias {
    pub fn new(span: impl Into<String>, count: usize) -> Self {
        Self { span: span.into(), count }
    }

    /// Alias tokens as they must appear in the annotated token stream.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.span.split_whitespace()
    }
}

/// A ranked entity with its aliases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Canonical alias (the first one BookNLP lists).
    #[serde(rename = "entity")]
    pub identity: String,
    /// Total occurrences of all aliases.
    #[serde(default)]
    pub count: usize,
    /// 1-based rank; derived from list position, never stored on disk.
    #[serde(skip, default)]
    pub rank: usize,
    pub aliases: Vec<Alias>,
}

impl Entity {
    pub fn new(identity: impl Into<String>, rank: usize, aliases: Vec<Alias>) -> Self {
        let count = aliases.iter().map(|a| a.count).sum();
        Self {
            identity: identity.into(),
            count,
            rank,
            aliases,
        }
    }
}

/// Assigns ranks by list position and drops entities that cannot be matched.
///
/// Ranks are assigned before filtering so a skipped entity never shifts the
/// ranks of the ones after it.
pub fn rank_entities(entities: Vec<Entity>) -> Vec<Entity> {
    entities
        .into_iter()
        .enumerate()
        .filter_map(|(i, mut entity)| {
            entity.rank = i + 1;
            if entity.identity.trim().is_empty() {
                warn!(rank = entity.rank, "skipping entity with an empty identity");
                return None;
            }
            entity.aliases.retain(|alias| {
                let usable = alias.tokens().next().is_some();
                if !usable {
                    warn!(entity = %entity.identity, "skipping empty alias");
                }
                usable
            });
            if entity.aliases.is_empty() {
                warn!(entity = %entity.identity, "skipping entity without usable aliases");
                return None;
            }
            Some(entity)
        })
        .collect()
}

/// Parses a JSON entity list and ranks it.
pub fn parse_entities(json: &str) -> Result<Vec<Entity>> {
    let entities: Vec<Entity> = serde_json::from_str(json)?;
    Ok(rank_entities(entities))
}

/// Reads a JSON entity list from disk.
///
/// Undecodable bytes are replaced rather than rejected; the affected
/// aliases simply never match the token stream.
pub fn load_entities(path: &Path) -> Result<Vec<Entity>> {
    let bytes = fs::read(path)?;
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            warn!(path = %path.display(), "entity list is not valid UTF-8, decoding lossily");
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    };
    parse_entities(&text)
}

/// Writes an entity list in the JSON format [`load_entities`] reads.
pub fn save_entities(entities: &[Entity], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(entities)?)?;
    Ok(())
}

/// Parses the character listing of a BookNLP HTML page.
///
/// Only the first `top` characters are kept when `top` is given. Lines with a
/// zero count are skipped.
pub fn parse_booknlp_characters(html: &str, top: Option<usize>) -> Result<Vec<Entity>> {
    let start = html.find("</h1>").map(|i| i + 5).unwrap_or(0);
    let end = html.rfind("<h1>").filter(|&e| e >= start).unwrap_or(html.len());
    let content = &html[start..end];

    let count_re = Regex::new(r"^\d+").map_err(|e| Error::parse(e.to_string()))?;
    let first_re = Regex::new(r"^([^(]+)\s+\(").map_err(|e| Error::parse(e.to_string()))?;
    let alias_re = Regex::new(r"([^()]+)\s+\((\d+)\)").map_err(|e| Error::parse(e.to_string()))?;

    let mut characters = Vec::new();
    for line in content.split("<br />") {
        let line = line.trim();
        if line.is_empty() || top.is_some_and(|n| characters.len() >= n) {
            break;
        }
        if line.starts_with("<h1>") {
            break;
        }

        let count_match = count_re
            .find(line)
            .ok_or_else(|| Error::parse(format!("no character count on line: {line}")))?;
        let count: usize = count_match
            .as_str()
            .parse()
            .map_err(|_| Error::parse(format!("bad character count on line: {line}")))?;
        if count == 0 {
            continue;
        }

        let rest = line[count_match.end()..].trim();
        let identity = first_re
            .captures(rest)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .ok_or_else(|| Error::parse(format!("no character name on line: {line}")))?;

        let aliases: Vec<Alias> = alias_re
            .captures_iter(rest)
            .filter_map(|c| {
                let span = c.get(1)?.as_str().trim();
                let n = c.get(2)?.as_str().parse().ok()?;
                Some(Alias::new(span, n))
            })
            .collect();
        if aliases.is_empty() {
            return Err(Error::parse(format!("no aliases on line: {line}")));
        }

        characters.push(Entity {
            identity,
            count,
            rank: 0,
            aliases,
        });
    }

    Ok(rank_entities(characters))
}

/// Named group of character ranks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RankGroup {
    Top,
    Top2,
    Top5,
    All,
}

impl RankGroup {
    pub const ALL: [RankGroup; 4] = [RankGroup::Top, RankGroup::Top2, RankGroup::Top5, RankGroup::All];

    pub fn name(&self) -> &'static str {
        match self {
            RankGroup::Top => "Top",
            RankGroup::Top2 => "Top-2",
            RankGroup::Top5 => "Top-5",
            RankGroup::All => "All",
        }
    }

    pub fn ranks(&self) -> RangeInclusive<usize> {
        match self {
            RankGroup::Top => 1..=1,
            RankGroup::Top2 => 1..=2,
            RankGroup::Top5 => 1..=5,
            RankGroup::All => 1..=20,
        }
    }

    pub fn contains(&self, rank: usize) -> bool {
        self.ranks().contains(&rank)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_entities_assigns_ranks() {
        let json = r#"[
            {"entity": "Elizabeth", "count": 9, "aliases": [{"alias": "Elizabeth", "count": 7}, {"alias": "Lizzy", "count": 2}]},
            {"entity": "Darcy", "count": 4, "aliases": [{"alias": "Mr. Darcy", "count": 4}]}
        ]"#;
        let entities = parse_entities(json).unwrap();
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].rank, 1);
        assert_eq!(entities[1].rank, 2);
        assert_eq!(entities[1].aliases[0].tokens().collect::<Vec<_>>(), vec!["Mr.", "Darcy"]);
    }

    #[test]
    fn test_skipped_entity_keeps_following_ranks() {
        let json = r#"[
            {"entity": "", "aliases": [{"alias": "x", "count": 1}]},
            {"entity": "Darcy", "aliases": [{"alias": "Darcy", "count": 4}]}
        ]"#;
        let entities = parse_entities(json).unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].rank, 2);
    }

    #[test]
    fn test_booknlp_characters() {
        let html = "<h1>Characters</h1>12 Elizabeth Bennet (8) Lizzy (4) <br />\
                    0 Nobody (0) <br />\
                    5 Darcy (5) <br /><h1>Text</h1>";
        let entities = parse_booknlp_characters(html, None).unwrap();
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].identity, "Elizabeth Bennet");
        assert_eq!(entities[0].count, 12);
        assert_eq!(entities[0].aliases, vec![Alias::new("Elizabeth Bennet", 8), Alias::new("Lizzy", 4)]);
        assert_eq!(entities[1].identity, "Darcy");
    }

    #[test]
    fn test_booknlp_top() {
        let html = "<h1>Characters</h1>3 A (3) <br />2 B (2) <br /><h1>Text</h1>";
        let entities = parse_booknlp_characters(html, Some(1)).unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].identity, "A");
    }

    #[test]
    fn test_rank_groups() {
        assert!(RankGroup::Top.contains(1));
        assert!(!RankGroup::Top2.contains(3));
        assert!(RankGroup::All.contains(20));
        assert_eq!(RankGroup::Top5.name(), "Top-5");
    }
}
