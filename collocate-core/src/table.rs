//! # Output Tables — Alias Occurrences and Collocates
//!
//! Two tables are persisted per story and entity type:
//!
//! - **Alias table** (JSON): every [`AliasOccurrence`], pretty-printed.
//! - **Collocate table** (TSV): one row per [`Collocate`], keyed by the
//!   owning occurrence's offsets.
//!
//! | Column        | Content                               |
//! |---------------|---------------------------------------|
//! | BEGIN_OFFSET  | owning occurrence begin offset        |
//! | END_OFFSET    | owning occurrence end offset          |
//! | INDEX         | collocate token (local index)         |
//! | LEMMA         | lemma, or `CHAR-<rank>`               |
//! | WORD          | surface word                          |
//! | TYPE          | relation label                        |
//! | PRT_INDEX     | particle index (blank when absent)    |
//! | PRT_LEMMA     | particle lemma (blank when absent)    |
//! | VMOD_INDEX    | verbal modifier index (blank)         |
//! | VMOD_LEMMA    | verbal modifier lemma (blank)         |
//!
//! Reading a collocate table back joins each row to its occurrence through
//! the offset pair.

use std::collections::{HashMap, HashSet};
use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::assembler::Collocate;
use crate::dependency::{Satellite, TokenRef};
use crate::error::{Error, Result};
use crate::relation::{Relation, Role};
use crate::scanner::AliasOccurrence;

/// Collocate table header.
pub const COLUMNS: [&str; 10] = [
    "BEGIN_OFFSET",
    "END_OFFSET",
    "INDEX",
    "LEMMA",
    "WORD",
    "TYPE",
    "PRT_INDEX",
    "PRT_LEMMA",
    "VMOD_INDEX",
    "VMOD_LEMMA",
];

/// Writes an alias table.
pub fn write_occurrences<W: Write>(writer: W, occurrences: &[AliasOccurrence]) -> Result<()> {
    serde_json::to_writer_pretty(writer, occurrences)?;
    Ok(())
}

/// Reads an alias table.
pub fn read_occurrences<R: Read>(reader: R) -> Result<Vec<AliasOccurrence>> {
    Ok(serde_json::from_reader(reader)?)
}

/// One row of the collocate table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct CollocateRow {
    pub begin_offset: usize,
    pub end_offset: usize,
    pub index: usize,
    pub lemma: String,
    pub word: String,
    #[serde(rename = "TYPE")]
    pub relation: Relation,
    pub prt_index: Option<usize>,
    pub prt_lemma: Option<String>,
    pub vmod_index: Option<usize>,
    pub vmod_lemma: Option<String>,
}

impl From<&Collocate> for CollocateRow {
    fn from(c: &Collocate) -> Self {
        Self {
            begin_offset: c.alias.begin_offset,
            end_offset: c.alias.end_offset,
            index: c.token.index,
            lemma: c.token.lemma.clone(),
            word: c.token.word.clone(),
            relation: c.relation,
            prt_index: c.particle.as_ref().map(|p| p.index),
            prt_lemma: c.particle.as_ref().map(|p| p.lemma.clone()),
            vmod_index: c.vmod.as_ref().map(|v| v.index),
            vmod_lemma: c.vmod.as_ref().map(|v| v.lemma.clone()),
        }
    }
}

impl CollocateRow {
    pub fn key(&self) -> (usize, usize) {
        (self.begin_offset, self.end_offset)
    }

    fn satellite(index: Option<usize>, lemma: Option<String>) -> Option<Satellite> {
        Some(Satellite {
            index: index?,
            lemma: lemma.unwrap_or_default(),
        })
    }

    /// Rebuilds the collocate, given its owning occurrence.
    pub fn into_collocate(self, alias: AliasOccurrence) -> Collocate {
        Collocate {
            relation: self.relation,
            token: TokenRef {
                index: self.index,
                lemma: self.lemma,
                word: self.word,
            },
            particle: Self::satellite(self.prt_index, self.prt_lemma),
            vmod: Self::satellite(self.vmod_index, self.vmod_lemma),
            alias,
        }
    }
}

/// Writes a collocate table (tab separated, with header).
pub fn write_collocates<W: Write>(writer: W, collocates: &[Collocate]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().delimiter(b'\t').from_writer(writer);
    // Serialized rows bring their own header; an empty table still gets one.
    if collocates.is_empty() {
        wtr.write_record(COLUMNS)?;
    }
    for c in collocates {
        wtr.serialize(CollocateRow::from(c))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Reads the rows of a collocate table.
pub fn read_collocate_rows<R: Read>(reader: R) -> Result<Vec<CollocateRow>> {
    let mut rdr = csv::ReaderBuilder::new().delimiter(b'\t').from_reader(reader);
    let rows = rdr.deserialize().collect::<std::result::Result<Vec<CollocateRow>, _>>()?;
    Ok(rows)
}

/// Joins collocate rows to the occurrences they were extracted for.
///
/// A row whose offsets match no occurrence is a [`Error::Parse`].
pub fn join(rows: Vec<CollocateRow>, occurrences: &[AliasOccurrence]) -> Result<Vec<Collocate>> {
    let by_key: HashMap<(usize, usize), &AliasOccurrence> = occurrences.iter().map(|o| (o.key(), o)).collect();
    rows.into_iter()
        .map(|row| {
            let alias = by_key
                .get(&row.key())
                .ok_or_else(|| Error::parse(format!("collocate row references unknown occurrence {:?}", row.key())))?;
            Ok(row.into_collocate((*alias).clone()))
        })
        .collect()
}

/// Selection over loaded collocates.
#[derive(Debug, Clone, Default)]
pub struct CollocateFilter {
    /// Keep only these roles (all when empty).
    pub roles: Vec<Role>,
    /// Keep only entities of these ranks (all when empty).
    pub ranks: HashSet<usize>,
}

impl CollocateFilter {
    pub fn with_roles(mut self, roles: &[Role]) -> Self {
        self.roles = roles.to_vec();
        self
    }

    pub fn with_ranks(mut self, ranks: impl IntoIterator<Item = usize>) -> Self {
        self.ranks = ranks.into_iter().collect();
        self
    }

    pub fn matches(&self, c: &Collocate) -> bool {
        (self.roles.is_empty() || self.roles.contains(&c.relation.role()))
            && (self.ranks.is_empty() || self.ranks.contains(&c.alias.entity.rank))
    }

    pub fn apply<'a>(&'a self, collocates: &'a [Collocate]) -> impl Iterator<Item = &'a Collocate> + 'a {
        collocates.iter().filter(move |c| self.matches(c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::RankGroup;
    use crate::scanner::EntityRef;

    fn occurrence(begin: usize, end: usize, rank: usize) -> AliasOccurrence {
        AliasOccurrence {
            sentence_index: 1,
            indices: vec![0],
            local_indices: vec![1],
            begin_offset: begin,
            end_offset: end,
            span: "Tom".into(),
            entity: EntityRef {
                name: "Tom".into(),
                rank,
            },
            count: 3,
        }
    }

    fn collocates() -> Vec<Collocate> {
        vec![
            Collocate {
                relation: Relation::NsubjVerb,
                token: TokenRef {
                    index: 2,
                    lemma: "give".into(),
                    word: "gave".into(),
                },
                particle: Some(Satellite {
                    index: 3,
                    lemma: "up".into(),
                }),
                vmod: None,
                alias: occurrence(0, 3, 1),
            },
            Collocate {
                relation: Relation::Poss,
                token: TokenRef {
                    index: 4,
                    lemma: "CHAR-1".into(),
                    word: "Tom".into(),
                },
                particle: None,
                vmod: None,
                alias: occurrence(10, 13, 2),
            },
        ]
    }

    #[test]
    fn test_collocate_table_layout() {
        let mut buf = Vec::new();
        write_collocates(&mut buf, &collocates()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "BEGIN_OFFSET\tEND_OFFSET\tINDEX\tLEMMA\tWORD\tTYPE\tPRT_INDEX\tPRT_LEMMA\tVMOD_INDEX\tVMOD_LEMMA"
        );
        assert_eq!(lines.next().unwrap(), "0\t3\t2\tgive\tgave\tnsubj-verb\t3\tup\t\t");
        assert_eq!(lines.next().unwrap(), "10\t13\t4\tCHAR-1\tTom\tposs\t\t\t\t");
    }

    #[test]
    fn test_empty_table_has_header() {
        let mut buf = Vec::new();
        write_collocates(&mut buf, &[]).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap().trim_end(), COLUMNS.join("\t"));
        assert!(read_collocate_rows(&b"BEGIN_OFFSET\tEND_OFFSET\n"[..]).unwrap().is_empty());
    }

    #[test]
    fn test_read_and_join() {
        let original = collocates();
        let mut buf = Vec::new();
        write_collocates(&mut buf, &original).unwrap();
        let rows = read_collocate_rows(buf.as_slice()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].prt_index, None);

        let occurrences = vec![occurrence(0, 3, 1), occurrence(10, 13, 2)];
        let joined = join(rows, &occurrences).unwrap();
        assert_eq!(joined, original);
    }

    #[test]
    fn test_join_unknown_key() {
        let rows = vec![CollocateRow::from(&collocates()[0])];
        assert!(matches!(join(rows, &[]), Err(Error::Parse(_))));
    }

    #[test]
    fn test_occurrence_table() {
        let occ = vec![occurrence(0, 3, 1)];
        let mut buf = Vec::new();
        write_occurrences(&mut buf, &occ).unwrap();
        assert_eq!(read_occurrences(buf.as_slice()).unwrap(), occ);
    }

    #[test]
    fn test_filter_by_role_and_rank() {
        let all = collocates();
        let agents = CollocateFilter::default().with_roles(&[Role::Agent]);
        assert_eq!(agents.apply(&all).count(), 1);

        let top = CollocateFilter::default().with_ranks(RankGroup::Top.ranks());
        let kept: Vec<_> = top.apply(&all).collect();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].alias.entity.rank, 1);

        let nothing = CollocateFilter::default()
            .with_roles(&[Role::Possessor])
            .with_ranks([1]);
        assert_eq!(nothing.apply(&all).count(), 0);
    }
}
