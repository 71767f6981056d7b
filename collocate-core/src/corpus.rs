//! # Corpus — Story Directories on Disk
//!
//! A corpus is a directory with one subdirectory per story. Inputs come from
//! the external annotators; outputs are written next to them, one file per
//! entity type:
//!
//! ```text
//! <root>/<story>/
//!     corenlp.json              syntactic annotation
//!     booknlp.tokens            coreference token stream (optional)
//!     entities/<type>.json      ranked entity list
//!     aliases/<type>.json       alias occurrences   (written)
//!     collocates/<type>.tsv     collocate table     (written)
//! ```

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::annotation::Document;
use crate::assembler::Collocate;
use crate::coref::{load_booknlp_tokens, MentionToken};
use crate::entity::{load_entities, Entity, EntityType};
use crate::error::{Error, Result};
use crate::scanner::AliasOccurrence;
use crate::table;

/// A file belonging to a story.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    Annotation,
    Mentions,
    Entities(EntityType),
    Aliases(EntityType),
    Collocates(EntityType),
}

impl Artifact {
    /// Path relative to the story directory.
    pub fn relative_path(&self) -> PathBuf {
        match self {
            Artifact::Annotation => PathBuf::from("corenlp.json"),
            Artifact::Mentions => PathBuf::from("booknlp.tokens"),
            Artifact::Entities(ty) => Path::new("entities").join(format!("{}.json", ty.name())),
            Artifact::Aliases(ty) => Path::new("aliases").join(format!("{}.json", ty.name())),
            Artifact::Collocates(ty) => Path::new("collocates").join(format!("{}.tsv", ty.name())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Corpus {
    root: PathBuf,
}

impl Corpus {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Story ids (subdirectory names), sorted.
    pub fn story_ids(&self) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                ids.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        ids.sort();
        Ok(ids)
    }

    pub fn story_dir(&self, id: &str) -> Result<PathBuf> {
        let dir = self.root.join(id);
        if dir.is_dir() {
            Ok(dir)
        } else {
            Err(Error::UnknownDocument(id.to_string(), self.root.clone()))
        }
    }

    pub fn path(&self, id: &str, artifact: Artifact) -> Result<PathBuf> {
        Ok(self.story_dir(id)?.join(artifact.relative_path()))
    }

    /// Whether the artifact exists for the story.
    pub fn saved(&self, id: &str, artifact: Artifact) -> bool {
        self.path(id, artifact).is_ok_and(|p| p.is_file())
    }

    pub fn load_document(&self, id: &str) -> Result<Document> {
        Document::load(&self.path(id, Artifact::Annotation)?)
    }

    pub fn load_entities(&self, id: &str, entity_type: EntityType) -> Result<Vec<Entity>> {
        load_entities(&self.path(id, Artifact::Entities(entity_type))?)
    }

    /// Coreference token stream, `None` when the story has none.
    pub fn load_mentions(&self, id: &str) -> Result<Option<Vec<MentionToken>>> {
        if !self.saved(id, Artifact::Mentions) {
            return Ok(None);
        }
        load_booknlp_tokens(&self.path(id, Artifact::Mentions)?).map(Some)
    }

    pub fn load_aliases(&self, id: &str, entity_type: EntityType) -> Result<Vec<AliasOccurrence>> {
        let file = File::open(self.path(id, Artifact::Aliases(entity_type))?)?;
        table::read_occurrences(BufReader::new(file))
    }

    pub fn save_aliases(&self, id: &str, entity_type: EntityType, occurrences: &[AliasOccurrence]) -> Result<PathBuf> {
        let path = self.path(id, Artifact::Aliases(entity_type))?;
        let mut writer = create(&path)?;
        table::write_occurrences(&mut writer, occurrences)?;
        writer.flush()?;
        Ok(path)
    }

    /// Collocate table joined back to the story's alias occurrences.
    pub fn load_collocates(&self, id: &str, entity_type: EntityType) -> Result<Vec<Collocate>> {
        let file = File::open(self.path(id, Artifact::Collocates(entity_type))?)?;
        let rows = table::read_collocate_rows(BufReader::new(file))?;
        table::join(rows, &self.load_aliases(id, entity_type)?)
    }

    pub fn save_collocates(&self, id: &str, entity_type: EntityType, collocates: &[Collocate]) -> Result<PathBuf> {
        let path = self.path(id, Artifact::Collocates(entity_type))?;
        table::write_collocates(create(&path)?, collocates)?;
        Ok(path)
    }
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(BufWriter::new(File::create(path)?))
}
