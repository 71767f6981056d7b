//! Run configuration.
//!
//! Every field has a default, so a config file only lists what it changes:
//!
//! ```json
//! {"root": "/data/stories", "workers": 8, "groups": ["nsubj", "dobj"]}
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::dependency::MAX_RECURSION_DEPTH;
use crate::entity::EntityType;
use crate::error::{Error, Result};
use crate::relation::RuleGroup;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Corpus root; one subdirectory per story.
    pub root: PathBuf,
    /// Worker threads (0 = one per core).
    pub workers: usize,
    /// Recompute outputs that already exist.
    pub force: bool,
    pub entity_type: EntityType,
    /// Rule groups to extract (all when absent).
    pub groups: Option<Vec<RuleGroup>>,
    /// Recursion bound for appositive / noun-governor rules.
    pub max_depth: usize,
    /// Resolve pronouns from the token stream when identifying characters.
    pub coreference: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            workers: 0,
            force: false,
            entity_type: EntityType::Character,
            groups: None,
            max_depth: MAX_RECURSION_DEPTH,
            coreference: true,
        }
    }
}

impl PipelineConfig {
    /// Reads a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let config: Self = serde_json::from_str(&fs::read_to_string(path)?)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.groups.as_ref().is_some_and(|g| g.is_empty()) {
            return Err(Error::invalid_input("`groups` is empty; omit it to extract every group"));
        }
        if self.max_depth > 8 {
            return Err(Error::invalid_input(format!("max_depth {} is too deep", self.max_depth)));
        }
        Ok(())
    }
}
