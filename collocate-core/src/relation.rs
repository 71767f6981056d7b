//! # Relation Types, Rule Groups and Roles
//!
//! Every collocate is tagged with one [`Relation`] from a fixed vocabulary.
//! The vocabulary is finer than the annotator's dependency labels: a direct
//! object alias yields its verb (`dobj-verb`) but also the verb's subject
//! (`dobj-nsubj`) and indirect object (`dobj-iobj`).
//!
//! | Rule group  | Annotator label | Relations produced                                          |
//! |-------------|-----------------|-------------------------------------------------------------|
//! | acomp       | `acomp`         | acomp                                                       |
//! | agent       | `nmod:agent`    | agent-verb, agent-nsubj, agent-nsubjpass                    |
//! | amod        | `amod`          | amod                                                        |
//! | appos       | `appos`         | appos                                                       |
//! | dobj        | `dobj`          | dobj-verb, dobj-nsubj, dobj-nsubjpass, dobj-iobj            |
//! | iobj        | `iobj`          | iobj-verb, iobj-nsubj, iobj-nsubjpass, iobj-dobj            |
//! | nmod:of     | `nmod:of`       | nmod:of                                                     |
//! | nsubj       | `nsubj`         | nsubj-verb, nsubj-noun, nsubj-adj, nsubj-dobj, nsubj-iobj   |
//! | nsubjpass   | `nsubjpass`     | nsubjpass-verb, nsubjpass-dobj, nsubjpass-iobj              |
//! | poss        | `nmod:poss`     | poss                                                        |
//! | pobj        | `pobj`          | pobj                                                        |
//!
//! ## Roles
//!
//! Relations collapse further into four narrative [`Role`]s: what the entity
//! *is* (predicate), what it *does* (agent), what is *done to it* (patient)
//! and what it *has* (possessor).

use serde::{Deserialize, Serialize};

/// Relation between an alias occurrence and one of its collocates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Relation {
    #[serde(rename = "acomp")]
    Acomp,
    #[serde(rename = "agent-verb")]
    AgentVerb,
    #[serde(rename = "agent-nsubj")]
    AgentNsubj,
    #[serde(rename = "agent-nsubjpass")]
    AgentNsubjpass,
    #[serde(rename = "amod")]
    Amod,
    #[serde(rename = "appos")]
    Appos,
    #[serde(rename = "dobj-verb")]
    DobjVerb,
    #[serde(rename = "dobj-nsubj")]
    DobjNsubj,
    #[serde(rename = "dobj-nsubjpass")]
    DobjNsubjpass,
    #[serde(rename = "dobj-iobj")]
    DobjIobj,
    #[serde(rename = "iobj-verb")]
    IobjVerb,
    #[serde(rename = "iobj-nsubj")]
    IobjNsubj,
    #[serde(rename = "iobj-nsubjpass")]
    IobjNsubjpass,
    #[serde(rename = "iobj-dobj")]
    IobjDobj,
    #[serde(rename = "nmod:of")]
    NmodOf,
    #[serde(rename = "nsubj-verb")]
    NsubjVerb,
    #[serde(rename = "nsubj-noun")]
    NsubjNoun,
    #[serde(rename = "nsubj-adj")]
    NsubjAdj,
    #[serde(rename = "nsubj-dobj")]
    NsubjDobj,
    #[serde(rename = "nsubj-iobj")]
    NsubjIobj,
    #[serde(rename = "nsubjpass-verb")]
    NsubjpassVerb,
    #[serde(rename = "nsubjpass-dobj")]
    NsubjpassDobj,
    #[serde(rename = "nsubjpass-iobj")]
    NsubjpassIobj,
    #[serde(rename = "poss")]
    Poss,
    #[serde(rename = "pobj")]
    Pobj,
}

impl Relation {
    pub const ALL: [Relation; 25] = [
        Relation::Acomp,
        Relation::AgentVerb,
        Relation::AgentNsubj,
        Relation::AgentNsubjpass,
        Relation::Amod,
        Relation::Appos,
        Relation::DobjVerb,
        Relation::DobjNsubj,
        Relation::DobjNsubjpass,
        Relation::DobjIobj,
        Relation::IobjVerb,
        Relation::IobjNsubj,
        Relation::IobjNsubjpass,
        Relation::IobjDobj,
        Relation::NmodOf,
        Relation::NsubjVerb,
        Relation::NsubjNoun,
        Relation::NsubjAdj,
        Relation::NsubjDobj,
        Relation::NsubjIobj,
        Relation::NsubjpassVerb,
        Relation::NsubjpassDobj,
        Relation::NsubjpassIobj,
        Relation::Poss,
        Relation::Pobj,
    ];

    /// Label written to collocate tables (e.g. "dobj-nsubj").
    pub fn label(&self) -> &'static str {
        match self {
            Relation::Acomp => "acomp",
            Relation::AgentVerb => "agent-verb",
            Relation::AgentNsubj => "agent-nsubj",
            Relation::AgentNsubjpass => "agent-nsubjpass",
            Relation::Amod => "amod",
            Relation::Appos => "appos",
            Relation::DobjVerb => "dobj-verb",
            Relation::DobjNsubj => "dobj-nsubj",
            Relation::DobjNsubjpass => "dobj-nsubjpass",
            Relation::DobjIobj => "dobj-iobj",
            Relation::IobjVerb => "iobj-verb",
            Relation::IobjNsubj => "iobj-nsubj",
            Relation::IobjNsubjpass => "iobj-nsubjpass",
            Relation::IobjDobj => "iobj-dobj",
            Relation::NmodOf => "nmod:of",
            Relation::NsubjVerb => "nsubj-verb",
            Relation::NsubjNoun => "nsubj-noun",
            Relation::NsubjAdj => "nsubj-adj",
            Relation::NsubjDobj => "nsubj-dobj",
            Relation::NsubjIobj => "nsubj-iobj",
            Relation::NsubjpassVerb => "nsubjpass-verb",
            Relation::NsubjpassDobj => "nsubjpass-dobj",
            Relation::NsubjpassIobj => "nsubjpass-iobj",
            Relation::Poss => "poss",
            Relation::Pobj => "pobj",
        }
    }

    /// Parses a table label (e.g. "nsubj-verb" → `Some(NsubjVerb)`).
    pub fn from_label(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|r| r.label() == s)
    }

    /// Rule group that produces this relation.
    pub fn group(&self) -> RuleGroup {
        match self {
            Relation::Acomp => RuleGroup::Acomp,
            Relation::AgentVerb | Relation::AgentNsubj | Relation::AgentNsubjpass => RuleGroup::Agent,
            Relation::Amod => RuleGroup::Amod,
            Relation::Appos => RuleGroup::Appos,
            Relation::DobjVerb | Relation::DobjNsubj | Relation::DobjNsubjpass | Relation::DobjIobj => {
                RuleGroup::Dobj
            }
            Relation::IobjVerb | Relation::IobjNsubj | Relation::IobjNsubjpass | Relation::IobjDobj => {
                RuleGroup::Iobj
            }
            Relation::NmodOf => RuleGroup::NmodOf,
            Relation::NsubjVerb
            | Relation::NsubjNoun
            | Relation::NsubjAdj
            | Relation::NsubjDobj
            | Relation::NsubjIobj => RuleGroup::Nsubj,
            Relation::NsubjpassVerb | Relation::NsubjpassDobj | Relation::NsubjpassIobj => {
                RuleGroup::Nsubjpass
            }
            Relation::Poss => RuleGroup::Poss,
            Relation::Pobj => RuleGroup::Pobj,
        }
    }

    /// Narrative role of the relation.
    pub fn role(&self) -> Role {
        match self {
            Relation::Acomp
            | Relation::Amod
            | Relation::Appos
            | Relation::NsubjAdj
            | Relation::NsubjNoun
            | Relation::NmodOf => Role::Predicate,
            Relation::AgentVerb
            | Relation::AgentNsubj
            | Relation::AgentNsubjpass
            | Relation::NsubjVerb
            | Relation::NsubjDobj
            | Relation::NsubjIobj
            | Relation::NsubjpassVerb
            | Relation::NsubjpassDobj
            | Relation::NsubjpassIobj
            | Relation::Pobj => Role::Agent,
            Relation::DobjVerb
            | Relation::DobjNsubj
            | Relation::DobjNsubjpass
            | Relation::DobjIobj
            | Relation::IobjVerb
            | Relation::IobjNsubj
            | Relation::IobjNsubjpass
            | Relation::IobjDobj => Role::Patient,
            Relation::Poss => Role::Possessor,
        }
    }
}

/// Group of extraction rules keyed on one annotator label.
///
/// Groups are the unit callers restrict extraction to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleGroup {
    #[serde(rename = "acomp")]
    Acomp,
    #[serde(rename = "agent")]
    Agent,
    #[serde(rename = "amod")]
    Amod,
    #[serde(rename = "appos")]
    Appos,
    #[serde(rename = "dobj")]
    Dobj,
    #[serde(rename = "iobj")]
    Iobj,
    #[serde(rename = "nmod:of")]
    NmodOf,
    #[serde(rename = "nsubj")]
    Nsubj,
    #[serde(rename = "nsubjpass")]
    Nsubjpass,
    #[serde(rename = "poss")]
    Poss,
    #[serde(rename = "pobj")]
    Pobj,
}

impl RuleGroup {
    /// All groups in application order.
    pub const ALL: [RuleGroup; 11] = [
        RuleGroup::Acomp,
        RuleGroup::Agent,
        RuleGroup::Amod,
        RuleGroup::Appos,
        RuleGroup::Dobj,
        RuleGroup::Iobj,
        RuleGroup::NmodOf,
        RuleGroup::Nsubj,
        RuleGroup::Nsubjpass,
        RuleGroup::Poss,
        RuleGroup::Pobj,
    ];

    /// Dependency label the group's primary edges carry.
    pub fn dependency_label(&self) -> &'static str {
        match self {
            RuleGroup::Acomp => "acomp",
            RuleGroup::Agent => "nmod:agent",
            RuleGroup::Amod => "amod",
            RuleGroup::Appos => "appos",
            RuleGroup::Dobj => "dobj",
            RuleGroup::Iobj => "iobj",
            RuleGroup::NmodOf => "nmod:of",
            RuleGroup::Nsubj => "nsubj",
            RuleGroup::Nsubjpass => "nsubjpass",
            RuleGroup::Poss => "nmod:poss",
            RuleGroup::Pobj => "pobj",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RuleGroup::Agent => "agent",
            RuleGroup::Poss => "poss",
            other => other.dependency_label(),
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|g| g.name() == s)
    }
}

/// Narrative role a relation expresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Predicate,
    Agent,
    Patient,
    Possessor,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Predicate, Role::Agent, Role::Patient, Role::Possessor];

    pub fn name(&self) -> &'static str {
        match self {
            Role::Predicate => "PREDICATE",
            Role::Agent => "AGENT",
            Role::Patient => "PATIENT",
            Role::Possessor => "POSSESSOR",
        }
    }
}
