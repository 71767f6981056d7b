//! # Dependency Extractor — Collocates from the Sentence Graph
//!
//! Given the tokens of one alias occurrence and the dependency graph of its
//! sentence, a fixed table of rules pulls out the tokens that describe the
//! entity: what modifies it, what it does, what is done to it, what it owns.
//!
//! ## Rules (in application order)
//!
//! | Group     | Alias side              | Emits                                                     |
//! |-----------|-------------------------|-----------------------------------------------------------|
//! | acomp     | subject of the verb     | the complement (`acomp`)                                  |
//! | agent     | dependent of nmod:agent | verb, plus the verb's nsubj / nsubjpass siblings          |
//! | amod      | governor                | the adjective                                             |
//! | appos     | governor                | the appositive, then every rule again on the appositive   |
//! | dobj      | dependent               | verb, plus nsubj / nsubjpass / iobj siblings              |
//! | iobj      | dependent               | verb, plus nsubj / nsubjpass / dobj siblings              |
//! | nmod:of   | governor                | the dependent                                             |
//! | nsubj     | dependent               | governor typed by POS, plus dobj / iobj siblings          |
//! | nsubjpass | dependent               | verb, plus dobj / iobj siblings                           |
//! | poss      | dependent of nmod:poss  | the possessed noun                                        |
//! | pobj      | (any)                   | objects of prepositions hanging off collocates found so far |
//!
//! A noun governor of an `nsubj` edge ("Mary is a *doctor*") is itself mined
//! for `amod` and `nmod:of` modifiers.
//!
//! ## Satellites
//!
//! After the rules, a collocate whose token governs a `compound:prt` edge gets
//! the particle attached ("gave *up*"), and one governing a `vmod` edge gets
//! the reduced verbal modifier attached. Satellites are never emitted on their
//! own.
//!
//! ## Recursion
//!
//! Appositive and noun-governor rules re-enter the extractor on a single fresh
//! token. Depth is bounded by [`MAX_RECURSION_DEPTH`] so cyclic annotations
//! still terminate.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::annotation::{Sentence, Token};
use crate::error::Result;
use crate::relation::{Relation, RuleGroup};

/// Deepest re-entry allowed for appositive / noun-governor rules.
pub const MAX_RECURSION_DEPTH: usize = 2;

/// Collocate target token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRef {
    /// Local (in-sentence) index.
    pub index: usize,
    pub lemma: String,
    pub word: String,
}

impl TokenRef {
    pub fn of(token: &Token) -> Self {
        Self {
            index: token.index,
            lemma: token.lemma.clone(),
            word: token.word.clone(),
        }
    }
}

/// Particle or verbal modifier attached to a collocate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Satellite {
    pub index: usize,
    pub lemma: String,
}

impl Satellite {
    pub fn of(token: &Token) -> Self {
        Self {
            index: token.index,
            lemma: token.lemma.clone(),
        }
    }
}

/// A collocate before it is joined to its occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCollocate {
    pub relation: Relation,
    pub token: TokenRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub particle: Option<Satellite>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vmod: Option<Satellite>,
}

impl RawCollocate {
    pub fn new(relation: Relation, token: TokenRef) -> Self {
        Self {
            relation,
            token,
            particle: None,
            vmod: None,
        }
    }
}

/// Applies the rule table to alias occurrences.
#[derive(Debug, Clone)]
pub struct DependencyExtractor {
    max_depth: usize,
}

impl DependencyExtractor {
    pub fn new() -> Self {
        Self {
            max_depth: MAX_RECURSION_DEPTH,
        }
    }

    pub fn with_max_depth(max_depth: usize) -> Self {
        Self { max_depth }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Extracts the collocates of the alias covering `alias` (local indices).
    ///
    /// `groups` restricts the rules applied; `None` applies all of them. A
    /// lookup of a token the sentence does not have is returned as
    /// [`Error::MalformedAnnotation`](crate::error::Error::MalformedAnnotation).
    pub fn extract(&self, sentence: &Sentence, alias: &[usize], groups: Option<&[RuleGroup]>) -> Result<Vec<RawCollocate>> {
        self.extract_at(sentence, alias, groups, 0)
    }

    fn extract_at(
        &self,
        sentence: &Sentence,
        alias: &[usize],
        groups: Option<&[RuleGroup]>,
        depth: usize,
    ) -> Result<Vec<RawCollocate>> {
        debug_assert!(depth <= self.max_depth);

        let mut pass = Pass {
            sentence,
            alias,
            out: Vec::new(),
        };

        for group in RuleGroup::ALL {
            if groups.is_some_and(|gs| !gs.contains(&group)) {
                continue;
            }
            match group {
                RuleGroup::Acomp => pass.acomp()?,
                RuleGroup::Agent => pass.verb_rule(
                    "nmod:agent",
                    Relation::AgentVerb,
                    &[("nsubj", Relation::AgentNsubj), ("nsubjpass", Relation::AgentNsubjpass)],
                )?,
                RuleGroup::Amod => {
                    pass.governed("amod", Relation::Amod)?;
                }
                RuleGroup::Appos => {
                    for dependent in pass.governed("appos", Relation::Appos)? {
                        if depth < self.max_depth {
                            let nested = self.extract_at(sentence, &[dependent], None, depth + 1)?;
                            pass.out.extend(nested);
                        } else {
                            debug!(sentence = sentence.index, token = dependent, "appositive recursion depth reached");
                        }
                    }
                }
                RuleGroup::Dobj => pass.verb_rule(
                    "dobj",
                    Relation::DobjVerb,
                    &[
                        ("nsubj", Relation::DobjNsubj),
                        ("nsubjpass", Relation::DobjNsubjpass),
                        ("iobj", Relation::DobjIobj),
                    ],
                )?,
                RuleGroup::Iobj => pass.verb_rule(
                    "iobj",
                    Relation::IobjVerb,
                    &[
                        ("nsubj", Relation::IobjNsubj),
                        ("nsubjpass", Relation::IobjNsubjpass),
                        ("dobj", Relation::IobjDobj),
                    ],
                )?,
                RuleGroup::NmodOf => {
                    pass.governed("nmod:of", Relation::NmodOf)?;
                }
                RuleGroup::Nsubj => self.nsubj(&mut pass, depth)?,
                RuleGroup::Nsubjpass => pass.verb_rule(
                    "nsubjpass",
                    Relation::NsubjpassVerb,
                    &[("dobj", Relation::NsubjpassDobj), ("iobj", Relation::NsubjpassIobj)],
                )?,
                RuleGroup::Poss => pass.verb_rule("nmod:poss", Relation::Poss, &[])?,
                RuleGroup::Pobj => pass.pobj()?,
            }
        }

        pass.attach_satellites()?;
        Ok(pass.out)
    }

    /// Subject rule: the governor's POS decides the relation, and a noun
    /// governor is mined for its own modifiers.
    fn nsubj(&self, pass: &mut Pass<'_>, depth: usize) -> Result<()> {
        let sentence = pass.sentence;
        for edge in sentence.graph.links_by_type("nsubj") {
            if !pass.in_alias(edge.dependent) {
                continue;
            }
            let governor = sentence.token(edge.governor)?;
            let relation = match governor.pos.chars().next() {
                Some('V') => Relation::NsubjVerb,
                Some('N') => Relation::NsubjNoun,
                _ => Relation::NsubjAdj,
            };
            pass.out.push(RawCollocate::new(relation, TokenRef::of(governor)));

            if relation == Relation::NsubjNoun {
                if depth < self.max_depth {
                    let nested = self.extract_at(
                        sentence,
                        &[governor.index],
                        Some(&[RuleGroup::Amod, RuleGroup::NmodOf]),
                        depth + 1,
                    )?;
                    pass.out.extend(nested);
                } else {
                    debug!(sentence = sentence.index, token = governor.index, "noun governor recursion depth reached");
                }
            }

            pass.siblings(edge.governor, "dobj", Relation::NsubjDobj)?;
            pass.siblings(edge.governor, "iobj", Relation::NsubjIobj)?;
        }
        Ok(())
    }
}

impl Default for DependencyExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// State of one extraction call.
struct Pass<'s> {
    sentence: &'s Sentence,
    alias: &'s [usize],
    out: Vec<RawCollocate>,
}

impl<'s> Pass<'s> {
    fn in_alias(&self, index: usize) -> bool {
        self.alias.contains(&index)
    }

    fn push(&mut self, relation: Relation, index: usize) -> Result<()> {
        let token = self.sentence.token(index)?;
        self.out.push(RawCollocate::new(relation, TokenRef::of(token)));
        Ok(())
    }

    /// Emits every `label` dependent of `governor` as `relation`.
    fn siblings(&mut self, governor: usize, label: &str, relation: Relation) -> Result<()> {
        let sentence = self.sentence;
        sentence.token(governor)?;
        for dependent in sentence.graph.dependents_by_type(governor, label) {
            self.push(relation, dependent)?;
        }
        Ok(())
    }

    /// Alias governs a `label` edge: emit the dependent. Returns the
    /// dependents emitted.
    fn governed(&mut self, label: &str, relation: Relation) -> Result<Vec<usize>> {
        let sentence = self.sentence;
        let mut emitted = Vec::new();
        for edge in sentence.graph.links_by_type(label) {
            if self.in_alias(edge.governor) {
                self.push(relation, edge.dependent)?;
                emitted.push(edge.dependent);
            }
        }
        Ok(emitted)
    }

    /// Alias is the dependent of a `label` edge: emit the governor, then fan
    /// out to the governor's other arguments.
    fn verb_rule(&mut self, label: &str, relation: Relation, fan_out: &[(&str, Relation)]) -> Result<()> {
        let sentence = self.sentence;
        for edge in sentence.graph.links_by_type(label) {
            if !self.in_alias(edge.dependent) {
                continue;
            }
            self.push(relation, edge.governor)?;
            for &(sibling, sibling_relation) in fan_out {
                self.siblings(edge.governor, sibling, sibling_relation)?;
            }
        }
        Ok(())
    }

    /// Copular complement whose verb has the alias as (passive) subject.
    fn acomp(&mut self) -> Result<()> {
        let sentence = self.sentence;
        for edge in sentence.graph.links_by_type("acomp") {
            sentence.token(edge.governor)?;
            let graph = &sentence.graph;
            let subject_is_alias = graph
                .dependents_by_type(edge.governor, "nsubj")
                .chain(graph.dependents_by_type(edge.governor, "nsubjpass"))
                .any(|s| self.in_alias(s));
            if subject_is_alias {
                self.push(Relation::Acomp, edge.dependent)?;
            }
        }
        Ok(())
    }

    /// Objects of prepositions governed by a collocate already collected.
    fn pobj(&mut self) -> Result<()> {
        let sentence = self.sentence;
        let graph = &sentence.graph;
        let prepositions: Vec<usize> = graph
            .links_by_type("prep")
            .filter(|prep| self.out.iter().any(|c| c.token.index == prep.governor))
            .map(|prep| prep.dependent)
            .collect();
        if prepositions.is_empty() {
            return Ok(());
        }
        for edge in graph.links_by_type("pobj") {
            if prepositions.contains(&edge.governor) {
                self.push(Relation::Pobj, edge.dependent)?;
            }
        }
        Ok(())
    }

    fn attach_satellites(&mut self) -> Result<()> {
        let sentence = self.sentence;
        for edge in sentence.graph.links_by_type("compound:prt") {
            if self.out.iter().any(|c| c.token.index == edge.governor) {
                let particle = Satellite::of(sentence.token(edge.dependent)?);
                for c in self.out.iter_mut().filter(|c| c.token.index == edge.governor) {
                    c.particle = Some(particle.clone());
                }
            }
        }
        for edge in sentence.graph.links_by_type("vmod") {
            if self.out.iter().any(|c| c.token.index == edge.governor) {
                let vmod = Satellite::of(sentence.token(edge.dependent)?);
                for c in self.out.iter_mut().filter(|c| c.token.index == edge.governor) {
                    c.vmod = Some(vmod.clone());
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{sentence_tokens, DependencyGraph, Document};
    use crate::error::Error;

    fn sentence(words: &[(&str, &str, &str)], edges: &[(&str, usize, usize)]) -> Sentence {
        let mut offset = 0;
        let mut graph = DependencyGraph::default();
        for (label, gov, dep) in edges {
            graph.add(label, *gov, *dep);
        }
        let doc = Document::from_sentences(vec![(sentence_tokens(words, &mut offset), graph)]);
        doc.sentences.into_iter().next().unwrap()
    }

    fn relations(out: &[RawCollocate]) -> Vec<(Relation, &str)> {
        out.iter().map(|c| (c.relation, c.token.word.as_str())).collect()
    }

    #[test]
    fn test_acomp_requires_subject_sibling() {
        let s = sentence(
            &[("Mary", "Mary", "NNP"), ("was", "be", "VBD"), ("happy", "happy", "JJ"), (".", ".", ".")],
            &[("nsubj", 2, 1), ("acomp", 2, 3)],
        );
        let out = DependencyExtractor::new().extract(&s, &[1], None).unwrap();
        // nsubj also fires on "was" (a verb); acomp gives "happy".
        assert_eq!(
            relations(&out),
            vec![(Relation::Acomp, "happy"), (Relation::NsubjVerb, "was")]
        );

        let only = DependencyExtractor::new().extract(&s, &[1], Some(&[RuleGroup::Acomp])).unwrap();
        assert_eq!(relations(&only), vec![(Relation::Acomp, "happy")]);

        // The complement is not the alias's when someone else is the subject.
        let none = DependencyExtractor::new().extract(&s, &[4], Some(&[RuleGroup::Acomp])).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_dobj_fans_out_to_siblings() {
        // John gave Mary the book: nsubj(gave, John), iobj(gave, Mary), dobj(gave, book)
        let s = sentence(
            &[
                ("John", "John", "NNP"),
                ("gave", "give", "VBD"),
                ("Mary", "Mary", "NNP"),
                ("the", "the", "DT"),
                ("book", "book", "NN"),
            ],
            &[("nsubj", 2, 1), ("iobj", 2, 3), ("det", 5, 4), ("dobj", 2, 5)],
        );
        let out = DependencyExtractor::new().extract(&s, &[5], Some(&[RuleGroup::Dobj])).unwrap();
        assert_eq!(
            relations(&out),
            vec![
                (Relation::DobjVerb, "gave"),
                (Relation::DobjNsubj, "John"),
                (Relation::DobjIobj, "Mary"),
            ]
        );

        let mary = DependencyExtractor::new().extract(&s, &[3], None).unwrap();
        assert_eq!(
            relations(&mary),
            vec![
                (Relation::IobjVerb, "gave"),
                (Relation::IobjNsubj, "John"),
                (Relation::IobjDobj, "book"),
            ]
        );
    }

    #[test]
    fn test_agent_of_passive() {
        // Tom was bitten by the dog
        let s = sentence(
            &[
                ("Tom", "Tom", "NNP"),
                ("was", "be", "VBD"),
                ("bitten", "bite", "VBN"),
                ("by", "by", "IN"),
                ("the", "the", "DT"),
                ("dog", "dog", "NN"),
            ],
            &[("nsubjpass", 3, 1), ("auxpass", 3, 2), ("nmod:agent", 3, 6)],
        );
        let dog = DependencyExtractor::new().extract(&s, &[6], None).unwrap();
        assert_eq!(
            relations(&dog),
            vec![(Relation::AgentVerb, "bitten"), (Relation::AgentNsubjpass, "Tom")]
        );
        let tom = DependencyExtractor::new().extract(&s, &[1], None).unwrap();
        assert_eq!(relations(&tom), vec![(Relation::NsubjpassVerb, "bitten")]);
    }

    #[test]
    fn test_nsubj_noun_governor_pulls_modifiers() {
        // Mary is a clever doctor of renown
        let s = sentence(
            &[
                ("Mary", "Mary", "NNP"),
                ("is", "be", "VBZ"),
                ("a", "a", "DT"),
                ("clever", "clever", "JJ"),
                ("doctor", "doctor", "NN"),
                ("of", "of", "IN"),
                ("renown", "renown", "NN"),
            ],
            &[("nsubj", 5, 1), ("cop", 5, 2), ("amod", 5, 4), ("nmod:of", 5, 7)],
        );
        let out = DependencyExtractor::new().extract(&s, &[1], None).unwrap();
        assert_eq!(
            relations(&out),
            vec![
                (Relation::NsubjNoun, "doctor"),
                (Relation::Amod, "clever"),
                (Relation::NmodOf, "renown"),
            ]
        );
    }

    #[test]
    fn test_nsubj_adjective_governor() {
        let s = sentence(&[("Ann", "Ann", "NNP"), ("is", "be", "VBZ"), ("tall", "tall", "JJ")], &[("nsubj", 3, 1)]);
        let out = DependencyExtractor::new().extract(&s, &[1], None).unwrap();
        assert_eq!(relations(&out), vec![(Relation::NsubjAdj, "tall")]);
    }

    #[test]
    fn test_appos_recurses_on_appositive() {
        // Smith, the old baker, ...: appos(Smith, baker), amod(baker, old)
        let s = sentence(
            &[("Smith", "Smith", "NNP"), ("the", "the", "DT"), ("old", "old", "JJ"), ("baker", "baker", "NN")],
            &[("appos", 1, 4), ("amod", 4, 3)],
        );
        let out = DependencyExtractor::new().extract(&s, &[1], None).unwrap();
        assert_eq!(relations(&out), vec![(Relation::Appos, "baker"), (Relation::Amod, "old")]);
    }

    #[test]
    fn test_cyclic_appos_is_depth_bounded() {
        let s = sentence(&[("A", "a", "NN"), ("B", "b", "NN")], &[("appos", 1, 2), ("appos", 2, 1)]);
        let out = DependencyExtractor::new().extract(&s, &[1], None).unwrap();
        assert_eq!(out.len(), MAX_RECURSION_DEPTH + 1);

        let flat = DependencyExtractor::with_max_depth(0).extract(&s, &[1], None).unwrap();
        assert_eq!(relations(&flat), vec![(Relation::Appos, "B")]);
    }

    #[test]
    fn test_poss() {
        let s = sentence(&[("Jane", "Jane", "NNP"), ("'s", "'s", "POS"), ("hat", "hat", "NN")], &[("nmod:poss", 3, 1), ("case", 1, 2)]);
        let out = DependencyExtractor::new().extract(&s, &[1], None).unwrap();
        assert_eq!(relations(&out), vec![(Relation::Poss, "hat")]);
    }

    #[test]
    fn test_pobj_follows_collected_collocate() {
        // Jim looked at the sky: nsubj(looked, Jim), prep(looked, at), pobj(at, sky)
        let s = sentence(
            &[
                ("Jim", "Jim", "NNP"),
                ("looked", "look", "VBD"),
                ("at", "at", "IN"),
                ("the", "the", "DT"),
                ("sky", "sky", "NN"),
            ],
            &[("nsubj", 2, 1), ("prep", 2, 3), ("pobj", 3, 5)],
        );
        let out = DependencyExtractor::new().extract(&s, &[1], None).unwrap();
        assert_eq!(relations(&out), vec![(Relation::NsubjVerb, "looked"), (Relation::Pobj, "sky")]);

        // Without the verb collocate there is nothing to hang the preposition on.
        let alone = DependencyExtractor::new().extract(&s, &[1], Some(&[RuleGroup::Pobj])).unwrap();
        assert!(alone.is_empty());
    }

    #[test]
    fn test_satellites_attach_to_collocates() {
        // He gave up, smiling: nsubj(gave, He), compound:prt(gave, up), vmod(gave, smiling)
        let s = sentence(
            &[("He", "he", "PRP"), ("gave", "give", "VBD"), ("up", "up", "RP"), ("smiling", "smile", "VBG")],
            &[("nsubj", 2, 1), ("compound:prt", 2, 3), ("vmod", 2, 4)],
        );
        let out = DependencyExtractor::new().extract(&s, &[1], None).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].particle, Some(Satellite { index: 3, lemma: "up".into() }));
        assert_eq!(out[0].vmod, Some(Satellite { index: 4, lemma: "smile".into() }));
    }

    #[test]
    fn test_missing_token_is_fatal() {
        let s = sentence(&[("Kim", "Kim", "NNP"), ("ran", "run", "VBD")], &[("nsubj", 7, 1)]);
        let err = DependencyExtractor::new().extract(&s, &[1], None).unwrap_err();
        assert!(matches!(err, Error::MalformedAnnotation { sentence: 1, token: 7 }));
    }
}
