//! # Alias Trie
//!
//! Prefix tree over alias tokens. Each edge is one token of an alias span
//! ("Mr." → "Darcy"), and a node whose path spells a complete alias carries a
//! [`Terminal`] with the entity it belongs to.
//!
//! Nodes live in a flat arena and refer to each other by [`NodeId`], so the
//! structure has no pointer cycles and can be shared read-only across threads.
//!
//! ## Collisions
//!
//! When two entities share an identical alias span, the entity inserted later
//! (lower in rank order) overwrites the earlier terminal.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::entity::Entity;

/// Index of a node in the trie arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Leaf payload: which entity a complete alias path denotes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Terminal {
    pub span: String,
    pub entity: String,
    pub rank: usize,
    pub count: usize,
}

#[derive(Debug, Default)]
struct TrieNode {
    children: HashMap<String, NodeId>,
    terminal: Option<Terminal>,
}

/// Token-level prefix tree built from a ranked entity list.
#[derive(Debug)]
pub struct AliasTrie {
    nodes: Vec<TrieNode>,
}

impl AliasTrie {
    pub fn new() -> Self {
        Self {
            nodes: vec![TrieNode::default()],
        }
    }

    /// Builds the trie in O(total alias tokens).
    pub fn build(entities: &[Entity]) -> Self {
        let mut trie = Self::new();
        for entity in entities {
            for alias in &entity.aliases {
                trie.insert(
                    alias.tokens(),
                    Terminal {
                        span: alias.span.clone(),
                        entity: entity.identity.clone(),
                        rank: entity.rank,
                        count: alias.count,
                    },
                );
            }
        }
        trie
    }

    /// Inserts one alias path. An empty path is ignored.
    pub fn insert<'a>(&mut self, tokens: impl IntoIterator<Item = &'a str>, terminal: Terminal) {
        let mut node = NodeId::ROOT;
        let mut depth = 0;
        for token in tokens {
            node = match self.nodes[node.index()].children.get(token) {
                Some(&child) => child,
                None => {
                    let child = NodeId(self.nodes.len() as u32);
                    self.nodes.push(TrieNode::default());
                    self.nodes[node.index()].children.insert(token.to_string(), child);
                    child
                }
            };
            depth += 1;
        }
        if depth > 0 {
            self.nodes[node.index()].terminal = Some(terminal);
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Follows the edge labelled `token`, if any.
    pub fn child(&self, node: NodeId, token: &str) -> Option<NodeId> {
        self.nodes.get(node.index())?.children.get(token).copied()
    }

    pub fn terminal(&self, node: NodeId) -> Option<&Terminal> {
        self.nodes.get(node.index())?.terminal.as_ref()
    }

    /// Looks up a complete alias path.
    pub fn lookup<'a>(&self, tokens: impl IntoIterator<Item = &'a str>) -> Option<&Terminal> {
        let mut node = self.root();
        for token in tokens {
            node = self.child(node, token)?;
        }
        self.terminal(node)
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }
}

impl Default for AliasTrie {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Alias;

    fn entities() -> Vec<Entity> {
        vec![
            Entity::new("John Smith", 1, vec![Alias::new("John Smith", 5), Alias::new("John", 3)]),
            Entity::new("Mary", 2, vec![Alias::new("Mary", 7)]),
        ]
    }

    #[test]
    fn test_build_and_lookup() {
        let trie = AliasTrie::build(&entities());
        let t = trie.lookup(["John", "Smith"]).unwrap();
        assert_eq!(t.entity, "John Smith");
        assert_eq!(t.rank, 1);
        assert_eq!(t.count, 5);
        assert_eq!(trie.lookup(["John"]).unwrap().count, 3);
        assert!(trie.lookup(["Smith"]).is_none());
        // root + John + Smith + Mary
        assert_eq!(trie.len(), 4);
    }

    #[test]
    fn test_prefix_node_keeps_children() {
        let trie = AliasTrie::build(&entities());
        let john = trie.child(trie.root(), "John").unwrap();
        assert!(trie.terminal(john).is_some());
        assert!(trie.child(john, "Smith").is_some());
    }

    #[test]
    fn test_later_entity_overwrites_shared_alias() {
        let list = vec![
            Entity::new("Old Tom", 1, vec![Alias::new("Tom", 2)]),
            Entity::new("Young Tom", 2, vec![Alias::new("Tom", 9)]),
        ];
        let trie = AliasTrie::build(&list);
        let t = trie.lookup(["Tom"]).unwrap();
        assert_eq!(t.entity, "Young Tom");
        assert_eq!(t.rank, 2);
    }

    #[test]
    fn test_empty_trie() {
        let trie = AliasTrie::build(&[]);
        assert!(trie.is_empty());
        assert!(trie.terminal(trie.root()).is_none());
    }
}
