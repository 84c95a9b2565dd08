//! JSON game descriptions.
//!
//! A game file is a nested tree of nodes. Decision nodes name their
//! information set by label; every node carrying the same label for the same
//! player joins one information set.
//!
//! ```json
//! {
//!   "title": "Matching pennies",
//!   "players": ["Row", "Column"],
//!   "root": {
//!     "kind": "decision", "player": 0, "infoset": "r", "actions": ["H", "T"],
//!     "children": [ ... ]
//!   }
//! }
//! ```

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::efg::ids::{InfosetId, NodeId, PlayerId};
use crate::efg::tree::{GameTree, TreeError};

/// Top-level game file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameDescription {
    /// Game title.
    #[serde(default)]
    pub title: String,
    /// Player names, in index order.
    pub players: Vec<String>,
    /// The root node.
    pub root: NodeDescription,
}

/// One node of a game file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeDescription {
    /// A player decision.
    Decision {
        /// Index of the moving player.
        player: usize,
        /// Information set label, unique per player.
        infoset: String,
        /// Action labels.
        actions: Vec<String>,
        /// One child per action.
        children: Vec<NodeDescription>,
        /// Payoffs collected on reaching this node.
        #[serde(default)]
        payoffs: Option<Vec<f64>>,
    },
    /// A chance move.
    Chance {
        /// Move label.
        #[serde(default)]
        label: String,
        /// Action labels.
        actions: Vec<String>,
        /// Action probabilities.
        probs: Vec<f64>,
        /// One child per action.
        children: Vec<NodeDescription>,
        /// Payoffs collected on reaching this node.
        #[serde(default)]
        payoffs: Option<Vec<f64>>,
    },
    /// A leaf.
    Terminal {
        /// Payoffs at the leaf.
        payoffs: Vec<f64>,
    },
}

impl NodeDescription {
    fn payoffs(&self) -> Option<&Vec<f64>> {
        match self {
            NodeDescription::Decision { payoffs, .. } | NodeDescription::Chance { payoffs, .. } => {
                payoffs.as_ref()
            }
            NodeDescription::Terminal { payoffs } => Some(payoffs),
        }
    }
}

impl GameTree {
    /// Build a tree from a parsed description.
    pub fn from_description(desc: &GameDescription) -> Result<Self, TreeError> {
        let names: Vec<&str> = desc.players.iter().map(String::as_str).collect();
        let mut tree = GameTree::new(desc.title.clone(), &names);
        let mut labels: FxHashMap<String, (PlayerId, InfosetId)> = FxHashMap::default();

        let mut stack: Vec<(NodeId, &NodeDescription)> = vec![(tree.root(), &desc.root)];
        while let Some((node, spec)) = stack.pop() {
            if let Some(payoffs) = spec.payoffs() {
                let outcome = tree.new_outcome(payoffs.clone())?;
                tree.set_outcome(node, Some(outcome))?;
            }

            let children = match spec {
                NodeDescription::Terminal { .. } => continue,
                NodeDescription::Decision {
                    player,
                    infoset,
                    actions,
                    children,
                    ..
                } => {
                    let player = PlayerId(*player);
                    match labels.get(infoset) {
                        Some(&(owner, id)) => {
                            if owner != player {
                                return Err(TreeError::LabelConflict(infoset.clone()));
                            }
                            let expected = tree.infoset(id)?.actions();
                            if expected.len() != actions.len() {
                                return Err(TreeError::ActionMismatch {
                                    label: infoset.clone(),
                                    expected: expected.len(),
                                    actual: actions.len(),
                                });
                            }
                            tree.join_infoset(node, id)?;
                        }
                        None => {
                            let refs: Vec<&str> = actions.iter().map(String::as_str).collect();
                            let id = tree.append_move(node, player, infoset, &refs)?;
                            labels.insert(infoset.clone(), (player, id));
                        }
                    }
                    children
                }
                NodeDescription::Chance {
                    label,
                    actions,
                    probs,
                    children,
                    ..
                } => {
                    if probs.len() != actions.len() {
                        return Err(TreeError::ActionMismatch {
                            label: label.clone(),
                            expected: actions.len(),
                            actual: probs.len(),
                        });
                    }
                    let pairs: Vec<(&str, f64)> = actions
                        .iter()
                        .map(String::as_str)
                        .zip(probs.iter().copied())
                        .collect();
                    tree.append_chance(node, label, &pairs)?;
                    children
                }
            };

            let created = tree.node(node)?.children().to_vec();
            if created.len() != children.len() {
                return Err(TreeError::ActionMismatch {
                    label: tree
                        .node(node)?
                        .infoset()
                        .and_then(|id| tree.infoset(id).ok())
                        .map(|iset| iset.label().to_string())
                        .unwrap_or_default(),
                    expected: created.len(),
                    actual: children.len(),
                });
            }
            stack.extend(created.into_iter().zip(children.iter()).rev());
        }
        Ok(tree)
    }

    /// Parse a game from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, TreeError> {
        let desc: GameDescription =
            serde_json::from_str(json).map_err(|e| TreeError::ParseError(e.to_string()))?;
        Self::from_description(&desc)
    }

    /// Load a game from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, TreeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| TreeError::IoError(e.to_string()))?;
        Self::from_json_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PENNIES: &str = r#"{
        "title": "Matching pennies",
        "players": ["Row", "Column"],
        "root": {
            "kind": "decision", "player": 0, "infoset": "r", "actions": ["H", "T"],
            "children": [
                { "kind": "decision", "player": 1, "infoset": "c", "actions": ["H", "T"],
                  "children": [
                      { "kind": "terminal", "payoffs": [1, -1] },
                      { "kind": "terminal", "payoffs": [-1, 1] }
                  ] },
                { "kind": "decision", "player": 1, "infoset": "c", "actions": ["H", "T"],
                  "children": [
                      { "kind": "terminal", "payoffs": [-1, 1] },
                      { "kind": "terminal", "payoffs": [1, -1] }
                  ] }
            ]
        }
    }"#;

    #[test]
    fn test_parse_shared_infoset() {
        let tree = GameTree::from_json_str(PENNIES).unwrap();

        assert_eq!(tree.title(), "Matching pennies");
        assert_eq!(tree.num_nodes(), 7);
        let column = tree.player(PlayerId(1)).unwrap().infosets();
        assert_eq!(column.len(), 1);
        assert_eq!(tree.infoset(column[0]).unwrap().members().len(), 2);

        let first = tree.node(tree.root()).unwrap().children()[0];
        let leaf = tree.node(first).unwrap().children()[1];
        let outcome = tree.node(leaf).unwrap().outcome().unwrap();
        assert_eq!(tree.outcome(outcome).unwrap().payoffs(), &[-1.0, 1.0]);
    }

    #[test]
    fn test_chance_node() {
        let json = r#"{
            "players": ["Solo"],
            "root": {
                "kind": "chance", "label": "coin", "actions": ["a", "b"], "probs": [0.3, 0.7],
                "payoffs": [1],
                "children": [
                    { "kind": "terminal", "payoffs": [0] },
                    { "kind": "terminal", "payoffs": [2] }
                ]
            }
        }"#;
        let tree = GameTree::from_json_str(json).unwrap();
        let root = tree.node(tree.root()).unwrap();

        assert!(root.outcome().is_some());
        let iset = tree.infoset(root.infoset().unwrap()).unwrap();
        assert_eq!(iset.chance_probs(), &[0.3, 0.7]);
    }

    #[test]
    fn test_child_count_mismatch() {
        let json = r#"{
            "players": ["Solo"],
            "root": {
                "kind": "decision", "player": 0, "infoset": "x", "actions": ["a", "b"],
                "children": [ { "kind": "terminal", "payoffs": [0] } ]
            }
        }"#;
        let err = GameTree::from_json_str(json).unwrap_err();
        assert!(matches!(err, TreeError::ActionMismatch { expected: 2, actual: 1, .. }));
    }

    #[test]
    fn test_label_claimed_by_two_players() {
        let json = r#"{
            "players": ["A", "B"],
            "root": {
                "kind": "decision", "player": 0, "infoset": "x", "actions": ["a"],
                "children": [
                    { "kind": "decision", "player": 1, "infoset": "x", "actions": ["b"],
                      "children": [ { "kind": "terminal", "payoffs": [0, 0] } ] }
                ]
            }
        }"#;
        let err = GameTree::from_json_str(json).unwrap_err();
        assert_eq!(err, TreeError::LabelConflict("x".to_string()));
    }

    #[test]
    fn test_bad_json() {
        assert!(matches!(
            GameTree::from_json_str("{ not json"),
            Err(TreeError::ParseError(_))
        ));
    }
}
