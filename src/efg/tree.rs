//! Arena-backed extensive-form game tree.
//!
//! Nodes are stored in slots addressed by [`NodeId`]. Deleting a subtree frees
//! its slots and bumps their generation, so stale handles are rejected instead
//! of aliasing whatever node reuses the slot later.

use rustc_hash::FxHashMap;
use std::fmt;

use crate::efg::ids::{InfosetId, NodeId, OutcomeId, PlayerId};

/// Allowed slack when checking that chance probabilities sum to one.
const PROBABILITY_TOLERANCE: f64 = 1e-9;

/// Who moves at an information set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Owner {
    /// A strategic player.
    Player(PlayerId),
    /// Nature, with fixed action probabilities.
    Chance,
}

impl Owner {
    /// The owning player, or `None` for chance.
    pub fn player(self) -> Option<PlayerId> {
        match self {
            Owner::Player(p) => Some(p),
            Owner::Chance => None,
        }
    }
}

/// A set of decision nodes the owner cannot tell apart.
#[derive(Debug, Clone)]
pub struct Infoset {
    pub(super) id: InfosetId,
    pub(super) owner: Owner,
    pub(super) label: String,
    pub(super) actions: Vec<String>,
    pub(super) probs: Vec<f64>,
    pub(super) members: Vec<NodeId>,
}

impl Infoset {
    /// Stable identity of this information set.
    pub fn id(&self) -> InfosetId {
        self.id
    }

    /// Who moves here.
    pub fn owner(&self) -> Owner {
        self.owner
    }

    /// Human-readable label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Action labels, in child order.
    pub fn actions(&self) -> &[String] {
        &self.actions
    }

    /// Number of actions available.
    pub fn num_actions(&self) -> usize {
        self.actions.len()
    }

    /// Action probabilities for a chance information set; empty for players.
    pub fn chance_probs(&self) -> &[f64] {
        &self.probs
    }

    /// Member nodes, in the order they joined.
    pub fn members(&self) -> &[NodeId] {
        &self.members
    }
}

/// A point in the game tree.
#[derive(Debug, Clone, Default)]
pub struct Node {
    pub(super) parent: Option<NodeId>,
    pub(super) children: Vec<NodeId>,
    pub(super) infoset: Option<InfosetId>,
    pub(super) outcome: Option<OutcomeId>,
}

impl Node {
    /// Parent node; `None` for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in action order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Information set this node belongs to, if it is not terminal.
    pub fn infoset(&self) -> Option<InfosetId> {
        self.infoset
    }

    /// Outcome attached directly to this node.
    pub fn outcome(&self) -> Option<OutcomeId> {
        self.outcome
    }

    /// Whether the node has no children.
    pub fn is_terminal(&self) -> bool {
        self.children.is_empty()
    }
}

/// A player and the information sets they own.
#[derive(Debug, Clone)]
pub struct Player {
    pub(super) name: String,
    pub(super) infosets: Vec<InfosetId>,
}

impl Player {
    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Owned information sets, in the player's numbering order.
    pub fn infosets(&self) -> &[InfosetId] {
        &self.infosets
    }
}

/// A payoff vector, one entry per player.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub(super) payoffs: Vec<f64>,
}

impl Outcome {
    /// Payoffs for every player.
    pub fn payoffs(&self) -> &[f64] {
        &self.payoffs
    }

    /// Payoff for one player.
    pub fn payoff(&self, player: PlayerId) -> f64 {
        self.payoffs.get(player.index()).copied().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// A mutable extensive-form game.
///
/// Payoffs accumulate along the path from the root: an outcome may be attached
/// to any node, not only to leaves.
#[derive(Debug, Clone)]
pub struct GameTree {
    pub(super) title: String,
    pub(super) players: Vec<Player>,
    pub(super) infosets: FxHashMap<InfosetId, Infoset>,
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
    pub(super) outcomes: Vec<Outcome>,
    pub(super) root: NodeId,
    pub(super) next_infoset: u32,
}

impl GameTree {
    /// Create a game consisting of a single terminal root.
    pub fn new(title: impl Into<String>, players: &[&str]) -> Self {
        let mut tree = Self {
            title: title.into(),
            players: players
                .iter()
                .map(|name| Player {
                    name: name.to_string(),
                    infosets: Vec::new(),
                })
                .collect(),
            infosets: FxHashMap::default(),
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
            outcomes: Vec::new(),
            root: NodeId::new(0, 0),
            next_infoset: 0,
        };
        tree.root = tree.alloc(None);
        tree
    }

    /// Game title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Number of strategic players.
    pub fn num_players(&self) -> usize {
        self.players.len()
    }

    /// All players, in index order.
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Look up a player.
    pub fn player(&self, player: PlayerId) -> Result<&Player, TreeError> {
        self.players
            .get(player.index())
            .ok_or(TreeError::UnknownPlayer(player.index()))
    }

    /// The root node. The root is never freed.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of live nodes.
    pub fn num_nodes(&self) -> usize {
        self.live
    }

    /// Look up a node, rejecting handles into freed slots.
    pub fn node(&self, id: NodeId) -> Result<&Node, TreeError> {
        self.slots
            .get(id.index())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.node.as_ref())
            .ok_or(TreeError::StaleNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, TreeError> {
        self.slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.node.as_mut())
            .ok_or(TreeError::StaleNode(id))
    }

    /// Whether `id` still refers to a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_ok()
    }

    /// Look up an information set.
    pub fn infoset(&self, id: InfosetId) -> Result<&Infoset, TreeError> {
        self.infosets.get(&id).ok_or(TreeError::UnknownInfoset(id))
    }

    /// Owner and position of an information set in its player's list.
    ///
    /// Returns `None` for chance information sets and unknown identifiers.
    pub fn infoset_position(&self, id: InfosetId) -> Option<(PlayerId, usize)> {
        let player = self.infosets.get(&id)?.owner.player()?;
        let index = self.players[player.index()]
            .infosets
            .iter()
            .position(|&owned| owned == id)?;
        Some((player, index))
    }

    /// Look up an outcome.
    pub fn outcome(&self, id: OutcomeId) -> Result<&Outcome, TreeError> {
        self.outcomes.get(id.0).ok_or(TreeError::UnknownOutcome(id))
    }

    /// Number of outcomes ever created in this tree.
    pub fn num_outcomes(&self) -> usize {
        self.outcomes.len()
    }

    // ========================================================================
    // Construction
    // ========================================================================

    /// Turn a terminal node into a decision node with a new information set.
    ///
    /// One child is created per action.
    pub fn append_move(
        &mut self,
        node: NodeId,
        player: PlayerId,
        label: &str,
        actions: &[&str],
    ) -> Result<InfosetId, TreeError> {
        self.ensure_terminal(node)?;
        if player.index() >= self.players.len() {
            return Err(TreeError::UnknownPlayer(player.index()));
        }
        if actions.is_empty() {
            return Err(TreeError::EmptyActions(label.to_string()));
        }

        let id = self.fresh_infoset();
        self.infosets.insert(
            id,
            Infoset {
                id,
                owner: Owner::Player(player),
                label: label.to_string(),
                actions: actions.iter().map(|a| a.to_string()).collect(),
                probs: Vec::new(),
                members: Vec::new(),
            },
        );
        self.players[player.index()].infosets.push(id);
        self.attach(node, id)?;
        Ok(id)
    }

    /// Turn a terminal node into a chance node.
    pub fn append_chance(
        &mut self,
        node: NodeId,
        label: &str,
        actions: &[(&str, f64)],
    ) -> Result<InfosetId, TreeError> {
        self.ensure_terminal(node)?;
        if actions.is_empty() {
            return Err(TreeError::EmptyActions(label.to_string()));
        }

        let probs: Vec<f64> = actions.iter().map(|&(_, p)| p).collect();
        let total: f64 = probs.iter().sum();
        if probs.iter().any(|p| !p.is_finite() || *p < 0.0)
            || (total - 1.0).abs() > PROBABILITY_TOLERANCE
        {
            return Err(TreeError::InvalidProbabilities(label.to_string()));
        }

        let id = self.fresh_infoset();
        self.infosets.insert(
            id,
            Infoset {
                id,
                owner: Owner::Chance,
                label: label.to_string(),
                actions: actions.iter().map(|(a, _)| a.to_string()).collect(),
                probs,
                members: Vec::new(),
            },
        );
        self.attach(node, id)?;
        Ok(id)
    }

    /// Add a terminal node to an existing player information set.
    pub fn join_infoset(&mut self, node: NodeId, infoset: InfosetId) -> Result<(), TreeError> {
        self.ensure_terminal(node)?;
        if self.infoset(infoset)?.owner == Owner::Chance {
            return Err(TreeError::ChanceInfoset(infoset));
        }
        self.attach(node, infoset)
    }

    /// Create an outcome with one payoff per player.
    pub fn new_outcome(&mut self, payoffs: Vec<f64>) -> Result<OutcomeId, TreeError> {
        if payoffs.len() != self.players.len() {
            return Err(TreeError::PayoffArity {
                expected: self.players.len(),
                actual: payoffs.len(),
            });
        }
        self.outcomes.push(Outcome { payoffs });
        Ok(OutcomeId(self.outcomes.len() - 1))
    }

    /// Attach (or clear) the outcome at a node.
    pub fn set_outcome(&mut self, node: NodeId, outcome: Option<OutcomeId>) -> Result<(), TreeError> {
        if let Some(id) = outcome {
            self.outcome(id)?;
        }
        self.node_mut(node)?.outcome = outcome;
        Ok(())
    }

    fn fresh_infoset(&mut self) -> InfosetId {
        let id = InfosetId(self.next_infoset);
        self.next_infoset += 1;
        id
    }

    fn ensure_terminal(&self, node: NodeId) -> Result<(), TreeError> {
        let entry = self.node(node)?;
        if !entry.children.is_empty() || entry.infoset.is_some() {
            return Err(TreeError::NotTerminal(node));
        }
        Ok(())
    }

    pub(super) fn attach(&mut self, node: NodeId, infoset: InfosetId) -> Result<(), TreeError> {
        let count = self.infoset(infoset)?.num_actions();
        self.node(node)?;
        let children: Vec<NodeId> = (0..count).map(|_| self.alloc(Some(node))).collect();
        let entry = self.node_mut(node)?;
        entry.children = children;
        entry.infoset = Some(infoset);
        if let Some(iset) = self.infosets.get_mut(&infoset) {
            iset.members.push(node);
        }
        Ok(())
    }

    fn alloc(&mut self, parent: Option<NodeId>) -> NodeId {
        let node = Node {
            parent,
            ..Node::default()
        };
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            NodeId::new(index, slot.generation)
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            NodeId::new(index, 0)
        }
    }

    fn release(&mut self, id: NodeId) {
        if let Some(slot) = self.slots.get_mut(id.index()) {
            if slot.generation == id.generation() && slot.node.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(id.index() as u32);
                self.live -= 1;
            }
        }
    }

    // ========================================================================
    // Traversal and destruction
    // ========================================================================

    /// Nodes of the subtree rooted at `node`, in preorder (node first).
    pub fn preorder(&self, node: NodeId) -> Result<Vec<NodeId>, TreeError> {
        self.node(node)?;
        let mut order = Vec::new();
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.node(id)?.children.iter().rev());
        }
        Ok(order)
    }

    /// Destroy everything below `node`, leaving it as a terminal leaf.
    ///
    /// The node keeps its outcome. Information sets left without members are
    /// removed from their player's list. Handles into the deleted subtree
    /// become stale.
    pub fn delete_tree(&mut self, node: NodeId) -> Result<(), TreeError> {
        let doomed = self.preorder(node)?;
        for &id in &doomed {
            if let Some(infoset) = self.node(id)?.infoset {
                self.leave_infoset(id, infoset);
            }
        }
        for &id in doomed.iter().skip(1) {
            self.release(id);
        }
        let entry = self.node_mut(node)?;
        entry.children.clear();
        entry.infoset = None;
        Ok(())
    }

    fn leave_infoset(&mut self, node: NodeId, id: InfosetId) {
        let emptied = match self.infosets.get_mut(&id) {
            Some(iset) => {
                iset.members.retain(|&member| member != node);
                iset.members.is_empty()
            }
            None => false,
        };
        if emptied {
            if let Some(Owner::Player(player)) = self.infosets.remove(&id).map(|iset| iset.owner) {
                self.players[player.index()].infosets.retain(|&owned| owned != id);
            }
        }
    }
}

/// Errors raised by tree construction and lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeError {
    /// Handle refers to a freed or never-allocated slot.
    StaleNode(NodeId),
    /// Operation requires a terminal node.
    NotTerminal(NodeId),
    /// Player index out of range.
    UnknownPlayer(usize),
    /// Information set does not exist in this tree.
    UnknownInfoset(InfosetId),
    /// Outcome does not exist in this tree.
    UnknownOutcome(OutcomeId),
    /// Payoff vector length differs from the player count.
    PayoffArity {
        /// Number of players.
        expected: usize,
        /// Payoffs supplied.
        actual: usize,
    },
    /// A move was declared without actions.
    EmptyActions(String),
    /// Action or child count disagrees with the information set.
    ActionMismatch {
        /// Information set label.
        label: String,
        /// Count required.
        expected: usize,
        /// Count found.
        actual: usize,
    },
    /// Chance probabilities are negative or do not sum to one.
    InvalidProbabilities(String),
    /// Player nodes cannot join a chance information set.
    ChanceInfoset(InfosetId),
    /// An information set label is used by two different players.
    LabelConflict(String),
    /// Game description could not be parsed.
    ParseError(String),
    /// Game file could not be read.
    IoError(String),
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeError::StaleNode(id) => write!(f, "{} is not a live node", id),
            TreeError::NotTerminal(id) => write!(f, "{} already has a move", id),
            TreeError::UnknownPlayer(p) => write!(f, "no player with index {}", p),
            TreeError::UnknownInfoset(id) => write!(f, "{} does not exist", id),
            TreeError::UnknownOutcome(id) => write!(f, "{} does not exist", id),
            TreeError::PayoffArity { expected, actual } => {
                write!(f, "outcome has {} payoffs, game has {} players", actual, expected)
            }
            TreeError::EmptyActions(label) => write!(f, "move '{}' has no actions", label),
            TreeError::ActionMismatch {
                label,
                expected,
                actual,
            } => write!(
                f,
                "information set '{}' expects {} actions, found {}",
                label, expected, actual
            ),
            TreeError::InvalidProbabilities(label) => {
                write!(f, "chance move '{}' has invalid probabilities", label)
            }
            TreeError::ChanceInfoset(id) => write!(f, "{} belongs to chance", id),
            TreeError::LabelConflict(label) => {
                write!(f, "information set '{}' is claimed by two players", label)
            }
            TreeError::ParseError(msg) => write!(f, "failed to parse game: {}", msg),
            TreeError::IoError(msg) => write!(f, "failed to read game: {}", msg),
        }
    }
}

impl std::error::Error for TreeError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn simple() -> (GameTree, InfosetId) {
        let mut tree = GameTree::new("simple", &["Alice", "Bob"]);
        let root = tree.root();
        let iset = tree.append_move(root, PlayerId(0), "a", &["L", "R"]).unwrap();
        (tree, iset)
    }

    #[test]
    fn test_append_move_creates_children() {
        let (tree, iset) = simple();
        let root = tree.node(tree.root()).unwrap();

        assert_eq!(root.children().len(), 2);
        assert_eq!(root.infoset(), Some(iset));
        assert_eq!(tree.num_nodes(), 3);
        assert_eq!(tree.player(PlayerId(0)).unwrap().infosets(), &[iset]);
        assert_eq!(tree.infoset_position(iset), Some((PlayerId(0), 0)));
    }

    #[test]
    fn test_append_move_rejects_decision_node() {
        let (mut tree, _) = simple();
        let root = tree.root();
        let err = tree.append_move(root, PlayerId(1), "b", &["x"]).unwrap_err();
        assert_eq!(err, TreeError::NotTerminal(root));
    }

    #[test]
    fn test_join_infoset() {
        let (mut tree, _) = simple();
        let children = tree.node(tree.root()).unwrap().children().to_vec();
        let b = tree.append_move(children[0], PlayerId(1), "b", &["x", "y"]).unwrap();
        tree.join_infoset(children[1], b).unwrap();

        assert_eq!(tree.infoset(b).unwrap().members(), &[children[0], children[1]]);
        assert_eq!(tree.node(children[1]).unwrap().children().len(), 2);
    }

    #[test]
    fn test_chance_probabilities_validated() {
        let mut tree = GameTree::new("chance", &["Alice"]);
        let root = tree.root();
        let err = tree
            .append_chance(root, "deal", &[("a", 0.5), ("b", 0.6)])
            .unwrap_err();
        assert_eq!(err, TreeError::InvalidProbabilities("deal".to_string()));

        let iset = tree.append_chance(root, "deal", &[("a", 0.25), ("b", 0.75)]).unwrap();
        assert_eq!(tree.infoset(iset).unwrap().chance_probs(), &[0.25, 0.75]);
        assert_eq!(tree.infoset_position(iset), None);
    }

    #[test]
    fn test_outcome_arity() {
        let (mut tree, _) = simple();
        assert_eq!(
            tree.new_outcome(vec![1.0]).unwrap_err(),
            TreeError::PayoffArity {
                expected: 2,
                actual: 1
            }
        );
        let outcome = tree.new_outcome(vec![1.0, -1.0]).unwrap();
        assert_eq!(tree.outcome(outcome).unwrap().payoff(PlayerId(1)), -1.0);
    }

    #[test]
    fn test_delete_tree_makes_handles_stale() {
        let (mut tree, iset) = simple();
        let root = tree.root();
        let children = tree.node(root).unwrap().children().to_vec();
        let outcome = tree.new_outcome(vec![2.0, 0.0]).unwrap();
        tree.set_outcome(root, Some(outcome)).unwrap();

        tree.delete_tree(root).unwrap();

        assert!(tree.node(root).unwrap().is_terminal());
        assert_eq!(tree.node(root).unwrap().outcome(), Some(outcome));
        assert_eq!(tree.num_nodes(), 1);
        for child in children {
            assert!(!tree.contains(child));
            assert_eq!(tree.node(child).unwrap_err(), TreeError::StaleNode(child));
        }
        assert!(tree.infoset(iset).is_err());
        assert!(tree.player(PlayerId(0)).unwrap().infosets().is_empty());
    }

    #[test]
    fn test_freed_slot_reuse_bumps_generation() {
        let (mut tree, _) = simple();
        let root = tree.root();
        // The last freed slot is handed out first.
        let old = tree.node(root).unwrap().children()[1];
        tree.delete_tree(root).unwrap();

        tree.append_move(root, PlayerId(1), "again", &["x"]).unwrap();
        let new = tree.node(root).unwrap().children()[0];

        assert_eq!(new.index(), old.index());
        assert_eq!(new.generation(), old.generation() + 1);
        assert!(tree.contains(new));
        assert!(!tree.contains(old));
    }

    #[test]
    fn test_preorder() {
        let (mut tree, _) = simple();
        let root = tree.root();
        let children = tree.node(root).unwrap().children().to_vec();
        tree.append_move(children[0], PlayerId(1), "b", &["x", "y"]).unwrap();
        let grandchildren = tree.node(children[0]).unwrap().children().to_vec();

        let order = tree.preorder(root).unwrap();
        assert_eq!(
            order,
            vec![root, children[0], grandchildren[0], grandchildren[1], children[1]]
        );
    }
}
