//! Behavior-strategy profiles over a game tree.

use rustc_hash::FxHashMap;
use std::sync::Arc;

use crate::efg::{GameTree, InfosetId, Owner, PlayerId, TreeError};

/// Coordinate layout shared by every profile built from the same game.
#[derive(Debug, PartialEq)]
struct Shape {
    /// Information sets per player, in the tree's order at construction.
    infosets: Vec<Vec<InfosetId>>,
    labels: Vec<Vec<String>>,
    actions: Vec<Vec<Vec<String>>>,
    index: FxHashMap<InfosetId, (usize, usize)>,
}

impl Shape {
    fn of(tree: &GameTree) -> Result<Self, TreeError> {
        let mut shape = Shape {
            infosets: Vec::with_capacity(tree.num_players()),
            labels: Vec::with_capacity(tree.num_players()),
            actions: Vec::with_capacity(tree.num_players()),
            index: FxHashMap::default(),
        };
        for (pl, player) in tree.players().iter().enumerate() {
            let mut labels = Vec::new();
            let mut actions = Vec::new();
            for (k, &id) in player.infosets().iter().enumerate() {
                let infoset = tree.infoset(id)?;
                labels.push(infoset.label().to_string());
                actions.push(infoset.actions().to_vec());
                shape.index.insert(id, (pl, k));
            }
            shape.infosets.push(player.infosets().to_vec());
            shape.labels.push(labels);
            shape.actions.push(actions);
        }
        Ok(shape)
    }
}

/// Action probabilities at every information set of every player.
///
/// The coordinates are fixed when the profile is created: one entry per
/// player, per information set that player owned at the time, per action.
/// Profiles created from the same tree share their layout, so cloning is
/// cheap and [`merge`](Self::merge) is a plain componentwise sum.
#[derive(Debug, Clone)]
pub struct BehaviorProfile {
    shape: Arc<Shape>,
    probs: Vec<Vec<Vec<f64>>>,
}

impl BehaviorProfile {
    /// All-zero profile over `tree`.
    pub fn zero(tree: &GameTree) -> Result<Self, TreeError> {
        let shape = Shape::of(tree)?;
        let probs = shape
            .actions
            .iter()
            .map(|player| player.iter().map(|acts| vec![0.0; acts.len()]).collect())
            .collect();
        Ok(Self {
            shape: Arc::new(shape),
            probs,
        })
    }

    /// Profile where every player mixes uniformly at every information set.
    pub fn uniform(tree: &GameTree) -> Result<Self, TreeError> {
        let mut profile = Self::zero(tree)?;
        for probs in profile.probs.iter_mut().flatten() {
            let n = probs.len() as f64;
            probs.iter_mut().for_each(|p| *p = 1.0 / n);
        }
        Ok(profile)
    }

    /// Number of players.
    pub fn num_players(&self) -> usize {
        self.probs.len()
    }

    /// Information sets of `player`, in coordinate order.
    pub fn infosets(&self, player: PlayerId) -> &[InfosetId] {
        &self.shape.infosets[player.index()]
    }

    /// Label of a player's information set.
    pub fn infoset_label(&self, player: PlayerId, infoset: usize) -> &str {
        &self.shape.labels[player.index()][infoset]
    }

    /// Action labels of a player's information set.
    pub fn action_labels(&self, player: PlayerId, infoset: usize) -> &[String] {
        &self.shape.actions[player.index()][infoset]
    }

    /// Whether both profiles use the same coordinate layout.
    pub fn same_shape(&self, other: &BehaviorProfile) -> bool {
        Arc::ptr_eq(&self.shape, &other.shape) || self.shape == other.shape
    }

    /// Player and coordinate index of an information set.
    pub fn locate(&self, id: InfosetId) -> Option<(PlayerId, usize)> {
        self.shape
            .index
            .get(&id)
            .map(|&(player, index)| (PlayerId(player), index))
    }

    /// Probability of `action` at a player's `infoset`-th information set.
    ///
    /// Coordinates outside the profile read as zero.
    pub fn get(&self, player: PlayerId, infoset: usize, action: usize) -> f64 {
        self.probs
            .get(player.index())
            .and_then(|p| p.get(infoset))
            .and_then(|p| p.get(action))
            .copied()
            .unwrap_or(0.0)
    }

    /// Write one coordinate.
    ///
    /// # Panics
    /// Panics if the coordinate is outside the profile.
    pub fn set(&mut self, player: PlayerId, infoset: usize, action: usize, value: f64) {
        self.probs[player.index()][infoset][action] = value;
    }

    /// Action probabilities at an information set.
    pub fn probs(&self, id: InfosetId) -> Option<&[f64]> {
        let (player, index) = self.locate(id)?;
        Some(&self.probs[player.index()][index])
    }

    /// Mutable action probabilities at an information set.
    pub fn probs_mut(&mut self, id: InfosetId) -> Option<&mut [f64]> {
        let (player, index) = self.locate(id)?;
        Some(&mut self.probs[player.index()][index])
    }

    /// Action probabilities of a player's `infoset`-th information set.
    pub fn infoset_probs(&self, player: PlayerId, infoset: usize) -> &[f64] {
        &self.probs[player.index()][infoset]
    }

    /// Set every coordinate to zero.
    pub fn reset(&mut self) {
        for probs in self.probs.iter_mut().flatten() {
            probs.iter_mut().for_each(|p| *p = 0.0);
        }
    }

    /// Direct sum with a profile over a disjoint set of information sets.
    ///
    /// Both profiles must share a layout; coordinates are added pairwise.
    pub fn merge(&mut self, other: &BehaviorProfile) {
        for (mine, theirs) in self.probs.iter_mut().flatten().zip(other.probs.iter().flatten()) {
            for (a, b) in mine.iter_mut().zip(theirs) {
                *a += b;
            }
        }
    }

    /// Largest absolute coordinate difference.
    pub fn max_difference(&self, other: &BehaviorProfile) -> f64 {
        self.probs
            .iter()
            .flatten()
            .zip(other.probs.iter().flatten())
            .flat_map(|(a, b)| a.iter().zip(b).map(|(x, y)| (x - y).abs()))
            .fold(0.0, f64::max)
    }

    /// Flattened coordinates, player by player.
    pub fn as_flat(&self) -> Vec<f64> {
        self.probs.iter().flatten().flatten().copied().collect()
    }

    /// Overwrite every coordinate from a flat slice laid out like
    /// [`as_flat`](Self::as_flat).
    pub fn set_flat(&mut self, values: &[f64]) {
        for (slot, &value) in self.probs.iter_mut().flatten().flatten().zip(values) {
            *slot = value;
        }
    }

    /// Flat index ranges of every information set, in coordinate order.
    pub fn blocks(&self) -> Vec<std::ops::Range<usize>> {
        let mut blocks = Vec::new();
        let mut start = 0;
        for probs in self.probs.iter().flatten() {
            blocks.push(start..start + probs.len());
            start += probs.len();
        }
        blocks
    }

    // ========================================================================
    // Payoffs
    // ========================================================================

    /// Expected payoff of every player in `tree`.
    ///
    /// Outcomes accumulate along each path, weighted by the probability of
    /// reaching the node. Information sets outside the profile are played
    /// with probability zero.
    pub fn payoffs(&self, tree: &GameTree) -> Result<Vec<f64>, TreeError> {
        let mut totals = vec![0.0; tree.num_players()];
        let mut stack = vec![(tree.root(), 1.0)];
        while let Some((id, reach)) = stack.pop() {
            let node = tree.node(id)?;
            if let Some(outcome) = node.outcome() {
                for (total, payoff) in totals.iter_mut().zip(tree.outcome(outcome)?.payoffs()) {
                    *total += reach * payoff;
                }
            }
            let Some(infoset) = node.infoset() else {
                continue;
            };
            let iset = tree.infoset(infoset)?;
            for (a, &child) in node.children().iter().enumerate() {
                let p = match iset.owner() {
                    Owner::Chance => iset.chance_probs()[a],
                    Owner::Player(_) => self
                        .probs(infoset)
                        .and_then(|probs| probs.get(a))
                        .copied()
                        .unwrap_or(0.0),
                };
                if p > 0.0 {
                    stack.push((child, reach * p));
                }
            }
        }
        Ok(totals)
    }

    /// Expected payoff of one player.
    pub fn payoff(&self, tree: &GameTree, player: PlayerId) -> Result<f64, TreeError> {
        Ok(self.payoffs(tree)?.get(player.index()).copied().unwrap_or(0.0))
    }

    /// Payoff the owner of each information set would get by switching that
    /// information set to each pure action, everything else unchanged.
    ///
    /// Indexed `[player][infoset][action]`.
    pub fn action_values(&self, tree: &GameTree) -> Result<Vec<Vec<Vec<f64>>>, TreeError> {
        let mut values = Vec::with_capacity(self.probs.len());
        let mut trial = self.clone();
        for (pl, infosets) in self.probs.iter().enumerate() {
            let player = PlayerId(pl);
            let mut per_player = Vec::with_capacity(infosets.len());
            for (k, probs) in infosets.iter().enumerate() {
                let mut per_action = Vec::with_capacity(probs.len());
                for a in 0..probs.len() {
                    let slot = &mut trial.probs[pl][k];
                    slot.iter_mut().enumerate().for_each(|(b, p)| *p = if a == b { 1.0 } else { 0.0 });
                    per_action.push(trial.payoff(tree, player)?);
                }
                trial.probs[pl][k].copy_from_slice(probs);
                per_player.push(per_action);
            }
            values.push(per_player);
        }
        Ok(values)
    }

    /// Liapunov value: the sum over information sets and actions of the
    /// squared gain a player would get by switching to that action.
    ///
    /// Zero exactly at a Nash equilibrium in behavior strategies.
    pub fn liap_value(&self, tree: &GameTree) -> Result<f64, TreeError> {
        let payoffs = self.payoffs(tree)?;
        let values = self.action_values(tree)?;
        let mut total = 0.0;
        for (pl, infosets) in values.iter().enumerate() {
            for value in infosets.iter().flatten() {
                let gain = (value - payoffs[pl]).max(0.0);
                total += gain * gain;
            }
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games;

    #[test]
    fn test_zero_and_uniform() {
        let tree = games::matching_pennies().unwrap();
        let zero = BehaviorProfile::zero(&tree).unwrap();
        let uniform = BehaviorProfile::uniform(&tree).unwrap();

        assert_eq!(zero.num_players(), 2);
        assert!(zero.as_flat().iter().all(|&p| p == 0.0));
        assert!(uniform.as_flat().iter().all(|&p| p == 0.5));
        assert!(zero.same_shape(&uniform));
    }

    #[test]
    fn test_locate_and_probs() {
        let tree = games::two_stage().unwrap();
        let mut profile = BehaviorProfile::zero(&tree).unwrap();
        let ids = profile.infosets(PlayerId(0)).to_vec();

        assert_eq!(profile.locate(ids[1]), Some((PlayerId(0), 1)));
        profile.set(PlayerId(0), 1, 1, 0.75);
        assert_eq!(profile.probs(ids[1]), Some(&[0.0, 0.75][..]));
        assert_eq!(profile.get(PlayerId(0), 1, 1), 0.75);
        assert_eq!(profile.get(PlayerId(0), 9, 0), 0.0);
    }

    #[test]
    fn test_merge_is_direct_sum() {
        let tree = games::matching_pennies().unwrap();
        let mut left = BehaviorProfile::zero(&tree).unwrap();
        let mut right = BehaviorProfile::zero(&tree).unwrap();
        left.set(PlayerId(0), 0, 0, 1.0);
        right.set(PlayerId(1), 0, 1, 1.0);

        left.merge(&right);

        assert_eq!(left.as_flat(), vec![1.0, 0.0, 0.0, 1.0]);
        left.reset();
        assert!(left.as_flat().iter().all(|&p| p == 0.0));
    }

    #[test]
    fn test_payoffs_of_uniform_pennies() {
        let tree = games::matching_pennies().unwrap();
        let profile = BehaviorProfile::uniform(&tree).unwrap();
        let payoffs = profile.payoffs(&tree).unwrap();

        assert!(payoffs[0].abs() < 1e-12);
        assert!(payoffs[1].abs() < 1e-12);
        assert!(profile.liap_value(&tree).unwrap() < 1e-12);
    }

    #[test]
    fn test_liap_positive_away_from_equilibrium() {
        let tree = games::matching_pennies().unwrap();
        let mut profile = BehaviorProfile::zero(&tree).unwrap();
        profile.set(PlayerId(0), 0, 0, 1.0);
        profile.set(PlayerId(1), 0, 0, 1.0);

        // Column gains 2 by switching to tails.
        let liap = profile.liap_value(&tree).unwrap();
        assert!((liap - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_chance_weights_payoffs() {
        let mut tree = GameTree::new("lottery", &["Solo"]);
        let root = tree.root();
        tree.append_chance(root, "coin", &[("a", 0.25), ("b", 0.75)]).unwrap();
        let children = tree.node(root).unwrap().children().to_vec();
        let low = tree.new_outcome(vec![4.0]).unwrap();
        let high = tree.new_outcome(vec![8.0]).unwrap();
        tree.set_outcome(children[0], Some(low)).unwrap();
        tree.set_outcome(children[1], Some(high)).unwrap();

        let profile = BehaviorProfile::zero(&tree).unwrap();
        assert!((profile.payoff(&tree, PlayerId(0)).unwrap() - 7.0).abs() < 1e-12);
    }
}
