//! Sequence-form complementary pivoting for two-player trees.
//!
//! Each player's strategy is a realization plan over their sequences (the
//! empty sequence plus one per information-set action). Best-response
//! conditions for both players form a linear complementarity problem whose
//! size is linear in the tree, solved here by Lemke's algorithm.
//!
//! Payoffs are shifted to be strictly negative, which makes every
//! information-set value nonpositive; the duals of the plan constraints are
//! then carried as nonnegative variables and the constraints `E x = e` enter
//! the problem as `E x ≥ e`. Plans are normalized into behavior strategies
//! and every candidate is checked against the tree before it is reported.

use log::{debug, warn};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::efg::{GameTree, InfosetId, Owner, PlayerId, TreeError};
use crate::methods::lcp;
use crate::methods::{ExtensiveFormMethod, MethodOutput, WorkCounters};
use crate::profile::BehaviorProfile;
use crate::subgame::ConfigError;

/// Parameters for [`SeqForm`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SeqFormParams {
    /// Pivot budget.
    pub max_pivots: u64,
    /// Largest Liapunov value of an accepted profile.
    pub tolerance: f64,
}

impl Default for SeqFormParams {
    fn default() -> Self {
        Self {
            max_pivots: 100_000,
            tolerance: 1e-8,
        }
    }
}

impl SeqFormParams {
    /// Validate the parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_pivots == 0 {
            return Err(ConfigError::InvalidCount("seq_form.max_pivots"));
        }
        if !(self.tolerance > 0.0) {
            return Err(ConfigError::InvalidTolerance("seq_form", self.tolerance));
        }
        Ok(())
    }
}

/// Sequences of one player.
struct Sequences {
    /// Sequence index of each (infoset, action); the empty sequence is 0.
    index: FxHashMap<(InfosetId, usize), usize>,
    /// Parent sequence of each owned information set, in the player's order.
    parents: Vec<(InfosetId, usize)>,
    count: usize,
}

impl Sequences {
    fn new() -> Self {
        Self {
            index: FxHashMap::default(),
            parents: Vec::new(),
            count: 1,
        }
    }

    /// Constraint matrix `E`: row 0 fixes the empty sequence, one row per
    /// information set ties its actions to the parent sequence.
    fn constraints(&self, tree: &GameTree) -> Result<Vec<Vec<f64>>, TreeError> {
        let mut rows = vec![vec![0.0; self.count]];
        rows[0][0] = 1.0;
        for &(id, parent) in &self.parents {
            let mut row = vec![0.0; self.count];
            row[parent] = -1.0;
            for a in 0..tree.infoset(id)?.num_actions() {
                row[self.index[&(id, a)]] = 1.0;
            }
            rows.push(row);
        }
        Ok(rows)
    }
}

/// A leaf as seen by the sequence form.
struct Leaf {
    sequences: [usize; 2],
    chance: f64,
    payoffs: [f64; 2],
}

/// Solves two-player trees through their sequence form.
#[derive(Debug, Clone, Default)]
pub struct SeqForm {
    params: SeqFormParams,
}

impl SeqForm {
    /// Create the method.
    pub fn new(params: SeqFormParams) -> Self {
        Self { params }
    }

    fn sequence_form(tree: &GameTree) -> Result<([Sequences; 2], Vec<Leaf>), TreeError> {
        let mut seqs = [Sequences::new(), Sequences::new()];
        for (pl, player) in tree.players().iter().enumerate() {
            for &id in player.infosets() {
                for a in 0..tree.infoset(id)?.num_actions() {
                    seqs[pl].index.insert((id, a), seqs[pl].count);
                    seqs[pl].count += 1;
                }
            }
        }

        let mut parents: [FxHashMap<InfosetId, usize>; 2] = Default::default();
        let mut leaves = Vec::new();
        let mut stack = vec![(tree.root(), [0usize; 2], 1.0, [0.0f64; 2])];
        while let Some((id, current, chance, mut payoffs)) = stack.pop() {
            let node = tree.node(id)?;
            if let Some(outcome) = node.outcome() {
                let outcome = tree.outcome(outcome)?;
                payoffs[0] += outcome.payoff(PlayerId(0));
                payoffs[1] += outcome.payoff(PlayerId(1));
            }
            let Some(infoset) = node.infoset() else {
                leaves.push(Leaf {
                    sequences: current,
                    chance,
                    payoffs,
                });
                continue;
            };
            let iset = tree.infoset(infoset)?;
            for (a, &child) in node.children().iter().enumerate() {
                match iset.owner() {
                    Owner::Chance => {
                        stack.push((child, current, chance * iset.chance_probs()[a], payoffs));
                    }
                    Owner::Player(player) => {
                        let pl = player.index();
                        parents[pl].entry(infoset).or_insert(current[pl]);
                        let mut next = current;
                        next[pl] = seqs[pl].index[&(infoset, a)];
                        stack.push((child, next, chance, payoffs));
                    }
                }
            }
        }

        for (pl, player) in tree.players().iter().enumerate() {
            for &id in player.infosets() {
                let parent = parents[pl].get(&id).copied().unwrap_or(0);
                seqs[pl].parents.push((id, parent));
            }
        }
        Ok((seqs, leaves))
    }

    fn solve_tree(&self, tree: &GameTree, work: &mut WorkCounters) -> Result<Vec<BehaviorProfile>, TreeError> {
        let ([first, second], leaves) = Self::sequence_form(tree)?;
        let (n0, n1) = (first.count, second.count);
        let e = first.constraints(tree)?;
        let f = second.constraints(tree)?;
        let (m0, m1) = (e.len(), f.len());

        let top = leaves
            .iter()
            .flat_map(|leaf| leaf.payoffs)
            .fold(f64::NEG_INFINITY, f64::max);
        let shift = top + 1.0;
        let mut a = vec![vec![0.0; n1]; n0];
        let mut b = vec![vec![0.0; n1]; n0];
        for leaf in &leaves {
            let [s0, s1] = leaf.sequences;
            a[s0][s1] += leaf.chance * (leaf.payoffs[0] - shift);
            b[s0][s1] += leaf.chance * (leaf.payoffs[1] - shift);
        }

        // z = (x, y, u, v)
        let (ox, oy, ou, ov) = (0, n0, n0 + n1, n0 + n1 + m0);
        let size = ov + m1;
        let mut m = vec![vec![0.0; size]; size];
        let mut q = vec![0.0; size];
        for i in 0..n0 {
            for j in 0..n1 {
                m[ox + i][oy + j] = -a[i][j];
                m[oy + j][ox + i] = -b[i][j];
            }
            for r in 0..m0 {
                m[ox + i][ou + r] = -e[r][i];
                m[ou + r][ox + i] = e[r][i];
            }
        }
        for j in 0..n1 {
            for r in 0..m1 {
                m[oy + j][ov + r] = -f[r][j];
                m[ov + r][oy + j] = f[r][j];
            }
        }
        q[ou] = -1.0;
        q[ov] = -1.0;

        let outcome = lcp::lemke(&m, &q, self.params.max_pivots);
        work.pivots += outcome.pivots;
        let Some(z) = outcome.solution else {
            debug!("seq_form: no complementary solution after {} pivots", outcome.pivots);
            return Ok(Vec::new());
        };

        let mut profile = BehaviorProfile::zero(tree)?;
        for (seqs, plan) in [(&first, &z[ox..oy]), (&second, &z[oy..ou])] {
            for &(id, _) in &seqs.parents {
                let Some(probs) = profile.probs_mut(id) else {
                    continue;
                };
                let weights: Vec<f64> = (0..probs.len())
                    .map(|act| plan[seqs.index[&(id, act)]].max(0.0))
                    .collect();
                let total: f64 = weights.iter().sum();
                for (p, w) in probs.iter_mut().zip(&weights) {
                    *p = if total > 1e-12 { w / total } else { 1.0 / weights.len() as f64 };
                }
            }
        }

        let liap = profile.liap_value(tree)?;
        work.evaluations += 1;
        if liap > self.params.tolerance {
            debug!("seq_form: candidate rejected with Liapunov value {:e}", liap);
            return Ok(Vec::new());
        }
        Ok(vec![profile])
    }
}

impl ExtensiveFormMethod for SeqForm {
    fn name(&self) -> &'static str {
        "seq_form"
    }

    fn solve(&mut self, tree: &GameTree) -> MethodOutput<BehaviorProfile> {
        let mut work = WorkCounters::default();
        if tree.num_players() != 2 {
            warn!("seq_form needs two players, game has {}", tree.num_players());
            return MethodOutput::empty(work);
        }
        match self.solve_tree(tree, &mut work) {
            Ok(profiles) => MethodOutput { profiles, work },
            Err(e) => {
                warn!("seq_form failed on '{}': {}", tree.title(), e);
                MethodOutput::empty(work)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games;

    #[test]
    fn test_single_decision() {
        let mut tree = GameTree::new("choice", &["Alice", "Bob"]);
        let root = tree.root();
        tree.append_move(root, PlayerId(0), "pick", &["L", "R"]).unwrap();
        let children = tree.node(root).unwrap().children().to_vec();
        let good = tree.new_outcome(vec![1.0, 0.0]).unwrap();
        let bad = tree.new_outcome(vec![0.0, 0.0]).unwrap();
        tree.set_outcome(children[0], Some(good)).unwrap();
        tree.set_outcome(children[1], Some(bad)).unwrap();

        let out = SeqForm::default().solve(&tree);

        assert_eq!(out.profiles.len(), 1);
        assert_eq!(out.profiles[0].infoset_probs(PlayerId(0), 0), &[1.0, 0.0]);
        assert!(out.work.pivots > 0);
    }

    #[test]
    fn test_reported_profiles_are_equilibria() {
        for tree in [games::matching_pennies(), games::prisoners_dilemma(), games::battle_of_sexes()] {
            let tree = tree.unwrap();
            let out = SeqForm::default().solve(&tree);
            for profile in &out.profiles {
                assert!(profile.liap_value(&tree).unwrap() < 1e-8);
            }
        }
    }

    #[test]
    fn test_sequence_counts() {
        let tree = games::kuhn_poker().unwrap();
        let ([first, second], leaves) = SeqForm::sequence_form(&tree).unwrap();

        // Six infosets with two actions each, plus the empty sequence.
        assert_eq!(first.count, 13);
        assert_eq!(second.count, 13);
        assert_eq!(leaves.len(), 30);
        let total: f64 = leaves.iter().map(|l| l.chance).sum();
        assert!((total - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_three_players_rejected() {
        let tree = GameTree::new("crowd", &["A", "B", "C"]);
        assert!(SeqForm::default().solve(&tree).profiles.is_empty());
    }
}
