//! Reduced normal form of an extensive-form game, and the way back.

use itertools::Itertools;
use rustc_hash::FxHashMap;

use crate::efg::{GameTree, InfosetId, NodeId, Owner, PlayerId, TreeError};
use crate::nfg::normal::{NormalForm, PureStrategy};
use crate::profile::{BehaviorProfile, MixedProfile};

/// Partial plan of one player: sorted `(infoset position, action)` pairs.
type Plan = Vec<(usize, usize)>;

/// Mixed mass below which an information set counts as unreached.
const REACH_EPSILON: f64 = 1e-12;

impl NormalForm {
    /// Reduced normal form of `tree`.
    ///
    /// Each player's strategies assign an action only to the information sets
    /// their own moves do not rule out. Payoffs are the chance-weighted sums
    /// of the outcomes along the induced paths. Perfect recall is assumed.
    pub fn reduce(tree: &GameTree) -> Result<Self, TreeError> {
        let mut position: FxHashMap<InfosetId, usize> = FxHashMap::default();
        for player in tree.players() {
            for (k, &id) in player.infosets().iter().enumerate() {
                position.insert(id, k);
            }
        }

        let mut infosets = Vec::with_capacity(tree.num_players());
        let mut strategies = Vec::with_capacity(tree.num_players());
        let mut labels = Vec::with_capacity(tree.num_players());
        for (pl, player) in tree.players().iter().enumerate() {
            let owned = player.infosets();
            let plans = plans_below(tree, tree.root(), PlayerId(pl), &position)?;
            let mut mine = Vec::with_capacity(plans.len());
            let mut names = Vec::with_capacity(plans.len());
            for plan in plans {
                let mut choices = vec![None; owned.len()];
                for (k, a) in plan {
                    choices[k] = Some(a);
                }
                let name = if choices.is_empty() {
                    "-".to_string()
                } else {
                    choices
                        .iter()
                        .zip(owned)
                        .map(|(choice, &id)| match choice {
                            Some(a) => tree
                                .infoset(id)
                                .map(|iset| iset.actions()[*a].clone())
                                .unwrap_or_default(),
                            None => "*".to_string(),
                        })
                        .join("/")
                };
                mine.push(PureStrategy { choices });
                names.push(name);
            }
            infosets.push(owned.to_vec());
            strategies.push(mine);
            labels.push(names);
        }

        let shape: Vec<usize> = strategies.iter().map(Vec::len).collect();
        let mut nfg = NormalForm {
            players: tree.players().iter().map(|p| p.name().to_string()).collect(),
            infosets,
            labels,
            strategies,
            shape,
            payoffs: Vec::new(),
        };
        let payoffs = nfg
            .contingencies()
            .map(|c| {
                let chosen: Vec<&PureStrategy> = c
                    .iter()
                    .enumerate()
                    .map(|(pl, &s)| &nfg.strategies[pl][s])
                    .collect();
                expected_payoffs(tree, &chosen, &position)
            })
            .collect::<Result<Vec<_>, _>>()?;
        nfg.payoffs = payoffs;
        Ok(nfg)
    }

    /// Behavior profile over `tree` realizing the same play as `mixed`.
    ///
    /// The probability of an action is the mass of strategies choosing it
    /// divided by the mass of strategies that do not rule the information set
    /// out. Information sets every strategy in the mix rules out are played
    /// uniformly.
    pub fn to_behavior(
        &self,
        tree: &GameTree,
        mixed: &MixedProfile,
    ) -> Result<BehaviorProfile, TreeError> {
        let mut profile = BehaviorProfile::zero(tree)?;
        for (pl, owned) in self.infosets.iter().enumerate() {
            for (k, &id) in owned.iter().enumerate() {
                let Some(probs) = profile.probs_mut(id) else {
                    continue;
                };
                let mut reach = 0.0;
                for (s, strategy) in self.strategies[pl].iter().enumerate() {
                    if let Some(a) = strategy.choices[k] {
                        let p = mixed.probs(pl)[s];
                        probs[a] += p;
                        reach += p;
                    }
                }
                if reach > REACH_EPSILON {
                    probs.iter_mut().for_each(|p| *p /= reach);
                } else {
                    let n = probs.len() as f64;
                    probs.iter_mut().for_each(|p| *p = 1.0 / n);
                }
            }
        }
        Ok(profile)
    }
}

/// Every reduced partial plan `player` can follow in the subtree at `id`.
fn plans_below(
    tree: &GameTree,
    id: NodeId,
    player: PlayerId,
    position: &FxHashMap<InfosetId, usize>,
) -> Result<Vec<Plan>, TreeError> {
    let node = tree.node(id)?;
    let Some(infoset) = node.infoset() else {
        return Ok(vec![Vec::new()]);
    };

    let mut plans = if tree.infoset(infoset)?.owner() == Owner::Player(player) {
        let k = position
            .get(&infoset)
            .copied()
            .ok_or(TreeError::UnknownInfoset(infoset))?;
        let mut plans = Vec::new();
        for (a, &child) in node.children().iter().enumerate() {
            for plan in plans_below(tree, child, player, position)? {
                if let Some(plan) = combine(&plan, &[(k, a)]) {
                    plans.push(plan);
                }
            }
        }
        plans
    } else {
        let mut plans: Vec<Plan> = vec![Vec::new()];
        for &child in node.children() {
            let below = plans_below(tree, child, player, position)?;
            plans = plans
                .iter()
                .cartesian_product(below.iter())
                .filter_map(|(left, right)| combine(left, right))
                .collect();
            plans.sort();
            plans.dedup();
        }
        plans
    };
    plans.sort();
    plans.dedup();
    Ok(plans)
}

/// Union of two sorted plans, or `None` if they disagree somewhere.
fn combine(left: &[(usize, usize)], right: &[(usize, usize)]) -> Option<Plan> {
    let mut merged: Plan = left.iter().chain(right).copied().collect();
    merged.sort();
    merged.dedup();
    let consistent = merged.windows(2).all(|w| w[0].0 != w[1].0);
    consistent.then_some(merged)
}

/// Expected payoffs when each player follows the given reduced strategy.
fn expected_payoffs(
    tree: &GameTree,
    chosen: &[&PureStrategy],
    position: &FxHashMap<InfosetId, usize>,
) -> Result<Vec<f64>, TreeError> {
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
        let children = node.children();
        match iset.owner() {
            Owner::Chance => {
                for (&child, &p) in children.iter().zip(iset.chance_probs()) {
                    stack.push((child, reach * p));
                }
            }
            Owner::Player(player) => {
                let choice = position
                    .get(&infoset)
                    .and_then(|&k| chosen[player.index()].choices.get(k).copied().flatten());
                match choice {
                    Some(a) => stack.push((children[a], reach)),
                    None => {
                        let p = reach / children.len() as f64;
                        stack.extend(children.iter().map(|&child| (child, p)));
                    }
                }
            }
        }
    }
    Ok(totals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games;

    #[test]
    fn test_reduce_simultaneous_game() {
        let tree = games::prisoners_dilemma().unwrap();
        let nfg = NormalForm::reduce(&tree).unwrap();

        assert_eq!(nfg.shape(), &[2, 2]);
        assert_eq!(nfg.strategy_label(0, 0), "Cooperate");
        // Mutual defection.
        assert_eq!(nfg.payoffs(&[1, 1]), &[1.0, 1.0]);
    }

    #[test]
    fn test_reduce_precludes_own_infosets() {
        // Player 0 chooses In or Out, then chooses again only after In.
        let tree = games::two_stage().unwrap();
        let nfg = NormalForm::reduce(&tree).unwrap();

        // In/Top, In/Bottom and Out/* for player 0.
        assert_eq!(nfg.num_strategies(0), 3);
        assert_eq!(nfg.num_strategies(1), 2);
        let out = (0..3)
            .find(|&s| nfg.strategies(0)[s].choices[1].is_none())
            .unwrap();
        assert_eq!(nfg.strategy_label(0, out), "Out/*");
        assert_eq!(nfg.payoffs(&[out, 0]), &[1.5, 1.5]);
    }

    #[test]
    fn test_reduce_kuhn_strategy_counts() {
        let tree = games::kuhn_poker().unwrap();
        let nfg = NormalForm::reduce(&tree).unwrap();

        // Player 0: per card, check-then-fold/call or bet: 3^3 plans.
        assert_eq!(nfg.num_strategies(0), 27);
        // Player 1: per card, two independent binary choices: 4^3 plans.
        assert_eq!(nfg.num_strategies(1), 64);
        assert!(nfg.constant_sum(1e-9).is_some());
    }

    #[test]
    fn test_to_behavior_conditions_on_reach() {
        let tree = games::two_stage().unwrap();
        let nfg = NormalForm::reduce(&tree).unwrap();
        let mut mixed = MixedProfile::zero(&nfg);
        let out = (0..3)
            .find(|&s| nfg.strategies(0)[s].choices[1].is_none())
            .unwrap();
        let first_in = (0..3).find(|&s| s != out).unwrap();
        mixed.probs_mut(0)[out] = 0.5;
        mixed.probs_mut(0)[first_in] = 0.5;
        mixed.probs_mut(1)[1] = 1.0;

        let behavior = nfg.to_behavior(&tree, &mixed).unwrap();
        let root = behavior.infoset_probs(PlayerId(0), 0);
        assert!((root[0] - 0.5).abs() < 1e-12);
        assert!((root[1] - 0.5).abs() < 1e-12);
        // Conditional on In, the only surviving strategy picks its action surely.
        let a = nfg.strategies(0)[first_in].choices[1].unwrap();
        assert!((behavior.get(PlayerId(0), 1, a) - 1.0).abs() < 1e-12);
        assert_eq!(behavior.infoset_probs(PlayerId(1), 0), &[0.0, 1.0]);
    }

    #[test]
    fn test_to_behavior_unreached_is_uniform() {
        let tree = games::two_stage().unwrap();
        let nfg = NormalForm::reduce(&tree).unwrap();
        let out = (0..3)
            .find(|&s| nfg.strategies(0)[s].choices[1].is_none())
            .unwrap();
        let mut mixed = MixedProfile::zero(&nfg);
        mixed.probs_mut(0)[out] = 1.0;
        mixed.probs_mut(1)[0] = 1.0;

        let behavior = nfg.to_behavior(&tree, &mixed).unwrap();
        assert_eq!(behavior.infoset_probs(PlayerId(0), 1), &[0.5, 0.5]);
    }
}
