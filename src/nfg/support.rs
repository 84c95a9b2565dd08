//! Strategy supports and dominance elimination.

use itertools::Itertools;
use log::trace;

use crate::nfg::normal::NormalForm;

/// The pure strategies each player may still use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Support {
    active: Vec<Vec<bool>>,
}

impl Support {
    /// Every strategy of every player.
    pub fn full(nfg: &NormalForm) -> Self {
        Self {
            active: nfg.shape().iter().map(|&n| vec![true; n]).collect(),
        }
    }

    /// Number of players.
    pub fn num_players(&self) -> usize {
        self.active.len()
    }

    /// Whether `strategy` of `player` is in the support.
    pub fn contains(&self, player: usize, strategy: usize) -> bool {
        self.active
            .get(player)
            .and_then(|a| a.get(strategy))
            .copied()
            .unwrap_or(false)
    }

    /// Remove a strategy. Refuses to empty a player's support.
    ///
    /// Returns whether the strategy was removed.
    pub fn remove(&mut self, player: usize, strategy: usize) -> bool {
        if !self.contains(player, strategy) || self.num_active(player) <= 1 {
            return false;
        }
        self.active[player][strategy] = false;
        true
    }

    /// Active strategies of `player`, ascending.
    pub fn active(&self, player: usize) -> Vec<usize> {
        self.active[player]
            .iter()
            .enumerate()
            .filter(|&(_, &on)| on)
            .map(|(s, _)| s)
            .collect()
    }

    /// Number of active strategies of `player`.
    pub fn num_active(&self, player: usize) -> usize {
        self.active[player].iter().filter(|&&on| on).count()
    }

    /// Every contingency of active strategies.
    pub fn contingencies(&self) -> impl Iterator<Item = Vec<usize>> + '_ {
        (0..self.active.len())
            .map(|pl| self.active(pl))
            .multi_cartesian_product()
    }

    /// Iteratively remove strategies strictly dominated by another active
    /// pure strategy. Returns how many were removed.
    pub fn eliminate_dominated(&mut self, nfg: &NormalForm) -> usize {
        let mut removed = 0;
        loop {
            let mut changed = false;
            for pl in 0..self.active.len() {
                for s in self.active(pl) {
                    let dominated = self
                        .active(pl)
                        .into_iter()
                        .any(|t| t != s && self.strictly_dominates(nfg, pl, t, s));
                    if dominated && self.remove(pl, s) {
                        trace!("player {} strategy {} is strictly dominated", pl, s);
                        removed += 1;
                        changed = true;
                    }
                }
            }
            if !changed {
                return removed;
            }
        }
    }

    fn strictly_dominates(&self, nfg: &NormalForm, player: usize, better: usize, worse: usize) -> bool {
        let others: Vec<Vec<usize>> = (0..self.active.len())
            .map(|pl| if pl == player { vec![0] } else { self.active(pl) })
            .collect();
        others.into_iter().multi_cartesian_product().all(|mut c| {
            c[player] = better;
            let high = nfg.payoff(&c, player);
            c[player] = worse;
            high > nfg.payoff(&c, player)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_never_empties() {
        let nfg = NormalForm::bimatrix(&[vec![0.0], vec![0.0]], &[vec![0.0], vec![0.0]]);
        let mut support = Support::full(&nfg);

        assert!(support.remove(0, 1));
        assert!(!support.remove(0, 0));
        assert!(!support.remove(1, 0));
        assert_eq!(support.active(0), vec![0]);
        assert!(!support.contains(0, 1));
    }

    #[test]
    fn test_prisoners_dilemma_dominance() {
        let nfg = NormalForm::bimatrix(
            &[vec![3.0, 0.0], vec![5.0, 1.0]],
            &[vec![3.0, 5.0], vec![0.0, 1.0]],
        );
        let mut support = Support::full(&nfg);

        assert_eq!(support.eliminate_dominated(&nfg), 2);
        assert_eq!(support.active(0), vec![1]);
        assert_eq!(support.active(1), vec![1]);
        assert_eq!(support.contingencies().collect::<Vec<_>>(), vec![vec![1, 1]]);
    }

    #[test]
    fn test_weak_dominance_is_kept() {
        let nfg = NormalForm::bimatrix(&[vec![1.0, 1.0], vec![1.0, 0.0]], &[vec![0.0; 2], vec![0.0; 2]]);
        let mut support = Support::full(&nfg);

        assert_eq!(support.eliminate_dominated(&nfg), 0);
        assert_eq!(support.contingencies().count(), 4);
    }
}
