//! Pure-strategy equilibrium search.

use crate::methods::{MethodOutput, NormalFormMethod, WorkCounters};
use crate::nfg::{NormalForm, Support};
use crate::profile::MixedProfile;

/// Payoff slack tolerated when comparing deviations.
const TOLERANCE: f64 = 1e-9;

/// Enumerates every pure contingency of the support and keeps those where no
/// player gains from a pure deviation inside the support.
#[derive(Debug, Clone, Copy, Default)]
pub struct PureNash;

impl PureNash {
    /// Create the method.
    pub fn new() -> Self {
        Self
    }
}

impl NormalFormMethod for PureNash {
    fn name(&self) -> &'static str {
        "pure_nash"
    }

    fn solve(&mut self, nfg: &NormalForm, support: &Support) -> MethodOutput<MixedProfile> {
        let mut work = WorkCounters::default();
        let mut profiles = Vec::new();
        for contingency in support.contingencies() {
            let mut stable = true;
            'players: for pl in 0..nfg.num_players() {
                let current = nfg.payoff(&contingency, pl);
                let mut deviation = contingency.clone();
                for s in support.active(pl) {
                    deviation[pl] = s;
                    work.evaluations += 1;
                    if nfg.payoff(&deviation, pl) > current + TOLERANCE {
                        stable = false;
                        break 'players;
                    }
                }
            }
            if stable {
                profiles.push(MixedProfile::pure(nfg, &contingency));
            }
        }
        MethodOutput { profiles, work }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordination_game_has_two() {
        let nfg = NormalForm::bimatrix(
            &[vec![2.0, 0.0], vec![0.0, 1.0]],
            &[vec![1.0, 0.0], vec![0.0, 2.0]],
        );
        let out = PureNash.solve(&nfg, &Support::full(&nfg));

        assert_eq!(out.profiles.len(), 2);
        assert_eq!(out.profiles[0], MixedProfile::pure(&nfg, &[0, 0]));
        assert_eq!(out.profiles[1], MixedProfile::pure(&nfg, &[1, 1]));
        assert!(out.work.evaluations > 0);
    }

    #[test]
    fn test_matching_pennies_has_none() {
        let nfg = NormalForm::bimatrix(
            &[vec![1.0, -1.0], vec![-1.0, 1.0]],
            &[vec![-1.0, 1.0], vec![1.0, -1.0]],
        );
        assert!(PureNash::new().solve(&nfg, &Support::full(&nfg)).profiles.is_empty());
    }
}
