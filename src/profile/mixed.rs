//! Mixed-strategy profiles over a normal form.

use crate::nfg::{NormalForm, Support};

/// Probabilities over every player's pure strategies.
#[derive(Debug, Clone, PartialEq)]
pub struct MixedProfile {
    probs: Vec<Vec<f64>>,
}

impl MixedProfile {
    /// All-zero profile.
    pub fn zero(nfg: &NormalForm) -> Self {
        Self {
            probs: (0..nfg.num_players())
                .map(|pl| vec![0.0; nfg.num_strategies(pl)])
                .collect(),
        }
    }

    /// Uniform over each player's active strategies.
    pub fn uniform_on(nfg: &NormalForm, support: &Support) -> Self {
        let mut profile = Self::zero(nfg);
        for (pl, probs) in profile.probs.iter_mut().enumerate() {
            let active = support.active(pl);
            let p = 1.0 / active.len() as f64;
            for s in active {
                probs[s] = p;
            }
        }
        profile
    }

    /// Pure profile playing `contingency`.
    pub fn pure(nfg: &NormalForm, contingency: &[usize]) -> Self {
        let mut profile = Self::zero(nfg);
        for (probs, &s) in profile.probs.iter_mut().zip(contingency) {
            probs[s] = 1.0;
        }
        profile
    }

    /// Build from explicit probability vectors, one per player.
    pub fn from_vectors(probs: Vec<Vec<f64>>) -> Self {
        Self { probs }
    }

    /// Number of players.
    pub fn num_players(&self) -> usize {
        self.probs.len()
    }

    /// Probabilities of one player.
    pub fn probs(&self, player: usize) -> &[f64] {
        &self.probs[player]
    }

    /// Mutable probabilities of one player.
    pub fn probs_mut(&mut self, player: usize) -> &mut [f64] {
        &mut self.probs[player]
    }

    /// Probability of every contingency except `skip`'s own choice.
    fn weight(&self, contingency: &[usize], skip: Option<usize>) -> f64 {
        contingency
            .iter()
            .enumerate()
            .filter(|&(pl, _)| Some(pl) != skip)
            .map(|(pl, &s)| self.probs[pl][s])
            .product()
    }

    /// Expected payoff of `player`.
    pub fn payoff(&self, nfg: &NormalForm, player: usize) -> f64 {
        nfg.contingencies()
            .map(|c| {
                let w = self.weight(&c, None);
                if w == 0.0 {
                    0.0
                } else {
                    w * nfg.payoff(&c, player)
                }
            })
            .sum()
    }

    /// Payoff `player` would get from each of their pure strategies against
    /// everyone else's mix.
    pub fn deviation_values(&self, nfg: &NormalForm, player: usize) -> Vec<f64> {
        let mut values = vec![0.0; nfg.num_strategies(player)];
        for c in nfg.contingencies() {
            let w = self.weight(&c, Some(player));
            if w != 0.0 {
                values[c[player]] += w * nfg.payoff(&c, player);
            }
        }
        values
    }

    /// Liapunov value restricted to `support`: the sum of squared gains from
    /// switching to any active pure strategy.
    pub fn liap_value(&self, nfg: &NormalForm, support: &Support) -> f64 {
        let mut total = 0.0;
        for pl in 0..self.probs.len() {
            let values = self.deviation_values(nfg, pl);
            let current: f64 = self.probs[pl].iter().zip(&values).map(|(p, v)| p * v).sum();
            for s in support.active(pl) {
                let gain = (values[s] - current).max(0.0);
                total += gain * gain;
            }
        }
        total
    }

    /// Largest absolute coordinate difference.
    pub fn max_difference(&self, other: &MixedProfile) -> f64 {
        self.probs
            .iter()
            .flatten()
            .zip(other.probs.iter().flatten())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pennies() -> NormalForm {
        NormalForm::bimatrix(
            &[vec![1.0, -1.0], vec![-1.0, 1.0]],
            &[vec![-1.0, 1.0], vec![1.0, -1.0]],
        )
    }

    #[test]
    fn test_uniform_is_equilibrium() {
        let nfg = pennies();
        let support = Support::full(&nfg);
        let profile = MixedProfile::uniform_on(&nfg, &support);

        assert_eq!(profile.probs(0), &[0.5, 0.5]);
        assert!(profile.payoff(&nfg, 0).abs() < 1e-12);
        assert!(profile.liap_value(&nfg, &support) < 1e-12);
    }

    #[test]
    fn test_deviation_values() {
        let nfg = pennies();
        let profile = MixedProfile::pure(&nfg, &[0, 0]);

        assert_eq!(profile.deviation_values(&nfg, 1), vec![-1.0, 1.0]);
        assert_eq!(profile.payoff(&nfg, 0), 1.0);
        assert!((profile.liap_value(&nfg, &Support::full(&nfg)) - 4.0).abs() < 1e-12);
    }
}
