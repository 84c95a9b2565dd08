//! Support enumeration for two-player games.

use itertools::Itertools;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::methods::{dedup_by, linalg, MethodOutput, NormalFormMethod, WorkCounters};
use crate::nfg::{NormalForm, Support};
use crate::profile::MixedProfile;
use crate::subgame::ConfigError;

/// Parameters for [`EnumMixed`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnumParams {
    /// Slack allowed on probabilities and best-response checks.
    pub tolerance: f64,
    /// Stop after this many equilibria (0 = find all).
    pub stop_after: usize,
}

impl Default for EnumParams {
    fn default() -> Self {
        Self {
            tolerance: 1e-9,
            stop_after: 0,
        }
    }
}

impl EnumParams {
    /// Validate the parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.tolerance > 0.0 && self.tolerance < 1.0) {
            return Err(ConfigError::InvalidTolerance("enum_mixed", self.tolerance));
        }
        Ok(())
    }
}

/// Finds every equilibrium whose two supports have equal size by solving the
/// indifference conditions on each pair of candidate supports.
///
/// Complete for nondegenerate games.
#[derive(Debug, Clone, Default)]
pub struct EnumMixed {
    params: EnumParams,
}

impl EnumMixed {
    /// Create the method.
    pub fn new(params: EnumParams) -> Self {
        Self { params }
    }

    /// Mixture over `rows` that makes the opponent indifferent across `cols`,
    /// where `payoff(i, j)` is the opponent's payoff.
    fn indifference(
        rows: &[usize],
        cols: &[usize],
        payoff: impl Fn(usize, usize) -> f64,
    ) -> Option<Vec<f64>> {
        // Unknowns: one weight per row plus the opponent's value.
        let k = rows.len();
        let mut a = Vec::with_capacity(k + 1);
        let mut b = Vec::with_capacity(k + 1);
        for &j in cols {
            let mut eq: Vec<f64> = rows.iter().map(|&i| payoff(i, j)).collect();
            eq.push(-1.0);
            a.push(eq);
            b.push(0.0);
        }
        let mut total = vec![1.0; k];
        total.push(0.0);
        a.push(total);
        b.push(1.0);
        let mut x = linalg::solve(a, b)?;
        x.pop();
        Some(x)
    }
}

impl NormalFormMethod for EnumMixed {
    fn name(&self) -> &'static str {
        "enum_mixed"
    }

    fn solve(&mut self, nfg: &NormalForm, support: &Support) -> MethodOutput<MixedProfile> {
        let mut work = WorkCounters::default();
        if nfg.num_players() != 2 {
            warn!("enum_mixed needs two players, game has {}", nfg.num_players());
            return MethodOutput::empty(work);
        }
        let tol = self.params.tolerance;
        let a = nfg.matrix(0);
        let b = nfg.matrix(1);
        let rows = support.active(0);
        let cols = support.active(1);

        let mut found = Vec::new();
        'sizes: for k in 1..=rows.len().min(cols.len()) {
            for (r, c) in rows
                .iter()
                .copied()
                .combinations(k)
                .cartesian_product(cols.iter().copied().combinations(k).collect::<Vec<_>>())
            {
                work.pivots += 2;
                let Some(x) = Self::indifference(&r, &c, |i, j| b[i][j]) else {
                    continue;
                };
                let Some(y) = Self::indifference(&c, &r, |j, i| a[i][j]) else {
                    continue;
                };
                if x.iter().chain(&y).any(|&p| p < -tol) {
                    continue;
                }

                let mut profile = MixedProfile::zero(nfg);
                for (&i, &p) in r.iter().zip(&x) {
                    profile.probs_mut(0)[i] = p.max(0.0);
                }
                for (&j, &p) in c.iter().zip(&y) {
                    profile.probs_mut(1)[j] = p.max(0.0);
                }

                let row_values = profile.deviation_values(nfg, 0);
                let col_values = profile.deviation_values(nfg, 1);
                work.evaluations += 2;
                let row_value = r.iter().map(|&i| row_values[i]).fold(f64::NEG_INFINITY, f64::max);
                let col_value = c.iter().map(|&j| col_values[j]).fold(f64::NEG_INFINITY, f64::max);
                let stable = rows.iter().all(|&i| row_values[i] <= row_value + tol)
                    && cols.iter().all(|&j| col_values[j] <= col_value + tol);
                if stable {
                    found.push(profile);
                    if self.params.stop_after > 0 && found.len() >= self.params.stop_after {
                        break 'sizes;
                    }
                }
            }
        }

        let profiles = dedup_by(found, 1e-6, |p, q| p.max_difference(q));
        MethodOutput { profiles, work }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_battle_of_sexes_has_three() {
        let nfg = NormalForm::bimatrix(
            &[vec![2.0, 0.0], vec![0.0, 1.0]],
            &[vec![1.0, 0.0], vec![0.0, 2.0]],
        );
        let out = EnumMixed::default().solve(&nfg, &Support::full(&nfg));

        assert_eq!(out.profiles.len(), 3);
        let mixed = &out.profiles[2];
        assert!((mixed.probs(0)[0] - 2.0 / 3.0).abs() < 1e-9);
        assert!((mixed.probs(1)[0] - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_matching_pennies() {
        let nfg = NormalForm::bimatrix(
            &[vec![1.0, -1.0], vec![-1.0, 1.0]],
            &[vec![-1.0, 1.0], vec![1.0, -1.0]],
        );
        let support = Support::full(&nfg);
        let out = EnumMixed::new(EnumParams::default()).solve(&nfg, &support);

        assert_eq!(out.profiles.len(), 1);
        assert!(out.profiles[0].liap_value(&nfg, &support) < 1e-12);
    }

    #[test]
    fn test_stop_after() {
        let nfg = NormalForm::bimatrix(
            &[vec![2.0, 0.0], vec![0.0, 1.0]],
            &[vec![1.0, 0.0], vec![0.0, 2.0]],
        );
        let params = EnumParams {
            stop_after: 1,
            ..Default::default()
        };
        let out = EnumMixed::new(params).solve(&nfg, &Support::full(&nfg));
        assert_eq!(out.profiles.len(), 1);
    }

    #[test]
    fn test_invalid_tolerance() {
        let params = EnumParams {
            tolerance: 0.0,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }
}
