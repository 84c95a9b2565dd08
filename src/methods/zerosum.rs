//! Linear programming for two-player constant-sum games.
//!
//! With the row player's payoffs shifted strictly positive, the column
//! player's optimal mix solves `max Σ y` subject to `A y ≤ 1, y ≥ 0`; the row
//! player's mix is read from the duals of the same program.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::methods::lcp::Tableau;
use crate::methods::linalg::PIVOT_EPSILON;
use crate::methods::{MethodOutput, NormalFormMethod, WorkCounters};
use crate::nfg::{NormalForm, Support};
use crate::profile::MixedProfile;
use crate::subgame::ConfigError;

/// Parameters for [`ZeroSum`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ZeroSumParams {
    /// How far contingency payoff sums may differ and still count as constant.
    pub tolerance: f64,
    /// Pivot budget.
    pub max_pivots: u64,
}

impl Default for ZeroSumParams {
    fn default() -> Self {
        Self {
            tolerance: 1e-9,
            max_pivots: 10_000,
        }
    }
}

impl ZeroSumParams {
    /// Validate the parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.tolerance >= 0.0) {
            return Err(ConfigError::InvalidTolerance("zero_sum", self.tolerance));
        }
        if self.max_pivots == 0 {
            return Err(ConfigError::InvalidCount("zero_sum.max_pivots"));
        }
        Ok(())
    }
}

/// Optimal strategies of a constant-sum game by the simplex method.
#[derive(Debug, Clone, Default)]
pub struct ZeroSum {
    params: ZeroSumParams,
}

impl ZeroSum {
    /// Create the method.
    pub fn new(params: ZeroSumParams) -> Self {
        Self { params }
    }

    /// Maximize `Σ y` over `a y ≤ 1, y ≥ 0` with Bland's rule.
    ///
    /// Variables are `y_j = j` and slacks `s_i = n + i`. Returns the primal
    /// `y`, the duals of the rows, and the pivot count.
    fn simplex(a: &[Vec<f64>], max_pivots: u64) -> (Option<(Vec<f64>, Vec<f64>)>, u64) {
        let m = a.len();
        let n = a[0].len();
        let rows: Vec<Vec<f64>> = a
            .iter()
            .enumerate()
            .map(|(i, coefs)| {
                let mut row = vec![0.0; n + m];
                row[..n].copy_from_slice(coefs);
                row[n + i] = 1.0;
                row
            })
            .collect();
        let mut tableau = Tableau::new(rows, vec![1.0; m], (n..n + m).collect());
        let cost = |var: usize| if var < n { 1.0 } else { 0.0 };
        let shadow = |tableau: &Tableau, var: usize| -> f64 {
            tableau
                .basis()
                .iter()
                .enumerate()
                .map(|(r, &b)| cost(b) * tableau.row(r)[var])
                .sum()
        };

        let mut pivots = 0;
        loop {
            let entering = (0..n + m)
                .filter(|&k| !tableau.is_basic(k))
                .find(|&k| cost(k) - shadow(&tableau, k) > PIVOT_EPSILON);
            let Some(entering) = entering else {
                break;
            };
            if pivots >= max_pivots {
                return (None, pivots);
            }
            let Some(row) = tableau.ratio_test(entering, None) else {
                return (None, pivots);
            };
            tableau.pivot(row, entering);
            pivots += 1;
        }

        let y = (0..n).map(|j| tableau.value(j)).collect();
        let duals = (0..m).map(|i| shadow(&tableau, n + i).max(0.0)).collect();
        (Some((y, duals)), pivots)
    }
}

impl NormalFormMethod for ZeroSum {
    fn name(&self) -> &'static str {
        "zero_sum"
    }

    fn solve(&mut self, nfg: &NormalForm, support: &Support) -> MethodOutput<MixedProfile> {
        let mut work = WorkCounters::default();
        if nfg.num_players() != 2 {
            warn!("zero_sum needs two players, game has {}", nfg.num_players());
            return MethodOutput::empty(work);
        }
        if nfg.constant_sum(self.params.tolerance).is_none() {
            warn!("zero_sum skipped a game whose payoffs are not constant-sum");
            return MethodOutput::empty(work);
        }

        let rows = support.active(0);
        let cols = support.active(1);
        let (lo, _) = nfg.payoff_range();
        let shift = 1.0 - lo;
        let a: Vec<Vec<f64>> = rows
            .iter()
            .map(|&i| cols.iter().map(|&j| nfg.payoff(&[i, j], 0) + shift).collect())
            .collect();

        let (result, pivots) = Self::simplex(&a, self.params.max_pivots);
        work.pivots += pivots;
        let Some((y, duals)) = result else {
            debug!("zero_sum simplex stopped after {} pivots", pivots);
            return MethodOutput::empty(work);
        };
        let (sy, sx): (f64, f64) = (y.iter().sum(), duals.iter().sum());
        if sy <= PIVOT_EPSILON || sx <= PIVOT_EPSILON {
            return MethodOutput::empty(work);
        }
        debug!("zero_sum value for {}: {:.6}", nfg.player_name(0), 1.0 / sy - shift);

        let mut profile = MixedProfile::zero(nfg);
        for (&i, d) in rows.iter().zip(&duals) {
            profile.probs_mut(0)[i] = d / sx;
        }
        for (&j, v) in cols.iter().zip(&y) {
            profile.probs_mut(1)[j] = v / sy;
        }
        MethodOutput {
            profiles: vec![profile],
            work,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: &[f64], b: &[f64]) -> bool {
        a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-9)
    }

    #[test]
    fn test_matching_pennies() {
        let nfg = NormalForm::bimatrix(
            &[vec![1.0, -1.0], vec![-1.0, 1.0]],
            &[vec![-1.0, 1.0], vec![1.0, -1.0]],
        );
        let out = ZeroSum::default().solve(&nfg, &Support::full(&nfg));

        assert_eq!(out.profiles.len(), 1);
        assert!(close(out.profiles[0].probs(0), &[0.5, 0.5]));
        assert!(close(out.profiles[0].probs(1), &[0.5, 0.5]));
    }

    #[test]
    fn test_rock_paper_scissors() {
        let a = vec![
            vec![0.0, -1.0, 1.0],
            vec![1.0, 0.0, -1.0],
            vec![-1.0, 1.0, 0.0],
        ];
        let b: Vec<Vec<f64>> = a.iter().map(|r| r.iter().map(|v| -v).collect()).collect();
        let nfg = NormalForm::bimatrix(&a, &b);
        let support = Support::full(&nfg);
        let out = ZeroSum::default().solve(&nfg, &support);

        assert_eq!(out.profiles.len(), 1);
        let third = 1.0 / 3.0;
        assert!(close(out.profiles[0].probs(0), &[third; 3]));
        assert!(close(out.profiles[0].probs(1), &[third; 3]));
        assert!(out.profiles[0].liap_value(&nfg, &support) < 1e-12);
    }

    #[test]
    fn test_saddle_point() {
        // Row 1 dominates; column 0 is the best reply to it.
        let a = vec![vec![1.0, 3.0], vec![2.0, 4.0]];
        let b: Vec<Vec<f64>> = a.iter().map(|r| r.iter().map(|v| 5.0 - v).collect()).collect();
        let nfg = NormalForm::bimatrix(&a, &b);
        let out = ZeroSum::default().solve(&nfg, &Support::full(&nfg));

        assert_eq!(out.profiles.len(), 1);
        assert!(close(out.profiles[0].probs(0), &[0.0, 1.0]));
        assert!(close(out.profiles[0].probs(1), &[1.0, 0.0]));
    }

    #[test]
    fn test_general_sum_rejected() {
        let nfg = NormalForm::bimatrix(
            &[vec![3.0, 0.0], vec![5.0, 1.0]],
            &[vec![3.0, 5.0], vec![0.0, 1.0]],
        );
        let out = ZeroSum::default().solve(&nfg, &Support::full(&nfg));
        assert!(out.profiles.is_empty());
    }
}
