//! Lemke–Howson complementary pivoting for bimatrix games.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::methods::lcp::Tableau;
use crate::methods::{dedup_by, MethodOutput, NormalFormMethod, WorkCounters};
use crate::nfg::{NormalForm, Support};
use crate::profile::MixedProfile;
use crate::subgame::ConfigError;

/// Parameters for [`Lemke`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LemkeParams {
    /// Label dropped to leave the artificial equilibrium.
    pub start_label: usize,
    /// Follow the path from every label instead of only `start_label`.
    pub all_labels: bool,
    /// Pivot budget per path.
    pub max_pivots: u64,
}

impl Default for LemkeParams {
    fn default() -> Self {
        Self {
            start_label: 0,
            all_labels: false,
            max_pivots: 10_000,
        }
    }
}

impl LemkeParams {
    /// Validate the parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_pivots == 0 {
            return Err(ConfigError::InvalidCount("lemke.max_pivots"));
        }
        Ok(())
    }
}

/// Lemke–Howson path following on the support's bimatrix.
#[derive(Debug, Clone, Default)]
pub struct Lemke {
    params: LemkeParams,
}

impl Lemke {
    /// Create the method.
    pub fn new(params: LemkeParams) -> Self {
        Self { params }
    }

    /// Follow one path from the artificial equilibrium by dropping `label`.
    ///
    /// `a` and `b` must be strictly positive. Variables are numbered by
    /// label: in the row tableau `r_i = i` and `ȳ_j = m + j`; in the column
    /// tableau `x̄_i = i` and `s_j = m + j`.
    fn follow(
        a: &[Vec<f64>],
        b: &[Vec<f64>],
        label: usize,
        max_pivots: u64,
    ) -> (Option<(Vec<f64>, Vec<f64>)>, u64) {
        let m = a.len();
        let n = a[0].len();

        // r_i + Σ_j A_ij ȳ_j = 1
        let rows: Vec<Vec<f64>> = (0..m)
            .map(|i| {
                let mut row = vec![0.0; m + n];
                row[i] = 1.0;
                row[m..].copy_from_slice(&a[i]);
                row
            })
            .collect();
        let mut row_side = Tableau::new(rows, vec![1.0; m], (0..m).collect());

        // s_j + Σ_i B_ij x̄_i = 1
        let cols: Vec<Vec<f64>> = (0..n)
            .map(|j| {
                let mut row = vec![0.0; m + n];
                for i in 0..m {
                    row[i] = b[i][j];
                }
                row[m + j] = 1.0;
                row
            })
            .collect();
        let mut col_side = Tableau::new(cols, vec![1.0; n], (m..m + n).collect());

        let mut entering = label;
        let mut in_cols = label < m;
        let mut pivots = 0;
        loop {
            if pivots >= max_pivots {
                return (None, pivots);
            }
            let tableau = if in_cols { &mut col_side } else { &mut row_side };
            let Some(row) = tableau.ratio_test(entering, None) else {
                return (None, pivots);
            };
            let leaving = tableau.pivot(row, entering);
            pivots += 1;
            if leaving == label {
                break;
            }
            entering = leaving;
            in_cols = !in_cols;
        }

        let x: Vec<f64> = (0..m).map(|i| col_side.value(i)).collect();
        let y: Vec<f64> = (0..n).map(|j| row_side.value(m + j)).collect();
        let (sx, sy): (f64, f64) = (x.iter().sum(), y.iter().sum());
        if sx <= 0.0 || sy <= 0.0 {
            return (None, pivots);
        }
        (
            Some((
                x.into_iter().map(|v| v / sx).collect(),
                y.into_iter().map(|v| v / sy).collect(),
            )),
            pivots,
        )
    }
}

impl NormalFormMethod for Lemke {
    fn name(&self) -> &'static str {
        "lemke"
    }

    fn solve(&mut self, nfg: &NormalForm, support: &Support) -> MethodOutput<MixedProfile> {
        let mut work = WorkCounters::default();
        if nfg.num_players() != 2 {
            warn!("lemke needs two players, game has {}", nfg.num_players());
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
        let b: Vec<Vec<f64>> = rows
            .iter()
            .map(|&i| cols.iter().map(|&j| nfg.payoff(&[i, j], 1) + shift).collect())
            .collect();

        let labels: Vec<usize> = if self.params.all_labels {
            (0..rows.len() + cols.len()).collect()
        } else {
            vec![self.params.start_label.min(rows.len() + cols.len() - 1)]
        };

        let mut found = Vec::new();
        for label in labels {
            let (result, pivots) = Self::follow(&a, &b, label, self.params.max_pivots);
            work.pivots += pivots;
            match result {
                Some((x, y)) => {
                    let mut profile = MixedProfile::zero(nfg);
                    for (&i, p) in rows.iter().zip(x) {
                        profile.probs_mut(0)[i] = p;
                    }
                    for (&j, p) in cols.iter().zip(y) {
                        profile.probs_mut(1)[j] = p;
                    }
                    found.push(profile);
                }
                None => debug!("lemke path from label {} did not terminate", label),
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
    fn test_matching_pennies() {
        let nfg = NormalForm::bimatrix(
            &[vec![1.0, -1.0], vec![-1.0, 1.0]],
            &[vec![-1.0, 1.0], vec![1.0, -1.0]],
        );
        let support = Support::full(&nfg);
        let out = Lemke::default().solve(&nfg, &support);

        assert_eq!(out.profiles.len(), 1);
        let profile = &out.profiles[0];
        assert!((profile.probs(0)[0] - 0.5).abs() < 1e-9);
        assert!((profile.probs(1)[0] - 0.5).abs() < 1e-9);
        assert!(out.work.pivots > 0);
    }

    #[test]
    fn test_all_labels_finds_equilibria() {
        let nfg = NormalForm::bimatrix(
            &[vec![2.0, 0.0], vec![0.0, 1.0]],
            &[vec![1.0, 0.0], vec![0.0, 2.0]],
        );
        let support = Support::full(&nfg);
        let params = LemkeParams {
            all_labels: true,
            ..Default::default()
        };
        let out = Lemke::new(params).solve(&nfg, &support);

        assert!(!out.profiles.is_empty());
        for profile in &out.profiles {
            assert!(profile.liap_value(&nfg, &support) < 1e-9);
        }
    }

    #[test]
    fn test_respects_support() {
        // Row 2 would be a best response outside the support.
        let nfg = NormalForm::bimatrix(
            &[vec![1.0, 0.0], vec![0.0, 1.0], vec![5.0, 5.0]],
            &[vec![1.0, 0.0], vec![0.0, 1.0], vec![0.0, 0.0]],
        );
        let mut support = Support::full(&nfg);
        support.remove(0, 2);
        let out = Lemke::default().solve(&nfg, &support);

        assert_eq!(out.profiles.len(), 1);
        assert_eq!(out.profiles[0].probs(0)[2], 0.0);
        assert!(out.profiles[0].liap_value(&nfg, &support) < 1e-9);
    }
}
