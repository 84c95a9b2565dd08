//! Grid refinement search over the support's strategy simplices.
//!
//! Each level restricts every player's mix to multiples of `1 / mesh`,
//! descends the Liapunov function by moving one grid unit between two
//! strategies at a time, then halves the grid spacing and continues from the
//! point reached.

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::methods::{MethodOutput, NormalFormMethod, WorkCounters};
use crate::nfg::{NormalForm, Support};
use crate::profile::MixedProfile;
use crate::subgame::ConfigError;

/// Parameters for [`Simpdiv`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimpdivParams {
    /// Grid denominator of the first level.
    pub start_mesh: u64,
    /// Number of times the grid is refined.
    pub refinements: usize,
    /// Largest Liapunov value accepted as an equilibrium.
    pub tolerance: f64,
    /// Evaluation budget across all levels.
    pub max_evaluations: u64,
}

impl Default for SimpdivParams {
    fn default() -> Self {
        Self {
            start_mesh: 4,
            refinements: 12,
            tolerance: 1e-6,
            max_evaluations: 1_000_000,
        }
    }
}

impl SimpdivParams {
    /// Validate the parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.start_mesh == 0 {
            return Err(ConfigError::InvalidCount("simpdiv.start_mesh"));
        }
        if self.max_evaluations == 0 {
            return Err(ConfigError::InvalidCount("simpdiv.max_evaluations"));
        }
        if !(self.tolerance > 0.0) {
            return Err(ConfigError::InvalidTolerance("simpdiv", self.tolerance));
        }
        Ok(())
    }
}

/// Approximates one equilibrium by successively refined grid descent.
#[derive(Debug, Clone, Default)]
pub struct Simpdiv {
    params: SimpdivParams,
}

impl Simpdiv {
    /// Create the method.
    pub fn new(params: SimpdivParams) -> Self {
        Self { params }
    }

    fn to_profile(units: &[Vec<u64>], mesh: u64) -> MixedProfile {
        MixedProfile::from_vectors(
            units
                .iter()
                .map(|player| player.iter().map(|&u| u as f64 / mesh as f64).collect())
                .collect(),
        )
    }
}

impl NormalFormMethod for Simpdiv {
    fn name(&self) -> &'static str {
        "simpdiv"
    }

    fn solve(&mut self, nfg: &NormalForm, support: &Support) -> MethodOutput<MixedProfile> {
        let mut work = WorkCounters::default();
        let players = nfg.num_players();
        let active: Vec<Vec<usize>> = (0..players).map(|pl| support.active(pl)).collect();

        // Grid point closest to the centroid.
        let mut mesh = self.params.start_mesh;
        let mut units: Vec<Vec<u64>> = (0..players)
            .map(|pl| {
                let mut units = vec![0; nfg.num_strategies(pl)];
                let k = active[pl].len() as u64;
                for (rank, &s) in active[pl].iter().enumerate() {
                    units[s] = mesh / k + u64::from((rank as u64) < mesh % k);
                }
                units
            })
            .collect();

        let mut value = Self::to_profile(&units, mesh).liap_value(nfg, support);
        work.evaluations += 1;

        'levels: for level in 0..=self.params.refinements {
            if level > 0 {
                mesh *= 2;
                units.iter_mut().flatten().for_each(|u| *u *= 2);
            }
            loop {
                if value <= self.params.tolerance / 16.0 {
                    break 'levels;
                }
                if work.evaluations >= self.params.max_evaluations {
                    debug!("simpdiv evaluation budget exhausted at mesh {}", mesh);
                    break 'levels;
                }
                let mut best: Option<(usize, usize, usize, f64)> = None;
                for pl in 0..players {
                    for &from in &active[pl] {
                        if units[pl][from] == 0 {
                            continue;
                        }
                        for &to in &active[pl] {
                            if to == from {
                                continue;
                            }
                            units[pl][from] -= 1;
                            units[pl][to] += 1;
                            let candidate = Self::to_profile(&units, mesh).liap_value(nfg, support);
                            units[pl][to] -= 1;
                            units[pl][from] += 1;
                            work.evaluations += 1;
                            if candidate < best.map_or(value, |b| b.3) {
                                best = Some((pl, from, to, candidate));
                            }
                        }
                    }
                }
                match best {
                    Some((pl, from, to, candidate)) => {
                        units[pl][from] -= 1;
                        units[pl][to] += 1;
                        value = candidate;
                    }
                    None => break,
                }
            }
            trace!("simpdiv mesh {} reached value {:e}", mesh, value);
        }

        if value <= self.params.tolerance {
            MethodOutput {
                profiles: vec![Self::to_profile(&units, mesh)],
                work,
            }
        } else {
            debug!("simpdiv stopped at value {:e}", value);
            MethodOutput::empty(work)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pennies_centroid() {
        let nfg = NormalForm::bimatrix(
            &[vec![1.0, -1.0], vec![-1.0, 1.0]],
            &[vec![-1.0, 1.0], vec![1.0, -1.0]],
        );
        let out = Simpdiv::default().solve(&nfg, &Support::full(&nfg));

        assert_eq!(out.profiles.len(), 1);
        assert_eq!(out.profiles[0].probs(0), &[0.5, 0.5]);
    }

    #[test]
    fn test_dominant_strategies() {
        let nfg = NormalForm::bimatrix(
            &[vec![3.0, 0.0], vec![5.0, 1.0]],
            &[vec![3.0, 5.0], vec![0.0, 1.0]],
        );
        let out = Simpdiv::default().solve(&nfg, &Support::full(&nfg));

        assert_eq!(out.profiles.len(), 1);
        assert_eq!(out.profiles[0].probs(0), &[0.0, 1.0]);
        assert_eq!(out.profiles[0].probs(1), &[0.0, 1.0]);
    }

    #[test]
    fn test_budget_exhaustion_reports_nothing() {
        let nfg = NormalForm::bimatrix(
            &[vec![3.0, 0.0], vec![5.0, 1.0]],
            &[vec![3.0, 5.0], vec![0.0, 1.0]],
        );
        let params = SimpdivParams {
            max_evaluations: 1,
            ..Default::default()
        };
        let out = Simpdiv::new(params).solve(&nfg, &Support::full(&nfg));
        assert!(out.profiles.is_empty());
    }
}
