//! Liapunov-function minimization.
//!
//! The Liapunov value of a profile is the sum of squared gains players could
//! get from pure deviations; it is zero exactly at equilibria. Both methods
//! minimize it by projected gradient descent over a product of simplices,
//! starting once from the centroid and then from random interior points.

use log::{debug, trace};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::efg::GameTree;
use crate::methods::linalg::project_simplex;
use crate::methods::{
    dedup_by, ExtensiveFormMethod, MethodOutput, NormalFormMethod, WorkCounters,
};
use crate::nfg::{NormalForm, Support};
use crate::profile::{BehaviorProfile, MixedProfile};
use crate::subgame::ConfigError;

/// Finite-difference step for the gradient.
const GRADIENT_STEP: f64 = 1e-7;

/// Parameters shared by [`NfgLiap`] and [`EfgLiap`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LiapParams {
    /// Number of starting points, the centroid included.
    pub trials: usize,
    /// Descent steps per starting point.
    pub max_iterations: usize,
    /// Largest Liapunov value accepted as an equilibrium.
    pub tolerance: f64,
    /// Random seed for the starting points; `None` draws one from entropy.
    pub seed: Option<u64>,
}

impl Default for LiapParams {
    fn default() -> Self {
        Self {
            trials: 10,
            max_iterations: 2_000,
            tolerance: 1e-10,
            seed: None,
        }
    }
}

impl LiapParams {
    /// Validate the parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trials == 0 {
            return Err(ConfigError::InvalidCount("liap.trials"));
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::InvalidCount("liap.max_iterations"));
        }
        if !(self.tolerance > 0.0) {
            return Err(ConfigError::InvalidTolerance("liap", self.tolerance));
        }
        Ok(())
    }

    /// Builder method: set random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

// ============================================================================
// Descent
// ============================================================================

/// Projected gradient descent of `objective` over the simplices in `blocks`.
///
/// Coordinates outside every block stay fixed. Returns the final point and
/// its value.
fn descend(
    mut point: Vec<f64>,
    blocks: &[Vec<usize>],
    max_iterations: usize,
    tolerance: f64,
    work: &mut WorkCounters,
    mut objective: impl FnMut(&[f64]) -> f64,
) -> (Vec<f64>, f64) {
    let mut value = objective(&point);
    work.evaluations += 1;
    let mut step = 1.0;

    for _ in 0..max_iterations {
        if value <= tolerance {
            break;
        }

        let mut gradient = vec![0.0; point.len()];
        let mut probe = point.clone();
        for &i in blocks.iter().flatten() {
            probe[i] += GRADIENT_STEP;
            gradient[i] = (objective(&probe) - value) / GRADIENT_STEP;
            probe[i] = point[i];
        }
        work.evaluations += blocks.iter().map(Vec::len).sum::<usize>() as u64;

        let mut improved = false;
        while step > 1e-12 {
            let mut candidate = point.clone();
            for block in blocks {
                let mut local: Vec<f64> = block.iter().map(|&i| point[i] - step * gradient[i]).collect();
                project_simplex(&mut local);
                for (&i, v) in block.iter().zip(local) {
                    candidate[i] = v;
                }
            }
            let candidate_value = objective(&candidate);
            work.evaluations += 1;
            if candidate_value < value {
                point = candidate;
                value = candidate_value;
                step *= 2.0;
                improved = true;
                break;
            }
            step *= 0.5;
        }
        if !improved {
            break;
        }
    }
    (point, value)
}

/// A random interior point of each block's simplex.
fn random_start(len: usize, blocks: &[Vec<usize>], rng: &mut StdRng) -> Vec<f64> {
    let mut point = vec![0.0; len];
    for block in blocks {
        let draws: Vec<f64> = block
            .iter()
            .map(|_| -(1.0 - rng.gen::<f64>()).ln())
            .collect();
        let total: f64 = draws.iter().sum();
        for (&i, d) in block.iter().zip(draws) {
            point[i] = if total > 0.0 { d / total } else { 1.0 / block.len() as f64 };
        }
    }
    point
}

// ============================================================================
// Normal form
// ============================================================================

/// Liapunov minimization over mixed profiles of the support.
#[derive(Debug, Clone, Default)]
pub struct NfgLiap {
    params: LiapParams,
}

impl NfgLiap {
    /// Create the method.
    pub fn new(params: LiapParams) -> Self {
        Self { params }
    }
}

impl NormalFormMethod for NfgLiap {
    fn name(&self) -> &'static str {
        "nfg_liap"
    }

    fn solve(&mut self, nfg: &NormalForm, support: &Support) -> MethodOutput<MixedProfile> {
        let mut work = WorkCounters::default();
        let mut rng = self.params.rng();

        let mut offsets = Vec::with_capacity(nfg.num_players());
        let mut len = 0;
        for pl in 0..nfg.num_players() {
            offsets.push(len);
            len += nfg.num_strategies(pl);
        }
        let blocks: Vec<Vec<usize>> = (0..nfg.num_players())
            .map(|pl| support.active(pl).into_iter().map(|s| offsets[pl] + s).collect())
            .collect();
        let unflatten = |flat: &[f64]| {
            MixedProfile::from_vectors(
                (0..nfg.num_players())
                    .map(|pl| flat[offsets[pl]..offsets[pl] + nfg.num_strategies(pl)].to_vec())
                    .collect(),
            )
        };

        let mut found = Vec::new();
        for trial in 0..self.params.trials {
            let start = if trial == 0 {
                let centroid = MixedProfile::uniform_on(nfg, support);
                (0..nfg.num_players())
                    .flat_map(|pl| centroid.probs(pl).to_vec())
                    .collect()
            } else {
                random_start(len, &blocks, &mut rng)
            };
            let (point, value) = descend(
                start,
                &blocks,
                self.params.max_iterations,
                self.params.tolerance,
                &mut work,
                |flat| unflatten(flat).liap_value(nfg, support),
            );
            trace!("nfg_liap trial {} ended at value {:e}", trial, value);
            if value <= self.params.tolerance {
                found.push(unflatten(&point));
            }
        }

        let profiles = dedup_by(found, 1e-4, |p, q| p.max_difference(q));
        debug!("nfg_liap found {} profiles", profiles.len());
        MethodOutput { profiles, work }
    }
}

// ============================================================================
// Extensive form
// ============================================================================

/// Liapunov minimization over behavior profiles of the tree.
#[derive(Debug, Clone, Default)]
pub struct EfgLiap {
    params: LiapParams,
}

impl EfgLiap {
    /// Create the method.
    pub fn new(params: LiapParams) -> Self {
        Self { params }
    }
}

impl ExtensiveFormMethod for EfgLiap {
    fn name(&self) -> &'static str {
        "efg_liap"
    }

    fn solve(&mut self, tree: &GameTree) -> MethodOutput<BehaviorProfile> {
        let mut work = WorkCounters::default();
        let mut rng = self.params.rng();
        let template = match BehaviorProfile::uniform(tree) {
            Ok(profile) => profile,
            Err(e) => {
                debug!("efg_liap cannot build a profile: {}", e);
                return MethodOutput::empty(work);
            }
        };
        let blocks: Vec<Vec<usize>> = template.blocks().into_iter().map(|r| r.collect()).collect();
        let len = template.as_flat().len();

        let mut scratch = template.clone();
        let mut found = Vec::new();
        for trial in 0..self.params.trials {
            let start = if trial == 0 {
                template.as_flat()
            } else {
                random_start(len, &blocks, &mut rng)
            };
            let (point, value) = descend(
                start,
                &blocks,
                self.params.max_iterations,
                self.params.tolerance,
                &mut work,
                |flat| {
                    scratch.set_flat(flat);
                    scratch.liap_value(tree).unwrap_or(f64::INFINITY)
                },
            );
            trace!("efg_liap trial {} ended at value {:e}", trial, value);
            if value <= self.params.tolerance {
                let mut profile = template.clone();
                profile.set_flat(&point);
                found.push(profile);
            }
        }

        let profiles = dedup_by(found, 1e-4, |p, q| p.max_difference(q));
        debug!("efg_liap found {} profiles", profiles.len());
        MethodOutput { profiles, work }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::efg::PlayerId;
    use crate::games;

    fn seeded() -> LiapParams {
        LiapParams::default().with_seed(7)
    }

    #[test]
    fn test_nfg_pennies_from_centroid() {
        let nfg = NormalForm::bimatrix(
            &[vec![1.0, -1.0], vec![-1.0, 1.0]],
            &[vec![-1.0, 1.0], vec![1.0, -1.0]],
        );
        let params = LiapParams {
            trials: 1,
            ..seeded()
        };
        let out = NfgLiap::new(params).solve(&nfg, &Support::full(&nfg));

        assert_eq!(out.profiles.len(), 1);
        assert!((out.profiles[0].probs(0)[0] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_nfg_prisoners_dilemma_descends_to_defection() {
        let nfg = NormalForm::bimatrix(
            &[vec![3.0, 0.0], vec![5.0, 1.0]],
            &[vec![3.0, 5.0], vec![0.0, 1.0]],
        );
        let out = NfgLiap::new(seeded()).solve(&nfg, &Support::full(&nfg));

        assert_eq!(out.profiles.len(), 1);
        assert!(out.profiles[0].probs(0)[1] > 0.999);
        assert!(out.profiles[0].probs(1)[1] > 0.999);
        assert!(out.work.evaluations > 0);
    }

    #[test]
    fn test_efg_pennies_from_centroid() {
        let tree = games::matching_pennies().unwrap();
        let params = LiapParams {
            trials: 1,
            ..seeded()
        };
        let out = EfgLiap::new(params).solve(&tree);

        assert_eq!(out.profiles.len(), 1);
        assert_eq!(out.profiles[0].infoset_probs(PlayerId(1), 0), &[0.5, 0.5]);
    }

    #[test]
    fn test_seeded_runs_repeat() {
        let tree = games::prisoners_dilemma().unwrap();
        let first = EfgLiap::new(seeded()).solve(&tree);
        let second = EfgLiap::new(seeded()).solve(&tree);

        assert_eq!(first.profiles.len(), second.profiles.len());
        assert_eq!(first.work, second.work);
    }

    #[test]
    fn test_validate() {
        assert!(LiapParams::default().validate().is_ok());
        let bad = LiapParams {
            trials: 0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
