//! Equilibrium-finding methods.
//!
//! Every method works on a single game and knows nothing about subgames.
//! Normal-form methods implement [`NormalFormMethod`] and see a reduced
//! strategic form plus a support; extensive-form methods implement
//! [`ExtensiveFormMethod`] and see the tree directly.
//!
//! | Method | Form | Players |
//! |--------|------|---------|
//! | [`PureNash`] | normal | any |
//! | [`EnumMixed`] | normal | 2 |
//! | [`Lemke`] | normal | 2 |
//! | [`NfgLiap`] | normal | any |
//! | [`Simpdiv`] | normal | any |
//! | [`ZeroSum`] | normal | 2, constant sum |
//! | [`EfgLiap`] | extensive | any |
//! | [`SeqForm`] | extensive | 2 |

use serde::{Deserialize, Serialize};
use std::ops::AddAssign;

use crate::efg::GameTree;
use crate::nfg::{NormalForm, Support};
use crate::profile::{BehaviorProfile, MixedProfile};

mod enumerate;
mod lcp;
mod lemke;
mod liap;
mod linalg;
mod pure;
mod seqform;
mod simpdiv;
mod zerosum;

pub use enumerate::{EnumMixed, EnumParams};
pub use lemke::{Lemke, LemkeParams};
pub use liap::{EfgLiap, LiapParams, NfgLiap};
pub use pure::PureNash;
pub use seqform::{SeqForm, SeqFormParams};
pub use simpdiv::{Simpdiv, SimpdivParams};
pub use zerosum::{ZeroSum, ZeroSumParams};

/// Numerical work performed by a method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkCounters {
    /// Objective or payoff evaluations.
    pub evaluations: u64,
    /// Pivot steps or linear systems solved.
    pub pivots: u64,
}

impl AddAssign for WorkCounters {
    fn add_assign(&mut self, other: Self) {
        self.evaluations += other.evaluations;
        self.pivots += other.pivots;
    }
}

/// Equilibria found by one method call, with the work it took.
#[derive(Debug, Clone)]
pub struct MethodOutput<P> {
    /// Equilibrium profiles, possibly none.
    pub profiles: Vec<P>,
    /// Work performed.
    pub work: WorkCounters,
}

impl<P> MethodOutput<P> {
    /// Output with no profiles.
    pub fn empty(work: WorkCounters) -> Self {
        Self {
            profiles: Vec::new(),
            work,
        }
    }
}

/// A method that solves a game in strategic form.
pub trait NormalFormMethod {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Equilibria of `nfg` using only strategies in `support`.
    fn solve(&mut self, nfg: &NormalForm, support: &Support) -> MethodOutput<MixedProfile>;
}

/// A method that solves a game tree directly.
pub trait ExtensiveFormMethod {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Equilibria of `tree`.
    fn solve(&mut self, tree: &GameTree) -> MethodOutput<BehaviorProfile>;
}

/// Drop profiles within `tolerance` of one already kept.
pub(crate) fn dedup_by<P>(profiles: Vec<P>, tolerance: f64, distance: impl Fn(&P, &P) -> f64) -> Vec<P> {
    let mut kept: Vec<P> = Vec::with_capacity(profiles.len());
    for profile in profiles {
        if kept.iter().all(|k| distance(k, &profile) > tolerance) {
            kept.push(profile);
        }
    }
    kept
}
