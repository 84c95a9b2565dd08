//! Backends built from the bundled equilibrium methods.
//!
//! A normal-form adapter reduces each subgame view, offers the reduction to
//! the observer, runs its method on the surviving support and converts every
//! mixed profile back to behavior strategies on the view. An extensive-form
//! adapter hands the view to its method unchanged.

use log::{debug, warn};

use crate::efg::GameTree;
use crate::methods::{
    EfgLiap, EnumMixed, ExtensiveFormMethod, Lemke, NfgLiap, NormalFormMethod, PureNash, SeqForm,
    Simpdiv, WorkCounters, ZeroSum,
};
use crate::nfg::{NormalForm, Support};
use crate::profile::BehaviorProfile;
use crate::subgame::backend::SubgameBackend;
use crate::subgame::observer::SolveObserver;

/// Solves subgames through their reduced normal form.
#[derive(Debug, Clone, Default)]
pub struct NormalFormAdapter<M> {
    method: M,
    work: WorkCounters,
}

impl<M: NormalFormMethod> NormalFormAdapter<M> {
    /// Wrap a normal-form method.
    pub fn new(method: M) -> Self {
        Self {
            method,
            work: WorkCounters::default(),
        }
    }

    /// The wrapped method.
    pub fn method(&self) -> &M {
        &self.method
    }
}

impl<M: NormalFormMethod> SubgameBackend for NormalFormAdapter<M> {
    fn name(&self) -> &str {
        self.method.name()
    }

    fn solve_subgame(
        &mut self,
        view: &GameTree,
        observer: &mut dyn SolveObserver,
    ) -> Vec<BehaviorProfile> {
        let nfg = match NormalForm::reduce(view) {
            Ok(nfg) => nfg,
            Err(e) => {
                warn!("{}: cannot reduce '{}': {}", self.method.name(), view.title(), e);
                return Vec::new();
            }
        };
        let mut support = Support::full(&nfg);
        observer.view_normal(&nfg, &mut support);

        let output = self.method.solve(&nfg, &support);
        self.work += output.work;
        debug!(
            "{}: {} profiles on a {:?} normal form",
            self.method.name(),
            output.profiles.len(),
            nfg.shape()
        );

        output
            .profiles
            .iter()
            .filter_map(|mixed| match nfg.to_behavior(view, mixed) {
                Ok(profile) => Some(profile),
                Err(e) => {
                    warn!("{}: dropped a profile: {}", self.method.name(), e);
                    None
                }
            })
            .collect()
    }

    fn counters(&self) -> WorkCounters {
        self.work
    }
}

/// Solves subgames directly on the tree.
#[derive(Debug, Clone, Default)]
pub struct ExtensiveFormAdapter<M> {
    method: M,
    work: WorkCounters,
}

impl<M: ExtensiveFormMethod> ExtensiveFormAdapter<M> {
    /// Wrap an extensive-form method.
    pub fn new(method: M) -> Self {
        Self {
            method,
            work: WorkCounters::default(),
        }
    }

    /// The wrapped method.
    pub fn method(&self) -> &M {
        &self.method
    }
}

impl<M: ExtensiveFormMethod> SubgameBackend for ExtensiveFormAdapter<M> {
    fn name(&self) -> &str {
        self.method.name()
    }

    fn solve_subgame(
        &mut self,
        view: &GameTree,
        _observer: &mut dyn SolveObserver,
    ) -> Vec<BehaviorProfile> {
        let output = self.method.solve(view);
        self.work += output.work;
        debug!("{}: {} profiles", self.method.name(), output.profiles.len());
        output.profiles
    }

    fn counters(&self) -> WorkCounters {
        self.work
    }
}

/// Liapunov minimization on each subgame tree.
pub type EfgLiapBySubgame = ExtensiveFormAdapter<EfgLiap>;
/// Liapunov minimization on each subgame's reduced normal form.
pub type NfgLiapBySubgame = NormalFormAdapter<NfgLiap>;
/// Lemke–Howson on each subgame's reduced normal form.
pub type LemkeBySubgame = NormalFormAdapter<Lemke>;
/// Sequence-form pivoting on each subgame tree.
pub type SeqFormBySubgame = ExtensiveFormAdapter<SeqForm>;
/// Grid refinement on each subgame's reduced normal form.
pub type SimpdivBySubgame = NormalFormAdapter<Simpdiv>;
/// Support enumeration on each subgame's reduced normal form.
pub type EnumBySubgame = NormalFormAdapter<EnumMixed>;
/// Pure equilibria of each subgame's reduced normal form.
pub type PureNashBySubgame = NormalFormAdapter<PureNash>;
/// Minimax on each constant-sum subgame's reduced normal form.
pub type ZeroSumBySubgame = NormalFormAdapter<ZeroSum>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::efg::PlayerId;
    use crate::games;
    use crate::subgame::observer::{DominanceObserver, NoopObserver};

    /// Counts hook calls and checks the support it is handed.
    #[derive(Default)]
    struct Recorder {
        normal_forms: usize,
        strategies: Vec<usize>,
    }

    impl SolveObserver for Recorder {
        fn view_normal(&mut self, nfg: &NormalForm, support: &mut Support) {
            self.normal_forms += 1;
            self.strategies = (0..nfg.num_players()).map(|pl| support.num_active(pl)).collect();
        }
    }

    #[test]
    fn test_normal_form_adapter_calls_view_normal() {
        let tree = games::battle_of_sexes().unwrap();
        let mut backend = EnumBySubgame::default();
        let mut recorder = Recorder::default();

        let profiles = backend.solve_subgame(&tree, &mut recorder);

        assert_eq!(recorder.normal_forms, 1);
        assert_eq!(recorder.strategies, vec![2, 2]);
        assert_eq!(profiles.len(), 3);
        for profile in &profiles {
            assert!(profile.liap_value(&tree).unwrap() < 1e-9);
        }
        assert!(backend.counters().pivots > 0);
    }

    #[test]
    fn test_view_normal_can_shrink_support() {
        let tree = games::prisoners_dilemma().unwrap();
        let mut backend = PureNashBySubgame::default();
        let profiles = backend.solve_subgame(&tree, &mut DominanceObserver::new());

        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].infoset_probs(PlayerId(0), 0), &[0.0, 1.0]);
        assert_eq!(profiles[0].infoset_probs(PlayerId(1), 0), &[0.0, 1.0]);
    }

    #[test]
    fn test_extensive_form_adapter_skips_view_normal() {
        let tree = games::matching_pennies().unwrap();
        let mut backend = EfgLiapBySubgame::new(EfgLiap::new(
            crate::methods::LiapParams {
                trials: 1,
                ..Default::default()
            }
            .with_seed(3),
        ));
        let mut recorder = Recorder::default();

        let profiles = backend.solve_subgame(&tree, &mut recorder);

        assert_eq!(recorder.normal_forms, 0);
        assert_eq!(profiles.len(), 1);
        assert!(backend.counters().evaluations > 0);
    }

    #[test]
    fn test_counters_accumulate_across_calls() {
        let tree = games::matching_pennies().unwrap();
        let mut backend = LemkeBySubgame::default();
        backend.solve_subgame(&tree, &mut NoopObserver);
        let once = backend.counters();
        backend.solve_subgame(&tree, &mut NoopObserver);

        assert_eq!(backend.counters().pivots, 2 * once.pivots);
        assert_eq!(backend.name(), "lemke");
    }
}
