//! Hooks into a decomposition run.
//!
//! Every hook has a no-op default, so an observer only overrides what it
//! needs. The engine and the normal-form adapters call them at fixed points:
//!
//! | Hook | Called |
//! |------|--------|
//! | [`view_subgame`](SolveObserver::view_subgame) | after each subgame view is built |
//! | [`view_normal`](SolveObserver::view_normal) | after each normal-form reduction |
//! | [`select_solutions`](SolveObserver::select_solutions) | on the backend's profiles, before they are used |

use log::trace;

use crate::efg::{GameTree, NodeId};
use crate::nfg::{NormalForm, Support};
use crate::profile::BehaviorProfile;

/// Observer of a decomposition run.
pub trait SolveObserver {
    /// A view of the subgame at `node` is about to be solved.
    fn view_subgame(&mut self, _node: NodeId, _view: &GameTree) {}

    /// A subgame was reduced to `nfg`; strategies removed from `support`
    /// are ignored by the method.
    fn view_normal(&mut self, _nfg: &NormalForm, _support: &mut Support) {}

    /// Filter or reorder the profiles the backend returned for `node`.
    ///
    /// Leaving the list empty makes the subgame unsolved.
    fn select_solutions(
        &mut self,
        _node: NodeId,
        _view: &GameTree,
        _profiles: &mut Vec<BehaviorProfile>,
    ) {
    }
}

/// Observer that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl SolveObserver for NoopObserver {}

/// Removes strictly dominated strategies before each normal-form method runs.
#[derive(Debug, Clone, Default)]
pub struct DominanceObserver {
    removed: usize,
}

impl DominanceObserver {
    /// Create the observer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Strategies removed so far.
    pub fn removed(&self) -> usize {
        self.removed
    }
}

impl SolveObserver for DominanceObserver {
    fn view_normal(&mut self, nfg: &NormalForm, support: &mut Support) {
        let removed = support.eliminate_dominated(nfg);
        trace!("removed {} dominated strategies", removed);
        self.removed += removed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dominance_observer_prunes_support() {
        let nfg = NormalForm::bimatrix(
            &[vec![3.0, 0.0], vec![5.0, 1.0]],
            &[vec![3.0, 5.0], vec![0.0, 1.0]],
        );
        let mut support = Support::full(&nfg);
        let mut observer = DominanceObserver::new();

        observer.view_normal(&nfg, &mut support);

        assert_eq!(observer.removed(), 2);
        assert_eq!(support.active(0), vec![1]);
        assert_eq!(support.active(1), vec![1]);
    }

    #[test]
    fn test_noop_observer_leaves_everything() {
        let nfg = NormalForm::bimatrix(&[vec![1.0, 0.0]], &[vec![0.0, 1.0]]);
        let mut support = Support::full(&nfg);
        NoopObserver.view_normal(&nfg, &mut support);
        assert_eq!(support.num_active(1), 2);
    }
}
