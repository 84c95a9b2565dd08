//! The contract between the decomposition engine and an equilibrium method.

use crate::efg::GameTree;
use crate::methods::WorkCounters;
use crate::profile::BehaviorProfile;
use crate::subgame::observer::SolveObserver;

/// Solves one subgame at a time.
///
/// `view` is a standalone tree restricted to the subgame; its information
/// sets carry the same [`InfosetId`](crate::efg::InfosetId)s as the full
/// game. Returned profiles must be built over `view`. An empty list means the
/// subgame could not be solved, which aborts the decomposition.
pub trait SubgameBackend {
    /// Short identifier used in logs and reports.
    fn name(&self) -> &str;

    /// Equilibria of the subgame `view`.
    ///
    /// Backends that reduce to normal form must call
    /// [`SolveObserver::view_normal`] right after the reduction.
    fn solve_subgame(
        &mut self,
        view: &GameTree,
        observer: &mut dyn SolveObserver,
    ) -> Vec<BehaviorProfile>;

    /// Work performed across every call so far.
    fn counters(&self) -> WorkCounters;
}

impl<B: SubgameBackend + ?Sized> SubgameBackend for Box<B> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn solve_subgame(
        &mut self,
        view: &GameTree,
        observer: &mut dyn SolveObserver,
    ) -> Vec<BehaviorProfile> {
        (**self).solve_subgame(view, observer)
    }

    fn counters(&self) -> WorkCounters {
        (**self).counters()
    }
}
