//! The solver façade.

use std::path::Path;
use std::time::{Duration, Instant};

use log::info;

use crate::efg::GameTree;
use crate::methods::WorkCounters;
use crate::profile::BehaviorProfile;
use crate::subgame::backend::SubgameBackend;
use crate::subgame::config::{SolveStats, SolverConfig};
use crate::subgame::engine::{Decomposition, SolveError};
use crate::subgame::observer::{NoopObserver, SolveObserver};
use crate::subgame::report::{SolutionEntry, SolutionReport};

/// Finds equilibria of a game by subgame decomposition.
///
/// The solver keeps the game as given and collapses a fresh copy on every
/// [`solve`](Self::solve), so repeated solves start from the full game.
///
/// # Example
/// ```
/// use subgame_solver::{games, EnumBySubgame, SolverConfig, SubgameSolver};
///
/// let tree = games::two_stage().unwrap();
/// let mut solver =
///     SubgameSolver::new(tree, EnumBySubgame::default(), SolverConfig::default()).unwrap();
/// let solutions = solver.solve().unwrap();
/// assert_eq!(solutions.len(), 3);
/// ```
pub struct SubgameSolver<B: SubgameBackend> {
    /// The game as given.
    game: GameTree,

    /// Working copy, collapsed as subgames are solved.
    tree: GameTree,

    /// Backend applied to every subgame.
    backend: B,

    /// Decomposition settings.
    config: SolverConfig,

    /// Hooks called during the solve.
    observer: Box<dyn SolveObserver>,

    /// Zero profile of the full game, fixing the coordinate layout.
    base: BehaviorProfile,

    /// Player names, kept for reports.
    names: Vec<String>,

    /// Title of the game.
    title: String,

    /// Solutions of the last solve.
    solutions: Vec<BehaviorProfile>,

    /// Payoffs of each solution.
    payoffs: Vec<Vec<f64>>,

    /// Statistics of the last solve.
    stats: SolveStats,
}

impl<B: SubgameBackend> SubgameSolver<B> {
    /// Create a solver for `tree`.
    ///
    /// The information sets of every player are recorded now; the
    /// decomposition matches subgame information sets against this record.
    pub fn new(tree: GameTree, backend: B, config: SolverConfig) -> Result<Self, SolveError> {
        let base = BehaviorProfile::zero(&tree)?;
        let names = tree.players().iter().map(|p| p.name().to_string()).collect();
        let title = tree.title().to_string();
        Ok(Self {
            tree: tree.clone(),
            game: tree,
            backend,
            config,
            observer: Box::new(NoopObserver),
            base,
            names,
            title,
            solutions: Vec::new(),
            payoffs: Vec::new(),
            stats: SolveStats::default(),
        })
    }

    /// Builder method: install an observer.
    pub fn with_observer(mut self, observer: impl SolveObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    /// Run the decomposition from the root of the full game.
    ///
    /// Returns every full-game equilibrium found; the list is empty when some
    /// subgame could not be solved.
    pub fn solve(&mut self) -> Result<&[BehaviorProfile], SolveError> {
        self.solutions.clear();
        self.payoffs.clear();
        self.base.reset();
        self.tree = self.game.clone();

        let start = Instant::now();
        let work_before = self.backend.counters();
        let root = self.tree.root();
        let mut engine = Decomposition::new(
            &mut self.tree,
            &mut self.backend,
            &mut *self.observer,
            &self.base,
            &self.config,
        );
        let result = engine.find_subgames(root);
        let (subgames_solved, backend_calls) = (engine.subgames_solved(), engine.backend_calls());
        let elapsed = start.elapsed();

        let resolved = result?;
        for &value in &resolved.values {
            self.payoffs.push(self.tree.outcome(value)?.payoffs().to_vec());
        }
        self.solutions = resolved.profiles;

        let after = self.backend.counters();
        self.stats = SolveStats {
            elapsed_seconds: elapsed.as_secs_f64(),
            solutions: self.solutions.len(),
            subgames_solved,
            backend_calls,
            work: WorkCounters {
                evaluations: after.evaluations - work_before.evaluations,
                pivots: after.pivots - work_before.pivots,
            },
        };
        info!(
            "{}: {} solutions of '{}' from {} subgames in {:.3}s",
            self.backend.name(),
            self.solutions.len(),
            self.title,
            subgames_solved,
            self.stats.elapsed_seconds
        );
        Ok(&self.solutions)
    }

    /// Solutions of the last solve.
    pub fn solutions(&self) -> &[BehaviorProfile] {
        &self.solutions
    }

    /// Expected payoffs of each solution.
    pub fn payoffs(&self) -> &[Vec<f64>] {
        &self.payoffs
    }

    /// Wall time of the last solve.
    pub fn elapsed(&self) -> Duration {
        Duration::from_secs_f64(self.stats.elapsed_seconds)
    }

    /// Backend work across all solves.
    pub fn counters(&self) -> WorkCounters {
        self.backend.counters()
    }

    /// Statistics of the last solve.
    pub fn stats(&self) -> &SolveStats {
        &self.stats
    }

    /// The game as given.
    pub fn game(&self) -> &GameTree {
        &self.game
    }

    /// The working tree as the last solve left it, possibly collapsed.
    pub fn tree(&self) -> &GameTree {
        &self.tree
    }

    /// Decomposition settings.
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// The backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Summary of the last solve.
    pub fn report(&self) -> SolutionReport {
        SolutionReport {
            game: self.title.clone(),
            method: self.backend.name().to_string(),
            max_solutions: self.config.max_solutions,
            stats: self.stats.clone(),
            solutions: self
                .solutions
                .iter()
                .zip(&self.payoffs)
                .map(|(profile, payoffs)| SolutionEntry::new(profile, &self.names, payoffs.clone()))
                .collect(),
        }
    }

    /// Save the summary of the last solve as JSON.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        self.report().save_json(path)
    }
}
