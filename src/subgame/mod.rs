//! Equilibrium computation by subgame decomposition.
//!
//! ## Architecture
//!
//! ```text
//! SubgameSolver::solve()
//!     │
//!     ▼
//! Decomposition::find_subgames(node)      recursive, bottom-up
//!     │  children first: every subgame root strictly below `node`
//!     │  cross product of child solutions  (capped by SolverConfig)
//!     │  for each combination:
//!     │      child roots get their value outcome
//!     │      residual view at `node` ──► SubgameBackend::solve_subgame
//!     │      view profiles translated into the full game's coordinates
//!     ▼
//! collapse: `node` keeps a value outcome, its subtree is deleted
//! ```
//!
//! Backends wrap the methods in [`crate::methods`]: a [`NormalFormAdapter`]
//! goes through the reduced normal form, an [`ExtensiveFormAdapter`] works on
//! the tree. A [`SolveObserver`] can inspect and prune along the way.

mod adapter;
mod backend;
mod config;
mod engine;
mod observer;
mod report;
mod solver;

pub use adapter::{
    EfgLiapBySubgame, EnumBySubgame, ExtensiveFormAdapter, LemkeBySubgame, NfgLiapBySubgame,
    NormalFormAdapter, PureNashBySubgame, SeqFormBySubgame, SimpdivBySubgame, ZeroSumBySubgame,
};
pub use backend::SubgameBackend;
pub use config::{ConfigError, MethodConfig, RunConfig, SolveStats, SolverConfig};
pub use engine::{Decomposition, Resolved, SolveError};
pub use observer::{DominanceObserver, NoopObserver, SolveObserver};
pub use report::{InfosetStrategy, PlayerStrategy, SolutionEntry, SolutionReport};
pub use solver::SubgameSolver;
