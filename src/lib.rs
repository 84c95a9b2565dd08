//! # Subgame Solver
//!
//! Nash equilibria of finite extensive-form games, computed by solving proper
//! subgames bottom-up and gluing their solutions together.
//!
//! ## Features
//!
//! - **Subgame Decomposition**: finds every proper subgame, solves the deepest
//!   first and replaces each solved subgame with its value
//! - **Multiple Equilibria**: combines every solution of every subgame, with
//!   an optional cap on the number of combinations
//! - **Pluggable Methods**: eight bundled methods, normal-form and
//!   extensive-form, behind one [`SubgameBackend`] trait
//! - **Observers**: hooks to inspect views, prune dominated strategies or
//!   filter solutions
//! - **JSON Everywhere**: games, run configurations and solution reports
//!
//! ## Quick Start
//!
//! ```
//! use subgame_solver::{games, PureNashBySubgame, SolverConfig, SubgameSolver};
//!
//! let tree = games::centipede(4).unwrap();
//! let mut solver =
//!     SubgameSolver::new(tree, PureNashBySubgame::default(), SolverConfig::default()).unwrap();
//!
//! // Backward induction: take at once.
//! let solutions = solver.solve().unwrap();
//! assert_eq!(solutions.len(), 1);
//! assert_eq!(solver.payoffs()[0], vec![2.0, 0.0]);
//! ```
//!
//! ## Modules
//!
//! - [`efg`]: game trees, subgame detection and the JSON game format
//! - [`profile`]: behavior and mixed strategy profiles
//! - [`nfg`]: reduced normal forms and strategy supports
//! - [`methods`]: equilibrium methods for a single game
//! - [`subgame`]: the decomposition engine, backends and solver
//! - [`games`]: sample games
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                SubgameSolver (decomposition engine)             │
//! │  - Subgame discovery      - Solution combination               │
//! │  - Index translation      - Tree collapse                      │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               │ calls SubgameBackend per subgame
//!                               ▼
//!         ┌─────────────────────┼─────────────────────┐
//!         │                     │                     │
//!         ▼                     ▼                     ▼
//!   ┌───────────┐        ┌─────────────┐       ┌─────────────┐
//!   │  Normal   │        │  Extensive  │       │   Custom    │
//!   │   form    │        │    form     │       │   backend   │
//!   │ adapters  │        │  adapters   │       │             │
//!   └───────────┘        └─────────────┘       └─────────────┘
//! ```

#![warn(missing_docs)]

/// Extensive-form game trees.
pub mod efg;

/// Sample games with known equilibria.
pub mod games;

/// Equilibrium methods for a single game.
pub mod methods;

/// Reduced normal forms.
pub mod nfg;

/// Strategy profiles.
pub mod profile;

/// Subgame decomposition.
pub mod subgame;

// Re-export commonly used types at crate root for convenience
pub use efg::{GameTree, InfosetId, NodeId, PlayerId, TreeError};
pub use profile::{BehaviorProfile, MixedProfile};
pub use subgame::{
    ConfigError, DominanceObserver, EfgLiapBySubgame, EnumBySubgame, LemkeBySubgame,
    MethodConfig, NfgLiapBySubgame, NoopObserver, PureNashBySubgame, RunConfig, SeqFormBySubgame,
    SimpdivBySubgame, SolveError, SolveObserver, SolverConfig, SubgameBackend, SubgameSolver,
    ZeroSumBySubgame,
};
