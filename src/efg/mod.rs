//! Extensive-form games.
//!
//! This module provides the mutable game tree the decomposition works on:
//! - [`GameTree`]: arena of nodes, information sets, players and outcomes
//! - Proper-subgame detection and induced subgame views
//! - A JSON game format for loading games from disk

mod format;
mod ids;
mod subgame;
mod tree;

pub use format::{GameDescription, NodeDescription};
pub use ids::{InfosetId, NodeId, OutcomeId, PlayerId};
pub use tree::{GameTree, Infoset, Node, Outcome, Owner, Player, TreeError};
