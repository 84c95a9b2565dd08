//! Reduced normal forms.
//!
//! Normal-form methods see a subgame through its reduced strategic form:
//! - [`NormalForm`]: payoff tables, built from a tree or from matrices
//! - [`Support`]: the strategies still in play
//! - [`NormalForm::to_behavior`]: mapping mixed solutions back onto the tree

mod normal;
mod reduce;
mod support;

pub use normal::{Contingencies, NormalForm, PureStrategy};
pub use support::Support;
