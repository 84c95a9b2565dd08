//! Strategy profiles.
//!
//! - [`BehaviorProfile`]: action probabilities per information set, the
//!   currency of the decomposition engine
//! - [`MixedProfile`]: probabilities over reduced normal-form strategies

mod behavior;
mod mixed;

pub use behavior::BehaviorProfile;
pub use mixed::MixedProfile;
