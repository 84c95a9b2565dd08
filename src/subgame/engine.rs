//! Recursive subgame decomposition.
//!
//! [`Decomposition::find_subgames`] solves the subgame rooted at a node by
//! first solving every nested subgame directly below it, combining their
//! solutions, replacing each nested subgame by a leaf carrying its value,
//! solving what remains, and finally collapsing the whole subtree into a
//! leaf. Solutions are full-game behavior profiles: each subgame fills in
//! only its own information sets, found by stable id in the layout recorded
//! when the solver was built.
//!
//! ```text
//!          node                      node              (node)
//!         /    \        solve       /    \      solve     ⇓
//!      child    x     ───────▶   [v_c]    x    ───────▶  [v]
//!      /   \            child                 residual
//!     …     …
//! ```
//!
//! If any subgame yields no profile, the call returns nothing and leaves its
//! subtree in place; callers treat that the same way and give up in turn.

use std::fmt;

use log::{debug, trace};
use rustc_hash::FxHashSet;

use crate::efg::{GameTree, InfosetId, NodeId, OutcomeId, PlayerId, TreeError};
use crate::profile::BehaviorProfile;
use crate::subgame::backend::SubgameBackend;
use crate::subgame::config::SolverConfig;
use crate::subgame::observer::SolveObserver;

/// Solutions of one subgame.
///
/// `values[i]` is the synthetic outcome holding the subgame's expected
/// payoffs under `profiles[i]`, the root's own outcome included.
#[derive(Debug, Clone, Default)]
pub struct Resolved {
    /// Full-game profiles, filled in on the subgame's information sets.
    pub profiles: Vec<BehaviorProfile>,
    /// One synthetic outcome per profile.
    pub values: Vec<OutcomeId>,
}

impl Resolved {
    /// Number of solutions.
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Whether the subgame went unsolved.
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

/// A partial profile with the value chosen for each nested subgame so far.
#[derive(Debug, Clone)]
struct Combination {
    profile: BehaviorProfile,
    slots: Vec<Option<OutcomeId>>,
}

/// Broken invariants that stop a decomposition.
///
/// An unsolved subgame is not an error; it yields an empty [`Resolved`].
#[derive(Debug, Clone, PartialEq)]
pub enum SolveError {
    /// A subgame view holds an information set the recorded layout does not
    /// assign to that player.
    UnmatchedInfoset {
        /// Player owning the information set in the view.
        player: PlayerId,
        /// The information set.
        infoset: InfosetId,
        /// Its label.
        label: String,
    },
    /// A nested subgame returned a different number of profiles and values.
    OutcomeCountMismatch {
        /// Root of the nested subgame.
        node: NodeId,
        /// Profiles returned.
        profiles: usize,
        /// Values returned.
        values: usize,
    },
    /// Decomposition was started at a node that does not root a subgame.
    NotSubgameRoot(NodeId),
    /// The tree rejected an operation.
    Tree(TreeError),
}

impl fmt::Display for SolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveError::UnmatchedInfoset {
                player,
                infoset,
                label,
            } => write!(
                f,
                "information set {} ('{}') of player {} has no match in the recorded layout",
                infoset, label, player
            ),
            SolveError::OutcomeCountMismatch {
                node,
                profiles,
                values,
            } => write!(
                f,
                "subgame at {} returned {} profiles but {} values",
                node, profiles, values
            ),
            SolveError::NotSubgameRoot(node) => write!(f, "{} does not root a subgame", node),
            SolveError::Tree(e) => write!(f, "tree error: {}", e),
        }
    }
}

impl std::error::Error for SolveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SolveError::Tree(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TreeError> for SolveError {
    fn from(e: TreeError) -> Self {
        SolveError::Tree(e)
    }
}

/// One decomposition pass over a tree.
///
/// Borrows everything it needs from the solver for the duration of a solve.
pub struct Decomposition<'a, B: SubgameBackend + ?Sized> {
    tree: &'a mut GameTree,
    backend: &'a mut B,
    observer: &'a mut dyn SolveObserver,
    base: &'a BehaviorProfile,
    config: &'a SolverConfig,
    subgames_solved: usize,
    backend_calls: usize,
}

impl<'a, B: SubgameBackend + ?Sized> Decomposition<'a, B> {
    /// Prepare a pass.
    ///
    /// `base` fixes the full-game layout; it is normally a zero profile of the
    /// tree taken before anything was collapsed.
    pub fn new(
        tree: &'a mut GameTree,
        backend: &'a mut B,
        observer: &'a mut dyn SolveObserver,
        base: &'a BehaviorProfile,
        config: &'a SolverConfig,
    ) -> Self {
        Self {
            tree,
            backend,
            observer,
            base,
            config,
            subgames_solved: 0,
            backend_calls: 0,
        }
    }

    /// Subgames resolved and collapsed so far.
    pub fn subgames_solved(&self) -> usize {
        self.subgames_solved
    }

    /// Backend calls made so far.
    pub fn backend_calls(&self) -> usize {
        self.backend_calls
    }

    /// Solve the subgame rooted at `node` and collapse it.
    ///
    /// On success the subtree below `node` is gone and `node` is a leaf
    /// keeping its own outcome. When some subgame has no solution the result
    /// is empty and the subtree of `node` is left in place, although nested
    /// subgames solved before the failure stay collapsed.
    pub fn find_subgames(&mut self, node: NodeId) -> Result<Resolved, SolveError> {
        let roots = self.tree.subgame_roots()?;
        if !roots.contains(&node) {
            return Err(SolveError::NotSubgameRoot(node));
        }
        self.resolve(node, &roots)
    }

    fn resolve(&mut self, node: NodeId, roots: &FxHashSet<NodeId>) -> Result<Resolved, SolveError> {
        let children = self.tree.child_subgames(node, roots)?;
        let cap = self.config.max_solutions;

        let mut running = vec![Combination {
            profile: self.base.clone(),
            slots: vec![None; children.len()],
        }];
        running[0].profile.reset();

        for (slot, &child) in children.iter().enumerate() {
            let solved = self.resolve(child, roots)?;
            if solved.profiles.len() != solved.values.len() {
                return Err(SolveError::OutcomeCountMismatch {
                    node: child,
                    profiles: solved.profiles.len(),
                    values: solved.values.len(),
                });
            }
            if solved.is_empty() {
                debug!("subgame at {} unsolved below {}", child, node);
                return Ok(Resolved::default());
            }

            let mut combined = Vec::with_capacity(running.len() * solved.len());
            'combine: for partial in &running {
                for (profile, &value) in solved.profiles.iter().zip(&solved.values) {
                    if self.config.is_full(combined.len()) {
                        trace!("combination cap {} reached at {}", cap, child);
                        break 'combine;
                    }
                    let mut merged = partial.clone();
                    merged.profile.merge(profile);
                    merged.slots[slot] = Some(value);
                    combined.push(merged);
                }
            }
            trace!("{} combinations after subgame at {}", combined.len(), child);
            running = combined;
        }

        let own = match self.tree.node(node)?.outcome() {
            Some(outcome) => Some(self.tree.outcome(outcome)?.payoffs().to_vec()),
            None => None,
        };

        let mut resolved = Resolved::default();
        'assemble: for partial in &running {
            for (&child, &value) in children.iter().zip(&partial.slots) {
                self.tree.set_outcome(child, value)?;
            }

            let view = self.tree.subgame_view(node)?;
            self.observer.view_subgame(node, &view);
            let mut local = self.backend.solve_subgame(&view, &mut *self.observer);
            self.backend_calls += 1;
            self.observer.select_solutions(node, &view, &mut local);
            if local.is_empty() {
                debug!("{} found no solution at {}", self.backend.name(), node);
                return Ok(Resolved::default());
            }

            for profile in &local {
                if self.config.is_full(resolved.len()) {
                    break 'assemble;
                }
                let mut full = partial.profile.clone();
                self.translate(&view, profile, &mut full)?;

                let mut payoffs = profile.payoffs(&view)?;
                if let Some(own) = &own {
                    for (p, extra) in payoffs.iter_mut().zip(own) {
                        *p += extra;
                    }
                }
                let value = self.tree.new_outcome(payoffs)?;
                resolved.profiles.push(full);
                resolved.values.push(value);
            }
        }

        self.tree.delete_tree(node)?;
        self.subgames_solved += 1;
        debug!(
            "subgame at {} resolved: {} solutions from {} nested subgames",
            node,
            resolved.len(),
            children.len()
        );
        Ok(resolved)
    }

    /// Copy a view-local profile into a full-game profile.
    ///
    /// Information sets are matched by id. Players with no information set in
    /// the view contribute nothing.
    fn translate(
        &self,
        view: &GameTree,
        local: &BehaviorProfile,
        full: &mut BehaviorProfile,
    ) -> Result<(), SolveError> {
        for (pl, player) in view.players().iter().enumerate() {
            let owner = PlayerId(pl);
            for &id in player.infosets() {
                let unmatched = || SolveError::UnmatchedInfoset {
                    player: owner,
                    infoset: id,
                    label: view.infoset(id).map(|i| i.label().to_string()).unwrap_or_default(),
                };
                match self.base.locate(id) {
                    Some((recorded, _)) if recorded == owner => {}
                    _ => return Err(unmatched()),
                }
                let (Some(source), Some(target)) = (local.probs(id), full.probs_mut(id)) else {
                    return Err(unmatched());
                };
                target.copy_from_slice(source);
                trace!("{} -> {:?}", id, source);
            }
        }
        Ok(())
    }
}
