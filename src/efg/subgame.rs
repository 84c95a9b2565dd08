//! Proper-subgame detection and induced subgame views.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::efg::ids::{InfosetId, NodeId, OutcomeId};
use crate::efg::tree::{GameTree, Infoset, Owner, TreeError};

impl GameTree {
    /// Every node that roots a proper subgame.
    ///
    /// A non-terminal node qualifies when each information set with a member
    /// in its subtree has all of its members in that subtree. The game root
    /// always qualifies.
    ///
    /// Runs in linear time: the subtree of a node occupies a contiguous range
    /// of the preorder, so it is enough to compare that range with the
    /// smallest and largest preorder position of any information-set member
    /// reachable below the node.
    pub fn subgame_roots(&self) -> Result<FxHashSet<NodeId>, TreeError> {
        let order = self.preorder(self.root)?;
        let position: FxHashMap<NodeId, usize> =
            order.iter().enumerate().map(|(i, &id)| (id, i)).collect();

        let mut spans: FxHashMap<InfosetId, (usize, usize)> = FxHashMap::default();
        for (i, &id) in order.iter().enumerate() {
            if let Some(infoset) = self.node(id)?.infoset {
                let span = spans.entry(infoset).or_insert((i, i));
                span.0 = span.0.min(i);
                span.1 = span.1.max(i);
            }
        }

        let len = order.len();
        let mut lo = vec![0usize; len];
        let mut hi = vec![0usize; len];
        let mut end = vec![0usize; len];
        for i in (0..len).rev() {
            let node = self.node(order[i])?;
            let (mut l, mut h) = node
                .infoset
                .and_then(|infoset| spans.get(&infoset).copied())
                .unwrap_or((i, i));
            let mut last = i;
            for child in &node.children {
                let c = position[child];
                l = l.min(lo[c]);
                h = h.max(hi[c]);
                last = last.max(end[c]);
            }
            lo[i] = l;
            hi[i] = h;
            end[i] = last;
        }

        let mut roots = FxHashSet::default();
        for (i, &id) in order.iter().enumerate() {
            let terminal = self.node(id)?.children.is_empty();
            if id == self.root || (!terminal && lo[i] >= i && hi[i] <= end[i]) {
                roots.insert(id);
            }
        }
        Ok(roots)
    }

    /// Whether `node` roots a proper subgame.
    pub fn is_subgame_root(&self, node: NodeId) -> Result<bool, TreeError> {
        self.node(node)?;
        Ok(self.subgame_roots()?.contains(&node))
    }

    /// Subgame roots directly below `node`.
    ///
    /// Descends from the node's children and stops at the first subgame root
    /// on each path, so nested subgames are not reported. Results are in
    /// preorder.
    pub fn child_subgames(
        &self,
        node: NodeId,
        roots: &FxHashSet<NodeId>,
    ) -> Result<Vec<NodeId>, TreeError> {
        let mut found = Vec::new();
        let mut stack: Vec<NodeId> = self.node(node)?.children.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if roots.contains(&id) {
                found.push(id);
                continue;
            }
            stack.extend(self.node(id)?.children.iter().rev());
        }
        Ok(found)
    }

    /// Copy the subtree rooted at `node` into a standalone game.
    ///
    /// The view keeps every player and the original [`InfosetId`]s. Each
    /// player's information sets are listed in order of first appearance in a
    /// preorder walk of the subtree. Outcomes below the root are copied; the
    /// root's own outcome is left out.
    pub fn subgame_view(&self, node: NodeId) -> Result<GameTree, TreeError> {
        let names: Vec<&str> = self.players.iter().map(|p| p.name.as_str()).collect();
        let mut view = GameTree::new(format!("{} @ {}", self.title, node), &names);
        view.next_infoset = self.next_infoset;

        let mut outcomes: FxHashMap<OutcomeId, OutcomeId> = FxHashMap::default();
        let mut stack = vec![(node, view.root)];
        while let Some((source, target)) = stack.pop() {
            let original = self.node(source)?;

            if source != node {
                if let Some(outcome) = original.outcome {
                    let copied = match outcomes.get(&outcome) {
                        Some(&copied) => copied,
                        None => {
                            let payoffs = self.outcome(outcome)?.payoffs.clone();
                            let copied = view.new_outcome(payoffs)?;
                            outcomes.insert(outcome, copied);
                            copied
                        }
                    };
                    view.set_outcome(target, Some(copied))?;
                }
            }

            let Some(id) = original.infoset else {
                continue;
            };
            if !view.infosets.contains_key(&id) {
                let iset = self.infoset(id)?;
                view.infosets.insert(
                    id,
                    Infoset {
                        members: Vec::new(),
                        ..iset.clone()
                    },
                );
                if let Owner::Player(player) = iset.owner {
                    view.players[player.index()].infosets.push(id);
                }
            }
            view.attach(target, id)?;

            let copies = view.node(target)?.children.clone();
            for pair in original.children.iter().copied().zip(copies).rev() {
                stack.push(pair);
            }
        }
        Ok(view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::efg::ids::PlayerId;
    use crate::games;

    #[test]
    fn test_two_stage_subgames() {
        let tree = games::two_stage().unwrap();
        let roots = tree.subgame_roots().unwrap();
        let root = tree.root();
        let children = tree.node(root).unwrap().children().to_vec();

        // Root and the simultaneous-move stage after "In".
        assert_eq!(roots.len(), 2);
        assert!(roots.contains(&root));
        assert!(roots.contains(&children[0]));
        assert_eq!(tree.child_subgames(root, &roots).unwrap(), vec![children[0]]);
    }

    #[test]
    fn test_kuhn_has_no_nested_subgames() {
        let tree = games::kuhn_poker().unwrap();
        let roots = tree.subgame_roots().unwrap();

        assert_eq!(roots.len(), 1);
        assert!(roots.contains(&tree.root()));
        assert!(tree.child_subgames(tree.root(), &roots).unwrap().is_empty());
    }

    #[test]
    fn test_centipede_every_decision_is_a_subgame() {
        let tree = games::centipede(4).unwrap();
        let roots = tree.subgame_roots().unwrap();
        let decisions = tree
            .preorder(tree.root())
            .unwrap()
            .into_iter()
            .filter(|&id| !tree.node(id).unwrap().is_terminal())
            .count();

        assert_eq!(decisions, 4);
        assert_eq!(roots.len(), 4);

        // Only the next stage is a direct child subgame.
        let nested = tree.child_subgames(tree.root(), &roots).unwrap();
        assert_eq!(nested.len(), 1);
    }

    #[test]
    fn test_information_set_blocks_subgame() {
        let tree = games::matching_pennies().unwrap();
        let children = tree.node(tree.root()).unwrap().children().to_vec();

        assert!(tree.is_subgame_root(tree.root()).unwrap());
        assert!(!tree.is_subgame_root(children[0]).unwrap());
        assert!(!tree.is_subgame_root(children[1]).unwrap());
    }

    #[test]
    fn test_view_keeps_infoset_ids_and_strips_root_outcome() {
        let mut tree = games::two_stage().unwrap();
        let stage = tree.node(tree.root()).unwrap().children()[0];
        let bonus = tree.new_outcome(vec![10.0, 10.0]).unwrap();
        tree.set_outcome(stage, Some(bonus)).unwrap();

        let view = tree.subgame_view(stage).unwrap();

        assert_eq!(view.num_players(), 2);
        assert_eq!(view.node(view.root()).unwrap().outcome(), None);
        assert_eq!(view.num_nodes(), 7);

        let original = tree.node(stage).unwrap().infoset().unwrap();
        let copied = view.node(view.root()).unwrap().infoset().unwrap();
        assert_eq!(original, copied);

        for player in 0..2 {
            let ids = view.player(PlayerId(player)).unwrap().infosets();
            assert_eq!(ids.len(), 1);
            assert!(tree.infoset(ids[0]).is_ok());
        }
        // The outside option's infoset belongs to the parent game only.
        assert_eq!(view.players()[0].infosets().len(), 1);
    }

    #[test]
    fn test_view_orders_infosets_by_appearance() {
        // Player 0 creates the deep information set first.
        let mut tree = GameTree::new("order", &["Alice"]);
        let root = tree.root();
        tree.append_move(root, PlayerId(0), "top", &["a", "b"]).unwrap();
        let children = tree.node(root).unwrap().children().to_vec();
        let deep = tree.append_move(children[1], PlayerId(0), "deep", &["x", "y"]).unwrap();
        let shallow = tree.append_move(children[0], PlayerId(0), "shallow", &["x", "y"]).unwrap();

        let view = tree.subgame_view(root).unwrap();
        let ids = view.player(PlayerId(0)).unwrap().infosets();

        assert_eq!(tree.player(PlayerId(0)).unwrap().infosets()[1..], [deep, shallow]);
        assert_eq!(ids[1..], [shallow, deep]);
    }
}
