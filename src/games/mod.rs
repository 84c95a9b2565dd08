//! Sample games.
//!
//! Small trees with known equilibria, used by the tests, the benches and the
//! `--demo` option of the command-line solver.
//!
//! ## Available Games
//!
//! - [`matching_pennies`], [`prisoners_dilemma`], [`battle_of_sexes`]:
//!   simultaneous 2×2 games written as trees; no nested subgames.
//! - [`two_stage`]: an outside option followed by battle of the sexes; one
//!   nested subgame.
//! - [`centipede`]: alternating take-or-pass; every decision is a subgame.
//! - [`pennies_menu`]: a choice among several matching-pennies tables, each
//!   its own subgame.
//! - [`kuhn_poker`]: three-card poker; imperfect information everywhere, so
//!   only the root is a subgame.

use crate::efg::{GameTree, NodeId, PlayerId, TreeError};

const ROW: PlayerId = PlayerId(0);
const COLUMN: PlayerId = PlayerId(1);

fn leaf(tree: &mut GameTree, node: NodeId, payoffs: &[f64]) -> Result<(), TreeError> {
    let outcome = tree.new_outcome(payoffs.to_vec())?;
    tree.set_outcome(node, Some(outcome))
}

fn children(tree: &GameTree, node: NodeId) -> Result<Vec<NodeId>, TreeError> {
    Ok(tree.node(node)?.children().to_vec())
}

/// Attach a simultaneous 2×2 stage below `node`: the row player moves, then
/// the column player moves without seeing the row choice.
fn bimatrix_stage(
    tree: &mut GameTree,
    node: NodeId,
    label: &str,
    actions: [[&str; 2]; 2],
    payoffs: [[[f64; 2]; 2]; 2],
) -> Result<(), TreeError> {
    tree.append_move(node, ROW, &format!("{} row", label), &actions[0])?;
    let rows = children(tree, node)?;
    let column = tree.append_move(rows[0], COLUMN, &format!("{} column", label), &actions[1])?;
    tree.join_infoset(rows[1], column)?;
    for (i, &row) in rows.iter().enumerate() {
        for (j, cell) in children(tree, row)?.into_iter().enumerate() {
            leaf(tree, cell, &payoffs[i][j])?;
        }
    }
    Ok(())
}

fn simultaneous(
    title: &str,
    actions: [[&str; 2]; 2],
    payoffs: [[[f64; 2]; 2]; 2],
) -> Result<GameTree, TreeError> {
    let mut tree = GameTree::new(title, &["Row", "Column"]);
    let root = tree.root();
    bimatrix_stage(&mut tree, root, title, actions, payoffs)?;
    Ok(tree)
}

/// Matching pennies: the row player wins 1 on a match, loses 1 otherwise.
pub fn matching_pennies() -> Result<GameTree, TreeError> {
    simultaneous(
        "Matching pennies",
        [["Heads", "Tails"], ["Heads", "Tails"]],
        [[[1.0, -1.0], [-1.0, 1.0]], [[-1.0, 1.0], [1.0, -1.0]]],
    )
}

/// Prisoner's dilemma with temptation 5, reward 3, punishment 1, sucker 0.
pub fn prisoners_dilemma() -> Result<GameTree, TreeError> {
    simultaneous(
        "Prisoner's dilemma",
        [["Cooperate", "Defect"], ["Cooperate", "Defect"]],
        [[[3.0, 3.0], [0.0, 5.0]], [[5.0, 0.0], [1.0, 1.0]]],
    )
}

/// Battle of the sexes: two pure equilibria and one mixed.
pub fn battle_of_sexes() -> Result<GameTree, TreeError> {
    simultaneous(
        "Battle of the sexes",
        [["Top", "Bottom"], ["Left", "Right"]],
        [[[2.0, 1.0], [0.0, 0.0]], [[0.0, 0.0], [1.0, 2.0]]],
    )
}

/// Row chooses `In` (battle of the sexes follows) or `Out` (1.5 each).
///
/// The stage after `In` is the root's only nested subgame and is the root's
/// first child.
pub fn two_stage() -> Result<GameTree, TreeError> {
    let mut tree = GameTree::new("Outside option", &["Row", "Column"]);
    let root = tree.root();
    tree.append_move(root, ROW, "entry", &["In", "Out"])?;
    let branches = children(&tree, root)?;
    bimatrix_stage(
        &mut tree,
        branches[0],
        "stage",
        [["Top", "Bottom"], ["Left", "Right"]],
        [[[2.0, 1.0], [0.0, 0.0]], [[0.0, 0.0], [1.0, 2.0]]],
    )?;
    leaf(&mut tree, branches[1], &[1.5, 1.5])?;
    Ok(tree)
}

/// Centipede with `stages` alternating decisions, row first.
///
/// Taking at stage `k` pays the mover `k + 2` and the other player `k`;
/// passing at the last stage pays the last mover `stages` and the other
/// `stages + 2`. Taking immediately is the unique subgame-perfect outcome.
pub fn centipede(stages: usize) -> Result<GameTree, TreeError> {
    let mut tree = GameTree::new(format!("Centipede ({} stages)", stages), &["Row", "Column"]);
    let mut node = tree.root();
    for k in 0..stages {
        let mover = k % 2;
        tree.append_move(node, PlayerId(mover), &format!("stage {}", k + 1), &["Take", "Pass"])?;
        let next = children(&tree, node)?;
        let mut take = [k as f64; 2];
        take[mover] = k as f64 + 2.0;
        leaf(&mut tree, next[0], &take)?;
        node = next[1];
    }
    if stages > 0 {
        let last = (stages - 1) % 2;
        let mut pass = [stages as f64 + 2.0; 2];
        pass[last] = stages as f64;
        leaf(&mut tree, node, &pass)?;
    }
    Ok(tree)
}

/// Row picks one of `tables` matching-pennies tables; table `i` is played
/// for stakes `i + 1`. Every table is a nested subgame of the root.
pub fn pennies_menu(tables: usize) -> Result<GameTree, TreeError> {
    let mut tree = GameTree::new(format!("Pennies menu ({} tables)", tables), &["Row", "Column"]);
    let root = tree.root();
    let names: Vec<String> = (1..=tables).map(|i| format!("Table {}", i)).collect();
    let labels: Vec<&str> = names.iter().map(String::as_str).collect();
    tree.append_move(root, ROW, "menu", &labels)?;
    for (i, table) in children(&tree, root)?.into_iter().enumerate() {
        let stake = i as f64 + 1.0;
        bimatrix_stage(
            &mut tree,
            table,
            &names[i],
            [["Heads", "Tails"], ["Heads", "Tails"]],
            [[[stake, -stake], [-stake, stake]], [[-stake, stake], [stake, -stake]]],
        )?;
    }
    Ok(tree)
}

/// Kuhn poker: three cards, one-chip ante, one-chip bet.
///
/// Chance deals one of six ordered card pairs uniformly. Row checks or bets;
/// after a check Column checks or bets and Row may then fold or call; after a
/// bet Column folds or calls. Each player has six information sets.
pub fn kuhn_poker() -> Result<GameTree, TreeError> {
    const CARDS: [&str; 3] = ["J", "Q", "K"];
    let mut tree = GameTree::new("Kuhn poker", &["Row", "Column"]);
    let root = tree.root();

    let deals: Vec<(usize, usize)> = (0..3)
        .flat_map(|a| (0..3).filter(move |&b| b != a).map(move |b| (a, b)))
        .collect();
    let names: Vec<String> = deals
        .iter()
        .map(|&(a, b)| format!("{}{}", CARDS[a], CARDS[b]))
        .collect();
    let actions: Vec<(&str, f64)> = names.iter().map(|n| (n.as_str(), 1.0 / 6.0)).collect();
    tree.append_chance(root, "deal", &actions)?;

    let mut infosets = rustc_hash::FxHashMap::default();
    let mut decide = |tree: &mut GameTree,
                      node: NodeId,
                      player: PlayerId,
                      label: String,
                      actions: [&str; 2]|
     -> Result<Vec<NodeId>, TreeError> {
        let existing = infosets.get(&label).copied();
        match existing {
            Some(id) => tree.join_infoset(node, id)?,
            None => {
                let id = tree.append_move(node, player, &label, &actions)?;
                infosets.insert(label, id);
            }
        }
        children(tree, node)
    };

    for (&(a, b), deal) in deals.iter().zip(children(&tree, root)?) {
        let showdown = if a > b { 1.0 } else { -1.0 };
        let (row, col) = (CARDS[a], CARDS[b]);

        let opening = decide(&mut tree, deal, ROW, format!("Row {}", row), ["Check", "Bet"])?;

        let label = format!("Column {} after check", col);
        let after_check = decide(&mut tree, opening[0], COLUMN, label, ["Check", "Bet"])?;
        leaf(&mut tree, after_check[0], &[showdown, -showdown])?;
        let label = format!("Row {} facing bet", row);
        let reply = decide(&mut tree, after_check[1], ROW, label, ["Fold", "Call"])?;
        leaf(&mut tree, reply[0], &[-1.0, 1.0])?;
        leaf(&mut tree, reply[1], &[2.0 * showdown, -2.0 * showdown])?;

        let label = format!("Column {} facing bet", col);
        let after_bet = decide(&mut tree, opening[1], COLUMN, label, ["Fold", "Call"])?;
        leaf(&mut tree, after_bet[0], &[1.0, -1.0])?;
        leaf(&mut tree, after_bet[1], &[2.0 * showdown, -2.0 * showdown])?;
    }
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simultaneous_games_have_four_leaves() {
        for tree in [matching_pennies(), prisoners_dilemma(), battle_of_sexes()] {
            let tree = tree.unwrap();
            let leaves = tree
                .preorder(tree.root())
                .unwrap()
                .into_iter()
                .filter(|&id| tree.node(id).unwrap().is_terminal())
                .count();
            assert_eq!(leaves, 4);
            assert_eq!(tree.players()[1].infosets().len(), 1);
        }
    }

    #[test]
    fn test_centipede_payoffs() {
        let tree = centipede(3).unwrap();
        let root = tree.root();
        let take = tree.node(root).unwrap().children()[0];
        let outcome = tree.node(take).unwrap().outcome().unwrap();
        assert_eq!(tree.outcome(outcome).unwrap().payoffs(), &[2.0, 0.0]);
        assert_eq!(tree.players()[0].infosets().len(), 2);
        assert_eq!(tree.players()[1].infosets().len(), 1);
    }

    #[test]
    fn test_pennies_menu_tables_are_subgames() {
        let tree = pennies_menu(3).unwrap();
        let roots = tree.subgame_roots().unwrap();
        let nested = tree.child_subgames(tree.root(), &roots).unwrap();

        assert_eq!(nested.len(), 3);
        assert_eq!(tree.players()[1].infosets().len(), 3);
    }

    #[test]
    fn test_kuhn_shape() {
        let tree = kuhn_poker().unwrap();
        assert_eq!(tree.players()[0].infosets().len(), 6);
        assert_eq!(tree.players()[1].infosets().len(), 6);
        assert_eq!(tree.node(tree.root()).unwrap().children().len(), 6);
        // Root, six deals, eight betting nodes per deal.
        assert_eq!(tree.num_nodes(), 55);
    }

    #[test]
    fn test_kuhn_infosets_span_two_deals() {
        let tree = kuhn_poker().unwrap();
        // A card is dealt against either of the other two, and the holder
        // cannot tell which.
        for player in tree.players() {
            for &id in player.infosets() {
                let infoset = tree.infoset(id).unwrap();
                assert_eq!(infoset.members().len(), 2, "{}", infoset.label());
            }
        }
    }
}
