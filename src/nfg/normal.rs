//! Strategic-form payoff tables.

use crate::efg::{InfosetId, TreeError};

/// A reduced pure strategy of an extensive-form player.
///
/// One entry per information set of the player, in the tree's order. `None`
/// marks an information set the strategy's own earlier moves rule out.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PureStrategy {
    /// Chosen action per information set.
    pub choices: Vec<Option<usize>>,
}

/// A finite game in strategic form.
///
/// Contingencies are stored with player 0 varying fastest.
#[derive(Debug, Clone)]
pub struct NormalForm {
    pub(super) players: Vec<String>,
    pub(super) infosets: Vec<Vec<InfosetId>>,
    pub(super) labels: Vec<Vec<String>>,
    pub(super) strategies: Vec<Vec<PureStrategy>>,
    pub(super) shape: Vec<usize>,
    pub(super) payoffs: Vec<Vec<f64>>,
}

impl NormalForm {
    /// Build from a flat payoff table.
    ///
    /// `payoffs` holds one payoff vector per contingency, player 0 fastest.
    pub fn from_tables(
        players: Vec<String>,
        shape: Vec<usize>,
        payoffs: Vec<Vec<f64>>,
    ) -> Result<Self, TreeError> {
        let cells: usize = shape.iter().product();
        if players.len() != shape.len() || payoffs.len() != cells {
            return Err(TreeError::PayoffArity {
                expected: cells,
                actual: payoffs.len(),
            });
        }
        if let Some(bad) = payoffs.iter().find(|p| p.len() != players.len()) {
            return Err(TreeError::PayoffArity {
                expected: players.len(),
                actual: bad.len(),
            });
        }
        let labels = shape
            .iter()
            .map(|&n| (1..=n).map(|s| s.to_string()).collect())
            .collect();
        Ok(Self {
            infosets: shape.iter().map(|_| Vec::new()).collect(),
            players,
            labels,
            strategies: shape.iter().map(|_| Vec::new()).collect(),
            shape,
            payoffs,
        })
    }

    /// Two-player game from row and column payoff matrices.
    ///
    /// # Panics
    /// Panics if the matrices are empty or ragged.
    pub fn bimatrix(a: &[Vec<f64>], b: &[Vec<f64>]) -> Self {
        let rows = a.len();
        let cols = a[0].len();
        let mut payoffs = Vec::with_capacity(rows * cols);
        for j in 0..cols {
            for i in 0..rows {
                payoffs.push(vec![a[i][j], b[i][j]]);
            }
        }
        Self {
            players: vec!["Row".to_string(), "Column".to_string()],
            infosets: vec![Vec::new(), Vec::new()],
            labels: vec![
                (1..=rows).map(|s| s.to_string()).collect(),
                (1..=cols).map(|s| s.to_string()).collect(),
            ],
            strategies: vec![Vec::new(), Vec::new()],
            shape: vec![rows, cols],
            payoffs,
        }
    }

    /// Number of players.
    pub fn num_players(&self) -> usize {
        self.shape.len()
    }

    /// Player name.
    pub fn player_name(&self, player: usize) -> &str {
        &self.players[player]
    }

    /// Number of pure strategies of `player`.
    pub fn num_strategies(&self, player: usize) -> usize {
        self.shape[player]
    }

    /// Strategy counts per player.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Label of a pure strategy.
    pub fn strategy_label(&self, player: usize, strategy: usize) -> &str {
        &self.labels[player][strategy]
    }

    /// Reduced strategies of `player`; empty for games built from tables.
    pub fn strategies(&self, player: usize) -> &[PureStrategy] {
        &self.strategies[player]
    }

    /// Number of contingencies.
    pub fn num_contingencies(&self) -> usize {
        self.payoffs.len()
    }

    /// Flat index of a contingency.
    pub fn index_of(&self, contingency: &[usize]) -> usize {
        let mut index = 0;
        let mut stride = 1;
        for (&s, &n) in contingency.iter().zip(&self.shape) {
            index += s * stride;
            stride *= n;
        }
        index
    }

    /// Payoffs of every player at a contingency.
    pub fn payoffs(&self, contingency: &[usize]) -> &[f64] {
        &self.payoffs[self.index_of(contingency)]
    }

    /// Payoff of one player at a contingency.
    pub fn payoff(&self, contingency: &[usize], player: usize) -> f64 {
        self.payoffs(contingency)[player]
    }

    /// Every contingency, player 0 fastest.
    pub fn contingencies(&self) -> Contingencies<'_> {
        Contingencies {
            shape: &self.shape,
            next: if self.shape.iter().all(|&n| n > 0) {
                Some(vec![0; self.shape.len()])
            } else {
                None
            },
        }
    }

    /// Payoff matrix of `player` in a two-player game, rows indexed by
    /// player 0's strategies.
    pub fn matrix(&self, player: usize) -> Vec<Vec<f64>> {
        (0..self.shape[0])
            .map(|i| {
                (0..self.shape[1])
                    .map(|j| self.payoff(&[i, j], player))
                    .collect()
            })
            .collect()
    }

    /// The common payoff sum if every contingency sums to the same value
    /// within `tolerance`.
    pub fn constant_sum(&self, tolerance: f64) -> Option<f64> {
        let first: f64 = self.payoffs.first()?.iter().sum();
        self.payoffs
            .iter()
            .all(|p| (p.iter().sum::<f64>() - first).abs() <= tolerance)
            .then_some(first)
    }

    /// Smallest and largest payoff in the table.
    pub fn payoff_range(&self) -> (f64, f64) {
        self.payoffs
            .iter()
            .flatten()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &p| {
                (lo.min(p), hi.max(p))
            })
    }
}

/// Odometer over contingencies.
pub struct Contingencies<'a> {
    shape: &'a [usize],
    next: Option<Vec<usize>>,
}

impl Iterator for Contingencies<'_> {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        let current = self.next.take()?;
        let mut following = current.clone();
        for (digit, &n) in following.iter_mut().zip(self.shape) {
            *digit += 1;
            if *digit < n {
                self.next = Some(following);
                return Some(current);
            }
            *digit = 0;
        }
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bimatrix_layout() {
        let nfg = NormalForm::bimatrix(
            &[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]],
            &[vec![0.0; 3], vec![0.0; 3]],
        );

        assert_eq!(nfg.shape(), &[2, 3]);
        assert_eq!(nfg.payoff(&[1, 2], 0), 6.0);
        assert_eq!(nfg.payoff(&[0, 1], 0), 2.0);
        assert_eq!(nfg.matrix(0)[1], vec![4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_contingencies_odometer() {
        let nfg = NormalForm::from_tables(
            vec!["a".into(), "b".into()],
            vec![2, 2],
            vec![vec![0.0, 0.0]; 4],
        )
        .unwrap();
        let all: Vec<Vec<usize>> = nfg.contingencies().collect();

        assert_eq!(all, vec![vec![0, 0], vec![1, 0], vec![0, 1], vec![1, 1]]);
        for (i, c) in all.iter().enumerate() {
            assert_eq!(nfg.index_of(c), i);
        }
    }

    #[test]
    fn test_constant_sum() {
        let zero_sum = NormalForm::bimatrix(&[vec![1.0, -2.0]], &[vec![-1.0, 2.0]]);
        let general = NormalForm::bimatrix(&[vec![1.0, 0.0]], &[vec![1.0, 0.0]]);

        assert_eq!(zero_sum.constant_sum(1e-9), Some(0.0));
        assert_eq!(general.constant_sum(1e-9), None);
    }

    #[test]
    fn test_table_arity_checked() {
        let err = NormalForm::from_tables(vec!["a".into()], vec![2], vec![vec![0.0]]).unwrap_err();
        assert_eq!(
            err,
            TreeError::PayoffArity {
                expected: 2,
                actual: 1
            }
        );
    }
}
