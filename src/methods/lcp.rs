//! Dense pivoting tableaux and Lemke's algorithm for linear complementarity
//! problems.

use crate::methods::linalg::PIVOT_EPSILON;

/// A dictionary `basis[i] = rhs[i] - Σ rows[i][j] · x_j` in tableau form.
///
/// Columns cover every variable, basic or not; basic columns are unit
/// vectors.
#[derive(Debug, Clone)]
pub(crate) struct Tableau {
    rows: Vec<Vec<f64>>,
    rhs: Vec<f64>,
    basis: Vec<usize>,
}

impl Tableau {
    pub(crate) fn new(rows: Vec<Vec<f64>>, rhs: Vec<f64>, basis: Vec<usize>) -> Self {
        Self { rows, rhs, basis }
    }

    /// Row leaving when `col` enters, by the minimum-ratio rule.
    ///
    /// Ties go to `prefer` if it is among them, then to the smallest basic
    /// variable. `None` means the column is unbounded.
    pub(crate) fn ratio_test(&self, col: usize, prefer: Option<usize>) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, row) in self.rows.iter().enumerate() {
            let coef = row[col];
            if coef <= PIVOT_EPSILON {
                continue;
            }
            let ratio = self.rhs[i] / coef;
            best = match best {
                None => Some((i, ratio)),
                Some((_, r)) if ratio < r - PIVOT_EPSILON => Some((i, ratio)),
                Some((j, r)) if ratio <= r + PIVOT_EPSILON => {
                    let incumbent = self.basis[j];
                    let challenger = self.basis[i];
                    let wins = if prefer == Some(challenger) {
                        true
                    } else if prefer == Some(incumbent) {
                        false
                    } else {
                        challenger < incumbent
                    };
                    if wins {
                        Some((i, ratio))
                    } else {
                        Some((j, r))
                    }
                }
                keep => keep,
            };
        }
        best.map(|(i, _)| i)
    }

    /// Pivot `col` into the basis at `row`; returns the variable that left.
    pub(crate) fn pivot(&mut self, row: usize, col: usize) -> usize {
        let scale = self.rows[row][col];
        self.rows[row].iter_mut().for_each(|v| *v /= scale);
        self.rhs[row] /= scale;
        let pivot_row = self.rows[row].clone();
        let pivot_rhs = self.rhs[row];
        for (i, other) in self.rows.iter_mut().enumerate() {
            if i == row {
                continue;
            }
            let factor = other[col];
            if factor == 0.0 {
                continue;
            }
            for (v, p) in other.iter_mut().zip(&pivot_row) {
                *v -= factor * p;
            }
            self.rhs[i] -= factor * pivot_rhs;
        }
        std::mem::replace(&mut self.basis[row], col)
    }

    /// Current value of a variable; zero if nonbasic.
    pub(crate) fn value(&self, var: usize) -> f64 {
        self.basis
            .iter()
            .position(|&b| b == var)
            .map(|i| self.rhs[i])
            .unwrap_or(0.0)
    }

    /// Whether `var` is basic.
    pub(crate) fn is_basic(&self, var: usize) -> bool {
        self.basis.contains(&var)
    }

    /// Coefficient row of the tableau.
    pub(crate) fn row(&self, i: usize) -> &[f64] {
        &self.rows[i]
    }

    /// Basic variable of each row.
    pub(crate) fn basis(&self) -> &[usize] {
        &self.basis
    }
}

/// Result of running Lemke's algorithm.
#[derive(Debug, Clone)]
pub(crate) struct LcpOutcome {
    /// Solution `z`, or `None` on ray termination or pivot exhaustion.
    pub solution: Option<Vec<f64>>,
    /// Pivots performed.
    pub pivots: u64,
}

/// Solve `w = q + M z`, `w, z ≥ 0`, `w · z = 0` by Lemke's algorithm with a
/// unit covering vector.
pub(crate) fn lemke(m: &[Vec<f64>], q: &[f64], max_pivots: u64) -> LcpOutcome {
    let n = q.len();
    if q.iter().all(|&v| v >= 0.0) {
        return LcpOutcome {
            solution: Some(vec![0.0; n]),
            pivots: 0,
        };
    }

    // Variables: w = 0..n, z = n..2n, artificial z0 = 2n.
    // Row i reads w_i - Σ M_ij z_j - z0 = q_i.
    let artificial = 2 * n;
    let rows: Vec<Vec<f64>> = (0..n)
        .map(|i| {
            let mut row = vec![0.0; 2 * n + 1];
            row[i] = 1.0;
            for j in 0..n {
                row[n + j] = -m[i][j];
            }
            row[artificial] = -1.0;
            row
        })
        .collect();
    let mut tableau = Tableau::new(rows, q.to_vec(), (0..n).collect());

    let start = (0..n)
        .min_by(|&a, &b| q[a].total_cmp(&q[b]))
        .unwrap_or(0);
    let mut leaving = tableau.pivot(start, artificial);
    let mut pivots = 1;

    loop {
        if pivots >= max_pivots {
            return LcpOutcome {
                solution: None,
                pivots,
            };
        }
        let entering = if leaving < n { leaving + n } else { leaving - n };
        let Some(row) = tableau.ratio_test(entering, Some(artificial)) else {
            return LcpOutcome {
                solution: None,
                pivots,
            };
        };
        leaving = tableau.pivot(row, entering);
        pivots += 1;
        if leaving == artificial {
            let solution = (0..n).map(|j| tableau.value(n + j)).collect();
            return LcpOutcome {
                solution: Some(solution),
                pivots,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn residual(m: &[Vec<f64>], q: &[f64], z: &[f64]) -> f64 {
        let mut worst: f64 = 0.0;
        for i in 0..q.len() {
            let w: f64 = q[i] + (0..z.len()).map(|j| m[i][j] * z[j]).sum::<f64>();
            worst = worst.max(-w).max(-z[i]).max((w * z[i]).abs());
        }
        worst
    }

    #[test]
    fn test_trivial_when_q_nonnegative() {
        let out = lemke(&[vec![1.0]], &[2.0], 10);
        assert_eq!(out.solution, Some(vec![0.0]));
        assert_eq!(out.pivots, 0);
    }

    #[test]
    fn test_positive_definite_lcp() {
        let m = vec![vec![2.0, 1.0], vec![1.0, 2.0]];
        let q = vec![-5.0, -6.0];
        let out = lemke(&m, &q, 100);
        let z = out.solution.unwrap();

        // Interior solution: M z = -q.
        assert!((z[0] - 4.0 / 3.0).abs() < 1e-9);
        assert!((z[1] - 7.0 / 3.0).abs() < 1e-9);
        assert!(residual(&m, &q, &z) < 1e-9);
    }

    #[test]
    fn test_pivot_limit() {
        let m = vec![vec![2.0, 1.0], vec![1.0, 2.0]];
        let out = lemke(&m, &[-5.0, -6.0], 1);
        assert!(out.solution.is_none());
    }

    #[test]
    fn test_tableau_pivot_swaps_basis() {
        let mut tableau = Tableau::new(vec![vec![1.0, 2.0]], vec![4.0], vec![0]);
        assert_eq!(tableau.ratio_test(1, None), Some(0));
        assert_eq!(tableau.pivot(0, 1), 0);
        assert!(tableau.is_basic(1));
        assert!((tableau.value(1) - 2.0).abs() < 1e-12);
        assert_eq!(tableau.basis(), &[1]);
        assert!((tableau.row(0)[0] - 0.5).abs() < 1e-12);
    }
}
