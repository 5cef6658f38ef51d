//! Solution and basis containers mutated in place by postsolve.

use crate::linalg::sparse::{self, SparseCsc};

/// Basis status of a column or row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasisStatus {
    /// In the simplex basis
    Basic,
    /// Nonbasic at the lower bound
    Lower,
    /// Nonbasic at the upper bound
    Upper,
    /// Nonbasic at zero (free variable)
    Zero,
    /// Nonbasic without a distinguished bound, e.g. a removed fixed column
    Nonbasic,
}

/// Primal and dual solution values, indexed by column and row.
///
/// The dual vectors may be left empty for a primal-only postsolve. When
/// duals are supplied they must be sized to the same (reduced) problem as
/// the value vectors; the engine detects dual mode by comparing `col_dual`
/// and `col_value` lengths.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Solution {
    /// Primal column values
    pub col_value: Vec<f64>,
    /// Row activities
    pub row_value: Vec<f64>,
    /// Column reduced costs (empty for primal-only postsolve)
    pub col_dual: Vec<f64>,
    /// Row dual multipliers (empty for primal-only postsolve)
    pub row_dual: Vec<f64>,
}

/// Basis statuses for columns and rows.
///
/// Both vectors may be empty when no basis is tracked; otherwise they must
/// be sized to the same problem as the solution they accompany.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Basis {
    /// Column statuses
    pub col_status: Vec<BasisStatus>,
    /// Row statuses
    pub row_status: Vec<BasisStatus>,
}

impl Solution {
    /// Recomputes `row_value = A * col_value` against the original matrix.
    ///
    /// Redundant rows are replayed without their coefficients, so their
    /// activities come back as placeholder zeros; callers that need exact
    /// activities run this once after
    /// [`undo`](crate::PostsolveStack::undo).
    pub fn recompute_row_values(&mut self, a: &SparseCsc) {
        self.row_value.resize(a.rows(), 0.0);
        sparse::spmv(a, &self.col_value, &mut self.row_value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::sparse::from_triplets;

    #[test]
    fn recompute_row_values_overwrites_placeholders() {
        // A = [[2, 0], [1, 3]]
        let a = from_triplets(2, 2, vec![(0, 0, 2.0), (1, 0, 1.0), (1, 1, 3.0)]);
        let mut solution = Solution {
            col_value: vec![1.0, 2.0],
            row_value: vec![0.0, 0.0],
            ..Default::default()
        };
        solution.recompute_row_values(&a);
        assert_eq!(solution.row_value, vec![2.0, 7.0]);
    }
}
