//! Error types for the postsolve entry points.

use thiserror::Error;

/// Errors reported by [`crate::PostsolveStack::undo`] and
/// [`crate::PostsolveStack::undo_until`].
///
/// A shape mismatch means the supplied reduced solution does not belong to
/// the current reduced problem, for example a solution saved at a different
/// checkpoint. The solution and basis are left untouched in that case.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostsolveError {
    /// Solution column count differs from the reduced problem
    #[error("solution has {got} column values but the reduced problem has {expected} columns")]
    ColumnCountMismatch {
        /// Current reduced column count
        expected: usize,
        /// Length of the supplied `col_value`
        got: usize,
    },

    /// Solution row count differs from the reduced problem
    #[error("solution has {got} row values but the reduced problem has {expected} rows")]
    RowCountMismatch {
        /// Current reduced row count
        expected: usize,
        /// Length of the supplied `row_value`
        got: usize,
    },
}
