//! Reduction record and postsolve engine.
//!
//! During presolve the enclosing context calls one recording operation per
//! applied reduction; the record appends a descriptor and pushes any
//! variable-length nonzero payloads onto the value stack. After the reduced
//! problem is solved, [`PostsolveStack::undo`] expands the reduced solution
//! into the original index space in place and replays the record in
//! reverse, popping payloads in the exact inverse of the push order.

pub mod reductions;

use log::{debug, trace};

use crate::datastack::DataStack;
use crate::error::PostsolveError;
use crate::solution::{Basis, BasisStatus, Solution};
use reductions::{
    DoubletonEquation, DuplicateColumn, DuplicateRow, EqualityRowAddition, FixedCol, ForcingRow,
    FreeColSubstitution, RedundantRow, SingletonRow,
};

pub use reductions::{Reduction, RowType};

/// Append-only reduction record plus the reduced-to-original index maps and
/// the replay engine.
///
/// Recording operations take reduced-space indices and translate them
/// through the maps; everything stored in the record is original-space.
/// The two scratch nonzero buffers are reused across recording and replay
/// so neither path allocates per reduction.
#[derive(Debug, Default)]
pub struct PostsolveStack {
    values: DataStack,
    reductions: Vec<Reduction>,
    orig_col_index: Vec<usize>,
    orig_row_index: Vec<usize>,
    row_values: Vec<(usize, f64)>,
    col_values: Vec<(usize, f64)>,
    orig_num_col: usize,
    orig_num_row: usize,
}

/// Compacts `map` according to `new_index`, keeping the original-space
/// target of every surviving entry. `Some(k)` moves entry `i` to reduced
/// index `k <= i`; `None` drops it.
fn compress_map(map: &mut Vec<usize>, new_index: &[Option<usize>]) {
    assert_eq!(new_index.len(), map.len());
    let kept = new_index.iter().flatten().count();
    for (i, &new) in new_index.iter().enumerate() {
        if let Some(new) = new {
            debug_assert!(new <= i, "compression must not grow indices");
            map[new] = map[i];
        }
    }
    map.truncate(kept);
}

impl PostsolveStack {
    /// Creates an empty stack; call
    /// [`initialize_index_maps`](Self::initialize_index_maps) before
    /// recording.
    pub fn new() -> Self {
        Self::default()
    }

    /// Original-space index of reduced row `row`.
    pub fn get_orig_row_index(&self, row: usize) -> usize {
        self.orig_row_index[row]
    }

    /// Original-space index of reduced column `col`.
    pub fn get_orig_col_index(&self, col: usize) -> usize {
        self.orig_col_index[col]
    }

    /// Number of recorded reductions, usable as an
    /// [`undo_until`](Self::undo_until) checkpoint.
    pub fn num_reductions(&self) -> usize {
        self.reductions.len()
    }

    /// Sets both index maps to the identity over the original dimensions.
    pub fn initialize_index_maps(&mut self, num_row: usize, num_col: usize) {
        self.orig_row_index = (0..num_row).collect();
        self.orig_col_index = (0..num_col).collect();
        self.orig_num_row = num_row;
        self.orig_num_col = num_col;
    }

    /// Compacts the index maps after rows and columns were removed.
    ///
    /// Each slice must be as long as the current reduced dimension; `None`
    /// marks a removed entry and `Some(k)` gives a survivor's new reduced
    /// index. The maps only ever shrink.
    pub fn compress_index_maps(
        &mut self,
        new_row_index: &[Option<usize>],
        new_col_index: &[Option<usize>],
    ) {
        compress_map(&mut self.orig_row_index, new_row_index);
        compress_map(&mut self.orig_col_index, new_col_index);
    }

    /// Records the elimination of free column `col` against `row`.
    ///
    /// `row_vec` and `col_vec` iterate the row's and the column's nonzeros
    /// in the reduced space at the moment of the reduction. Payload push
    /// order: row nonzeros, then column nonzeros.
    pub fn free_col_substitution<R, C>(
        &mut self,
        row: usize,
        col: usize,
        rhs: f64,
        col_cost: f64,
        row_type: RowType,
        row_vec: R,
        col_vec: C,
    ) where
        R: IntoIterator<Item = (usize, f64)>,
        C: IntoIterator<Item = (usize, f64)>,
    {
        self.row_values.clear();
        for (col_idx, val) in row_vec {
            self.row_values.push((self.orig_col_index[col_idx], val));
        }
        self.col_values.clear();
        for (row_idx, val) in col_vec {
            self.col_values.push((self.orig_row_index[row_idx], val));
        }

        self.reductions
            .push(Reduction::FreeColSubstitution(FreeColSubstitution {
                rhs,
                col_cost,
                row: self.orig_row_index[row],
                col: self.orig_col_index[col],
                row_type,
            }));
        self.values.push_nonzeros(&self.row_values);
        self.values.push_nonzeros(&self.col_values);
    }

    /// Records a doubleton equation `coef * col + coef_subst * col_subst =
    /// rhs` from which `col_subst` was substituted out.
    ///
    /// The old/new bounds are the kept column's bounds before and after the
    /// substitution folded the substituted column's bounds into it.
    /// `col_vec` iterates the substituted column's nonzeros.
    pub fn doubleton_equation<C>(
        &mut self,
        row: usize,
        col_subst: usize,
        col: usize,
        coef_subst: f64,
        coef: f64,
        rhs: f64,
        subst_lower: f64,
        subst_upper: f64,
        old_lower: f64,
        old_upper: f64,
        new_lower: f64,
        new_upper: f64,
        subst_cost: f64,
        col_vec: C,
    ) where
        C: IntoIterator<Item = (usize, f64)>,
    {
        debug_assert!(coef != 0.0 && coef_subst != 0.0);
        self.col_values.clear();
        for (row_idx, val) in col_vec {
            self.col_values.push((self.orig_row_index[row_idx], val));
        }

        self.reductions
            .push(Reduction::DoubletonEquation(DoubletonEquation {
                coef,
                coef_subst,
                rhs,
                subst_lower,
                subst_upper,
                subst_cost,
                row: self.orig_row_index[row],
                col_subst: self.orig_col_index[col_subst],
                col: self.orig_col_index[col],
                lower_tightened: new_lower > old_lower,
                upper_tightened: new_upper < old_upper,
            }));
        self.values.push_nonzeros(&self.col_values);
    }

    /// Records that `eq_row_scale` times equality row `added_eq_row` was
    /// added to `row`.
    pub fn equality_row_addition(&mut self, row: usize, added_eq_row: usize, eq_row_scale: f64) {
        debug_assert!(eq_row_scale != 0.0 && eq_row_scale.is_finite());
        self.reductions
            .push(Reduction::EqualityRowAddition(EqualityRowAddition {
                row: self.orig_row_index[row],
                added_eq_row: self.orig_row_index[added_eq_row],
                eq_row_scale,
            }));
    }

    /// Records the removal of singleton row `row` with its single nonzero
    /// `coef` on `col`; the flags say which column bounds the row's sides
    /// tightened.
    pub fn singleton_row(
        &mut self,
        row: usize,
        col: usize,
        coef: f64,
        tightened_col_lower: bool,
        tightened_col_upper: bool,
    ) {
        self.reductions.push(Reduction::SingletonRow(SingletonRow {
            coef,
            row: self.orig_row_index[row],
            col: self.orig_col_index[col],
            col_lower_tightened: tightened_col_lower,
            col_upper_tightened: tightened_col_upper,
        }));
    }

    fn fixed_col<C>(
        &mut self,
        col: usize,
        fix_value: f64,
        col_cost: f64,
        fix_type: BasisStatus,
        col_vec: C,
    ) where
        C: IntoIterator<Item = (usize, f64)>,
    {
        assert!(fix_value.is_finite(), "fixed columns need a finite value");
        self.col_values.clear();
        for (row_idx, val) in col_vec {
            self.col_values.push((self.orig_row_index[row_idx], val));
        }

        self.reductions.push(Reduction::FixedCol(FixedCol {
            fix_value,
            col_cost,
            col: self.orig_col_index[col],
            fix_type,
        }));
        self.values.push_nonzeros(&self.col_values);
    }

    /// Records column `col` fixed at its lower bound. `col_vec` iterates
    /// the column's nonzeros.
    pub fn fixed_col_at_lower<C>(&mut self, col: usize, fix_value: f64, col_cost: f64, col_vec: C)
    where
        C: IntoIterator<Item = (usize, f64)>,
    {
        self.fixed_col(col, fix_value, col_cost, BasisStatus::Lower, col_vec);
    }

    /// Records column `col` fixed at its upper bound.
    pub fn fixed_col_at_upper<C>(&mut self, col: usize, fix_value: f64, col_cost: f64, col_vec: C)
    where
        C: IntoIterator<Item = (usize, f64)>,
    {
        self.fixed_col(col, fix_value, col_cost, BasisStatus::Upper, col_vec);
    }

    /// Records the removal of a column already fixed in the input, with no
    /// distinguished bound.
    pub fn removed_fixed_col<C>(&mut self, col: usize, fix_value: f64, col_cost: f64, col_vec: C)
    where
        C: IntoIterator<Item = (usize, f64)>,
    {
        self.fixed_col(col, fix_value, col_cost, BasisStatus::Nonbasic, col_vec);
    }

    /// Records the removal of redundant row `row`.
    ///
    /// The row's coefficients are not stored; after a replay its activity
    /// is a placeholder until
    /// [`Solution::recompute_row_values`] runs.
    pub fn redundant_row(&mut self, row: usize) {
        self.reductions.push(Reduction::RedundantRow(RedundantRow {
            row: self.orig_row_index[row],
        }));
    }

    /// Records row `row` forced at `side`, which pinned every free column
    /// in it. `row_type` is the pinning direction (Geq at the lower side,
    /// Leq at the upper); the pinned columns are recorded as fixed columns
    /// after this call.
    pub fn forcing_row<R>(&mut self, row: usize, row_vec: R, side: f64, row_type: RowType)
    where
        R: IntoIterator<Item = (usize, f64)>,
    {
        self.row_values.clear();
        for (col_idx, val) in row_vec {
            self.row_values.push((self.orig_col_index[col_idx], val));
        }

        self.reductions.push(Reduction::ForcingRow(ForcingRow {
            side,
            row: self.orig_row_index[row],
            row_type,
        }));
        self.values.push_nonzeros(&self.row_values);
    }

    /// Records the removal of `row`, a `duplicate_row_scale` multiple of
    /// the surviving `duplicate_row`; the flags say which of the survivor's
    /// sides absorbed a tighter bound from the removed row.
    pub fn duplicate_row(
        &mut self,
        row: usize,
        row_upper_tightened: bool,
        row_lower_tightened: bool,
        duplicate_row: usize,
        duplicate_row_scale: f64,
    ) {
        debug_assert!(duplicate_row_scale != 0.0 && duplicate_row_scale.is_finite());
        self.reductions.push(Reduction::DuplicateRow(DuplicateRow {
            duplicate_row_scale,
            duplicate_row: self.orig_row_index[duplicate_row],
            row: self.orig_row_index[row],
            row_lower_tightened,
            row_upper_tightened,
        }));
    }

    /// Records the merge of `duplicate_col` into `col`, which afterwards
    /// stood for `col + col_scale * duplicate_col`.
    pub fn duplicate_column(
        &mut self,
        col_scale: f64,
        col_lower: f64,
        col_upper: f64,
        duplicate_col_lower: f64,
        duplicate_col_upper: f64,
        col: usize,
        duplicate_col: usize,
        col_integral: bool,
        duplicate_col_integral: bool,
    ) {
        debug_assert!(col_scale != 0.0 && col_scale.is_finite());
        self.reductions
            .push(Reduction::DuplicateColumn(DuplicateColumn {
                col_scale,
                col_lower,
                col_upper,
                duplicate_col_lower,
                duplicate_col_upper,
                col: self.orig_col_index[col],
                duplicate_col: self.orig_col_index[duplicate_col],
                col_integral,
                duplicate_col_integral,
            }));
    }

    /// Lifts `solution` and `basis` to the original index space and replays
    /// the whole record in reverse.
    ///
    /// Dual postsolve runs when `solution.col_dual` matches `col_value` in
    /// length; basis statuses are reconstructed when `basis` is sized to
    /// the reduced problem. A shape mismatch aborts before any mutation.
    pub fn undo(
        &mut self,
        solution: &mut Solution,
        basis: &mut Basis,
        feastol: f64,
    ) -> Result<(), PostsolveError> {
        self.undo_until(solution, basis, feastol, 0)
    }

    /// Replays only the records with index `>= num_reductions`, restoring
    /// the state at an earlier checkpoint (see
    /// [`num_reductions`](Self::num_reductions)). The record itself is
    /// preserved, so a later replay can start over from the top.
    pub fn undo_until(
        &mut self,
        solution: &mut Solution,
        basis: &mut Basis,
        feastol: f64,
        num_reductions: usize,
    ) -> Result<(), PostsolveError> {
        self.expand_to_original(solution, basis)?;
        self.values.reset_position();

        for i in (num_reductions..self.reductions.len()).rev() {
            let reduction = self.reductions[i];
            trace!("undo reduction {i}: {reduction:?}");
            match reduction {
                Reduction::FreeColSubstitution(reduction) => {
                    self.values.pop_nonzeros(&mut self.col_values);
                    self.values.pop_nonzeros(&mut self.row_values);
                    reduction.undo(&self.row_values, &self.col_values, solution, basis);
                }
                Reduction::DoubletonEquation(reduction) => {
                    self.values.pop_nonzeros(&mut self.col_values);
                    reduction.undo(&self.col_values, solution, basis);
                }
                Reduction::EqualityRowAddition(reduction) => reduction.undo(solution, basis),
                Reduction::SingletonRow(reduction) => reduction.undo(solution, basis),
                Reduction::FixedCol(reduction) => {
                    self.values.pop_nonzeros(&mut self.col_values);
                    reduction.undo(&self.col_values, solution, basis);
                }
                Reduction::RedundantRow(reduction) => reduction.undo(solution, basis),
                Reduction::ForcingRow(reduction) => {
                    self.values.pop_nonzeros(&mut self.row_values);
                    reduction.undo(&self.row_values, solution, basis);
                }
                Reduction::DuplicateRow(reduction) => reduction.undo(solution, basis),
                Reduction::DuplicateColumn(reduction) => {
                    reduction.undo(solution, basis, feastol)
                }
            }
        }
        Ok(())
    }

    /// Expands the reduced solution (and, in dual mode, duals and basis)
    /// into original-space arrays in place.
    ///
    /// The gather runs from the highest reduced index down; `orig_index[i]
    /// >= i` guarantees no source slot is overwritten before it is read.
    fn expand_to_original(
        &self,
        solution: &mut Solution,
        basis: &mut Basis,
    ) -> Result<(), PostsolveError> {
        if solution.col_value.len() != self.orig_col_index.len() {
            let err = PostsolveError::ColumnCountMismatch {
                expected: self.orig_col_index.len(),
                got: solution.col_value.len(),
            };
            debug!("postsolve skipped: {err}");
            return Err(err);
        }
        if solution.row_value.len() != self.orig_row_index.len() {
            let err = PostsolveError::RowCountMismatch {
                expected: self.orig_row_index.len(),
                got: solution.row_value.len(),
            };
            debug!("postsolve skipped: {err}");
            return Err(err);
        }

        let dual = solution.col_dual.len() == solution.col_value.len();
        debug!(
            "postsolve: lifting {}x{} to {}x{}, {} reductions, dual={}",
            self.orig_row_index.len(),
            self.orig_col_index.len(),
            self.orig_num_row,
            self.orig_num_col,
            self.reductions.len(),
            dual
        );

        solution.col_value.resize(self.orig_num_col, 0.0);
        for i in (0..self.orig_col_index.len()).rev() {
            debug_assert!(self.orig_col_index[i] >= i);
            solution.col_value[self.orig_col_index[i]] = solution.col_value[i];
        }
        solution.row_value.resize(self.orig_num_row, 0.0);
        for i in (0..self.orig_row_index.len()).rev() {
            debug_assert!(self.orig_row_index[i] >= i);
            solution.row_value[self.orig_row_index[i]] = solution.row_value[i];
        }

        if !dual {
            return Ok(());
        }
        debug_assert_eq!(solution.row_dual.len(), self.orig_row_index.len());

        solution.col_dual.resize(self.orig_num_col, 0.0);
        for i in (0..self.orig_col_index.len()).rev() {
            solution.col_dual[self.orig_col_index[i]] = solution.col_dual[i];
        }
        solution.row_dual.resize(self.orig_num_row, 0.0);
        for i in (0..self.orig_row_index.len()).rev() {
            solution.row_dual[self.orig_row_index[i]] = solution.row_dual[i];
        }

        if basis.col_status.len() == self.orig_col_index.len() {
            basis.col_status.resize(self.orig_num_col, BasisStatus::Nonbasic);
            for i in (0..self.orig_col_index.len()).rev() {
                basis.col_status[self.orig_col_index[i]] = basis.col_status[i];
            }
        }
        if basis.row_status.len() == self.orig_row_index.len() {
            basis.row_status.resize(self.orig_num_row, BasisStatus::Nonbasic);
            for i in (0..self.orig_row_index.len()).rev() {
                basis.row_status[self.orig_row_index[i]] = basis.row_status[i];
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_maps_start_as_identity() {
        let mut stack = PostsolveStack::new();
        stack.initialize_index_maps(3, 4);
        for row in 0..3 {
            assert_eq!(stack.get_orig_row_index(row), row);
        }
        for col in 0..4 {
            assert_eq!(stack.get_orig_col_index(col), col);
        }
    }

    #[test]
    fn compression_keeps_original_targets() {
        let mut stack = PostsolveStack::new();
        stack.initialize_index_maps(4, 5);
        stack.compress_index_maps(
            &[None, Some(0), None, Some(1)],
            &[Some(0), None, Some(1), Some(2), None],
        );

        assert_eq!(stack.get_orig_row_index(0), 1);
        assert_eq!(stack.get_orig_row_index(1), 3);
        assert_eq!(stack.get_orig_col_index(0), 0);
        assert_eq!(stack.get_orig_col_index(1), 2);
        assert_eq!(stack.get_orig_col_index(2), 3);

        // a second compression chains through the first
        stack.compress_index_maps(&[Some(0), None], &[None, Some(0), Some(1)]);
        assert_eq!(stack.get_orig_row_index(0), 1);
        assert_eq!(stack.get_orig_col_index(0), 2);
        assert_eq!(stack.get_orig_col_index(1), 3);
    }

    #[test]
    fn full_undo_consumes_the_stack_exactly() {
        let mut stack = PostsolveStack::new();
        stack.initialize_index_maps(1, 2);
        stack.fixed_col_at_lower(1, 0.0, 1.0, [(0usize, 2.0)]);
        stack.forcing_row(0, [(0usize, 1.0)], 0.0, RowType::Leq);
        stack.compress_index_maps(&[None], &[Some(0), None]);

        let mut solution = Solution {
            col_value: vec![0.0],
            row_value: vec![],
            col_dual: vec![0.5],
            row_dual: vec![],
        };
        let mut basis = Basis {
            col_status: vec![BasisStatus::Lower],
            row_status: vec![],
        };
        stack.undo(&mut solution, &mut basis, 1e-7).unwrap();

        assert_eq!(stack.values.position(), 0);
        assert_eq!(stack.num_reductions(), 2);
    }
}
