//! Reduction descriptors and their undo rules.
//!
//! Each presolve reduction leaves behind one fixed-size descriptor here;
//! variable-length row/column nonzeros live on the value stack, popped by
//! the engine before the matching `undo` runs. All indices stored in
//! descriptors are original-space indices.
//!
//! The undo rules restore the eliminated row or column: primal values
//! first, then duals and basis statuses when the caller asked for a dual
//! postsolve. Sign conventions throughout: the reduced cost of a column is
//! `cost - sum(row_dual * coef)` over its rows, a row dual is nonnegative
//! when the row is active at its lower side and nonpositive at its upper
//! side, and a nonbasic equality row is labelled Lower when its dual is
//! nonnegative.

use crate::solution::{Basis, BasisStatus, Solution};

/// Classification of a row by its finite sides at the time of a reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowType {
    /// Only the lower side is finite
    Geq,
    /// Only the upper side is finite
    Leq,
    /// Both sides coincide
    Eq,
}

/// One recorded reduction: the discriminator and its fixed-size descriptor.
///
/// Nonzero payloads are kept separately on the value stack, pushed in the
/// order documented on the recording operations of
/// [`PostsolveStack`](crate::PostsolveStack).
#[derive(Debug, Clone, Copy)]
pub enum Reduction {
    /// Free column eliminated against one of its rows
    FreeColSubstitution(FreeColSubstitution),
    /// Equality row with two columns, one substituted out
    DoubletonEquation(DoubletonEquation),
    /// Multiple of an equality row added to another row
    EqualityRowAddition(EqualityRowAddition),
    /// Row with a single nonzero, removed after tightening its column
    SingletonRow(SingletonRow),
    /// Column fixed at a value and removed
    FixedCol(FixedCol),
    /// Row implied by the remaining constraints
    RedundantRow(RedundantRow),
    /// Row whose side pinned every free column in it
    ForcingRow(ForcingRow),
    /// Row that is a scalar multiple of a surviving row
    DuplicateRow(DuplicateRow),
    /// Column merged into a scalar multiple of a surviving column
    DuplicateColumn(DuplicateColumn),
}

fn equality_side(dual: f64) -> BasisStatus {
    if dual < 0.0 {
        BasisStatus::Upper
    } else {
        BasisStatus::Lower
    }
}

/// A free column eliminated against row `row`.
///
/// Side payloads: the row's nonzeros, then the column's nonzeros.
#[derive(Debug, Clone, Copy)]
pub struct FreeColSubstitution {
    pub rhs: f64,
    pub col_cost: f64,
    pub row: usize,
    pub col: usize,
    pub row_type: RowType,
}

impl FreeColSubstitution {
    pub(crate) fn undo(
        &self,
        row_values: &[(usize, f64)],
        col_values: &[(usize, f64)],
        sol: &mut Solution,
        basis: &mut Basis,
    ) {
        let mut col_coef = 0.0;
        let mut activity = 0.0;
        for &(col, val) in row_values {
            if col == self.col {
                col_coef = val;
            } else {
                activity += val * sol.col_value[col];
            }
        }
        debug_assert!(col_coef != 0.0, "substituted column missing from its row");

        sol.col_value[self.col] = (self.rhs - activity) / col_coef;
        sol.row_value[self.row] = activity + col_coef * sol.col_value[self.col];

        if sol.row_dual.is_empty() {
            return;
        }

        // The eliminated column was free, so its reduced cost must vanish;
        // the row dual is whatever stationarity along the column leaves over.
        sol.row_dual[self.row] = 0.0;
        let mut dual = self.col_cost;
        for &(row, val) in col_values {
            dual -= val * sol.row_dual[row];
        }
        sol.row_dual[self.row] = dual / col_coef;
        sol.col_dual[self.col] = 0.0;

        if basis.col_status.is_empty() {
            return;
        }
        basis.col_status[self.col] = BasisStatus::Basic;
        basis.row_status[self.row] = match self.row_type {
            RowType::Geq => BasisStatus::Lower,
            RowType::Leq => BasisStatus::Upper,
            RowType::Eq => equality_side(sol.row_dual[self.row]),
        };
    }
}

/// An equality row with two columns where `col_subst` was substituted out.
///
/// Side payload: the substituted column's nonzeros.
#[derive(Debug, Clone, Copy)]
pub struct DoubletonEquation {
    pub coef: f64,
    pub coef_subst: f64,
    pub rhs: f64,
    /// Original lower bound of the substituted column
    pub subst_lower: f64,
    /// Original upper bound of the substituted column
    pub subst_upper: f64,
    pub subst_cost: f64,
    pub row: usize,
    pub col_subst: usize,
    pub col: usize,
    /// Whether the substitution tightened the kept column's lower bound
    pub lower_tightened: bool,
    /// Whether the substitution tightened the kept column's upper bound
    pub upper_tightened: bool,
}

impl DoubletonEquation {
    pub(crate) fn undo(
        &self,
        col_values: &[(usize, f64)],
        sol: &mut Solution,
        basis: &mut Basis,
    ) {
        sol.col_value[self.col_subst] =
            (self.rhs - self.coef * sol.col_value[self.col]) / self.coef_subst;
        sol.row_value[self.row] = self.rhs;

        if sol.row_dual.is_empty() {
            return;
        }

        let col_status = if basis.col_status.is_empty() {
            None
        } else {
            Some(basis.col_status[self.col])
        };
        let col_at_tightened = (self.lower_tightened && col_status == Some(BasisStatus::Lower))
            || (self.upper_tightened && col_status == Some(BasisStatus::Upper));

        if col_at_tightened {
            // The kept column rests on a bound this reduction introduced;
            // that bound does not exist in the original problem. Price the
            // kept column out to zero and move the substituted column onto
            // the bound that implied the tightening.
            //
            // Eliminating the row folded the substituted column into the
            // kept one, so the reduced costs satisfy
            //   rc_reduced(col) = rc(col) - (coef / coef_subst) * rc(col_subst)
            // and forcing rc(col) = 0 pins rc(col_subst).
            let subst_dual = -self.coef_subst / self.coef * sol.col_dual[self.col];
            let mut stationarity = self.subst_cost - subst_dual;
            for &(row, val) in col_values {
                if row != self.row {
                    stationarity -= val * sol.row_dual[row];
                }
            }
            sol.row_dual[self.row] = stationarity / self.coef_subst;
            sol.col_dual[self.col] = 0.0;
            sol.col_dual[self.col_subst] = subst_dual;

            basis.col_status[self.col] = BasisStatus::Basic;
            // x_col = (rhs - coef_subst * x_subst) / coef: the bounds swap
            // sides exactly when the coefficients share a sign
            let swapped = self.coef_subst / self.coef > 0.0;
            basis.col_status[self.col_subst] = match (col_status, swapped) {
                (Some(BasisStatus::Lower), true) | (Some(BasisStatus::Upper), false) => {
                    BasisStatus::Upper
                }
                _ => BasisStatus::Lower,
            };
            basis.row_status[self.row] = equality_side(sol.row_dual[self.row]);
        } else {
            // The kept column keeps its status and reduced cost; choose the
            // row dual so the substituted column prices out to zero and
            // re-enters the basis.
            let mut dual = self.subst_cost;
            for &(row, val) in col_values {
                if row != self.row {
                    dual -= val * sol.row_dual[row];
                }
            }
            let row_dual = dual / self.coef_subst;
            sol.row_dual[self.row] = row_dual;
            sol.col_dual[self.col_subst] = 0.0;
            if !basis.col_status.is_empty() {
                basis.col_status[self.col_subst] = BasisStatus::Basic;
                basis.row_status[self.row] = equality_side(row_dual);
            }
        }
    }
}

/// A multiple of equality row `added_eq_row` was added to `row`.
#[derive(Debug, Clone, Copy)]
pub struct EqualityRowAddition {
    pub row: usize,
    pub added_eq_row: usize,
    pub eq_row_scale: f64,
}

impl EqualityRowAddition {
    pub(crate) fn undo(&self, sol: &mut Solution, _basis: &mut Basis) {
        if sol.row_dual.is_empty() {
            return;
        }
        // the combined row keeps its dual; the equality sheds the share it
        // absorbed through the combination
        sol.row_dual[self.added_eq_row] -= self.eq_row_scale * sol.row_dual[self.row];
    }
}

/// A row with a single nonzero `coef` on `col`, removed after folding its
/// sides into the column bounds.
#[derive(Debug, Clone, Copy)]
pub struct SingletonRow {
    pub coef: f64,
    pub row: usize,
    pub col: usize,
    pub col_lower_tightened: bool,
    pub col_upper_tightened: bool,
}

impl SingletonRow {
    pub(crate) fn undo(&self, sol: &mut Solution, basis: &mut Basis) {
        sol.row_value[self.row] = self.coef * sol.col_value[self.col];

        if sol.row_dual.is_empty() {
            return;
        }

        if !basis.col_status.is_empty() {
            let at_lower =
                self.col_lower_tightened && basis.col_status[self.col] == BasisStatus::Lower;
            let at_upper =
                self.col_upper_tightened && basis.col_status[self.col] == BasisStatus::Upper;
            if at_lower || at_upper {
                // the column rests on a bound this row implied; hand its
                // dual back to the row and free the column
                sol.row_dual[self.row] = sol.col_dual[self.col] / self.coef;
                sol.col_dual[self.col] = 0.0;
                basis.col_status[self.col] = BasisStatus::Basic;
                basis.row_status[self.row] = if at_lower == (self.coef > 0.0) {
                    BasisStatus::Lower
                } else {
                    BasisStatus::Upper
                };
                return;
            }
        }

        sol.row_dual[self.row] = 0.0;
        if !basis.row_status.is_empty() {
            basis.row_status[self.row] = BasisStatus::Basic;
        }
    }
}

/// A column fixed at `fix_value` and removed.
///
/// Side payload: the column's nonzeros. `fix_type` is Lower, Upper or
/// Nonbasic depending on which flavor of fixing removed the column.
#[derive(Debug, Clone, Copy)]
pub struct FixedCol {
    pub fix_value: f64,
    pub col_cost: f64,
    pub col: usize,
    pub fix_type: BasisStatus,
}

impl FixedCol {
    pub(crate) fn undo(
        &self,
        col_values: &[(usize, f64)],
        sol: &mut Solution,
        basis: &mut Basis,
    ) {
        sol.col_value[self.col] = self.fix_value;

        if sol.col_dual.is_empty() {
            return;
        }

        let mut dual = self.col_cost;
        for &(row, val) in col_values {
            dual -= val * sol.row_dual[row];
        }
        sol.col_dual[self.col] = dual;

        if !basis.col_status.is_empty() {
            basis.col_status[self.col] = self.fix_type;
        }
    }
}

/// A row implied by the remaining constraints and bounds.
#[derive(Debug, Clone, Copy)]
pub struct RedundantRow {
    pub row: usize,
}

impl RedundantRow {
    pub(crate) fn undo(&self, sol: &mut Solution, basis: &mut Basis) {
        // The row's coefficients are not recorded; leave a placeholder
        // activity and let the caller recompute row values afterwards
        // (Solution::recompute_row_values).
        sol.row_value[self.row] = 0.0;

        if sol.row_dual.is_empty() {
            return;
        }
        sol.row_dual[self.row] = 0.0;
        if !basis.row_status.is_empty() {
            basis.row_status[self.row] = BasisStatus::Basic;
        }
    }
}

/// A row whose side pinned every free column in it to a bound.
///
/// Side payload: the row's nonzeros. `row_type` records the pinning
/// direction (Geq when the row forced at its lower side, Leq at its upper);
/// the columns themselves were fixed by separate FixedCol reductions
/// recorded after this one, so they are already restored when this undo
/// runs.
#[derive(Debug, Clone, Copy)]
pub struct ForcingRow {
    pub side: f64,
    pub row: usize,
    pub row_type: RowType,
}

impl ForcingRow {
    pub(crate) fn undo(
        &self,
        row_values: &[(usize, f64)],
        sol: &mut Solution,
        basis: &mut Basis,
    ) {
        sol.row_value[self.row] = self.side;

        if sol.row_dual.is_empty() {
            return;
        }
        debug_assert!(
            self.row_type != RowType::Eq,
            "forcing rows record the pinning direction as Geq or Leq"
        );

        // A nonzero row dual shifts the reduced cost of every pinned column
        // by -coef * dual. The admissible duals are bounded by the ratios
        // rc / coef; taking the extremal admissible one keeps every column
        // dual-feasible at its pinned bound and turns exactly one column
        // basic. If zero is admissible the row itself stays basic.
        let mut row_dual = 0.0;
        let mut basic_col = None;
        for &(col, coef) in row_values {
            let implied = sol.col_dual[col] / coef;
            let better = match self.row_type {
                RowType::Geq => implied > row_dual,
                _ => implied < row_dual,
            };
            if better {
                row_dual = implied;
                basic_col = Some(col);
            }
        }

        let Some(basic_col) = basic_col else {
            sol.row_dual[self.row] = 0.0;
            if !basis.row_status.is_empty() {
                basis.row_status[self.row] = BasisStatus::Basic;
            }
            return;
        };

        sol.row_dual[self.row] = row_dual;
        for &(col, coef) in row_values {
            sol.col_dual[col] -= coef * row_dual;
        }
        sol.col_dual[basic_col] = 0.0;

        if !basis.col_status.is_empty() {
            basis.col_status[basic_col] = BasisStatus::Basic;
            basis.row_status[self.row] = match self.row_type {
                RowType::Geq => BasisStatus::Lower,
                _ => BasisStatus::Upper,
            };
        }
    }
}

/// A removed row `row` that is `duplicate_row_scale` times the surviving
/// row `duplicate_row`.
///
/// The tightened flags name the surviving row's sides that were tightened
/// when it absorbed the removed row's bounds.
#[derive(Debug, Clone, Copy)]
pub struct DuplicateRow {
    pub duplicate_row_scale: f64,
    pub duplicate_row: usize,
    pub row: usize,
    pub row_lower_tightened: bool,
    pub row_upper_tightened: bool,
}

impl DuplicateRow {
    pub(crate) fn undo(&self, sol: &mut Solution, basis: &mut Basis) {
        sol.row_value[self.row] = self.duplicate_row_scale * sol.row_value[self.duplicate_row];

        if sol.row_dual.is_empty() {
            return;
        }

        if !basis.row_status.is_empty() {
            let at_lower = self.row_lower_tightened
                && basis.row_status[self.duplicate_row] == BasisStatus::Lower;
            let at_upper = self.row_upper_tightened
                && basis.row_status[self.duplicate_row] == BasisStatus::Upper;
            if at_lower || at_upper {
                // the survivor is held at a bound inherited from the removed
                // duplicate, so the dual belongs to the duplicate
                sol.row_dual[self.row] =
                    sol.row_dual[self.duplicate_row] / self.duplicate_row_scale;
                sol.row_dual[self.duplicate_row] = 0.0;
                basis.row_status[self.duplicate_row] = BasisStatus::Basic;
                basis.row_status[self.row] = if at_lower == (self.duplicate_row_scale > 0.0) {
                    BasisStatus::Lower
                } else {
                    BasisStatus::Upper
                };
                return;
            }
        }

        sol.row_dual[self.row] = 0.0;
        if !basis.row_status.is_empty() {
            basis.row_status[self.row] = BasisStatus::Basic;
        }
    }
}

/// A removed column `duplicate_col` merged into `col`, which then stood for
/// `col + col_scale * duplicate_col`.
#[derive(Debug, Clone, Copy)]
pub struct DuplicateColumn {
    pub col_scale: f64,
    pub col_lower: f64,
    pub col_upper: f64,
    pub duplicate_col_lower: f64,
    pub duplicate_col_upper: f64,
    pub col: usize,
    pub duplicate_col: usize,
    pub col_integral: bool,
    pub duplicate_col_integral: bool,
}

impl DuplicateColumn {
    fn col_feasible(&self, x: f64, feastol: f64) -> bool {
        x >= self.col_lower - feastol
            && x <= self.col_upper + feastol
            && (!self.col_integral || (x - x.round()).abs() <= feastol)
    }

    fn dup_feasible(&self, y: f64, feastol: f64) -> bool {
        y >= self.duplicate_col_lower - feastol
            && y <= self.duplicate_col_upper + feastol
            && (!self.duplicate_col_integral || (y - y.round()).abs() <= feastol)
    }

    fn status_at(value: f64, lower: f64, upper: f64, basic: bool, feastol: f64) -> BasisStatus {
        if basic {
            return BasisStatus::Basic;
        }
        if (value - lower).abs() <= feastol {
            BasisStatus::Lower
        } else if (value - upper).abs() <= feastol {
            BasisStatus::Upper
        } else {
            // value rests strictly between its bounds: prefer basic over a
            // contradictory bound label
            BasisStatus::Basic
        }
    }

    /// Splits the merged value into `(x, y, status_x, status_y)` with
    /// `x + col_scale * y = merged`.
    fn split(&self, merged: f64, merged_basic: bool, feastol: f64) -> (f64, f64, BasisStatus, BasisStatus) {
        // First choice: the duplicate at one of its bounds, upper preferred;
        // this is what makes integer splits deterministic.
        let dup_bounds = [
            (self.duplicate_col_upper, BasisStatus::Upper),
            (self.duplicate_col_lower, BasisStatus::Lower),
        ];
        for (bound, status) in dup_bounds {
            if !bound.is_finite() {
                continue;
            }
            let x = merged - self.col_scale * bound;
            if self.col_feasible(x, feastol) {
                let x = x.max(self.col_lower).min(self.col_upper);
                return (
                    x,
                    bound,
                    Self::status_at(x, self.col_lower, self.col_upper, merged_basic, feastol),
                    status,
                );
            }
        }

        // Second choice: the kept column at one of its bounds, lower
        // preferred, the duplicate interior.
        let col_bounds = [
            (self.col_lower, BasisStatus::Lower),
            (self.col_upper, BasisStatus::Upper),
        ];
        for (bound, status) in col_bounds {
            if !bound.is_finite() {
                continue;
            }
            let y = (merged - bound) / self.col_scale;
            if self.dup_feasible(y, feastol) {
                let y = y
                    .max(self.duplicate_col_lower)
                    .min(self.duplicate_col_upper);
                return (
                    bound,
                    y,
                    status,
                    Self::status_at(
                        y,
                        self.duplicate_col_lower,
                        self.duplicate_col_upper,
                        merged_basic,
                        feastol,
                    ),
                );
            }
        }

        // Both interior (or unbounded): keep the kept column inside its
        // bounds and let the duplicate carry the remainder as the basic
        // variable.
        let mut x = merged.max(self.col_lower).min(self.col_upper);
        if self.col_integral {
            x = x.round();
        }
        let mut y = (merged - x) / self.col_scale;
        if self.duplicate_col_integral {
            y = y.round();
            x = merged - self.col_scale * y;
        }
        (
            x,
            y,
            Self::status_at(x, self.col_lower, self.col_upper, false, feastol),
            BasisStatus::Basic,
        )
    }

    pub(crate) fn undo(&self, sol: &mut Solution, basis: &mut Basis, feastol: f64) {
        let merged = sol.col_value[self.col];
        let merged_basic = !basis.col_status.is_empty()
            && basis.col_status[self.col] == BasisStatus::Basic;

        let (x, y, col_status, dup_status) = self.split(merged, merged_basic, feastol);
        sol.col_value[self.col] = x;
        sol.col_value[self.duplicate_col] = y;

        if !sol.col_dual.is_empty() {
            // both columns inherit the merged reduced cost; the duplicate's
            // cost and coefficients are the scaled ones, so its reduced cost
            // scales along. Row duals are untouched.
            sol.col_dual[self.duplicate_col] = self.col_scale * sol.col_dual[self.col];
        }

        if !basis.col_status.is_empty() {
            basis.col_status[self.col] = col_status;
            basis.col_status[self.duplicate_col] = dup_status;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn primal_dual(col: usize, row: usize) -> (Solution, Basis) {
        let solution = Solution {
            col_value: vec![0.0; col],
            row_value: vec![0.0; row],
            col_dual: vec![0.0; col],
            row_dual: vec![0.0; row],
        };
        let basis = Basis {
            col_status: vec![BasisStatus::Nonbasic; col],
            row_status: vec![BasisStatus::Nonbasic; row],
        };
        (solution, basis)
    }

    #[test]
    fn equality_row_addition_subtracts_the_scaled_dual() {
        let (mut sol, mut basis) = primal_dual(0, 2);
        sol.row_dual = vec![4.0, 7.0];
        let reduction = EqualityRowAddition {
            row: 0,
            added_eq_row: 1,
            eq_row_scale: 1.5,
        };
        reduction.undo(&mut sol, &mut basis);
        assert_eq!(sol.row_dual, vec![4.0, 1.0]);
    }

    #[test]
    fn singleton_row_transfers_a_tightened_bound_dual() {
        // row 0: 2 x0 <= 6 tightened x0 <= 3; reduced optimum sits at the
        // tightened bound with reduced cost -4
        let (mut sol, mut basis) = primal_dual(1, 1);
        sol.col_value[0] = 3.0;
        sol.col_dual[0] = -4.0;
        basis.col_status[0] = BasisStatus::Upper;

        let reduction = SingletonRow {
            coef: 2.0,
            row: 0,
            col: 0,
            col_lower_tightened: false,
            col_upper_tightened: true,
        };
        reduction.undo(&mut sol, &mut basis);

        assert_eq!(sol.row_value[0], 6.0);
        assert_eq!(sol.row_dual[0], -2.0);
        assert_eq!(sol.col_dual[0], 0.0);
        assert_eq!(basis.col_status[0], BasisStatus::Basic);
        assert_eq!(basis.row_status[0], BasisStatus::Upper);
    }

    #[test]
    fn duplicate_column_splits_interior_value_with_duplicate_basic() {
        let reduction = DuplicateColumn {
            col_scale: 2.0,
            col_lower: 0.0,
            col_upper: 1.0,
            duplicate_col_lower: f64::NEG_INFINITY,
            duplicate_col_upper: f64::INFINITY,
            col: 0,
            duplicate_col: 1,
            col_integral: false,
            duplicate_col_integral: false,
        };
        let (mut sol, mut basis) = primal_dual(2, 0);
        sol.col_value[0] = 5.0;
        basis.col_status[0] = BasisStatus::Basic;

        reduction.undo(&mut sol, &mut basis, 1e-7);

        // the free duplicate cannot sit at a bound; the kept column lands on
        // its lower bound and the duplicate turns basic with the remainder
        assert_eq!(sol.col_value[0], 0.0);
        assert_eq!(sol.col_value[1], 2.5);
        assert_eq!(basis.col_status[0], BasisStatus::Lower);
        assert_eq!(basis.col_status[1], BasisStatus::Basic);
    }

    #[test]
    fn duplicate_column_scales_the_duplicate_dual() {
        let reduction = DuplicateColumn {
            col_scale: -3.0,
            col_lower: 0.0,
            col_upper: 10.0,
            duplicate_col_lower: 0.0,
            duplicate_col_upper: 1.0,
            col: 0,
            duplicate_col: 1,
            col_integral: false,
            duplicate_col_integral: false,
        };
        let (mut sol, mut basis) = primal_dual(2, 0);
        sol.col_value[0] = 2.0;
        sol.col_dual[0] = 0.5;
        basis.col_status[0] = BasisStatus::Lower;

        reduction.undo(&mut sol, &mut basis, 1e-7);

        // y = upper bound 1 gives x = 2 + 3 = 5, inside [0, 10]
        assert_eq!(sol.col_value[0], 5.0);
        assert_eq!(sol.col_value[1], 1.0);
        assert_eq!(sol.col_dual[1], -1.5);
        assert_eq!(basis.col_status[1], BasisStatus::Upper);
        // x sits strictly inside its bounds: basic wins over the stale label
        assert_eq!(basis.col_status[0], BasisStatus::Basic);
    }

    #[test]
    fn redundant_row_leaves_a_placeholder_activity() {
        let (mut sol, mut basis) = primal_dual(0, 1);
        sol.row_value[0] = 123.0;
        sol.row_dual[0] = 9.0;

        let reduction = RedundantRow { row: 0 };
        reduction.undo(&mut sol, &mut basis);

        assert_eq!(sol.row_value[0], 0.0);
        assert_eq!(sol.row_dual[0], 0.0);
        assert_eq!(basis.row_status[0], BasisStatus::Basic);
    }
}
