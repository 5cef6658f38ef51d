//! Postsolve stack for LP/MIP presolving.
//!
//! A presolver shrinks a linear program by applying reductions: fixing
//! columns, removing redundant or forcing rows, substituting variables out
//! of equations, merging duplicates. Solving the reduced problem yields a
//! solution in the *reduced* index space; this crate provides the machinery
//! to get back out:
//!
//! - **Reduction record**: an append-only log of reduction descriptors,
//!   with their variable-length row/column nonzero payloads kept on a
//!   packed LIFO value stack
//! - **Index remap**: reduced-to-original row and column index maps that
//!   can be compressed as presolve deletes entries
//! - **Postsolve engine**: expands a reduced primal/dual solution and basis
//!   into the original index space in place, then replays the record in
//!   reverse, restoring each eliminated row and column
//!
//! The presolve detection logic itself lives with the caller; recording
//! operations consume matrix data only through `(index, value)` nonzero
//! iterators, so any sparse representation plugs in.
//!
//! # Example
//!
//! ```ignore
//! use presolve_core::{Basis, PostsolveStack, Solution};
//!
//! let mut stack = PostsolveStack::new();
//! stack.initialize_index_maps(num_row, num_col);
//!
//! // during presolve: one recording call per applied reduction
//! stack.fixed_col_at_lower(col, 0.0, cost, col_nonzeros);
//! stack.compress_index_maps(&new_row_index, &new_col_index);
//!
//! // after the reduced problem is solved
//! let mut solution = Solution { col_value, row_value, col_dual, row_dual };
//! let mut basis = Basis { col_status, row_status };
//! stack.undo(&mut solution, &mut basis, 1e-7)?;
//! ```

#![warn(clippy::all)]
#![allow(clippy::too_many_arguments)] // recording operations mirror the reductions' many scalars

pub mod datastack;
pub mod error;
pub mod linalg;
pub mod postsolve;
pub mod solution;

pub use error::PostsolveError;
pub use postsolve::{PostsolveStack, Reduction, RowType};
pub use solution::{Basis, BasisStatus, Solution};
