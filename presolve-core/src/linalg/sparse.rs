//! Construction and iteration helpers over `sprs` CSC matrices.

use sprs::TriMat;

/// Sparse matrix in CSC format.
pub type SparseCsc = sprs::CsMatI<f64, usize>;

/// Builds a CSC matrix from (row, col, value) triplets.
pub fn from_triplets(nrows: usize, ncols: usize, triplets: Vec<(usize, usize, f64)>) -> SparseCsc {
    let mut tri = TriMat::new((nrows, ncols));
    for (row, col, val) in triplets {
        tri.add_triplet(row, col, val);
    }
    tri.to_csc()
}

/// Computes `y = A * x`.
pub fn spmv(a: &SparseCsc, x: &[f64], y: &mut [f64]) {
    debug_assert_eq!(x.len(), a.cols());
    debug_assert_eq!(y.len(), a.rows());

    y.fill(0.0);
    for col in 0..a.cols() {
        if let Some(col_view) = a.outer_view(col) {
            for (row, &val) in col_view.iter() {
                y[row] += val * x[col];
            }
        }
    }
}

/// Nonzeros of column `col` as `(row, value)` pairs.
pub fn col_nonzeros(a: &SparseCsc, col: usize) -> Vec<(usize, f64)> {
    match a.outer_view(col) {
        Some(view) => view.iter().map(|(row, &val)| (row, val)).collect(),
        None => Vec::new(),
    }
}

/// Nonzeros of row `row` as `(col, value)` pairs.
///
/// CSC storage makes this a full column sweep; acceptable for recording a
/// single row at reduction time, not for bulk row access.
pub fn row_nonzeros(a: &SparseCsc, row: usize) -> Vec<(usize, f64)> {
    let mut values = Vec::new();
    for col in 0..a.cols() {
        if let Some(view) = a.outer_view(col) {
            for (r, &val) in view.iter() {
                if r == row {
                    values.push((col, val));
                }
            }
        }
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_triplets() {
        let mat = from_triplets(2, 2, vec![(0, 0, 1.0), (1, 1, 2.0), (0, 1, 3.0)]);
        assert_eq!(mat.rows(), 2);
        assert_eq!(mat.cols(), 2);
        assert_eq!(mat.nnz(), 3);
    }

    #[test]
    fn test_spmv() {
        // [[1, 2], [3, 4]] * [1, 2] = [5, 11]
        let mat = from_triplets(
            2,
            2,
            vec![(0, 0, 1.0), (0, 1, 2.0), (1, 0, 3.0), (1, 1, 4.0)],
        );
        let mut y = vec![0.0; 2];
        spmv(&mat, &[1.0, 2.0], &mut y);
        assert!((y[0] - 5.0).abs() < 1e-12);
        assert!((y[1] - 11.0).abs() < 1e-12);
    }

    #[test]
    fn test_row_and_col_nonzeros() {
        let mat = from_triplets(2, 3, vec![(0, 0, 1.0), (0, 2, 2.0), (1, 2, 4.0)]);
        assert_eq!(col_nonzeros(&mat, 2), vec![(0, 2.0), (1, 4.0)]);
        assert_eq!(col_nonzeros(&mat, 1), vec![]);
        assert_eq!(row_nonzeros(&mat, 0), vec![(0, 1.0), (2, 2.0)]);
    }
}
