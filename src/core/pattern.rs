use nalgebra::{DMatrix, DVector};
use thiserror::Error;

/// Error while constructing a [`FreePattern`].
#[derive(Debug, Error)]
pub enum PatternError {
    /// An index pair references a row or column outside the matrix dimension.
    #[error("index pair ({0}, {1}) is out of range for dimension {2}")]
    IndexOutOfRange(usize, usize, usize),
    /// Two index pairs denote the same unordered matrix entry.
    #[error("index pair ({0}, {1}) denotes an entry that is already free")]
    DuplicatePair(usize, usize),
}

/// The free/non-free structure of a symmetric matrix.
///
/// A pattern is given by the matrix dimension and an ordered list of *free*
/// index pairs, each naming one independent scalar degree of freedom of the
/// precision matrix. Pairs are unordered: `(i, j)` and `(j, i)` denote the
/// same entry. The *non-free* pairs are the complement of the free pairs
/// within the full upper triangle (diagonal included) and are derived at
/// construction.
///
/// The order of the free pairs is significant. It fixes the layout of the
/// flat parameter vector that the solvers iterate on and is stable for the
/// lifetime of the pattern.
#[derive(Debug, Clone)]
pub struct FreePattern {
    dim: usize,
    free: Vec<(usize, usize)>,
    non_free: Vec<(usize, usize)>,
}

fn pairs_equal(a: (usize, usize), b: (usize, usize)) -> bool {
    a == b || (a.1, a.0) == b
}

impl FreePattern {
    /// Creates a pattern for symmetric `dim` × `dim` matrices with the given
    /// free entries.
    ///
    /// Fails when an index is out of range or when the same unordered entry
    /// is listed twice.
    pub fn new(dim: usize, free: Vec<(usize, usize)>) -> Result<Self, PatternError> {
        assert!(dim > 0, "dimension must be positive");

        for (k, &(i, j)) in free.iter().enumerate() {
            if i >= dim || j >= dim {
                return Err(PatternError::IndexOutOfRange(i, j, dim));
            }
            if free[..k].iter().any(|&pr| pairs_equal(pr, (i, j))) {
                return Err(PatternError::DuplicatePair(i, j));
            }
        }

        let mut non_free = Vec::new();
        for i in 0..dim {
            for j in i..dim {
                if !free.iter().any(|&pr| pairs_equal(pr, (i, j))) {
                    non_free.push((i, j));
                }
            }
        }

        Ok(Self {
            dim,
            free,
            non_free,
        })
    }

    /// Matrix dimension.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// The free index pairs, in parameter-vector order.
    pub fn free_pairs(&self) -> &[(usize, usize)] {
        &self.free
    }

    /// The non-free index pairs (upper triangle minus the free pairs).
    pub fn non_free_pairs(&self) -> &[(usize, usize)] {
        &self.non_free
    }

    /// Number of free entries.
    pub fn n_free(&self) -> usize {
        self.free.len()
    }

    /// Number of non-free entries.
    pub fn n_non_free(&self) -> usize {
        self.non_free.len()
    }

    /// Tests whether the unordered entry `(i, j)` is free.
    pub fn is_free(&self, i: usize, j: usize) -> bool {
        self.free.iter().any(|&pr| pairs_equal(pr, (i, j)))
    }

    /// Places the k-th parameter at both positions of the k-th free pair;
    /// all other entries are zero.
    pub fn free_vec_to_mat(&self, vec: &DVector<f64>) -> DMatrix<f64> {
        Self::vec_to_mat(self.dim, &self.free, vec)
    }

    /// Reads the free entries of `mat` into a parameter vector, in
    /// free-pair order.
    pub fn free_mat_to_vec(&self, mat: &DMatrix<f64>) -> DVector<f64> {
        Self::mat_to_vec(&self.free, mat)
    }

    /// [`free_vec_to_mat`](Self::free_vec_to_mat) over the non-free pairs.
    pub fn non_free_vec_to_mat(&self, vec: &DVector<f64>) -> DMatrix<f64> {
        Self::vec_to_mat(self.dim, &self.non_free, vec)
    }

    /// [`free_mat_to_vec`](Self::free_mat_to_vec) over the non-free pairs.
    pub fn non_free_mat_to_vec(&self, mat: &DMatrix<f64>) -> DVector<f64> {
        Self::mat_to_vec(&self.non_free, mat)
    }

    /// Returns a copy of `mat` with all free entries (both symmetric
    /// positions) set to zero.
    pub fn zero_free_elements(&self, mat: &DMatrix<f64>) -> DMatrix<f64> {
        Self::zero_elements(&self.free, mat)
    }

    /// Returns a copy of `mat` with all non-free entries (both symmetric
    /// positions) set to zero.
    pub fn zero_non_free_elements(&self, mat: &DMatrix<f64>) -> DMatrix<f64> {
        Self::zero_elements(&self.non_free, mat)
    }

    /// The symmetric elementary matrix with ones at `(k, l)` and `(l, k)`.
    pub fn sym_unit_mat(&self, k: usize, l: usize) -> DMatrix<f64> {
        let mut mat = DMatrix::zeros(self.dim, self.dim);
        mat[(k, l)] = 1.0;
        mat[(l, k)] = 1.0;
        mat
    }

    /// Flattens the upper triangle of `mat` (diagonal included) row-major
    /// into a vector of length `dim (dim + 1) / 2`.
    pub fn upper_tri_to_vec(&self, mat: &DMatrix<f64>) -> DVector<f64> {
        let n_dofs = self.dim * (self.dim + 1) / 2;
        let mut vec = DVector::zeros(n_dofs);

        let mut x = 0;
        for i in 0..self.dim {
            for j in i..self.dim {
                vec[x] = mat[(i, j)];
                x += 1;
            }
        }

        vec
    }

    fn vec_to_mat(dim: usize, pairs: &[(usize, usize)], vec: &DVector<f64>) -> DMatrix<f64> {
        let mut mat = DMatrix::zeros(dim, dim);
        for (x, &(i, j)) in pairs.iter().enumerate() {
            mat[(i, j)] = vec[x];
            mat[(j, i)] = vec[x];
        }

        mat
    }

    fn mat_to_vec(pairs: &[(usize, usize)], mat: &DMatrix<f64>) -> DVector<f64> {
        let mut vec = DVector::zeros(pairs.len());
        for (x, &(i, j)) in pairs.iter().enumerate() {
            vec[x] = mat[(i, j)];
        }

        vec
    }

    fn zero_elements(pairs: &[(usize, usize)], mat: &DMatrix<f64>) -> DMatrix<f64> {
        let mut out = mat.clone_owned();
        for &(i, j) in pairs {
            out[(i, j)] = 0.0;
            out[(j, i)] = 0.0;
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use nalgebra::{dmatrix, dvector};

    #[test]
    fn round_trip() {
        let pattern = FreePattern::new(3, vec![(0, 0), (1, 1), (2, 2), (0, 2), (1, 2)]).unwrap();
        let v = dvector![1.0, 2.0, 3.0, 4.0, 5.0];

        assert_eq!(pattern.free_mat_to_vec(&pattern.free_vec_to_mat(&v)), v);
    }

    #[test]
    fn vec_to_mat_is_symmetric_and_zero_elsewhere() {
        let pattern = FreePattern::new(3, vec![(0, 0), (0, 2), (1, 2)]).unwrap();
        let mat = pattern.free_vec_to_mat(&dvector![1.0, 2.0, 3.0]);

        let expected = dmatrix![
            1.0, 0.0, 2.0;
            0.0, 0.0, 3.0;
            2.0, 3.0, 0.0
        ];
        assert_eq!(mat, expected);
    }

    #[test]
    fn partition_of_upper_triangle() {
        let pattern = FreePattern::new(4, vec![(0, 0), (2, 1), (3, 3)]).unwrap();

        assert_eq!(pattern.n_free() + pattern.n_non_free(), 4 * 5 / 2);

        for &(i, j) in pattern.non_free_pairs() {
            assert!(!pattern.is_free(i, j));
        }
        // The reversed pair (2, 1) must be recognized as the upper-triangle
        // entry (1, 2).
        assert!(pattern.is_free(1, 2));
        assert!(!pattern.non_free_pairs().contains(&(1, 2)));
    }

    #[test]
    fn rejects_out_of_range_pair() {
        let result = FreePattern::new(2, vec![(0, 0), (0, 2)]);
        assert!(matches!(result, Err(PatternError::IndexOutOfRange(0, 2, 2))));
    }

    #[test]
    fn rejects_duplicate_pair() {
        let result = FreePattern::new(3, vec![(0, 1), (1, 0)]);
        assert!(matches!(result, Err(PatternError::DuplicatePair(1, 0))));
    }

    #[test]
    fn masking() {
        let pattern = FreePattern::new(2, vec![(0, 1)]).unwrap();
        let mat = dmatrix![
            1.0, 2.0;
            2.0, 3.0
        ];

        let free_zeroed = pattern.zero_free_elements(&mat);
        assert_eq!(free_zeroed, dmatrix![1.0, 0.0; 0.0, 3.0]);

        let non_free_zeroed = pattern.zero_non_free_elements(&mat);
        assert_eq!(non_free_zeroed, dmatrix![0.0, 2.0; 2.0, 0.0]);
    }

    #[test]
    fn upper_tri_order_is_row_major() {
        let pattern = FreePattern::new(3, vec![(0, 0)]).unwrap();
        let mat = dmatrix![
            1.0, 2.0, 3.0;
            2.0, 4.0, 5.0;
            3.0, 5.0, 6.0
        ];

        assert_eq!(
            pattern.upper_tri_to_vec(&mat),
            dvector![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]
        );
    }
}
