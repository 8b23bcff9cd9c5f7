//! Column-major tensors with shape metadata and linearized indexing.

use crate::error::Error;

/// Dense column-major array of `f64` with an explicit dimension vector.
///
/// `dim` is never empty and contains no zeros. A scalar has `dim == [1]`;
/// a vector is any tensor with at most one extent greater than one; a matrix
/// has exactly two dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    /// Extent of each dimension. `val.len()` equals the product.
    pub dim: Vec<usize>,
    /// Coefficients in column-major order.
    pub val: Vec<f64>,
}

impl Tensor {
    /// Zero-filled tensor with the given dimensions.
    pub fn zeros(dim: Vec<usize>) -> Self {
        assert!(!dim.is_empty() && dim.iter().all(|&d| d > 0));
        let len = dim.iter().product();
        Tensor {
            dim,
            val: vec![0.0; len],
        }
    }

    /// Tensor from explicit values and dimensions.
    pub fn from_parts(val: Vec<f64>, dim: Vec<usize>) -> Self {
        assert_eq!(val.len(), dim.iter().product::<usize>());
        assert!(!dim.is_empty() && dim.iter().all(|&d| d > 0));
        Tensor { dim, val }
    }

    /// Number of coefficients.
    pub fn len(&self) -> usize {
        self.val.len()
    }

    pub fn is_empty(&self) -> bool {
        self.val.is_empty()
    }

    pub fn is_scalar(&self) -> bool {
        self.val.len() == 1
    }

    /// A K-tensor is a vector iff some extent equals the total size,
    /// i.e. at most one dimension is greater than one.
    pub fn is_vector(&self) -> bool {
        let n = self.len();
        for &d in &self.dim {
            if d == n {
                return true;
            }
            if d > 1 {
                return false;
            }
        }
        false
    }

    pub fn is_matrix(&self) -> bool {
        self.dim.len() == 2
    }

    /// Scalar value. Panics unless `is_scalar()`.
    pub fn scalar(&self) -> f64 {
        assert!(self.is_scalar());
        self.val[0]
    }

    /// Matrix rows. Panics unless `is_matrix()`.
    pub fn nrow(&self) -> usize {
        assert!(self.is_matrix());
        self.dim[0]
    }

    /// Matrix columns. Panics unless `is_matrix()`.
    pub fn ncol(&self) -> usize {
        assert!(self.is_matrix());
        self.dim[1]
    }

    /// Column-major linearization of a matrix index pair.
    pub fn vec_index(&self, i: usize, j: usize) -> usize {
        i + j * self.dim[0]
    }

    /// Column-major linearization of an arbitrary index tuple.
    pub fn vec_index_nd(&self, idx: &[usize]) -> usize {
        debug_assert!(idx.len() <= self.dim.len());
        let mut vi = 0;
        let mut stride = 1;
        for (k, &i) in idx.iter().enumerate() {
            vi += i * stride;
            stride *= self.dim[k];
        }
        vi
    }

    /// Matrix element access.
    pub fn at(&self, i: usize, j: usize) -> f64 {
        self.val[self.vec_index(i, j)]
    }

    /// Fill every coefficient with `x`.
    pub fn fill(mut self, x: f64) -> Self {
        for v in &mut self.val {
            *v = x;
        }
        self
    }

    /// Reshape a plain vector into an explicit n x 1 column matrix.
    pub fn as_col_vector(mut self) -> Self {
        assert!(self.is_vector());
        let n = self.len();
        self.dim = vec![n, 1];
        self
    }

    /// Reshape a plain vector into an explicit 1 x n row matrix.
    pub fn as_row_vector(mut self) -> Self {
        assert!(self.is_vector());
        let n = self.len();
        self.dim = vec![1, n];
        self
    }

    /// Apply `f` element-wise.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Tensor {
        Tensor {
            dim: self.dim.clone(),
            val: self.val.iter().map(|&x| f(x)).collect(),
        }
    }

    /// Element-wise combination with scalar broadcasting on either side.
    ///
    /// Equal shapes combine pointwise; a scalar operand broadcasts to the
    /// other shape; anything else is a shape mismatch.
    pub fn zip(&self, other: &Tensor, f: impl Fn(f64, f64) -> f64) -> Result<Tensor, Error> {
        if self.dim == other.dim {
            let val = self
                .val
                .iter()
                .zip(&other.val)
                .map(|(&a, &b)| f(a, b))
                .collect();
            Ok(Tensor {
                dim: self.dim.clone(),
                val,
            })
        } else if self.is_scalar() {
            let a = self.val[0];
            Ok(Tensor {
                dim: other.dim.clone(),
                val: other.val.iter().map(|&b| f(a, b)).collect(),
            })
        } else if other.is_scalar() {
            let b = other.val[0];
            Ok(Tensor {
                dim: self.dim.clone(),
                val: self.val.iter().map(|&a| f(a, b)).collect(),
            })
        } else {
            Err(Error::ShapeMismatch {
                left: self.dim.clone(),
                right: other.dim.clone(),
            })
        }
    }

    /// Sum of all coefficients.
    pub fn sum(&self) -> f64 {
        self.val.iter().sum()
    }

    /// Sum of squared coefficients.
    pub fn sumsq(&self) -> f64 {
        self.val.iter().map(|x| x * x).sum()
    }

    /// Dot product. Lengths must match.
    pub fn dot(&self, other: &Tensor) -> f64 {
        assert_eq!(self.len(), other.len());
        self.val
            .iter()
            .zip(&other.val)
            .map(|(&a, &b)| a * b)
            .sum()
    }

    /// Matrix product of two 2-D tensors.
    pub fn matmult(&self, other: &Tensor) -> Result<Tensor, Error> {
        if !self.is_matrix() || !other.is_matrix() || self.ncol() != other.nrow() {
            return Err(Error::ShapeMismatch {
                left: self.dim.clone(),
                right: other.dim.clone(),
            });
        }
        let (m, k, n) = (self.nrow(), self.ncol(), other.ncol());
        let mut out = Tensor::zeros(vec![m, n]);
        for col in 0..n {
            for row in 0..m {
                let mut x = 0.0;
                for p in 0..k {
                    x += self.at(row, p) * other.at(p, col);
                }
                out.val[row + col * m] = x;
            }
        }
        Ok(out)
    }
}

impl From<f64> for Tensor {
    fn from(x: f64) -> Self {
        Tensor {
            dim: vec![1],
            val: vec![x],
        }
    }
}

impl From<Vec<f64>> for Tensor {
    fn from(x: Vec<f64>) -> Self {
        assert!(!x.is_empty());
        Tensor {
            dim: vec![x.len()],
            val: x,
        }
    }
}

impl From<&[f64]> for Tensor {
    fn from(x: &[f64]) -> Self {
        Tensor::from(x.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_major_indexing() {
        let t = Tensor::from_parts(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]);
        assert_eq!(t.at(0, 0), 1.0);
        assert_eq!(t.at(1, 0), 2.0);
        assert_eq!(t.at(0, 1), 3.0);
        assert_eq!(t.at(1, 2), 6.0);
        assert_eq!(t.vec_index_nd(&[1, 2]), 5);
    }

    #[test]
    fn shape_predicates() {
        assert!(Tensor::from(2.5).is_scalar());
        assert!(Tensor::from(vec![1.0, 2.0]).is_vector());
        assert!(Tensor::from_parts(vec![0.0; 3], vec![3, 1]).is_vector());
        assert!(!Tensor::from_parts(vec![0.0; 4], vec![2, 2]).is_vector());
        assert!(Tensor::from_parts(vec![0.0; 4], vec![2, 2]).is_matrix());
    }

    #[test]
    fn zip_broadcasts_scalars() {
        let v = Tensor::from(vec![1.0, 2.0, 3.0]);
        let s = Tensor::from(10.0);
        let sum = v.zip(&s, |a, b| a + b).unwrap();
        assert_eq!(sum.val, vec![11.0, 12.0, 13.0]);
        let sum2 = s.zip(&v, |a, b| a + b).unwrap();
        assert_eq!(sum2.val, vec![11.0, 12.0, 13.0]);
    }

    #[test]
    fn zip_rejects_incompatible_shapes() {
        let a = Tensor::from(vec![1.0, 2.0]);
        let b = Tensor::from(vec![1.0, 2.0, 3.0]);
        assert!(matches!(
            a.zip(&b, |x, y| x + y),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn matmult_small() {
        // |1 3| |5 7|   |23 31|
        // |2 4| |6 8| = |34 46|
        let a = Tensor::from_parts(vec![1.0, 2.0, 3.0, 4.0], vec![2, 2]);
        let b = Tensor::from_parts(vec![5.0, 6.0, 7.0, 8.0], vec![2, 2]);
        let c = a.matmult(&b).unwrap();
        assert_eq!(c.val, vec![23.0, 34.0, 31.0, 46.0]);
    }
}
