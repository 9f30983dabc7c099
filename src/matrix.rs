//! Dense row-major matrix over aligned storage.
//!
//! A vector is a matrix with one dimension equal to 1; the network passes
//! column vectors (`n × 1`) between layers. Shapes are fixed at construction
//! and every binary operation checks them before touching any data.
use crate::aligned::AlignedBuf;
use crate::element::Element;
use crate::error::{NnError, Result};
use rayon::prelude::*;
use std::fmt;
use std::ops::{
    Add, AddAssign, Div, DivAssign, Index, IndexMut, Mul, MulAssign, Sub, SubAssign,
};

/// Thresholds deciding when work is split across the rayon pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParallelPolicy {
    /// `dot` parallelizes over an output dimension only when it exceeds this.
    pub dim_threshold: usize,
    /// Elementwise loops go parallel from this many elements on.
    pub min_elements: usize,
}

impl ParallelPolicy {
    pub const DEFAULT: ParallelPolicy = ParallelPolicy {
        dim_threshold: 1,
        min_elements: 4096,
    };

    /// Policy that never leaves the calling thread.
    pub const SEQUENTIAL: ParallelPolicy = ParallelPolicy {
        dim_threshold: usize::MAX,
        min_elements: usize::MAX,
    };
}

impl Default for ParallelPolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Matrix
#[derive(Clone)]
pub struct Matrix<F: Element = f64> {
    rows: usize,
    cols: usize,
    data: AlignedBuf<F>,
}

impl<F: Element> Matrix<F> {
    /// Allocates a `rows × cols` matrix filled with zeros.
    pub fn zeros(rows: usize, cols: usize) -> Result<Self> {
        let len = rows
            .checked_mul(cols)
            .ok_or(NnError::Allocation { bytes: usize::MAX })?;
        Ok(Self {
            rows,
            cols,
            data: AlignedBuf::zeroed(len)?,
        })
    }

    pub fn filled(rows: usize, cols: usize, value: F) -> Result<Self> {
        let mut m = Self::zeros(rows, cols)?;
        m.fill(value);
        Ok(m)
    }

    pub fn identity(n: usize) -> Result<Self> {
        Self::from_fn(n, n, |r, c| if r == c { F::one() } else { F::zero() })
    }

    pub fn from_fn(
        rows: usize,
        cols: usize,
        mut f: impl FnMut(usize, usize) -> F,
    ) -> Result<Self> {
        let mut m = Self::zeros(rows, cols)?;
        for r in 0..rows {
            for c in 0..cols {
                m.data[r * cols + c] = f(r, c);
            }
        }
        Ok(m)
    }

    /// Builds a matrix from row-major `data`, which must hold exactly `rows * cols` values.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<F>) -> Result<Self> {
        if rows.checked_mul(cols) != Some(data.len()) {
            return Err(NnError::shape("from_vec", (rows, cols), (data.len(), 1)));
        }
        Ok(Self {
            rows,
            cols,
            data: AlignedBuf::from_slice(&data)?,
        })
    }

    /// Builds a matrix from nested rows, e.g. `&[[0., 4., -2.], [-4., -3., 0.]]`.
    /// The outer length must equal `rows` and every inner length `cols`; a
    /// ragged row is reported as a `rows × len` operand, `len` being the
    /// length of the first row that does not fit.
    pub fn from_rows<R: AsRef<[F]>>(rows: usize, cols: usize, src: &[R]) -> Result<Self> {
        if src.len() != rows {
            return Err(NnError::shape("from_rows", (rows, cols), (src.len(), cols)));
        }
        if let Some(bad) = src.iter().map(|row| row.as_ref().len()).find(|&len| len != cols) {
            return Err(NnError::shape("from_rows", (rows, cols), (rows, bad)));
        }
        let mut m = Self::zeros(rows, cols)?;
        for (out, row) in m.data.chunks_mut(cols.max(1)).zip(src) {
            out.copy_from_slice(row.as_ref());
        }
        Ok(m)
    }

    /// Column vector `n × 1`.
    pub fn column(values: &[F]) -> Result<Self> {
        Ok(Self {
            rows: values.len(),
            cols: 1,
            data: AlignedBuf::from_slice(values)?,
        })
    }

    /// Row vector `1 × n`.
    pub fn row(values: &[F]) -> Result<Self> {
        Ok(Self {
            rows: 1,
            cols: values.len(),
            data: AlignedBuf::from_slice(values)?,
        })
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Row-major view of the whole buffer.
    pub fn as_slice(&self) -> &[F] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [F] {
        &mut self.data
    }

    pub fn iter(&self) -> std::slice::Iter<'_, F> {
        self.data.iter()
    }

    #[inline]
    fn index_of(&self, r: usize, c: usize) -> usize {
        r * self.cols + c
    }

    fn check_bounds(&self, r: usize, c: usize) -> Result<()> {
        if r < self.rows && c < self.cols {
            Ok(())
        } else {
            Err(NnError::IndexOutOfBounds {
                row: r,
                col: c,
                shape: self.shape(),
            })
        }
    }

    /// Bounds-checked read.
    pub fn at(&self, r: usize, c: usize) -> Result<F> {
        self.check_bounds(r, c)?;
        Ok(self.data[self.index_of(r, c)])
    }

    /// Bounds-checked mutable access.
    pub fn at_mut(&mut self, r: usize, c: usize) -> Result<&mut F> {
        self.check_bounds(r, c)?;
        let i = self.index_of(r, c);
        Ok(&mut self.data[i])
    }

    pub fn set(&mut self, r: usize, c: usize, value: F) -> Result<()> {
        *self.at_mut(r, c)? = value;
        Ok(())
    }

    /// Trusted read for hot loops.
    ///
    /// # Safety
    /// `r < self.rows()` and `c < self.cols()` must hold. Debug builds assert it.
    #[inline]
    pub unsafe fn at_unchecked(&self, r: usize, c: usize) -> F {
        debug_assert!(r < self.rows && c < self.cols);
        *self.data.get_unchecked(self.index_of(r, c))
    }

    /// Matrix product `self · other` with the default [`ParallelPolicy`].
    pub fn dot(&self, other: &Matrix<F>) -> Result<Matrix<F>> {
        self.dot_with(other, &ParallelPolicy::DEFAULT)
    }

    /// Matrix product. Output rows are computed in parallel when there are
    /// more than `policy.dim_threshold` of them, otherwise output columns are;
    /// each inner reduction runs sequentially, so sums may differ in the last
    /// bits from a differently ordered reduction.
    pub fn dot_with(&self, other: &Matrix<F>, policy: &ParallelPolicy) -> Result<Matrix<F>> {
        if self.cols != other.rows {
            return Err(NnError::shape("dot", self.shape(), other.shape()));
        }
        let mut res = Matrix::zeros(self.rows, other.cols)?;
        let (inner, n) = (self.cols, other.cols);
        if n == 0 {
            return Ok(res);
        }
        let lhs = self.as_slice();
        let rhs = other.as_slice();
        let cell = |r: usize, c: usize| -> F {
            lhs[r * inner..(r + 1) * inner]
                .iter()
                .enumerate()
                .fold(F::zero(), |acc, (k, &a)| acc + a * rhs[k * n + c])
        };

        if self.rows > policy.dim_threshold {
            res.as_mut_slice()
                .par_chunks_mut(n)
                .enumerate()
                .for_each(|(r, out)| {
                    for (c, v) in out.iter_mut().enumerate() {
                        *v = cell(r, c);
                    }
                });
        } else if n > policy.dim_threshold {
            for (r, out) in res.as_mut_slice().chunks_mut(n).enumerate() {
                out.par_iter_mut()
                    .enumerate()
                    .for_each(|(c, v)| *v = cell(r, c));
            }
        } else {
            for (r, out) in res.as_mut_slice().chunks_mut(n).enumerate() {
                for (c, v) in out.iter_mut().enumerate() {
                    *v = cell(r, c);
                }
            }
        }
        Ok(res)
    }

    /// Returns a new `cols × rows` matrix.
    pub fn transpose(&self) -> Result<Matrix<F>> {
        self.transpose_with(&ParallelPolicy::DEFAULT)
    }

    /// Transpose; output rows are filled in parallel from
    /// `policy.min_elements` elements on.
    pub fn transpose_with(&self, policy: &ParallelPolicy) -> Result<Matrix<F>> {
        let mut res = Matrix::zeros(self.cols, self.rows)?;
        let (rows, cols) = (self.rows, self.cols);
        let src = self.as_slice();
        if rows == 0 {
            return Ok(res);
        }
        let fill_row = |i: usize, out: &mut [F]| {
            for (j, v) in out.iter_mut().enumerate() {
                *v = src[j * cols + i];
            }
        };
        if self.len() >= policy.min_elements {
            res.as_mut_slice()
                .par_chunks_mut(rows)
                .enumerate()
                .for_each(|(i, out)| fill_row(i, out));
        } else {
            for (i, out) in res.as_mut_slice().chunks_mut(rows).enumerate() {
                fill_row(i, out);
            }
        }
        Ok(res)
    }

    pub fn set_zero(&mut self) {
        self.fill(F::zero());
    }

    pub fn fill(&mut self, value: F) {
        self.map_inplace(|_| value);
    }

    /// Applies `f` to every element in place.
    pub fn map_inplace<M>(&mut self, f: M)
    where
        M: Fn(F) -> F + Sync + Send,
    {
        self.map_inplace_with(f, &ParallelPolicy::DEFAULT)
    }

    pub fn map_inplace_with<M>(&mut self, f: M, policy: &ParallelPolicy)
    where
        M: Fn(F) -> F + Sync + Send,
    {
        if self.len() >= policy.min_elements {
            self.as_mut_slice().par_iter_mut().for_each(|v| *v = f(*v));
        } else {
            self.as_mut_slice().iter_mut().for_each(|v| *v = f(*v));
        }
    }

    /// Returns a new matrix with `f` applied to every element.
    pub fn map<M>(&self, f: M) -> Matrix<F>
    where
        M: Fn(F) -> F + Sync + Send,
    {
        let mut res = self.clone();
        res.map_inplace(f);
        res
    }

    fn check_same(&self, op: &'static str, other: &Matrix<F>) -> Result<()> {
        if self.shape() == other.shape() {
            Ok(())
        } else {
            Err(NnError::shape(op, self.shape(), other.shape()))
        }
    }

    fn zip_inplace<Z>(
        &mut self,
        op: &'static str,
        other: &Matrix<F>,
        policy: &ParallelPolicy,
        z: Z,
    ) -> Result<()>
    where
        Z: Fn(&mut F, F) + Sync + Send,
    {
        self.check_same(op, other)?;
        if self.len() >= policy.min_elements {
            self.as_mut_slice()
                .par_iter_mut()
                .zip(other.as_slice().par_iter())
                .for_each(|(a, &b)| z(a, b));
        } else {
            for (a, &b) in self.as_mut_slice().iter_mut().zip(other.as_slice()) {
                z(a, b);
            }
        }
        Ok(())
    }

    /// `v - self` for every element.
    pub fn rsub_scalar(&self, v: F) -> Matrix<F> {
        self.map(move |x| v - x)
    }

    pub fn sum(&self) -> F {
        self.data.iter().copied().sum()
    }

    /// Sum of squared elements, `‖self‖²`.
    pub fn squared_norm(&self) -> F {
        self.data.iter().map(|&v| v * v).sum()
    }

    /// True when shapes match and every pair of elements differs by at most `eps`.
    pub fn approx_eq(&self, other: &Matrix<F>, eps: F) -> bool {
        self.shape() == other.shape()
            && self
                .data
                .iter()
                .zip(other.data.iter())
                .all(|(&a, &b)| (a - b).abs() <= eps)
    }

    pub fn min_max(&self) -> Option<(F, F)> {
        let first = *self.data.first()?;
        Some(
            self.data
                .iter()
                .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v))),
        )
    }
}

macro_rules! elementwise_ops {
    (
        $Op:ident, $op:ident, $OpAssign:ident, $op_assign:ident,
        $try_op:ident, $try_assign:ident, $try_assign_with:ident, $sym:tt
    ) => {
        impl<F: Element> Matrix<F> {
            #[doc = concat!("Elementwise `self ", stringify!($sym), "= rhs`; shapes must match.")]
            pub fn $try_assign(&mut self, rhs: &Matrix<F>) -> Result<()> {
                self.$try_assign_with(rhs, &ParallelPolicy::DEFAULT)
            }

            /// Same as the in-place operator, with an explicit [`ParallelPolicy`].
            pub fn $try_assign_with(
                &mut self,
                rhs: &Matrix<F>,
                policy: &ParallelPolicy,
            ) -> Result<()> {
                self.zip_inplace(stringify!($op), rhs, policy, |a, b| *a = *a $sym b)
            }

            #[doc = concat!("Elementwise `self ", stringify!($sym), " rhs`; shapes must match.")]
            pub fn $try_op(&self, rhs: &Matrix<F>) -> Result<Matrix<F>> {
                self.check_same(stringify!($op), rhs)?;
                let mut res = self.clone();
                res.$try_assign(rhs)?;
                Ok(res)
            }
        }

        /// # Panics
        /// On a shape mismatch, like out-of-range slice indexing.
        impl<F: Element> $OpAssign<&Matrix<F>> for Matrix<F> {
            fn $op_assign(&mut self, rhs: &Matrix<F>) {
                if let Err(e) = self.$try_assign(rhs) {
                    panic!("{e}");
                }
            }
        }

        /// # Panics
        /// On a shape mismatch.
        impl<F: Element> $Op<&Matrix<F>> for &Matrix<F> {
            type Output = Matrix<F>;

            fn $op(self, rhs: &Matrix<F>) -> Matrix<F> {
                match self.$try_op(rhs) {
                    Ok(m) => m,
                    Err(e) => panic!("{e}"),
                }
            }
        }

        impl<F: Element> $Op<&Matrix<F>> for Matrix<F> {
            type Output = Matrix<F>;

            fn $op(mut self, rhs: &Matrix<F>) -> Matrix<F> {
                self.$op_assign(rhs);
                self
            }
        }

        impl<F: Element> $OpAssign<F> for Matrix<F> {
            fn $op_assign(&mut self, v: F) {
                self.map_inplace(move |x| x $sym v);
            }
        }

        impl<F: Element> $Op<F> for &Matrix<F> {
            type Output = Matrix<F>;

            fn $op(self, v: F) -> Matrix<F> {
                self.map(move |x| x $sym v)
            }
        }

        impl<F: Element> $Op<F> for Matrix<F> {
            type Output = Matrix<F>;

            fn $op(mut self, v: F) -> Matrix<F> {
                self.$op_assign(v);
                self
            }
        }
    };
}

elementwise_ops!(Add, add, AddAssign, add_assign, try_add, try_add_assign, try_add_assign_with, +);
elementwise_ops!(Sub, sub, SubAssign, sub_assign, try_sub, try_sub_assign, try_sub_assign_with, -);
elementwise_ops!(Mul, mul, MulAssign, mul_assign, try_mul, try_mul_assign, try_mul_assign_with, *);
elementwise_ops!(Div, div, DivAssign, div_assign, try_div, try_div_assign, try_div_assign_with, /);

// Scalar on the left, e.g. `1.0 - &output`.
macro_rules! scalar_lhs_sub {
    ($t:ty) => {
        impl Sub<&Matrix<$t>> for $t {
            type Output = Matrix<$t>;

            fn sub(self, rhs: &Matrix<$t>) -> Matrix<$t> {
                rhs.rsub_scalar(self)
            }
        }

        impl Sub<Matrix<$t>> for $t {
            type Output = Matrix<$t>;

            fn sub(self, mut rhs: Matrix<$t>) -> Matrix<$t> {
                rhs.map_inplace(move |x| self - x);
                rhs
            }
        }
    };
}

scalar_lhs_sub!(f32);
scalar_lhs_sub!(f64);

impl<F: Element> Index<(usize, usize)> for Matrix<F> {
    type Output = F;

    fn index(&self, (r, c): (usize, usize)) -> &F {
        if let Err(e) = self.check_bounds(r, c) {
            panic!("{e}");
        }
        &self.data[self.index_of(r, c)]
    }
}

impl<F: Element> IndexMut<(usize, usize)> for Matrix<F> {
    fn index_mut(&mut self, (r, c): (usize, usize)) -> &mut F {
        match self.at_mut(r, c) {
            Ok(v) => v,
            Err(e) => panic!("{e}"),
        }
    }
}

impl<F: Element> PartialEq for Matrix<F> {
    fn eq(&self, other: &Self) -> bool {
        self.shape() == other.shape() && self.as_slice() == other.as_slice()
    }
}

impl<F: Element> fmt::Debug for Matrix<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Matrix")
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .field("data", &self.data)
            .finish()
    }
}

impl<F: Element> fmt::Display for Matrix<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{{")?;
        for r in 0..self.rows {
            write!(f, " {{")?;
            let row = &self.data[r * self.cols..(r + 1) * self.cols];
            for (c, v) in row.iter().enumerate() {
                if c > 0 {
                    write!(f, ",")?;
                }
                write!(f, " {}", v)?;
            }
            writeln!(f, " }},")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn naive_dot(a: &Matrix<f64>, b: &Matrix<f64>) -> Matrix<f64> {
        let mut res = Matrix::zeros(a.rows(), b.cols()).unwrap();
        for i in 0..a.rows() {
            for j in 0..b.cols() {
                let mut s = 0.0;
                for k in 0..a.cols() {
                    s += a[(i, k)] * b[(k, j)];
                }
                res[(i, j)] = s;
            }
        }
        res
    }

    fn sample_a() -> Matrix<f32> {
        Matrix::from_rows(2, 3, &[[0.0, 4.0, -2.0], [-4.0, -3.0, 0.0]]).unwrap()
    }

    #[test]
    fn dot_matrix_by_matrix() {
        let b = Matrix::from_rows(3, 2, &[[0.0, 1.0], [1.0, -1.0], [2.0, 3.0]]).unwrap();
        let expected = Matrix::from_rows(2, 2, &[[0.0, -10.0], [-3.0, -1.0]]).unwrap();
        assert_eq!(sample_a().dot(&b).unwrap(), expected);
    }

    #[test]
    fn dot_matrix_by_column() {
        let b = Matrix::column(&[0.0, 1.0, 2.0]).unwrap();
        let res = sample_a().dot(&b).unwrap();
        assert_eq!(res.shape(), (2, 1));
        assert_eq!(res.as_slice(), &[0.0, -3.0]);
    }

    #[test]
    fn dot_row_vector_parallelizes_columns() {
        let a = Matrix::row(&[1.0, 2.0]).unwrap();
        let b = Matrix::from_rows(2, 3, &[[1.0, 0.0, 2.0], [0.5, 1.0, -1.0]]).unwrap();
        let res = a.dot(&b).unwrap();
        assert_eq!(res.as_slice(), &[2.0, 2.0, 0.0]);
        assert_eq!(res, a.dot_with(&b, &ParallelPolicy::SEQUENTIAL).unwrap());
    }

    #[test]
    fn dot_shape_mismatch_leaves_operands_untouched() {
        let a = sample_a();
        let b = Matrix::<f32>::filled(2, 2, 1.5).unwrap();
        let (a0, b0) = (a.clone(), b.clone());
        let err = a.dot(&b).unwrap_err();
        assert_eq!(
            err,
            NnError::ShapeMismatch {
                op: "dot",
                left: (2, 3),
                right: (2, 2)
            }
        );
        assert_eq!(a, a0);
        assert_eq!(b, b0);
    }

    #[test]
    fn from_rows_rejects_bad_shapes() {
        assert!(Matrix::<f64>::from_rows(3, 2, &[[1.0, 2.0], [3.0, 4.0]]).is_err());
        let ragged: Vec<Vec<f64>> = vec![vec![1.0, 2.0], vec![3.0]];
        assert_eq!(
            Matrix::from_rows(2, 2, &ragged).unwrap_err(),
            NnError::ShapeMismatch {
                op: "from_rows",
                left: (2, 2),
                right: (2, 1)
            }
        );
        assert!(Matrix::from_vec(2, 2, vec![1.0f64; 3]).is_err());
    }

    #[test]
    fn checked_access() {
        let mut m = Matrix::<f64>::zeros(2, 3).unwrap();
        m.set(1, 2, 7.0).unwrap();
        assert_eq!(m.at(1, 2).unwrap(), 7.0);
        assert_eq!(unsafe { m.at_unchecked(1, 2) }, 7.0);
        assert!(matches!(
            m.at(2, 0),
            Err(NnError::IndexOutOfBounds { row: 2, col: 0, .. })
        ));
        assert!(m.at_mut(0, 3).is_err());
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn index_panics_out_of_range() {
        let m = Matrix::<f64>::zeros(2, 2).unwrap();
        let _ = m[(0, 2)];
    }

    #[test]
    fn transpose_shape_and_values() {
        let a = sample_a();
        let t = a.transpose().unwrap();
        assert_eq!(t.shape(), (3, 2));
        assert_eq!(t[(2, 0)], -2.0);
        assert_eq!(t[(0, 1)], -4.0);
        assert_eq!(t.transpose().unwrap(), a);
    }

    #[test]
    fn policy_does_not_change_results() {
        let n = ParallelPolicy::DEFAULT.min_elements / 8 + 3;
        let a = Matrix::from_fn(n, 8, |r, c| (r * 8 + c) as f64 * 0.5).unwrap();
        let b = Matrix::from_fn(n, 8, |r, c| r as f64 - c as f64).unwrap();

        let par = a.transpose_with(&ParallelPolicy::DEFAULT).unwrap();
        let seq = a.transpose_with(&ParallelPolicy::SEQUENTIAL).unwrap();
        assert_eq!(par, seq);
        assert_eq!(seq.shape(), (8, n));

        let (mut x, mut y) = (a.clone(), a.clone());
        x.try_add_assign_with(&b, &ParallelPolicy::DEFAULT).unwrap();
        y.try_add_assign_with(&b, &ParallelPolicy::SEQUENTIAL).unwrap();
        assert_eq!(x, y);
        y.try_mul_assign_with(&b, &ParallelPolicy::SEQUENTIAL).unwrap();
        x.try_mul_assign(&b).unwrap();
        assert_eq!(x, y);
        assert!(y
            .try_sub_assign_with(&Matrix::zeros(1, 1).unwrap(), &ParallelPolicy::SEQUENTIAL)
            .is_err());
    }

    #[test]
    fn elementwise_identities() {
        let a = Matrix::from_fn(4, 5, |r, c| (r * 5 + c) as f64 * 0.37 - 2.0).unwrap();
        let b = Matrix::from_fn(4, 5, |r, c| (c as f64 + 1.0) / (r as f64 + 2.0)).unwrap();
        let back = &(&a + &b) - &b;
        assert!(back.approx_eq(&a, 1e-12));
        let scaled = &(&a * 3.5) / 3.5;
        assert!(scaled.approx_eq(&a, 1e-12));
        let prod = a.try_mul(&b).unwrap();
        let ratio = prod.try_div(&b).unwrap();
        assert!(ratio.approx_eq(&a, 1e-12));
    }

    #[test]
    fn elementwise_shape_mismatch() {
        let mut a = Matrix::<f64>::zeros(2, 3).unwrap();
        let b = Matrix::<f64>::zeros(3, 2).unwrap();
        assert!(a.try_add(&b).is_err());
        assert!(a.try_sub_assign(&b).is_err());
        assert!(a.iter().all(|&v| v == 0.0));
    }

    #[test]
    #[should_panic(expected = "shape mismatch")]
    fn operator_panics_on_mismatch() {
        let a = Matrix::<f64>::zeros(2, 3).unwrap();
        let b = Matrix::<f64>::zeros(2, 2).unwrap();
        let _ = &a + &b;
    }

    #[test]
    fn large_elementwise_goes_parallel_and_matches() {
        let n = ParallelPolicy::DEFAULT.min_elements + 17;
        let a = Matrix::from_fn(n, 1, |r, _| r as f64).unwrap();
        let mut b = a.clone();
        b += &a;
        b -= 1.0;
        for (i, &v) in b.iter().enumerate() {
            assert_eq!(v, 2.0 * i as f64 - 1.0);
        }
    }

    #[test]
    fn scalar_minus_matrix() {
        let o = Matrix::column(&[0.25f32, 0.5, 1.0]).unwrap();
        let r = 1.0f32 - &o;
        assert_eq!(r.as_slice(), &[0.75, 0.5, 0.0]);
        assert_eq!(o.rsub_scalar(1.0), r);
    }

    #[test]
    fn set_zero_and_norm() {
        let mut m = Matrix::column(&[3.0f64, 4.0]).unwrap();
        assert_relative_eq!(m.squared_norm(), 25.0);
        assert_eq!(m.min_max(), Some((3.0, 4.0)));
        m.set_zero();
        assert_eq!(m.sum(), 0.0);
    }

    #[test]
    fn display_nested_literal() {
        let m = Matrix::from_rows(2, 2, &[[1.0f64, 2.0], [3.0, 4.0]]).unwrap();
        assert_eq!(m.to_string(), "{\n { 1, 2 },\n { 3, 4 },\n}");
    }

    fn matrix_strategy(rows: usize, cols: usize) -> impl Strategy<Value = Matrix<f64>> {
        prop::collection::vec(-10.0f64..10.0, rows * cols)
            .prop_map(move |v| Matrix::from_vec(rows, cols, v).unwrap())
    }

    fn dot_operands() -> impl Strategy<Value = (Matrix<f64>, Matrix<f64>)> {
        (1usize..=50, 1usize..=50, 1usize..=50)
            .prop_flat_map(|(m, k, n)| (matrix_strategy(m, k), matrix_strategy(k, n)))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn dot_matches_naive_reference((a, b) in dot_operands()) {
            let fast = a.dot(&b).unwrap();
            let slow = naive_dot(&a, &b);
            prop_assert_eq!(fast.shape(), slow.shape());
            // Same summation order as the reference, so results agree exactly.
            prop_assert_eq!(fast, slow);
        }

        #[test]
        fn double_transpose_is_identity(
            a in (1usize..=30, 1usize..=30).prop_flat_map(|(r, c)| matrix_strategy(r, c))
        ) {
            prop_assert_eq!(a.transpose().unwrap().transpose().unwrap(), a);
        }
    }
}
