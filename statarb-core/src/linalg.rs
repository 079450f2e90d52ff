//! Numerical primitives: symmetric eigendecomposition and ordinary least squares.
//!
//! Both sit behind traits so the factor extractor never depends on a specific
//! linear-algebra backend. The default implementations use nalgebra.

use nalgebra::{DMatrix, DVector, SymmetricEigen};
use thiserror::Error;

/// Errors from the numerical primitives.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LinalgError {
    #[error("matrix must be square, got {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },

    #[error("response has {response} rows but design has {design}")]
    DimensionMismatch { response: usize, design: usize },

    #[error("underdetermined system: {rows} observations for {cols} coefficients")]
    Underdetermined { rows: usize, cols: usize },

    #[error("input contains NaN or infinite values")]
    NonFinite,

    #[error("design matrix is rank deficient (rank {rank} < {cols})")]
    Singular { rank: usize, cols: usize },

    #[error("solver failed: {0}")]
    Solve(String),
}

/// Eigenpairs of a symmetric matrix. Column `i` of `vectors` pairs with
/// `values[i]`. No ordering is implied.
#[derive(Debug, Clone)]
pub struct Eigen {
    pub values: Vec<f64>,
    pub vectors: DMatrix<f64>,
}

/// Eigendecomposition of a symmetric (covariance) matrix.
pub trait EigenSolver: Send + Sync {
    fn symmetric_eigen(&self, matrix: &DMatrix<f64>) -> Result<Eigen, LinalgError>;
}

/// Least-squares fit of `y` on the columns of `x`.
#[derive(Debug, Clone)]
pub struct OlsFit {
    pub coefficients: DVector<f64>,
    pub fitted: DVector<f64>,
    pub residuals: DVector<f64>,
}

/// Ordinary least squares. The caller supplies any intercept column.
pub trait LeastSquares: Send + Sync {
    fn fit(&self, y: &DVector<f64>, x: &DMatrix<f64>) -> Result<OlsFit, LinalgError>;
}

/// nalgebra `SymmetricEigen` backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct NalgebraEigen;

impl EigenSolver for NalgebraEigen {
    fn symmetric_eigen(&self, matrix: &DMatrix<f64>) -> Result<Eigen, LinalgError> {
        if !matrix.is_square() {
            return Err(LinalgError::NotSquare {
                rows: matrix.nrows(),
                cols: matrix.ncols(),
            });
        }
        if matrix.iter().any(|v| !v.is_finite()) {
            return Err(LinalgError::NonFinite);
        }
        let eig = SymmetricEigen::new(matrix.clone());
        Ok(Eigen {
            values: eig.eigenvalues.iter().copied().collect(),
            vectors: eig.eigenvectors,
        })
    }
}

/// SVD-based least squares with an explicit rank check.
#[derive(Debug, Clone, Copy, Default)]
pub struct NalgebraOls;

impl LeastSquares for NalgebraOls {
    fn fit(&self, y: &DVector<f64>, x: &DMatrix<f64>) -> Result<OlsFit, LinalgError> {
        let (rows, cols) = x.shape();
        if y.len() != rows {
            return Err(LinalgError::DimensionMismatch {
                response: y.len(),
                design: rows,
            });
        }
        if rows < cols {
            return Err(LinalgError::Underdetermined { rows, cols });
        }
        if y.iter().chain(x.iter()).any(|v| !v.is_finite()) {
            return Err(LinalgError::NonFinite);
        }

        let svd = x.clone().svd(true, true);
        let max_sv = svd.singular_values.max();
        let tol = max_sv * rows.max(cols) as f64 * f64::EPSILON;
        let rank = svd.rank(tol);
        if rank < cols {
            return Err(LinalgError::Singular { rank, cols });
        }

        let coefficients = svd
            .solve(y, tol)
            .map_err(|e| LinalgError::Solve(e.to_string()))?;
        let fitted = x * &coefficients;
        let residuals = y - &fitted;

        if residuals.iter().any(|v| !v.is_finite()) {
            return Err(LinalgError::NonFinite);
        }

        Ok(OlsFit {
            coefficients,
            fitted,
            residuals,
        })
    }
}

/// Sample covariance of the columns of `data` (rows = observations),
/// centred, with an `n - 1` denominator.
pub fn covariance(data: &DMatrix<f64>) -> DMatrix<f64> {
    let n = data.nrows();
    let centred = centre_columns(data);
    let denom = n.saturating_sub(1).max(1) as f64;
    (centred.transpose() * &centred) / denom
}

/// Subtract each column's mean.
pub fn centre_columns(data: &DMatrix<f64>) -> DMatrix<f64> {
    let mut centred = data.clone();
    for mut col in centred.column_iter_mut() {
        let mean = col.mean();
        col.add_scalar_mut(-mean);
    }
    centred
}
