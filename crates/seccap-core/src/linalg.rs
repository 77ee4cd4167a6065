//! Hermitian matrix kernels for the secrecy optimizer.
//!
//! Every matrix the optimizer decomposes is Hermitian: weighting matrices,
//! covariances, the generalized channel Gram matrix and the `T̄ T̄^H` products
//! of the inner loop. This module collects the handful of operations needed on
//! them: eigendecomposition, inversion and log-determinant through Cholesky,
//! and the inverse square root.
//!
//! Round-off makes products such as `A B A^H` only approximately Hermitian, so
//! decompositions always run on the hermitized matrix `(A + A^H) / 2`.
//!
//! ## Example
//!
//! ```rust
//! use seccap_core::linalg::{hermitian_eigen, hpd_log_det};
//! use seccap_core::types::matrix_ops::from_real;
//!
//! // [[2, 1], [1, 2]] has eigenvalues 1 and 3
//! let m = from_real(2, 2, &[2.0, 1.0, 1.0, 2.0]);
//! let eig = hermitian_eigen(&m);
//! let mut vals: Vec<f64> = eig.eigenvalues.iter().copied().collect();
//! vals.sort_by(|a, b| a.total_cmp(b));
//! assert!((vals[0] - 1.0).abs() < 1e-10);
//! assert!((vals[1] - 3.0).abs() < 1e-10);
//!
//! // log det = ln 3
//! assert!((hpd_log_det(&m).unwrap() - 3.0_f64.ln()).abs() < 1e-12);
//! ```

use nalgebra::{Cholesky, Dyn, SymmetricEigen};

use crate::types::{matrix_ops, CMatrix, Complex, RVector, SecrecyError, SecrecyResult};

/// Result of a Hermitian eigendecomposition `A = U diag(λ) U^H`.
#[derive(Debug, Clone)]
pub struct EigenResult {
    /// Real eigenvalues (not sorted).
    pub eigenvalues: RVector,
    /// Unitary matrix whose column *j* is the eigenvector of `eigenvalues[j]`.
    pub eigenvectors: CMatrix,
}

impl EigenResult {
    /// Rebuild `U diag(f(λ)) U^H` for a spectral function `f`.
    pub fn reconstruct_with(&self, f: impl Fn(f64) -> f64) -> CMatrix {
        let d = matrix_ops::real_diagonal(&self.eigenvalues.map(f));
        &self.eigenvectors * d * self.eigenvectors.adjoint()
    }

    /// Smallest eigenvalue, `+inf` for an empty matrix.
    pub fn min_eigenvalue(&self) -> f64 {
        self.eigenvalues.iter().copied().fold(f64::INFINITY, f64::min)
    }
}

// ---------------------------------------------------------------------------
// Structure helpers
// ---------------------------------------------------------------------------

/// `(A + A^H) / 2`.
pub fn hermitize(m: &CMatrix) -> CMatrix {
    matrix_ops::scaled(&(m + m.adjoint()), 0.5)
}

/// Returns `true` if `‖A − A^H‖_max ≤ tol`.
pub fn is_hermitian(m: &CMatrix, tol: f64) -> bool {
    if m.nrows() != m.ncols() {
        return false;
    }
    let n = m.nrows();
    (0..n).all(|i| (i..n).all(|j| (m[(i, j)] - m[(j, i)].conj()).norm() <= tol))
}

/// Real part of the trace.
pub fn real_trace(m: &CMatrix) -> f64 {
    m.trace().re
}

/// Vertical concatenation `[top; bottom]`.
///
/// # Panics
/// Panics if the column counts differ.
pub fn stack_rows(top: &CMatrix, bottom: &CMatrix) -> CMatrix {
    assert_eq!(
        top.ncols(),
        bottom.ncols(),
        "cannot stack {}x{} on {}x{}",
        top.nrows(),
        top.ncols(),
        bottom.nrows(),
        bottom.ncols()
    );
    let mut out = CMatrix::zeros(top.nrows() + bottom.nrows(), top.ncols());
    out.view_mut((0, 0), top.shape()).copy_from(top);
    out.view_mut((top.nrows(), 0), bottom.shape()).copy_from(bottom);
    out
}

/// `A X A^H`, hermitized.
pub fn congruence(a: &CMatrix, x: &CMatrix) -> CMatrix {
    hermitize(&(a * x * a.adjoint()))
}

// ---------------------------------------------------------------------------
// Eigendecomposition
// ---------------------------------------------------------------------------

/// Eigendecomposition of a Hermitian matrix.
///
/// The input is hermitized first, so the eigenvalues are always real.
///
/// # Panics
/// Panics if `m` is not square.
pub fn hermitian_eigen(m: &CMatrix) -> EigenResult {
    assert!(m.is_square(), "hermitian_eigen requires a square matrix");
    let eig = SymmetricEigen::new(hermitize(m));
    EigenResult {
        eigenvalues: eig.eigenvalues,
        eigenvectors: eig.eigenvectors,
    }
}

/// Returns `true` if every eigenvalue is strictly above `tol`.
pub fn is_positive_definite(m: &CMatrix, tol: f64) -> bool {
    m.is_square() && hermitian_eigen(m).min_eigenvalue() > tol
}

// ---------------------------------------------------------------------------
// Cholesky-based inverse and log-determinant
// ---------------------------------------------------------------------------

/// Largest allowed `|Im L_ii| / Re L_ii` of an accepted Cholesky pivot.
const PIVOT_PHASE_TOL: f64 = 1e-8;

/// Cholesky factor of a Hermitian positive-definite matrix.
///
/// Over complex scalars nalgebra takes the complex square root of every
/// pivot, so an indefinite matrix still factors: its failing pivot comes out
/// (nearly) imaginary. Each diagonal entry of `L` is therefore checked to be
/// real and clearly positive before the factor is used.
fn cholesky(m: &CMatrix, operation: &'static str) -> SecrecyResult<Cholesky<Complex, Dyn>> {
    if !m.is_square() || m.iter().any(|z| !z.re.is_finite() || !z.im.is_finite()) {
        return Err(SecrecyError::numerical(operation));
    }
    let chol = Cholesky::new(hermitize(m)).ok_or_else(|| SecrecyError::numerical(operation))?;

    let scale = m.diagonal().iter().map(|z| z.re.abs()).fold(0.0, f64::max);
    let floor = f64::EPSILON * scale.sqrt();
    let l = chol.l_dirty();
    let pivots_ok = (0..l.nrows()).all(|i| {
        let d = l[(i, i)];
        d.re > floor && d.im.abs() <= PIVOT_PHASE_TOL * d.re
    });
    if !pivots_ok {
        return Err(SecrecyError::numerical(operation));
    }
    Ok(chol)
}

/// Inverse of a Hermitian positive-definite matrix.
pub fn hpd_inverse(m: &CMatrix) -> SecrecyResult<CMatrix> {
    Ok(hermitize(&cholesky(m, "inverse")?.inverse()))
}

/// Natural-log determinant of a Hermitian positive-definite matrix.
///
/// Uses `log det A = 2 Σ ln L_ii` with `A = L L^H`, so a non-PD argument is
/// reported as an error rather than producing `NaN`.
pub fn hpd_log_det(m: &CMatrix) -> SecrecyResult<f64> {
    let chol = cholesky(m, "log-determinant")?;
    let l = chol.l_dirty();
    Ok(2.0 * (0..l.nrows()).map(|i| l[(i, i)].re.ln()).sum::<f64>())
}

// ---------------------------------------------------------------------------
// Matrix square roots
// ---------------------------------------------------------------------------

/// `A^{-1/2}` of a Hermitian positive-definite matrix.
pub fn hpd_inv_sqrt(m: &CMatrix) -> SecrecyResult<CMatrix> {
    let eig = hermitian_eigen(m);
    let min = eig.min_eigenvalue();
    if !(min > 0.0) || !min.is_finite() {
        return Err(SecrecyError::numerical("inverse square root"));
    }
    Ok(hermitize(&eig.reconstruct_with(|v| 1.0 / v.sqrt())))
}

// ===========================================================================
// Tests
// ===========================================================================
