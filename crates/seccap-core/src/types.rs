//! Core types for the secrecy capacity optimizer
//!
//! This module defines the matrix representation shared by every stage of the
//! optimizer and the error taxonomy surfaced to callers.
//!
//! ## Matrices
//!
//! All channel, covariance and weighting matrices are dense complex matrices.
//! A wiretap channel is described by two of them:
//!
//! ```text
//!                 H_b (n_rx x n_tx)
//!   Alice ───────────────────────────►  Bob
//!     │
//!     │           H_e (n_eve x n_tx)
//!     └──────────────────────────────►  Eve
//! ```
//!
//! Both share the transmit dimension `n_tx`; the optimizer stacks them into
//! `H̄ = [H_b; H_e]` with `n_rx + n_eve` rows.

use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::ConfigError;

/// Type alias for complex numbers using f64 precision
pub type Complex = Complex64;

/// Dense complex matrix (channels, covariances, weighting matrices)
pub type CMatrix = DMatrix<Complex64>;

/// Dense real vector (eigenvalues)
pub type RVector = DVector<f64>;

/// Result type for optimizer operations
pub type SecrecyResult<T> = Result<T, SecrecyError>;

/// Loop level at which an iteration cap was hit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopStage {
    /// Outer majorization loop over `(S, Ω)`
    Outer,
    /// Inner fixed-point loop over `K`
    Inner,
    /// Dual-variable bisection inside the water-filling projector
    Bisection,
}

impl fmt::Display for LoopStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopStage::Outer => write!(f, "outer"),
            LoopStage::Inner => write!(f, "inner"),
            LoopStage::Bisection => write!(f, "bisection"),
        }
    }
}

/// Position inside the nested loops where a numerical failure happened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IterationContext {
    pub outer: Option<usize>,
    pub inner: Option<usize>,
}

impl fmt::Display for IterationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.outer, self.inner) {
            (Some(t), Some(n)) => write!(f, "outer iteration {t}, inner iteration {n}"),
            (Some(t), None) => write!(f, "outer iteration {t}"),
            (None, Some(n)) => write!(f, "inner iteration {n}"),
            (None, None) => write!(f, "outside the iteration loops"),
        }
    }
}

/// Errors that can occur while computing a secrecy-optimal covariance
#[derive(Debug, Clone, thiserror::Error)]
pub enum SecrecyError {
    #[error(
        "Channel shape mismatch: Bob is {}x{}, Eve is {}x{}; both need the same non-zero number of transmit antennas",
        .bob.0, .bob.1, .eve.0, .eve.1
    )]
    ShapeMismatch {
        bob: (usize, usize),
        eve: (usize, usize),
    },

    #[error("Invalid power budget: {0}. Must be finite and positive")]
    InvalidPower(f64),

    #[error("Numerical failure in {operation} ({context}): matrix is not positive definite")]
    Numerical {
        operation: &'static str,
        context: IterationContext,
    },

    #[error("{stage} loop did not converge after {iterations} iterations (last objective {last_objective:.6e})")]
    Convergence {
        stage: LoopStage,
        iterations: usize,
        last_objective: f64,
    },

    #[error("Optimization cancelled at outer iteration {iteration}")]
    Cancelled { iteration: usize },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl SecrecyError {
    /// Numerical failure with no iteration context yet.
    pub fn numerical(operation: &'static str) -> Self {
        SecrecyError::Numerical {
            operation,
            context: IterationContext::default(),
        }
    }

    /// Attach the outer iteration index to a numerical failure.
    ///
    /// Context already recorded closer to the failure is kept.
    pub fn in_outer(mut self, iteration: usize) -> Self {
        if let SecrecyError::Numerical { context, .. } = &mut self {
            context.outer.get_or_insert(iteration);
        }
        self
    }

    /// Attach the inner iteration index to a numerical failure.
    pub fn in_inner(mut self, iteration: usize) -> Self {
        if let SecrecyError::Numerical { context, .. } = &mut self {
            context.inner.get_or_insert(iteration);
        }
        self
    }
}

/// Helper functions for building complex matrices
pub mod matrix_ops {
    use super::*;

    /// Complex identity matrix of size `n`
    #[inline]
    pub fn identity(n: usize) -> CMatrix {
        CMatrix::identity(n, n)
    }

    /// Complex zero matrix
    #[inline]
    pub fn zeros(rows: usize, cols: usize) -> CMatrix {
        CMatrix::zeros(rows, cols)
    }

    /// Lift a real row-major slice into a complex matrix
    ///
    /// # Panics
    /// Panics if `data.len() != rows * cols`.
    pub fn from_real(rows: usize, cols: usize, data: &[f64]) -> CMatrix {
        assert_eq!(
            data.len(),
            rows * cols,
            "data length {} != rows*cols {}",
            data.len(),
            rows * cols
        );
        CMatrix::from_fn(rows, cols, |r, c| Complex::new(data[r * cols + c], 0.0))
    }

    /// Build a complex matrix from row-major `(re, im)` pairs
    pub fn from_parts(rows: usize, cols: usize, data: &[(f64, f64)]) -> CMatrix {
        assert_eq!(data.len(), rows * cols, "data length != rows*cols");
        CMatrix::from_fn(rows, cols, |r, c| {
            let (re, im) = data[r * cols + c];
            Complex::new(re, im)
        })
    }

    /// Diagonal complex matrix from real entries
    pub fn real_diagonal(values: &RVector) -> CMatrix {
        CMatrix::from_diagonal(&values.map(|v| Complex::new(v, 0.0)))
    }

    /// Multiply every entry by a real scalar
    #[inline]
    pub fn scaled(m: &CMatrix, factor: f64) -> CMatrix {
        m.map(|z| z * factor)
    }
}
