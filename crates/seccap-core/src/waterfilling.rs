//! # Water-Filling Power Allocation
//!
//! Two flavours of water-filling live here:
//!
//! - The classic scalar algorithm over parallel channels ([`waterfill`]),
//!   which gives the optimal covariance when there is no eavesdropper.
//! - The generalized matrix projector used inside the secrecy optimizer
//!   ([`WaterfillingProjector`]). For a weighting matrix `K` and a penalty `Q`
//!   it finds the covariance `W` maximizing
//!   `log det(I + H̄^H K^{-1} H̄ W) − tr(Q W)` subject to `tr(W) ≤ P`.
//!
//! The projector bisects on the dual variable `μ` of the power constraint.
//! For fixed `μ` the optimum is a water-filling over the generalized
//! eigenvalues of `(H̄^H K^{-1} H̄, μI + Q)`:
//!
//! ```text
//!   M     = μI + Q
//!   A     = M^{-1/2} H̄^H K^{-1} H̄ M^{-1/2} = V diag(λ) V^H
//!   W(μ)  = M^{-1/2} V diag(max(1 − 1/λ_i, 0)) V^H M^{-1/2}
//! ```
//!
//! `tr W(μ)` is non-increasing in `μ`, so the bracket `[0, n_tx / P]` can be
//! halved until it is narrower than the bisection tolerance.
//!
//! # Example
//!
//! ```rust
//! use seccap_core::waterfilling::waterfill;
//!
//! // Level 1.15 over the two strong modes; the weak one stays dry
//! let powers = waterfill(&[10.0, 5.0, 0.01], 2.0);
//! assert!((powers[0] - 1.05).abs() < 1e-12);
//! assert!((powers[1] - 0.95).abs() < 1e-12);
//! assert_eq!(powers[2], 0.0);
//! ```

use crate::linalg::{hermitian_eigen, hermitize, hpd_inv_sqrt, hpd_inverse, real_trace};
use crate::types::{matrix_ops, CMatrix, LoopStage, SecrecyError, SecrecyResult};

/// Water-filling of `power` over parallel unit-noise modes.
///
/// Mode `i` with gain `g_i` receives `max(ν − 1/g_i, 0)`, where the water
/// level `ν` makes the allocations sum to `power`. Modes with non-positive
/// gain receive nothing, as does every mode when `power` is not positive.
pub fn waterfill(gains: &[f64], power: f64) -> Vec<f64> {
    let mut allocation = vec![0.0; gains.len()];
    if !(power > 0.0) {
        return allocation;
    }

    let mut order: Vec<usize> = (0..gains.len()).filter(|&i| gains[i] > 0.0).collect();
    order.sort_by(|&a, &b| gains[b].total_cmp(&gains[a]));

    // Strongest modes first: grow the wet set while the level stays above
    // the next mode's floor 1/g
    let mut level = 0.0;
    let mut floor_sum = 0.0;
    let mut wet = 0;
    for (count, &i) in order.iter().enumerate() {
        let floor = 1.0 / gains[i];
        let candidate = (power + floor_sum + floor) / (count + 1) as f64;
        if candidate <= floor {
            break;
        }
        floor_sum += floor;
        level = candidate;
        wet = count + 1;
    }

    for &i in &order[..wet] {
        allocation[i] = level - 1.0 / gains[i];
    }
    allocation
}

// ---------------------------------------------------------------------------
// Generalized projector
// ---------------------------------------------------------------------------

/// Output of one projection.
#[derive(Debug, Clone)]
pub struct Projection {
    /// Power-feasible covariance `W`.
    pub covariance: CMatrix,
    /// Dual variable at which `covariance` was evaluated.
    pub dual: f64,
    /// Bisection steps taken.
    pub steps: usize,
}

/// Power-constrained generalized water-filling over a fixed stacked channel.
#[derive(Debug, Clone)]
pub struct WaterfillingProjector<'a> {
    h_bar: &'a CMatrix,
    power: f64,
    tolerance: f64,
    max_steps: usize,
}

impl<'a> WaterfillingProjector<'a> {
    /// Create a projector for the stacked channel `h_bar` and power budget.
    ///
    /// `tolerance` is the final width of the dual bracket and `max_steps`
    /// caps the number of bisection steps.
    pub fn new(h_bar: &'a CMatrix, power: f64, tolerance: f64, max_steps: usize) -> Self {
        Self {
            h_bar,
            power,
            tolerance,
            max_steps,
        }
    }

    /// Number of transmit antennas.
    pub fn n_tx(&self) -> usize {
        self.h_bar.ncols()
    }

    pub fn power(&self) -> f64 {
        self.power
    }

    /// Find the covariance maximizing the generalized objective for the
    /// weighting matrix `k` and penalty `q` under the power budget.
    ///
    /// The returned covariance is the last bisection iterate on the feasible
    /// side of the bracket, so `tr W ≤ P` holds exactly.
    pub fn project(&self, k: &CMatrix, q: &CMatrix) -> SecrecyResult<Projection> {
        let n_tx = self.n_tx();
        debug_assert_eq!(q.shape(), (n_tx, n_tx), "penalty must be n_tx x n_tx");

        let mut lo = 0.0_f64;
        let mut hi = n_tx as f64 / self.power;
        if !hi.is_finite() {
            // Budget too small to represent: nothing can be transmitted
            return Ok(Projection {
                covariance: matrix_ops::zeros(n_tx, n_tx),
                dual: f64::INFINITY,
                steps: 0,
            });
        }

        let gram = self.channel_gram(k)?;
        let mut feasible: Option<(CMatrix, f64)> = None;
        let mut steps = 0;

        while hi - lo > self.tolerance {
            let mu = lo + 0.5 * (hi - lo);
            if mu <= lo || mu >= hi {
                break;
            }
            if steps == self.max_steps {
                return Err(SecrecyError::Convergence {
                    stage: LoopStage::Bisection,
                    iterations: steps,
                    last_objective: hi - lo,
                });
            }
            steps += 1;

            let w = covariance_at_dual(&gram, q, mu)?;
            if real_trace(&w) > self.power {
                lo = mu;
            } else {
                hi = mu;
                feasible = Some((w, mu));
            }
        }

        let (covariance, dual) = match feasible {
            Some(found) => found,
            None => (covariance_at_dual(&gram, q, hi)?, hi),
        };
        Ok(Projection {
            covariance,
            dual,
            steps,
        })
    }

    /// `tr W(μ)` for a fixed dual variable.
    pub fn trace_at_dual(&self, k: &CMatrix, q: &CMatrix, mu: f64) -> SecrecyResult<f64> {
        let gram = self.channel_gram(k)?;
        Ok(real_trace(&covariance_at_dual(&gram, q, mu)?))
    }

    /// `H̄^H K^{-1} H̄`
    fn channel_gram(&self, k: &CMatrix) -> SecrecyResult<CMatrix> {
        let k_inv = hpd_inverse(k)?;
        Ok(hermitize(&(self.h_bar.adjoint() * k_inv * self.h_bar)))
    }
}

/// Water-filling solution `W(μ)` for `M = μI + Q`.
fn covariance_at_dual(gram: &CMatrix, q: &CMatrix, mu: f64) -> SecrecyResult<CMatrix> {
    let n = q.nrows();
    let m = q + matrix_ops::scaled(&matrix_ops::identity(n), mu);
    let m_inv_sqrt = hpd_inv_sqrt(&m)?;

    let eig = hermitian_eigen(&(&m_inv_sqrt * gram * &m_inv_sqrt));
    let filled = eig.reconstruct_with(|lambda| {
        if lambda > 1.0 {
            1.0 - 1.0 / lambda
        } else {
            0.0
        }
    });
    Ok(hermitize(&(&m_inv_sqrt * filled * &m_inv_sqrt)))
}
