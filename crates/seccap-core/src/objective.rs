//! Objective functions of the double-loop optimizer.
//!
//! Both loops judge convergence by how much a scalar objective moved:
//!
//! - the outer loop tracks the secrecy-rate surrogate
//!   `f(Ω, S) = log det(Ω + H̄ S H̄^H) − log det Ω − log det(I + H_e S H_e^H)`,
//! - the inner loop tracks the majorization bound `g(T, K) = tr(T K) − log det K`.
//!
//! All logarithms are natural, so values are in nats.

use crate::linalg::{congruence, hpd_log_det};
use crate::types::{matrix_ops, CMatrix, SecrecyResult};

/// Outer secrecy-rate surrogate in nats.
///
/// `h_bar` is the stacked channel `[H_b; H_e]`, `omega` the weighting matrix,
/// `cov` the transmit covariance and `h_eve` the eavesdropper channel.
pub fn outer_objective(
    h_bar: &CMatrix,
    omega: &CMatrix,
    cov: &CMatrix,
    h_eve: &CMatrix,
) -> SecrecyResult<f64> {
    let joint = omega + congruence(h_bar, cov);
    let eve = matrix_ops::identity(h_eve.nrows()) + congruence(h_eve, cov);
    Ok(hpd_log_det(&joint)? - hpd_log_det(omega)? - hpd_log_det(&eve)?)
}

/// Inner majorization bound `Re tr(T K) − log det K`.
pub fn inner_bound(t: &CMatrix, k: &CMatrix) -> SecrecyResult<f64> {
    Ok((t * k).trace().re - hpd_log_det(k)?)
}
