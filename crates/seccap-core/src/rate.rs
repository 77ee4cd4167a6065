//! Achievable rates of a covariance over the wiretap channel.
//!
//! ```text
//!   C_link(H, S) = log det(I + H S H^H)
//!   R_s(S)       = C_link(H_b, S) − C_link(H_e, S)
//! ```

use serde::{Deserialize, Serialize};
use std::f64::consts::LN_2;
use std::fmt;

use crate::linalg::{congruence, hermitian_eigen, hpd_log_det};
use crate::types::{matrix_ops, CMatrix, RVector, SecrecyResult};
use crate::waterfilling::waterfill;

/// Unit of information for reported rates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateUnit {
    /// Natural logarithm
    #[default]
    Nats,
    /// Base-2 logarithm
    Bits,
}

impl RateUnit {
    /// Convert a value in nats into this unit.
    pub fn from_nats(self, nats: f64) -> f64 {
        match self {
            RateUnit::Nats => nats,
            RateUnit::Bits => nats / LN_2,
        }
    }
}

impl fmt::Display for RateUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateUnit::Nats => write!(f, "nats"),
            RateUnit::Bits => write!(f, "bits"),
        }
    }
}

/// Mutual information of the link `h` for transmit covariance `cov`.
pub fn link_capacity(h: &CMatrix, cov: &CMatrix, unit: RateUnit) -> SecrecyResult<f64> {
    let received = matrix_ops::identity(h.nrows()) + congruence(h, cov);
    Ok(unit.from_nats(hpd_log_det(&received)?))
}

/// Secrecy rate of `cov`: Bob's rate minus Eve's.
///
/// Not clamped at zero, so a poor covariance shows up as a negative rate.
pub fn secrecy_rate(
    h_bob: &CMatrix,
    h_eve: &CMatrix,
    cov: &CMatrix,
    unit: RateUnit,
) -> SecrecyResult<f64> {
    Ok(link_capacity(h_bob, cov, unit)? - link_capacity(h_eve, cov, unit)?)
}

/// Capacity-achieving covariance of Bob's link alone.
///
/// Water-fills `power` over the eigenmodes of `H_b^H H_b` (unit noise). This
/// is the secrecy optimum when the eavesdropper's channel is zero.
pub fn bob_only_covariance(h_bob: &CMatrix, power: f64) -> CMatrix {
    let eig = hermitian_eigen(&(h_bob.adjoint() * h_bob));
    let gains: Vec<f64> = eig.eigenvalues.iter().copied().collect();
    let powers = waterfill(&gains, power);

    let v = &eig.eigenvectors;
    v * matrix_ops::real_diagonal(&RVector::from_vec(powers)) * v.adjoint()
}
