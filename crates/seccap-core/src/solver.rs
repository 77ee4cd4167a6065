//! # Secrecy Solver
//!
//! Entry points for computing a secrecy-optimal transmit covariance.
//!
//! [`compute_secrecy_covariance`] is the one-call form: default configuration,
//! optional tolerance overrides, covariance out. [`SecrecySolver`] exposes the
//! full result and lets the caller inject configuration, a diagnostic sink
//! and a cancellation token.
//!
//! ```rust
//! use seccap_core::diagnostics::RecordingSink;
//! use seccap_core::solver::SecrecySolver;
//! use seccap_core::types::matrix_ops::from_real;
//!
//! let bob = from_real(2, 2, &[0.6716, 0.8733, 0.2036, -1.5503]);
//! let eve = from_real(2, 2, &[-0.1206, -1.0593, 0.3814, -1.1734]);
//!
//! let mut sink = RecordingSink::new();
//! let solution = SecrecySolver::new()
//!     .with_sink(&mut sink)
//!     .solve(&bob, &eve, 1.0)
//!     .unwrap();
//!
//! assert!((solution.transmit_power() - 1.0).abs() < 1e-4);
//! assert_eq!(sink.outer_events().count(), solution.outer_iterations);
//! ```

use std::time::Duration;

use crate::cancel::CancelToken;
use crate::config::{SolverConfig, ToleranceOverrides, Tolerances};
use crate::diagnostics::{DiagnosticSink, TracingSink};
use crate::linalg::real_trace;
use crate::outer::OuterIterator;
use crate::types::{CMatrix, SecrecyResult};

/// Full result of a secrecy optimization.
#[derive(Debug, Clone)]
pub struct SecrecySolution {
    /// Optimal transmit covariance `S`
    pub covariance: CMatrix,
    /// Final weighting matrix `Ω`
    pub weighting: CMatrix,
    /// Outer surrogate per iteration, starting with the initial point (nats)
    pub objective_history: Vec<f64>,
    pub outer_iterations: usize,
    /// Inner iterations summed over all outer iterations
    pub inner_iterations: usize,
    pub elapsed: Duration,
}

impl SecrecySolution {
    /// Final value of the outer surrogate in nats.
    pub fn objective(&self) -> f64 {
        self.objective_history.last().copied().unwrap_or(0.0)
    }

    /// `tr S`
    pub fn transmit_power(&self) -> f64 {
        real_trace(&self.covariance)
    }
}

/// Configurable secrecy optimizer.
pub struct SecrecySolver<'s> {
    config: SolverConfig,
    sink: Box<dyn DiagnosticSink + 's>,
    cancel: Option<CancelToken>,
}

impl Default for SecrecySolver<'_> {
    fn default() -> Self {
        Self {
            config: SolverConfig::default(),
            sink: Box::new(TracingSink),
            cancel: None,
        }
    }
}

impl std::fmt::Debug for SecrecySolver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecrecySolver")
            .field("config", &self.config)
            .field("cancel", &self.cancel)
            .finish_non_exhaustive()
    }
}

impl<'s> SecrecySolver<'s> {
    /// Solver with default configuration reporting through `tracing`.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: SolverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_tolerances(mut self, tolerances: Tolerances) -> Self {
        self.config.tolerances = tolerances;
        self
    }

    /// Replace the diagnostic sink. Pass `&mut sink` to keep ownership.
    pub fn with_sink(mut self, sink: impl DiagnosticSink + 's) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Compute the secrecy-optimal covariance for `(h_bob, h_eve)` under the
    /// power budget `power`.
    pub fn solve(
        &mut self,
        h_bob: &CMatrix,
        h_eve: &CMatrix,
        power: f64,
    ) -> SecrecyResult<SecrecySolution> {
        let mut outer = OuterIterator::new(h_bob, h_eve, power, self.config.clone())?;
        if let Some(token) = &self.cancel {
            outer = outer.with_cancel_token(token.clone());
        }

        tracing::debug!(
            n_tx = h_bob.ncols(),
            n_rx = h_bob.nrows(),
            n_eve = h_eve.nrows(),
            power,
            "starting secrecy optimization"
        );
        outer.run(&mut *self.sink)?;

        let solution = outer.into_solution();
        tracing::debug!(
            outer_iterations = solution.outer_iterations,
            inner_iterations = solution.inner_iterations,
            objective = solution.objective(),
            elapsed_ms = solution.elapsed.as_secs_f64() * 1e3,
            "secrecy optimization converged"
        );
        Ok(solution)
    }
}

/// Secrecy-optimal transmit covariance with default settings.
///
/// `overrides` replaces individual convergence tolerances. Progress is
/// reported through `tracing`.
pub fn compute_secrecy_covariance(
    h_bob: &CMatrix,
    h_eve: &CMatrix,
    power: f64,
    overrides: Option<ToleranceOverrides>,
) -> SecrecyResult<CMatrix> {
    let mut config = SolverConfig::default();
    if let Some(overrides) = overrides {
        config.tolerances.apply(&overrides);
    }
    let solution = SecrecySolver::new().with_config(config).solve(h_bob, h_eve, power)?;
    Ok(solution.covariance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{NullSink, RecordingSink};
    use crate::linalg::{hermitian_eigen, is_hermitian};
    use crate::rate::{bob_only_covariance, secrecy_rate, RateUnit};
    use crate::types::matrix_ops::{from_real, zeros};
    use crate::types::SecrecyError;
    use approx::assert_abs_diff_eq;

    /// Seeded 2x2x2 real Gaussian channel and its optimum at `P = 1`.
    fn reference_channel() -> (CMatrix, CMatrix) {
        let bob = from_real(2, 2, &[0.6716, 0.8733, 0.2036, -1.5503]);
        let eve = from_real(2, 2, &[-0.1206, -1.0593, 0.3814, -1.1734]);
        (bob, eve)
    }

    /// Secrecy capacity of the reference channel at `P = 1`, from an
    /// exhaustive search over `S = [[a, c], [c*, 1 − a]]` with
    /// `|c|² ≤ a(1 − a)`: a 61 x 121 grid on `(a, c / √(a(1 − a)))` refined by
    /// step-halving coordinate ascent. The optimum is rank one.
    const CAPACITY_NATS: f64 = 0.49202066119524407;

    /// Gap between the returned covariance and capacity allowed by the
    /// default inner tolerance.
    const RATE_GAP: f64 = 2e-4;

    fn max_abs_diff(a: &CMatrix, b: &CMatrix) -> f64 {
        (a - b).iter().map(|z| z.norm()).fold(0.0, f64::max)
    }

    #[test]
    fn test_reference_channel() {
        let (bob, eve) = reference_channel();
        let solution = SecrecySolver::new()
            .with_sink(NullSink)
            .solve(&bob, &eve, 1.0)
            .unwrap();

        assert!(solution.outer_iterations <= 50);
        assert_abs_diff_eq!(solution.transmit_power(), 1.0, epsilon = 1e-4);
        assert!(is_hermitian(&solution.covariance, 1e-10));
        assert!(hermitian_eigen(&solution.covariance).min_eigenvalue() >= -1e-8);

        let rate = secrecy_rate(&bob, &eve, &solution.covariance, RateUnit::Nats).unwrap();
        assert!(rate <= CAPACITY_NATS + 1e-9, "rate {rate} above capacity");
        assert!(CAPACITY_NATS - rate < RATE_GAP, "rate {rate} too far below capacity");

        let bits = secrecy_rate(&bob, &eve, &solution.covariance, RateUnit::Bits).unwrap();
        assert_abs_diff_eq!(bits, RateUnit::Bits.from_nats(rate), epsilon = 1e-12);

        // Nearly rank one along the dominant secrecy direction
        assert_abs_diff_eq!(solution.covariance[(0, 0)].re, 0.79393918, epsilon = 1e-2);
        assert_abs_diff_eq!(solution.covariance[(0, 1)].re, 0.40417633, epsilon = 1e-2);
    }

    #[test]
    fn test_solution_bookkeeping() {
        let (bob, eve) = reference_channel();
        let mut sink = RecordingSink::new();
        let solution = SecrecySolver::new()
            .with_sink(&mut sink)
            .solve(&bob, &eve, 1.0)
            .unwrap();

        assert_eq!(solution.objective_history[0], 0.0);
        assert_eq!(solution.objective_history.len(), solution.outer_iterations + 1);
        assert!(solution.inner_iterations >= solution.outer_iterations);
        assert_eq!(sink.outer_events().count(), solution.outer_iterations);
        assert_eq!(sink.inner_events().count(), 0);

        // The surrogate bounds the rate of the returned covariance from above
        // and converges to capacity itself
        let rate = secrecy_rate(&bob, &eve, &solution.covariance, RateUnit::Nats).unwrap();
        assert!(solution.objective() >= rate - 1e-9);
        assert!(solution.objective() - rate < RATE_GAP);
        assert_abs_diff_eq!(solution.objective(), CAPACITY_NATS, epsilon = 1e-6);
    }

    #[test]
    fn test_no_eavesdropper_matches_waterfilling() {
        let (bob, _) = reference_channel();
        let eve = zeros(2, 2);
        let covariance = compute_secrecy_covariance(&bob, &eve, 1.0, None).unwrap();

        let expected = bob_only_covariance(&bob, 1.0);
        assert!(
            max_abs_diff(&covariance, &expected) < 1e-4,
            "got {covariance}, expected {expected}"
        );
        assert_abs_diff_eq!(
            secrecy_rate(&bob, &eve, &covariance, RateUnit::Nats).unwrap(),
            1.433475888324303,
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_high_power_channel() {
        let bob = from_real(2, 2, &[0.77, -0.3, -0.32, -0.64]);
        let eve = from_real(2, 2, &[0.54, -0.11, -0.93, -1.71]);
        let solution = SecrecySolver::new()
            .with_sink(NullSink)
            .solve(&bob, &eve, 10.0)
            .unwrap();

        assert_abs_diff_eq!(solution.transmit_power(), 10.0, epsilon = 1e-3);
        // Capacity 0.7177673078 nats from the same exhaustive search
        let rate = secrecy_rate(&bob, &eve, &solution.covariance, RateUnit::Nats).unwrap();
        assert!(rate <= 0.7177673078 + 1e-9);
        assert_abs_diff_eq!(rate, 0.7177673078, epsilon = 1e-3);
    }

    #[test]
    fn test_deterministic() {
        let (bob, eve) = reference_channel();
        let a = compute_secrecy_covariance(&bob, &eve, 1.0, None).unwrap();
        let b = compute_secrecy_covariance(&bob, &eve, 1.0, None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_tolerance_overrides() {
        let (bob, eve) = reference_channel();
        let loose = ToleranceOverrides {
            outer: Some(1e-2),
            ..ToleranceOverrides::default()
        };
        let mut sink = RecordingSink::new();
        let config = SolverConfig::default().with_overrides(&loose);
        let solution = SecrecySolver::new()
            .with_config(config)
            .with_sink(&mut sink)
            .solve(&bob, &eve, 1.0)
            .unwrap();
        assert!(solution.outer_iterations < 8);

        let bad = ToleranceOverrides {
            inner: Some(0.0),
            ..ToleranceOverrides::default()
        };
        assert!(matches!(
            compute_secrecy_covariance(&bob, &eve, 1.0, Some(bad)),
            Err(SecrecyError::Config(_))
        ));
    }

    #[test]
    fn test_input_errors() {
        let (bob, _) = reference_channel();
        assert!(matches!(
            compute_secrecy_covariance(&bob, &zeros(2, 3), 1.0, None),
            Err(SecrecyError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            compute_secrecy_covariance(&bob, &bob, -2.0, None),
            Err(SecrecyError::InvalidPower(p)) if p == -2.0
        ));
    }

    #[test]
    fn test_cancelled_solver() {
        let (bob, eve) = reference_channel();
        let token = CancelToken::new();
        token.cancel();
        let err = SecrecySolver::new()
            .with_sink(NullSink)
            .with_cancel_token(token)
            .solve(&bob, &eve, 1.0)
            .unwrap_err();
        assert!(matches!(err, SecrecyError::Cancelled { iteration: 0 }));
    }
}
