//! # Outer Iterator
//!
//! Owns the transmit covariance `S` and the weighting matrix `Ω` and drives
//! the majorization loop over them:
//!
//! ```text
//!   Init ──step──► Iterating ──|Δf| ≤ ε──► Converged
//!                     │
//!                     └──cap / cancel / numerical──► Failed
//! ```
//!
//! Each step rebuilds the eavesdropper penalty
//! `Q = H_e^H (I + H_e S H_e^H)^{-1} H_e`, runs the inner solver from the
//! current `Ω`, commits its `(K, W)` as `(Ω, S)` and evaluates the outer
//! surrogate. The objective history starts with the value at `S = 0, Ω = I`,
//! which is zero.

use std::time::{Duration, Instant};

use crate::cancel::CancelToken;
use crate::config::SolverConfig;
use crate::convergence::ConvergenceTracker;
use crate::diagnostics::{DiagnosticSink, OuterIterationEvent};
use crate::inner::{InnerFixedPointSolver, InnerHooks};
use crate::linalg::{congruence, hermitize, hpd_inverse, stack_rows};
use crate::objective::outer_objective;
use crate::solver::SecrecySolution;
use crate::types::{matrix_ops, CMatrix, LoopStage, SecrecyError, SecrecyResult};

/// Lifecycle of an [`OuterIterator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OuterState {
    Init,
    Iterating,
    Converged,
    Failed,
}

/// Check channel shapes and the power budget before any iteration.
pub fn validate_problem(h_bob: &CMatrix, h_eve: &CMatrix, power: f64) -> SecrecyResult<()> {
    let empty = h_bob.is_empty() || h_eve.is_empty();
    if empty || h_bob.ncols() != h_eve.ncols() {
        return Err(SecrecyError::ShapeMismatch {
            bob: h_bob.shape(),
            eve: h_eve.shape(),
        });
    }
    if !(power.is_finite() && power > 0.0) {
        return Err(SecrecyError::InvalidPower(power));
    }
    Ok(())
}

/// Outer majorization loop with single-step control.
#[derive(Debug)]
pub struct OuterIterator {
    h_bar: CMatrix,
    h_eve: CMatrix,
    n_rx: usize,
    power: f64,
    config: SolverConfig,
    cancel: Option<CancelToken>,

    covariance: CMatrix,
    weighting: CMatrix,
    tracker: ConvergenceTracker,
    state: OuterState,
    failure: Option<SecrecyError>,
    inner_iterations: usize,
    started: Option<Instant>,
    elapsed: Duration,
}

impl OuterIterator {
    /// Set up the loop at `S = 0`, `Ω = I`.
    pub fn new(
        h_bob: &CMatrix,
        h_eve: &CMatrix,
        power: f64,
        config: SolverConfig,
    ) -> SecrecyResult<Self> {
        validate_problem(h_bob, h_eve, power)?;
        config.validate()?;

        let n_tx = h_bob.ncols();
        let h_bar = stack_rows(h_bob, h_eve);
        let n_total = h_bar.nrows();
        let tracker = ConvergenceTracker::seeded(
            LoopStage::Outer,
            config.tolerances.outer,
            config.limits.max_outer_iterations,
            0.0,
        );

        Ok(Self {
            h_bar,
            h_eve: h_eve.clone(),
            n_rx: h_bob.nrows(),
            power,
            config,
            cancel: None,
            covariance: matrix_ops::zeros(n_tx, n_tx),
            weighting: matrix_ops::identity(n_total),
            tracker,
            state: OuterState::Init,
            failure: None,
            inner_iterations: 0,
            started: None,
            elapsed: Duration::ZERO,
        })
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn state(&self) -> OuterState {
        self.state
    }

    /// Objective values so far, starting with the initial point.
    pub fn history(&self) -> &[f64] {
        self.tracker.history()
    }

    /// Current transmit covariance `S`.
    pub fn covariance(&self) -> &CMatrix {
        &self.covariance
    }

    /// Current weighting matrix `Ω`.
    pub fn weighting(&self) -> &CMatrix {
        &self.weighting
    }

    pub fn outer_iterations(&self) -> usize {
        self.tracker.iterations()
    }

    /// Inner iterations summed over all outer steps.
    pub fn inner_iterations(&self) -> usize {
        self.inner_iterations
    }

    /// Wall time spent stepping.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Perform one outer iteration.
    ///
    /// Stepping a converged iterator is a no-op; stepping a failed one
    /// returns the original error again.
    pub fn step(&mut self, sink: &mut dyn DiagnosticSink) -> SecrecyResult<OuterState> {
        match self.state {
            OuterState::Converged => return Ok(OuterState::Converged),
            OuterState::Failed => {
                let err = self
                    .failure
                    .clone()
                    .unwrap_or(SecrecyError::Cancelled { iteration: self.outer_iterations() });
                return Err(err);
            }
            OuterState::Init | OuterState::Iterating => {}
        }

        let started = *self.started.get_or_insert_with(Instant::now);
        self.state = OuterState::Iterating;
        let t = self.tracker.iterations();

        let result = self.advance(t, started, sink);
        self.elapsed = started.elapsed();
        match result {
            Ok(true) => self.state = OuterState::Converged,
            Ok(false) => {}
            Err(err) => {
                tracing::debug!(iteration = t, error = %err, "outer loop failed");
                self.state = OuterState::Failed;
                self.failure = Some(err.clone());
                return Err(err);
            }
        }
        Ok(self.state)
    }

    /// Step until converged or failed.
    pub fn run(&mut self, sink: &mut dyn DiagnosticSink) -> SecrecyResult<&CMatrix> {
        while self.step(sink)? != OuterState::Converged {}
        Ok(&self.covariance)
    }

    /// Consume the iterator into its result.
    pub fn into_solution(self) -> SecrecySolution {
        SecrecySolution {
            covariance: self.covariance,
            weighting: self.weighting,
            outer_iterations: self.tracker.iterations(),
            inner_iterations: self.inner_iterations,
            objective_history: self.tracker.into_history(),
            elapsed: self.elapsed,
        }
    }

    /// Returns whether the outer objective converged.
    fn advance(
        &mut self,
        t: usize,
        started: Instant,
        sink: &mut dyn DiagnosticSink,
    ) -> SecrecyResult<bool> {
        if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            return Err(SecrecyError::Cancelled { iteration: t });
        }
        let iteration_start = Instant::now();

        let q = self.eve_penalty().map_err(|e| e.in_outer(t))?;
        let inner = InnerFixedPointSolver::new(
            &self.h_bar,
            self.n_rx,
            self.power,
            &self.config.tolerances,
            &self.config.limits,
        );
        let hooks = InnerHooks {
            outer_iteration: t,
            cancel: self.cancel.as_ref(),
            sink: if self.config.emit_inner_events {
                Some(&mut *sink)
            } else {
                None
            },
        };
        let solution = inner
            .solve(&self.weighting, &q, hooks)
            .map_err(|e| e.in_outer(t))?;

        self.covariance = solution.covariance;
        self.weighting = solution.weighting;
        self.inner_iterations += solution.iterations;

        let objective = outer_objective(&self.h_bar, &self.weighting, &self.covariance, &self.h_eve)
            .map_err(|e| e.in_outer(t))?;
        let previous = self.tracker.last().unwrap_or(0.0);

        sink.outer_iteration(&OuterIterationEvent {
            iteration: t,
            elapsed: started.elapsed(),
            iteration_time: iteration_start.elapsed(),
            objective,
            objective_delta: (objective - previous).abs(),
            inner_iterations: solution.iterations,
        });

        let step = self.tracker.record(objective).map_err(|e| e.in_outer(t))?;
        Ok(step.converged)
    }

    /// `H_e^H (I + H_e S H_e^H)^{-1} H_e`
    fn eve_penalty(&self) -> SecrecyResult<CMatrix> {
        let eve_cov = matrix_ops::identity(self.h_eve.nrows()) + congruence(&self.h_eve, &self.covariance);
        let inv = hpd_inverse(&eve_cov)?;
        Ok(hermitize(&(self.h_eve.adjoint() * inv * &self.h_eve)))
    }
}
