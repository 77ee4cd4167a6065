//! # Inner Fixed-Point Solver
//!
//! For a fixed eavesdropper penalty `Q` the inner loop alternates two steps
//! until the majorization bound `g(T, K) = tr(T K) − log det K` settles:
//!
//! ```text
//!   W  = project(K, Q)                     generalized water-filling
//!   T  = (K + H̄ W H̄^H)^{-1}
//!   T̄  = T[n_rx.., ..n_rx]                 (n_eve x n_rx)
//!   T̄ T̄^H = U diag(ρ) U^H
//!   B  = −U diag(2 / (1 + √(1 + 4ρ))) U^H T̄
//!   K  = [[I, B^H], [B, I]]
//! ```
//!
//! The weighting matrix keeps identity diagonal blocks by construction; only
//! the off-diagonal block `B` is updated.

use crate::cancel::CancelToken;
use crate::config::{IterationLimits, Tolerances};
use crate::convergence::ConvergenceTracker;
use crate::diagnostics::{DiagnosticSink, InnerIterationEvent};
use crate::linalg::{congruence, hermitian_eigen, hpd_inverse};
use crate::objective::inner_bound;
use crate::types::{matrix_ops, CMatrix, LoopStage, SecrecyError, SecrecyResult};
use crate::waterfilling::WaterfillingProjector;

/// Result of one inner solve.
#[derive(Debug, Clone)]
pub struct InnerSolution {
    /// Final weighting matrix `K`
    pub weighting: CMatrix,
    /// Covariance `W` from the last projection
    pub covariance: CMatrix,
    /// Bound value after every iteration
    pub bound_history: Vec<f64>,
    pub iterations: usize,
}

/// Per-call hooks: where to report and when to stop early.
#[derive(Default)]
pub struct InnerHooks<'s> {
    /// Index of the enclosing outer iteration, used for events and errors
    pub outer_iteration: usize,
    pub cancel: Option<&'s CancelToken>,
    pub sink: Option<&'s mut dyn DiagnosticSink>,
}

/// Majorization-minimization loop over the weighting matrix.
#[derive(Debug, Clone)]
pub struct InnerFixedPointSolver<'a> {
    h_bar: &'a CMatrix,
    n_rx: usize,
    projector: WaterfillingProjector<'a>,
    tolerance: f64,
    max_iterations: usize,
}

impl<'a> InnerFixedPointSolver<'a> {
    /// `h_bar` is the stacked channel whose first `n_rx` rows belong to Bob.
    pub fn new(
        h_bar: &'a CMatrix,
        n_rx: usize,
        power: f64,
        tolerances: &Tolerances,
        limits: &IterationLimits,
    ) -> Self {
        Self {
            h_bar,
            n_rx,
            projector: WaterfillingProjector::new(
                h_bar,
                power,
                tolerances.bisection,
                limits.max_bisection_steps,
            ),
            tolerance: tolerances.inner,
            max_iterations: limits.max_inner_iterations,
        }
    }

    fn n_eve(&self) -> usize {
        self.h_bar.nrows() - self.n_rx
    }

    /// Run the fixed-point loop from the weighting matrix `k0`.
    pub fn solve(
        &self,
        k0: &CMatrix,
        q: &CMatrix,
        mut hooks: InnerHooks<'_>,
    ) -> SecrecyResult<InnerSolution> {
        let mut tracker = ConvergenceTracker::new(LoopStage::Inner, self.tolerance, self.max_iterations);
        let mut k = k0.clone();

        loop {
            let n = tracker.iterations();
            if hooks.cancel.is_some_and(CancelToken::is_cancelled) {
                return Err(SecrecyError::Cancelled {
                    iteration: hooks.outer_iteration,
                });
            }

            let (k_next, w, t) = self.update(&k, q).map_err(|e| e.in_inner(n))?;
            let bound = inner_bound(&t, &k_next).map_err(|e| e.in_inner(n))?;
            k = k_next;

            let step = tracker.record(bound).map_err(|e| e.in_inner(n))?;
            if let Some(sink) = hooks.sink.as_deref_mut() {
                sink.inner_iteration(&InnerIterationEvent {
                    outer_iteration: hooks.outer_iteration,
                    iteration: n,
                    bound,
                    bound_delta: step.delta,
                });
            }

            if step.converged {
                return Ok(InnerSolution {
                    weighting: k,
                    covariance: w,
                    iterations: tracker.iterations(),
                    bound_history: tracker.into_history(),
                });
            }
        }
    }

    /// One fixed-point step: returns `(K_next, W, T)`.
    fn update(&self, k: &CMatrix, q: &CMatrix) -> SecrecyResult<(CMatrix, CMatrix, CMatrix)> {
        let w = self.projector.project(k, q)?.covariance;
        let t = hpd_inverse(&(k + congruence(self.h_bar, &w)))?;

        let t_bar = t
            .view((self.n_rx, 0), (self.n_eve(), self.n_rx))
            .clone_owned();
        let eig = hermitian_eigen(&(&t_bar * t_bar.adjoint()));
        let delta = eig.reconstruct_with(|rho| 2.0 / (1.0 + (1.0 + 4.0 * rho.max(0.0)).sqrt()));
        let b = -(delta * &t_bar);

        Ok((weighting_matrix(&b), w, t))
    }
}

/// `[[I, B^H], [B, I]]` for an `n_eve x n_rx` block `B`.
pub fn weighting_matrix(b: &CMatrix) -> CMatrix {
    let (n_eve, n_rx) = b.shape();
    let mut k = matrix_ops::identity(n_rx + n_eve);
    k.view_mut((n_rx, 0), (n_eve, n_rx)).copy_from(b);
    k.view_mut((0, n_rx), (n_rx, n_eve)).copy_from(&b.adjoint());
    k
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::RecordingSink;
    use crate::linalg::{hermitian_eigen, is_hermitian, is_positive_definite, real_trace, stack_rows};
    use crate::types::matrix_ops::{from_parts, from_real, identity, zeros};
    use crate::types::Complex;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal};

    fn reference_channel() -> (CMatrix, CMatrix) {
        let bob = from_real(2, 2, &[0.6716, 0.8733, 0.2036, -1.5503]);
        let eve = from_real(2, 2, &[-0.1206, -1.0593, 0.3814, -1.1734]);
        (bob, eve)
    }

    fn max_block_deviation(k: &CMatrix, n_rx: usize) -> f64 {
        let n_eve = k.nrows() - n_rx;
        let top = k.view((0, 0), (n_rx, n_rx)).clone_owned() - identity(n_rx);
        let bottom = k.view((n_rx, n_rx), (n_eve, n_eve)).clone_owned() - identity(n_eve);
        top.iter()
            .chain(bottom.iter())
            .map(|z| z.norm())
            .fold(0.0, f64::max)
    }

    #[test]
    fn test_weighting_matrix_layout() {
        let b = from_parts(1, 2, &[(0.1, 0.2), (-0.3, 0.0)]);
        let k = weighting_matrix(&b);
        assert_eq!(k.shape(), (3, 3));
        assert_eq!(k[(2, 0)], Complex::new(0.1, 0.2));
        assert_eq!(k[(0, 2)], Complex::new(0.1, -0.2));
        assert_eq!(k[(1, 2)], Complex::new(-0.3, 0.0));
        assert!(is_hermitian(&k, 0.0));
        assert_eq!(max_block_deviation(&k, 2), 0.0);
    }

    #[test]
    fn test_converges_with_structured_weighting() {
        let (bob, eve) = reference_channel();
        let h_bar = stack_rows(&bob, &eve);
        let solver = InnerFixedPointSolver::new(
            &h_bar,
            2,
            1.0,
            &Tolerances::default(),
            &IterationLimits::default(),
        );

        let solution = solver
            .solve(&identity(4), &zeros(2, 2), InnerHooks::default())
            .unwrap();

        assert!(solution.iterations >= 1);
        assert_eq!(solution.bound_history.len(), solution.iterations);
        assert!(is_hermitian(&solution.weighting, 1e-12));
        assert!(max_block_deviation(&solution.weighting, 2) < 1e-8);
        assert!(is_positive_definite(&solution.weighting, 0.0));
        assert!(real_trace(&solution.covariance) <= 1.0 + 1e-8);
    }

    #[test]
    fn test_random_complex_channel_keeps_structure() {
        let mut rng = StdRng::seed_from_u64(2024);
        let normal = Normal::new(0.0, std::f64::consts::FRAC_1_SQRT_2).unwrap();
        let mut sample = |rows, cols| {
            CMatrix::from_fn(rows, cols, |_, _| {
                Complex::new(normal.sample(&mut rng), normal.sample(&mut rng))
            })
        };
        let bob = sample(2, 2);
        let eve = sample(2, 2);
        let h_bar = stack_rows(&bob, &eve);

        // Penalty of the eavesdropper at S = 0
        let q = eve.adjoint() * &eve;
        let solver = InnerFixedPointSolver::new(
            &h_bar,
            2,
            1.0,
            &Tolerances::default(),
            &IterationLimits::default(),
        );
        let mut sink = RecordingSink::new();
        let solution = solver
            .solve(
                &identity(4),
                &q,
                InnerHooks {
                    outer_iteration: 4,
                    cancel: None,
                    sink: Some(&mut sink),
                },
            )
            .unwrap();

        assert!(is_hermitian(&solution.weighting, 1e-12));
        assert!(max_block_deviation(&solution.weighting, 2) < 1e-8);

        let events: Vec<_> = sink.inner_events().collect();
        assert_eq!(events.len(), solution.iterations);
        assert!(events.iter().all(|e| e.outer_iteration == 4));
        assert_eq!(events.last().unwrap().bound, *solution.bound_history.last().unwrap());
    }

    #[test]
    fn test_every_update_keeps_structure() {
        let mut rng = StdRng::seed_from_u64(11);
        let normal = Normal::new(0.0, std::f64::consts::FRAC_1_SQRT_2).unwrap();
        let mut sample = |rows, cols| {
            CMatrix::from_fn(rows, cols, |_, _| {
                Complex::new(normal.sample(&mut rng), normal.sample(&mut rng))
            })
        };
        let (n_tx, n_rx, n_eve) = (3, 2, 3);
        let bob = sample(n_rx, n_tx);
        let eve = sample(n_eve, n_tx);
        let h_bar = stack_rows(&bob, &eve);
        let q = eve.adjoint() * &eve;
        let solver = InnerFixedPointSolver::new(
            &h_bar,
            n_rx,
            10.0,
            &Tolerances::default(),
            &IterationLimits::default(),
        );

        let mut k = identity(n_rx + n_eve);
        for step in 0..40 {
            let (k_next, w, t) = solver.update(&k, &q).unwrap();
            assert!(is_hermitian(&k_next, 1e-12), "K not Hermitian at step {step}");
            assert!(max_block_deviation(&k_next, n_rx) < 1e-8, "diagonal blocks drifted at step {step}");
            assert!(is_positive_definite(&k_next, 0.0), "K indefinite at step {step}");

            assert!(is_hermitian(&w, 1e-10));
            assert!(real_trace(&w) <= 10.0 + 1e-8);
            assert!(hermitian_eigen(&w).min_eigenvalue() >= -1e-8);
            assert!(inner_bound(&t, &k_next).unwrap().is_finite());
            k = k_next;
        }
    }

    #[test]
    fn test_iteration_cap() {
        let (bob, eve) = reference_channel();
        let h_bar = stack_rows(&bob, &eve);
        let limits = IterationLimits {
            max_inner_iterations: 1,
            ..IterationLimits::default()
        };
        let solver = InnerFixedPointSolver::new(&h_bar, 2, 1.0, &Tolerances::default(), &limits);

        let err = solver
            .solve(&identity(4), &zeros(2, 2), InnerHooks::default())
            .unwrap_err();
        assert!(matches!(
            err,
            SecrecyError::Convergence {
                stage: LoopStage::Inner,
                iterations: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_cancellation_is_observed() {
        let (bob, eve) = reference_channel();
        let h_bar = stack_rows(&bob, &eve);
        let solver = InnerFixedPointSolver::new(
            &h_bar,
            2,
            1.0,
            &Tolerances::default(),
            &IterationLimits::default(),
        );
        let token = CancelToken::new();
        token.cancel();

        let err = solver
            .solve(
                &identity(4),
                &zeros(2, 2),
                InnerHooks {
                    outer_iteration: 3,
                    cancel: Some(&token),
                    sink: None,
                },
            )
            .unwrap_err();
        assert!(matches!(err, SecrecyError::Cancelled { iteration: 3 }));
    }

    #[test]
    fn test_singular_start_reports_inner_index() {
        let (bob, eve) = reference_channel();
        let h_bar = stack_rows(&bob, &eve);
        let solver = InnerFixedPointSolver::new(
            &h_bar,
            2,
            1.0,
            &Tolerances::default(),
            &IterationLimits::default(),
        );

        let err = solver
            .solve(&zeros(4, 4), &zeros(2, 2), InnerHooks::default())
            .unwrap_err();
        match err {
            SecrecyError::Numerical { context, .. } => assert_eq!(context.inner, Some(0)),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
