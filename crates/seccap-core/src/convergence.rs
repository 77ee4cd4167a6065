//! Convergence tracking with an explicit history and iteration cap.
//!
//! Both optimizer loops stop when their objective moves by at most a
//! tolerance between consecutive iterations. [`ConvergenceTracker`] records
//! every objective value so callers can inspect the whole sequence, and turns
//! an exhausted iteration budget into [`SecrecyError::Convergence`].

use crate::types::{LoopStage, SecrecyError, SecrecyResult};

/// Outcome of recording one objective value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvergenceStep {
    /// Absolute change from the previous value (`+inf` for the first one).
    pub delta: f64,
    /// `delta <= tolerance`.
    pub converged: bool,
}

/// Objective history of one loop.
#[derive(Debug, Clone)]
pub struct ConvergenceTracker {
    stage: LoopStage,
    tolerance: f64,
    max_iterations: usize,
    history: Vec<f64>,
    seeded: bool,
}

impl ConvergenceTracker {
    /// Create an empty tracker.
    pub fn new(stage: LoopStage, tolerance: f64, max_iterations: usize) -> Self {
        Self {
            stage,
            tolerance,
            max_iterations,
            history: Vec::new(),
            seeded: false,
        }
    }

    /// Create a tracker whose history starts at the objective of the initial
    /// point. The seed does not count as an iteration.
    pub fn seeded(stage: LoopStage, tolerance: f64, max_iterations: usize, initial: f64) -> Self {
        Self {
            history: vec![initial],
            seeded: true,
            ..Self::new(stage, tolerance, max_iterations)
        }
    }

    /// Record the objective reached by the iteration just completed.
    ///
    /// Fails with [`SecrecyError::Convergence`] when this iteration used up the
    /// budget without meeting the tolerance, and with a numerical error if the
    /// objective is not finite.
    pub fn record(&mut self, value: f64) -> SecrecyResult<ConvergenceStep> {
        if !value.is_finite() {
            return Err(SecrecyError::numerical("objective evaluation"));
        }
        let delta = self
            .history
            .last()
            .map_or(f64::INFINITY, |prev| (value - prev).abs());
        self.history.push(value);

        let converged = delta <= self.tolerance;
        if !converged && self.iterations() >= self.max_iterations {
            return Err(SecrecyError::Convergence {
                stage: self.stage,
                iterations: self.iterations(),
                last_objective: value,
            });
        }
        Ok(ConvergenceStep { delta, converged })
    }

    /// Number of recorded iterations (the seed excluded).
    pub fn iterations(&self) -> usize {
        self.history.len() - usize::from(self.seeded)
    }

    /// Every recorded value, the seed first if there is one.
    pub fn history(&self) -> &[f64] {
        &self.history
    }

    /// Most recent value.
    pub fn last(&self) -> Option<f64> {
        self.history.last().copied()
    }

    pub fn into_history(self) -> Vec<f64> {
        self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_value_never_converges() {
        let mut tracker = ConvergenceTracker::new(LoopStage::Inner, 1e-4, 10);
        let step = tracker.record(2.0).unwrap();
        assert!(!step.converged);
        assert!(step.delta.is_infinite());

        let step = tracker.record(2.00001).unwrap();
        assert!(step.converged);
        assert_eq!(tracker.iterations(), 2);
        assert_eq!(tracker.history(), &[2.0, 2.00001]);
    }

    #[test]
    fn test_seed_is_history_but_not_iteration() {
        let mut tracker = ConvergenceTracker::seeded(LoopStage::Outer, 1e-6, 10, 0.0);
        assert_eq!(tracker.iterations(), 0);
        let step = tracker.record(0.5).unwrap();
        assert!((step.delta - 0.5).abs() < 1e-15);
        assert_eq!(tracker.iterations(), 1);
        assert_eq!(tracker.history(), &[0.0, 0.5]);
    }

    #[test]
    fn test_cap_raises_convergence_error() {
        let mut tracker = ConvergenceTracker::new(LoopStage::Inner, 1e-12, 3);
        tracker.record(1.0).unwrap();
        tracker.record(2.0).unwrap();
        let err = tracker.record(3.0).unwrap_err();
        match err {
            SecrecyError::Convergence {
                stage,
                iterations,
                last_objective,
            } => {
                assert_eq!(stage, LoopStage::Inner);
                assert_eq!(iterations, 3);
                assert_eq!(last_objective, 3.0);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_converging_on_last_allowed_iteration_is_ok() {
        let mut tracker = ConvergenceTracker::new(LoopStage::Outer, 1e-3, 2);
        tracker.record(1.0).unwrap();
        assert!(tracker.record(1.0005).unwrap().converged);
    }

    #[test]
    fn test_non_finite_objective() {
        let mut tracker = ConvergenceTracker::new(LoopStage::Outer, 1e-3, 5);
        assert!(matches!(
            tracker.record(f64::NAN),
            Err(SecrecyError::Numerical { .. })
        ));
    }
}
