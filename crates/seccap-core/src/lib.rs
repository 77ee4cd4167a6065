//! # Secrecy Capacity Core Library
//!
//! This crate computes the secrecy capacity of a Gaussian MIMO wiretap
//! channel: the largest rate a transmitter can deliver to a legitimate
//! receiver (Bob) while leaking nothing to an eavesdropper (Eve), under a
//! total transmit power budget.
//!
//! ## Overview
//!
//! The optimal transmit covariance is found by a double-loop
//! majorization-minimization procedure over complex Hermitian matrices:
//!
//! - **Outer loop**: linearizes Eve's rate into a penalty `Q` around the
//!   current covariance and tracks the secrecy-rate surrogate
//! - **Inner loop**: fixed-point updates of a structured weighting matrix
//!   `K = [[I, B^H], [B, I]]` through an eigendecomposition
//! - **Projector**: generalized water-filling under the power budget by
//!   bisection on the dual variable
//!
//! ## Call Flow
//!
//! ```text
//! SecrecySolver → OuterIterator → InnerFixedPointSolver → WaterfillingProjector
//!                        └──────────────┴──────────────────→ objective
//! ```
//!
//! ## Example
//!
//! ```rust
//! use seccap_core::{compute_secrecy_covariance, secrecy_rate, RateUnit};
//! use seccap_core::types::matrix_ops::from_real;
//!
//! let bob = from_real(2, 2, &[0.6716, 0.8733, 0.2036, -1.5503]);
//! let eve = from_real(2, 2, &[-0.1206, -1.0593, 0.3814, -1.1734]);
//!
//! let cov = compute_secrecy_covariance(&bob, &eve, 1.0, None).unwrap();
//! let rate = secrecy_rate(&bob, &eve, &cov, RateUnit::Bits).unwrap();
//! assert!((rate - 0.7097).abs() < 1e-3);
//! ```

pub mod cancel;
pub mod config;
pub mod convergence;
pub mod diagnostics;
pub mod inner;
pub mod linalg;
pub mod objective;
pub mod observe;
pub mod outer;
pub mod rate;
pub mod solver;
pub mod types;
pub mod waterfilling;

pub use cancel::CancelToken;
pub use config::{ConfigError, IterationLimits, SolverConfig, ToleranceOverrides, Tolerances};
pub use diagnostics::{
    ChannelSink, DiagnosticEvent, DiagnosticSink, InnerIterationEvent, NullSink,
    OuterIterationEvent, RecordingSink, TracingSink,
};
pub use inner::{InnerFixedPointSolver, InnerSolution};
pub use outer::{OuterIterator, OuterState};
pub use rate::{bob_only_covariance, link_capacity, secrecy_rate, RateUnit};
pub use solver::{compute_secrecy_covariance, SecrecySolution, SecrecySolver};
pub use types::{CMatrix, Complex, LoopStage, SecrecyError, SecrecyResult};
pub use waterfilling::{Projection, WaterfillingProjector};
