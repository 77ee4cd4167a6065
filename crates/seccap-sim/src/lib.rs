//! # Secrecy Capacity Simulation
//!
//! Drives the optimizer in `seccap-core` over random wiretap channels:
//!
//! - **Channel generation**: seeded real or complex Gaussian matrices
//! - **SNR sweeps**: independent points solved in parallel
//! - **Reports**: per-point rates, iteration counts and covariances as JSON
//!
//! The `seccap` binary wraps [`sweep::run_sweep`] in a command-line tool.

pub mod channel;
pub mod error;
pub mod sweep;

pub use channel::{ChannelConfig, ChannelModel, WiretapChannel};
pub use error::{SimError, SimResult};
pub use sweep::{run_sweep, snr_to_power, SweepConfig, SweepPoint, SweepReport};
