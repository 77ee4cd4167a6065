//! SNR Sweeps
//!
//! Solves one wiretap channel at several SNR points. The noise power is one,
//! so an SNR of `s` dB is a power budget of `10^(s/10)`. Points are
//! independent and solved in parallel with rayon; each owns its matrices.
//!
//! ```text
//! SweepConfig ──generate──► WiretapChannel
//!      │                          │
//!      └── snr_db[] ──par_iter──► SecrecySolver ──► SweepPoint[] ──► SweepReport (JSON)
//! ```

use rayon::prelude::*;
use seccap_core::types::{CMatrix, Complex};
use seccap_core::{
    link_capacity, secrecy_rate, RateUnit, SecrecyError, SecrecySolver, SolverConfig,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;

use crate::channel::{ChannelConfig, WiretapChannel};
use crate::error::{SimError, SimResult};

/// What to sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// SNR points in dB
    pub snr_db: Vec<f64>,
    pub channel: ChannelConfig,
    pub solver: SolverConfig,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            snr_db: vec![0.0],
            channel: ChannelConfig::default(),
            solver: SolverConfig::default(),
        }
    }
}

/// Result at one SNR point. Rates are in bits per channel use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    pub snr_db: f64,
    /// Linear power budget
    pub power: f64,
    pub secrecy_rate_bits: f64,
    /// Bob's rate under the secrecy-optimal covariance
    pub bob_capacity_bits: f64,
    /// `tr S`
    pub trace: f64,
    pub outer_iterations: usize,
    pub inner_iterations: usize,
    /// Outer surrogate per iteration in nats
    pub objective_history: Vec<f64>,
    pub elapsed_ms: f64,
    /// Optimal covariance, row-major
    pub covariance: Vec<Vec<Complex>>,
}

/// Full sweep output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    pub channel: ChannelConfig,
    pub bob: Vec<Vec<Complex>>,
    pub eve: Vec<Vec<Complex>>,
    pub points: Vec<SweepPoint>,
}

impl SweepReport {
    pub fn to_json(&self) -> SimResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the report as pretty JSON.
    pub fn write_json(&self, path: &Path) -> SimResult<()> {
        std::fs::write(path, self.to_json()?)?;
        tracing::info!(path = %path.display(), points = self.points.len(), "wrote sweep report");
        Ok(())
    }
}

/// `10^(snr/10)`
pub fn snr_to_power(snr_db: f64) -> f64 {
    10.0_f64.powf(snr_db / 10.0)
}

/// Row-major copy of a matrix for serialization.
pub fn matrix_rows(m: &CMatrix) -> Vec<Vec<Complex>> {
    m.row_iter().map(|row| row.iter().copied().collect()).collect()
}

/// Solve one channel at one SNR.
pub fn solve_point(
    channel: &WiretapChannel,
    snr_db: f64,
    solver: &SolverConfig,
) -> SimResult<SweepPoint> {
    let span = tracing::info_span!("snr_point", snr_db);
    let _guard = span.enter();

    let power = snr_to_power(snr_db);
    let started = Instant::now();
    let attach = |source: SecrecyError| SimError::Solver { snr_db, source };

    let solution = SecrecySolver::new()
        .with_config(solver.clone())
        .solve(channel.bob(), channel.eve(), power)
        .map_err(attach)?;
    let cov = &solution.covariance;
    let secrecy = secrecy_rate(channel.bob(), channel.eve(), cov, RateUnit::Bits).map_err(attach)?;
    let bob = link_capacity(channel.bob(), cov, RateUnit::Bits).map_err(attach)?;

    tracing::info!(
        power,
        secrecy_rate_bits = secrecy,
        outer_iterations = solution.outer_iterations,
        "solved SNR point"
    );

    Ok(SweepPoint {
        snr_db,
        power,
        secrecy_rate_bits: secrecy,
        bob_capacity_bits: bob,
        trace: solution.transmit_power(),
        outer_iterations: solution.outer_iterations,
        inner_iterations: solution.inner_iterations,
        elapsed_ms: started.elapsed().as_secs_f64() * 1e3,
        covariance: matrix_rows(cov),
        objective_history: solution.objective_history,
    })
}

/// Solve a fixed channel at every SNR point, in parallel.
///
/// Points come back in the order of `snr_db`; the first failure wins.
pub fn sweep_channel(
    channel: &WiretapChannel,
    snr_db: &[f64],
    solver: &SolverConfig,
) -> SimResult<Vec<SweepPoint>> {
    snr_db
        .par_iter()
        .map(|&snr| solve_point(channel, snr, solver))
        .collect()
}

/// Generate the configured channel and sweep it.
pub fn run_sweep(config: &SweepConfig) -> SimResult<SweepReport> {
    if config.snr_db.is_empty() {
        return Err(SimError::InvalidConfig("no SNR points given".to_string()));
    }
    config.solver.validate()?;

    let channel = WiretapChannel::generate(&config.channel)?;
    tracing::info!(
        points = config.snr_db.len(),
        n_tx = config.channel.n_tx,
        "starting SNR sweep"
    );
    let points = sweep_channel(&channel, &config.snr_db, &config.solver)?;

    Ok(SweepReport {
        channel: config.channel.clone(),
        bob: matrix_rows(channel.bob()),
        eve: matrix_rows(channel.eve()),
        points,
    })
}
