//! Random Wiretap Channels
//!
//! Generates the Bob and Eve channel matrices fed to the optimizer. Entries
//! are i.i.d. Gaussian: real `N(0, 1)` or circularly-symmetric complex
//! `CN(0, 1)`. Generation is seeded, so a configuration always yields the
//! same matrices.
//!
//! ## Usage
//!
//! ```rust
//! use seccap_sim::channel::{ChannelConfig, ChannelModel, WiretapChannel};
//!
//! let config = ChannelConfig {
//!     model: ChannelModel::ComplexGaussian,
//!     ..ChannelConfig::square(4, 7)
//! };
//!
//! let channel = WiretapChannel::generate(&config).unwrap();
//! assert_eq!(channel.bob().shape(), (4, 4));
//! assert_eq!(channel.eve().shape(), (4, 4));
//! ```

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use seccap_core::types::{CMatrix, Complex};
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_1_SQRT_2;

use crate::error::{SimError, SimResult};

/// Distribution of the channel entries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelModel {
    /// Real entries, `N(0, 1)`
    #[default]
    RealGaussian,
    /// Complex entries, `CN(0, 1)` (unit total variance)
    ComplexGaussian,
}

/// Channel configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    pub model: ChannelModel,
    /// Transmit antennas
    pub n_tx: usize,
    /// Bob's receive antennas
    pub n_rx: usize,
    /// Eve's receive antennas
    pub n_eve: usize,
    /// RNG seed
    pub seed: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self::square(2, 100)
    }
}

impl ChannelConfig {
    /// `n` antennas at every terminal.
    pub fn square(n: usize, seed: u64) -> Self {
        Self {
            model: ChannelModel::RealGaussian,
            n_tx: n,
            n_rx: n,
            n_eve: n,
            seed,
        }
    }

    pub fn validate(&self) -> SimResult<()> {
        if self.n_tx == 0 || self.n_rx == 0 || self.n_eve == 0 {
            return Err(SimError::InvalidConfig(format!(
                "antenna counts must be positive (n_tx={}, n_rx={}, n_eve={})",
                self.n_tx, self.n_rx, self.n_eve
            )));
        }
        Ok(())
    }
}

/// Bob and Eve channels sharing the transmit dimension
#[derive(Debug, Clone, PartialEq)]
pub struct WiretapChannel {
    bob: CMatrix,
    eve: CMatrix,
}

impl WiretapChannel {
    /// Wrap existing matrices.
    pub fn new(bob: CMatrix, eve: CMatrix) -> SimResult<Self> {
        if bob.ncols() != eve.ncols() {
            return Err(SimError::InvalidConfig(format!(
                "Bob has {} transmit columns, Eve has {}",
                bob.ncols(),
                eve.ncols()
            )));
        }
        Ok(Self { bob, eve })
    }

    /// Draw a channel pair from the configured distribution. Bob's matrix is
    /// drawn first, then Eve's, from one generator.
    pub fn generate(config: &ChannelConfig) -> SimResult<Self> {
        config.validate()?;
        let mut rng = StdRng::seed_from_u64(config.seed);
        let bob = random_matrix(&mut rng, config.model, config.n_rx, config.n_tx);
        let eve = random_matrix(&mut rng, config.model, config.n_eve, config.n_tx);
        tracing::debug!(
            seed = config.seed,
            model = ?config.model,
            n_tx = config.n_tx,
            n_rx = config.n_rx,
            n_eve = config.n_eve,
            "generated wiretap channel"
        );
        Ok(Self { bob, eve })
    }

    pub fn bob(&self) -> &CMatrix {
        &self.bob
    }

    pub fn eve(&self) -> &CMatrix {
        &self.eve
    }

    pub fn n_tx(&self) -> usize {
        self.bob.ncols()
    }
}

fn random_matrix<R: Rng>(rng: &mut R, model: ChannelModel, rows: usize, cols: usize) -> CMatrix {
    // Both standard deviations are positive constants
    let (std_dev, complex) = match model {
        ChannelModel::RealGaussian => (1.0, false),
        ChannelModel::ComplexGaussian => (FRAC_1_SQRT_2, true),
    };
    let Ok(normal) = Normal::new(0.0, std_dev) else {
        return CMatrix::zeros(rows, cols);
    };

    // Row-major draw order
    let mut data = Vec::with_capacity(rows * cols);
    for _ in 0..rows * cols {
        let re = normal.sample(rng);
        let im = if complex { normal.sample(rng) } else { 0.0 };
        data.push(Complex::new(re, im));
    }
    CMatrix::from_row_slice(rows, cols, &data)
}
