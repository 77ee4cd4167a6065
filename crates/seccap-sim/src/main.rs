//! `seccap`: secrecy capacity of random Gaussian MIMO wiretap channels.
//!
//! ```text
//! seccap -n 4 --snr 0,10,20 --seed 100 --output report.json
//! ```

use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::process::ExitCode;

use seccap_core::observe::{init_logging, LogConfig, LogFormat};
use seccap_core::SolverConfig;
use seccap_sim::{run_sweep, ChannelConfig, ChannelModel, SimResult, SweepConfig};

#[derive(Debug, Parser)]
#[command(name = "seccap", version, about = "Secrecy capacity of Gaussian MIMO wiretap channels")]
struct Cli {
    /// Antennas at the transmitter, Bob and Eve
    #[arg(short = 'n', long = "antennas", default_value_t = 2)]
    antennas: usize,

    /// SNR points in dB (comma separated)
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, default_values_t = [0.0])]
    snr: Vec<f64>,

    /// Seed of the channel generator
    #[arg(long, default_value_t = 100)]
    seed: u64,

    /// Draw complex CN(0,1) channels instead of real N(0,1)
    #[arg(long)]
    complex: bool,

    /// Solver configuration file (YAML); otherwise the default search path
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the sweep report as JSON
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log format: pretty, compact or json
    #[arg(long, default_value = "pretty")]
    log_format: LogFormat,

    /// Also append log records to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Print the default solver configuration as YAML and exit
    #[arg(long)]
    print_config: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn log_config(&self) -> LogConfig {
        let config = LogConfig::for_verbosity(self.verbose).with_format(self.log_format);
        match &self.log_file {
            Some(path) => config.with_file(path),
            None => config,
        }
    }

    fn sweep_config(&self) -> SimResult<SweepConfig> {
        let solver = match &self.config {
            Some(path) => SolverConfig::load_from(path)?,
            None => SolverConfig::load()?,
        };
        let model = if self.complex {
            ChannelModel::ComplexGaussian
        } else {
            ChannelModel::RealGaussian
        };
        Ok(SweepConfig {
            snr_db: self.snr.clone(),
            channel: ChannelConfig {
                model,
                ..ChannelConfig::square(self.antennas, self.seed)
            },
            solver,
        })
    }
}

fn run(cli: &Cli) -> SimResult<()> {
    let config = cli.sweep_config()?;
    let report = run_sweep(&config)?;

    println!(
        "{}x{} {:?} channel, seed {}",
        cli.antennas, cli.antennas, config.channel.model, cli.seed
    );
    for point in &report.points {
        println!(
            "SNR {:>7.2} dB  power {:>10.4}  secrecy capacity {:.6} bit  (trace {:.4}, {} outer / {} inner iterations)",
            point.snr_db,
            point.power,
            point.secrecy_rate_bits,
            point.trace,
            point.outer_iterations,
            point.inner_iterations,
        );
    }

    if let Some(path) = &cli.output {
        report.write_json(path)?;
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if cli.print_config {
        print!("{}", SolverConfig::example_yaml());
        return ExitCode::SUCCESS;
    }
    if let Err(err) = init_logging(&cli.log_config()) {
        eprintln!("error: cannot open log file: {err}");
        return ExitCode::FAILURE;
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "sweep failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
