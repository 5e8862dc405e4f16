//! Command-Line Interface related code.
//!
//! This module handles the parsing of CLI arguments using the [`clap`][1] crate.
//! It defines the available runtime options.
//!
//! [1]: https://crates.io/crates/clap

use crate::consts;

use clap::{Parser, ValueEnum};

use std::path::PathBuf;

/// Dense matrix multiplication benchmark on OpenCL devices.
///
/// Compares a baseline host multiplication against several OpenCL kernels applying progressively
/// more aggressive optimizations, reporting runtime, achieved MFLOPS and numerical correctness of
/// every trial.
#[derive(Clone, Debug, Parser)]
pub struct CliArgs {
    /// Index of the OpenCL device to use (see `--list`).
    #[arg(short, long, value_name = "INDEX", default_value_t = 0)]
    pub device: usize,

    /// List the available OpenCL devices and exit.
    #[arg(short, long)]
    pub list: bool,

    /// Order of the square matrices.
    #[arg(
        short = 'n',
        long,
        value_name = "N",
        default_value_t = consts::ORDER,
        value_parser = parse_order,
    )]
    pub order: usize,

    /// Number of trials performed for each strategy.
    #[arg(
        short,
        long,
        value_name = "COUNT",
        default_value_t = consts::COUNT,
        value_parser = clap::value_parser!(u16).range(1..),
    )]
    pub count: u16,

    /// Rule used to fill the `A` and `B` matrices.
    #[arg(short, long, value_enum, default_value_t = FillKind::Constant)]
    pub fill: FillKind,

    /// Seed for the random number generator (RNG), only used by the random fill rule.
    #[arg(short, long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Relative tolerance allowed on every cell of the result matrix.
    #[arg(short, long, value_name = "TOL", default_value_t = consts::TOL)]
    pub tolerance: f32,

    /// Stop the clock before the result matrix is transferred back to the host.
    #[arg(long)]
    pub exclude_transfer: bool,

    /// Directory holding the OpenCL program units, defaults to the embedded sources.
    #[arg(short, long, value_name = "DIR")]
    pub kernel_dir: Option<PathBuf>,

    /// Strategies to benchmark, defaults to all of them.
    #[arg(
        short = 'S',
        long,
        value_enum,
        value_delimiter = ',',
        num_args = 1..,
    )]
    pub strategies: Vec<StrategyKind>,
}

/// Fill rules selectable from the command-line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum FillKind {
    /// `A` filled with `AVAL` and `B` with `BVAL`.
    Constant,
    /// Uniformly distributed values in [0.0, 100.0).
    Random,
}

/// List of available strategies to benchmark.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyKind {
    /// Sequential multiplication on the host.
    HostSeq,
    /// Parallel multiplication on the host.
    HostPar,
    /// One work item per element of `C`.
    PerElement,
    /// One work item per row of `C`.
    PerRow,
    /// One work item per row of `C`, with the row of `A` held in private memory.
    Private,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 5] = [
        Self::HostSeq,
        Self::HostPar,
        Self::PerElement,
        Self::PerRow,
        Self::Private,
    ];
}

fn parse_order(s: &str) -> Result<usize, String> {
    let order: usize = s.parse().map_err(|e| format!("{e}"))?;
    if (1..=consts::MAX_ORDER).contains(&order) {
        Ok(order)
    } else {
        Err(format!("order must be in 1..={}", consts::MAX_ORDER))
    }
}
