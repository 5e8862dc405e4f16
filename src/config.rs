//! Run configuration.
//!
//! The configuration is built once at startup from the command-line arguments and then only ever
//! passed around by shared reference.

use crate::{
    cli::{CliArgs, FillKind, StrategyKind},
    matrix::FillRule,
};

/// Where the result transfer sits relative to the timed window of a trial.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimingBoundary {
    /// The clock stops after the result has been read back to the host.
    IncludeTransfer,
    /// The clock stops as soon as the queue reports completion of the dispatch.
    ExcludeTransfer,
}

/// Process-wide, read-only parameters of a benchmark run.
#[derive(Clone, Debug)]
pub struct RunConfig {
    /// Order `N` of the square matrices.
    pub order: usize,
    /// Number of trials performed for each strategy.
    pub count: u16,
    /// Rule used to fill `A` and `B`.
    pub fill: FillRule,
    /// Relative tolerance allowed on every result cell.
    pub tolerance: f32,
    /// Whether the result transfer is part of the timed window.
    pub timing: TimingBoundary,
    /// Strategies to run, in order.
    pub strategies: Vec<StrategyKind>,
}

impl RunConfig {
    pub fn new(order: usize, count: u16, fill: FillRule) -> Self {
        Self {
            order,
            count,
            fill,
            tolerance: crate::consts::TOL,
            timing: TimingBoundary::IncludeTransfer,
            strategies: StrategyKind::ALL.to_vec(),
        }
    }
}

impl From<&CliArgs> for RunConfig {
    fn from(args: &CliArgs) -> Self {
        let fill = match args.fill {
            FillKind::Constant => FillRule::default(),
            FillKind::Random => FillRule::Random {
                seed: args.seed.unwrap_or(0),
            },
        };
        let strategies = if args.strategies.is_empty() {
            StrategyKind::ALL.to_vec()
        } else {
            args.strategies.clone()
        };

        Self {
            order: args.order,
            count: args.count,
            fill,
            tolerance: args.tolerance,
            timing: match args.exclude_transfer {
                true => TimingBoundary::ExcludeTransfer,
                false => TimingBoundary::IncludeTransfer,
            },
            strategies,
        }
    }
}
