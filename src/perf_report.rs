//! Performance report related structures and functions.
//!
//! This module defines the data structures and functions needed to report the outcome of every
//! trial (runtime, achieved MFLOPS, correctness) as it happens, and to summarize the recorded
//! execution times of each strategy at the end of a run.

use crate::matrix::{Matrix, Reference, Validation};

use statistical::{mean, standard_deviation};

use std::{fmt, io, io::Write};

/// Enum defining the target of a strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetKind {
    Host,
    Device,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host => write!(f, "host"),
            Self::Device => write!(f, "device"),
        }
    }
}

/// Outcome of one trial, handed to the [`Reporter`] as soon as the trial completes.
#[derive(Clone, Copy, Debug)]
pub struct TrialResult<'a> {
    /// Wall-clock duration of the trial, in seconds.
    pub elapsed: f64,
    /// Result matrix, transferred back to the host.
    pub output: &'a Matrix,
}

/// Report of one trial.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrialReport {
    /// Wall-clock duration of the trial, in seconds.
    pub elapsed: f64,
    /// Achieved floating-point operations per second.
    pub flops: f64,
    pub validation: Validation,
}

impl TrialReport {
    pub fn is_correct(&self) -> bool {
        self.validation.is_correct()
    }
}

impl fmt::Display for TrialReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            " {:.3} seconds at {:.1} MFLOPS",
            self.elapsed,
            self.flops / 1e6
        )?;
        match self.validation.mismatches {
            0 => write!(f, ", ok"),
            n => write!(
                f,
                ", {n} mismatched cell(s), errsq = {:e}",
                self.validation.errsq
            ),
        }
    }
}

/// Writes the per-trial report lines and validates every result against the reference.
pub struct Reporter<'w> {
    order: usize,
    reference: Reference,
    output: &'w mut dyn Write,
}

impl<'w> Reporter<'w> {
    pub fn new(order: usize, reference: Reference, output: &'w mut dyn Write) -> Self {
        Self {
            order,
            reference,
            output,
        }
    }

    /// Writes the header line of a strategy.
    pub fn header(&mut self, strategy: &str) -> io::Result<()> {
        let n = self.order;
        writeln!(
            self.output,
            "\n===== {strategy}, matrix multiplication [{n}][{n}]*[{n}][{n}] ======"
        )
    }

    /// Computes the throughput and the correctness of a trial and writes its report line.
    ///
    /// One multiply and one add per term, `N` terms per cell and `N²` cells: `2N³` operations.
    pub fn record(&mut self, trial: TrialResult<'_>) -> io::Result<TrialReport> {
        let report = TrialReport {
            elapsed: trial.elapsed,
            flops: 2.0 * (self.order as f64).powi(3) / trial.elapsed,
            validation: self.reference.validate(trial.output),
        };
        writeln!(self.output, "{report}")?;
        Ok(report)
    }

    /// Writes an inline diagnostic for a strategy that could not run to completion.
    pub fn failure(&mut self, diagnostic: &dyn fmt::Display) -> io::Result<()> {
        writeln!(self.output, " FAILED: {diagnostic}")
    }
}

/// Performance information and statistics of a strategy, over all of its trials.
#[derive(Clone, Debug)]
pub struct StrategySummary {
    /// Target platform: either `Host` or `Device`.
    target: TargetKind,
    /// Name of the strategy.
    strategy: String,
    /// Order of the matrices.
    order: usize,
    /// Number of trials.
    trials: usize,
    /// Minimum recorded runtime in milliseconds.
    min_time: f64,
    /// Median recorded runtime in milliseconds.
    median_time: f64,
    /// Maximum recorded runtime in milliseconds.
    max_time: f64,
    /// Average runtime in milliseconds.
    avg_time: f64,
    /// Runtime standard deviation in milliseconds.
    stddev_time: f64,
    /// Computational performance in GFLOP/s, from the average runtime.
    computational_performance: f64,
    /// Number of trials whose result had at least one mismatched cell.
    incorrect_trials: usize,
}

impl StrategySummary {
    pub fn print_csv_header(output: &mut dyn Write) -> io::Result<()> {
        writeln!(
            output,
            "target,strategy,order,trials,min_runtime,median_runtime,max_runtime,avg_runtime,stddev,GFLOP/s,incorrect_trials"
        )
    }

    /// Creates a new `StrategySummary` from the reports of all the trials of a strategy.
    ///
    /// Returns `None` if there are no reports.
    pub fn new(
        target: TargetKind,
        strategy: &str,
        order: usize,
        reports: &[TrialReport],
    ) -> Option<Self> {
        let mut durations: Vec<f64> = reports.iter().map(|r| r.elapsed * 1e3).collect();
        // Sort durations to avoid having to do two passes to get both min and max elements
        durations.sort_by(|a, b| a.total_cmp(b));

        let min_time = *durations.first()?;
        let median_time = durations[durations.len() / 2];
        let max_time = *durations.last()?;
        let avg_time = mean(&durations);
        let stddev_time = match durations.len() {
            1 => 0.0,
            _ => standard_deviation(&durations, Some(avg_time)),
        };

        let nb_flops = 2.0 * (order as f64).powi(3);
        let computational_performance = nb_flops / (avg_time * 1e-3) / 1e9;

        Some(Self {
            target,
            strategy: strategy.to_string(),
            order,
            trials: reports.len(),
            min_time,
            median_time,
            max_time,
            avg_time,
            stddev_time,
            computational_performance,
            incorrect_trials: reports.iter().filter(|r| !r.is_correct()).count(),
        })
    }

    pub fn strategy(&self) -> &str {
        &self.strategy
    }

    pub fn incorrect_trials(&self) -> usize {
        self.incorrect_trials
    }
}

impl fmt::Display for StrategySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{},{:.6},{:.6},{:.6},{:.6},{:.6},{:.3},{}",
            self.target,
            self.strategy,
            self.order,
            self.trials,
            self.min_time,
            self.median_time,
            self.max_time,
            self.avg_time,
            self.stddev_time,
            self.computational_performance,
            self.incorrect_trials,
        )
    }
}
