//! Kernel drivers.
//!
//! This module provides the API for appropriately initializing and profiling the strategies, as
//! well as post-processing the results. It acts as a layer abstracting over the strategy's target:
//! either the host (CPU) or the device (GPU, FPGA, etc...).
//!
//! # High-level approach for strategy profiling
//! ## 1. Data initialization
//! `A` and `B` are filled once, following the configured fill rule, and the expected product is
//! computed from them. On the device side, `A` and `B` are uploaded once and the result buffer
//! is allocated once: every device strategy then shares these buffers, so that transfer costs
//! cannot favour one strategy over another.
//!
//! ## 2. Performance evaluation
//! Each strategy is run for a fixed number of trials (see [`crate::consts`] for the default and
//! [`crate::cli`] for overriding it from the command-line). Trials are strictly sequential: a
//! dispatch is always followed by a completion barrier before the next one is submitted.
//!
//! ## 3. Post-processing
//! Every trial is reported as soon as it completes, with its runtime, its computational
//! performance and whether its result matches the expected product. A strategy producing wrong
//! results still has its timings reported. At the end of the run a summary of every strategy
//! that ran to completion is written in CSV, followed by the strategies that failed.

pub mod buffers;
pub mod device;
#[cfg(test)]
mod fake;
mod host;
pub mod strategy;

use crate::{
    config::RunConfig,
    error::{HarnessError, StrategyError},
    kernels::device::ProgramSource,
    matrix::{initialize, Matrix, Reference},
    perf_report::*,
};
use buffers::DeviceBuffers;
use device::ComputeDevice;
use host::HostKernelVariant;
use strategy::{run_strategy, StrategyDescriptor};

use tracing::{error, warn};

use std::io::Write;

/// Outcome of a whole run.
#[derive(Debug)]
pub struct RunOutcome {
    /// Summaries of the strategies that ran all of their trials, in run order.
    pub summaries: Vec<StrategySummary>,
    /// Strategies that could not run, in run order.
    pub failures: Vec<StrategyError>,
}

/// Driver function responsible for initializing the matrices and forwarding them to the dedicated
/// target drivers. It gathers the results for each benchmarked strategy and writes an output
/// summary.
// NOTE: We use upper-case characters to designate matrices.
#[allow(non_snake_case)]
pub fn run<D: ComputeDevice>(
    device: &D,
    config: &RunConfig,
    sources: &dyn ProgramSource,
    output: &mut dyn Write,
) -> Result<RunOutcome, HarnessError> {
    let order = config.order;
    writeln!(output, "\nUsing device: {}", device.name())?;

    let mut A = Matrix::zeroed(order);
    let mut B = Matrix::zeroed(order);
    let mut C = Matrix::zeroed(order);
    initialize(&config.fill, &mut A, &mut B, &mut C);
    let reference = Reference::new(&config.fill, &A, &B, config.tolerance);

    // NOTE: The device buffers are created only if at least one device strategy is selected.
    let buffers = match config
        .strategies
        .iter()
        .any(|kind| StrategyDescriptor::of(*kind).is_some())
    {
        true => Some(DeviceBuffers::prepare(device, &A, &B)?),
        false => None,
    };

    let mut summaries = Vec::new();
    let mut failures = Vec::new();
    {
        let mut reporter = Reporter::new(order, reference, &mut *output);

        for &kind in &config.strategies {
            if let Some(variant) = HostKernelVariant::of(kind) {
                let reports = host::matmul(config, variant, &A, &B, &mut C, &mut reporter)?;
                summaries.extend(StrategySummary::new(
                    TargetKind::Host,
                    &variant.to_string(),
                    order,
                    &reports,
                ));
            } else if let (Some(descriptor), Some(buffers)) =
                (StrategyDescriptor::of(kind), buffers.as_ref())
            {
                match run_strategy(
                    device,
                    config,
                    descriptor,
                    sources,
                    buffers,
                    &mut C,
                    &mut reporter,
                ) {
                    Ok(reports) => summaries.extend(StrategySummary::new(
                        TargetKind::Device,
                        descriptor.name,
                        order,
                        &reports,
                    )),
                    Err(err) => {
                        error!(strategy = err.strategy(), "{err}");
                        reporter.failure(&err)?;
                        failures.push(err);
                    }
                }
            }
        }
    }

    writeln!(output)?;
    StrategySummary::print_csv_header(output)?;
    for summary in &summaries {
        if summary.incorrect_trials() > 0 {
            warn!(
                "`{}` produced wrong results in {} trial(s)",
                summary.strategy(),
                summary.incorrect_trials()
            );
        }
        writeln!(output, "{summary}")?;
    }
    for failure in &failures {
        writeln!(output, "# skipped: {failure}")?;
    }
    Ok(RunOutcome {
        summaries,
        failures,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cli::StrategyKind,
        kernels::device::EmbeddedSources,
        matrix::FillRule,
    };
    use super::{fake::FakeDevice, strategy::PER_ROW};

    use std::{borrow::Cow, io};

    /// Embedded sources, except for one program that does not compile.
    struct OneBroken(&'static str);

    impl ProgramSource for OneBroken {
        fn load(&self, name: &str) -> io::Result<Cow<'static, str>> {
            match name == self.0 {
                true => Ok(Cow::Borrowed("#error does not compile")),
                false => EmbeddedSources.load(name),
            }
        }
    }

    #[test]
    fn ones_of_order_four() {
        let device = FakeDevice::new();
        let config = RunConfig::new(4, 2, FillRule::Constant { a: 1.0, b: 1.0 });
        let mut out = Vec::new();

        let outcome = run(&device, &config, &EmbeddedSources, &mut out).unwrap();

        assert!(outcome.failures.is_empty());
        assert_eq!(outcome.summaries.len(), StrategyKind::ALL.len());
        assert!(outcome.summaries.iter().all(|s| s.incorrect_trials() == 0));
        assert_eq!(device.uploads(), 2);

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("\nUsing device: fake device\n"));
        // One line per trial, all of them correct
        assert_eq!(text.matches(", ok").count(), 2 * StrategyKind::ALL.len());
        assert!(text.contains("target,strategy,order,trials,"));
    }

    #[test]
    fn failed_build_is_logged_and_left_out_of_the_summary() {
        let device = FakeDevice::new();
        let config = RunConfig::new(8, 3, FillRule::default());
        let mut out = Vec::new();

        let outcome = run(&device, &config, &OneBroken(PER_ROW.program), &mut out).unwrap();

        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].strategy(), PER_ROW.name);
        assert!(matches!(
            outcome.failures[0],
            StrategyError::ProgramBuild { .. }
        ));
        assert_eq!(outcome.summaries.len(), StrategyKind::ALL.len() - 1);
        assert!(outcome.summaries.iter().all(|s| s.strategy() != PER_ROW.name));

        let text = String::from_utf8(out).unwrap();
        let table = text.split("target,strategy,").nth(1).unwrap();
        assert!(table
            .lines()
            .filter(|l| !l.starts_with('#'))
            .all(|l| !l.contains(&format!(",{},", PER_ROW.name))));
        assert!(text.contains(&format!(" FAILED: [{}]", PER_ROW.name)));
        assert!(table.contains(&format!("# skipped: [{}]", PER_ROW.name)));
    }

    #[test]
    fn host_only_run_leaves_the_device_alone() {
        let device = FakeDevice::new();
        let mut config = RunConfig::new(8, 1, FillRule::Random { seed: 9 });
        config.strategies = vec![StrategyKind::HostSeq, StrategyKind::HostPar];
        let mut out = Vec::new();

        let outcome = run(&device, &config, &EmbeddedSources, &mut out).unwrap();

        assert_eq!(outcome.summaries.len(), 2);
        assert_eq!(device.uploads(), 0);
        assert!(device.windows().is_empty());
    }

    #[test]
    fn wrong_results_are_still_timed() {
        struct Wrong;
        impl ProgramSource for Wrong {
            fn load(&self, _name: &str) -> io::Result<Cow<'static, str>> {
                Ok(Cow::Borrowed("// fault: wrong"))
            }
        }

        let device = FakeDevice::new();
        let mut config = RunConfig::new(4, 2, FillRule::default());
        config.strategies = vec![StrategyKind::PerElement];
        let mut out = Vec::new();

        let outcome = run(&device, &config, &Wrong, &mut out).unwrap();

        assert!(outcome.failures.is_empty());
        assert_eq!(outcome.summaries.len(), 1);
        assert_eq!(outcome.summaries[0].incorrect_trials(), 2);
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches("16 mismatched cell(s)").count(), 2);
    }
}
