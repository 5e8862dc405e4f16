//! Strategy runner.
//!
//! Every device strategy goes through the same protocol, whatever its work-partitioning geometry:
//! 1. load and build its program unit, once;
//! 2. resolve the entry point into a kernel bound to `(N, A, B, C)`;
//! 3. for each trial, in strict sequence: zero the host result, start the clock, submit the
//!    dispatch, wait for the queue to complete, read the result back and stop the clock (the
//!    transfer may be left out of the timed window, see [`TimingBoundary`]);
//! 4. hand every trial to the [`Reporter`] in generation order.
//!
//! A trial never starts while the dispatch of the previous one is outstanding, so the result
//! buffer is written by at most one dispatch at a time.

use super::{
    buffers::DeviceBuffers,
    device::{ComputeDevice, Geometry},
};
use crate::{
    cli::StrategyKind,
    config::{RunConfig, TimingBoundary},
    consts::{ENTRY_POINT, PRIVATE_LOCAL_DIVISOR},
    error::StrategyError,
    kernels::device::ProgramSource,
    matrix::{self, Matrix},
    perf_report::{Reporter, TrialReport, TrialResult},
    timer::Timer,
};

use tracing::{debug, info};

/// How the `N²` cells of `C` are distributed over work items.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Partition {
    /// One work item per cell: global size `N x N`.
    PerElement,
    /// One work item per row: global size `N`.
    PerRow,
}

/// Local (work-group) size policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LocalSize {
    /// Let the device pick its own work-group size.
    Auto,
    /// One-dimensional groups of `N / d` work items.
    OrderFraction(usize),
}

/// Immutable description of a device strategy.
#[derive(Clone, Copy, Debug)]
pub struct StrategyDescriptor {
    pub name: &'static str,
    /// Name of the program unit, as known by the [`ProgramSource`].
    pub program: &'static str,
    pub entry: &'static str,
    pub partition: Partition,
    pub local: LocalSize,
}

impl StrategyDescriptor {
    /// Global geometry for matrices of order `order`.
    pub fn global(&self, order: usize) -> Geometry {
        match self.partition {
            Partition::PerElement => Geometry::Two(order, order),
            Partition::PerRow => Geometry::One(order),
        }
    }

    /// Local geometry for matrices of order `order`.
    ///
    /// A fraction of the order that does not divide it evenly falls back to the device's choice.
    pub fn local(&self, order: usize) -> Option<Geometry> {
        match self.local {
            LocalSize::Auto => None,
            LocalSize::OrderFraction(d) if d > 0 && order >= d && order % d == 0 => {
                Some(Geometry::One(order / d))
            }
            LocalSize::OrderFraction(_) => None,
        }
    }

    /// Returns the device strategy selected by `kind`, if it is one.
    pub fn of(kind: StrategyKind) -> Option<&'static StrategyDescriptor> {
        match kind {
            StrategyKind::PerElement => Some(&PER_ELEMENT),
            StrategyKind::PerRow => Some(&PER_ROW),
            StrategyKind::Private => Some(&PRIVATE_ROW),
            StrategyKind::HostSeq | StrategyKind::HostPar => None,
        }
    }
}

pub static PER_ELEMENT: StrategyDescriptor = StrategyDescriptor {
    name: "OpenCL one work item per element",
    program: "optimize_common.cl",
    entry: ENTRY_POINT,
    partition: Partition::PerElement,
    local: LocalSize::Auto,
};

pub static PER_ROW: StrategyDescriptor = StrategyDescriptor {
    name: "OpenCL one work item per row",
    program: "optimize_per_row.cl",
    entry: ENTRY_POINT,
    partition: Partition::PerRow,
    local: LocalSize::Auto,
};

pub static PRIVATE_ROW: StrategyDescriptor = StrategyDescriptor {
    name: "OpenCL row of A in private memory",
    program: "optimize_private.cl",
    entry: ENTRY_POINT,
    partition: Partition::PerRow,
    local: LocalSize::OrderFraction(PRIVATE_LOCAL_DIVISOR),
};

/// Runs `descriptor` for `config.count` trials and returns the report of every trial, in order.
///
/// `C` is the host result matrix; it holds the result of the last trial on return.
#[allow(non_snake_case)]
pub fn run_strategy<D: ComputeDevice>(
    device: &D,
    config: &RunConfig,
    descriptor: &StrategyDescriptor,
    sources: &dyn ProgramSource,
    buffers: &DeviceBuffers<D::Buffer>,
    C: &mut Matrix,
    reporter: &mut Reporter<'_>,
) -> Result<Vec<TrialReport>, StrategyError> {
    let strategy = descriptor.name.to_string();
    let order = config.order;

    let source = sources
        .load(descriptor.program)
        .map_err(|source| StrategyError::ProgramLoad {
            strategy: strategy.clone(),
            program: descriptor.program.to_string(),
            source,
        })?;

    let program =
        device
            .build_program(&source, order)
            .map_err(|source| StrategyError::ProgramBuild {
                strategy: strategy.clone(),
                program: descriptor.program.to_string(),
                source: Box::new(source),
            })?;
    debug!("Built program `{}`", descriptor.program);

    let global = descriptor.global(order);
    let local = descriptor.local(order);
    let kernel = device
        .resolve_kernel(&program, descriptor.entry, global, local, order, buffers)
        .map_err(|source| StrategyError::KernelResolution {
            strategy: strategy.clone(),
            entry: descriptor.entry.to_string(),
            source: Box::new(source),
        })?;
    info!(
        "Running `{strategy}` on {} work items (global: {global:?}, local: {local:?})",
        global.size()
    );

    let dispatch = |source: D::Error| StrategyError::Dispatch {
        strategy: strategy.clone(),
        source: Box::new(source),
    };
    let report = |source| StrategyError::Report {
        strategy: strategy.clone(),
        source,
    };

    reporter.header(descriptor.name).map_err(report)?;

    let timer = Timer::new();
    let mut reports = Vec::with_capacity(config.count.into());
    for _ in 0..config.count {
        matrix::zero(C);

        let start_time = timer.now();
        device.enqueue(&kernel).map_err(dispatch)?;
        let idle = device.finish().map_err(dispatch)?;
        let mut run_time = timer.since(start_time);

        buffers
            .download(device, &idle, C)
            .map_err(|source| StrategyError::Transfer {
                strategy: strategy.clone(),
                source: Box::new(source),
            })?;
        if config.timing == TimingBoundary::IncludeTransfer {
            run_time = timer.since(start_time);
        }

        reports.push(
            reporter
                .record(TrialResult {
                    elapsed: run_time,
                    output: C,
                })
                .map_err(report)?,
        );
    }

    Ok(reports)
}
