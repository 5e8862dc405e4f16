//! Host kernel drivers.
//!
//! This module implements the driver functions responsible for profiling the baseline
//! multiplication on the host (CPU). Trials are timed and reported exactly like device trials.

use crate::{
    cli::StrategyKind,
    config::RunConfig,
    kernels::host,
    matrix::{self, Matrix},
    perf_report::{Reporter, TrialReport, TrialResult},
    timer::Timer,
};

use std::{fmt, io};

/// Host-specific possible kernel implementations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostKernelVariant {
    Seq,
    Par,
}

impl HostKernelVariant {
    /// Returns the host variant selected by `kind`, if it is one.
    pub fn of(kind: StrategyKind) -> Option<Self> {
        match kind {
            StrategyKind::HostSeq => Some(Self::Seq),
            StrategyKind::HostPar => Some(Self::Par),
            _ => None,
        }
    }
}

impl fmt::Display for HostKernelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Seq => write!(f, "Host sequential"),
            Self::Par => write!(f, "Host parallel"),
        }
    }
}

/// Host driver for the matrix multiplication.
///
/// This function selects the correct host kernel given `variant` and profiles it.
// NOTE: We use upper-case characters to designate matrices.
#[allow(non_snake_case)]
pub fn matmul(
    config: &RunConfig,
    variant: HostKernelVariant,
    A: &Matrix,
    B: &Matrix,
    C: &mut Matrix,
    reporter: &mut Reporter<'_>,
) -> io::Result<Vec<TrialReport>> {
    // Match on given host kernel variant
    let kernel = match variant {
        HostKernelVariant::Seq => host::matmul,
        HostKernelVariant::Par => host::par_matmul,
    };

    reporter.header(&variant.to_string())?;

    // Measure execution time of host kernel
    let timer = Timer::new();
    let mut reports = Vec::with_capacity(config.count.into());
    for _ in 0..config.count {
        matrix::zero(C);

        let start_time = timer.now();
        kernel(config.order, A.as_slice(), B.as_slice(), C.as_mut_slice());
        let run_time = timer.since(start_time);

        reports.push(reporter.record(TrialResult {
            elapsed: run_time,
            output: C,
        })?);
    }

    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::{initialize, FillRule, Reference};

    #[test]
    fn host_variants_are_correct() {
        let fill = FillRule::Random { seed: 5 };
        let config = RunConfig::new(16, 2, fill);
        let mut a = Matrix::zeroed(16);
        let mut b = Matrix::zeroed(16);
        let mut c = Matrix::zeroed(16);
        initialize(&fill, &mut a, &mut b, &mut c);

        let mut out = Vec::new();
        let mut reporter = Reporter::new(16, Reference::new(&fill, &a, &b, 1e-3), &mut out);
        for variant in [HostKernelVariant::Seq, HostKernelVariant::Par] {
            let reports = matmul(&config, variant, &a, &b, &mut c, &mut reporter).unwrap();
            assert_eq!(reports.len(), 2);
            assert!(reports.iter().all(TrialReport::is_correct));
        }

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("===== Host sequential, matrix multiplication [16][16]*[16][16]"));
        assert!(text.contains("===== Host parallel,"));
    }
}
