//! Error types.
//!
//! Errors come in two tiers. A [`HarnessError`] is fatal: it aborts the run before any strategy
//! executes (or, for buffer setup, before any device strategy executes). A [`StrategyError`] is
//! caught at the strategy boundary: it is reported with the name of the failing strategy and the
//! run carries on with the next one.

use crate::drivers::device::ClError;

use thiserror::Error;

/// Boxed device-level error, as returned by a [`crate::drivers::device::ComputeDevice`].
pub type DeviceError = Box<dyn std::error::Error + 'static>;

/// Fatal errors, aborting the whole run.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// The requested device index is out of range of the enumerated devices.
    #[error("invalid device index {index}: {count} device(s) available (try '--list')")]
    DeviceSelection { index: usize, count: usize },

    /// OpenCL failure while enumerating devices or creating the context and queue.
    #[error("OpenCL error: {0}")]
    Ocl(ClError),

    /// The shared device buffers could not be created.
    #[error("failed to set up device buffers: {source}")]
    BufferSetup {
        #[source]
        source: DeviceError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ocl::Error> for HarnessError {
    fn from(err: ocl::Error) -> Self {
        Self::Ocl(err.into())
    }
}

/// Per-strategy errors; they never unwind past the strategy that raised them.
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("[{strategy}] failed to load program `{program}`: {source}")]
    ProgramLoad {
        strategy: String,
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("[{strategy}] failed to build program `{program}`: {source}")]
    ProgramBuild {
        strategy: String,
        program: String,
        #[source]
        source: DeviceError,
    },

    #[error("[{strategy}] failed to resolve entry point `{entry}`: {source}")]
    KernelResolution {
        strategy: String,
        entry: String,
        #[source]
        source: DeviceError,
    },

    #[error("[{strategy}] kernel dispatch failed: {source}")]
    Dispatch {
        strategy: String,
        #[source]
        source: DeviceError,
    },

    #[error("[{strategy}] failed to transfer the result back to the host: {source}")]
    Transfer {
        strategy: String,
        #[source]
        source: DeviceError,
    },

    #[error("[{strategy}] failed to write report: {source}")]
    Report {
        strategy: String,
        #[source]
        source: std::io::Error,
    },
}

impl StrategyError {
    /// Name of the strategy that failed.
    pub fn strategy(&self) -> &str {
        match self {
            Self::ProgramLoad { strategy, .. }
            | Self::ProgramBuild { strategy, .. }
            | Self::KernelResolution { strategy, .. }
            | Self::Dispatch { strategy, .. }
            | Self::Transfer { strategy, .. }
            | Self::Report { strategy, .. } => strategy,
        }
    }
}
