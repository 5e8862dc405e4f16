//! clmatmul - dense matrix multiplication benchmark on OpenCL devices
//!
//! # About
//! clmatmul measures the performance of dense square matrix multiplication (`C = A * B`, single
//! precision) on one OpenCL device, comparing a baseline host multiplication against OpenCL
//! kernels applying progressively more aggressive optimizations:
//! - one work item per element of `C`;
//! - one work item per row of `C`;
//! - one work item per row of `C`, with the row of `A` copied to private memory.
//!
//! Every trial is timed end-to-end from the caller's point of view (submission, completion and,
//! by default, transfer of the result back to the host) and its result is checked against the
//! expected product, so that a fast but wrong kernel is reported as such.
//!
//! # Quickstart
//! ## Pre-requisites
//! Make sure an [OpenCL 1.2+][1] library and at least one OpenCL platform are installed on your
//! system before beginning.
//!
//! ## Build
//! ```sh
//! cargo build --release
//! ```
//!
//! ## Example run
//! List the available devices, then benchmark matrices of order 1024 on the second one, with 5
//! trials per strategy:
//! ```sh
//! cargo run --release -- --list
//! cargo run --release -- --device 1 --order 1024 --count 5
//! ```
//!
//! Diagnostics are logged to `stderr` and can be filtered with the `RUST_LOG` environment
//! variable (e.g. `RUST_LOG=debug`).
//!
//! [1]: https://www.khronos.org/opencl/

pub mod cli;
pub mod config;
pub mod consts;
pub mod drivers;
pub mod error;
pub mod kernels;
pub mod matrix;
pub mod perf_report;
pub mod timer;

use crate::{
    cli::CliArgs,
    config::RunConfig,
    drivers::device::{list_devices, name_of, ClDevice},
    error::HarnessError,
    kernels::device::{DirSources, EmbeddedSources, ProgramSource},
};

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use std::{
    io::{stdout, Write},
    process::ExitCode,
};

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &CliArgs) -> Result<(), HarnessError> {
    let mut output = stdout().lock();

    if args.list {
        for (index, (_, device)) in list_devices()?.iter().enumerate() {
            writeln!(output, "Device {index}: {}", name_of(device))?;
        }
        return Ok(());
    }

    let config = RunConfig::from(args);
    let device = ClDevice::select(args.device)?;
    let sources: Box<dyn ProgramSource> = match args.kernel_dir {
        Some(ref dir) => Box::new(DirSources::new(dir.clone())),
        None => Box::new(EmbeddedSources),
    };

    let outcome = drivers::run(&device, &config, sources.as_ref(), &mut output)?;
    info!(
        "{} strategies completed, {} failed",
        outcome.summaries.len(),
        outcome.failures.len()
    );
    Ok(())
}
