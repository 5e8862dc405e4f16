//! Device context.
//!
//! This module defines the interface the drivers use to talk to a compute device, and its
//! implementation on top of OpenCL.
//!
//! # Crates used for calling kernels on a device
//! - [`ocl`][1] for an idiomatic Rust implementation of OpenCL bindings.
//!
//! [1]: https://crates.io/crates/ocl

use super::buffers::DeviceBuffers;
use crate::error::HarnessError;

use ocl::{
    core::Status, flags::MemFlags, Buffer, Context, Device, Kernel, Platform, Program, Queue,
    SpatialDims,
};
use thiserror::Error;
use tracing::{debug, info};

/// Shape of an ND-range, in one or two dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Geometry {
    One(usize),
    Two(usize, usize),
}

impl Geometry {
    /// Total number of work items.
    pub fn size(&self) -> usize {
        match *self {
            Self::One(x) => x,
            Self::Two(x, y) => x * y,
        }
    }
}

impl From<Geometry> for SpatialDims {
    fn from(geometry: Geometry) -> Self {
        match geometry {
            Geometry::One(x) => SpatialDims::One(x),
            Geometry::Two(x, y) => SpatialDims::Two(x, y),
        }
    }
}

/// Proof that the command queue has completed all previously submitted work.
///
/// Only [`ComputeDevice::finish`] hands these out, which makes reading a result buffer before the
/// completion barrier impossible.
#[derive(Debug)]
pub struct QueueIdle(());

impl QueueIdle {
    pub(crate) fn confirmed() -> Self {
        Self(())
    }
}

/// Operations the harness needs from a compute device and its in-order command queue.
pub trait ComputeDevice {
    type Error: std::error::Error + 'static;
    type Buffer;
    type Program;
    type Kernel;

    /// Creates a read-only device buffer initialized from `host`.
    fn upload(&self, host: &[f32]) -> Result<Self::Buffer, Self::Error>;

    /// Creates a write-only device buffer of `len` elements.
    fn allocate_result(&self, len: usize) -> Result<Self::Buffer, Self::Error>;

    /// Compiles a program unit for matrices of order `order`.
    fn build_program(&self, source: &str, order: usize) -> Result<Self::Program, Self::Error>;

    /// Resolves `entry` into a kernel bound to `(order, A, B, C)` and to the given geometry.
    ///
    /// A `local` of `None` lets the device choose its own work-group size.
    fn resolve_kernel(
        &self,
        program: &Self::Program,
        entry: &str,
        global: Geometry,
        local: Option<Geometry>,
        order: usize,
        buffers: &DeviceBuffers<Self::Buffer>,
    ) -> Result<Self::Kernel, Self::Error>;

    /// Submits a kernel dispatch to the queue, without waiting for it.
    fn enqueue(&self, kernel: &Self::Kernel) -> Result<(), Self::Error>;

    /// Blocks until all submitted work has completed.
    fn finish(&self) -> Result<QueueIdle, Self::Error>;

    /// Blocking transfer of a device buffer into `host`.
    fn download(
        &self,
        buffer: &Self::Buffer,
        idle: &QueueIdle,
        host: &mut [f32],
    ) -> Result<(), Self::Error>;

    /// Human-readable name of the device.
    fn name(&self) -> String;
}

/// Whether an enumeration status only means that there was nothing to enumerate.
fn is_not_found(status: Option<Status>) -> bool {
    matches!(
        status,
        Some(Status::CL_PLATFORM_NOT_FOUND_KHR) | Some(Status::CL_DEVICE_NOT_FOUND)
    )
}

/// Maps a "nothing found" enumeration error to an empty list.
fn or_empty<T>(listed: ocl::Result<Vec<T>>) -> ocl::Result<Vec<T>> {
    match listed {
        Err(err) if is_not_found(err.api_status()) => Ok(Vec::new()),
        listed => listed,
    }
}

/// Lists every device of every available OpenCL platform, in platform order.
///
/// A host without platforms, or a platform without devices, contributes no entries.
pub fn list_devices() -> ocl::Result<Vec<(Platform, Device)>> {
    let ids = or_empty(ocl::core::get_platform_ids().map_err(ocl::Error::from))?;
    let mut devices = Vec::new();
    for platform in Platform::list_from_core(ids) {
        for device in or_empty(Device::list_all(platform))? {
            devices.push((platform, device));
        }
    }
    Ok(devices)
}

/// Returns the name of a device, or a placeholder if it cannot be queried.
pub fn name_of(device: &Device) -> String {
    device
        .name()
        .unwrap_or_else(|_| String::from("<unknown device>"))
}

/// Picks the device at `index` out of the enumerated `devices`.
pub fn select<T>(devices: Vec<T>, index: usize) -> Result<T, HarnessError> {
    let count = devices.len();
    devices
        .into_iter()
        .nth(index)
        .ok_or(HarnessError::DeviceSelection { index, count })
}

/// OpenCL device, along with the context and in-order command queue bound to it.
///
/// All buffers and kernels are created against this context and queue, so they must not outlive
/// the `ClDevice`.
pub struct ClDevice {
    device: Device,
    context: Context,
    queue: Queue,
}

impl ClDevice {
    /// Selects the device at `index` in [`list_devices`] and creates its context and queue.
    pub fn select(index: usize) -> Result<Self, HarnessError> {
        let (platform, device) = select(list_devices()?, index)?;

        let context = Context::builder()
            .platform(platform)
            .devices(device)
            .build()?;
        let queue = Queue::new(&context, device, None)?;
        info!("Using OpenCL device: {}", name_of(&device));

        Ok(Self {
            device,
            context,
            queue,
        })
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }
}

/// OpenCL error, flattened to its diagnostic message.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ClError {
    message: String,
}

impl From<ocl::Error> for ClError {
    fn from(err: ocl::Error) -> Self {
        Self {
            message: err.to_string(),
        }
    }
}

impl ComputeDevice for ClDevice {
    type Error = ClError;
    type Buffer = Buffer<f32>;
    type Program = Program;
    type Kernel = Kernel;

    fn upload(&self, host: &[f32]) -> Result<Buffer<f32>, ClError> {
        debug!("Uploading {} elements", host.len());
        Ok(Buffer::builder()
            .queue(self.queue().clone())
            .flags(MemFlags::new().read_only())
            .len(host.len())
            .copy_host_slice(host)
            .build()?)
    }

    fn allocate_result(&self, len: usize) -> Result<Buffer<f32>, ClError> {
        Ok(Buffer::builder()
            .queue(self.queue().clone())
            .flags(MemFlags::new().write_only())
            .len(len)
            .build()?)
    }

    fn build_program(&self, source: &str, order: usize) -> Result<Program, ClError> {
        // `ORDER` sizes the private arrays of the kernels that need one
        Ok(Program::builder()
            .src(source)
            .devices(self.device)
            .cmplr_def("ORDER", order as i32)
            .build(self.context())?)
    }

    fn resolve_kernel(
        &self,
        program: &Program,
        entry: &str,
        global: Geometry,
        local: Option<Geometry>,
        order: usize,
        buffers: &DeviceBuffers<Buffer<f32>>,
    ) -> Result<Kernel, ClError> {
        let mut builder = Kernel::builder();
        builder
            .program(program)
            .name(entry)
            .queue(self.queue().clone())
            .global_work_size(global)
            .arg(order as i32)
            .arg(&buffers.a)
            .arg(&buffers.b)
            .arg(&buffers.c);
        if let Some(local) = local {
            builder.local_work_size(local);
        }
        Ok(builder.build()?)
    }

    fn enqueue(&self, kernel: &Kernel) -> Result<(), ClError> {
        // SAFETY: the kernel arguments are the shared buffers, all sized for `order * order`
        // elements, and the kernels never index past `N * N`.
        unsafe { kernel.enq()? };
        Ok(())
    }

    fn finish(&self) -> Result<QueueIdle, ClError> {
        self.queue().finish()?;
        Ok(QueueIdle::confirmed())
    }

    fn download(
        &self,
        buffer: &Buffer<f32>,
        _idle: &QueueIdle,
        host: &mut [f32],
    ) -> Result<(), ClError> {
        // Blocking read on the buffer's default queue
        buffer.read(host).enq()?;
        Ok(())
    }

    fn name(&self) -> String {
        name_of(&self.device)
    }
}
