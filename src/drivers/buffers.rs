//! Buffer manager.
//!
//! Mirrors the host matrices on the device. `A` and `B` are uploaded exactly once per run and then
//! shared, read-only, by every strategy and every trial; re-uploading them between trials would add
//! transfer costs to some strategies and not others. `C` is allocated once as well and is only ever
//! overwritten by the next dispatch.

use super::device::{ComputeDevice, QueueIdle};
use crate::{error::HarnessError, matrix::Matrix};

use tracing::debug;

/// Device buffers shared by every strategy: `A` and `B` (read-only) and `C` (write-only).
#[derive(Debug)]
pub struct DeviceBuffers<B> {
    pub a: B,
    pub b: B,
    pub c: B,
}

/// Creates the read-only device mirrors of `A` and `B` from their current host contents.
#[allow(non_snake_case)]
pub fn upload<D: ComputeDevice>(
    device: &D,
    A: &Matrix,
    B: &Matrix,
) -> Result<(D::Buffer, D::Buffer), D::Error> {
    let d_a = device.upload(A.as_slice())?;
    let d_b = device.upload(B.as_slice())?;
    Ok((d_a, d_b))
}

/// Creates the write-only result buffer, sized for `order * order` elements.
pub fn allocate_result<D: ComputeDevice>(device: &D, order: usize) -> Result<D::Buffer, D::Error> {
    device.allocate_result(order * order)
}

impl<B> DeviceBuffers<B> {
    /// Uploads `A` and `B` and allocates `C` on `device`.
    #[allow(non_snake_case)]
    pub fn prepare<D>(device: &D, A: &Matrix, B: &Matrix) -> Result<Self, HarnessError>
    where
        D: ComputeDevice<Buffer = B>,
    {
        let setup = |source: D::Error| HarnessError::BufferSetup {
            source: Box::new(source),
        };

        let (a, b) = upload(device, A, B).map_err(setup)?;
        let c = allocate_result(device, A.order()).map_err(setup)?;
        debug!("Device buffers ready for order {}", A.order());

        Ok(Self { a, b, c })
    }

    /// Blocking transfer of the device result buffer into the host matrix `C`.
    ///
    /// Requires the [`QueueIdle`] token of the completion barrier that followed the dispatch
    /// producing the result.
    #[allow(non_snake_case)]
    pub fn download<D>(&self, device: &D, idle: &QueueIdle, C: &mut Matrix) -> Result<(), D::Error>
    where
        D: ComputeDevice<Buffer = B>,
    {
        device.download(&self.c, idle, C.as_mut_slice())
    }
}
