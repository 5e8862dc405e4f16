//! Instrumented in-memory device, used to test the drivers without OpenCL.
//!
//! Dispatches are queued by [`ComputeDevice::enqueue`] and executed on the host by
//! [`ComputeDevice::finish`]. Each dispatch records its window, from submission to completion, so
//! tests can check that no two dispatches were ever outstanding at the same time.
//!
//! Program sources drive failures: a source containing `#error` fails to build, one containing
//! `fault: dispatch` builds but fails on submission, and one containing `fault: wrong` produces a
//! wrong result (every cell doubled, plus one).

use super::{
    buffers::DeviceBuffers,
    device::{ComputeDevice, Geometry, QueueIdle},
};
use crate::{consts::ENTRY_POINT, kernels::host};

use thiserror::Error;

use std::{
    cell::{Cell, RefCell},
    thread,
    time::{Duration, Instant},
};

#[derive(Debug, Error)]
pub enum FakeError {
    #[error("build failed: {0}")]
    Build(String),
    #[error("no kernel named `{0}`")]
    UnknownEntry(String),
    #[error("invalid work-group size {local:?} for global size {global:?}")]
    WorkGroupSize { global: Geometry, local: Geometry },
    #[error("dispatch rejected")]
    Dispatch,
}

#[derive(Clone, Copy, Debug)]
pub struct FakeProgram {
    fails_dispatch: bool,
    wrong: bool,
}

#[derive(Clone, Debug)]
pub struct FakeKernel {
    program: FakeProgram,
    order: usize,
    global: Geometry,
    local: Option<Geometry>,
    a: usize,
    b: usize,
    c: usize,
}

/// Submission and completion instants of one dispatch.
#[derive(Clone, Copy, Debug)]
pub struct Window {
    pub start: Instant,
    pub end: Instant,
}

#[derive(Default)]
pub struct FakeDevice {
    buffers: RefCell<Vec<Vec<f32>>>,
    uploads: Cell<usize>,
    builds: Cell<usize>,
    pending: RefCell<Vec<(Instant, FakeKernel)>>,
    windows: RefCell<Vec<Window>>,
    geometries: RefCell<Vec<(Geometry, Option<Geometry>)>>,
    download_delay: Cell<Duration>,
}

impl FakeDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of buffers created from host data.
    pub fn uploads(&self) -> usize {
        self.uploads.get()
    }

    /// Number of successful program builds.
    pub fn builds(&self) -> usize {
        self.builds.get()
    }

    /// Windows of every completed dispatch, in submission order.
    pub fn windows(&self) -> Vec<Window> {
        self.windows.borrow().clone()
    }

    /// Global and local geometries of every completed dispatch.
    pub fn geometries(&self) -> Vec<(Geometry, Option<Geometry>)> {
        self.geometries.borrow().clone()
    }

    /// Makes every result transfer take at least `delay`.
    pub fn set_download_delay(&self, delay: Duration) {
        self.download_delay.set(delay);
    }

    pub fn contents(&self, buffer: &usize) -> Vec<f32> {
        self.buffers.borrow()[*buffer].clone()
    }

    pub fn poke(&self, buffer: &usize, data: &[f32]) {
        self.buffers.borrow_mut()[*buffer].copy_from_slice(data);
    }

    fn push_buffer(&self, data: Vec<f32>) -> usize {
        let mut buffers = self.buffers.borrow_mut();
        buffers.push(data);
        buffers.len() - 1
    }

    fn execute(&self, kernel: &FakeKernel) {
        let n = kernel.order;
        let mut out = vec![0.0; n * n];
        {
            let buffers = self.buffers.borrow();
            host::matmul(n, &buffers[kernel.a], &buffers[kernel.b], &mut out);
        }
        if kernel.program.wrong {
            out.iter_mut().for_each(|x| *x = 2.0 * *x + 1.0);
        }
        self.buffers.borrow_mut()[kernel.c].copy_from_slice(&out);
    }
}

impl ComputeDevice for FakeDevice {
    type Error = FakeError;
    type Buffer = usize;
    type Program = FakeProgram;
    type Kernel = FakeKernel;

    fn upload(&self, host: &[f32]) -> Result<usize, FakeError> {
        self.uploads.set(self.uploads.get() + 1);
        Ok(self.push_buffer(host.to_vec()))
    }

    fn allocate_result(&self, len: usize) -> Result<usize, FakeError> {
        // Garbage rather than zeros, like uninitialized device memory
        Ok(self.push_buffer(vec![-1.0; len]))
    }

    fn build_program(&self, source: &str, _order: usize) -> Result<FakeProgram, FakeError> {
        if source.contains("#error") {
            return Err(FakeError::Build(String::from("CL_BUILD_PROGRAM_FAILURE")));
        }
        self.builds.set(self.builds.get() + 1);
        Ok(FakeProgram {
            fails_dispatch: source.contains("fault: dispatch"),
            wrong: source.contains("fault: wrong"),
        })
    }

    fn resolve_kernel(
        &self,
        program: &FakeProgram,
        entry: &str,
        global: Geometry,
        local: Option<Geometry>,
        order: usize,
        buffers: &DeviceBuffers<usize>,
    ) -> Result<FakeKernel, FakeError> {
        if entry != ENTRY_POINT {
            return Err(FakeError::UnknownEntry(entry.to_string()));
        }
        Ok(FakeKernel {
            program: *program,
            order,
            global,
            local,
            a: buffers.a,
            b: buffers.b,
            c: buffers.c,
        })
    }

    fn enqueue(&self, kernel: &FakeKernel) -> Result<(), FakeError> {
        if kernel.program.fails_dispatch {
            return Err(FakeError::Dispatch);
        }
        if let Some(local) = kernel.local {
            if local.size() == 0 || kernel.global.size() % local.size() != 0 {
                return Err(FakeError::WorkGroupSize {
                    global: kernel.global,
                    local,
                });
            }
        }
        self.pending
            .borrow_mut()
            .push((Instant::now(), kernel.clone()));
        Ok(())
    }

    fn finish(&self) -> Result<QueueIdle, FakeError> {
        let pending: Vec<_> = self.pending.borrow_mut().drain(..).collect();
        for (_, kernel) in &pending {
            self.execute(kernel);
        }
        let end = Instant::now();
        for (start, kernel) in pending {
            self.windows.borrow_mut().push(Window { start, end });
            self.geometries
                .borrow_mut()
                .push((kernel.global, kernel.local));
        }
        Ok(QueueIdle::confirmed())
    }

    fn download(
        &self,
        buffer: &usize,
        _idle: &QueueIdle,
        host: &mut [f32],
    ) -> Result<(), FakeError> {
        thread::sleep(self.download_delay.get());
        host.copy_from_slice(&self.buffers.borrow()[*buffer]);
        Ok(())
    }

    fn name(&self) -> String {
        String::from("fake device")
    }
}
