//! Kernel implementations.
//!
//! This modules contains the device program units and the host kernels used as a baseline.

pub mod device {
    //! Device program units.

    use std::{borrow::Cow, fs, io, path::PathBuf};

    /// Represents a device program unit.
    ///
    /// Device kernels are written in OpenCL C and handed to the OpenCL compiler as raw text. Every
    /// unit exposes the same entry point, `mmul(N, A, B, C)`.
    pub struct ProgramUnit {
        name: &'static str,
        source: &'static str,
    }

    impl ProgramUnit {
        /// Creates a `ProgramUnit` from a file name and its contents.
        pub const fn new(name: &'static str, source: &'static str) -> Self {
            Self { name, source }
        }

        /// Returns the name the program is looked up by.
        pub fn name(&self) -> &'static str {
            self.name
        }

        /// Returns the OpenCL C source code of the program.
        pub fn source(&self) -> &'static str {
            self.source
        }
    }

    /// One work item per element of `C`.
    pub static CL_OPTIMIZE_COMMON: ProgramUnit = ProgramUnit::new(
        "optimize_common.cl",
        include_str!("../kernels/opencl/optimize_common.cl"),
    );

    /// One work item per row of `C`.
    pub static CL_OPTIMIZE_PER_ROW: ProgramUnit = ProgramUnit::new(
        "optimize_per_row.cl",
        include_str!("../kernels/opencl/optimize_per_row.cl"),
    );

    /// One work item per row of `C`, row of `A` in private memory.
    pub static CL_OPTIMIZE_PRIVATE: ProgramUnit = ProgramUnit::new(
        "optimize_private.cl",
        include_str!("../kernels/opencl/optimize_private.cl"),
    );

    static EMBEDDED: [&ProgramUnit; 3] =
        [&CL_OPTIMIZE_COMMON, &CL_OPTIMIZE_PER_ROW, &CL_OPTIMIZE_PRIVATE];

    /// Loads the source text of a program unit given its name.
    pub trait ProgramSource {
        fn load(&self, name: &str) -> io::Result<Cow<'static, str>>;
    }

    /// Program units compiled into the binary.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct EmbeddedSources;

    impl ProgramSource for EmbeddedSources {
        fn load(&self, name: &str) -> io::Result<Cow<'static, str>> {
            EMBEDDED
                .iter()
                .find(|unit| unit.name() == name)
                .map(|unit| Cow::Borrowed(unit.source()))
                .ok_or_else(|| {
                    io::Error::new(
                        io::ErrorKind::NotFound,
                        format!("no embedded program named `{name}`"),
                    )
                })
        }
    }

    /// Program units read from a directory on disk.
    #[derive(Clone, Debug)]
    pub struct DirSources {
        dir: PathBuf,
    }

    impl DirSources {
        pub fn new(dir: impl Into<PathBuf>) -> Self {
            Self { dir: dir.into() }
        }
    }

    impl ProgramSource for DirSources {
        fn load(&self, name: &str) -> io::Result<Cow<'static, str>> {
            fs::read_to_string(self.dir.join(name)).map(Cow::Owned)
        }
    }

}

pub mod host {
    //! Host kernel implementations.
    //!
    //! The parallel implementation relies on the [`rayon`][1] crate.
    //!
    //! [1]: https://crates.io/crates/rayon

    use rayon::prelude::*;

    // NOTE: Both kernels walk `B` row by row (i-k-j loop order) so the inner loop is contiguous.

    // Sequential implementation of the matrix multiplication (using iterators).
    #[allow(non_snake_case)]
    pub fn matmul(n: usize, A: &[f32], B: &[f32], C: &mut [f32]) {
        C.chunks_exact_mut(n)
            .zip(A.chunks_exact(n))
            .for_each(|(c_row, a_row)| row_product(a_row, B, c_row));
    }

    // Parallel implementation of the matrix multiplication (using `rayon`'s parallel iterators).
    #[allow(non_snake_case)]
    pub fn par_matmul(n: usize, A: &[f32], B: &[f32], C: &mut [f32]) {
        C.par_chunks_exact_mut(n)
            .zip(A.par_chunks_exact(n))
            .for_each(|(c_row, a_row)| row_product(a_row, B, c_row));
    }

    #[allow(non_snake_case)]
    fn row_product(a_row: &[f32], B: &[f32], c_row: &mut [f32]) {
        c_row.fill(0.0);
        a_row
            .iter()
            .zip(B.chunks_exact(c_row.len()))
            .for_each(|(a_ik, b_row)| {
                c_row
                    .iter_mut()
                    .zip(b_row)
                    .for_each(|(c_ij, b_kj)| *c_ij += *a_ik * *b_kj);
            });
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn small_product() {
            // [1 2; 3 4] * [5 6; 7 8] = [19 22; 43 50]
            let a = [1.0, 2.0, 3.0, 4.0];
            let b = [5.0, 6.0, 7.0, 8.0];
            let mut c = [0.0; 4];
            matmul(2, &a, &b, &mut c);
            assert_eq!(c, [19.0, 22.0, 43.0, 50.0]);

            let mut c = [-1.0; 4];
            par_matmul(2, &a, &b, &mut c);
            assert_eq!(c, [19.0, 22.0, 43.0, 50.0]);
        }

        #[test]
        fn non_commutative() {
            let a = [0.0, 1.0, 0.0, 0.0];
            let b = [0.0, 0.0, 1.0, 0.0];
            let mut ab = [0.0; 4];
            let mut ba = [0.0; 4];
            matmul(2, &a, &b, &mut ab);
            matmul(2, &b, &a, &mut ba);
            assert_eq!(ab, [1.0, 0.0, 0.0, 0.0]);
            assert_eq!(ba, [0.0, 0.0, 0.0, 1.0]);
        }
    }
}
