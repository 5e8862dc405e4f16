//! Matrix utilities.
//!
//! Matrices are stored as flat row-major vectors of `N²` single-precision values. The same fill
//! rule is used for the host baseline and every device strategy so that all results can be checked
//! against one reference.

use crate::consts::{AVAL, BVAL};

use rand::prelude::*;
use rayon::prelude::*;

/// Square, row-major, single-precision matrix.
///
/// The length of the underlying storage is always `order * order` and never changes after
/// allocation.
#[derive(Clone, Debug, PartialEq)]
pub struct Matrix {
    order: usize,
    data: Vec<f32>,
}

impl Matrix {
    /// Allocates a zero-filled matrix of the given order.
    pub fn zeroed(order: usize) -> Self {
        Self {
            order,
            data: vec![0.0; order * order],
        }
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Iterator over the elements of column `j`.
    pub fn column(&self, j: usize) -> impl Iterator<Item = f32> + '_ {
        self.data.iter().skip(j).step_by(self.order).copied()
    }

    /// Row `i` as a slice.
    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.order..(i + 1) * self.order]
    }
}

/// Rule used to fill the `A` and `B` operands.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FillRule {
    /// Every element of `A` is `a`, every element of `B` is `b`.
    Constant { a: f32, b: f32 },
    /// Pseudo-random values in [0.0, 100.0), reproducible from the seed.
    Random { seed: u64 },
}

impl Default for FillRule {
    fn default() -> Self {
        Self::Constant { a: AVAL, b: BVAL }
    }
}

/// Produces a random vector of length `n`, filled with values in the range [0.0, 100.0).
fn rand_vector(n: usize, seed: u64) -> Vec<f32> {
    let mut rng = rand::rngs::SmallRng::seed_from_u64(seed);
    let between = rand::distributions::Uniform::new(0.0_f32, 100.0_f32);
    (0..n).map(|_| between.sample(&mut rng)).collect()
}

/// Fills `A` and `B` according to `fill` and zeroes `C`.
///
/// # Panics
/// Panics if the three matrices do not share the same order.
#[allow(non_snake_case)]
pub fn initialize(fill: &FillRule, A: &mut Matrix, B: &mut Matrix, C: &mut Matrix) {
    assert_eq!(A.order, B.order);
    assert_eq!(A.order, C.order);

    match *fill {
        FillRule::Constant { a, b } => {
            A.data.fill(a);
            B.data.fill(b);
        }
        FillRule::Random { seed } => {
            let len = A.data.len();
            A.data = rand_vector(len, seed);
            // `B` gets its own stream, otherwise both operands would be identical
            B.data = rand_vector(len, seed.wrapping_add(1));
        }
    }
    zero(C);
}

/// Resets every element of `C` to zero.
#[allow(non_snake_case)]
pub fn zero(C: &mut Matrix) {
    C.data.fill(0.0);
}

/// Reference value of cell `(i, j)` of `A * B`, accumulated in double precision.
#[allow(non_snake_case)]
pub fn expected_value(A: &Matrix, B: &Matrix, i: usize, j: usize) -> f64 {
    A.row(i)
        .iter()
        .zip(B.column(j))
        .map(|(a, b)| *a as f64 * b as f64)
        .sum()
}

/// Outcome of the validation of a result matrix.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Validation {
    /// Number of cells outside of the tolerance (`NaN` cells included).
    pub mismatches: usize,
    /// Sum of the squared errors over all cells.
    pub errsq: f64,
}

impl Validation {
    pub fn is_correct(&self) -> bool {
        self.mismatches == 0
    }
}

/// Expected product matrix, computed once per run and shared by every strategy.
#[derive(Clone, Debug)]
pub struct Reference {
    expected: Vec<f64>,
    tolerance: f64,
}

impl Reference {
    /// Computes the expected product of `A` and `B`.
    ///
    /// The constant fill rule has a closed form (`N * a * b`); otherwise every cell is computed
    /// as a dot product, in parallel over the rows.
    #[allow(non_snake_case)]
    pub fn new(fill: &FillRule, A: &Matrix, B: &Matrix, tolerance: f32) -> Self {
        let order = A.order;
        let expected = match *fill {
            FillRule::Constant { a, b } => {
                vec![order as f64 * a as f64 * b as f64; order * order]
            }
            FillRule::Random { .. } => (0..order * order)
                .into_par_iter()
                .map(|idx| expected_value(A, B, idx / order, idx % order))
                .collect(),
        };

        Self {
            expected,
            tolerance: tolerance as f64,
        }
    }

    /// Compares every cell of `C` against the reference.
    #[allow(non_snake_case)]
    pub fn validate(&self, C: &Matrix) -> Validation {
        assert_eq!(C.data.len(), self.expected.len());

        C.data
            .iter()
            .zip(&self.expected)
            .fold(Validation::default(), |mut acc, (c, e)| {
                let err = *c as f64 - e;
                acc.errsq += err * err;
                // `!(x <= tol)` so that NaN counts as a mismatch
                if !(err.abs() <= self.tolerance * e.abs().max(1.0)) {
                    acc.mismatches += 1;
                }
                acc
            })
    }
}
