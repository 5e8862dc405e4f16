//! Crate-level constants.

/// Default order of the square matrices.
pub const ORDER: usize = 1024;

/// Largest order for which `N * N` still fits the device-side `int` index.
pub const MAX_ORDER: usize = 46340;

/// Default number of trials performed for each strategy.
pub const COUNT: u16 = 1;

/// Value of every element of `A` under the constant fill rule.
pub const AVAL: f32 = 3.0;

/// Value of every element of `B` under the constant fill rule.
pub const BVAL: f32 = 5.0;

/// Default relative tolerance used when validating a result cell.
pub const TOL: f32 = 1e-3;

/// Divisor applied to the order to get the local work size of the private-memory strategy.
pub const PRIVATE_LOCAL_DIVISOR: usize = 16;

/// Name of the entry point exposed by every device program unit.
pub const ENTRY_POINT: &str = "mmul";
