//! Benchmark profiles for numdev.
//!
//! - [`PROFILE_DIMS`]: the array shapes every benchmark sweeps
//! - [`seeded_host`]: a deterministic host array of a given shape

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use numdev_array::HostArray;
use numdev_core::Shape;
use numdev_test_utils::random_f32;

/// Shapes swept by the benchmarks: 4 KiB, 1 MiB, and 16 MiB of `f32`.
pub const PROFILE_DIMS: [&[usize]; 3] = [&[1024], &[512, 512], &[64, 256, 256]];

/// A host array of `dims` filled with seeded values in `[-1, 1)`.
///
/// Returns an empty array if `dims` is not a valid shape.
pub fn seeded_host(dims: &[usize], seed: u64) -> HostArray<f32> {
    let Ok(shape) = Shape::new(dims) else {
        return HostArray::new();
    };
    HostArray::<f32>::from_slice(dims, &random_f32(shape.len(), seed))
        .unwrap_or_else(|_| HostArray::new())
}

/// A readable label for `dims`, e.g. `512x512`.
pub fn label(dims: &[usize]) -> String {
    dims.iter()
        .map(usize::to_string)
        .collect::<Vec<_>>()
        .join("x")
}
