//! Marker trait for element types stored in raw byte blocks.

#![allow(unsafe_code)]

/// A plain-data type that may be stored in, and byte-copied between,
/// untyped memory blocks in any [`MemorySpace`](crate::MemorySpace).
///
/// # Safety
///
/// Implementors must guarantee that:
///
/// - every bit pattern of `size_of::<Self>()` bytes (in particular all
///   zeros) is a valid value, because blocks are zero-initialised and
///   filled by raw byte copies;
/// - the type contains no pointers, references, or drop glue, because
///   device copies move bytes without running any Rust code.
pub unsafe trait Element: Copy + Send + Sync + 'static {}

macro_rules! impl_element {
    ($($t:ty),* $(,)?) => {
        $(
            // SAFETY: primitive numeric type, every bit pattern is valid.
            unsafe impl Element for $t {}
        )*
    };
}

impl_element!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64);

// SAFETY: arrays of elements inherit validity of every bit pattern.
unsafe impl<T: Element, const N: usize> Element for [T; N] {}
