//! Utility functions and types used accross the library
use crate::Scalar;

/// Restrict value to a certain interval
#[inline]
pub fn clamp<T>(val: T, min: T, max: T) -> T
where
    T: PartialOrd,
{
    if val < min {
        min
    } else if val > max {
        max
    } else {
        val
    }
}

/// Number of segments used to approximate an arc
///
/// Density grows with square root of `extent` (sum of device radii along both
/// axes), `fraction` is the part of the full circle covered by the arc.
pub(crate) fn arc_segments(
    quality: Scalar,
    extent: Scalar,
    fraction: Scalar,
    min: usize,
    max: usize,
) -> usize {
    let full = (quality * extent.max(0.0).sqrt()).min(256.0);
    let count = (full * fraction).round();
    clamp(count, min as Scalar, max as Scalar) as usize
}
