//! Table-based integer square root, used by the postprocessor to size its
//! duty-cycle pattern.

const fn build_squares() -> [u32; 128] {
    let mut table = [0u32; 128];
    let mut k = 0usize;
    while k < 128 {
        table[k] = (k as u32) * (k as u32);
        k += 1;
    }
    table
}

const SQUARES: [u32; 128] = build_squares();

/// Returns the largest integer `k` such that `k*k <= x`, for `x < 0x4000`.
///
/// The postprocessor's interval-centering step (see
/// [`crate::osc`]) can in theory hand this function an `x` slightly above
/// its documented domain. Rather than make this fallible for an input class
/// that should never arise from a correctly wired caller, the domain is
/// enforced with `debug_assert!` and, if it is compiled out, the search
/// below degrades gracefully: it returns the table's largest root instead
/// of indexing out of bounds.
pub fn isqrt(x: u16) -> u16 {
    debug_assert!(x < 0x4000, "isqrt domain is x < 0x4000, got {x}");
    let x = u32::from(x);
    for (key, &square) in SQUARES.iter().enumerate() {
        if square > x {
            return (key - 1) as u16;
        }
    }
    (SQUARES.len() - 1) as u16
}
