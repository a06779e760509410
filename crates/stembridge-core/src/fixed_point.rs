//! Fixed-point encoding of normalized parameter values.
//!
//! Hosts with an integer control ABI exchange parameter values as signed
//! 32-bit integers spanning the whole `i32` range. A normalized value `v`
//! in `[0, 1]` maps affinely onto it:
//!
//! ```text
//! encode(v) = round_half_even(clamp(v * 0xFFFFFFFF - 0x80000000, i32::MIN, i32::MAX))
//! decode(n) = (n + 0x80000000) / 0xFFFFFFFF
//! ```
//!
//! so `0.0` encodes to `i32::MIN` and `1.0` to `i32::MAX`. All arithmetic is
//! done in `f64`, which keeps decode(encode(v)) within 2^-32 of `v`.

use crate::types::ParameterValue;

const SCALE: f64 = 4_294_967_295.0; // 0xFFFFFFFF
const OFFSET: f64 = 2_147_483_648.0; // 0x80000000

/// Encode a normalized value into the host's integer representation.
///
/// Values outside `[0, 1]` saturate at the ends of the `i32` range. NaN
/// encodes as `i32::MIN`.
pub fn encode(value: ParameterValue) -> i32 {
    let scaled = (value * SCALE - OFFSET).clamp(i32::MIN as f64, i32::MAX as f64);
    // `as` saturates and maps NaN to 0; route NaN to the bottom of the range
    if scaled.is_nan() {
        return i32::MIN;
    }
    // ties go to even, matching the host's own conversion bit for bit
    scaled.round_ties_even() as i32
}

/// Decode the host's integer representation into a normalized value.
pub fn decode(value: i32) -> ParameterValue {
    (value as i64 + 0x8000_0000) as f64 / SCALE
}
