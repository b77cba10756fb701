// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Float keys for hashing and vertex welding.
//!
//! Stored coordinates are never rewritten; these are projections used when
//! floats participate in identity.

/// Bits of `x` with `-0.0` folded into `0.0` and all NaNs into one quiet NaN.
pub fn canonical_bits(x: f64) -> u64 {
    if x.is_nan() {
        f64::NAN.to_bits()
    } else if x == 0.0 {
        0
    } else {
        x.to_bits()
    }
}

/// Integer cell of `x` on a grid of size `tolerance`.
///
/// Without a positive tolerance the cell is the canonical bit pattern, so
/// only identical values share a cell.
pub fn weld_cell(x: f64, tolerance: Option<f64>) -> i64 {
    match tolerance {
        Some(t) if t > 0.0 => {
            let q = (x / t).round();
            if q == 0.0 {
                0
            } else {
                q as i64
            }
        }
        _ => i64::from_ne_bytes(canonical_bits(x).to_ne_bytes()),
    }
}
