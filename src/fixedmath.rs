//! Fixed-point Q-format types and the conversions between them.
//!
//! As with the equivalent module in the library this crate is patterned on,
//! these functions prioritize speed and a documented, auditable bit-pattern
//! over generality: don't reach for them outside this crate's own domain.

use crate::error::DomainError;
use fixed::types::{I11F21, I1F15, U0F16, U10F22};

/// A signed Q0.15 value in `[-1, 1)`.  This is the oscillator's sample
/// output format: 16 bits, one sign bit and 15 fractional bits.
pub type SQ015 = I1F15;
/// An unsigned Q0.16 value in `[0, 1)`.  Used for phase, frequency,
/// attenuation, and as the unsigned magnitude produced by [`crate::sine`].
pub type UQ016 = U0F16;
/// A signed Q0.21 value in `[-1, 1)`, stored in a 32 bit container.
pub type SQ021 = I11F21;
/// An unsigned Q0.22 value in `[0, 1)`, stored in a 32 bit container.
pub type UQ022 = U10F22;

/// Widen a [`SQ015`] value to [`SQ021`], zero-filling the six new low
/// fractional bits.  Always exact; widening never loses precision.
pub fn sq015_to_sq021(x: SQ015) -> SQ021 {
    SQ021::from_bits((x.to_bits() as i32) << 6)
}

/// Narrow a [`SQ021`] value to [`SQ015`] by an arithmetic right shift,
/// truncating the low 6 fractional bits toward negative infinity.
pub fn sq021_to_sq015(x: SQ021) -> SQ015 {
    SQ015::from_bits((x.to_bits() >> 6) as i16)
}

/// Widen a [`UQ016`] value to [`UQ022`], zero-filling the six new low
/// fractional bits.  Always exact.
pub fn uq016_to_uq022(x: UQ016) -> UQ022 {
    UQ022::from_bits((x.to_bits() as u32) << 6)
}

/// Narrow a [`UQ022`] value to [`UQ016`] by a logical right shift,
/// truncating the low 6 fractional bits toward zero.
pub fn uq022_to_uq016(x: UQ022) -> UQ016 {
    UQ016::from_bits((x.to_bits() >> 6) as u16)
}

/// Widen a [`SQ015`] value to the unsigned [`UQ016`] format of the same
/// total width, by shifting the sign bit out and growing the fraction by
/// one bit.  Fails if `x` is negative, since there is no unsigned
/// representation of a negative value.
pub fn sq015_to_uq016(x: SQ015) -> Result<UQ016, DomainError> {
    if x.is_negative() {
        return Err(DomainError::NegativeToUnsigned);
    }
    Ok(UQ016::from_bits((x.to_bits() as u16) << 1))
}

/// Narrow a [`UQ016`] value to the signed [`SQ015`] format of the same
/// total width, by a logical right shift that introduces a zero (i.e.
/// non-negative) sign bit.  This conversion can never fail: the result is
/// always representable and always non-negative.
pub fn uq016_to_sq015(x: UQ016) -> SQ015 {
    SQ015::from_bits((x.to_bits() >> 1) as i16)
}

/// Unsigned Q0.16 multiply: `qmul(a, b) = floor(a * b / 2^16)`, computed in
/// a 32 bit intermediate.  This is truncation, not rounding: it is
/// commutative, monotonic in each argument, and never saturates, since the
/// product of two values each less than 1 is itself less than 1.
pub fn qmul(a: UQ016, b: UQ016) -> UQ016 {
    let product = u32::from(a.to_bits()) * u32::from(b.to_bits());
    UQ016::from_bits((product >> 16) as u16)
}
