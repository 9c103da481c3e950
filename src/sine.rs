//! First-quadrant sine primitive: a 256-entry lookup table plus linear
//! interpolation.
//!
//! The table is generated at compile time by a small `const fn` Taylor
//! series evaluator instead of being checked in as a literal array of magic
//! numbers, so the derivation stays auditable in the source itself.

use crate::fixedmath::{qmul, UQ016};

const fn f_abs(x: f64) -> f64 {
    if x < 0.0 {
        -x
    } else {
        x
    }
}

const fn factorial(mut n: u64) -> u64 {
    let mut ret = 1u64;
    while n > 1 {
        ret *= n;
        n -= 1;
    }
    ret
}

const fn powi(x: f64, mut n: u32) -> f64 {
    let mut ret = 1.0;
    while n > 0 {
        ret *= x;
        n -= 1;
    }
    ret
}

/// Evaluate `sin(theta)` via a Taylor series around zero, summing terms
/// until they fall below `DELTA`.  Only used at const-eval time to build
/// [`LUT`]; not part of the runtime hot path.
const fn sin_taylor(theta: f64) -> f64 {
    const DELTA: f64 = 1.0 / (1u64 << 40) as f64;
    let mut n = 1u64;
    let mut term = theta;
    let mut acc = theta;
    while f_abs(term) > DELTA {
        let sign = if n % 2 != 0 { -1.0 } else { 1.0 };
        let exp = (2 * n + 1) as u32;
        term = sign * powi(theta, exp) / (factorial(exp as u64) as f64);
        acc += term;
        n += 1;
        if n > 40 {
            break;
        }
    }
    acc
}

const fn build_lut() -> [UQ016; 256] {
    let mut table = [UQ016::ZERO; 256];
    let mut k = 0usize;
    while k < 256 {
        // sin(k * pi / 512), scaled into the UQ0.16 container.
        let theta = (k as f64) * core::f64::consts::PI / 512.0;
        let value = sin_taylor(theta);
        let bits = (value * 65536.0) as u32;
        // k == 0 gives exactly 0; every other entry is strictly less than
        // 65536 since sin(theta) < 1 for theta < pi/2.
        table[k] = UQ016::from_bits(bits as u16);
        k += 1;
    }
    table
}

/// `sin(k*pi/512)` for `k = 0..255`, stored as [`UQ016`].  `sin(pi/2) == 1`
/// is not representable in Q0.16 and is therefore not in the table; callers
/// at `key0 == 255` treat the missing neighbour as the value 1 (see
/// [`qsin`]).
const LUT: [UQ016; 256] = build_lut();

/// Evaluate `sin(phi)` for `phi` in the first quadrant, `[0, pi/2)`,
/// represented as the low 14 bits of a [`UQ016`] phase (`phi < 0x4000`).
/// Returns the magnitude as a [`UQ016`] in `[0, 1)`.
pub fn qsin(phi: UQ016) -> UQ016 {
    debug_assert!(phi.to_bits() < 0x4000, "qsin domain is [0, pi/2)");
    let bits14 = phi.to_bits();
    let key0 = (bits14 >> 6) as usize;
    let sub_step = bits14 & 0x3F;
    if sub_step == 0 {
        return LUT[key0];
    }
    let coef = UQ016::from_bits(sub_step << 10);
    let one_minus_coef = UQ016::ZERO.wrapping_sub(coef);
    let lo_term = qmul(LUT[key0], one_minus_coef);
    let hi_term = if key0 + 1 == 256 {
        // The neighbour is the unrepresentable value 1; qmul(1, coef) == coef.
        coef
    } else {
        qmul(LUT[key0 + 1], coef)
    };
    lo_term + hi_term
}
