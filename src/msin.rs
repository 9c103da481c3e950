//! The modulated-sine primitive: `msin(phi, att) = sin(phi) * (1 - att)`,
//! quantized to [`SQ015`] with a rounding rule that keeps low-amplitude
//! signals from collapsing to zero.

use crate::fixedmath::{qmul, SQ015, UQ016};
use crate::sine::qsin;

const QUARTER: u16 = 0x4000; // pi/2
const HALF: u16 = 0x8000; // pi
const THREE_QUARTER: u16 = 0xC000; // 3pi/2

/// Round an unsigned Q0.16 magnitude down to a non-negative [`SQ015`]
/// magnitude, using round-half-up on the discarded low bit with saturation
/// at the positive maximum.  This is the rounding described in step 5 of
/// `msin`: it is deliberately distinct from the plain truncating narrow in
/// [`crate::fixedmath`], since a zero-mean rounding bias is exactly what
/// lets a tiny but nonzero magnitude alternate between codes instead of
/// truncating to a silent zero.
fn round_narrow(usin: UQ016) -> i16 {
    let bits = usin.to_bits();
    let lsb = bits & 1;
    let mut ssin = bits >> 1;
    if lsb == 1 && ssin < 0x7FFF {
        ssin += 1;
    }
    ssin as i16
}

/// Evaluate `sin(phi) * (1 - att)`, quantized to [`SQ015`].
///
/// `phi` and `att` are both [`UQ016`]; `att` of 0 means no attenuation
/// (full amplitude) and `att` approaching `0x10000` (unrepresentable, since
/// the container tops out at `0xFFFF`) means the output approaches zero.
pub fn msin(phi: UQ016, att: UQ016) -> SQ015 {
    let phi_bits = phi.to_bits();
    let att_bits = att.to_bits();

    // Saturation at the quadrant boundaries: the general folding path below
    // never produces exactly pi/2 internally, so these have to be handled
    // up front.
    if phi_bits == QUARTER || phi_bits == THREE_QUARTER {
        let magnitude = if att_bits == 0 {
            0x7FFF
        } else {
            let one_minus_att = 0u16.wrapping_sub(att_bits);
            round_narrow(UQ016::from_bits(one_minus_att))
        };
        return SQ015::from_bits(if phi_bits == THREE_QUARTER {
            -magnitude
        } else {
            magnitude
        });
    }

    // Quadrant folding into [0, pi/2) plus a sign bit.
    let (phi1_bits, neg) = {
        let (mut p, neg) = if phi_bits >= HALF {
            (phi_bits.wrapping_sub(HALF), true)
        } else {
            (phi_bits, false)
        };
        if p > QUARTER {
            p = HALF.wrapping_sub(p);
        }
        (p, neg)
    };

    let mut usin = qsin(UQ016::from_bits(phi1_bits));
    if att_bits > 0 {
        let one_minus_att = UQ016::from_bits(0u16.wrapping_sub(att_bits));
        usin = qmul(usin, one_minus_att);
    }

    let ssin = round_narrow(usin);
    SQ015::from_bits(if neg { -ssin } else { ssin })
}
