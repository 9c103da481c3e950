//! The stateful oscillator: phase advance plus low-amplitude postprocessing.
//!
//! At high attenuation, [`msin`] alone produces a staircase: the same
//! [`SQ015`] code repeated for many consecutive samples, then a jump to the
//! next code. That staircase carries harmonic energy proportional to the
//! step height. [`Oscillator`] detects these runs with a bounded lookahead
//! search and, while one is active, replaces `output`'s value with a
//! duty-cycle-modulated alternation between the run's two codes whose
//! average tracks the true sine shape instead of truncating to it.

use crate::fixedmath::{SQ015, UQ016};
use crate::isqrt::isqrt;
use crate::msin::msin;

/// The maximum allowed configured frequency, `freq <= 0x4000` (`Fo/Fs <= 1/4`,
/// the Nyquist-respecting range required by the rest of the design).
pub const MAX_FREQ: u16 = 0x4000;

/// A single sinusoid generator: configured frequency, phase and attenuation,
/// plus the state of the optional low-amplitude postprocessor.
///
/// All state fields fit in 16 bits, matching the budget of the design this
/// crate is patterned on. There is no heap allocation anywhere in this type;
/// every descriptor owns its state inline and is `Copy`-free only because it
/// is meant to be mutated in place, not because it is expensive to move.
#[derive(Clone, Debug)]
pub struct Oscillator {
    freq: UQ016,
    phi: UQ016,
    att: UQ016,
    en: bool,
    pp: bool,
    phi0: UQ016,
    phi1: UQ016,
    val0: SQ015,
    val1: SQ015,
    sampl: u16,
    steps: u16,
    msize: u16,
    asize: u16,
    sidx: u16,
    ridx: u16,
    aidx: u16,
}

impl Default for Oscillator {
    fn default() -> Self {
        Self {
            freq: UQ016::ZERO,
            phi: UQ016::ZERO,
            att: UQ016::ZERO,
            en: false,
            pp: false,
            phi0: UQ016::ZERO,
            phi1: UQ016::ZERO,
            val0: SQ015::ZERO,
            val1: SQ015::ZERO,
            sampl: 0,
            steps: 0,
            msize: 0,
            asize: 0,
            sidx: 0,
            ridx: 0,
            aidx: 0,
        }
    }
}

impl Oscillator {
    /// Create a new oscillator: `freq = phi = att = 0`, postprocessing
    /// disabled and inactive. Equivalent to [`Oscillator::init`] on a fresh
    /// value.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset this descriptor to its freshly-created state.
    pub fn init(&mut self) {
        *self = Self::default();
    }

    /// Set the oscillator frequency. `freq` must not exceed [`MAX_FREQ`]
    /// (the Nyquist-respecting quarter-sample-rate bound); violating this is
    /// a caller bug, checked with `debug_assert!` per this crate's error
    /// handling convention. Triggers a [restart](Self::restart).
    pub fn set_freq(&mut self, freq: UQ016) {
        debug_assert!(freq.to_bits() <= MAX_FREQ, "freq must be <= 0x4000");
        self.freq = freq;
        self.restart();
    }

    /// Set the current phase. Triggers a [restart](Self::restart).
    pub fn set_phi(&mut self, phi: UQ016) {
        self.phi = phi;
        self.restart();
    }

    /// Set the attenuation. Triggers a [restart](Self::restart).
    pub fn set_att(&mut self, att: UQ016) {
        self.att = att;
        self.restart();
    }

    /// Enable or disable the low-amplitude postprocessor. Triggers a
    /// [restart](Self::restart).
    pub fn set_pp(&mut self, enable: bool) {
        self.en = enable;
        self.restart();
    }

    /// The current phase.
    pub fn phi(&self) -> UQ016 {
        self.phi
    }

    /// Whether a postprocessor interval is currently active.
    pub fn is_pp_active(&self) -> bool {
        self.pp
    }

    /// Any configuration change invalidates whatever postprocessor interval
    /// was in progress. This deactivates it and, if postprocessing is
    /// enabled and the oscillator is running, immediately searches for a new
    /// one starting at the current phase.
    fn restart(&mut self) {
        self.pp = false;
        if self.freq.to_bits() > 0 && self.en {
            self.lookahead();
        }
    }

    /// The current momentary sample: one of the two interval codes while a
    /// postprocessor interval is active, otherwise `msin(phi, att)` directly.
    pub fn output(&self) -> SQ015 {
        if self.pp {
            self.pattern_value()
        } else {
            msin(self.phi, self.att)
        }
    }

    /// Advance by one sample period. A no-op if `freq == 0`. Once every
    /// `sampl` steps — the length of the active interval, or, after a
    /// failed search, the number of samples that search already confirmed
    /// would not change `output`'s plain `msin` result — rolls over (if an
    /// interval was active) and re-searches for the next one.
    pub fn step(&mut self) {
        if self.freq.to_bits() == 0 {
            return;
        }
        self.phi = UQ016::from_bits(self.phi.to_bits().wrapping_add(self.freq.to_bits()));
        if self.en {
            self.sidx += 1;
            if self.sidx >= self.sampl {
                if self.pp {
                    self.phi0 = self.phi1;
                    self.val0 = self.val1;
                }
                self.pp = false;
                self.lookahead();
            }
        }
    }

    /// Record a failed search: `output` keeps using plain `msin` (`pp` stays
    /// cleared), but the search already confirmed the current code persists
    /// for `consumed` more samples, so `step` does not need to retry
    /// `lookahead` until then.
    fn fail_lookahead(&mut self, consumed: u32) {
        self.pp = false;
        self.sampl = consumed.clamp(1, u32::from(u16::MAX)) as u16;
        self.sidx = 0;
    }

    /// Bounded search (at most `2 * 0x4000` evaluations of `msin`) for the
    /// next single-code-step run starting at the current phase, centered on
    /// the code transition and sized for a duty-cycle ramp. Leaves `pp`
    /// cleared if no suitable run is found, matching the precondition that
    /// the caller only invokes this with `pp == 0`.
    fn lookahead(&mut self) {
        let freq_bits = self.freq.to_bits();
        let phi0_bits = self.phi.to_bits();
        let val0 = msin(self.phi, self.att);

        let mut phi1_bits = phi0_bits;
        let mut cnt1: u32 = 0;
        let val1 = loop {
            let v = msin(UQ016::from_bits(phi1_bits), self.att);
            if v != val0 {
                break v;
            }
            if phi1_bits.wrapping_sub(phi0_bits) >= 0x4000 || cnt1 >= 0x4000 {
                self.fail_lookahead(cnt1);
                return;
            }
            phi1_bits = phi1_bits.wrapping_add(freq_bits);
            cnt1 += 1;
        };

        if (i32::from(val1.to_bits()) - i32::from(val0.to_bits())).abs() > 1 {
            self.fail_lookahead(cnt1);
            return;
        }

        let mut phi2_bits = phi1_bits;
        let mut cnt2: u32 = 0;
        loop {
            let v = msin(UQ016::from_bits(phi2_bits), self.att);
            if v != val1 {
                break;
            }
            if phi2_bits.wrapping_sub(phi1_bits) >= 0x4000 || cnt2 >= 0x4000 {
                self.fail_lookahead(cnt1 + cnt2);
                return;
            }
            phi2_bits = phi2_bits.wrapping_add(freq_bits);
            cnt2 += 1;
        }

        // Center the interval on the code transition.
        let half_cnt2 = cnt2 / 2;
        let sampl = (cnt1 + half_cnt2) as u16;
        let phase_advance = ((half_cnt2 * u32::from(freq_bits)) & 0xFFFF) as u16;
        let phi1_bits = phi1_bits.wrapping_add(phase_advance);

        // `sampl` can in theory exceed isqrt's documented domain (its
        // two summands are each bounded by 0x4000, but the sum is not); this
        // is a caller-invisible internal corner, not a contract violation by
        // whoever is driving the oscillator, so isqrt's saturating fallback
        // (rather than a hard failure) is the right behavior here.
        let steps = isqrt(sampl);
        if steps < 2 {
            self.fail_lookahead(u32::from(sampl));
            return;
        }

        let msize = sampl / steps;
        let asize = sampl % steps;
        let ridx = sampl - (steps / 2) * msize;
        let aidx = ridx - asize;

        self.phi0 = UQ016::from_bits(phi0_bits);
        self.phi1 = UQ016::from_bits(phi1_bits);
        self.val0 = val0;
        self.val1 = val1;
        self.sampl = sampl;
        self.steps = steps;
        self.msize = msize;
        self.asize = asize;
        self.ridx = ridx;
        self.aidx = aidx;
        self.sidx = 0;
        self.pp = true;
    }

    /// The output code for the current position inside an active
    /// postprocessor interval.
    fn pattern_value(&self) -> SQ015 {
        let s = self.sidx;
        if s >= self.aidx && s < self.ridx {
            return if (s - self.aidx) % 2 == 1 {
                self.val1
            } else {
                self.val0
            };
        }
        let m = if s < self.ridx {
            s
        } else {
            s - self.asize
        };
        let istep = m / self.msize;
        let iidx = m % self.msize;
        let pidx = iidx % self.steps;
        if pidx >= istep {
            self.val0
        } else {
            self.val1
        }
    }
}

impl Iterator for Oscillator {
    type Item = SQ015;

    /// Read the current sample and advance by one step. A convenience
    /// wrapper over the raw `output`/`step` pair for consumers that want to
    /// drive the oscillator as a plain sample stream.
    fn next(&mut self) -> Option<SQ015> {
        let sample = self.output();
        self.step();
        Some(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn freq(bits: u16) -> UQ016 {
        UQ016::from_bits(bits)
    }

    #[test]
    fn scenario_s1_one_full_cycle() {
        let mut osc = Oscillator::new();
        osc.set_freq(freq(4));
        osc.set_phi(UQ016::ZERO);
        osc.set_att(UQ016::ZERO);
        osc.set_pp(false);
        for i in 0..16384u32 {
            if i == 4096 {
                assert_eq!(osc.output().to_bits(), 0x7FFF);
            }
            osc.step();
        }
        assert_eq!(osc.phi(), UQ016::ZERO);
    }

    #[test]
    fn scenario_s3_nyquist_period_four() {
        let mut osc = Oscillator::new();
        osc.set_pp(false);
        osc.set_freq(freq(MAX_FREQ));
        osc.set_phi(UQ016::ZERO);
        osc.set_att(UQ016::ZERO);
        let expected = [0i32, 0x7FFF, 0, -0x7FFF];
        for &want in expected.iter().cycle().take(16) {
            assert_eq!(i32::from(osc.output().to_bits()), want);
            osc.step();
        }
    }

    #[test]
    fn scenario_s2_low_amplitude_dither_mixes_codes_before_direct_transition() {
        let att = UQ016::from_bits(65528); // 1 - 1/8192
        let mut direct = Oscillator::new();
        direct.set_att(att);
        direct.set_pp(false);
        direct.set_phi(UQ016::ZERO);
        direct.set_freq(freq(1));

        let mut k0 = None;
        let mut direct_codes = [0i16; 2048];
        for (i, slot) in direct_codes.iter_mut().enumerate() {
            let v = direct.output().to_bits();
            *slot = v;
            if k0.is_none() && v != 0 {
                k0 = Some(i);
            }
            direct.step();
        }
        let k0 = k0.expect("direct output must leave zero within this window");
        assert!(direct_codes[..k0].iter().all(|&v| v == 0));
        assert!(direct_codes[k0..].iter().all(|&v| v == 1));

        let mut dithered = Oscillator::new();
        dithered.set_att(att);
        dithered.set_phi(UQ016::ZERO);
        dithered.set_freq(freq(1));
        dithered.set_pp(true);

        let mut saw_zero = false;
        let mut saw_one = false;
        for _ in 0..k0 {
            match dithered.output().to_bits() {
                0 => saw_zero = true,
                1 => saw_one = true,
                other => panic!("unexpected code {other} in the single-code-step regime"),
            }
            dithered.step();
        }
        assert!(saw_zero && saw_one, "pp should interleave both codes before the direct transition");
    }

    #[test]
    fn scenario_s4_zero_freq_holds_output() {
        let mut osc = Oscillator::new();
        osc.set_pp(false);
        osc.set_att(UQ016::ZERO);
        osc.set_phi(freq(0x4000));
        osc.set_freq(UQ016::ZERO);
        for _ in 0..10 {
            assert_eq!(osc.output().to_bits(), 0x7FFF);
            osc.step();
        }
        assert_eq!(osc.phi().to_bits(), 0x4000);
    }

    #[test]
    fn scenario_s5_freq_change_mid_stream_preserves_phase_and_bounds_the_jump() {
        let mut osc = Oscillator::new();
        osc.set_pp(false);
        osc.set_att(UQ016::ZERO);
        osc.set_phi(UQ016::ZERO);
        osc.set_freq(freq(4));
        for _ in 0..100 {
            osc.step();
        }
        let phi_before = osc.phi();
        let sample_before = osc.output();

        osc.set_freq(freq(8));
        // `set_freq` triggers a restart, but a restart only touches the
        // postprocessor; phase itself must be untouched.
        assert_eq!(osc.phi(), phi_before, "changing freq must not move phi");

        let sample_after = osc.output();
        assert_eq!(
            sample_after, sample_before,
            "output must not change until the next step"
        );

        osc.step();
        let expected_next_phi =
            UQ016::from_bits(phi_before.to_bits().wrapping_add(8));
        assert_eq!(osc.phi(), expected_next_phi, "new increment applies immediately");

        let jump = i32::from(osc.output().to_bits()) - i32::from(sample_before.to_bits());
        let bound = i32::from(msin(expected_next_phi, UQ016::ZERO).to_bits())
            - i32::from(msin(phi_before, UQ016::ZERO).to_bits());
        assert_eq!(jump, bound, "the transition jump is exactly msin(phi+8) - msin(phi)");
    }

    #[test]
    fn scenario_s6_isqrt_reexported_values_match() {
        assert_eq!(isqrt(0), 0);
        assert_eq!(isqrt(16129), 127);
    }

    #[test]
    fn postprocessor_neutral_at_zero_attenuation() {
        // |val1 - val0| > 1 away from the flattened tip of the sinusoid, so
        // pp should never engage here; the two configurations must emit
        // identically. See `prop_postprocessor_neutral_at_zero_attenuation`
        // below for the quantified version of this property, and its
        // comment for why the window is bounded away from a quadrant peak.
        let mut direct = Oscillator::new();
        direct.set_freq(freq(4));
        direct.set_att(UQ016::ZERO);
        direct.set_pp(false);

        let mut pp = Oscillator::new();
        pp.set_freq(freq(4));
        pp.set_att(UQ016::ZERO);
        pp.set_pp(true);

        for _ in 0..3000 {
            assert_eq!(direct.output(), pp.output());
            direct.step();
            pp.step();
        }
    }

    #[test]
    fn postprocessor_tracks_mean_at_high_attenuation() {
        let att = UQ016::from_bits(0xFFF8);
        let f = freq(16); // period = 65536/16 = 4096 samples.

        let mut plain = Oscillator::new();
        plain.set_att(att);
        plain.set_pp(false);
        plain.set_freq(f);

        let mut dithered = Oscillator::new();
        dithered.set_att(att);
        dithered.set_pp(true);
        dithered.set_freq(f);

        let mut plain_sum = 0i64;
        let mut dithered_sum = 0i64;
        let mut reference_sum = 0f64;
        const N: u32 = 4096;
        for i in 0..N {
            plain_sum += i64::from(plain.output().to_bits());
            dithered_sum += i64::from(dithered.output().to_bits());
            let phi = 2.0 * core::f64::consts::PI * f64::from(i * 16) / 65536.0;
            reference_sum += libm_sin(phi) * (1.0 - 8.0 / 65536.0) * 32768.0;
            plain.step();
            dithered.step();
        }
        let dithered_mean = dithered_sum as f64 / f64::from(N);
        let reference_mean = reference_sum / f64::from(N);
        assert!(
            (dithered_mean - reference_mean).abs() <= 1.5,
            "dithered mean {dithered_mean} too far from reference {reference_mean}"
        );

        let plain_mean = plain_sum as f64 / f64::from(N);
        // The undithered mean is pinned to one of a handful of staircase
        // codes; it is not expected to track the reference closely.
        let _ = plain_mean;
    }

    fn libm_sin(x: f64) -> f64 {
        let two_pi = 2.0 * core::f64::consts::PI;
        let mut r = x % two_pi;
        if r < 0.0 {
            r += two_pi;
        }
        let (flip, r) = if r > core::f64::consts::PI {
            (-1.0, r - core::f64::consts::PI)
        } else {
            (1.0, r)
        };
        let r = if r > core::f64::consts::FRAC_PI_2 {
            core::f64::consts::PI - r
        } else {
            r
        };
        let mut term = r;
        let mut acc = r;
        let mut n = 1u64;
        while term.abs() > 1e-15 && n < 20 {
            let sign = if n % 2 != 0 { -1.0 } else { 1.0 };
            let exp = 2 * n + 1;
            let mut fact = 1.0;
            let mut p = 1.0;
            for i in 1..=exp {
                fact *= i as f64;
            }
            for _ in 0..exp {
                p *= r;
            }
            term = sign * p / fact;
            acc += term;
            n += 1;
        }
        flip * acc
    }

    #[test]
    fn phase_and_samples_repeat_bit_identically_every_period() {
        let mut osc = Oscillator::new();
        osc.set_freq(freq(4));
        osc.set_att(UQ016::from_bits(1000));
        osc.set_pp(false);
        osc.set_phi(UQ016::ZERO);

        // `reference` is run one full period ahead; since phase wraps
        // exactly, it should then produce the identical sample sequence as
        // `osc`, one period out of phase in time but not in state.
        let mut reference = osc.clone();
        let period = 65536u32 / 4;
        for _ in 0..period {
            reference.step();
        }
        assert_eq!(reference.phi(), osc.phi());

        for _ in 0..period {
            assert_eq!(osc.output(), reference.output());
            osc.step();
            reference.step();
        }
    }

    #[test]
    fn iterator_impl_matches_manual_output_step() {
        let mut manual = Oscillator::new();
        manual.set_freq(freq(37));
        manual.set_att(UQ016::from_bits(1234));
        manual.set_pp(true);

        let mut via_iter = manual.clone();

        for _ in 0..1000 {
            let want = manual.output();
            manual.step();
            let got = via_iter.next().unwrap();
            assert_eq!(got, want);
        }
    }

    use proptest::prelude::*;

    proptest! {
        // Property 6, quantified over freq/phi/step-count rather than the
        // single hardcoded (freq=4, phi=0) case above. The domain is
        // deliberately kept well inside one eighth of a cycle (phase never
        // reaches 0x2000): right at a quadrant peak `sin`'s slope itself
        // flattens, so even at `att == 0` a single-code-step run can arise
        // from quantization resolution alone, which would trip this
        // invariant for a reason unrelated to the postprocessor's own
        // low-amplitude regime.
        #[test]
        fn prop_postprocessor_neutral_at_zero_attenuation(
            freq_bits in 1u16..=0x40,
            phi_start in 0u16..0x1000,
            n_steps in 1u32..=64,
        ) {
            let mut direct = Oscillator::new();
            direct.set_freq(freq(freq_bits));
            direct.set_att(UQ016::ZERO);
            direct.set_phi(UQ016::from_bits(phi_start));
            direct.set_pp(false);

            let mut pp = Oscillator::new();
            pp.set_freq(freq(freq_bits));
            pp.set_att(UQ016::ZERO);
            pp.set_phi(UQ016::from_bits(phi_start));
            pp.set_pp(true);

            for _ in 0..n_steps {
                prop_assert_eq!(direct.output(), pp.output());
                direct.step();
                pp.step();
            }
        }
    }
}
