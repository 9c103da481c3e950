//! This crate implements a fixed-point, block-based sinusoid generator.  It is
//! designed to be `no_std` friendly and allocation-free so that it can run on
//! embedded DSP targets with no hardware floating point unit.
//!
//! The oscillator produces `u(t) = sin(phi(t)) * (1 - att)`, where `phi`
//! advances linearly at a configurable frequency and `att` is a configurable
//! attenuation.  At high attenuation a naive multiply-then-round pipeline
//! collapses the output into a handful of codes and the waveform turns into
//! audible harmonic distortion; [`osc::Oscillator`] avoids this by detecting
//! those low-amplitude intervals and replacing the staircase with a
//! duty-cycle-modulated pulse pattern (see [`osc`] for details).
//!
//! This crate uses the convention (borrowed from the fixed-point DSP library
//! it is grounded on) of naming every Q-format after its container width and
//! fractional bit count, e.g. [`SQ015`] for a signed Q0.15 value, so that the
//! type itself documents its own resolution and range.
//!
//! Most of the relevant code for users can be found in the [osc] module.

// `proptest` and the float-based test oracles used throughout this crate's
// `#[cfg(test)]` modules need `std`; the crate itself stays `no_std` for
// every non-test build.
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

pub mod error;
pub mod fixedmath;
pub mod isqrt;
pub mod msin;
pub mod osc;
pub mod sine;

pub use error::DomainError;
pub use fixedmath::{SQ015, SQ021, UQ016, UQ022};
pub use msin::msin;
pub use osc::Oscillator;
