//! The saturation curve shared by propagation and training.
//!
//! Every weighted sum is squashed with `tanh(sum * π)`. The extra `π` steepens the curve so that
//! modest sums already approach ±1.
//!
//! The trainer's derivative is evaluated on the *activation* rather than the pre-squash sum:
//! `1 - tanh(a * π)^2`. Trained weights depend on this exact rule, which is not the analytic
//! derivative of `squash`.

use std::f64::consts::PI;

use num_traits::{Float, FloatConst};

/// Multiplier applied to a weighted sum before `tanh`.
pub const SQUASH_SCALE: f64 = PI;

#[inline]
pub fn squash(sum: f64) -> f64 {
    (sum * SQUASH_SCALE).tanh()
}

/// Derivative term used by the trainer, computed in the activation's own precision.
#[inline]
pub fn tanh_derivative<A: Float + FloatConst>(activation: A) -> A {
    let t = (activation * A::PI()).tanh();
    A::one() - t * t
}
