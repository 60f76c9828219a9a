//! Value functions: pure maps from a sync step and loop geometry to a scalar.
//!
//! Negative steps (reachable through [`crate::Arrangement::step_backward`])
//! are folded into the loop with Euclidean modulo, so step `-1` evaluates like
//! the last step of the loop.

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::{config::LoopGeometry, scale::scale_linear, Result};

/// Plain function pointer form of a value function.
pub type GeneratorFn = fn(i64, f64, f64, f64, &LoopGeometry) -> Result<f64>;

/// Anything that can turn `(step, min_val, max_val, offset, geometry)` into a
/// value. Implemented for every matching `Fn`, so free functions and
/// closures slot in next to the built-in [`Generator`]s.
pub trait ValueFunction {
    fn value(
        &self,
        step: i64,
        min_val: f64,
        max_val: f64,
        offset: f64,
        geometry: &LoopGeometry,
    ) -> Result<f64>;
}

impl<F> ValueFunction for F
where
    F: Fn(i64, f64, f64, f64, &LoopGeometry) -> Result<f64>,
{
    fn value(
        &self,
        step: i64,
        min_val: f64,
        max_val: f64,
        offset: f64,
        geometry: &LoopGeometry,
    ) -> Result<f64> {
        self(step, min_val, max_val, offset, geometry)
    }
}

/// Linear rise from `min_val` to `max_val` over one loop.
///
/// `offset` is added in steps after wrapping, so with a positive offset the
/// last steps of a loop can reach (or pass) `max_val` before the wrap back to
/// `min_val`.
pub fn ramp(
    step: i64,
    min_val: f64,
    max_val: f64,
    offset: f64,
    geometry: &LoopGeometry,
) -> Result<f64> {
    let steps_per_loop = geometry.checked_steps_per_loop()?;
    let effective = step.rem_euclid(steps_per_loop) as f64 + offset;
    scale_linear(effective, [min_val, max_val], [0.0, steps_per_loop as f64])
}

/// Sine wave between `min_val` and `max_val`.
///
/// Each step advances the phase by `geometry.step_increment` cycles.
/// `offset` is a phase shift in cycles (`0.25` is a quarter turn), unlike the
/// step offset of [`ramp`].
pub fn sine(
    step: i64,
    min_val: f64,
    max_val: f64,
    offset: f64,
    geometry: &LoopGeometry,
) -> Result<f64> {
    let steps_per_loop = geometry.checked_steps_per_loop()?;
    let effective = step.rem_euclid(steps_per_loop) as f64;
    let phase = effective * geometry.step_increment * TAU + offset * TAU;
    scale_linear(phase.sin(), [min_val, max_val], [-1.0, 1.0])
}

/// Built-in value functions addressable by name in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Generator {
    #[default]
    Ramp,
    Sine,
}

impl Generator {
    pub fn as_fn(self) -> GeneratorFn {
        match self {
            Self::Ramp => ramp,
            Self::Sine => sine,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Ramp => "ramp",
            Self::Sine => "sine",
        }
    }
}

impl ValueFunction for Generator {
    fn value(
        &self,
        step: i64,
        min_val: f64,
        max_val: f64,
        offset: f64,
        geometry: &LoopGeometry,
    ) -> Result<f64> {
        (self.as_fn())(step, min_val, max_val, offset, geometry)
    }
}
