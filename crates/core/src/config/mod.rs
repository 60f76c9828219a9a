use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{generator::Generator, PulseError, Result};

/// Lower bound of the conventional generator output range.
pub const GEN_MIN: f64 = 0.0;
/// Upper bound of the conventional generator output range.
pub const GEN_MAX: f64 = 127.0;
/// The `[GEN_MIN, GEN_MAX]` range paint callbacks scale from by default.
pub const DEFAULT_RANGE: [f64; 2] = [GEN_MIN, GEN_MAX];

pub const DEFAULT_BPM: f64 = 120.0;
pub const DEFAULT_STEPS_PER_BEAT: u32 = 16;
pub const DEFAULT_BEATS_PER_BAR: u32 = 4;
pub const DEFAULT_BARS_PER_LOOP: u32 = 1;
pub const DEFAULT_STEPS_PER_BAR: u32 = DEFAULT_STEPS_PER_BEAT * DEFAULT_BEATS_PER_BAR;

/// Top-level configuration structure for an arrangement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArrangementConfig {
    pub clock: ClockConfig,
    pub clear_before_every_frame: bool,
    pub units: Vec<UnitConfig>,
}

impl Default for ArrangementConfig {
    fn default() -> Self {
        Self {
            clock: ClockConfig::default(),
            clear_before_every_frame: true,
            units: Vec::new(),
        }
    }
}

impl ArrangementConfig {
    /// A small two-lane setup: one ramp and one sine over a single bar.
    pub fn live_defaults() -> Self {
        Self {
            units: vec![
                UnitConfig::new("ramp", Generator::Ramp),
                UnitConfig::new("sine", Generator::Sine),
            ],
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.clock.validate()?;
        for unit in &self.units {
            unit.geometry.validate().map_err(|err| match err {
                PulseError::InvalidConfig(reason) => {
                    PulseError::config(format!("unit `{}`: {reason}", unit.name))
                }
                other => other,
            })?;
        }
        Ok(())
    }
}

/// Tempo settings. The derived timing lives in [`crate::Tempo`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    pub bpm: f64,
    pub steps_per_beat: u32,
    pub beats_per_bar: u32,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            bpm: DEFAULT_BPM,
            steps_per_beat: DEFAULT_STEPS_PER_BEAT,
            beats_per_bar: DEFAULT_BEATS_PER_BAR,
        }
    }
}

impl ClockConfig {
    pub fn with_bpm(bpm: f64) -> Self {
        Self {
            bpm,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.bpm.is_finite() || self.bpm <= 0.0 {
            return Err(PulseError::config(format!(
                "bpm must be a positive number, got {}",
                self.bpm
            )));
        }
        if self.steps_per_beat == 0 {
            return Err(PulseError::config("steps_per_beat must be at least 1"));
        }
        if self.beats_per_bar == 0 {
            return Err(PulseError::config("beats_per_bar must be at least 1"));
        }
        let frames_per_second = self.bpm / 60.0 * f64::from(self.steps_per_beat);
        let step_interval_ms = 1000.0 / frames_per_second;
        if Duration::try_from_secs_f64(step_interval_ms / 1000.0).is_err() {
            return Err(PulseError::config(format!(
                "bpm {} is too slow, one step would last {step_interval_ms} ms",
                self.bpm
            )));
        }
        Ok(())
    }
}

/// How many steps make up one repeating cycle for a render unit, and the
/// range its generator writes into.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopGeometry {
    pub length_in_bars: u32,
    pub steps_per_bar: u32,
    /// Fraction of a sine cycle advanced per step.
    pub step_increment: f64,
    pub offset: f64,
    pub min_val: f64,
    pub max_val: f64,
}

impl Default for LoopGeometry {
    fn default() -> Self {
        Self {
            length_in_bars: DEFAULT_BARS_PER_LOOP,
            steps_per_bar: DEFAULT_STEPS_PER_BAR,
            step_increment: 1.0 / DEFAULT_STEPS_PER_BAR as f64,
            offset: 0.0,
            min_val: GEN_MIN,
            max_val: GEN_MAX,
        }
    }
}

impl LoopGeometry {
    /// Geometry covering `length_in_bars` bars of `steps_per_bar` steps, with
    /// the step increment chosen so a sine completes one cycle per bar.
    pub fn new(length_in_bars: u32, steps_per_bar: u32) -> Result<Self> {
        let geometry = Self {
            length_in_bars,
            steps_per_bar,
            step_increment: 1.0 / steps_per_bar.max(1) as f64,
            ..Self::default()
        };
        geometry.validate()?;
        Ok(geometry)
    }

    pub fn with_range(mut self, min_val: f64, max_val: f64) -> Self {
        self.min_val = min_val;
        self.max_val = max_val;
        self
    }

    pub fn with_offset(mut self, offset: f64) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_step_increment(mut self, step_increment: f64) -> Self {
        self.step_increment = step_increment;
        self
    }

    /// Number of steps in one loop. Zero only for invalid geometry.
    pub fn steps_per_loop(&self) -> u64 {
        u64::from(self.steps_per_bar) * u64::from(self.length_in_bars)
    }

    /// Like [`steps_per_loop`](Self::steps_per_loop) but rejects an empty loop.
    pub fn checked_steps_per_loop(&self) -> Result<i64> {
        match self.steps_per_loop() {
            0 => Err(PulseError::config("a loop must contain at least one step")),
            // u32 * u32 always fits in i64.
            steps => Ok(steps as i64),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.checked_steps_per_loop()?;
        let fields = [
            ("step_increment", self.step_increment),
            ("offset", self.offset),
            ("min_val", self.min_val),
            ("max_val", self.max_val),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(PulseError::config(format!(
                    "{name} must be finite, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Config-side description of a render unit. Surfaces and paint callbacks
/// belong to the host, so only the value side is described here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitConfig {
    pub name: String,
    #[serde(default)]
    pub generator: Generator,
    #[serde(default)]
    pub geometry: LoopGeometry,
}

impl UnitConfig {
    pub fn new(name: impl Into<String>, generator: Generator) -> Self {
        Self {
            name: name.into(),
            generator,
            geometry: LoopGeometry::default(),
        }
    }
}
