//! Core library for the PulseHz step sequencer.
//!
//! An [`Arrangement`] advances a tempo-locked sync step and, on every step,
//! asks each of its render units to evaluate a value function and paint the
//! result onto a host-owned surface. Value functions are pure; the only
//! mutable transport state lives in the arrangement.

pub mod arrangement;
pub mod config;
pub mod error;
pub mod generator;
pub mod render;
pub mod scale;
pub mod timeline;

pub use arrangement::{
    Arrangement, FrameReport, RenderPhase, TransportSnapshot, TransportState, UnitFailure, UnitId,
};
pub use config::{ArrangementConfig, ClockConfig, LoopGeometry, UnitConfig};
pub use error::{PulseError, Result};
pub use generator::{ramp, sine, Generator, GeneratorFn, ValueFunction};
pub use render::{PaintFn, Render, RenderUnit, RenderUnitBuilder, Surface};
pub use scale::{scale_from_default, scale_linear, scale_log};
pub use timeline::{Tempo, Ticker};
