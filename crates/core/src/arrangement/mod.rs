//! Transport engine: owns the sync step, the tempo and the render units, and
//! turns elapsed wall time into clear+render passes.

use std::{fmt, time::Duration};

use serde::Serialize;

use crate::{
    render::Render, ArrangementConfig, ClockConfig, PulseError, Result, Tempo, Ticker,
};

/// Upper bound on ticks fired by a single [`Arrangement::advance`]. A host that
/// stalls for longer than this many intervals skips the backlog.
pub const MAX_CATCH_UP_TICKS: u64 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// Handle returned when a unit joins an arrangement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct UnitId(u64);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unit#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderPhase {
    Clear,
    Render,
}

/// A failure from one unit during one frame.
#[derive(Debug)]
pub struct UnitFailure {
    pub unit: UnitId,
    pub label: String,
    pub phase: RenderPhase,
    pub error: PulseError,
}

/// Outcome of one clear+render pass.
#[derive(Debug)]
pub struct FrameReport {
    pub step: i64,
    pub units: usize,
    pub failures: Vec<UnitFailure>,
}

impl FrameReport {
    fn new(step: i64, units: usize) -> Self {
        Self {
            step,
            units,
            failures: Vec::new(),
        }
    }

    fn record(&mut self, unit: UnitId, label: &str, phase: RenderPhase, error: PulseError) {
        tracing::warn!(step = self.step, %unit, label, ?phase, %error, "render unit failed");
        self.failures.push(UnitFailure {
            unit,
            label: label.to_string(),
            phase,
            error,
        });
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Read-only view of the transport for displays and polling UIs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TransportSnapshot {
    pub sync_step: i64,
    pub state: TransportState,
    pub is_playing: bool,
    pub bpm: f64,
    pub frames_per_second: f64,
    pub step_interval_ms: f64,
    pub current_beat: f64,
    pub current_bar: f64,
    pub units: usize,
}

/// A set of render units driven by one tempo clock.
///
/// The arrangement never spawns anything: the host calls
/// [`advance`](Self::advance) with the wall time that passed, and every due
/// tick renders the current step and then moves it forward by one. Only one
/// ticker exists at a time, and pausing or stopping drops it together with any
/// partially accumulated interval.
pub struct Arrangement {
    tempo: Tempo,
    sync_step: i64,
    state: TransportState,
    clear_before_every_frame: bool,
    units: Vec<(UnitId, Box<dyn Render>)>,
    ticker: Option<Ticker>,
    next_unit_id: u64,
}

impl Arrangement {
    pub fn new(units: Vec<Box<dyn Render>>, bpm: f64) -> Result<Self> {
        let mut arrangement = Self::with_clock(ClockConfig::with_bpm(bpm))?;
        for unit in units {
            arrangement.add_render_unit(unit);
        }
        Ok(arrangement)
    }

    pub fn with_clock(clock: ClockConfig) -> Result<Self> {
        Ok(Self {
            tempo: Tempo::new(clock)?,
            sync_step: 0,
            state: TransportState::Stopped,
            clear_before_every_frame: true,
            units: Vec::new(),
            ticker: None,
            next_unit_id: 0,
        })
    }

    /// Builds an empty arrangement from a config file's clock settings. Units
    /// are added by the host, which owns the surfaces.
    pub fn from_config(config: &ArrangementConfig) -> Result<Self> {
        let mut arrangement = Self::with_clock(config.clock)?;
        arrangement.clear_before_every_frame = config.clear_before_every_frame;
        Ok(arrangement)
    }

    pub fn add_render_unit(&mut self, unit: Box<dyn Render>) -> UnitId {
        let id = UnitId(self.next_unit_id);
        self.next_unit_id += 1;
        tracing::debug!(unit = %id, label = unit.label(), "render unit added");
        self.units.push((id, unit));
        id
    }

    /// Removes the unit registered under `id`, if it is still present.
    pub fn remove_render_unit(&mut self, id: UnitId) -> Option<Box<dyn Render>> {
        let index = self.units.iter().position(|(unit, _)| *unit == id)?;
        let (_, unit) = self.units.remove(index);
        tracing::debug!(unit = %id, label = unit.label(), "render unit removed");
        Some(unit)
    }

    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut (dyn Render + 'static)> {
        self.units
            .iter_mut()
            .find(|(unit, _)| *unit == id)
            .map(|(_, unit)| unit.as_mut())
    }

    pub fn unit_ids(&self) -> Vec<UnitId> {
        self.units.iter().map(|(id, _)| *id).collect()
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// Starts playback from step 0.
    pub fn play(&mut self) {
        self.play_from(0);
    }

    /// Starts playback from `|step|`, replacing any running ticker.
    pub fn play_from(&mut self, step: i64) {
        self.sync_step = step.saturating_abs();
        self.ticker = Some(Ticker::new(self.tempo.step_interval()));
        self.state = TransportState::Playing;
        tracing::debug!(step = self.sync_step, bpm = self.tempo.bpm(), "play");
    }

    pub fn pause(&mut self) {
        self.ticker = None;
        if self.state == TransportState::Playing {
            self.state = TransportState::Paused;
        }
        tracing::debug!(step = self.sync_step, "pause");
    }

    /// Continues from the current step unless already playing.
    pub fn resume(&mut self) {
        if !self.is_playing() {
            self.play_from(self.sync_step);
        }
    }

    /// Rewinds to step 0 and renders that frame once.
    pub fn stop(&mut self) -> FrameReport {
        self.ticker = None;
        self.sync_step = 0;
        let report = self.render_current_frame();
        self.state = TransportState::Stopped;
        tracing::debug!("stop");
        report
    }

    /// Pauses if playing, moves one step forward and renders it.
    pub fn step_forward(&mut self) -> FrameReport {
        if self.is_playing() {
            self.pause();
        }
        self.sync_step = self.sync_step.saturating_add(1);
        tracing::debug!(step = self.sync_step, "step forward");
        self.render_current_frame()
    }

    /// Moves one step back and renders it. A negative step is first clamped
    /// to 0, so the counter never goes below -1.
    pub fn step_backward(&mut self) -> FrameReport {
        if self.sync_step < 0 {
            self.sync_step = 0;
        }
        self.sync_step -= 1;
        tracing::debug!(step = self.sync_step, "step backward");
        self.render_current_frame()
    }

    /// Feeds elapsed wall time into the ticker and fires every due tick.
    /// Returns one report per rendered frame; empty unless playing.
    pub fn advance(&mut self, elapsed: Duration) -> Vec<FrameReport> {
        let Some(ticker) = self.ticker.as_mut() else {
            return Vec::new();
        };
        let mut due = ticker.advance(elapsed);
        if due > MAX_CATCH_UP_TICKS {
            tracing::warn!(
                due,
                kept = MAX_CATCH_UP_TICKS,
                "host fell behind, dropping ticks"
            );
            due = MAX_CATCH_UP_TICKS;
        }

        let mut reports = Vec::with_capacity(due as usize);
        for _ in 0..due {
            match self.tick() {
                Some(report) => reports.push(report),
                None => break,
            }
        }
        reports
    }

    /// One periodic tick: render the current step, then advance it. Does
    /// nothing once the transport has been paused or stopped, so a tick
    /// delivered late by an external scheduler cannot paint a stale frame.
    pub fn tick(&mut self) -> Option<FrameReport> {
        if self.ticker.is_none() {
            return None;
        }
        let report = self.render_current_frame();
        self.sync_step = self.sync_step.saturating_add(1);
        Some(report)
    }

    /// Time until the next periodic tick, or `None` when not playing.
    pub fn time_until_next_tick(&self) -> Option<Duration> {
        self.ticker.as_ref().map(Ticker::until_next)
    }

    /// Clears every surface (if enabled), then renders every unit at the
    /// current step. Failures are collected per unit; the pass always visits
    /// all units.
    pub fn render_current_frame(&mut self) -> FrameReport {
        let step = self.sync_step;
        let mut report = FrameReport::new(step, self.units.len());

        if self.clear_before_every_frame {
            for (id, unit) in &mut self.units {
                if let Err(error) = unit.clear() {
                    report.record(*id, unit.label(), RenderPhase::Clear, error);
                }
            }
        }

        for (id, unit) in &mut self.units {
            if let Err(error) = unit.render_at(step) {
                report.record(*id, unit.label(), RenderPhase::Render, error);
            }
        }

        tracing::trace!(step, units = report.units, failures = report.failures.len(), "frame");
        report
    }

    /// Changes the tempo. A running ticker keeps going at the new interval and
    /// the sync step is left alone.
    pub fn set_bpm(&mut self, bpm: f64) -> Result<()> {
        self.tempo.set_bpm(bpm)?;
        self.retime();
        Ok(())
    }

    pub fn set_tempo(&mut self, clock: ClockConfig) -> Result<()> {
        self.tempo = Tempo::new(clock)?;
        self.retime();
        Ok(())
    }

    fn retime(&mut self) {
        let interval = self.tempo.step_interval();
        if let Some(ticker) = self.ticker.as_mut() {
            ticker.set_interval(interval);
        }
        tracing::debug!(
            bpm = self.tempo.bpm(),
            fps = self.tempo.frames_per_second(),
            "tempo changed"
        );
    }

    pub fn set_clear_before_every_frame(&mut self, clear: bool) {
        self.clear_before_every_frame = clear;
    }

    pub fn clear_before_every_frame(&self) -> bool {
        self.clear_before_every_frame
    }

    pub fn sync_step(&self) -> i64 {
        self.sync_step
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == TransportState::Playing
    }

    pub fn tempo(&self) -> &Tempo {
        &self.tempo
    }

    pub fn bpm(&self) -> f64 {
        self.tempo.bpm()
    }

    pub fn frames_per_second(&self) -> f64 {
        self.tempo.frames_per_second()
    }

    pub fn current_beat(&self) -> f64 {
        self.tempo.beat_at(self.sync_step)
    }

    pub fn current_bar(&self) -> f64 {
        self.tempo.bar_at(self.sync_step)
    }

    pub fn snapshot(&self) -> TransportSnapshot {
        TransportSnapshot {
            sync_step: self.sync_step,
            state: self.state,
            is_playing: self.is_playing(),
            bpm: self.bpm(),
            frames_per_second: self.frames_per_second(),
            step_interval_ms: self.tempo.step_interval_ms(),
            current_beat: self.current_beat(),
            current_bar: self.current_bar(),
            units: self.units.len(),
        }
    }
}

impl fmt::Debug for Arrangement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arrangement")
            .field("tempo", &self.tempo)
            .field("sync_step", &self.sync_step)
            .field("state", &self.state)
            .field("clear_before_every_frame", &self.clear_before_every_frame)
            .field("units", &self.units.len())
            .field("ticker", &self.ticker)
            .finish()
    }
}
