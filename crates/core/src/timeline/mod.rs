use std::time::Duration;

use serde::Serialize;

use crate::{ClockConfig, Result};

/// Tempo settings together with the timing derived from them.
///
/// `frames_per_second` and `step_interval_ms` are only ever written by
/// [`Tempo::recompute`], so they cannot drift from `bpm`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Tempo {
    bpm: f64,
    steps_per_beat: u32,
    beats_per_bar: u32,
    frames_per_second: f64,
    step_interval_ms: f64,
}

impl Tempo {
    pub fn new(clock: ClockConfig) -> Result<Self> {
        clock.validate()?;
        let mut tempo = Self {
            bpm: clock.bpm,
            steps_per_beat: clock.steps_per_beat,
            beats_per_bar: clock.beats_per_bar,
            frames_per_second: 0.0,
            step_interval_ms: 0.0,
        };
        tempo.recompute();
        Ok(tempo)
    }

    pub fn from_bpm(bpm: f64) -> Result<Self> {
        Self::new(ClockConfig::with_bpm(bpm))
    }

    /// Changes the tempo. Leaves `self` untouched if `bpm` is invalid.
    pub fn set_bpm(&mut self, bpm: f64) -> Result<()> {
        *self = Self::new(ClockConfig {
            bpm,
            ..self.config()
        })?;
        Ok(())
    }

    fn recompute(&mut self) {
        self.frames_per_second = self.bpm / 60.0 * f64::from(self.steps_per_beat);
        self.step_interval_ms = 1000.0 / self.frames_per_second;
    }

    pub fn config(&self) -> ClockConfig {
        ClockConfig {
            bpm: self.bpm,
            steps_per_beat: self.steps_per_beat,
            beats_per_bar: self.beats_per_bar,
        }
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn steps_per_beat(&self) -> u32 {
        self.steps_per_beat
    }

    pub fn beats_per_bar(&self) -> u32 {
        self.beats_per_bar
    }

    pub fn frames_per_second(&self) -> f64 {
        self.frames_per_second
    }

    pub fn step_interval_ms(&self) -> f64 {
        self.step_interval_ms
    }

    pub fn step_interval(&self) -> Duration {
        // `ClockConfig::validate` only admits tempos whose interval fits.
        Duration::try_from_secs_f64(self.step_interval_ms / 1000.0).unwrap_or(Duration::MAX)
    }

    /// Fractional beat position of `step`.
    pub fn beat_at(&self, step: i64) -> f64 {
        step as f64 / f64::from(self.steps_per_beat)
    }

    /// Fractional bar position of `step`.
    pub fn bar_at(&self, step: i64) -> f64 {
        step as f64 / (f64::from(self.steps_per_beat) * f64::from(self.beats_per_bar))
    }
}

/// Periodic timer fed with elapsed wall time by its owner.
///
/// Time that does not add up to a whole interval is carried over to the next
/// [`advance`](Ticker::advance), so a host polling at an uneven rate still
/// averages out to the configured interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticker {
    interval: Duration,
    elapsed: Duration,
}

impl Ticker {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_nanos(1)),
            elapsed: Duration::ZERO,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Swaps the interval, keeping the time accumulated towards the next tick.
    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval.max(Duration::from_nanos(1));
    }

    pub fn reset(&mut self) {
        self.elapsed = Duration::ZERO;
    }

    /// Adds `delta` and returns how many ticks became due.
    pub fn advance(&mut self, delta: Duration) -> u64 {
        let interval = self.interval.as_nanos();
        let total = self.elapsed.as_nanos() + delta.as_nanos();
        let remainder = total % interval;
        // remainder < interval, and interval came from a Duration
        self.elapsed = Duration::from_nanos(remainder as u64);
        u64::try_from(total / interval).unwrap_or(u64::MAX)
    }

    /// Time left until the next tick is due.
    pub fn until_next(&self) -> Duration {
        self.interval.saturating_sub(self.elapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_frame_rate_from_bpm() {
        let tempo = Tempo::from_bpm(120.0).unwrap();
        assert_eq!(tempo.frames_per_second(), 32.0);
        assert_eq!(tempo.step_interval_ms(), 31.25);
        assert_eq!(tempo.step_interval(), Duration::from_micros(31_250));
    }

    #[test]
    fn derived_fields_follow_bpm_changes() {
        let mut tempo = Tempo::from_bpm(120.0).unwrap();
        for bpm in [1.0, 60.0, 93.5, 174.0, 300.0] {
            tempo.set_bpm(bpm).unwrap();
            let fps = bpm / 60.0 * 16.0;
            assert_eq!(tempo.frames_per_second(), fps);
            assert_eq!(tempo.step_interval_ms(), 1000.0 / fps);
        }
    }

    #[test]
    fn rejected_bpm_leaves_tempo_unchanged() {
        let mut tempo = Tempo::from_bpm(100.0).unwrap();
        assert!(tempo.set_bpm(0.0).is_err());
        assert_eq!(tempo.bpm(), 100.0);
        assert_eq!(tempo, Tempo::from_bpm(100.0).unwrap());
    }

    #[test]
    fn tempos_too_slow_for_a_duration_are_refused() {
        assert!(Tempo::from_bpm(1e-20).is_err());

        let mut tempo = Tempo::from_bpm(120.0).unwrap();
        assert!(tempo.set_bpm(1e-20).is_err());
        assert_eq!(tempo.step_interval(), Duration::from_micros(31_250));

        let slow = Tempo::from_bpm(1e-6).unwrap();
        assert!(slow.step_interval() > Duration::from_secs(3600));
    }

    #[test]
    fn beat_and_bar_positions() {
        let tempo = Tempo::from_bpm(120.0).unwrap();
        assert_eq!(tempo.beat_at(32), 2.0);
        assert_eq!(tempo.bar_at(32), 0.5);
        assert_eq!(tempo.bar_at(128), 2.0);
    }

    #[test]
    fn ticker_carries_partial_intervals() {
        let mut ticker = Ticker::new(Duration::from_millis(10));
        assert_eq!(ticker.advance(Duration::from_millis(4)), 0);
        assert_eq!(ticker.until_next(), Duration::from_millis(6));
        assert_eq!(ticker.advance(Duration::from_millis(7)), 1);
        assert_eq!(ticker.advance(Duration::from_millis(29)), 3);
        assert_eq!(ticker.until_next(), Duration::from_millis(10));
    }

    #[test]
    fn reset_discards_accumulated_time() {
        let mut ticker = Ticker::new(Duration::from_millis(10));
        ticker.advance(Duration::from_millis(9));
        ticker.reset();
        assert_eq!(ticker.advance(Duration::from_millis(9)), 0);
    }
}
