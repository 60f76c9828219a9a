//! Range mapping used by generators and paint callbacks.

use crate::{config::DEFAULT_RANGE, PulseError, Result};

/// Fractional position of `value` inside `from`.
fn position(value: f64, from: [f64; 2]) -> Result<f64> {
    let width = from[1] - from[0];
    if width == 0.0 {
        return Err(PulseError::DegenerateRange {
            start: from[0],
            end: from[1],
        });
    }
    Ok((value - from[0]) / width)
}

/// Affine map of `value` from `from` into `to`. Values outside `from` are
/// extrapolated, not clamped.
pub fn scale_linear(value: f64, to: [f64; 2], from: [f64; 2]) -> Result<f64> {
    let t = position(value, from)?;
    Ok(t * (to[1] - to[0]) + to[0])
}

/// [`scale_linear`] from the `[GEN_MIN, GEN_MAX]` generator range.
pub fn scale_from_default(value: f64, to: [f64; 2]) -> Result<f64> {
    scale_linear(value, to, DEFAULT_RANGE)
}

/// Interpolates in log-space of the target range, so equal steps of `value`
/// produce growing steps of output.
///
/// A target endpoint of exactly `0` contributes `log = 0`, so that end of the
/// output lands on `1`, not `0`.
pub fn scale_log(value: f64, to: [f64; 2], from: [f64; 2]) -> Result<f64> {
    if to[0] < 0.0 || to[1] < 0.0 {
        return Err(PulseError::InvalidLogRange {
            start: to[0],
            end: to[1],
        });
    }
    let t = position(value, from)?;
    let lo = ln_or_zero(to[0]);
    let hi = ln_or_zero(to[1]);
    Ok((lo + t * (hi - lo)).exp())
}

fn ln_or_zero(x: f64) -> f64 {
    if x == 0.0 {
        0.0
    } else {
        x.ln()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn maps_linearly_between_ranges() {
        assert_eq!(scale_linear(0.0, [10.0, 20.0], [0.0, 127.0]).unwrap(), 10.0);
        assert_eq!(scale_linear(127.0, [10.0, 20.0], [0.0, 127.0]).unwrap(), 20.0);
        assert_eq!(scale_linear(0.0, [0.0, 127.0], [-1.0, 1.0]).unwrap(), 63.5);
        // inverted target
        assert_eq!(scale_linear(0.25, [100.0, 0.0], [0.0, 1.0]).unwrap(), 75.0);
    }

    #[test]
    fn extrapolates_outside_the_source_range() {
        assert_eq!(scale_linear(2.0, [0.0, 10.0], [0.0, 1.0]).unwrap(), 20.0);
    }

    #[test]
    fn linear_scaling_inverts() {
        let there = [-3.5, 800.0];
        for x in [0.0, 1.0, 17.25, 63.5, 126.0, 127.0] {
            let scaled = scale_linear(x, there, DEFAULT_RANGE).unwrap();
            let back = scale_linear(scaled, DEFAULT_RANGE, there).unwrap();
            assert!((back - x).abs() < EPS, "{x} came back as {back}");
        }
    }

    #[test]
    fn zero_width_source_is_an_error() {
        let err = scale_linear(1.0, [0.0, 1.0], [5.0, 5.0]).unwrap_err();
        assert!(matches!(err, PulseError::DegenerateRange { start, end } if start == 5.0 && end == 5.0));
        assert!(scale_log(1.0, [1.0, 10.0], [2.0, 2.0]).is_err());
    }

    #[test]
    fn default_range_helper_scales_from_generator_range() {
        assert_eq!(scale_from_default(127.0, [0.0, 640.0]).unwrap(), 640.0);
    }

    #[test]
    fn log_scaling_hits_endpoints_and_grows() {
        let to = [1.0, 1000.0];
        let from = [0.0, 1.0];
        assert!((scale_log(0.0, to, from).unwrap() - 1.0).abs() < EPS);
        assert!((scale_log(1.0, to, from).unwrap() - 1000.0).abs() < 1e-6);
        assert!((scale_log(0.5, to, from).unwrap() - 1000f64.sqrt()).abs() < 1e-6);

        let low_step = scale_log(0.2, to, from).unwrap() - scale_log(0.1, to, from).unwrap();
        let high_step = scale_log(0.9, to, from).unwrap() - scale_log(0.8, to, from).unwrap();
        assert!(high_step > low_step);
    }

    #[test]
    fn log_scaling_treats_zero_endpoint_as_log_zero() {
        let value = scale_log(0.0, [0.0, 100.0], [0.0, 1.0]).unwrap();
        assert!((value - 1.0).abs() < EPS);
    }

    #[test]
    fn log_scaling_rejects_negative_targets() {
        let err = scale_log(0.5, [-1.0, 10.0], [0.0, 1.0]).unwrap_err();
        assert!(matches!(err, PulseError::InvalidLogRange { .. }));
    }
}
