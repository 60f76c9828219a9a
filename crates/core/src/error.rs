/// Result alias that carries the custom [`PulseError`] type.
pub type Result<T> = std::result::Result<T, PulseError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum PulseError {
    /// A render unit was built without one of its three collaborators
    /// (generator, surface or paint callback).
    #[error("render unit is missing its {0}")]
    MissingCollaborator(&'static str),
    /// Tempo, loop geometry or a loaded config file failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The source range handed to a scaler has zero width.
    #[error("cannot scale from the zero-width range [{start}, {end}]")]
    DegenerateRange { start: f64, end: f64 },
    /// Logarithmic scaling was asked to target a range with a negative endpoint.
    #[error("logarithmic scaling needs non-negative endpoints, got [{start}, {end}]")]
    InvalidLogRange { start: f64, end: f64 },
    /// Free-form failure, mostly raised by surfaces and paint callbacks.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Wrapper around JSON (de)serialisation errors.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl PulseError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    pub(crate) fn config<T: Into<String>>(msg: T) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

impl From<&str> for PulseError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for PulseError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_collaborator_names_the_part() {
        let err = PulseError::MissingCollaborator("surface");
        assert_eq!(err.to_string(), "render unit is missing its surface");
    }

    #[test]
    fn string_conversions_produce_messages() {
        let err: PulseError = "canvas detached".into();
        assert!(matches!(err, PulseError::Message(ref m) if m == "canvas detached"));
    }
}
