use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("No face detected: none of {candidates} candidate(s) matched the {expected}-point topology")]
    NoFaceDetected { candidates: usize, expected: usize },

    #[error("Low landmark visibility: key point {index} has visibility {visibility:.2} (floor {floor:.2})")]
    LowVisibilityLandmarks {
        index: usize,
        visibility: f32,
        floor: f32,
    },

    #[error("Insufficient skin coverage: {coverage_percent:.1}% (minimum {minimum_percent:.1}%)")]
    InsufficientSkinCoverage {
        coverage_percent: f32,
        minimum_percent: f32,
    },

    #[error("Invalid correction gains ({r:.3}, {g:.3}, {b:.3}) outside [{min}, {max}]")]
    InvalidCorrectionGains {
        r: f32,
        g: f32,
        b: f32,
        min: f32,
        max: f32,
    },

    #[error("Incomplete pose landmarks: {reason}")]
    IncompletePoseLandmarks { reason: String },

    #[error("Malformed image buffer: {width}x{height}x{channels} needs {expected} bytes, got {actual}")]
    MalformedImageBuffer {
        width: u32,
        height: u32,
        channels: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether the pipeline may substitute a fallback result for this error.
    ///
    /// Only a malformed image buffer (and the configuration/I/O errors that never
    /// occur inside a pipeline run) must reach the caller.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::NoFaceDetected { .. }
                | Error::LowVisibilityLandmarks { .. }
                | Error::InsufficientSkinCoverage { .. }
                | Error::InvalidCorrectionGains { .. }
                | Error::IncompletePoseLandmarks { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_buffer_errors_are_fatal() {
        assert!(Error::NoFaceDetected {
            candidates: 0,
            expected: 468
        }
        .is_recoverable());
        assert!(Error::IncompletePoseLandmarks {
            reason: "20 landmarks".into()
        }
        .is_recoverable());
        assert!(!Error::MalformedImageBuffer {
            width: 2,
            height: 2,
            channels: 3,
            expected: 12,
            actual: 11,
        }
        .is_recoverable());
        assert!(!Error::InvalidConfig("x".into()).is_recoverable());
    }

    #[test]
    fn messages_carry_values() {
        let err = Error::InsufficientSkinCoverage {
            coverage_percent: 4.3,
            minimum_percent: 10.0,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient skin coverage: 4.3% (minimum 10.0%)"
        );
    }
}
