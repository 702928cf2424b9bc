//! Error types for ModalSonic

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModalSonicError {
    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),

    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(String),

    #[error("Invalid modal data: {0}")]
    InvalidModalData(String),

    #[error("Invalid time step: {0}")]
    InvalidTimeStep(f32),

    #[error("Numerical blow-up: {0}")]
    NumericalBlowUp(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Audio device error: {0}")]
    AudioDevice(String),

    #[error("Audio format error: {0}")]
    AudioFormat(String),
}

impl ModalSonicError {
    /// Returns true for errors that leave the simulation state unusable.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::NumericalBlowUp(_) | Self::InvalidTimeStep(_))
    }
}

pub type Result<T> = std::result::Result<T, ModalSonicError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_errors() {
        assert!(ModalSonicError::NumericalBlowUp("w".into()).is_fatal());
        assert!(ModalSonicError::InvalidTimeStep(f32::NAN).is_fatal());
        assert!(!ModalSonicError::AudioDevice("no device".into()).is_fatal());
        assert!(!ModalSonicError::InvalidMesh("open".into()).is_fatal());
    }
}
