//! Error types of the photon transport engine

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PhotonError {
    #[error("photon direction has zero length")]
    ZeroDirection,

    #[error("Snell's law has no solution (sin(theta_t) = {sin_theta_t}) but transmission was selected")]
    TotalInternalReflection { sin_theta_t: f64 },

    #[error("phase function sampling failed after {attempts} attempts")]
    SamplingExhausted { attempts: usize },

    #[error("malformed segment query: {0}")]
    MalformedQuery(String),

    #[error("invalid material: {0}")]
    InvalidMaterial(String),

    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("photon exceeded the maximum number of steps ({0})")]
    StepLimit(usize),
}

pub type Result<T> = std::result::Result<T, PhotonError>;
