use crate::{Bound, VehicleId};
use std::io;
use thiserror::Error;

/// A fatal problem with the static sensor or controller configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid detector id format: {0:?}")]
    InvalidDetectorId(String),
    #[error("malformed additional file line {line}: {text:?}")]
    MalformedAdditional { line: usize, text: String },
    #[error("no stations found for approach {0}")]
    MissingApproach(Bound),
    #[error("no configuration for approach {0}")]
    MissingApproachConfig(Bound),
    #[error("reading configuration: {0}")]
    Io(#[from] io::Error),
    #[error("parsing configuration: {0}")]
    Json(#[from] serde_json::Error),
    #[error("simulator error while building topology: {0}")]
    Sim(#[from] SimError),
}

/// An error reported by the simulator connector.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("vehicle {0} no longer exists")]
    VehicleNotFound(VehicleId),
    #[error("unknown detector {0:?}")]
    UnknownDetector(String),
    #[error("unknown lane {0:?}")]
    UnknownLane(String),
    #[error("phase index {index} out of range for a program of {len} phases")]
    PhaseOutOfRange { index: usize, len: usize },
    #[error("connection closed")]
    Closed,
}

/// A failure while saving or restoring a [Snapshot](crate::Snapshot).
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("unsupported snapshot version {found}, expected {expected}")]
    Version { found: u32, expected: u32 },
    #[error("snapshot json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("snapshot content: {0}")]
    Config(#[from] ConfigError),
}
