pub use approach::{Approach, ApproachConfig, ApproachSample, DilemmaPolicy, DilemmaSignal};
pub use cgmath;
pub use config::{AllocationTrigger, ControlMode, ControllerConfig, WeightingKind};
pub use connector::{Connector, PhaseClock};
pub use control::{
    apply_allocation, traffic_signal_control, Allocation, CapacityShare, ExtensionAction,
    ExtensionState, GreenExtension, GreenShare, OccupancyRate, Weighting,
};
pub use controller::{Controller, SectionRecord, TotalRecord};
pub use detector::{Dedup, Detector, DetectorCode, DetectorRole};
pub use error::{ConfigError, SimError, SnapshotError};
pub use intersection::Intersection;
pub use light::{LightState, Phase, SignalProgram};
pub use replay::{Frame, LoopReading, ReplayConnector, Trace, TraceDetector, VehicleState};
pub use snapshot::{ApproachSnapshot, DetectorSnapshot, Snapshot, StationSnapshot};
pub use station::Station;
pub use util::History;

use serde::{Deserialize, Serialize};
use std::fmt;

mod approach;
pub mod config;
mod connector;
mod control;
mod controller;
mod detector;
mod error;
mod intersection;
mod light;
pub mod math;
mod replay;
mod snapshot;
mod station;
mod util;

/// One of the four approaches feeding the intersection.
///
/// The discriminant is the bound digit used in detector codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Bound {
    South = 0,
    North = 1,
    East = 2,
    West = 3,
}

impl Bound {
    /// All bounds in index order.
    pub const ALL: [Bound; 4] = [Bound::South, Bound::North, Bound::East, Bound::West];

    /// Gets the bound with the given index, if there is one.
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    /// The bound digit.
    pub fn index(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Bound::South => "SB",
            Bound::North => "NB",
            Bound::East => "EB",
            Bound::West => "WB",
        };
        f.write_str(name)
    }
}

/// Identifier of a vehicle in the simulator.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VehicleId(String);

impl VehicleId {
    /// Creates a vehicle ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Gets the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for VehicleId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
