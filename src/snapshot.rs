//! Saving and restoring the aggregation state of an intersection.
//!
//! A snapshot holds every detector, station and approach time series along
//! with the queue estimates, so a run can be resumed or inspected later.

use crate::approach::{Approach, ApproachConfig, ApproachSample};
use crate::detector::{Dedup, Detector};
use crate::error::SnapshotError;
use crate::intersection::Intersection;
use crate::math::Point2d;
use crate::station::Station;
use crate::util::History;
use crate::{Bound, VehicleId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The snapshot format version written by this crate.
pub const SNAPSHOT_VERSION: u32 = 1;

/// The recorded state of a whole intersection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub approaches: Vec<ApproachSnapshot>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApproachSnapshot {
    pub bound: Bound,
    pub config: ApproachConfig,
    pub traffic_queue: i64,
    pub section_vehicles: BTreeSet<VehicleId>,
    pub stop_line: Vec<Point2d>,
    pub history: History<ApproachSample>,
    pub stations: Vec<StationSnapshot>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StationSnapshot {
    pub id: String,
    pub volumes: History<u32>,
    pub exit_volumes: History<u32>,
    pub speeds: History<f64>,
    pub detectors: Vec<DetectorSnapshot>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectorSnapshot {
    pub id: String,
    pub dedup: Dedup,
    pub volumes: History<u32>,
    pub speeds: History<f64>,
    /// The vehicles reported in the last step, needed to keep deduplicating.
    pub vehicles: Vec<VehicleId>,
}

impl Snapshot {
    /// Records the current state of an intersection.
    pub fn capture(intersection: &Intersection) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            approaches: intersection
                .approaches()
                .iter()
                .map(ApproachSnapshot::capture)
                .collect(),
        }
    }

    /// Rebuilds the intersection, validating every detector ID again.
    pub fn restore(&self) -> Result<Intersection, SnapshotError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::Version {
                found: self.version,
                expected: SNAPSHOT_VERSION,
            });
        }
        let approaches = self
            .approaches
            .iter()
            .map(ApproachSnapshot::restore)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Intersection::from_approaches(approaches)?)
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }
}

impl ApproachSnapshot {
    fn capture(approach: &Approach) -> Self {
        Self {
            bound: approach.bound(),
            config: approach.config().clone(),
            traffic_queue: approach.traffic_queue(),
            section_vehicles: approach.section_vehicles().clone(),
            stop_line: approach.stop_line().to_vec(),
            history: approach.history().clone(),
            stations: approach
                .stations()
                .iter()
                .map(StationSnapshot::capture)
                .collect(),
        }
    }

    fn restore(&self) -> Result<Approach, SnapshotError> {
        let stations = self
            .stations
            .iter()
            .map(StationSnapshot::restore)
            .collect::<Result<Vec<_>, _>>()?;
        let mut approach = Approach::new(
            self.bound,
            self.config.clone(),
            stations,
            self.history.capacity(),
        );
        approach.set_stop_line(self.stop_line.iter().copied());
        approach.restore_state(
            self.traffic_queue,
            self.section_vehicles.clone(),
            self.history.clone(),
        );
        Ok(approach)
    }
}

impl StationSnapshot {
    fn capture(station: &Station) -> Self {
        Self {
            id: station.id().to_string(),
            volumes: station.volumes().clone(),
            exit_volumes: station.exit_volumes().clone(),
            speeds: station.speeds().clone(),
            detectors: station
                .detectors()
                .iter()
                .map(DetectorSnapshot::capture)
                .collect(),
        }
    }

    fn restore(&self) -> Result<Station, SnapshotError> {
        let detectors = self
            .detectors
            .iter()
            .map(DetectorSnapshot::restore)
            .collect::<Result<Vec<_>, _>>()?;
        let mut station = Station::with_detectors(&self.id, detectors, self.volumes.capacity());
        station.restore_histories(
            self.volumes.clone(),
            self.exit_volumes.clone(),
            self.speeds.clone(),
        );
        Ok(station)
    }
}

impl DetectorSnapshot {
    fn capture(detector: &Detector) -> Self {
        Self {
            id: detector.id().to_string(),
            dedup: detector.dedup(),
            volumes: detector.volumes().clone(),
            speeds: detector.speeds().clone(),
            vehicles: detector.vehicles().to_vec(),
        }
    }

    fn restore(&self) -> Result<Detector, SnapshotError> {
        Ok(Detector::restore(
            self.id.parse()?,
            self.dedup,
            self.volumes.clone(),
            self.speeds.clone(),
            self.vehicles.clone(),
        ))
    }
}
