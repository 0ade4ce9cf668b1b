use crate::connector::Connector;
use crate::error::{ConfigError, SimError};
use crate::util::History;
use crate::{Bound, VehicleId};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;

/// Converts m/s to km/h.
pub(crate) const MPS_TO_KPH: f64 = 3.6;

/// The length of a simulation step in s.
const STEP_SECONDS: f64 = 1.0;

/// The vehicles seen by one loop in one step; rarely more than a couple.
pub type LoopVehicles = SmallVec<[VehicleId; 4]>;

/// Whether a detector counts vehicles entering or leaving its station.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DetectorRole {
    Entry,
    Exit,
}

/// The parsed identity of an induction loop.
///
/// Codes have the form `Det_ABSSSSDD..` where `A` is the auxiliary flag
/// (0 = entry, 1 = exit), `B` the bound digit, `SSSS` the station number and
/// `DD..` the detector index. The first six characters after the prefix make
/// up the station code.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DetectorCode {
    id: String,
    role: DetectorRole,
    bound: Bound,
    station: String,
    index: String,
}

/// How a detector avoids counting a vehicle that sits on the loop across steps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dedup {
    /// Vehicles reported in the previous step are not counted again.
    #[default]
    PreviousStep,
    /// Every reported vehicle is counted.
    Disabled,
}

/// A single induction loop on one lane.
#[derive(Clone, Debug)]
pub struct Detector {
    code: DetectorCode,
    dedup: Dedup,
    /// Per-step volumes, net of duplicates.
    volumes: History<u32>,
    /// Per-step mean speeds in m/s.
    speeds: History<f64>,
    /// The vehicles reported in the most recent step.
    prev_vehicles: LoopVehicles,
}

impl DetectorCode {
    /// The full detector ID, as known to the simulator.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn role(&self) -> DetectorRole {
        self.role
    }

    pub fn bound(&self) -> Bound {
        self.bound
    }

    /// The six character code of the station the detector belongs to.
    pub fn station(&self) -> &str {
        &self.station
    }

    /// The index of the detector within its station.
    pub fn index(&self) -> &str {
        &self.index
    }
}

impl FromStr for DetectorCode {
    type Err = ConfigError;

    fn from_str(id: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidDetectorId(id.to_string());

        let info = match id.split_once('_') {
            Some(("Det", info)) => info,
            _ => return Err(invalid()),
        };
        if info.len() < 8 || !info.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let digits = info.as_bytes();
        let role = match digits[0] {
            b'0' => DetectorRole::Entry,
            b'1' => DetectorRole::Exit,
            _ => return Err(invalid()),
        };
        let bound = Bound::from_index(digits[1] - b'0').ok_or_else(invalid)?;

        Ok(Self {
            id: id.to_string(),
            role,
            bound,
            station: info[..6].to_string(),
            index: info[6..].to_string(),
        })
    }
}

impl fmt::Display for DetectorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

impl Detector {
    /// Creates a detector from its code.
    pub fn new(code: DetectorCode, dedup: Dedup, history_len: usize) -> Self {
        Self {
            code,
            dedup,
            volumes: History::new(history_len),
            speeds: History::new(history_len),
            prev_vehicles: SmallVec::new(),
        }
    }

    /// Parses the detector ID and creates a detector.
    pub fn parse(id: &str, dedup: Dedup, history_len: usize) -> Result<Self, ConfigError> {
        Ok(Self::new(id.parse()?, dedup, history_len))
    }

    pub fn code(&self) -> &DetectorCode {
        &self.code
    }

    pub fn id(&self) -> &str {
        self.code.id()
    }

    pub fn role(&self) -> DetectorRole {
        self.code.role
    }

    pub fn bound(&self) -> Bound {
        self.code.bound
    }

    /// Reads the loop's report for the last simulation step and records a sample.
    pub fn update(&mut self, sim: &impl Connector) -> Result<(), SimError> {
        let vehicles: LoopVehicles = sim.detector_vehicle_ids(self.id())?.into_iter().collect();
        let raw_count = sim.detector_vehicle_count(self.id())?;

        let fresh = match self.dedup {
            Dedup::PreviousStep => vehicles
                .iter()
                .filter(|v| !self.prev_vehicles.contains(v))
                .count(),
            Dedup::Disabled => vehicles.len(),
        };
        let duplicates = (vehicles.len() - fresh) as u32;
        let volume = raw_count.saturating_sub(duplicates);

        // Every fresh vehicle is credited with the loop's interval mean speed,
        // so their average is that mean.
        let speed = if self.role() == DetectorRole::Entry && fresh > 0 {
            sim.detector_mean_speed(self.id())?
        } else {
            0.0
        };

        self.volumes.push(volume);
        self.speeds.push(speed);
        self.prev_vehicles = vehicles;
        Ok(())
    }

    /// The volume counted in the last step.
    pub fn volume(&self) -> u32 {
        self.volumes.last_or_default()
    }

    /// The mean speed in the last step, in m/s.
    pub fn speed(&self) -> f64 {
        self.speeds.last_or_default()
    }

    /// The flow rate implied by the last step's volume, in veh/h.
    pub fn flow(&self) -> f64 {
        self.volume() as f64 * 3600.0 / STEP_SECONDS
    }

    /// The density implied by the last step's flow and speed, in veh/km.
    pub fn density(&self) -> f64 {
        let speed = self.speed();
        if speed == 0.0 {
            0.0
        } else {
            self.flow() / (speed * MPS_TO_KPH)
        }
    }

    /// The vehicles reported in the last step, duplicates included.
    pub fn vehicles(&self) -> &[VehicleId] {
        &self.prev_vehicles
    }

    pub fn volumes(&self) -> &History<u32> {
        &self.volumes
    }

    pub fn speeds(&self) -> &History<f64> {
        &self.speeds
    }

    pub(crate) fn dedup(&self) -> Dedup {
        self.dedup
    }

    /// Restores the recorded state of a detector.
    pub(crate) fn restore(
        code: DetectorCode,
        dedup: Dedup,
        volumes: History<u32>,
        speeds: History<f64>,
        prev_vehicles: Vec<VehicleId>,
    ) -> Self {
        Self {
            code,
            dedup,
            volumes,
            speeds,
            prev_vehicles: prev_vehicles.into_iter().collect(),
        }
    }
}
