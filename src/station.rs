use crate::connector::Connector;
use crate::detector::{Detector, DetectorRole};
use crate::error::SimError;
use crate::util::History;
use crate::{Bound, VehicleId};
use std::collections::BTreeSet;

/// A cross-section of the roadway made up of one or more detectors.
#[derive(Clone, Debug)]
pub struct Station {
    /// The six character station code.
    id: String,
    /// The detectors at this cross-section.
    detectors: Vec<Detector>,
    /// The bound of the first detector, fixed once known.
    direction: Option<Bound>,
    /// Per-step entry volumes.
    volumes: History<u32>,
    /// Per-step exit volumes.
    exit_volumes: History<u32>,
    /// Per-step mean speeds in m/s.
    speeds: History<f64>,
    /// The vehicles seen by entry detectors in the last step.
    input_vehicles: BTreeSet<VehicleId>,
    /// The vehicles seen by exit detectors in the last step.
    exit_vehicles: BTreeSet<VehicleId>,
}

impl Station {
    /// Creates a station with no detectors.
    pub fn new(id: &str, history_len: usize) -> Self {
        Self {
            id: id.to_string(),
            detectors: vec![],
            direction: None,
            volumes: History::new(history_len),
            exit_volumes: History::new(history_len),
            speeds: History::new(history_len),
            input_vehicles: BTreeSet::new(),
            exit_vehicles: BTreeSet::new(),
        }
    }

    /// Creates a station from its detectors.
    pub fn with_detectors(id: &str, detectors: Vec<Detector>, history_len: usize) -> Self {
        let mut station = Self::new(id, history_len);
        for detector in detectors {
            station.add_detector(detector);
        }
        station
    }

    /// Adds a detector. The first detector fixes the station's direction.
    pub fn add_detector(&mut self, detector: Detector) {
        if self.direction.is_none() {
            self.direction = Some(detector.bound());
        }
        self.detectors.push(detector);
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn direction(&self) -> Option<Bound> {
        self.direction
    }

    pub fn detectors(&self) -> &[Detector] {
        &self.detectors
    }

    /// Updates every detector and combines their samples for this step.
    pub fn update(&mut self, sim: &impl Connector) -> Result<(), SimError> {
        let mut volume = 0;
        let mut exit_volume = 0;
        let mut speed = 0.0;
        self.input_vehicles.clear();
        self.exit_vehicles.clear();

        for detector in &mut self.detectors {
            detector.update(sim)?;
            match detector.role() {
                DetectorRole::Exit => {
                    exit_volume += detector.volume();
                    self.exit_vehicles.extend(detector.vehicles().iter().cloned());
                }
                DetectorRole::Entry => {
                    volume += detector.volume();
                    speed += detector.speed();
                    self.input_vehicles.extend(detector.vehicles().iter().cloned());
                }
            }
        }

        let speed = if volume == 0 { 0.0 } else { speed / volume as f64 };

        // A vehicle straddling two lanes can trip both loops
        let volume = volume.min(self.input_vehicles.len() as u32);
        let exit_volume = exit_volume.min(self.exit_vehicles.len() as u32);

        self.volumes.push(volume);
        self.exit_volumes.push(exit_volume);
        self.speeds.push(speed);
        Ok(())
    }

    /// The entry volume in the last step.
    pub fn volume(&self) -> u32 {
        self.volumes.last_or_default()
    }

    /// The exit volume in the last step.
    pub fn exit_volume(&self) -> u32 {
        self.exit_volumes.last_or_default()
    }

    /// The mean speed in the last step, in m/s.
    pub fn speed(&self) -> f64 {
        self.speeds.last_or_default()
    }

    /// The vehicles that crossed an entry detector in the last step.
    /// Replaced on every update.
    pub fn input_vehicles(&self) -> &BTreeSet<VehicleId> {
        &self.input_vehicles
    }

    /// The vehicles that crossed an exit detector in the last step.
    /// Replaced on every update.
    pub fn exit_vehicles(&self) -> &BTreeSet<VehicleId> {
        &self.exit_vehicles
    }

    pub fn volumes(&self) -> &History<u32> {
        &self.volumes
    }

    pub fn exit_volumes(&self) -> &History<u32> {
        &self.exit_volumes
    }

    pub fn speeds(&self) -> &History<f64> {
        &self.speeds
    }

    /// Restores a station's recorded histories.
    pub(crate) fn restore_histories(
        &mut self,
        volumes: History<u32>,
        exit_volumes: History<u32>,
        speeds: History<f64>,
    ) {
        self.volumes = volumes;
        self.exit_volumes = exit_volumes;
        self.speeds = speeds;
    }
}
