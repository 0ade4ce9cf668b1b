//! A connector that plays back a recorded simulation trace.
//!
//! Detector readings and vehicle states come from the trace frame by frame,
//! while the signal program runs on its own phase clock so that controllers
//! can extend, truncate and rewrite it as they would against a live simulator.

use crate::connector::Connector;
use crate::error::{ConfigError, SimError};
use crate::light::SignalProgram;
use crate::math::Point2d;
use crate::VehicleId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// The length of one step in s.
const STEP_LENGTH: f64 = 1.0;

/// A recorded simulation run.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Trace {
    /// The induction loops, in configuration order.
    pub detectors: Vec<TraceDetector>,
    /// Lane shape polylines by lane ID.
    pub lanes: BTreeMap<String, Vec<Point2d>>,
    /// The initial signal program.
    pub program: SignalProgram,
    /// One frame per simulation step.
    pub frames: Vec<Frame>,
}

/// An induction loop in a trace.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TraceDetector {
    pub id: String,
    /// The lane the loop is placed on.
    pub lane: String,
}

/// The readings of one simulation step.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Frame {
    /// Induction loop reports by detector ID. Missing loops saw nothing.
    pub detectors: BTreeMap<String, LoopReading>,
    /// The vehicles in the simulation.
    pub vehicles: BTreeMap<VehicleId, VehicleState>,
}

/// What one induction loop reported in one step.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopReading {
    pub vehicles: Vec<VehicleId>,
    /// The raw vehicle count; the number of `vehicles` when absent.
    pub count: Option<u32>,
    /// The interval mean speed in m/s.
    pub mean_speed: f64,
}

/// The state of one vehicle in one step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VehicleState {
    pub position: Point2d,
    /// Speed in m/s.
    pub speed: f64,
    pub class: String,
    /// CO2 emission rate in mg/s.
    pub co2: f64,
}

impl Trace {
    /// Parses a trace from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a trace from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// The IDs of the traced detectors, in configuration order.
    pub fn detector_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.detectors.iter().map(|d| d.id.as_str())
    }
}

impl Frame {
    /// Records the vehicles seen by a detector.
    pub fn detect(&mut self, detector: &str, vehicles: &[&str], mean_speed: f64) {
        self.detectors.insert(
            detector.to_string(),
            LoopReading {
                vehicles: vehicles.iter().map(|v| VehicleId::from(*v)).collect(),
                count: None,
                mean_speed,
            },
        );
    }
}

impl LoopReading {
    fn count(&self) -> u32 {
        self.count.unwrap_or(self.vehicles.len() as u32)
    }
}

/// Plays back a [Trace] through the [Connector] interface.
#[derive(Clone, Debug)]
pub struct ReplayConnector {
    trace: Trace,
    /// The number of completed steps.
    steps: usize,
    /// The current simulation time in s.
    time: f64,
    program: SignalProgram,
    /// The current phase index.
    phase: usize,
    /// The time the current phase began.
    phase_start: f64,
    /// The time the current phase ends.
    next_switch: f64,
}

impl ReplayConnector {
    /// Creates a connector positioned before the first frame.
    pub fn new(trace: Trace) -> Self {
        let program = trace.program.clone();
        let first = program.phases.first().map_or(0.0, |p| p.duration);
        Self {
            trace,
            steps: 0,
            time: 0.0,
            program,
            phase: 0,
            phase_start: 0.0,
            next_switch: first,
        }
    }

    /// The number of frames in the trace.
    pub fn len(&self) -> usize {
        self.trace.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trace.frames.is_empty()
    }

    /// The frame for the most recent step. Beyond the end of the trace nothing is seen.
    fn frame(&self) -> Option<&Frame> {
        self.steps
            .checked_sub(1)
            .and_then(|idx| self.trace.frames.get(idx))
    }

    fn reading(&self, detector: &str) -> Option<&LoopReading> {
        self.frame().and_then(|f| f.detectors.get(detector))
    }

    fn vehicle(&self, vehicle: &VehicleId) -> Result<&VehicleState, SimError> {
        self.frame()
            .and_then(|f| f.vehicles.get(vehicle))
            .ok_or_else(|| SimError::VehicleNotFound(vehicle.clone()))
    }

    /// Moves the phase clock on past any phases that have run out.
    fn advance_phases(&mut self) {
        // Zero length phases are passed through in the same step
        for _ in 0..self.program.len() {
            if self.time < self.next_switch {
                break;
            }
            self.phase = self.program.next_index(self.phase);
            self.phase_start = self.next_switch;
            self.next_switch += self.program.phases[self.phase].duration;
        }
    }
}

impl Connector for ReplayConnector {
    fn step(&mut self) -> Result<(), SimError> {
        self.advance_phases();
        self.time += STEP_LENGTH;
        self.steps += 1;
        Ok(())
    }

    fn time(&self) -> f64 {
        self.time
    }

    fn detector_vehicle_ids(&self, detector: &str) -> Result<Vec<VehicleId>, SimError> {
        Ok(self
            .reading(detector)
            .map(|r| r.vehicles.clone())
            .unwrap_or_default())
    }

    fn detector_vehicle_count(&self, detector: &str) -> Result<u32, SimError> {
        Ok(self.reading(detector).map_or(0, LoopReading::count))
    }

    fn detector_mean_speed(&self, detector: &str) -> Result<f64, SimError> {
        Ok(self.reading(detector).map_or(0.0, |r| r.mean_speed))
    }

    fn detector_lane(&self, detector: &str) -> Result<String, SimError> {
        self.trace
            .detectors
            .iter()
            .find(|d| d.id == detector)
            .map(|d| d.lane.clone())
            .ok_or_else(|| SimError::UnknownDetector(detector.to_string()))
    }

    fn lane_shape(&self, lane: &str) -> Result<Vec<Point2d>, SimError> {
        self.trace
            .lanes
            .get(lane)
            .cloned()
            .ok_or_else(|| SimError::UnknownLane(lane.to_string()))
    }

    fn vehicle_ids(&self) -> Result<Vec<VehicleId>, SimError> {
        Ok(self
            .frame()
            .map(|f| f.vehicles.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn vehicle_position(&self, vehicle: &VehicleId) -> Result<Point2d, SimError> {
        Ok(self.vehicle(vehicle)?.position)
    }

    fn vehicle_speed(&self, vehicle: &VehicleId) -> Result<f64, SimError> {
        Ok(self.vehicle(vehicle)?.speed)
    }

    fn vehicle_class(&self, vehicle: &VehicleId) -> Result<String, SimError> {
        Ok(self.vehicle(vehicle)?.class.clone())
    }

    fn vehicle_co2(&self, vehicle: &VehicleId) -> Result<f64, SimError> {
        Ok(self.vehicle(vehicle)?.co2)
    }

    fn program(&self) -> Result<SignalProgram, SimError> {
        Ok(self.program.clone())
    }

    fn set_program(&mut self, program: SignalProgram) -> Result<(), SimError> {
        if self.phase >= program.len() {
            self.phase = 0;
        }
        self.program = program;
        Ok(())
    }

    fn phase(&self) -> Result<usize, SimError> {
        Ok(self.phase)
    }

    fn phase_duration(&self) -> Result<f64, SimError> {
        Ok(self.next_switch - self.phase_start)
    }

    fn next_switch(&self) -> Result<f64, SimError> {
        Ok(self.next_switch)
    }

    fn set_phase_duration(&mut self, remaining: f64) -> Result<(), SimError> {
        self.next_switch = self.time + remaining;
        Ok(())
    }

    fn set_phase(&mut self, index: usize) -> Result<(), SimError> {
        let phase = self
            .program
            .phases
            .get(index)
            .ok_or(SimError::PhaseOutOfRange {
                index,
                len: self.program.len(),
            })?;
        self.next_switch = self.time + phase.duration;
        self.phase_start = self.time;
        self.phase = index;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::{Frame, ReplayConnector, Trace};
    use crate::connector::PhaseClock;
    use crate::light::{Phase, SignalProgram};
    use crate::{Connector, SimError, VehicleId};

    fn two_phase() -> Trace {
        Trace {
            program: SignalProgram::new(vec![
                Phase::new(3.0, 1.0, "GGrr"),
                Phase::new(2.0, 2.0, "yyrr"),
            ]),
            ..Default::default()
        }
    }

    fn clock(sim: &ReplayConnector) -> (usize, f64, f64) {
        let clock = PhaseClock::read(sim).unwrap();
        (clock.index, clock.elapsed, clock.remaining)
    }

    #[test]
    fn phase_clock_cycles() {
        let mut sim = ReplayConnector::new(two_phase());
        let mut seen = vec![];
        for _ in 0..6 {
            sim.step().unwrap();
            seen.push(clock(&sim));
        }
        assert_eq!(
            seen,
            vec![
                (0, 1.0, 2.0),
                (0, 2.0, 1.0),
                (0, 3.0, 0.0),
                (1, 1.0, 1.0),
                (1, 2.0, 0.0),
                (0, 1.0, 2.0),
            ]
        );
    }

    #[test]
    fn extend_and_truncate() {
        let mut sim = ReplayConnector::new(two_phase());
        sim.step().unwrap();
        sim.step().unwrap();
        sim.step().unwrap();
        assert_eq!(clock(&sim), (0, 3.0, 0.0));

        sim.set_phase_duration(1.0).unwrap();
        sim.step().unwrap();
        assert_eq!(clock(&sim), (0, 4.0, 0.0));

        sim.set_phase(1).unwrap();
        assert_eq!(clock(&sim), (1, 0.0, 2.0));
        assert!(sim.set_phase(2).is_err());
    }

    #[test]
    fn readings_follow_frames() {
        let mut frame = Frame::default();
        frame.detect("Det_00000000", &["a", "b"], 7.5);
        let mut sim = ReplayConnector::new(Trace {
            frames: vec![frame],
            ..Default::default()
        });

        assert!(sim.detector_vehicle_ids("Det_00000000").unwrap().is_empty());
        sim.step().unwrap();
        assert_eq!(sim.detector_vehicle_count("Det_00000000").unwrap(), 2);
        assert_eq!(sim.detector_mean_speed("Det_00000000").unwrap(), 7.5);
        assert_eq!(
            sim.vehicle_speed(&VehicleId::from("a")),
            Err(SimError::VehicleNotFound("a".into()))
        );

        // Past the end of the trace
        sim.step().unwrap();
        assert_eq!(sim.detector_vehicle_count("Det_00000000").unwrap(), 0);
        assert!(sim.detector_lane("Det_00000000").is_err());
    }

    #[test]
    fn parses_json() {
        let json = r#"{
            "detectors": [{ "id": "Det_00000000", "lane": "s_0" }],
            "lanes": { "s_0": [{ "x": 0.0, "y": -100.0 }, { "x": 0.0, "y": -10.0 }] },
            "program": { "phases": [{ "duration": 30.0, "state": "GGrr" }] },
            "frames": [
                {
                    "detectors": { "Det_00000000": { "vehicles": ["v0"], "mean_speed": 11.0 } },
                    "vehicles": {
                        "v0": { "position": { "x": 0.0, "y": -90.0 }, "speed": 11.0, "class": "passenger", "co2": 2500.0 }
                    }
                }
            ]
        }"#;
        let trace = Trace::from_json(json).unwrap();
        assert_eq!(trace.detector_ids().collect::<Vec<_>>(), vec!["Det_00000000"]);
        assert_eq!(trace.program.phases[0].min_duration, 0.0);

        let mut sim = ReplayConnector::new(trace);
        sim.step().unwrap();
        assert_eq!(sim.detector_lane("Det_00000000").unwrap(), "s_0");
        assert_eq!(sim.lane_shape("s_0").unwrap().len(), 2);
        assert_eq!(sim.vehicle_co2(&"v0".into()).unwrap(), 2500.0);
        assert_eq!(sim.vehicle_ids().unwrap().len(), 1);
    }
}
