use crate::error::SimError;
use crate::light::SignalProgram;
use crate::math::Point2d;
use crate::VehicleId;

/// The request/response control interface of the microscopic simulator.
///
/// All calls are synchronous. Readings refer to the most recently completed
/// step, so [step](Connector::step) must return before any aggregation reads them.
pub trait Connector {
    /// Advances the simulation by one step.
    fn step(&mut self) -> Result<(), SimError>;

    /// The current simulation time in s.
    fn time(&self) -> f64;

    /// The IDs of the vehicles that passed the induction loop during the last step.
    fn detector_vehicle_ids(&self, detector: &str) -> Result<Vec<VehicleId>, SimError>;

    /// The number of vehicles that passed the induction loop during the last step.
    fn detector_vehicle_count(&self, detector: &str) -> Result<u32, SimError>;

    /// The mean speed of vehicles over the loop's aggregation interval, in m/s.
    fn detector_mean_speed(&self, detector: &str) -> Result<f64, SimError>;

    /// The lane the induction loop is placed on.
    fn detector_lane(&self, detector: &str) -> Result<String, SimError>;

    /// The shape polyline of a lane; its last point lies on the stop line.
    fn lane_shape(&self, lane: &str) -> Result<Vec<Point2d>, SimError>;

    /// The IDs of all vehicles currently in the simulation.
    fn vehicle_ids(&self) -> Result<Vec<VehicleId>, SimError>;

    fn vehicle_position(&self, vehicle: &VehicleId) -> Result<Point2d, SimError>;

    /// The instantaneous speed in m/s.
    fn vehicle_speed(&self, vehicle: &VehicleId) -> Result<f64, SimError>;

    /// The vehicle type, e.g. `passenger`.
    fn vehicle_class(&self, vehicle: &VehicleId) -> Result<String, SimError>;

    /// The instantaneous CO2 emission rate in mg/s.
    fn vehicle_co2(&self, vehicle: &VehicleId) -> Result<f64, SimError>;

    /// The signal program currently in effect.
    fn program(&self) -> Result<SignalProgram, SimError>;

    /// Replaces the signal program. The current phase keeps running.
    fn set_program(&mut self, program: SignalProgram) -> Result<(), SimError>;

    /// The index of the current phase.
    fn phase(&self) -> Result<usize, SimError>;

    /// The total duration of the current phase in s.
    fn phase_duration(&self) -> Result<f64, SimError>;

    /// The simulation time at which the current phase ends.
    fn next_switch(&self) -> Result<f64, SimError>;

    /// Sets the remaining duration of the current phase in s.
    fn set_phase_duration(&mut self, remaining: f64) -> Result<(), SimError>;

    /// Switches to the given phase immediately.
    fn set_phase(&mut self, index: usize) -> Result<(), SimError>;
}

/// Timing of the current phase, derived from the connector once per step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhaseClock {
    /// The index of the current phase.
    pub index: usize,
    /// The time since the phase began in s.
    pub elapsed: f64,
    /// The time until the phase ends in s.
    pub remaining: f64,
}

impl PhaseClock {
    /// Reads the phase timing from the connector.
    pub fn read(sim: &impl Connector) -> Result<Self, SimError> {
        let time = sim.time();
        let duration = sim.phase_duration()?;
        let next_switch = sim.next_switch()?;
        Ok(Self {
            index: sim.phase()?,
            elapsed: time - (next_switch - duration),
            remaining: next_switch - time,
        })
    }
}
