pub use self::dilemma::{DilemmaPolicy, DilemmaSignal};
use crate::connector::Connector;
use crate::error::SimError;
use crate::math::{nearest_distance, Point2d};
use crate::station::Station;
use crate::util::History;
use crate::{Bound, VehicleId};
use cgmath::MetricSpace;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeSet;

mod dilemma;

/// The static configuration of one approach.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApproachConfig {
    /// The code of the station whose entry volume feeds the queue estimate.
    pub input_station: String,
    /// The approach's share of the intersection's capacity, in percent.
    pub capacity_share: f64,
    /// The number of vehicles the approach can hold.
    pub max_capacity: f64,
    /// The index of the program phase that gives this approach green.
    pub green_phase: usize,
}

/// The aggregate state of an approach after one step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ApproachSample {
    /// The CO2 emitted by queued vehicles during the step, in g/s.
    pub co2: f64,
    /// The volume entering the first station.
    pub volume: u32,
    /// The queue estimate.
    pub queue: i64,
}

/// One of the four roads feeding the intersection, as a chain of stations.
#[derive(Clone, Debug)]
pub struct Approach {
    bound: Bound,
    config: ApproachConfig,
    /// The stations, entry-most first and the stop line station last.
    stations: Vec<Station>,
    /// The estimated number of queued vehicles. Not floored at zero.
    traffic_queue: i64,
    /// The vehicles attributed to this approach's queue.
    section_vehicles: BTreeSet<VehicleId>,
    /// The stop line points of the lanes at the last station.
    stop_line: SmallVec<[Point2d; 4]>,
    history: History<ApproachSample>,
}

impl Approach {
    /// Creates an approach from its ordered stations.
    pub fn new(
        bound: Bound,
        config: ApproachConfig,
        stations: Vec<Station>,
        history_len: usize,
    ) -> Self {
        Self {
            bound,
            config,
            stations,
            traffic_queue: 0,
            section_vehicles: BTreeSet::new(),
            stop_line: SmallVec::new(),
            history: History::new(history_len),
        }
    }

    pub fn bound(&self) -> Bound {
        self.bound
    }

    pub fn config(&self) -> &ApproachConfig {
        &self.config
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn traffic_queue(&self) -> i64 {
        self.traffic_queue
    }

    pub fn section_vehicles(&self) -> &BTreeSet<VehicleId> {
        &self.section_vehicles
    }

    pub fn stop_line(&self) -> &[Point2d] {
        &self.stop_line
    }

    pub fn history(&self) -> &History<ApproachSample> {
        &self.history
    }

    /// Replaces the cached stop line points.
    pub fn set_stop_line(&mut self, points: impl IntoIterator<Item = Point2d>) {
        self.stop_line = points.into_iter().collect();
    }

    /// Caches the end point of each lane covered by the stop line station.
    pub fn locate_stop_line(&mut self, sim: &impl Connector) -> Result<(), SimError> {
        let mut points = SmallVec::new();
        if let Some(station) = self.stations.last() {
            for detector in station.detectors() {
                let lane = sim.detector_lane(detector.id())?;
                if let Some(end) = sim.lane_shape(&lane)?.last() {
                    points.push(*end);
                }
            }
        }
        self.stop_line = points;
        Ok(())
    }

    /// Updates the stations in chain order and the queue estimate.
    ///
    /// The queue and section membership only change once every station has
    /// updated, so a failed step leaves them as they were.
    pub fn update(&mut self, sim: &impl Connector) -> Result<(), SimError> {
        let mut section_volume = 0;
        let mut queue = self.traffic_queue;
        let mut members = self.section_vehicles.clone();

        for (idx, station) in self.stations.iter_mut().enumerate() {
            station.update(sim)?;

            if idx == 0 {
                section_volume += station.volume();
                members.extend(station.input_vehicles().iter().cloned());
            }
            if station.id() == self.config.input_station {
                queue += station.volume() as i64;
            }

            queue -= station.exit_volume() as i64;
            for vehicle in station.exit_vehicles() {
                members.remove(vehicle);
            }
        }
        self.traffic_queue = queue;
        self.section_vehicles = members;

        let mut co2 = 0.0;
        let mut vanished = vec![];
        for vehicle in &self.section_vehicles {
            match sim.vehicle_co2(vehicle) {
                Ok(rate) if rate >= 0.0 => co2 += rate / 1000.0,
                Ok(_) => {}
                Err(SimError::VehicleNotFound(_)) => vanished.push(vehicle.clone()),
                Err(err) => return Err(err),
            }
        }
        for vehicle in vanished {
            log::warn!("{}: vehicle {} disappeared", self.bound, vehicle);
            self.section_vehicles.remove(&vehicle);
        }

        self.history.push(ApproachSample {
            co2,
            volume: section_volume,
            queue: self.traffic_queue,
        });
        Ok(())
    }

    /// The most recent `(co2, volume, queue)` sample.
    pub fn collect_data(&self) -> Option<ApproachSample> {
        self.history.latest().copied()
    }

    /// Decides whether the green phase of `active_bound` should be extended
    /// for vehicles near this approach's stop line.
    ///
    /// # Parameters
    /// * `time` - The time since the green phase began, in s
    /// * `active_bound` - The approach currently shown green
    /// * `min_green` - The minimum green time of the phase, in s
    /// * `extension_count` - The number of extensions already granted this phase
    pub fn check_dilemma_zone(
        &mut self,
        sim: &impl Connector,
        policy: &DilemmaPolicy,
        time: f64,
        active_bound: Bound,
        min_green: f64,
        extension_count: u32,
    ) -> Result<DilemmaSignal, SimError> {
        if active_bound != self.bound {
            return Ok(DilemmaSignal::None);
        }

        let mut result = DilemmaSignal::None;
        let mut vanished = vec![];

        for vehicle in &self.section_vehicles {
            let signal =
                match self.classify_vehicle(sim, policy, vehicle, time, min_green, extension_count) {
                    Ok(signal) => signal,
                    Err(SimError::VehicleNotFound(_)) => {
                        vanished.push(vehicle.clone());
                        continue;
                    }
                    Err(err) => return Err(err),
                };
            result = result.max(signal);
        }

        for vehicle in vanished {
            log::warn!("{}: vehicle {} disappeared", self.bound, vehicle);
            self.section_vehicles.remove(&vehicle);
        }
        Ok(result)
    }

    /// Classifies one vehicle against every stop line point within range.
    fn classify_vehicle(
        &self,
        sim: &impl Connector,
        policy: &DilemmaPolicy,
        vehicle: &VehicleId,
        time: f64,
        min_green: f64,
        extension_count: u32,
    ) -> Result<DilemmaSignal, SimError> {
        let position = sim.vehicle_position(vehicle)?;
        match nearest_distance(position, &self.stop_line) {
            Some(nearest) if nearest <= policy.radius => {}
            _ => return Ok(DilemmaSignal::None),
        }

        let speed = sim.vehicle_speed(vehicle)?;
        let class = sim.vehicle_class(vehicle)?;

        let signal = self
            .stop_line
            .iter()
            .map(|point| position.distance(*point))
            .filter(|distance| *distance <= policy.radius)
            .map(|distance| {
                policy.dilemma_zone_signal(time, speed, distance, &class, min_green, extension_count)
            })
            .max()
            .unwrap_or_default();

        log::trace!(
            "{}: vehicle {} at {:.1} km/h -> {}",
            self.bound,
            vehicle,
            speed * 3.6,
            signal
        );
        Ok(signal)
    }

    /// Restores the dynamic state recorded in a snapshot.
    pub(crate) fn restore_state(
        &mut self,
        traffic_queue: i64,
        section_vehicles: BTreeSet<VehicleId>,
        history: History<ApproachSample>,
    ) {
        self.traffic_queue = traffic_queue;
        self.section_vehicles = section_vehicles;
        self.history = history;
    }
}
