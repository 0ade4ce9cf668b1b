use crate::config::{ControlMode, ControllerConfig};
use crate::connector::{Connector, PhaseClock};
use crate::control::{apply_allocation, traffic_signal_control, ExtensionAction, GreenExtension};
use crate::error::{ConfigError, SimError};
use crate::intersection::Intersection;
use crate::util::History;
use crate::Bound;
use serde::{Deserialize, Serialize};

/// The state of one approach at the end of one step.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SectionRecord {
    pub time: f64,
    pub bound: Bound,
    /// CO2 emitted by queued vehicles, in g/s.
    pub co2: f64,
    pub volume: u32,
    pub queue: i64,
}

/// Running totals over the whole network at the end of one step.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TotalRecord {
    pub time: f64,
    /// CO2 emitted by every vehicle since the start of the run, in mg.
    pub total_co2: f64,
    /// Vehicles that have entered any approach since the start of the run.
    pub total_volume: u64,
}

/// Runs the aggregation pipeline and a control algorithm in lock-step with a simulator.
pub struct Controller<C> {
    sim: C,
    config: ControllerConfig,
    intersection: Intersection,
    extension: GreenExtension,
    /// The number of completed steps.
    steps: usize,
    total_co2: f64,
    total_volume: u64,
    sections: History<SectionRecord>,
    totals: History<TotalRecord>,
}

impl<C: Connector> Controller<C> {
    /// Builds the intersection from detector IDs and caches its stop lines.
    pub fn new<I>(sim: C, config: ControllerConfig, detector_ids: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut intersection = Intersection::build(detector_ids, &config)?;
        intersection.locate_stop_lines(&sim)?;
        Ok(Self::with_intersection(sim, config, intersection))
    }

    /// Creates a controller for an existing intersection, e.g. one restored from a snapshot.
    pub fn with_intersection(sim: C, config: ControllerConfig, intersection: Intersection) -> Self {
        let history_len = config.history_len;
        Self {
            sim,
            config,
            intersection,
            extension: GreenExtension::new(),
            steps: 0,
            total_co2: 0.0,
            total_volume: 0,
            sections: History::new(history_len * 4),
            totals: History::new(history_len),
        }
    }

    /// Runs the remainder of the step budget.
    pub fn run(&mut self) -> Result<(), SimError> {
        while self.steps < self.config.step_budget {
            self.step()?;
        }
        log::info!(
            "run finished after {} steps: {:.1} kg CO2, {} vehicles",
            self.steps,
            self.total_co2 / 1e6,
            self.total_volume
        );
        Ok(())
    }

    /// Advances the simulator one step, then aggregates and controls.
    pub fn step(&mut self) -> Result<(), SimError> {
        self.sim.step()?;
        let clock = PhaseClock::read(&self.sim)?;
        let program = self.sim.program()?;

        if let ControlMode::Actuated { weighting, trigger } = self.config.mode {
            if trigger.fires(&program, &clock) {
                let allocation = traffic_signal_control(
                    self.intersection.approaches(),
                    self.config.cycle_time,
                    self.config.total_yellow_time,
                    weighting.strategy(),
                    self.config.max_green,
                );
                if let Some(allocation) = allocation {
                    apply_allocation(&mut self.sim, &allocation)?;
                }
            }
        }

        self.intersection.update(&self.sim)?;

        if self.config.mode == ControlMode::DilemmaZone {
            self.extension.observe_phase(clock.index);
            if let Some(bound) = self.intersection.active_bound(&program, clock.index) {
                let min_green = program.phases[clock.index].min_duration;
                for approach in self.intersection.approaches_mut() {
                    let signal = approach.check_dilemma_zone(
                        &self.sim,
                        &self.config.dilemma,
                        clock.elapsed,
                        bound,
                        min_green,
                        self.extension.extensions(),
                    )?;
                    let action = self.extension.apply(&mut self.sim, signal, &clock)?;
                    if action == ExtensionAction::Terminate {
                        break;
                    }
                }
            }
        }

        self.record()?;
        self.steps += 1;
        Ok(())
    }

    /// Appends this step's per-approach and network-wide records.
    fn record(&mut self) -> Result<(), SimError> {
        let time = self.sim.time();
        for approach in self.intersection.approaches() {
            let sample = approach.collect_data().unwrap_or_default();
            self.total_volume += sample.volume as u64;
            self.sections.push(SectionRecord {
                time,
                bound: approach.bound(),
                co2: sample.co2,
                volume: sample.volume,
                queue: sample.queue,
            });
        }

        for vehicle in self.sim.vehicle_ids()? {
            match self.sim.vehicle_co2(&vehicle) {
                Ok(rate) => self.total_co2 += rate,
                Err(SimError::VehicleNotFound(_)) => {}
                Err(err) => return Err(err),
            }
        }
        self.totals.push(TotalRecord {
            time,
            total_co2: self.total_co2,
            total_volume: self.total_volume,
        });
        Ok(())
    }

    /// The number of completed steps.
    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn intersection(&self) -> &Intersection {
        &self.intersection
    }

    pub fn connector(&self) -> &C {
        &self.sim
    }

    /// The state of the dilemma zone extension machine.
    pub fn extension(&self) -> &GreenExtension {
        &self.extension
    }

    /// Per-approach records, four per step.
    pub fn sections(&self) -> &History<SectionRecord> {
        &self.sections
    }

    pub fn totals(&self) -> &History<TotalRecord> {
        &self.totals
    }

    /// Ends the run and hands back the connector.
    pub fn into_connector(self) -> C {
        self.sim
    }
}
