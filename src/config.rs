//! Controller configuration and static sensor configuration loading.

use crate::approach::{ApproachConfig, DilemmaPolicy};
use crate::connector::PhaseClock;
use crate::control::{CapacityShare, OccupancyRate, Weighting};
use crate::detector::Dedup;
use crate::error::ConfigError;
use crate::light::SignalProgram;
use crate::Bound;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// How the controller drives the signal program.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ControlMode {
    /// Run the program unchanged.
    #[default]
    Static,
    /// Reallocate green time whenever `trigger` fires.
    Actuated {
        weighting: WeightingKind,
        #[serde(default)]
        trigger: AllocationTrigger,
    },
    /// Extend or truncate green phases for vehicles in the dilemma zone.
    DilemmaZone,
}

/// Selects a [Weighting] strategy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightingKind {
    #[default]
    CapacityShare,
    OccupancyRate,
}

impl WeightingKind {
    /// The strategy this kind selects.
    pub fn strategy(self) -> &'static dyn Weighting {
        match self {
            WeightingKind::CapacityShare => &CapacityShare,
            WeightingKind::OccupancyRate => &OccupancyRate,
        }
    }
}

/// When actuated control recomputes the green split.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationTrigger {
    /// When the last phase of the program runs out.
    #[default]
    CycleEnd,
    /// When any amber phase runs out.
    AfterAmber,
}

impl AllocationTrigger {
    /// Whether an allocation is due at this point of the program.
    pub fn fires(self, program: &SignalProgram, clock: &PhaseClock) -> bool {
        if clock.remaining > 0.0 {
            return false;
        }
        match self {
            AllocationTrigger::CycleEnd => clock.index + 1 == program.len(),
            AllocationTrigger::AfterAmber => program
                .phases
                .get(clock.index)
                .map_or(false, |phase| phase.is_amber()),
        }
    }
}

/// Everything needed to run a controller against a simulator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub mode: ControlMode,
    /// The signal cycle length in s.
    pub cycle_time: f64,
    /// The amber time within one cycle in s.
    pub total_yellow_time: f64,
    /// An optional cap on any approach's allocated green time, in s.
    pub max_green: Option<u32>,
    /// The number of steps to run.
    pub step_budget: usize,
    /// The number of samples kept by every time series.
    pub history_len: usize,
    pub dedup: Dedup,
    pub dilemma: DilemmaPolicy,
    pub approaches: BTreeMap<Bound, ApproachConfig>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            mode: ControlMode::Static,
            cycle_time: 200.0,
            total_yellow_time: 20.0,
            max_green: None,
            step_budget: 11_700,
            history_len: 14_400,
            dedup: Dedup::PreviousStep,
            dilemma: DilemmaPolicy::default(),
            approaches: default_approaches(),
        }
    }
}

/// The approach layout of the reference intersection.
fn default_approaches() -> BTreeMap<Bound, ApproachConfig> {
    let table = [
        (Bound::South, "000000", 25.0, 107.0, 4),
        (Bound::North, "010021", 20.0, 88.0, 6),
        (Bound::East, "020018", 28.0, 126.0, 0),
        (Bound::West, "030017", 27.0, 119.0, 2),
    ];
    table
        .into_iter()
        .map(|(bound, input, share, capacity, phase)| {
            let config = ApproachConfig {
                input_station: input.to_string(),
                capacity_share: share,
                max_capacity: capacity,
                green_phase: phase,
            };
            (bound, config)
        })
        .collect()
}

impl ControllerConfig {
    /// Parses a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// The configuration of an approach.
    pub fn approach(&self, bound: Bound) -> Result<&ApproachConfig, ConfigError> {
        self.approaches
            .get(&bound)
            .ok_or(ConfigError::MissingApproachConfig(bound))
    }
}

/// Extracts the induction loop IDs from a simulator additional file.
///
/// Every line mentioning `inductionLoop` declares one loop; its ID is the
/// first double quoted attribute value on the line.
pub fn detector_ids_from_additional(text: &str) -> Result<Vec<String>, ConfigError> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| line.contains("inductionLoop"))
        .map(|(idx, line)| {
            line.split('"')
                .nth(1)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .ok_or_else(|| ConfigError::MalformedAdditional {
                    line: idx + 1,
                    text: line.trim().to_string(),
                })
        })
        .collect()
}
