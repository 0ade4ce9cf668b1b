use crate::detector::MPS_TO_KPH;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The outcome of a dilemma zone check, ordered by priority.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DilemmaSignal {
    /// No action.
    #[default]
    None,
    /// End the green phase.
    Yellow,
    /// Extend the green phase so a vehicle can clear the stop line.
    Pass,
}

/// Parameters of the dilemma zone decision.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DilemmaPolicy {
    /// Only vehicles within this distance of a stop line point are considered.
    pub radius: f64,
    /// The vehicle class which uses `passenger_decel`.
    pub passenger_class: String,
    /// Deceleration constant for passenger cars, in km/h per s.
    pub passenger_decel: f64,
    /// Deceleration constant for every other class, in km/h per s.
    pub other_decel: f64,
    /// Once more than this many extensions have been granted the phase is ended.
    pub extension_limit: u32,
}

impl Default for DilemmaPolicy {
    fn default() -> Self {
        Self {
            radius: 120.0,
            passenger_class: "passenger".to_string(),
            passenger_decel: 14.0,
            other_decel: 9.0,
            extension_limit: 5,
        }
    }
}

impl DilemmaPolicy {
    /// Classifies a single vehicle approaching the stop line.
    ///
    /// # Parameters
    /// * `time` - The time since the green phase began, in s
    /// * `speed` - The vehicle speed in m/s
    /// * `distance` - The distance to the stop line
    /// * `class` - The vehicle class
    /// * `min_green` - The minimum green time of the phase, in s
    /// * `extension_count` - The number of extensions already granted this phase
    pub fn dilemma_zone_signal(
        &self,
        time: f64,
        speed: f64,
        distance: f64,
        class: &str,
        min_green: f64,
        extension_count: u32,
    ) -> DilemmaSignal {
        let speed = speed * MPS_TO_KPH;
        if time < min_green {
            return DilemmaSignal::None;
        }
        if extension_count > self.extension_limit {
            return DilemmaSignal::Yellow;
        }
        let stopping_distance = speed * (speed / self.decel_for(class));
        if stopping_distance < distance {
            DilemmaSignal::Yellow
        } else {
            DilemmaSignal::Pass
        }
    }

    fn decel_for(&self, class: &str) -> f64 {
        if class == self.passenger_class {
            self.passenger_decel
        } else {
            self.other_decel
        }
    }
}

impl fmt::Display for DilemmaSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DilemmaSignal::None => "none",
            DilemmaSignal::Yellow => "yellow",
            DilemmaSignal::Pass => "pass",
        })
    }
}
