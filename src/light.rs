use serde::{Deserialize, Serialize};

/// A signal program: the cyclic sequence of phases run by the intersection controller.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalProgram {
    pub phases: Vec<Phase>,
}

/// A single phase of a signal program.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    /// The duration of the phase in s.
    pub duration: f64,
    /// The minimum duration of the phase in s.
    #[serde(default)]
    pub min_duration: f64,
    /// The state of each controlled link, one character per link (`r`, `y`, `g` or `G`).
    pub state: String,
}

/// The state of a single controlled link.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum LightState {
    Red,
    Amber,
    Green,
}

impl LightState {
    /// Parses a link state character, treating unknown characters as red.
    pub fn from_char(c: char) -> Self {
        match c {
            'g' | 'G' => LightState::Green,
            'y' | 'Y' => LightState::Amber,
            _ => LightState::Red,
        }
    }
}

impl Phase {
    /// Creates a phase.
    pub fn new(duration: f64, min_duration: f64, state: &str) -> Self {
        Self {
            duration,
            min_duration,
            state: state.to_string(),
        }
    }

    /// Iterates over the states of the controlled links.
    pub fn links(&self) -> impl Iterator<Item = LightState> + '_ {
        self.state.chars().map(LightState::from_char)
    }

    /// Whether the phase gives green to some links and shows amber to none.
    pub fn is_green(&self) -> bool {
        let mut green = false;
        for link in self.links() {
            match link {
                LightState::Amber => return false,
                LightState::Green => green = true,
                LightState::Red => {}
            }
        }
        green
    }

    /// Whether any link shows amber.
    pub fn is_amber(&self) -> bool {
        self.links().any(|link| link == LightState::Amber)
    }
}

impl SignalProgram {
    /// Creates a program from its phases.
    pub fn new(phases: Vec<Phase>) -> Self {
        Self { phases }
    }

    /// The number of phases.
    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    /// The index of the phase following `index`.
    pub fn next_index(&self, index: usize) -> usize {
        if self.phases.is_empty() {
            0
        } else {
            (index + 1) % self.phases.len()
        }
    }

    /// The total cycle length in s.
    pub fn cycle_time(&self) -> f64 {
        self.phases.iter().map(|p| p.duration).sum()
    }

    /// Sets the duration of a phase, if it exists.
    pub fn set_duration(&mut self, index: usize, duration: f64) -> bool {
        match self.phases.get_mut(index) {
            Some(phase) => {
                phase.duration = duration;
                true
            }
            None => false,
        }
    }
}
