use crate::approach::DilemmaSignal;
use crate::connector::{Connector, PhaseClock};
use crate::error::SimError;

/// The state of the green phase under dilemma zone control.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExtensionState {
    /// Running its programmed duration.
    #[default]
    GreenNormal,
    /// Extended at least once.
    GreenExtended,
    /// Ended early; waiting for the phase switch.
    YellowPending,
}

/// What the controller does to the running phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExtensionAction {
    Hold,
    /// Add one second to the remaining green time.
    Extend,
    /// Switch to the next phase now.
    Terminate,
}

/// Extends or truncates green phases according to dilemma zone decisions.
#[derive(Clone, Debug, Default)]
pub struct GreenExtension {
    state: ExtensionState,
    /// The number of extensions granted in the current phase.
    extensions: u32,
    /// The phase the state refers to.
    phase: Option<usize>,
}

impl GreenExtension {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn state(&self) -> ExtensionState {
        self.state
    }

    /// The number of extensions granted in the current phase.
    pub fn extensions(&self) -> u32 {
        self.extensions
    }

    /// Records the current phase. A phase switch starts a fresh green.
    pub fn observe_phase(&mut self, phase: usize) {
        if self.phase != Some(phase) {
            self.phase = Some(phase);
            self.reset();
        }
    }

    /// Returns to normal green with no extensions.
    pub fn reset(&mut self) {
        self.state = ExtensionState::GreenNormal;
        self.extensions = 0;
    }

    /// Advances the state machine with an approach's dilemma zone decision.
    pub fn decide(&mut self, signal: DilemmaSignal) -> ExtensionAction {
        if self.state == ExtensionState::YellowPending {
            return ExtensionAction::Hold;
        }
        match signal {
            DilemmaSignal::Pass => {
                self.extensions += 1;
                self.state = ExtensionState::GreenExtended;
                ExtensionAction::Extend
            }
            DilemmaSignal::Yellow => {
                self.state = ExtensionState::YellowPending;
                ExtensionAction::Terminate
            }
            DilemmaSignal::None => ExtensionAction::Hold,
        }
    }

    /// Decides on the signal and carries out the action through the connector.
    pub fn apply(
        &mut self,
        sim: &mut impl Connector,
        signal: DilemmaSignal,
        clock: &PhaseClock,
    ) -> Result<ExtensionAction, SimError> {
        let action = self.decide(signal);
        match action {
            ExtensionAction::Extend => {
                log::info!(
                    "phase {} extended by 1s ({} extensions)",
                    clock.index,
                    self.extensions
                );
                sim.set_phase_duration(clock.remaining + 1.0)?;
            }
            ExtensionAction::Terminate => {
                let next = sim.program()?.next_index(clock.index);
                log::info!("phase {} ended early after {:.0}s", clock.index, clock.elapsed);
                sim.set_phase(next)?;
            }
            ExtensionAction::Hold => {}
        }
        Ok(action)
    }
}
