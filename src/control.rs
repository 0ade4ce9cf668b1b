//! Signal timing algorithms fed by the aggregated approach state.

pub use allocation::{
    apply_allocation, traffic_signal_control, Allocation, CapacityShare, GreenShare,
    OccupancyRate, Weighting,
};
pub use extension::{ExtensionAction, ExtensionState, GreenExtension};

mod allocation;
mod extension;
