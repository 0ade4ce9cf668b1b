use crate::approach::Approach;
use crate::connector::Connector;
use crate::error::SimError;
use crate::light::SignalProgram;
use crate::Bound;

/// Weighs an approach's claim on the cycle's green time.
pub trait Weighting {
    fn weight(&self, approach: &Approach) -> f64;
}

/// Weighs approaches by queue length relative to their share of the intersection's capacity.
#[derive(Clone, Copy, Debug, Default)]
pub struct CapacityShare;

/// Weighs approaches by occupancy: queue length relative to the number of vehicles they can hold.
#[derive(Clone, Copy, Debug, Default)]
pub struct OccupancyRate;

impl Weighting for CapacityShare {
    fn weight(&self, approach: &Approach) -> f64 {
        ratio(approach.traffic_queue(), approach.config().capacity_share)
    }
}

impl Weighting for OccupancyRate {
    fn weight(&self, approach: &Approach) -> f64 {
        ratio(approach.traffic_queue(), approach.config().max_capacity)
    }
}

/// Negative queue estimates carry no weight.
fn ratio(queue: i64, capacity: f64) -> f64 {
    if capacity > 0.0 {
        queue.max(0) as f64 / capacity
    } else {
        0.0
    }
}

/// The green time given to one approach.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GreenShare {
    pub bound: Bound,
    /// The program phase showing this approach green.
    pub phase: usize,
    pub weight: f64,
    /// The exact proportional green time in s.
    pub green: f64,
    /// The rounded (and capped) green time written to the program, in s.
    pub green_time: u32,
    /// The queue left over after the approach is served.
    pub surplus_rate: f64,
    /// The waiting time implied by the surplus.
    pub waiting_time: f64,
}

/// The result of one proportional allocation.
#[derive(Clone, Debug, PartialEq)]
pub struct Allocation {
    /// The green time available in the cycle, in s.
    pub total_green: f64,
    pub shares: Vec<GreenShare>,
}

impl Allocation {
    /// The rounded green time of the given approach.
    pub fn green_time(&self, bound: Bound) -> Option<u32> {
        self.shares
            .iter()
            .find(|share| share.bound == bound)
            .map(|share| share.green_time)
    }
}

/// Splits the cycle's green time between the approaches in proportion to their weights.
///
/// Returns `None` when no approach has any weight, in which case the current
/// program should stay in effect.
///
/// # Parameters
/// * `approaches` - The approaches to allocate between
/// * `cycle_time` - The cycle length in s
/// * `total_yellow_time` - The amber time within the cycle in s
/// * `weighting` - How each approach's claim is weighed
/// * `max_green` - An optional cap on any approach's green time, in s
pub fn traffic_signal_control(
    approaches: &[Approach],
    cycle_time: f64,
    total_yellow_time: f64,
    weighting: &dyn Weighting,
    max_green: Option<u32>,
) -> Option<Allocation> {
    let total_green = cycle_time - total_yellow_time;
    if total_green <= 0.0 {
        log::debug!("no green time in a {cycle_time}s cycle with {total_yellow_time}s of amber");
        return None;
    }

    let weights = approaches
        .iter()
        .map(|approach| weighting.weight(approach))
        .collect::<Vec<_>>();
    let total_weight: f64 = weights.iter().sum();
    if total_weight <= 0.0 {
        log::debug!("all approaches empty, keeping the current program");
        return None;
    }

    let shares = approaches
        .iter()
        .zip(weights)
        .map(|(approach, weight)| {
            let green = weight / total_weight * total_green;
            let mut green_time = green.round() as u32;
            if let Some(max_green) = max_green {
                green_time = green_time.min(max_green);
            }
            let service_rate = green * approach.stations().len() as f64 / total_green;
            let surplus_rate = approach.traffic_queue() as f64 - service_rate;
            GreenShare {
                bound: approach.bound(),
                phase: approach.config().green_phase,
                weight,
                green,
                green_time,
                surplus_rate,
                waiting_time: surplus_rate * total_green,
            }
        })
        .collect();

    Some(Allocation {
        total_green,
        shares,
    })
}

/// Writes the allocated green times into the connector's signal program.
pub fn apply_allocation(
    sim: &mut impl Connector,
    allocation: &Allocation,
) -> Result<SignalProgram, SimError> {
    let mut program = sim.program()?;
    for share in &allocation.shares {
        if !program.set_duration(share.phase, share.green_time as f64) {
            return Err(SimError::PhaseOutOfRange {
                index: share.phase,
                len: program.len(),
            });
        }
    }
    sim.set_program(program.clone())?;

    log::info!(
        "{:.0}s - set new phase ({:.0}s cycle): {}",
        sim.time(),
        program.cycle_time(),
        allocation
            .shares
            .iter()
            .map(|s| format!(
                "{} {}s (surplus {:.1}, wait {:.1})",
                s.bound, s.green_time, s.surplus_rate, s.waiting_time
            ))
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(program)
}

#[cfg(test)]
mod test {
    use super::{apply_allocation, traffic_signal_control, CapacityShare, OccupancyRate};
    use crate::light::{Phase, SignalProgram};
    use crate::replay::{ReplayConnector, Trace};
    use crate::util::History;
    use crate::{Approach, ApproachConfig, Bound, Connector, Station};
    use assert_approx_eq::assert_approx_eq;
    use std::collections::BTreeSet;

    fn approach(bound: Bound, share: f64, capacity: f64, phase: usize, queue: i64) -> Approach {
        let config = ApproachConfig {
            input_station: format!("0{}0000", bound.index()),
            capacity_share: share,
            max_capacity: capacity,
            green_phase: phase,
        };
        let stations = vec![Station::new("x", 4), Station::new("y", 4)];
        let mut approach = Approach::new(bound, config, stations, 4);
        approach.restore_state(queue, BTreeSet::new(), History::new(4));
        approach
    }

    fn intersection(queues: [i64; 4]) -> Vec<Approach> {
        vec![
            approach(Bound::South, 25.0, 107.0, 4, queues[0]),
            approach(Bound::North, 20.0, 88.0, 6, queues[1]),
            approach(Bound::East, 28.0, 126.0, 0, queues[2]),
            approach(Bound::West, 27.0, 119.0, 2, queues[3]),
        ]
    }

    #[test]
    fn capacity_share_scenario() {
        let approaches = intersection([10, 5, 0, 0]);
        let allocation =
            traffic_signal_control(&approaches, 200.0, 20.0, &CapacityShare, None).unwrap();

        assert_eq!(allocation.total_green, 180.0);
        assert_approx_eq!(allocation.shares[0].weight, 0.4);
        assert_approx_eq!(allocation.shares[1].weight, 0.25);

        let green = |b| allocation.green_time(b).unwrap();
        assert_eq!(green(Bound::South), 111);
        assert_eq!(green(Bound::North), 69);
        assert_eq!(green(Bound::East), 0);
        assert_eq!(green(Bound::West), 0);

        let sum: u32 = allocation.shares.iter().map(|s| s.green_time).sum();
        assert!((sum as i64 - 180).abs() <= 1);
    }

    #[test]
    fn exact_shares_partition_green_time() {
        let approaches = intersection([13, 7, 22, 4]);
        for allocation in [
            traffic_signal_control(&approaches, 200.0, 20.0, &CapacityShare, None).unwrap(),
            traffic_signal_control(&approaches, 200.0, 20.0, &OccupancyRate, None).unwrap(),
        ] {
            let exact: f64 = allocation.shares.iter().map(|s| s.green).sum();
            assert_approx_eq!(exact, 180.0, 1e-9);
            for share in &allocation.shares {
                assert!((share.green - share.green_time as f64).abs() <= 0.5);
            }
        }
    }

    #[test]
    fn occupancy_weighting() {
        let approaches = intersection([107, 0, 0, 119]);
        let allocation =
            traffic_signal_control(&approaches, 200.0, 20.0, &OccupancyRate, None).unwrap();
        assert_eq!(allocation.green_time(Bound::South), Some(90));
        assert_eq!(allocation.green_time(Bound::West), Some(90));
    }

    #[test]
    fn max_green_caps_allocation() {
        let approaches = intersection([50, 1, 0, 0]);
        let allocation =
            traffic_signal_control(&approaches, 200.0, 20.0, &OccupancyRate, Some(89)).unwrap();
        assert_eq!(allocation.green_time(Bound::South), Some(89));
        assert!(allocation.shares[0].green > 89.0);
    }

    #[test]
    fn diagnostics() {
        let approaches = intersection([10, 5, 0, 0]);
        let allocation =
            traffic_signal_control(&approaches, 200.0, 20.0, &CapacityShare, None).unwrap();
        let south = &allocation.shares[0];
        // Two stations served for 0.4 / 0.65 of the green time
        let service = south.green * 2.0 / 180.0;
        assert_approx_eq!(south.surplus_rate, 10.0 - service);
        assert_approx_eq!(south.waiting_time, south.surplus_rate * 180.0);
    }

    #[test]
    fn empty_intersection_skips_allocation() {
        let approaches = intersection([0, 0, 0, 0]);
        assert!(traffic_signal_control(&approaches, 200.0, 20.0, &CapacityShare, None).is_none());

        // Negative estimates are treated as empty
        let approaches = intersection([-3, 0, 0, 0]);
        assert!(traffic_signal_control(&approaches, 200.0, 20.0, &OccupancyRate, None).is_none());

        let approaches = intersection([3, 0, 0, 0]);
        assert!(traffic_signal_control(&approaches, 20.0, 20.0, &OccupancyRate, None).is_none());
    }

    #[test]
    fn writes_green_phases() {
        let phases = (0..8)
            .map(|i| {
                if i % 2 == 0 {
                    Phase::new(40.0, 10.0, "GGrr")
                } else {
                    Phase::new(5.0, 5.0, "yyrr")
                }
            })
            .collect();
        let mut sim = ReplayConnector::new(Trace {
            program: SignalProgram::new(phases),
            ..Default::default()
        });

        let approaches = intersection([10, 5, 0, 0]);
        let allocation =
            traffic_signal_control(&approaches, 200.0, 20.0, &CapacityShare, None).unwrap();
        apply_allocation(&mut sim, &allocation).unwrap();

        let program = sim.program().unwrap();
        let durations = program.phases.iter().map(|p| p.duration).collect::<Vec<_>>();
        assert_eq!(durations, vec![0.0, 5.0, 0.0, 5.0, 111.0, 5.0, 69.0, 5.0]);
    }

    #[test]
    fn missing_phase_is_an_error() {
        let mut sim = ReplayConnector::new(Trace {
            program: SignalProgram::new(vec![Phase::new(40.0, 10.0, "GGrr")]),
            ..Default::default()
        });
        let approaches = intersection([10, 5, 0, 0]);
        let allocation =
            traffic_signal_control(&approaches, 200.0, 20.0, &CapacityShare, None).unwrap();
        assert!(apply_allocation(&mut sim, &allocation).is_err());
    }
}
