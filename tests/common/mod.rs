//! A small four-approach layout shared by the integration tests.

#![allow(dead_code)]

use adaptive_signal::math::Point2d;
use adaptive_signal::{Frame, Phase, SignalProgram, Trace, TraceDetector, VehicleState};

/// Entry and stop line detectors of each approach, with their lanes.
pub const DETECTORS: [(&str, &str); 8] = [
    ("Det_00000000", "s_in"),
    ("Det_10000500", "s_out"),
    ("Det_01002100", "n_in"),
    ("Det_11002200", "n_out"),
    ("Det_02001800", "e_in"),
    ("Det_12001900", "e_out"),
    ("Det_03001700", "w_in"),
    ("Det_13001800", "w_out"),
];

/// An eight phase program: east, west, south and north green, each followed by amber.
pub fn program() -> SignalProgram {
    SignalProgram::new(vec![
        Phase::new(3.0, 1.0, "GGrrrrrr"),
        Phase::new(1.0, 1.0, "yyrrrrrr"),
        Phase::new(3.0, 1.0, "rrGGrrrr"),
        Phase::new(1.0, 1.0, "rryyrrrr"),
        Phase::new(3.0, 1.0, "rrrrGGrr"),
        Phase::new(1.0, 1.0, "rrrryyrr"),
        Phase::new(3.0, 1.0, "rrrrrrGG"),
        Phase::new(1.0, 1.0, "rrrrrryy"),
    ])
}

/// The layout with no frames. Stop lines lie 10 from the centre.
pub fn layout() -> Trace {
    let mut trace = Trace {
        program: program(),
        ..Default::default()
    };
    for (id, lane) in DETECTORS {
        trace.detectors.push(TraceDetector {
            id: id.to_string(),
            lane: lane.to_string(),
        });
    }
    let lanes = [
        ("s_in", (0.0, -200.0), (0.0, -100.0)),
        ("s_out", (0.0, -100.0), (0.0, -10.0)),
        ("n_in", (0.0, 200.0), (0.0, 100.0)),
        ("n_out", (0.0, 100.0), (0.0, 10.0)),
        ("e_in", (-200.0, 0.0), (-100.0, 0.0)),
        ("e_out", (-100.0, 0.0), (-10.0, 0.0)),
        ("w_in", (200.0, 0.0), (100.0, 0.0)),
        ("w_out", (100.0, 0.0), (10.0, 0.0)),
    ];
    for (lane, from, to) in lanes {
        trace.lanes.insert(
            lane.to_string(),
            vec![Point2d::new(from.0, from.1), Point2d::new(to.0, to.1)],
        );
    }
    trace
}

pub fn detector_ids() -> Vec<&'static str> {
    DETECTORS.iter().map(|(id, _)| *id).collect()
}

pub fn car(x: f64, y: f64, speed: f64, co2: f64) -> VehicleState {
    VehicleState {
        position: Point2d::new(x, y),
        speed,
        class: "passenger".to_string(),
        co2,
    }
}

/// Pads the trace with empty frames up to `len`.
pub fn pad(trace: &mut Trace, len: usize) {
    while trace.frames.len() < len {
        trace.frames.push(Frame::default());
    }
}
