use std::error::Error;
use std::time::Instant;

use adaptive_signal::config::detector_ids_from_additional;
use adaptive_signal::{Controller, ControllerConfig, ReplayConnector, Trace};

const USAGE: &str = "usage: signal-replay <trace.json> [config.json] [detectors.add.xml]";

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let trace_path = args.next().ok_or(USAGE)?;
    let config = match args.next() {
        Some(path) if path != "-" => ControllerConfig::load(path)?,
        _ => ControllerConfig::default(),
    };

    let trace = Trace::load(&trace_path)?;
    // Loops listed in an additional file override the ones recorded in the trace
    let detectors = match args.next() {
        Some(path) => detector_ids_from_additional(&std::fs::read_to_string(path)?)?,
        None => trace.detector_ids().map(str::to_string).collect(),
    };
    log::info!(
        "{}: {} frames, {} detectors, {:?} control",
        trace_path,
        trace.frames.len(),
        detectors.len(),
        config.mode
    );

    let mut controller = Controller::new(ReplayConnector::new(trace), config, detectors)?;

    let start = Instant::now();
    controller.run()?;
    let elapsed = start.elapsed();

    for approach in controller.intersection().approaches() {
        let sample = approach.collect_data().unwrap_or_default();
        println!(
            "{}: queue {:>4}, {} stations, {:.2} g/s CO2 queued",
            approach.bound(),
            sample.queue,
            approach.stations().len(),
            sample.co2
        );
    }
    if let Some(total) = controller.totals().latest() {
        println!(
            "t={:.0}s: {:.1} kg CO2, {} vehicles",
            total.time,
            total.total_co2 / 1e6,
            total.total_volume
        );
    }
    println!(
        "{} steps in {:?} ({:?} per step)",
        controller.steps(),
        elapsed,
        elapsed / controller.steps().max(1) as u32
    );
    Ok(())
}
