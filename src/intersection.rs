use crate::approach::Approach;
use crate::config::ControllerConfig;
use crate::connector::Connector;
use crate::detector::Detector;
use crate::error::{ConfigError, SimError};
use crate::light::SignalProgram;
use crate::station::Station;
use crate::Bound;
use arrayvec::ArrayVec;
use itertools::Itertools;

/// The four approaches of a signalised intersection, in bound order.
#[derive(Clone, Debug)]
pub struct Intersection {
    approaches: ArrayVec<Approach, 4>,
}

impl Intersection {
    /// Builds the detector, station and approach hierarchy from detector IDs.
    ///
    /// Detectors sharing a station code form a station, and stations are
    /// chained per bound in the order their first detector appears.
    pub fn build<I>(detector_ids: I, config: &ControllerConfig) -> Result<Self, ConfigError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let detectors = detector_ids
            .into_iter()
            .map(|id| Detector::parse(id.as_ref(), config.dedup, config.history_len))
            .collect::<Result<Vec<_>, _>>()?;

        let codes = detectors
            .iter()
            .map(|d| d.code().station().to_string())
            .unique()
            .collect::<Vec<_>>();
        let mut stations = codes
            .iter()
            .map(|code| Station::new(code, config.history_len))
            .collect::<Vec<_>>();
        for detector in detectors {
            if let Some(idx) = codes.iter().position(|c| c == detector.code().station()) {
                stations[idx].add_detector(detector);
            }
        }

        let mut chains: [Vec<Station>; 4] = Default::default();
        for station in stations {
            if let Some(bound) = station.direction() {
                chains[bound.index() as usize].push(station);
            }
        }

        let approaches = Bound::ALL
            .into_iter()
            .zip(chains)
            .map(|(bound, stations)| {
                if stations.is_empty() {
                    return Err(ConfigError::MissingApproach(bound));
                }
                let approach_config = config.approach(bound)?.clone();
                log::debug!(
                    "{} approach: stations {}",
                    bound,
                    stations.iter().map(|s| s.id()).join(" -> ")
                );
                Ok(Approach::new(bound, approach_config, stations, config.history_len))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::from_approaches(approaches)
    }

    /// Creates an intersection from one approach per bound.
    pub fn from_approaches(mut approaches: Vec<Approach>) -> Result<Self, ConfigError> {
        approaches.sort_by_key(|a| a.bound());
        for bound in Bound::ALL {
            if !approaches.iter().any(|a| a.bound() == bound) {
                return Err(ConfigError::MissingApproach(bound));
            }
        }
        Ok(Self {
            approaches: approaches.into_iter().dedup_by(|a, b| a.bound() == b.bound()).collect(),
        })
    }

    /// Caches the stop line of every approach.
    pub fn locate_stop_lines(&mut self, sim: &impl Connector) -> Result<(), SimError> {
        for approach in &mut self.approaches {
            approach.locate_stop_line(sim)?;
        }
        Ok(())
    }

    /// Updates every approach for the step just simulated.
    pub fn update(&mut self, sim: &impl Connector) -> Result<(), SimError> {
        for approach in &mut self.approaches {
            approach.update(sim)?;
        }
        Ok(())
    }

    pub fn approaches(&self) -> &[Approach] {
        &self.approaches
    }

    pub fn approaches_mut(&mut self) -> &mut [Approach] {
        &mut self.approaches
    }

    pub fn approach(&self, bound: Bound) -> &Approach {
        &self.approaches[bound.index() as usize]
    }

    /// The approach shown green by the given phase, if any.
    pub fn active_bound(&self, program: &SignalProgram, phase: usize) -> Option<Bound> {
        if !program.phases.get(phase)?.is_green() {
            return None;
        }
        self.approaches
            .iter()
            .find(|a| a.config().green_phase == phase)
            .map(|a| a.bound())
    }
}

#[cfg(test)]
mod test {
    use super::Intersection;
    use crate::light::{Phase, SignalProgram};
    use crate::{Bound, ConfigError, ControllerConfig};

    const IDS: [&str; 9] = [
        "Det_00000000",
        "Det_00000001",
        "Det_10000500",
        "Det_01002100",
        "Det_11002200",
        "Det_02001800",
        "Det_02001801",
        "Det_12001900",
        "Det_03001700",
    ];

    #[test]
    fn groups_detectors() {
        let intersection = Intersection::build(IDS, &ControllerConfig::default()).unwrap();
        let south = intersection.approach(Bound::South);
        let ids = south.stations().iter().map(|s| s.id()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["000000", "100005"]);
        assert_eq!(south.stations()[0].detectors().len(), 2);
        assert_eq!(south.config().input_station, "000000");

        let east = intersection.approach(Bound::East);
        assert_eq!(east.stations().len(), 2);
        assert_eq!(east.stations()[1].direction(), Some(Bound::East));
        assert_eq!(intersection.approach(Bound::West).stations().len(), 1);
    }

    #[test]
    fn every_bound_needs_stations() {
        let err = Intersection::build(&IDS[..8], &ControllerConfig::default()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingApproach(Bound::West)));
    }

    #[test]
    fn malformed_id_aborts() {
        let mut ids = IDS.to_vec();
        ids.push("Det_9");
        let err = Intersection::build(ids, &ControllerConfig::default()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDetectorId(_)));
    }

    #[test]
    fn active_bound_from_phase() {
        let intersection = Intersection::build(IDS, &ControllerConfig::default()).unwrap();
        let program = SignalProgram::new(vec![
            Phase::new(30.0, 5.0, "rrrrrrrrrrrgggg"),
            Phase::new(3.0, 3.0, "rrrrrrrrrrryyyy"),
            Phase::new(30.0, 5.0, "rrrrggggrrrrrrr"),
            Phase::new(3.0, 3.0, "rrrryyyyrrrrrrr"),
            Phase::new(30.0, 5.0, "ggggrrrrrrrrrrr"),
        ]);
        assert_eq!(intersection.active_bound(&program, 0), Some(Bound::East));
        assert_eq!(intersection.active_bound(&program, 1), None);
        assert_eq!(intersection.active_bound(&program, 2), Some(Bound::West));
        assert_eq!(intersection.active_bound(&program, 4), Some(Bound::South));
        assert_eq!(intersection.active_bound(&program, 9), None);
    }
}
