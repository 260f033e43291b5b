// Copyright (c) 2026 open-pit-labs
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/open-pit-labs/pitwatch-rs

//! Sensor reading generator

use chrono::Utc;
use rand::Rng;
use rand_distr::{Distribution, Normal};

use super::RawEvent;
use crate::config::SimulationConfig;
use crate::site::{Reading, ReadingPayload, Sensor, SensorKind};

/// Generates one reading per sensor per tick and maintains the bounded
/// reading history.
pub struct SensorUpdater {
    history_capacity: usize,
    vibration_dist: Normal<f64>,
}

impl SensorUpdater {
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            history_capacity: config.sensor_history_capacity,
            // Background blast/haul vibration centered near 3 mm/s
            vibration_dist: Normal::new(3.0, 2.0).expect("valid distribution"),
        }
    }

    /// Generate the tick's reading for one sensor, append it to the bounded
    /// history, and return the raw sample event.
    pub fn update<R: Rng>(&self, sensor: &mut Sensor, rng: &mut R) -> RawEvent {
        let payload = self.generate_payload(sensor.kind, rng);
        let reading = Reading {
            taken_at: Utc::now(),
            payload,
        };
        sensor.push_reading(reading, self.history_capacity);

        RawEvent::SensorSample {
            sensor_id: sensor.id.clone(),
            kind: sensor.kind,
            location: sensor.location,
            reading,
        }
    }

    fn generate_payload<R: Rng>(&self, kind: SensorKind, rng: &mut R) -> ReadingPayload {
        match kind {
            SensorKind::AirQuality => ReadingPayload::AirQuality {
                co: rng.gen_range(2.0..=9.0),
                no2: rng.gen_range(0.02..=0.2),
            },
            SensorKind::GasLeak => ReadingPayload::GasLeak {
                methane: rng.gen_range(0.0..=0.5),
            },
            SensorKind::Temperature => ReadingPayload::Temperature {
                value: rng.gen_range(35.0..=45.0),
            },
            SensorKind::Vibration => ReadingPayload::Vibration {
                amplitude: self.vibration_dist.sample(rng).clamp(0.0, 12.0),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site::{Position, SensorStatus};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::VecDeque;

    fn sensor(kind: SensorKind) -> Sensor {
        Sensor {
            id: format!("{kind:?}-1"),
            kind,
            site_id: "site-1".to_string(),
            location: Position::new(40.0, 60.0),
            status: SensorStatus::Online,
            last_reading: None,
            history: VecDeque::new(),
        }
    }

    #[test]
    fn test_readings_within_defined_ranges() {
        let updater = SensorUpdater::new(&SimulationConfig::default());
        let mut rng = ChaCha8Rng::seed_from_u64(21);

        for _ in 0..300 {
            let mut s = sensor(SensorKind::AirQuality);
            updater.update(&mut s, &mut rng);
            match s.last_reading.unwrap().payload {
                ReadingPayload::AirQuality { co, no2 } => {
                    assert!((2.0..=9.0).contains(&co));
                    assert!((0.02..=0.2).contains(&no2));
                }
                other => panic!("wrong payload kind: {other:?}"),
            }

            let mut s = sensor(SensorKind::GasLeak);
            updater.update(&mut s, &mut rng);
            match s.last_reading.unwrap().payload {
                ReadingPayload::GasLeak { methane } => {
                    assert!((0.0..=0.5).contains(&methane));
                }
                other => panic!("wrong payload kind: {other:?}"),
            }

            let mut s = sensor(SensorKind::Temperature);
            updater.update(&mut s, &mut rng);
            match s.last_reading.unwrap().payload {
                ReadingPayload::Temperature { value } => {
                    assert!((35.0..=45.0).contains(&value));
                }
                other => panic!("wrong payload kind: {other:?}"),
            }

            let mut s = sensor(SensorKind::Vibration);
            updater.update(&mut s, &mut rng);
            match s.last_reading.unwrap().payload {
                ReadingPayload::Vibration { amplitude } => {
                    assert!((0.0..=12.0).contains(&amplitude));
                }
                other => panic!("wrong payload kind: {other:?}"),
            }
        }
    }

    #[test]
    fn test_one_reading_per_tick_history_capped() {
        let config = SimulationConfig {
            sensor_history_capacity: 5,
            ..SimulationConfig::default()
        };
        let updater = SensorUpdater::new(&config);
        let mut rng = ChaCha8Rng::seed_from_u64(22);
        let mut s = sensor(SensorKind::Temperature);

        for tick in 1..=12 {
            updater.update(&mut s, &mut rng);
            assert_eq!(s.history.len(), tick.min(5));
        }
    }

    #[test]
    fn test_sample_event_carries_location() {
        let updater = SensorUpdater::new(&SimulationConfig::default());
        let mut rng = ChaCha8Rng::seed_from_u64(23);
        let mut s = sensor(SensorKind::GasLeak);

        let event = updater.update(&mut s, &mut rng);
        let RawEvent::SensorSample { location, kind, .. } = event else {
            panic!("sensor updater must emit a sample");
        };
        assert_eq!(kind, SensorKind::GasLeak);
        assert_eq!(location, Position::new(40.0, 60.0));
    }
}
