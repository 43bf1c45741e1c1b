/**
 * SENSOR SAMPLER - Échantillonnage des quatre grandeurs environnementales
 *
 * RÔLE :
 * Fournit au pipeline un relevé à la demande (température, humidité,
 * qualité d'air, luminosité) sans exposer le matériel sous-jacent.
 *
 * FONCTIONNEMENT :
 * - EnvironmentSensor trait = couture matérielle (DHT/MQ/LDR réels, ou
 *   générateur synthétique pour le banc de test)
 * - SyntheticSensor = dérive sinusoïdale déterministe autour de baselines
 *   configurables, bornée aux plages ADC 0..4095
 * - Cache du dernier relevé, seul état interne de l'échantillonneur
 */

use serde::{Deserialize, Serialize};

use crate::models::RsuEnvironment;

/// Couture entre le pipeline et l'acquisition physique. Les pilotes réels
/// (I2C/ADC) vivent derrière cette interface, hors du cœur du relais.
pub trait EnvironmentSensor: Send {
    /// Relevé instantané des quatre scalaires.
    fn sample(&mut self) -> RsuEnvironment;

    /// Dernier relevé retourné par `sample`, s'il existe.
    fn last_frame(&self) -> Option<RsuEnvironment>;
}

/// Baselines du générateur synthétique (unités capteur natives).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SensorBaselines {
    pub temperature: f32,
    pub humidity: f32,
    pub air_quality: u32,
    pub light_level: u32,
}

impl Default for SensorBaselines {
    fn default() -> Self {
        Self {
            temperature: 28.0,
            humidity: 60.0,
            air_quality: 800,
            light_level: 1500,
        }
    }
}

/// Générateur de relevés plausibles sans matériel : dérive lente en sinus
/// autour des baselines, sans aléa pour rester reproductible en test.
pub struct SyntheticSensor {
    baselines: SensorBaselines,
    tick: u64,
    last: Option<RsuEnvironment>,
}

impl SyntheticSensor {
    pub fn new(baselines: SensorBaselines) -> Self {
        Self { baselines, tick: 0, last: None }
    }
}

impl EnvironmentSensor for SyntheticSensor {
    fn sample(&mut self) -> RsuEnvironment {
        self.tick += 1;
        let t = self.tick as f32;

        let temperature = (self.baselines.temperature + (t * 0.05).sin() * 3.0).clamp(-10.0, 80.0);
        let humidity = (self.baselines.humidity + (t * 0.03).cos() * 8.0).clamp(0.0, 100.0);
        let air_quality =
            (self.baselines.air_quality as f32 + (t * 0.07).sin() * 150.0).clamp(0.0, 4095.0) as u32;
        let light_level =
            (self.baselines.light_level as f32 + (t * 0.04).cos() * 220.0).clamp(0.0, 4095.0) as u32;

        let frame = RsuEnvironment { temperature, humidity, air_quality, light_level };
        self.last = Some(frame);
        frame
    }

    fn last_frame(&self) -> Option<RsuEnvironment> {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_sensor_stays_in_native_ranges() {
        let mut sensor = SyntheticSensor::new(SensorBaselines::default());
        for _ in 0..500 {
            let frame = sensor.sample();
            assert!((-10.0..=80.0).contains(&frame.temperature));
            assert!((0.0..=100.0).contains(&frame.humidity));
            assert!(frame.air_quality <= 4095);
            assert!(frame.light_level <= 4095);
        }
    }

    #[test]
    fn test_last_frame_tracks_latest_sample() {
        let mut sensor = SyntheticSensor::new(SensorBaselines::default());
        assert!(sensor.last_frame().is_none());
        let frame = sensor.sample();
        assert_eq!(sensor.last_frame(), Some(frame));
        let next = sensor.sample();
        assert_eq!(sensor.last_frame(), Some(next));
    }

    #[test]
    fn test_synthetic_sensor_is_deterministic() {
        let mut a = SyntheticSensor::new(SensorBaselines::default());
        let mut b = SyntheticSensor::new(SensorBaselines::default());
        for _ in 0..50 {
            assert_eq!(a.sample(), b.sample());
        }
    }
}
