use serde::{Deserialize, Serialize};

use crate::models::{EnvironmentStatus, RsuEnvironment};

/// Seuils de classification (unités capteur natives).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Thresholds {
    pub air_quality_max: u32,
    pub temperature_max: f32,
    pub light_min: u32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            air_quality_max: 2000,
            temperature_max: 45.0,
            light_min: 500,
        }
    }
}

/// Fonction pure : relevé → label. Les règles sont évaluées en priorité
/// fixe, première règle gagnante. Le feu domine la visibilité : même si les
/// deux signatures sont vraies, c'est le danger le plus grave qui sort.
pub fn classify(env: &RsuEnvironment, thresholds: &Thresholds) -> EnvironmentStatus {
    if env.air_quality > thresholds.air_quality_max && env.temperature > thresholds.temperature_max {
        EnvironmentStatus::FireRisk
    } else if env.light_level < thresholds.light_min {
        EnvironmentStatus::LowVisibility
    } else {
        EnvironmentStatus::Normal
    }
}
