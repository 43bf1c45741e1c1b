use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;

/// Rapport d'incident tel qu'il circule sur le lien UDP (JSON).
/// Les champs inconnus ajoutés par d'autres hops sont conservés dans `extra`
/// pour être ré-émis tels quels (chaque hop ajoute ses propres champs).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IncidentReport {
    pub vehicle_id: String,
    pub issue: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub hop_trace: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rsu_environment: Option<RsuEnvironment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment_status: Option<EnvironmentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relay_timestamp: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Relevé des quatre capteurs locaux attaché par ce nœud.
/// `air_quality` et `light_level` sont des comptes ADC bruts (0..4095).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RsuEnvironment {
    pub temperature: f32,
    pub humidity: f32,
    pub air_quality: u32,
    pub light_level: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EnvironmentStatus {
    #[serde(rename = "fire-risk")]
    FireRisk,
    #[serde(rename = "low-visibility")]
    LowVisibility,
    #[serde(rename = "normal")]
    Normal,
}

impl EnvironmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvironmentStatus::FireRisk => "fire-risk",
            EnvironmentStatus::LowVisibility => "low-visibility",
            EnvironmentStatus::Normal => "normal",
        }
    }
}

impl fmt::Display for EnvironmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot du dernier rapport traité avec succès. Remplacé en bloc à la fin
/// de chaque passe du pipeline, jamais mis à jour champ par champ.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeStatus {
    pub vehicle_id: String,
    pub issue: String,
    pub latitude: f64,
    pub longitude: f64,
    pub environment_status: EnvironmentStatus,
    pub received_at: OffsetDateTime,
}

impl NodeStatus {
    pub fn from_report(report: &IncidentReport, received_at: OffsetDateTime) -> Self {
        Self {
            vehicle_id: report.vehicle_id.clone(),
            issue: report.issue.clone(),
            latitude: report.latitude,
            longitude: report.longitude,
            environment_status: report
                .environment_status
                .unwrap_or(EnvironmentStatus::Normal),
            received_at,
        }
    }
}
