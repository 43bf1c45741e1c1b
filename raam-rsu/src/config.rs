use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

use crate::classify::Thresholds;
use crate::sensors::SensorBaselines;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RsuConfig {
    /// Identifiant de hop ajouté à la trace de chaque rapport relayé.
    pub node_id: String,
    /// Port UDP d'écoute des rapports entrants.
    pub listen_port: u16,
    /// Port HTTP local de la vue statut (non authentifié).
    pub status_port: u16,
    pub next_hop: NextHopConf,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub sensors: SensorBaselines,
    /// Backend de persistance. Absent = persistance désactivée.
    pub backend: Option<BackendConf>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NextHopConf {
    pub host: String,
    pub port: u16,
}

impl NextHopConf {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BackendConf {
    /// URL racine du projet, ex: "https://xyz.supabase.co"
    pub url: String,
    /// Table REST cible des rapports.
    pub table: String,
    /// Timeout explicite par requête. La référence bloquait sans limite ;
    /// ici l'appel a toujours une issue définie.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// true = comportement de référence : on tente l'envoi même si la sonde
    /// de démarrage a échoué. false = plus aucun envoi après sonde ratée.
    #[serde(default = "default_upload_after_probe_failure")]
    pub upload_after_probe_failure: bool,
}

fn default_timeout_seconds() -> u64 {
    10
}

fn default_upload_after_probe_failure() -> bool {
    true
}

impl Default for RsuConfig {
    fn default() -> Self {
        Self {
            node_id: "RSU_01".into(),
            listen_port: 5005,
            status_port: 8080,
            next_hop: NextHopConf { host: "127.0.0.1".into(), port: 5006 },
            thresholds: Thresholds::default(),
            sensors: SensorBaselines::default(),
            backend: None,
        }
    }
}

pub async fn load_config() -> RsuConfig {
    let path = std::env::var("RAAM_RSU_CONFIG").unwrap_or_else(|_| "rsu.yaml".into());
    if Path::new(&path).exists() {
        let txt = fs::read_to_string(&path).await.unwrap_or_default();
        if txt.trim().is_empty() {
            return RsuConfig::default();
        }
        serde_yaml::from_str(&txt).unwrap_or_else(|e| {
            tracing::warn!("config invalide dans {path}: {e}");
            RsuConfig::default()
        })
    } else {
        tracing::warn!("pas de {path}, usage config par défaut");
        RsuConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = RsuConfig::default();
        assert_eq!(cfg.listen_port, 5005);
        assert_eq!(cfg.next_hop.addr(), "127.0.0.1:5006");
        assert!(cfg.backend.is_none());
        assert_eq!(cfg.thresholds.air_quality_max, 2000);
    }

    #[test]
    fn test_partial_yaml_uses_section_defaults() {
        let yaml = r#"
node_id: RSU_07
listen_port: 6005
status_port: 8090
next_hop:
  host: 10.0.0.2
  port: 5006
backend:
  url: https://xyz.supabase.co
  table: incident_reports
"#;
        let cfg: RsuConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.node_id, "RSU_07");
        assert_eq!(cfg.thresholds.light_min, 500);
        let backend = cfg.backend.unwrap();
        assert_eq!(backend.timeout_seconds, 10);
        assert!(backend.upload_after_probe_failure);
    }
}
