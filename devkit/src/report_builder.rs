//! Générateurs de payloads OBU pour tests et bancs d'essai.
//!
//! Reproduit la forme exacte des paquets émis par les unités embarquées :
//! identité véhicule, description, coordonnées, trace de hops initiale.

use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Helper pour fabriquer des rapports d'incident conformes au format du lien.
pub struct ObuMessageBuilder;

impl ObuMessageBuilder {
    /// Rapport minimal valide tel qu'un OBU l'émet (trace = [vehicle_id]).
    pub fn incident<S: Into<String>>(vehicle_id: S, issue: S, latitude: f64, longitude: f64) -> Value {
        let vehicle_id = vehicle_id.into();
        serde_json::json!({
            "vehicle_id": vehicle_id,
            "issue": issue.into(),
            "raw_description": "reported from bench",
            "latitude": latitude,
            "longitude": longitude,
            "timestamp": OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default(),
            "hop_trace": [vehicle_id]
        })
    }

    /// Rapport déjà passé par une chaîne de hops donnée.
    pub fn incident_with_trace(
        vehicle_id: &str,
        issue: &str,
        latitude: f64,
        longitude: f64,
        hops: &[&str],
    ) -> Value {
        let mut value = Self::incident(vehicle_id, issue, latitude, longitude);
        value["hop_trace"] = serde_json::json!(hops);
        value
    }

    /// Sérialise un rapport en octets prêts pour le lien UDP.
    pub fn payload(value: &Value) -> Vec<u8> {
        serde_json::to_vec(value).expect("report serialization")
    }

    /// Payload qui n'est pas du JSON : doit être rejeté au décodage.
    pub fn malformed_payload() -> Vec<u8> {
        b"{vehicle_id: CAR_01 no quotes no closing".to_vec()
    }

    /// Payload JSON valide mais au-delà du plafond de 2048 octets.
    pub fn oversized_payload() -> Vec<u8> {
        let value = serde_json::json!({
            "vehicle_id": "CAR_01",
            "issue": "x".repeat(2400),
            "latitude": 12.0,
            "longitude": 77.0
        });
        serde_json::to_vec(&value).expect("report serialization")
    }
}
