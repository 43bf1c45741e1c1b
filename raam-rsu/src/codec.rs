/**
 * REPORT CODEC - Décodage/encodage borné des rapports d'incident
 *
 * RÔLE :
 * Frontière entre les octets non fiables du réseau et le modèle typé.
 * Tout datagramme entrant passe par decode() avant toute autre opération.
 *
 * FONCTIONNEMENT :
 * - Plafond strict de 2048 octets dans les deux sens : un datagramme plus
 *   gros est rejeté entier, jamais tronqué (une troncature couperait le JSON
 *   et pourrait produire un rapport aux champs décalés ou manquants)
 * - Champs requis : vehicle_id, issue, latitude, longitude
 * - Champs inconnus acceptés et conservés (compatibilité ascendante, chaque
 *   hop ajoute les siens)
 *
 * UTILITÉ DANS RAAM :
 * 🎯 Un nœud n'émet jamais un rapport qu'il ne saurait pas re-décoder
 * 🎯 Garde-fou contre la croissance non bornée de hop_trace à l'encodage
 */

use crate::models::IncidentReport;

/// Taille maximale d'un rapport sur le lien, entrant comme sortant.
pub const MAX_DATAGRAM_BYTES: usize = 2048;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("datagram of {0} bytes exceeds the {max} byte ceiling", max = MAX_DATAGRAM_BYTES)]
    Oversized(usize),
    #[error("malformed report payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("encoded report of {0} bytes exceeds the {max} byte ceiling", max = MAX_DATAGRAM_BYTES)]
    Oversized(usize),
    #[error("report serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub fn decode(bytes: &[u8]) -> Result<IncidentReport, DecodeError> {
    if bytes.len() > MAX_DATAGRAM_BYTES {
        return Err(DecodeError::Oversized(bytes.len()));
    }
    Ok(serde_json::from_slice(bytes)?)
}

pub fn encode(report: &IncidentReport) -> Result<Vec<u8>, EncodeError> {
    let bytes = serde_json::to_vec(report)?;
    if bytes.len() > MAX_DATAGRAM_BYTES {
        return Err(EncodeError::Oversized(bytes.len()));
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EnvironmentStatus, RsuEnvironment};

    fn minimal_payload() -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "vehicle_id": "CAR_01",
            "issue": "flat tire",
            "latitude": 12.345678,
            "longitude": 77.123456
        }))
        .unwrap()
    }

    #[test]
    fn test_decode_minimal_report() {
        let report = decode(&minimal_payload()).unwrap();
        assert_eq!(report.vehicle_id, "CAR_01");
        assert!(report.hop_trace.is_empty());
        assert!(report.rsu_environment.is_none());
    }

    #[test]
    fn test_decode_rejects_missing_required_field() {
        let payload = serde_json::to_vec(&serde_json::json!({
            "vehicle_id": "CAR_01",
            "latitude": 12.0,
            "longitude": 77.0
        }))
        .unwrap();
        assert!(matches!(decode(&payload), Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn test_decode_rejects_wrong_scalar_kind() {
        let payload = serde_json::to_vec(&serde_json::json!({
            "vehicle_id": "CAR_01",
            "issue": "flat tire",
            "latitude": "12.9",
            "longitude": 77.0
        }))
        .unwrap();
        assert!(matches!(decode(&payload), Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn test_decode_rejects_non_json() {
        assert!(matches!(decode(b"not json at all"), Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn test_decode_rejects_oversized_datagram() {
        let mut payload = minimal_payload();
        payload.resize(MAX_DATAGRAM_BYTES + 1, b' ');
        assert!(matches!(
            decode(&payload),
            Err(DecodeError::Oversized(n)) if n == MAX_DATAGRAM_BYTES + 1
        ));
    }

    #[test]
    fn test_decode_accepts_exactly_the_ceiling() {
        // du JSON valide paddé d'espaces jusqu'au plafond exact
        let mut payload = minimal_payload();
        payload.resize(MAX_DATAGRAM_BYTES, b' ');
        assert!(decode(&payload).is_ok());
    }

    #[test]
    fn test_encode_rejects_oversized_report() {
        let mut report = decode(&minimal_payload()).unwrap();
        report.issue = "x".repeat(MAX_DATAGRAM_BYTES);
        assert!(matches!(encode(&report), Err(EncodeError::Oversized(_))));
    }

    #[test]
    fn test_enriched_report_round_trips() {
        let mut report = decode(&minimal_payload()).unwrap();
        report.rsu_environment = Some(RsuEnvironment {
            temperature: 31.5,
            humidity: 58.0,
            air_quality: 812,
            light_level: 1403,
        });
        report.environment_status = Some(EnvironmentStatus::Normal);
        report.hop_trace.push("RSU_01".to_string());

        let bytes = encode(&report).unwrap();
        let back = decode(&bytes).unwrap();
        assert_eq!(back, report);
    }
}
