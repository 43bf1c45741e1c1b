/**
 * RELAY PIPELINE - Traitement d'un rapport d'incident, de bout en bout
 *
 * RÔLE :
 * Orchestration d'une passe complète : décodage → enrichissement capteurs →
 * classification → forward UDP → persistance → snapshot statut.
 *
 * FONCTIONNEMENT :
 * - Un seul rapport en vol à la fois : la boucle appelante attend la fin de
 *   la passe avant de relire le socket (ordre d'arrivée garanti)
 * - Paquet malformé = abandonné : ni forward, ni persistance, ni statut
 * - Forward et persistance sont des effets indépendants, tentés tous les
 *   deux une fois l'enrichissement réussi, sans rollback croisé
 * - Le snapshot NodeStatus est remplacé en bloc en fin de passe réussie
 *
 * UTILITÉ DANS RAAM :
 * 🎯 Chaque rapport relayé porte les conditions locales du bord de route
 * 🎯 La trace de hops s'allonge d'exactement un par nœud traversé
 */

use std::net::SocketAddr;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tokio::net::UdpSocket;
use tracing::{info, warn};

use crate::classify::{classify, Thresholds};
use crate::codec;
use crate::health::RelayStats;
use crate::models::NodeStatus;
use crate::sensors::EnvironmentSensor;
use crate::state::SharedStatus;
use crate::uplink::BackendUploader;

pub struct RelayPipeline {
    node_id: String,
    next_hop: String,
    forward_sock: UdpSocket,
    sensor: Box<dyn EnvironmentSensor>,
    thresholds: Thresholds,
    uploader: Option<BackendUploader>,
    /// Politique figée au démarrage : false quand la sonde a échoué et que
    /// la config demande de supprimer les envois.
    upload_allowed: bool,
    status: SharedStatus,
    stats: RelayStats,
}

impl RelayPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        node_id: String,
        next_hop: String,
        forward_sock: UdpSocket,
        sensor: Box<dyn EnvironmentSensor>,
        thresholds: Thresholds,
        uploader: Option<BackendUploader>,
        upload_allowed: bool,
        status: SharedStatus,
        stats: RelayStats,
    ) -> Self {
        Self {
            node_id,
            next_hop,
            forward_sock,
            sensor,
            thresholds,
            uploader,
            upload_allowed,
            status,
            stats,
        }
    }

    /// Une passe complète sur un datagramme entrant. Ne retourne qu'une fois
    /// tous les effets de bord tentés ; aucune erreur n'est fatale.
    pub async fn process_datagram(&mut self, bytes: &[u8], from: SocketAddr) {
        self.stats.mark_packet_received();

        // Decoding
        let mut report = match codec::decode(bytes) {
            Ok(report) => report,
            Err(e) => {
                self.stats.mark_decode_failure();
                warn!("dropping datagram from {from}: {e}");
                return;
            }
        };

        // Enriching : capteurs + label + identité de hop
        let environment = self.sensor.sample();
        let status = classify(&environment, &self.thresholds);
        let now = OffsetDateTime::now_utc();
        report.rsu_environment = Some(environment);
        report.environment_status = Some(status);
        report.relay_timestamp = Some(now.format(&Rfc3339).unwrap_or_default());
        report.hop_trace.push(self.node_id.clone());

        // Forwarding : ré-encodage puis envoi best-effort vers le hop suivant
        let encoded = match codec::encode(&report) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("dropping report from {}: {e}", report.vehicle_id);
                return;
            }
        };
        match self.forward_sock.send_to(&encoded, &self.next_hop).await {
            Ok(_) => self.stats.mark_forwarded(),
            Err(e) => {
                self.stats.mark_forward_failure();
                warn!("forward to {} failed: {e}", self.next_hop);
            }
        }

        // Persisting : même octets que le forward, un seul essai
        if self.upload_allowed {
            if let Some(uploader) = &self.uploader {
                match uploader.submit(&encoded).await {
                    Ok(()) => self.stats.mark_upload_ok(),
                    Err(e) => {
                        self.stats.mark_upload_failure();
                        warn!("report upload failed: {e}");
                    }
                }
            }
        }

        // Snapshot remplacé en bloc avant de repasser Idle
        *self.status.lock() = Some(NodeStatus::from_report(&report, now));
        info!(
            vehicle = %report.vehicle_id,
            status = %status,
            hops = report.hop_trace.len(),
            "report relayed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::{SensorBaselines, SyntheticSensor};
    use crate::state::new_state;
    use std::time::Duration;

    async fn test_pipeline() -> (RelayPipeline, UdpSocket, SharedStatus, RelayStats) {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let next_hop = receiver.local_addr().unwrap().to_string();
        let forward_sock = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let status = new_state(None);
        let stats = RelayStats::new();
        let pipeline = RelayPipeline::new(
            "RSU_T1".into(),
            next_hop,
            forward_sock,
            Box::new(SyntheticSensor::new(SensorBaselines::default())),
            Thresholds::default(),
            None,
            false,
            status.clone(),
            stats.clone(),
        );
        (pipeline, receiver, status, stats)
    }

    fn incident(vehicle_id: &str) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "vehicle_id": vehicle_id,
            "issue": "flat tire",
            "latitude": 12.345678,
            "longitude": 77.123456,
            "hop_trace": [vehicle_id]
        }))
        .unwrap()
    }

    fn sender_addr() -> SocketAddr {
        "127.0.0.1:45000".parse().unwrap()
    }

    async fn recv_forwarded(receiver: &UdpSocket) -> Vec<u8> {
        let mut buf = [0u8; 4096];
        let (n, _) = tokio::time::timeout(Duration::from_secs(1), receiver.recv_from(&mut buf))
            .await
            .expect("no forwarded datagram within 1s")
            .unwrap();
        buf[..n].to_vec()
    }

    #[tokio::test]
    async fn test_malformed_datagram_has_no_side_effects() {
        let (mut pipeline, receiver, status, stats) = test_pipeline().await;

        pipeline.process_datagram(b"{definitely not json", sender_addr()).await;

        assert!(status.lock().is_none());
        let health = stats.snapshot();
        assert_eq!(health.decode_failures, 1);
        assert_eq!(health.forwarded, 0);
        let mut buf = [0u8; 64];
        assert!(receiver.try_recv_from(&mut buf).is_err());
    }

    #[tokio::test]
    async fn test_successful_pass_enriches_and_forwards() {
        let (mut pipeline, receiver, status, stats) = test_pipeline().await;

        pipeline.process_datagram(&incident("CAR_01"), sender_addr()).await;

        // le rapport ré-émis est lui-même re-décodable par le même codec
        let forwarded = codec::decode(&recv_forwarded(&receiver).await).unwrap();
        assert_eq!(forwarded.hop_trace, vec!["CAR_01", "RSU_T1"]);
        assert!(forwarded.rsu_environment.is_some());
        assert!(forwarded.environment_status.is_some());
        assert!(forwarded.relay_timestamp.is_some());

        let snapshot = status.lock().clone().expect("status snapshot set");
        assert_eq!(snapshot.vehicle_id, "CAR_01");
        assert_eq!(snapshot.issue, "flat tire");
        assert_eq!(stats.snapshot().forwarded, 1);
    }

    #[tokio::test]
    async fn test_hop_trace_grows_by_exactly_one_even_on_revisit() {
        let (mut pipeline, receiver, _status, _stats) = test_pipeline().await;

        // le rapport est déjà passé par ce nœud : le doublon est permis
        let payload = serde_json::to_vec(&serde_json::json!({
            "vehicle_id": "CAR_01",
            "issue": "flat tire",
            "latitude": 12.0,
            "longitude": 77.0,
            "hop_trace": ["CAR_01", "RSU_T1", "RSU_02"]
        }))
        .unwrap();
        pipeline.process_datagram(&payload, sender_addr()).await;

        let forwarded = codec::decode(&recv_forwarded(&receiver).await).unwrap();
        assert_eq!(
            forwarded.hop_trace,
            vec!["CAR_01", "RSU_T1", "RSU_02", "RSU_T1"]
        );
    }

    #[tokio::test]
    async fn test_reports_processed_in_arrival_order() {
        let (mut pipeline, receiver, status, _stats) = test_pipeline().await;

        pipeline.process_datagram(&incident("CAR_01"), sender_addr()).await;
        pipeline.process_datagram(&incident("CAR_02"), sender_addr()).await;

        let first = codec::decode(&recv_forwarded(&receiver).await).unwrap();
        let second = codec::decode(&recv_forwarded(&receiver).await).unwrap();
        assert_eq!(first.vehicle_id, "CAR_01");
        assert_eq!(second.vehicle_id, "CAR_02");
        assert_eq!(status.lock().clone().unwrap().vehicle_id, "CAR_02");
    }

    #[tokio::test]
    async fn test_submit_failure_does_not_undo_forwarding() {
        let stub = raam_devkit::BackendStub::spawn(200, 500).await.unwrap();
        let (mut pipeline, receiver, status, stats) = test_pipeline().await;
        let backend = crate::config::BackendConf {
            url: stub.url(),
            table: "incident_reports".into(),
            timeout_seconds: 2,
            upload_after_probe_failure: true,
        };
        pipeline.uploader =
            Some(BackendUploader::new(&backend, "secret".into()).unwrap());
        pipeline.upload_allowed = true;

        pipeline.process_datagram(&incident("CAR_01"), sender_addr()).await;

        // le forward et le snapshot survivent à l'échec de persistance
        let forwarded = codec::decode(&recv_forwarded(&receiver).await).unwrap();
        assert_eq!(forwarded.vehicle_id, "CAR_01");
        assert!(status.lock().is_some());
        let health = stats.snapshot();
        assert_eq!(health.forwarded, 1);
        assert_eq!(health.upload_failures, 1);
        assert_eq!(health.uploads_ok, 0);
    }

    #[tokio::test]
    async fn test_persisted_report_matches_forwarded_bytes() {
        let stub = raam_devkit::BackendStub::spawn(200, 201).await.unwrap();
        let (mut pipeline, receiver, _status, stats) = test_pipeline().await;
        let backend = crate::config::BackendConf {
            url: stub.url(),
            table: "incident_reports".into(),
            timeout_seconds: 2,
            upload_after_probe_failure: true,
        };
        pipeline.uploader =
            Some(BackendUploader::new(&backend, "secret".into()).unwrap());
        pipeline.upload_allowed = true;

        let payload = raam_devkit::ObuMessageBuilder::payload(
            &raam_devkit::ObuMessageBuilder::incident("CAR_07", "breakdown", 12.9, 77.6),
        );
        pipeline.process_datagram(&payload, sender_addr()).await;

        let forwarded = recv_forwarded(&receiver).await;
        let submitted = stub.submissions();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].body, forwarded);
        let json = stub.last_submission_json().unwrap();
        assert_eq!(json["hop_trace"], serde_json::json!(["CAR_07", "RSU_T1"]));
        assert_eq!(stats.snapshot().uploads_ok, 1);
    }

    #[tokio::test]
    async fn test_suppressed_uploads_still_forward() {
        let stub = raam_devkit::BackendStub::spawn(503, 201).await.unwrap();
        let (mut pipeline, receiver, _status, stats) = test_pipeline().await;
        let backend = crate::config::BackendConf {
            url: stub.url(),
            table: "incident_reports".into(),
            timeout_seconds: 2,
            upload_after_probe_failure: false,
        };
        pipeline.uploader =
            Some(BackendUploader::new(&backend, "secret".into()).unwrap());
        // sonde ratée + politique stricte : plus aucun envoi
        pipeline.upload_allowed = false;

        pipeline.process_datagram(&incident("CAR_01"), sender_addr()).await;

        assert!(!recv_forwarded(&receiver).await.is_empty());
        assert!(stub.submissions().is_empty());
        assert_eq!(stats.snapshot().uploads_ok, 0);
        assert_eq!(stats.snapshot().upload_failures, 0);
    }

    #[tokio::test]
    async fn test_enrichment_overflow_drops_the_pass() {
        let (mut pipeline, receiver, status, _stats) = test_pipeline().await;

        // rentre sous le plafond à l'arrivée, le dépasse une fois enrichi
        let payload = serde_json::to_vec(&serde_json::json!({
            "vehicle_id": "CAR_01",
            "issue": "x".repeat(1900),
            "latitude": 12.0,
            "longitude": 77.0
        }))
        .unwrap();
        assert!(payload.len() <= codec::MAX_DATAGRAM_BYTES);

        pipeline.process_datagram(&payload, sender_addr()).await;

        assert!(status.lock().is_none());
        let mut buf = [0u8; 64];
        assert!(receiver.try_recv_from(&mut buf).is_err());
    }
}
