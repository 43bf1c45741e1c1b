/**
 * OBU SIMULATOR - Émetteur de rapports d'incident pour bancs de test
 *
 * RÔLE :
 * Joue le rôle d'une unité embarquée (On-Board Unit) : construit un rapport
 * d'incident JSON et l'envoie en UDP vers le premier nœud RSU.
 *
 * FONCTIONNEMENT :
 * - Tout se configure par variables d'environnement (identité, panne, GPS,
 *   cible, cadence) ; valeurs par défaut alignées sur le banc local
 * - RAAM_OBU_INTERVAL_SECS absent ou à 0 : un seul envoi puis sortie
 * - Le rapport part avec hop_trace = [vehicle_id], premier maillon de la
 *   trace que chaque RSU allongera
 *
 * UTILITÉ DANS RAAM :
 * 🎯 Démo et tests manuels du relais sans véhicule réel
 */

use std::env;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tokio::net::UdpSocket;
use tokio::time::{sleep, Duration};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn build_report(vehicle_id: &str, issue: &str, latitude: f64, longitude: f64) -> serde_json::Value {
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();
    serde_json::json!({
        "vehicle_id": vehicle_id,
        "issue": issue,
        "raw_description": format!("{issue} reported by {vehicle_id}"),
        "latitude": latitude,
        "longitude": longitude,
        "timestamp": timestamp,
        "hop_trace": [vehicle_id],
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "raam_obu_sim=info".into()),
        )
        .init();

    // Identité et position du véhicule simulé
    let vehicle_id = env_or("RAAM_OBU_VEHICLE_ID", "CAR_01");
    let issue = env_or("RAAM_OBU_ISSUE", "flat tire");
    let latitude: f64 = env_or("RAAM_OBU_LATITUDE", "12.345678").parse()?;
    let longitude: f64 = env_or("RAAM_OBU_LONGITUDE", "77.123456").parse()?;
    let target = env_or("RAAM_OBU_TARGET", "127.0.0.1:5005");
    let interval_secs: u64 = env_or("RAAM_OBU_INTERVAL_SECS", "0").parse()?;

    let sock = UdpSocket::bind("0.0.0.0:0").await?;
    info!(%vehicle_id, %target, "OBU simulator ready");

    loop {
        let report = build_report(&vehicle_id, &issue, latitude, longitude);
        let payload = serde_json::to_vec(&report)?;
        sock.send_to(&payload, &target).await?;
        info!(bytes = payload.len(), %issue, "incident report sent");

        if interval_secs == 0 {
            break;
        }
        sleep(Duration::from_secs(interval_secs)).await;
    }

    Ok(())
}
