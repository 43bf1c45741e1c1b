/**
 * RAAM RSU - Point d'entrée du nœud relais routier
 *
 * RÔLE : Orchestration de tous les modules : config, codec, capteurs,
 * pipeline, persistance, vue statut. Bootstrap complet avec dégradation
 * non fatale des sous-systèmes optionnels (backend absent ou injoignable).
 *
 * ARCHITECTURE : une tâche unique possède le socket UDP et déroule le
 * pipeline séquentiellement (un rapport traité entièrement avant le
 * suivant) ; l'exporteur de statut tourne à côté en lecture seule.
 */

mod classify;
mod codec;
mod config;
mod health;
mod http;
mod models;
mod pipeline;
mod sensors;
mod state;
mod uplink;

use anyhow::Context;
use std::net::SocketAddr;
use tokio::net::{TcpListener, UdpSocket};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::health::RelayStats;
use crate::pipeline::RelayPipeline;
use crate::sensors::SyntheticSensor;
use crate::state::SharedStatus;
use crate::uplink::BackendUploader;

/// Tampon de réception strictement plus grand que le plafond codec : un
/// datagramme surdimensionné arrive entier et est rejeté, jamais tronqué.
const RECV_BUFFER_BYTES: usize = 4096;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Charger les variables d'environnement depuis .env (si présent)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("raam_rsu=info")),
        )
        .init();

    let cfg = config::load_config().await;
    info!("node {} relaying to {}", cfg.node_id, cfg.next_hop.addr());

    let status: SharedStatus = state::new_state(None);
    let stats = RelayStats::new();

    // Uploader + sonde de connectivité one-shot. Tout échec ici n'est qu'un
    // avertissement : le nœud relaie quand même.
    let mut upload_allowed = false;
    let uploader = match &cfg.backend {
        Some(backend) => match std::env::var("RAAM_SUPABASE_KEY") {
            Ok(key) if !key.is_empty() => {
                let uploader =
                    BackendUploader::new(backend, key).context("backend client init failed")?;
                upload_allowed = true;
                if uploader.probe().await {
                    stats.set_backend_status("ok");
                } else {
                    stats.set_backend_status("degraded");
                    if !backend.upload_after_probe_failure {
                        upload_allowed = false;
                        warn!("probe failed, submissions suppressed until restart");
                    }
                }
                Some(uploader)
            }
            _ => {
                warn!("RAAM_SUPABASE_KEY not set - persistence disabled");
                None
            }
        },
        None => {
            info!("no backend configured - persistence disabled");
            None
        }
    };

    // Exporteur de statut (tâche indépendante, lecture seule du snapshot)
    let app = http::build_router(http::AppState {
        node_id: cfg.node_id.clone(),
        status: status.clone(),
        stats: stats.clone(),
    });
    let status_addr = SocketAddr::from(([0, 0, 0, 0], cfg.status_port));
    let listener = TcpListener::bind(status_addr)
        .await
        .with_context(|| format!("failed to bind status port {status_addr}"))?;
    info!("status view on http://{status_addr}");
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("status server stopped: {e}");
        }
    });

    // Lien datagramme + pipeline
    let listen_sock = UdpSocket::bind(("0.0.0.0", cfg.listen_port))
        .await
        .with_context(|| format!("failed to bind udp port {}", cfg.listen_port))?;
    let forward_sock = UdpSocket::bind(("0.0.0.0", 0))
        .await
        .context("failed to bind forward socket")?;
    let mut pipeline = RelayPipeline::new(
        cfg.node_id.clone(),
        cfg.next_hop.addr(),
        forward_sock,
        Box::new(SyntheticSensor::new(cfg.sensors)),
        cfg.thresholds,
        uploader,
        upload_allowed,
        status,
        stats,
    );

    info!("listening for incident reports on udp {}", cfg.listen_port);
    let mut buf = [0u8; RECV_BUFFER_BYTES];
    loop {
        match listen_sock.recv_from(&mut buf).await {
            // séquentiel : la passe se termine avant la lecture suivante
            Ok((n, from)) => pipeline.process_datagram(&buf[..n], from).await,
            Err(e) => warn!("udp receive error: {e}"),
        }
    }
}
