/**
 * STATUS EXPORTER - Vue HTTP en lecture seule du nœud relais
 *
 * RÔLE :
 * Expose le dernier rapport traité et les compteurs du pipeline sur un port
 * local. Interface de supervision : dashboard, curl, scripts.
 *
 * FONCTIONNEMENT :
 * - Serveur Axum sur status_port, routes /health, /status, /rsu/health
 * - Lecture pure du snapshot partagé : ne bloque jamais le pipeline,
 *   ne mute jamais l'état
 * - Coordonnées rendues en texte à 6 décimales, champs null avant le
 *   premier rapport (sentinelle "pas encore de donnée")
 * - Port local non authentifié : le rendu HTML/auto-refresh est l'affaire
 *   du client, pas du nœud
 */

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use time::format_description::well_known::Rfc3339;

use crate::health::{RelayStats, RsuHealth};
use crate::models::NodeStatus;
use crate::state::SharedStatus;

#[derive(Clone)]
pub struct AppState {
    pub node_id: String,
    pub status: SharedStatus,
    pub stats: RelayStats,
}

#[derive(Serialize)]
struct StatusView {
    node_id: String,
    vehicle_id: Option<String>,
    issue: Option<String>,
    latitude: Option<String>,  // texte à 6 décimales pour l'API
    longitude: Option<String>,
    environment_status: Option<String>,
    received_at: Option<String>, // format RFC3339
}

fn to_view(node_id: &str, snapshot: Option<&NodeStatus>) -> StatusView {
    match snapshot {
        Some(s) => StatusView {
            node_id: node_id.to_string(),
            vehicle_id: Some(s.vehicle_id.clone()),
            issue: Some(s.issue.clone()),
            latitude: Some(format!("{:.6}", s.latitude)),
            longitude: Some(format!("{:.6}", s.longitude)),
            environment_status: Some(s.environment_status.as_str().to_string()),
            received_at: s.received_at.format(&Rfc3339).ok(),
        },
        None => StatusView {
            node_id: node_id.to_string(),
            vehicle_id: None,
            issue: None,
            latitude: None,
            longitude: None,
            environment_status: None,
            received_at: None,
        },
    }
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/status", get(get_status))
        .route("/rsu/health", get(get_rsu_health))
        .with_state(app_state)
}

// GET /status (dernier rapport traité, ou sentinelle)
async fn get_status(State(app): State<AppState>) -> Json<StatusView> {
    let snapshot = app.status.lock().clone();
    Json(to_view(&app.node_id, snapshot.as_ref()))
}

// GET /rsu/health (compteurs pipeline + état backend)
async fn get_rsu_health(State(app): State<AppState>) -> Json<RsuHealth> {
    Json(app.stats.snapshot())
}
