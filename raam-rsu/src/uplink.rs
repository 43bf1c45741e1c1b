/**
 * PERSISTENCE UPLOADER - Envoi des rapports vers le backend REST
 *
 * RÔLE :
 * Pousse chaque rapport encodé vers la table d'incidents du backend
 * (conventions Supabase REST) et sonde la connectivité au démarrage.
 *
 * FONCTIONNEMENT :
 * - probe() : GET one-shot au boot, 200 attendu. Un échec n'est qu'un
 *   avertissement, le nœud continue en mode best-effort
 * - submit() : POST du rapport brut, 201 attendu, Prefer: return=minimal.
 *   Un seul essai, pas de file d'attente : un envoi raté est perdu côté
 *   backend et le système aval doit le tolérer
 * - Timeout explicite et fini sur chaque requête : le nœud reste bloqué le
 *   temps de l'échange (traitement strictement séquentiel) mais jamais
 *   indéfiniment
 *
 * SÉCURITÉ :
 * - Clé d'API via env RAAM_SUPABASE_KEY, jamais dans le yaml
 * - Headers apikey + Authorization: Bearer sur chaque requête
 */

use reqwest::StatusCode;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::BackendConf;

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("backend request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("backend answered {status}: {body}")]
    UnexpectedStatus { status: StatusCode, body: String },
}

#[derive(Clone)]
pub struct BackendUploader {
    client: reqwest::Client,
    rest_url: String,
    api_key: String,
}

impl BackendUploader {
    pub fn new(conf: &BackendConf, api_key: String) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(conf.timeout_seconds))
            .build()?;
        let rest_url = format!("{}/rest/v1/{}", conf.url.trim_end_matches('/'), conf.table);
        Ok(Self { client, rest_url, api_key })
    }

    /// Sonde de connectivité one-shot au démarrage. Retourne true si le
    /// backend répond 200 ; tout le reste n'est qu'un avertissement.
    pub async fn probe(&self) -> bool {
        let resp = self
            .client
            .get(&self.rest_url)
            .query(&[("select", "vehicle_id"), ("limit", "1")])
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .send()
            .await;

        match resp {
            Ok(r) if r.status() == StatusCode::OK => {
                info!("backend reachable at {}", self.rest_url);
                true
            }
            Ok(r) => {
                warn!("backend probe answered {} (expected 200)", r.status());
                false
            }
            Err(e) => {
                warn!("backend probe failed: {e}");
                false
            }
        }
    }

    /// Envoie un rapport encodé. 201 = persisté, tout autre résultat est un
    /// SubmitError avec le corps de réponse quand il existe.
    pub async fn submit(&self, payload: &[u8]) -> Result<(), SubmitError> {
        let resp = self
            .client
            .post(&self.rest_url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Content-Type", "application/json")
            .header("Prefer", "return=minimal")
            .body(payload.to_vec())
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::CREATED {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        Err(SubmitError::UnexpectedStatus { status, body })
    }
}
