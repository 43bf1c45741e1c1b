/*!
Stub du backend de persistance pour développement sans Supabase

Ouvre un vrai socket TCP local, répond en HTTP/1.1 avec des statuts
configurables, et enregistre toutes les requêtes reçues (méthode, chemin,
headers, corps) pour les assertions de tests.
*/

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[derive(Debug, Clone)]
pub struct ReceivedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl ReceivedRequest {
    /// Valeur d'un header (nom insensible à la casse).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Parse le corps en JSON (pour assertions sur le rapport soumis).
    pub fn body_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Faux backend REST : GET (sonde) et POST (soumission) répondent avec les
/// statuts configurés au spawn. Compatible avec le vrai client reqwest.
pub struct BackendStub {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<ReceivedRequest>>>,
}

impl BackendStub {
    /// Démarre le stub sur un port éphémère local.
    /// `probe_status` répond aux GET, `submit_status` aux POST.
    pub async fn spawn(probe_status: u16, submit_status: u16) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let requests: Arc<Mutex<Vec<ReceivedRequest>>> = Arc::new(Mutex::new(Vec::new()));

        let recorded = requests.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let recorded = recorded.clone();
                tokio::spawn(async move {
                    if let Err(e) =
                        handle_connection(stream, recorded, probe_status, submit_status).await
                    {
                        log::warn!("[STUB] connection error: {e}");
                    }
                });
            }
        });

        log::info!("[STUB] backend stub listening on {addr}");
        Ok(Self { addr, requests })
    }

    /// URL racine à donner à la config backend du nœud sous test.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Toutes les requêtes reçues (pour assertions de tests).
    pub fn requests(&self) -> Vec<ReceivedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Uniquement les soumissions (POST).
    pub fn submissions(&self) -> Vec<ReceivedRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == "POST")
            .cloned()
            .collect()
    }

    /// Dernier rapport soumis, parsé en JSON.
    pub fn last_submission_json(&self) -> Option<serde_json::Value> {
        self.submissions().last().and_then(|r| r.body_json().ok())
    }

    /// Reset toutes les requêtes enregistrées.
    pub fn clear(&self) {
        self.requests.lock().unwrap().clear();
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    recorded: Arc<Mutex<Vec<ReceivedRequest>>>,
    probe_status: u16,
    submit_status: u16,
) -> Result<()> {
    let mut buf: Vec<u8> = Vec::with_capacity(4096);
    let mut chunk = [0u8; 1024];

    // lit jusqu'à la fin de l'en-tête
    let header_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            anyhow::bail!("connection closed before full header");
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = find_subsequence(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
        if buf.len() > 64 * 1024 {
            anyhow::bail!("header too large");
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.lines();
    let request_line = lines.next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();

    let headers: Vec<(String, String)> = lines
        .filter_map(|line| {
            let (name, value) = line.split_once(':')?;
            Some((name.trim().to_string(), value.trim().to_string()))
        })
        .collect();

    let content_length: usize = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse().ok())
        .unwrap_or(0);

    // lit le reste du corps s'il manque des octets
    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            anyhow::bail!("connection closed before full body");
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body = buf[header_end..header_end + content_length].to_vec();

    let status = if method == "POST" { submit_status } else { probe_status };
    log::info!("[STUB] {} {} -> {}", method, path, status);
    recorded.lock().unwrap().push(ReceivedRequest { method, path, headers, body });

    // les sondes GET reçoivent un tableau JSON vide, le reste un corps vide
    let body = if status == 200 { "[]" } else { "" };
    let response = format!(
        "HTTP/1.1 {} {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
        status,
        reason_phrase(status),
        body.len(),
        body
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Error",
    }
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
