use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// État de santé du nœud relais, exposé sur /rsu/health.
#[derive(Debug, Serialize, Deserialize)]
pub struct RsuHealth {
    pub uptime_seconds: u64,
    pub packets_received: u64,
    pub decode_failures: u64,
    pub forwarded: u64,
    pub forward_failures: u64,
    pub uploads_ok: u64,
    pub upload_failures: u64,
    /// "ok" | "degraded" | "disabled"
    pub backend_status: String,
}

/// Compteurs du pipeline, incrémentés par la boucle de relais et lus par
/// l'exporteur HTTP. Atomiques : un seul écrivain mais lecteurs concurrents.
#[derive(Clone)]
pub struct RelayStats {
    inner: Arc<StatsInner>,
}

struct StatsInner {
    start_time: Instant,
    packets_received: AtomicU64,
    decode_failures: AtomicU64,
    forwarded: AtomicU64,
    forward_failures: AtomicU64,
    uploads_ok: AtomicU64,
    upload_failures: AtomicU64,
    backend_status: parking_lot::Mutex<String>,
}

impl RelayStats {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(StatsInner {
                start_time: Instant::now(),
                packets_received: AtomicU64::new(0),
                decode_failures: AtomicU64::new(0),
                forwarded: AtomicU64::new(0),
                forward_failures: AtomicU64::new(0),
                uploads_ok: AtomicU64::new(0),
                upload_failures: AtomicU64::new(0),
                backend_status: parking_lot::Mutex::new("disabled".to_string()),
            }),
        }
    }

    pub fn mark_packet_received(&self) {
        self.inner.packets_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn mark_decode_failure(&self) {
        self.inner.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn mark_forwarded(&self) {
        self.inner.forwarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn mark_forward_failure(&self) {
        self.inner.forward_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn mark_upload_ok(&self) {
        self.inner.uploads_ok.fetch_add(1, Ordering::Relaxed);
    }

    pub fn mark_upload_failure(&self) {
        self.inner.upload_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_backend_status(&self, status: &str) {
        *self.inner.backend_status.lock() = status.to_string();
    }

    pub fn snapshot(&self) -> RsuHealth {
        RsuHealth {
            uptime_seconds: self.inner.start_time.elapsed().as_secs(),
            packets_received: self.inner.packets_received.load(Ordering::Relaxed),
            decode_failures: self.inner.decode_failures.load(Ordering::Relaxed),
            forwarded: self.inner.forwarded.load(Ordering::Relaxed),
            forward_failures: self.inner.forward_failures.load(Ordering::Relaxed),
            uploads_ok: self.inner.uploads_ok.load(Ordering::Relaxed),
            upload_failures: self.inner.upload_failures.load(Ordering::Relaxed),
            backend_status: self.inner.backend_status.lock().clone(),
        }
    }
}

impl Default for RelayStats {
    fn default() -> Self {
        Self::new()
    }
}
