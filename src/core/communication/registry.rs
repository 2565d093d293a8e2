use crate::core::communication::transport::{OutputSink, TransportKind};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::Mutex;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

/// Opaque handle identifying one registered transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(Uuid);

impl ClientId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// A registered output sink plus its identity.
#[derive(Clone)]
pub struct TransportClient {
    pub id: ClientId,
    pub kind: TransportKind,
    pub label: String,
    pub sink: Arc<dyn OutputSink>,
    pub connected_at: SystemTime,
}

impl TransportClient {
    pub fn new(kind: TransportKind, label: impl Into<String>, sink: Arc<dyn OutputSink>) -> Self {
        Self {
            id: ClientId::new(),
            kind,
            label: label.into(),
            sink,
            connected_at: SystemTime::now(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientSummary {
    pub id: ClientId,
    pub kind: TransportKind,
    pub label: String,
    pub connected_at: SystemTime,
}

/// Outcome of one fan-out pass.
#[derive(Debug, Clone, Default)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: Vec<ClientId>,
}

/// Set of active output sinks. Membership changes and broadcasts are
/// serialized through one lock; a broadcast holds it for the whole pass,
/// so a slow sink delays every other sink.
#[derive(Clone, Default)]
pub struct ClientRegistry {
    clients: Arc<Mutex<HashMap<ClientId, TransportClient>>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a client. Returns `false` if the same handle is already registered.
    pub async fn register(&self, client: TransportClient) -> bool {
        let mut clients = self.clients.lock().await;
        if clients.contains_key(&client.id) {
            debug!("Client {} already registered", client.id);
            return false;
        }

        info!("Registered {} client {} ({})", client.kind, client.id, client.label);
        clients.insert(client.id, client);
        true
    }

    /// Remove a client, handing back its sink. Only the first call for a
    /// given handle gets `Some`.
    pub async fn unregister(&self, id: ClientId) -> Option<Arc<dyn OutputSink>> {
        let mut clients = self.clients.lock().await;
        let removed = clients.remove(&id)?;
        info!("Unregistered {} client {} ({})", removed.kind, id, removed.label);
        Some(removed.sink)
    }

    /// Write `bytes` to every registered client. A failing client is reported
    /// and skipped; it stays registered until its reader worker removes it.
    pub async fn broadcast(&self, bytes: &[u8]) -> BroadcastReport {
        let clients = self.clients.lock().await;
        let mut report = BroadcastReport::default();

        for client in clients.values() {
            match client.sink.write(bytes).await {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!("Write to {} client {} failed: {}", client.kind, client.id, e);
                    report.failed.push(client.id);
                }
            }
        }

        trace!(
            "Broadcast {} to {} clients ({} failed)",
            hex::encode(bytes),
            report.delivered,
            report.failed.len()
        );
        report
    }

    pub async fn contains(&self, id: ClientId) -> bool {
        self.clients.lock().await.contains_key(&id)
    }

    pub async fn len(&self) -> usize {
        self.clients.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.clients.lock().await.is_empty()
    }

    pub async fn clients(&self) -> Vec<ClientSummary> {
        let clients = self.clients.lock().await;
        clients
            .values()
            .map(|client| ClientSummary {
                id: client.id,
                kind: client.kind,
                label: client.label.clone(),
                connected_at: client.connected_at,
            })
            .collect()
    }
}
