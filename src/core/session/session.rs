use crate::core::communication::{
    ClientId, ClientRegistry, ClientSummary, InputProducer, InputQueue, OutputSink, ReaderWorker,
    Transport, TransportClient, DEFAULT_QUEUE_CAPACITY,
};
use crate::core::session::repl::Console;
use crate::domain::config::GlobalConfig;
use crate::domain::error::{ReplMuxError, ReplMuxResult};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Input queue capacity
    pub queue_capacity: usize,
    /// Sleep between readability polls
    pub poll_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            poll_interval: Duration::from_millis(10),
        }
    }
}

impl From<&GlobalConfig> for SessionConfig {
    fn from(global: &GlobalConfig) -> Self {
        Self {
            queue_capacity: global.queue_capacity,
            poll_interval: Duration::from_millis(global.poll_interval_ms),
        }
    }
}

/// Shared context of one interpreter session: who is listening and where
/// their input goes. Cloning is cheap; every clone refers to the same
/// registry, queue and workers.
#[derive(Clone)]
pub struct Session {
    registry: ClientRegistry,
    input: InputProducer,
    cancel: CancellationToken,
    workers: TaskTracker,
    worker_tokens: Arc<Mutex<HashMap<ClientId, CancellationToken>>>,
    poll_interval: Duration,
}

impl Session {
    /// Create the session and the console its interpreter will drive.
    /// The interrupt character starts disarmed; the interpreter arms it.
    pub fn new(config: &SessionConfig) -> (Self, Console) {
        let (input, consumer) = InputQueue::new(config.queue_capacity);
        let registry = ClientRegistry::new();

        let session = Self {
            registry: registry.clone(),
            input,
            cancel: CancellationToken::new(),
            workers: TaskTracker::new(),
            worker_tokens: Arc::new(Mutex::new(HashMap::new())),
            poll_interval: config.poll_interval,
        };
        let console = Console::new(consumer, registry);

        info!("Session created (queue capacity {})", config.queue_capacity);
        (session, console)
    }

    /// Register a transport's output and start reading its input.
    pub async fn attach<T: Transport>(&self, transport: T) -> ClientId {
        let kind = transport.kind();
        let label = transport.label();
        let (source, sink) = transport.into_split();
        self.start_client(TransportClient::new(kind, label, Arc::new(sink)), source)
            .await
    }

    /// Like [`attach`](Self::attach), but first sends `greeting` to the new
    /// transport alone. A transport that cannot take the greeting is closed
    /// and never joins.
    pub async fn attach_with_greeting<T: Transport>(
        &self,
        transport: T,
        greeting: &[u8],
    ) -> ReplMuxResult<ClientId> {
        let kind = transport.kind();
        let label = transport.label();
        let (source, sink) = transport.into_split();

        if !greeting.is_empty() {
            if let Err(e) = sink.write(greeting).await {
                warn!("Greeting to {} client {} failed: {}", kind, label, e);
                if let Err(close_err) = sink.close().await {
                    debug!("Close after failed greeting: {}", close_err);
                }
                return Err(ReplMuxError::Transport {
                    message: format!("greeting to {} failed: {}", label, e),
                });
            }
        }

        Ok(self
            .start_client(TransportClient::new(kind, label, Arc::new(sink)), source)
            .await)
    }

    async fn start_client<S>(&self, client: TransportClient, source: S) -> ClientId
    where
        S: crate::core::communication::ByteSource,
    {
        let id = client.id;
        let cancel = self.cancel.child_token();
        self.worker_tokens.lock().await.insert(id, cancel.clone());
        self.registry.register(client).await;

        let worker = ReaderWorker::new(id, source, self.input.clone(), self.registry.clone(), cancel)
            .with_poll_interval(self.poll_interval);
        let worker_tokens = Arc::clone(&self.worker_tokens);
        self.workers.spawn(async move {
            let exit = worker.run().await;
            worker_tokens.lock().await.remove(&id);
            exit
        });

        id
    }

    /// Remove a client, stop its reader worker and release its transport.
    pub async fn detach(&self, id: ClientId) -> bool {
        let released = self.registry.unregister(id).await;
        if let Some(cancel) = self.worker_tokens.lock().await.remove(&id) {
            cancel.cancel();
        }

        match released {
            Some(sink) => {
                close_sink(id, sink).await;
                true
            }
            None => false,
        }
    }

    pub fn registry(&self) -> &ClientRegistry {
        &self.registry
    }

    pub async fn clients(&self) -> Vec<ClientSummary> {
        self.registry.clients().await
    }

    /// Token for components that should stop with the session, such as a listener.
    pub fn child_token(&self) -> CancellationToken {
        self.cancel.child_token()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancel every reader worker and wait for them to release their clients.
    pub async fn shutdown(&self) {
        info!("Session shutting down");
        self.cancel.cancel();
        self.workers.close();
        self.workers.wait().await;
        info!("Session stopped");
    }
}

async fn close_sink(id: ClientId, sink: Arc<dyn OutputSink>) {
    if let Err(e) = sink.close().await {
        warn!("Failed to close client {}: {}", id, e);
    }
}
