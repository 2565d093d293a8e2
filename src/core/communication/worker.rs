use crate::core::communication::{
    queue::InputProducer,
    registry::{ClientId, ClientRegistry},
    transport::ByteSource,
};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Why a reader worker stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerExit {
    EndOfStream,
    ReadError(String),
    Cancelled,
    QueueClosed,
}

/// Moves bytes from one transport into the shared input queue until the
/// transport fails, closes, or the worker is cancelled. On the way out it
/// removes its client from the registry and closes the sink.
pub struct ReaderWorker<S> {
    id: ClientId,
    source: S,
    input: InputProducer,
    registry: ClientRegistry,
    cancel: CancellationToken,
    poll_interval: Duration,
}

impl<S: ByteSource> ReaderWorker<S> {
    pub fn new(
        id: ClientId,
        source: S,
        input: InputProducer,
        registry: ClientRegistry,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id,
            source,
            input,
            registry,
            cancel,
            poll_interval: Duration::from_millis(10),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn spawn(self) -> JoinHandle<WorkerExit> {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) -> WorkerExit {
        debug!("Reader worker for client {} started", self.id);
        let cancel = self.cancel.clone();
        let exit = tokio::select! {
            biased;
            _ = cancel.cancelled() => WorkerExit::Cancelled,
            exit = self.pump() => exit,
        };

        match &exit {
            WorkerExit::ReadError(e) => warn!("Client {} read failed: {}", self.id, e),
            other => debug!("Client {} reader stopped: {:?}", self.id, other),
        }

        if let Some(sink) = self.registry.unregister(self.id).await {
            if let Err(e) = sink.close().await {
                warn!("Failed to close client {}: {}", self.id, e);
            }
            info!("Client {} released", self.id);
        }

        exit
    }

    async fn pump(&mut self) -> WorkerExit {
        loop {
            if !self.source.is_readable() {
                tokio::time::sleep(self.poll_interval).await;
                continue;
            }

            match self.source.read_byte().await {
                Ok(Some(byte)) => {
                    trace!("Client {} rx {}", self.id, hex::encode([byte]));
                    if self.input.push(byte).await.is_err() {
                        return WorkerExit::QueueClosed;
                    }
                }
                Ok(None) => return WorkerExit::EndOfStream,
                Err(e) => return WorkerExit::ReadError(e.to_string()),
            }
        }
    }
}
