use crate::domain::error::ReplMuxResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Transport type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransportKind {
    Console,
    Serial,
    Tcp,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportKind::Console => write!(f, "console"),
            TransportKind::Serial => write!(f, "serial"),
            TransportKind::Tcp => write!(f, "tcp"),
        }
    }
}

/// Input half of a transport, drained by one reader worker.
#[async_trait]
pub trait ByteSource: Send + 'static {
    /// Wait for the next byte. `Ok(None)` means the peer closed the stream.
    async fn read_byte(&mut self) -> std::io::Result<Option<u8>>;

    /// Polling predicate for channels that cannot block on a read.
    fn is_readable(&mut self) -> bool {
        true
    }
}

/// Output half of a transport, held by the client registry.
#[async_trait]
pub trait OutputSink: Send + Sync {
    /// Deliver `bytes`, waiting while the transport cannot take more.
    async fn write(&self, bytes: &[u8]) -> ReplMuxResult<()>;

    /// Release the underlying resource. Called once, after the client has
    /// left the registry.
    async fn close(&self) -> ReplMuxResult<()> {
        Ok(())
    }
}

/// A concrete channel that can join a session.
pub trait Transport: Send + 'static {
    type Source: ByteSource;
    type Sink: OutputSink + 'static;

    fn kind(&self) -> TransportKind;

    /// Human readable origin, e.g. a port path or peer address.
    fn label(&self) -> String;

    fn into_split(self) -> (Self::Source, Self::Sink);
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory transports for exercising the hub without real I/O.

    use super::*;
    use crate::domain::error::ReplMuxError;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::sync::mpsc;

    /// Records every write; can be told to fail.
    #[derive(Default)]
    pub struct RecordingSink {
        pub writes: Mutex<Vec<Vec<u8>>>,
        pub fail: AtomicBool,
        pub closed: AtomicUsize,
    }

    impl RecordingSink {
        pub fn failing() -> Self {
            let sink = Self::default();
            sink.fail.store(true, Ordering::SeqCst);
            sink
        }

        pub fn received(&self) -> Vec<u8> {
            self.writes.lock().unwrap().concat()
        }

        pub fn write_count(&self) -> usize {
            self.writes.lock().unwrap().len()
        }

        pub fn close_count(&self) -> usize {
            self.closed.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl OutputSink for RecordingSink {
        async fn write(&self, bytes: &[u8]) -> ReplMuxResult<()> {
            self.writes.lock().unwrap().push(bytes.to_vec());
            if self.fail.load(Ordering::SeqCst) {
                return Err(ReplMuxError::Transport {
                    message: "sink rejected write".to_string(),
                });
            }
            Ok(())
        }

        async fn close(&self) -> ReplMuxResult<()> {
            self.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Source fed from a channel: `Some(Ok(b))` yields a byte, `Some(Err)` a
    /// read error, dropping the sender ends the stream.
    pub struct ChannelSource {
        rx: mpsc::UnboundedReceiver<std::io::Result<u8>>,
    }

    #[async_trait]
    impl ByteSource for ChannelSource {
        async fn read_byte(&mut self) -> std::io::Result<Option<u8>> {
            match self.rx.recv().await {
                Some(Ok(byte)) => Ok(Some(byte)),
                Some(Err(e)) => Err(e),
                None => Ok(None),
            }
        }
    }

    pub struct MemoryTransport {
        source: ChannelSource,
        sink: Arc<RecordingSink>,
    }

    impl MemoryTransport {
        pub fn new() -> (Self, mpsc::UnboundedSender<std::io::Result<u8>>, Arc<RecordingSink>) {
            let (tx, rx) = mpsc::unbounded_channel();
            let sink = Arc::new(RecordingSink::default());
            let transport = Self {
                source: ChannelSource { rx },
                sink: Arc::clone(&sink),
            };
            (transport, tx, sink)
        }
    }

    /// Lets a test keep its own handle on the sink after the split.
    pub struct SharedSink(pub Arc<RecordingSink>);

    #[async_trait]
    impl OutputSink for SharedSink {
        async fn write(&self, bytes: &[u8]) -> ReplMuxResult<()> {
            self.0.write(bytes).await
        }

        async fn close(&self) -> ReplMuxResult<()> {
            self.0.close().await
        }
    }

    impl Transport for MemoryTransport {
        type Source = ChannelSource;
        type Sink = SharedSink;

        fn kind(&self) -> TransportKind {
            TransportKind::Console
        }

        fn label(&self) -> String {
            "memory".to_string()
        }

        fn into_split(self) -> (Self::Source, Self::Sink) {
            (self.source, SharedSink(self.sink))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_kind_display() {
        assert_eq!(TransportKind::Console.to_string(), "console");
        assert_eq!(TransportKind::Serial.to_string(), "serial");
        assert_eq!(TransportKind::Tcp.to_string(), "tcp");
    }
}
