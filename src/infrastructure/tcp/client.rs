use crate::core::communication::{ByteSource, OutputSink, Transport, TransportKind};
use crate::domain::error::{ReplMuxError, ReplMuxResult};
use async_trait::async_trait;
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// An accepted TCP connection, treated as a raw byte pipe.
pub struct TcpTransport {
    stream: TcpStream,
    peer: SocketAddr,
}

impl TcpTransport {
    pub fn new(stream: TcpStream, peer: SocketAddr, nodelay: bool) -> Self {
        if nodelay {
            if let Err(e) = stream.set_nodelay(true) {
                warn!("Failed to set TCP_NODELAY for {}: {}", peer, e);
            }
        }
        Self { stream, peer }
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

impl Transport for TcpTransport {
    type Source = TcpSource;
    type Sink = TcpSink;

    fn kind(&self) -> TransportKind {
        TransportKind::Tcp
    }

    fn label(&self) -> String {
        self.peer.to_string()
    }

    fn into_split(self) -> (TcpSource, TcpSink) {
        let (read_half, write_half) = self.stream.into_split();
        let source = TcpSource {
            reader: BufReader::new(read_half),
        };
        let sink = TcpSink {
            peer: self.peer,
            writer: Mutex::new(write_half),
        };
        (source, sink)
    }
}

pub struct TcpSource {
    reader: BufReader<OwnedReadHalf>,
}

#[async_trait]
impl ByteSource for TcpSource {
    async fn read_byte(&mut self) -> std::io::Result<Option<u8>> {
        match self.reader.read_u8().await {
            Ok(byte) => Ok(Some(byte)),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(e),
        }
    }
}

pub struct TcpSink {
    peer: SocketAddr,
    writer: Mutex<OwnedWriteHalf>,
}

#[async_trait]
impl OutputSink for TcpSink {
    async fn write(&self, bytes: &[u8]) -> ReplMuxResult<()> {
        let mut writer = self.writer.lock().await;
        writer.write_all(bytes).await.map_err(|e| ReplMuxError::Transport {
            message: format!("Failed to write to {}: {}", self.peer, e),
        })?;
        writer.flush().await?;
        debug!("Sent {} bytes to {}", bytes.len(), self.peer);
        Ok(())
    }

    async fn close(&self) -> ReplMuxResult<()> {
        let mut writer = self.writer.lock().await;
        if let Err(e) = writer.shutdown().await {
            debug!("Shutdown of {} reported: {}", self.peer, e);
        }
        info!("TCP connection {} closed", self.peer);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn connected_pair() -> (TcpTransport, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        let (server, peer) = listener.accept().await.unwrap();
        (TcpTransport::new(server, peer, true), client)
    }

    #[tokio::test]
    async fn test_read_and_write() {
        let (transport, mut remote) = connected_pair().await;
        assert_eq!(transport.kind(), TransportKind::Tcp);
        let (mut source, sink) = transport.into_split();

        remote.write_all(b"ab").await.unwrap();
        assert_eq!(source.read_byte().await.unwrap(), Some(b'a'));
        assert_eq!(source.read_byte().await.unwrap(), Some(b'b'));

        sink.write(b"ok\r\n").await.unwrap();
        let mut buf = [0u8; 4];
        remote.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ok\r\n");
    }

    #[tokio::test]
    async fn test_peer_close_is_end_of_stream() {
        let (transport, remote) = connected_pair().await;
        let (mut source, _sink) = transport.into_split();

        drop(remote);
        assert_eq!(source.read_byte().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_close_shuts_down_write_side() {
        let (transport, mut remote) = connected_pair().await;
        let (_source, sink) = transport.into_split();

        sink.close().await.unwrap();
        let mut buf = Vec::new();
        let n = remote.read_to_end(&mut buf).await.unwrap();
        assert_eq!(n, 0);
    }
}
