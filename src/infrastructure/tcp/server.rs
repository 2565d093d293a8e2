use crate::core::session::Session;
use crate::domain::config::ListenerConfig;
use crate::domain::error::{ReplMuxError, ReplMuxResult};
use crate::infrastructure::tcp::client::TcpTransport;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpSocket};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Pause after a failed accept so a persistent error does not spin.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Listening socket that turns every accepted connection into a session client.
pub struct Listener {
    listener: TcpListener,
    local_addr: SocketAddr,
    greeting: Arc<[u8]>,
    nodelay: bool,
}

impl Listener {
    /// Bind and listen. Either failure is fatal for the network service.
    pub async fn bind(config: &ListenerConfig) -> ReplMuxResult<Self> {
        let bind_addr = config.bind_addr();
        let addr = tokio::net::lookup_host(&bind_addr)
            .await
            .map_err(|e| ReplMuxError::Bind {
                addr: bind_addr.clone(),
                message: e.to_string(),
            })?
            .next()
            .ok_or_else(|| ReplMuxError::Bind {
                addr: bind_addr.clone(),
                message: "address did not resolve".to_string(),
            })?;

        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()
        } else {
            TcpSocket::new_v6()
        }
        .map_err(|e| ReplMuxError::Bind {
            addr: bind_addr.clone(),
            message: e.to_string(),
        })?;

        if let Err(e) = socket.set_reuseaddr(true) {
            warn!("Failed to set SO_REUSEADDR on {}: {}", addr, e);
        }

        socket.bind(addr).map_err(|e| ReplMuxError::Bind {
            addr: bind_addr.clone(),
            message: e.to_string(),
        })?;
        debug!("Bound to {}", addr);

        let listener = socket.listen(config.backlog).map_err(|e| ReplMuxError::Listen {
            addr: bind_addr.clone(),
            message: e.to_string(),
        })?;

        let local_addr = listener.local_addr()?;
        info!("Listening on {} (backlog {})", local_addr, config.backlog);

        Ok(Self {
            listener,
            local_addr,
            greeting: Arc::from(config.greeting.as_bytes()),
            nodelay: config.nodelay,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept until cancelled. Returns the number of connections accepted.
    /// Each connection is greeted and attached in its own task.
    pub async fn run(self, session: Session, cancel: CancellationToken) -> u64 {
        let mut accepted = 0u64;
        info!("Accepting connections on {}", self.local_addr);

        loop {
            let result = tokio::select! {
                result = self.listener.accept() => result,
                _ = cancel.cancelled() => {
                    info!("Listener on {} stopping", self.local_addr);
                    break;
                }
            };

            match result {
                Ok((stream, peer)) => {
                    info!("Accepted connection from {}", peer);
                    accepted += 1;
                    let transport = TcpTransport::new(stream, peer, self.nodelay);
                    let session = session.clone();
                    let greeting = Arc::clone(&self.greeting);
                    tokio::spawn(async move {
                        match session.attach_with_greeting(transport, &greeting).await {
                            Ok(id) => debug!("Connection {} joined as client {}", peer, id),
                            Err(e) => warn!("Connection {} dropped: {}", peer, e),
                        }
                    });
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                }
            }
        }

        accepted
    }

    /// Run the accept loop in the background, stopping with the session.
    pub fn start(self, session: Session) -> ListenerHandle {
        let cancel = session.child_token();
        let local_addr = self.local_addr;
        let handle = tokio::spawn(self.run(session, cancel.clone()));
        ListenerHandle {
            local_addr,
            cancel,
            handle,
        }
    }
}

pub struct ListenerHandle {
    local_addr: SocketAddr,
    cancel: CancellationToken,
    handle: JoinHandle<u64>,
}

impl ListenerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Stop accepting. Already-joined clients stay attached.
    pub async fn stop(self) -> ReplMuxResult<u64> {
        self.cancel.cancel();
        self.handle.await.map_err(|e| ReplMuxError::Transport {
            message: format!("listener task failed: {}", e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::session::SessionConfig;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    fn local_config() -> ListenerConfig {
        ListenerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            ..ListenerConfig::default()
        }
    }

    async fn wait_for_clients(session: &Session, n: usize) {
        for _ in 0..200 {
            if session.registry().len().await == n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("expected {} clients", n);
    }

    #[tokio::test]
    async fn test_bind_reports_port_in_use() {
        let first = Listener::bind(&local_config()).await.unwrap();
        let config = ListenerConfig {
            port: first.local_addr().port(),
            ..local_config()
        };

        // SO_REUSEADDR does not allow two listeners on one port.
        let err = Listener::bind(&config).await.err().unwrap();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_accepts_and_greets_each_connection_once() {
        let (session, mut console) = Session::new(&SessionConfig::default());
        let listener = Listener::bind(&local_config()).await.unwrap();
        let addr = listener.local_addr();
        let handle = listener.start(session.clone());
        assert!(handle.is_running());

        let mut first = TcpStream::connect(addr).await.unwrap();
        wait_for_clients(&session, 1).await;
        let mut second = TcpStream::connect(addr).await.unwrap();
        wait_for_clients(&session, 2).await;

        let clients = session.clients().await;
        assert_ne!(clients[0].id, clients[1].id);

        console.write(b">>> ").await;
        for stream in [&mut first, &mut second] {
            let mut buf = [0u8; 14];
            stream.read_exact(&mut buf).await.unwrap();
            assert_eq!(&buf, b"connected\n>>> ");
        }

        first.write_all(b"1").await.unwrap();
        assert_eq!(console.read_byte().await, Some(b'1'));
        second.write_all(b"2").await.unwrap();
        assert_eq!(console.read_byte().await, Some(b'2'));

        assert_eq!(handle.stop().await.unwrap(), 2);
        session.shutdown().await;
    }

    #[tokio::test]
    async fn test_stalled_greeting_does_not_block_accepts() {
        let (session, _console) = Session::new(&SessionConfig::default());
        let config = ListenerConfig {
            greeting: "x".repeat(32 * 1024 * 1024),
            ..local_config()
        };
        let handle = Listener::bind(&config).await.unwrap().start(session.clone());
        let addr = handle.local_addr();

        // Never reads, so its greeting cannot finish
        let stalled = TcpStream::connect(addr).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let mut next = TcpStream::connect(addr).await.unwrap();
        let mut buf = [0u8; 16];
        tokio::time::timeout(Duration::from_secs(2), next.read_exact(&mut buf))
            .await
            .expect("second connection was never served")
            .unwrap();
        assert_eq!(&buf, b"xxxxxxxxxxxxxxxx");

        drop(stalled);
        drop(next);
        assert_eq!(handle.stop().await.unwrap(), 2);
        session.shutdown().await;
    }

    #[tokio::test]
    async fn test_disconnect_removes_client() {
        let (session, _console) = Session::new(&SessionConfig::default());
        let listener = Listener::bind(&local_config()).await.unwrap();
        let addr = listener.local_addr();
        let handle = listener.start(session.clone());

        let stream = TcpStream::connect(addr).await.unwrap();
        wait_for_clients(&session, 1).await;
        drop(stream);
        wait_for_clients(&session, 0).await;

        handle.stop().await.unwrap();
    }
}
