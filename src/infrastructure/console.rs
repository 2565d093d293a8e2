// Local console transport - process stdin/stdout
use crate::core::communication::{ByteSource, OutputSink, Transport, TransportKind};
use crate::domain::error::ReplMuxResult;
use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

/// Any async reader/writer pair; [`ConsoleTransport::stdio`] is the usual one.
pub struct ConsoleTransport<R, W> {
    label: String,
    reader: R,
    writer: W,
}

impl ConsoleTransport<tokio::io::Stdin, tokio::io::Stdout> {
    pub fn stdio() -> Self {
        Self::new("stdio", tokio::io::stdin(), tokio::io::stdout())
    }
}

impl<R, W> ConsoleTransport<R, W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(label: impl Into<String>, reader: R, writer: W) -> Self {
        Self {
            label: label.into(),
            reader,
            writer,
        }
    }
}

impl<R, W> Transport for ConsoleTransport<R, W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    type Source = ConsoleSource<R>;
    type Sink = ConsoleSink<W>;

    fn kind(&self) -> TransportKind {
        TransportKind::Console
    }

    fn label(&self) -> String {
        self.label.clone()
    }

    fn into_split(self) -> (ConsoleSource<R>, ConsoleSink<W>) {
        (
            ConsoleSource {
                reader: BufReader::new(self.reader),
            },
            ConsoleSink {
                writer: Mutex::new(self.writer),
            },
        )
    }
}

pub struct ConsoleSource<R> {
    reader: BufReader<R>,
}

#[async_trait]
impl<R> ByteSource for ConsoleSource<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    async fn read_byte(&mut self) -> std::io::Result<Option<u8>> {
        match self.reader.read_u8().await {
            Ok(byte) => Ok(Some(byte)),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(e),
        }
    }
}

pub struct ConsoleSink<W> {
    writer: Mutex<W>,
}

#[async_trait]
impl<W> OutputSink for ConsoleSink<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn write(&self, bytes: &[u8]) -> ReplMuxResult<()> {
        let mut writer = self.writer.lock().await;
        writer.write_all(bytes).await?;
        writer.flush().await?;
        Ok(())
    }

    async fn close(&self) -> ReplMuxResult<()> {
        let mut writer = self.writer.lock().await;
        writer.flush().await?;
        Ok(())
    }
}
