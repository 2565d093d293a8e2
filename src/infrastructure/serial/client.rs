use crate::core::communication::{ByteSource, OutputSink, Transport, TransportKind};
use crate::domain::config::{FlowControlConfig, ParityConfig, SerialPortConfig};
use crate::domain::error::{ReplMuxError, ReplMuxResult};
use async_trait::async_trait;
use serialport::{SerialPort, SerialPortBuilder};
use std::io::{ErrorKind, Read, Write};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, trace};

/// Read timeout on the port; the reader only reads when bytes are waiting,
/// so this bounds a spurious blocking read.
const READ_TIMEOUT: Duration = Duration::from_millis(50);

/// Bytes the driver may still hold for transmission before a write waits.
const TX_HIGH_WATER: u32 = 256;
const WRITE_POLL: Duration = Duration::from_millis(1);

/// A serial port joined to a session.
pub struct SerialTransport {
    path: String,
    reader: Box<dyn SerialPort>,
    writer: Box<dyn SerialPort>,
}

impl SerialTransport {
    pub fn open(config: &SerialPortConfig) -> ReplMuxResult<Self> {
        let writer = port_builder(config)?.open().map_err(|e| ReplMuxError::Transport {
            message: format!("Failed to open serial port {}: {}", config.port, e),
        })?;
        let reader = writer.try_clone()?;

        info!("Serial port {} opened at {} baud", config.port, config.baud_rate);

        Ok(Self {
            path: config.port.clone(),
            reader,
            writer,
        })
    }
}

pub(crate) fn port_builder(config: &SerialPortConfig) -> ReplMuxResult<SerialPortBuilder> {
    let data_bits = match config.data_bits {
        5 => serialport::DataBits::Five,
        6 => serialport::DataBits::Six,
        7 => serialport::DataBits::Seven,
        8 => serialport::DataBits::Eight,
        other => {
            return Err(ReplMuxError::Config {
                message: format!("Invalid data bits: {}", other),
            })
        }
    };

    let stop_bits = match config.stop_bits {
        1 => serialport::StopBits::One,
        2 => serialport::StopBits::Two,
        other => {
            return Err(ReplMuxError::Config {
                message: format!("Invalid stop bits: {}", other),
            })
        }
    };

    let parity = match config.parity {
        ParityConfig::None => serialport::Parity::None,
        ParityConfig::Even => serialport::Parity::Even,
        ParityConfig::Odd => serialport::Parity::Odd,
    };

    let flow_control = match config.flow_control {
        FlowControlConfig::None => serialport::FlowControl::None,
        FlowControlConfig::Software => serialport::FlowControl::Software,
        FlowControlConfig::Hardware => serialport::FlowControl::Hardware,
    };

    Ok(serialport::new(&config.port, config.baud_rate)
        .data_bits(data_bits)
        .stop_bits(stop_bits)
        .parity(parity)
        .flow_control(flow_control)
        .timeout(READ_TIMEOUT))
}

/// Ports the operating system reports.
pub fn list_ports() -> ReplMuxResult<Vec<serialport::SerialPortInfo>> {
    Ok(serialport::available_ports()?)
}

impl Transport for SerialTransport {
    type Source = SerialSource;
    type Sink = SerialSink;

    fn kind(&self) -> TransportKind {
        TransportKind::Serial
    }

    fn label(&self) -> String {
        self.path.clone()
    }

    fn into_split(self) -> (SerialSource, SerialSink) {
        let source = SerialSource {
            path: self.path.clone(),
            port: self.reader,
        };
        let sink = SerialSink {
            path: self.path,
            port: Mutex::new(self.writer),
        };
        (source, sink)
    }
}

pub struct SerialSource {
    path: String,
    port: Box<dyn SerialPort>,
}

#[async_trait]
impl ByteSource for SerialSource {
    async fn read_byte(&mut self) -> std::io::Result<Option<u8>> {
        let mut byte = [0u8; 1];
        loop {
            match self.port.read(&mut byte) {
                Ok(1) => {
                    trace!("{} rx {:02x}", self.path, byte[0]);
                    return Ok(Some(byte[0]));
                }
                Ok(_) => tokio::task::yield_now().await,
                Err(ref e) if e.kind() == ErrorKind::TimedOut => tokio::task::yield_now().await,
                Err(e) => return Err(e),
            }
        }
    }

    /// Errors from the driver count as readable so the next read reports them.
    fn is_readable(&mut self) -> bool {
        self.port.bytes_to_read().map(|n| n > 0).unwrap_or(true)
    }
}

pub struct SerialSink {
    path: String,
    port: Mutex<Box<dyn SerialPort>>,
}

#[async_trait]
impl OutputSink for SerialSink {
    async fn write(&self, bytes: &[u8]) -> ReplMuxResult<()> {
        let mut port = self.port.lock().await;
        wait_for_room(&mut *port).await?;
        port.write_all(bytes)?;
        port.flush()?;
        Ok(())
    }

    async fn close(&self) -> ReplMuxResult<()> {
        let port = self.port.lock().await;
        if let Err(e) = port.clear(serialport::ClearBuffer::All) {
            debug!("Failed to clear {} buffers: {}", self.path, e);
        }
        info!("Serial port {} closed", self.path);
        Ok(())
    }
}

/// Output a driver has accepted but not yet sent.
pub(crate) trait TxBacklog: Send {
    fn pending_output(&self) -> serialport::Result<u32>;
}

impl TxBacklog for Box<dyn SerialPort> {
    fn pending_output(&self) -> serialport::Result<u32> {
        self.bytes_to_write()
    }
}

/// Wait until the transmit backlog drops below the high-water mark.
async fn wait_for_room<P: TxBacklog>(port: &mut P) -> serialport::Result<()> {
    while port.pending_output()? >= TX_HIGH_WATER {
        tokio::time::sleep(WRITE_POLL).await;
    }
    Ok(())
}
