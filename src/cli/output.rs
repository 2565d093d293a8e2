use crate::cli::args::OutputFormat;
use crate::domain::config::{ReplMuxConfig, SerialPortConfig};
use serde::Serialize;
use std::io;
use tabled::{Table, Tabled};

/// A serial port as reported by the operating system.
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct PortEntry {
    pub name: String,
    pub kind: String,
    pub description: String,
}

impl From<&serialport::SerialPortInfo> for PortEntry {
    fn from(info: &serialport::SerialPortInfo) -> Self {
        let (kind, description) = match &info.port_type {
            serialport::SerialPortType::UsbPort(usb) => (
                "usb",
                format!(
                    "{:04x}:{:04x} {}",
                    usb.vid,
                    usb.pid,
                    usb.product.clone().unwrap_or_default()
                ),
            ),
            serialport::SerialPortType::PciPort => ("pci", String::new()),
            serialport::SerialPortType::BluetoothPort => ("bluetooth", String::new()),
            serialport::SerialPortType::Unknown => ("unknown", String::new()),
        };

        Self {
            name: info.port_name.clone(),
            kind: kind.to_string(),
            description: description.trim().to_string(),
        }
    }
}

/// Output writer trait for different formats
pub trait OutputWriter {
    fn write_config(&self, config: &ReplMuxConfig) -> Result<(), OutputError>;
    fn write_ports(&self, ports: &[PortEntry]) -> Result<(), OutputError>;
    fn write_message(&self, message: &str) -> Result<(), OutputError>;
    fn write_error(&self, error: &str) -> Result<(), OutputError>;
}

/// Output formatting errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

impl From<OutputError> for crate::domain::error::ReplMuxError {
    fn from(err: OutputError) -> Self {
        Self::Output(err.to_string())
    }
}

/// Console output writer
pub struct ConsoleWriter {
    format: OutputFormat,
}

impl ConsoleWriter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }
}

impl OutputWriter for ConsoleWriter {
    fn write_config(&self, config: &ReplMuxConfig) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Text => {
                println!("replmux configuration:");
                println!("  Log level: {}", config.global.log_level);
                println!("  Queue capacity: {}", config.global.queue_capacity);
                match config.global.interrupt_char {
                    Some(c) => println!("  Interrupt char: 0x{:02x}", c),
                    None => println!("  Interrupt char: none"),
                }
                println!("  Console: {}", if config.console.enabled { "enabled" } else { "disabled" });
                if config.listener.enabled {
                    println!(
                        "  Listener: {} (backlog {})",
                        config.listener.bind_addr(),
                        config.listener.backlog
                    );
                } else {
                    println!("  Listener: disabled");
                }
                if !config.serial.is_empty() {
                    println!("  Serial ports:");
                    for serial in &config.serial {
                        println!("    {} @ {}", serial.port, serial.baud_rate);
                    }
                }
            }
            OutputFormat::Json => {
                let output = serde_json::to_string_pretty(config)?;
                println!("{}", output);
            }
            OutputFormat::Table => {
                if !config.serial.is_empty() {
                    let table_data: Vec<SerialTableRow> = config.serial.iter().map(SerialTableRow::from).collect();
                    println!("{}", Table::new(table_data));
                }
            }
            OutputFormat::Csv => {
                println!("port,baud_rate,framing");
                for serial in &config.serial {
                    println!("{},{},{}", serial.port, serial.baud_rate, framing(serial));
                }
            }
        }
        Ok(())
    }

    fn write_ports(&self, ports: &[PortEntry]) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Text => {
                if ports.is_empty() {
                    println!("No serial ports found");
                }
                for port in ports {
                    println!("{} ({}) {}", port.name, port.kind, port.description);
                }
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(ports)?);
            }
            OutputFormat::Table => {
                if !ports.is_empty() {
                    println!("{}", Table::new(ports));
                }
            }
            OutputFormat::Csv => {
                println!("name,kind,description");
                for port in ports {
                    println!("{},{},{}", port.name, port.kind, port.description);
                }
            }
        }
        Ok(())
    }

    fn write_message(&self, message: &str) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "message": message,
                    "level": "info"
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            _ => {
                println!("{}", message);
            }
        }
        Ok(())
    }

    fn write_error(&self, error: &str) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "error": error,
                    "level": "error"
                });
                eprintln!("{}", serde_json::to_string_pretty(&output)?);
            }
            _ => {
                eprintln!("Error: {}", error);
            }
        }
        Ok(())
    }
}

fn framing(serial: &SerialPortConfig) -> String {
    let parity = match serial.parity {
        crate::domain::config::ParityConfig::None => 'N',
        crate::domain::config::ParityConfig::Even => 'E',
        crate::domain::config::ParityConfig::Odd => 'O',
    };
    format!("{}{}{}", serial.data_bits, parity, serial.stop_bits)
}

/// Table row for a configured serial port
#[derive(Tabled)]
struct SerialTableRow {
    port: String,
    baud: u32,
    framing: String,
}

impl From<&SerialPortConfig> for SerialTableRow {
    fn from(serial: &SerialPortConfig) -> Self {
        Self {
            port: serial.port.clone(),
            baud: serial.baud_rate,
            framing: framing(serial),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_framing() {
        let mut serial = SerialPortConfig::new("/dev/ttyUSB0", 9600);
        assert_eq!(framing(&serial), "8N1");
        serial.parity = crate::domain::config::ParityConfig::Even;
        serial.data_bits = 7;
        assert_eq!(framing(&serial), "7E1");
    }

    #[test]
    fn test_port_entry_from_info() {
        let info = serialport::SerialPortInfo {
            port_name: "/dev/ttyS0".to_string(),
            port_type: serialport::SerialPortType::PciPort,
        };
        let entry = PortEntry::from(&info);
        assert_eq!(entry.name, "/dev/ttyS0");
        assert_eq!(entry.kind, "pci");
        assert!(entry.description.is_empty());
    }
}
