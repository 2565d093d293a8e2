use serde::{Deserialize, Serialize};

use crate::domain::error::{ReplMuxError, ReplMuxResult};

/// replmux configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplMuxConfig {
    /// Global configuration
    #[serde(default)]
    pub global: GlobalConfig,
    /// Local console (stdin/stdout) transport
    #[serde(default)]
    pub console: ConsoleConfig,
    /// Serial transports attached at startup
    #[serde(default)]
    pub serial: Vec<SerialPortConfig>,
    /// TCP listener
    #[serde(default)]
    pub listener: ListenerConfig,
}

/// Global configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Default log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Capacity of the shared input queue
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Byte that raises a keyboard interrupt instead of being queued; `0` disables it
    #[serde(default = "default_interrupt_char", with = "zero_disables")]
    pub interrupt_char: Option<u8>,
    /// Poll interval for transports that report readability
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleConfig {
    #[serde(default = "default_console_enabled")]
    pub enabled: bool,
}

/// Serial port transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialPortConfig {
    pub port: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "default_data_bits")]
    pub data_bits: u8,
    #[serde(default = "default_stop_bits")]
    pub stop_bits: u8,
    #[serde(default)]
    pub parity: ParityConfig,
    #[serde(default)]
    pub flow_control: FlowControlConfig,
}

/// TCP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenerConfig {
    #[serde(default = "default_listener_enabled")]
    pub enabled: bool,
    #[serde(default = "default_bind_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_backlog")]
    pub backlog: u32,
    /// Sent to every new connection before it joins the session
    #[serde(default = "default_greeting")]
    pub greeting: String,
    #[serde(default = "default_nodelay")]
    pub nodelay: bool,
}

/// Parity configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ParityConfig {
    #[default]
    None,
    Odd,
    Even,
}

/// Flow control configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FlowControlConfig {
    #[default]
    None,
    Hardware,
    Software,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_queue_capacity() -> usize {
    20
}

fn default_interrupt_char() -> Option<u8> {
    Some(0x03)
}

/// TOML has no null, so an interrupt character of `0` stands for none.
mod zero_disables {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<u8>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(value.unwrap_or(0))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u8>, D::Error> {
        Ok(match u8::deserialize(deserializer)? {
            0 => None,
            byte => Some(byte),
        })
    }
}

fn default_poll_interval() -> u64 {
    10
}

fn default_console_enabled() -> bool {
    true
}

fn default_baud_rate() -> u32 {
    115_200
}

fn default_data_bits() -> u8 {
    8
}

fn default_stop_bits() -> u8 {
    1
}

fn default_listener_enabled() -> bool {
    true
}

fn default_bind_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    2323
}

fn default_backlog() -> u32 {
    1
}

fn default_greeting() -> String {
    "connected\n".to_string()
}

fn default_nodelay() -> bool {
    true
}

impl Default for ReplMuxConfig {
    fn default() -> Self {
        Self {
            global: GlobalConfig::default(),
            console: ConsoleConfig::default(),
            serial: Vec::new(),
            listener: ListenerConfig::default(),
        }
    }
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            queue_capacity: default_queue_capacity(),
            interrupt_char: default_interrupt_char(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            enabled: default_console_enabled(),
        }
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            enabled: default_listener_enabled(),
            host: default_bind_host(),
            port: default_port(),
            backlog: default_backlog(),
            greeting: default_greeting(),
            nodelay: default_nodelay(),
        }
    }
}

impl SerialPortConfig {
    pub fn new(port: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port: port.into(),
            baud_rate,
            data_bits: default_data_bits(),
            stop_bits: default_stop_bits(),
            parity: ParityConfig::None,
            flow_control: FlowControlConfig::None,
        }
    }
}

impl ListenerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl ReplMuxConfig {
    /// Reject settings that would only fail later at runtime.
    pub fn validate(&self) -> ReplMuxResult<()> {
        if self.global.queue_capacity == 0 {
            return Err(ReplMuxError::Config {
                message: "queue_capacity must be at least 1".to_string(),
            });
        }

        for serial in &self.serial {
            if !(5..=8).contains(&serial.data_bits) {
                return Err(ReplMuxError::Config {
                    message: format!("{}: invalid data bits {}", serial.port, serial.data_bits),
                });
            }
            if !(1..=2).contains(&serial.stop_bits) {
                return Err(ReplMuxError::Config {
                    message: format!("{}: invalid stop bits {}", serial.port, serial.stop_bits),
                });
            }
        }

        if self.listener.enabled && self.listener.backlog == 0 {
            return Err(ReplMuxError::Config {
                message: "listener backlog must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_serialization() {
        let config = ReplMuxConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: ReplMuxConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(deserialized.global.queue_capacity, 20);
        assert_eq!(deserialized.listener.greeting, "connected\n");
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let toml_str = r#"
            [global]
            queue_capacity = 64

            [[serial]]
            port = "/dev/ttyACM0"

            [listener]
            port = 8023
        "#;

        let config: ReplMuxConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.global.queue_capacity, 64);
        assert_eq!(config.global.interrupt_char, Some(0x03));
        assert!(config.console.enabled);
        assert_eq!(config.serial[0].baud_rate, 115_200);
        assert_eq!(config.serial[0].parity, ParityConfig::None);

        let listener = config.listener;
        assert!(listener.enabled);
        assert_eq!(listener.bind_addr(), "0.0.0.0:8023");
        assert_eq!(listener.backlog, 1);
    }

    #[test]
    fn test_interrupt_char_can_be_disabled() {
        let config: ReplMuxConfig = toml::from_str("[global]\ninterrupt_char = 0\n").unwrap();
        assert_eq!(config.global.interrupt_char, None);

        let reloaded: ReplMuxConfig = toml::from_str(&toml::to_string(&config).unwrap()).unwrap();
        assert_eq!(reloaded.global.interrupt_char, None);

        let config: ReplMuxConfig = toml::from_str("[global]\ninterrupt_char = 7\n").unwrap();
        assert_eq!(config.global.interrupt_char, Some(7));
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let mut config = ReplMuxConfig::default();
        config.global.queue_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_framing() {
        let mut config = ReplMuxConfig::default();
        let mut serial = SerialPortConfig::new("/dev/ttyUSB0", 9600);
        serial.stop_bits = 3;
        config.serial.push(serial);
        assert!(config.validate().is_err());
    }
}
