// Serial module - serial ports as session transports
pub mod client;

pub use client::{list_ports, SerialTransport};
