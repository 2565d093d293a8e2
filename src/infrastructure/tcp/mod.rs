// TCP module - accepted connections and the listener that produces them
pub mod client;
pub mod server;

pub use client::TcpTransport;
pub use server::{Listener, ListenerHandle};
