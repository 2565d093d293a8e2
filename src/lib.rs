//! replmux Library
//!
//! Runs one interactive interpreter session shared by the local console,
//! serial ports and any number of TCP clients. Input from every transport is
//! merged into one bounded queue; output is broadcast to every live client.

pub mod cli;
pub mod core;
pub mod domain;
pub mod infrastructure;

pub use domain::config::ReplMuxConfig;
pub use domain::error::{ReplMuxError, ReplMuxResult};
pub use core::communication::{
    ByteSource, ClientId, ClientRegistry, InputQueue, OutputSink, ReaderWorker, Transport,
    TransportKind,
};
pub use core::session::{
    run_session, Console, Interpreter, LineEcho, ReplExit, ReplMode, Session, SessionConfig,
    SessionEnd,
};
pub use infrastructure::tcp::{Listener, ListenerHandle};
