//! Interpreter-facing side of a session.
//!
//! The interpreter sees one byte-oriented console: [`Console::read_byte`]
//! pulls the next input byte from whichever transport produced it, and
//! [`Console::write`] sends output to every attached transport.

use crate::core::communication::{BroadcastReport, ClientRegistry, InputConsumer};
use async_trait::async_trait;
use tracing::{debug, info};

/// Which REPL flavour the interpreter wants to run next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplMode {
    Friendly,
    Raw,
}

/// Result of one REPL run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplExit {
    /// Run again, in whatever mode the interpreter now reports.
    Continue,
    /// The user forced the interpreter out (soft reset).
    ForcedExit,
    /// The interpreter stopped with a status code.
    Exit(i32),
}

/// How the session loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    ForcedExit,
    Exit(i32),
    InputClosed,
}

/// The single consumer of session input and the sole writer of session output.
pub struct Console {
    input: InputConsumer,
    registry: ClientRegistry,
    input_closed: bool,
}

impl Console {
    pub(crate) fn new(input: InputConsumer, registry: ClientRegistry) -> Self {
        Self {
            input,
            registry,
            input_closed: false,
        }
    }

    /// Next input byte from any transport. `None` once input can never arrive.
    pub async fn read_byte(&mut self) -> Option<u8> {
        let byte = self.input.pop().await;
        if byte.is_none() {
            self.input_closed = true;
        }
        byte
    }

    pub fn try_read_byte(&mut self) -> Option<u8> {
        self.input.try_pop()
    }

    /// Broadcast interpreter output to every attached transport.
    pub async fn write(&self, bytes: &[u8]) -> BroadcastReport {
        self.registry.broadcast(bytes).await
    }

    pub async fn write_str(&self, s: &str) -> BroadcastReport {
        self.write(s.as_bytes()).await
    }

    /// Write `bytes` translating each `\n` to `\r\n`.
    pub async fn write_cooked(&self, bytes: &[u8]) -> BroadcastReport {
        self.write(&cook(bytes)).await
    }

    pub fn set_interrupt_char(&self, interrupt_char: Option<u8>) {
        self.input.set_interrupt_char(interrupt_char);
    }

    pub fn take_interrupt(&self) -> bool {
        self.input.take_interrupt()
    }

    pub fn input_closed(&self) -> bool {
        self.input_closed
    }
}

fn cook(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() + bytes.len() / 8);
    for &byte in bytes {
        if byte == b'\n' {
            out.push(b'\r');
        }
        out.push(byte);
    }
    out
}

/// An interpreter that can be driven through a [`Console`].
#[async_trait]
pub trait Interpreter: Send {
    fn mode(&self) -> ReplMode;

    async fn friendly_repl(&mut self, console: &mut Console) -> ReplExit;

    async fn raw_repl(&mut self, console: &mut Console) -> ReplExit;
}

/// Session loop: keep running the interpreter's REPL until it exits or
/// input dries up.
pub async fn run_session<I: Interpreter + ?Sized>(
    interpreter: &mut I,
    console: &mut Console,
) -> SessionEnd {
    info!("Session loop started");
    loop {
        let mode = interpreter.mode();
        debug!("Entering {:?} REPL", mode);
        let exit = match mode {
            ReplMode::Friendly => interpreter.friendly_repl(console).await,
            ReplMode::Raw => interpreter.raw_repl(console).await,
        };

        match exit {
            ReplExit::Continue if console.input_closed() => {
                info!("Session input closed");
                return SessionEnd::InputClosed;
            }
            ReplExit::Continue => continue,
            ReplExit::ForcedExit => {
                console.write(b"FORCED EXIT\r\n").await;
                return SessionEnd::ForcedExit;
            }
            ReplExit::Exit(code) => {
                console.write(b"EXIT\r\n").await;
                info!("Interpreter exited with status {}", code);
                return SessionEnd::Exit(code);
            }
        }
    }
}
