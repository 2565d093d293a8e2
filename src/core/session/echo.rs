use crate::core::session::repl::{Console, Interpreter, ReplExit, ReplMode};
use async_trait::async_trait;

const CTRL_A: u8 = 0x01;
const CTRL_B: u8 = 0x02;
const CTRL_C: u8 = 0x03;
const CTRL_D: u8 = 0x04;
const BACKSPACE: u8 = 0x08;
const DELETE: u8 = 0x7f;

const PROMPT: &[u8] = b">>> ";
const RAW_BANNER: &[u8] = b"raw REPL; CTRL-B to exit\r\n";

/// Minimal line interpreter: every entered line is "evaluated" by echoing it
/// back. Stands in for a real interpreter so the hub can be used on its own.
///
/// Friendly mode edits a line with backspace, Ctrl-C drops it, Ctrl-A enters
/// raw mode, and Ctrl-D on an empty line exits. Raw mode collects input up to
/// Ctrl-D and answers `OK<text>\x04\x04`; Ctrl-B returns to friendly mode.
pub struct LineEcho {
    mode: ReplMode,
    interrupt_char: Option<u8>,
    banner: String,
}

enum LineOutcome {
    Line(Vec<u8>),
    Raw,
    Eof,
    Closed,
}

impl LineEcho {
    pub fn new(interrupt_char: Option<u8>) -> Self {
        Self {
            mode: ReplMode::Friendly,
            interrupt_char,
            banner: format!("replmux {} line echo\r\n", env!("CARGO_PKG_VERSION")),
        }
    }

    async fn read_line(&mut self, console: &mut Console) -> LineOutcome {
        let mut line = Vec::new();
        loop {
            let Some(byte) = console.read_byte().await else {
                return LineOutcome::Closed;
            };

            match byte {
                CTRL_A => return LineOutcome::Raw,
                CTRL_C => {
                    line.clear();
                    console.write(b"\r\n").await;
                    console.write(PROMPT).await;
                }
                CTRL_D if line.is_empty() => return LineOutcome::Eof,
                BACKSPACE | DELETE => {
                    if line.pop().is_some() {
                        console.write(b"\x08 \x08").await;
                    }
                }
                b'\r' | b'\n' => {
                    console.write(b"\r\n").await;
                    return LineOutcome::Line(line);
                }
                byte if byte >= 0x20 => {
                    line.push(byte);
                    console.write(&[byte]).await;
                }
                _ => {}
            }
        }
    }

    /// "Run" a line with the interrupt character armed.
    async fn evaluate(&self, console: &mut Console, source: &[u8]) {
        console.set_interrupt_char(self.interrupt_char);
        console.write_cooked(source).await;
        console.write(b"\r\n").await;
        if console.take_interrupt() {
            console.write(b"KeyboardInterrupt\r\n").await;
        }
        console.set_interrupt_char(None);
    }
}

impl Default for LineEcho {
    fn default() -> Self {
        Self::new(Some(CTRL_C))
    }
}

#[async_trait]
impl Interpreter for LineEcho {
    fn mode(&self) -> ReplMode {
        self.mode
    }

    async fn friendly_repl(&mut self, console: &mut Console) -> ReplExit {
        console.set_interrupt_char(None);
        console.write(self.banner.as_bytes()).await;

        loop {
            console.write(PROMPT).await;
            match self.read_line(console).await {
                LineOutcome::Line(line) if line.is_empty() => {}
                LineOutcome::Line(line) => self.evaluate(console, &line).await,
                LineOutcome::Raw => {
                    self.mode = ReplMode::Raw;
                    return ReplExit::Continue;
                }
                LineOutcome::Eof => return ReplExit::ForcedExit,
                LineOutcome::Closed => return ReplExit::Continue,
            }
        }
    }

    async fn raw_repl(&mut self, console: &mut Console) -> ReplExit {
        console.set_interrupt_char(None);
        console.write(RAW_BANNER).await;

        loop {
            console.write(b">").await;
            let mut source = Vec::new();
            loop {
                let Some(byte) = console.read_byte().await else {
                    return ReplExit::Continue;
                };
                match byte {
                    CTRL_A => {
                        source.clear();
                        console.write(b"\r\n>").await;
                    }
                    CTRL_B => {
                        self.mode = ReplMode::Friendly;
                        console.write(b"\r\n").await;
                        return ReplExit::Continue;
                    }
                    CTRL_C => source.clear(),
                    CTRL_D if source.is_empty() => {
                        self.mode = ReplMode::Friendly;
                        return ReplExit::ForcedExit;
                    }
                    CTRL_D => break,
                    byte => source.push(byte),
                }
            }

            console.write(b"OK").await;
            console.set_interrupt_char(self.interrupt_char);
            console.write(&source).await;
            console.set_interrupt_char(None);
            console.write(&[CTRL_D, CTRL_D]).await;
        }
    }
}
