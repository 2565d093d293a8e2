use crate::domain::error::{ReplMuxError, ReplMuxResult};
use std::sync::atomic::{AtomicBool, AtomicI16, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// Capacity used when nothing else is configured.
pub const DEFAULT_QUEUE_CAPACITY: usize = 20;

const NO_INTERRUPT: i16 = -1;

/// Keyboard interrupt byte and its pending flag, shared by both queue ends.
#[derive(Debug)]
struct InterruptState {
    char: AtomicI16,
    pending: AtomicBool,
}

impl InterruptState {
    fn new(interrupt_char: Option<u8>) -> Self {
        Self {
            char: AtomicI16::new(interrupt_char.map_or(NO_INTERRUPT, i16::from)),
            pending: AtomicBool::new(false),
        }
    }

    /// Arming starts from a clear pending flag.
    fn set(&self, interrupt_char: Option<u8>) {
        if interrupt_char.is_some() {
            self.pending.store(false, Ordering::SeqCst);
        }
        self.char
            .store(interrupt_char.map_or(NO_INTERRUPT, i16::from), Ordering::SeqCst);
    }

    fn matches(&self, byte: u8) -> bool {
        self.char.load(Ordering::SeqCst) == i16::from(byte)
    }
}

/// Bounded byte FIFO shared by every reader worker and drained by the
/// session loop.
///
/// Overflow policy: a producer pushing into a full queue waits until the
/// consumer frees a slot. Nothing is ever dropped. [`InputProducer::try_push`]
/// exposes the full condition without waiting.
pub struct InputQueue;

impl InputQueue {
    pub fn new(capacity: usize) -> (InputProducer, InputConsumer) {
        Self::with_interrupt(capacity, None)
    }

    pub fn with_interrupt(capacity: usize, interrupt_char: Option<u8>) -> (InputProducer, InputConsumer) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let interrupt = Arc::new(InterruptState::new(interrupt_char));

        let producer = InputProducer {
            tx,
            interrupt: Arc::clone(&interrupt),
        };
        let consumer = InputConsumer { rx, interrupt };
        (producer, consumer)
    }
}

#[derive(Debug, Clone)]
pub struct InputProducer {
    tx: mpsc::Sender<u8>,
    interrupt: Arc<InterruptState>,
}

impl InputProducer {
    /// Insert a byte, waiting for space if the queue is full.
    pub async fn push(&self, byte: u8) -> ReplMuxResult<()> {
        if self.raise_interrupt(byte) {
            return Ok(());
        }
        self.tx.send(byte).await.map_err(|_| ReplMuxError::QueueClosed)
    }

    /// Insert a byte only if there is room right now.
    pub fn try_push(&self, byte: u8) -> ReplMuxResult<()> {
        if self.raise_interrupt(byte) {
            return Ok(());
        }
        self.tx.try_send(byte).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => ReplMuxError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => ReplMuxError::QueueClosed,
        })
    }

    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    /// Bytes currently waiting for the consumer.
    pub fn len(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn raise_interrupt(&self, byte: u8) -> bool {
        if !self.interrupt.matches(byte) {
            return false;
        }
        debug!("Interrupt character 0x{:02x} received", byte);
        self.interrupt.pending.store(true, Ordering::SeqCst);
        true
    }
}

/// The single consuming end. Not `Clone`.
#[derive(Debug)]
pub struct InputConsumer {
    rx: mpsc::Receiver<u8>,
    interrupt: Arc<InterruptState>,
}

impl InputConsumer {
    /// Wait for the oldest unread byte. `None` once every producer is gone.
    pub async fn pop(&mut self) -> Option<u8> {
        self.rx.recv().await
    }

    pub fn try_pop(&mut self) -> Option<u8> {
        self.rx.try_recv().ok()
    }

    /// Change which byte raises an interrupt; `None` delivers every byte.
    pub fn set_interrupt_char(&self, interrupt_char: Option<u8>) {
        self.interrupt.set(interrupt_char);
    }

    /// Clear and return the pending-interrupt flag.
    pub fn take_interrupt(&self) -> bool {
        self.interrupt.pending.swap(false, Ordering::SeqCst)
    }
}
