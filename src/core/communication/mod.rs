// Communication module - transports, fan-out and the shared input path
pub mod queue;
pub mod registry;
pub mod transport;
pub mod worker;

pub use queue::{InputConsumer, InputProducer, InputQueue, DEFAULT_QUEUE_CAPACITY};
pub use registry::{BroadcastReport, ClientId, ClientRegistry, ClientSummary, TransportClient};
pub use transport::{ByteSource, OutputSink, Transport, TransportKind};
pub use worker::{ReaderWorker, WorkerExit};
