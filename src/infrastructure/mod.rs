// Infrastructure module - concrete transports and process plumbing
pub mod config;
pub mod console;
pub mod logging;
pub mod serial;
pub mod tcp;
