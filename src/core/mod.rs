// Core module - the session hub
pub mod communication;
pub mod session;
