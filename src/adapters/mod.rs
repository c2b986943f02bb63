//! Adapters layer - concrete implementations of the ports.
//!
//! Postgres and Redis back the production wiring; the memory adapters
//! back tests and local development.

pub mod events;
pub mod http;
pub mod locks;
pub mod memory;
pub mod postgres;
pub mod websocket;
