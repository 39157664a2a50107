//! HTTP and WebSocket handlers.

pub mod availability;
pub mod bookings;
pub mod health;
pub mod holds;
pub mod units;
pub mod websocket;

pub use health::{health_check, metrics_endpoint};
