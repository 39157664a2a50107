//! HTTP and WebSocket surface for the seat inventory engine.
//!
//! # Request Flow
//!
//! 1. **HTTP request** or WebSocket frame arrives
//! 2. **Extract** the holder (`X-Holder-Id`, or the connection's generated id)
//! 3. **Call** the [`ReservationCoordinator`](seat_inventory_runtime::ReservationCoordinator)
//! 4. **Map** business outcomes to `200`/`201` bodies and errors to [`AppError`]
//!
//! # Example
//!
//! ```ignore
//! use seat_inventory_web::{Application, Config, Storage};
//!
//! let config = Config::from_env();
//! let storage = Storage::from_config(&config).await?;
//! Application::build(config, storage, None).await?.run().await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod catalog;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod lifecycle;
pub mod middleware;
pub mod routes;
pub mod state;

// Re-export key types for convenience
pub use catalog::UnitCatalog;
pub use config::Config;
pub use error::AppError;
pub use extractors::{HOLDER_ID_HEADER, HolderIdentity};
pub use lifecycle::{Application, Storage};
pub use middleware::{REQUEST_ID_HEADER, RequestId, track_requests};
pub use routes::build_router;
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
