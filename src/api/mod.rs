//! API Module
//!
//! HTTP handlers and routing for the offline cache service.
//!
//! # Endpoints
//! - `PUT /cache` - Cache a JSON value
//! - `GET /cache/:key` - Read a cached value
//! - `DELETE /cache` - Clear the whole cache
//! - `POST /cache/sweep` - Remove expired entries
//! - `GET /status` - Connectivity state and queue length
//! - `PUT /connectivity` - Report host connectivity
//! - `POST /sync` - Run a sync pass now
//! - `GET /stats` - Cache statistics
//! - `GET /health` - Health check
//! - `GET /api/*path` - Offline-aware read-through of the upstream backend

pub mod handlers;
pub mod routes;
pub mod upstream;

pub use handlers::*;
pub use routes::create_router;
pub use upstream::Upstream;
