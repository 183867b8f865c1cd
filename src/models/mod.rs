//! Request and Response models for the offline cache API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{ApiQuery, ConnectivityRequest, SetRequest};
pub use responses::{
    ClearResponse, GetResponse, HealthResponse, SetResponse, StatsResponse, StatusResponse,
    SweepResponse,
};
