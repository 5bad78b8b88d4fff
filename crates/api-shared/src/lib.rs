//! # API Shared
//!
//! Shared utilities and definitions for the rxtrack APIs.
//!
//! Contains:
//! - Request/response bodies with OpenAPI schemas (`messages` module)
//! - Shared services like `HealthService`
//! - Caller identification helpers

pub mod auth;
pub mod health;
pub mod messages;

pub use auth::{parse_user_id, AuthError, USER_ID_HEADER};
pub use health::HealthService;
pub use messages::*;
