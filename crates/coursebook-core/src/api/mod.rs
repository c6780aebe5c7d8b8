//! REST gateway for the learning-management backend.
//!
//! Every request goes through `ApiClient`, which attaches the session's
//! bearer token and maps failures to `ApiError`.

pub mod auth;
pub mod client;
pub mod courses;
pub mod error;

pub use client::{ApiClient, ApiResult};
pub use error::{ApiError, ErrorDetail};
