//! Client library for a learning-management backend.
//!
//! - `auth`: the process-wide `SessionStore` and its durable backends
//! - `api`: `ApiClient`, the authenticated gateway for every backend call
//! - `courses`: course form and course list state machines
//! - `models`: profiles, courses, categories and response envelopes
//! - `config`: user configuration and environment overrides

pub mod api;
pub mod auth;
pub mod config;
pub mod courses;
pub mod models;
pub mod utils;

pub use api::{ApiClient, ApiError, ApiResult};
pub use auth::{SessionData, SessionStore};
pub use config::Config;
