//! Data models for the learning-management backend.
//!
//! - `Profile`, `Role`: the signed-in user
//! - `Course`, `Category`, `CategoryRef`: course catalogue entities
//! - `Listing`: paginated-or-bare collection envelope
//! - Auth request/response bodies

pub mod auth;
pub mod course;
pub mod listing;
pub mod profile;

pub use auth::{AuthResponse, LoginRequest, MessageResponse, RegisterRequest};
pub use course::{Category, CategoryRef, Course, CoursePayload};
pub use listing::Listing;
pub use profile::{Profile, ProfileUpdate, Role};
