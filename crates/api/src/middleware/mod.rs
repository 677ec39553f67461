//! Request middleware.

pub mod auth;

pub use auth::{Access, AuthUser, auth_middleware};
