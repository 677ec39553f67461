//! Shared types, errors, and configuration for Contta.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for type-safe entity references
//! - Money helpers for Brazilian Real amounts
//! - Fiscal months (`YYYY-MM` competences)
//! - Pagination types for list endpoints
//! - Application-wide error types
//! - JWT claims and token validation
//! - Configuration management

pub mod auth;
pub mod config;
pub mod error;
pub mod jwt;
pub mod types;

pub use auth::{Claims, Role};
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use jwt::{JwtConfig, JwtError, JwtService};
