//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST routes under `/api/v1`, tenant-scoped as `/tenants/{tenant_id}/...`
//! - Bearer token authentication with tenant and role checks
//! - The JSON error mapping shared by all handlers

pub mod error;
pub mod middleware;
pub mod routes;

use std::str::FromStr;
use std::sync::Arc;

use axum::Router;
use contta_core::classification::ClassificationAdvisor;
use contta_shared::config::AppConfig;
use contta_shared::{AppError, JwtConfig, JwtService};
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: Arc<DatabaseConnection>,
    /// Loaded configuration.
    pub config: Arc<AppConfig>,
    /// JWT service for token validation.
    pub jwt_service: Arc<JwtService>,
    /// Classification advisor, when AI suggestions are enabled.
    pub advisor: Option<Arc<dyn ClassificationAdvisor>>,
    /// Minimum advisor confidence that is applied.
    pub min_confidence: Decimal,
}

impl AppState {
    /// Builds the state from configuration.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` if `ai.min_confidence` is not a
    /// decimal in `0..=1`.
    pub fn new(
        db: DatabaseConnection,
        config: AppConfig,
        advisor: Option<Arc<dyn ClassificationAdvisor>>,
    ) -> Result<Self, AppError> {
        let min_confidence = Decimal::from_str(config.ai.min_confidence.trim())
            .ok()
            .filter(|c| *c >= Decimal::ZERO && *c <= Decimal::ONE)
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "ai.min_confidence must be between 0 and 1, got {:?}",
                    config.ai.min_confidence
                ))
            })?;
        let jwt_service = JwtService::new(JwtConfig {
            secret: config.jwt.secret.clone(),
            access_token_expires_minutes: i64::try_from(config.jwt.access_token_expiry_secs / 60)
                .unwrap_or(i64::MAX),
        });
        Ok(Self {
            db: Arc::new(db),
            config: Arc::new(config),
            jwt_service: Arc::new(jwt_service),
            advisor,
            min_confidence,
        })
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes_with_state(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
