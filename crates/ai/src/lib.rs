//! Client for the OpenAI-compatible AI gateway.
//!
//! [`AiGateway`] sends chat completions with retries and implements the
//! core [`ClassificationAdvisor`](contta_core::classification::ClassificationAdvisor)
//! seam, asking the model for a counterpart account.

mod advisor;
mod client;
mod error;
mod models;

pub use client::{AiGateway, GatewaySettings};
pub use error::AiError;
pub use models::{ChatMessage, strip_code_fences};
