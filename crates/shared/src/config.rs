//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// JWT configuration.
    pub jwt: JwtSettings,
    /// AI gateway used for classification suggestions.
    #[serde(default)]
    pub ai: AiConfig,
    /// Stripe webhook settings.
    #[serde(default)]
    pub stripe: StripeConfig,
    /// Special chart of accounts codes.
    #[serde(default)]
    pub chart: ChartConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// JWT settings as read from configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtSettings {
    /// Secret key for signing and verifying tokens.
    pub secret: String,
    /// Access token expiration in seconds.
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry_secs: u64,
}

fn default_access_token_expiry() -> u64 {
    3600
}

/// AI gateway configuration (OpenAI-compatible chat completions).
#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    /// Whether classification refinement calls the gateway at all.
    #[serde(default)]
    pub enabled: bool,
    /// Base URL of the gateway, without the `/v1/...` suffix.
    #[serde(default = "default_ai_base_url")]
    pub base_url: String,
    /// Bearer key.
    #[serde(default)]
    pub api_key: String,
    /// Model identifier.
    #[serde(default = "default_ai_model")]
    pub model: String,
    /// Per-request timeout.
    #[serde(default = "default_ai_timeout")]
    pub timeout_secs: u64,
    /// Retries after the first attempt on 429/5xx/network errors.
    #[serde(default = "default_ai_retries")]
    pub max_retries: u32,
    /// First backoff delay; doubled on each retry.
    #[serde(default = "default_ai_backoff")]
    pub initial_backoff_ms: u64,
    /// Minimum suggestion confidence accepted, as a decimal string in `0..=1`.
    #[serde(default = "default_ai_min_confidence")]
    pub min_confidence: String,
}

fn default_ai_base_url() -> String {
    "https://ai.gateway.lovable.dev".to_string()
}

fn default_ai_model() -> String {
    "google/gemini-2.5-flash".to_string()
}

fn default_ai_timeout() -> u64 {
    30
}

fn default_ai_retries() -> u32 {
    3
}

fn default_ai_backoff() -> u64 {
    500
}

fn default_ai_min_confidence() -> String {
    "0.80".to_string()
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_ai_base_url(),
            api_key: String::new(),
            model: default_ai_model(),
            timeout_secs: default_ai_timeout(),
            max_retries: default_ai_retries(),
            initial_backoff_ms: default_ai_backoff(),
            min_confidence: default_ai_min_confidence(),
        }
    }
}

/// Stripe webhook configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeConfig {
    /// Endpoint signing secret (`whsec_...`).
    #[serde(default)]
    pub webhook_secret: String,
    /// Maximum accepted age of a signed payload.
    #[serde(default = "default_stripe_tolerance")]
    pub tolerance_secs: i64,
}

fn default_stripe_tolerance() -> i64 {
    300
}

impl Default for StripeConfig {
    fn default() -> Self {
        Self {
            webhook_secret: String::new(),
            tolerance_secs: default_stripe_tolerance(),
        }
    }
}

/// Chart of accounts codes the postings rely on.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    /// Main bank account.
    pub bank: String,
    /// Synthetic parent of the per-client receivable accounts.
    pub client_receivables: String,
    /// Receipts whose payer could not be identified.
    pub pending_identification: String,
    /// Outflows waiting for classification.
    pub transitory_debits: String,
    /// Inflows (and grouped collections) waiting for classification or split.
    pub transitory_credits: String,
    /// Accounting fee revenue.
    pub fee_revenue: String,
    /// Electricity expense.
    pub energy: String,
    /// Water and sewage expense.
    pub water: String,
    /// Telephone and internet expense.
    pub telecom: String,
    /// Bank fees expense.
    pub bank_fees: String,
    /// Fallback payables account.
    pub payables: String,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            bank: "1.1.1.05".to_string(),
            client_receivables: "1.1.2.01".to_string(),
            pending_identification: "1.1.2.01.9999".to_string(),
            transitory_debits: "1.1.9.01".to_string(),
            transitory_credits: "2.1.9.01".to_string(),
            fee_revenue: "3.1.1.01".to_string(),
            energy: "4.1.1.01".to_string(),
            water: "4.1.1.02".to_string(),
            telecom: "4.1.1.03".to_string(),
            bank_fees: "4.3.1.02".to_string(),
            payables: "2.1.1.01".to_string(),
        }
    }
}

impl ChartConfig {
    /// The accounts whose balance must be zero before a month can close.
    #[must_use]
    pub fn transitory_accounts(&self) -> [&str; 2] {
        [&self.transitory_debits, &self.transitory_credits]
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("CONTTA").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
