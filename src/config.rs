//! Application configuration, loaded from environment variables (with a
//! `.env` file as a convenience for local development, via `dotenvy`) through
//! the `config` crate's layered builder.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub environment: String,
    pub cors_origin: String,

    /// Signing secret for the surrounding auth layer's JWTs. The core never
    /// verifies a token itself (out of scope per `spec.md` §1) but carries
    /// the setting, the way the teacher's own config surfaces secrets its
    /// request layer needs even where the domain logic doesn't touch them.
    pub jwt_secret: String,

    /// Base URL of the external odds provider polled for display-only
    /// `ReferenceOdds`. Off-core: matching and settlement never read this.
    pub odds_provider_url: String,
    /// API key for the external odds provider.
    pub odds_provider_key: String,

    /// How often the reference-odds poller refreshes its cached snapshot.
    pub odds_poll_interval_secs: u64,
    /// How often the settlement scan checks for markets whose match has
    /// resolved and is ready to force-close/settle.
    pub settlement_scan_interval_secs: u64,
    /// Wall-clock budget for a single order placement or cancellation
    /// transaction before it's abandoned with `CoreError::ContentionTimeout`.
    pub order_timeout_secs: u64,
    /// Wall-clock budget for a single settlement run.
    pub settlement_timeout_secs: u64,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .set_default("port", 8080)?
            .set_default("environment", "development")?
            .set_default("cors_origin", "*")?
            .set_default("jwt_secret", "")?
            .set_default("odds_provider_url", "")?
            .set_default("odds_provider_key", "")?
            .set_default("odds_poll_interval_secs", 15)?
            .set_default("settlement_scan_interval_secs", 60)?
            .set_default("order_timeout_secs", 15)?
            .set_default("settlement_timeout_secs", 30)?
            .add_source(config::Environment::default())
            .build()?;

        settings
            .try_deserialize()
            .map_err(|e| anyhow::anyhow!("failed to load configuration: {e}"))
    }
}
