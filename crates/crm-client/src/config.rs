//! Configuration types for crm-client.

use std::env;
use std::time::Duration;

use crate::error::CrmError;

/// Default country calling code used to normalize local phone numbers.
pub const DEFAULT_COUNTRY_PREFIX: &str = "+380";

/// Configuration for connecting to the CRM.
#[derive(Clone)]
pub struct CrmConfig {
    /// Base URL of the CRM API (e.g., "https://crm.example.com/v1").
    pub base_url: String,
    /// Bearer token.
    pub api_key: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Sales channel the sales are attributed to.
    pub source_id: Option<i64>,
    /// Replaces the leading zero of local phone numbers.
    pub country_prefix: String,
}

impl std::fmt::Debug for CrmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrmConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .field("source_id", &self.source_id)
            .field("country_prefix", &self.country_prefix)
            .finish()
    }
}

impl CrmConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(30),
            source_id: None,
            country_prefix: DEFAULT_COUNTRY_PREFIX.to_string(),
        }
    }

    pub fn with_source_id(mut self, source_id: i64) -> Self {
        self.source_id = Some(source_id);
        self
    }

    pub fn with_country_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.country_prefix = prefix.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Load from `CRM_API_URL`, `CRM_API_KEY`, `CRM_SOURCE_ID`, `CRM_COUNTRY_PREFIX`.
    ///
    /// Returns `Ok(None)` when no API key is set (CRM push disabled).
    pub fn from_env() -> Result<Option<Self>, CrmError> {
        let api_key = match env::var("CRM_API_KEY") {
            Ok(key) if !key.trim().is_empty() => key,
            _ => return Ok(None),
        };
        let base_url = env::var("CRM_API_URL")
            .map_err(|_| CrmError::Config("CRM_API_URL is required when CRM_API_KEY is set".into()))?;

        let mut config = Self::new(base_url, api_key);
        if let Ok(source) = env::var("CRM_SOURCE_ID") {
            let source_id = source
                .trim()
                .parse()
                .map_err(|_| CrmError::Config(format!("invalid CRM_SOURCE_ID: {}", source)))?;
            config = config.with_source_id(source_id);
        }
        if let Ok(prefix) = env::var("CRM_COUNTRY_PREFIX") {
            config = config.with_country_prefix(prefix);
        }
        Ok(Some(config))
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

/// Expand a local number with a single leading zero to international form.
///
/// `"0687034410"` with prefix `"+380"` becomes `"+380687034410"`. Numbers
/// already in international form (or starting with `00`) are returned trimmed.
pub fn normalize_phone(phone: &str, country_prefix: &str) -> String {
    let phone = phone.trim();
    if phone.starts_with('0') && !phone.starts_with("00") {
        format!("{}{}", country_prefix, &phone[1..])
    } else {
        phone.to_string()
    }
}
