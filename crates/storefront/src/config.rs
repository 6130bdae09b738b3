//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//! - `BAKERY_API_URL` - Base URL of the bakery REST API
//! - `BAKERY_API_TOKEN` - Bearer token for the bakery REST API
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `BAKERY_API_TIMEOUT_SECS` - Upstream request timeout (default: 30)
//! - `PAYMENT_CONFIRMATION_DELAY_MS` - Simulated payment delay (default: 1500)
//! - `LOYALTY_POINT_VALUE` - Value of one loyalty point (default: 0.01)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use bakehouse_core::PricingRules;

/// Shortest bearer token accepted.
const MIN_TOKEN_LENGTH: usize = 16;

/// Lowest accepted character spread of a token, in bits per character.
const MIN_TOKEN_BITS_PER_CHAR: f64 = 3.0;

/// Fragments found in tokens copied from templates or docs (lowercase).
const TEMPLATE_FRAGMENTS: &[&str] = &[
    "your-",
    "your_",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "dummy",
    "xxx",
    "insert",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Bakery REST API configuration
    pub bakery: BakeryApiConfig,
    /// Checkout behaviour
    pub checkout: CheckoutConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Bakery REST API configuration.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct BakeryApiConfig {
    /// Base URL, e.g. `https://api.bakehouse.ie/v1`
    pub base_url: Url,
    /// Bearer token sent with every request
    pub api_token: SecretString,
    /// Per-request timeout
    pub timeout: Duration,
}

impl std::fmt::Debug for BakeryApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BakeryApiConfig")
            .field("base_url", &self.base_url.as_str())
            .field("api_token", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Checkout configuration.
#[derive(Debug, Clone, Copy)]
pub struct CheckoutConfig {
    /// Artificial wait before confirming payment.
    pub payment_confirmation_delay: Duration,
    /// Pricing knobs not owned by locations.
    pub pricing: PricingRules,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            payment_confirmation_delay: Duration::from_millis(1500),
            pricing: PricingRules::default(),
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the API token fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env_or_default::<IpAddr>("STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_env_or_default::<u16>("STOREFRONT_PORT", "3000")?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?;

        let bakery = BakeryApiConfig::from_env()?;
        let checkout = CheckoutConfig::from_env()?;

        Ok(Self {
            host,
            port,
            base_url,
            bakery,
            checkout,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the storefront is served over HTTPS.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl BakeryApiConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw_url = get_required_env("BAKERY_API_URL")?;
        let base_url = parse_base_url(&raw_url)
            .map_err(|e| ConfigError::InvalidEnvVar("BAKERY_API_URL".to_string(), e))?;
        let timeout_secs = parse_env_or_default::<u64>("BAKERY_API_TIMEOUT_SECS", "30")?;

        Ok(Self {
            base_url,
            api_token: get_api_token("BAKERY_API_TOKEN")?,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

impl CheckoutConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let delay_ms = parse_env_or_default::<u64>("PAYMENT_CONFIRMATION_DELAY_MS", "1500")?;
        let point_value = parse_env_or_default::<Decimal>("LOYALTY_POINT_VALUE", "0.01")?;
        if point_value.is_sign_negative() {
            return Err(ConfigError::InvalidEnvVar(
                "LOYALTY_POINT_VALUE".to_string(),
                "must not be negative".to_string(),
            ));
        }

        Ok(Self {
            payment_confirmation_delay: Duration::from_millis(delay_ms),
            pricing: PricingRules {
                loyalty_point_value: point_value,
            },
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse the API base URL, normalizing it to end with a slash so that
/// relative joins keep any path prefix.
pub(crate) fn parse_base_url(raw: &str) -> Result<Url, String> {
    let mut url = Url::parse(raw).map_err(|e| e.to_string())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Shannon entropy of `s` in bits per character.
fn bits_per_char(s: &str) -> f64 {
    let mut counts: BTreeMap<char, u32> = BTreeMap::new();
    for c in s.chars() {
        *counts.entry(c).or_default() += 1;
    }

    let len: u32 = counts.values().sum();
    if len == 0 {
        return 0.0;
    }
    let len = f64::from(len);
    counts
        .values()
        .map(|&n| {
            let p = f64::from(n) / len;
            -p * p.log2()
        })
        .sum()
}

/// Reject API tokens that are short, copied from a template or repetitive.
fn check_api_token(token: &str, key: &str) -> Result<(), ConfigError> {
    let insecure = |reason: String| ConfigError::InsecureSecret(key.to_string(), reason);

    if token.chars().count() < MIN_TOKEN_LENGTH {
        return Err(insecure(format!(
            "shorter than {MIN_TOKEN_LENGTH} characters"
        )));
    }

    let lower = token.to_lowercase();
    if let Some(fragment) = TEMPLATE_FRAGMENTS.iter().find(|f| lower.contains(**f)) {
        return Err(insecure(format!(
            "looks like a template value (contains '{fragment}')"
        )));
    }

    let bits = bits_per_char(token);
    if bits < MIN_TOKEN_BITS_PER_CHAR {
        return Err(insecure(format!(
            "too repetitive ({bits:.2} bits/char, need {MIN_TOKEN_BITS_PER_CHAR:.1})"
        )));
    }

    Ok(())
}

/// Read the bakery API token.
fn get_api_token(key: &str) -> Result<SecretString, ConfigError> {
    let token = get_required_env(key)?;
    check_api_token(token.trim(), key)?;
    Ok(SecretString::from(token.trim().to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_bits_per_char() {
        assert!(bits_per_char("").abs() < f64::EPSILON);
        assert!(bits_per_char("aaaaaaa").abs() < f64::EPSILON);
        assert!((bits_per_char("ab") - 1.0).abs() < 0.01);
        assert!(bits_per_char("k3J9x!qP2@mZ7#vL") > 3.3);
    }

    #[test]
    fn test_check_api_token() {
        let rejected = |token: &str| {
            matches!(
                check_api_token(token, "BAKERY_API_TOKEN"),
                Err(ConfigError::InsecureSecret(_, _))
            )
        };
        assert!(rejected("bk_9fQ2"));
        assert!(rejected("your-bakery-api-token"));
        assert!(rejected("abababababababababab"));
        assert!(check_api_token("bk_live_9fQ2xL7mR4tZ8wN1", "BAKERY_API_TOKEN").is_ok());
    }

    #[test]
    fn test_parse_base_url_appends_slash() {
        let url = parse_base_url("https://api.bakehouse.ie/v1").unwrap();
        assert_eq!(url.as_str(), "https://api.bakehouse.ie/v1/");
        assert_eq!(
            url.join("orders").unwrap().as_str(),
            "https://api.bakehouse.ie/v1/orders"
        );

        let root = parse_base_url("http://127.0.0.1:4000").unwrap();
        assert_eq!(root.as_str(), "http://127.0.0.1:4000/");
    }

    #[test]
    fn test_parse_base_url_rejects_other_schemes() {
        assert!(parse_base_url("ftp://bakery").is_err());
        assert!(parse_base_url("not a url").is_err());
    }

    #[test]
    fn test_bakery_config_debug_redacts_token() {
        let config = BakeryApiConfig {
            base_url: parse_base_url("https://api.bakehouse.ie").unwrap(),
            api_token: SecretString::from("super_secret_token_value"),
            timeout: Duration::from_secs(30),
        };
        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("api.bakehouse.ie"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_token_value"));
    }

    #[test]
    fn test_socket_addr() {
        let config = StorefrontConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "https://shop.bakehouse.ie".to_string(),
            bakery: BakeryApiConfig {
                base_url: parse_base_url("https://api.bakehouse.ie").unwrap(),
                api_token: SecretString::from("token"),
                timeout: Duration::from_secs(30),
            },
            checkout: CheckoutConfig::default(),
            sentry_dsn: None,
            sentry_environment: None,
        };
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3000");
        assert!(config.is_secure());
    }
}
