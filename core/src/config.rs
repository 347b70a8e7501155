// basket/src/config.rs

use crate::error::{BasketError, BasketResult};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_SIGN_IN_PATH: &str = "/signin";
const MAX_REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorefrontConfig {
  /// Base URL of the storefront REST API, e.g. `https://shop.example.com/api`.
  pub api_base_url: String,
  /// Upper bound for every remote call; expiry resolves as a network error.
  pub request_timeout: Duration,
  pub sign_in_path: String,
}

impl StorefrontConfig {
  pub fn new(api_base_url: impl Into<String>) -> Self {
    Self {
      api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
      request_timeout: DEFAULT_REQUEST_TIMEOUT,
      sign_in_path: DEFAULT_SIGN_IN_PATH.to_string(),
    }
  }

  pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
    self.request_timeout = timeout;
    self
  }

  pub fn with_sign_in_path(mut self, path: impl Into<String>) -> Self {
    self.sign_in_path = path.into();
    self
  }

  /// Reads `BASKET_API_URL` (required), `BASKET_REQUEST_TIMEOUT_SECS` and `BASKET_SIGN_IN_PATH`,
  /// loading a `.env` file first if present.
  pub fn from_env() -> BasketResult<Self> {
    dotenv().ok();

    let get_env = |var_name: &str| {
      env::var(var_name).map_err(|e| BasketError::Config(format!("Missing environment variable '{}': {}", var_name, e)))
    };

    let api_base_url = get_env("BASKET_API_URL")?;
    if api_base_url.trim().is_empty() {
      return Err(BasketError::Config("BASKET_API_URL is empty".to_string()));
    }

    let timeout_secs = match get_env("BASKET_REQUEST_TIMEOUT_SECS") {
      Ok(raw) => raw
        .trim()
        .parse::<u64>()
        .map_err(|e| BasketError::Config(format!("Invalid BASKET_REQUEST_TIMEOUT_SECS: {}", e)))?,
      Err(_) => DEFAULT_REQUEST_TIMEOUT.as_secs(),
    };
    if !(1..=MAX_REQUEST_TIMEOUT_SECS).contains(&timeout_secs) {
      return Err(BasketError::Config(format!(
        "BASKET_REQUEST_TIMEOUT_SECS must be between 1 and {}, got {}",
        MAX_REQUEST_TIMEOUT_SECS, timeout_secs
      )));
    }

    let sign_in_path = get_env("BASKET_SIGN_IN_PATH").unwrap_or_else(|_| DEFAULT_SIGN_IN_PATH.to_string());

    tracing::info!(api_base_url = %api_base_url, timeout_secs, "Storefront configuration loaded.");

    Ok(Self::new(api_base_url)
      .with_request_timeout(Duration::from_secs(timeout_secs))
      .with_sign_in_path(sign_in_path))
  }
}
