// basket/src/error.rs
use anyhow::Error as AnyhowError;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BasketError {
  /// No credential, or the server rejected it (HTTP 401). Leads to a sign-in redirect, never a retry.
  #[error("Not signed in or session expired")]
  Unauthorized,

  /// Transport failure or timeout. Safe to retry by re-submitting.
  #[error("Network error: {message}")]
  Network { message: String },

  /// Non-2xx response (or `success: false`) from the backend. `message` is shown to the user verbatim.
  #[error("Server rejected the request ({code}): {message}")]
  Server { code: u16, message: String },

  /// The server no longer agrees with the local view of an item (e.g. it was removed remotely).
  #[error("Conflict with server state: {message}")]
  Conflict { message: String },

  #[error("No item for {target}")]
  ItemNotFound { target: String },

  #[error("Quantity must be greater than zero")]
  InvalidQuantity,

  #[error("Operation '{operation}' is not supported by this resource")]
  Unsupported { operation: &'static str },

  #[error("Could not decode server response: {message}")]
  Decode { message: String },

  #[error("Configuration error: {0}")]
  Config(String),

  #[error("Internal basket error: {0}")]
  Internal(String),
}

/// Coarse classification used for notifications and rollback policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
  Unauthorized,
  Network,
  Server,
  Conflict,
  Client,
  Internal,
}

impl BasketError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      BasketError::Unauthorized => ErrorKind::Unauthorized,
      BasketError::Network { .. } => ErrorKind::Network,
      BasketError::Server { .. } | BasketError::Decode { .. } => ErrorKind::Server,
      BasketError::Conflict { .. } => ErrorKind::Conflict,
      BasketError::ItemNotFound { .. } | BasketError::InvalidQuantity | BasketError::Unsupported { .. } => {
        ErrorKind::Client
      }
      BasketError::Config(_) | BasketError::Internal(_) => ErrorKind::Internal,
    }
  }

  pub fn network(message: impl Into<String>) -> Self {
    BasketError::Network {
      message: message.into(),
    }
  }

  pub fn server(code: u16, message: impl Into<String>) -> Self {
    BasketError::Server {
      code,
      message: message.into(),
    }
  }

  pub fn conflict(message: impl Into<String>) -> Self {
    BasketError::Conflict {
      message: message.into(),
    }
  }
}

// Collaborators (notifiers, custom remotes) may report failures through anyhow.
impl From<AnyhowError> for BasketError {
  fn from(err: AnyhowError) -> Self {
    // Don't double wrap: a BasketError that travelled through anyhow comes back as itself.
    match err.downcast::<BasketError>() {
      Ok(basket_err) => basket_err,
      Err(other) => BasketError::Internal(format!("{:#}", other)),
    }
  }
}

impl From<reqwest::Error> for BasketError {
  fn from(err: reqwest::Error) -> Self {
    if err.is_decode() {
      return BasketError::Decode {
        message: err.to_string(),
      };
    }
    if let Some(status) = err.status() {
      if status == reqwest::StatusCode::UNAUTHORIZED {
        return BasketError::Unauthorized;
      }
      return BasketError::server(status.as_u16(), status.canonical_reason().unwrap_or("unexpected status"));
    }
    BasketError::network(err.to_string())
  }
}

pub type BasketResult<T, E = BasketError> = std::result::Result<T, E>;
