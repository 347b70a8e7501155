// basket/src/session.rs

//! Session credential and the auth gate every mutation passes through.

use crate::core::shared::Shared;
use crate::error::{BasketError, BasketResult};
use std::fmt;
use std::sync::Arc;
use tracing::{event, Level};

/// Bearer token for the storefront API. `Debug` never prints the token.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
  pub fn bearer(token: impl Into<String>) -> Self {
    Credential(token.into())
  }

  pub fn token(&self) -> &str {
    &self.0
  }

  pub(crate) fn authorization_header(&self) -> String {
    format!("Bearer {}", self.0)
  }
}

impl fmt::Debug for Credential {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("Credential([REDACTED])")
  }
}

/// Navigation hook supplied by the presentation layer.
pub trait Redirector: Send + Sync {
  /// Send the user to the sign-in page. `action` names what they were trying to do.
  fn redirect_to_sign_in(&self, sign_in_path: &str, action: &str);
}

/// Redirector for headless use: only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogRedirector;

impl Redirector for LogRedirector {
  fn redirect_to_sign_in(&self, sign_in_path: &str, action: &str) {
    event!(Level::INFO, %sign_in_path, %action, "Sign-in required.");
  }
}

#[derive(Debug, Default)]
struct SessionState {
  credential: Option<Credential>,
  /// Bumped whenever the session begins or ends. Work started under an older epoch is stale.
  epoch: u64,
}

impl SessionState {
  fn replace(&mut self, credential: Option<Credential>) -> Option<Credential> {
    self.epoch += 1;
    std::mem::replace(&mut self.credential, credential)
  }
}

/// Decides whether an action may run. Cloning shares the same session.
#[derive(Clone)]
pub struct SessionGate {
  state: Shared<SessionState>,
  redirector: Arc<dyn Redirector>,
  sign_in_path: Arc<str>,
}

impl SessionGate {
  pub fn new(redirector: Arc<dyn Redirector>, sign_in_path: impl Into<String>) -> Self {
    let sign_in_path: String = sign_in_path.into();
    Self {
      state: Shared::new(SessionState::default()),
      redirector,
      sign_in_path: sign_in_path.into(),
    }
  }

  pub fn sign_in(&self, credential: Credential) {
    let epoch = self.state.update(|s| {
      s.replace(Some(credential));
      s.epoch
    });
    event!(Level::DEBUG, epoch, "Session credential set.");
  }

  pub fn sign_out(&self) {
    let epoch = self.state.update(|s| {
      s.replace(None);
      s.epoch
    });
    event!(Level::DEBUG, epoch, "Session credential cleared.");
  }

  pub fn is_authenticated(&self) -> bool {
    self.state.read().credential.is_some()
  }

  pub fn credential(&self) -> Option<Credential> {
    self.state.read().credential.clone()
  }

  /// Identifies the current session. Changes on every sign-in, sign-out and expiry.
  pub fn epoch(&self) -> u64 {
    self.state.read().epoch
  }

  pub fn is_current(&self, epoch: u64) -> bool {
    self.epoch() == epoch
  }

  /// The credential, as long as the session identified by `epoch` is still the current one.
  pub(crate) fn credential_for(&self, epoch: u64) -> Option<Credential> {
    let state = self.state.read();
    let credential = state.credential.clone().filter(|_| state.epoch == epoch);
    credential
  }

  pub fn sign_in_path(&self) -> &str {
    &self.sign_in_path
  }

  /// Replaces the sign-in path. Only meaningful before the gate is shared.
  pub(crate) fn with_sign_in_path(mut self, sign_in_path: &str) -> Self {
    self.sign_in_path = sign_in_path.into();
    self
  }

  /// The server rejected our credential: drop it and send the user to sign in.
  pub fn expire(&self, action: &str) {
    let had_credential = self.state.update(|s| s.replace(None)).is_some();
    event!(Level::WARN, %action, had_credential, "Session expired; redirecting to sign-in.");
    self.redirector.redirect_to_sign_in(&self.sign_in_path, action);
  }

  /// Like `expire`, but only while `epoch` is still the current session. Several calls
  /// rejected under the same session redirect once.
  pub(crate) fn expire_session(&self, epoch: u64, action: &str) {
    let current = self.state.update(|s| {
      let current = s.epoch == epoch && s.credential.is_some();
      if current {
        s.replace(None);
      }
      current
    });
    if current {
      event!(Level::WARN, %action, "Session expired; redirecting to sign-in.");
      self.redirector.redirect_to_sign_in(&self.sign_in_path, action);
    } else {
      event!(Level::DEBUG, %action, epoch, "Rejection from an ended session ignored.");
    }
  }

  /// Runs `f` with the current credential when signed in. Otherwise redirects exactly once,
  /// runs nothing and returns `Unauthorized`.
  pub fn require_auth<T>(&self, action: &str, f: impl FnOnce(&Credential) -> T) -> BasketResult<T> {
    // `f` runs without the session lock held.
    self.authorize(action).map(|(credential, _)| f(&credential))
  }

  /// The gate check, returning the credential together with the session it belongs to.
  pub(crate) fn authorize(&self, action: &str) -> BasketResult<(Credential, u64)> {
    let session = {
      let state = self.state.read();
      let epoch = state.epoch;
      state.credential.clone().map(|credential| (credential, epoch))
    };
    session.ok_or_else(|| {
      event!(Level::INFO, %action, "Blocked unauthenticated action.");
      self.redirector.redirect_to_sign_in(&self.sign_in_path, action);
      BasketError::Unauthorized
    })
  }
}

impl fmt::Debug for SessionGate {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("SessionGate")
      .field("authenticated", &self.is_authenticated())
      .field("epoch", &self.epoch())
      .field("sign_in_path", &self.sign_in_path)
      .finish()
  }
}
