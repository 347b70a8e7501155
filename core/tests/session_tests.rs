// tests/session_tests.rs
mod common;

use basket::{BasketError, Credential, SessionGate};
use common::*;
use serial_test::serial;
use std::sync::Arc;

fn gate() -> (SessionGate, Arc<RecordingRedirector>) {
  let redirector = Arc::new(RecordingRedirector::default());
  (SessionGate::new(redirector.clone(), SIGN_IN_PATH), redirector)
}

#[test]
#[serial]
fn test_require_auth_blocks_and_redirects_once() {
  setup_tracing();
  let (gate, redirector) = gate();
  let mut ran = false;

  let result = gate.require_auth("checkout", |_| ran = true);
  assert_eq!(result, Err(BasketError::Unauthorized));
  assert!(!ran);
  assert_eq!(redirector.count(), 1);
  assert_eq!(redirector.actions(), vec!["checkout"]);
  assert_eq!(redirector.last_path().as_deref(), Some(SIGN_IN_PATH));
}

#[test]
#[serial]
fn test_require_auth_passes_credential_when_signed_in() {
  setup_tracing();
  let (gate, redirector) = gate();
  gate.sign_in(Credential::bearer("abc"));

  let token = gate.require_auth("add", |credential| credential.token().to_string());
  assert_eq!(token, Ok("abc".to_string()));
  assert_eq!(redirector.count(), 0);
  assert!(gate.is_authenticated());
}

#[test]
#[serial]
fn test_clones_share_the_session() {
  setup_tracing();
  let (gate, _) = gate();
  let other = gate.clone();
  other.sign_in(Credential::bearer("abc"));
  assert!(gate.is_authenticated());

  gate.sign_out();
  assert!(!other.is_authenticated());
  assert_eq!(other.credential(), None);
}

#[test]
#[serial]
fn test_expire_drops_credential_and_redirects() {
  setup_tracing();
  let (gate, redirector) = gate();
  gate.sign_in(Credential::bearer("abc"));

  gate.expire("remove");
  assert!(!gate.is_authenticated());
  assert_eq!(redirector.actions(), vec!["remove"]);
}

#[test]
#[serial]
fn test_every_session_change_starts_a_new_epoch() {
  setup_tracing();
  let (gate, _) = gate();
  let signed_out = gate.epoch();

  gate.sign_in(Credential::bearer("user-a"));
  let first = gate.epoch();
  assert_ne!(first, signed_out);
  assert!(gate.is_current(first));

  gate.sign_out();
  assert!(!gate.is_current(first));

  gate.sign_in(Credential::bearer("user-b"));
  let second = gate.epoch();
  assert_ne!(second, first);

  gate.expire("add");
  assert!(!gate.is_current(second));
}

#[test]
fn test_credential_debug_is_redacted() {
  let credential = Credential::bearer("super-secret");
  let printed = format!("{:?}", credential);
  assert!(!printed.contains("super-secret"));

  let (gate, _) = gate();
  gate.sign_in(credential);
  let printed = format!("{:?}", gate);
  assert!(printed.contains("authenticated: true"));
  assert!(!printed.contains("super-secret"));
}
