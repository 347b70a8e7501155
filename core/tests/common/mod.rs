// tests/common/mod.rs
#![allow(dead_code)] // Allow unused code in this common test module

use async_trait::async_trait;
use basket::{
  BasketError, BasketResult, Credential, Effects, MutationApplier, Notification, Notifier, Redirector, ResourceItem,
  ResourceKey, ResourceKind, SessionGate,
};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::Level;

pub const SIGN_IN_PATH: &str = "/signin";

pub fn price(units: i64) -> Decimal {
  Decimal::from(units)
}

// --- In-memory backend ---

/// A `RemoteResource` that behaves like the storefront backend, with scripted failures,
/// an optional artificial delay and a "hold" switch that parks calls until released.
pub struct MockRemote {
  kind: ResourceKind,
  server: Mutex<Vec<ResourceItem>>,
  failures: Mutex<VecDeque<(&'static str, BasketError)>>,
  held: Mutex<Option<Arc<Semaphore>>>,
  delay: Mutex<Option<Duration>>,
  calls: Mutex<Vec<String>>,
  next_id: AtomicU64,
}

impl MockRemote {
  pub fn new(kind: ResourceKind) -> Arc<Self> {
    Arc::new(Self {
      kind,
      server: Mutex::new(Vec::new()),
      failures: Mutex::new(VecDeque::new()),
      held: Mutex::new(None),
      delay: Mutex::new(None),
      calls: Mutex::new(Vec::new()),
      next_id: AtomicU64::new(0),
    })
  }

  /// Replaces server-side state.
  pub fn seed(&self, items: Vec<ResourceItem>) {
    *self.server.lock() = items;
  }

  pub fn server_items(&self) -> Vec<ResourceItem> {
    self.server.lock().clone()
  }

  /// The next call of `operation` ("fetch", "add", "update", "remove", "toggle") fails with `error`.
  pub fn fail_next(&self, operation: &'static str, error: BasketError) {
    self.failures.lock().push_back((operation, error));
  }

  /// Parks every following call until `release` hands out a turn.
  pub fn hold(&self) {
    *self.held.lock() = Some(Arc::new(Semaphore::new(0)));
  }

  pub fn release(&self, calls: usize) {
    if let Some(turns) = self.held.lock().as_ref() {
      turns.add_permits(calls);
    }
  }

  /// Stops holding; parked calls proceed.
  pub fn open(&self) {
    if let Some(turns) = self.held.lock().take() {
      turns.close();
    }
  }

  pub fn set_delay(&self, delay: Duration) {
    *self.delay.lock() = Some(delay);
  }

  pub fn calls(&self) -> Vec<String> {
    self.calls.lock().clone()
  }

  fn mint_id(&self) -> String {
    let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
    match self.kind {
      ResourceKind::Cart => format!("c{}", n),
      ResourceKind::Wishlist => format!("w{}", n),
    }
  }

  async fn enter(&self, call: String, operation: &'static str) -> BasketResult<()> {
    self.calls.lock().push(call);
    let turns = self.held.lock().clone();
    if let Some(turns) = turns {
      // A closed semaphore means the hold was lifted.
      if let Ok(permit) = turns.acquire().await {
        permit.forget();
      }
    }
    let delay = *self.delay.lock();
    if let Some(delay) = delay {
      tokio::time::sleep(delay).await;
    }
    let mut failures = self.failures.lock();
    if failures.front().is_some_and(|(op, _)| *op == operation) {
      if let Some((_, error)) = failures.pop_front() {
        return Err(error);
      }
    }
    Ok(())
  }
}

#[async_trait]
impl basket::RemoteResource for MockRemote {
  fn kind(&self) -> ResourceKind {
    self.kind
  }

  async fn fetch_collection(&self, _credential: &Credential) -> BasketResult<Vec<ResourceItem>> {
    self.enter("fetch".to_string(), "fetch").await?;
    Ok(self.server.lock().clone())
  }

  async fn add_item(
    &self,
    _credential: &Credential,
    product_id: &str,
    quantity: u32,
    variant: Option<&str>,
  ) -> BasketResult<ResourceItem> {
    self.enter(format!("add:{}:{}", product_id, quantity), "add").await?;
    let mut server = self.server.lock();
    if let Some(existing) = server.iter_mut().find(|i| i.matches(product_id, variant)) {
      existing.quantity += quantity;
      return Ok(existing.clone());
    }
    // Price is whatever the catalogue says; tests seed 50000 for everything.
    let item = ResourceItem::confirmed(
      self.mint_id(),
      product_id,
      variant.map(str::to_string),
      quantity,
      price(50_000),
    );
    server.push(item.clone());
    Ok(item)
  }

  async fn update_item(&self, _credential: &Credential, item_id: &str, quantity: u32) -> BasketResult<ResourceItem> {
    self.enter(format!("update:{}:{}", item_id, quantity), "update").await?;
    let mut server = self.server.lock();
    match server.iter_mut().find(|i| i.server_id() == Some(item_id)) {
      Some(existing) => {
        existing.quantity = quantity;
        Ok(existing.clone())
      }
      None => Err(BasketError::conflict("Item not found")),
    }
  }

  async fn remove_item(&self, _credential: &Credential, item_id: &str) -> BasketResult<()> {
    self.enter(format!("remove:{}", item_id), "remove").await?;
    let mut server = self.server.lock();
    let before = server.len();
    server.retain(|i| i.server_id() != Some(item_id));
    if server.len() == before {
      return Err(BasketError::conflict("Item not found"));
    }
    Ok(())
  }

  async fn toggle_item(&self, _credential: &Credential, product_id: &str) -> BasketResult<bool> {
    self.enter(format!("toggle:{}", product_id), "toggle").await?;
    let mut server = self.server.lock();
    if server.iter().any(|i| i.product_id == product_id) {
      server.retain(|i| i.product_id != product_id);
      Ok(false)
    } else {
      let item = ResourceItem::confirmed(self.mint_id(), product_id, None, 1, price(50_000));
      server.push(item);
      Ok(true)
    }
  }
}

// --- Recording collaborators ---

#[derive(Default)]
pub struct RecordingNotifier {
  seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
  pub fn all(&self) -> Vec<Notification> {
    self.seen.lock().clone()
  }

  pub fn messages(&self) -> Vec<String> {
    self.seen.lock().iter().map(|n| n.message.clone()).collect()
  }

  pub fn failures(&self) -> Vec<Notification> {
    self.seen.lock().iter().filter(|n| n.is_failure()).cloned().collect()
  }

  pub fn count(&self) -> usize {
    self.seen.lock().len()
  }
}

impl Notifier for RecordingNotifier {
  fn notify(&self, notification: Notification) {
    tracing::debug!(target: "test_notifier", message = %notification.message, "recorded");
    self.seen.lock().push(notification);
  }
}

#[derive(Default)]
pub struct RecordingRedirector {
  redirects: Mutex<Vec<(String, String)>>,
}

impl RecordingRedirector {
  pub fn count(&self) -> usize {
    self.redirects.lock().len()
  }

  pub fn actions(&self) -> Vec<String> {
    self.redirects.lock().iter().map(|(_, action)| action.clone()).collect()
  }

  pub fn last_path(&self) -> Option<String> {
    self.redirects.lock().last().map(|(path, _)| path.clone())
  }
}

impl Redirector for RecordingRedirector {
  fn redirect_to_sign_in(&self, sign_in_path: &str, action: &str) {
    self.redirects.lock().push((sign_in_path.to_string(), action.to_string()));
  }
}

#[derive(Default)]
pub struct CountingEffects {
  pub added: AtomicUsize,
}

impl Effects for CountingEffects {
  fn item_added(&self, _resource: ResourceKind, _item: &ResourceItem) {
    self.added.fetch_add(1, Ordering::SeqCst);
  }
}

// --- Harness ---

pub struct Harness {
  pub applier: MutationApplier,
  pub remote: Arc<MockRemote>,
  pub notifier: Arc<RecordingNotifier>,
  pub redirector: Arc<RecordingRedirector>,
  pub gate: SessionGate,
}

impl Harness {
  pub fn signed_in(kind: ResourceKind) -> Self {
    let harness = Self::signed_out(kind);
    harness.gate.sign_in(Credential::bearer("test-token"));
    harness
  }

  pub fn signed_out(kind: ResourceKind) -> Self {
    Self::with_timeout(kind, Duration::from_secs(5))
  }

  pub fn with_timeout(kind: ResourceKind, timeout: Duration) -> Self {
    let remote = MockRemote::new(kind);
    let notifier = Arc::new(RecordingNotifier::default());
    let redirector = Arc::new(RecordingRedirector::default());
    let gate = SessionGate::new(redirector.clone(), SIGN_IN_PATH);
    let applier = MutationApplier::builder(remote.clone(), gate.clone())
      .notifier(notifier.clone())
      .request_timeout(timeout)
      .build();
    Self {
      applier,
      remote,
      notifier,
      redirector,
      gate,
    }
  }

  pub fn quantity(&self, key: &ResourceKey) -> Option<u32> {
    self.applier.snapshot().get(key).map(|i| i.quantity)
  }
}

// --- Helper for Tracing Setup (call once per test run if needed) ---
use once_cell::sync::Lazy;
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer() // Important for tests to capture output
    .try_init()
    .ok(); // Allow multiple initializations in tests (ok if fails)
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

/// Polls `condition` until it holds, failing the test after about a second.
pub async fn eventually(mut condition: impl FnMut() -> bool) {
  for _ in 0..200 {
    if condition() {
      return;
    }
    tokio::time::sleep(Duration::from_millis(5)).await;
  }
  panic!("condition not met in time");
}
