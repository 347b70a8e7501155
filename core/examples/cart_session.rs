// basket/examples/cart_session.rs

use async_trait::async_trait;
use basket::{
  BasketError, BasketResult, Credential, LogNotifier, LogRedirector, Mount, MutationOutcome, RemoteResource,
  ResourceItem, ResourceKind, Storefront,
};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;

// 1. A backend kept in memory. A real application would use `Storefront::builder(..).build_http(&config)`.
struct InMemoryBackend {
  kind: ResourceKind,
  items: Mutex<Vec<ResourceItem>>,
}

impl InMemoryBackend {
  fn new(kind: ResourceKind) -> Arc<Self> {
    Arc::new(Self {
      kind,
      items: Mutex::new(Vec::new()),
    })
  }
}

#[async_trait]
impl RemoteResource for InMemoryBackend {
  fn kind(&self) -> ResourceKind {
    self.kind
  }

  async fn fetch_collection(&self, _credential: &Credential) -> BasketResult<Vec<ResourceItem>> {
    Ok(self.items.lock().clone())
  }

  async fn add_item(
    &self,
    _credential: &Credential,
    product_id: &str,
    quantity: u32,
    variant: Option<&str>,
  ) -> BasketResult<ResourceItem> {
    let mut items = self.items.lock();
    if let Some(existing) = items.iter_mut().find(|i| i.matches(product_id, variant)) {
      existing.quantity += quantity;
      return Ok(existing.clone());
    }
    let item = ResourceItem::confirmed(
      format!("c{}", items.len() + 1),
      product_id,
      variant.map(str::to_string),
      quantity,
      Decimal::from(50_000),
    );
    items.push(item.clone());
    Ok(item)
  }

  async fn remove_item(&self, _credential: &Credential, _item_id: &str) -> BasketResult<()> {
    // Simulate a flaky connection: removals never go through.
    Err(BasketError::network("connection reset by peer"))
  }

  async fn toggle_item(&self, _credential: &Credential, product_id: &str) -> BasketResult<bool> {
    let mut items = self.items.lock();
    let before = items.len();
    items.retain(|i| i.product_id != product_id);
    if items.len() < before {
      return Ok(false);
    }
    items.push(ResourceItem::confirmed(format!("w{}", before + 1), product_id, None, 1, Decimal::from(9_900)));
    Ok(true)
  }
}

#[tokio::main]
async fn main() -> Result<(), BasketError> {
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

  info!("--- Cart Session Example ---");

  // 2. Build the root object once and share it.
  let storefront = Storefront::builder(Arc::new(LogRedirector), "/signin")
    .notifier(Arc::new(LogNotifier))
    .build(
      InMemoryBackend::new(ResourceKind::Cart),
      InMemoryBackend::new(ResourceKind::Wishlist),
    )?;
  let cart = storefront.cart();

  // 3. Signed out: the gate redirects and nothing changes.
  let mount = Mount::new();
  let blocked = cart.add("P1", None, 1, Decimal::from(50_000), &mount.liveness());
  info!("Signed-out add: {:?}", blocked.err());

  // 4. Sign in (loads both collections) and add with optimistic feedback.
  storefront.sign_in(Credential::bearer("demo-token")).await?;
  let ticket = cart.add("P1", None, 1, Decimal::from(50_000), &mount.liveness())?;
  info!("Optimistic count: {}", cart.total_item_count());
  ticket.outcome().await;

  let ticket = cart.add("P1", None, 2, Decimal::from(50_000), &mount.liveness())?;
  ticket.outcome().await;
  info!("Confirmed count: {}, total: {}", cart.total_item_count(), cart.total_amount());

  // 5. A failing removal rolls back.
  let ticket = cart.remove_by_id("c1", &mount.liveness())?;
  info!("During removal: present = {}", cart.is_present("P1", None));
  if let MutationOutcome::RolledBack(err) = ticket.outcome().await {
    info!("Removal rolled back ({}); quantity = {}", err, cart.quantity_of("P1", None));
  }

  // 6. Wishlist toggles.
  let wishlist = storefront.wishlist();
  wishlist.toggle("P9", Decimal::from(9_900), &mount.liveness())?.outcome().await;
  info!("Wishlist has P9: {}", wishlist.is_present("P9", None));

  assert_eq!(cart.quantity_of("P1", None), 3);
  assert_eq!(cart.total_amount(), Decimal::from(150_000));

  storefront.sign_out();
  info!("After sign-out: {:?}", cart.summary());
  Ok(())
}
