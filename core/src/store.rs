// basket/src/store.rs

//! The injectable root object (`Storefront`) and the per-collection facade (`ResourceStore`).
//!
//! The application root builds one `Storefront` and passes it (or the `ResourceStore`s it owns)
//! down to whatever needs the cart or wishlist. There is no global instance.

use crate::applier::{MutationApplier, MutationTicket};
use crate::cache::Snapshot;
use crate::config::{StorefrontConfig, DEFAULT_REQUEST_TIMEOUT};
use crate::core::item::{ResourceKey, ResourceKind};
use crate::core::mutation::MutationKind;
use crate::error::{BasketError, BasketResult};
use crate::notify::{Effects, Liveness, LogNotifier, Notifier};
use crate::remote::{HttpRemote, RemoteResource};
use crate::session::{Credential, Redirector, SessionGate};
use crate::view::{self, Summary};

use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{event, instrument, Level};

/// Entry points for one collection. Every mutation goes through the session gate first.
#[derive(Clone)]
pub struct ResourceStore {
  applier: MutationApplier,
}

impl ResourceStore {
  pub fn new(applier: MutationApplier) -> Self {
    Self { applier }
  }

  pub fn kind(&self) -> ResourceKind {
    self.applier.kind()
  }

  pub fn applier(&self) -> &MutationApplier {
    &self.applier
  }

  /// Rehydrates from the server (`fetchCollection`).
  pub async fn refresh(&self) -> BasketResult<Snapshot> {
    self.applier.refresh().await
  }

  /// Adds `quantity` units of a product (merging into an existing entry for the same variant).
  pub fn add(
    &self,
    product_id: &str,
    variant: Option<&str>,
    quantity: u32,
    unit_price: Decimal,
    liveness: &Liveness,
  ) -> BasketResult<MutationTicket> {
    self.applier.submit(
      ResourceKey::new(product_id, variant.map(str::to_string)),
      MutationKind::Add { quantity, unit_price },
      liveness.clone(),
    )
  }

  /// Sets the quantity of an entry. Zero removes it.
  pub fn update_quantity(&self, key: ResourceKey, quantity: u32, liveness: &Liveness) -> BasketResult<MutationTicket> {
    self
      .applier
      .submit(key, MutationKind::UpdateQuantity { quantity }, liveness.clone())
  }

  pub fn remove(&self, key: ResourceKey, liveness: &Liveness) -> BasketResult<MutationTicket> {
    self.applier.submit(key, MutationKind::Remove, liveness.clone())
  }

  /// Same as `update_quantity`, addressed by the server id shown in the UI.
  pub fn update_quantity_by_id(&self, item_id: &str, quantity: u32, liveness: &Liveness) -> BasketResult<MutationTicket> {
    let key = self.key_for_id("update_quantity", item_id)?;
    self.update_quantity(key, quantity, liveness)
  }

  /// Same as `remove`, addressed by the server id shown in the UI.
  pub fn remove_by_id(&self, item_id: &str, liveness: &Liveness) -> BasketResult<MutationTicket> {
    let key = self.key_for_id("remove", item_id)?;
    self.remove(key, liveness)
  }

  /// Flips wishlist membership for a product.
  pub fn toggle(&self, product_id: &str, unit_price: Decimal, liveness: &Liveness) -> BasketResult<MutationTicket> {
    self
      .applier
      .submit(ResourceKey::product(product_id), MutationKind::Toggle { unit_price }, liveness.clone())
  }

  fn key_for_id(&self, action: &str, item_id: &str) -> BasketResult<ResourceKey> {
    // Gate before looking anything up so a signed-out user gets the redirect, not a lookup error.
    self.applier.gate().require_auth(action, |_| ())?;
    self
      .snapshot()
      .items
      .iter()
      .find(|item| item.server_id() == Some(item_id))
      .map(|item| item.key())
      .ok_or_else(|| BasketError::ItemNotFound {
        target: item_id.to_string(),
      })
  }

  pub fn snapshot(&self) -> Snapshot {
    self.applier.snapshot()
  }

  pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
    self.applier.subscribe()
  }

  pub fn summary(&self) -> Summary {
    Summary::of(&self.snapshot())
  }

  pub fn total_item_count(&self) -> u64 {
    view::total_item_count(&self.snapshot())
  }

  pub fn total_amount(&self) -> Decimal {
    view::total_amount(&self.snapshot())
  }

  pub fn is_present(&self, product_id: &str, variant: Option<&str>) -> bool {
    view::is_present(&self.snapshot(), product_id, variant)
  }

  pub fn quantity_of(&self, product_id: &str, variant: Option<&str>) -> u32 {
    view::quantity_of(&self.snapshot(), product_id, variant)
  }
}

/// The application's single shared cart + wishlist cache.
#[derive(Clone)]
pub struct Storefront {
  gate: SessionGate,
  cart: ResourceStore,
  wishlist: ResourceStore,
}

pub struct StorefrontBuilder {
  gate: SessionGate,
  notifier: Arc<dyn Notifier>,
  effects: Option<Arc<dyn Effects>>,
  request_timeout: Duration,
}

impl StorefrontBuilder {
  pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
    self.notifier = notifier;
    self
  }

  pub fn effects(mut self, effects: Arc<dyn Effects>) -> Self {
    self.effects = Some(effects);
    self
  }

  pub fn request_timeout(mut self, timeout: Duration) -> Self {
    self.request_timeout = timeout;
    self
  }

  /// Builds against the REST API described by `config`. Its sign-in path replaces the one
  /// given to `Storefront::builder`.
  pub fn build_http(mut self, config: &StorefrontConfig) -> BasketResult<Storefront> {
    self.gate = self.gate.with_sign_in_path(&config.sign_in_path);
    let cart = Arc::new(HttpRemote::new(config, ResourceKind::Cart)?);
    let wishlist = Arc::new(HttpRemote::new(config, ResourceKind::Wishlist)?);
    self.request_timeout(config.request_timeout).build(cart, wishlist)
  }

  /// Builds over arbitrary remotes (tests, alternative transports).
  pub fn build(
    self,
    cart_remote: Arc<dyn RemoteResource>,
    wishlist_remote: Arc<dyn RemoteResource>,
  ) -> BasketResult<Storefront> {
    if cart_remote.kind() != ResourceKind::Cart || wishlist_remote.kind() != ResourceKind::Wishlist {
      return Err(BasketError::Config(format!(
        "expected cart and wishlist remotes, got {} and {}",
        cart_remote.kind(),
        wishlist_remote.kind()
      )));
    }
    let store_for = |remote: Arc<dyn RemoteResource>| {
      ResourceStore::new(
        MutationApplier::builder(remote, self.gate.clone())
          .notifier(Arc::clone(&self.notifier))
          .effects(self.effects.clone())
          .request_timeout(self.request_timeout)
          .build(),
      )
    };
    let cart = store_for(cart_remote);
    let wishlist = store_for(wishlist_remote);
    Ok(Storefront {
      gate: self.gate.clone(),
      cart,
      wishlist,
    })
  }
}

impl Storefront {
  pub fn builder(redirector: Arc<dyn Redirector>, sign_in_path: impl Into<String>) -> StorefrontBuilder {
    StorefrontBuilder {
      gate: SessionGate::new(redirector, sign_in_path),
      notifier: Arc::new(LogNotifier),
      effects: None,
      request_timeout: DEFAULT_REQUEST_TIMEOUT,
    }
  }

  pub fn session(&self) -> &SessionGate {
    &self.gate
  }

  pub fn cart(&self) -> &ResourceStore {
    &self.cart
  }

  pub fn wishlist(&self) -> &ResourceStore {
    &self.wishlist
  }

  /// Starts a new session: forgets whatever the previous one left behind, then rehydrates
  /// both collections.
  pub async fn sign_in(&self, credential: Credential) -> BasketResult<()> {
    self.gate.sign_in(credential);
    self.reset_collections();
    self.load().await
  }

  /// Rehydrates cart and wishlist concurrently. Both are attempted; the first error is returned.
  #[instrument(name = "Storefront::load", skip(self), err(Display))]
  pub async fn load(&self) -> BasketResult<()> {
    let (cart, wishlist) = tokio::join!(self.cart.refresh(), self.wishlist.refresh());
    event!(
      Level::DEBUG,
      cart_ok = cart.is_ok(),
      wishlist_ok = wishlist.is_ok(),
      "Storefront collections loaded."
    );
    cart?;
    wishlist?;
    Ok(())
  }

  /// Drops the credential and forgets both collections.
  /// Pending mutations of the session are abandoned.
  pub fn sign_out(&self) {
    self.gate.sign_out();
    self.reset_collections();
  }

  fn reset_collections(&self) {
    self.cart.applier().reset();
    self.wishlist.applier().reset();
  }
}
