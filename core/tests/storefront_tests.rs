// tests/storefront_tests.rs
mod common;

use basket::{
  BasketError, Credential, Liveness, MutationOutcome, RemoteResource, ResourceItem, ResourceKey, ResourceKind,
  Storefront, StorefrontConfig,
};
use common::*;
use serial_test::serial;
use std::sync::Arc;

struct Shop {
  storefront: Storefront,
  cart: Arc<MockRemote>,
  wishlist: Arc<MockRemote>,
  notifier: Arc<RecordingNotifier>,
  redirector: Arc<RecordingRedirector>,
}

fn shop() -> Shop {
  let cart = MockRemote::new(ResourceKind::Cart);
  let wishlist = MockRemote::new(ResourceKind::Wishlist);
  let notifier = Arc::new(RecordingNotifier::default());
  let redirector = Arc::new(RecordingRedirector::default());
  let storefront = Storefront::builder(redirector.clone(), SIGN_IN_PATH)
    .notifier(notifier.clone())
    .build(cart.clone(), wishlist.clone())
    .unwrap();
  Shop {
    storefront,
    cart,
    wishlist,
    notifier,
    redirector,
  }
}

#[tokio::test]
#[serial]
async fn test_sign_in_loads_both_collections() {
  setup_tracing();
  let shop = shop();
  shop.cart.seed(vec![ResourceItem::confirmed("c1", "P1", None, 2, price(50_000))]);
  shop.wishlist.seed(vec![
    ResourceItem::confirmed("w1", "P7", None, 1, price(900)),
    ResourceItem::confirmed("w2", "P8", None, 1, price(100)),
  ]);

  shop.storefront.sign_in(Credential::bearer("token")).await.unwrap();

  let cart = shop.storefront.cart();
  assert_eq!(cart.total_item_count(), 2);
  assert_eq!(cart.total_amount(), price(100_000));
  assert_eq!(cart.quantity_of("P1", None), 2);

  let summary = shop.storefront.wishlist().summary();
  assert_eq!(summary.total_item_count, 2);
  assert!(shop.storefront.wishlist().is_present("P7", None));
  assert!(!shop.storefront.wishlist().is_present("P1", None));
}

#[tokio::test]
#[serial]
async fn test_load_reports_first_failure_but_loads_the_rest() {
  setup_tracing();
  let shop = shop();
  shop.storefront.session().sign_in(Credential::bearer("token"));
  shop.wishlist.seed(vec![ResourceItem::confirmed("w1", "P7", None, 1, price(900))]);
  shop.cart.fail_next("fetch", BasketError::network("offline"));

  let err = shop.storefront.load().await.unwrap_err();
  assert_eq!(err, BasketError::network("offline"));
  assert!(shop.storefront.wishlist().is_present("P7", None));
  assert_eq!(shop.notifier.messages(), vec!["Failed to load cart"]);
}

#[tokio::test]
#[serial]
async fn test_signed_out_storefront_redirects_on_every_entry_point() {
  setup_tracing();
  let shop = shop();
  let liveness = Liveness::detached();
  let cart = shop.storefront.cart();

  assert!(cart.add("P1", None, 1, price(10), &liveness).is_err());
  assert!(cart
    .update_quantity(ResourceKey::product("P1"), 2, &liveness)
    .is_err());
  assert_eq!(cart.remove_by_id("c1", &liveness).unwrap_err(), BasketError::Unauthorized);
  assert_eq!(
    shop
      .storefront
      .wishlist()
      .toggle("P1", price(10), &liveness)
      .unwrap_err(),
    BasketError::Unauthorized
  );

  assert_eq!(shop.redirector.count(), 4);
  assert_eq!(cart.snapshot().version, 0);
  assert!(shop.cart.calls().is_empty());
  assert!(shop.wishlist.calls().is_empty());
}

#[tokio::test]
#[serial]
async fn test_id_addressed_mutations() {
  setup_tracing();
  let shop = shop();
  shop.cart.seed(vec![
    ResourceItem::confirmed("c1", "P1", None, 2, price(50_000)),
    ResourceItem::confirmed("c2", "P2", Some("M".to_string()), 1, price(1_000)),
  ]);
  shop.storefront.sign_in(Credential::bearer("token")).await.unwrap();
  let cart = shop.storefront.cart();
  let liveness = Liveness::detached();

  let ticket = cart.update_quantity_by_id("c2", 3, &liveness).unwrap();
  assert_eq!(ticket.key, ResourceKey::with_variant("P2", "M"));
  assert!(ticket.outcome().await.is_confirmed());
  assert_eq!(cart.quantity_of("P2", Some("M")), 3);

  let ticket = cart.remove_by_id("c1", &liveness).unwrap();
  assert_eq!(ticket.outcome().await, MutationOutcome::Confirmed(None));
  assert!(!cart.is_present("P1", None));

  let err = cart.remove_by_id("c404", &liveness).unwrap_err();
  assert_eq!(
    err,
    BasketError::ItemNotFound {
      target: "c404".to_string()
    }
  );
}

#[tokio::test]
#[serial]
async fn test_add_then_subscribe_sees_counts() {
  setup_tracing();
  let shop = shop();
  shop.storefront.sign_in(Credential::bearer("token")).await.unwrap();
  let cart = shop.storefront.cart();
  let mut updates = cart.subscribe();

  let ticket = cart.add("P1", Some("XL"), 2, price(50_000), &Liveness::detached()).unwrap();
  assert_eq!(cart.summary().total_item_count, 2);
  assert!(cart.summary().has_pending);
  ticket.outcome().await;

  updates.changed().await.unwrap();
  let latest = updates.borrow_and_update().clone();
  assert_eq!(latest.items.len(), 1);
  assert!(!cart.summary().has_pending);
  assert_eq!(cart.quantity_of("P1", Some("XL")), 2);
  assert_eq!(cart.quantity_of("P1", None), 0);
}

#[tokio::test]
#[serial]
async fn test_sign_out_clears_both_collections() {
  setup_tracing();
  let shop = shop();
  shop.cart.seed(vec![ResourceItem::confirmed("c1", "P1", None, 2, price(50_000))]);
  shop.wishlist.seed(vec![ResourceItem::confirmed("w1", "P7", None, 1, price(900))]);
  shop.storefront.sign_in(Credential::bearer("token")).await.unwrap();

  shop.storefront.sign_out();
  assert!(!shop.storefront.session().is_authenticated());
  assert!(shop.storefront.cart().snapshot().items.is_empty());
  assert!(shop.storefront.wishlist().snapshot().items.is_empty());
}

#[test]
fn test_build_rejects_swapped_remotes() {
  let cart: Arc<dyn RemoteResource> = MockRemote::new(ResourceKind::Cart);
  let wishlist: Arc<dyn RemoteResource> = MockRemote::new(ResourceKind::Wishlist);
  let result = Storefront::builder(Arc::new(RecordingRedirector::default()), SIGN_IN_PATH).build(wishlist, cart);
  assert!(matches!(result, Err(BasketError::Config(_))));
}

#[test]
fn test_build_http_from_config() {
  let config = StorefrontConfig::new("http://localhost:4000/api").with_sign_in_path("/login");
  let storefront = Storefront::builder(Arc::new(RecordingRedirector::default()), SIGN_IN_PATH)
    .build_http(&config)
    .unwrap();
  assert_eq!(storefront.cart().kind(), ResourceKind::Cart);
  assert_eq!(storefront.wishlist().kind(), ResourceKind::Wishlist);
  assert_eq!(storefront.session().sign_in_path(), "/login");
}

#[tokio::test]
#[serial]
async fn test_configured_sign_in_path_reaches_the_redirect() {
  setup_tracing();
  let redirector = Arc::new(RecordingRedirector::default());
  let config = StorefrontConfig::new("http://localhost:4000/api").with_sign_in_path("/account/login");
  let storefront = Storefront::builder(redirector.clone(), SIGN_IN_PATH)
    .build_http(&config)
    .unwrap();

  let err = storefront
    .cart()
    .add("P1", None, 1, price(10), &Liveness::detached())
    .unwrap_err();
  assert_eq!(err, BasketError::Unauthorized);
  assert_eq!(redirector.last_path().as_deref(), Some("/account/login"));
}

#[test]
fn test_build_http_rejects_unparseable_base_url() {
  let config = StorefrontConfig::new("not a url");
  let result = Storefront::builder(Arc::new(RecordingRedirector::default()), SIGN_IN_PATH).build_http(&config);
  assert!(matches!(result, Err(BasketError::Config(_))));
}
