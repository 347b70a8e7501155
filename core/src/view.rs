// basket/src/view.rs

//! Derived quantities over a `Snapshot`. Pure: no locking, no network.

use crate::cache::Snapshot;
use crate::core::item::{ResourceItem, ResourceKind};
use rust_decimal::Decimal;
use serde::Serialize;

/// Sum of quantities for a cart, number of entries for a wishlist.
pub fn total_item_count(snapshot: &Snapshot) -> u64 {
  match snapshot.kind {
    ResourceKind::Cart => snapshot.items.total_quantity(),
    ResourceKind::Wishlist => snapshot.items.len() as u64,
  }
}

/// Σ quantity × unit price, pending items included.
pub fn total_amount(snapshot: &Snapshot) -> Decimal {
  snapshot.items.total_amount()
}

pub fn find<'a>(snapshot: &'a Snapshot, product_id: &str, variant: Option<&str>) -> Option<&'a ResourceItem> {
  snapshot.items.iter().find(|i| i.matches(product_id, variant))
}

pub fn is_present(snapshot: &Snapshot, product_id: &str, variant: Option<&str>) -> bool {
  find(snapshot, product_id, variant).is_some()
}

/// Quantity of the entry for the key, zero when absent.
pub fn quantity_of(snapshot: &Snapshot, product_id: &str, variant: Option<&str>) -> u32 {
  find(snapshot, product_id, variant).map_or(0, |i| i.quantity)
}

/// Everything a badge or mini-cart needs, computed once per snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
  pub kind: ResourceKind,
  pub version: u64,
  pub total_item_count: u64,
  pub total_amount: Decimal,
  pub entries: usize,
  pub has_pending: bool,
}

impl Summary {
  pub fn of(snapshot: &Snapshot) -> Self {
    Self {
      kind: snapshot.kind,
      version: snapshot.version,
      total_item_count: total_item_count(snapshot),
      total_amount: total_amount(snapshot),
      entries: snapshot.items.len(),
      has_pending: snapshot.has_pending(),
    }
  }
}
