// basket/src/core/item.rs

//! Item-level types: the resource key, ids, and `ResourceItem` itself.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Which remote collection a store is synchronizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
  Cart,
  Wishlist,
}

impl ResourceKind {
  /// Path segment of the collection endpoint, without leading slash.
  pub fn path(&self) -> &'static str {
    match self {
      ResourceKind::Cart => "cart",
      ResourceKind::Wishlist => "wishlist",
    }
  }

  /// Whether entries carry a meaningful quantity.
  pub fn has_quantity(&self) -> bool {
    matches!(self, ResourceKind::Cart)
  }
}

impl fmt::Display for ResourceKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.path())
  }
}

/// Logical identity of an entry, independent of the server-assigned id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceKey {
  pub product_id: String,
  pub variant: Option<String>,
}

impl ResourceKey {
  pub fn new(product_id: impl Into<String>, variant: Option<String>) -> Self {
    Self {
      product_id: product_id.into(),
      variant,
    }
  }

  pub fn product(product_id: impl Into<String>) -> Self {
    Self::new(product_id, None)
  }

  pub fn with_variant(product_id: impl Into<String>, variant: impl Into<String>) -> Self {
    Self::new(product_id, Some(variant.into()))
  }
}

impl fmt::Display for ResourceKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.variant {
      Some(variant) => write!(f, "{} ({})", self.product_id, variant),
      None => f.write_str(&self.product_id),
    }
  }
}

/// Server-assigned id, or a local token minted for an optimistic item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemId {
  Server(String),
  Local(Uuid),
}

impl ItemId {
  pub fn local() -> Self {
    ItemId::Local(Uuid::new_v4())
  }

  pub fn is_server(&self) -> bool {
    matches!(self, ItemId::Server(_))
  }

  /// The id usable in a request path. Local tokens have none.
  pub fn server_id(&self) -> Option<&str> {
    match self {
      ItemId::Server(id) => Some(id),
      ItemId::Local(_) => None,
    }
  }
}

impl fmt::Display for ItemId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ItemId::Server(id) => f.write_str(id),
      ItemId::Local(token) => write!(f, "local-{}", token),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
  /// Shown optimistically, not yet acknowledged by the server.
  Pending,
  #[default]
  Confirmed,
}

/// A cart line or wishlist entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceItem {
  pub id: Option<ItemId>,
  pub product_id: String,
  pub quantity: u32,
  pub unit_price: Decimal,
  pub variant: Option<String>,
  #[serde(default)]
  pub status: ItemStatus,
}

impl ResourceItem {
  /// A confirmed item as returned by the server.
  pub fn confirmed(
    id: impl Into<String>,
    product_id: impl Into<String>,
    variant: Option<String>,
    quantity: u32,
    unit_price: Decimal,
  ) -> Self {
    Self {
      id: Some(ItemId::Server(id.into())),
      product_id: product_id.into(),
      quantity,
      unit_price,
      variant,
      status: ItemStatus::Confirmed,
    }
  }

  /// A fresh optimistic item carrying a local token.
  pub fn pending(key: &ResourceKey, quantity: u32, unit_price: Decimal) -> Self {
    Self {
      id: Some(ItemId::local()),
      product_id: key.product_id.clone(),
      quantity,
      unit_price,
      variant: key.variant.clone(),
      status: ItemStatus::Pending,
    }
  }

  pub fn key(&self) -> ResourceKey {
    ResourceKey::new(self.product_id.clone(), self.variant.clone())
  }

  pub fn matches(&self, product_id: &str, variant: Option<&str>) -> bool {
    self.product_id == product_id && self.variant.as_deref() == variant
  }

  pub fn is_pending(&self) -> bool {
    self.status == ItemStatus::Pending
  }

  pub fn line_total(&self) -> Decimal {
    self.unit_price * Decimal::from(self.quantity)
  }

  /// The server id of this item, if it has been persisted.
  pub fn server_id(&self) -> Option<&str> {
    self.id.as_ref().and_then(ItemId::server_id)
  }
}
