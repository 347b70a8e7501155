// basket/src/remote/wire.rs

//! JSON shapes exchanged with the storefront API.
//!
//! The backend is not entirely consistent (`_id` vs `id`, `product` populated as an object,
//! `size` for the variant), so the item shape accepts the known aliases.

use crate::core::item::{ItemId, ItemStatus, ResourceItem};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// `{ success, data?, message? }`
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
  pub success: bool,
  pub data: Option<T>,
  #[serde(default)]
  pub message: Option<String>,
}

/// Body of a non-2xx response, when it is JSON at all.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
  #[serde(default)]
  pub message: Option<String>,
  #[serde(default)]
  pub error: Option<String>,
}

impl ErrorBody {
  pub fn parse(raw: &str) -> Option<String> {
    let body: ErrorBody = serde_json::from_str(raw).ok()?;
    body.message.or(body.error).filter(|m| !m.trim().is_empty())
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum ProductRef {
  Id(String),
  Populated {
    #[serde(alias = "_id")]
    id: String,
    #[serde(default)]
    price: Option<Decimal>,
  },
}

fn one() -> u32 {
  1
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireItem {
  #[serde(alias = "_id", default)]
  pub id: Option<String>,
  #[serde(alias = "product")]
  pub product_id: ProductRef,
  #[serde(default = "one")]
  pub quantity: u32,
  #[serde(alias = "price", default)]
  pub unit_price: Option<Decimal>,
  #[serde(alias = "size", default)]
  pub variant: Option<String>,
}

impl From<WireItem> for ResourceItem {
  fn from(wire: WireItem) -> Self {
    let (product_id, product_price) = match wire.product_id {
      ProductRef::Id(id) => (id, None),
      ProductRef::Populated { id, price } => (id, price),
    };
    ResourceItem {
      id: wire.id.map(ItemId::Server),
      product_id,
      quantity: wire.quantity,
      unit_price: wire.unit_price.or(product_price).unwrap_or(Decimal::ZERO),
      variant: wire.variant.filter(|v| !v.is_empty()),
      status: ItemStatus::Confirmed,
    }
  }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AddItemRequest<'a> {
  pub product_id: &'a str,
  pub quantity: u32,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub size: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub(crate) struct UpdateItemRequest {
  pub quantity: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ToggleRequest<'a> {
  pub product_id: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ToggleData {
  pub added: bool,
}
