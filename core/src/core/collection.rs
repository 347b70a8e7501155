// basket/src/core/collection.rs

//! `ResourceCollection`: insertion-ordered items, unique by `ResourceKey`.

use crate::core::item::{ResourceItem, ResourceKey};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{event, Level};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ResourceCollection {
  items: Vec<ResourceItem>,
}

impl ResourceCollection {
  pub fn new() -> Self {
    Self::default()
  }

  /// Builds a collection from server data. Duplicate keys are merged into the first
  /// occurrence with their quantities summed.
  pub fn from_items(items: impl IntoIterator<Item = ResourceItem>) -> Self {
    let mut collection = Self::new();
    for item in items {
      if collection.contains(&item.key()) {
        event!(Level::WARN, key = %item.key(), "Server returned duplicate key; merging quantities.");
      }
      collection.add_merging(item);
    }
    collection
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, ResourceItem> {
    self.items.iter()
  }

  pub fn items(&self) -> &[ResourceItem] {
    &self.items
  }

  pub fn into_items(self) -> Vec<ResourceItem> {
    self.items
  }

  fn position(&self, key: &ResourceKey) -> Option<usize> {
    self
      .items
      .iter()
      .position(|i| i.matches(&key.product_id, key.variant.as_deref()))
  }

  pub fn contains(&self, key: &ResourceKey) -> bool {
    self.position(key).is_some()
  }

  pub fn get(&self, key: &ResourceKey) -> Option<&ResourceItem> {
    self.position(key).map(|idx| &self.items[idx])
  }

  /// Adds `item`, or increments the quantity of the existing entry with the same key.
  pub fn add_merging(&mut self, item: ResourceItem) {
    match self.position(&item.key()) {
      Some(idx) => {
        let existing = &mut self.items[idx];
        existing.quantity = existing.quantity.saturating_add(item.quantity);
      }
      None => self.items.push(item),
    }
  }

  /// Inserts `item`, replacing the entry with the same key in place. Returns the replaced entry.
  pub fn upsert(&mut self, item: ResourceItem) -> Option<ResourceItem> {
    match self.position(&item.key()) {
      Some(idx) => Some(std::mem::replace(&mut self.items[idx], item)),
      None => {
        self.items.push(item);
        None
      }
    }
  }

  pub fn remove(&mut self, key: &ResourceKey) -> Option<ResourceItem> {
    self.position(key).map(|idx| self.items.remove(idx))
  }

  pub fn clear(&mut self) {
    self.items.clear();
  }

  pub fn total_quantity(&self) -> u64 {
    self.items.iter().map(|i| u64::from(i.quantity)).sum()
  }

  pub fn total_amount(&self) -> Decimal {
    self.items.iter().map(ResourceItem::line_total).sum()
  }
}

impl<'a> IntoIterator for &'a ResourceCollection {
  type Item = &'a ResourceItem;
  type IntoIter = std::slice::Iter<'a, ResourceItem>;

  fn into_iter(self) -> Self::IntoIter {
    self.items.iter()
  }
}

impl FromIterator<ResourceItem> for ResourceCollection {
  fn from_iter<I: IntoIterator<Item = ResourceItem>>(iter: I) -> Self {
    Self::from_items(iter)
  }
}
