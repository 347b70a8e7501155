// basket/src/cache.rs

//! The local resource cache: last confirmed server state with optimistic overlays on top.
//!
//! The cache itself never talks to the network. It is mutated only by the applier
//! (`crate::applier`), everything else receives `Snapshot` values.

use crate::core::collection::ResourceCollection;
use crate::core::item::{ItemStatus, ResourceItem, ResourceKey, ResourceKind};
use serde::Serialize;
use tracing::{event, Level};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Overlay {
  /// Optimistic add/update; shown instead of (or in addition to) the confirmed entry.
  Upsert(ResourceItem),
  /// Optimistic removal; hides the confirmed entry.
  Tombstone,
}

/// Read-only view of the cache at one version. Pending items are flagged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
  pub kind: ResourceKind,
  pub version: u64,
  pub items: ResourceCollection,
}

impl Snapshot {
  pub fn empty(kind: ResourceKind) -> Self {
    Self {
      kind,
      version: 0,
      items: ResourceCollection::new(),
    }
  }

  pub fn get(&self, key: &ResourceKey) -> Option<&ResourceItem> {
    self.items.get(key)
  }

  pub fn has_pending(&self) -> bool {
    self.items.iter().any(ResourceItem::is_pending)
  }
}

#[derive(Debug)]
pub struct LocalResourceCache {
  kind: ResourceKind,
  confirmed: ResourceCollection,
  // Insertion ordered; at most one entry per key.
  overlay: Vec<(ResourceKey, Overlay)>,
  version: u64,
}

impl LocalResourceCache {
  pub fn new(kind: ResourceKind) -> Self {
    Self {
      kind,
      confirmed: ResourceCollection::new(),
      overlay: Vec::new(),
      version: 0,
    }
  }

  pub fn kind(&self) -> ResourceKind {
    self.kind
  }

  pub fn version(&self) -> u64 {
    self.version
  }

  pub fn confirmed(&self) -> &ResourceCollection {
    &self.confirmed
  }

  pub fn has_overlay(&self, key: &ResourceKey) -> bool {
    self.overlay_index(key).is_some()
  }

  fn overlay_index(&self, key: &ResourceKey) -> Option<usize> {
    self.overlay.iter().position(|(k, _)| k == key)
  }

  fn overlay_for(&self, key: &ResourceKey) -> Option<&Overlay> {
    self.overlay_index(key).map(|idx| &self.overlay[idx].1)
  }

  fn bump(&mut self) {
    self.version += 1;
  }

  /// The entry currently visible for `key`: overlay first, then confirmed.
  pub fn current(&self, key: &ResourceKey) -> Option<ResourceItem> {
    match self.overlay_for(key) {
      Some(Overlay::Upsert(item)) => Some(item.clone()),
      Some(Overlay::Tombstone) => None,
      None => self.confirmed.get(key).cloned(),
    }
  }

  /// Confirmed state merged with the overlay. Overlay entries win; tombstoned keys are hidden.
  pub fn snapshot(&self) -> Snapshot {
    let mut items = Vec::with_capacity(self.confirmed.len() + self.overlay.len());

    for item in self.confirmed.iter() {
      match self.overlay_for(&item.key()) {
        Some(Overlay::Upsert(pending)) => items.push(pending.clone()),
        Some(Overlay::Tombstone) => {}
        None => items.push(item.clone()),
      }
    }
    for (key, entry) in &self.overlay {
      if let Overlay::Upsert(pending) = entry {
        if !self.confirmed.contains(key) {
          items.push(pending.clone());
        }
      }
    }

    Snapshot {
      kind: self.kind,
      version: self.version,
      items: ResourceCollection::from_items(items),
    }
  }

  /// Replaces the confirmed state wholesale. Overlays stay and are re-applied on top.
  pub fn apply_confirmed(&mut self, collection: ResourceCollection) {
    event!(
      Level::DEBUG,
      kind = %self.kind,
      items = collection.len(),
      overlays = self.overlay.len(),
      "Applying confirmed collection."
    );
    let confirmed: ResourceCollection = collection
      .into_items()
      .into_iter()
      .map(|mut item| {
        item.status = ItemStatus::Confirmed;
        item
      })
      .collect();
    // Refetching unchanged data is a no-op for subscribers.
    if confirmed == self.confirmed {
      return;
    }
    self.confirmed = confirmed;
    self.bump();
  }

  /// Shows `item` optimistically, replacing any previous overlay for its key.
  pub fn apply_optimistic(&mut self, mut item: ResourceItem) {
    item.status = ItemStatus::Pending;
    self.set_overlay(item.key(), Overlay::Upsert(item));
  }

  /// Hides `key` optimistically.
  pub fn apply_optimistic_removal(&mut self, key: ResourceKey) {
    self.set_overlay(key, Overlay::Tombstone);
  }

  fn set_overlay(&mut self, key: ResourceKey, entry: Overlay) {
    match self.overlay_index(&key) {
      Some(idx) => self.overlay[idx].1 = entry,
      None => self.overlay.push((key, entry)),
    }
    self.bump();
  }

  /// Drops the overlay for `key`; the confirmed entry (if any) becomes visible again.
  pub fn remove_optimistic(&mut self, key: &ResourceKey) -> bool {
    match self.overlay_index(key) {
      Some(idx) => {
        self.overlay.remove(idx);
        self.bump();
        true
      }
      None => false,
    }
  }

  /// Records the server's canonical item for its key and drops the overlay.
  pub fn confirm_item(&mut self, mut item: ResourceItem) {
    item.status = ItemStatus::Confirmed;
    let key = item.key();
    self.confirmed.upsert(item);
    if let Some(idx) = self.overlay_index(&key) {
      self.overlay.remove(idx);
    }
    self.bump();
  }

  /// Records a server-acknowledged removal and drops the overlay.
  pub fn confirm_removal(&mut self, key: &ResourceKey) {
    self.confirmed.remove(key);
    if let Some(idx) = self.overlay_index(key) {
      self.overlay.remove(idx);
    }
    self.bump();
  }

  /// Forgets everything, e.g. on sign-out.
  pub fn clear(&mut self) {
    self.confirmed.clear();
    self.overlay.clear();
    self.bump();
  }
}
