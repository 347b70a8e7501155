// basket/src/core/mutation.rs

//! Descriptions of in-flight changes to a collection.

use crate::core::item::ResourceKey;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::fmt;

/// Monotonic id assigned by the applier to each submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MutationId(pub u64);

impl fmt::Display for MutationId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "m{}", self.0)
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationKind {
  /// Add `quantity` units; merges into an existing entry for the same key.
  Add { quantity: u32, unit_price: Decimal },
  /// Set the quantity of an existing entry. Zero means remove.
  UpdateQuantity { quantity: u32 },
  Remove,
  /// Flip wishlist membership. `unit_price` seeds the optimistic entry when adding.
  Toggle { unit_price: Decimal },
}

impl MutationKind {
  /// `UpdateQuantity(0)` is a removal, not an error.
  pub fn normalized(self) -> Self {
    match self {
      MutationKind::UpdateQuantity { quantity: 0 } => MutationKind::Remove,
      other => other,
    }
  }

  pub fn name(&self) -> &'static str {
    match self {
      MutationKind::Add { .. } => "add",
      MutationKind::UpdateQuantity { .. } => "update_quantity",
      MutationKind::Remove => "remove",
      MutationKind::Toggle { .. } => "toggle",
    }
  }
}

#[derive(Debug, Clone)]
pub struct PendingMutation {
  pub id: MutationId,
  pub key: ResourceKey,
  pub kind: MutationKind,
  pub submitted_at: DateTime<Utc>,
}

impl PendingMutation {
  pub fn new(id: MutationId, key: ResourceKey, kind: MutationKind) -> Self {
    Self {
      id,
      key,
      kind: kind.normalized(),
      submitted_at: Utc::now(),
    }
  }
}
