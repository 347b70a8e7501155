// basket/src/core/outcome.rs

//! Signals describing how a submission was handled and how it finally resolved.

use crate::core::item::ResourceItem;
use crate::error::BasketError;

/// Where a mutation stands for its key. `Idle` keys have no entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPhase {
  Idle,
  /// Optimistic change applied, remote call outstanding.
  Pending,
  /// Waiting behind an in-flight mutation on the same key.
  Queued,
}

/// Final result of one mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
  /// The server accepted the change. Carries the canonical item, `None` for removals.
  Confirmed(Option<ResourceItem>),
  /// The change was undone locally.
  RolledBack(BasketError),
}

impl MutationOutcome {
  pub fn is_confirmed(&self) -> bool {
    matches!(self, MutationOutcome::Confirmed(_))
  }

  pub fn error(&self) -> Option<&BasketError> {
    match self {
      MutationOutcome::RolledBack(err) => Some(err),
      MutationOutcome::Confirmed(_) => None,
    }
  }
}
