// basket/src/applier/queue.rs

//! Per-key FIFO bookkeeping: one in-flight mutation per key, later ones wait their turn.

use crate::core::item::ResourceKey;
use crate::core::mutation::{MutationId, PendingMutation};
use crate::core::outcome::MutationOutcome;
use crate::notify::Liveness;
use std::collections::{HashMap, VecDeque};
use tokio::sync::oneshot;

/// A mutation plus where to report its outcome.
#[derive(Debug)]
pub(crate) struct Submission {
  pub mutation: PendingMutation,
  pub reply: oneshot::Sender<MutationOutcome>,
  pub liveness: Liveness,
  /// Session the mutation was submitted under.
  pub epoch: u64,
}

#[derive(Debug)]
struct KeySlot {
  in_flight: MutationId,
  waiting: VecDeque<Submission>,
}

#[derive(Debug, Default)]
pub(crate) struct KeySlots {
  slots: HashMap<ResourceKey, KeySlot>,
}

impl KeySlots {
  pub fn is_busy(&self, key: &ResourceKey) -> bool {
    self.slots.contains_key(key)
  }

  /// Claims the key for `submission` if nothing is in flight; otherwise queues it behind
  /// the current one. Returns the submission back when it may run now.
  pub fn admit(&mut self, submission: Submission) -> Option<Submission> {
    let key = submission.mutation.key.clone();
    match self.slots.get_mut(&key) {
      Some(slot) => {
        slot.waiting.push_back(submission);
        None
      }
      None => {
        self.slots.insert(
          key,
          KeySlot {
            in_flight: submission.mutation.id,
            waiting: VecDeque::new(),
          },
        );
        Some(submission)
      }
    }
  }

  /// Marks the in-flight mutation for `key` as resolved and hands out the next waiting one,
  /// which becomes in flight. The key goes idle when nothing waits.
  pub fn finish(&mut self, key: &ResourceKey) -> Option<Submission> {
    let slot = self.slots.get_mut(key)?;
    match slot.waiting.pop_front() {
      Some(next) => {
        slot.in_flight = next.mutation.id;
        Some(next)
      }
      None => {
        self.slots.remove(key);
        None
      }
    }
  }

  /// Takes every mutation still waiting for its turn. In-flight ones keep their slots.
  pub fn drain_waiting(&mut self) -> Vec<Submission> {
    self.slots.values_mut().flat_map(|slot| slot.waiting.drain(..)).collect()
  }

  pub fn in_flight_id(&self, key: &ResourceKey) -> Option<MutationId> {
    self.slots.get(key).map(|slot| slot.in_flight)
  }

  pub fn waiting(&self, key: &ResourceKey) -> usize {
    self.slots.get(key).map_or(0, |slot| slot.waiting.len())
  }

  /// Number of keys with a mutation in flight.
  pub fn in_flight(&self) -> usize {
    self.slots.len()
  }
}
