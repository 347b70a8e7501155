// basket/src/applier/execution.rs

//! Contains the resolution side of `MutationApplier`: optimistic application, the remote
//! call (bounded by a timeout), and reconciliation into confirmed state or rollback.

use crate::applier::definition::{ApplierInner, MutationApplier};
use crate::applier::queue::Submission;
use crate::cache::Snapshot;
use crate::core::collection::ResourceCollection;
use crate::core::item::{ResourceItem, ResourceKey, ResourceKind};
use crate::core::mutation::MutationKind;
use crate::core::outcome::MutationOutcome;
use crate::error::{BasketError, BasketResult};
use crate::notify::Notification;
use crate::session::Credential;

use std::sync::Arc;
use tracing::{event, instrument, span, Instrument, Level};

/// The remote request a prepared mutation needs.
#[derive(Debug, Clone)]
pub(crate) enum RemoteCall {
  Add { quantity: u32 },
  Update { item_id: String, quantity: u32 },
  Remove { item_id: String },
  Toggle,
}

/// What the server said.
#[derive(Debug)]
enum RemoteReply {
  Item(ResourceItem),
  Removed,
  Toggled(bool),
}

pub(crate) enum Step {
  /// Optimistic change applied; the remote call is still to be made.
  Dispatch {
    submission: Submission,
    call: RemoteCall,
    /// The optimistic entry shown while pending (adds and wishlist additions).
    optimistic: Option<ResourceItem>,
  },
  /// Could not even be applied locally (e.g. no item to update). Nothing to roll back.
  Reject { submission: Submission, error: BasketError },
  /// Submitted under a session that has since ended. Never applied nor dispatched.
  Abandon { submission: Submission },
}

impl ApplierInner {
  /// Applies the optimistic change for `submission` and decides which remote call follows.
  /// Quantities are computed against the currently visible entry (overlay included), so
  /// consecutive adds of the same item never lose an increment.
  pub(crate) fn prepare(&self, submission: Submission) -> Step {
    if !self.gate.is_current(submission.epoch) {
      return Step::Abandon { submission };
    }
    let key = submission.mutation.key.clone();
    let kind = submission.mutation.kind.clone();

    let planned: Result<(RemoteCall, Option<ResourceItem>), BasketError> = self.state.update(|state| {
      let current = state.cache.current(&key);
      match kind {
        MutationKind::Add { quantity, unit_price } => {
          let optimistic = match current {
            Some(mut existing) => {
              existing.quantity = existing.quantity.saturating_add(quantity);
              existing
            }
            None => ResourceItem::pending(&key, quantity, unit_price),
          };
          state.cache.apply_optimistic(optimistic.clone());
          Ok((RemoteCall::Add { quantity }, Some(optimistic)))
        }
        MutationKind::UpdateQuantity { quantity } => {
          let mut existing = current.ok_or_else(|| BasketError::ItemNotFound { target: key.to_string() })?;
          let item_id = server_id_of(&existing)?;
          existing.quantity = quantity;
          state.cache.apply_optimistic(existing);
          Ok((RemoteCall::Update { item_id, quantity }, None))
        }
        MutationKind::Remove if self.kind == ResourceKind::Wishlist => {
          // The wishlist only offers toggle; removing a present entry toggles it off.
          current.ok_or_else(|| BasketError::ItemNotFound { target: key.to_string() })?;
          state.cache.apply_optimistic_removal(key.clone());
          Ok((RemoteCall::Toggle, None))
        }
        MutationKind::Remove => {
          let existing = current.ok_or_else(|| BasketError::ItemNotFound { target: key.to_string() })?;
          let item_id = server_id_of(&existing)?;
          state.cache.apply_optimistic_removal(key.clone());
          Ok((RemoteCall::Remove { item_id }, None))
        }
        MutationKind::Toggle { unit_price } => match current {
          Some(_) => {
            state.cache.apply_optimistic_removal(key.clone());
            Ok((RemoteCall::Toggle, None))
          }
          None => {
            let optimistic = ResourceItem::pending(&key, 1, unit_price);
            state.cache.apply_optimistic(optimistic.clone());
            Ok((RemoteCall::Toggle, Some(optimistic)))
          }
        },
      }
    });

    match planned {
      Ok((call, optimistic)) => {
        event!(Level::DEBUG, id = %submission.mutation.id, key = %key, ?call, "Optimistic change applied.");
        // Lock released above; collaborators may call back into the store.
        if let (Some(effects), Some(item)) = (&self.effects, &optimistic) {
          effects.item_added(self.kind, item);
        }
        Step::Dispatch {
          submission,
          call,
          optimistic,
        }
      }
      Err(error) => {
        event!(Level::WARN, id = %submission.mutation.id, key = %key, %error, "Mutation rejected before dispatch.");
        Step::Reject { submission, error }
      }
    }
  }

  /// Resolves `step`, then keeps draining mutations queued behind the same key in FIFO order.
  pub(crate) async fn run_key(self: Arc<Self>, mut step: Step) {
    loop {
      let key = match &step {
        Step::Dispatch { submission, .. } | Step::Reject { submission, .. } | Step::Abandon { submission } => {
          submission.mutation.key.clone()
        }
      };
      self.resolve(step).await;

      let next = self.state.update(|state| state.slots.finish(&key));
      match next {
        Some(submission) => {
          step = self.prepare(submission);
          self.publish();
        }
        None => break,
      }
    }
  }

  async fn resolve(&self, step: Step) {
    match step {
      Step::Reject { submission, error } => {
        self.finish(submission, MutationOutcome::RolledBack(error), None);
      }
      Step::Abandon { submission } => self.abandon(submission),
      Step::Dispatch {
        submission,
        call,
        optimistic,
      } => {
        let resolution_span = span!(
          Level::DEBUG,
          "mutation_resolution",
          resource = %self.kind,
          id = %submission.mutation.id,
          key = %submission.mutation.key
        );
        let result = self
          .call_remote(submission.epoch, &submission.mutation.key, &call)
          .instrument(resolution_span)
          .await;
        if !self.gate.is_current(submission.epoch) {
          // Whatever the server said belongs to the ended session.
          self.state.update(|state| state.cache.remove_optimistic(&submission.mutation.key));
          self.publish();
          self.abandon(submission);
          return;
        }
        match result {
          Ok(reply) => {
            let (outcome, added) = self.reconcile(&submission.mutation.key, reply, optimistic);
            self.publish();
            self.finish(submission, outcome, added);
          }
          Err(error) => {
            self.rollback(&submission.mutation.key, &error);
            self.publish();
            let conflict = matches!(error, BasketError::Conflict { .. });
            let action = submission.mutation.kind.name();
            let epoch = submission.epoch;
            self.finish(submission, MutationOutcome::RolledBack(error.clone()), None);
            if let BasketError::Unauthorized = error {
              self.gate.expire_session(epoch, action);
            }
            if conflict {
              // Trust the server: reload the whole collection.
              if let Err(refresh_err) = self.refresh().await {
                event!(Level::WARN, error = %refresh_err, "Refresh after conflict failed.");
              }
            }
          }
        }
      }
    }
  }

  /// Performs the remote call with the credential of session `epoch`, bounded by the timeout.
  async fn call_remote(&self, epoch: u64, key: &ResourceKey, call: &RemoteCall) -> BasketResult<RemoteReply> {
    let credential = self.gate.credential_for(epoch).ok_or(BasketError::Unauthorized)?;
    let request = self.dispatch(&credential, key, call);
    match tokio::time::timeout(self.request_timeout, request).await {
      Ok(result) => result,
      Err(_) => {
        event!(Level::WARN, timeout_ms = self.request_timeout.as_millis() as u64, "Remote call timed out.");
        Err(BasketError::network(format!(
          "request timed out after {} ms",
          self.request_timeout.as_millis()
        )))
      }
    }
  }

  async fn dispatch(&self, credential: &Credential, key: &ResourceKey, call: &RemoteCall) -> BasketResult<RemoteReply> {
    match call {
      RemoteCall::Add { quantity } => self
        .remote
        .add_item(credential, &key.product_id, *quantity, key.variant.as_deref())
        .await
        .map(RemoteReply::Item),
      RemoteCall::Update { item_id, quantity } => self
        .remote
        .update_item(credential, item_id, *quantity)
        .await
        .map(RemoteReply::Item),
      RemoteCall::Remove { item_id } => self
        .remote
        .remove_item(credential, item_id)
        .await
        .map(|_| RemoteReply::Removed),
      RemoteCall::Toggle => self
        .remote
        .toggle_item(credential, &key.product_id)
        .await
        .map(RemoteReply::Toggled),
    }
  }

  /// Replaces the overlay with the server's answer. Returns the outcome and, for toggles,
  /// the resulting membership.
  fn reconcile(
    &self,
    key: &ResourceKey,
    reply: RemoteReply,
    optimistic: Option<ResourceItem>,
  ) -> (MutationOutcome, Option<bool>) {
    self.state.update(|state| match reply {
      RemoteReply::Item(canonical) => {
        if canonical.key() != *key {
          event!(Level::WARN, key = %key, returned = %canonical.key(), "Server returned an item for a different key.");
          state.cache.remove_optimistic(key);
        }
        state.cache.confirm_item(canonical.clone());
        (MutationOutcome::Confirmed(Some(canonical)), None)
      }
      RemoteReply::Removed => {
        state.cache.confirm_removal(key);
        (MutationOutcome::Confirmed(None), None)
      }
      RemoteReply::Toggled(true) => {
        // The toggle endpoint reports membership only; keep what we showed, minus the local token.
        let mut item = optimistic
          .or_else(|| state.cache.confirmed().get(key).cloned())
          .unwrap_or_else(|| ResourceItem::pending(key, 1, Default::default()));
        item.id = item.id.filter(|id| id.is_server());
        state.cache.confirm_item(item.clone());
        (MutationOutcome::Confirmed(Some(item)), Some(true))
      }
      RemoteReply::Toggled(false) => {
        if optimistic.is_some() {
          event!(Level::DEBUG, key = %key, "Server reports item not in wishlist after toggle; trusting server.");
        }
        state.cache.confirm_removal(key);
        (MutationOutcome::Confirmed(None), Some(false))
      }
    })
  }

  /// Drops the overlay for `key`; the last confirmed state is visible again.
  fn rollback(&self, key: &ResourceKey, error: &BasketError) {
    event!(Level::WARN, key = %key, %error, "Remote call failed; rolling back optimistic change.");
    self.state.update(|state| state.cache.remove_optimistic(key));
  }

  /// Reports the outcome to the ticket and, if the submitting component is still alive,
  /// emits exactly one notification.
  fn finish(&self, submission: Submission, outcome: MutationOutcome, added: Option<bool>) {
    let mutation = &submission.mutation;
    let notification = match &outcome {
      MutationOutcome::Confirmed(_) => Notification::confirmed(self.kind, &mutation.kind, added),
      MutationOutcome::RolledBack(err) => Notification::rolled_back(self.kind, &mutation.kind, err),
    };

    if submission.liveness.is_alive() {
      self.notifier.notify(notification);
    } else {
      event!(Level::DEBUG, id = %mutation.id, "Submitting component gone; notification suppressed.");
    }

    event!(
      Level::DEBUG,
      id = %mutation.id,
      key = %mutation.key,
      confirmed = outcome.is_confirmed(),
      "Mutation resolved."
    );
    // The ticket may have been dropped; that's fine.
    let _ = submission.reply.send(outcome);
  }

  /// Resolves a mutation of an ended session: no notification, no redirect, no cache change.
  pub(crate) fn abandon(&self, submission: Submission) {
    let mutation = &submission.mutation;
    event!(
      Level::DEBUG,
      id = %mutation.id,
      key = %mutation.key,
      epoch = submission.epoch,
      "Session ended; mutation abandoned."
    );
    let _ = submission.reply.send(MutationOutcome::RolledBack(BasketError::Unauthorized));
  }

  /// Reloads the collection from the server. Overlays of pending mutations are kept on top.
  #[instrument(name = "MutationApplier::refresh", skip(self), fields(resource = %self.kind), err(Display))]
  pub(crate) async fn refresh(&self) -> BasketResult<Snapshot> {
    let (credential, epoch) = {
      let epoch = self.gate.epoch();
      let credential = self.gate.credential_for(epoch).ok_or(BasketError::Unauthorized)?;
      (credential, epoch)
    };
    let fetched = match tokio::time::timeout(self.request_timeout, self.remote.fetch_collection(&credential)).await {
      Ok(result) => result,
      Err(_) => Err(BasketError::network(format!(
        "request timed out after {} ms",
        self.request_timeout.as_millis()
      ))),
    };

    if !self.gate.is_current(epoch) {
      event!(Level::DEBUG, epoch, "Session ended during refresh; result dropped.");
      return Err(BasketError::Unauthorized);
    }

    match fetched {
      Ok(items) => {
        let snapshot = self.state.update(|state| {
          state.cache.apply_confirmed(ResourceCollection::from_items(items));
          state.cache.snapshot()
        });
        self.publish();
        Ok(snapshot)
      }
      Err(BasketError::Unauthorized) => {
        self.gate.expire_session(epoch, "refresh");
        Err(BasketError::Unauthorized)
      }
      Err(error) => {
        self
          .notifier
          .notify(Notification::failure(self.kind, format!("Failed to load {}", self.kind), error.kind()));
        Err(error)
      }
    }
  }
}

fn server_id_of(item: &ResourceItem) -> BasketResult<String> {
  item
    .server_id()
    .map(str::to_string)
    .ok_or_else(|| BasketError::conflict(format!("{} has not been saved yet", item.key())))
}

impl MutationApplier {
  /// Fetches the collection and replaces the confirmed state (`fetchCollection`).
  /// Pending optimistic changes survive the reload.
  pub async fn refresh(&self) -> BasketResult<Snapshot> {
    self.inner.refresh().await
  }
}
