// basket/src/applier/definition.rs

//! Contains the `MutationApplier` struct, its construction and the submission entry point.
//! Resolution of submitted mutations lives in `execution.rs`.

use crate::applier::queue::{KeySlots, Submission};
use crate::cache::{LocalResourceCache, Snapshot};
use crate::config::DEFAULT_REQUEST_TIMEOUT;
use crate::core::item::{ResourceKey, ResourceKind};
use crate::core::mutation::{MutationId, MutationKind, PendingMutation};
use crate::core::outcome::{KeyPhase, MutationOutcome};
use crate::core::shared::Shared;
use crate::error::{BasketError, BasketResult};
use crate::notify::{Effects, LogNotifier, Liveness, Notifier};
use crate::remote::client::RemoteResource;
use crate::session::SessionGate;

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tracing::{event, instrument, Level};

/// Everything guarded by the applier's lock.
#[derive(Debug)]
pub(crate) struct SyncState {
  pub cache: LocalResourceCache,
  pub slots: KeySlots,
  next_id: u64,
}

impl SyncState {
  fn new(kind: ResourceKind) -> Self {
    Self {
      cache: LocalResourceCache::new(kind),
      slots: KeySlots::default(),
      next_id: 0,
    }
  }

  fn next_mutation_id(&mut self) -> MutationId {
    self.next_id += 1;
    MutationId(self.next_id)
  }
}

pub(crate) struct ApplierInner {
  pub kind: ResourceKind,
  pub remote: Arc<dyn RemoteResource>,
  pub gate: SessionGate,
  pub state: Shared<SyncState>,
  pub notifier: Arc<dyn Notifier>,
  pub effects: Option<Arc<dyn Effects>>,
  pub request_timeout: Duration,
  pub snapshots: watch::Sender<Arc<Snapshot>>,
}

/// Owns one synchronized collection: applies optimistic mutations, dispatches the remote
/// calls and reconciles the cache when they resolve.
///
/// Cloning is cheap and yields a handle to the same collection.
///
/// Mutations on the same `ResourceKey` run strictly one after another in submission order;
/// mutations on different keys run concurrently. Submitting requires a tokio runtime.
#[derive(Clone)]
pub struct MutationApplier {
  pub(crate) inner: Arc<ApplierInner>,
}

pub struct ApplierBuilder {
  remote: Arc<dyn RemoteResource>,
  gate: SessionGate,
  notifier: Arc<dyn Notifier>,
  effects: Option<Arc<dyn Effects>>,
  request_timeout: Duration,
}

impl ApplierBuilder {
  pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
    self.notifier = notifier;
    self
  }

  /// Binds the optional feedback hook. Without one, adds simply skip it.
  pub fn effects(mut self, effects: Option<Arc<dyn Effects>>) -> Self {
    self.effects = effects;
    self
  }

  pub fn request_timeout(mut self, timeout: Duration) -> Self {
    self.request_timeout = timeout;
    self
  }

  pub fn build(self) -> MutationApplier {
    let kind = self.remote.kind();
    let (snapshots, _) = watch::channel(Arc::new(Snapshot::empty(kind)));
    MutationApplier {
      inner: Arc::new(ApplierInner {
        kind,
        remote: self.remote,
        gate: self.gate,
        state: Shared::new(SyncState::new(kind)),
        notifier: self.notifier,
        effects: self.effects,
        request_timeout: self.request_timeout,
        snapshots,
      }),
    }
  }
}

/// Handle returned by a submission. Await `outcome()` to learn how it resolved.
#[derive(Debug)]
pub struct MutationTicket {
  pub id: MutationId,
  pub key: ResourceKey,
  /// `Pending` when dispatched right away, `Queued` when waiting behind the same key.
  pub phase: KeyPhase,
  outcome: oneshot::Receiver<MutationOutcome>,
}

impl MutationTicket {
  pub async fn outcome(self) -> MutationOutcome {
    self
      .outcome
      .await
      .unwrap_or_else(|_| MutationOutcome::RolledBack(BasketError::Internal("mutation was dropped".to_string())))
  }
}

impl MutationApplier {
  pub fn builder(remote: Arc<dyn RemoteResource>, gate: SessionGate) -> ApplierBuilder {
    ApplierBuilder {
      remote,
      gate,
      notifier: Arc::new(LogNotifier),
      effects: None,
      request_timeout: DEFAULT_REQUEST_TIMEOUT,
    }
  }

  pub fn kind(&self) -> ResourceKind {
    self.inner.kind
  }

  pub fn gate(&self) -> &SessionGate {
    &self.inner.gate
  }

  pub fn snapshot(&self) -> Snapshot {
    self.inner.state.map_read(|s| &s.cache).snapshot()
  }

  /// Receives a fresh snapshot after every change.
  pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
    self.inner.snapshots.subscribe()
  }

  pub fn phase(&self, key: &ResourceKey) -> KeyPhase {
    if self.inner.state.read().slots.is_busy(key) {
      KeyPhase::Pending
    } else {
      KeyPhase::Idle
    }
  }

  /// The mutation currently awaiting the server for `key`, if any.
  pub fn in_flight_id(&self, key: &ResourceKey) -> Option<MutationId> {
    self.inner.state.read().slots.in_flight_id(key)
  }

  /// Number of keys with a mutation in flight.
  pub fn in_flight(&self) -> usize {
    self.inner.state.read().slots.in_flight()
  }

  /// Number of mutations queued behind the in-flight one for `key`.
  pub fn queued(&self, key: &ResourceKey) -> usize {
    self.inner.state.read().slots.waiting(key)
  }

  /// Forgets all cached state after the session ended. Queued mutations are abandoned right
  /// away; in-flight ones are abandoned when their call returns and never touch the new state.
  pub fn reset(&self) {
    let abandoned = self.inner.state.update(|s| {
      s.cache.clear();
      s.slots.drain_waiting()
    });
    self.inner.publish();
    for submission in abandoned {
      self.inner.abandon(submission);
    }
  }

  /// Submits a mutation.
  ///
  /// Passes through the session gate first: when signed out nothing changes, the user is
  /// redirected and `Unauthorized` is returned. Otherwise the optimistic change is visible
  /// in `snapshot()` when this returns (or, if the key is busy, once its turn comes) and the
  /// remote call resolves in the background.
  #[instrument(
    name = "MutationApplier::submit",
    skip(self, key, kind, liveness),
    fields(resource = %self.inner.kind, key = %key, mutation = kind.name()),
    err(Display)
  )]
  pub fn submit(&self, key: ResourceKey, kind: MutationKind, liveness: Liveness) -> BasketResult<MutationTicket> {
    let kind = kind.normalized();
    let (_, epoch) = self.inner.gate.authorize(kind.name())?;
    self.validate(&kind)?;

    let runtime = tokio::runtime::Handle::try_current()
      .map_err(|_| BasketError::Internal("mutations must be submitted from within a tokio runtime".to_string()))?;

    let (reply, outcome) = oneshot::channel();
    let (id, admitted) = self.inner.state.update(|state| {
      let id = state.next_mutation_id();
      let submission = Submission {
        mutation: PendingMutation::new(id, key.clone(), kind),
        reply,
        liveness,
        epoch,
      };
      (id, state.slots.admit(submission))
    });

    let phase = match admitted {
      Some(submission) => {
        let step = self.inner.prepare(submission);
        self.inner.publish();
        runtime.spawn(Arc::clone(&self.inner).run_key(step));
        KeyPhase::Pending
      }
      None => {
        event!(Level::DEBUG, %id, "Key busy; mutation queued.");
        KeyPhase::Queued
      }
    };

    Ok(MutationTicket {
      id,
      key,
      phase,
      outcome,
    })
  }

  fn validate(&self, kind: &MutationKind) -> BasketResult<()> {
    match (self.inner.kind, kind) {
      (_, MutationKind::Add { quantity: 0, .. }) => Err(BasketError::InvalidQuantity),
      (ResourceKind::Cart, MutationKind::Toggle { .. }) => Err(BasketError::Unsupported { operation: "toggle" }),
      (ResourceKind::Wishlist, MutationKind::Add { .. }) => Err(BasketError::Unsupported { operation: "add" }),
      (ResourceKind::Wishlist, MutationKind::UpdateQuantity { .. }) => Err(BasketError::Unsupported {
        operation: "update_quantity",
      }),
      _ => Ok(()),
    }
  }
}

impl ApplierInner {
  /// Pushes the current snapshot to subscribers.
  pub(crate) fn publish(&self) {
    let snapshot = self.state.map_read(|s| &s.cache).snapshot();
    self.snapshots.send_replace(Arc::new(snapshot));
  }
}
