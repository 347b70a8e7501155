// basket/src/notify.rs

//! User-visible notifications, component liveness and the optional effects hook.

use crate::core::item::{ResourceItem, ResourceKind};
use crate::core::mutation::MutationKind;
use crate::error::{BasketError, ErrorKind};
use chrono::{DateTime, Utc};
use std::sync::{Arc, Weak};
use tracing::{event, Level};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
  Success,
  Failure,
}

/// A short-lived toast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
  pub level: NotificationLevel,
  pub resource: ResourceKind,
  pub message: String,
  pub error: Option<ErrorKind>,
  pub at: DateTime<Utc>,
}

impl Notification {
  pub fn success(resource: ResourceKind, message: impl Into<String>) -> Self {
    Self {
      level: NotificationLevel::Success,
      resource,
      message: message.into(),
      error: None,
      at: Utc::now(),
    }
  }

  pub fn failure(resource: ResourceKind, message: impl Into<String>, error: ErrorKind) -> Self {
    Self {
      level: NotificationLevel::Failure,
      resource,
      message: message.into(),
      error: Some(error),
      at: Utc::now(),
    }
  }

  pub fn is_failure(&self) -> bool {
    self.level == NotificationLevel::Failure
  }

  /// Success copy for a confirmed mutation. `added` is the wishlist membership after a toggle.
  pub(crate) fn confirmed(resource: ResourceKind, kind: &MutationKind, added: Option<bool>) -> Self {
    let message = match (kind, added) {
      (MutationKind::Add { .. }, _) => format!("Added to {}", resource),
      (MutationKind::UpdateQuantity { .. }, _) => format!("Updated {}", resource),
      (MutationKind::Remove, _) | (MutationKind::Toggle { .. }, Some(false)) => format!("Removed from {}", resource),
      (MutationKind::Toggle { .. }, _) => format!("Added to {}", resource),
    };
    Self::success(resource, message)
  }

  /// Failure copy for a rolled back mutation. Server messages are shown verbatim.
  pub(crate) fn rolled_back(resource: ResourceKind, kind: &MutationKind, err: &BasketError) -> Self {
    let message = match err {
      BasketError::Server { message, .. } if !message.is_empty() => message.clone(),
      BasketError::Unauthorized => "Please sign in to continue".to_string(),
      _ => match kind {
        MutationKind::Add { .. } => format!("Failed to add to {}", resource),
        MutationKind::UpdateQuantity { .. } => format!("Failed to update {}", resource),
        MutationKind::Remove => format!("Failed to remove from {}", resource),
        MutationKind::Toggle { .. } => format!("Failed to update {}", resource),
      },
    };
    Self::failure(resource, message, err.kind())
  }
}

/// Toast sink supplied by the presentation layer.
pub trait Notifier: Send + Sync {
  fn notify(&self, notification: Notification);
}

/// Notifier for headless use: logs every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
  fn notify(&self, n: Notification) {
    match n.level {
      NotificationLevel::Success => event!(Level::INFO, resource = %n.resource, message = %n.message, "Notification."),
      NotificationLevel::Failure => {
        event!(Level::WARN, resource = %n.resource, message = %n.message, error = ?n.error, "Failure notification.")
      }
    }
  }
}

/// Optional visual feedback (e.g. the fly-to-cart animation). May be absent.
pub trait Effects: Send + Sync {
  fn item_added(&self, resource: ResourceKind, item: &ResourceItem);
}

/// Held by a mounted component. Dropping it marks the component as gone.
#[derive(Debug, Default)]
pub struct Mount(Arc<()>);

impl Mount {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn liveness(&self) -> Liveness {
    Liveness(Some(Arc::downgrade(&self.0)))
  }
}

/// Checked before notifying the component that submitted a mutation.
#[derive(Debug, Clone, Default)]
pub struct Liveness(Option<Weak<()>>);

impl Liveness {
  /// Not tied to any component; always alive.
  pub fn detached() -> Self {
    Liveness(None)
  }

  pub fn is_alive(&self) -> bool {
    match &self.0 {
      Some(weak) => weak.strong_count() > 0,
      None => true,
    }
  }
}
