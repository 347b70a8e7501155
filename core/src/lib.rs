// src/lib.rs

//! Basket: client-side synchronization of a storefront's cart and wishlist.
//!
//! Basket keeps a local view of the signed-in user's collections in step with a REST backend:
//!  - Mutations are applied optimistically and are visible immediately.
//!  - Mutations on the same item run strictly in submission order; different items run concurrently.
//!  - Failed mutations roll back to the last confirmed state and produce a user notification.
//!  - Every mutation passes through a session gate; signed-out users are redirected to sign in.
//!  - Derived views (item count, totals, membership) are pure functions of a snapshot.

pub mod applier;
pub mod cache;
pub mod config;
pub mod core;
pub mod error;
pub mod notify;
pub mod remote;
pub mod session;
pub mod store;
pub mod view;

// --- Re-exports for the Public API ---

// Data model
pub use crate::core::collection::ResourceCollection;
pub use crate::core::item::{ItemId, ItemStatus, ResourceItem, ResourceKey, ResourceKind};
pub use crate::core::mutation::{MutationId, MutationKind, PendingMutation};
pub use crate::core::outcome::{KeyPhase, MutationOutcome};

// Cache and views
pub use crate::cache::{LocalResourceCache, Snapshot};
pub use crate::view::Summary;

// Synchronization
pub use crate::applier::{ApplierBuilder, MutationApplier, MutationTicket};
pub use crate::remote::{HttpRemote, RemoteResource};
pub use crate::store::{ResourceStore, Storefront, StorefrontBuilder};

// Session and presentation hooks
pub use crate::notify::{Effects, Liveness, LogNotifier, Mount, Notification, NotificationLevel, Notifier};
pub use crate::session::{Credential, LogRedirector, Redirector, SessionGate};

pub use crate::config::StorefrontConfig;
pub use crate::error::{BasketError, BasketResult, ErrorKind};
