pub mod collection;
pub mod item;
pub mod mutation;
pub mod outcome;
pub mod shared;

// Re-export key types for easier access from other basket modules (and lib.rs)
pub use collection::ResourceCollection;
pub use item::{ItemId, ItemStatus, ResourceItem, ResourceKey, ResourceKind};
pub use mutation::{MutationId, MutationKind, PendingMutation};
pub use outcome::{KeyPhase, MutationOutcome};
pub use shared::Shared;
