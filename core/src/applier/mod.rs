// basket/src/applier/mod.rs

//! The mutation queue/applier: the only writer of a synchronized collection.

pub mod definition;
mod execution;
pub(crate) mod queue;

pub use definition::{ApplierBuilder, MutationApplier, MutationTicket};
