//! Persistence seam for progress snapshots.
//!
//! The engine hands a [`petquest_core::MissionProgress`] snapshot to a
//! `ProgressStore` after every mutating operation. Writes use optimistic
//! concurrency: the stored version must match the one the writer saw.

#![warn(missing_docs)]

mod json_store;
mod memory;
mod trait_;

pub use json_store::JsonStore;
pub use memory::MemoryStore;
pub use trait_::{ProgressStore, Result, StoreError};
