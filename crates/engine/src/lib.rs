//! Mission progression engine (Layer 4)
//!
//! The orchestrating state machine: owns mission instances, routes
//! submissions through the verifier, runs difficulty adjustment after each
//! step outcome, computes rewards exactly once per key, and hands snapshots
//! to the persistence seam after every mutation.

#![warn(missing_docs)]

pub mod sink;
pub mod tracker;

pub use sink::{CollectingSink, EventSink, TracingSink};
pub use tracker::{EngineConfig, MissionEngine, SubmitOutcome};
