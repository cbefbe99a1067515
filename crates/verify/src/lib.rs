//! Step verification (Layer 2)
//!
//! Pure evidence evaluation: maps (requirement, submitted evidence) to a
//! pass/fail verdict with a quality score. Never mutates state.

#![warn(missing_docs)]

pub mod extractor;
pub mod verifier;

pub use extractor::{StaticTagExtractor, TagExtractor};
pub use verifier::{verify, verify_step, FailReason, StepVerdict, Verdict};
