//!
//! # PatchDB
//!
//! In-memory, mergeable, speculative state deltas between block execution
//! and durable storage. A [`Patch`] captures the effect of executing one or
//! more blocks against a stable on-disk baseline without mutating that
//! baseline: spent outputs, newly created outputs, contract state
//! transitions and transaction receipts. Patches merge pairwise to build up
//! the effect of a chain branch, purge material that has become stable, and
//! cross-check their spends against the durable baseline.
//!

pub mod merge;
pub mod patch;
pub mod stable;

pub use patch::{Patch, SpentOutputs};
pub use stable::StableView;
