//! Stage pipelines.
//!
//! A [`Pipeline`] owns an ordered list of [`Stage`]s and a [`Bag`](crate::types::Bag)
//! they share. Running it feeds the bag to each stage in turn and merges the
//! mapping each stage returns back into the bag.
//!
//! ```text
//! bag ──► [add] ──► merge ──► [multiply] ──► merge ──► result copy
//!                    │                         │
//!                    └──── trace entry ────────┘   (when traced)
//! ```
//!
//! # Design
//!
//! - **Fail-fast**: the first stage that raises or returns a non-mapping ends the run.
//! - **No rollback**: bag mutations from earlier stages survive a failed run.
//! - **Positional trace**: entries are recorded in execution order, keyed by nothing.

pub mod builtin;
pub mod executor;
pub mod stage;

pub use builtin::{builtin_stage, BuiltinStage, BUILTIN_NAMES, PASSTHROUGH};
pub use executor::{Pipeline, TraceEntry, TRACE_INPUT};
pub use stage::{FnStage, Stage};
