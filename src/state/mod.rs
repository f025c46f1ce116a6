//! State module for tracking run progress
//!
//! # Components
//!
//! - `RunPhase`: the phase the batch orchestrator is in (enumerating, fetching,
//!   per-page outcome, checkpointing, done) and the legal moves between them

mod run_phase;

pub use run_phase::RunPhase;
