//! State module for tracking harvest progress
//!
//! # Components
//!
//! - `RunState`: lifecycle of one harvest run (init, running, and the three terminal outcomes)

mod run_state;

pub use run_state::RunState;
