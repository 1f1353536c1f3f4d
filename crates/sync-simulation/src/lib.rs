//! Sync-Simulation: synthetic EEG/auxiliary recording pairs
//!
//! Deterministic (seeded) recordings for tests and demonstrations.

pub mod signal_patterns;
pub mod recording_simulator;

pub use recording_simulator::*;
pub use signal_patterns::*;
