//! Shared record types for the SEDPNR claim-diffusion simulator.
//!
//! This crate contains pure data structures with no simulation logic.
//! The simulation core writes them; offline analysis and playback tools read them.

pub mod spatial;
pub mod state;
pub mod summary;

#[cfg(feature = "test-fixtures")]
pub mod fixtures;

pub use spatial::{ParseRecordError, SpatialRecord, SPATIAL_CSV_HEADER};
pub use state::{BeliefState, ParseStateError, StateCounts};
pub use summary::{ClaimSummary, CountsRow, NetworkSummary, RunSummary, RESULTS_CSV_HEADER};
