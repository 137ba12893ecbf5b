//! Sample data fixtures for testing.
//!
//! Enable the `test-fixtures` feature to access these helpers.
//!
//! # Example
//!
//! ```ignore
//! // In your Cargo.toml:
//! // [dev-dependencies]
//! // sedpnr-records = { path = "../sedpnr-records", features = ["test-fixtures"] }
//!
//! use sedpnr_records::fixtures;
//!
//! let rows = fixtures::sample_spatial_rows();
//! ```

use crate::{BeliefState, SpatialRecord, StateCounts};

/// A short spatial stream: two agents, one truth and one misinformation claim.
pub fn sample_spatial_rows() -> Vec<SpatialRecord> {
    let row = |tick, agent_id, claim_id, state, is_misinformation| SpatialRecord {
        tick,
        agent_id,
        district_id: 0,
        school_id: if agent_id == 0 { Some(0) } else { None },
        religious_id: None,
        workplace_id: if agent_id == 1 { Some(8) } else { None },
        claim_id,
        state,
        is_misinformation,
        ethnicity: agent_id as u8,
        denomination: 0,
    };

    vec![
        row(0, 0, 0, BeliefState::Propagating, false),
        row(0, 1, 1, BeliefState::Propagating, true),
        row(1, 0, 0, BeliefState::Propagating, false),
        row(1, 1, 1, BeliefState::NotSpreading, true),
        row(2, 0, 0, BeliefState::NotSpreading, false),
        row(2, 1, 1, BeliefState::Recovered, true),
    ]
}

/// Counts for a population of 100 right after seeding 5 propagators.
pub fn seeded_counts() -> StateCounts {
    StateCounts {
        susceptible: 95,
        propagating: 5,
        ..StateCounts::default()
    }
}
