//! Run Summaries
//!
//! Aggregate rows for the per-tick results table and the end-of-run summary.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

use crate::StateCounts;

/// Header line of the per-tick results CSV.
pub const RESULTS_CSV_HEADER: &str = "Time,ClaimId,ClaimName,IsMisinformation,Susceptible,Exposed,Doubtful,Propagating,NotSpreading,Recovered";

/// State counts of one claim at one tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountsRow {
    pub tick: u64,
    pub claim_id: u32,
    pub claim_name: String,
    pub is_misinformation: bool,
    pub counts: StateCounts,
}

impl CountsRow {
    /// Formats the row as one CSV line (no trailing newline).
    pub fn to_csv_row(&self) -> String {
        format!(
            "{},{},{},{},{},{},{},{},{},{}",
            self.tick,
            self.claim_id,
            csv_field(&self.claim_name),
            self.is_misinformation,
            self.counts.susceptible,
            self.counts.exposed,
            self.counts.doubtful,
            self.counts.propagating,
            self.counts.not_spreading,
            self.counts.recovered,
        )
    }
}

/// Quote a free-text field when it would otherwise break the row.
fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

/// How one claim fared over the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimSummary {
    pub claim_id: u32,
    pub name: String,
    pub is_misinformation: bool,
    #[serde(default)]
    pub origin_agent: Option<u32>,
    pub origin_tick: u64,
    pub final_counts: StateCounts,
    /// Largest Propagating count seen
    pub peak_propagating: usize,
    /// First tick at which the peak was reached
    pub peak_tick: u64,
}

impl ClaimSummary {
    pub fn new(
        claim_id: u32,
        name: impl Into<String>,
        is_misinformation: bool,
        origin_tick: u64,
    ) -> Self {
        Self {
            claim_id,
            name: name.into(),
            is_misinformation,
            origin_agent: None,
            origin_tick,
            final_counts: StateCounts::default(),
            peak_propagating: 0,
            peak_tick: origin_tick,
        }
    }

    pub fn with_origin_agent(mut self, agent_id: Option<u32>) -> Self {
        self.origin_agent = agent_id;
        self
    }

    /// Fold one recorded tick into the summary.
    pub fn observe(&mut self, tick: u64, counts: &StateCounts) {
        if counts.propagating > self.peak_propagating {
            self.peak_propagating = counts.propagating;
            self.peak_tick = tick;
        }
        self.final_counts = *counts;
    }
}

/// End-of-run summary written as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub population: usize,
    pub ticks: u64,
    pub seed: u64,
    pub claims: Vec<ClaimSummary>,
    pub network: NetworkSummary,
}

/// Social-graph totals over the run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkSummary {
    pub initial_edges: usize,
    pub final_edges: usize,
    pub edges_pruned: usize,
    pub edges_rewired: usize,
    pub mean_degree: f64,
}

impl RunSummary {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
