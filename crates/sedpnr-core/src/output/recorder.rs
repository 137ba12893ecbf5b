//! Metrics Recorder
//!
//! Per-tick state counts, running claim summaries, and buffered spatial rows.
//!
//! The recorder only sees belief state through [`BeliefQuery`].

use bevy_ecs::prelude::*;
use sedpnr_records::{BeliefState, ClaimSummary, CountsRow, SpatialRecord, StateCounts};

use crate::components::agent::{Agent, Population};
use crate::components::belief::{BeliefBoard, BeliefQuery};
use crate::components::claim::{Claim, ClaimRegistry};
use crate::config::{SimConfig, SpatialMode};
use crate::systems::SimClock;

/// Resource: everything recorded so far.
#[derive(Resource, Debug, Clone)]
pub struct MetricsRecorder {
    interval: u64,
    spatial_mode: SpatialMode,
    /// Recorded rows per claim, indexed by claim id
    history: Vec<Vec<CountsRow>>,
    summaries: Vec<ClaimSummary>,
    /// Spatial rows not yet drained
    spatial: Vec<SpatialRecord>,
}

impl MetricsRecorder {
    pub fn new(interval: u64, spatial_mode: SpatialMode) -> Self {
        Self {
            interval: interval.max(1),
            spatial_mode,
            history: Vec::new(),
            summaries: Vec::new(),
            spatial: Vec::new(),
        }
    }

    pub fn from_config(config: &SimConfig) -> Self {
        Self::new(config.simulation.output_interval, config.output.spatial)
    }

    /// Whether counts and spatial rows are kept for `tick`.
    pub fn records_tick(&self, tick: u64) -> bool {
        tick % self.interval == 0
    }

    /// Observe the committed state at `tick`.
    ///
    /// Summaries see every tick; history and spatial rows only recorded ticks.
    pub fn record(
        &mut self,
        tick: u64,
        claims: &ClaimRegistry,
        population: &Population,
        beliefs: &impl BeliefQuery,
    ) {
        let keep = self.records_tick(tick);
        for claim in claims.iter() {
            let states: Vec<BeliefState> = population
                .ids()
                .map(|agent| beliefs.state_of(agent, claim.id))
                .collect();
            let counts: StateCounts = states.iter().copied().collect();
            debug_assert_eq!(counts.total(), population.len());

            self.ensure_claim(claim);
            let index = claim.id.index();
            self.summaries[index].observe(tick, &counts);

            if !keep {
                continue;
            }
            self.history[index].push(CountsRow {
                tick,
                claim_id: claim.id.0,
                claim_name: claim.name.clone(),
                is_misinformation: claim.is_misinformation,
                counts,
            });
            self.push_spatial(tick, claim, population, &states);
        }
    }

    /// Claims arrive in id order, so a new claim always lands at the end.
    fn ensure_claim(&mut self, claim: &Claim) {
        if claim.id.index() < self.summaries.len() {
            return;
        }
        debug_assert_eq!(claim.id.index(), self.summaries.len());
        self.summaries.push(
            ClaimSummary::new(
                claim.id.0,
                claim.name.clone(),
                claim.is_misinformation,
                claim.origin_tick,
            )
            .with_origin_agent(claim.origin_agent.map(|agent| agent.0)),
        );
        self.history.push(Vec::new());
    }

    fn push_spatial(
        &mut self,
        tick: u64,
        claim: &Claim,
        population: &Population,
        states: &[BeliefState],
    ) {
        let everyone = match self.spatial_mode {
            SpatialMode::Off => return,
            SpatialMode::Full => true,
            SpatialMode::Engaged => tick == 0,
        };
        for (agent, &state) in population.agents().iter().zip(states) {
            if everyone || state.is_engaged() {
                self.spatial.push(spatial_record(tick, agent, claim, state));
            }
        }
    }

    /// Recorded rows of one claim, oldest first.
    pub fn history(&self, claim: usize) -> &[CountsRow] {
        self.history.get(claim).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All recorded rows, claim by claim.
    pub fn rows(&self) -> impl Iterator<Item = &CountsRow> {
        self.history.iter().flatten()
    }

    /// Most recent recorded counts for a claim.
    pub fn latest(&self, claim: usize) -> Option<&StateCounts> {
        self.history(claim).last().map(|row| &row.counts)
    }

    pub fn summaries(&self) -> &[ClaimSummary] {
        &self.summaries
    }

    pub fn pending_spatial(&self) -> usize {
        self.spatial.len()
    }

    /// Take the buffered spatial rows, leaving the buffer empty.
    pub fn drain_spatial(&mut self) -> Vec<SpatialRecord> {
        std::mem::take(&mut self.spatial)
    }
}

fn spatial_record(tick: u64, agent: &Agent, claim: &Claim, state: BeliefState) -> SpatialRecord {
    SpatialRecord {
        tick,
        agent_id: agent.id.0,
        district_id: agent.district.0,
        school_id: agent.school.map(|id| id.0),
        religious_id: agent.religious.map(|id| id.0),
        workplace_id: agent.workplace.map(|id| id.0),
        claim_id: claim.id.0,
        state,
        is_misinformation: claim.is_misinformation,
        ethnicity: agent.demographics.ethnicity.code(),
        denomination: agent.demographics.denomination.code(),
    }
}

/// System: record the committed state of the tick that just ran.
pub fn record_metrics(
    clock: Res<SimClock>,
    claims: Res<ClaimRegistry>,
    population: Res<Population>,
    board: Res<BeliefBoard>,
    mut recorder: ResMut<MetricsRecorder>,
) {
    recorder.record(clock.tick, &claims, &population, &*board);
}
