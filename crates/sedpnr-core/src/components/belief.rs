//! Belief Board
//!
//! Per-claim SEDPNR state for every agent, stored as one dense column per claim.
//!
//! Each column is double buffered: the diffusion pass reads `current`, writes
//! `next`, and [`BeliefColumn::commit`] swaps them once every agent has rolled.
//! Readers outside the engine only ever see committed state.

use bevy_ecs::prelude::*;
use sedpnr_records::{BeliefState, StateCounts};

use super::agent::AgentId;
use super::claim::ClaimId;

/// Narrow read access to belief state, used by metrics and output.
pub trait BeliefQuery {
    fn state_of(&self, agent: AgentId, claim: ClaimId) -> BeliefState;
}

/// One claim's states, pending states, and time spent in the current state.
#[derive(Debug, Clone)]
pub struct BeliefColumn {
    current: Vec<BeliefState>,
    next: Vec<BeliefState>,
    time_in_state: Vec<u32>,
}

impl BeliefColumn {
    fn new(population: usize) -> Self {
        Self {
            current: vec![BeliefState::Susceptible; population],
            next: vec![BeliefState::Susceptible; population],
            time_in_state: vec![0; population],
        }
    }

    pub fn current(&self) -> &[BeliefState] {
        &self.current
    }

    pub fn time_in_state(&self) -> &[u32] {
        &self.time_in_state
    }

    /// Write buffer for the pass in progress.
    pub fn next_mut(&mut self) -> &mut [BeliefState] {
        &mut self.next
    }

    /// Committed states and time-in-state, alongside the write buffer.
    pub fn stage(&mut self) -> (&[BeliefState], &[u32], &mut [BeliefState]) {
        (&self.current, &self.time_in_state, &mut self.next)
    }

    /// Swap in the pending states. Unchanged agents age by one tick; changed ones reset.
    pub fn commit(&mut self) {
        for ((time, old), new) in self
            .time_in_state
            .iter_mut()
            .zip(&self.current)
            .zip(&self.next)
        {
            if old == new {
                *time = time.saturating_add(1);
            } else {
                *time = 0;
            }
        }
        std::mem::swap(&mut self.current, &mut self.next);
    }

    pub fn counts(&self) -> StateCounts {
        self.current.iter().copied().collect()
    }
}

/// Resource: belief state of every agent for every registered claim.
#[derive(Resource, Debug, Clone, Default)]
pub struct BeliefBoard {
    population: usize,
    columns: Vec<BeliefColumn>,
}

impl BeliefBoard {
    pub fn new(population: usize) -> Self {
        Self {
            population,
            columns: Vec::new(),
        }
    }

    pub fn population(&self) -> usize {
        self.population
    }

    pub fn claim_count(&self) -> usize {
        self.columns.len()
    }

    /// Open a column for the next claim id, everyone Susceptible.
    pub fn add_claim(&mut self) -> ClaimId {
        let id = ClaimId(self.columns.len() as u32);
        self.columns.push(BeliefColumn::new(self.population));
        id
    }

    pub fn column(&self, claim: ClaimId) -> Option<&BeliefColumn> {
        self.columns.get(claim.index())
    }

    pub fn column_mut(&mut self, claim: ClaimId) -> Option<&mut BeliefColumn> {
        self.columns.get_mut(claim.index())
    }

    pub fn time_in_state(&self, agent: AgentId, claim: ClaimId) -> u32 {
        self.columns
            .get(claim.index())
            .and_then(|column| column.time_in_state.get(agent.index()))
            .copied()
            .unwrap_or(0)
    }

    /// Force a committed state, resetting time-in-state. Used for seeding.
    pub fn set_state(&mut self, agent: AgentId, claim: ClaimId, state: BeliefState) {
        debug_assert!(agent.index() < self.population, "agent id out of bounds");
        if let Some(column) = self.columns.get_mut(claim.index()) {
            column.current[agent.index()] = state;
            column.time_in_state[agent.index()] = 0;
        }
    }

    /// The claim `agent` is engaged with, if any.
    pub fn engaged_claim(&self, agent: AgentId) -> Option<ClaimId> {
        self.columns
            .iter()
            .position(|column| column.current[agent.index()].is_engaged())
            .map(|index| ClaimId(index as u32))
    }

    /// Whether `agent` is non-Susceptible for any claim other than `claim`.
    pub fn is_engaged_elsewhere(&self, agent: AgentId, claim: ClaimId) -> bool {
        self.columns
            .iter()
            .enumerate()
            .any(|(index, column)| index != claim.index() && column.current[agent.index()].is_engaged())
    }

    pub fn counts(&self, claim: ClaimId) -> StateCounts {
        self.column(claim)
            .map(BeliefColumn::counts)
            .unwrap_or_default()
    }

    /// No agent is engaged with more than one claim.
    pub fn single_engagement_holds(&self) -> bool {
        (0..self.population).all(|agent| {
            self.columns
                .iter()
                .filter(|column| column.current[agent].is_engaged())
                .count()
                <= 1
        })
    }
}

impl BeliefQuery for BeliefBoard {
    fn state_of(&self, agent: AgentId, claim: ClaimId) -> BeliefState {
        self.columns
            .get(claim.index())
            .and_then(|column| column.current.get(agent.index()))
            .copied()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_columns_start_susceptible() {
        let mut board = BeliefBoard::new(4);
        let claim = board.add_claim();

        assert_eq!(board.state_of(AgentId(3), claim), BeliefState::Susceptible);
        assert_eq!(board.counts(claim).susceptible, 4);
        assert_eq!(board.engaged_claim(AgentId(0)), None);
    }

    #[test]
    fn test_commit_swaps_and_tracks_time_in_state() {
        let mut board = BeliefBoard::new(2);
        let claim = board.add_claim();

        let column = board.column_mut(claim).unwrap();
        column.next_mut()[0] = BeliefState::Exposed;
        column.next_mut()[1] = BeliefState::Susceptible;
        column.commit();

        assert_eq!(board.state_of(AgentId(0), claim), BeliefState::Exposed);
        assert_eq!(board.time_in_state(AgentId(0), claim), 0);
        assert_eq!(board.time_in_state(AgentId(1), claim), 1);
    }

    #[test]
    fn test_engagement_across_claims() {
        let mut board = BeliefBoard::new(3);
        let first = board.add_claim();
        let second = board.add_claim();

        board.set_state(AgentId(1), second, BeliefState::Propagating);

        assert_eq!(board.engaged_claim(AgentId(1)), Some(second));
        assert!(board.is_engaged_elsewhere(AgentId(1), first));
        assert!(!board.is_engaged_elsewhere(AgentId(1), second));
        assert!(board.single_engagement_holds());

        board.set_state(AgentId(1), first, BeliefState::Recovered);
        assert!(!board.single_engagement_holds());
    }

    #[test]
    fn test_unknown_claim_reads_as_susceptible() {
        let board = BeliefBoard::new(2);
        assert_eq!(board.state_of(AgentId(0), ClaimId(5)), BeliefState::Susceptible);
        assert_eq!(board.counts(ClaimId(5)).total(), 0);
    }
}
