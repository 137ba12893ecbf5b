//! Belief States
//!
//! The six SEDPNR belief states and per-tick state tallies.
//!
//! State codes are stable (0..=5) because the spatial stream stores them as
//! integers and downstream consumers decode them by value.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An agent's relationship to one claim.
///
/// Susceptible -> Exposed -> Doubtful -> Propagating / NotSpreading -> Recovered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum BeliefState {
    /// Has not encountered the claim
    #[default]
    Susceptible = 0,
    /// Has encountered the claim but is not evaluating it yet
    Exposed = 1,
    /// Actively evaluating the claim
    Doubtful = 2,
    /// Adopted and actively spreading
    Propagating = 3,
    /// Adopted but passive
    NotSpreading = 4,
    /// Rejected or disengaged (misinformation only)
    Recovered = 5,
}

impl BeliefState {
    /// All states in code order.
    pub const ALL: [BeliefState; 6] = [
        BeliefState::Susceptible,
        BeliefState::Exposed,
        BeliefState::Doubtful,
        BeliefState::Propagating,
        BeliefState::NotSpreading,
        BeliefState::Recovered,
    ];

    /// Numeric code used in the spatial stream.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Decodes a numeric state code.
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    /// Single-letter abbreviation (S, E, D, P, N, R).
    pub fn as_char(self) -> char {
        match self {
            BeliefState::Susceptible => 'S',
            BeliefState::Exposed => 'E',
            BeliefState::Doubtful => 'D',
            BeliefState::Propagating => 'P',
            BeliefState::NotSpreading => 'N',
            BeliefState::Recovered => 'R',
        }
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            BeliefState::Susceptible => "Susceptible",
            BeliefState::Exposed => "Exposed",
            BeliefState::Doubtful => "Doubtful",
            BeliefState::Propagating => "Propagating",
            BeliefState::NotSpreading => "Not-Spreading",
            BeliefState::Recovered => "Recovered",
        }
    }

    /// Anything other than Susceptible counts as engagement with the claim.
    pub fn is_engaged(self) -> bool {
        self != BeliefState::Susceptible
    }

    /// Propagating or NotSpreading: the agent holds the claim.
    pub fn is_adopted(self) -> bool {
        matches!(self, BeliefState::Propagating | BeliefState::NotSpreading)
    }
}

impl fmt::Display for BeliefState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a state string cannot be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStateError(pub String);

impl fmt::Display for ParseStateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid belief state: '{}'", self.0)
    }
}

impl std::error::Error for ParseStateError {}

impl FromStr for BeliefState {
    type Err = ParseStateError;

    /// Accepts a numeric code, the single letter, or the name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(code) = trimmed.parse::<u8>() {
            return Self::from_code(code).ok_or_else(|| ParseStateError(s.to_string()));
        }
        Self::ALL
            .iter()
            .copied()
            .find(|state| {
                trimmed.eq_ignore_ascii_case(state.name())
                    || (trimmed.len() == 1
                        && trimmed.eq_ignore_ascii_case(&state.as_char().to_string()))
            })
            .ok_or_else(|| ParseStateError(s.to_string()))
    }
}

/// Number of agents in each state for one claim at one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateCounts {
    pub susceptible: usize,
    pub exposed: usize,
    pub doubtful: usize,
    pub propagating: usize,
    pub not_spreading: usize,
    pub recovered: usize,
}

impl StateCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more agent in `state`.
    pub fn record(&mut self, state: BeliefState) {
        *self.slot_mut(state) += 1;
    }

    /// Number of agents in `state`.
    pub fn get(&self, state: BeliefState) -> usize {
        match state {
            BeliefState::Susceptible => self.susceptible,
            BeliefState::Exposed => self.exposed,
            BeliefState::Doubtful => self.doubtful,
            BeliefState::Propagating => self.propagating,
            BeliefState::NotSpreading => self.not_spreading,
            BeliefState::Recovered => self.recovered,
        }
    }

    /// Sum over all six states; always equals the population size.
    pub fn total(&self) -> usize {
        self.susceptible
            + self.exposed
            + self.doubtful
            + self.propagating
            + self.not_spreading
            + self.recovered
    }

    /// Agents that have left Susceptible.
    pub fn engaged(&self) -> usize {
        self.total() - self.susceptible
    }

    fn slot_mut(&mut self, state: BeliefState) -> &mut usize {
        match state {
            BeliefState::Susceptible => &mut self.susceptible,
            BeliefState::Exposed => &mut self.exposed,
            BeliefState::Doubtful => &mut self.doubtful,
            BeliefState::Propagating => &mut self.propagating,
            BeliefState::NotSpreading => &mut self.not_spreading,
            BeliefState::Recovered => &mut self.recovered,
        }
    }
}

impl FromIterator<BeliefState> for StateCounts {
    fn from_iter<I: IntoIterator<Item = BeliefState>>(iter: I) -> Self {
        let mut counts = StateCounts::new();
        for state in iter {
            counts.record(state);
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_codes_are_stable() {
        for (i, state) in BeliefState::ALL.iter().enumerate() {
            assert_eq!(state.code() as usize, i);
            assert_eq!(BeliefState::from_code(i as u8), Some(*state));
        }
        assert_eq!(BeliefState::from_code(6), None);
    }

    #[test]
    fn test_parse_state() {
        assert_eq!("3".parse::<BeliefState>().unwrap(), BeliefState::Propagating);
        assert_eq!("n".parse::<BeliefState>().unwrap(), BeliefState::NotSpreading);
        assert_eq!("Not-Spreading".parse::<BeliefState>().unwrap(), BeliefState::NotSpreading);
        assert_eq!("recovered".parse::<BeliefState>().unwrap(), BeliefState::Recovered);
        assert!("9".parse::<BeliefState>().is_err());
        assert!("unknown".parse::<BeliefState>().is_err());
    }

    #[test]
    fn test_engagement_helpers() {
        assert!(!BeliefState::Susceptible.is_engaged());
        assert!(BeliefState::Recovered.is_engaged());
        assert!(BeliefState::Propagating.is_adopted());
        assert!(BeliefState::NotSpreading.is_adopted());
        assert!(!BeliefState::Doubtful.is_adopted());
    }

    #[test]
    fn test_state_counts_tally() {
        let counts: StateCounts = [
            BeliefState::Susceptible,
            BeliefState::Susceptible,
            BeliefState::Propagating,
            BeliefState::Recovered,
        ]
        .into_iter()
        .collect();

        assert_eq!(counts.susceptible, 2);
        assert_eq!(counts.get(BeliefState::Propagating), 1);
        assert_eq!(counts.recovered, 1);
        assert_eq!(counts.total(), 4);
        assert_eq!(counts.engaged(), 2);
    }
}
