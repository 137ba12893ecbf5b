//! Claim Components
//!
//! Claim definitions and the registry that hands out dense claim ids.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

use super::agent::AgentId;
use crate::config::ClaimConfig;

/// Dense claim id; also the claim's column in the belief board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClaimId(pub u32);

impl ClaimId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A piece of information circulating through the population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub id: ClaimId,
    pub name: String,
    pub is_misinformation: bool,
    /// Higher thresholds make Doubtful agents slower to propagate
    pub adoption_threshold: f64,
    /// Multiplier on exposure
    pub spread_rate: f64,
    pub origin_agent: Option<AgentId>,
    pub origin_tick: u64,
}

impl Claim {
    /// A truthful claim using the configured truth threshold.
    pub fn truth(name: impl Into<String>, config: &ClaimConfig) -> Self {
        Self::with_threshold(name, false, config.truth_threshold)
    }

    /// A false claim using the configured misinformation threshold.
    pub fn misinformation(name: impl Into<String>, config: &ClaimConfig) -> Self {
        Self::with_threshold(name, true, config.misinfo_threshold)
    }

    /// Pick the constructor from a flag.
    pub fn from_kind(name: impl Into<String>, is_misinformation: bool, config: &ClaimConfig) -> Self {
        if is_misinformation {
            Self::misinformation(name, config)
        } else {
            Self::truth(name, config)
        }
    }

    fn with_threshold(name: impl Into<String>, is_misinformation: bool, threshold: f64) -> Self {
        Self {
            // Assigned on registration
            id: ClaimId(0),
            name: name.into(),
            is_misinformation,
            adoption_threshold: threshold,
            spread_rate: 1.0,
            origin_agent: None,
            origin_tick: 0,
        }
    }

    pub fn with_spread_rate(mut self, spread_rate: f64) -> Self {
        self.spread_rate = spread_rate;
        self
    }

    /// Claims of opposite truthfulness pull Doubtful and NotSpreading agents back.
    pub fn opposes(&self, other: &Claim) -> bool {
        self.id != other.id && self.is_misinformation != other.is_misinformation
    }

    pub fn kind_label(&self) -> &'static str {
        if self.is_misinformation {
            "Misinformation"
        } else {
            "Truth"
        }
    }
}

/// Resource: claims in registration order. `claims[i].id == ClaimId(i)`.
#[derive(Resource, Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClaimRegistry {
    claims: Vec<Claim>,
}

impl ClaimRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `claim`, assigning the next dense id and the origin tick.
    pub fn register(&mut self, mut claim: Claim, tick: u64) -> ClaimId {
        let id = ClaimId(self.claims.len() as u32);
        claim.id = id;
        claim.origin_tick = tick;
        self.claims.push(claim);
        id
    }

    pub fn get(&self, id: ClaimId) -> Option<&Claim> {
        self.claims.get(id.index())
    }

    /// Record the first seeded agent; later calls are ignored.
    pub fn set_origin(&mut self, id: ClaimId, agent: AgentId) {
        if let Some(claim) = self.claims.get_mut(id.index()) {
            claim.origin_agent.get_or_insert(agent);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Claim> {
        self.claims.iter()
    }

    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    /// Ids of registered claims that oppose `id`.
    pub fn opponents(&self, id: ClaimId) -> Vec<ClaimId> {
        let Some(claim) = self.get(id) else {
            return Vec::new();
        };
        self.claims
            .iter()
            .filter(|other| claim.opposes(other))
            .map(|other| other.id)
            .collect()
    }
}
