//! Agent Components
//!
//! Inhabitants of the city, their social ties, and the population that owns them.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

use super::demographics::{AgeGroup, Demographics};
use super::location::{DistrictId, LocationId};
use crate::config::{CredibilityConfig, NetworkConfig};

/// Dense agent id; also the agent's index in [`Population`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub u32);

impl AgentId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// An undirected tie as seen from one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub peer: AgentId,
    /// Consecutive ticks the peer stayed Susceptible while this agent propagated
    pub tenure: u32,
}

impl Link {
    pub fn new(peer: AgentId) -> Self {
        Self { peer, tenure: 0 }
    }
}

/// One inhabitant: fixed demographics and site memberships, mutable ties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub demographics: Demographics,
    pub district: DistrictId,
    pub school: Option<LocationId>,
    pub religious: Option<LocationId>,
    pub workplace: Option<LocationId>,
    /// In [0, 1]
    pub credibility: f64,
    pub links: Vec<Link>,
}

impl Agent {
    pub fn age_group(&self) -> AgeGroup {
        AgeGroup::of(self.demographics.age)
    }

    pub fn passing_frequency(&self) -> f64 {
        self.age_group().passing_frequency()
    }

    pub fn degree(&self) -> usize {
        self.links.len()
    }

    pub fn neighbors(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.links.iter().map(|link| link.peer)
    }

    pub fn is_linked(&self, other: AgentId) -> bool {
        self.links.iter().any(|link| link.peer == other)
    }

    /// Influence multiplier between two agents: 1.0 plus demographic bonuses.
    pub fn similarity(&self, other: &Agent) -> f64 {
        let a = &self.demographics;
        let b = &other.demographics;
        let mut score = 1.0;
        if a.ethnicity == b.ethnicity {
            score += 0.2;
        }
        if a.denomination == b.denomination {
            score += 0.2;
        }
        if a.age.abs_diff(b.age) <= 10 {
            score += 0.1;
        }
        if a.education.abs_diff(b.education) <= 1 {
            score += 0.1;
        }
        score
    }

    /// Chance that a tie forms between two agents, clamped to [0, 1].
    ///
    /// Site bonuses only count when both agents hold the same assigned site.
    pub fn interaction_probability(&self, other: &Agent, network: &NetworkConfig) -> f64 {
        fn shared(a: Option<LocationId>, b: Option<LocationId>) -> bool {
            matches!((a, b), (Some(x), Some(y)) if x == y)
        }

        let mut prob = network.base_interaction_prob;
        if shared(self.school, other.school) {
            prob += network.same_school_weight;
        }
        if shared(self.religious, other.religious) {
            prob += network.same_religious_weight;
        }
        if shared(self.workplace, other.workplace) {
            prob += network.same_workplace_weight;
        }
        if self.district == other.district {
            prob += network.same_district_weight;
        }
        if self.age_group() == other.age_group() {
            prob += network.age_group_weight;
        }
        if self.demographics.ethnicity == other.demographics.ethnicity {
            prob += network.ethnicity_weight;
        }
        prob.clamp(0.0, 1.0)
    }

    fn link_mut(&mut self, peer: AgentId) -> Option<&mut Link> {
        self.links.iter_mut().find(|link| link.peer == peer)
    }
}

/// Credibility from a bell curve over age plus normalized education.
pub fn credibility(demographics: &Demographics, config: &CredibilityConfig) -> f64 {
    let age_factor = if config.age_spread > 0.0 {
        let delta = demographics.age as f64 - config.age_optimal;
        (-(delta * delta) / (2.0 * config.age_spread * config.age_spread)).exp()
    } else {
        0.0
    };
    let education = demographics.education as f64 / 5.0;
    (config.age_weight * age_factor + config.edu_weight * education).clamp(0.0, 1.0)
}

/// Resource: every agent, indexed by [`AgentId`].
#[derive(Resource, Debug, Clone, Default, Serialize, Deserialize)]
pub struct Population {
    agents: Vec<Agent>,
}

impl Population {
    pub fn new(agents: Vec<Agent>) -> Self {
        debug_assert!(agents
            .iter()
            .enumerate()
            .all(|(i, agent)| agent.id.index() == i));
        Self { agents }
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(id.index())
    }

    /// Panics on an out-of-range id; ids come from this population.
    pub fn agent(&self, id: AgentId) -> &Agent {
        &self.agents[id.index()]
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn ids(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.agents.iter().map(|agent| agent.id)
    }

    pub fn total_edges(&self) -> usize {
        self.agents.iter().map(Agent::degree).sum::<usize>() / 2
    }

    pub fn mean_degree(&self) -> f64 {
        if self.agents.is_empty() {
            return 0.0;
        }
        self.agents.iter().map(Agent::degree).sum::<usize>() as f64 / self.agents.len() as f64
    }

    /// Add the undirected tie `a`–`b` if neither endpoint is at `max_degree`.
    ///
    /// Self loops and duplicates are refused. Returns whether the tie was added.
    pub fn connect(&mut self, a: AgentId, b: AgentId, max_degree: usize) -> bool {
        if a == b || a.index() >= self.agents.len() || b.index() >= self.agents.len() {
            return false;
        }
        let (left, right) = (self.agent(a), self.agent(b));
        if left.degree() >= max_degree || right.degree() >= max_degree || left.is_linked(b) {
            return false;
        }
        self.agents[a.index()].links.push(Link::new(b));
        self.agents[b.index()].links.push(Link::new(a));
        true
    }

    /// Remove the tie `a`–`b` from both sides. Returns whether it existed.
    pub fn disconnect(&mut self, a: AgentId, b: AgentId) -> bool {
        let before = self.agents[a.index()].links.len();
        self.agents[a.index()].links.retain(|link| link.peer != b);
        self.agents[b.index()].links.retain(|link| link.peer != a);
        self.agents[a.index()].links.len() != before
    }

    /// Mutable access to `agent`'s view of its tie to `peer`.
    pub fn link_mut(&mut self, agent: AgentId, peer: AgentId) -> Option<&mut Link> {
        self.agents.get_mut(agent.index())?.link_mut(peer)
    }

    /// True when every tie is listed by both endpoints and nobody exceeds `max_degree`.
    pub fn is_consistent(&self, max_degree: usize) -> bool {
        self.agents.iter().all(|agent| {
            agent.degree() <= max_degree
                && agent.links.iter().all(|link| {
                    link.peer != agent.id
                        && self
                            .get(link.peer)
                            .is_some_and(|peer| peer.is_linked(agent.id))
                })
        })
    }
}
