//! Rewiring System
//!
//! Cuts ties that a Propagating agent keeps failing to reach, then gives the
//! agent a fresh tie elsewhere in the city.

use bevy_ecs::prelude::*;
use rand::seq::SliceRandom;
use rand::Rng;
use sedpnr_records::BeliefState;
use tracing::debug;

use crate::components::agent::{AgentId, Population};
use crate::components::belief::{BeliefBoard, BeliefQuery};
use crate::components::claim::ClaimRegistry;
use crate::config::SimConfig;
use crate::SimRng;

/// Resource: running totals of graph changes.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetworkStats {
    pub initial_edges: usize,
    pub edges_pruned: usize,
    pub edges_rewired: usize,
}

/// Changes made in one rewiring pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewireOutcome {
    pub pruned: usize,
    pub rewired: usize,
}

/// Update tie tenures and collect the ties whose Susceptible peer has run out
/// of patience.
///
/// Tenure counts consecutive ticks: it only grows while the agent is
/// Propagating and the peer Susceptible, and every other tick resets it.
pub fn mark_unresponsive(
    population: &mut Population,
    board: &BeliefBoard,
    claims: &ClaimRegistry,
    patience: u32,
) -> Vec<(AgentId, AgentId)> {
    let mut marked = Vec::new();
    for index in 0..population.len() {
        let agent = AgentId(index as u32);
        let spreading = claims
            .iter()
            .map(|claim| claim.id)
            .find(|&claim| board.state_of(agent, claim) == BeliefState::Propagating);

        let peers: Vec<AgentId> = population.agent(agent).neighbors().collect();
        for peer in peers {
            let idle = spreading
                .is_some_and(|claim| board.state_of(peer, claim) == BeliefState::Susceptible);
            let Some(link) = population.link_mut(agent, peer) else {
                continue;
            };
            if idle {
                link.tenure += 1;
                if link.tenure >= patience {
                    marked.push((agent, peer));
                }
            } else {
                link.tenure = 0;
            }
        }
    }
    marked
}

/// Uniform pick among agents `agent` could still tie to.
pub fn pick_partner<R: Rng>(
    population: &Population,
    agent: AgentId,
    dropped: AgentId,
    max_degree: usize,
    rng: &mut R,
) -> Option<AgentId> {
    let me = population.get(agent)?;
    let candidates: Vec<AgentId> = population
        .agents()
        .iter()
        .filter(|other| {
            other.id != agent
                && other.id != dropped
                && other.degree() < max_degree
                && !me.is_linked(other.id)
        })
        .map(|other| other.id)
        .collect();
    candidates.choose(rng).copied()
}

/// One full pruning pass. Does nothing when pruning is disabled.
pub fn rewire<R: Rng>(
    population: &mut Population,
    board: &BeliefBoard,
    claims: &ClaimRegistry,
    config: &SimConfig,
    rng: &mut R,
) -> RewireOutcome {
    let mut outcome = RewireOutcome::default();
    if !config.rewiring.enable_pruning {
        return outcome;
    }
    let max_degree = config.network.max_connections;

    let marked = mark_unresponsive(population, board, claims, config.rewiring.connection_patience);
    for (agent, peer) in marked {
        if !population.disconnect(agent, peer) {
            continue;
        }
        outcome.pruned += 1;

        if let Some(partner) = pick_partner(population, agent, peer, max_degree, rng) {
            if population.connect(agent, partner, max_degree) {
                outcome.rewired += 1;
            }
        }
    }

    debug_assert!(population.is_consistent(max_degree), "asymmetric or over-full adjacency");
    outcome
}

/// System: prune and rewire after diffusion.
pub fn rewire_connections(
    config: Res<SimConfig>,
    claims: Res<ClaimRegistry>,
    board: Res<BeliefBoard>,
    mut population: ResMut<Population>,
    mut stats: ResMut<NetworkStats>,
    mut rng: ResMut<SimRng>,
) {
    let outcome = rewire(&mut population, &board, &claims, &config, &mut rng.0);
    if outcome.pruned > 0 {
        debug!(pruned = outcome.pruned, rewired = outcome.rewired, "rewired network");
    }
    stats.edges_pruned += outcome.pruned;
    stats.edges_rewired += outcome.rewired;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::agent::Agent;
    use crate::components::claim::Claim;
    use crate::components::demographics::{Demographics, Denomination, Ethnicity};
    use crate::components::location::DistrictId;
    use crate::config::ClaimConfig;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn agent(id: u32) -> Agent {
        Agent {
            id: AgentId(id),
            demographics: Demographics {
                age: 40,
                ethnicity: Ethnicity::Hispanic,
                denomination: Denomination::Catholic,
                education: 2,
            },
            district: DistrictId(0),
            school: None,
            religious: None,
            workplace: None,
            credibility: 0.5,
            links: Vec::new(),
        }
    }

    struct Fixture {
        population: Population,
        board: BeliefBoard,
        claims: ClaimRegistry,
        config: SimConfig,
    }

    /// Agent 0 propagates to Susceptible agent 1; agents 2 and 3 are free.
    fn fixture(patience: u32) -> Fixture {
        let mut population = Population::new((0..4).map(agent).collect());
        population.connect(AgentId(0), AgentId(1), 10);
        let mut board = BeliefBoard::new(4);
        let mut claims = ClaimRegistry::new();
        board.add_claim();
        let id = claims.register(Claim::truth("t", &ClaimConfig::default()), 0);
        board.set_state(AgentId(0), id, BeliefState::Propagating);

        let mut config = SimConfig::default();
        config.rewiring.connection_patience = patience;
        Fixture {
            population,
            board,
            claims,
            config,
        }
    }

    #[test]
    fn test_tenure_grows_until_patience() {
        let mut f = fixture(3);
        let mut rng = SmallRng::seed_from_u64(1);

        for _ in 0..2 {
            let outcome = rewire(&mut f.population, &f.board, &f.claims, &f.config, &mut rng);
            assert_eq!(outcome, RewireOutcome::default());
        }
        let link = f.population.agent(AgentId(0)).links[0];
        assert_eq!(link.tenure, 2);

        let outcome = rewire(&mut f.population, &f.board, &f.claims, &f.config, &mut rng);
        assert_eq!(outcome.pruned, 1);
        assert_eq!(outcome.rewired, 1);
        assert!(!f.population.agent(AgentId(0)).is_linked(AgentId(1)));
        let partner = f.population.agent(AgentId(0)).links[0].peer;
        assert!(partner == AgentId(2) || partner == AgentId(3));
        assert!(f.population.is_consistent(f.config.network.max_connections));
    }

    #[test]
    fn test_responsive_peer_resets_tenure() {
        let mut f = fixture(3);
        let mut rng = SmallRng::seed_from_u64(1);
        rewire(&mut f.population, &f.board, &f.claims, &f.config, &mut rng);

        let claim = f.claims.iter().next().unwrap().id;
        f.board.set_state(AgentId(1), claim, BeliefState::Exposed);
        rewire(&mut f.population, &f.board, &f.claims, &f.config, &mut rng);

        assert_eq!(f.population.agent(AgentId(0)).links[0].tenure, 0);
    }

    #[test]
    fn test_disabled_pruning_is_a_no_op() {
        let mut f = fixture(1);
        f.config.rewiring.enable_pruning = false;
        let mut rng = SmallRng::seed_from_u64(1);

        let outcome = rewire(&mut f.population, &f.board, &f.claims, &f.config, &mut rng);
        assert_eq!(outcome, RewireOutcome::default());
        assert!(f.population.agent(AgentId(0)).is_linked(AgentId(1)));
    }

    #[test]
    fn test_no_candidate_leaves_graph_smaller() {
        let mut f = fixture(1);
        f.config.network.max_connections = 1;
        f.population.connect(AgentId(2), AgentId(3), 1);
        let mut rng = SmallRng::seed_from_u64(1);

        let outcome = rewire(&mut f.population, &f.board, &f.claims, &f.config, &mut rng);
        assert_eq!(outcome.pruned, 1);
        assert_eq!(outcome.rewired, 0);
        assert_eq!(f.population.total_edges(), 1);
    }

    #[test]
    fn test_pick_partner_excludes_dropped_and_linked() {
        let mut population = Population::new((0..3).map(agent).collect());
        population.connect(AgentId(0), AgentId(2), 5);
        let mut rng = SmallRng::seed_from_u64(1);

        assert_eq!(pick_partner(&population, AgentId(0), AgentId(1), 5, &mut rng), None);
        assert_eq!(pick_partner(&population, AgentId(1), AgentId(0), 5, &mut rng), Some(AgentId(2)));
    }

    #[test]
    fn test_tenure_resets_while_not_propagating() {
        let mut f = fixture(3);
        let claim = f.claims.iter().next().unwrap().id;
        let mut rng = SmallRng::seed_from_u64(1);

        for _ in 0..2 {
            rewire(&mut f.population, &f.board, &f.claims, &f.config, &mut rng);
        }
        assert_eq!(f.population.agent(AgentId(0)).links[0].tenure, 2);

        f.board.set_state(AgentId(0), claim, BeliefState::NotSpreading);
        for _ in 0..10 {
            let outcome = rewire(&mut f.population, &f.board, &f.claims, &f.config, &mut rng);
            assert_eq!(outcome, RewireOutcome::default());
        }
        assert_eq!(f.population.agent(AgentId(0)).links[0].tenure, 0);

        // Back to spreading: the tie needs a full run of patience again.
        f.board.set_state(AgentId(0), claim, BeliefState::Propagating);
        for _ in 0..2 {
            let outcome = rewire(&mut f.population, &f.board, &f.claims, &f.config, &mut rng);
            assert_eq!(outcome.pruned, 0);
        }
        assert!(f.population.agent(AgentId(0)).is_linked(AgentId(1)));

        let outcome = rewire(&mut f.population, &f.board, &f.claims, &f.config, &mut rng);
        assert_eq!(outcome.pruned, 1);
    }
}
