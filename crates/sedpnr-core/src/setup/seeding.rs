//! Claim Seeding
//!
//! Picks the initial propagators of a newly registered claim.
//!
//! Only agents not engaged with any other claim are eligible, so seeding never
//! breaks the single-engagement rule.

use rand::seq::SliceRandom;
use rand::Rng;
use sedpnr_records::BeliefState;
use tracing::{info, warn};

use crate::components::agent::{AgentId, Population};
use crate::components::belief::BeliefBoard;
use crate::components::claim::{ClaimId, ClaimRegistry};

/// Seed up to `count` propagators drawn without replacement from the whole population.
pub fn seed_global<R: Rng>(
    claim: ClaimId,
    count: usize,
    population: &Population,
    board: &mut BeliefBoard,
    claims: &mut ClaimRegistry,
    rng: &mut R,
) -> Vec<AgentId> {
    let mut eligible = eligible_agents(population.ids(), board);
    let take = count.min(eligible.len());
    if take < count {
        warn!(
            claim = claim.0,
            requested = count,
            available = eligible.len(),
            "not enough unengaged agents to seed"
        );
    }

    let (chosen, _) = eligible.partial_shuffle(rng, take);
    let chosen = chosen.to_vec();
    apply(claim, &chosen, board, claims);
    chosen
}

/// Seed up to `per_district` propagators in every district, in district order.
pub fn seed_per_district<R: Rng>(
    claim: ClaimId,
    per_district: usize,
    district_count: usize,
    population: &Population,
    board: &mut BeliefBoard,
    claims: &mut ClaimRegistry,
    rng: &mut R,
) -> Vec<AgentId> {
    let mut by_district: Vec<Vec<AgentId>> = vec![Vec::new(); district_count];
    for agent in population.agents() {
        if let Some(bucket) = by_district.get_mut(agent.district.index()) {
            bucket.push(agent.id);
        }
    }

    let mut chosen = Vec::new();
    for members in by_district {
        let mut eligible = eligible_agents(members.into_iter(), board);
        let take = per_district.min(eligible.len());
        let (picked, _) = eligible.partial_shuffle(rng, take);
        chosen.extend_from_slice(picked);
    }

    apply(claim, &chosen, board, claims);
    chosen
}

fn eligible_agents(candidates: impl Iterator<Item = AgentId>, board: &BeliefBoard) -> Vec<AgentId> {
    candidates
        .filter(|agent| board.engaged_claim(*agent).is_none())
        .collect()
}

fn apply(claim: ClaimId, chosen: &[AgentId], board: &mut BeliefBoard, claims: &mut ClaimRegistry) {
    for &agent in chosen {
        board.set_state(agent, claim, BeliefState::Propagating);
    }
    if let Some(&first) = chosen.first() {
        claims.set_origin(claim, first);
    }
    debug_assert!(board.single_engagement_holds());
    info!(claim = claim.0, propagators = chosen.len(), "seeded claim");
}
