//! Diffusion System
//!
//! Advances every agent's SEDPNR state for each claim, one claim at a time.
//!
//! Opposing-spreader flags for every claim are taken from the state at the
//! start of the tick, before any claim commits, so registration order never
//! changes who is opposed.
//!
//! A claim pass then has two phases. The neighborhood phase reads the claim's
//! own previous states and runs in parallel; it consumes no randomness. The
//! roll phase walks agents in id order with the single simulation RNG, writes
//! the claim's next buffer, and commits it. Only the single-engagement check
//! reads live state, so an agent taken by an earlier claim this tick stays out
//! of later ones.

use bevy_ecs::prelude::*;
use rand::Rng;
use rayon::prelude::*;
use sedpnr_records::BeliefState;

use crate::components::agent::{Agent, Population};
use crate::components::belief::{BeliefBoard, BeliefQuery};
use crate::components::claim::{Claim, ClaimId, ClaimRegistry};
use crate::config::SimConfig;
use crate::SimRng;

/// What an agent can see of its neighbors for one claim.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Neighborhood {
    /// Sum of `similarity^homophily` over Propagating neighbors
    pub exposure: f64,
    /// Some neighbor is Propagating or NotSpreading
    pub reinforced: bool,
    /// Some neighbor was Propagating an opposing claim at the start of the tick
    pub opposed: bool,
    /// The agent itself is engaged with a different claim
    pub engaged_elsewhere: bool,
}

impl Neighborhood {
    /// Inspect `agent`'s neighbors for `claim`. Pure read of committed state.
    ///
    /// `opposed` is left unset; it comes from [`opposed_flags`].
    pub fn observe(
        agent: &Agent,
        claim: ClaimId,
        population: &Population,
        board: &impl BeliefQuery,
        homophily: f64,
    ) -> Self {
        let mut view = Neighborhood::default();
        for peer_id in agent.neighbors() {
            let state = board.state_of(peer_id, claim);
            if state == BeliefState::Propagating {
                let similarity = agent.similarity(population.agent(peer_id));
                view.exposure += similarity.powf(homophily);
            }
            if state.is_adopted() {
                view.reinforced = true;
            }
        }
        view
    }
}

/// Per agent: whether some neighbor is Propagating a claim that opposes `claim`.
pub fn opposed_flags(
    claim: ClaimId,
    claims: &ClaimRegistry,
    population: &Population,
    board: &BeliefBoard,
) -> Vec<bool> {
    let opponents = claims.opponents(claim);
    if opponents.is_empty() {
        return vec![false; population.len()];
    }
    population
        .agents()
        .par_iter()
        .map(|agent| {
            agent.neighbors().any(|peer| {
                opponents
                    .iter()
                    .any(|other| board.state_of(peer, *other) == BeliefState::Propagating)
            })
        })
        .collect()
}

/// Everything a single roll needs besides the RNG.
pub struct RollContext<'a> {
    pub agent: &'a Agent,
    pub claim: &'a Claim,
    pub view: Neighborhood,
    pub time_in_state: u32,
    pub config: &'a SimConfig,
}

/// Next state for one agent. Draws at most one number from `rng`.
pub fn transition<R: Rng>(state: BeliefState, ctx: &RollContext<'_>, rng: &mut R) -> BeliefState {
    use BeliefState::*;

    let t = &ctx.config.transitions;
    let misinformation = ctx.claim.is_misinformation;
    let view = &ctx.view;

    // An opposing spreader turns D, P and N into spreaders regardless of dwell.
    if view.opposed && matches!(state, Doubtful | Propagating | NotSpreading) {
        return Propagating;
    }
    if matches!(state, Exposed | Doubtful | Propagating | NotSpreading)
        && ctx.time_in_state < t.min_dwell_ticks
    {
        return state;
    }

    match state {
        Susceptible => {
            if view.engaged_elsewhere || view.exposure <= 0.0 {
                return Susceptible;
            }
            let mut exposure = view.exposure * ctx.claim.spread_rate;
            if misinformation {
                exposure *= ctx.config.claims.misinfo_multiplier;
            }
            let prob = (1.0 - (1.0 - t.prob_s_to_e).powf(exposure)) * ctx.agent.passing_frequency();
            if rng.gen::<f64>() < prob {
                Exposed
            } else {
                Susceptible
            }
        }
        Exposed => {
            if view.reinforced && rng.gen::<f64>() < t.prob_e_to_d {
                Doubtful
            } else {
                Exposed
            }
        }
        Doubtful => {
            let credibility = ctx.agent.credibility;
            let reject = if misinformation {
                t.prob_d_to_r + credibility * ctx.config.credibility.rejection_weight
            } else {
                0.0
            };
            let propagate =
                t.prob_d_to_p * (1.0 - ctx.claim.adoption_threshold) * (0.5 + credibility);
            let not_spread = t.prob_d_to_n;

            let roll = rng.gen::<f64>();
            if roll < reject {
                Recovered
            } else if view.reinforced && roll < reject + propagate {
                Propagating
            } else if view.reinforced && roll < reject + propagate + not_spread {
                NotSpreading
            } else {
                Doubtful
            }
        }
        Propagating => {
            let reject = if misinformation { t.prob_p_to_r } else { 0.0 };
            let roll = rng.gen::<f64>();
            if roll < reject {
                Recovered
            } else if roll < reject + t.prob_p_to_n {
                NotSpreading
            } else {
                Propagating
            }
        }
        NotSpreading => {
            let reject = if misinformation { t.prob_n_to_r } else { 0.0 };
            if rng.gen::<f64>() < reject {
                Recovered
            } else {
                NotSpreading
            }
        }
        Recovered => Recovered,
    }
}

/// Run one full pass for `claim` on its own, reading opposition from the current board.
pub fn diffuse_claim<R: Rng>(
    claim: &Claim,
    claims: &ClaimRegistry,
    population: &Population,
    board: &mut BeliefBoard,
    config: &SimConfig,
    rng: &mut R,
) {
    let opposed = opposed_flags(claim.id, claims, population, board);
    advance_claim(claim, &opposed, population, board, config, rng);
}

/// One claim pass: observe in parallel, roll serially, commit.
///
/// `opposed` holds one flag per agent, taken before any claim of this tick committed.
pub fn advance_claim<R: Rng>(
    claim: &Claim,
    opposed: &[bool],
    population: &Population,
    board: &mut BeliefBoard,
    config: &SimConfig,
    rng: &mut R,
) {
    debug_assert_eq!(board.population(), population.len(), "board out of step with population");
    debug_assert_eq!(opposed.len(), population.len());
    let homophily = config.network.homophily_strength;

    let views: Vec<Neighborhood> = {
        let board: &BeliefBoard = board;
        population
            .agents()
            .par_iter()
            .zip(opposed.par_iter())
            .map(|(agent, &flag)| {
                let mut view =
                    Neighborhood::observe(agent, claim.id, population, board, homophily);
                view.opposed = flag;
                view.engaged_elsewhere = board.is_engaged_elsewhere(agent.id, claim.id);
                view
            })
            .collect()
    };

    let Some(column) = board.column_mut(claim.id) else {
        return;
    };
    let (current, time_in_state, next) = column.stage();
    for (index, agent) in population.agents().iter().enumerate() {
        let ctx = RollContext {
            agent,
            claim,
            view: views[index],
            time_in_state: time_in_state[index],
            config,
        };
        next[index] = transition(current[index], &ctx, rng);
    }
    column.commit();
}

/// Advance every claim by one step, in registration order.
pub fn diffuse_all<R: Rng>(
    claims: &ClaimRegistry,
    population: &Population,
    board: &mut BeliefBoard,
    config: &SimConfig,
    rng: &mut R,
) {
    let opposed: Vec<Vec<bool>> = {
        let start: &BeliefBoard = board;
        claims
            .iter()
            .map(|claim| opposed_flags(claim.id, claims, population, start))
            .collect()
    };
    for (claim, opposed) in claims.iter().zip(&opposed) {
        advance_claim(claim, opposed, population, board, config, rng);
    }
}

/// System: advance every claim by one step.
pub fn diffuse_claims(
    config: Res<SimConfig>,
    claims: Res<ClaimRegistry>,
    population: Res<Population>,
    mut board: ResMut<BeliefBoard>,
    mut rng: ResMut<SimRng>,
) {
    diffuse_all(&claims, &population, &mut board, &config, &mut rng.0);
    debug_assert!(board.single_engagement_holds(), "agent engaged with two claims");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::agent::AgentId;
    use crate::components::demographics::{Demographics, Denomination, Ethnicity};
    use crate::components::location::DistrictId;
    use crate::config::ClaimConfig;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn agent(id: u32) -> Agent {
        Agent {
            id: AgentId(id),
            demographics: Demographics {
                age: 30,
                ethnicity: Ethnicity::White,
                denomination: Denomination::None,
                education: 3,
            },
            district: DistrictId(0),
            school: None,
            religious: None,
            workplace: None,
            credibility: 0.5,
            links: Vec::new(),
        }
    }

    fn line(n: u32) -> Population {
        let mut population = Population::new((0..n).map(agent).collect());
        for i in 1..n {
            population.connect(AgentId(i - 1), AgentId(i), 10);
        }
        population
    }

    fn ctx<'a>(agent: &'a Agent, claim: &'a Claim, view: Neighborhood, config: &'a SimConfig) -> RollContext<'a> {
        RollContext {
            agent,
            claim,
            view,
            time_in_state: 0,
            config,
        }
    }

    #[test]
    fn test_observe_counts_propagating_neighbors() {
        let population = line(3);
        let mut board = BeliefBoard::new(3);
        let claim = board.add_claim();
        board.set_state(AgentId(0), claim, BeliefState::Propagating);
        board.set_state(AgentId(2), claim, BeliefState::NotSpreading);

        let view = Neighborhood::observe(population.agent(AgentId(1)), claim, &population, &board, 2.0);
        // Identical demographics: similarity 1.6, squared.
        assert!((view.exposure - 2.56).abs() < 1e-9);
        assert!(view.reinforced);
        assert!(!view.opposed);
    }

    #[test]
    fn test_opposed_flags_detect_opposing_spreader() {
        let population = line(3);
        let mut board = BeliefBoard::new(3);
        let mut claims = ClaimRegistry::new();
        board.add_claim();
        let truth = claims.register(Claim::truth("t", &ClaimConfig::default()), 0);
        board.add_claim();
        let lie = claims.register(Claim::misinformation("m", &ClaimConfig::default()), 0);
        board.set_state(AgentId(0), lie, BeliefState::Propagating);

        assert_eq!(opposed_flags(truth, &claims, &population, &board), vec![false, true, false]);
        assert_eq!(opposed_flags(lie, &claims, &population, &board), vec![false; 3]);

        let view = Neighborhood::observe(population.agent(AgentId(1)), truth, &population, &board, 2.0);
        assert!(!view.opposed);
        assert_eq!(view.exposure, 0.0);
    }

    #[test]
    fn test_susceptible_without_exposure_never_rolls() {
        let config = SimConfig::default();
        let a = agent(0);
        let claim = Claim::truth("t", &config.claims);
        let mut rng = SmallRng::seed_from_u64(1);
        let before = rng.clone();

        let next = transition(BeliefState::Susceptible, &ctx(&a, &claim, Neighborhood::default(), &config), &mut rng);
        assert_eq!(next, BeliefState::Susceptible);
        assert_eq!(rng.gen::<u64>(), before.clone().gen::<u64>());
    }

    #[test]
    fn test_engaged_elsewhere_blocks_exposure() {
        let mut config = SimConfig::default();
        config.transitions.prob_s_to_e = 1.0;
        let a = agent(0);
        let claim = Claim::truth("t", &config.claims);
        let view = Neighborhood {
            exposure: 5.0,
            engaged_elsewhere: true,
            ..Neighborhood::default()
        };
        let mut rng = SmallRng::seed_from_u64(1);

        assert_eq!(transition(BeliefState::Susceptible, &ctx(&a, &claim, view, &config), &mut rng), BeliefState::Susceptible);
    }

    #[test]
    fn test_certain_exposure() {
        let mut config = SimConfig::default();
        config.transitions.prob_s_to_e = 1.0;
        let a = agent(0);
        let claim = Claim::truth("t", &config.claims);
        let view = Neighborhood {
            exposure: 1.0,
            ..Neighborhood::default()
        };
        let mut rng = SmallRng::seed_from_u64(1);

        for _ in 0..20 {
            assert_eq!(transition(BeliefState::Susceptible, &ctx(&a, &claim, view, &config), &mut rng), BeliefState::Exposed);
        }
    }

    #[test]
    fn test_exposed_needs_reinforcement() {
        let mut config = SimConfig::default();
        config.transitions.prob_e_to_d = 1.0;
        let a = agent(0);
        let claim = Claim::truth("t", &config.claims);
        let mut rng = SmallRng::seed_from_u64(1);

        let lonely = ctx(&a, &claim, Neighborhood::default(), &config);
        assert_eq!(transition(BeliefState::Exposed, &lonely, &mut rng), BeliefState::Exposed);

        let backed = ctx(&a, &claim, Neighborhood { reinforced: true, ..Neighborhood::default() }, &config);
        assert_eq!(transition(BeliefState::Exposed, &backed, &mut rng), BeliefState::Doubtful);
    }

    #[test]
    fn test_opposing_spreader_forces_propagation() {
        let mut config = SimConfig::default();
        config.transitions.prob_d_to_r = 1.0;
        config.transitions.prob_p_to_n = 1.0;
        config.transitions.prob_n_to_r = 1.0;
        let a = agent(0);
        let claim = Claim::misinformation("m", &config.claims);
        let view = Neighborhood {
            opposed: true,
            ..Neighborhood::default()
        };
        let mut rng = SmallRng::seed_from_u64(9);

        for state in [BeliefState::Doubtful, BeliefState::Propagating, BeliefState::NotSpreading] {
            assert_eq!(transition(state, &ctx(&a, &claim, view, &config), &mut rng), BeliefState::Propagating);
        }
    }

    #[test]
    fn test_truth_is_never_rejected() {
        let mut config = SimConfig::default();
        config.transitions.prob_d_to_r = 1.0;
        config.transitions.prob_p_to_r = 1.0;
        config.transitions.prob_p_to_n = 0.0;
        config.transitions.prob_n_to_r = 1.0;
        let a = agent(0);
        let claim = Claim::truth("t", &config.claims);
        let mut rng = SmallRng::seed_from_u64(4);

        for _ in 0..50 {
            for state in [BeliefState::Doubtful, BeliefState::Propagating, BeliefState::NotSpreading] {
                let next = transition(state, &ctx(&a, &claim, Neighborhood::default(), &config), &mut rng);
                assert_ne!(next, BeliefState::Recovered);
            }
        }
    }

    #[test]
    fn test_doubtful_rejects_misinformation_without_reinforcement() {
        let mut config = SimConfig::default();
        config.transitions.prob_d_to_r = 1.0;
        let a = agent(0);
        let claim = Claim::misinformation("m", &config.claims);
        let mut rng = SmallRng::seed_from_u64(4);

        let next = transition(BeliefState::Doubtful, &ctx(&a, &claim, Neighborhood::default(), &config), &mut rng);
        assert_eq!(next, BeliefState::Recovered);
    }

    #[test]
    fn test_dwell_gate_holds_state() {
        let mut config = SimConfig::default();
        config.transitions.min_dwell_ticks = 3;
        config.transitions.prob_p_to_n = 1.0;
        let a = agent(0);
        let claim = Claim::truth("t", &config.claims);
        let mut rng = SmallRng::seed_from_u64(4);

        let mut early = ctx(&a, &claim, Neighborhood::default(), &config);
        early.time_in_state = 2;
        assert_eq!(transition(BeliefState::Propagating, &early, &mut rng), BeliefState::Propagating);

        early.time_in_state = 3;
        assert_eq!(transition(BeliefState::Propagating, &early, &mut rng), BeliefState::NotSpreading);
    }

    #[test]
    fn test_opposing_spreader_ignores_dwell_gate() {
        let mut config = SimConfig::default();
        config.transitions.min_dwell_ticks = 5;
        let a = agent(0);
        let claim = Claim::truth("t", &config.claims);
        let view = Neighborhood {
            opposed: true,
            ..Neighborhood::default()
        };
        let mut rng = SmallRng::seed_from_u64(2);

        for state in [BeliefState::Doubtful, BeliefState::NotSpreading] {
            let held = ctx(&a, &claim, view, &config);
            assert_eq!(held.time_in_state, 0);
            assert_eq!(transition(state, &held, &mut rng), BeliefState::Propagating);
        }
        let quiet = ctx(&a, &claim, Neighborhood::default(), &config);
        assert_eq!(transition(BeliefState::Doubtful, &quiet, &mut rng), BeliefState::Doubtful);
    }

    #[test]
    fn test_recovered_is_absorbing() {
        let config = SimConfig::default();
        let a = agent(0);
        let claim = Claim::misinformation("m", &config.claims);
        let view = Neighborhood {
            opposed: true,
            reinforced: true,
            exposure: 3.0,
            engaged_elsewhere: false,
        };
        let mut rng = SmallRng::seed_from_u64(4);
        assert_eq!(transition(BeliefState::Recovered, &ctx(&a, &claim, view, &config), &mut rng), BeliefState::Recovered);
    }

    #[test]
    fn test_isolated_agents_stay_susceptible() {
        let mut config = SimConfig::default();
        config.transitions.prob_s_to_e = 1.0;
        let population = Population::new((0..4).map(agent).collect());
        let mut claims = ClaimRegistry::new();
        let mut board = BeliefBoard::new(4);
        board.add_claim();
        let id = claims.register(Claim::truth("t", &ClaimConfig::default()), 0);
        board.set_state(AgentId(0), id, BeliefState::Propagating);
        let mut rng = SmallRng::seed_from_u64(4);

        for _ in 0..10 {
            let claim = claims.get(id).unwrap().clone();
            diffuse_claim(&claim, &claims, &population, &mut board, &config, &mut rng);
        }
        assert_eq!(board.counts(id).susceptible, 3);
    }

    #[test]
    fn test_pass_uses_snapshot_of_prior_states() {
        let mut config = SimConfig::default();
        config.transitions.prob_s_to_e = 1.0;
        let population = line(3);
        let mut claims = ClaimRegistry::new();
        let mut board = BeliefBoard::new(3);
        board.add_claim();
        let id = claims.register(Claim::truth("t", &ClaimConfig::default()), 0);
        board.set_state(AgentId(0), id, BeliefState::Propagating);
        config.transitions.prob_p_to_n = 0.0;
        let mut rng = SmallRng::seed_from_u64(4);

        let claim = claims.get(id).unwrap().clone();
        diffuse_claim(&claim, &claims, &population, &mut board, &config, &mut rng);

        // Agent 1 is exposed by agent 0; agent 2 only sees agent 1's old state.
        assert_eq!(board.state_of(AgentId(2), id), BeliefState::Susceptible);
        assert_eq!(board.time_in_state(AgentId(0), id), 1);
    }

    /// Agent 1 is certain to go Doubtful -> Propagating for the fact this tick;
    /// agent 0, Doubtful for the rumor, must not see that until the next tick.
    fn opposition_after_one_tick(fact_first: bool) -> BeliefState {
        let mut config = SimConfig::default();
        config.transitions.prob_d_to_p = 1.0;
        config.transitions.prob_d_to_n = 0.0;
        config.transitions.prob_d_to_r = 0.0;
        config.credibility.rejection_weight = 0.0;
        config.claims.truth_threshold = 0.0;

        let population = line(3);
        let mut claims = ClaimRegistry::new();
        let mut board = BeliefBoard::new(3);
        let fact = Claim::truth("fact", &config.claims);
        let rumor = Claim::misinformation("rumor", &config.claims);
        let (first, second) = if fact_first { (fact, rumor) } else { (rumor, fact) };
        board.add_claim();
        let first = claims.register(first, 0);
        board.add_claim();
        let second = claims.register(second, 0);
        let (fact, rumor) = if fact_first { (first, second) } else { (second, first) };

        // Agent 2 holds the fact so agent 1 is reinforced.
        board.set_state(AgentId(0), rumor, BeliefState::Doubtful);
        board.set_state(AgentId(1), fact, BeliefState::Doubtful);
        board.set_state(AgentId(2), fact, BeliefState::NotSpreading);

        let mut rng = SmallRng::seed_from_u64(11);
        diffuse_all(&claims, &population, &mut board, &config, &mut rng);
        assert_eq!(board.state_of(AgentId(1), fact), BeliefState::Propagating);
        board.state_of(AgentId(0), rumor)
    }

    #[test]
    fn test_registration_order_does_not_change_opposition() {
        let fact_first = opposition_after_one_tick(true);
        let rumor_first = opposition_after_one_tick(false);
        assert_eq!(fact_first, rumor_first);
        assert_ne!(fact_first, BeliefState::Propagating);
    }
}
