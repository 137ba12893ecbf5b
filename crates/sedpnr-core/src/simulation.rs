//! Simulation
//!
//! Owns the ECS world and the tick schedule, and exposes the run as a small API:
//! build, seed claims, step, read results.

use bevy_ecs::prelude::*;
use bevy_ecs::system::SystemState;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use sedpnr_records::{BeliefState, NetworkSummary, RunSummary, SpatialRecord, StateCounts};
use tracing::info;

use crate::components::agent::{AgentId, Population};
use crate::components::belief::BeliefBoard;
use crate::components::claim::{Claim, ClaimId, ClaimRegistry};
use crate::components::location::LocationRegistry;
use crate::config::{Seeding, SimConfig};
use crate::output::{record_metrics, MetricsRecorder};
use crate::setup::{build_city, build_network, build_population, seed_global, seed_per_district};
use crate::systems::{build_schedule, NetworkStats, SimClock};
use crate::SimRng;

type SeedParams = (
    Res<'static, Population>,
    Res<'static, LocationRegistry>,
    ResMut<'static, BeliefBoard>,
    ResMut<'static, ClaimRegistry>,
    ResMut<'static, SimRng>,
);

/// A complete run: city, population, social graph, claims, and recorded metrics.
pub struct Simulation {
    world: World,
    schedule: Schedule,
    started: bool,
}

impl Simulation {
    /// Build the city, population, and social graph from `config`.
    ///
    /// The configuration is sanitized first. All randomness comes from one
    /// generator seeded with `config.simulation.seed`.
    pub fn new(config: SimConfig) -> Self {
        let config = config.sanitized();
        let mut rng = SmallRng::seed_from_u64(config.simulation.seed);

        let mut city = build_city(&config.city);
        let mut population = build_population(&config, &mut city, &mut rng);
        let initial_edges = build_network(&mut population, &config.network, &mut rng);

        let mut world = World::new();
        world.insert_resource(SimClock::default());
        world.insert_resource(BeliefBoard::new(population.len()));
        world.insert_resource(ClaimRegistry::new());
        world.insert_resource(NetworkStats {
            initial_edges,
            ..NetworkStats::default()
        });
        world.insert_resource(MetricsRecorder::from_config(&config));
        world.insert_resource(population);
        world.insert_resource(city);
        world.insert_resource(SimRng(rng));
        world.insert_resource(config);

        Self {
            world,
            schedule: build_schedule(),
            started: false,
        }
    }

    /// Register `claim` and seed `propagators` agents drawn from the whole city.
    pub fn add_claim(&mut self, claim: Claim, propagators: usize) -> ClaimId {
        self.add_seeded_claim(claim, Seeding::Global { propagators })
    }

    /// Register `claim` and seed `per_district` agents in every district.
    pub fn add_claim_per_district(&mut self, claim: Claim, per_district: usize) -> ClaimId {
        self.add_seeded_claim(claim, Seeding::PerDistrict {
            propagators: per_district,
        })
    }

    /// Register `claim` and seed it according to `seeding`.
    pub fn add_seeded_claim(&mut self, claim: Claim, seeding: Seeding) -> ClaimId {
        let tick = self.tick();
        let mut state: SystemState<SeedParams> = SystemState::new(&mut self.world);
        let (population, city, mut board, mut claims, mut rng) = state.get_mut(&mut self.world);

        let name = claim.name.clone();
        let id = claims.register(claim, tick);
        let column = board.add_claim();
        debug_assert_eq!(id, column, "claim registry and belief board out of step");

        let seeded = match seeding {
            Seeding::Global { propagators } => seed_global(
                id,
                propagators,
                &population,
                &mut board,
                &mut claims,
                &mut rng.0,
            ),
            Seeding::PerDistrict { propagators } => seed_per_district(
                id,
                propagators,
                city.district_count(),
                &population,
                &mut board,
                &mut claims,
                &mut rng.0,
            ),
        };
        info!(claim = %name, id = id.0, seeded = seeded.len(), "added claim");
        id
    }

    /// Register and seed every claim listed in the configuration.
    pub fn seed_configured_claims(&mut self) -> Vec<ClaimId> {
        let claim_config = self.config().claims.clone();
        claim_config
            .seed
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                let name = entry
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("Claim_{}", index));
                let claim = Claim::from_kind(name, entry.misinformation, &claim_config);
                self.add_seeded_claim(claim, entry.seeding)
            })
            .collect()
    }

    /// Record the seeded state as tick 0. Runs once; `step` calls it.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        let mut initial = Schedule::default();
        initial.add_systems(record_metrics);
        initial.run(&mut self.world);
    }

    /// Advance one tick: diffusion, rewiring, then metrics.
    pub fn step(&mut self) {
        self.start();
        self.schedule.run(&mut self.world);
    }

    /// Advance `ticks` ticks.
    pub fn run(&mut self, ticks: u64) {
        self.start();
        for _ in 0..ticks {
            self.step();
        }
    }

    pub fn tick(&self) -> u64 {
        self.world.resource::<SimClock>().tick
    }

    pub fn config(&self) -> &SimConfig {
        self.world.resource::<SimConfig>()
    }

    pub fn population(&self) -> &Population {
        self.world.resource::<Population>()
    }

    pub fn city(&self) -> &LocationRegistry {
        self.world.resource::<LocationRegistry>()
    }

    pub fn claims(&self) -> &ClaimRegistry {
        self.world.resource::<ClaimRegistry>()
    }

    pub fn beliefs(&self) -> &BeliefBoard {
        self.world.resource::<BeliefBoard>()
    }

    pub fn recorder(&self) -> &MetricsRecorder {
        self.world.resource::<MetricsRecorder>()
    }

    pub fn network_stats(&self) -> NetworkStats {
        *self.world.resource::<NetworkStats>()
    }

    /// Current (committed) counts for a claim.
    pub fn counts(&self, claim: ClaimId) -> StateCounts {
        self.beliefs().counts(claim)
    }

    /// Take the spatial rows buffered since the last call.
    pub fn drain_spatial(&mut self) -> Vec<SpatialRecord> {
        self.world.resource_mut::<MetricsRecorder>().drain_spatial()
    }

    /// Test and debugging hook: overwrite one agent's committed state.
    pub fn set_state(&mut self, agent: AgentId, claim: ClaimId, state: BeliefState) {
        self.world
            .resource_mut::<BeliefBoard>()
            .set_state(agent, claim, state);
    }

    /// End-of-run summary built from everything recorded so far.
    pub fn summary(&self) -> RunSummary {
        let population = self.population();
        let stats = self.network_stats();
        RunSummary {
            population: population.len(),
            ticks: self.tick(),
            seed: self.config().simulation.seed,
            claims: self.recorder().summaries().to_vec(),
            network: NetworkSummary {
                initial_edges: stats.initial_edges,
                final_edges: population.total_edges(),
                edges_pruned: stats.edges_pruned,
                edges_rewired: stats.edges_rewired,
                mean_degree: population.mean_degree(),
            },
        }
    }
}
