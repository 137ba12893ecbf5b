//! ECS Systems
//!
//! The per-tick pipeline: clock, diffusion, rewiring, then metrics.

pub mod diffusion;
pub mod rewiring;

use bevy_ecs::prelude::*;

use crate::output::record_metrics;

pub use diffusion::{
    advance_claim, diffuse_all, diffuse_claim, diffuse_claims, opposed_flags, transition,
    Neighborhood, RollContext,
};
pub use rewiring::{rewire, rewire_connections, NetworkStats, RewireOutcome};

/// Resource: the tick currently being simulated. Tick 0 is the seeded state.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimClock {
    pub tick: u64,
}

pub fn advance_clock(mut clock: ResMut<SimClock>) {
    clock.tick += 1;
}

/// Build the tick schedule. Systems run strictly in order.
pub fn build_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.add_systems(
        (
            advance_clock,
            diffuse_claims,
            rewire_connections,
            record_metrics,
        )
            .chain(),
    );
    schedule
}
