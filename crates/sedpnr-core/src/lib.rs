//! SEDPNR Claim-Diffusion Simulation Core
//!
//! Synthetic city population, social graph, and the per-tick Susceptible /
//! Exposed / Doubtful / Propagating / NotSpreading / Recovered belief pipeline
//! for competing truthful and false claims.

use bevy_ecs::prelude::*;
use rand::rngs::SmallRng;

pub mod components;
pub mod config;
pub mod error;
pub mod output;
pub mod setup;
pub mod simulation;
pub mod systems;

pub use components::*;
pub use config::{ConfigError, Seeding, SimConfig, SpatialMode};
pub use error::SimError;
pub use simulation::Simulation;

/// Seeded random number generator resource
#[derive(Resource)]
pub struct SimRng(pub SmallRng);
