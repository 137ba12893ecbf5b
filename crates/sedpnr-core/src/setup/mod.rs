//! World Setup
//!
//! City construction, population sampling, social-graph formation, and claim seeding.

pub mod city;
pub mod network;
pub mod population;
pub mod seeding;

pub use city::build_city;
pub use network::build_network;
pub use population::{build_population, summarize, AssignmentSummary};
pub use seeding::{seed_global, seed_per_district};
