//! Simulation Components
//!
//! Agents, locations, claims, and the belief board that tracks who holds which claim.

pub mod agent;
pub mod belief;
pub mod claim;
pub mod demographics;
pub mod location;

pub use agent::*;
pub use belief::*;
pub use claim::*;
pub use demographics::*;
pub use location::*;
