//! Social Graph Setup
//!
//! Forms the initial undirected, degree-bounded social graph.

use rand::Rng;
use tracing::info;

use crate::components::agent::{AgentId, Population};
use crate::config::NetworkConfig;

/// Scan every unordered pair once, in index order, and add a tie when a
/// uniform draw falls below the pair's interaction probability.
///
/// One draw is consumed per pair even when an endpoint is already full.
/// Returns the number of ties added.
pub fn build_network<R: Rng>(
    population: &mut Population,
    config: &NetworkConfig,
    rng: &mut R,
) -> usize {
    let n = population.len();
    let mut added = 0;

    for i in 0..n {
        for j in (i + 1)..n {
            let (a, b) = (AgentId(i as u32), AgentId(j as u32));
            let prob = population
                .agent(a)
                .interaction_probability(population.agent(b), config);
            if rng.gen::<f64>() < prob && population.connect(a, b, config.max_connections) {
                added += 1;
            }
        }
    }

    debug_assert!(population.is_consistent(config.max_connections));
    info!(
        edges = added,
        mean_degree = population.mean_degree(),
        "built social network"
    );
    added
}
