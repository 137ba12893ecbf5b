//! Population Setup
//!
//! Samples agents, places them in districts, and assigns them to sites.

use rand::Rng;
use tracing::info;

use crate::components::agent::{credibility, Agent, AgentId, Population};
use crate::components::demographics::DemographicSampler;
use crate::components::location::{DistrictId, LocationRegistry};
use crate::config::SimConfig;

/// Counts of agents who ended up with each kind of site.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssignmentSummary {
    pub agents: usize,
    pub in_school: usize,
    pub religious: usize,
    pub employed: usize,
}

/// Sample `config.simulation.population` agents and assign them to sites in `registry`.
///
/// Every site gets a single attempt: a full or missing site leaves the slot empty.
pub fn build_population<R: Rng>(
    config: &SimConfig,
    registry: &mut LocationRegistry,
    rng: &mut R,
) -> Population {
    let sampler = DemographicSampler::new();
    let city = &config.city;
    let district_count = registry.district_count().max(1) as u32;
    let mut agents = Vec::with_capacity(config.simulation.population);

    for index in 0..config.simulation.population {
        let id = AgentId(index as u32);
        let demographics = sampler.sample(rng);
        let district = DistrictId(rng.gen_range(0..district_count));

        let school = if (city.school_age_min..=city.school_age_max).contains(&demographics.age) {
            registry.assign_random_school(district, id, rng)
        } else {
            None
        };

        let attends = rng.gen::<f64>() < city.religious_participation_prob;
        let religious = if attends && demographics.denomination.is_affiliated() {
            registry.assign_random_religious(district, demographics.denomination, id, rng)
        } else {
            None
        };

        let workplace = if demographics.age >= city.workplace_min_age {
            registry.assign_workplace(district, demographics.education, id)
        } else {
            None
        };

        agents.push(Agent {
            id,
            demographics,
            district,
            school,
            religious,
            workplace,
            credibility: credibility(&demographics, &config.credibility),
            links: Vec::new(),
        });
    }

    let population = Population::new(agents);
    let summary = summarize(&population);
    info!(
        agents = summary.agents,
        in_school = summary.in_school,
        religious = summary.religious,
        employed = summary.employed,
        "built population"
    );
    population
}

pub fn summarize(population: &Population) -> AssignmentSummary {
    population
        .agents()
        .iter()
        .fold(AssignmentSummary::default(), |mut summary, agent| {
            summary.agents += 1;
            summary.in_school += agent.school.is_some() as usize;
            summary.religious += agent.religious.is_some() as usize;
            summary.employed += agent.workplace.is_some() as usize;
            summary
        })
}
