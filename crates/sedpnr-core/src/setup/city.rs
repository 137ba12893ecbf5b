//! City Setup
//!
//! Creates the districts and their capacity-bounded sites.

use tracing::info;

use crate::components::demographics::Denomination;
use crate::components::location::{LocationRegistry, LocationType};
use crate::config::CityConfig;

/// Build every district with its schools, religious sites, and workplaces.
///
/// Religious sites take denominations round-robin over the whole city, so a
/// small district may lack a site for some denominations.
pub fn build_city(config: &CityConfig) -> LocationRegistry {
    let mut registry = LocationRegistry::new();
    let mut next_denomination = 0usize;

    for _ in 0..config.num_districts {
        let district = registry.add_district();

        for _ in 0..config.schools_per_district {
            registry.add_location(district, LocationType::School, config.school_capacity, None);
        }

        for _ in 0..config.religious_per_district {
            let denomination =
                Denomination::AFFILIATED[next_denomination % Denomination::AFFILIATED.len()];
            next_denomination += 1;
            registry.add_location(
                district,
                LocationType::Religious,
                config.religious_capacity,
                Some(denomination),
            );
        }

        for _ in 0..config.workplaces_per_district {
            registry.add_location(
                district,
                LocationType::Workplace,
                config.workplace_capacity,
                None,
            );
        }
    }

    info!(
        districts = registry.district_count(),
        sites = registry.locations().len(),
        "built city"
    );
    registry
}
