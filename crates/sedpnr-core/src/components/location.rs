//! Location Components
//!
//! Capacity-bounded sites (schools, religious establishments, workplaces) and the
//! districts that own them.
//!
//! All locations live in one arena inside [`LocationRegistry`]. Districts and
//! agents refer to them by [`LocationId`], never by reference.

use bevy_ecs::prelude::*;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::agent::AgentId;
use super::demographics::Denomination;

/// Index of a location in the registry arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LocationId(pub u32);

impl LocationId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of a district (town).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DistrictId(pub u32);

impl DistrictId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Type of site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocationType {
    School,
    Religious,
    Workplace,
}

impl LocationType {
    pub fn label(self) -> &'static str {
        match self {
            LocationType::School => "School",
            LocationType::Religious => "Religious",
            LocationType::Workplace => "Workplace",
        }
    }
}

/// A site where agents gather
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    pub location_type: LocationType,
    pub district: DistrictId,
    pub capacity: usize,
    /// Only set for religious sites
    pub denomination: Option<Denomination>,
    assigned: Vec<AgentId>,
}

impl Location {
    pub fn new(
        id: LocationId,
        name: impl Into<String>,
        location_type: LocationType,
        district: DistrictId,
        capacity: usize,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            location_type,
            district,
            capacity,
            denomination: None,
            assigned: Vec::new(),
        }
    }

    pub fn with_denomination(mut self, denomination: Denomination) -> Self {
        self.denomination = Some(denomination);
        self
    }

    pub fn is_full(&self) -> bool {
        self.assigned.len() >= self.capacity
    }

    pub fn assigned(&self) -> &[AgentId] {
        &self.assigned
    }

    /// Add an agent unless the site is full. Returns whether it was added.
    pub fn assign(&mut self, agent: AgentId) -> bool {
        if self.is_full() {
            return false;
        }
        self.assigned.push(agent);
        true
    }
}

/// A town: groups the sites of each type it owns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct District {
    pub id: DistrictId,
    pub name: String,
    pub schools: Vec<LocationId>,
    pub religious: Vec<LocationId>,
    pub workplaces: Vec<LocationId>,
}

impl District {
    pub fn new(id: DistrictId) -> Self {
        Self {
            id,
            name: format!("Town_{}", id.0),
            schools: Vec::new(),
            religious: Vec::new(),
            workplaces: Vec::new(),
        }
    }

    pub fn sites(&self, location_type: LocationType) -> &[LocationId] {
        match location_type {
            LocationType::School => &self.schools,
            LocationType::Religious => &self.religious,
            LocationType::Workplace => &self.workplaces,
        }
    }
}

/// Resource: arena of all locations plus the districts that group them.
#[derive(Resource, Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationRegistry {
    locations: Vec<Location>,
    districts: Vec<District>,
}

impl LocationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty district and return its id.
    pub fn add_district(&mut self) -> DistrictId {
        let id = DistrictId(self.districts.len() as u32);
        self.districts.push(District::new(id));
        id
    }

    /// Create a site in `district` and return its id.
    pub fn add_location(
        &mut self,
        district: DistrictId,
        location_type: LocationType,
        capacity: usize,
        denomination: Option<Denomination>,
    ) -> LocationId {
        let id = LocationId(self.locations.len() as u32);
        let owner = &mut self.districts[district.index()];
        let ordinal = owner.sites(location_type).len();
        let name = format!("{}_{}_{}", owner.name, location_type.label(), ordinal);

        let mut location = Location::new(id, name, location_type, district, capacity);
        if let Some(denomination) = denomination {
            location = location.with_denomination(denomination);
        }

        match location_type {
            LocationType::School => owner.schools.push(id),
            LocationType::Religious => owner.religious.push(id),
            LocationType::Workplace => owner.workplaces.push(id),
        }
        self.locations.push(location);
        id
    }

    pub fn get(&self, id: LocationId) -> Option<&Location> {
        self.locations.get(id.index())
    }

    pub fn district(&self, id: DistrictId) -> Option<&District> {
        self.districts.get(id.index())
    }

    pub fn districts(&self) -> &[District] {
        &self.districts
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    pub fn district_count(&self) -> usize {
        self.districts.len()
    }

    /// Pick one random school in the district and try it once.
    ///
    /// A full school leaves the agent unassigned even if another has room.
    pub fn assign_random_school<R: Rng>(
        &mut self,
        district: DistrictId,
        agent: AgentId,
        rng: &mut R,
    ) -> Option<LocationId> {
        let candidate = *self.districts.get(district.index())?.schools.choose(rng)?;
        self.try_assign(candidate, agent)
    }

    /// Pick one random religious site of the agent's denomination and try it once.
    pub fn assign_random_religious<R: Rng>(
        &mut self,
        district: DistrictId,
        denomination: Denomination,
        agent: AgentId,
        rng: &mut R,
    ) -> Option<LocationId> {
        let matching: Vec<LocationId> = self
            .districts
            .get(district.index())?
            .religious
            .iter()
            .copied()
            .filter(|id| self.locations[id.index()].denomination == Some(denomination))
            .collect();
        let candidate = *matching.choose(rng)?;
        self.try_assign(candidate, agent)
    }

    /// Map an adult to a workplace by education and index parity, trying it once.
    ///
    /// Agents with similar education cluster without the mapping being random.
    pub fn assign_workplace(
        &mut self,
        district: DistrictId,
        education: u8,
        agent: AgentId,
    ) -> Option<LocationId> {
        let workplaces = &self.districts.get(district.index())?.workplaces;
        if workplaces.is_empty() {
            return None;
        }
        let slot = (education as usize * 2 + agent.index() % 2) % workplaces.len();
        let candidate = workplaces[slot];
        self.try_assign(candidate, agent)
    }

    fn try_assign(&mut self, id: LocationId, agent: AgentId) -> Option<LocationId> {
        let location = self.locations.get_mut(id.index())?;
        location.assign(agent).then_some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn one_district_registry(capacity: usize) -> (LocationRegistry, DistrictId) {
        let mut registry = LocationRegistry::new();
        let district = registry.add_district();
        registry.add_location(district, LocationType::School, capacity, None);
        registry.add_location(
            district,
            LocationType::Religious,
            capacity,
            Some(Denomination::Catholic),
        );
        registry.add_location(district, LocationType::Workplace, capacity, None);
        registry.add_location(district, LocationType::Workplace, capacity, None);
        (registry, district)
    }

    #[test]
    fn test_capacity_is_never_exceeded() {
        let (mut registry, district) = one_district_registry(2);
        let mut rng = SmallRng::seed_from_u64(3);

        let results: Vec<_> = (0..5)
            .map(|i| registry.assign_random_school(district, AgentId(i), &mut rng))
            .collect();

        assert_eq!(results.iter().filter(|r| r.is_some()).count(), 2);
        for location in registry.locations() {
            assert!(location.assigned().len() <= location.capacity);
        }
    }

    #[test]
    fn test_religious_requires_matching_denomination() {
        let (mut registry, district) = one_district_registry(10);
        let mut rng = SmallRng::seed_from_u64(3);

        assert!(registry
            .assign_random_religious(district, Denomination::Jewish, AgentId(0), &mut rng)
            .is_none());
        let site = registry
            .assign_random_religious(district, Denomination::Catholic, AgentId(1), &mut rng)
            .unwrap();
        assert_eq!(
            registry.get(site).unwrap().denomination,
            Some(Denomination::Catholic)
        );
    }

    #[test]
    fn test_workplace_mapping_is_deterministic() {
        let (mut registry, district) = one_district_registry(10);
        let a = registry.assign_workplace(district, 3, AgentId(4)).unwrap();
        let b = registry.assign_workplace(district, 3, AgentId(6)).unwrap();
        let c = registry.assign_workplace(district, 3, AgentId(5)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_site_names_and_ownership() {
        let (registry, district) = one_district_registry(1);
        let d = registry.district(district).unwrap();
        assert_eq!(d.schools.len(), 1);
        assert_eq!(d.workplaces.len(), 2);
        let second = registry.get(d.workplaces[1]).unwrap();
        assert_eq!(second.name, "Town_0_Workplace_1");
        assert_eq!(second.district, district);
    }

    #[test]
    fn test_unknown_district_yields_none() {
        let (mut registry, _) = one_district_registry(1);
        let mut rng = SmallRng::seed_from_u64(0);
        assert!(registry
            .assign_random_school(DistrictId(9), AgentId(0), &mut rng)
            .is_none());
    }
}
