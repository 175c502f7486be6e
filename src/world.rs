use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::buildings::{powered_housing_capacity, BuildingFact, BuildingRegistry, GridPos};
use crate::snapshot::{check_version, SaveError};
use crate::systems::disease::Disease;

pub const WORLD_SAVE_VERSION: u32 = 1;

/// Food units a citizen should have in store for the settlement to count as fed.
pub const FOOD_RESERVE_PER_CITIZEN: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DvorId(u64);

impl DvorId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MemberId(u64);

impl MemberId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CitizenId(u64);

impl CitizenId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceStock {
    pub money: f64,
    pub food: f64,
    pub vodka: f64,
    pub power: f64,
    pub power_used: f64,
    pub population: u64,
    pub storage_capacity: f64,
}

impl ResourceStock {
    fn validate(&self) -> Result<(), String> {
        let fields = [
            ("money", self.money),
            ("food", self.food),
            ("vodka", self.vodka),
            ("power", self.power),
            ("power_used", self.power_used),
            ("storage_capacity", self.storage_capacity),
        ];
        match fields.iter().find(|(_, v)| !v.is_finite() || *v < 0.0) {
            Some((name, value)) => Err(format!("resource {name} is {value}")),
            None => Ok(()),
        }
    }

    pub fn clamp_non_negative(&mut self) {
        self.money = self.money.max(0.0);
        self.food = self.food.max(0.0);
        self.vodka = self.vodka.max(0.0);
        self.power = self.power.max(0.0);
        self.power_used = self.power_used.max(0.0);
        self.storage_capacity = self.storage_capacity.max(0.0);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    Head,
    Spouse,
    Infant,
    Child,
    Adolescent,
    Worker,
    Elder,
}

impl MemberRole {
    /// Age-band role; head and spouse are designations, not bands.
    pub fn for_age(age: u32) -> Self {
        match age {
            0 => MemberRole::Infant,
            1..=11 => MemberRole::Child,
            12..=15 => MemberRole::Adolescent,
            16..=59 => MemberRole::Worker,
            _ => MemberRole::Elder,
        }
    }

    pub fn is_designation(self) -> bool {
        matches!(self, MemberRole::Head | MemberRole::Spouse)
    }
}

pub fn labor_capacity_for_age(age: u32) -> f64 {
    match MemberRole::for_age(age) {
        MemberRole::Infant => 0.0,
        MemberRole::Child => 0.1,
        MemberRole::Adolescent => 0.5,
        MemberRole::Elder => 0.4,
        _ => 1.0,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DvorMember {
    pub id: MemberId,
    pub name: String,
    pub gender: Gender,
    pub age: u32,
    pub role: MemberRole,
    pub labor_capacity: f64,
    #[serde(default)]
    pub pregnant: Option<u32>,
    /// Mirror of the matching citizen's disease, refreshed after every tick.
    #[serde(default)]
    pub disease: Option<Disease>,
}

impl DvorMember {
    pub fn is_adult_male(&self) -> bool {
        self.gender == Gender::Male && self.age >= 16
    }

    /// Re-derives role and labor capacity from age, keeping head/spouse.
    pub fn refresh_role(&mut self) {
        if !self.role.is_designation() {
            self.role = MemberRole::for_age(self.age);
        }
        self.labor_capacity = labor_capacity_for_age(self.age);
    }
}

/// Input for adding a member; the arena assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMember {
    pub name: String,
    pub gender: Gender,
    pub age: u32,
    #[serde(default)]
    pub role: Option<MemberRole>,
    #[serde(default)]
    pub pregnant: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dvor {
    pub id: DvorId,
    pub surname: String,
    pub members: Vec<DvorMember>,
}

impl Dvor {
    pub fn member(&self, id: MemberId) -> Option<&DvorMember> {
        self.members.iter().find(|m| m.id == id)
    }

    pub fn has_adult_male(&self) -> bool {
        self.members.iter().any(DvorMember::is_adult_male)
    }

    /// Keeps exactly one head: the spouse inherits, else the eldest member.
    fn ensure_head(&mut self) {
        if self.members.iter().any(|m| m.role == MemberRole::Head) {
            return;
        }
        let heir = self
            .members
            .iter()
            .position(|m| m.role == MemberRole::Spouse)
            .or_else(|| {
                self.members
                    .iter()
                    .enumerate()
                    .max_by_key(|(index, m)| (m.age, std::cmp::Reverse(*index)))
                    .map(|(index, _)| index)
            });
        if let Some(member) = heir.and_then(|index| self.members.get_mut(index)) {
            member.role = MemberRole::Head;
        }
    }
}

/// Arena of households keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Households {
    next_dvor: u64,
    next_member: u64,
    dvory: BTreeMap<DvorId, Dvor>,
}

impl Households {
    pub fn create(&mut self, surname: impl Into<String>) -> DvorId {
        let id = DvorId(self.next_dvor);
        self.next_dvor += 1;
        self.dvory.insert(
            id,
            Dvor {
                id,
                surname: surname.into(),
                members: Vec::new(),
            },
        );
        id
    }

    pub fn add_member(&mut self, dvor: DvorId, new_member: NewMember) -> Option<MemberId> {
        let id = MemberId(self.next_member);
        let household = self.dvory.get_mut(&dvor)?;
        self.next_member += 1;
        let mut member = DvorMember {
            id,
            name: new_member.name,
            gender: new_member.gender,
            age: new_member.age,
            role: new_member.role.unwrap_or_else(|| MemberRole::for_age(new_member.age)),
            labor_capacity: 0.0,
            pregnant: new_member.pregnant,
            disease: None,
        };
        member.refresh_role();
        household.members.push(member);
        Some(id)
    }

    /// Moves a member into a new household as its head.
    pub fn split_off(&mut self, from: DvorId, member: MemberId) -> Option<DvorId> {
        let household = self.dvory.get_mut(&from)?;
        let index = household.members.iter().position(|m| m.id == member)?;
        let mut moved = household.members.remove(index);
        let surname = household.surname.clone();
        household.ensure_head();
        moved.role = MemberRole::Head;
        let new_id = self.create(surname);
        if let Some(target) = self.dvory.get_mut(&new_id) {
            target.members.push(moved);
        }
        Some(new_id)
    }

    /// Removes a member, re-seats the head and drops the household once empty.
    pub fn remove_member(&mut self, dvor: DvorId, member: MemberId) -> Option<DvorMember> {
        let household = self.dvory.get_mut(&dvor)?;
        let index = household.members.iter().position(|m| m.id == member)?;
        let removed = household.members.remove(index);
        if household.members.is_empty() {
            self.dvory.remove(&dvor);
        } else {
            household.ensure_head();
        }
        Some(removed)
    }

    pub fn get(&self, id: DvorId) -> Option<&Dvor> {
        self.dvory.get(&id)
    }

    pub fn get_mut(&mut self, id: DvorId) -> Option<&mut Dvor> {
        self.dvory.get_mut(&id)
    }

    pub fn ids(&self) -> Vec<DvorId> {
        self.dvory.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Dvor> {
        self.dvory.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Dvor> {
        self.dvory.values_mut()
    }

    pub fn len(&self) -> usize {
        self.dvory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dvory.is_empty()
    }

    pub fn member_count(&self) -> usize {
        self.dvory.values().map(|d| d.members.len()).sum()
    }

    /// Ids must sit below their counters and no dvor may be empty.
    fn validate(&self) -> Result<(), String> {
        let mut seen = BTreeSet::new();
        for (key, dvor) in &self.dvory {
            if dvor.id != *key || key.0 >= self.next_dvor {
                return Err(format!("dvor {} is out of sequence", key.0));
            }
            if dvor.members.is_empty() {
                return Err(format!("dvor {} has no members", key.0));
            }
            for member in &dvor.members {
                if member.id.0 >= self.next_member || !seen.insert(member.id) {
                    return Err(format!(
                        "member {} of dvor {} is out of sequence",
                        member.id.0, key.0
                    ));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CitizenClass {
    Worker,
    Kolkhoznik,
    Intelligentsia,
    PartyMember,
}

/// Individually rendered mirror of a household member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citizen {
    pub id: CitizenId,
    pub class: CitizenClass,
    pub happiness: f64,
    pub hunger: f64,
    #[serde(default)]
    pub home: Option<GridPos>,
    pub gender: Gender,
    pub age: u32,
    #[serde(default)]
    pub dvor: Option<DvorId>,
    #[serde(default)]
    pub member: Option<MemberId>,
    pub member_role: MemberRole,
    #[serde(default)]
    pub disease: Option<Disease>,
}

impl Citizen {
    pub fn is_sick(&self) -> bool {
        self.disease.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Citizens {
    next_id: u64,
    by_id: BTreeMap<CitizenId, Citizen>,
}

impl Citizens {
    pub fn spawn_for(&mut self, dvor: DvorId, member: &DvorMember, class: CitizenClass) -> CitizenId {
        let id = CitizenId(self.next_id);
        self.next_id += 1;
        self.by_id.insert(
            id,
            Citizen {
                id,
                class,
                happiness: 0.5,
                hunger: 0.0,
                home: None,
                gender: member.gender,
                age: member.age,
                dvor: Some(dvor),
                member: Some(member.id),
                member_role: member.role,
                disease: None,
            },
        );
        id
    }

    pub fn get(&self, id: CitizenId) -> Option<&Citizen> {
        self.by_id.get(&id)
    }

    pub fn get_mut(&mut self, id: CitizenId) -> Option<&mut Citizen> {
        self.by_id.get_mut(&id)
    }

    pub fn remove(&mut self, id: CitizenId) -> Option<Citizen> {
        self.by_id.remove(&id)
    }

    pub fn find_by_member(&self, member: MemberId) -> Option<CitizenId> {
        self.by_id
            .values()
            .find(|c| c.member == Some(member))
            .map(|c| c.id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Citizen> {
        self.by_id.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Citizen> {
        self.by_id.values_mut()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn infected_count(&self) -> usize {
        self.by_id.values().filter(|c| c.is_sick()).count()
    }

    fn validate(&self) -> Result<(), String> {
        match self
            .by_id
            .iter()
            .find(|(key, c)| c.id != **key || key.0 >= self.next_id)
        {
            Some((key, _)) => Err(format!("citizen {} is out of sequence", key.0)),
            None => Ok(()),
        }
    }
}

/// Ratio of stored food to what the population should hold, in `[0, 1]`.
pub fn food_level(food: f64, population: u64) -> f64 {
    if population == 0 {
        return 1.0;
    }
    (food / (population as f64 * FOOD_RESERVE_PER_CITIZEN)).clamp(0.0, 1.0)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldSave {
    #[serde(default)]
    pub version: Option<u32>,
    pub resources: ResourceStock,
    pub buildings: Vec<BuildingFact>,
    pub households: Households,
    pub citizens: Citizens,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub scenario: String,
    pub total_ticks: u64,
    pub resources: ResourceStock,
    pub households: usize,
    pub household_members: usize,
    pub citizens: usize,
    pub infected: usize,
    pub buildings: usize,
}

pub struct World {
    pub(crate) resources: ResourceStock,
    pub(crate) registry: BuildingRegistry,
    pub(crate) buildings: Vec<BuildingFact>,
    pub(crate) households: Households,
    pub(crate) citizens: Citizens,
}

impl World {
    pub fn new(registry: BuildingRegistry, resources: ResourceStock) -> Self {
        Self {
            resources,
            registry,
            buildings: Vec::new(),
            households: Households::default(),
            citizens: Citizens::default(),
        }
    }

    pub fn place_building(&mut self, building: BuildingFact) {
        self.buildings.push(building);
    }

    /// Founds a household and spawns a citizen mirror for each member.
    pub fn found_dvor(
        &mut self,
        surname: impl Into<String>,
        members: Vec<NewMember>,
        class: CitizenClass,
    ) -> DvorId {
        let id = self.households.create(surname);
        for new_member in members {
            if let Some(member_id) = self.households.add_member(id, new_member) {
                self.spawn_mirror(id, member_id, class);
            }
        }
        if let Some(dvor) = self.households.get_mut(id) {
            dvor.ensure_head();
        }
        self.sync_mirrors();
        id
    }

    pub(crate) fn spawn_mirror(&mut self, dvor: DvorId, member: MemberId, class: CitizenClass) {
        if let Some(m) = self.households.get(dvor).and_then(|d| d.member(member)) {
            self.citizens.spawn_for(dvor, m, class);
        }
    }

    /// Removes a member's citizen mirror after the member left the arena.
    pub(crate) fn drop_mirror(&mut self, member: MemberId) {
        if let Some(id) = self.citizens.find_by_member(member) {
            self.citizens.remove(id);
        }
    }

    /// Removes a citizen and the household member it mirrors.
    pub(crate) fn bury(&mut self, citizen: CitizenId) {
        let Some(removed) = self.citizens.remove(citizen) else {
            return;
        };
        if let (Some(dvor), Some(member)) = (removed.dvor, removed.member) {
            self.households.remove_member(dvor, member);
        }
    }

    /// Copies member facts onto citizens and citizen disease back onto members.
    pub fn sync_mirrors(&mut self) {
        let mut locations = BTreeMap::new();
        for dvor in self.households.iter() {
            for member in &dvor.members {
                locations.insert(member.id, (dvor.id, member.age, member.role));
            }
        }
        let mut diseases = BTreeMap::new();
        for citizen in self.citizens.iter_mut() {
            let Some(member) = citizen.member else {
                continue;
            };
            if let Some((dvor, age, role)) = locations.get(&member) {
                citizen.dvor = Some(*dvor);
                citizen.age = *age;
                citizen.member_role = *role;
                diseases.insert(member, citizen.disease);
            }
        }
        for dvor in self.households.iter_mut() {
            for member in &mut dvor.members {
                if let Some(disease) = diseases.get(&member.id) {
                    member.disease = *disease;
                }
            }
        }
        self.resources.population = self.citizens.len() as u64;
    }

    pub fn resources(&self) -> &ResourceStock {
        &self.resources
    }

    pub fn resources_mut(&mut self) -> &mut ResourceStock {
        &mut self.resources
    }

    pub fn registry(&self) -> &BuildingRegistry {
        &self.registry
    }

    pub fn buildings(&self) -> &[BuildingFact] {
        &self.buildings
    }

    pub fn buildings_mut(&mut self) -> &mut Vec<BuildingFact> {
        &mut self.buildings
    }

    pub fn households(&self) -> &Households {
        &self.households
    }

    pub fn households_mut(&mut self) -> &mut Households {
        &mut self.households
    }

    pub fn citizens(&self) -> &Citizens {
        &self.citizens
    }

    pub fn citizens_mut(&mut self) -> &mut Citizens {
        &mut self.citizens
    }

    pub fn total_population(&self) -> u64 {
        self.citizens.len() as u64
    }

    pub fn food_level(&self) -> f64 {
        food_level(self.resources.food, self.total_population())
    }

    pub fn powered_housing(&self) -> u64 {
        powered_housing_capacity(&self.registry, &self.buildings)
    }

    pub fn snapshot(&self, scenario: &str, total_ticks: u64) -> WorldSnapshot {
        WorldSnapshot {
            scenario: scenario.to_string(),
            total_ticks,
            resources: self.resources.clone(),
            households: self.households.len(),
            household_members: self.households.member_count(),
            citizens: self.citizens.len(),
            infected: self.citizens.infected_count(),
            buildings: self.buildings.len(),
        }
    }

    pub fn serialize(&self) -> WorldSave {
        WorldSave {
            version: Some(WORLD_SAVE_VERSION),
            resources: self.resources.clone(),
            buildings: self.buildings.clone(),
            households: self.households.clone(),
            citizens: self.citizens.clone(),
        }
    }

    /// Rebuilds the world; the registry is supplied by the caller.
    pub fn deserialize(data: WorldSave, registry: BuildingRegistry) -> Result<Self, SaveError> {
        check_version("world", data.version, WORLD_SAVE_VERSION)?;
        let invalid = |reason: String| SaveError::Invalid {
            section: "world",
            reason,
        };
        data.resources.validate().map_err(invalid)?;
        data.households.validate().map_err(invalid)?;
        data.citizens.validate().map_err(invalid)?;
        for dvor in data.households.iter() {
            for member in &dvor.members {
                if data.citizens.find_by_member(member.id).is_none() {
                    return Err(invalid(format!(
                        "member {} of dvor {} has no citizen",
                        member.id.raw(),
                        dvor.id.raw()
                    )));
                }
            }
        }
        for citizen in data.citizens.iter() {
            if let (Some(dvor), Some(member)) = (citizen.dvor, citizen.member) {
                let known = data
                    .households
                    .get(dvor)
                    .and_then(|d| d.member(member))
                    .is_some();
                if !known {
                    return Err(SaveError::Invalid {
                        section: "world",
                        reason: format!(
                            "citizen {} references missing member {} of dvor {}",
                            citizen.id.raw(),
                            member.raw(),
                            dvor.raw()
                        ),
                    });
                }
            }
        }
        Ok(Self {
            resources: data.resources,
            registry,
            buildings: data.buildings,
            households: data.households,
            citizens: data.citizens,
        })
    }
}
