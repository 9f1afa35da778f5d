//! Faction state: economy, power, research, and rule variant.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::data::research_data::{self, ResearchEffect, ResearchId};
use crate::targets::EntityId;
use crate::units::PlayerId;

/// Faction rule variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FactionKind {
    /// Combined-arms regulars.
    Coalition,
    /// Tech and stealth cartel.
    Syndicate,
    /// Fast, numerous desert raiders.
    Nomads,
}

impl FactionKind {
    /// All rule variants.
    pub const ALL: [FactionKind; 3] = [
        FactionKind::Coalition,
        FactionKind::Syndicate,
        FactionKind::Nomads,
    ];
}

impl std::str::FromStr for FactionKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "COALITION" => Ok(Self::Coalition),
            "SYNDICATE" => Ok(Self::Syndicate),
            "NOMADS" => Ok(Self::Nomads),
            _ => Err(()),
        }
    }
}

/// A research project in progress at one lab.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActiveResearch {
    /// The project.
    pub id: ResearchId,
    /// Seconds of progress accumulated.
    pub progress_secs: f32,
}

/// Stat modifiers accumulated from completed research.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactionMods {
    /// Weapon damage multiplier.
    pub damage_mult: f32,
    /// Unit max-health multiplier at spawn.
    pub health_mult: f32,
    /// Weapon range multiplier.
    pub range_mult: f32,
    /// Worker harvest rate multiplier.
    pub harvest_mult: f32,
    /// Miner yield multiplier.
    pub mining_mult: f32,
    /// Refinery income multiplier.
    pub income_mult: f32,
    /// Production speed multiplier.
    pub production_mult: f32,
    /// Building max-health multiplier at placement.
    pub building_health_mult: f32,
    /// Aircraft speed multiplier.
    pub aircraft_speed_mult: f32,
    /// Additional simultaneous research slots.
    pub extra_research_slots: u32,
    /// Cloak generators may be engaged.
    pub cloak_unlocked: bool,
    /// Sandstorm projection unlocked.
    pub sandstorm_unlocked: bool,
    /// Extra bombs per sortie payload.
    pub extra_sortie_payload: u32,
}

impl Default for FactionMods {
    fn default() -> Self {
        Self {
            damage_mult: 1.0,
            health_mult: 1.0,
            range_mult: 1.0,
            harvest_mult: 1.0,
            mining_mult: 1.0,
            income_mult: 1.0,
            production_mult: 1.0,
            building_health_mult: 1.0,
            aircraft_speed_mult: 1.0,
            extra_research_slots: 0,
            cloak_unlocked: false,
            sandstorm_unlocked: false,
            extra_sortie_payload: 0,
        }
    }
}

/// One player's economic and tech state within a game.
///
/// Upkeep, power, and the upkeep cap are recomputed from the entity
/// store every tick; the faction only caches the results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Faction {
    /// Owning player id.
    pub player: PlayerId,
    /// Rule variant.
    pub kind: FactionKind,
    /// Team number.
    pub team: u8,
    /// Credit balance. Never negative.
    pub credits: i64,
    /// Upkeep consumed by living units.
    pub current_upkeep: u32,
    /// Upkeep cap from buildings.
    pub max_upkeep: u32,
    /// Power generated by buildings.
    pub power_generated: u32,
    /// Power consumed by buildings.
    pub power_consumed: u32,
    /// Completed research.
    pub completed_research: BTreeSet<ResearchId>,
    /// In-progress research keyed by lab building id.
    pub active_research: BTreeMap<EntityId, ActiveResearch>,
    /// Home headquarters id.
    pub home_hq: Option<EntityId>,
    /// Accumulated research modifiers.
    pub mods: FactionMods,
    /// Fractional credit income carried between ticks.
    pub income_accumulator: f32,
}

impl Faction {
    /// Create a faction with the given starting credits.
    #[must_use]
    pub fn new(player: PlayerId, kind: FactionKind, team: u8, credits: i64) -> Self {
        Self {
            player,
            kind,
            team,
            credits,
            current_upkeep: 0,
            max_upkeep: 0,
            power_generated: 0,
            power_consumed: 0,
            completed_research: BTreeSet::new(),
            active_research: BTreeMap::new(),
            home_hq: None,
            mods: FactionMods::default(),
            income_accumulator: 0.0,
        }
    }

    /// True while power demand exceeds generation. Halves production
    /// and income, and shuts down defensive structures.
    #[must_use]
    pub const fn has_low_power(&self) -> bool {
        self.power_consumed > self.power_generated
    }

    /// True if the balance covers `cost`.
    #[must_use]
    pub const fn can_afford(&self, cost: i64) -> bool {
        self.credits >= cost
    }

    /// Debit `cost` if affordable. Returns whether the debit happened;
    /// the balance never goes negative.
    pub fn debit(&mut self, cost: i64) -> bool {
        if self.can_afford(cost) {
            self.credits -= cost;
            true
        } else {
            false
        }
    }

    /// Credit the balance.
    pub fn deposit(&mut self, amount: i64) {
        self.credits += amount;
    }

    /// Simultaneous research slots (1 plus parallel-research upgrades).
    #[must_use]
    pub fn research_slots(&self) -> usize {
        1 + self.mods.extra_research_slots as usize
    }

    /// True once `id` is finished.
    #[must_use]
    pub fn has_research(&self, id: ResearchId) -> bool {
        self.completed_research.contains(&id)
    }

    /// True if every prerequisite of `id` is complete and it is neither
    /// finished nor already running.
    #[must_use]
    pub fn can_start_research(&self, id: ResearchId) -> bool {
        if self.has_research(id) {
            return false;
        }
        if self.active_research.values().any(|r| r.id == id) {
            return false;
        }
        research_data::spec(id)
            .prerequisites
            .iter()
            .all(|p| self.has_research(*p))
    }

    /// Record completion of `id` and fold its effect into the mods.
    pub fn complete_research(&mut self, id: ResearchId) {
        if !self.completed_research.insert(id) {
            return;
        }
        match research_data::spec(id).effect {
            ResearchEffect::DamageMult(m) => self.mods.damage_mult *= m,
            ResearchEffect::HealthMult(m) => self.mods.health_mult *= m,
            ResearchEffect::RangeMult(m) => self.mods.range_mult *= m,
            ResearchEffect::HarvestMult(m) => self.mods.harvest_mult *= m,
            ResearchEffect::MiningMult(m) => self.mods.mining_mult *= m,
            ResearchEffect::IncomeMult(m) => self.mods.income_mult *= m,
            ResearchEffect::ProductionMult(m) => self.mods.production_mult *= m,
            ResearchEffect::BuildingHealthMult(m) => self.mods.building_health_mult *= m,
            ResearchEffect::AircraftSpeedMult(m) => self.mods.aircraft_speed_mult *= m,
            ResearchEffect::ParallelResearchSlot => self.mods.extra_research_slots += 1,
            ResearchEffect::UnlockCloak => self.mods.cloak_unlocked = true,
            ResearchEffect::UnlockSandstorm => self.mods.sandstorm_unlocked = true,
            ResearchEffect::ExtraSortiePayload(n) => self.mods.extra_sortie_payload += n,
        }
    }
}
