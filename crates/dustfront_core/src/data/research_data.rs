//! Research tree: ids, prerequisites, and completion effects.

use serde::{Deserialize, Serialize};

/// Every research project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResearchId {
    /// Unlocks a second simultaneous research slot.
    ParallelResearch1,
    /// Unlocks a third simultaneous research slot.
    ParallelResearch2,
    /// +15% unit max health.
    ArmorPlating,
    /// +10% weapon damage.
    TungstenRounds,
    /// +10% weapon range.
    GuidanceSystems,
    /// +25% miner yield.
    DeepDrilling,
    /// +20% refinery income.
    EfficientRefining,
    /// +15% production speed.
    RapidFabrication,
    /// +20% building max health applied at placement.
    FortifiedStructures,
    /// +15% aircraft speed.
    AdvancedAvionics,
    /// Cloak generators may be engaged.
    CloakingField,
    /// Storm callers may project sandstorms.
    StormSeeding,
    /// +25% worker harvest rate.
    ReinforcedRigs,
    /// +1 sortie payload bomb.
    ExpandedBombBays,
}

impl ResearchId {
    /// All projects, in declaration order.
    pub const ALL: [ResearchId; 14] = [
        ResearchId::ParallelResearch1,
        ResearchId::ParallelResearch2,
        ResearchId::ArmorPlating,
        ResearchId::TungstenRounds,
        ResearchId::GuidanceSystems,
        ResearchId::DeepDrilling,
        ResearchId::EfficientRefining,
        ResearchId::RapidFabrication,
        ResearchId::FortifiedStructures,
        ResearchId::AdvancedAvionics,
        ResearchId::CloakingField,
        ResearchId::StormSeeding,
        ResearchId::ReinforcedRigs,
        ResearchId::ExpandedBombBays,
    ];
}

/// What completing a research project changes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ResearchEffect {
    /// Multiply unit weapon damage.
    DamageMult(f32),
    /// Multiply unit max health at spawn.
    HealthMult(f32),
    /// Multiply weapon range.
    RangeMult(f32),
    /// Multiply worker harvest rate.
    HarvestMult(f32),
    /// Multiply miner yield.
    MiningMult(f32),
    /// Multiply refinery income.
    IncomeMult(f32),
    /// Multiply production speed.
    ProductionMult(f32),
    /// Multiply building max health at placement.
    BuildingHealthMult(f32),
    /// Multiply aircraft speed.
    AircraftSpeedMult(f32),
    /// Add a simultaneous research slot.
    ParallelResearchSlot,
    /// Enable the cloak special ability.
    UnlockCloak,
    /// Enable the sandstorm special ability.
    UnlockSandstorm,
    /// Add bombs to each sortie payload.
    ExtraSortiePayload(u32),
}

/// Balance spec for a research project.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResearchSpec {
    /// Credit cost, debited when the project starts.
    pub cost: i64,
    /// Research duration in seconds.
    pub duration_secs: f32,
    /// Projects that must be completed first.
    pub prerequisites: &'static [ResearchId],
    /// Applied on completion.
    pub effect: ResearchEffect,
}

/// Balance spec for a research project.
#[must_use]
pub fn spec(id: ResearchId) -> ResearchSpec {
    match id {
        ResearchId::ParallelResearch1 => ResearchSpec {
            cost: 600,
            duration_secs: 60.0,
            prerequisites: &[],
            effect: ResearchEffect::ParallelResearchSlot,
        },
        ResearchId::ParallelResearch2 => ResearchSpec {
            cost: 1200,
            duration_secs: 90.0,
            prerequisites: &[ResearchId::ParallelResearch1],
            effect: ResearchEffect::ParallelResearchSlot,
        },
        ResearchId::ArmorPlating => ResearchSpec {
            cost: 500,
            duration_secs: 45.0,
            prerequisites: &[],
            effect: ResearchEffect::HealthMult(1.15),
        },
        ResearchId::TungstenRounds => ResearchSpec {
            cost: 500,
            duration_secs: 45.0,
            prerequisites: &[],
            effect: ResearchEffect::DamageMult(1.10),
        },
        ResearchId::GuidanceSystems => ResearchSpec {
            cost: 700,
            duration_secs: 60.0,
            prerequisites: &[ResearchId::TungstenRounds],
            effect: ResearchEffect::RangeMult(1.10),
        },
        ResearchId::DeepDrilling => ResearchSpec {
            cost: 400,
            duration_secs: 40.0,
            prerequisites: &[],
            effect: ResearchEffect::MiningMult(1.25),
        },
        ResearchId::EfficientRefining => ResearchSpec {
            cost: 450,
            duration_secs: 40.0,
            prerequisites: &[],
            effect: ResearchEffect::IncomeMult(1.20),
        },
        ResearchId::RapidFabrication => ResearchSpec {
            cost: 600,
            duration_secs: 50.0,
            prerequisites: &[],
            effect: ResearchEffect::ProductionMult(1.15),
        },
        ResearchId::FortifiedStructures => ResearchSpec {
            cost: 550,
            duration_secs: 50.0,
            prerequisites: &[],
            effect: ResearchEffect::BuildingHealthMult(1.20),
        },
        ResearchId::AdvancedAvionics => ResearchSpec {
            cost: 650,
            duration_secs: 55.0,
            prerequisites: &[],
            effect: ResearchEffect::AircraftSpeedMult(1.15),
        },
        ResearchId::CloakingField => ResearchSpec {
            cost: 800,
            duration_secs: 70.0,
            prerequisites: &[],
            effect: ResearchEffect::UnlockCloak,
        },
        ResearchId::StormSeeding => ResearchSpec {
            cost: 900,
            duration_secs: 80.0,
            prerequisites: &[],
            effect: ResearchEffect::UnlockSandstorm,
        },
        ResearchId::ReinforcedRigs => ResearchSpec {
            cost: 400,
            duration_secs: 40.0,
            prerequisites: &[],
            effect: ResearchEffect::HarvestMult(1.25),
        },
        ResearchId::ExpandedBombBays => ResearchSpec {
            cost: 750,
            duration_secs: 60.0,
            prerequisites: &[ResearchId::AdvancedAvionics],
            effect: ResearchEffect::ExtraSortiePayload(2),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prerequisite_chains_resolve() {
        // Every prerequisite must itself be a defined project.
        for id in ResearchId::ALL {
            for prereq in spec(id).prerequisites {
                assert!(ResearchId::ALL.contains(prereq), "{id:?} -> {prereq:?}");
            }
        }
    }

    #[test]
    fn test_parallel_research_chain() {
        let second = spec(ResearchId::ParallelResearch2);
        assert_eq!(second.prerequisites, &[ResearchId::ParallelResearch1]);
    }

    #[test]
    fn test_costs_positive() {
        for id in ResearchId::ALL {
            assert!(spec(id).cost > 0, "{id:?}");
            assert!(spec(id).duration_secs > 0.0, "{id:?}");
        }
    }
}
