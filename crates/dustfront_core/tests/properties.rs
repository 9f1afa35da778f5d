//! Property tests for targeting and the credit ledger.

use proptest::prelude::*;

use dustfront_core::entities::{GameEntities, ScanParams};
use dustfront_core::factions::{Faction, FactionKind};
use dustfront_core::math::Vec2;
use dustfront_core::prelude::{ElevationMask, TargetId, Targetable, Unit, UnitKind};
use dustfront_core::targets::Elevation;

fn scan(position: Vec2, team: u8, hits: ElevationMask, detection: f32) -> ScanParams {
    ScanParams {
        position,
        team,
        hits,
        cloak_detection_range: detection,
        radius: 1000.0,
    }
}

fn store_from(units: &[(f32, f32, u8, bool)]) -> GameEntities {
    let mut store = GameEntities::new();
    for (index, &(x, y, team, airborne)) in units.iter().enumerate() {
        let id = (index + 1) as u32;
        let kind = if airborne {
            UnitKind::Hornet
        } else {
            UnitKind::Trooper
        };
        store.add_unit(Unit::from_spec(id, kind, u32::from(team), team, Vec2::new(x, y), 1.0));
    }
    store
}

proptest! {
    /// Identical entity states produce identical scan results, no
    /// matter the order entities were inserted in.
    #[test]
    fn targeting_is_insertion_order_independent(
        units in prop::collection::vec(
            (0.0f32..2000.0, 0.0f32..2000.0, 1u8..4, any::<bool>()),
            1..24,
        )
    ) {
        let forward = store_from(&units);

        let mut reversed = GameEntities::new();
        for (index, &(x, y, team, airborne)) in units.iter().enumerate().rev() {
            let id = (index + 1) as u32;
            let kind = if airborne { UnitKind::Hornet } else { UnitKind::Trooper };
            reversed.add_unit(Unit::from_spec(id, kind, u32::from(team), team, Vec2::new(x, y), 1.0));
        }

        let params = scan(Vec2::new(1000.0, 1000.0), 9, ElevationMask::ALL, 100.0);
        prop_assert_eq!(
            forward.find_nearest_enemy_targetable(&params),
            reversed.find_nearest_enemy_targetable(&params)
        );
    }

    /// A ground-only weapon scan never returns an airborne target.
    #[test]
    fn ground_only_scans_never_find_air(
        units in prop::collection::vec(
            (0.0f32..2000.0, 0.0f32..2000.0, 1u8..4, any::<bool>()),
            1..24,
        )
    ) {
        let store = store_from(&units);
        let params = scan(Vec2::new(1000.0, 1000.0), 9, ElevationMask::GROUND, 100.0);
        if let Some(TargetId::Unit(id)) = store.find_nearest_enemy_targetable(&params) {
            let unit = store.units.get(&id).unwrap();
            prop_assert_eq!(unit.elevation, Elevation::Ground);
        }
    }

    /// A cloaked unit is returned exactly when it sits inside the
    /// observer's detection range.
    #[test]
    fn cloak_detection_boundary(distance in 10.0f32..400.0) {
        let mut store = GameEntities::new();
        let mut phantom = Unit::from_spec(1, UnitKind::Phantom, 2, 2, Vec2::new(distance, 0.0), 1.0);
        phantom.cloak.as_mut().unwrap().active = true;
        prop_assert!(phantom.is_cloaked());
        store.add_unit(phantom);

        let detection = 200.0;
        let params = scan(Vec2::ZERO, 1, ElevationMask::ALL, detection);
        let found = store.find_nearest_enemy_targetable(&params);
        if distance <= detection {
            prop_assert_eq!(found, Some(TargetId::Unit(1)));
        } else {
            prop_assert_eq!(found, None);
        }
    }

    /// The credit ledger balances: final = initial + deposits - spends,
    /// and the balance never goes negative.
    #[test]
    fn credit_ledger_conserves(
        initial in 0i64..10_000,
        ops in prop::collection::vec((any::<bool>(), 1i64..500), 0..64)
    ) {
        let mut faction = Faction::new(1, FactionKind::Coalition, 1, initial);
        let mut deposits = 0i64;
        let mut spends = 0i64;

        for (is_deposit, amount) in ops {
            if is_deposit {
                faction.deposit(amount);
                deposits += amount;
            } else if faction.debit(amount) {
                spends += amount;
            }
            prop_assert!(faction.credits >= 0);
        }

        prop_assert_eq!(faction.credits, initial + deposits - spends);
    }
}
