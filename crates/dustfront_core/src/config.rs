//! Simulation constants injected at game construction.
//!
//! No module reads process-wide mutable state; every tunable lives in an
//! immutable [`GameConfig`] owned by the game. Tests override individual
//! fields to speed scenarios up or isolate behavior.

use serde::{Deserialize, Serialize};

/// Ticks per second for the simulation.
pub const TICK_RATE: u32 = 60;

/// Duration of one tick in seconds (16.67 ms).
pub const TICK_DT: f32 = 1.0 / TICK_RATE as f32;

/// Immutable per-game tuning constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Interval between idle/attack-move target scans, in ticks (500 ms).
    pub scan_interval_ticks: u64,
    /// Maximum engage distance from home position in DEFENSIVE stance.
    pub defensive_leash: f32,
    /// Arrival threshold for intermediate path waypoints.
    pub waypoint_threshold: f32,
    /// Arrival threshold for a plain move order's destination.
    pub move_arrival_threshold: f32,
    /// Fraction of effective weapon range at which an attacker stops closing.
    pub standoff_factor: f32,
    /// Target displacement that forces a path recompute while chasing.
    pub repath_displacement: f32,
    /// Minimum ticks between path recomputes for one command (500 ms).
    pub repath_interval_ticks: u64,
    /// Pathfinding occupancy grid cell size in world units.
    pub path_cell_size: f32,
    /// Field effects apply periodic damage at this interval (500 ms).
    pub effect_damage_interval_ticks: u64,
    /// Radius of the on-station patrol polygon.
    pub station_radius: f32,
    /// Number of corners in the on-station patrol polygon.
    pub station_corners: u32,
    /// Proximity at which garrison/hangar hand-off succeeds.
    pub hangar_proximity: f32,
    /// Duration of a sortie attack run in seconds.
    pub sortie_attack_secs: f32,
    /// Time into the attack run at which the payload drops, in seconds.
    pub sortie_payload_secs: f32,
    /// Number of payload effects dropped along a sortie run.
    pub sortie_payload_count: u32,
    /// Broadcast a snapshot every N ticks.
    pub snapshot_interval_ticks: u64,
    /// Base credit income per second, before refinery bonuses.
    pub base_income_per_sec: f32,
    /// Additional credit income per second per operating refinery.
    pub refinery_income_per_sec: f32,
    /// Production and income multiplier while power is in deficit.
    pub low_power_modifier: f32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            scan_interval_ticks: 30,
            defensive_leash: 300.0,
            waypoint_threshold: 20.0,
            move_arrival_threshold: 10.0,
            standoff_factor: 0.9,
            repath_displacement: 50.0,
            repath_interval_ticks: 30,
            path_cell_size: 25.0,
            effect_damage_interval_ticks: 30,
            station_radius: 200.0,
            station_corners: 6,
            hangar_proximity: 30.0,
            sortie_attack_secs: 2.0,
            sortie_payload_secs: 1.0,
            sortie_payload_count: 5,
            snapshot_interval_ticks: 2,
            base_income_per_sec: 5.0,
            refinery_income_per_sec: 15.0,
            low_power_modifier: 0.5,
        }
    }
}

/// World side length as a step function of the player count.
///
/// Two players fight on a 3000-unit square; each extra player adds 500
/// up to the four-player maximum.
#[must_use]
pub fn world_size_for_players(players: usize) -> f32 {
    match players {
        0..=2 => 3000.0,
        3 => 3500.0,
        _ => 4000.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_world_size_steps() {
        assert_eq!(world_size_for_players(2), 3000.0);
        assert_eq!(world_size_for_players(3), 3500.0);
        assert_eq!(world_size_for_players(4), 4000.0);
        assert_eq!(world_size_for_players(9), 4000.0);
    }

    #[test]
    fn test_default_cadences_match_tick_rate() {
        let cfg = GameConfig::default();
        // 500 ms cadences at 60 Hz.
        assert_eq!(cfg.scan_interval_ticks, 30);
        assert_eq!(cfg.repath_interval_ticks, 30);
        assert_eq!(cfg.effect_damage_interval_ticks, 30);
    }
}
