//! Map setup: biome, density, obstacle fields, and starting bases.
//!
//! Generation is seeded per game so a game id always reproduces its
//! map. Biome only changes the flavor mix of obstacles; density scales
//! their count.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::buildings::{Building, BuildingKind};
use crate::data::faction_data;
use crate::entities::GameEntities;
use crate::factions::{Faction, FactionKind};
use crate::math::Vec2;
use crate::obstacles::{Obstacle, ObstacleShape, ResourceKind};
use crate::physics::PhysicsWorld;
use crate::units::{PlayerId, Unit, UnitKind};

/// Map flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Biome {
    /// Rolling dune fields, sparse rock.
    #[default]
    Dunes,
    /// Cracked salt pans, open sight lines.
    SaltFlat,
    /// Mesas and heavy rock cover.
    Badlands,
    /// Spice-rich basin.
    Oasis,
}

/// Obstacle/resource density.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Density {
    /// Sparse.
    Low,
    /// Standard.
    #[default]
    Medium,
    /// Cluttered.
    High,
}

impl Density {
    fn obstacle_count(self, world_size: f32) -> u32 {
        let per_thousand = match self {
            Self::Low => 6.0,
            Self::Medium => 12.0,
            Self::High => 20.0,
        };
        let scale = world_size / 1000.0;
        (per_thousand * scale * scale) as u32
    }
}

/// Margin kept clear around each starting base.
const BASE_CLEARANCE: f32 = 400.0;
/// Distance of starting spawns from the world edge.
const SPAWN_MARGIN: f32 = 500.0;

/// Symmetric starting positions for up to four players.
#[must_use]
pub fn spawn_points(world_size: f32, players: usize) -> Vec<Vec2> {
    let near = SPAWN_MARGIN;
    let far = world_size - SPAWN_MARGIN;
    let corners = [
        Vec2::new(near, near),
        Vec2::new(far, far),
        Vec2::new(far, near),
        Vec2::new(near, far),
    ];
    corners.into_iter().take(players.min(4)).collect()
}

/// Generate the obstacle and resource field.
pub fn generate_obstacles(
    entities: &mut GameEntities,
    physics: &mut PhysicsWorld,
    world_size: f32,
    biome: Biome,
    density: Density,
    seed: u64,
    keep_clear: &[Vec2],
) {
    let mut rng = StdRng::seed_from_u64(seed);
    let count = density.obstacle_count(world_size);

    // Resource flavor mix by biome.
    let (spice_weight, ore_weight) = match biome {
        Biome::Dunes => (0.3, 0.2),
        Biome::SaltFlat => (0.2, 0.2),
        Biome::Badlands => (0.1, 0.4),
        Biome::Oasis => (0.5, 0.1),
    };

    for _ in 0..count {
        let position = Vec2::new(
            rng.gen_range(200.0..world_size - 200.0),
            rng.gen_range(200.0..world_size - 200.0),
        );
        if keep_clear
            .iter()
            .any(|base| base.distance(position) < BASE_CLEARANCE)
        {
            continue;
        }

        let id = entities.allocate_id();
        let roll: f32 = rng.gen();
        let obstacle = if roll < spice_weight {
            let radius = rng.gen_range(18.0..35.0);
            Obstacle::deposit(
                id,
                position,
                ObstacleShape::Circle { radius },
                ResourceKind::Spice,
                rng.gen_range(3000.0..8000.0),
            )
        } else if roll < spice_weight + ore_weight {
            let radius = rng.gen_range(20.0..40.0);
            Obstacle::deposit(
                id,
                position,
                ObstacleShape::Circle { radius },
                ResourceKind::Ore,
                rng.gen_range(4000.0..10000.0),
            )
        } else if roll < spice_weight + ore_weight + 0.15 {
            // Destructible scrap pile.
            let mut scrap = Obstacle::deposit(
                id,
                position,
                ObstacleShape::Rectangle {
                    half_width: rng.gen_range(15.0..30.0),
                    half_height: rng.gen_range(15.0..30.0),
                },
                ResourceKind::Scrap,
                rng.gen_range(500.0..1500.0),
            );
            scrap.hit_points = Some(300.0);
            scrap
        } else {
            // Bare rock, sometimes jagged.
            if rng.gen_bool(0.5) {
                let radius = rng.gen_range(25.0..60.0);
                Obstacle::blocker(id, position, ObstacleShape::Circle { radius })
            } else {
                let base_radius: f32 = rng.gen_range(25.0..55.0);
                let sides = rng.gen_range(5..9);
                let vertices: Vec<Vec2> = (0..sides)
                    .map(|i| {
                        let angle = i as f32 / sides as f32 * std::f32::consts::TAU;
                        let jitter: f32 = rng.gen_range(0.7..1.2);
                        Vec2::from_angle(angle) * base_radius * jitter
                    })
                    .collect();
                Obstacle::blocker(id, position, ObstacleShape::IrregularPolygon { vertices })
            }
        };

        let mut obstacle = obstacle;
        obstacle.body = Some(add_obstacle_body(physics, &obstacle));
        entities.obstacles.insert(id, obstacle);
    }
}

fn add_obstacle_body(
    physics: &mut PhysicsWorld,
    obstacle: &Obstacle,
) -> crate::physics::BodyHandle {
    match &obstacle.shape {
        ObstacleShape::Circle { radius } => {
            physics.add_fixed_circle(obstacle.id, obstacle.position, *radius)
        }
        ObstacleShape::Rectangle {
            half_width,
            half_height,
        } => {
            // Square-ish enough for the solver; the larger extent wins.
            physics.add_fixed_square(obstacle.id, obstacle.position, half_width.max(*half_height))
        }
        ObstacleShape::Polygon { vertices } | ObstacleShape::IrregularPolygon { vertices } => {
            physics.add_fixed_polygon(
                obstacle.id,
                obstacle.position,
                vertices,
                obstacle.shape.bounding_radius(),
            )
        }
    }
}

/// Place one player's starting base: headquarters, refinery, and the
/// faction's starting workers.
pub fn place_starting_base(
    entities: &mut GameEntities,
    physics: &mut PhysicsWorld,
    faction: &mut Faction,
    base: Vec2,
) {
    let hq_id = entities.allocate_id();
    let mut hq = Building::from_spec(
        hq_id,
        BuildingKind::Headquarters,
        faction.player,
        faction.team,
        base,
        true,
    );
    hq.body = Some(physics.add_fixed_square(hq_id, base, hq.half_extent));
    entities.add_building(hq);
    faction.home_hq = Some(hq_id);

    let refinery_pos = base + Vec2::new(140.0, 0.0);
    let refinery_id = entities.allocate_id();
    let mut refinery = Building::from_spec(
        refinery_id,
        BuildingKind::Refinery,
        faction.player,
        faction.team,
        refinery_pos,
        true,
    );
    refinery.body = Some(physics.add_fixed_square(
        refinery_id,
        refinery_pos,
        refinery.half_extent,
    ));
    entities.add_building(refinery);

    let workers = faction_data::start(faction.kind).starting_workers;
    for i in 0..workers {
        let offset = Vec2::new(-100.0, (i as f32 - workers as f32 * 0.5) * 30.0);
        let position = base + offset;
        let id = entities.allocate_id();
        let mut worker = Unit::from_spec(
            id,
            UnitKind::Rigger,
            faction.player,
            faction.team,
            position,
            faction.mods.health_mult,
        );
        worker.body = Some(physics.add_unit_body(id, position, worker.radius, worker.elevation));
        entities.add_unit(worker);
    }
}

/// Parse a biome from its wire string, defaulting on unknown values.
#[must_use]
pub fn biome_from_str(s: &str) -> Biome {
    match s.to_ascii_uppercase().as_str() {
        "SALT_FLAT" => Biome::SaltFlat,
        "BADLANDS" => Biome::Badlands,
        "OASIS" => Biome::Oasis,
        _ => Biome::Dunes,
    }
}

/// Parse a density from its wire string, defaulting on unknown values.
#[must_use]
pub fn density_from_str(s: &str) -> Density {
    match s.to_ascii_uppercase().as_str() {
        "LOW" => Density::Low,
        "HIGH" => Density::High,
        _ => Density::Medium,
    }
}

/// Player id-to-faction construction for a new game.
#[must_use]
pub fn build_faction(player: PlayerId, kind: FactionKind, team: u8) -> Faction {
    let start = faction_data::start(kind);
    Faction::new(player, kind, team, start.credits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_is_seeded() {
        let mut a = GameEntities::new();
        let mut b = GameEntities::new();
        let mut pa = PhysicsWorld::new();
        let mut pb = PhysicsWorld::new();

        generate_obstacles(&mut a, &mut pa, 3000.0, Biome::Dunes, Density::Medium, 42, &[]);
        generate_obstacles(&mut b, &mut pb, 3000.0, Biome::Dunes, Density::Medium, 42, &[]);

        assert_eq!(a.obstacles.len(), b.obstacles.len());
        for (id, obstacle) in &a.obstacles {
            let other = b.obstacles.get(id).unwrap();
            assert_eq!(obstacle.position, other.position);
        }
    }

    #[test]
    fn test_bases_kept_clear() {
        let mut entities = GameEntities::new();
        let mut physics = PhysicsWorld::new();
        let bases = spawn_points(3000.0, 2);
        generate_obstacles(
            &mut entities,
            &mut physics,
            3000.0,
            Biome::Badlands,
            Density::High,
            7,
            &bases,
        );
        for obstacle in entities.obstacles.values() {
            for base in &bases {
                assert!(
                    base.distance(obstacle.position) >= BASE_CLEARANCE,
                    "obstacle at {:?} intrudes on base {:?}",
                    obstacle.position,
                    base
                );
            }
        }
    }

    #[test]
    fn test_starting_base_contents() {
        let mut entities = GameEntities::new();
        let mut physics = PhysicsWorld::new();
        let mut faction = build_faction(1, FactionKind::Nomads, 1);
        place_starting_base(&mut entities, &mut physics, &mut faction, Vec2::new(500.0, 500.0));

        assert!(faction.home_hq.is_some());
        assert_eq!(entities.buildings.len(), 2);
        let workers = faction_data::start(FactionKind::Nomads).starting_workers;
        assert_eq!(entities.units.len(), workers as usize);
    }

    #[test]
    fn test_spawn_points_are_symmetric() {
        let points = spawn_points(3000.0, 2);
        assert_eq!(points.len(), 2);
        let center = Vec2::new(1500.0, 1500.0);
        assert!((points[0].distance(center) - points[1].distance(center)).abs() < 1.0);
    }
}
