//! Map obstacles: blockers, destructibles, and harvestable resources.

use serde::{Deserialize, Serialize};

use crate::math::Vec2;
use crate::physics::BodyHandle;
use crate::targets::EntityId;

/// Geometric shape of an obstacle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObstacleShape {
    /// Circle of the given radius.
    Circle {
        /// Radius.
        radius: f32,
    },
    /// Axis-aligned rectangle.
    Rectangle {
        /// Half-width.
        half_width: f32,
        /// Half-height.
        half_height: f32,
    },
    /// Regular polygon.
    Polygon {
        /// Vertices relative to the obstacle center.
        vertices: Vec<Vec2>,
    },
    /// Jittered polygon from map generation.
    IrregularPolygon {
        /// Vertices relative to the obstacle center.
        vertices: Vec<Vec2>,
    },
}

impl ObstacleShape {
    /// Conservative bounding radius used for pathfinding occupancy.
    #[must_use]
    pub fn bounding_radius(&self) -> f32 {
        match self {
            Self::Circle { radius } => *radius,
            Self::Rectangle {
                half_width,
                half_height,
            } => half_width.hypot(*half_height),
            Self::Polygon { vertices } | Self::IrregularPolygon { vertices } => vertices
                .iter()
                .map(|v| v.length())
                .fold(0.0_f32, f32::max),
        }
    }
}

/// Resource carried by harvestable obstacles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceKind {
    /// Crystallized spice harvested by workers.
    Spice,
    /// Ore seams worked by miners.
    Ore,
    /// Salvageable scrap heaps.
    Scrap,
}

/// A terrain obstacle. Blocks ground pathing; optionally harvestable
/// and/or destructible. Indestructible obstacles only block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Obstacle {
    /// Entity id.
    pub id: EntityId,
    /// Center position.
    pub position: Vec2,
    /// Shape.
    pub shape: ObstacleShape,
    /// Resource kind and remaining amount, if harvestable.
    pub resource: Option<(ResourceKind, f32)>,
    /// Remaining hit points, if destructible.
    pub hit_points: Option<f32>,
    /// Physics body handle.
    #[serde(skip)]
    pub body: Option<BodyHandle>,
    /// False once destroyed or depleted.
    pub active: bool,
}

impl Obstacle {
    /// A plain indestructible blocker.
    #[must_use]
    pub fn blocker(id: EntityId, position: Vec2, shape: ObstacleShape) -> Self {
        Self {
            id,
            position,
            shape,
            resource: None,
            hit_points: None,
            body: None,
            active: true,
        }
    }

    /// A harvestable resource deposit.
    #[must_use]
    pub fn deposit(
        id: EntityId,
        position: Vec2,
        shape: ObstacleShape,
        kind: ResourceKind,
        amount: f32,
    ) -> Self {
        Self {
            id,
            position,
            shape,
            resource: Some((kind, amount)),
            hit_points: None,
            body: None,
            active: true,
        }
    }

    /// True while resources remain.
    #[must_use]
    pub fn is_harvestable(&self) -> bool {
        self.resource.is_some_and(|(_, remaining)| remaining > 0.0)
    }

    /// Extract up to `requested` resources; returns the amount actually
    /// extracted. Depleting the deposit deactivates it.
    pub fn extract(&mut self, requested: f32) -> f32 {
        let Some((kind, remaining)) = self.resource else {
            return 0.0;
        };
        let extracted = requested.min(remaining);
        let left = remaining - extracted;
        self.resource = Some((kind, left));
        if left <= 0.0 {
            self.active = false;
        }
        extracted
    }

    /// Apply damage to a destructible obstacle. Indestructible obstacles
    /// ignore damage entirely.
    pub fn apply_damage(&mut self, amount: f32) {
        if let Some(hp) = self.hit_points {
            let left = (hp - amount).max(0.0);
            self.hit_points = Some(left);
            if left <= 0.0 {
                self.active = false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_depletes() {
        let shape = ObstacleShape::Circle { radius: 20.0 };
        let mut deposit = Obstacle::deposit(1, Vec2::ZERO, shape, ResourceKind::Spice, 100.0);
        assert!(deposit.is_harvestable());

        assert_eq!(deposit.extract(60.0), 60.0);
        assert!(deposit.active);
        assert_eq!(deposit.extract(60.0), 40.0);
        assert!(!deposit.active);
        assert!(!deposit.is_harvestable());
    }

    #[test]
    fn test_indestructible_ignores_damage() {
        let shape = ObstacleShape::Rectangle {
            half_width: 10.0,
            half_height: 5.0,
        };
        let mut rock = Obstacle::blocker(1, Vec2::ZERO, shape);
        rock.apply_damage(1000.0);
        assert!(rock.active);
    }

    #[test]
    fn test_destructible_dies() {
        let shape = ObstacleShape::Circle { radius: 8.0 };
        let mut crate_pile = Obstacle::blocker(1, Vec2::ZERO, shape);
        crate_pile.hit_points = Some(50.0);
        crate_pile.apply_damage(30.0);
        assert!(crate_pile.active);
        crate_pile.apply_damage(30.0);
        assert!(!crate_pile.active);
    }

    #[test]
    fn test_bounding_radius() {
        let rect = ObstacleShape::Rectangle {
            half_width: 3.0,
            half_height: 4.0,
        };
        assert!((rect.bounding_radius() - 5.0).abs() < 1e-5);

        let poly = ObstacleShape::Polygon {
            vertices: vec![Vec2::new(0.0, 7.0), Vec2::new(2.0, 0.0)],
        };
        assert!((poly.bounding_radius() - 7.0).abs() < 1e-5);
    }
}
