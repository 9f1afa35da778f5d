//! Grid pathfinding over an occupancy map.
//!
//! A coarse grid (cell ≈ unit radius) is derived from obstacles,
//! completed buildings, and wall segments. Airborne movers ignore the
//! grid entirely and fly straight. The grid is rebuilt only when the
//! static world changes (building completed or destroyed, obstacle
//! removed).

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use serde::{Deserialize, Serialize};

use crate::entities::GameEntities;
use crate::math::Vec2;
use crate::obstacles::ObstacleShape;

/// Occupancy grid for ground movement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavGrid {
    width: u32,
    height: u32,
    cell_size: f32,
    blocked: Vec<bool>,
}

impl NavGrid {
    /// Create an all-clear grid covering a `world_size` square.
    #[must_use]
    pub fn new(world_size: f32, cell_size: f32) -> Self {
        let cells = (world_size / cell_size).ceil().max(1.0) as u32;
        Self {
            width: cells,
            height: cells,
            cell_size,
            blocked: vec![false; (cells as usize) * (cells as usize)],
        }
    }

    /// Build the grid from the current static world.
    #[must_use]
    pub fn from_entities(world_size: f32, cell_size: f32, entities: &GameEntities) -> Self {
        let mut grid = Self::new(world_size, cell_size);

        for obstacle in entities.obstacles.values() {
            if !obstacle.active {
                continue;
            }
            let radius = match &obstacle.shape {
                ObstacleShape::Rectangle {
                    half_width,
                    half_height,
                } => half_width.max(*half_height),
                other => other.bounding_radius(),
            };
            grid.block_circle(obstacle.position, radius);
        }

        for building in entities.buildings.values() {
            // Construction sites do not block until they stand.
            if building.active && !building.under_construction {
                grid.block_circle(building.position, building.half_extent * 1.2);
            }
        }

        for wall in entities.walls.values() {
            if wall.active {
                grid.block_segment(wall.start, wall.end);
            }
        }

        grid
    }

    /// Grid width in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Cell size in world units.
    #[must_use]
    pub const fn cell_size(&self) -> f32 {
        self.cell_size
    }

    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.width as usize) + (x as usize)
    }

    fn in_bounds(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && x < i64::from(self.width) && y < i64::from(self.height)
    }

    /// Mark every cell overlapping the circle as blocked.
    pub fn block_circle(&mut self, center: Vec2, radius: f32) {
        let min_x = ((center.x - radius) / self.cell_size).floor() as i64;
        let max_x = ((center.x + radius) / self.cell_size).ceil() as i64;
        let min_y = ((center.y - radius) / self.cell_size).floor() as i64;
        let max_y = ((center.y + radius) / self.cell_size).ceil() as i64;
        let radius_sq = radius * radius;
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                if !self.in_bounds(x, y) {
                    continue;
                }
                let cell_center = self.cell_to_world(x as u32, y as u32);
                if cell_center.distance_squared(center) <= radius_sq {
                    let idx = self.index(x as u32, y as u32);
                    self.blocked[idx] = true;
                }
            }
        }
    }

    /// Mark cells along the segment as blocked.
    pub fn block_segment(&mut self, start: Vec2, end: Vec2) {
        let length = start.distance(end);
        let steps = (length / (self.cell_size * 0.5)).ceil().max(1.0) as u32;
        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            let point = start.lerp(end, t);
            if let Some((x, y)) = self.world_to_cell(point) {
                let idx = self.index(x, y);
                self.blocked[idx] = true;
            }
        }
    }

    /// Convert a world position to cell coordinates.
    #[must_use]
    pub fn world_to_cell(&self, pos: Vec2) -> Option<(u32, u32)> {
        if pos.x < 0.0 || pos.y < 0.0 {
            return None;
        }
        let x = (pos.x / self.cell_size) as i64;
        let y = (pos.y / self.cell_size) as i64;
        if self.in_bounds(x, y) {
            Some((x as u32, y as u32))
        } else {
            None
        }
    }

    /// Center of a cell in world coordinates.
    #[must_use]
    pub fn cell_to_world(&self, x: u32, y: u32) -> Vec2 {
        Vec2::new(
            (x as f32 + 0.5) * self.cell_size,
            (y as f32 + 0.5) * self.cell_size,
        )
    }

    /// Whether a cell is free for a mover of the given radius. Movers
    /// wider than a cell also need their orthogonal neighbors free.
    #[must_use]
    pub fn is_walkable(&self, x: u32, y: u32, mover_radius: f32) -> bool {
        if !self.in_bounds(i64::from(x), i64::from(y)) {
            return false;
        }
        if self.blocked[self.index(x, y)] {
            return false;
        }
        if mover_radius > self.cell_size * 0.5 {
            for (dx, dy) in [(1i64, 0i64), (-1, 0), (0, 1), (0, -1)] {
                let nx = i64::from(x) + dx;
                let ny = i64::from(y) + dy;
                if self.in_bounds(nx, ny) && self.blocked[self.index(nx as u32, ny as u32)] {
                    return false;
                }
            }
        }
        true
    }

    /// Nearest walkable cell to `cell`, searched in expanding rings.
    #[must_use]
    pub fn nearest_walkable(&self, cell: (u32, u32), mover_radius: f32) -> Option<(u32, u32)> {
        if self.is_walkable(cell.0, cell.1, mover_radius) {
            return Some(cell);
        }
        for ring in 1..=(self.width.max(self.height) as i64) {
            let mut best: Option<(u32, u32)> = None;
            for dy in -ring..=ring {
                for dx in -ring..=ring {
                    if dx.abs() != ring && dy.abs() != ring {
                        continue;
                    }
                    let x = i64::from(cell.0) + dx;
                    let y = i64::from(cell.1) + dy;
                    if self.in_bounds(x, y) && self.is_walkable(x as u32, y as u32, mover_radius) {
                        // Lowest (y, x) in the ring for deterministic output.
                        let candidate = (x as u32, y as u32);
                        if best.map_or(true, |b| (candidate.1, candidate.0) < (b.1, b.0)) {
                            best = Some(candidate);
                        }
                    }
                }
            }
            if best.is_some() {
                return best;
            }
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct OpenNode {
    x: u32,
    y: u32,
    f_score: f32,
    tie_breaker: u64,
}

impl Eq for OpenNode {}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap on f_score with a deterministic coordinate tie-break.
        match other
            .f_score
            .partial_cmp(&self.f_score)
            .unwrap_or(Ordering::Equal)
        {
            Ordering::Equal => other.tie_breaker.cmp(&self.tie_breaker),
            ord => ord,
        }
    }
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

const DIRECTIONS: [(i64, i64); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

const SQRT_2: f32 = std::f32::consts::SQRT_2;

fn tie_breaker(x: u32, y: u32) -> u64 {
    (u64::from(y) << 32) | u64::from(x)
}

fn octile_heuristic(x1: u32, y1: u32, x2: u32, y2: u32) -> f32 {
    let dx = x1.abs_diff(x2) as f32;
    let dy = y1.abs_diff(y2) as f32;
    let (min, max) = if dx < dy { (dx, dy) } else { (dy, dx) };
    max + (SQRT_2 - 1.0) * min
}

/// Find a waypoint path from `start` to `goal` for a ground mover.
///
/// Airborne movers never call this; they fly straight. The result is
/// smoothed with line-of-sight shortcuts. A blocked goal snaps to the
/// nearest free cell; an unreachable goal yields a path to the closest
/// reachable cell. An empty result means the start itself is off-grid.
#[must_use]
pub fn find_path(grid: &NavGrid, start: Vec2, goal: Vec2, mover_radius: f32) -> Vec<Vec2> {
    let Some(start_cell) = grid
        .world_to_cell(start)
        .and_then(|c| grid.nearest_walkable(c, mover_radius))
    else {
        return Vec::new();
    };
    let Some(goal_cell) = grid
        .world_to_cell(goal)
        .and_then(|c| grid.nearest_walkable(c, mover_radius))
    else {
        return Vec::new();
    };

    if start_cell == goal_cell {
        return vec![goal];
    }

    let mut open: BinaryHeap<OpenNode> = BinaryHeap::new();
    let mut came_from: HashMap<(u32, u32), (u32, u32)> = HashMap::new();
    let mut g_score: HashMap<(u32, u32), f32> = HashMap::new();

    g_score.insert(start_cell, 0.0);
    open.push(OpenNode {
        x: start_cell.0,
        y: start_cell.1,
        f_score: octile_heuristic(start_cell.0, start_cell.1, goal_cell.0, goal_cell.1),
        tie_breaker: tie_breaker(start_cell.0, start_cell.1),
    });

    // Track the explored cell closest to the goal for the unreachable
    // fallback.
    let mut best_effort = start_cell;
    let mut best_effort_h = octile_heuristic(start_cell.0, start_cell.1, goal_cell.0, goal_cell.1);

    while let Some(current) = open.pop() {
        let cell = (current.x, current.y);
        if cell == goal_cell {
            let mut path = reconstruct(grid, &came_from, goal_cell);
            // End exactly on the requested goal when it was walkable.
            if grid.world_to_cell(goal) == Some(goal_cell) {
                path.pop();
                path.push(goal);
            }
            return smooth_path(grid, path, mover_radius);
        }

        let current_g = g_score.get(&cell).copied().unwrap_or(f32::MAX);

        for &(dx, dy) in &DIRECTIONS {
            let nx = i64::from(current.x) + dx;
            let ny = i64::from(current.y) + dy;
            if !grid.in_bounds(nx, ny) {
                continue;
            }
            let nx = nx as u32;
            let ny = ny as u32;
            if !grid.is_walkable(nx, ny, mover_radius) {
                continue;
            }
            // No corner cutting on diagonals.
            if dx != 0 && dy != 0 {
                let side_a = grid.is_walkable(nx, current.y, mover_radius);
                let side_b = grid.is_walkable(current.x, ny, mover_radius);
                if !side_a || !side_b {
                    continue;
                }
            }

            let step = if dx != 0 && dy != 0 { SQRT_2 } else { 1.0 };
            let tentative = current_g + step;
            let neighbor_g = g_score.get(&(nx, ny)).copied().unwrap_or(f32::MAX);
            if tentative < neighbor_g {
                came_from.insert((nx, ny), cell);
                g_score.insert((nx, ny), tentative);
                let h = octile_heuristic(nx, ny, goal_cell.0, goal_cell.1);
                if h < best_effort_h {
                    best_effort_h = h;
                    best_effort = (nx, ny);
                }
                open.push(OpenNode {
                    x: nx,
                    y: ny,
                    f_score: tentative + h,
                    tie_breaker: tie_breaker(nx, ny),
                });
            }
        }
    }

    // Unreachable: walk as close as the grid allows.
    let path = reconstruct(grid, &came_from, best_effort);
    smooth_path(grid, path, mover_radius)
}

fn reconstruct(
    grid: &NavGrid,
    came_from: &HashMap<(u32, u32), (u32, u32)>,
    goal: (u32, u32),
) -> Vec<Vec2> {
    let mut cells = vec![goal];
    let mut current = goal;
    while let Some(&prev) = came_from.get(&current) {
        cells.push(prev);
        current = prev;
    }
    cells.reverse();
    cells
        .into_iter()
        .map(|(x, y)| grid.cell_to_world(x, y))
        .collect()
}

/// Drop intermediate waypoints that a straight line can skip.
#[must_use]
pub fn smooth_path(grid: &NavGrid, path: Vec<Vec2>, mover_radius: f32) -> Vec<Vec2> {
    if path.len() <= 2 {
        return path;
    }
    let mut smoothed = Vec::with_capacity(path.len());
    smoothed.push(path[0]);
    let mut current = 0;
    while current < path.len() - 1 {
        let mut furthest = current + 1;
        for check in (current + 2)..path.len() {
            if has_line_of_sight(grid, path[current], path[check], mover_radius) {
                furthest = check;
            }
        }
        smoothed.push(path[furthest]);
        current = furthest;
    }
    smoothed
}

fn has_line_of_sight(grid: &NavGrid, start: Vec2, end: Vec2, mover_radius: f32) -> bool {
    let length = start.distance(end);
    let steps = (length / (grid.cell_size() * 0.5)).ceil().max(1.0) as u32;
    for i in 0..=steps {
        let t = i as f32 / steps as f32;
        let point = start.lerp(end, t);
        let Some((x, y)) = grid.world_to_cell(point) else {
            return false;
        };
        if !grid.is_walkable(x, y, mover_radius) {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_grid() -> NavGrid {
        NavGrid::new(1000.0, 25.0)
    }

    #[test]
    fn test_straight_path_on_open_ground() {
        let grid = open_grid();
        let path = find_path(&grid, Vec2::new(50.0, 50.0), Vec2::new(800.0, 50.0), 8.0);
        assert!(!path.is_empty());
        let last = path.last().unwrap();
        assert!(last.distance(Vec2::new(800.0, 50.0)) < 30.0);
        // Smoothing collapses an unobstructed run to start + goal.
        assert!(path.len() <= 3, "expected short path, got {path:?}");
    }

    #[test]
    fn test_path_routes_around_wall() {
        let mut grid = open_grid();
        // Vertical barrier at x≈500 with a gap at the top.
        for y in 0..35 {
            grid.block_circle(Vec2::new(500.0, y as f32 * 25.0), 13.0);
        }

        let path = find_path(&grid, Vec2::new(100.0, 500.0), Vec2::new(900.0, 500.0), 8.0);
        assert!(!path.is_empty());
        let last = path.last().unwrap();
        assert!(last.distance(Vec2::new(900.0, 500.0)) < 40.0);
        // Must detour above the barrier.
        assert!(path.iter().any(|p| p.y > 700.0), "no detour in {path:?}");
    }

    #[test]
    fn test_blocked_goal_snaps_to_free_cell() {
        let mut grid = open_grid();
        grid.block_circle(Vec2::new(500.0, 500.0), 60.0);

        let path = find_path(&grid, Vec2::new(100.0, 500.0), Vec2::new(500.0, 500.0), 8.0);
        assert!(!path.is_empty());
        let last = *path.last().unwrap();
        let (x, y) = grid.world_to_cell(last).unwrap();
        assert!(grid.is_walkable(x, y, 8.0));
    }

    #[test]
    fn test_unreachable_goal_best_effort() {
        let mut grid = open_grid();
        // Fully enclose the goal region.
        for i in 0..40 {
            grid.block_circle(Vec2::new(700.0, i as f32 * 25.0), 15.0);
            grid.block_circle(Vec2::new(i as f32 * 25.0, 700.0), 15.0);
        }
        // Carve the start area free again if the walls clipped it.
        let path = find_path(&grid, Vec2::new(100.0, 100.0), Vec2::new(900.0, 900.0), 8.0);
        // Best-effort path stays on the near side of the barrier.
        if let Some(last) = path.last() {
            assert!(last.x < 720.0 && last.y < 720.0, "crossed barrier: {last:?}");
        }
    }

    #[test]
    fn test_determinism() {
        let mut grid = open_grid();
        grid.block_circle(Vec2::new(500.0, 500.0), 100.0);
        let a = find_path(&grid, Vec2::new(100.0, 500.0), Vec2::new(900.0, 500.0), 8.0);
        let b = find_path(&grid, Vec2::new(100.0, 500.0), Vec2::new(900.0, 500.0), 8.0);
        assert_eq!(a, b);
    }

    #[test]
    fn test_nearest_walkable_ring_search() {
        let mut grid = open_grid();
        grid.block_circle(Vec2::new(500.0, 500.0), 80.0);
        let cell = grid.world_to_cell(Vec2::new(500.0, 500.0)).unwrap();
        let free = grid.nearest_walkable(cell, 8.0).unwrap();
        assert!(grid.is_walkable(free.0, free.1, 8.0));
        assert_ne!(cell, free);
    }
}
