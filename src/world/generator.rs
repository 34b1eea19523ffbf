use super::grid::TerrainGrid;
use crate::tiles::TerrainId;
use bevy::prelude::*;

/// Generate a demo map: `background` everywhere with an elliptical island of
/// `island` in the middle, leaving a one-cell margin so every edge role shows up.
pub fn generate_island(size: UVec2, background: TerrainId, island: TerrainId) -> TerrainGrid {
    let mut grid = TerrainGrid::filled(size, background);

    let center = size.as_vec2() / 2.0;
    let radius = (center - Vec2::splat(1.5)).max(Vec2::ZERO);
    if radius.x <= 0.0 || radius.y <= 0.0 {
        return grid;
    }

    for y in 0..size.y {
        for x in 0..size.x {
            let cell_center = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            let d = (cell_center - center) / radius;
            if d.length_squared() <= 1.0 {
                grid.set(UVec2::new(x, y), island);
            }
        }
    }

    grid
}
