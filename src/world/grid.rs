use crate::autotile::TerrainSource;
use crate::tiles::{TerrainId, TERRAIN_NONE};
use bevy::prelude::*;

/// Terrain class per cell, stored row-major.
///
/// Cloning gives an immutable snapshot for a resolution pass. `revision` moves
/// forward on every effective edit so resolved data can tell it is stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerrainGrid {
    size: UVec2,
    cells: Vec<TerrainId>,
    revision: u64,
}

impl TerrainGrid {
    /// Create a grid with every cell set to `terrain`
    pub fn filled(size: UVec2, terrain: TerrainId) -> Self {
        Self {
            size,
            cells: vec![terrain; (size.x as usize) * (size.y as usize)],
            revision: 0,
        }
    }

    /// Create a grid without terrain
    pub fn empty(size: UVec2) -> Self {
        Self::filled(size, TERRAIN_NONE)
    }

    /// Create a grid from rows, top row first. Returns `None` for ragged input.
    pub fn from_rows(rows: &[&[TerrainId]]) -> Option<Self> {
        let width = rows.first().map_or(0, |row| row.len());
        if rows.iter().any(|row| row.len() != width) {
            return None;
        }
        let size = UVec2::new(u32::try_from(width).ok()?, u32::try_from(rows.len()).ok()?);
        Some(Self {
            size,
            cells: rows.concat(),
            revision: 0,
        })
    }

    pub fn size(&self) -> UVec2 {
        self.size
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn contains(&self, pos: UVec2) -> bool {
        pos.x < self.size.x && pos.y < self.size.y
    }

    fn index(&self, pos: UVec2) -> usize {
        pos.y as usize * self.size.x as usize + pos.x as usize
    }

    /// Get terrain at a cell
    pub fn get(&self, pos: UVec2) -> Option<TerrainId> {
        if !self.contains(pos) {
            return None;
        }
        Some(self.cells[self.index(pos)])
    }

    /// Set terrain at a cell. Returns false when out of bounds.
    /// The revision only advances when the value actually changes.
    pub fn set(&mut self, pos: UVec2, terrain: TerrainId) -> bool {
        if !self.contains(pos) {
            return false;
        }
        let index = self.index(pos);
        if self.cells[index] != terrain {
            self.cells[index] = terrain;
            self.revision += 1;
        }
        true
    }

    /// Every cell position in row-major order
    pub fn positions(&self) -> impl Iterator<Item = UVec2> {
        let size = self.size;
        (0..size.y).flat_map(move |y| (0..size.x).map(move |x| UVec2::new(x, y)))
    }

    /// Number of cells carrying `terrain`
    pub fn count(&self, terrain: TerrainId) -> usize {
        self.cells.iter().filter(|&&cell| cell == terrain).count()
    }
}

impl TerrainSource for TerrainGrid {
    fn size(&self) -> UVec2 {
        self.size
    }

    fn terrain_at(&self, x: i32, y: i32) -> TerrainId {
        match (u32::try_from(x), u32::try_from(y)) {
            (Ok(x), Ok(y)) => self.get(UVec2::new(x, y)).unwrap_or(TERRAIN_NONE),
            _ => TERRAIN_NONE,
        }
    }
}
