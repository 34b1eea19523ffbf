use super::grid::TerrainGrid;
use crate::tiles::TerrainId;
use bevy::prelude::*;
use std::collections::HashSet;

/// Terrain map resource: the authoritative grid plus the cells edited since
/// the last incremental pass.
///
/// The grid is only writable through [`TerrainMap::set_terrain`] and
/// [`TerrainMap::replace_grid`] so every change is tracked.
#[derive(Resource, Debug, Clone)]
pub struct TerrainMap {
    /// Terrain class per cell
    grid: TerrainGrid,

    /// Cells that changed and still need re-resolving
    dirty_cells: HashSet<UVec2>,

    /// Set for a new or replaced grid until a full pass has run on it
    full_pass_pending: bool,
}

impl TerrainMap {
    pub fn new(grid: TerrainGrid) -> Self {
        Self {
            grid,
            dirty_cells: HashSet::new(),
            full_pass_pending: true,
        }
    }

    pub fn grid(&self) -> &TerrainGrid {
        &self.grid
    }

    /// Swap in a whole new grid. Pending edits are dropped, the next pass
    /// resolves everything.
    pub fn replace_grid(&mut self, grid: TerrainGrid) {
        self.grid = grid;
        self.dirty_cells.clear();
        self.full_pass_pending = true;
    }

    pub fn needs_full_pass(&self) -> bool {
        self.full_pass_pending
    }

    /// Record that a full pass was attempted on the current grid
    pub fn finish_full_pass(&mut self) {
        self.full_pass_pending = false;
    }

    /// Change the terrain at a cell and mark it dirty.
    /// Returns false for out-of-bounds cells. Writing the same value is a no-op.
    pub fn set_terrain(&mut self, pos: UVec2, terrain: TerrainId) -> bool {
        let Some(current) = self.grid.get(pos) else {
            return false;
        };
        if current != terrain {
            self.grid.set(pos, terrain);
            self.dirty_cells.insert(pos);
        }
        true
    }

    pub fn terrain_at(&self, pos: UVec2) -> Option<TerrainId> {
        self.grid.get(pos)
    }

    pub fn is_dirty(&self, pos: &UVec2) -> bool {
        self.dirty_cells.contains(pos)
    }

    pub fn has_dirty_cells(&self) -> bool {
        !self.dirty_cells.is_empty()
    }

    /// Queue a cell for re-resolving without changing it
    pub fn mark_dirty(&mut self, pos: UVec2) {
        if self.grid.contains(pos) {
            self.dirty_cells.insert(pos);
        }
    }

    /// Drain the dirty set (row-major, for stable logging)
    pub fn take_dirty(&mut self) -> Vec<UVec2> {
        let mut cells: Vec<UVec2> = self.dirty_cells.drain().collect();
        cells.sort_by_key(|pos| (pos.y, pos.x));
        cells
    }

    /// Get statistics about the map state
    pub fn stats(&self) -> TerrainMapStats {
        let size = self.grid.size();
        let cells = (size.x * size.y) as usize;
        TerrainMapStats {
            size,
            painted_cells: cells - self.grid.count(crate::tiles::TERRAIN_NONE),
            dirty_cells: self.dirty_cells.len(),
            revision: self.grid.revision(),
        }
    }
}

/// Statistics about the current map state
#[derive(Debug, Clone)]
pub struct TerrainMapStats {
    pub size: UVec2,
    pub painted_cells: usize,
    pub dirty_cells: usize,
    pub revision: u64,
}

impl std::fmt::Display for TerrainMapStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Size: {}x{}, Painted: {}, Dirty: {}, Revision: {}",
            self.size.x, self.size.y, self.painted_cells, self.dirty_cells, self.revision
        )
    }
}
