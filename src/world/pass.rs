use super::grid::TerrainGrid;
use crate::autotile::{self, Direction};
use crate::tiles::{Catalog, CatalogError, CollisionShape, TerrainId, TileId, TERRAIN_NONE};
use bevy::log::debug;
use bevy::prelude::*;
use bevy::tasks::TaskPool;
use std::collections::BTreeSet;

/// Render and collision data for one cell
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCell {
    pub terrain: TerrainId,
    pub tile_id: TileId,
    /// World-space collision geometry
    pub collision: Vec<CollisionShape>,
}

/// Result of re-resolving one cell during an incremental pass
#[derive(Debug, Clone, PartialEq)]
pub struct CellUpdate {
    pub position: UVec2,
    pub cell: Option<ResolvedCell>,
}

/// Error type for resolution passes
#[derive(Debug)]
pub enum ResolveError {
    /// The grid holds a terrain class the catalog never declared
    UnknownTerrain {
        terrain: TerrainId,
        position: UVec2,
    },
    /// Resolver picked a tile the catalog doesn't know (catalog/resolver desync)
    Catalog(CatalogError),
}

impl From<CatalogError> for ResolveError {
    fn from(err: CatalogError) -> Self {
        ResolveError::Catalog(err)
    }
}

impl std::fmt::Display for ResolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolveError::UnknownTerrain { terrain, position } => write!(
                f,
                "Unknown terrain {} at cell ({}, {})",
                terrain, position.x, position.y
            ),
            ResolveError::Catalog(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ResolveError {}

/// Resolved cells parallel to a terrain grid.
///
/// Derived data: the terrain grid stays authoritative, this only records which
/// grid revision it was computed from.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResolvedGrid {
    size: UVec2,
    cells: Vec<Option<ResolvedCell>>,
    revision: u64,
}

impl ResolvedGrid {
    pub fn size(&self) -> UVec2 {
        self.size
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Get the resolved cell at a position (`None` for empty or out-of-bounds cells)
    pub fn get(&self, pos: UVec2) -> Option<&ResolvedCell> {
        if pos.x >= self.size.x || pos.y >= self.size.y {
            return None;
        }
        self.cells[pos.y as usize * self.size.x as usize + pos.x as usize].as_ref()
    }

    /// Resolved cells with their positions, row-major, empty cells skipped
    pub fn iter(&self) -> impl Iterator<Item = (UVec2, &ResolvedCell)> + '_ {
        let width = self.size.x.max(1) as usize;
        self.cells.iter().enumerate().filter_map(move |(index, cell)| {
            cell.as_ref()
                .map(|cell| (UVec2::new((index % width) as u32, (index / width) as u32), cell))
        })
    }

    /// Write incremental results back and stamp the grid revision they came from
    pub fn apply(&mut self, updates: Vec<CellUpdate>, revision: u64) {
        self.patch(updates);
        self.revision = revision;
    }

    /// Write incremental results back without claiming any grid revision.
    /// Used when part of a pass failed and the data can't be called current.
    pub fn patch(&mut self, updates: Vec<CellUpdate>) {
        for update in updates {
            let pos = update.position;
            if pos.x < self.size.x && pos.y < self.size.y {
                let index = pos.y as usize * self.size.x as usize + pos.x as usize;
                self.cells[index] = update.cell;
            }
        }
    }

    /// True when the grid was edited after this data was resolved
    pub fn is_stale(&self, grid: &TerrainGrid) -> bool {
        self.size != grid.size() || self.revision != grid.revision()
    }

    /// Total number of world-space collision shapes
    pub fn collision_count(&self) -> usize {
        self.iter().map(|(_, cell)| cell.collision.len()).sum()
    }
}

/// Sample, resolve and place geometry for one cell
pub fn resolve_cell(
    catalog: &Catalog,
    grid: &TerrainGrid,
    pos: UVec2,
) -> Result<Option<ResolvedCell>, ResolveError> {
    let terrain = grid.get(pos).unwrap_or(TERRAIN_NONE);
    if terrain == TERRAIN_NONE {
        return Ok(None);
    }

    let mask = autotile::sample(grid, pos.x as i32, pos.y as i32);
    let tile_id = autotile::resolve(catalog, terrain, mask)
        .ok_or(ResolveError::UnknownTerrain {
            terrain,
            position: pos,
        })?;
    let collision = autotile::build(catalog, tile_id, autotile::cell_origin(catalog, pos))?;

    Ok(Some(ResolvedCell {
        terrain,
        tile_id,
        collision,
    }))
}

/// Resolve every cell of the grid
pub fn resolve_all(
    catalog: &Catalog,
    grid: &TerrainGrid,
) -> Result<ResolvedGrid, ResolveError> {
    let cells = grid
        .positions()
        .map(|pos| resolve_cell(catalog, grid, pos))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ResolvedGrid {
        size: grid.size(),
        cells,
        revision: grid.revision(),
    })
}

/// Resolve every cell, splitting the grid into bands of `band_rows` rows that
/// run on `pool`. Produces the same result as [`resolve_all`].
pub fn resolve_all_parallel(
    catalog: &Catalog,
    grid: &TerrainGrid,
    pool: &TaskPool,
    band_rows: u32,
) -> Result<ResolvedGrid, ResolveError> {
    let size = grid.size();
    let band_rows = band_rows.max(1);

    let mut bands = pool.scope(|scope| {
        for start in (0..size.y).step_by(band_rows as usize) {
            let end = (start + band_rows).min(size.y);
            scope.spawn(async move {
                let mut cells = Vec::with_capacity(((end - start) * size.x) as usize);
                for y in start..end {
                    for x in 0..size.x {
                        cells.push(resolve_cell(catalog, grid, UVec2::new(x, y))?);
                    }
                }
                Ok::<_, ResolveError>((start, cells))
            });
        }
    });

    // Bands may finish in any order
    bands.sort_by_key(|band| band.as_ref().map_or(0, |(start, _)| *start));

    let mut cells = Vec::with_capacity((size.x * size.y) as usize);
    for band in bands {
        let (_, band_cells) = band?;
        cells.extend(band_cells);
    }
    debug!("Resolved {}x{} grid on {} threads", size.x, size.y, pool.thread_num());

    Ok(ResolvedGrid {
        size,
        cells,
        revision: grid.revision(),
    })
}

/// Cells whose resolved tile can change after editing `changed`: the cells
/// themselves and their 8 neighbors, clipped to the grid, row-major.
pub fn affected_cells(size: UVec2, changed: &[UVec2]) -> Vec<UVec2> {
    let mut affected = BTreeSet::new();
    for &pos in changed {
        if pos.x >= size.x || pos.y >= size.y {
            continue;
        }
        affected.insert((pos.y, pos.x));
        for dir in Direction::ALL {
            let neighbor = pos.as_ivec2() + dir.offset();
            if let (Ok(x), Ok(y)) = (u32::try_from(neighbor.x), u32::try_from(neighbor.y)) {
                if x < size.x && y < size.y {
                    affected.insert((y, x));
                }
            }
        }
    }
    affected.into_iter().map(|(y, x)| UVec2::new(x, y)).collect()
}

/// Re-resolve the cells affected by edits at `changed`
pub fn resolve_region(
    catalog: &Catalog,
    grid: &TerrainGrid,
    changed: &[UVec2],
) -> Result<Vec<CellUpdate>, ResolveError> {
    affected_cells(grid.size(), changed)
        .into_iter()
        .map(|position| {
            Ok(CellUpdate {
                position,
                cell: resolve_cell(catalog, grid, position)?,
            })
        })
        .collect()
}

/// Outcome of a region pass that keeps going past failing cells
#[derive(Debug, Default)]
pub struct RegionUpdate {
    pub updates: Vec<CellUpdate>,
    pub failures: Vec<(UVec2, ResolveError)>,
}

impl RegionUpdate {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Like [`resolve_region`], but resolves every affected cell it can and
/// collects the failing ones instead of discarding the whole region
pub fn resolve_region_partial(
    catalog: &Catalog,
    grid: &TerrainGrid,
    changed: &[UVec2],
) -> RegionUpdate {
    let mut region = RegionUpdate::default();
    for position in affected_cells(grid.size(), changed) {
        match resolve_cell(catalog, grid, position) {
            Ok(cell) => region.updates.push(CellUpdate { position, cell }),
            Err(e) => region.failures.push((position, e)),
        }
    }
    region
}
