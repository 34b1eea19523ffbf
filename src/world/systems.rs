use super::manager::TerrainMap;
use super::pass;
use super::{ResolvedMap, TileCatalog};
use crate::config::AutotileConfig;
use bevy::prelude::*;
use bevy::tasks::{ComputeTaskPool, TaskPool};

/// System to resolve every cell of the terrain map on the compute task pool
pub fn resolve_full_map(
    catalog: Res<TileCatalog>,
    config: Res<AutotileConfig>,
    mut map: ResMut<TerrainMap>,
    mut resolved: ResMut<ResolvedMap>,
) {
    let pool = ComputeTaskPool::get_or_init(TaskPool::new);
    map.finish_full_pass();

    match pass::resolve_all_parallel(&catalog, map.grid(), pool, config.parallel_rows) {
        Ok(grid) => {
            // Everything is fresh, earlier edits are covered
            map.take_dirty();
            resolved.0 = grid;
            let size = resolved.size();
            info!(
                "Resolved {}x{} terrain map ({} collision shapes)",
                size.x,
                size.y,
                resolved.collision_count()
            );
        }
        Err(e) => {
            error!("Failed to resolve terrain map: {}", e);
        }
    }
}

/// System to re-resolve the neighborhoods of cells edited since the last pass.
///
/// Falls back to a full pass for a new or resized grid. Cells that fail to
/// resolve stay dirty and the resolved map stays stale until they're fixed.
pub fn resolve_dirty_cells(
    catalog: Res<TileCatalog>,
    mut map: ResMut<TerrainMap>,
    mut resolved: ResMut<ResolvedMap>,
) {
    if !map.needs_full_pass() && !map.has_dirty_cells() {
        return;
    }

    // Grid was replaced wholesale, an incremental pass can't catch up
    if map.needs_full_pass() || resolved.size() != map.grid().size() {
        debug!("Terrain map replaced or resized, resolving everything");
        map.finish_full_pass();
        match pass::resolve_all(&catalog, map.grid()) {
            Ok(grid) => {
                map.take_dirty();
                resolved.0 = grid;
            }
            Err(e) => error!("Failed to resolve terrain map: {}", e),
        }
        return;
    }

    let changed = map.take_dirty();
    let region = pass::resolve_region_partial(&catalog, map.grid(), &changed);
    debug!(
        "Re-resolved {} cells around {} edits",
        region.updates.len(),
        changed.len()
    );

    if region.is_complete() {
        let revision = map.grid().revision();
        resolved.apply(region.updates, revision);
        return;
    }

    resolved.patch(region.updates);
    for (pos, e) in region.failures {
        error!("Failed to re-resolve cell ({}, {}): {}", pos.x, pos.y, e);
        map.mark_dirty(pos);
    }
}

/// System to log map statistics for debugging
pub fn log_map_stats(map: Res<TerrainMap>, resolved: Res<ResolvedMap>) {
    if resolved.is_changed() {
        debug!("Map stats: {}", map.stats());
    }
}
