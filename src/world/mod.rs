pub mod generator;
pub mod grid;
pub mod manager;
pub mod pass;
pub mod systems;

// Re-export commonly used items
pub use generator::generate_island;
pub use grid::TerrainGrid;
pub use manager::{TerrainMap, TerrainMapStats};
pub use pass::{
    affected_cells, resolve_all, resolve_all_parallel, resolve_cell, resolve_region,
    resolve_region_partial, CellUpdate, RegionUpdate, ResolveError, ResolvedCell, ResolvedGrid,
};

use crate::config::AutotileConfig;
use crate::tiles::{Catalog, TERRAIN_NONE};
use bevy::prelude::*;
use std::sync::Arc;

/// Shared read-only tile catalog
#[derive(Resource, Clone, Deref)]
pub struct TileCatalog(pub Arc<Catalog>);

/// Latest resolution result for the terrain map
#[derive(Resource, Default, Deref, DerefMut)]
pub struct ResolvedMap(pub ResolvedGrid);

/// Plugin that keeps a resolved tile map in sync with the terrain map.
///
/// Uses the app's [`TerrainMap`] if one is inserted before the plugin,
/// otherwise builds the demo island described by [`AutotileConfig`].
pub struct AutotilePlugin {
    pub catalog: Arc<Catalog>,
}

impl AutotilePlugin {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog: Arc::new(catalog),
        }
    }
}

impl Plugin for AutotilePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<AutotileConfig>();

        if !app.world().contains_resource::<TerrainMap>() {
            let config = app.world().resource::<AutotileConfig>();
            let map = demo_map(&self.catalog, config);
            app.insert_resource(map);
        }

        app.insert_resource(TileCatalog(self.catalog.clone()))
            .init_resource::<ResolvedMap>()
            .add_systems(Startup, systems::resolve_full_map)
            .add_systems(
                Update,
                (systems::resolve_dirty_cells, systems::log_map_stats).chain(),
            );
    }
}

/// Build the configured demo map, falling back to the first catalog terrain
/// when a configured name is unknown
pub fn demo_map(catalog: &Catalog, config: &AutotileConfig) -> TerrainMap {
    let fallback = catalog
        .terrains()
        .next()
        .map_or(TERRAIN_NONE, |(terrain, _)| terrain);
    let terrain = |name: &str| {
        catalog.terrain_id(name).unwrap_or_else(|| {
            warn!("Unknown demo terrain '{}', using terrain {}", name, fallback);
            fallback
        })
    };

    let background = terrain(&config.demo_background);
    let island = terrain(&config.demo_island);
    TerrainMap::new(generate_island(config.demo_size, background, island))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiles::{OrientationRole, TerrainId, TileDefinition, TileId};
    use bevy::app::TaskPoolPlugin;

    fn catalog() -> Catalog {
        use OrientationRole::*;
        Catalog::from_definitions(
            64,
            64,
            vec![
                TileDefinition::new(1, "grass.png").with_terrain("grass"),
                TileDefinition::new(14, "water.png").with_terrain("water"),
                TileDefinition::new(15, "Orientation=top.png").with_role(Top),
                TileDefinition::new(16, "Orientation=right.png").with_role(Right),
                TileDefinition::new(17, "Orientation=left.png").with_role(Left),
                TileDefinition::new(23, "Orientation=bottom.png").with_role(Bottom),
            ],
        )
        .unwrap()
    }

    fn app(catalog: Catalog, map: TerrainMap) -> App {
        let mut app = App::new();
        app.add_plugins(TaskPoolPlugin::default())
            .insert_resource(map)
            .add_plugins(AutotilePlugin::new(catalog));
        app
    }

    fn grass_map(size: UVec2, grass: TerrainId) -> TerrainMap {
        TerrainMap::new(TerrainGrid::filled(size, grass))
    }

    fn tile_at(app: &App, x: u32, y: u32) -> Option<TileId> {
        let resolved = app.world().resource::<ResolvedMap>();
        resolved.get(UVec2::new(x, y)).map(|cell| cell.tile_id)
    }

    fn assert_in_sync(app: &App, catalog: &Catalog) {
        let map = app.world().resource::<TerrainMap>();
        let resolved = app.world().resource::<ResolvedMap>();
        assert!(!map.has_dirty_cells());
        assert!(!resolved.is_stale(map.grid()));
        assert_eq!(**resolved, resolve_all(catalog, map.grid()).unwrap());
    }

    #[test]
    fn test_plugin_resolves_on_startup() {
        let catalog = catalog();
        let grass = catalog.terrain_id("grass").unwrap();
        let mut app = app(catalog, grass_map(UVec2::new(5, 5), grass));
        app.update();

        assert_eq!(app.world().resource::<ResolvedMap>().size(), UVec2::new(5, 5));
        assert_eq!(tile_at(&app, 2, 2), Some(1));
        assert_eq!(tile_at(&app, 2, 0), Some(15));
    }

    #[test]
    fn test_plugin_applies_edits_incrementally() {
        let catalog = catalog();
        let grass = catalog.terrain_id("grass").unwrap();
        let water = catalog.terrain_id("water").unwrap();
        let mut app = app(catalog.clone(), grass_map(UVec2::new(5, 5), grass));
        app.update();

        app.world_mut()
            .resource_mut::<TerrainMap>()
            .set_terrain(UVec2::new(2, 1), water);
        app.update();

        let map = app.world().resource::<TerrainMap>();
        let resolved = app.world().resource::<ResolvedMap>();
        assert!(!map.has_dirty_cells());
        assert!(!resolved.is_stale(map.grid()));
        // Grass below the new water cell now shows its top edge
        assert_eq!(resolved.get(UVec2::new(2, 2)).map(|cell| cell.tile_id), Some(15));
        assert_eq!(**resolved, resolve_all(&catalog, map.grid()).unwrap());
    }

    #[test]
    fn test_demo_map_from_config() {
        let catalog = catalog();
        let config = AutotileConfig {
            demo_size: UVec2::new(8, 8),
            ..default()
        };
        let map = demo_map(&catalog, &config);

        assert_eq!(map.grid().size(), UVec2::new(8, 8));
        assert_eq!(map.terrain_at(UVec2::ZERO), catalog.terrain_id("water"));
        assert_eq!(map.terrain_at(UVec2::new(4, 4)), catalog.terrain_id("grass"));

        // Unknown names fall back to the first terrain
        let config = AutotileConfig {
            demo_background: "lava".to_string(),
            demo_island: "mud".to_string(),
            ..config
        };
        let map = demo_map(&catalog, &config);
        assert_eq!(map.grid().count(catalog.terrain_id("grass").unwrap()), 64);
    }

    #[test]
    fn test_failed_edit_is_retried() {
        let catalog = catalog();
        let grass = catalog.terrain_id("grass").unwrap();
        let water = catalog.terrain_id("water").unwrap();
        let mut app = app(catalog.clone(), grass_map(UVec2::new(8, 8), grass));
        app.update();

        {
            let mut map = app.world_mut().resource_mut::<TerrainMap>();
            map.set_terrain(UVec2::new(1, 1), water);
            map.set_terrain(UVec2::new(6, 6), 99);
        }
        app.update();

        // The good edit lands, the bad one stays pending and the map stays stale
        assert_eq!(tile_at(&app, 1, 1), Some(15));
        {
            let map = app.world().resource::<TerrainMap>();
            let resolved = app.world().resource::<ResolvedMap>();
            assert!(map.is_dirty(&UVec2::new(6, 6)));
            assert!(resolved.is_stale(map.grid()));
        }

        app.world_mut()
            .resource_mut::<TerrainMap>()
            .set_terrain(UVec2::new(6, 6), grass);
        app.update();

        assert_in_sync(&app, &catalog);
        assert_eq!(tile_at(&app, 1, 1), Some(15));
        assert_eq!(tile_at(&app, 6, 6), Some(1));
    }

    #[test]
    fn test_replaced_grid_is_resolved() {
        let catalog = catalog();
        let grass = catalog.terrain_id("grass").unwrap();
        let water = catalog.terrain_id("water").unwrap();
        let mut app = app(catalog.clone(), grass_map(UVec2::new(5, 5), grass));
        app.update();
        assert_eq!(tile_at(&app, 2, 2), Some(1));

        // Same size, same revision, no dirty cells
        app.world_mut()
            .resource_mut::<TerrainMap>()
            .replace_grid(TerrainGrid::filled(UVec2::new(5, 5), water));
        app.update();
        assert_in_sync(&app, &catalog);
        assert_eq!(tile_at(&app, 2, 2), Some(14));

        // A freshly inserted resource is picked up the same way
        app.insert_resource(grass_map(UVec2::new(5, 5), grass));
        app.update();
        assert_in_sync(&app, &catalog);
        assert_eq!(tile_at(&app, 2, 2), Some(1));
    }

    #[test]
    fn test_resized_map_is_rebuilt() {
        let catalog = catalog();
        let grass = catalog.terrain_id("grass").unwrap();
        let water = catalog.terrain_id("water").unwrap();
        let mut app = app(catalog.clone(), grass_map(UVec2::new(5, 5), grass));
        app.update();

        let mut map = grass_map(UVec2::new(9, 7), grass);
        map.finish_full_pass();
        map.set_terrain(UVec2::new(8, 6), water);
        app.insert_resource(map);
        app.update();

        assert_eq!(app.world().resource::<ResolvedMap>().size(), UVec2::new(9, 7));
        assert_in_sync(&app, &catalog);
    }

    #[test]
    fn test_startup_failure_recovers_on_edit() {
        let catalog = catalog();
        let grass = catalog.terrain_id("grass").unwrap();
        let mut grid = TerrainGrid::filled(UVec2::new(4, 4), grass);
        grid.set(UVec2::new(2, 2), 99);
        let mut app = app(catalog.clone(), TerrainMap::new(grid));
        app.update();

        {
            let map = app.world().resource::<TerrainMap>();
            let resolved = app.world().resource::<ResolvedMap>();
            assert_eq!(resolved.size(), UVec2::ZERO);
            assert!(resolved.is_stale(map.grid()));
            assert!(!map.needs_full_pass());
        }

        // Nothing changed, no retry
        app.update();
        assert_eq!(app.world().resource::<ResolvedMap>().size(), UVec2::ZERO);

        app.world_mut()
            .resource_mut::<TerrainMap>()
            .set_terrain(UVec2::new(2, 2), grass);
        app.update();

        assert_in_sync(&app, &catalog);
        assert_eq!(tile_at(&app, 2, 2), Some(1));
    }
}
