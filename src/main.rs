use bevy::{log::LogPlugin, prelude::*};
use terrain_autotile::{AutotileConfig, AutotilePlugin, ResolvedMap, TerrainMap};

fn main() {
    let mut app = App::new();
    app.add_plugins((MinimalPlugins, LogPlugin::default()));

    // Prints usage or version and exits on bad or informational flags
    let config = AutotileConfig::from_args(std::env::args_os()).unwrap_or_else(|e| e.exit());

    let catalog = match config.load_catalog() {
        Ok(catalog) => catalog,
        Err(e) => {
            error!(
                "Failed to load tile catalog {}: {}",
                config.tileset_path.display(),
                e
            );
            std::process::exit(1);
        }
    };
    if catalog.is_empty() {
        warn!("Tile catalog {} has no tiles", config.tileset_path.display());
    }
    info!(
        "Catalog ready: {} tiles, {} terrains",
        catalog.len(),
        catalog.terrain_count()
    );

    app.insert_resource(config)
        .add_plugins(AutotilePlugin::new(catalog));

    // Startup pass
    app.update();
    report(&app);

    // Paint a single cell in the map center and let the incremental pass catch up
    let center = {
        let mut map = app.world_mut().resource_mut::<TerrainMap>();
        let center = map.grid().size() / 2;
        let background = map.terrain_at(UVec2::ZERO).unwrap_or_default();
        map.set_terrain(center, background);
        center
    };
    app.update();
    info!("Painted cell ({}, {})", center.x, center.y);
    report(&app);
}

fn report(app: &App) {
    let map = app.world().resource::<TerrainMap>();
    let resolved = app.world().resource::<ResolvedMap>();
    let center = map.grid().size() / 2;

    info!("Map stats: {}", map.stats());
    match resolved.get(center) {
        Some(cell) => info!(
            "Center cell: terrain {}, tile {}, {} collision shapes",
            cell.terrain,
            cell.tile_id,
            cell.collision.len()
        ),
        None => info!("Center cell is empty"),
    }
    if resolved.is_stale(map.grid()) {
        warn!("Resolved map is behind the terrain map");
    }
}
