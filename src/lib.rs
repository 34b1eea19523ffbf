//! Terrain autotiling: a Tiled tile catalog, per-cell role resolution from
//! 8-neighbor adjacency, and world-space collision placement, wired into Bevy
//! as [`world::AutotilePlugin`].

pub mod autotile;
pub mod config;
pub mod tiles;
pub mod world;

pub use config::AutotileConfig;
pub use world::{AutotilePlugin, ResolvedMap, TerrainMap, TileCatalog};
