pub mod bake;
pub mod constants;
pub mod descriptor;
pub mod error;
pub mod registry;
pub mod types;

// Re-export commonly used items
pub use bake::{load_baked_catalog, save_catalog, source_checksum, BakeError};
pub use constants::*;
pub use descriptor::{load_catalog, parse_tileset, read_descriptor, TilesetDescriptor};
pub use error::CatalogError;
pub use registry::Catalog;
pub use types::{CollisionShape, OrientationRole, TerrainId, TileDefinition, TileId};
