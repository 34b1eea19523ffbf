use super::types::TerrainId;

/// Pixel size of each tile in the shipped tileset (64x64)
pub const TILE_SIZE: u32 = 64;

// Terrain constants
/// No terrain / off-grid sentinel. Never assigned to a catalog terrain class.
pub const TERRAIN_NONE: TerrainId = 0;

/// First id handed out to catalog terrain classes
pub const FIRST_TERRAIN_ID: TerrainId = 1;

// Descriptor schema
/// Oldest Tiled tileset format version accepted (major, minor)
pub const MIN_TILESET_VERSION: (u32, u32) = (1, 0);

/// Newest Tiled tileset format version accepted (major, minor)
pub const MAX_TILESET_VERSION: (u32, u32) = (1, 11);

/// Only orthogonal grids are supported
pub const GRID_ORIENTATION_ORTHOGONAL: &str = "orthogonal";

/// Property naming a tile's orientation role
pub const PROPERTY_ORIENTATION: &str = "Orientation";

/// Property binding a tile to a terrain class
pub const PROPERTY_TERRAIN: &str = "terrain";

/// Image file stems of the form `Orientation=top` carry the role tag after this prefix
pub const ORIENTATION_STEM_PREFIX: &str = "Orientation=";

// Baked catalog format
/// Magic number for baked catalog files ("TSET" in ASCII)
pub const BAKE_MAGIC_NUMBER: [u8; 4] = [b'T', b'S', b'E', b'T'];

/// Current baked catalog format version
pub const BAKE_VERSION: u16 = 2;
