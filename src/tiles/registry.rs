use super::{constants::*, error::CatalogError, types::*};
use bevy::log::{debug, info};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Immutable tile catalog: tile definitions, terrain classes and the role index
/// the resolver reads from.
///
/// Built once at startup and shared read-only afterwards.
#[derive(Debug, Clone)]
pub struct Catalog {
    tile_width: u32,
    tile_height: u32,
    tiles: BTreeMap<TileId, TileDefinition>,
    /// Terrain names indexed by `TerrainId - FIRST_TERRAIN_ID`
    terrain_names: Vec<String>,
    terrain_ids: HashMap<String, TerrainId>,
    /// Role tiles bound to one terrain class, ascending ids
    terrain_roles: HashMap<(TerrainId, OrientationRole), Vec<TileId>>,
    /// Role tiles without a terrain, usable by every class
    shared_roles: HashMap<OrientationRole, Vec<TileId>>,
}

impl Catalog {
    /// Build and validate a catalog from tile definitions
    pub fn from_definitions(
        tile_width: u32,
        tile_height: u32,
        definitions: Vec<TileDefinition>,
    ) -> Result<Self, CatalogError> {
        if tile_width == 0 || tile_height == 0 {
            return Err(CatalogError::malformed(format!(
                "tile size must be positive, got {}x{}",
                tile_width, tile_height
            )));
        }

        let mut tiles = BTreeMap::new();
        for def in definitions {
            validate_definition(&def, tile_width, tile_height)?;
            let id = def.id;
            if tiles.insert(id, def).is_some() {
                return Err(CatalogError::malformed_tile(id, "duplicate tile id"));
            }
        }

        // Terrain ids follow name order so the same descriptor always yields the same ids
        let names: BTreeSet<&str> = tiles
            .values()
            .filter_map(|def| def.terrain.as_deref())
            .collect();
        if names.len() > (TerrainId::MAX - FIRST_TERRAIN_ID) as usize + 1 {
            return Err(CatalogError::malformed("too many terrain classes"));
        }
        let terrain_names: Vec<String> = names.into_iter().map(str::to_owned).collect();
        let terrain_ids: HashMap<String, TerrainId> = terrain_names
            .iter()
            .enumerate()
            .map(|(index, name)| (name.clone(), FIRST_TERRAIN_ID + index as TerrainId))
            .collect();

        let mut terrain_roles: HashMap<(TerrainId, OrientationRole), Vec<TileId>> = HashMap::new();
        let mut shared_roles: HashMap<OrientationRole, Vec<TileId>> = HashMap::new();
        // BTreeMap iteration keeps every id list ascending
        for def in tiles.values() {
            let role = def.effective_role();
            match def.terrain.as_deref() {
                Some(name) => {
                    let terrain = terrain_ids[name];
                    terrain_roles.entry((terrain, role)).or_default().push(def.id);
                }
                None => shared_roles.entry(role).or_default().push(def.id),
            }
            debug!(
                "Registered tile {} ({}) terrain={:?} role={} collision={}",
                def.id,
                def.image,
                def.terrain,
                role,
                def.has_collision()
            );
        }

        for name in &terrain_names {
            let terrain = terrain_ids[name.as_str()];
            if !terrain_roles.contains_key(&(terrain, OrientationRole::Fill)) {
                // Report the first tile that introduced the terrain
                let tile = tiles
                    .values()
                    .find(|def| def.terrain.as_deref() == Some(name.as_str()))
                    .map(|def| def.id);
                return Err(CatalogError::Malformed {
                    tile,
                    reason: format!("terrain '{}' has no fill tile", name),
                });
            }
        }

        let catalog = Self {
            tile_width,
            tile_height,
            tiles,
            terrain_names,
            terrain_ids,
            terrain_roles,
            shared_roles,
        };
        info!(
            "Loaded tile catalog: {} tiles, {} terrain classes, {} shared role tiles",
            catalog.len(),
            catalog.terrain_count(),
            catalog.shared_roles.values().map(Vec::len).sum::<usize>()
        );
        Ok(catalog)
    }

    /// Get a tile definition by id
    pub fn lookup(&self, id: TileId) -> Result<&TileDefinition, CatalogError> {
        self.tiles.get(&id).ok_or(CatalogError::UnknownTileId(id))
    }

    /// Check if a tile id was declared
    pub fn contains(&self, id: TileId) -> bool {
        self.tiles.contains_key(&id)
    }

    /// Tiles fulfilling `role` for `terrain`, ascending.
    ///
    /// Tiles bound to the terrain win over shared tiles. Fill is never shared.
    pub fn find_by_role(&self, terrain: TerrainId, role: OrientationRole) -> &[TileId] {
        if let Some(ids) = self.terrain_roles.get(&(terrain, role)) {
            return ids;
        }
        if role == OrientationRole::Fill || !self.is_terrain(terrain) {
            return &[];
        }
        self.shared_roles.get(&role).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Default variant of a terrain class (lowest fill tile id)
    pub fn fill_tile(&self, terrain: TerrainId) -> Option<TileId> {
        self.find_by_role(terrain, OrientationRole::Fill).first().copied()
    }

    pub fn terrain_id(&self, name: &str) -> Option<TerrainId> {
        self.terrain_ids.get(name).copied()
    }

    pub fn terrain_name(&self, terrain: TerrainId) -> Option<&str> {
        let index = terrain.checked_sub(FIRST_TERRAIN_ID)? as usize;
        self.terrain_names.get(index).map(String::as_str)
    }

    pub fn is_terrain(&self, terrain: TerrainId) -> bool {
        self.terrain_name(terrain).is_some()
    }

    /// Terrain ids paired with their names, ascending
    pub fn terrains(&self) -> impl Iterator<Item = (TerrainId, &str)> + '_ {
        self.terrain_names
            .iter()
            .enumerate()
            .map(|(index, name)| (FIRST_TERRAIN_ID + index as TerrainId, name.as_str()))
    }

    pub fn terrain_count(&self) -> usize {
        self.terrain_names.len()
    }

    /// Tile definitions in ascending id order
    pub fn tiles(&self) -> impl Iterator<Item = &TileDefinition> + '_ {
        self.tiles.values()
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Uniform tile size (width, height) in pixels
    pub fn tile_size(&self) -> (u32, u32) {
        (self.tile_width, self.tile_height)
    }
}

fn validate_definition(
    def: &TileDefinition,
    tile_width: u32,
    tile_height: u32,
) -> Result<(), CatalogError> {
    if def.image.trim().is_empty() {
        return Err(CatalogError::malformed_tile(def.id, "empty image reference"));
    }
    if def.width != tile_width || def.height != tile_height {
        return Err(CatalogError::malformed_tile(
            def.id,
            format!(
                "tile is {}x{} but the catalog uses {}x{}",
                def.width, def.height, tile_width, tile_height
            ),
        ));
    }
    if let Some(terrain) = &def.terrain {
        if terrain.trim().is_empty() {
            return Err(CatalogError::malformed_tile(def.id, "empty terrain name"));
        }
    }
    if def.terrain.is_none() && def.effective_role().requires_terrain() {
        return Err(CatalogError::malformed_tile(
            def.id,
            format!("{} tile must name a terrain", def.effective_role()),
        ));
    }
    for shape in &def.collision {
        shape
            .validate(tile_width as f32, tile_height as f32)
            .map_err(|reason| CatalogError::malformed_tile(def.id, reason))?;
    }
    Ok(())
}
