use super::mask::{AdjacencyMask, Direction};
use crate::tiles::{Catalog, OrientationRole, TerrainId, TileId};
use bevy::log::trace;

use Direction::*;
use OrientationRole::*;

/// Inner corners: (role, first cardinal, second cardinal, diagonal that must be missing)
const CORNER_CONDITIONS: [(OrientationRole, Direction, Direction, Direction); 4] = [
    (CornerTopRight, North, East, NorthEast),
    (CornerTopLeft, North, West, NorthWest),
    (CornerBottomRight, South, East, SouthEast),
    (CornerBottomLeft, South, West, SouthWest),
];

/// Edges in tie-break order: Top, Right, Bottom, Left
const EDGE_CONDITIONS: [(OrientationRole, Direction); 4] = [
    (Top, North),
    (Right, East),
    (Bottom, South),
    (Left, West),
];

/// Pick the role a cell plays from its adjacency mask.
///
/// The catalog only has 4 edge and 4 corner variants plus fill, so the 256
/// masks collapse onto them with a fixed precedence:
/// 1. fully surrounded -> Fill
/// 2. exactly one inner corner (both cardinals present, diagonal missing) -> that corner
/// 3. one or more missing cardinals -> first of Top, Right, Bottom, Left
/// 4. anything else (several corners missing, no edge) -> Fill
pub fn select_role(mask: AdjacencyMask) -> OrientationRole {
    if mask.is_full() {
        return Fill;
    }

    let mut corners = CORNER_CONDITIONS
        .iter()
        .filter(|(_, first, second, diagonal)| {
            mask.has(*first) && mask.has(*second) && !mask.has(*diagonal)
        })
        .map(|(role, ..)| *role);
    if let (Some(corner), None) = (corners.next(), corners.next()) {
        return corner;
    }

    // Lossy on purpose: there is no two-sided tile, so the first missing edge wins
    EDGE_CONDITIONS
        .iter()
        .find(|(_, dir)| !mask.has(*dir))
        .map(|(role, _)| *role)
        .unwrap_or(Fill)
}

/// Resolve the tile for a cell of `terrain` with neighbors `mask`.
///
/// Returns `None` only when the catalog has no fill tile for `terrain`, which
/// means the terrain is unknown to the catalog. Roles the catalog lacks for the
/// terrain fall back to its fill tile.
pub fn resolve(catalog: &Catalog, terrain: TerrainId, mask: AdjacencyMask) -> Option<TileId> {
    let fill = catalog.fill_tile(terrain)?;

    if !mask.has_any_cardinal() {
        if let Some(&isolated) = catalog.find_by_role(terrain, Isolated).first() {
            trace!("terrain {} {:?} -> isolated tile {}", terrain, mask, isolated);
            return Some(isolated);
        }
    }

    let role = select_role(mask);
    let tile = catalog
        .find_by_role(terrain, role)
        .first()
        .copied()
        .unwrap_or(fill);
    trace!("terrain {} {:?} -> {} tile {}", terrain, mask, role, tile);
    Some(tile)
}
