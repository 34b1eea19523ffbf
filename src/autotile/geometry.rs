use crate::tiles::{Catalog, CatalogError, CollisionShape, TileId};
use bevy::prelude::*;

/// World-space origin (top-left corner) of a grid cell
pub fn cell_origin(catalog: &Catalog, cell: UVec2) -> Vec2 {
    let (tile_width, tile_height) = catalog.tile_size();
    Vec2::new(
        cell.x as f32 * tile_width as f32,
        cell.y as f32 * tile_height as f32,
    )
}

/// Place a tile's collision shapes at `origin`.
///
/// Shapes are translated only. Tiles without collision give an empty Vec.
/// `UnknownTileId` means the resolver and catalog disagree.
pub fn build(
    catalog: &Catalog,
    tile_id: TileId,
    origin: Vec2,
) -> Result<Vec<CollisionShape>, CatalogError> {
    let tile = catalog.lookup(tile_id)?;
    Ok(tile
        .collision
        .iter()
        .map(|shape| shape.translated(origin))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiles::TileDefinition;

    fn catalog() -> Catalog {
        Catalog::from_definitions(
            64,
            64,
            vec![
                TileDefinition::new(1, "grass.png").with_terrain("grass"),
                TileDefinition::new(3, "border.png")
                    .with_terrain("border")
                    .with_shape(CollisionShape::open_edge(0.0, 0.0, 64.0))
                    .with_shape(CollisionShape::rectangle(0.0, 0.0, 64.0, 64.0))
                    .with_shape(CollisionShape::point(0.0, 0.0)),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_rectangle_translation() {
        let shapes = build(&catalog(), 3, Vec2::new(128.0, 64.0)).unwrap();

        assert_eq!(
            shapes[1],
            CollisionShape::rectangle(128.0, 64.0, 64.0, 64.0)
        );
    }

    #[test]
    fn test_edge_and_point_keep_their_variant() {
        let shapes = build(&catalog(), 3, Vec2::new(128.0, 64.0)).unwrap();

        assert_eq!(shapes.len(), 3);
        assert_eq!(shapes[0], CollisionShape::open_edge(128.0, 64.0, 64.0));
        assert_eq!(shapes[2], CollisionShape::point(128.0, 64.0));
    }

    #[test]
    fn test_walkable_tile_has_no_geometry() {
        let shapes = build(&catalog(), 1, Vec2::new(640.0, 0.0)).unwrap();
        assert!(shapes.is_empty());
    }

    #[test]
    fn test_unknown_tile() {
        assert!(matches!(
            build(&catalog(), 42, Vec2::ZERO),
            Err(CatalogError::UnknownTileId(42))
        ));
    }

    #[test]
    fn test_cell_origin() {
        assert_eq!(cell_origin(&catalog(), UVec2::new(2, 1)), Vec2::new(128.0, 64.0));
        assert_eq!(cell_origin(&catalog(), UVec2::ZERO), Vec2::ZERO);
    }
}
