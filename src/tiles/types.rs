use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Type alias for tile IDs (ids local to one tileset, as Tiled assigns them)
pub type TileId = u16;

/// Type alias for terrain class tokens (0 is `TERRAIN_NONE`)
pub type TerrainId = u16;

/// Collision geometry attached to a tile.
///
/// Coordinates are tile-local in the catalog and world-space once the
/// geometry builder has placed them on a cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CollisionShape {
    /// Anchor or trigger point without extent
    Point { x: f32, y: f32 },
    /// Solid axis-aligned box
    Rectangle {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
    /// One-dimensional vertical wall side with no depth
    OpenEdge { x: f32, y: f32, height: f32 },
}

impl CollisionShape {
    pub const fn point(x: f32, y: f32) -> Self {
        CollisionShape::Point { x, y }
    }

    pub const fn rectangle(x: f32, y: f32, width: f32, height: f32) -> Self {
        CollisionShape::Rectangle {
            x,
            y,
            width,
            height,
        }
    }

    pub const fn open_edge(x: f32, y: f32, height: f32) -> Self {
        CollisionShape::OpenEdge { x, y, height }
    }

    /// Move the shape by `offset` without touching its extents
    pub fn translated(&self, offset: Vec2) -> Self {
        match *self {
            CollisionShape::Point { x, y } => CollisionShape::Point {
                x: x + offset.x,
                y: y + offset.y,
            },
            CollisionShape::Rectangle { x, y, width, height } => CollisionShape::Rectangle {
                x: x + offset.x,
                y: y + offset.y,
                width,
                height,
            },
            CollisionShape::OpenEdge { x, y, height } => CollisionShape::OpenEdge {
                x: x + offset.x,
                y: y + offset.y,
                height,
            },
        }
    }

    /// Check the positivity invariant and that the shape fits inside a tile
    pub fn validate(&self, tile_width: f32, tile_height: f32) -> Result<(), String> {
        let (x, y, width, height) = match *self {
            CollisionShape::Point { x, y } => (x, y, 0.0, 0.0),
            CollisionShape::Rectangle { x, y, width, height } => {
                if width.is_nan() || height.is_nan() || width <= 0.0 || height <= 0.0 {
                    return Err(format!(
                        "rectangle must have positive extents, got {}x{}",
                        width, height
                    ));
                }
                (x, y, width, height)
            }
            CollisionShape::OpenEdge { x, y, height } => {
                if height.is_nan() || height <= 0.0 {
                    return Err(format!("open edge must have positive height, got {}", height));
                }
                (x, y, 0.0, height)
            }
        };

        if !x.is_finite() || !y.is_finite() || x < 0.0 || y < 0.0 {
            return Err(format!("shape origin ({}, {}) lies outside the tile", x, y));
        }
        if x + width > tile_width || y + height > tile_height {
            return Err(format!(
                "shape ({}, {}, {}x{}) exceeds tile bounds {}x{}",
                x, y, width, height, tile_width, tile_height
            ));
        }
        Ok(())
    }
}

/// Semantic role a tile plays when autotiling a terrain class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OrientationRole {
    Top,
    Bottom,
    Left,
    Right,
    CornerTopLeft,
    CornerTopRight,
    CornerBottomLeft,
    CornerBottomRight,
    Fill,
    Isolated,
}

impl OrientationRole {
    pub const ALL: [OrientationRole; 10] = [
        OrientationRole::Top,
        OrientationRole::Bottom,
        OrientationRole::Left,
        OrientationRole::Right,
        OrientationRole::CornerTopLeft,
        OrientationRole::CornerTopRight,
        OrientationRole::CornerBottomLeft,
        OrientationRole::CornerBottomRight,
        OrientationRole::Fill,
        OrientationRole::Isolated,
    ];

    /// Parse a descriptor tag. Exact match only, so `Top` or `top ` are rejected.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "top" => Some(OrientationRole::Top),
            "bottom" => Some(OrientationRole::Bottom),
            "left" => Some(OrientationRole::Left),
            "right" => Some(OrientationRole::Right),
            "corner-top-left" => Some(OrientationRole::CornerTopLeft),
            "corner-top-right" => Some(OrientationRole::CornerTopRight),
            "corner-bottom-left" => Some(OrientationRole::CornerBottomLeft),
            "corner-bottom-right" => Some(OrientationRole::CornerBottomRight),
            "fill" => Some(OrientationRole::Fill),
            "isolated" => Some(OrientationRole::Isolated),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            OrientationRole::Top => "top",
            OrientationRole::Bottom => "bottom",
            OrientationRole::Left => "left",
            OrientationRole::Right => "right",
            OrientationRole::CornerTopLeft => "corner-top-left",
            OrientationRole::CornerTopRight => "corner-top-right",
            OrientationRole::CornerBottomLeft => "corner-bottom-left",
            OrientationRole::CornerBottomRight => "corner-bottom-right",
            OrientationRole::Fill => "fill",
            OrientationRole::Isolated => "isolated",
        }
    }

    /// Fill and Isolated tiles stand for a whole terrain class, so they must name one
    pub fn requires_terrain(&self) -> bool {
        matches!(self, OrientationRole::Fill | OrientationRole::Isolated)
    }
}

impl fmt::Display for OrientationRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// One tile of the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileDefinition {
    pub id: TileId,
    /// Opaque image reference, resolved by the asset pipeline
    pub image: String,
    pub width: u32,
    pub height: u32,
    /// Terrain class name; `None` marks a role tile shared by every terrain
    pub terrain: Option<String>,
    pub role: Option<OrientationRole>,
    pub collision: Vec<CollisionShape>,
}

impl TileDefinition {
    pub fn new(id: TileId, image: impl Into<String>) -> Self {
        Self {
            id,
            image: image.into(),
            width: super::TILE_SIZE,
            height: super::TILE_SIZE,
            terrain: None,
            role: None,
            collision: Vec::new(),
        }
    }

    pub fn with_terrain(mut self, terrain: impl Into<String>) -> Self {
        self.terrain = Some(terrain.into());
        self
    }

    pub fn with_role(mut self, role: OrientationRole) -> Self {
        self.role = Some(role);
        self
    }

    pub fn with_shape(mut self, shape: CollisionShape) -> Self {
        self.collision.push(shape);
        self
    }

    /// Role-less tiles are the plain fill variant of their terrain
    pub fn effective_role(&self) -> OrientationRole {
        self.role.unwrap_or(OrientationRole::Fill)
    }

    pub fn has_collision(&self) -> bool {
        !self.collision.is_empty()
    }
}
