use super::types::TileId;
use std::io;

/// Error type for catalog loading and lookups
#[derive(Debug)]
pub enum CatalogError {
    Io(io::Error),
    /// The descriptor isn't well-formed XML
    Xml(String),
    /// Schema violation, unknown tag, invalid geometry, duplicate id, missing fill tile
    Malformed {
        tile: Option<TileId>,
        reason: String,
    },
    /// A lookup named a tile the catalog never declared
    UnknownTileId(TileId),
}

impl CatalogError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        CatalogError::Malformed {
            tile: None,
            reason: reason.into(),
        }
    }

    pub fn malformed_tile(tile: TileId, reason: impl Into<String>) -> Self {
        CatalogError::Malformed {
            tile: Some(tile),
            reason: reason.into(),
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, CatalogError::Malformed { .. })
    }
}

impl From<io::Error> for CatalogError {
    fn from(err: io::Error) -> Self {
        CatalogError::Io(err)
    }
}

impl From<quick_xml::Error> for CatalogError {
    fn from(err: quick_xml::Error) -> Self {
        CatalogError::Xml(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for CatalogError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        CatalogError::Xml(err.to_string())
    }
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::Io(e) => write!(f, "IO error: {}", e),
            CatalogError::Xml(e) => write!(f, "Invalid tileset XML: {}", e),
            CatalogError::Malformed { tile: Some(id), reason } => {
                write!(f, "Malformed catalog (tile {}): {}", id, reason)
            }
            CatalogError::Malformed { tile: None, reason } => {
                write!(f, "Malformed catalog: {}", reason)
            }
            CatalogError::UnknownTileId(id) => write!(f, "Unknown tile id: {}", id),
        }
    }
}

impl std::error::Error for CatalogError {}
