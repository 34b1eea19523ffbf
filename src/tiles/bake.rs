use super::{constants::*, error::CatalogError, registry::Catalog, types::TileDefinition};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::Path;

/// Error type for baked catalog operations
#[derive(Debug)]
pub enum BakeError {
    Io(io::Error),
    InvalidMagicNumber,
    InvalidVersion(u16),
    InvalidChecksum,
    /// The snapshot was baked from a different descriptor
    SourceMismatch { expected: u32, found: u32 },
    Encoding(String),
    /// The snapshot decoded but no longer passes catalog validation
    Catalog(CatalogError),
}

impl From<io::Error> for BakeError {
    fn from(err: io::Error) -> Self {
        BakeError::Io(err)
    }
}

impl From<bincode::Error> for BakeError {
    fn from(err: bincode::Error) -> Self {
        BakeError::Encoding(err.to_string())
    }
}

impl From<CatalogError> for BakeError {
    fn from(err: CatalogError) -> Self {
        BakeError::Catalog(err)
    }
}

impl std::fmt::Display for BakeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BakeError::Io(e) => write!(f, "IO error: {}", e),
            BakeError::InvalidMagicNumber => write!(f, "Invalid magic number"),
            BakeError::InvalidVersion(v) => write!(f, "Invalid version: {}", v),
            BakeError::InvalidChecksum => write!(f, "Checksum mismatch"),
            BakeError::SourceMismatch { expected, found } => write!(
                f,
                "Baked from another descriptor (source {:08x}, expected {:08x})",
                found, expected
            ),
            BakeError::Encoding(e) => write!(f, "Encoding error: {}", e),
            BakeError::Catalog(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for BakeError {}

/// Serialized body of a baked catalog
#[derive(Serialize, Deserialize)]
struct BakedCatalog {
    tile_width: u32,
    tile_height: u32,
    tiles: Vec<TileDefinition>,
}

/// Identity of the descriptor a catalog is baked from
pub fn source_checksum(descriptor: &[u8]) -> u32 {
    crc32fast::hash(descriptor)
}

/// Encode a validated catalog baked from the descriptor with checksum `source`.
///
/// Layout: magic, version (u16 LE), source checksum (u32 LE), payload length
/// (u32 LE), bincode payload, CRC32 of the payload (u32 LE).
pub fn bake_to_bytes(catalog: &Catalog, source: u32) -> Result<Vec<u8>, BakeError> {
    let (tile_width, tile_height) = catalog.tile_size();
    let body = BakedCatalog {
        tile_width,
        tile_height,
        tiles: catalog.tiles().cloned().collect(),
    };
    let payload = bincode::serialize(&body)?;
    let payload_len = u32::try_from(payload.len())
        .map_err(|_| BakeError::Encoding(format!("payload too large: {} bytes", payload.len())))?;

    let mut bytes = Vec::with_capacity(payload.len() + 18);
    bytes.extend_from_slice(&BAKE_MAGIC_NUMBER);
    bytes.extend_from_slice(&BAKE_VERSION.to_le_bytes());
    bytes.extend_from_slice(&source.to_le_bytes());
    bytes.extend_from_slice(&payload_len.to_le_bytes());
    bytes.extend_from_slice(&payload);
    bytes.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    Ok(bytes)
}

/// Decode a baked catalog and run it through full catalog validation again.
///
/// Fails with [`BakeError::SourceMismatch`] unless the snapshot was baked
/// from the descriptor with checksum `source`.
pub fn catalog_from_bytes(mut bytes: &[u8], source: u32) -> Result<Catalog, BakeError> {
    // Read and verify magic number
    let mut magic = [0u8; 4];
    bytes.read_exact(&mut magic)?;
    if magic != BAKE_MAGIC_NUMBER {
        return Err(BakeError::InvalidMagicNumber);
    }

    // Read and verify version
    let mut version_bytes = [0u8; 2];
    bytes.read_exact(&mut version_bytes)?;
    let version = u16::from_le_bytes(version_bytes);
    if version != BAKE_VERSION {
        return Err(BakeError::InvalidVersion(version));
    }

    let mut source_bytes = [0u8; 4];
    bytes.read_exact(&mut source_bytes)?;
    let found = u32::from_le_bytes(source_bytes);
    if found != source {
        return Err(BakeError::SourceMismatch {
            expected: source,
            found,
        });
    }

    let mut len_bytes = [0u8; 4];
    bytes.read_exact(&mut len_bytes)?;
    let payload_len = u32::from_le_bytes(len_bytes) as usize;
    if bytes.len() < payload_len {
        return Err(BakeError::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "truncated catalog payload",
        )));
    }
    let (payload, mut rest) = bytes.split_at(payload_len);

    // Read and verify checksum
    let mut checksum_bytes = [0u8; 4];
    rest.read_exact(&mut checksum_bytes)?;
    let expected_checksum = u32::from_le_bytes(checksum_bytes);
    if crc32fast::hash(payload) != expected_checksum {
        return Err(BakeError::InvalidChecksum);
    }

    let body: BakedCatalog = bincode::deserialize(payload)?;
    Ok(Catalog::from_definitions(body.tile_width, body.tile_height, body.tiles)?)
}

/// Save a baked catalog to disk
pub fn save_catalog<P: AsRef<Path>>(
    catalog: &Catalog,
    source: u32,
    path: P,
) -> Result<(), BakeError> {
    // Ensure directory exists
    if let Some(parent) = path.as_ref().parent() {
        fs::create_dir_all(parent)?;
    }

    let bytes = bake_to_bytes(catalog, source)?;
    let mut file = File::create(path)?;
    file.write_all(&bytes)?;
    file.sync_all()?;
    Ok(())
}

/// Load a baked catalog from disk
pub fn load_baked_catalog<P: AsRef<Path>>(path: P, source: u32) -> Result<Catalog, BakeError> {
    let bytes = fs::read(path)?;
    catalog_from_bytes(&bytes, source)
}
