use crate::tiles::{self, BakeError, Catalog, CatalogError};
use bevy::prelude::*;
use clap::Parser;
use std::ffi::OsString;
use std::io;
use std::path::PathBuf;

/// Configuration for catalog loading and resolution passes
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct AutotileConfig {
    /// Tiled tileset descriptor
    pub tileset_path: PathBuf,
    /// Where the baked catalog is cached; `None` always parses the descriptor
    pub baked_cache_path: Option<PathBuf>,
    /// Rows per task in parallel full passes
    pub parallel_rows: u32,
    /// Demo map size in cells
    pub demo_size: UVec2,
    pub demo_background: String,
    pub demo_island: String,
}

impl Default for AutotileConfig {
    fn default() -> Self {
        Self {
            tileset_path: PathBuf::from("assets/tilesets/tileset.tsx"),
            baked_cache_path: Some(PathBuf::from("saves/tileset.bin")),
            parallel_rows: 16,
            demo_size: UVec2::new(32, 24),
            demo_background: "water".to_string(),
            demo_island: "grass".to_string(),
        }
    }
}

/// Resolve a Tiled terrain tileset against a demo map and log the result
#[derive(Parser, Debug, Clone)]
#[command(name = "terrain-autotile", version, about)]
pub struct CliArgs {
    /// Tiled `.tsx` descriptor to load
    #[arg(long)]
    pub tileset: Option<PathBuf>,

    /// Always parse the descriptor, never read or write the baked cache
    #[arg(long, default_value_t = false)]
    pub no_cache: bool,

    /// Rows per task in parallel full passes
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub rows: Option<u32>,

    /// Demo map size as <width>x<height>
    #[arg(long, value_parser = parse_size)]
    pub size: Option<UVec2>,
}

impl From<CliArgs> for AutotileConfig {
    fn from(args: CliArgs) -> Self {
        let defaults = Self::default();
        Self {
            tileset_path: args.tileset.unwrap_or(defaults.tileset_path),
            baked_cache_path: if args.no_cache {
                None
            } else {
                defaults.baked_cache_path
            },
            parallel_rows: args.rows.unwrap_or(defaults.parallel_rows),
            demo_size: args.size.unwrap_or(defaults.demo_size),
            ..defaults
        }
    }
}

impl AutotileConfig {
    /// Parse a full command line, binary name first
    pub fn from_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        CliArgs::try_parse_from(args).map(Self::from)
    }

    /// Load the tile catalog, preferring the baked cache when it was baked
    /// from the current descriptor contents. A broken or foreign cache is
    /// rebuilt from the descriptor; only descriptor errors are returned.
    pub fn load_catalog(&self) -> Result<Catalog, CatalogError> {
        let xml = tiles::read_descriptor(&self.tileset_path)?;
        let source = tiles::source_checksum(xml.as_bytes());

        if let Some(cache) = &self.baked_cache_path {
            match tiles::load_baked_catalog(cache, source) {
                Ok(catalog) => {
                    info!("Loaded baked catalog from {}", cache.display());
                    return Ok(catalog);
                }
                Err(BakeError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                    debug!("No baked catalog at {}", cache.display());
                }
                Err(e @ BakeError::SourceMismatch { .. }) => {
                    info!("Baked catalog {} is out of date: {}", cache.display(), e);
                }
                Err(e) => {
                    warn!(
                        "Failed to load baked catalog {}: {}, parsing descriptor",
                        cache.display(),
                        e
                    );
                }
            }
        }

        let catalog = Catalog::from_tsx_str(&xml)?;

        if let Some(cache) = &self.baked_cache_path {
            match tiles::save_catalog(&catalog, source, cache) {
                Ok(_) => debug!("Baked catalog to {}", cache.display()),
                Err(e) => warn!("Failed to bake catalog to {}: {}", cache.display(), e),
            }
        }

        Ok(catalog)
    }
}

fn parse_size(text: &str) -> Result<UVec2, String> {
    let invalid = || format!("expected <width>x<height>, got '{}'", text);
    let (width, height) = text.split_once('x').ok_or_else(invalid)?;
    let width = width.parse::<u32>().map_err(|_| invalid())?;
    let height = height.parse::<u32>().map_err(|_| invalid())?;
    Ok(UVec2::new(width, height))
}
