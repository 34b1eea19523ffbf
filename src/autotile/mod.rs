//! Neighbor sampling, role selection and collision placement for single cells.
//!
//! Everything here is a pure function over a read-only [`Catalog`](crate::tiles::Catalog)
//! and terrain snapshot, so cells can be resolved in any order or in parallel.

pub mod geometry;
pub mod mask;
pub mod resolver;

pub use geometry::{build, cell_origin};
pub use mask::{sample, AdjacencyMask, Direction, TerrainSource};
pub use resolver::{resolve, select_role};
