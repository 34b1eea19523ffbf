use crate::tiles::{TerrainId, TERRAIN_NONE};
use bevy::prelude::*;
use std::fmt;

/// Compass direction of a neighboring cell, clockwise from north.
///
/// The grid grows downward (row 0 is the top row, as in Tiled), so north is `y - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Direction {
    North = 0,
    NorthEast = 1,
    East = 2,
    SouthEast = 3,
    South = 4,
    SouthWest = 5,
    West = 6,
    NorthWest = 7,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
    ];

    /// Grid offset to the neighbor in this direction
    pub const fn offset(self) -> IVec2 {
        match self {
            Direction::North => IVec2::new(0, -1),
            Direction::NorthEast => IVec2::new(1, -1),
            Direction::East => IVec2::new(1, 0),
            Direction::SouthEast => IVec2::new(1, 1),
            Direction::South => IVec2::new(0, 1),
            Direction::SouthWest => IVec2::new(-1, 1),
            Direction::West => IVec2::new(-1, 0),
            Direction::NorthWest => IVec2::new(-1, -1),
        }
    }

    /// Mask bit owned by this direction
    pub const fn bit(self) -> u8 {
        1 << self as u8
    }

    pub const fn is_cardinal(self) -> bool {
        (self as u8) % 2 == 0
    }
}

/// Which of the 8 neighbors share the cell's terrain class.
///
/// One bit per direction (N=0x01, NE=0x02, E=0x04 ... NW=0x80).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AdjacencyMask(pub u8);

impl AdjacencyMask {
    /// No neighbor shares the terrain
    pub const NONE: Self = Self(0);
    /// Fully surrounded
    pub const ALL: Self = Self(0xFF);

    pub fn from_directions(directions: &[Direction]) -> Self {
        directions.iter().fold(Self::NONE, |mask, &dir| mask.with(dir))
    }

    pub const fn has(self, dir: Direction) -> bool {
        self.0 & dir.bit() != 0
    }

    pub const fn with(self, dir: Direction) -> Self {
        Self(self.0 | dir.bit())
    }

    pub const fn without(self, dir: Direction) -> Self {
        Self(self.0 & !dir.bit())
    }

    pub const fn is_full(self) -> bool {
        self.0 == Self::ALL.0
    }

    /// At least one of N/E/S/W shares the terrain
    pub fn has_any_cardinal(self) -> bool {
        Direction::ALL
            .iter()
            .any(|&dir| dir.is_cardinal() && self.has(dir))
    }
}

impl fmt::Debug for AdjacencyMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];
        let present: Vec<&str> = Direction::ALL
            .iter()
            .filter(|&&dir| self.has(dir))
            .map(|&dir| NAMES[dir as usize])
            .collect();
        write!(f, "AdjacencyMask({:#04x} [{}])", self.0, present.join(","))
    }
}

/// Upstream terrain grid, random access by cell coordinate
pub trait TerrainSource {
    /// Grid size in cells
    fn size(&self) -> UVec2;

    /// Terrain at (x, y); `TERRAIN_NONE` for coordinates off the grid, never a failure
    fn terrain_at(&self, x: i32, y: i32) -> TerrainId;
}

/// Compute the adjacency mask of the cell at (x, y).
///
/// Off-grid neighbors count as a different terrain, so map borders behave as
/// terrain boundaries. A cell without terrain has no neighbors of its class.
pub fn sample<S: TerrainSource + ?Sized>(source: &S, x: i32, y: i32) -> AdjacencyMask {
    let size = source.size();
    if !on_grid(size, x, y) {
        return AdjacencyMask::NONE;
    }
    let center = source.terrain_at(x, y);
    if center == TERRAIN_NONE {
        return AdjacencyMask::NONE;
    }

    let mut mask = AdjacencyMask::NONE;
    for dir in Direction::ALL {
        let offset = dir.offset();
        let (Some(nx), Some(ny)) = (x.checked_add(offset.x), y.checked_add(offset.y)) else {
            continue;
        };
        if on_grid(size, nx, ny) && source.terrain_at(nx, ny) == center {
            mask = mask.with(dir);
        }
    }
    mask
}

fn on_grid(size: UVec2, x: i32, y: i32) -> bool {
    match (u32::try_from(x), u32::try_from(y)) {
        (Ok(x), Ok(y)) => x < size.x && y < size.y,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Direction::*;

    /// 3x3 grid given as rows, top row first
    struct Rows(Vec<Vec<TerrainId>>);

    impl TerrainSource for Rows {
        fn size(&self) -> UVec2 {
            UVec2::new(self.0[0].len() as u32, self.0.len() as u32)
        }

        fn terrain_at(&self, x: i32, y: i32) -> TerrainId {
            if x < 0 || y < 0 {
                return TERRAIN_NONE;
            }
            self.0
                .get(y as usize)
                .and_then(|row| row.get(x as usize))
                .copied()
                .unwrap_or(TERRAIN_NONE)
        }
    }

    #[test]
    fn test_direction_bits_are_distinct() {
        let all = Direction::ALL.iter().fold(0u8, |acc, dir| {
            assert_eq!(acc & dir.bit(), 0);
            acc | dir.bit()
        });
        assert_eq!(all, 0xFF);
        assert!(North.is_cardinal() && !NorthEast.is_cardinal());
    }

    #[test]
    fn test_sample_surrounded() {
        let grid = Rows(vec![vec![1, 1, 1], vec![1, 1, 1], vec![1, 1, 1]]);
        assert_eq!(sample(&grid, 1, 1), AdjacencyMask::ALL);
    }

    #[test]
    fn test_sample_directions() {
        // Only the north-east neighbor and the east neighbor match
        let grid = Rows(vec![vec![2, 2, 1], vec![2, 1, 1], vec![2, 2, 2]]);
        assert_eq!(
            sample(&grid, 1, 1),
            AdjacencyMask::from_directions(&[NorthEast, East])
        );
    }

    #[test]
    fn test_off_grid_neighbors_unset() {
        let grid = Rows(vec![vec![1, 1, 1], vec![1, 1, 1], vec![1, 1, 1]]);

        // Top-left corner only sees E, SE and S
        assert_eq!(
            sample(&grid, 0, 0),
            AdjacencyMask::from_directions(&[East, SouthEast, South])
        );

        // Far outside never panics and the cell itself has no terrain
        assert_eq!(sample(&grid, -5, 40), AdjacencyMask::NONE);
        assert_eq!(sample(&grid, i32::MAX, i32::MIN), AdjacencyMask::NONE);
    }

    #[test]
    fn test_sentinel_neighbors_unset() {
        let grid = Rows(vec![
            vec![TERRAIN_NONE, 1, TERRAIN_NONE],
            vec![1, 1, TERRAIN_NONE],
            vec![1, TERRAIN_NONE, 1],
        ]);
        let mask = sample(&grid, 1, 1);

        assert!(mask.has(North) && mask.has(West) && mask.has(SouthWest) && mask.has(SouthEast));
        for dir in [NorthWest, NorthEast, East, South] {
            assert!(!mask.has(dir));
        }
    }

    #[test]
    fn test_mask_helpers() {
        let mask = AdjacencyMask::ALL.without(North);
        assert!(!mask.has(North));
        assert!(!mask.is_full());
        assert!(mask.has_any_cardinal());
        assert!(!AdjacencyMask::from_directions(&[NorthEast, SouthWest]).has_any_cardinal());
        assert_eq!(mask.with(North), AdjacencyMask::ALL);
    }

    #[test]
    fn test_sample_bounded_by_source_size() {
        // Reports terrain everywhere, the declared size still limits the grid
        struct Unbounded;

        impl TerrainSource for Unbounded {
            fn size(&self) -> UVec2 {
                UVec2::new(2, 2)
            }

            fn terrain_at(&self, _x: i32, _y: i32) -> TerrainId {
                1
            }
        }

        assert_eq!(
            sample(&Unbounded, 0, 0),
            AdjacencyMask::from_directions(&[East, SouthEast, South])
        );
        assert_eq!(sample(&Unbounded, 5, 5), AdjacencyMask::NONE);
    }
}
