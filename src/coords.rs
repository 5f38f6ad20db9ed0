use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct CubeCoord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl CubeCoord {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        debug_assert!(x + y + z == 0, "cube coordinates must sum to zero");
        Self { x, y, z }
    }

    pub fn from_axial(q: i32, r: i32) -> Self {
        CubeCoord::new(q, -q - r, r)
    }

    pub fn axial(self) -> (i32, i32) {
        (self.x, self.z)
    }
}

/// All cells within `radius` of the origin, in a fixed deterministic order.
pub fn disk(radius: i32) -> Vec<CubeCoord> {
    let mut cells = Vec::new();
    for x in -radius..=radius {
        let lo = (-radius).max(-x - radius);
        let hi = radius.min(-x + radius);
        for y in lo..=hi {
            cells.push(CubeCoord::new(x, y, -x - y));
        }
    }
    cells
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, EnumString, Display,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CornerDir {
    North,
    South,
}

/// A hex corner in the two-corner canonical scheme: every corner of the
/// grid is the North or South corner of exactly one cell, so `(q, r, dir)`
/// is already a canonical identity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct CornerCoord {
    pub q: i32,
    pub r: i32,
    pub dir: CornerDir,
}

impl CornerCoord {
    pub fn new(q: i32, r: i32, dir: CornerDir) -> Self {
        Self { q, r, dir }
    }

    pub fn north(cell: CubeCoord) -> Self {
        let (q, r) = cell.axial();
        Self::new(q, r, CornerDir::North)
    }

    pub fn south(cell: CubeCoord) -> Self {
        let (q, r) = cell.axial();
        Self::new(q, r, CornerDir::South)
    }

    /// The up-to-three cells meeting at this corner.
    pub fn touching_cells(self) -> [CubeCoord; 3] {
        let (q, r) = (self.q, self.r);
        match self.dir {
            CornerDir::North => [
                CubeCoord::from_axial(q, r),
                CubeCoord::from_axial(q, r - 1),
                CubeCoord::from_axial(q + 1, r - 1),
            ],
            CornerDir::South => [
                CubeCoord::from_axial(q, r),
                CubeCoord::from_axial(q, r + 1),
                CubeCoord::from_axial(q - 1, r + 1),
            ],
        }
    }

    /// The three corners one hex edge away.
    pub fn adjacent_corners(self) -> [CornerCoord; 3] {
        let (q, r) = (self.q, self.r);
        match self.dir {
            CornerDir::North => [
                CornerCoord::new(q, r - 1, CornerDir::South),
                CornerCoord::new(q + 1, r - 1, CornerDir::South),
                CornerCoord::new(q + 1, r - 2, CornerDir::South),
            ],
            CornerDir::South => [
                CornerCoord::new(q, r + 1, CornerDir::North),
                CornerCoord::new(q - 1, r + 1, CornerDir::North),
                CornerCoord::new(q - 1, r + 2, CornerDir::North),
            ],
        }
    }

    pub fn touches(self, cell: CubeCoord) -> bool {
        self.touching_cells().contains(&cell)
    }
}

/// The six corners of a cell.
pub fn cell_corners(cell: CubeCoord) -> [CornerCoord; 6] {
    let (q, r) = cell.axial();
    [
        CornerCoord::new(q, r, CornerDir::North),
        CornerCoord::new(q, r, CornerDir::South),
        CornerCoord::new(q, r + 1, CornerDir::North),
        CornerCoord::new(q - 1, r + 1, CornerDir::North),
        CornerCoord::new(q, r - 1, CornerDir::South),
        CornerCoord::new(q + 1, r - 1, CornerDir::South),
    ]
}
