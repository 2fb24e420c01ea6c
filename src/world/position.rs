use serde::{Deserialize, Serialize};
use std::fmt;

/// Map coordinate: x, y, height and map plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point4D {
    pub x: u16,
    pub y: u16,
    pub z: i8,
    pub m: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North,
    Northeast,
    East,
    Southeast,
    South,
    Southwest,
    West,
    Northwest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionDelta {
    pub dx: i16,
    pub dy: i16,
}

impl Point4D {
    /// Sentinel for "nowhere"; only `x` is checked.
    pub const LIMBO: Point4D = Point4D {
        x: 0xffff,
        y: 0xffff,
        z: 0,
        m: 0,
    };

    pub const ORIGIN: Point4D = Point4D { x: 0, y: 0, z: 0, m: 0 };

    pub const fn new(x: u16, y: u16, z: i8, m: u8) -> Self {
        Self { x, y, z, m }
    }

    pub fn is_limbo(self) -> bool {
        self.x == 0xffff
    }

    pub fn offset(self, delta: PositionDelta) -> Option<Self> {
        let x = i32::from(self.x) + i32::from(delta.dx);
        let y = i32::from(self.y) + i32::from(delta.dy);

        // 0xffff is the limbo marker, so it is never a reachable x
        if x < 0 || y < 0 || x >= 0xffff || y > i32::from(u16::MAX) {
            return None;
        }

        Some(Self {
            x: x as u16,
            y: y as u16,
            ..self
        })
    }

    pub fn step(self, direction: Direction) -> Option<Self> {
        self.offset(direction.delta())
    }

    pub fn with_z(self, z: i8) -> Self {
        Self { z, ..self }
    }

    /// Chebyshev distance on the x/y plane; height and map are ignored.
    pub fn distance(self, other: Point4D) -> u16 {
        let dx = self.x.abs_diff(other.x);
        let dy = self.y.abs_diff(other.y);
        dx.max(dy)
    }

    pub fn same_tile(self, other: Point4D) -> bool {
        self.x == other.x && self.y == other.y && self.m == other.m
    }
}

impl fmt::Display for Point4D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{},{})", self.x, self.y, self.z, self.m)
    }
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::Northeast,
        Direction::East,
        Direction::Southeast,
        Direction::South,
        Direction::Southwest,
        Direction::West,
        Direction::Northwest,
    ];

    pub fn delta(self) -> PositionDelta {
        match self {
            Direction::North => PositionDelta { dx: 0, dy: -1 },
            Direction::Northeast => PositionDelta { dx: 1, dy: -1 },
            Direction::East => PositionDelta { dx: 1, dy: 0 },
            Direction::Southeast => PositionDelta { dx: 1, dy: 1 },
            Direction::South => PositionDelta { dx: 0, dy: 1 },
            Direction::Southwest => PositionDelta { dx: -1, dy: 1 },
            Direction::West => PositionDelta { dx: -1, dy: 0 },
            Direction::Northwest => PositionDelta { dx: -1, dy: -1 },
        }
    }

    /// Wire code, clockwise from north.
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(usize::from(code)).copied()
    }

    pub fn is_diagonal(self) -> bool {
        self.code() % 2 == 1
    }
}
