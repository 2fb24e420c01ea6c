use crate::world::position::Point4D;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A rectangular named area on one map plane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub name: String,
    pub x1: u16,
    pub y1: u16,
    pub x2: u16,
    pub y2: u16,
    #[serde(default)]
    pub plane: u8,
}

impl Zone {
    pub fn new(name: impl Into<String>, x1: u16, y1: u16, x2: u16, y2: u16, plane: u8) -> Self {
        let (x1, x2) = if x1 <= x2 { (x1, x2) } else { (x2, x1) };
        let (y1, y2) = if y1 <= y2 { (y1, y2) } else { (y2, y1) };
        Zone {
            name: name.into(),
            x1,
            y1,
            x2,
            y2,
            plane,
        }
    }

    pub fn contains(&self, point: Point4D) -> bool {
        point.m == self.plane
            && point.x >= self.x1
            && point.x <= self.x2
            && point.y >= self.y1
            && point.y <= self.y2
    }

    fn normalized(self) -> Self {
        Zone::new(self.name, self.x1, self.y1, self.x2, self.y2, self.plane)
    }
}

/// Region handle. `WORLD` covers every point no zone claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionId(pub u16);

impl RegionId {
    pub const WORLD: RegionId = RegionId(0);
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "region:{}", self.0)
    }
}

/// Zone list in priority order; the first zone containing a point wins.
#[derive(Debug, Clone, Default)]
pub struct RegionMap {
    zones: Vec<Zone>,
}

impl RegionMap {
    pub fn new(zones: Vec<Zone>) -> Self {
        Self {
            zones: zones.into_iter().map(Zone::normalized).collect(),
        }
    }

    pub fn region_for(&self, point: Point4D) -> RegionId {
        self.zones
            .iter()
            .position(|zone| zone.contains(point))
            .map(|index| RegionId(index as u16 + 1))
            .unwrap_or(RegionId::WORLD)
    }

    pub fn name(&self, region: RegionId) -> &str {
        if region == RegionId::WORLD {
            return "world";
        }
        self.zones
            .get(usize::from(region.0) - 1)
            .map(|zone| zone.name.as_str())
            .unwrap_or("world")
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}
