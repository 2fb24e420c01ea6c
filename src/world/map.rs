use crate::config::MapConfig;
use crate::entities::character::MovementCaps;
use crate::world::position::Point4D;
use crate::world::region::{RegionId, RegionMap};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Terrain {
    #[default]
    Land,
    Water,
    Lava,
    Door,
    Wall,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TileInfo {
    pub terrain: Terrain,
    /// Surface height; `None` keeps the walker's height.
    pub z: Option<i8>,
}

/// Static map data the world consults. Implementations must be pure:
/// the same query always gives the same answer.
pub trait MapService {
    fn is_valid_point(&self, point: Point4D) -> bool;

    fn region_for(&self, point: Point4D) -> RegionId;

    fn region_name(&self, region: RegionId) -> &str;

    /// Height after stepping from `from` onto `to`'s tile, or `None` when
    /// the terrain does not allow it.
    fn check_movement(&self, from: Point4D, to: Point4D, caps: &MovementCaps) -> Option<i8>;
}

/// Bounded grid with sparse terrain overrides; unlisted tiles are flat land.
#[derive(Debug, Clone)]
pub struct GridMap {
    width: u16,
    height: u16,
    planes: u8,
    tiles: HashMap<(u16, u16, u8), TileInfo>,
    regions: RegionMap,
}

impl GridMap {
    pub fn new(width: u16, height: u16, planes: u8, regions: RegionMap) -> Self {
        Self {
            width,
            height,
            planes: planes.max(1),
            tiles: HashMap::new(),
            regions,
        }
    }

    pub fn from_config(config: &MapConfig) -> Self {
        let mut map = Self::new(
            config.width,
            config.height,
            config.planes,
            RegionMap::new(config.regions.clone()),
        );
        for tile in &config.tiles {
            map.set_tile(
                tile.x,
                tile.y,
                tile.plane,
                TileInfo {
                    terrain: tile.terrain,
                    z: tile.z,
                },
            );
        }
        map
    }

    pub fn set_tile(&mut self, x: u16, y: u16, plane: u8, info: TileInfo) {
        self.tiles.insert((x, y, plane), info);
    }

    pub fn tile(&self, point: Point4D) -> TileInfo {
        self.tiles
            .get(&(point.x, point.y, point.m))
            .copied()
            .unwrap_or_default()
    }

    pub fn regions(&self) -> &RegionMap {
        &self.regions
    }
}

impl MapService for GridMap {
    fn is_valid_point(&self, point: Point4D) -> bool {
        !point.is_limbo() && point.x < self.width && point.y < self.height && point.m < self.planes
    }

    fn region_for(&self, point: Point4D) -> RegionId {
        self.regions.region_for(point)
    }

    fn region_name(&self, region: RegionId) -> &str {
        self.regions.name(region)
    }

    fn check_movement(&self, from: Point4D, to: Point4D, caps: &MovementCaps) -> Option<i8> {
        if !self.is_valid_point(to) {
            return None;
        }
        let tile = self.tile(to);
        let passable = caps.can_fly
            || match tile.terrain {
                Terrain::Land => caps.can_cross_land,
                Terrain::Water => caps.can_swim,
                Terrain::Lava => caps.can_cross_lava,
                Terrain::Door => caps.ignore_doors,
                Terrain::Wall => false,
            };
        if !passable {
            return None;
        }
        let z = tile.z.unwrap_or(from.z);
        let climb = i16::from(z) - i16::from(from.z);
        if !caps.can_fly && climb > i16::from(caps.climb_power) {
            return None;
        }
        Some(z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_map() -> GridMap {
        let mut map = GridMap::new(64, 64, 1, RegionMap::default());
        map.set_tile(5, 5, 0, TileInfo { terrain: Terrain::Wall, z: None });
        map.set_tile(6, 5, 0, TileInfo { terrain: Terrain::Water, z: Some(-5) });
        map.set_tile(7, 5, 0, TileInfo { terrain: Terrain::Land, z: Some(20) });
        map
    }

    #[test]
    fn bounds_and_planes() {
        let map = small_map();
        assert!(map.is_valid_point(Point4D::new(63, 63, 0, 0)));
        assert!(!map.is_valid_point(Point4D::new(64, 0, 0, 0)));
        assert!(!map.is_valid_point(Point4D::new(1, 1, 0, 1)));
        assert!(!map.is_valid_point(Point4D::LIMBO));
    }

    #[test]
    fn terrain_respects_caps() {
        let map = small_map();
        let from = Point4D::new(5, 6, 0, 0);
        let walker = MovementCaps::default();
        assert_eq!(map.check_movement(from, Point4D::new(5, 5, 0, 0), &walker), None);
        assert_eq!(map.check_movement(from, Point4D::new(6, 5, 0, 0), &walker), None);
        assert_eq!(map.check_movement(from, Point4D::new(4, 5, 0, 0), &walker), Some(0));

        let swimmer = MovementCaps {
            can_swim: true,
            ..MovementCaps::default()
        };
        assert_eq!(map.check_movement(from, Point4D::new(6, 5, 0, 0), &swimmer), Some(-5));
    }

    #[test]
    fn climbing_is_limited_unless_flying() {
        let map = small_map();
        let from = Point4D::new(7, 6, 0, 0);
        let to = Point4D::new(7, 5, 0, 0);
        assert_eq!(map.check_movement(from, to, &MovementCaps::default()), None);
        let flyer = MovementCaps {
            can_fly: true,
            ..MovementCaps::default()
        };
        assert_eq!(map.check_movement(from, to, &flyer), Some(20));
        assert_eq!(map.check_movement(from, Point4D::new(5, 5, 0, 0), &flyer), Some(0));
    }
}
