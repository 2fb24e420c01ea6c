use crate::entities::defs::ThingDef;
use crate::world::map::Terrain;
use crate::world::region::Zone;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "world.yaml";
const REACH_RANGE_ENV: &str = "WORLDCORE_REACH_RANGE";

#[derive(Debug)]
pub struct AppConfig {
    pub root: PathBuf,
    pub config_path: PathBuf,
    pub reach_range_override: Option<u16>,
}

impl AppConfig {
    pub fn from_args(args: &[String]) -> Result<Self, String> {
        if args.len() < 2 {
            return Err("usage: worldcore <asset-root> [config_path]".to_string());
        }

        let root = Path::new(&args[1]).to_path_buf();
        let config_path = if args.len() > 2 {
            PathBuf::from(&args[2])
        } else {
            root.join(DEFAULT_CONFIG_FILE)
        };
        let reach_range_override = match std::env::var(REACH_RANGE_ENV) {
            Ok(value) => {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.parse::<u16>().map_err(|_| {
                        format!("invalid {REACH_RANGE_ENV} '{value}', expected a tile count")
                    })?)
                }
            }
            Err(_) => None,
        };
        Ok(Self {
            root,
            config_path,
            reach_range_override,
        })
    }

    /// Reads the world file (defaults when it does not exist) and applies
    /// environment overrides.
    pub fn world_config(&self) -> Result<WorldConfig, ConfigError> {
        let mut config = WorldConfig::load(&self.config_path)?;
        if let Some(range) = self.reach_range_override {
            config.reach_range = range;
        }
        Ok(config)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read {path} failed: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parse {path} failed: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

/// Tunables the world consults on every action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rules {
    /// Chebyshev distance within which a character can touch things.
    pub reach_range: u16,
    pub walk_step_ms: i64,
    pub mounted_step_ms: i64,
    pub region_cache_capacity: usize,
    pub placement_seed: u64,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            reach_range: 2,
            walk_step_ms: 180,
            mounted_step_ms: 90,
            region_cache_capacity: 4096,
            placement_seed: 0x2545_f491,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileConfig {
    pub x: u16,
    pub y: u16,
    #[serde(default)]
    pub plane: u8,
    #[serde(default)]
    pub terrain: Terrain,
    #[serde(default)]
    pub z: Option<i8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub width: u16,
    pub height: u16,
    pub planes: u8,
    pub regions: Vec<Zone>,
    pub tiles: Vec<TileConfig>,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            width: 6144,
            height: 4096,
            planes: 1,
            regions: Vec::new(),
            tiles: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub reach_range: u16,
    pub walk_step_ms: u32,
    pub mounted_step_ms: u32,
    pub region_cache_capacity: usize,
    pub placement_seed: u64,
    pub map: MapConfig,
    pub defs: Vec<ThingDef>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        let rules = Rules::default();
        Self {
            reach_range: rules.reach_range,
            walk_step_ms: 180,
            mounted_step_ms: 90,
            region_cache_capacity: rules.region_cache_capacity,
            placement_seed: rules.placement_seed,
            map: MapConfig::default(),
            defs: Vec::new(),
        }
    }
}

impl WorldConfig {
    /// Missing file means defaults; a file that exists must parse.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(text: &str) -> Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    pub fn rules(&self) -> Rules {
        Rules {
            reach_range: self.reach_range,
            walk_step_ms: i64::from(self.walk_step_ms),
            mounted_step_ms: i64::from(self.mounted_step_ms),
            region_cache_capacity: self.region_cache_capacity,
            placement_seed: self.placement_seed,
        }
    }
}
