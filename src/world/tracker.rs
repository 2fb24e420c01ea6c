use crate::actions::anchor::Anchor;
use crate::actions::chain::ChainEnd;
use crate::actions::deny::DenyResult;
use crate::entities::ids::ObjectId;
use crate::entities::object::WorldObject;
use crate::error::WorldError;
use crate::scripting::hooks::{DenyArgs, Hook, HookArgs, Participant};
use crate::world::events::WorldEvent;
use crate::world::position::Point4D;
use crate::world::region::RegionId;
use crate::world::state::{tile_key, TileKey, World};
use lru::LruCache;
use std::num::NonZeroUsize;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64) / (total as f64)
        }
    }
}

/// Tile -> region memo in front of the map service.
pub struct RegionCache {
    cache: LruCache<TileKey, RegionId>,
    stats: CacheStats,
}

impl RegionCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: LruCache::new(capacity),
            stats: CacheStats::default(),
        }
    }

    pub fn lookup(&mut self, key: TileKey) -> Option<RegionId> {
        match self.cache.get(&key) {
            Some(region) => {
                self.stats.hits += 1;
                Some(*region)
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    pub fn insert(&mut self, key: TileKey, region: RegionId) {
        if let Some((evicted, _)) = self.cache.push(key, region) {
            if evicted != key {
                self.stats.evictions += 1;
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

impl World {
    pub fn region_at(&mut self, point: Point4D) -> RegionId {
        let key = tile_key(point);
        if let Some(region) = self.regions.lookup(key) {
            return region;
        }
        let region = self.map.region_for(point);
        self.regions.insert(key, region);
        region
    }

    pub fn region_name(&self, region: RegionId) -> &str {
        self.map.region_name(region)
    }

    pub fn region_cache_stats(&self) -> CacheStats {
        self.regions.stats()
    }

    /// Map position of a character or ground item.
    pub fn position_of(&self, entity: ObjectId) -> Result<Point4D, WorldError> {
        match self.object(entity)? {
            WorldObject::Character(character) => Ok(character.point),
            WorldObject::Item(item) if item.is_on_ground() => Ok(item.point),
            WorldObject::Item(_) => Err(WorldError::Invariant(format!(
                "{entity} has no map position of its own"
            ))),
        }
    }

    /// Moves a character or ground item. Crossing into another region asks
    /// the old region (exit) and the new one (enter) first; either may
    /// refuse, in which case nothing changes.
    pub fn move_to(&mut self, entity: ObjectId, point: Point4D) -> Result<DenyResult, WorldError> {
        if !self.map.is_valid_point(point) {
            return Err(WorldError::InvalidPosition(point));
        }
        let old = self.position_of(entity)?;
        let (from, to) = (self.region_at(old), self.region_at(point));
        if from != to {
            let steps = [
                (Hook::RegionExit, Participant::Region(from)),
                (Hook::RegionEnter, Participant::Region(to)),
            ];
            let mut args = DenyArgs::new(entity).point(point);
            let anchors: Vec<Anchor> = match self.object(entity)? {
                WorldObject::Item(_) => vec![Anchor::capture(self, entity)?],
                WorldObject::Character(_) => Vec::new(),
            };
            if self.run_deny_chain(&steps, &mut args, &anchors) == ChainEnd::Denied {
                return Ok(args.result);
            }
            // a handler may have moved a character; the transition was
            // judged from `old`
            if self.position_of(entity)? != old {
                debug!(%entity, "entity moved during region checks; keeping handler's position");
                return Ok(DenyResult::Allow);
            }
        }
        self.commit_position(entity, old, point)?;
        Ok(DenyResult::Allow)
    }

    /// Forced move. Regions still hear about the transition but cannot
    /// refuse it.
    pub fn teleport(&mut self, entity: ObjectId, point: Point4D) -> Result<(), WorldError> {
        if !self.map.is_valid_point(point) {
            return Err(WorldError::InvalidPosition(point));
        }
        let old = self.position_of(entity)?;
        let (from, to) = (self.region_at(old), self.region_at(point));
        if from != to {
            let steps = [
                (Hook::RegionExit, Participant::Region(from)),
                (Hook::RegionEnter, Participant::Region(to)),
            ];
            let mut args = DenyArgs::new(entity).point(point);
            if self.run_deny_chain(&steps, &mut args, &[]) == ChainEnd::Denied {
                debug!(%entity, %from, %to, "region objected to a teleport; ignored");
            }
        }
        let old = self.position_of(entity)?;
        self.commit_position(entity, old, point)
    }

    fn commit_position(
        &mut self,
        entity: ObjectId,
        old: Point4D,
        new: Point4D,
    ) -> Result<(), WorldError> {
        if self.character(entity).is_ok() {
            self.character_mut(entity)?.point = new;
        } else {
            self.detach_to_limbo(entity)?;
            self.attach_to_ground(entity, new)?;
        }
        self.events.push(WorldEvent::PositionChanged { entity, old, new });
        debug!(%entity, %old, %new, "position changed");
        self.notify(
            Hook::NewPosition,
            Participant::Object(entity),
            &HookArgs::subject(entity).point(new),
            None,
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::deny::DenyReason;
    use crate::scripting::hooks::Flow;
    use crate::scripting::registry::{Scope, TriggerRegistry};
    use crate::test_support::{fixture, GOLD, TOWN};
    use crate::world::containment::Location;
    use std::rc::Rc;

    #[test]
    fn cache_counts_hits_and_evictions() {
        let mut cache = RegionCache::new(2);
        assert_eq!(cache.lookup((1, 1, 0)), None);
        cache.insert((1, 1, 0), RegionId(1));
        cache.insert((2, 2, 0), RegionId(1));
        assert_eq!(cache.lookup((1, 1, 0)), Some(RegionId(1)));
        cache.insert((3, 3, 0), RegionId::WORLD);
        assert_eq!(cache.len(), 2);
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.evictions), (1, 1, 1));
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn region_lookups_are_memoized() {
        let mut fx = fixture();
        let point = Point4D::new(10, 10, 0, 0);
        assert_eq!(fx.world.region_at(point), TOWN);
        assert_eq!(fx.world.region_at(point), TOWN);
        assert_eq!(fx.world.region_cache_stats().hits, 1);
        assert_eq!(fx.world.region_name(TOWN), "town");
    }

    #[test]
    fn move_outside_the_map_is_an_error() {
        let mut fx = fixture();
        let err = fx
            .world
            .move_to(fx.alice, Point4D::new(9000, 1, 0, 0))
            .expect_err("off map");
        assert_eq!(err, WorldError::InvalidPosition(Point4D::new(9000, 1, 0, 0)));
    }

    #[test]
    fn region_can_refuse_entry() {
        let mut fx = fixture();
        let mut registry = TriggerRegistry::new();
        registry.on_deny(Hook::RegionEnter, Scope::Region(TOWN), |_, args| {
            args.result = DenyResult::Deny(DenyReason::RegionRefused);
            Ok(Flow::Continue)
        });
        fx.world.set_handlers(Rc::new(registry));
        let before = fx.world.position_of(fx.alice).expect("alice");
        fx.world.drain_events();
        let verdict = fx
            .world
            .move_to(fx.alice, Point4D::new(10, 10, 0, 0))
            .expect("move");
        assert_eq!(verdict, DenyResult::Deny(DenyReason::RegionRefused));
        assert_eq!(fx.world.position_of(fx.alice), Ok(before));
        assert_eq!(fx.world.pending_events(), 0);
    }

    #[test]
    fn ground_items_move_with_the_ground_index() {
        let mut fx = fixture();
        let from = Point4D::new(120, 120, 0, 0);
        let to = Point4D::new(121, 120, 0, 0);
        let gold = fx.world.create_item(GOLD, 1, Location::Ground(from)).expect("gold");
        fx.world.drain_events();
        fx.world.teleport(gold, to).expect("teleport");
        assert!(fx.world.items_at(from).is_empty());
        assert_eq!(fx.world.items_at(to), vec![gold]);
        let events = fx.world.drain_events();
        assert!(events.contains(&WorldEvent::PositionChanged { entity: gold, old: from, new: to }));
        assert!(fx.world.check_invariants().is_empty());
    }

    #[test]
    fn contained_items_have_no_map_position() {
        let mut fx = fixture();
        assert!(matches!(
            fx.world.move_to(fx.backpack, Point4D::new(100, 100, 0, 0)),
            Err(WorldError::Invariant(_))
        ));
    }
}
