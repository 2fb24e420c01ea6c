use crate::entities::ids::ObjectId;
use crate::entities::layer::{Layer, LayerGroup};
use crate::entities::object::WorldObject;
use crate::world::child_list::ChildList;
use crate::world::state::{tile_key, World};
use std::collections::HashSet;

impl World {
    /// Walks the whole graph and reports every structural problem found.
    /// An empty list means the world is consistent. Items sitting in limbo
    /// count as a problem, so only call this between actions.
    pub fn check_invariants(&self) -> Vec<String> {
        let mut problems = Vec::new();
        for (id, object) in self.objects.iter() {
            match object {
                WorldObject::Item(_) => self.check_item(id, &mut problems),
                WorldObject::Character(_) => self.check_character(id, &mut problems),
            }
        }
        self.check_ground_index(&mut problems);
        problems
    }

    fn check_item(&self, id: ObjectId, problems: &mut Vec<String>) {
        let Ok(item) = self.item(id) else {
            return;
        };
        if item.amount == 0 {
            problems.push(format!("{id} has a zero amount"));
        }
        match item.parent {
            None if item.point.is_limbo() => problems.push(format!("{id} is left in limbo")),
            None => {
                let listed = self
                    .ground
                    .get(&tile_key(item.point))
                    .map(|ids| ids.iter().filter(|entry| **entry == id).count())
                    .unwrap_or(0);
                if listed != 1 {
                    problems.push(format!(
                        "{id} on the ground at {} is indexed {listed} times",
                        item.point
                    ));
                }
                if !self.map.is_valid_point(item.point) {
                    problems.push(format!("{id} lies outside the map at {}", item.point));
                }
            }
            Some(parent) => match self.object(parent) {
                Err(err) => problems.push(format!("{id} has a dead parent: {err}")),
                Ok(WorldObject::Item(holder)) => {
                    if !self.is_container(parent).unwrap_or(false) {
                        problems.push(format!("{id} sits in {parent}, which is not a container"));
                    }
                    let list = holder.contents.unwrap_or_default();
                    self.check_listed_once(id, parent, list, problems);
                }
                Ok(WorldObject::Character(holder)) => match item.layer {
                    None => problems.push(format!("{id} is held by {parent} without a layer")),
                    Some(layer) if layer.is_dragging() => {
                        if holder.dragging != Some(id) {
                            problems.push(format!("{id} thinks {parent} drags it"));
                        }
                    }
                    Some(layer) if !layer.is_valid() => {
                        problems.push(format!("{id} is on invalid layer {layer}"));
                    }
                    Some(layer) => {
                        self.check_listed_once(id, parent, holder.group(layer.group()), problems);
                    }
                },
            },
        }
        if let Some(list) = item.contents {
            self.check_list(id, list, problems);
            let sum = self.children_weight(list);
            if sum != item.contained_weight {
                problems.push(format!(
                    "{id} carries {} but its contents weigh {sum}",
                    item.contained_weight
                ));
            }
        } else if item.contained_weight != 0 {
            problems.push(format!("{id} has weight {} but no contents", item.contained_weight));
        }
    }

    fn check_character(&self, id: ObjectId, problems: &mut Vec<String>) {
        let Ok(character) = self.character(id) else {
            return;
        };
        let mut sum = 0;
        for group in [LayerGroup::Visible, LayerGroup::Invisible, LayerGroup::Special] {
            let list = character.group(group);
            self.check_list(id, list, problems);
            sum += self.children_weight(list);
            if group == LayerGroup::Special {
                continue;
            }
            let mut seen: HashSet<Layer> = HashSet::new();
            for child in self.list_ids(list) {
                if let Some(layer) = self.item(child).ok().and_then(|item| item.layer) {
                    if !seen.insert(layer) {
                        problems.push(format!("{id} has two items on {layer}"));
                    }
                }
            }
        }
        if let Some(dragged) = character.dragging {
            match self.item(dragged) {
                Ok(item) => {
                    if item.parent != Some(id) || item.layer != Some(Layer::DRAGGING) {
                        problems.push(format!("{id} drags {dragged}, which is elsewhere"));
                    }
                    sum += item.total_weight();
                }
                Err(err) => problems.push(format!("{id} drags a dead item: {err}")),
            }
        }
        if sum != character.contained_weight {
            problems.push(format!(
                "{id} carries {} but its inventory weighs {sum}",
                character.contained_weight
            ));
        }
    }

    fn check_listed_once(
        &self,
        id: ObjectId,
        parent: ObjectId,
        list: ChildList,
        problems: &mut Vec<String>,
    ) {
        let count = self.list_ids(list).iter().filter(|entry| **entry == id).count();
        if count != 1 {
            problems.push(format!("{id} appears {count} times in the list of {parent}"));
        }
    }

    fn check_list(&self, owner: ObjectId, list: ChildList, problems: &mut Vec<String>) {
        let ids = self.list_ids(list);
        if ids.len() != list.len as usize {
            problems.push(format!(
                "{owner} counts {} children but links {}",
                list.len,
                ids.len()
            ));
            return;
        }
        if list.tail != ids.last().copied() {
            problems.push(format!("{owner} has a stale tail"));
        }
        let mut prev = None;
        for child in &ids {
            match self.item(*child) {
                Ok(item) => {
                    if item.links.prev != prev {
                        problems.push(format!("{child} in {owner} has a broken back link"));
                    }
                    if item.parent != Some(owner) {
                        problems.push(format!("{child} is linked under {owner} but not its child"));
                    }
                }
                Err(err) => problems.push(format!("{owner} links a dead child: {err}")),
            }
            prev = Some(*child);
        }
    }

    fn children_weight(&self, list: ChildList) -> u64 {
        self.list_ids(list)
            .into_iter()
            .filter_map(|child| self.item(child).ok())
            .map(|item| item.total_weight())
            .sum()
    }

    fn check_ground_index(&self, problems: &mut Vec<String>) {
        for (key, ids) in &self.ground {
            if ids.is_empty() {
                problems.push(format!("empty ground entry at {key:?}"));
            }
            for id in ids {
                match self.item(*id) {
                    Ok(item) if item.parent.is_none() && tile_key(item.point) == *key => {}
                    Ok(_) => problems.push(format!("{id} is indexed at {key:?} but lies elsewhere")),
                    Err(err) => problems.push(format!("ground index at {key:?} is stale: {err}")),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fixture, BAG, GOLD, RING, SWORD};
    use crate::world::containment::Location;
    use crate::world::position::Point4D;

    fn lcg_next(state: &mut u64) -> u32 {
        *state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (*state >> 33) as u32
    }

    #[test]
    fn fresh_fixture_is_consistent() {
        let fx = fixture();
        assert_eq!(fx.world.check_invariants(), Vec::<String>::new());
    }

    #[test]
    fn corrupted_weight_is_reported() {
        let mut fx = fixture();
        fx.world.item_mut(fx.backpack).expect("backpack").contained_weight = 99;
        let problems = fx.world.check_invariants();
        assert!(problems.iter().any(|problem| problem.contains("contents weigh")));
    }

    #[test]
    fn limbo_items_are_reported() {
        let mut fx = fixture();
        let gold = fx
            .world
            .create_item(GOLD, 1, Location::Ground(Point4D::new(70, 70, 0, 0)))
            .expect("gold");
        fx.world.detach_to_limbo(gold).expect("detach");
        assert_eq!(fx.world.check_invariants().len(), 1);
    }

    #[test]
    fn random_store_operations_keep_the_graph_consistent() {
        let mut fx = fixture();
        let mut state = 0x5eed_u64;
        let mut live: Vec<ObjectId> = Vec::new();
        let mut containers = vec![fx.backpack, fx.bob_backpack];
        let defs = [GOLD, GOLD, SWORD, RING, BAG];

        for round in 0..400 {
            let roll = lcg_next(&mut state) % 6;
            let pick = |state: &mut u64, len: usize| (lcg_next(state) as usize) % len.max(1);
            let spot = match lcg_next(&mut state) % 3 {
                0 => Location::Ground(Point4D::new(
                    90 + (lcg_next(&mut state) % 5) as u16,
                    90 + (lcg_next(&mut state) % 5) as u16,
                    0,
                    0,
                )),
                _ => Location::Container {
                    container: containers[pick(&mut state, containers.len())],
                    x: (lcg_next(&mut state) % 140) as u16,
                    y: (lcg_next(&mut state) % 140) as u16,
                },
            };
            match roll {
                0 | 1 => {
                    let def = defs[pick(&mut state, defs.len())];
                    let amount = 1 + lcg_next(&mut state) % 20;
                    let amount = if def == GOLD { amount } else { 1 };
                    if let Ok(id) = fx.world.create_item(def, amount, spot) {
                        if def == BAG {
                            containers.push(id);
                        }
                        live.push(id);
                    }
                }
                2 if !live.is_empty() => {
                    let id = live[pick(&mut state, live.len())];
                    if fx.world.detach_to_limbo(id).is_ok() && fx.world.attach_to(id, spot).is_err() {
                        // cycles and the like; put it somewhere safe
                        fx.world
                            .attach_to_ground(id, Point4D::new(95, 95, 0, 0))
                            .expect("fallback placement");
                    }
                }
                3 if live.len() > 1 => {
                    let a = live[pick(&mut state, live.len())];
                    let b = live[pick(&mut state, live.len())];
                    fx.world.try_merge(a, b).expect("merge");
                }
                4 if !live.is_empty() => {
                    let id = live[pick(&mut state, live.len())];
                    let amount = 1 + lcg_next(&mut state) % 30;
                    fx.world.set_amount(id, amount).expect("amount");
                }
                5 if !live.is_empty() => {
                    let id = live[pick(&mut state, live.len())];
                    fx.world.delete(id).expect("delete");
                }
                _ => {}
            }
            live.retain(|id| fx.world.exists(*id));
            containers.retain(|id| fx.world.exists(*id));
            let problems = fx.world.check_invariants();
            assert!(problems.is_empty(), "round {round}: {problems:?}");
        }
    }
}
