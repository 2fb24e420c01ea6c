use crate::entities::layer::Layer;
use crate::error::WorldError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DefId(pub u16);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefKind {
    Item,
    Character,
}

/// Shared template for a family of objects. Instances copy what they may
/// change (model, weight) and keep the id for everything else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThingDef {
    pub id: DefId,
    pub name: String,
    pub kind: DefKind,
    #[serde(default)]
    pub model: u16,
    #[serde(default)]
    pub weight: u32,
    #[serde(default)]
    pub stackable: bool,
    #[serde(default)]
    pub container: bool,
    #[serde(default)]
    pub layer: Option<Layer>,
    #[serde(default)]
    pub two_handed: bool,
}

impl ThingDef {
    pub fn item(id: u16, name: &str, model: u16, weight: u32) -> Self {
        Self {
            id: DefId(id),
            name: name.to_string(),
            kind: DefKind::Item,
            model,
            weight,
            stackable: false,
            container: false,
            layer: None,
            two_handed: false,
        }
    }

    pub fn character(id: u16, name: &str, model: u16) -> Self {
        Self {
            kind: DefKind::Character,
            ..Self::item(id, name, model, 0)
        }
    }

    pub fn stackable(mut self) -> Self {
        self.stackable = true;
        self
    }

    pub fn container(mut self) -> Self {
        self.container = true;
        self
    }

    pub fn worn_on(mut self, layer: Layer) -> Self {
        self.layer = Some(layer);
        self
    }

    pub fn two_handed(mut self) -> Self {
        self.two_handed = true;
        self
    }
}

#[derive(Debug, Default, Clone)]
pub struct DefIndex {
    defs: HashMap<DefId, ThingDef>,
}

impl DefIndex {
    pub fn get(&self, id: DefId) -> Option<&ThingDef> {
        self.defs.get(&id)
    }

    pub fn require(&self, id: DefId) -> Result<&ThingDef, WorldError> {
        self.defs.get(&id).ok_or(WorldError::UnknownDef(id))
    }

    pub fn insert(&mut self, def: ThingDef) -> Result<(), WorldError> {
        if self.defs.contains_key(&def.id) {
            return Err(WorldError::DuplicateDef(def.id));
        }
        self.defs.insert(def.id, def);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ThingDef> {
        self.defs.values()
    }
}

impl TryFrom<Vec<ThingDef>> for DefIndex {
    type Error = WorldError;

    fn try_from(defs: Vec<ThingDef>) -> Result<Self, Self::Error> {
        let mut index = DefIndex::default();
        for def in defs {
            index.insert(def)?;
        }
        Ok(index)
    }
}
