use crate::entities::character::Character;
use crate::entities::ids::ObjectId;
use crate::entities::item::{Item, ItemFlags};
use crate::entities::object::WorldObject;
use crate::error::WorldError;
use crate::world::events::WorldEvent;
use crate::world::position::{Direction, Point4D};
use crate::world::state::World;
use std::fmt::{self, Write as _};
use tracing::debug;

pub const ITEM_FIELDS: [&str; 11] = [
    "id", "def", "model", "color", "name", "flags", "amount", "parent", "layer", "point", "weight",
];
pub const CHARACTER_FIELDS: [&str; 10] = [
    "id", "def", "model", "color", "name", "direction", "privilege", "mounted", "point", "weight",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Int(i64),
    Text(String),
    Object(Option<ObjectId>),
    Point(Point4D),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Int(value) => write!(f, "{value}"),
            FieldValue::Text(text) => {
                f.write_char('"')?;
                for ch in text.chars() {
                    match ch {
                        '"' | '\\' => write!(f, "\\{ch}")?,
                        '\n' => f.write_str("\\n")?,
                        '\r' => f.write_str("\\r")?,
                        '\t' => f.write_str("\\t")?,
                        other => f.write_char(other)?,
                    }
                }
                f.write_char('"')
            }
            FieldValue::Object(Some(id)) => write!(f, "{id}"),
            FieldValue::Object(None) => write!(f, "none"),
            FieldValue::Point(point) => write!(f, "{point}"),
        }
    }
}

impl FieldValue {
    /// Reads text in the quoted form `Display` writes.
    fn unquote(raw: &str) -> Result<FieldValue, String> {
        let inner = raw
            .strip_prefix('"')
            .and_then(|rest| rest.strip_suffix('"'))
            .ok_or_else(|| "text must be quoted".to_string())?;
        let mut text = String::with_capacity(inner.len());
        let mut escaped = false;
        for ch in inner.chars() {
            if escaped {
                text.push(match ch {
                    'n' => '\n',
                    'r' => '\r',
                    't' => '\t',
                    '"' | '\\' => ch,
                    other => return Err(format!("unknown escape '\\{other}'")),
                });
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                return Err("unescaped quote inside text".to_string());
            } else {
                text.push(ch);
            }
        }
        if escaped {
            return Err("text ends inside an escape".to_string());
        }
        Ok(FieldValue::Text(text))
    }
}

/// Named attribute access used by the save layer. Structural fields
/// (parent, point, layer) are readable only; the containment store owns
/// them.
pub trait Persist {
    fn field_names(&self) -> &'static [&'static str];
    fn read_field(&self, name: &str) -> Result<FieldValue, WorldError>;
    fn write_field(&mut self, name: &str, value: FieldValue) -> Result<(), WorldError>;

    /// One `key = value` line per field.
    fn record(&self) -> String {
        let mut lines = Vec::new();
        for name in self.field_names() {
            if let Ok(value) = self.read_field(name) {
                lines.push(format!("{name} = {value}"));
            }
        }
        lines.join("\n")
    }
}

impl Persist for Item {
    fn field_names(&self) -> &'static [&'static str] {
        &ITEM_FIELDS
    }

    fn read_field(&self, name: &str) -> Result<FieldValue, WorldError> {
        let value = match name {
            "id" => FieldValue::Int(i64::from(self.id.0)),
            "def" => FieldValue::Int(i64::from(self.def.0)),
            "model" => FieldValue::Int(i64::from(self.model)),
            "color" => FieldValue::Int(i64::from(self.color)),
            "name" => FieldValue::Text(self.name.clone().unwrap_or_default()),
            "flags" => FieldValue::Int(i64::from(self.flags.bits())),
            "amount" => FieldValue::Int(i64::from(self.amount)),
            "parent" => FieldValue::Object(self.parent),
            "layer" => FieldValue::Int(self.layer.map(|layer| i64::from(layer.0)).unwrap_or(-1)),
            "point" => FieldValue::Point(self.point),
            "weight" => FieldValue::Int(clamp_weight(self.total_weight())),
            other => return Err(WorldError::UnknownField(other.to_string())),
        };
        Ok(value)
    }

    fn write_field(&mut self, name: &str, value: FieldValue) -> Result<(), WorldError> {
        match name {
            "model" => self.model = to_u16(&value, name)?,
            "color" => self.color = to_u16(&value, name)?,
            "name" => {
                let text = to_text(value, name)?;
                self.name = if text.is_empty() { None } else { Some(text) };
            }
            "flags" => self.flags = ItemFlags::from_bits(to_u8(&value, name)?),
            "id" | "def" | "amount" | "parent" | "layer" | "point" | "weight" => {
                return Err(WorldError::ReadOnlyField(name.to_string()))
            }
            other => return Err(WorldError::UnknownField(other.to_string())),
        }
        Ok(())
    }
}

impl Persist for Character {
    fn field_names(&self) -> &'static [&'static str] {
        &CHARACTER_FIELDS
    }

    fn read_field(&self, name: &str) -> Result<FieldValue, WorldError> {
        let value = match name {
            "id" => FieldValue::Int(i64::from(self.id.0)),
            "def" => FieldValue::Int(i64::from(self.def.0)),
            "model" => FieldValue::Int(i64::from(self.model)),
            "color" => FieldValue::Int(i64::from(self.color)),
            "name" => FieldValue::Text(self.name.clone()),
            "direction" => FieldValue::Text(direction_to_str(self.direction()).to_string()),
            "privilege" => FieldValue::Int(i64::from(self.privilege)),
            "mounted" => FieldValue::Int(i64::from(self.is_mounted())),
            "point" => FieldValue::Point(self.point),
            "weight" => FieldValue::Int(clamp_weight(self.contained_weight)),
            other => return Err(WorldError::UnknownField(other.to_string())),
        };
        Ok(value)
    }

    fn write_field(&mut self, name: &str, value: FieldValue) -> Result<(), WorldError> {
        match name {
            "model" => self.model = to_u16(&value, name)?,
            "color" => self.color = to_u16(&value, name)?,
            "name" => self.name = to_text(value, name)?,
            "direction" => {
                let text = to_text(value, name)?;
                let direction = parse_direction(&text).ok_or(WorldError::FieldType {
                    field: name.to_string(),
                    expected: "a compass direction",
                })?;
                self.set_direction(direction);
            }
            "privilege" => self.privilege = to_u8(&value, name)?,
            "mounted" => self.set_mounted(to_u8(&value, name)? != 0),
            "id" | "def" | "point" | "weight" => {
                return Err(WorldError::ReadOnlyField(name.to_string()))
            }
            other => return Err(WorldError::UnknownField(other.to_string())),
        }
        Ok(())
    }
}

impl World {
    pub fn read_field(&self, id: ObjectId, name: &str) -> Result<FieldValue, WorldError> {
        match self.object(id)? {
            WorldObject::Item(item) => item.read_field(name),
            WorldObject::Character(character) => character.read_field(name),
        }
    }

    /// Writes one field and queues the matching event. Item amounts go
    /// through the store so weights stay summed.
    pub fn write_field(
        &mut self,
        id: ObjectId,
        name: &str,
        value: FieldValue,
    ) -> Result<(), WorldError> {
        let is_character = self.object(id)?.is_character();
        if !is_character && name == "amount" {
            let amount = to_u32(&value, name)?;
            return self.set_amount(id, amount);
        }
        if is_character {
            let old = self.character(id)?.direction();
            self.character_mut(id)?.write_field(name, value)?;
            let new = self.character(id)?.direction();
            if old != new {
                self.events.push(WorldEvent::DirectionChanged { entity: id, old, new });
                return Ok(());
            }
        } else {
            self.item_mut(id)?.write_field(name, value)?;
        }
        if let Some(field) = static_name(name, is_character) {
            self.events.push(WorldEvent::FieldChanged { entity: id, field });
        }
        Ok(())
    }

    pub fn record(&self, id: ObjectId) -> Result<String, WorldError> {
        Ok(match self.object(id)? {
            WorldObject::Item(item) => item.record(),
            WorldObject::Character(character) => character.record(),
        })
    }

    /// Applies a saved record onto a live object. Read-only fields are
    /// skipped since placement restores them; blank lines and `#`
    /// comments are ignored.
    pub fn apply_record(&mut self, id: ObjectId, text: &str) -> Result<usize, WorldError> {
        let mut written = 0;
        for (index, line) in text.lines().enumerate() {
            let line_number = index + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let Some((key, raw)) = trimmed.split_once('=') else {
                return Err(WorldError::BadRecord {
                    line: line_number,
                    message: "missing '='".to_string(),
                });
            };
            let key = key.trim().to_ascii_lowercase();
            let current = self.read_field(id, &key)?;
            let value = parse_like(&current, raw.trim()).map_err(|message| WorldError::BadRecord {
                line: line_number,
                message: format!("{key}: {message}"),
            })?;
            if value == current {
                continue;
            }
            match self.write_field(id, &key, value) {
                Ok(()) => written += 1,
                Err(WorldError::ReadOnlyField(_)) => {
                    debug!(entity = %id, field = %key, "skipping read-only field");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(written)
    }
}

fn static_name(name: &str, is_character: bool) -> Option<&'static str> {
    let names: &[&'static str] = if is_character {
        &CHARACTER_FIELDS
    } else {
        &ITEM_FIELDS
    };
    names.iter().copied().find(|known| *known == name)
}

fn parse_like(current: &FieldValue, raw: &str) -> Result<FieldValue, String> {
    match current {
        FieldValue::Int(_) => raw
            .parse::<i64>()
            .map(FieldValue::Int)
            .map_err(|_| "integer parse failed".to_string()),
        FieldValue::Text(_) => FieldValue::unquote(raw),
        FieldValue::Object(_) => {
            if raw == "none" {
                return Ok(FieldValue::Object(None));
            }
            let hex = raw
                .strip_prefix('#')
                .ok_or_else(|| "object reference must start with '#'".to_string())?;
            u32::from_str_radix(hex, 16)
                .map(|id| FieldValue::Object(Some(ObjectId(id))))
                .map_err(|_| "object reference parse failed".to_string())
        }
        FieldValue::Point(_) => {
            let inner = raw
                .strip_prefix('(')
                .and_then(|rest| rest.strip_suffix(')'))
                .ok_or_else(|| "point must be parenthesised".to_string())?;
            let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
            if parts.len() != 4 {
                return Err("point needs four components".to_string());
            }
            let bad = |_| "point component parse failed".to_string();
            Ok(FieldValue::Point(Point4D::new(
                parts[0].parse().map_err(bad)?,
                parts[1].parse().map_err(bad)?,
                parts[2].parse().map_err(bad)?,
                parts[3].parse().map_err(bad)?,
            )))
        }
    }
}

fn clamp_weight(weight: u64) -> i64 {
    i64::try_from(weight).unwrap_or(i64::MAX)
}

fn to_int(value: &FieldValue, field: &str) -> Result<i64, WorldError> {
    match value {
        FieldValue::Int(value) => Ok(*value),
        _ => Err(WorldError::FieldType {
            field: field.to_string(),
            expected: "an integer",
        }),
    }
}

fn to_u8(value: &FieldValue, field: &str) -> Result<u8, WorldError> {
    u8::try_from(to_int(value, field)?).map_err(|_| WorldError::FieldType {
        field: field.to_string(),
        expected: "0..=255",
    })
}

fn to_u16(value: &FieldValue, field: &str) -> Result<u16, WorldError> {
    u16::try_from(to_int(value, field)?).map_err(|_| WorldError::FieldType {
        field: field.to_string(),
        expected: "0..=65535",
    })
}

fn to_u32(value: &FieldValue, field: &str) -> Result<u32, WorldError> {
    u32::try_from(to_int(value, field)?).map_err(|_| WorldError::FieldType {
        field: field.to_string(),
        expected: "a positive 32-bit integer",
    })
}

fn to_text(value: FieldValue, field: &str) -> Result<String, WorldError> {
    match value {
        FieldValue::Text(text) => Ok(text),
        _ => Err(WorldError::FieldType {
            field: field.to_string(),
            expected: "text",
        }),
    }
}

fn parse_direction(value: &str) -> Option<Direction> {
    match value.trim().to_ascii_lowercase().as_str() {
        "north" => Some(Direction::North),
        "northeast" => Some(Direction::Northeast),
        "east" => Some(Direction::East),
        "southeast" => Some(Direction::Southeast),
        "south" => Some(Direction::South),
        "southwest" => Some(Direction::Southwest),
        "west" => Some(Direction::West),
        "northwest" => Some(Direction::Northwest),
        _ => None,
    }
}

fn direction_to_str(direction: Direction) -> &'static str {
    match direction {
        Direction::North => "North",
        Direction::Northeast => "Northeast",
        Direction::East => "East",
        Direction::Southeast => "Southeast",
        Direction::South => "South",
        Direction::Southwest => "Southwest",
        Direction::West => "West",
        Direction::Northwest => "Northwest",
    }
}
