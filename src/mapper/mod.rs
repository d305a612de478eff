//! Translation of engine-specific raw results into [`Detection`]s.
//!
//! Every engine goes through the same [`TableMapper`]; what differs is its
//! [`MappingTable`], a declarative list of "canonical field <- raw path"
//! rules.  Engines that encode robot identity in one overloaded field get a
//! `robot:` rule on top.

mod builtin;
mod names;
mod substitution;
mod table;

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::raw::RawResult;
use crate::types::{BrowserKind, Detection, Field, Version};

pub use builtin::{builtin_table, BUILTIN_TABLES};
pub use names::{AliasNames, IdentityNames, NameMapper};
pub use table::MappingTable;

/// Turns one engine's raw result into the canonical schema.
///
/// Must be total: missing or odd raw data degrades to `None`, never to a
/// panic or error.  A missing raw result maps to [`Detection::unknown`].
pub trait Mapper: Send + Sync {
    fn map(&self, raw: Option<&Value>, agent: &str) -> Detection;
}

pub struct TableMapper {
    table: MappingTable,
    names: Arc<dyn NameMapper>,
}

impl TableMapper {
    pub fn new(table: MappingTable, names: Arc<dyn NameMapper>) -> Self {
        Self { table, names }
    }

    pub fn engine(&self) -> &str {
        self.table.engine()
    }

    /// Resolve `mapping` as a built-in table name first, then as a path to a
    /// YAML table.
    pub fn load(mapping: &str, names: Arc<dyn NameMapper>) -> Result<Self> {
        let table = match builtin_table(mapping) {
            Some(content) => MappingTable::from_yaml(content)?,
            None if std::path::Path::new(mapping).is_file() => MappingTable::from_file(mapping)?,
            None => return Err(Error::UnknownMapping(mapping.to_string())),
        };
        Ok(Self::new(table, names))
    }

    fn apply_text(&self, detection: &mut Detection, field: Field, value: String) -> bool {
        let named = |field| self.names.canonical(field, &value);
        match field {
            Field::BrowserName => detection.browser.name = Some(named(field)),
            Field::BrowserManufacturer => detection.browser.manufacturer = Some(named(field)),
            Field::BrowserKind => {
                let kind = BrowserKind::from_str(&value);
                if kind.is_unknown() {
                    return false;
                }
                detection.browser.kind = kind;
            }
            Field::BrowserBits => match parse_bits(&value) {
                Some(bits) => detection.browser.bitness = Some(bits),
                None => return false,
            },
            Field::DeviceName => detection.device.name = Some(named(field)),
            Field::DeviceMarketingName => detection.device.marketing_name = Some(named(field)),
            Field::DeviceManufacturer => detection.device.manufacturer = Some(named(field)),
            Field::DeviceBrand => detection.device.brand = Some(named(field)),
            Field::DeviceType => detection.device.kind = Some(named(field)),
            Field::DevicePointingMethod => detection.device.pointing_method = Some(named(field)),
            Field::OsName => detection.os.name = Some(named(field)),
            Field::OsManufacturer => detection.os.manufacturer = Some(named(field)),
            Field::OsBits => match parse_bits(&value) {
                Some(bits) => detection.os.bitness = Some(bits),
                None => return false,
            },
            Field::EngineName => detection.engine.name = Some(named(field)),
            Field::EngineManufacturer => detection.engine.manufacturer = Some(named(field)),
            Field::BrowserVersion | Field::OsVersion | Field::EngineVersion => {
                match Version::parse(&value) {
                    v if v.is_unknown() => return false,
                    v => set_version(detection, field, v),
                }
            }
        }
        true
    }
}

fn set_version(detection: &mut Detection, field: Field, version: Version) {
    match field {
        Field::BrowserVersion => detection.browser.version = version,
        Field::OsVersion => detection.os.version = version,
        Field::EngineVersion => detection.engine.version = version,
        _ => {}
    }
}

/// Leading integer of a bitness value (`"64"`, `"64-bit"`, `"32bit"`).
fn parse_bits(value: &str) -> Option<u8> {
    let digits: String = value
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse::<u8>().ok().filter(|b| *b > 0)
}

impl Mapper for TableMapper {
    fn map(&self, raw: Option<&Value>, agent: &str) -> Detection {
        let raw = RawResult::new(raw);
        let mut detection = Detection::unknown(agent);
        if raw.is_absent() {
            return detection;
        }

        // Rules are fallbacks: the first one producing a value wins its field.
        let mut filled: HashSet<Field> = HashSet::new();

        if let Some(robot) = &self.table.robot {
            if robot.matches(&raw) {
                detection.browser.kind = BrowserKind::Robot;
                filled.insert(Field::BrowserKind);
                if let Some(name) = robot.name.as_deref().and_then(|p| raw.get_str(p)) {
                    if self.apply_text(&mut detection, Field::BrowserName, name) {
                        filled.insert(Field::BrowserName);
                    }
                }
                if let Some(maker) = robot.manufacturer.as_deref().and_then(|p| raw.get_str(p)) {
                    if self.apply_text(&mut detection, Field::BrowserManufacturer, maker) {
                        filled.insert(Field::BrowserManufacturer);
                    }
                }
            }
        }

        for rule in &self.table.rules {
            if filled.contains(&rule.field) {
                continue;
            }
            let applied = if rule.field.is_version() {
                match rule.resolve_version(&raw) {
                    Some(version) => {
                        set_version(&mut detection, rule.field, version);
                        true
                    }
                    None => false,
                }
            } else {
                match rule.resolve_text(&raw) {
                    Some(value) => self.apply_text(&mut detection, rule.field, value),
                    None => false,
                }
            };
            if applied {
                filled.insert(rule.field);
            }
        }

        detection
    }
}

/// Mappers for every configured engine, in configuration order.
#[derive(Clone, Default)]
pub struct MapperSet {
    mappers: IndexMap<String, Arc<dyn Mapper>>,
}

impl MapperSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, engine: impl Into<String>, mapper: Arc<dyn Mapper>) {
        self.mappers.insert(engine.into(), mapper);
    }

    pub fn get(&self, engine: &str) -> Option<&Arc<dyn Mapper>> {
        self.mappers.get(engine)
    }

    pub fn engines(&self) -> impl Iterator<Item = &str> {
        self.mappers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.mappers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappers.is_empty()
    }

    /// Map `raw` with the engine's mapper.  Engines without a mapper give
    /// an unknown detection.
    pub fn map(&self, engine: &str, raw: Option<&Value>, agent: &str) -> Detection {
        match self.mappers.get(engine) {
            Some(mapper) => mapper.map(raw, agent),
            None => {
                tracing::warn!(engine, "no mapper registered, treating result as unknown");
                Detection::unknown(agent)
            }
        }
    }
}
