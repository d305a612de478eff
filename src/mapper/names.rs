use std::collections::HashMap;
use std::path::Path;

use indexmap::IndexMap;

use crate::error::Result;
use crate::types::{DeviceType, Field};

/// Canonicalizes raw names (brands, browser families, device types) before
/// they land in a [`Detection`](crate::Detection).
///
/// Implementations must be pure: the same `(field, raw)` always yields the
/// same canonical name.
pub trait NameMapper: Send + Sync {
    fn canonical(&self, field: Field, raw: &str) -> String;
}

/// Passes every name through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityNames;

impl NameMapper for IdentityNames {
    fn canonical(&self, _field: Field, raw: &str) -> String {
        raw.to_string()
    }
}

/// Case-insensitive alias lookup per field.  Device types without an
/// explicit alias are folded onto [`DeviceType`].
#[derive(Debug, Clone, Default)]
pub struct AliasNames {
    aliases: HashMap<Field, HashMap<String, String>>,
}

/// On-disk shape: `field -> { raw name -> canonical name }`.
type AliasFile = IndexMap<Field, IndexMap<String, String>>;

impl AliasNames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let file: AliasFile = serde_yaml::from_str(content)?;
        let mut names = Self::new();
        for (field, entries) in file {
            for (raw, canonical) in entries {
                names.insert(field, &raw, canonical);
            }
        }
        Ok(names)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn insert(&mut self, field: Field, raw: &str, canonical: impl Into<String>) {
        self.aliases
            .entry(field)
            .or_default()
            .insert(raw.trim().to_lowercase(), canonical.into());
    }

    pub fn with(mut self, field: Field, raw: &str, canonical: impl Into<String>) -> Self {
        self.insert(field, raw, canonical);
        self
    }
}

impl NameMapper for AliasNames {
    fn canonical(&self, field: Field, raw: &str) -> String {
        let key = raw.trim().to_lowercase();
        if let Some(canonical) = self.aliases.get(&field).and_then(|m| m.get(&key)) {
            return canonical.clone();
        }
        if field == Field::DeviceType {
            if let Some(kind) = DeviceType::from_str(&key) {
                return kind.as_str().to_string();
            }
        }
        raw.to_string()
    }
}
