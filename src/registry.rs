use crate::comparator::FieldValue;
use crate::error::{Error, Result};
use crate::types::{Detection, Version, VersionFlags};

pub type Accessor = fn(&Detection) -> FieldValue;

/// A comparable property: a report label and how to read it off a
/// [`Detection`].
#[derive(Clone, Copy)]
pub struct Property {
    pub label: &'static str,
    pub accessor: Accessor,
}

impl Property {
    pub fn extract(&self, detection: &Detection) -> FieldValue {
        (self.accessor)(detection)
    }
}

impl std::fmt::Debug for Property {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Property").field(&self.label).finish()
    }
}

fn text(value: &Option<String>) -> FieldValue {
    FieldValue::from_option(value.as_deref())
}

fn version(value: &Version) -> FieldValue {
    match value.render(VersionFlags::COMPARE) {
        rendered if rendered.is_empty() => FieldValue::Null,
        rendered => FieldValue::Text(rendered),
    }
}

fn bits(value: Option<u8>) -> FieldValue {
    match value {
        Some(bits) => FieldValue::Text(bits.to_string()),
        None => FieldValue::Null,
    }
}

const DEFAULT_PROPERTIES: &[Property] = &[
    Property { label: "Browser", accessor: |d| text(&d.browser.name) },
    Property { label: "Browser Maker", accessor: |d| text(&d.browser.manufacturer) },
    Property { label: "Browser Version", accessor: |d| version(&d.browser.version) },
    Property {
        label: "Browser Type",
        accessor: |d| match d.browser.kind {
            kind if kind.is_unknown() => FieldValue::Null,
            kind => FieldValue::text(kind.as_str()),
        },
    },
    Property { label: "Browser Bits", accessor: |d| bits(d.browser.bitness) },
    Property { label: "Engine", accessor: |d| text(&d.engine.name) },
    Property { label: "Engine Version", accessor: |d| version(&d.engine.version) },
    Property { label: "Engine Maker", accessor: |d| text(&d.engine.manufacturer) },
    Property { label: "OS", accessor: |d| text(&d.os.name) },
    Property { label: "OS Version", accessor: |d| version(&d.os.version) },
    Property { label: "OS Maker", accessor: |d| text(&d.os.manufacturer) },
    Property { label: "OS Bits", accessor: |d| bits(d.os.bitness) },
    Property { label: "Device Name", accessor: |d| text(&d.device.name) },
    Property { label: "Device Marketing Name", accessor: |d| text(&d.device.marketing_name) },
    Property { label: "Device Maker", accessor: |d| text(&d.device.manufacturer) },
    Property { label: "Device Brand", accessor: |d| text(&d.device.brand) },
    Property { label: "Device Typ", accessor: |d| text(&d.device.kind) },
    Property { label: "Pointing Method", accessor: |d| text(&d.device.pointing_method) },
];

/// Ordered catalogue of the properties compared for every agent.
#[derive(Debug, Clone)]
pub struct PropertyRegistry {
    properties: Vec<Property>,
}

impl Default for PropertyRegistry {
    fn default() -> Self {
        Self {
            properties: DEFAULT_PROPERTIES.to_vec(),
        }
    }
}

impl PropertyRegistry {
    pub fn new(properties: Vec<Property>) -> Self {
        Self { properties }
    }

    /// A registry holding only `labels`, in the given order.
    pub fn select<S: AsRef<str>>(labels: &[S]) -> Result<Self> {
        let properties = labels
            .iter()
            .map(|label| {
                let label = label.as_ref();
                DEFAULT_PROPERTIES
                    .iter()
                    .find(|p| p.label.eq_ignore_ascii_case(label))
                    .copied()
                    .ok_or_else(|| Error::UnknownProperty(label.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { properties })
    }

    /// Case-insensitive, like [`select`](Self::select).
    pub fn get(&self, label: &str) -> Option<&Property> {
        self.properties
            .iter()
            .find(|p| p.label.eq_ignore_ascii_case(label))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Property> {
        self.properties.iter()
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}
