use super::{BrowserKind, Version};

/// One engine's canonical interpretation of one agent string.
///
/// Every part defaults to "unknown"; a `Detection` can always be built,
/// whatever the engine returned.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Detection {
    pub agent: String,
    pub browser: Browser,
    pub device: Device,
    pub os: Os,
    pub engine: Engine,
}

impl Detection {
    /// The all-null detection, used when an engine produced nothing.
    pub fn unknown(agent: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            ..Self::default()
        }
    }

    pub fn is_bot(&self) -> bool {
        self.browser.kind == BrowserKind::Robot
    }

    pub fn is_unknown(&self) -> bool {
        *self == Self::unknown(self.agent.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Browser {
    pub name: Option<String>,
    pub manufacturer: Option<String>,
    pub version: Version,
    pub kind: BrowserKind,
    pub bitness: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Device {
    pub name: Option<String>,
    pub marketing_name: Option<String>,
    pub manufacturer: Option<String>,
    pub brand: Option<String>,
    /// Device type, e.g. "smartphone".
    pub kind: Option<String>,
    pub pointing_method: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Os {
    pub name: Option<String>,
    pub version: Version,
    pub manufacturer: Option<String>,
    pub bitness: Option<u8>,
}

/// The render engine.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Engine {
    pub name: Option<String>,
    pub version: Version,
    pub manufacturer: Option<String>,
}
