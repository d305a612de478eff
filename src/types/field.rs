use serde::Deserialize;

/// Addressable leaf of a [`Detection`](super::Detection), used by mapping
/// tables to say where a raw value lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum Field {
    #[serde(rename = "browser.name")]
    BrowserName,
    #[serde(rename = "browser.manufacturer")]
    BrowserManufacturer,
    #[serde(rename = "browser.version")]
    BrowserVersion,
    #[serde(rename = "browser.type")]
    BrowserKind,
    #[serde(rename = "browser.bits")]
    BrowserBits,
    #[serde(rename = "device.name")]
    DeviceName,
    #[serde(rename = "device.marketing_name")]
    DeviceMarketingName,
    #[serde(rename = "device.manufacturer")]
    DeviceManufacturer,
    #[serde(rename = "device.brand")]
    DeviceBrand,
    #[serde(rename = "device.type")]
    DeviceType,
    #[serde(rename = "device.pointing_method")]
    DevicePointingMethod,
    #[serde(rename = "os.name")]
    OsName,
    #[serde(rename = "os.version")]
    OsVersion,
    #[serde(rename = "os.manufacturer")]
    OsManufacturer,
    #[serde(rename = "os.bits")]
    OsBits,
    #[serde(rename = "engine.name")]
    EngineName,
    #[serde(rename = "engine.version")]
    EngineVersion,
    #[serde(rename = "engine.manufacturer")]
    EngineManufacturer,
}

impl Field {
    pub fn is_version(&self) -> bool {
        matches!(
            self,
            Self::BrowserVersion | Self::OsVersion | Self::EngineVersion
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BrowserName => "browser.name",
            Self::BrowserManufacturer => "browser.manufacturer",
            Self::BrowserVersion => "browser.version",
            Self::BrowserKind => "browser.type",
            Self::BrowserBits => "browser.bits",
            Self::DeviceName => "device.name",
            Self::DeviceMarketingName => "device.marketing_name",
            Self::DeviceManufacturer => "device.manufacturer",
            Self::DeviceBrand => "device.brand",
            Self::DeviceType => "device.type",
            Self::DevicePointingMethod => "device.pointing_method",
            Self::OsName => "os.name",
            Self::OsVersion => "os.version",
            Self::OsManufacturer => "os.manufacturer",
            Self::OsBits => "os.bits",
            Self::EngineName => "engine.name",
            Self::EngineVersion => "engine.version",
            Self::EngineManufacturer => "engine.manufacturer",
        }
    }
}
