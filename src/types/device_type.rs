/// Canonical device types.  Engines disagree on spelling ("Mobile Phone",
/// "smartphone", "TV Device", ...), so raw values are folded onto this list
/// before comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceType {
    Desktop,
    Smartphone,
    Tablet,
    Phablet,
    FeaturePhone,
    Console,
    Tv,
    CarBrowser,
    Camera,
    PortableMediaPlayer,
    Notebook,
    SmartDisplay,
    SmartSpeaker,
    Wearable,
    Peripheral,
}

impl DeviceType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "desktop" | "pc" | "computer" => Some(Self::Desktop),
            "smartphone" | "mobile phone" | "mobile" | "phone" => Some(Self::Smartphone),
            "tablet" => Some(Self::Tablet),
            "phablet" => Some(Self::Phablet),
            "feature phone" | "featurephone" => Some(Self::FeaturePhone),
            "console" | "game console" => Some(Self::Console),
            "tv" | "television" | "tv device" | "smart tv" => Some(Self::Tv),
            "car browser" | "car" => Some(Self::CarBrowser),
            "camera" => Some(Self::Camera),
            "portable media player" | "media player" => Some(Self::PortableMediaPlayer),
            "notebook" | "laptop" => Some(Self::Notebook),
            "smart display" => Some(Self::SmartDisplay),
            "smart speaker" => Some(Self::SmartSpeaker),
            "wearable" | "smartwatch" => Some(Self::Wearable),
            "peripheral" => Some(Self::Peripheral),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Desktop => "desktop",
            Self::Smartphone => "smartphone",
            Self::Tablet => "tablet",
            Self::Phablet => "phablet",
            Self::FeaturePhone => "feature phone",
            Self::Console => "console",
            Self::Tv => "tv",
            Self::CarBrowser => "car browser",
            Self::Camera => "camera",
            Self::PortableMediaPlayer => "portable media player",
            Self::Notebook => "notebook",
            Self::SmartDisplay => "smart display",
            Self::SmartSpeaker => "smart speaker",
            Self::Wearable => "wearable",
            Self::Peripheral => "peripheral",
        }
    }
}
