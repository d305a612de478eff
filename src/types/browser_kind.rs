/// What kind of client an engine believes produced the agent string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BrowserKind {
    Browser,
    Robot,
    Application,
    Library,
    MediaPlayer,
    FeedReader,
    #[default]
    Unknown,
}

impl BrowserKind {
    /// Resolve an engine's raw client type.  Engines spell these very
    /// differently, so several aliases collapse onto each kind; anything
    /// unrecognised is `Unknown`.
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "browser" | "mobile browser" | "desktop browser" | "web browser" => Self::Browser,
            "bot" | "robot" | "crawler" | "spider" | "bot/crawler" | "search bot" => Self::Robot,
            "app" | "application" | "mobile app" | "mobile application" => Self::Application,
            "library" | "lib" | "http library" => Self::Library,
            "mediaplayer" | "media player" | "multimedia player" => Self::MediaPlayer,
            "feed reader" | "feedreader" | "feed-reader" => Self::FeedReader,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Browser => "browser",
            Self::Robot => "robot",
            Self::Application => "application",
            Self::Library => "library",
            Self::MediaPlayer => "mediaplayer",
            Self::FeedReader => "feed reader",
            Self::Unknown => "unknown",
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }
}
