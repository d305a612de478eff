use std::fmt;
use std::ops::BitOr;
use std::sync::OnceLock;

use fancy_regex::Regex;

/// Display flags applied when rendering a [`Version`] to a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VersionFlags(u8);

impl VersionFlags {
    pub const NONE: Self = Self(0);
    /// Drop micro (and patch) when both are empty.
    pub const IGNORE_MICRO_IF_EMPTY: Self = Self(1);
    /// Drop minor when minor, micro and patch are empty.
    pub const IGNORE_MINOR_IF_EMPTY: Self = Self(1 << 1);
    /// Render nothing at all when every component is empty.
    pub const IGNORE_MACRO_IF_EMPTY: Self = Self(1 << 2);
    /// The flag set used when versions are compared across engines.
    pub const COMPARE: Self = Self(0b111);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for VersionFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// A dotted version whose components are independently present.
///
/// Components are kept as strings so leading zeros and odd numbering
/// schemes survive the round trip; two versions are only ever compared
/// through their rendered form.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Version {
    pub major: Option<String>,
    pub minor: Option<String>,
    pub micro: Option<String>,
    pub patch: Option<String>,
}

fn version_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[vV]?(\d+)(?:[._](\d+))?(?:[._](\d+))?(?:[._](\d+))?(?![\d])")
            .expect("static version pattern")
    })
}

fn is_empty(component: &Option<String>) -> bool {
    match component.as_deref() {
        None => true,
        Some(c) => c.is_empty() || c.chars().all(|ch| ch == '0'),
    }
}

impl Version {
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn from_parts(
        major: Option<String>,
        minor: Option<String>,
        micro: Option<String>,
        patch: Option<String>,
    ) -> Self {
        let clean = |c: Option<String>| c.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        Self {
            major: clean(major),
            minor: clean(minor),
            micro: clean(micro),
            patch: clean(patch),
        }
    }

    /// Parse the leading dotted (or underscored) numeric part of `input`.
    /// Anything after it, like a `beta` suffix, is dropped.  Input without a
    /// leading number gives an unknown version.
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        let caps = match version_regex().captures(input) {
            Ok(Some(caps)) => caps,
            _ => return Self::unknown(),
        };
        let group = |i: usize| caps.get(i).map(|m| m.as_str().to_string());
        Self::from_parts(group(1), group(2), group(3), group(4))
    }

    pub fn is_unknown(&self) -> bool {
        self.major.is_none()
    }

    pub fn render(&self, flags: VersionFlags) -> String {
        if self.is_unknown() {
            return String::new();
        }

        let all_empty = is_empty(&self.major)
            && is_empty(&self.minor)
            && is_empty(&self.micro)
            && is_empty(&self.patch);
        if all_empty && flags.contains(VersionFlags::IGNORE_MACRO_IF_EMPTY) {
            return String::new();
        }

        let part = |c: &Option<String>| c.as_deref().unwrap_or("0").to_string();
        let mut parts = vec![part(&self.major)];

        let drop_micro = flags.contains(VersionFlags::IGNORE_MICRO_IF_EMPTY)
            && is_empty(&self.micro)
            && is_empty(&self.patch);
        let drop_minor = drop_micro
            && flags.contains(VersionFlags::IGNORE_MINOR_IF_EMPTY)
            && is_empty(&self.minor);

        if !drop_minor {
            parts.push(part(&self.minor));
        }
        if !drop_micro {
            parts.push(part(&self.micro));
            if self.patch.is_some() {
                parts.push(part(&self.patch));
            }
        }
        parts.join(".")
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(VersionFlags::NONE))
    }
}
