use std::path::Path;

use fancy_regex::Regex;
use serde::Deserialize;

use super::substitution::expand;
use crate::error::{Error, Result};
use crate::raw::{is_sentinel, RawResult};
use crate::types::{Field, Version};

// ---------------------------------------------------------------------------
// On-disk shape  (mappings/*.yml)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct TableEntry {
    pub engine: String,
    #[serde(default)]
    pub rules: Vec<RuleEntry>,
    #[serde(default)]
    pub robot: Option<RobotEntry>,
}

/// One source for one canonical field.  Exactly one of `path`, `parts` or
/// `value` must be given; `regex`/`template` optionally post-process a
/// `path` value.
#[derive(Debug, Deserialize)]
pub(crate) struct RuleEntry {
    pub field: Field,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub parts: Option<Vec<String>>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub regex: Option<String>,
    #[serde(default)]
    pub template: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RobotEntry {
    pub when: String,
    #[serde(default)]
    pub equals: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub manufacturer: Option<String>,
}

// ---------------------------------------------------------------------------
// Compiled table
// ---------------------------------------------------------------------------

pub(crate) enum Source {
    Path(String),
    /// Version components: major, minor, micro, patch.
    Parts(Vec<String>),
    Const(String),
}

pub(crate) struct Extract {
    regex: Regex,
    template: Option<String>,
}

impl Extract {
    fn apply(&self, input: &str) -> Option<String> {
        let caps = self.regex.captures(input).ok()??;
        match &self.template {
            Some(tpl) => expand(tpl, &caps),
            None => caps
                .get(1)
                .or_else(|| caps.get(0))
                .map(|m| m.as_str().trim().to_string())
                .filter(|s| !s.is_empty()),
        }
    }
}

pub(crate) struct Rule {
    pub field: Field,
    source: Source,
    extract: Option<Extract>,
}

impl Rule {
    /// The rule's value as text, or `None` if the raw result has nothing
    /// usable there.
    pub fn resolve_text(&self, raw: &RawResult) -> Option<String> {
        let value = match &self.source {
            Source::Path(path) => raw.get_str(path)?,
            Source::Const(value) => value.clone(),
            Source::Parts(parts) => {
                let version = parts_to_version(parts, raw);
                if version.is_unknown() {
                    return None;
                }
                version.to_string()
            }
        };
        let value = match &self.extract {
            Some(extract) => extract.apply(&value)?,
            None => value,
        };
        if is_sentinel(&value) {
            None
        } else {
            Some(value)
        }
    }

    pub fn resolve_version(&self, raw: &RawResult) -> Option<Version> {
        let version = match (&self.source, &self.extract) {
            (Source::Parts(parts), None) => parts_to_version(parts, raw),
            _ => Version::parse(&self.resolve_text(raw)?),
        };
        if version.is_unknown() {
            None
        } else {
            Some(version)
        }
    }
}

fn parts_to_version(parts: &[String], raw: &RawResult) -> Version {
    let part = |i: usize| parts.get(i).and_then(|p| raw.get_str(p));
    Version::from_parts(part(0), part(1), part(2), part(3))
}

pub(crate) struct RobotRule {
    when: String,
    equals: Option<String>,
    pub name: Option<String>,
    pub manufacturer: Option<String>,
}

impl RobotRule {
    pub fn matches(&self, raw: &RawResult) -> bool {
        match &self.equals {
            Some(expected) => raw
                .get_str(&self.when)
                .is_some_and(|v| v.eq_ignore_ascii_case(expected)),
            None => raw.is_truthy(&self.when),
        }
    }
}

/// A compiled, validated field mapping for one engine.
pub struct MappingTable {
    pub(crate) engine: String,
    pub(crate) rules: Vec<Rule>,
    pub(crate) robot: Option<RobotRule>,
}

impl MappingTable {
    pub fn from_yaml(content: &str) -> Result<Self> {
        let entry: TableEntry = serde_yaml::from_str(content)?;
        Self::compile(entry)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn engine(&self) -> &str {
        &self.engine
    }

    fn compile(entry: TableEntry) -> Result<Self> {
        let rules = entry
            .rules
            .into_iter()
            .map(|rule| compile_rule(&entry.engine, rule))
            .collect::<Result<Vec<_>>>()?;
        let robot = entry.robot.map(|r| RobotRule {
            when: r.when,
            equals: r.equals,
            name: r.name,
            manufacturer: r.manufacturer,
        });
        Ok(Self {
            engine: entry.engine,
            rules,
            robot,
        })
    }
}

fn compile_rule(engine: &str, rule: RuleEntry) -> Result<Rule> {
    let source = match (rule.path, rule.parts, rule.value) {
        (Some(path), None, None) => Source::Path(path),
        (None, Some(parts), None) if !parts.is_empty() && parts.len() <= 4 => Source::Parts(parts),
        (None, None, Some(value)) => Source::Const(value),
        _ => {
            return Err(Error::Config(format!(
                "{engine}: rule for {} needs exactly one of path, parts (1-4 entries) or value",
                rule.field.as_str()
            )))
        }
    };
    let extract = match rule.regex {
        Some(pattern) => Some(Extract {
            regex: Regex::new(&pattern)?,
            template: rule.template,
        }),
        None if rule.template.is_some() => {
            return Err(Error::Config(format!(
                "{engine}: template for {} without a regex",
                rule.field.as_str()
            )))
        }
        None => None,
    };
    Ok(Rule {
        field: rule.field,
        source,
        extract,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_ambiguous_rule() {
        let err = MappingTable::from_yaml(
            "engine: x\nrules:\n  - field: browser.name\n    path: a\n    value: b\n",
        );
        assert!(matches!(err, Err(Error::Config(_))));
    }

    #[test]
    fn rejects_bad_regex() {
        let err = MappingTable::from_yaml(
            "engine: x\nrules:\n  - field: browser.name\n    path: a\n    regex: '(unclosed'\n",
        );
        assert!(matches!(err, Err(Error::Regex(_))));
    }

    #[test]
    fn rejects_unknown_field() {
        let err = MappingTable::from_yaml("engine: x\nrules:\n  - field: browser.colour\n    path: a\n");
        assert!(matches!(err, Err(Error::YAML(_))));
    }

    #[test]
    fn extraction_without_template_takes_first_group() {
        let table = MappingTable::from_yaml(
            "engine: x\nrules:\n  - field: browser.name\n    path: ua\n    regex: '^(\\w+)/'\n",
        )
        .unwrap();
        let v = json!({"ua": "Firefox/121.0"});
        let raw = RawResult::new(Some(&v));
        assert_eq!(table.rules[0].resolve_text(&raw).as_deref(), Some("Firefox"));
        let v = json!({"ua": "no slash here"});
        let raw = RawResult::new(Some(&v));
        assert_eq!(table.rules[0].resolve_text(&raw), None);
    }

    #[test]
    fn version_parts() {
        let table = MappingTable::from_yaml(
            "engine: x\nrules:\n  - field: os.version\n    parts: [os.major, os.minor, os.patch]\n",
        )
        .unwrap();
        let v = json!({"os": {"major": "10", "minor": "15", "patch": null}});
        let raw = RawResult::new(Some(&v));
        let version = table.rules[0].resolve_version(&raw).unwrap();
        assert_eq!(version.major.as_deref(), Some("10"));
        assert_eq!(version.minor.as_deref(), Some("15"));
        assert_eq!(version.micro, None);
    }

    #[test]
    fn robot_rule_with_and_without_equals() {
        let flag = RobotRule {
            when: "Crawler".into(),
            equals: None,
            name: None,
            manufacturer: None,
        };
        let by_value = RobotRule {
            when: "device.family".into(),
            equals: Some("spider".into()),
            name: None,
            manufacturer: None,
        };
        let v = json!({"Crawler": "true", "device": {"family": "Spider"}});
        assert!(flag.matches(&RawResult::new(Some(&v))));
        assert!(by_value.matches(&RawResult::new(Some(&v))));
        let v = json!({"Crawler": "false", "device": {"family": "iPhone"}});
        assert!(!flag.matches(&RawResult::new(Some(&v))));
        assert!(!by_value.matches(&RawResult::new(Some(&v))));
    }
}
