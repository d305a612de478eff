//! Sources of agent strings.

use std::path::{Path, PathBuf};

use indexmap::IndexSet;
use serde::Deserialize;

use crate::error::Result;

/// Produces the agent strings for a run.  Calling [`agents`] twice must
/// yield the same sequence; duplicates are removed, first occurrence wins.
///
/// [`agents`]: CorpusProvider::agents
pub trait CorpusProvider: Send + Sync {
    fn agents(&self) -> Result<Vec<String>>;
}

/// Surrounding whitespace only matters for blank detection and duplicate
/// keys; the agent itself is kept byte for byte.
fn dedup(agents: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = IndexSet::new();
    agents
        .into_iter()
        .filter(|a| {
            let key = a.trim();
            !key.is_empty() && seen.insert(key.to_string())
        })
        .collect()
}

/// In-memory list.
#[derive(Debug, Clone, Default)]
pub struct ListCorpus(pub Vec<String>);

impl CorpusProvider for ListCorpus {
    fn agents(&self) -> Result<Vec<String>> {
        Ok(dedup(self.0.iter().cloned()))
    }
}

/// Plain text file, one agent per line.  Blank lines and lines starting
/// with `#` are skipped.
#[derive(Debug, Clone)]
pub struct TextCorpus {
    path: PathBuf,
}

impl TextCorpus {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CorpusProvider for TextCorpus {
    fn agents(&self) -> Result<Vec<String>> {
        let content = std::fs::read_to_string(&self.path)?;
        Ok(dedup(
            content
                .lines()
                .filter(|line| !line.trim_start().starts_with('#'))
                .map(str::to_string),
        ))
    }
}

#[derive(Debug, Deserialize)]
struct FixtureEntry {
    #[serde(alias = "user_agent_string")]
    user_agent: String,
}

/// Matomo fixtures are a bare list, uap-core fixtures wrap it in
/// `test_cases`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FixtureFile {
    List(Vec<FixtureEntry>),
    Cases { test_cases: Vec<FixtureEntry> },
}

/// YAML fixture file whose entries carry a `user_agent` (or
/// `user_agent_string`) key.  Other keys are ignored.
#[derive(Debug, Clone)]
pub struct FixtureCorpus {
    path: PathBuf,
}

impl FixtureCorpus {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CorpusProvider for FixtureCorpus {
    fn agents(&self) -> Result<Vec<String>> {
        let content = std::fs::read_to_string(&self.path)?;
        let entries = match serde_yaml::from_str::<FixtureFile>(&content)? {
            FixtureFile::List(entries) => entries,
            FixtureFile::Cases { test_cases } => test_cases,
        };
        Ok(dedup(entries.into_iter().map(|e| e.user_agent)))
    }
}

/// Several providers in sequence, de-duplicated across all of them.
#[derive(Default)]
pub struct ChainCorpus {
    providers: Vec<Box<dyn CorpusProvider>>,
}

impl ChainCorpus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, provider: Box<dyn CorpusProvider>) {
        self.providers.push(provider);
    }

    /// `.yml`/`.yaml` files are read as fixtures, anything else as text.
    pub fn from_paths<P: AsRef<Path>>(paths: &[P]) -> Self {
        let mut chain = Self::new();
        for path in paths {
            let path = path.as_ref();
            let is_yaml = matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("yml" | "yaml")
            );
            if is_yaml {
                chain.push(Box::new(FixtureCorpus::new(path)));
            } else {
                chain.push(Box::new(TextCorpus::new(path)));
            }
        }
        chain
    }
}

impl CorpusProvider for ChainCorpus {
    fn agents(&self) -> Result<Vec<String>> {
        let mut all = Vec::new();
        for provider in &self.providers {
            all.extend(provider.agents()?);
        }
        Ok(dedup(all))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn list_dedups_in_order() {
        let corpus = ListCorpus(vec!["b".into(), "a".into(), "b".into(), "  ".into(), "a ".into()]);
        assert_eq!(corpus.agents().unwrap(), vec!["b", "a"]);
    }

    #[test]
    fn agents_are_not_trimmed() {
        let corpus = ListCorpus(vec![" Mozilla/5.0 A ".into(), "Mozilla/5.0 A".into(), "curl/8.0\t".into()]);
        assert_eq!(corpus.agents().unwrap(), vec![" Mozilla/5.0 A ", "curl/8.0\t"]);
    }

    #[test]
    fn text_file_skips_comments() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# header\nMozilla/5.0 A\n\nMozilla/5.0 B\nMozilla/5.0 A").unwrap();
        let corpus = TextCorpus::new(file.path());
        assert_eq!(corpus.agents().unwrap(), vec!["Mozilla/5.0 A", "Mozilla/5.0 B"]);
        assert_eq!(corpus.agents().unwrap(), corpus.agents().unwrap());
    }

    #[test]
    fn fixture_shapes() {
        let dir = tempfile::tempdir().unwrap();
        let matomo = dir.path().join("bots.yml");
        std::fs::write(
            &matomo,
            "- user_agent: Googlebot/2.1\n  bot:\n    name: Googlebot\n- user_agent: curl/8.0\n",
        )
        .unwrap();
        let uap = dir.path().join("test_ua.yaml");
        std::fs::write(
            &uap,
            "test_cases:\n  - user_agent_string: curl/8.0\n    family: curl\n  - user_agent_string: Wget/1.21\n",
        )
        .unwrap();

        assert_eq!(
            FixtureCorpus::new(&matomo).agents().unwrap(),
            vec!["Googlebot/2.1", "curl/8.0"]
        );
        let chain = ChainCorpus::from_paths(&[matomo, uap]);
        assert_eq!(chain.agents().unwrap(), vec!["Googlebot/2.1", "curl/8.0", "Wget/1.21"]);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(TextCorpus::new("/nonexistent/agents.txt").agents().is_err());
    }
}
