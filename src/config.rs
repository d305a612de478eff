use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::comparator::Comparator;
use crate::error::{Error, Result};
use crate::line::LineAggregator;
use crate::mapper::{AliasNames, IdentityNames, MapperSet, NameMapper, TableMapper};
use crate::registry::PropertyRegistry;
use crate::report::RunReporter;
use crate::snapshot::{engine_file, BENCH_FILE};

pub const DEFAULT_COLUMN_WIDTH: usize = 20;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// One engine under test.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineSettings {
    pub id: String,
    /// Built-in mapping table name, or a path to a YAML mapping table.
    /// Defaults to the engine id.
    #[serde(default)]
    pub mapping: Option<String>,
    /// Detector command for `parse` runs.  The agent string is appended as
    /// the last argument; stdout must be JSON.
    #[serde(default)]
    pub command: Vec<String>,
}

impl EngineSettings {
    pub fn mapping(&self) -> &str {
        self.mapping.as_deref().unwrap_or(&self.id)
    }
}

/// Everything a run needs, threaded explicitly through the pipeline.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Width of one engine column in detail tables.
    pub column_width: usize,
    /// Reference engine id; defaults to the first configured engine.
    pub reference: Option<String>,
    pub engines: Vec<EngineSettings>,
    /// Compared property labels, in order.  Empty means all of them.
    pub properties: Vec<String>,
    /// Property labels to build value frequency tables for.
    pub frequencies: Vec<String>,
    /// YAML alias table handed to every mapper.
    pub aliases: Option<PathBuf>,
    /// Worker threads for agent processing; 0 lets rayon decide.
    pub workers: usize,
    pub timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            column_width: DEFAULT_COLUMN_WIDTH,
            reference: None,
            engines: Vec::new(),
            properties: Vec::new(),
            frequencies: Vec::new(),
            aliases: None,
            workers: 0,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Settings {
    pub fn from_yaml(content: &str) -> Result<Self> {
        let settings: Self = serde_yaml::from_str(content)?;
        settings.validate()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let mut settings = Self::from_yaml(&content)?;
        // Relative alias paths are relative to the settings file.
        if let (Some(aliases), Some(dir)) = (&settings.aliases, path.parent()) {
            if aliases.is_relative() {
                settings.aliases = Some(dir.join(aliases));
            }
        }
        Ok(settings)
    }

    /// Check engine ids and move the reference engine to the front.
    fn validate(mut self) -> Result<Self> {
        if self.engines.is_empty() {
            return Err(Error::Config("no engines configured".into()));
        }
        for (i, engine) in self.engines.iter().enumerate() {
            if engine.id.trim().is_empty() {
                return Err(Error::Config(format!("engine #{} has an empty id", i + 1)));
            }
            if self.engines[..i].iter().any(|e| e.id == engine.id) {
                return Err(Error::Config(format!("duplicate engine id {}", engine.id)));
            }
        }
        // Every engine needs its own snapshot file next to the bench summary.
        let mut files: HashMap<String, &str> = HashMap::new();
        for engine in &self.engines {
            let file = engine_file(&engine.id);
            if file == BENCH_FILE {
                return Err(Error::Config(format!("engine id {} is reserved", engine.id)));
            }
            if let Some(other) = files.insert(file, &engine.id) {
                return Err(Error::Config(format!(
                    "engine ids {other} and {} share a snapshot file",
                    engine.id
                )));
            }
        }
        if let Some(reference) = &self.reference {
            let pos = self
                .engines
                .iter()
                .position(|e| &e.id == reference)
                .ok_or_else(|| Error::Config(format!("reference engine {reference} not configured")))?;
            let engine = self.engines.remove(pos);
            self.engines.insert(0, engine);
        }
        if self.column_width < 4 {
            return Err(Error::Config("column_width must be at least 4".into()));
        }
        self.frequency_labels()?;
        Ok(self)
    }

    pub fn engine_ids(&self) -> Vec<String> {
        self.engines.iter().map(|e| e.id.clone()).collect()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn registry(&self) -> Result<PropertyRegistry> {
        if self.properties.is_empty() {
            Ok(PropertyRegistry::default())
        } else {
            PropertyRegistry::select(&self.properties)
        }
    }

    /// Frequency labels resolved against the compared properties.
    pub fn frequency_labels(&self) -> Result<Vec<&'static str>> {
        let registry = self.registry()?;
        self.frequencies
            .iter()
            .map(|label| {
                registry
                    .get(label)
                    .map(|p| p.label)
                    .ok_or_else(|| Error::UnknownProperty(label.clone()))
            })
            .collect()
    }

    pub fn reporter(&self) -> Result<RunReporter> {
        Ok(RunReporter::with_frequencies(&self.frequency_labels()?))
    }

    pub fn aggregator(&self) -> Result<LineAggregator> {
        Ok(LineAggregator::new(
            self.registry()?,
            Comparator::new(self.column_width),
        ))
    }

    pub fn names(&self) -> Result<Arc<dyn NameMapper>> {
        Ok(match &self.aliases {
            Some(path) => Arc::new(AliasNames::from_file(path)?),
            None => Arc::new(IdentityNames),
        })
    }

    pub fn mappers(&self) -> Result<MapperSet> {
        let names = self.names()?;
        let mut set = MapperSet::new();
        for engine in &self.engines {
            let mapper = TableMapper::load(engine.mapping(), names.clone())?;
            tracing::debug!(engine = %engine.id, mapping = engine.mapping(), "mapper loaded");
            set.insert(engine.id.clone(), Arc::new(mapper));
        }
        Ok(set)
    }

    pub fn thread_pool(&self) -> Result<rayon::ThreadPool> {
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("ua-compare-{i}"))
            .build()
            .map_err(|e| Error::Config(format!("worker pool: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
column_width: 16
reference: browscap
engines:
  - id: matomo
    command: [php, bin/matomo.php]
  - id: browscap
  - id: uap-python
    mapping: uap
frequencies: [Device Brand]
"#;

    #[test]
    fn reference_moves_first() {
        let settings = Settings::from_yaml(YAML).unwrap();
        assert_eq!(settings.engine_ids(), vec!["browscap", "matomo", "uap-python"]);
        assert_eq!(settings.column_width, 16);
        assert_eq!(settings.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(settings.engines[1].command, vec!["php", "bin/matomo.php"]);
        assert_eq!(settings.engines[2].mapping(), "uap");
    }

    #[test]
    fn bench_is_a_reserved_engine_id() {
        let err = Settings::from_yaml("engines:\n  - id: matomo\n  - id: bench\n    mapping: browscap\n");
        assert!(matches!(err, Err(Error::Config(_))));
    }

    #[test]
    fn ids_sharing_a_snapshot_file_are_rejected() {
        let err = Settings::from_yaml("engines:\n  - id: a/b\n    mapping: uap\n  - id: a_b\n    mapping: uap\n");
        assert!(matches!(err, Err(Error::Config(_))));
    }

    #[test]
    fn frequency_labels_resolve_like_properties() {
        let settings = Settings::from_yaml(
            "properties: [browser, os]\nfrequencies: [BROWSER]\nengines:\n  - id: matomo\n",
        )
        .unwrap();
        assert_eq!(settings.frequency_labels().unwrap(), vec!["Browser"]);

        let reporter = settings.reporter().unwrap();
        let mut chrome = crate::types::Detection::unknown("ua");
        chrome.browser.name = Some("Chrome".into());
        let line = settings
            .aggregator()
            .unwrap()
            .aggregate("ua", &[crate::line::EngineDetection::new("matomo", chrome)]);
        reporter.record(&line);
        assert_eq!(reporter.frequencies("Browser"), vec![("Chrome".to_string(), 1)]);
    }

    #[test]
    fn frequency_label_outside_properties_is_an_error() {
        let err = Settings::from_yaml(
            "properties: [Browser]\nfrequencies: [Device Brand]\nengines:\n  - id: matomo\n",
        );
        assert!(matches!(err, Err(Error::UnknownProperty(l)) if l == "Device Brand"));
    }

    #[test]
    fn mappers_follow_engine_order() {
        let settings = Settings::from_yaml(YAML).unwrap();
        let mappers = settings.mappers().unwrap();
        let ids: Vec<_> = mappers.engines().collect();
        assert_eq!(ids, vec!["browscap", "matomo", "uap-python"]);
    }

    #[test]
    fn rejects_bad_settings() {
        assert!(matches!(Settings::from_yaml("engines: []"), Err(Error::Config(_))));
        assert!(matches!(
            Settings::from_yaml("reference: x\nengines:\n  - id: a\n"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Settings::from_yaml("engines:\n  - id: a\n  - id: a\n"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Settings::from_yaml("column_width: 2\nengines:\n  - id: a\n"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn unknown_property_is_an_error() {
        let settings =
            Settings::from_yaml("properties: [Browser, Flavour]\nengines:\n  - id: matomo\n").unwrap();
        assert!(matches!(settings.registry(), Err(Error::UnknownProperty(_))));
    }
}
