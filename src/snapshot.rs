//! On-disk snapshots: one JSON file per (agent, engine) plus a `bench.json`
//! per agent, grouped in a directory named after the agent's SHA-256.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

pub(crate) const BENCH_FILE: &str = "bench.json";

/// One engine's raw answer for one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub ua: String,
    pub result: Option<Value>,
    /// Seconds spent in the adapter.
    pub time: f64,
    /// Peak memory reported by the adapter, in bytes.
    pub memory: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BenchEntry {
    pub time: f64,
    pub memory: u64,
}

/// Timing and memory of every engine for one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bench {
    pub ua: String,
    pub engines: IndexMap<String, BenchEntry>,
}

/// All persisted raw results for one agent, in the requested engine order.
#[derive(Debug, Clone)]
pub struct AgentSnapshots {
    pub agent: String,
    /// `None` when the engine has no snapshot or its adapter failed.
    pub results: Vec<(String, Option<Value>)>,
}

pub fn agent_key(agent: &str) -> String {
    hex::encode(Sha256::digest(agent.as_bytes()))
}

/// Engine ids become file names; keep them to a safe alphabet.  Distinct
/// ids can share a file name (`a/b`, `a_b`), so settings reject those.
pub(crate) fn engine_file(engine: &str) -> String {
    let safe: String = engine
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' => c,
            _ => '_',
        })
        .collect();
    format!("{safe}.json")
}

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    root: PathBuf,
}

impl SnapshotStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn agent_dir(&self, agent: &str) -> PathBuf {
        self.root.join(agent_key(agent))
    }

    pub fn store(&self, engine: &str, snapshot: &Snapshot) -> Result<PathBuf> {
        let file = engine_file(engine);
        let dir = self.agent_dir(&snapshot.ua);
        if file == BENCH_FILE {
            return Err(Error::Snapshot {
                path: dir.join(file),
                message: format!("engine id {engine:?} clashes with the bench summary"),
            });
        }
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(file);
        write_json(&path, snapshot)?;
        Ok(path)
    }

    pub fn store_bench(&self, bench: &Bench) -> Result<PathBuf> {
        let dir = self.agent_dir(&bench.ua);
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(BENCH_FILE);
        write_json(&path, bench)?;
        Ok(path)
    }

    /// Load one engine's snapshot from an agent directory.  A missing file
    /// is `Ok(None)`, an unreadable one an error.
    pub fn load(&self, dir: &Path, engine: &str) -> Result<Option<Snapshot>> {
        let path = dir.join(engine_file(engine));
        if !path.is_file() {
            return Ok(None);
        }
        read_json(&path).map(Some)
    }

    pub fn load_bench(&self, dir: &Path) -> Result<Option<Bench>> {
        let path = dir.join(BENCH_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        read_json(&path).map(Some)
    }

    /// Every agent directory under the root, sorted for stable runs.
    pub fn agent_dirs(&self) -> Result<Vec<PathBuf>> {
        let mut dirs = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                dirs.push(entry.path());
            }
        }
        dirs.sort();
        Ok(dirs)
    }

    /// Load every engine's raw result for the agent stored in `dir`.
    ///
    /// The agent string comes from `bench.json`, or from the first engine
    /// snapshot if there is none.  Snapshots disagreeing on the agent are
    /// treated as malformed.
    pub fn load_agent(&self, dir: &Path, engines: &[String]) -> Result<AgentSnapshots> {
        let mut agent = self.load_bench(dir)?.map(|b| b.ua);
        let mut results = Vec::with_capacity(engines.len());

        for engine in engines {
            let snapshot = self.load(dir, engine)?;
            if let Some(snapshot) = &snapshot {
                if let Some(ua) = agent.as_deref().filter(|ua| *ua != snapshot.ua) {
                    return Err(Error::Snapshot {
                        path: dir.join(engine_file(engine)),
                        message: format!("agent differs from {ua:?}"),
                    });
                }
                if agent.is_none() {
                    agent = Some(snapshot.ua.clone());
                }
            }
            results.push((engine.clone(), snapshot.and_then(|s| s.result)));
        }

        let agent = agent.ok_or_else(|| Error::Snapshot {
            path: dir.to_path_buf(),
            message: "no snapshot names the agent".into(),
        })?;
        Ok(AgentSnapshots { agent, results })
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let reader = BufReader::new(File::open(path)?);
    serde_json::from_reader(reader).map_err(|e| Error::Snapshot {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(ua: &str, result: Option<Value>) -> Snapshot {
        Snapshot {
            ua: ua.to_string(),
            result,
            time: 0.25,
            memory: 1024,
        }
    }

    #[test]
    fn key_is_sha256_hex() {
        let key = agent_key("Mozilla/5.0");
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(key, agent_key("Mozilla/5.0"));
        assert_ne!(key, agent_key("Mozilla/4.0"));
    }

    #[test]
    fn store_and_load_agent() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        let ua = "Mozilla/5.0 TestBot/1.0";
        store
            .store("matomo", &snapshot(ua, Some(json!({"bot": {"name": "TestBot"}}))))
            .unwrap();
        store.store("browscap", &snapshot(ua, None)).unwrap();

        let dirs = store.agent_dirs().unwrap();
        assert_eq!(dirs, vec![store.agent_dir(ua)]);

        let engines = vec!["matomo".to_string(), "browscap".to_string(), "uap".to_string()];
        let loaded = store.load_agent(&dirs[0], &engines).unwrap();
        assert_eq!(loaded.agent, ua);
        assert_eq!(loaded.results[0].1, Some(json!({"bot": {"name": "TestBot"}})));
        assert_eq!(loaded.results[1].1, None);
        assert_eq!(loaded.results[2], ("uap".to_string(), None));

        let on_disk = store.load(&dirs[0], "matomo").unwrap().unwrap();
        assert_eq!(on_disk.time, 0.25);
        assert_eq!(on_disk.memory, 1024);
    }

    #[test]
    fn bench_names_the_agent() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        let mut engines = IndexMap::new();
        engines.insert("uap".to_string(), BenchEntry { time: 0.1, memory: 0 });
        store
            .store_bench(&Bench {
                ua: "curl/8.0".into(),
                engines,
            })
            .unwrap();
        let loaded = store
            .load_agent(&store.agent_dir("curl/8.0"), &["uap".to_string()])
            .unwrap();
        assert_eq!(loaded.agent, "curl/8.0");
        assert_eq!(loaded.results[0].1, None);
    }

    #[test]
    fn malformed_snapshot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        let agent_dir = store.agent_dir("ua");
        std::fs::create_dir_all(&agent_dir).unwrap();
        std::fs::write(agent_dir.join("matomo.json"), "{ not json").unwrap();
        let err = store.load_agent(&agent_dir, &["matomo".to_string()]);
        assert!(matches!(err, Err(Error::Snapshot { .. })));
    }

    #[test]
    fn empty_agent_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        let agent_dir = store.agent_dir("ua");
        std::fs::create_dir_all(&agent_dir).unwrap();
        assert!(store.load_agent(&agent_dir, &["matomo".to_string()]).is_err());
    }

    #[test]
    fn engine_cannot_overwrite_bench() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        let err = store.store("bench", &snapshot("ua", Some(json!({}))));
        assert!(matches!(err, Err(Error::Snapshot { .. })));
        assert!(!store.agent_dir("ua").join(BENCH_FILE).exists());
    }

    #[test]
    fn engine_ids_are_sanitized() {
        assert_eq!(engine_file("php/browscap 6"), "php_browscap_6.json");
    }
}
