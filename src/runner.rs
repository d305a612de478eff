//! The `parse` and `compare` pipelines.

use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use parking_lot::Mutex;
use rayon::prelude::*;
use serde_json::Value;

use crate::adapter::{detect_all, Adapter, ProcessAdapter, Status};
use crate::config::Settings;
use crate::corpus::CorpusProvider;
use crate::error::Result;
use crate::line::{EngineDetection, LineAggregator, LineClass, LineReport};
use crate::mapper::MapperSet;
use crate::report::{RunReporter, RunSummary};
use crate::snapshot::{Bench, BenchEntry, Snapshot, SnapshotStore};

/// Shared stop flag.  Once cancelled, no further agent is started; agents
/// already in flight run to completion.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Mappers plus aggregator: raw per-engine results in, classified line out.
pub struct Pipeline {
    engines: Vec<String>,
    mappers: MapperSet,
    aggregator: LineAggregator,
}

impl Pipeline {
    /// `engines` is the comparison order; the first one is the reference.
    pub fn new(engines: Vec<String>, mappers: MapperSet, aggregator: LineAggregator) -> Self {
        Self {
            engines,
            mappers,
            aggregator,
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self::new(
            settings.engine_ids(),
            settings.mappers()?,
            settings.aggregator()?,
        ))
    }

    pub fn engines(&self) -> &[String] {
        &self.engines
    }

    /// Map each engine's raw result and compare them.  Engines missing from
    /// `raws` are compared as unknown.
    pub fn compare(&self, agent: &str, raws: &[(String, Option<Value>)]) -> LineReport {
        let results: Vec<EngineDetection> = self
            .engines
            .iter()
            .map(|engine| {
                let raw = raws
                    .iter()
                    .find(|(id, _)| id == engine)
                    .and_then(|(_, raw)| raw.as_ref());
                EngineDetection::new(engine.clone(), self.mappers.map(engine, raw, agent))
            })
            .collect();
        self.aggregator.aggregate(agent, &results)
    }
}

/// Writes per-line output: a progress marker for agreeing lines, the full
/// detail table otherwise.  Each table is written whole.
pub struct LineWriter<W: Write + Send> {
    out: Mutex<W>,
    tables_only: bool,
}

impl<W: Write + Send> LineWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
            tables_only: false,
        }
    }

    /// Suppress progress markers.
    pub fn tables_only(mut self) -> Self {
        self.tables_only = true;
        self
    }

    pub fn emit(&self, line: &LineReport) {
        let mut out = self.out.lock();
        let written = match line.class {
            LineClass::Agreement if self.tables_only => Ok(()),
            LineClass::Agreement => write!(out, "{}", line.class.marker()),
            _ => write!(out, "\n{}", line.render_table()),
        };
        if let Err(e) = written.and_then(|_| out.flush()) {
            tracing::warn!(error = %e, "could not write report line");
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

/// Totals of a `parse` run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseSummary {
    pub agents: usize,
    pub adapter_failures: usize,
    pub write_failures: usize,
}

/// Build a process adapter for every engine that has a detector command.
pub fn adapters_from_settings(settings: &Settings) -> Result<Vec<Arc<dyn Adapter>>> {
    let mut adapters: Vec<Arc<dyn Adapter>> = Vec::new();
    for engine in &settings.engines {
        if engine.command.is_empty() {
            tracing::warn!(engine = %engine.id, "no detector command, skipped for parsing");
            continue;
        }
        adapters.push(Arc::new(ProcessAdapter::new(
            engine.id.clone(),
            &engine.command,
            settings.timeout(),
        )?));
    }
    Ok(adapters)
}

/// Run every adapter over the corpus and persist one snapshot per
/// (agent, engine) plus a `bench.json` per agent.
pub fn run_parse(
    settings: &Settings,
    adapters: &[Arc<dyn Adapter>],
    corpus: &dyn CorpusProvider,
    store: &SnapshotStore,
    cancel: &CancellationToken,
) -> Result<ParseSummary> {
    let agents = corpus.agents()?;
    let pool = settings.thread_pool()?;
    let timeout = settings.timeout();
    tracing::info!(agents = agents.len(), engines = adapters.len(), "parse started");

    let processed = AtomicUsize::new(0);
    let adapter_failures = AtomicUsize::new(0);
    let write_failures = AtomicUsize::new(0);

    pool.install(|| {
        agents.par_iter().for_each(|agent| {
            if cancel.is_cancelled() {
                return;
            }
            let detected = detect_all(adapters, agent, timeout);
            let mut bench = Bench {
                ua: agent.clone(),
                engines: IndexMap::new(),
            };
            for d in detected {
                if d.status != Status::Ok {
                    adapter_failures.fetch_add(1, Ordering::Relaxed);
                }
                let snapshot = Snapshot {
                    ua: agent.clone(),
                    result: d.raw,
                    time: d.elapsed.as_secs_f64(),
                    memory: d.memory,
                };
                bench.engines.insert(
                    d.engine.clone(),
                    BenchEntry {
                        time: snapshot.time,
                        memory: snapshot.memory,
                    },
                );
                if let Err(e) = store.store(&d.engine, &snapshot) {
                    tracing::error!(engine = %d.engine, %agent, error = %e, "could not store snapshot");
                    write_failures.fetch_add(1, Ordering::Relaxed);
                }
            }
            if let Err(e) = store.store_bench(&bench) {
                tracing::error!(%agent, error = %e, "could not store bench summary");
                write_failures.fetch_add(1, Ordering::Relaxed);
            }
            processed.fetch_add(1, Ordering::Relaxed);
        });
    });

    let summary = ParseSummary {
        agents: processed.into_inner(),
        adapter_failures: adapter_failures.into_inner(),
        write_failures: write_failures.into_inner(),
    };
    tracing::info!(?summary, "parse finished");
    Ok(summary)
}

/// Load every persisted agent, compare its engines and feed the reporter.
/// Agents with malformed snapshots are logged and skipped.
pub fn run_compare<W: Write + Send>(
    settings: &Settings,
    pipeline: &Pipeline,
    store: &SnapshotStore,
    reporter: &RunReporter,
    writer: &LineWriter<W>,
    cancel: &CancellationToken,
) -> Result<RunSummary> {
    let dirs = store.agent_dirs()?;
    let pool = settings.thread_pool()?;
    tracing::info!(agents = dirs.len(), engines = pipeline.engines().len(), "compare started");

    pool.install(|| {
        dirs.par_iter().for_each(|dir| {
            if cancel.is_cancelled() {
                return;
            }
            match store.load_agent(dir, pipeline.engines()) {
                Ok(snapshots) => {
                    let line = pipeline.compare(&snapshots.agent, &snapshots.results);
                    reporter.record(&line);
                    writer.emit(&line);
                }
                Err(e) => {
                    tracing::error!(dir = %dir.display(), error = %e, "skipping agent");
                    reporter.record_skipped();
                }
            }
        });
    });

    Ok(reporter.summary())
}

/// Detect and compare in one go, without touching disk.
pub fn run_live<W: Write + Send>(
    settings: &Settings,
    pipeline: &Pipeline,
    adapters: &[Arc<dyn Adapter>],
    corpus: &dyn CorpusProvider,
    reporter: &RunReporter,
    writer: &LineWriter<W>,
    cancel: &CancellationToken,
) -> Result<RunSummary> {
    let agents = corpus.agents()?;
    let pool = settings.thread_pool()?;
    let timeout: Duration = settings.timeout();

    pool.install(|| {
        agents.par_iter().for_each(|agent| {
            if cancel.is_cancelled() {
                return;
            }
            let raws: Vec<(String, Option<Value>)> = detect_all(adapters, agent, timeout)
                .into_iter()
                .map(|d| (d.engine, d.raw))
                .collect();
            let line = pipeline.compare(agent, &raws);
            reporter.record(&line);
            writer.emit(&line);
        });
    });

    Ok(reporter.summary())
}
