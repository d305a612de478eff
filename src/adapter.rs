//! Detector adapters and their concurrent, time-boxed invocation.

use std::io::Read;
use std::panic::{self, AssertUnwindSafe};
use std::process::{Command, Stdio};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::{Error, Result};

/// What an adapter hands back for one agent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdapterOutput {
    pub result: Option<Value>,
    /// Peak memory in bytes, if the adapter can tell.
    pub memory: u64,
}

/// Wraps one detection engine.
///
/// `detect` may fail or run late; [`detect_all`] turns both into a null raw
/// result.  It cannot stop a late call though: the call keeps its thread
/// until it returns.  Implementations must therefore bound their own
/// running time, as [`ProcessAdapter`] does by killing its child at the
/// timeout, or a hanging engine leaks one thread per agent.
pub trait Adapter: Send + Sync {
    fn id(&self) -> &str;
    fn detect(&self, agent: &str) -> Result<AdapterOutput>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Ok,
    Failed(String),
    TimedOut,
}

/// One adapter invocation, always complete: failures carry `raw: None`.
#[derive(Debug, Clone)]
pub struct Detected {
    pub engine: String,
    pub raw: Option<Value>,
    pub elapsed: Duration,
    pub memory: u64,
    pub status: Status,
}

impl Detected {
    fn failed(engine: &str, elapsed: Duration, status: Status) -> Self {
        Self {
            engine: engine.to_string(),
            raw: None,
            elapsed,
            memory: 0,
            status,
        }
    }
}

/// Run every adapter on `agent` concurrently, each on its own thread, and
/// collect the results in adapter order.  An adapter that has not answered
/// within `timeout` is reported as timed out; its thread is left to finish
/// on its own and its late answer is dropped (see [`Adapter`]).
pub fn detect_all(adapters: &[Arc<dyn Adapter>], agent: &str, timeout: Duration) -> Vec<Detected> {
    let (tx, rx) = mpsc::channel();
    let mut slots: Vec<Option<Detected>> = vec![None; adapters.len()];
    let mut pending = 0;

    for (idx, adapter) in adapters.iter().enumerate() {
        let adapter = Arc::clone(adapter);
        let agent = agent.to_string();
        let tx = tx.clone();
        let spawned = thread::Builder::new()
            .name(format!("adapter-{}", adapter.id()))
            .spawn(move || {
                let start = Instant::now();
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| adapter.detect(&agent)));
                let _ = tx.send((idx, start.elapsed(), outcome));
            });
        match spawned {
            Ok(_) => pending += 1,
            Err(e) => {
                slots[idx] = Some(Detected::failed(
                    adapters[idx].id(),
                    Duration::ZERO,
                    Status::Failed(format!("could not spawn adapter thread: {e}")),
                ));
            }
        }
    }
    drop(tx);

    let deadline = Instant::now() + timeout;
    while pending > 0 {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let (idx, elapsed, outcome) = match rx.recv_timeout(remaining) {
            Ok(received) => received,
            Err(_) => break,
        };
        pending -= 1;
        let engine = adapters[idx].id();
        slots[idx] = Some(match outcome {
            Ok(Ok(output)) => Detected {
                engine: engine.to_string(),
                raw: output.result,
                elapsed,
                memory: output.memory,
                status: Status::Ok,
            },
            Ok(Err(e)) => Detected::failed(engine, elapsed, Status::Failed(e.to_string())),
            Err(_) => Detected::failed(engine, elapsed, Status::Failed("adapter panicked".into())),
        });
    }

    slots
        .into_iter()
        .zip(adapters)
        .map(|(slot, adapter)| {
            let detected =
                slot.unwrap_or_else(|| Detected::failed(adapter.id(), timeout, Status::TimedOut));
            match &detected.status {
                Status::Ok => {}
                Status::Failed(reason) => {
                    tracing::warn!(engine = %detected.engine, agent, %reason, "adapter failed")
                }
                Status::TimedOut => {
                    tracing::warn!(engine = %detected.engine, agent, ?timeout, "adapter timed out")
                }
            }
            detected
        })
        .collect()
}

/// Canned answers keyed by agent, for replaying fixtures and for tests.
#[derive(Debug, Clone, Default)]
pub struct StaticAdapter {
    id: String,
    answers: IndexMap<String, Value>,
}

impl StaticAdapter {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            answers: IndexMap::new(),
        }
    }

    pub fn with(mut self, agent: impl Into<String>, result: Value) -> Self {
        self.answers.insert(agent.into(), result);
        self
    }
}

impl Adapter for StaticAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    fn detect(&self, agent: &str) -> Result<AdapterOutput> {
        Ok(AdapterOutput {
            result: self.answers.get(agent).cloned(),
            memory: 0,
        })
    }
}

/// Runs an external detector once per agent.  The agent is passed as the
/// last argument and stdout must hold JSON: either the raw result itself or
/// `{"result": ..., "memory": <bytes>}`.
#[derive(Debug, Clone)]
pub struct ProcessAdapter {
    id: String,
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

const POLL_INTERVAL: Duration = Duration::from_millis(10);

impl ProcessAdapter {
    pub fn new(id: impl Into<String>, command: &[String], timeout: Duration) -> Result<Self> {
        let id = id.into();
        let (program, args) = command.split_first().ok_or_else(|| {
            Error::Config(format!("engine {id}: empty detector command"))
        })?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            timeout,
            id,
        })
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::Adapter {
            engine: self.id.clone(),
            message: message.into(),
        }
    }

    fn run(&self, agent: &str) -> Result<Vec<u8>> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(agent)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // Drain both pipes off-thread so a chatty detector can't block on a
        // full pipe while we wait on it.
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let start = Instant::now();
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if start.elapsed() >= self.timeout {
                let _ = child.kill();
                let _ = child.wait();
                return Err(self.error(format!("killed after {:?}", self.timeout)));
            }
            thread::sleep(POLL_INTERVAL);
        };

        let collect = |handle: Option<thread::JoinHandle<Vec<u8>>>| {
            handle.and_then(|h| h.join().ok()).unwrap_or_default()
        };
        let stdout = collect(stdout);
        if !status.success() {
            let stderr = collect(stderr);
            return Err(self.error(format!(
                "exited with {status}: {}",
                String::from_utf8_lossy(&stderr).trim()
            )));
        }
        Ok(stdout)
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

impl Adapter for ProcessAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    fn detect(&self, agent: &str) -> Result<AdapterOutput> {
        let stdout = self.run(agent)?;
        let value: Value = serde_json::from_slice(&stdout)?;
        Ok(match value {
            Value::Object(mut map) if map.contains_key("result") => AdapterOutput {
                memory: map.get("memory").and_then(Value::as_u64).unwrap_or(0),
                result: map.remove("result").filter(|v| !v.is_null()),
            },
            Value::Null => AdapterOutput::default(),
            other => AdapterOutput {
                result: Some(other),
                memory: 0,
            },
        })
    }
}
