//! Cross-validation of user-agent detection engines.
//!
//! Each engine's raw output is mapped into one canonical [`Detection`] by a
//! table-driven [`mapper::Mapper`], then every property in the
//! [`registry::PropertyRegistry`] is compared against the reference engine
//! by the [`comparator`].  [`line::LineAggregator`] rolls verdicts up per
//! agent and [`report::RunReporter`] per run.

pub mod adapter;
pub mod comparator;
pub mod config;
pub mod corpus;
mod error;
pub mod line;
pub mod mapper;
mod raw;
pub mod registry;
pub mod report;
pub mod runner;
pub mod snapshot;
mod types;

pub use comparator::{Comparator, FieldValue, Verdict};
pub use config::Settings;
pub use error::{Error, Result};
pub use line::{EngineDetection, LineAggregator, LineClass, LineReport};
pub use raw::RawResult;
pub use registry::PropertyRegistry;
pub use report::{RunReporter, RunSummary};
pub use types::*;
