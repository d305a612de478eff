use std::path::Path;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use fixtures::fixtures;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{json, Value};

use ua_comparator::adapter::{Adapter, AdapterOutput, StaticAdapter};
use ua_comparator::corpus::ListCorpus;
use ua_comparator::runner::{run_compare, run_live, run_parse, CancellationToken, LineWriter, Pipeline};
use ua_comparator::snapshot::SnapshotStore;
use ua_comparator::{LineClass, RunReporter, Settings, Verdict};

const SETTINGS: &str = "tests/fixtures/settings.yml";

static SETTINGS_INSTANCE: OnceLock<Settings> = OnceLock::new();

fn shared_settings() -> &'static Settings {
    SETTINGS_INSTANCE.get_or_init(|| Settings::load(SETTINGS).expect("failed to load settings"))
}

fn make_pipeline() -> Pipeline {
    Pipeline::from_settings(shared_settings()).expect("failed to build pipeline")
}

// ---------------------------------------------------------------------------
// Scenario fixtures
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ExpectedVerdict {
    Match,
    Mismatch,
}

impl PartialEq<Verdict> for ExpectedVerdict {
    fn eq(&self, other: &Verdict) -> bool {
        matches!(
            (self, other),
            (Self::Match, Verdict::Match) | (Self::Mismatch, Verdict::Mismatch)
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ExpectedClass {
    Agreement,
    Disagreement,
}

#[derive(Debug, Deserialize)]
struct Scenario {
    user_agent: String,
    #[serde(default)]
    raw: IndexMap<String, Value>,
    class: ExpectedClass,
    #[serde(default)]
    verdicts: IndexMap<String, Vec<ExpectedVerdict>>,
}

#[fixtures(["tests/fixtures/scenarios/*.yml"])]
#[test]
fn test_scenario_fixtures(path: &Path) {
    let pipeline = make_pipeline();
    let content = std::fs::read_to_string(path).unwrap();
    let scenarios: Vec<Scenario> = serde_yaml::from_str(&content).unwrap();

    for s in &scenarios {
        let raws: Vec<(String, Option<Value>)> = s
            .raw
            .iter()
            .map(|(engine, value)| (engine.clone(), Some(value.clone())))
            .collect();
        let line = pipeline.compare(&s.user_agent, &raws);

        let expected_class = match s.class {
            ExpectedClass::Agreement => LineClass::Agreement,
            ExpectedClass::Disagreement => LineClass::Disagreement,
        };
        assert_eq!(
            line.class,
            expected_class,
            "class mismatch for UA: {}\n{}",
            s.user_agent,
            line.render_table()
        );

        for (label, expected) in &s.verdicts {
            let row = line
                .rows
                .iter()
                .find(|r| r.label == label.as_str())
                .unwrap_or_else(|| panic!("no row {label}"));
            let actual: Vec<Verdict> = row.cells.iter().map(|c| c.verdict).collect();
            assert!(
                expected.len() == actual.len() && expected.iter().zip(&actual).all(|(e, a)| e == a),
                "{label} verdicts for UA {}: expected {expected:?}, got {actual:?}\n{}",
                s.user_agent,
                line.render_table()
            );
        }
    }
}

#[test]
fn comparing_is_idempotent() {
    let pipeline = make_pipeline();
    let raws = vec![
        ("matomo".to_string(), Some(json!({"client": {"name": "Firefox"}}))),
        ("browscap".to_string(), Some(json!({"Browser": "Firefox Mobile"}))),
    ];
    let first = pipeline.compare("ua", &raws);
    for _ in 0..5 {
        let again = pipeline.compare("ua", &raws);
        assert_eq!(again.class, first.class);
        assert_eq!(again.render_table(), first.render_table());
    }
}

#[test]
fn all_null_results_agree() {
    let pipeline = make_pipeline();
    let line = pipeline.compare(
        "ua",
        &[
            ("matomo".to_string(), None),
            ("browscap".to_string(), Some(Value::Null)),
            ("uap".to_string(), None),
        ],
    );
    assert_eq!(line.class, LineClass::Agreement);
    assert!(line.rows.iter().all(|r| r.values.iter().all(|v| v.is_null())));
}

// ---------------------------------------------------------------------------
// Run-level aggregation
// ---------------------------------------------------------------------------

fn adapters(disagreeing: &[usize], total: usize) -> Vec<Arc<dyn Adapter>> {
    let mut matomo = StaticAdapter::new("matomo");
    let mut browscap = StaticAdapter::new("browscap");
    for i in 0..total {
        let agent = format!("Agent/{i}");
        matomo = matomo.with(&agent, json!({"client": {"name": "Chrome"}}));
        let name = if disagreeing.contains(&i) { "Edge" } else { "chrome" };
        browscap = browscap.with(&agent, json!({"Browser": name}));
    }
    vec![Arc::new(matomo), Arc::new(browscap)]
}

fn corpus(total: usize) -> ListCorpus {
    ListCorpus((0..total).map(|i| format!("Agent/{i}")).collect())
}

#[test]
fn reporter_counts_disagreeing_agents() {
    let settings = shared_settings();
    let pipeline = make_pipeline();
    let reporter = settings.reporter().unwrap();
    let writer = LineWriter::new(Vec::new());

    let summary = run_live(
        settings,
        &pipeline,
        &adapters(&[1, 4, 7], 10),
        &corpus(10),
        &reporter,
        &writer,
        &CancellationToken::new(),
    )
    .unwrap();

    assert_eq!(summary.total, 10);
    assert_eq!(summary.disagreement, 3);
    assert_eq!(summary.agreement, 7);
    assert_eq!(summary.inconclusive, 0);

    let output = String::from_utf8(writer.into_inner()).unwrap();
    assert!(output.matches('.').count() >= 7);
    assert_eq!(output.matches("-Edge").count(), 3);

    let browsers = reporter.frequencies("Browser");
    assert_eq!(browsers[0], ("Chrome".to_string(), 10));
}

// ---------------------------------------------------------------------------
// Parse, persist, compare
// ---------------------------------------------------------------------------

struct Hanging;

impl Adapter for Hanging {
    fn id(&self) -> &str {
        "uap"
    }

    fn detect(&self, _agent: &str) -> ua_comparator::Result<AdapterOutput> {
        std::thread::sleep(Duration::from_secs(3));
        Ok(AdapterOutput {
            result: Some(json!({"user_agent": {"family": "Opera"}})),
            memory: 0,
        })
    }
}

#[test]
fn parse_then_compare_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = SnapshotStore::new(dir.path());
    let settings = Settings::from_yaml(
        "reference: matomo\ntimeout_secs: 1\nworkers: 2\nengines:\n  - id: matomo\n  - id: browscap\n  - id: uap\n",
    )
    .unwrap();

    let mut adapters = adapters(&[2], 4);
    adapters.push(Arc::new(Hanging));
    let cancel = CancellationToken::new();

    let parsed = run_parse(&settings, &adapters, &corpus(4), &store, &cancel).unwrap();
    assert_eq!(parsed.agents, 4);
    assert_eq!(parsed.adapter_failures, 4);
    assert_eq!(parsed.write_failures, 0);

    let agent_dir = store.agent_dir("Agent/0");
    assert!(agent_dir.join("bench.json").is_file());
    let timed_out = store.load(&agent_dir, "uap").unwrap().unwrap();
    assert_eq!(timed_out.result, None);

    // One broken snapshot only costs its own agent.
    std::fs::write(store.agent_dir("Agent/3").join("browscap.json"), "{").unwrap();

    let pipeline = Pipeline::from_settings(&settings).unwrap();
    let reporter = RunReporter::new();
    let writer = LineWriter::new(Vec::new()).tables_only();
    let summary = run_compare(&settings, &pipeline, &store, &reporter, &writer, &cancel).unwrap();

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.total, 3);
    assert_eq!(summary.disagreement, 1);
    assert_eq!(summary.agreement, 2);

    let tables = String::from_utf8(writer.into_inner()).unwrap();
    assert!(tables.contains("Agent/2"));
    assert!(!tables.contains("Agent/0"));
}
