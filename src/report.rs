use std::fmt::Write as _;
use std::sync::atomic::{AtomicUsize, Ordering};

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::Serialize;

use crate::comparator::{normalize, FieldValue};
use crate::line::{LineClass, LineReport};

/// Run-level totals.  Percentages are over processed lines; skipped agents
/// (unreadable snapshots) are counted separately.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub agreement: usize,
    pub disagreement: usize,
    pub inconclusive: usize,
    pub skipped: usize,
}

impl RunSummary {
    fn percent(&self, count: usize) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            count as f64 * 100.0 / self.total as f64
        }
    }

    pub fn agreement_percent(&self) -> f64 {
        self.percent(self.agreement)
    }

    pub fn disagreement_percent(&self) -> f64 {
        self.percent(self.disagreement)
    }

    pub fn inconclusive_percent(&self) -> f64 {
        self.percent(self.inconclusive)
    }
}

/// Accumulates line classifications across a run.  Safe to share between
/// worker threads.
#[derive(Debug, Default)]
pub struct RunReporter {
    agreement: AtomicUsize,
    disagreement: AtomicUsize,
    inconclusive: AtomicUsize,
    skipped: AtomicUsize,
    /// property label -> value -> count, only for tracked labels.
    frequencies: Mutex<IndexMap<String, IndexMap<String, usize>>>,
}

impl RunReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also tally the values seen for each of `labels`.
    pub fn with_frequencies<S: AsRef<str>>(labels: &[S]) -> Self {
        let tables = labels
            .iter()
            .map(|l| (l.as_ref().to_string(), IndexMap::new()))
            .collect();
        Self {
            frequencies: Mutex::new(tables),
            ..Self::default()
        }
    }

    pub fn record(&self, line: &LineReport) {
        let counter = match line.class {
            LineClass::Agreement => &self.agreement,
            LineClass::Disagreement => &self.disagreement,
            LineClass::Inconclusive => &self.inconclusive,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        let mut frequencies = self.frequencies.lock();
        if frequencies.is_empty() {
            return;
        }
        for row in &line.rows {
            let Some(table) = frequencies.get_mut(row.label) else {
                continue;
            };
            for value in row.values.iter().filter(|v| !v.is_null()) {
                if matches!(value, FieldValue::Text(s) if s.is_empty()) {
                    continue;
                }
                *table.entry(normalize(value)).or_default() += 1;
            }
        }
    }

    pub fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn summary(&self) -> RunSummary {
        let agreement = self.agreement.load(Ordering::Relaxed);
        let disagreement = self.disagreement.load(Ordering::Relaxed);
        let inconclusive = self.inconclusive.load(Ordering::Relaxed);
        RunSummary {
            total: agreement + disagreement + inconclusive,
            agreement,
            disagreement,
            inconclusive,
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }

    /// `(value, count)` pairs for `label`, most frequent first, ties by value.
    pub fn frequencies(&self, label: &str) -> Vec<(String, usize)> {
        let frequencies = self.frequencies.lock();
        let Some(table) = frequencies.get(label) else {
            return Vec::new();
        };
        let mut entries: Vec<(String, usize)> =
            table.iter().map(|(v, c)| (v.clone(), *c)).collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        entries
    }

    pub fn render(&self) -> String {
        let summary = self.summary();
        let mut out = String::new();
        let _ = writeln!(out);
        let _ = writeln!(out, "{} agents compared", summary.total);
        let _ = writeln!(
            out,
            "  agreement    {:>8} ({:6.2}%)",
            summary.agreement,
            summary.agreement_percent()
        );
        let _ = writeln!(
            out,
            "  disagreement {:>8} ({:6.2}%)",
            summary.disagreement,
            summary.disagreement_percent()
        );
        let _ = writeln!(
            out,
            "  inconclusive {:>8} ({:6.2}%)",
            summary.inconclusive,
            summary.inconclusive_percent()
        );
        if summary.skipped > 0 {
            let _ = writeln!(out, "  skipped      {:>8}", summary.skipped);
        }

        let labels: Vec<String> = self.frequencies.lock().keys().cloned().collect();
        for label in labels {
            let entries = self.frequencies(&label);
            if entries.is_empty() {
                continue;
            }
            let width = entries.iter().map(|(v, _)| v.chars().count()).max().unwrap_or(0);
            let _ = writeln!(out);
            let _ = writeln!(out, "{label}:");
            for (value, count) in entries {
                let _ = writeln!(out, "  {value:<width$} {count:>8}");
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparator::Comparator;
    use crate::line::{EngineDetection, LineAggregator};
    use crate::registry::PropertyRegistry;
    use crate::types::Detection;

    fn line(reference_brand: &str, target_brand: Option<&str>) -> LineReport {
        let aggregator = LineAggregator::new(PropertyRegistry::default(), Comparator::new(12));
        let mut reference = Detection::unknown("ua");
        reference.device.brand = Some(reference_brand.to_string());
        let mut target = Detection::unknown("ua");
        target.device.brand = target_brand.map(str::to_string);
        aggregator.aggregate(
            "ua",
            &[
                EngineDetection::new("a", reference),
                EngineDetection::new("b", target),
            ],
        )
    }

    #[test]
    fn counts_and_percentages() {
        let reporter = RunReporter::new();
        reporter.record(&line("Apple", Some("Apple")));
        reporter.record(&line("Apple", Some("Samsung")));
        reporter.record(&line("Apple", None));
        reporter.record(&line("Apple", Some("apple")));
        reporter.record_skipped();

        let summary = reporter.summary();
        assert_eq!(summary.total, 4);
        assert_eq!(summary.agreement, 3);
        assert_eq!(summary.disagreement, 1);
        assert_eq!(summary.inconclusive, 0);
        assert_eq!(summary.skipped, 1);
        assert!((summary.agreement_percent() - 75.0).abs() < f64::EPSILON);
        assert!((summary.disagreement_percent() - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_run() {
        let summary = RunReporter::new().summary();
        assert_eq!(summary.total, 0);
        assert_eq!(summary.agreement_percent(), 0.0);
    }

    #[test]
    fn frequency_tables_sorted_descending() {
        let reporter = RunReporter::with_frequencies(&["Device Brand"]);
        reporter.record(&line("Apple", Some("Apple")));
        reporter.record(&line("Samsung", Some("Apple")));
        reporter.record(&line("Xiaomi", None));

        assert_eq!(
            reporter.frequencies("Device Brand"),
            vec![
                ("Apple".to_string(), 3),
                ("Samsung".to_string(), 1),
                ("Xiaomi".to_string(), 1)
            ]
        );
        assert!(reporter.frequencies("Browser").is_empty());

        let rendered = reporter.render();
        assert!(rendered.contains("3 agents compared"));
        assert!(rendered.contains("Device Brand:"));
        let apple = rendered.find("Apple").unwrap();
        let samsung = rendered.find("Samsung").unwrap();
        assert!(apple < samsung);
    }
}
