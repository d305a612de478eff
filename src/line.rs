use crate::comparator::{fit, Cell, Comparator, FieldValue, Verdict};
use crate::registry::PropertyRegistry;
use crate::types::Detection;

/// One engine's canonical result for the agent being compared.
#[derive(Debug, Clone)]
pub struct EngineDetection {
    pub engine: String,
    pub detection: Detection,
}

impl EngineDetection {
    pub fn new(engine: impl Into<String>, detection: Detection) -> Self {
        Self {
            engine: engine.into(),
            detection,
        }
    }
}

/// Per-agent rollup of every property verdict across every engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass {
    Agreement,
    Disagreement,
    /// Only reachable through an `Inconclusive` verdict, which the
    /// comparator does not emit today.
    Inconclusive,
}

impl LineClass {
    /// Progress character printed for the line in bulk runs.
    pub fn marker(&self) -> char {
        match self {
            Self::Agreement => '.',
            Self::Disagreement => '-',
            Self::Inconclusive => ':',
        }
    }
}

#[derive(Debug, Clone)]
pub struct PropertyRow {
    pub label: &'static str,
    pub reference: FieldValue,
    /// Rendered reference column.
    pub reference_display: String,
    /// One cell per non-reference engine, in engine order.
    pub cells: Vec<Cell>,
    /// Every engine's raw value for this property, reference first.
    pub values: Vec<FieldValue>,
}

#[derive(Debug, Clone)]
pub struct LineReport {
    pub agent: String,
    pub class: LineClass,
    /// Engine ids, reference first.
    pub engines: Vec<String>,
    pub rows: Vec<PropertyRow>,
    column_width: usize,
    label_width: usize,
}

impl LineReport {
    pub fn mismatches(&self) -> usize {
        self.rows
            .iter()
            .flat_map(|row| row.cells.iter())
            .filter(|cell| cell.verdict == Verdict::Mismatch)
            .count()
    }

    /// Fixed-width detail table: one header row naming the engines, then one
    /// row per property.
    pub fn render_table(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.agent);
        out.push('\n');

        out.push_str(&fit("", self.label_width));
        for engine in &self.engines {
            out.push('|');
            out.push_str(&fit(engine, self.column_width));
        }
        out.push('\n');

        let separator_len = self.label_width + self.engines.len() * (self.column_width + 1);
        out.push_str(&"-".repeat(separator_len));
        out.push('\n');

        for row in &self.rows {
            out.push_str(&fit(row.label, self.label_width));
            out.push('|');
            out.push_str(&row.reference_display);
            for cell in &row.cells {
                out.push('|');
                out.push_str(&cell.display);
            }
            out.push('\n');
        }
        out
    }
}

/// Runs the comparator for every registered property against every
/// non-reference engine.
#[derive(Debug, Clone)]
pub struct LineAggregator {
    registry: PropertyRegistry,
    comparator: Comparator,
    label_width: usize,
}

impl LineAggregator {
    pub fn new(registry: PropertyRegistry, comparator: Comparator) -> Self {
        let label_width = registry.iter().map(|p| p.label.len()).max().unwrap_or(0) + 1;
        Self {
            registry,
            comparator,
            label_width,
        }
    }

    pub fn registry(&self) -> &PropertyRegistry {
        &self.registry
    }

    /// The first entry of `results` is the reference engine.
    pub fn aggregate(&self, agent: &str, results: &[EngineDetection]) -> LineReport {
        let engines: Vec<String> = results.iter().map(|r| r.engine.clone()).collect();
        let mut rows = Vec::with_capacity(self.registry.len());

        if let Some((reference, targets)) = results.split_first() {
            for property in self.registry.iter() {
                let reference_value = property.extract(&reference.detection);
                let mut values = Vec::with_capacity(results.len());
                values.push(reference_value.clone());

                let cells = targets
                    .iter()
                    .map(|target| {
                        let value = property.extract(&target.detection);
                        let cell = self.comparator.compare(&reference_value, &value);
                        values.push(value);
                        cell
                    })
                    .collect();

                rows.push(PropertyRow {
                    label: property.label,
                    reference_display: self.comparator.reference_cell(&reference_value),
                    reference: reference_value,
                    cells,
                    values,
                });
            }
        }

        let class = classify(&rows);
        LineReport {
            agent: agent.to_string(),
            class,
            engines,
            rows,
            column_width: self.comparator.column_width(),
            label_width: self.label_width,
        }
    }
}

fn classify(rows: &[PropertyRow]) -> LineClass {
    let verdicts = || rows.iter().flat_map(|row| row.cells.iter().map(|c| c.verdict));
    if verdicts().any(|v| v == Verdict::Mismatch) {
        LineClass::Disagreement
    } else if verdicts().any(|v| v == Verdict::Inconclusive) {
        LineClass::Inconclusive
    } else {
        LineClass::Agreement
    }
}
