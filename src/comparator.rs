//! Field-level verdicts between a reference engine and the engines under
//! test.

use std::fmt;

const NULL: &str = "(NULL)";
const EMPTY: &str = "(empty)";
const ELLIPSIS: &str = "...";

/// A property value extracted from a [`Detection`](crate::Detection).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Text(String),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn from_option(value: Option<&str>) -> Self {
        match value {
            Some(s) => Self::Text(s.to_string()),
            None => Self::Null,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&normalize(self))
    }
}

/// Per-engine, per-property classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Match,
    Mismatch,
    /// Kept for report compatibility; [`verdict`] never produces it.
    Inconclusive,
}

impl Verdict {
    pub fn sigil(&self) -> char {
        match self {
            Self::Match => ' ',
            Self::Mismatch => '-',
            Self::Inconclusive => ':',
        }
    }
}

/// Printable, comparable form of a value: nulls, empties and booleans get
/// bracketed markers so they can't collide with real names.
pub fn normalize(value: &FieldValue) -> String {
    match value {
        FieldValue::Null => NULL.to_string(),
        FieldValue::Bool(true) => "(true)".to_string(),
        FieldValue::Bool(false) => "(false)".to_string(),
        FieldValue::Text(s) if s.is_empty() => EMPTY.to_string(),
        FieldValue::Text(s) if s.eq_ignore_ascii_case("null") => NULL.to_string(),
        FieldValue::Text(s) if s.eq_ignore_ascii_case("true") => "(true)".to_string(),
        FieldValue::Text(s) if s.eq_ignore_ascii_case("false") => "(false)".to_string(),
        FieldValue::Text(s) => s.clone(),
    }
}

fn is_absent(normalized: &str) -> bool {
    normalized == NULL || normalized == EMPTY || normalized.is_empty()
}

/// Compare a target value against the reference value.
///
/// Equal values (ignoring case) match, and so does anything compared with
/// an absent value.  Otherwise a target that is a strict prefix of the
/// reference is a less precise but consistent answer and matches, while a
/// target that extends the reference adds detail nobody confirmed and
/// mismatches.
pub fn verdict(reference: &FieldValue, target: &FieldValue) -> Verdict {
    let a = normalize(reference);
    let b = normalize(target);

    if a.to_lowercase() == b.to_lowercase() {
        return Verdict::Match;
    }
    if is_absent(&a) || is_absent(&b) {
        return Verdict::Match;
    }

    if b.len() > a.len() && b.starts_with(a.as_str()) {
        Verdict::Mismatch
    } else if b.len() < a.len() && a.starts_with(b.as_str()) {
        Verdict::Match
    } else {
        Verdict::Mismatch
    }
}

/// One rendered report cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub verdict: Verdict,
    /// Sigil plus normalized value, exactly the comparator's column width.
    pub display: String,
}

#[derive(Debug, Clone, Copy)]
pub struct Comparator {
    column_width: usize,
}

impl Comparator {
    pub fn new(column_width: usize) -> Self {
        Self {
            column_width: column_width.max(1),
        }
    }

    pub fn column_width(&self) -> usize {
        self.column_width
    }

    pub fn compare(&self, reference: &FieldValue, target: &FieldValue) -> Cell {
        let verdict = verdict(reference, target);
        Cell {
            verdict,
            display: self.cell_text(verdict.sigil(), target),
        }
    }

    /// Reference column text; the reference is never judged.
    pub fn reference_cell(&self, reference: &FieldValue) -> String {
        self.cell_text(Verdict::Match.sigil(), reference)
    }

    fn cell_text(&self, sigil: char, value: &FieldValue) -> String {
        let mut text = String::with_capacity(self.column_width);
        text.push(sigil);
        text.push_str(&normalize(value));
        fit(&text, self.column_width)
    }
}

/// Pad or truncate `text` to exactly `width` characters; truncation ends
/// with an ellipsis.
pub(crate) fn fit(text: &str, width: usize) -> String {
    let len = text.chars().count();
    if len <= width {
        let mut out = text.to_string();
        out.extend(std::iter::repeat(' ').take(width - len));
        return out;
    }
    if width <= ELLIPSIS.len() {
        return ELLIPSIS.chars().take(width).collect();
    }
    let mut out: String = text.chars().take(width - ELLIPSIS.len()).collect();
    out.push_str(ELLIPSIS);
    out
}
