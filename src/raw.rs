use serde_json::Value;

/// Raw values engines use to say "I don't know".  Compared trimmed and
/// case-insensitively.
const SENTINELS: &[&str] = &["", "unknown", "-1", "false", "null"];

/// Read-only view over one engine's raw, schema-less result.
///
/// Lookups never fail: a missing path, a non-scalar leaf or a sentinel all
/// come back as `None`.
#[derive(Debug, Clone, Copy)]
pub struct RawResult<'a> {
    root: Option<&'a Value>,
}

impl<'a> RawResult<'a> {
    pub fn new(root: Option<&'a Value>) -> Self {
        Self { root }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self.root, None | Some(Value::Null))
    }

    /// Walk a dotted path (`client.version`, `devices.0.brand`).  Numeric
    /// segments index into arrays.  An empty path is the root itself.
    pub fn lookup(&self, path: &str) -> Option<&'a Value> {
        let mut current = self.root?;
        if path.is_empty() {
            return Some(current);
        }
        for segment in path.split('.') {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// The scalar at `path` as a string, with sentinels mapped to `None`.
    pub fn get_str(&self, path: &str) -> Option<String> {
        scalar_to_string(self.lookup(path)?)
    }

    /// Whether `path` holds a non-sentinel value.  A JSON `true`, a
    /// non-empty object and a non-sentinel string all count.
    pub fn is_truthy(&self, path: &str) -> bool {
        match self.lookup(path) {
            None | Some(Value::Null) => false,
            Some(Value::Object(map)) => !map.is_empty(),
            Some(Value::Array(items)) => !items.is_empty(),
            Some(v) => scalar_to_string(v).is_some(),
        }
    }
}

pub(crate) fn is_sentinel(s: &str) -> bool {
    let s = s.trim();
    SENTINELS.iter().any(|sentinel| s.eq_ignore_ascii_case(sentinel))
}

fn scalar_to_string(value: &Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(true) => "true".to_string(),
        Value::Bool(false) | Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    if is_sentinel(&s) {
        None
    } else {
        Some(s)
    }
}
