//! Read access to loosely-typed aggregator payloads.
//!
//! The aggregator returns `any`-shaped JSON: the same field shows up as
//! `BillAmount` or `amount`, numbers arrive as strings, and the interesting
//! part may or may not be wrapped in a `data` envelope. `LooseRecord` is the
//! only way the rest of the crate reads those payloads; `normalize` turns them
//! into the typed models before anything else sees them.

use serde_json::Value;

/// Values the aggregator uses to mean "no value".
const SENTINELS: [&str; 4] = ["NA", "N/A", "-", "null"];

/// A view over one upstream JSON object, searched layer by layer.
#[derive(Debug, Clone, Copy)]
pub struct LooseRecord<'a> {
    primary: &'a Value,
    fallback: Option<&'a Value>,
}

impl<'a> LooseRecord<'a> {
    /// Wraps a single object.
    pub fn new(value: &'a Value) -> Self {
        Self {
            primary: value,
            fallback: None,
        }
    }

    /// Looks inside `data` first, then at the root.
    pub fn enveloped(value: &'a Value) -> Self {
        match value.get("data") {
            Some(data) if data.is_object() => Self {
                primary: data,
                fallback: Some(value),
            },
            _ => Self::new(value),
        }
    }

    /// The layers searched, in lookup order.
    pub fn layers(&self) -> impl Iterator<Item = &'a Value> {
        std::iter::once(self.primary).chain(self.fallback)
    }

    /// First non-null value found under any of `keys`.
    pub fn raw(&self, keys: &[&str]) -> Option<&'a Value> {
        std::iter::once(self.primary)
            .chain(self.fallback)
            .flat_map(|layer| keys.iter().filter_map(move |k| layer.get(*k)))
            .find(|v| !v.is_null())
    }

    /// String-ish field; numbers and booleans are rendered, blanks skipped.
    pub fn string(&self, keys: &[&str]) -> Option<String> {
        std::iter::once(self.primary)
            .chain(self.fallback)
            .flat_map(|layer| keys.iter().filter_map(move |k| layer.get(*k)))
            .filter_map(scalar_to_string)
            .find(|s| !s.trim().is_empty())
    }

    /// Like [`LooseRecord::string`] but also drops sentinel values such as `"NA"`.
    pub fn meaningful_string(&self, keys: &[&str]) -> Option<String> {
        self.string(keys)
            .map(|s| s.trim().to_string())
            .filter(|s| !is_sentinel(s))
    }

    /// Unsigned number, accepting numeric strings.
    pub fn number(&self, keys: &[&str]) -> Option<u64> {
        self.raw(keys).and_then(value_to_u64)
    }

    /// Explicit JSON boolean only.
    pub fn strict_bool(&self, keys: &[&str]) -> Option<bool> {
        self.raw(keys).and_then(Value::as_bool)
    }

    /// Boolean accepting `"true"`, `"Y"`, `"yes"`, `1` and friends.
    pub fn flag(&self, keys: &[&str]) -> Option<bool> {
        self.raw(keys).and_then(|v| match v {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_i64().map(|n| n != 0),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "y" | "yes" | "1" => Some(true),
                "false" | "n" | "no" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        })
    }

    /// Array field. An object holding a single array (`{"paramInfo": [...]}`)
    /// is unwrapped.
    pub fn list(&self, keys: &[&str]) -> Option<&'a Vec<Value>> {
        match self.raw(keys)? {
            Value::Array(items) => Some(items),
            Value::Object(map) => map.values().find_map(Value::as_array),
            _ => None,
        }
    }
}

/// Renders strings, numbers and booleans; anything else is `None`.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub fn value_to_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn is_sentinel(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || SENTINELS.iter().any(|s| trimmed.eq_ignore_ascii_case(s))
}
