//! Content-addressed cache keys.
//!
//! A [`Fingerprint`] is derived from an argument list the same way no matter
//! how the caller built it: positional and named arguments are canonicalized
//! independently into JSON text with sorted object keys, joined with `:`,
//! and hashed with SHA-256. Values that cannot be represented as JSON fall
//! back to their `Debug` text instead of failing.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt::{self, Write as _};

/// Length of a fingerprint in hex characters.
pub const FINGERPRINT_HEX_LEN: usize = 64;

/// Deterministic identifier for a set of filter values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    fn from_digest(digest: &[u8]) -> Self {
        Self(hex::encode(digest))
    }

    /// Accept previously rendered fingerprint text, e.g. from client
    /// storage. Anything but 64 lowercase hex characters is rejected.
    pub fn parse(text: &str) -> Option<Self> {
        let valid = text.len() == FINGERPRINT_HEX_LEN
            && text
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        valid.then(|| Self(text.to_string()))
    }

    /// The full lowercase hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First twelve hex characters, for log lines.
    pub fn short(&self) -> &str {
        let end = self.0.len().min(12);
        &self.0[..end]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Argument list for key derivation.
///
/// Mirrors a call site: an ordered list of positional values plus a set of
/// named values. Named values are kept sorted, so insertion order never
/// affects the fingerprint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyArgs {
    positional: Vec<Value>,
    named: BTreeMap<String, Value>,
}

impl KeyArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional argument.
    pub fn arg<T>(mut self, value: &T) -> Self
    where
        T: Serialize + fmt::Debug + ?Sized,
    {
        self.push_arg(value);
        self
    }

    /// Append an unordered collection as one positional argument.
    ///
    /// Elements are sorted by their canonical text first, so two sets with
    /// the same members always contribute the same value.
    pub fn arg_unordered<I, T>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Serialize + fmt::Debug,
    {
        let mut items: Vec<(String, Value)> = values
            .into_iter()
            .map(|v| {
                let value = to_key_value(&v);
                (canonical_json(&value), value)
            })
            .collect();
        items.sort_by(|a, b| a.0.cmp(&b.0));
        self.positional
            .push(Value::Array(items.into_iter().map(|(_, v)| v).collect()));
        self
    }

    /// Add a named argument. A later value for the same name replaces the
    /// earlier one.
    pub fn named<T>(mut self, name: impl Into<String>, value: &T) -> Self
    where
        T: Serialize + fmt::Debug + ?Sized,
    {
        self.insert_named(name, value);
        self
    }

    pub fn push_arg<T>(&mut self, value: &T)
    where
        T: Serialize + fmt::Debug + ?Sized,
    {
        self.positional.push(to_key_value(value));
    }

    pub fn insert_named<T>(&mut self, name: impl Into<String>, value: &T)
    where
        T: Serialize + fmt::Debug + ?Sized,
    {
        self.named.insert(name.into(), to_key_value(value));
    }

    pub fn positional(&self) -> &[Value] {
        &self.positional
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }

    /// Canonical text that gets hashed: `<positional json>:<named json>`.
    pub fn canonical(&self) -> String {
        let mut out = String::new();
        write_array(&self.positional, &mut out);
        out.push(':');
        write_object(self.named.iter(), &mut out);
        out
    }

    /// Derive the fingerprint for these arguments.
    pub fn fingerprint(&self) -> Fingerprint {
        derive(self)
    }
}

/// Derive a fingerprint from an argument list.
///
/// Pure: the same arguments always produce the same fingerprint, and the
/// function cannot fail.
pub fn derive(args: &KeyArgs) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(args.canonical().as_bytes());
    Fingerprint::from_digest(&hasher.finalize())
}

fn to_key_value<T>(value: &T) -> Value
where
    T: Serialize + fmt::Debug + ?Sized,
{
    serde_json::to_value(value).unwrap_or_else(|_| Value::String(format!("{value:?}")))
}

/// Render a JSON value with object keys sorted at every depth.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => {
            let _ = write!(out, "{n}");
        }
        Value::String(s) => {
            // Display on a string value emits the escaped, quoted form.
            let _ = write!(out, "{}", Value::from(s.as_str()));
        }
        Value::Array(items) => write_array(items, out),
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            write_object(entries.into_iter(), out);
        }
    }
}

fn write_array(items: &[Value], out: &mut String) {
    out.push('[');
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_canonical(item, out);
    }
    out.push(']');
}

// Callers pass entries already in key order.
fn write_object<'a>(entries: impl Iterator<Item = (&'a String, &'a Value)>, out: &mut String) {
    out.push('{');
    for (i, (key, value)) in entries.enumerate() {
        if i > 0 {
            out.push(',');
        }
        let _ = write!(out, "{}", Value::from(key.as_str()));
        out.push(':');
        write_canonical(value, out);
    }
    out.push('}');
}
