//! The leveled, attribute-tree logging model.
//!
//! Attributes carry a key and a [`Value`]; nesting is explicit through
//! [`Value::Group`], and values may be lazy ([`Value::Lazy`]) until a handler
//! resolves them.

use crate::error::BoxError;
use crate::value::AnyValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Upper bound on chained lazy values resolved for a single attribute.
const MAX_LOG_VALUER_DEPTH: usize = 100;

/// Severity in the attribute model. Any `i32` is a valid level; the named
/// constants are the canonical points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Level(pub i32);

impl Level {
    pub const DEBUG: Level = Level(-4);
    pub const INFO: Level = Level(0);
    pub const WARN: Level = Level(4);
    pub const ERROR: Level = Level(8);
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (name, base) = if *self < Level::INFO {
            ("DEBUG", Level::DEBUG)
        } else if *self < Level::WARN {
            ("INFO", Level::INFO)
        } else if *self < Level::ERROR {
            ("WARN", Level::WARN)
        } else {
            ("ERROR", Level::ERROR)
        };
        match self.0 - base.0 {
            0 => f.write_str(name),
            delta => write!(f, "{name}{delta:+}"),
        }
    }
}

/// A value computed on first access.
pub trait LogValuer: Send + Sync {
    fn log_value(&self) -> Value;
}

impl<F> LogValuer for F
where
    F: Fn() -> Value + Send + Sync,
{
    fn log_value(&self) -> Value {
        self()
    }
}

/// Shared handle to a [`LogValuer`].
#[derive(Clone)]
pub struct LazyValue(Arc<dyn LogValuer>);

impl LazyValue {
    pub fn new(valuer: impl LogValuer + 'static) -> Self {
        LazyValue(Arc::new(valuer))
    }

    pub fn log_value(&self) -> Value {
        self.0.log_value()
    }
}

impl fmt::Debug for LazyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LazyValue(..)")
    }
}

impl PartialEq for LazyValue {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Payload of an [`Attr`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Int64(i64),
    Uint64(u64),
    Float64(f64),
    Bool(bool),
    Duration(Duration),
    Time(DateTime<Utc>),
    Group(Vec<Attr>),
    Any(AnyValue),
    Lazy(LazyValue),
}

impl Default for Value {
    fn default() -> Self {
        Value::Any(AnyValue::Nil)
    }
}

impl Value {
    pub fn is_group(&self) -> bool {
        matches!(self, Value::Group(_))
    }

    pub fn is_lazy(&self) -> bool {
        matches!(self, Value::Lazy(_))
    }

    /// Replaces a lazy value with what it produces, following chains of
    /// lazy values. Non-lazy values are returned as is.
    pub fn resolve(self) -> Value {
        let mut value = self;
        for _ in 0..MAX_LOG_VALUER_DEPTH {
            match value {
                Value::Lazy(lazy) => value = lazy.log_value(),
                resolved => return resolved,
            }
        }
        match value {
            Value::Lazy(_) => Value::String(format!(
                "lazy value did not resolve after {MAX_LOG_VALUER_DEPTH} steps"
            )),
            resolved => resolved,
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<AnyValue> for Value {
    fn from(v: AnyValue) -> Self {
        Value::Any(v)
    }
}

/// A key plus a [`Value`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Attr {
    pub key: String,
    pub value: Value,
}

impl Attr {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Attr { key: key.into(), value }
    }

    pub fn string(key: impl Into<String>, value: impl Into<String>) -> Self {
        Attr::new(key, Value::String(value.into()))
    }

    pub fn int(key: impl Into<String>, value: i64) -> Self {
        Attr::new(key, Value::Int64(value))
    }

    pub fn uint(key: impl Into<String>, value: u64) -> Self {
        Attr::new(key, Value::Uint64(value))
    }

    pub fn float(key: impl Into<String>, value: f64) -> Self {
        Attr::new(key, Value::Float64(value))
    }

    pub fn bool(key: impl Into<String>, value: bool) -> Self {
        Attr::new(key, Value::Bool(value))
    }

    pub fn duration(key: impl Into<String>, value: Duration) -> Self {
        Attr::new(key, Value::Duration(value))
    }

    pub fn time(key: impl Into<String>, value: DateTime<Utc>) -> Self {
        Attr::new(key, Value::Time(value))
    }

    pub fn group(key: impl Into<String>, attrs: Vec<Attr>) -> Self {
        Attr::new(key, Value::Group(attrs))
    }

    pub fn any(key: impl Into<String>, value: impl Into<AnyValue>) -> Self {
        Attr::new(key, Value::Any(value.into()))
    }

    pub fn lazy(key: impl Into<String>, valuer: impl LogValuer + 'static) -> Self {
        Attr::new(key, Value::Lazy(LazyValue::new(valuer)))
    }

    /// True for the zero attribute: empty key and nil value.
    pub fn is_empty(&self) -> bool {
        self.key.is_empty() && matches!(&self.value, Value::Any(v) if v.is_nil())
    }
}

/// Program location attached to a [`Record`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Source {
    pub function: String,
    pub file: String,
    pub line: u32,
}

/// A log record in the attribute model.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub time: DateTime<Utc>,
    pub level: Level,
    pub message: String,
    pub source: Option<Source>,
    attrs: Vec<Attr>,
}

impl Record {
    pub fn new(time: DateTime<Utc>, level: Level, message: impl Into<String>) -> Self {
        Record { time, level, message: message.into(), source: None, attrs: Vec::new() }
    }

    pub fn with_source(mut self, source: Source) -> Self {
        self.source = Some(source);
        self
    }

    pub fn add_attrs(&mut self, attrs: impl IntoIterator<Item = Attr>) {
        self.attrs.extend(attrs);
    }

    pub fn attrs(&self) -> &[Attr] {
        &self.attrs
    }

    pub fn into_attrs(self) -> Vec<Attr> {
        self.attrs
    }

    pub fn num_attrs(&self) -> usize {
        self.attrs.len()
    }
}

/// Rewrites or elides an attribute before it is converted. Receives the
/// names of the groups enclosing the attribute, outermost first. Returning
/// [`Attr::default()`] drops the attribute.
pub type ReplaceAttr = Arc<dyn Fn(&[String], Attr) -> Attr + Send + Sync>;

/// Destination contract of the attribute model.
pub trait Handler: Send + Sync {
    /// Whether records at `level` would be handled.
    fn enabled(&self, level: Level) -> bool;

    /// Handle a single record.
    ///
    /// **Parameters**
    /// - `record`: time, level, message, optional source and the
    ///   record's own attributes.
    ///
    /// **Returns**
    /// - `Ok(())` if the record was accepted.
    /// - `Err(..)` if the destination failed. Adapters hand this error
    ///   back to their caller unchanged.
    fn handle(&self, record: Record) -> Result<(), BoxError>;

    /// Derive a handler whose records all carry `attrs`.
    ///
    /// **Parameters**
    /// - `attrs`: attributes qualified by any groups already open on `self`.
    ///
    /// **Returns**
    /// - A new handler. `self` is left unchanged, so handlers derived from
    ///   the same parent never see each other's attributes.
    fn with_attrs(self: Arc<Self>, attrs: Vec<Attr>) -> Arc<dyn Handler>;

    /// Derive a handler that nests every subsequent attribute under `name`.
    ///
    /// **Returns**
    /// - A new handler; `self` keeps its current groups.
    fn with_group(self: Arc<Self>, name: &str) -> Arc<dyn Handler>;
}
