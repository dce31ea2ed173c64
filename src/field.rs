//! The leveled, named-field logging model.
//!
//! Fields carry a key and a typed value; nested structure is produced by
//! object and array marshalers that drive an [`ObjectEncoder`] or
//! [`ArrayEncoder`], and scoping is expressed with a namespace marker that
//! captures every field added after it.

use crate::error::{BoxError, MarshalError};
use crate::value::AnyValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Severity in the named-field model.
///
/// The canonical levels are associated constants; any other `i8` is a valid
/// (if unusual) severity and is clamped when mapped to the attribute model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Level(pub i8);

impl Level {
    pub const DEBUG: Level = Level(-1);
    pub const INFO: Level = Level(0);
    pub const WARN: Level = Level(1);
    pub const ERROR: Level = Level(2);
    pub const DPANIC: Level = Level(3);
    pub const PANIC: Level = Level(4);
    pub const FATAL: Level = Level(5);

    pub fn as_str(&self) -> Option<&'static str> {
        match *self {
            Level::DEBUG => Some("debug"),
            Level::INFO => Some("info"),
            Level::WARN => Some("warn"),
            Level::ERROR => Some("error"),
            Level::DPANIC => Some("dpanic"),
            Level::PANIC => Some("panic"),
            Level::FATAL => Some("fatal"),
            _ => None,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Some(name) => f.write_str(name),
            None => write!(f, "Level({})", self.0),
        }
    }
}

/// Produces the fields of a nested object.
pub trait ObjectMarshaler: Send + Sync {
    fn marshal_log_object(&self, enc: &mut dyn ObjectEncoder) -> Result<(), MarshalError>;
}

/// Produces the elements of a nested array.
pub trait ArrayMarshaler: Send + Sync {
    fn marshal_log_array(&self, enc: &mut dyn ArrayEncoder) -> Result<(), MarshalError>;
}

/// Wraps a closure as an [`ObjectMarshaler`].
pub struct ObjectFn<F>(pub F);

impl<F> ObjectMarshaler for ObjectFn<F>
where
    F: Fn(&mut dyn ObjectEncoder) -> Result<(), MarshalError> + Send + Sync,
{
    fn marshal_log_object(&self, enc: &mut dyn ObjectEncoder) -> Result<(), MarshalError> {
        (self.0)(enc)
    }
}

impl ObjectMarshaler for [Field] {
    fn marshal_log_object(&self, enc: &mut dyn ObjectEncoder) -> Result<(), MarshalError> {
        for field in self {
            field.add_to(enc);
        }
        Ok(())
    }
}

impl ObjectMarshaler for Vec<Field> {
    fn marshal_log_object(&self, enc: &mut dyn ObjectEncoder) -> Result<(), MarshalError> {
        self.as_slice().marshal_log_object(enc)
    }
}

/// Wraps a closure as an [`ArrayMarshaler`].
pub struct ArrayFn<F>(pub F);

impl<F> ArrayMarshaler for ArrayFn<F>
where
    F: Fn(&mut dyn ArrayEncoder) -> Result<(), MarshalError> + Send + Sync,
{
    fn marshal_log_array(&self, enc: &mut dyn ArrayEncoder) -> Result<(), MarshalError> {
        (self.0)(enc)
    }
}

struct Primitives<T>(Vec<T>);

impl<T> ArrayMarshaler for Primitives<T>
where
    T: Clone + Into<AnyValue> + Send + Sync,
{
    fn marshal_log_array(&self, enc: &mut dyn ArrayEncoder) -> Result<(), MarshalError> {
        for v in &self.0 {
            enc.append_any(v.clone().into());
        }
        Ok(())
    }
}

struct ObjectList(Vec<Arc<dyn ObjectMarshaler>>);

impl ArrayMarshaler for ObjectList {
    fn marshal_log_array(&self, enc: &mut dyn ArrayEncoder) -> Result<(), MarshalError> {
        for obj in &self.0 {
            enc.append_object(obj.as_ref())?;
        }
        Ok(())
    }
}

/// Visitor surface a field adds itself to.
pub trait ObjectEncoder {
    fn add_array(&mut self, key: &str, marshaler: &dyn ArrayMarshaler) -> Result<(), MarshalError>;
    fn add_object(&mut self, key: &str, marshaler: &dyn ObjectMarshaler)
        -> Result<(), MarshalError>;

    fn add_binary(&mut self, key: &str, value: &[u8]);
    fn add_byte_string(&mut self, key: &str, value: &[u8]);
    fn add_bool(&mut self, key: &str, value: bool);
    fn add_complex128(&mut self, key: &str, re: f64, im: f64);
    fn add_complex64(&mut self, key: &str, re: f32, im: f32);
    fn add_duration(&mut self, key: &str, value: Duration);
    fn add_float64(&mut self, key: &str, value: f64);
    fn add_float32(&mut self, key: &str, value: f32);
    fn add_int64(&mut self, key: &str, value: i64);
    fn add_int32(&mut self, key: &str, value: i32);
    fn add_int16(&mut self, key: &str, value: i16);
    fn add_int8(&mut self, key: &str, value: i8);
    fn add_string(&mut self, key: &str, value: &str);
    fn add_time(&mut self, key: &str, value: DateTime<Utc>);
    fn add_uint64(&mut self, key: &str, value: u64);
    fn add_uint32(&mut self, key: &str, value: u32);
    fn add_uint16(&mut self, key: &str, value: u16);
    fn add_uint8(&mut self, key: &str, value: u8);
    fn add_uintptr(&mut self, key: &str, value: usize);
    fn add_any(&mut self, key: &str, value: AnyValue);
    fn add_reflected(&mut self, key: &str, value: &serde_json::Value) -> Result<(), MarshalError>;

    /// Every field added after this call belongs to the namespace `key`.
    fn open_namespace(&mut self, key: &str);
}

/// Visitor surface an array marshaler appends its elements to.
pub trait ArrayEncoder {
    fn append_array(&mut self, marshaler: &dyn ArrayMarshaler) -> Result<(), MarshalError>;
    fn append_object(&mut self, marshaler: &dyn ObjectMarshaler) -> Result<(), MarshalError>;
    fn append_reflected(&mut self, value: &serde_json::Value) -> Result<(), MarshalError>;

    /// Appends a scalar. Typed `append_*` helpers below all funnel here.
    fn append_any(&mut self, value: AnyValue);

    fn append_bool(&mut self, v: bool) {
        self.append_any(AnyValue::Bool(v));
    }
    fn append_byte_string(&mut self, v: &[u8]) {
        self.append_any(AnyValue::from_byte_string(v.to_vec()));
    }
    fn append_complex128(&mut self, re: f64, im: f64) {
        self.append_any(AnyValue::Complex { re, im });
    }
    fn append_complex64(&mut self, re: f32, im: f32) {
        self.append_any(AnyValue::Complex { re: re.into(), im: im.into() });
    }
    fn append_duration(&mut self, v: Duration) {
        self.append_any(AnyValue::Duration(v));
    }
    fn append_float64(&mut self, v: f64) {
        self.append_any(AnyValue::Float(v));
    }
    fn append_float32(&mut self, v: f32) {
        self.append_any(AnyValue::Float(v.into()));
    }
    fn append_int64(&mut self, v: i64) {
        self.append_any(AnyValue::Int(v));
    }
    fn append_int32(&mut self, v: i32) {
        self.append_any(AnyValue::Int(v.into()));
    }
    fn append_int16(&mut self, v: i16) {
        self.append_any(AnyValue::Int(v.into()));
    }
    fn append_int8(&mut self, v: i8) {
        self.append_any(AnyValue::Int(v.into()));
    }
    fn append_string(&mut self, v: &str) {
        self.append_any(AnyValue::String(v.to_string()));
    }
    fn append_time(&mut self, v: DateTime<Utc>) {
        self.append_any(AnyValue::Time(v));
    }
    fn append_uint64(&mut self, v: u64) {
        self.append_any(AnyValue::Uint(v));
    }
    fn append_uint32(&mut self, v: u32) {
        self.append_any(AnyValue::Uint(v.into()));
    }
    fn append_uint16(&mut self, v: u16) {
        self.append_any(AnyValue::Uint(v.into()));
    }
    fn append_uint8(&mut self, v: u8) {
        self.append_any(AnyValue::Uint(v.into()));
    }
    fn append_uintptr(&mut self, v: usize) {
        self.append_any(AnyValue::Uintptr(v));
    }
}

/// Typed payload of a [`Field`].
#[derive(Clone)]
pub enum FieldValue {
    String(String),
    ByteString(Vec<u8>),
    Binary(Vec<u8>),
    Bool(bool),
    Int64(i64),
    Int32(i32),
    Int16(i16),
    Int8(i8),
    Uint64(u64),
    Uint32(u32),
    Uint16(u16),
    Uint8(u8),
    Uintptr(usize),
    Float64(f64),
    Float32(f32),
    Complex128(f64, f64),
    Complex64(f32, f32),
    Duration(Duration),
    Time(DateTime<Utc>),
    Any(AnyValue),
    Reflected(serde_json::Value),
    /// Rendered error message.
    Error(String),
    /// A nested object made of concrete fields.
    Dict(Vec<Field>),
    Object(Arc<dyn ObjectMarshaler>),
    Array(Arc<dyn ArrayMarshaler>),
    /// Object whose fields are added to the enclosing scope without a key.
    Inline(Arc<dyn ObjectMarshaler>),
    Namespace,
    Skip,
}

impl fmt::Debug for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::String(v) => f.debug_tuple("String").field(v).finish(),
            FieldValue::ByteString(v) => f.debug_tuple("ByteString").field(v).finish(),
            FieldValue::Binary(v) => f.debug_tuple("Binary").field(v).finish(),
            FieldValue::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            FieldValue::Int64(v) => f.debug_tuple("Int64").field(v).finish(),
            FieldValue::Int32(v) => f.debug_tuple("Int32").field(v).finish(),
            FieldValue::Int16(v) => f.debug_tuple("Int16").field(v).finish(),
            FieldValue::Int8(v) => f.debug_tuple("Int8").field(v).finish(),
            FieldValue::Uint64(v) => f.debug_tuple("Uint64").field(v).finish(),
            FieldValue::Uint32(v) => f.debug_tuple("Uint32").field(v).finish(),
            FieldValue::Uint16(v) => f.debug_tuple("Uint16").field(v).finish(),
            FieldValue::Uint8(v) => f.debug_tuple("Uint8").field(v).finish(),
            FieldValue::Uintptr(v) => f.debug_tuple("Uintptr").field(v).finish(),
            FieldValue::Float64(v) => f.debug_tuple("Float64").field(v).finish(),
            FieldValue::Float32(v) => f.debug_tuple("Float32").field(v).finish(),
            FieldValue::Complex128(re, im) => {
                f.debug_tuple("Complex128").field(re).field(im).finish()
            }
            FieldValue::Complex64(re, im) => {
                f.debug_tuple("Complex64").field(re).field(im).finish()
            }
            FieldValue::Duration(v) => f.debug_tuple("Duration").field(v).finish(),
            FieldValue::Time(v) => f.debug_tuple("Time").field(v).finish(),
            FieldValue::Any(v) => f.debug_tuple("Any").field(v).finish(),
            FieldValue::Reflected(v) => f.debug_tuple("Reflected").field(v).finish(),
            FieldValue::Error(v) => f.debug_tuple("Error").field(v).finish(),
            FieldValue::Dict(v) => f.debug_tuple("Dict").field(v).finish(),
            FieldValue::Object(_) => f.write_str("Object(..)"),
            FieldValue::Array(_) => f.write_str("Array(..)"),
            FieldValue::Inline(_) => f.write_str("Inline(..)"),
            FieldValue::Namespace => f.write_str("Namespace"),
            FieldValue::Skip => f.write_str("Skip"),
        }
    }
}

/// Marshaler-backed values compare by identity; everything else by value.
impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        use FieldValue as V;
        match (self, other) {
            (V::String(a), V::String(b)) | (V::Error(a), V::Error(b)) => a == b,
            (V::ByteString(a), V::ByteString(b)) | (V::Binary(a), V::Binary(b)) => a == b,
            (V::Bool(a), V::Bool(b)) => a == b,
            (V::Int64(a), V::Int64(b)) => a == b,
            (V::Int32(a), V::Int32(b)) => a == b,
            (V::Int16(a), V::Int16(b)) => a == b,
            (V::Int8(a), V::Int8(b)) => a == b,
            (V::Uint64(a), V::Uint64(b)) => a == b,
            (V::Uint32(a), V::Uint32(b)) => a == b,
            (V::Uint16(a), V::Uint16(b)) => a == b,
            (V::Uint8(a), V::Uint8(b)) => a == b,
            (V::Uintptr(a), V::Uintptr(b)) => a == b,
            (V::Float64(a), V::Float64(b)) => a == b,
            (V::Float32(a), V::Float32(b)) => a == b,
            (V::Complex128(ar, ai), V::Complex128(br, bi)) => ar == br && ai == bi,
            (V::Complex64(ar, ai), V::Complex64(br, bi)) => ar == br && ai == bi,
            (V::Duration(a), V::Duration(b)) => a == b,
            (V::Time(a), V::Time(b)) => a == b,
            (V::Any(a), V::Any(b)) => a == b,
            (V::Reflected(a), V::Reflected(b)) => a == b,
            (V::Dict(a), V::Dict(b)) => a == b,
            (V::Object(a), V::Object(b)) | (V::Inline(a), V::Inline(b)) => Arc::ptr_eq(a, b),
            (V::Array(a), V::Array(b)) => Arc::ptr_eq(a, b),
            (V::Namespace, V::Namespace) | (V::Skip, V::Skip) => true,
            _ => false,
        }
    }
}

/// A key plus a typed value.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub key: String,
    pub value: FieldValue,
}

impl Field {
    pub fn new(key: impl Into<String>, value: FieldValue) -> Self {
        Field { key: key.into(), value }
    }

    pub fn string(key: impl Into<String>, value: impl Into<String>) -> Self {
        Field::new(key, FieldValue::String(value.into()))
    }

    pub fn byte_string(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Field::new(key, FieldValue::ByteString(value.into()))
    }

    pub fn binary(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Field::new(key, FieldValue::Binary(value.into()))
    }

    pub fn bool(key: impl Into<String>, value: bool) -> Self {
        Field::new(key, FieldValue::Bool(value))
    }

    /// Platform-width integers are carried as 64-bit.
    pub fn int(key: impl Into<String>, value: isize) -> Self {
        Field::int64(key, value as i64)
    }

    pub fn int64(key: impl Into<String>, value: i64) -> Self {
        Field::new(key, FieldValue::Int64(value))
    }

    pub fn int32(key: impl Into<String>, value: i32) -> Self {
        Field::new(key, FieldValue::Int32(value))
    }

    pub fn int16(key: impl Into<String>, value: i16) -> Self {
        Field::new(key, FieldValue::Int16(value))
    }

    pub fn int8(key: impl Into<String>, value: i8) -> Self {
        Field::new(key, FieldValue::Int8(value))
    }

    pub fn uint(key: impl Into<String>, value: usize) -> Self {
        Field::uint64(key, value as u64)
    }

    pub fn uint64(key: impl Into<String>, value: u64) -> Self {
        Field::new(key, FieldValue::Uint64(value))
    }

    pub fn uint32(key: impl Into<String>, value: u32) -> Self {
        Field::new(key, FieldValue::Uint32(value))
    }

    pub fn uint16(key: impl Into<String>, value: u16) -> Self {
        Field::new(key, FieldValue::Uint16(value))
    }

    pub fn uint8(key: impl Into<String>, value: u8) -> Self {
        Field::new(key, FieldValue::Uint8(value))
    }

    pub fn uintptr(key: impl Into<String>, value: usize) -> Self {
        Field::new(key, FieldValue::Uintptr(value))
    }

    pub fn float64(key: impl Into<String>, value: f64) -> Self {
        Field::new(key, FieldValue::Float64(value))
    }

    pub fn float32(key: impl Into<String>, value: f32) -> Self {
        Field::new(key, FieldValue::Float32(value))
    }

    pub fn complex128(key: impl Into<String>, re: f64, im: f64) -> Self {
        Field::new(key, FieldValue::Complex128(re, im))
    }

    pub fn complex64(key: impl Into<String>, re: f32, im: f32) -> Self {
        Field::new(key, FieldValue::Complex64(re, im))
    }

    pub fn duration(key: impl Into<String>, value: Duration) -> Self {
        Field::new(key, FieldValue::Duration(value))
    }

    pub fn time(key: impl Into<String>, value: DateTime<Utc>) -> Self {
        Field::new(key, FieldValue::Time(value))
    }

    /// Builds the most specific field for an untyped value.
    pub fn any(key: impl Into<String>, value: AnyValue) -> Self {
        let key = key.into();
        match value {
            AnyValue::Bool(v) => Field::bool(key, v),
            AnyValue::Int(v) => Field::int64(key, v),
            AnyValue::Uint(v) => Field::uint64(key, v),
            AnyValue::Float(v) => Field::float64(key, v),
            AnyValue::Complex { re, im } => Field::complex128(key, re, im),
            AnyValue::String(v) => Field::string(key, v),
            AnyValue::Bytes(v) => Field::binary(key, v),
            AnyValue::Duration(v) => Field::duration(key, v),
            AnyValue::Time(v) => Field::time(key, v),
            AnyValue::Uintptr(v) => Field::uintptr(key, v),
            AnyValue::Reflected(v) => Field::new(key, FieldValue::Reflected(v)),
            other => Field::new(key, FieldValue::Any(other)),
        }
    }

    /// Serializes `value` up front. A serialization failure becomes a
    /// `<key>Error` string field.
    pub fn reflect<T: Serialize + ?Sized>(key: impl Into<String>, value: &T) -> Self {
        let key = key.into();
        match serde_json::to_value(value) {
            Ok(v) => Field::new(key, FieldValue::Reflected(v)),
            Err(e) => Field::string(format!("{key}Error"), e.to_string()),
        }
    }

    /// An error under the conventional `error` key.
    pub fn error(err: &dyn Error) -> Self {
        Field::named_error("error", err)
    }

    pub fn named_error(key: impl Into<String>, err: &dyn Error) -> Self {
        Field::new(key, FieldValue::Error(err.to_string()))
    }

    pub fn dict(key: impl Into<String>, fields: Vec<Field>) -> Self {
        Field::new(key, FieldValue::Dict(fields))
    }

    pub fn object(key: impl Into<String>, marshaler: impl ObjectMarshaler + 'static) -> Self {
        Field::new(key, FieldValue::Object(Arc::new(marshaler)))
    }

    pub fn array(key: impl Into<String>, marshaler: impl ArrayMarshaler + 'static) -> Self {
        Field::new(key, FieldValue::Array(Arc::new(marshaler)))
    }

    pub fn strings<S: Into<String>>(
        key: impl Into<String>,
        values: impl IntoIterator<Item = S>,
    ) -> Self {
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        Field::array(key, Primitives(values))
    }

    pub fn bools(key: impl Into<String>, values: impl IntoIterator<Item = bool>) -> Self {
        Field::array(key, Primitives(values.into_iter().collect()))
    }

    pub fn int64s(key: impl Into<String>, values: impl IntoIterator<Item = i64>) -> Self {
        Field::array(key, Primitives(values.into_iter().collect()))
    }

    pub fn objects(key: impl Into<String>, values: Vec<Arc<dyn ObjectMarshaler>>) -> Self {
        Field::array(key, ObjectList(values))
    }

    pub fn inline(marshaler: impl ObjectMarshaler + 'static) -> Self {
        Field::new("", FieldValue::Inline(Arc::new(marshaler)))
    }

    pub fn namespace(key: impl Into<String>) -> Self {
        Field::new(key, FieldValue::Namespace)
    }

    pub fn skip() -> Self {
        Field::new("", FieldValue::Skip)
    }

    /// Adds this field to `enc`.
    ///
    /// A failing object or array marshaler is replaced by a `<key>Error`
    /// string field holding the failure text; the caller's remaining fields
    /// are unaffected.
    pub fn add_to(&self, enc: &mut dyn ObjectEncoder) {
        let key = self.key.as_str();
        let result = match &self.value {
            FieldValue::String(v) => {
                enc.add_string(key, v);
                Ok(())
            }
            FieldValue::ByteString(v) => {
                enc.add_byte_string(key, v);
                Ok(())
            }
            FieldValue::Binary(v) => {
                enc.add_binary(key, v);
                Ok(())
            }
            FieldValue::Bool(v) => {
                enc.add_bool(key, *v);
                Ok(())
            }
            FieldValue::Int64(v) => {
                enc.add_int64(key, *v);
                Ok(())
            }
            FieldValue::Int32(v) => {
                enc.add_int32(key, *v);
                Ok(())
            }
            FieldValue::Int16(v) => {
                enc.add_int16(key, *v);
                Ok(())
            }
            FieldValue::Int8(v) => {
                enc.add_int8(key, *v);
                Ok(())
            }
            FieldValue::Uint64(v) => {
                enc.add_uint64(key, *v);
                Ok(())
            }
            FieldValue::Uint32(v) => {
                enc.add_uint32(key, *v);
                Ok(())
            }
            FieldValue::Uint16(v) => {
                enc.add_uint16(key, *v);
                Ok(())
            }
            FieldValue::Uint8(v) => {
                enc.add_uint8(key, *v);
                Ok(())
            }
            FieldValue::Uintptr(v) => {
                enc.add_uintptr(key, *v);
                Ok(())
            }
            FieldValue::Float64(v) => {
                enc.add_float64(key, *v);
                Ok(())
            }
            FieldValue::Float32(v) => {
                enc.add_float32(key, *v);
                Ok(())
            }
            FieldValue::Complex128(re, im) => {
                enc.add_complex128(key, *re, *im);
                Ok(())
            }
            FieldValue::Complex64(re, im) => {
                enc.add_complex64(key, *re, *im);
                Ok(())
            }
            FieldValue::Duration(v) => {
                enc.add_duration(key, *v);
                Ok(())
            }
            FieldValue::Time(v) => {
                enc.add_time(key, *v);
                Ok(())
            }
            FieldValue::Any(v) => {
                enc.add_any(key, v.clone());
                Ok(())
            }
            FieldValue::Error(msg) => {
                enc.add_string(key, msg);
                Ok(())
            }
            FieldValue::Reflected(v) => enc.add_reflected(key, v),
            FieldValue::Dict(fields) => enc.add_object(key, fields),
            FieldValue::Object(m) => enc.add_object(key, m.as_ref()),
            FieldValue::Array(m) => enc.add_array(key, m.as_ref()),
            FieldValue::Inline(m) => m.marshal_log_object(enc),
            FieldValue::Namespace => {
                enc.open_namespace(key);
                Ok(())
            }
            FieldValue::Skip => Ok(()),
        };

        if let Err(e) = result {
            tracing::debug!(key, error = %e, "marshaling field failed, substituting error field");
            enc.add_string(&format!("{key}Error"), &e.to_string());
        }
    }
}

/// Source location of a log call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryCaller {
    pub defined: bool,
    pub file: String,
    pub line: u32,
    pub function: String,
}

impl EntryCaller {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        EntryCaller { defined: true, file: file.into(), line, function: String::new() }
    }

    /// The location of whoever called the function this is used in.
    #[track_caller]
    pub fn here() -> Self {
        let loc = std::panic::Location::caller();
        EntryCaller::new(loc.file(), loc.line())
    }
}

/// A log entry in the named-field model, minus its fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub level: Level,
    pub time: DateTime<Utc>,
    pub logger_name: String,
    pub message: String,
    pub caller: EntryCaller,
}

impl Entry {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Entry {
            level,
            time: Utc::now(),
            logger_name: String::new(),
            message: message.into(),
            caller: EntryCaller::default(),
        }
    }
}

/// Destination contract of the named-field model.
///
/// `with` returns a derived core; implementations must not let the derived
/// instance's fields leak back into `self`.
pub trait Core: Send + Sync {
    /// Whether entries at `level` would be written.
    fn enabled(&self, level: Level) -> bool;

    /// Derive a core whose entries all carry `fields`.
    ///
    /// **Parameters**
    /// - `fields`: context fields, placed before each entry's own fields.
    ///   A namespace among them also scopes the fields of later writes.
    ///
    /// **Returns**
    /// - A new core. `self` is left unchanged, so cores derived from the
    ///   same parent never see each other's fields. Implementations may
    ///   return `self` when `fields` is empty.
    fn with(self: Arc<Self>, fields: Vec<Field>) -> Arc<dyn Core>;

    /// Decides whether `entry` should be written. Defaults to the level check.
    fn check(&self, entry: &Entry) -> bool {
        self.enabled(entry.level)
    }

    /// Write a single entry to the destination.
    ///
    /// **Parameters**
    /// - `entry`: level, time, logger name, message and caller.
    /// - `fields`: the call-site fields, after any context fields.
    ///
    /// **Returns**
    /// - `Ok(())` if the destination accepted the entry.
    /// - `Err(..)` if the destination failed. Adapters hand this error
    ///   back to their caller unchanged.
    fn write(&self, entry: Entry, fields: Vec<Field>) -> Result<(), BoxError>;

    /// Flush anything the destination buffers.
    ///
    /// Default implementation is a no-op.
    fn sync(&self) -> Result<(), BoxError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::ser::Error as _;

    #[derive(Default)]
    struct KeyLog(Vec<String>);

    impl ObjectEncoder for KeyLog {
        fn add_array(&mut self, key: &str, m: &dyn ArrayMarshaler) -> Result<(), MarshalError> {
            let mut sink: Vec<AnyValue> = Vec::new();
            m.marshal_log_array(&mut sink)?;
            self.0.push(format!("{key}=array({})", sink.len()));
            Ok(())
        }
        fn add_object(&mut self, key: &str, m: &dyn ObjectMarshaler) -> Result<(), MarshalError> {
            let mut nested = KeyLog::default();
            m.marshal_log_object(&mut nested)?;
            self.0.push(format!("{key}={{{}}}", nested.0.join(",")));
            Ok(())
        }
        fn add_binary(&mut self, key: &str, _: &[u8]) {
            self.0.push(format!("{key}=binary"));
        }
        fn add_byte_string(&mut self, key: &str, _: &[u8]) {
            self.0.push(format!("{key}=bytes"));
        }
        fn add_bool(&mut self, key: &str, v: bool) {
            self.0.push(format!("{key}={v}"));
        }
        fn add_complex128(&mut self, key: &str, _: f64, _: f64) {
            self.0.push(format!("{key}=c128"));
        }
        fn add_complex64(&mut self, key: &str, _: f32, _: f32) {
            self.0.push(format!("{key}=c64"));
        }
        fn add_duration(&mut self, key: &str, _: Duration) {
            self.0.push(format!("{key}=dur"));
        }
        fn add_float64(&mut self, key: &str, v: f64) {
            self.0.push(format!("{key}={v}"));
        }
        fn add_float32(&mut self, key: &str, v: f32) {
            self.0.push(format!("{key}={v}"));
        }
        fn add_int64(&mut self, key: &str, v: i64) {
            self.0.push(format!("{key}={v}"));
        }
        fn add_int32(&mut self, key: &str, v: i32) {
            self.0.push(format!("{key}={v}"));
        }
        fn add_int16(&mut self, key: &str, v: i16) {
            self.0.push(format!("{key}={v}"));
        }
        fn add_int8(&mut self, key: &str, v: i8) {
            self.0.push(format!("{key}={v}"));
        }
        fn add_string(&mut self, key: &str, v: &str) {
            self.0.push(format!("{key}={v}"));
        }
        fn add_time(&mut self, key: &str, _: DateTime<Utc>) {
            self.0.push(format!("{key}=time"));
        }
        fn add_uint64(&mut self, key: &str, v: u64) {
            self.0.push(format!("{key}={v}"));
        }
        fn add_uint32(&mut self, key: &str, v: u32) {
            self.0.push(format!("{key}={v}"));
        }
        fn add_uint16(&mut self, key: &str, v: u16) {
            self.0.push(format!("{key}={v}"));
        }
        fn add_uint8(&mut self, key: &str, v: u8) {
            self.0.push(format!("{key}={v}"));
        }
        fn add_uintptr(&mut self, key: &str, v: usize) {
            self.0.push(format!("{key}={v}"));
        }
        fn add_any(&mut self, key: &str, v: AnyValue) {
            self.0.push(format!("{key}={v}"));
        }
        fn add_reflected(&mut self, key: &str, v: &serde_json::Value) -> Result<(), MarshalError> {
            self.0.push(format!("{key}={v}"));
            Ok(())
        }
        fn open_namespace(&mut self, key: &str) {
            self.0.push(format!("ns:{key}"));
        }
    }

    impl ArrayEncoder for Vec<AnyValue> {
        fn append_array(&mut self, m: &dyn ArrayMarshaler) -> Result<(), MarshalError> {
            let mut nested: Vec<AnyValue> = Vec::new();
            m.marshal_log_array(&mut nested)?;
            self.push(AnyValue::List(nested));
            Ok(())
        }
        fn append_object(&mut self, _: &dyn ObjectMarshaler) -> Result<(), MarshalError> {
            self.push(AnyValue::Nil);
            Ok(())
        }
        fn append_reflected(&mut self, v: &serde_json::Value) -> Result<(), MarshalError> {
            self.push(AnyValue::Reflected(v.clone()));
            Ok(())
        }
        fn append_any(&mut self, value: AnyValue) {
            self.push(value);
        }
    }

    fn keys(fields: &[Field]) -> Vec<String> {
        let mut enc = KeyLog::default();
        for f in fields {
            f.add_to(&mut enc);
        }
        enc.0
    }

    #[test]
    fn failing_marshalers_become_error_fields() {
        let fields = vec![
            Field::string("before", "a"),
            Field::object(
                "obj",
                ObjectFn(|_: &mut dyn ObjectEncoder| -> Result<(), MarshalError> {
                    Err(MarshalError::msg("marshal error"))
                }),
            ),
            Field::array(
                "arr",
                ArrayFn(|_: &mut dyn ArrayEncoder| -> Result<(), MarshalError> {
                    Err(MarshalError::msg("array marshal error"))
                }),
            ),
            Field::string("after", "b"),
        ];
        assert_eq!(
            keys(&fields),
            vec![
                "before=a",
                "objError=marshal error",
                "arrError=array marshal error",
                "after=b",
            ]
        );
    }

    #[test]
    fn inline_skip_and_namespace() {
        let fields = vec![
            Field::inline(vec![Field::string("inlinekey", "inlinevalue")]),
            Field::skip(),
            Field::namespace("ns"),
            Field::dict("dict", vec![Field::int64("n", 1)]),
            Field::strings("tags", ["x", "y"]),
        ];
        assert_eq!(
            keys(&fields),
            vec!["inlinekey=inlinevalue", "ns:ns", "dict={n=1}", "tags=array(2)"]
        );
    }

    #[test]
    fn reflect_failure_is_reported_under_error_key() {
        struct Broken;
        impl Serialize for Broken {
            fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
                Err(S::Error::custom("cannot serialize"))
            }
        }

        let field = Field::reflect("payload", &Broken);
        assert_eq!(field.key, "payloadError");
        assert_eq!(field.value, FieldValue::String("cannot serialize".to_string()));

        #[derive(Serialize)]
        struct Named {
            name: &'static str,
        }
        let field = Field::reflect("reflect", &Named { name: "reflect" });
        assert_eq!(
            field.value,
            FieldValue::Reflected(serde_json::json!({"name": "reflect"}))
        );
    }

    #[test]
    fn any_picks_typed_constructor() {
        assert_eq!(Field::any("n", AnyValue::Int(3)), Field::int64("n", 3));
        assert_eq!(Field::any("s", AnyValue::from("x")), Field::string("s", "x"));
        let list = AnyValue::List(vec![AnyValue::Int(1)]);
        assert_eq!(Field::any("l", list.clone()).value, FieldValue::Any(list));
    }

    #[test]
    fn level_names() {
        assert_eq!(Level::DPANIC.to_string(), "dpanic");
        assert_eq!(Level(-2).to_string(), "Level(-2)");
        assert!(Level::DEBUG < Level::FATAL);
    }

    #[test]
    fn caller_here_is_defined() {
        let caller = EntryCaller::here();
        assert!(caller.defined);
        assert!(caller.file.ends_with("field.rs"));
        assert!(caller.line > 0);
    }
}
