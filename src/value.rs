use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::{SerializeMap, SerializeSeq, SerializeStruct};
use serde::{Serialize, Serializer};
use std::fmt;
use std::time::Duration;

/// An untyped value shared by both logging models.
///
/// It is the element type of converted arrays, the payload of the attribute
/// model's opaque "any" kind and the target of reflected field values.
/// Objects nested in arrays are carried as ordered association lists
/// ([`AnyValue::Map`]) so field order survives conversion.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AnyValue {
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Complex { re: f64, im: f64 },
    String(String),
    Bytes(Vec<u8>),
    Duration(Duration),
    Time(DateTime<Utc>),
    Uintptr(usize),
    Reflected(serde_json::Value),
    Map(Vec<(String, AnyValue)>),
    List(Vec<AnyValue>),
}

impl AnyValue {
    pub fn is_nil(&self) -> bool {
        matches!(self, AnyValue::Nil)
    }

    /// Byte-string content: text when it is valid UTF-8, otherwise the raw
    /// bytes unchanged.
    pub fn from_byte_string(bytes: Vec<u8>) -> AnyValue {
        match String::from_utf8(bytes) {
            Ok(text) => AnyValue::String(text),
            Err(e) => AnyValue::Bytes(e.into_bytes()),
        }
    }

    /// Look up a key in a [`AnyValue::Map`]. Returns `None` for other kinds.
    pub fn get(&self, key: &str) -> Option<&AnyValue> {
        match self {
            AnyValue::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }
}

macro_rules! impl_trivial_from {
    ($t:ty, $variant:path) => {
        impl From<$t> for AnyValue {
            fn from(val: $t) -> AnyValue {
                $variant(val.into())
            }
        }
    };
}

impl_trivial_from!(bool, AnyValue::Bool);
impl_trivial_from!(i8, AnyValue::Int);
impl_trivial_from!(i16, AnyValue::Int);
impl_trivial_from!(i32, AnyValue::Int);
impl_trivial_from!(i64, AnyValue::Int);
impl_trivial_from!(u8, AnyValue::Uint);
impl_trivial_from!(u16, AnyValue::Uint);
impl_trivial_from!(u32, AnyValue::Uint);
impl_trivial_from!(u64, AnyValue::Uint);
impl_trivial_from!(f32, AnyValue::Float);
impl_trivial_from!(f64, AnyValue::Float);
impl_trivial_from!(String, AnyValue::String);
impl_trivial_from!(&str, AnyValue::String);
impl_trivial_from!(Duration, AnyValue::Duration);
impl_trivial_from!(DateTime<Utc>, AnyValue::Time);
impl_trivial_from!(serde_json::Value, AnyValue::Reflected);

impl<T: Into<AnyValue>> FromIterator<T> for AnyValue {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        AnyValue::List(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for AnyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnyValue::Nil => f.write_str("<nil>"),
            AnyValue::Bool(v) => write!(f, "{v}"),
            AnyValue::Int(v) => write!(f, "{v}"),
            AnyValue::Uint(v) => write!(f, "{v}"),
            AnyValue::Float(v) => write!(f, "{v}"),
            AnyValue::Complex { re, im } => write!(f, "({re}{im:+}i)"),
            AnyValue::String(v) => f.write_str(v),
            AnyValue::Bytes(v) => f.write_str(&String::from_utf8_lossy(v)),
            AnyValue::Duration(v) => write!(f, "{v:?}"),
            AnyValue::Time(v) => f.write_str(&v.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            AnyValue::Uintptr(v) => write!(f, "{v}"),
            AnyValue::Reflected(v) => write!(f, "{v}"),
            AnyValue::Map(entries) => {
                f.write_str("map[")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{k}:{v}")?;
                }
                f.write_str("]")
            }
            AnyValue::List(items) => {
                f.write_str("[")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl Serialize for AnyValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            AnyValue::Nil => serializer.serialize_unit(),
            AnyValue::Bool(v) => serializer.serialize_bool(*v),
            AnyValue::Int(v) => serializer.serialize_i64(*v),
            AnyValue::Uint(v) => serializer.serialize_u64(*v),
            AnyValue::Float(v) => serializer.serialize_f64(*v),
            AnyValue::Complex { re, im } => {
                let mut s = serializer.serialize_struct("Complex", 2)?;
                s.serialize_field("re", re)?;
                s.serialize_field("im", im)?;
                s.end()
            }
            AnyValue::String(v) => serializer.serialize_str(v),
            AnyValue::Bytes(v) => serializer.serialize_bytes(v),
            AnyValue::Duration(v) => serializer.collect_str(&format_args!("{v:?}")),
            AnyValue::Time(v) => {
                serializer.serialize_str(&v.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            AnyValue::Uintptr(v) => serializer.serialize_u64(*v as u64),
            AnyValue::Reflected(v) => v.serialize(serializer),
            AnyValue::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
            AnyValue::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for v in items {
                    seq.serialize_element(v)?;
                }
                seq.end()
            }
        }
    }
}
