//! Attribute-tree to named-field conversion.
//!
//! Each attribute goes through the same pipeline: resolve a lazy value,
//! let the rewrite hook see it (groups excluded), resolve again in case the
//! hook produced a lazy value, drop it if it came back empty, and finally
//! convert it by kind. Groups recurse with their key appended to the group
//! chain the hook sees.

use crate::attr::{Attr, ReplaceAttr, Value};
use crate::field::Field;

/// Converts attributes to fields under one adapter's options.
#[derive(Clone, Copy, Default)]
pub struct FieldEncoder<'a> {
    replace_attr: Option<&'a ReplaceAttr>,
    stream_name_key: Option<&'a str>,
}

impl<'a> FieldEncoder<'a> {
    pub fn new(replace_attr: Option<&'a ReplaceAttr>, stream_name_key: Option<&'a str>) -> Self {
        FieldEncoder {
            replace_attr,
            stream_name_key: stream_name_key.filter(|k| !k.is_empty()),
        }
    }

    /// Convert `attrs` found inside the open groups `groups`.
    ///
    /// Returns the fields and, when `groups` is empty, the value of the first
    /// string attribute whose key is the stream-name key. That attribute is
    /// not emitted as a field.
    pub fn encode(
        &self,
        groups: &[String],
        attrs: impl IntoIterator<Item = Attr>,
    ) -> (Vec<Field>, Option<String>) {
        let mut chain = groups.to_vec();
        let mut fields = Vec::new();
        let stream_name = self.encode_into(&mut chain, attrs, &mut fields);
        (fields, stream_name)
    }

    /// Like [`encode`](Self::encode), appending to `out`.
    pub fn encode_into(
        &self,
        groups: &mut Vec<String>,
        attrs: impl IntoIterator<Item = Attr>,
        out: &mut Vec<Field>,
    ) -> Option<String> {
        let mut stream_name = None;
        for attr in attrs {
            let Some(attr) = self.resolve(groups, attr) else {
                continue;
            };

            if stream_name.is_none() && groups.is_empty() && self.is_stream_name(&attr) {
                if let Value::String(name) = attr.value {
                    stream_name = Some(name);
                    continue;
                }
            }

            if let Some(field) = self.convert(groups, attr) {
                out.push(field);
            }
        }
        stream_name
    }

    fn is_stream_name(&self, attr: &Attr) -> bool {
        matches!(attr.value, Value::String(_)) && self.stream_name_key == Some(attr.key.as_str())
    }

    /// Resolve, rewrite and resolve again. `None` means the attribute is elided.
    fn resolve(&self, groups: &[String], mut attr: Attr) -> Option<Attr> {
        attr.value = attr.value.resolve();
        if !attr.value.is_group() {
            if let Some(replace) = self.replace_attr {
                attr = replace(groups, attr);
                attr.value = attr.value.resolve();
            }
        }
        (!attr.is_empty()).then_some(attr)
    }

    fn convert(&self, groups: &mut Vec<String>, attr: Attr) -> Option<Field> {
        let Attr { key, value } = attr;
        let field = match value {
            Value::String(v) => Field::string(key, v),
            Value::Int64(v) => Field::int64(key, v),
            Value::Uint64(v) => Field::uint64(key, v),
            Value::Float64(v) => Field::float64(key, v),
            Value::Bool(v) => Field::bool(key, v),
            Value::Duration(v) => Field::duration(key, v),
            Value::Time(v) => Field::time(key, v),
            Value::Any(v) => Field::any(key, v),
            Value::Group(attrs) => {
                groups.push(key);
                let mut nested = Vec::with_capacity(attrs.len());
                self.encode_into(groups, attrs, &mut nested);
                let key = groups.pop().unwrap_or_default();
                if nested.is_empty() {
                    return None;
                }
                Field::dict(key, nested)
            }
            // `resolve` never leaves a lazy value behind.
            lazy @ Value::Lazy(_) => return self.convert(groups, Attr::new(key, lazy.resolve())),
        };
        Some(field)
    }
}
