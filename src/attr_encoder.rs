//! Named-field to attribute-tree conversion.
//!
//! [`AttrEncoder`] is an [`ObjectEncoder`] that collects attributes. Fields
//! are added in order; namespace markers only record where their scope
//! starts, and [`AttrEncoder::finish`] folds each scope into a group once
//! every field has been seen. Arrays are collected by [`SliceArrayEncoder`]
//! into [`AnyValue`] lists, and objects nested in arrays by
//! [`MapObjectEncoder`] into association lists.

use crate::attr::{Attr, Value};
use crate::error::MarshalError;
use crate::field::{ArrayEncoder, ArrayMarshaler, Field, ObjectEncoder, ObjectMarshaler};
use crate::scope::ScopeTracker;
use crate::value::AnyValue;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Typical number of fields in a single log call.
const ATTRS_INLINE: usize = 5;

#[derive(Debug, Default)]
pub struct AttrEncoder {
    attrs: Vec<Attr>,
    scopes: ScopeTracker,
}

impl AttrEncoder {
    pub fn new() -> Self {
        AttrEncoder { attrs: Vec::with_capacity(ATTRS_INLINE), scopes: ScopeTracker::new() }
    }

    /// Convert a complete field list.
    pub fn encode(fields: &[Field]) -> Vec<Attr> {
        let mut enc = AttrEncoder::new();
        enc.add_fields(fields);
        enc.finish()
    }

    pub fn add_fields(&mut self, fields: &[Field]) {
        for field in fields {
            field.add_to(self);
        }
    }

    /// Close every open namespace, innermost first, and return the result.
    pub fn finish(self) -> Vec<Attr> {
        let AttrEncoder { mut attrs, scopes } = self;
        scopes.fold(&mut attrs, |name, members| Attr::group(name, members));
        attrs
    }

    fn push(&mut self, key: &str, value: Value) {
        self.attrs.push(Attr::new(key, value));
    }
}

impl ObjectEncoder for AttrEncoder {
    fn add_array(&mut self, key: &str, marshaler: &dyn ArrayMarshaler) -> Result<(), MarshalError> {
        let mut enc = SliceArrayEncoder::default();
        marshaler.marshal_log_array(&mut enc)?;
        // Unlike objects, an empty array is still emitted.
        self.push(key, Value::Any(AnyValue::List(enc.into_elems())));
        Ok(())
    }

    fn add_object(
        &mut self,
        key: &str,
        marshaler: &dyn ObjectMarshaler,
    ) -> Result<(), MarshalError> {
        let mut enc = AttrEncoder::new();
        marshaler.marshal_log_object(&mut enc)?;
        let attrs = enc.finish();
        if !attrs.is_empty() {
            self.push(key, Value::Group(attrs));
        }
        Ok(())
    }

    fn add_binary(&mut self, key: &str, value: &[u8]) {
        self.push(key, Value::Any(AnyValue::Bytes(value.to_vec())));
    }

    fn add_byte_string(&mut self, key: &str, value: &[u8]) {
        let value = match AnyValue::from_byte_string(value.to_vec()) {
            AnyValue::String(text) => Value::String(text),
            raw => Value::Any(raw),
        };
        self.push(key, value);
    }

    fn add_bool(&mut self, key: &str, value: bool) {
        self.push(key, Value::Bool(value));
    }

    fn add_complex128(&mut self, key: &str, re: f64, im: f64) {
        self.push(key, Value::Any(AnyValue::Complex { re, im }));
    }

    fn add_complex64(&mut self, key: &str, re: f32, im: f32) {
        self.push(key, Value::Any(AnyValue::Complex { re: re.into(), im: im.into() }));
    }

    fn add_duration(&mut self, key: &str, value: Duration) {
        self.push(key, Value::Duration(value));
    }

    fn add_float64(&mut self, key: &str, value: f64) {
        self.push(key, Value::Float64(value));
    }

    fn add_float32(&mut self, key: &str, value: f32) {
        self.push(key, Value::Float64(value.into()));
    }

    fn add_int64(&mut self, key: &str, value: i64) {
        self.push(key, Value::Int64(value));
    }

    fn add_int32(&mut self, key: &str, value: i32) {
        self.push(key, Value::Int64(value.into()));
    }

    fn add_int16(&mut self, key: &str, value: i16) {
        self.push(key, Value::Int64(value.into()));
    }

    fn add_int8(&mut self, key: &str, value: i8) {
        self.push(key, Value::Int64(value.into()));
    }

    fn add_string(&mut self, key: &str, value: &str) {
        self.push(key, Value::String(value.to_string()));
    }

    fn add_time(&mut self, key: &str, value: DateTime<Utc>) {
        self.push(key, Value::Time(value));
    }

    fn add_uint64(&mut self, key: &str, value: u64) {
        self.push(key, Value::Uint64(value));
    }

    fn add_uint32(&mut self, key: &str, value: u32) {
        self.push(key, Value::Uint64(value.into()));
    }

    fn add_uint16(&mut self, key: &str, value: u16) {
        self.push(key, Value::Uint64(value.into()));
    }

    fn add_uint8(&mut self, key: &str, value: u8) {
        self.push(key, Value::Uint64(value.into()));
    }

    fn add_uintptr(&mut self, key: &str, value: usize) {
        self.push(key, Value::Any(AnyValue::Uintptr(value)));
    }

    fn add_any(&mut self, key: &str, value: AnyValue) {
        self.push(key, Value::Any(value));
    }

    fn add_reflected(&mut self, key: &str, value: &serde_json::Value) -> Result<(), MarshalError> {
        self.push(key, Value::Any(AnyValue::Reflected(value.clone())));
        Ok(())
    }

    fn open_namespace(&mut self, key: &str) {
        self.scopes.open(key, self.attrs.len());
    }
}

/// Collects array elements as untyped values.
///
/// Nested arrays and objects are pushed even when their marshaler fails
/// part-way, so whatever was produced before the failure is kept; the error
/// is still returned to the caller.
#[derive(Debug, Default)]
pub struct SliceArrayEncoder {
    elems: Vec<AnyValue>,
}

impl SliceArrayEncoder {
    pub fn into_elems(self) -> Vec<AnyValue> {
        self.elems
    }
}

impl ArrayEncoder for SliceArrayEncoder {
    fn append_array(&mut self, marshaler: &dyn ArrayMarshaler) -> Result<(), MarshalError> {
        let mut enc = SliceArrayEncoder::default();
        let result = marshaler.marshal_log_array(&mut enc);
        self.elems.push(AnyValue::List(enc.into_elems()));
        result
    }

    fn append_object(&mut self, marshaler: &dyn ObjectMarshaler) -> Result<(), MarshalError> {
        let mut enc = MapObjectEncoder::default();
        let result = marshaler.marshal_log_object(&mut enc);
        self.elems.push(AnyValue::Map(enc.finish()));
        result
    }

    fn append_reflected(&mut self, value: &serde_json::Value) -> Result<(), MarshalError> {
        self.elems.push(AnyValue::Reflected(value.clone()));
        Ok(())
    }

    fn append_any(&mut self, value: AnyValue) {
        self.elems.push(value);
    }
}

/// Collects an object's fields as an ordered association list.
///
/// Namespaces nest subsequent fields into a map under the namespace key.
#[derive(Debug, Default)]
pub struct MapObjectEncoder {
    fields: Vec<(String, AnyValue)>,
    scopes: ScopeTracker,
}

impl MapObjectEncoder {
    pub fn finish(self) -> Vec<(String, AnyValue)> {
        let MapObjectEncoder { mut fields, scopes } = self;
        scopes.fold(&mut fields, |name, members| (name.to_string(), AnyValue::Map(members)));
        fields
    }

    fn put(&mut self, key: &str, value: AnyValue) {
        self.fields.push((key.to_string(), value));
    }
}

impl ObjectEncoder for MapObjectEncoder {
    fn add_array(&mut self, key: &str, marshaler: &dyn ArrayMarshaler) -> Result<(), MarshalError> {
        let mut enc = SliceArrayEncoder::default();
        marshaler.marshal_log_array(&mut enc)?;
        self.put(key, AnyValue::List(enc.into_elems()));
        Ok(())
    }

    fn add_object(
        &mut self,
        key: &str,
        marshaler: &dyn ObjectMarshaler,
    ) -> Result<(), MarshalError> {
        let mut enc = MapObjectEncoder::default();
        marshaler.marshal_log_object(&mut enc)?;
        self.put(key, AnyValue::Map(enc.finish()));
        Ok(())
    }

    fn add_binary(&mut self, key: &str, value: &[u8]) {
        self.put(key, AnyValue::Bytes(value.to_vec()));
    }

    fn add_byte_string(&mut self, key: &str, value: &[u8]) {
        self.put(key, AnyValue::from_byte_string(value.to_vec()));
    }

    fn add_bool(&mut self, key: &str, value: bool) {
        self.put(key, AnyValue::Bool(value));
    }

    fn add_complex128(&mut self, key: &str, re: f64, im: f64) {
        self.put(key, AnyValue::Complex { re, im });
    }

    fn add_complex64(&mut self, key: &str, re: f32, im: f32) {
        self.put(key, AnyValue::Complex { re: re.into(), im: im.into() });
    }

    fn add_duration(&mut self, key: &str, value: Duration) {
        self.put(key, AnyValue::Duration(value));
    }

    fn add_float64(&mut self, key: &str, value: f64) {
        self.put(key, AnyValue::Float(value));
    }

    fn add_float32(&mut self, key: &str, value: f32) {
        self.put(key, AnyValue::Float(value.into()));
    }

    fn add_int64(&mut self, key: &str, value: i64) {
        self.put(key, AnyValue::Int(value));
    }

    fn add_int32(&mut self, key: &str, value: i32) {
        self.put(key, AnyValue::Int(value.into()));
    }

    fn add_int16(&mut self, key: &str, value: i16) {
        self.put(key, AnyValue::Int(value.into()));
    }

    fn add_int8(&mut self, key: &str, value: i8) {
        self.put(key, AnyValue::Int(value.into()));
    }

    fn add_string(&mut self, key: &str, value: &str) {
        self.put(key, AnyValue::String(value.to_string()));
    }

    fn add_time(&mut self, key: &str, value: DateTime<Utc>) {
        self.put(key, AnyValue::Time(value));
    }

    fn add_uint64(&mut self, key: &str, value: u64) {
        self.put(key, AnyValue::Uint(value));
    }

    fn add_uint32(&mut self, key: &str, value: u32) {
        self.put(key, AnyValue::Uint(value.into()));
    }

    fn add_uint16(&mut self, key: &str, value: u16) {
        self.put(key, AnyValue::Uint(value.into()));
    }

    fn add_uint8(&mut self, key: &str, value: u8) {
        self.put(key, AnyValue::Uint(value.into()));
    }

    fn add_uintptr(&mut self, key: &str, value: usize) {
        self.put(key, AnyValue::Uintptr(value));
    }

    fn add_any(&mut self, key: &str, value: AnyValue) {
        self.put(key, value);
    }

    fn add_reflected(&mut self, key: &str, value: &serde_json::Value) -> Result<(), MarshalError> {
        self.put(key, AnyValue::Reflected(value.clone()));
        Ok(())
    }

    fn open_namespace(&mut self, key: &str) {
        self.scopes.open(key, self.fields.len());
    }
}
