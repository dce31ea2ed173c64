//! In-memory destinations for both models.
//!
//! Clones share one log, so a test keeps a clone around to inspect what a
//! destination wrapped in an `Arc` received.

use crate::attr::{self, Attr, Handler, Record};
use crate::error::BoxError;
use crate::field::{self, Core, Entry, Field};
use crate::scope::ScopeTracker;
use std::sync::{Arc, Mutex, PoisonError};

/// An entry as a [`RecordingCore`] received it, context fields first.
#[derive(Debug, Clone, PartialEq)]
pub struct WrittenEntry {
    pub entry: Entry,
    pub fields: Vec<Field>,
}

/// A [`Core`] that keeps every written entry.
#[derive(Clone)]
pub struct RecordingCore {
    min_level: field::Level,
    context: Vec<Field>,
    written: Arc<Mutex<Vec<WrittenEntry>>>,
    fail_with: Option<String>,
}

impl RecordingCore {
    pub fn new(min_level: field::Level) -> Self {
        RecordingCore { min_level, context: Vec::new(), written: Arc::default(), fail_with: None }
    }

    /// A core whose writes fail with `message`. Nothing is recorded.
    pub fn failing(min_level: field::Level, message: impl Into<String>) -> Self {
        RecordingCore { fail_with: Some(message.into()), ..Self::new(min_level) }
    }

    pub fn entries(&self) -> Vec<WrittenEntry> {
        self.written.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn last(&self) -> Option<WrittenEntry> {
        self.written.lock().unwrap_or_else(PoisonError::into_inner).last().cloned()
    }
}

impl Core for RecordingCore {
    fn enabled(&self, level: field::Level) -> bool {
        level >= self.min_level
    }

    fn with(self: Arc<Self>, fields: Vec<Field>) -> Arc<dyn Core> {
        let mut derived = (*self).clone();
        derived.context.extend(fields);
        Arc::new(derived)
    }

    fn write(&self, entry: Entry, fields: Vec<Field>) -> Result<(), BoxError> {
        if let Some(message) = &self.fail_with {
            return Err(message.clone().into());
        }
        let mut all = self.context.clone();
        all.extend(fields);
        self.written
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(WrittenEntry { entry, fields: all });
        Ok(())
    }
}

/// A [`Handler`] that keeps every handled record.
///
/// Attributes from `with_attrs` and open groups are applied to each record
/// before it is stored, so the stored attributes are the full tree a
/// structured encoder would see.
#[derive(Clone)]
pub struct RecordingHandler {
    min_level: attr::Level,
    attrs: Vec<Attr>,
    groups: ScopeTracker,
    records: Arc<Mutex<Vec<Record>>>,
    fail_with: Option<String>,
}

impl RecordingHandler {
    pub fn new(min_level: attr::Level) -> Self {
        RecordingHandler {
            min_level,
            attrs: Vec::new(),
            groups: ScopeTracker::new(),
            records: Arc::default(),
            fail_with: None,
        }
    }

    /// A handler whose `handle` fails with `message`. Nothing is recorded.
    pub fn failing(min_level: attr::Level, message: impl Into<String>) -> Self {
        RecordingHandler { fail_with: Some(message.into()), ..Self::new(min_level) }
    }

    pub fn records(&self) -> Vec<Record> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn last(&self) -> Option<Record> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).last().cloned()
    }
}

impl Handler for RecordingHandler {
    fn enabled(&self, level: attr::Level) -> bool {
        level >= self.min_level
    }

    fn handle(&self, record: Record) -> Result<(), BoxError> {
        if let Some(message) = &self.fail_with {
            return Err(message.clone().into());
        }

        let mut stored = Record::new(record.time, record.level, record.message.clone());
        stored.source = record.source.clone();

        let mut attrs = self.attrs.clone();
        attrs.extend(record.into_attrs());
        self.groups.fold(&mut attrs, |name, members| Attr::group(name, members));
        stored.add_attrs(attrs);

        self.records.lock().unwrap_or_else(PoisonError::into_inner).push(stored);
        Ok(())
    }

    fn with_attrs(self: Arc<Self>, attrs: Vec<Attr>) -> Arc<dyn Handler> {
        let mut derived = (*self).clone();
        derived.attrs.extend(attrs);
        Arc::new(derived)
    }

    fn with_group(self: Arc<Self>, name: &str) -> Arc<dyn Handler> {
        let mut derived = (*self).clone();
        derived.groups.open(name, derived.attrs.len());
        Arc::new(derived)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_handler_applies_groups() {
        let handler = RecordingHandler::new(attr::Level::INFO);
        let derived = Arc::new(handler.clone())
            .with_attrs(vec![Attr::int("pid", 1)])
            .with_group("req")
            .with_attrs(vec![Attr::string("id", "r1")]);

        let mut record = Record::new(chrono::Utc::now(), attr::Level::INFO, "m");
        record.add_attrs([Attr::bool("ok", true)]);
        derived.handle(record).unwrap();

        assert_eq!(
            handler.last().unwrap().attrs(),
            [
                Attr::int("pid", 1),
                Attr::group("req", vec![Attr::string("id", "r1"), Attr::bool("ok", true)]),
            ]
        );
    }

    #[test]
    fn recording_core_prepends_context() {
        let core = RecordingCore::new(field::Level::INFO);
        let derived = Arc::new(core.clone()).with(vec![Field::int64("a", 1)]);
        derived.write(Entry::new(field::Level::INFO, "m"), vec![Field::int64("b", 2)]).unwrap();
        assert_eq!(core.last().unwrap().fields, vec![Field::int64("a", 1), Field::int64("b", 2)]);
    }
}
