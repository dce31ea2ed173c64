use crate::attr::{Attr, Handler, Record, Source};
use crate::attr_encoder::AttrEncoder;
use crate::error::BoxError;
use crate::field::{self, Core, Entry, Field};
use crate::level::to_attr_level;
use std::sync::Arc;

/// Configuration of a [`HandlerCore`].
#[derive(Debug, Clone, Default)]
pub struct HandlerCoreOptions {
    /// When set and an entry has a logger name, the name is added as the
    /// record's first attribute under this key, outside any namespace.
    pub stream_name_key: Option<String>,
}

/// A named-field [`Core`] that writes to an attribute-model [`Handler`].
///
/// Fields given to [`Core::with`] are kept as fields and converted together
/// with each entry's own fields, so a namespace opened by `with` also
/// captures the fields of every later write. The handler's own
/// `with_attrs`/`with_group` are never used: the logger-name attribute must
/// stay outside any namespace.
pub struct HandlerCore {
    handler: Arc<dyn Handler>,
    options: HandlerCoreOptions,
    fields: Vec<Field>,
}

impl HandlerCore {
    pub fn new(handler: Arc<dyn Handler>, options: HandlerCoreOptions) -> Self {
        HandlerCore { handler, options, fields: Vec::new() }
    }

    fn stream_name_attr(&self, entry: &Entry) -> Option<Attr> {
        let key = self.options.stream_name_key.as_deref().filter(|k| !k.is_empty())?;
        if entry.logger_name.is_empty() {
            return None;
        }
        Some(Attr::string(key, entry.logger_name.as_str()))
    }
}

impl Core for HandlerCore {
    fn enabled(&self, level: field::Level) -> bool {
        self.handler.enabled(to_attr_level(level))
    }

    fn with(self: Arc<Self>, fields: Vec<Field>) -> Arc<dyn Core> {
        if fields.is_empty() {
            return self;
        }
        let mut all = Vec::with_capacity(self.fields.len() + fields.len());
        all.extend_from_slice(&self.fields);
        all.extend(fields);
        Arc::new(HandlerCore {
            handler: Arc::clone(&self.handler),
            options: self.options.clone(),
            fields: all,
        })
    }

    fn write(&self, entry: Entry, fields: Vec<Field>) -> Result<(), BoxError> {
        let level = to_attr_level(entry.level);
        if !self.handler.enabled(level) {
            tracing::trace!(%level, "destination disabled, dropping entry");
            return Ok(());
        }

        let stream_name = self.stream_name_attr(&entry);
        let Entry { time, message, caller, .. } = entry;

        let mut record = Record::new(time, level, message);
        if caller.defined {
            record.source =
                Some(Source { function: caller.function, file: caller.file, line: caller.line });
        }
        record.add_attrs(stream_name);

        let mut enc = AttrEncoder::new();
        enc.add_fields(&self.fields);
        enc.add_fields(&fields);
        record.add_attrs(enc.finish());

        self.handler.handle(record)
    }
}
