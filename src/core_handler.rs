use crate::attr::{self, Attr, Handler, Record, ReplaceAttr};
use crate::error::BoxError;
use crate::field::{Core, Entry, EntryCaller, Field};
use crate::field_encoder::FieldEncoder;
use crate::level::to_field_level;
use crate::scope::ScopeTracker;
use std::fmt;
use std::sync::Arc;

/// Configuration of a [`CoreHandler`].
#[derive(Clone, Default)]
pub struct CoreHandlerOptions {
    /// Copy the record's source location into the entry's caller.
    pub add_source: bool,
    /// Rewrites or elides attributes before they become fields.
    pub replace_attr: Option<ReplaceAttr>,
    /// A top-level string attribute with this key becomes the entry's logger
    /// name instead of a field.
    pub stream_name_key: Option<String>,
}

impl fmt::Debug for CoreHandlerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreHandlerOptions")
            .field("add_source", &self.add_source)
            .field("replace_attr", &self.replace_attr.as_ref().map(|_| ".."))
            .field("stream_name_key", &self.stream_name_key)
            .finish()
    }
}

/// An attribute-model [`Handler`] that writes to a named-field [`Core`].
///
/// `with_attrs` converts eagerly and `with_group` only records where the
/// group starts; both return a new handler and leave `self` untouched, so
/// handlers derived from the same parent never see each other's fields.
/// Groups are folded around the accumulated and per-record fields when a
/// record is handled.
pub struct CoreHandler {
    core: Arc<dyn Core>,
    options: Arc<CoreHandlerOptions>,
    stream_name: String,
    groups: ScopeTracker,
    fields: Vec<Field>,
}

impl CoreHandler {
    pub fn new(core: Arc<dyn Core>, options: CoreHandlerOptions) -> Self {
        CoreHandler {
            core,
            options: Arc::new(options),
            stream_name: String::new(),
            groups: ScopeTracker::new(),
            fields: Vec::new(),
        }
    }

    fn encoder(&self) -> FieldEncoder<'_> {
        FieldEncoder::new(
            self.options.replace_attr.as_ref(),
            self.options.stream_name_key.as_deref(),
        )
    }

    fn derive(&self, stream_name: String, groups: ScopeTracker, fields: Vec<Field>) -> Self {
        CoreHandler {
            core: Arc::clone(&self.core),
            options: Arc::clone(&self.options),
            stream_name,
            groups,
            fields,
        }
    }

    fn caller(&self, record: &Record) -> EntryCaller {
        match &record.source {
            Some(src) if self.options.add_source => EntryCaller {
                defined: true,
                file: src.file.clone(),
                line: src.line,
                function: src.function.clone(),
            },
            _ => EntryCaller::default(),
        }
    }
}

impl Handler for CoreHandler {
    fn enabled(&self, level: attr::Level) -> bool {
        self.core.enabled(to_field_level(level))
    }

    fn handle(&self, record: Record) -> Result<(), BoxError> {
        let level = to_field_level(record.level);
        if !self.core.enabled(level) {
            tracing::trace!(%level, "destination disabled, dropping record");
            return Ok(());
        }

        let caller = self.caller(&record);
        let time = record.time;
        let message = record.message.clone();

        let mut fields = Vec::with_capacity(self.fields.len() + record.num_attrs());
        fields.extend_from_slice(&self.fields);
        let mut chain = self.groups.names().to_vec();
        let captured = self.encoder().encode_into(&mut chain, record.into_attrs(), &mut fields);
        self.groups.fold(&mut fields, |name, members| Field::dict(name, members));

        let entry = Entry {
            level,
            time,
            logger_name: captured.unwrap_or_else(|| self.stream_name.clone()),
            message,
            caller,
        };
        if !self.core.check(&entry) {
            return Ok(());
        }

        self.core.write(entry, fields)
    }

    fn with_attrs(self: Arc<Self>, attrs: Vec<Attr>) -> Arc<dyn Handler> {
        if attrs.is_empty() {
            return self;
        }

        let (fields, captured) = self.encoder().encode(self.groups.names(), attrs);
        let stream_name = captured.unwrap_or_else(|| self.stream_name.clone());
        if fields.is_empty() && stream_name == self.stream_name {
            // Everything was elided.
            return self;
        }

        let mut all = Vec::with_capacity(self.fields.len() + fields.len());
        all.extend_from_slice(&self.fields);
        all.extend(fields);
        Arc::new(self.derive(stream_name, self.groups.clone(), all))
    }

    fn with_group(self: Arc<Self>, name: &str) -> Arc<dyn Handler> {
        if name.is_empty() {
            return self;
        }
        let mut groups = self.groups.clone();
        groups.open(name, self.fields.len());
        Arc::new(self.derive(self.stream_name.clone(), groups, self.fields.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::{Source, Value};
    use crate::field;
    use crate::testing::RecordingCore;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn record(level: attr::Level, message: &str, attrs: Vec<Attr>) -> Record {
        let time = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let mut r = Record::new(time, level, message);
        r.add_attrs(attrs);
        r
    }

    fn handler(core: &RecordingCore, options: CoreHandlerOptions) -> Arc<dyn Handler> {
        Arc::new(CoreHandler::new(Arc::new(core.clone()), options))
    }

    #[test]
    fn enabled_maps_levels() {
        let core = RecordingCore::new(field::Level::WARN);
        let h = handler(&core, CoreHandlerOptions::default());
        assert!(!h.enabled(attr::Level::INFO));
        assert!(h.enabled(attr::Level::WARN));
        assert!(h.enabled(attr::Level::ERROR));
        assert!(h.enabled(attr::Level(2)));
    }

    #[test]
    fn disabled_records_are_not_written() {
        let core = RecordingCore::new(field::Level::INFO);
        let h = handler(&core, CoreHandlerOptions::default());
        h.handle(record(attr::Level::DEBUG, "debug message", vec![])).unwrap();
        assert!(core.entries().is_empty());
    }

    #[test]
    fn converts_entry_and_fields() {
        let core = RecordingCore::new(field::Level::INFO);
        let h = handler(&core, CoreHandlerOptions::default());
        h.handle(record(
            attr::Level::WARN,
            "warning message",
            vec![Attr::string("user", "alice"), Attr::int("status", 404)],
        ))
        .unwrap();

        let got = core.last().unwrap();
        assert_eq!(got.entry.level, field::Level::WARN);
        assert_eq!(got.entry.message, "warning message");
        assert_eq!(got.entry.logger_name, "");
        assert!(!got.entry.caller.defined);
        assert_eq!(
            got.fields,
            vec![Field::string("user", "alice"), Field::int64("status", 404)]
        );
    }

    #[test]
    fn source_is_copied_only_when_enabled() {
        let src = Source { function: "main".into(), file: "main.rs".into(), line: 7 };
        for (add_source, with_src, want_defined) in
            [(true, true, true), (false, true, false), (true, false, false)]
        {
            let core = RecordingCore::new(field::Level::INFO);
            let h = handler(&core, CoreHandlerOptions { add_source, ..Default::default() });
            let mut r = record(attr::Level::INFO, "test message", vec![]);
            if with_src {
                r = r.with_source(src.clone());
            }
            h.handle(r).unwrap();

            let caller = core.last().unwrap().entry.caller;
            assert_eq!(caller.defined, want_defined);
            if want_defined {
                assert_eq!(caller.file, "main.rs");
                assert_eq!(caller.line, 7);
            }
        }
    }

    #[test]
    fn groups_wrap_accumulated_and_record_fields() {
        let core = RecordingCore::new(field::Level::INFO);
        let h = handler(&core, CoreHandlerOptions::default())
            .with_attrs(vec![Attr::string("env", "prod")])
            .with_group("server")
            .with_attrs(vec![Attr::string("host", "localhost")])
            .with_group("metrics")
            .with_attrs(vec![Attr::int("requests", 100)]);

        h.handle(record(
            attr::Level::INFO,
            "status report",
            vec![Attr::int("memory_mb", 1024), Attr::float("cpu_usage", 0.75)],
        ))
        .unwrap();

        assert_eq!(
            core.last().unwrap().fields,
            vec![
                Field::string("env", "prod"),
                Field::dict(
                    "server",
                    vec![
                        Field::string("host", "localhost"),
                        Field::dict(
                            "metrics",
                            vec![
                                Field::int64("requests", 100),
                                Field::int64("memory_mb", 1024),
                                Field::float64("cpu_usage", 0.75),
                            ]
                        ),
                    ]
                ),
            ]
        );
    }

    #[test]
    fn trailing_group_without_attrs_collects_record_fields() {
        let core = RecordingCore::new(field::Level::INFO);
        let h = handler(&core, CoreHandlerOptions::default())
            .with_group("app")
            .with_attrs(vec![Attr::string("name", "myapp")])
            .with_group("request");

        h.handle(record(
            attr::Level::INFO,
            "request processed",
            vec![
                Attr::string("method", "POST"),
                Attr::duration("latency", Duration::from_millis(50)),
            ],
        ))
        .unwrap();

        assert_eq!(
            core.last().unwrap().fields,
            vec![Field::dict(
                "app",
                vec![
                    Field::string("name", "myapp"),
                    Field::dict(
                        "request",
                        vec![
                            Field::string("method", "POST"),
                            Field::duration("latency", Duration::from_millis(50)),
                        ]
                    ),
                ]
            )]
        );
    }

    #[test]
    fn empty_group_at_handle_time_disappears() {
        let core = RecordingCore::new(field::Level::INFO);
        let h = handler(&core, CoreHandlerOptions::default())
            .with_attrs(vec![Attr::string("a", "1")])
            .with_group("unused");
        h.handle(record(attr::Level::INFO, "m", vec![])).unwrap();
        assert_eq!(core.last().unwrap().fields, vec![Field::string("a", "1")]);
    }

    #[test]
    fn stream_name_from_with_attrs() {
        let core = RecordingCore::new(field::Level::INFO);
        let options = CoreHandlerOptions {
            stream_name_key: Some("logger".into()),
            ..Default::default()
        };
        let h = handler(&core, options)
            .with_attrs(vec![Attr::string("logger", "mylogger"), Attr::string("env", "prod")]);
        h.handle(record(attr::Level::INFO, "test message", vec![])).unwrap();

        let got = core.last().unwrap();
        assert_eq!(got.entry.logger_name, "mylogger");
        assert_eq!(got.fields, vec![Field::string("env", "prod")]);
    }

    #[test]
    fn record_stream_name_overrides_accumulated_one() {
        let core = RecordingCore::new(field::Level::INFO);
        let options = CoreHandlerOptions {
            stream_name_key: Some("logger".into()),
            ..Default::default()
        };
        let h = handler(&core, options).with_attrs(vec![Attr::string("logger", "parent")]);
        h.handle(record(attr::Level::INFO, "m", vec![Attr::string("logger", "child")]))
            .unwrap();
        assert_eq!(core.last().unwrap().entry.logger_name, "child");
    }

    #[test]
    fn stream_name_key_inside_group_is_a_field() {
        let core = RecordingCore::new(field::Level::INFO);
        let options = CoreHandlerOptions {
            stream_name_key: Some("logger".into()),
            ..Default::default()
        };
        let h = handler(&core, options).with_group("g");
        h.handle(record(attr::Level::INFO, "m", vec![Attr::string("logger", "x")])).unwrap();

        let got = core.last().unwrap();
        assert_eq!(got.entry.logger_name, "");
        assert_eq!(got.fields, vec![Field::dict("g", vec![Field::string("logger", "x")])]);
    }

    #[test]
    fn with_attrs_applies_hook_once() {
        let core = RecordingCore::new(field::Level::INFO);
        let replace: ReplaceAttr = Arc::new(|_: &[String], a: Attr| match a.value {
            Value::String(s) => Attr::string(a.key, format!("test_{s}")),
            _ => a,
        });
        let options = CoreHandlerOptions { replace_attr: Some(replace), ..Default::default() };
        let h = handler(&core, options)
            .with_attrs(vec![Attr::string("env", "prod"), Attr::int("port", 8080)])
            .with_attrs(vec![Attr::string("service", "api")]);
        h.handle(record(attr::Level::INFO, "config loaded", vec![])).unwrap();

        assert_eq!(
            core.last().unwrap().fields,
            vec![
                Field::string("env", "test_prod"),
                Field::int64("port", 8080),
                Field::string("service", "test_api"),
            ]
        );
    }

    #[test]
    fn no_op_derivations_return_the_same_handler() {
        let core = RecordingCore::new(field::Level::INFO);
        let base: Arc<dyn Handler> = handler(&core, CoreHandlerOptions::default());
        let same = Arc::clone(&base).with_attrs(vec![]);
        assert!(Arc::ptr_eq(&base, &same));
        let same = Arc::clone(&base).with_attrs(vec![Attr::group("empty_group", vec![])]);
        assert!(Arc::ptr_eq(&base, &same));
        let same = Arc::clone(&base).with_group("");
        assert!(Arc::ptr_eq(&base, &same));
    }

    #[test]
    fn siblings_do_not_share_fields() {
        let core = RecordingCore::new(field::Level::INFO);
        let parent = handler(&core, CoreHandlerOptions::default())
            .with_attrs(vec![Attr::string("shared", "yes")]);
        let left = Arc::clone(&parent).with_attrs(vec![Attr::string("side", "left")]);
        let right = Arc::clone(&parent).with_group("right");

        left.handle(record(attr::Level::INFO, "l", vec![])).unwrap();
        right.handle(record(attr::Level::INFO, "r", vec![Attr::int("n", 1)])).unwrap();
        parent.handle(record(attr::Level::INFO, "p", vec![])).unwrap();

        let entries = core.entries();
        assert_eq!(
            entries[0].fields,
            vec![Field::string("shared", "yes"), Field::string("side", "left")]
        );
        assert_eq!(
            entries[1].fields,
            vec![Field::string("shared", "yes"), Field::dict("right", vec![Field::int64("n", 1)])]
        );
        assert_eq!(entries[2].fields, vec![Field::string("shared", "yes")]);
    }

    #[test]
    fn write_errors_are_returned() {
        let core = RecordingCore::failing(field::Level::INFO, "disk full");
        let h = handler(&core, CoreHandlerOptions::default());
        let err = h.handle(record(attr::Level::ERROR, "boom", vec![])).unwrap_err();
        assert_eq!(err.to_string(), "disk full");
    }

    #[test]
    fn with_attrs_resolves_lazy_values_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let core = RecordingCore::new(field::Level::INFO);
        let h = handler(&core, CoreHandlerOptions::default()).with_attrs(vec![Attr::lazy(
            "user",
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Value::from("alice")
            },
        )]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        h.handle(record(attr::Level::INFO, "first", vec![])).unwrap();
        h.handle(record(attr::Level::INFO, "second", vec![])).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let entries = core.entries();
        assert_eq!(entries.len(), 2);
        for written in entries {
            assert_eq!(written.fields, vec![Field::string("user", "alice")]);
        }
    }
}
