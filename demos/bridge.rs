use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use logbridge::attr::{self, Attr, Handler, Record, Value};
use logbridge::field::{self, Core, Entry, EntryCaller, Field};
use logbridge::scope::ScopeTracker;
use logbridge::{BoxError, CoreHandler, CoreHandlerOptions, HandlerCore, HandlerCoreOptions};
use serde_json::{json, Map};

/// An attribute handler that prints each record as one JSON line. Stands in
/// for whatever structured encoder an application already uses.
#[derive(Clone)]
struct JsonLinesHandler {
    min_level: attr::Level,
    attrs: Vec<Attr>,
    groups: ScopeTracker,
    out: Arc<Mutex<()>>,
}

fn to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::String(s) => json!(s),
        Value::Int64(n) => json!(n),
        Value::Uint64(n) => json!(n),
        Value::Float64(f) => json!(f),
        Value::Bool(b) => json!(b),
        Value::Duration(d) => json!(format!("{d:?}")),
        Value::Time(t) => json!(t.to_rfc3339()),
        Value::Group(attrs) => {
            let map: Map<String, serde_json::Value> =
                attrs.iter().map(|a| (a.key.clone(), to_json(&a.value))).collect();
            serde_json::Value::Object(map)
        }
        Value::Any(any) => serde_json::to_value(any).unwrap_or(serde_json::Value::Null),
        Value::Lazy(_) => to_json(&value.clone().resolve()),
    }
}

impl Handler for JsonLinesHandler {
    fn enabled(&self, level: attr::Level) -> bool {
        level >= self.min_level
    }

    fn handle(&self, record: Record) -> Result<(), BoxError> {
        let mut line = Map::new();
        line.insert("time".into(), json!(record.time.to_rfc3339()));
        line.insert("level".into(), json!(record.level.to_string()));
        if let Some(src) = &record.source {
            line.insert("source".into(), json!(format!("{}:{}", src.file, src.line)));
        }
        line.insert("msg".into(), json!(record.message));

        let mut attrs = self.attrs.clone();
        attrs.extend(record.into_attrs());
        self.groups.fold(&mut attrs, |name, members| Attr::group(name, members));
        for a in &attrs {
            line.insert(a.key.clone(), to_json(&a.value));
        }

        let _guard = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        println!("{}", serde_json::to_string(&line)?);
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

/// A field core that prints a plain text line per entry.
#[derive(Clone, Default)]
struct PrintCore {
    context: Vec<Field>,
}

impl Core for PrintCore {
    fn enabled(&self, level: field::Level) -> bool {
        level >= field::Level::INFO
    }

    fn with(self: Arc<Self>, fields: Vec<Field>) -> Arc<dyn Core> {
        let mut context = self.context.clone();
        context.extend(fields);
        Arc::new(PrintCore { context })
    }

    fn write(&self, entry: Entry, fields: Vec<Field>) -> Result<(), BoxError> {
        println!(
            "[{}] {}: {} context={:?} fields={:?}",
            entry.level, entry.logger_name, entry.message, self.context, fields
        );
        Ok(())
    }
}

fn main() -> Result<(), BoxError> {
    // Named fields out through an attribute handler.
    let handler: Arc<dyn Handler> = Arc::new(JsonLinesHandler {
        min_level: attr::Level::DEBUG,
        attrs: Vec::new(),
        groups: ScopeTracker::new(),
        out: Arc::default(),
    });
    let core: Arc<dyn Core> = Arc::new(HandlerCore::new(
        handler,
        HandlerCoreOptions { stream_name_key: Some("logger".into()) },
    ));
    let core = core.with(vec![Field::string("service", "checkout"), Field::namespace("request")]);

    let mut entry = Entry::new(field::Level::WARN, "slow upstream");
    entry.logger_name = "http".into();
    entry.caller = EntryCaller::here();
    core.write(
        entry,
        vec![
            Field::string("path", "/cart"),
            Field::duration("latency", Duration::from_millis(870)),
            Field::strings("tags", ["retry", "cold-cache"]),
        ],
    )?;

    // Attribute records into a named-field core.
    let handler: Arc<dyn Handler> = Arc::new(CoreHandler::new(
        Arc::new(PrintCore::default()),
        CoreHandlerOptions { stream_name_key: Some("logger".into()), ..Default::default() },
    ));
    let handler = handler
        .with_attrs(vec![Attr::string("logger", "billing"), Attr::string("region", "eu")])
        .with_group("invoice");

    let mut record = Record::new(Utc::now(), attr::Level::ERROR, "charge declined");
    record.add_attrs([Attr::string("id", "inv-42"), Attr::uint("cents", 1999)]);
    handler.handle(record)?;

    Ok(())
}
