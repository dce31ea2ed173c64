//! Bidirectional adapter between a leveled named-field logging model
//! ([`field`]) and a leveled attribute-tree model ([`attr`]).
//!
//! [`HandlerCore`] lets code that writes named fields emit through an
//! attribute [`Handler`](attr::Handler); [`CoreHandler`] goes the other way
//! and feeds attribute records into a field [`Core`](field::Core).

pub mod value;
pub mod error;
pub mod field;
pub mod attr;
pub mod level;
pub mod scope;
pub mod attr_encoder;
pub mod field_encoder;
pub mod handler_core;
pub mod core_handler;
pub mod env;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use core_handler::{CoreHandler, CoreHandlerOptions};
pub use error::{BoxError, ConfigError, MarshalError};
pub use handler_core::{HandlerCore, HandlerCoreOptions};
pub use value::AnyValue;
