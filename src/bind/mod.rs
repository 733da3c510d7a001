//! Binding settings onto typed objects, and dumping them back.

mod binder;
mod dump;
mod error;
mod report;
mod schema;

pub use binder::{bind, stump};
pub use dump::dump;
pub use error::FieldError;
pub use report::FailureReport;
pub use schema::{Bindable, Binding, FieldMeta, Fields, Schema, SettingBuilder, SettingMeta};
