//! Binds flat `key=value` settings onto typed objects.
//!
//! Types list their fields once in [`Bindable::describe`], with the key each
//! field reads, its default and whether it is optional. A [`Loader`] merges
//! settings from files, TOML, the environment or explicit values, converts
//! them through a [`Registry`] of converters and fills the object, reporting
//! every missing or malformed field at once. [`dump`] turns an object back
//! into settings.

pub mod bind;
pub mod config;
pub mod context;
pub mod convert;
mod error;

pub use bind::{bind, dump, stump, Bindable, FailureReport, FieldError, Fields, Schema};
pub use config::{Loader, Settings, SettingsError};
pub use context::Bound;
pub use convert::{ConvertError, Converter, Registry, SettingType, SettingValue, TypeHandle, ValueKind};
pub use error::Error;
