//! Conversion between the text form of a setting and typed values.

mod error;
mod kind;
mod registry;
mod value;

pub use error::ConvertError;
pub use kind::{SettingValue, TypeHandle, ValueKind};
pub use registry::{Converter, Registry};
pub use value::SettingType;
