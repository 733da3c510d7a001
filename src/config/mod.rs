//! Settings sources and loading.

mod builder;
mod env;
mod error;
pub mod file;
mod settings;
mod source;
mod toml_file;

pub use builder::{Loader, DEFAULT_FILE_NAME};
pub use env::EnvSource;
pub use error::SettingsError;
pub use file::{FileContents, FileSource, LineFormat, ENCODING_KEY};
pub use settings::Settings;
pub use source::SettingsSource;
pub use toml_file::{flatten as flatten_toml, TomlSource};
