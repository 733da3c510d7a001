use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("required settings file not found: {0}")]
    SourceNotFound(PathBuf),

    #[error("failed to read settings file '{path}': {source}")]
    SourceUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("settings file '{path}' names unknown encoding '{label}'")]
    UnknownEncoding { path: PathBuf, label: String },

    #[error("failed to parse TOML settings file '{path}': {source}")]
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("cannot use non-scalar TOML value as a setting: {0}")]
    NonScalarValue(String),

    #[error("settings for '{path}' contain text that {encoding} cannot represent")]
    Unencodable { path: PathBuf, encoding: &'static str },

    #[error("failed to write settings file '{path}': {source}")]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },
}
