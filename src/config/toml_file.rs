//! TOML files flattened into dotted settings keys.

use std::path::{Path, PathBuf};

use toml::{Table, Value};
use tracing::info;

use super::file::read_bytes;
use super::source::SettingsSource;
use super::{Settings, SettingsError};

/// A configuration source that loads a TOML file.
///
/// Tables become key prefixes joined with `.`, so
///
/// ```toml
/// [test]
/// nestedId = 12345
/// ```
///
/// yields the setting `test.nestedId=12345`. Arrays of scalars are joined
/// with `,` to match the text list convention.
#[derive(Debug, Clone)]
pub struct TomlSource {
    path: PathBuf,
    required: bool,
}

impl TomlSource {
    pub fn new(path: impl AsRef<Path>, required: bool) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            required,
        }
    }
}

impl SettingsSource for TomlSource {
    fn load(&self) -> Result<Settings, SettingsError> {
        let Some(bytes) = read_bytes(&self.path, self.required)? else {
            return Ok(Settings::new());
        };
        let contents = String::from_utf8_lossy(&bytes);
        let table: Table = toml::from_str(&contents).map_err(|e| SettingsError::TomlParse {
            path: self.path.clone(),
            source: e,
        })?;

        let settings = flatten(&table)?;
        info!(path = %self.path.display(), entries = settings.len(), "loaded TOML settings file");
        Ok(settings)
    }
}

/// Flattens a TOML table into dotted keys.
pub fn flatten(table: &Table) -> Result<Settings, SettingsError> {
    let mut settings = Settings::new();
    flatten_into(&mut settings, "", table)?;
    Ok(settings)
}

fn flatten_into(settings: &mut Settings, prefix: &str, table: &Table) -> Result<(), SettingsError> {
    for (key, value) in table {
        let path = format!("{prefix}{key}");
        match value {
            Value::Table(nested) => flatten_into(settings, &format!("{path}."), nested)?,
            Value::Array(items) => {
                let joined = items
                    .iter()
                    .map(|item| scalar_to_string(item, &path))
                    .collect::<Result<Vec<_>, _>>()?
                    .join(",");
                settings.insert(path, joined);
            }
            scalar => {
                let text = scalar_to_string(scalar, &path)?;
                settings.insert(path, text);
            }
        }
    }
    Ok(())
}

/// Converts a scalar TOML value to its string representation.
fn scalar_to_string(value: &Value, path: &str) -> Result<String, SettingsError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Integer(i) => Ok(i.to_string()),
        Value::Float(f) => Ok(f.to_string()),
        Value::Boolean(b) => Ok(b.to_string()),
        Value::Datetime(dt) => Ok(dt.to_string()),
        Value::Array(_) | Value::Table(_) => Err(SettingsError::NonScalarValue(path.to_string())),
    }
}
