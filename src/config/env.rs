use super::source::SettingsSource;
use super::{Settings, SettingsError};

/// Settings taken from environment variables named `PREFIX<separator>KEY`.
///
/// The remainder after the prefix becomes the key, with each further
/// separator replaced by `.` so that nested prefixes line up:
/// `APP__test__nestedId` maps to `test.nestedId` when the separator is `__`
/// and the key segments are written in the case the settings use.
#[derive(Debug, Clone)]
pub struct EnvSource {
    prefix: String,
    separator: String,
}

impl EnvSource {
    /// # Panics
    ///
    /// Panics if `separator` is empty.
    pub fn new(prefix: impl Into<String>, separator: impl Into<String>) -> Self {
        let separator = separator.into();
        assert!(!separator.is_empty(), "separator must not be empty");
        Self {
            prefix: prefix.into(),
            separator,
        }
    }

    fn entries<I>(&self, vars: I) -> Settings
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let prefix_with_sep = format!("{}{}", self.prefix, self.separator);
        let mut settings = Settings::new();

        for (name, value) in vars {
            if let Some(rest) = name.strip_prefix(&prefix_with_sep) {
                if rest.is_empty() {
                    continue;
                }
                settings.insert(rest.replace(&self.separator, "."), value);
            }
        }

        settings
    }
}

impl SettingsSource for EnvSource {
    fn load(&self) -> Result<Settings, SettingsError> {
        Ok(self.entries(std::env::vars()))
    }
}
