use super::{Settings, SettingsError};

/// Anything that can produce a batch of settings.
///
/// Sources are applied in order by the [`Loader`](super::Loader); keys from
/// later sources overwrite keys from earlier ones.
pub trait SettingsSource: Send + Sync + std::fmt::Debug {
    fn load(&self) -> Result<Settings, SettingsError>;
}

impl SettingsSource for Settings {
    fn load(&self) -> Result<Settings, SettingsError> {
        Ok(self.clone())
    }
}
