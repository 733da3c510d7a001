use crate::bind::FailureReport;
use crate::config::SettingsError;
use crate::convert::ConvertError;
use thiserror::Error;

/// Top-level error type for the settings-binder library.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("conversion error: {0}")]
    Convert(#[from] ConvertError),

    #[error("binding failed: {0}")]
    Binding(#[from] FailureReport),
}
