use std::fmt;

use super::FieldError;

/// Everything that went wrong during one binding pass.
///
/// Missing fields had no usable value and no default; errored fields had a
/// value that could not be converted or assigned.
#[derive(Debug, Clone, Default)]
pub struct FailureReport {
    missing: Vec<&'static str>,
    errored: Vec<(&'static str, FieldError)>,
}

impl FailureReport {
    pub(crate) fn record_missing(&mut self, field: &'static str) {
        self.missing.push(field);
    }

    pub(crate) fn record_error(&mut self, field: &'static str, error: FieldError) {
        self.errored.push((field, error));
    }

    /// Names of the non-optional fields that had no value.
    pub fn missing(&self) -> &[&'static str] {
        &self.missing
    }

    /// Fields whose value failed, with the reason.
    pub fn errored(&self) -> &[(&'static str, FieldError)] {
        &self.errored
    }

    pub fn is_missing(&self, field: &str) -> bool {
        self.missing.iter().any(|name| *name == field)
    }

    pub fn error_for(&self, field: &str) -> Option<&FieldError> {
        self.errored
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, error)| error)
    }

    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.errored.is_empty()
    }

    pub(crate) fn into_result(self) -> Result<(), FailureReport> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FailureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.missing.is_empty() {
            write!(
                f,
                "the following non-optional settings are missing: {}",
                self.missing.join(", ")
            )?;
        }
        if !self.errored.is_empty() {
            if !self.missing.is_empty() {
                f.write_str("; ")?;
            }
            f.write_str("the following settings failed: ")?;
            for (index, (field, error)) in self.errored.iter().enumerate() {
                if index > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{field} ({error})")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for FailureReport {}
