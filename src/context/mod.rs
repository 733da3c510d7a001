//! A bound object together with what it was bound from.

use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};

use encoding_rs::Encoding;

use crate::bind::{self, Bindable, FailureReport};
use crate::config::{file, Settings};
use crate::convert::Registry;
use crate::Error;

/// An object bound by a [`Loader`](crate::Loader), plus the state needed to
/// write it back.
///
/// Dereferences to the bound object, so fields are read directly. The
/// settings the object was bound from, the converters, the file encoding
/// and the storage location travel with it, so [`store`](Self::store) can
/// persist the object including any keys it does not declare.
///
/// ## Example
///
/// ```no_run
/// use settings_binder::{Bindable, Fields, Loader};
///
/// #[derive(Default)]
/// struct Template {
///     user: String,
/// }
///
/// impl Bindable for Template {
///     fn describe(fields: &mut Fields<Self>) {
///         fields.setting("user", |t| &t.user, |t| &mut t.user);
///     }
/// }
///
/// // Write a template with blank entries for a human to fill in.
/// let stump = Loader::new().stump::<Template>()?;
/// stump.store_to("template.cfg")?;
/// # Ok::<(), settings_binder::Error>(())
/// ```
#[derive(Debug)]
pub struct Bound<T> {
    value: T,
    settings: Settings,
    registry: Registry,
    encoding: &'static Encoding,
    location: PathBuf,
    report: FailureReport,
}

impl<T> Bound<T> {
    pub(crate) fn new(
        value: T,
        settings: Settings,
        registry: Registry,
        encoding: &'static Encoding,
        location: PathBuf,
        report: FailureReport,
    ) -> Self {
        Self {
            value,
            settings,
            registry,
            encoding,
            location,
            report,
        }
    }

    /// The merged settings the object was bound from.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    /// Where [`store`](Self::store) writes.
    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Failures suppressed by a best-effort bind. Empty after a strict bind.
    pub fn report(&self) -> &FailureReport {
        &self.report
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T: Bindable> Bound<T> {
    /// The source settings overlaid with the object's current field values.
    pub fn snapshot(&self) -> Result<Settings, Error> {
        let mut merged = self.settings.clone();
        merged.merge(&bind::dump(&self.value, &self.registry)?);
        Ok(merged)
    }

    /// Renders [`snapshot`](Self::snapshot) as sorted `key=value` lines.
    pub fn render(&self) -> Result<String, Error> {
        Ok(self.snapshot()?.to_string())
    }

    /// Writes the snapshot to [`location`](Self::location).
    pub fn store(&self) -> Result<(), Error> {
        self.store_to(&self.location)
    }

    /// Writes the snapshot to `path`, replacing the file atomically.
    pub fn store_to(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        file::write_settings(path.as_ref(), &self.snapshot()?, self.encoding)?;
        Ok(())
    }
}

impl<T> Deref for Bound<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> DerefMut for Bound<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}
