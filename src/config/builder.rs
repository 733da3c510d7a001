use std::any::Any;
use std::path::{Path, PathBuf};

use encoding_rs::{Encoding, UTF_8};

use super::env::EnvSource;
use super::file::{FileSource, LineFormat};
use super::source::SettingsSource;
use super::toml_file::TomlSource;
use super::Settings;
use crate::bind::{self, Bindable};
use crate::context::Bound;
use crate::convert::{Converter, Registry, SettingType, ValueKind};
use crate::Error;

/// Where [`Bound::store`] writes when no file location is known.
pub const DEFAULT_FILE_NAME: &str = "config.cfg";

/// A settings source in the loading pipeline.
#[derive(Debug)]
enum Source {
    File { path: PathBuf, required: bool },
    Other(Box<dyn SettingsSource>),
}

/// Builder for loading settings from several sources and binding them.
///
/// Sources are applied in registration order, with later sources overriding
/// earlier ones key by key. Converters registered on the loader apply to the
/// whole object graph, nested objects included.
///
/// ## Example
///
/// ```no_run
/// use settings_binder::{Bindable, Fields, Loader};
///
/// #[derive(Default)]
/// struct AppSettings {
///     name: String,
///     port: i32,
/// }
///
/// impl Bindable for AppSettings {
///     fn describe(fields: &mut Fields<Self>) {
///         fields.setting("name", |s| &s.name, |s| &mut s.name);
///         fields.setting("port", |s| &s.port, |s| &mut s.port).default("8080");
///     }
/// }
///
/// let settings = Loader::new()
///     .with_file("settings/default.cfg", true)
///     .with_file("settings/local.cfg", false)
///     .bind::<AppSettings>()?;
/// println!("{} listens on {}", settings.name, settings.port);
/// # Ok::<(), settings_binder::Error>(())
/// ```
#[derive(Debug, Default)]
#[must_use = "loaders do nothing until a bind method is called"]
pub struct Loader {
    sources: Vec<Source>,
    registry: Registry,
    format: LineFormat,
    encoding: Option<&'static Encoding>,
    location: Option<PathBuf>,
    deferred: Option<Error>,
}

/// Everything the sources produced, ready for binding.
struct Collected {
    settings: Settings,
    registry: Registry,
    encoding: &'static Encoding,
    location: PathBuf,
}

impl Loader {
    /// Creates a loader with the built-in converters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a `key=value` file to be loaded.
    ///
    /// If `required` is `true`, loading fails if the file doesn't exist.
    /// Optional files that are missing are silently skipped. The first file
    /// added becomes the default location for [`Bound::store`].
    pub fn with_file(mut self, path: impl AsRef<Path>, required: bool) -> Self {
        self.sources.push(Source::File {
            path: path.as_ref().to_path_buf(),
            required,
        });
        self
    }

    /// Adds a TOML file whose tables are flattened into dotted keys.
    pub fn with_toml_file(self, path: impl AsRef<Path>, required: bool) -> Self {
        self.with_source(TomlSource::new(path, required))
    }

    /// Adds environment variables named `PREFIX<separator>KEY`.
    pub fn with_env(self, prefix: impl Into<String>, separator: impl Into<String>) -> Self {
        self.with_source(EnvSource::new(prefix, separator))
    }

    pub fn with_source(mut self, source: impl SettingsSource + 'static) -> Self {
        self.sources.push(Source::Other(Box::new(source)));
        self
    }

    pub fn with_settings(self, settings: Settings) -> Self {
        self.with_source(settings)
    }

    pub fn with_setting(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut settings = Settings::new();
        settings.insert(key, value);
        self.with_source(settings)
    }

    /// Adds a typed value, converted to text with the loader's current converters.
    pub fn with_value<V: SettingType>(mut self, key: impl Into<String>, value: V) -> Self {
        let text = match value.to_value() {
            Some(value) => self.registry.render(V::kind(), &value),
            None => Ok(String::new()),
        };
        match text {
            Ok(text) => self.with_setting(key, text),
            Err(error) => {
                self.defer(error.into());
                self
            }
        }
    }

    /// Adds the current field values of an existing object as a source.
    pub fn with_object<T: Bindable>(mut self, object: &T) -> Self {
        match bind::dump(object, &self.registry) {
            Ok(settings) => self.with_settings(settings),
            Err(report) => {
                self.defer(report.into());
                self
            }
        }
    }

    /// Registers a converter for `kind`, replacing any existing one.
    pub fn with_converter(mut self, kind: ValueKind, converter: Converter) -> Self {
        self.registry.register(kind, converter);
        self
    }

    /// Declares `sup` as a supertype of `sub` for converter lookup.
    pub fn with_supertype(mut self, sub: ValueKind, sup: ValueKind) -> Self {
        if let Err(error) = self.registry.declare_supertype(sub, sup) {
            self.defer(error.into());
        }
        self
    }

    /// Makes `T` nameable in type name settings.
    pub fn with_type<T: Any + ?Sized>(mut self) -> Self {
        self.registry.register_type::<T>();
        self
    }

    /// Replaces all converters with `registry`.
    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    /// Lines starting with `designator` are ignored in `key=value` files.
    pub fn comment_designator(mut self, designator: impl Into<String>) -> Self {
        self.format.comment = designator.into();
        self
    }

    /// Whether keys and values in `key=value` files are trimmed. Defaults to `true`.
    pub fn trim(mut self, trim: bool) -> Self {
        self.format.trim = trim;
        self
    }

    /// Reads and writes `key=value` files with `encoding`, ignoring `encoding` entries.
    pub fn encoding(mut self, encoding: &'static Encoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    /// Where [`Bound::store`] writes.
    pub fn location(mut self, path: impl AsRef<Path>) -> Self {
        self.location = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Loads and merges all sources without binding.
    pub fn settings(self) -> Result<Settings, Error> {
        Ok(self.collect()?.settings)
    }

    /// Loads all sources and binds them onto a default `T`.
    ///
    /// Fails with [`Error::Binding`] listing every missing and failed field.
    pub fn bind<T: Bindable>(self) -> Result<Bound<T>, Error> {
        self.fill(T::default())
    }

    /// Loads all sources and binds them onto `target`.
    pub fn fill<T: Bindable>(self, mut target: T) -> Result<Bound<T>, Error> {
        let collected = self.collect()?;
        bind::bind(&mut target, &collected.settings, &collected.registry)?;
        Ok(collected.into_bound(target, Default::default()))
    }

    /// Loads all sources and binds what it can onto a default `T`.
    ///
    /// Missing and failed fields keep their initial values; the failures are
    /// available from [`Bound::report`]. Errors reading the sources still fail.
    pub fn stump<T: Bindable>(self) -> Result<Bound<T>, Error> {
        self.stump_from(T::default())
    }

    /// Like [`stump`](Self::stump), starting from `target`.
    pub fn stump_from<T: Bindable>(self, mut target: T) -> Result<Bound<T>, Error> {
        let collected = self.collect()?;
        let report = bind::stump(&mut target, &collected.settings, &collected.registry);
        Ok(collected.into_bound(target, report))
    }

    fn defer(&mut self, error: Error) {
        self.deferred.get_or_insert(error);
    }

    fn collect(self) -> Result<Collected, Error> {
        if let Some(error) = self.deferred {
            return Err(error);
        }

        let mut settings = Settings::new();
        let mut encoding = self.encoding.unwrap_or(UTF_8);
        let mut first_file = None;

        for source in self.sources {
            match source {
                Source::File { path, required } => {
                    let mut file = FileSource::new(&path, required).with_format(self.format.clone());
                    if let Some(forced) = self.encoding {
                        file = file.with_encoding(forced);
                    }
                    if let Some(contents) = file.read()? {
                        settings.merge(&contents.settings);
                        encoding = contents.encoding;
                    }
                    first_file.get_or_insert(path);
                }
                Source::Other(source) => settings.merge(&source.load()?),
            }
        }

        let location = self
            .location
            .or(first_file)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_FILE_NAME));

        Ok(Collected {
            settings,
            registry: self.registry,
            encoding,
            location,
        })
    }
}

impl Collected {
    fn into_bound<T>(self, value: T, report: bind::FailureReport) -> Bound<T> {
        Bound::new(value, self.settings, self.registry, self.encoding, self.location, report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::SettingValue;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[derive(Debug, Default)]
    struct Service {
        name: String,
        port: i32,
        tags: Option<Vec<String>>,
    }

    impl Bindable for Service {
        fn describe(fields: &mut crate::bind::Fields<Self>) {
            fields.setting("name", |s| &s.name, |s| &mut s.name);
            fields
                .setting("port", |s| &s.port, |s| &mut s.port)
                .default("80");
            fields.setting("tags", |s| &s.tags, |s| &mut s.tags).optional();
        }
    }

    fn file_with(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{contents}").unwrap();
        file
    }

    #[test]
    fn test_later_sources_override_earlier() {
        let base = file_with("name=base\nport=1\n");
        let local = file_with("port=2\n");

        let bound = Loader::new()
            .with_file(base.path(), true)
            .with_file(local.path(), true)
            .with_setting("name", "explicit")
            .bind::<Service>()
            .unwrap();

        assert_eq!(bound.name, "explicit");
        assert_eq!(bound.port, 2);
        assert_eq!(bound.location(), base.path());
    }

    #[test]
    fn test_missing_optional_file_is_skipped() {
        let bound = Loader::new()
            .with_file("/nonexistent/service.cfg", false)
            .with_setting("name", "svc")
            .bind::<Service>()
            .unwrap();

        assert_eq!(bound.port, 80);
    }

    #[test]
    fn test_missing_required_file_fails() {
        let result = Loader::new()
            .with_file("/nonexistent/service.cfg", true)
            .bind::<Service>();
        assert!(matches!(result, Err(Error::Settings(_))));
    }

    #[test]
    fn test_strict_bind_reports_missing() {
        let result = Loader::new().bind::<Service>();
        match result {
            Err(Error::Binding(report)) => assert_eq!(report.missing(), &["name"]),
            other => panic!("expected binding failure, got {other:?}"),
        }
    }

    #[test]
    fn test_stump_returns_report() {
        let bound = Loader::new().stump::<Service>().unwrap();
        assert!(bound.report().is_missing("name"));
        assert_eq!(bound.port, 80);
        assert_eq!(bound.location(), Path::new(DEFAULT_FILE_NAME));
    }

    #[test]
    fn test_typed_values_and_objects() {
        let previous = Service {
            name: "old".to_string(),
            port: 9,
            tags: Some(vec!["a".to_string(), "b".to_string()]),
        };

        let bound = Loader::new()
            .with_object(&previous)
            .with_value("port", 10)
            .bind::<Service>()
            .unwrap();

        assert_eq!(bound.name, "old");
        assert_eq!(bound.port, 10);
        assert_eq!(bound.tags.as_deref(), Some(&["a".to_string(), "b".to_string()][..]));
    }

    #[test]
    fn test_comment_designator_and_trim() {
        let file = file_with("; name=commented\n name = padded \n");

        let settings = Loader::new()
            .with_file(file.path(), true)
            .comment_designator(";")
            .trim(false)
            .settings()
            .unwrap();

        assert_eq!(settings.get(" name "), Some(" padded "));
        assert_eq!(settings.len(), 1);
    }

    #[test]
    fn test_custom_converter_applies() {
        let bound = Loader::new()
            .with_converter(
                ValueKind::I32,
                Converter::new(
                    |value| match value {
                        SettingValue::I32(v) => Some(format!("{v:x}")),
                        _ => None,
                    },
                    |raw| {
                        i32::from_str_radix(raw, 16)
                            .map(SettingValue::I32)
                            .map_err(|e| e.to_string())
                    },
                ),
            )
            .with_setting("name", "hex")
            .with_setting("port", "1f")
            .bind::<Service>()
            .unwrap();

        assert_eq!(bound.port, 31);
    }

    #[test]
    fn test_supertype_cycle_is_deferred() {
        let result = Loader::new()
            .with_supertype(ValueKind::Custom("a"), ValueKind::Custom("b"))
            .with_supertype(ValueKind::Custom("b"), ValueKind::Custom("a"))
            .settings();
        assert!(matches!(result, Err(Error::Convert(_))));
    }
}
