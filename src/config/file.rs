//! Line-oriented `key=value` settings files.

use std::io::Write;
use std::path::{Path, PathBuf};

use encoding_rs::{Encoding, UTF_8};
use tracing::{debug, info, warn};

use super::source::SettingsSource;
use super::{Settings, SettingsError};

/// Reserved key naming the encoding a file should be read with.
pub const ENCODING_KEY: &str = "encoding";

const BYTE_ORDER_MARK: char = '\u{feff}';

/// How the lines of a settings file are split into entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineFormat {
    /// Lines whose trimmed text starts with this are skipped.
    pub comment: String,
    /// Trim whitespace around keys and values.
    pub trim: bool,
}

impl Default for LineFormat {
    fn default() -> Self {
        Self {
            comment: "#".to_string(),
            trim: true,
        }
    }
}

/// The entries of a settings file and the encoding they were decoded with.
#[derive(Debug, Clone)]
pub struct FileContents {
    pub settings: Settings,
    pub encoding: &'static Encoding,
}

/// A configuration source that loads a `key=value` file.
///
/// Files can be marked as required or optional. Required files that don't exist
/// cause an error; optional files that don't exist are silently skipped.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    required: bool,
    encoding: Option<&'static Encoding>,
    format: LineFormat,
}

impl FileSource {
    /// Creates a new file source.
    ///
    /// If `required` is true, loading fails if the file doesn't exist.
    pub fn new(path: impl AsRef<Path>, required: bool) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            required,
            encoding: None,
            format: LineFormat::default(),
        }
    }

    /// Reads the file with `encoding`, ignoring any `encoding` entry inside it.
    pub fn with_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    pub fn with_format(mut self, format: LineFormat) -> Self {
        self.format = format;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the file, returning `Ok(None)` for a missing optional file.
    pub fn read(&self) -> Result<Option<FileContents>, SettingsError> {
        let Some(bytes) = read_bytes(&self.path, self.required)? else {
            return Ok(None);
        };

        if let Some(encoding) = self.encoding {
            let settings = parse_lines(&decode(&bytes, encoding), &self.format);
            return Ok(Some(FileContents { settings, encoding }));
        }

        let mut settings = parse_lines(&decode(&bytes, UTF_8), &self.format);
        let mut encoding = UTF_8;

        let declared = settings.get(ENCODING_KEY).unwrap_or_default().to_string();
        if !declared.is_empty() {
            let named =
                Encoding::for_label(declared.as_bytes()).ok_or_else(|| SettingsError::UnknownEncoding {
                    path: self.path.clone(),
                    label: declared.clone(),
                })?;
            if named != UTF_8 {
                debug!(path = %self.path.display(), encoding = named.name(), "reloading settings file");
                settings = parse_lines(&decode(&bytes, named), &self.format);
                encoding = named;
            }
        }

        info!(
            path = %self.path.display(),
            entries = settings.len(),
            encoding = encoding.name(),
            "loaded settings file"
        );
        Ok(Some(FileContents { settings, encoding }))
    }
}

impl SettingsSource for FileSource {
    fn load(&self) -> Result<Settings, SettingsError> {
        Ok(self.read()?.map(|contents| contents.settings).unwrap_or_default())
    }
}

/// Reads a file's bytes.
///
/// Returns `Ok(None)` if the file doesn't exist and `required` is false.
pub(crate) fn read_bytes(path: &Path, required: bool) -> Result<Option<Vec<u8>>, SettingsError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            if required {
                Err(SettingsError::SourceNotFound(path.to_path_buf()))
            } else {
                debug!(path = %path.display(), "optional settings file not found");
                Ok(None)
            }
        }
        Err(e) => Err(SettingsError::SourceUnreadable {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Writes `settings` to `path` as sorted `key=value` lines in `encoding`.
///
/// The text goes to a temporary file next to `path` first and is then
/// renamed over it, so readers never see a half-written file.
pub fn write_settings(
    path: &Path,
    settings: &Settings,
    encoding: &'static Encoding,
) -> Result<(), SettingsError> {
    let write_failed = |source: std::io::Error| SettingsError::WriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let mut text = settings.to_string();
    text.push('\n');
    let (bytes, _, unmappable) = encoding.encode(&text);
    if unmappable {
        return Err(SettingsError::Unencodable {
            path: path.to_path_buf(),
            encoding: encoding.name(),
        });
    }

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut staged = tempfile::NamedTempFile::new_in(dir).map_err(write_failed)?;
    staged.write_all(&bytes).map_err(write_failed)?;
    staged.persist(path).map_err(|e| write_failed(e.error))?;

    info!(path = %path.display(), entries = settings.len(), encoding = encoding.name(), "stored settings file");
    Ok(())
}

fn decode(bytes: &[u8], encoding: &'static Encoding) -> String {
    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

/// Splits text into settings, one `key=value` pair per line.
///
/// Only the first `=` separates key from value. Blank lines, comment lines and
/// lines without a key are skipped.
pub fn parse_lines(text: &str, format: &LineFormat) -> Settings {
    let mut settings = Settings::new();

    for (number, line) in text.lines().enumerate() {
        let line = line.replace(BYTE_ORDER_MARK, "");
        let trimmed = line.trim();
        if trimmed.is_empty() || (!format.comment.is_empty() && trimmed.starts_with(&format.comment)) {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            warn!(line = number + 1, "skipping line without '='");
            continue;
        };

        let (key, value) = if format.trim {
            (key.trim(), value.trim())
        } else {
            (key, value)
        };
        if key.trim().is_empty() {
            warn!(line = number + 1, "skipping line without key");
            continue;
        }
        settings.insert(key, value);
    }

    settings
}
