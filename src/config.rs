use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::Error;

/// A tracked asset: the reference documents use, and where its content lives.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrackedFile {
    /// Path to the asset on disk.
    pub location: String,
    /// Reference string as it appears in `src`/`href` attributes.
    #[serde(rename = "ref")]
    pub reference: String,
}

impl fmt::Display for TrackedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return write!(f, "file[ref='{}',location='{}']", self.reference, self.location);
    }
}

/// Validated run configuration. Every dir exists and is a directory, every
/// mask is non-empty, and every tracked file exists and is a regular file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directories to scan for documents, in order.
    pub dirs: Vec<PathBuf>,
    /// Assets to hash-rename.
    pub files: Vec<TrackedFile>,
    /// File-name globs selecting documents, in order. Duplicates are kept.
    pub mask: Vec<String>,
}

/// Raw TOML structure of the config file.
#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    dirs: Vec<PathBuf>,
    #[serde(default)]
    files: Vec<TrackedFile>,
    #[serde(default)]
    mask: Vec<String>,
}

impl Config {
    /// Load and validate the config at `path`. Relative paths inside it are
    /// resolved against the working directory.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigNotFound` if the file doesn't exist,
    /// `Error::Io` for other read failures, `Error::ConfigInvalid` if the TOML
    /// is malformed or has unknown keys, or a validation error.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let content = match std::fs::read_to_string(path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::ConfigNotFound { path: path.to_path_buf() });
            },
            Err(e) => return Err(Error::Io { path: path.to_path_buf(), source: e }),
            Ok(c) => c,
        };
        return Self::parse(path, &content);
    }

    /// Decode and validate config text. `path` is only used in errors.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigInvalid` for malformed TOML, or a validation error.
    pub fn parse(path: &Path, content: &str) -> Result<Self, Error> {
        let raw: RawConfig = toml::from_str(content).map_err(|e| {
            return Error::ConfigInvalid { path: path.to_path_buf(), reason: e.to_string() };
        })?;
        let config = Self { dirs: raw.dirs, files: raw.files, mask: raw.mask };
        config.validate()?;
        return Ok(config);
    }

    /// Check dirs, then masks, then files. Stops at the first problem.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if a path cannot be inspected, `Error::NotADirectory`,
    /// `Error::EmptyMask`, or `Error::NotARegularFile`.
    fn validate(&self) -> Result<(), Error> {
        for dir in &self.dirs {
            let meta = std::fs::metadata(dir).map_err(Error::io(dir))?;
            if !meta.is_dir() {
                return Err(Error::NotADirectory { path: dir.clone() });
            }
        }
        if let Some(index) = self.mask.iter().position(String::is_empty) {
            return Err(Error::EmptyMask { index });
        }
        for file in &self.files {
            let location = Path::new(&file.location);
            let meta = std::fs::metadata(location).map_err(Error::io(location))?;
            if !meta.is_file() {
                return Err(Error::NotARegularFile { path: location.to_path_buf() });
            }
        }
        return Ok(());
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dirs: Vec<String> = self.dirs.iter().map(|d| return d.display().to_string()).collect();
        let files: Vec<String> = self.files.iter().map(ToString::to_string).collect();
        return write!(
            f,
            "config[dirs[{}],mask[{}],files[{}]]",
            dirs.join(","),
            self.mask.join(","),
            files.join(",")
        );
    }
}
