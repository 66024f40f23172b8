/// Crate-level error types for inject-hashes diagnostics.
use std::path::PathBuf;

/// All errors in inject-hashes carry enough context to produce a useful
/// diagnostic without a debugger. Each variant names the file, pattern, or
/// reason for failure. Nothing is retried: the first error aborts the run.
#[allow(clippy::error_impl_error, reason = "crate-internal error type in binary")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The config file passed on the command line does not exist.
    #[error("config not found: {}", path.display())]
    ConfigNotFound {
        /// Path to the missing config file.
        path: PathBuf,
    },

    /// The config file exists but cannot be decoded.
    #[error("invalid config {}: {reason}", path.display())]
    ConfigInvalid {
        /// Path to the config file.
        path: PathBuf,
        /// Decoder message.
        reason: String,
    },

    /// A mask entry in the config is the empty string.
    #[error("mask #{index} is empty")]
    EmptyMask {
        /// Zero-based position of the empty entry in the mask list.
        index: usize,
    },

    /// A mask is not a valid glob pattern.
    #[error("invalid mask `{pattern}`: {reason}")]
    Glob {
        /// The offending pattern.
        pattern: String,
        /// Description from the glob compiler.
        reason: String,
    },

    /// Open, read, or write failure on a specific file.
    #[error("io: {}: {source}", path.display())]
    Io {
        /// File being accessed.
        path: PathBuf,
        /// The wrapped I/O error.
        source: std::io::Error,
    },

    /// A configured directory exists but is not a directory.
    #[error("{} is not a directory", path.display())]
    NotADirectory {
        /// The offending path.
        path: PathBuf,
    },

    /// A tracked asset exists but is not a regular file.
    #[error("{} is not a regular file", path.display())]
    NotARegularFile {
        /// The offending path.
        path: PathBuf,
    },

    /// The tokenizer stopped on a failure other than a clean end of input.
    #[error("parse failed: {}: {reason}", path.display())]
    ParseFailed {
        /// Document being rewritten.
        path: PathBuf,
        /// Description of the failure.
        reason: String,
    },

    /// A rename failed: asset hashing, backup, or final swap.
    #[error("rename {} -> {}: {source}", from.display(), to.display())]
    Rename {
        /// Source of the rename.
        from: PathBuf,
        /// The wrapped I/O error.
        source: std::io::Error,
        /// Destination of the rename.
        to: PathBuf,
    },

    /// Directory traversal failed.
    #[error("walk {}: {source}", path.display())]
    Walk {
        /// Entry (or root) that could not be read.
        path: PathBuf,
        /// The wrapped walkdir error.
        source: walkdir::Error,
    },
}

impl Error {
    /// Lift a stream failure into a crate error attributed to `path`.
    pub fn from_stream(path: impl Into<PathBuf>, err: StreamError) -> Self {
        let path = path.into();
        return match err {
            StreamError::Io(source) => Error::Io { path, source },
            StreamError::Read { offset, source } => Error::ParseFailed {
                path,
                reason: format!("input failed at byte {offset}: {source}"),
            },
        };
    }

    /// Build an `Error::Io` for `path`. Meant for `map_err`.
    pub fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        return move |source| return Error::Io { path, source };
    }
}

/// Failures while tokenizing or rewriting a byte stream. The stream has no
/// path of its own; callers attach one with [`Error::from_stream`].
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// Writing the rewritten output failed.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// The tokenizer's input failed before a clean end of stream.
    #[error("input failed at byte {offset}: {source}")]
    Read {
        /// Bytes consumed before the failure.
        offset: u64,
        /// The wrapped I/O error.
        source: std::io::Error,
    },
}
