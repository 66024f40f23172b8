use std::fmt::Write as _;
use std::path::Path;

use crate::error::Error;
use crate::replace;

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Render an error as valid markdown with bold headings and print to stderr.
pub fn print_error(e: &Error) {
    let md = render_error(e);
    for line in md.lines() {
        if line.starts_with('#') {
            eprintln!("{BOLD}{line}{RESET}");
        } else {
            eprintln!("{line}");
        }
    }
}

/// Render an error as a structured markdown diagnostic: what happened and,
/// where there is something to do about it, how to fix it.
pub fn render_error(e: &Error) -> String {
    match e {
        Error::ConfigNotFound { path } => render_config_not_found(path),
        Error::EmptyMask { index } => render_empty_mask(*index),
        Error::Glob { pattern, reason } => render_glob(pattern, reason),
        Error::Rename { from, to, source } => render_rename(from, to, source),
        _ => render_generic(e),
    }
}

fn render_generic(e: &Error) -> String {
    match e {
        Error::ConfigInvalid { path, reason } => format!("\
# Error: Invalid Config

`{}` could not be decoded:

{reason}
", path.display()),

        Error::Io { path, source } => format!("\
# Error: I/O

`{}`: {source}
", path.display()),

        Error::NotADirectory { path } => format!("\
# Error: Not A Directory

`{}` is listed in `dirs` but is not a directory.
", path.display()),

        Error::NotARegularFile { path } => format!("\
# Error: Not A Regular File

`{}` is listed in `files` but is not a regular file.
", path.display()),

        Error::ParseFailed { path, reason } => format!("\
# Error: Parse Failed

Could not tokenize `{}`: {reason}

The document was left untouched.
", path.display()),

        Error::Walk { path, source } => format!("\
# Error: Directory Walk

Could not read `{}`: {source}
", path.display()),

        // Already handled in render_error, but need exhaustive match.
        _ => format!("\
# Error

{e}
"),
    }
}

fn render_config_not_found(path: &Path) -> String {
    format!("\
# Error: Config Not Found

`{}` does not exist.

## Fix

Pass an existing file with `--config`:

    inject-hashes --config hashes.toml
", path.display())
}

fn render_empty_mask(index: usize) -> String {
    format!("\
# Error: Empty Mask

Entry #{index} of `mask` is an empty string.

## Fix

Remove it or give it a pattern such as `\"*.html\"`.
")
}

fn render_glob(pattern: &str, reason: &str) -> String {
    format!("\
# Error: Invalid Mask

`{pattern}` is not a valid glob pattern: {reason}

No files were modified by the directory walk.
")
}

/// A failed swap leaves the original at `<path>.bak`; say so.
fn render_rename(from: &Path, to: &Path, source: &std::io::Error) -> String {
    let mut out = format!("\
# Error: Rename Failed

Could not rename `{}` to `{}`: {source}
", from.display(), to.display());

    let backup = replace::backup_path(to);
    if !backup.exists() {
        return out;
    }
    let _ = write!(out, "\
\n## Recover

The previous content of `{}` is at `{}`:

    mv {} {}
", to.display(), backup.display(), backup.display(), to.display());
    out
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, clippy::unwrap_used, reason = "tests")]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn glob_error_mentions_pattern() {
        let md = render_error(&Error::Glob { pattern: "[x".to_string(), reason: "invalid range".to_string() });
        assert!(md.starts_with("# Error: Invalid Mask"));
        assert!(md.contains("`[x`"));
    }

    #[test]
    fn failed_swap_points_at_backup() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("index.html");
        std::fs::write(replace::backup_path(&doc), "original").unwrap();

        let md = render_error(&Error::Rename {
            from: dir.path().join("index-abc.html"),
            source: std::io::Error::other("disk gone"),
            to: doc.clone(),
        });
        assert!(md.contains("## Recover"));
        assert!(md.contains(&format!("mv {}.bak {}", doc.display(), doc.display())));
    }

    #[test]
    fn asset_rename_has_no_recovery_section() {
        let md = render_error(&Error::Rename {
            from: PathBuf::from("assets/app.js"),
            source: std::io::Error::other("denied"),
            to: PathBuf::from("assets/app-1.js"),
        });
        assert!(!md.contains("## Recover"));
    }
}
