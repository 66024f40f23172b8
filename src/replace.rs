//! In-place document replacement: rewrite into a sibling temp file, move the
//! original to `<path>.bak`, then move the temp file into place.
//!
//! The swap is two renames, not one atomic operation. If the second rename
//! fails, the original content is at `<path>.bak` and `<path>` is missing.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write as _};
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::rewrite::rewrite;
use crate::rule::Rule;
use crate::sink::{Event, Sink};

/// Rewrite `path` in place according to `rules`, keeping the previous
/// content at `<path>.bak` (overwriting any older backup).
///
/// Returns the number of attributes substituted.
///
/// # Errors
///
/// Returns `Error::Io` if the document cannot be opened or the temp file
/// cannot be written, `Error::ParseFailed` if reading the document fails
/// part-way through tokenizing, or
/// `Error::Rename` if either rename of the swap fails.
pub fn apply_rules(path: &Path, rules: &[Rule], sink: &dyn Sink) -> Result<usize, Error> {
    let source = File::open(path).map_err(Error::io(path))?;
    let permissions = source.metadata().map_err(Error::io(path))?.permissions();

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let (stem, ext) = split_extension(path);
    let mut temp = tempfile::Builder::new()
        .prefix(&format!("{stem}-"))
        .suffix(&ext)
        .tempfile_in(dir)
        .map_err(Error::io(dir))?;
    let temp_path = temp.path().to_path_buf();

    let substitutions = {
        let mut writer = BufWriter::new(temp.as_file_mut());
        let count = rewrite(BufReader::new(source), &mut writer, rules, sink)
            .map_err(|e| return Error::from_stream(path, e))?;
        writer.flush().map_err(Error::io(&temp_path))?;
        count
    };
    fs::set_permissions(&temp_path, permissions).map_err(Error::io(&temp_path))?;

    let backup = backup_path(path);
    fs::rename(path, &backup).map_err(|source| {
        return Error::Rename { from: path.to_path_buf(), source, to: backup.clone() };
    })?;
    temp.persist(path).map_err(|e| {
        return Error::Rename { from: temp_path.clone(), source: e.error, to: path.to_path_buf() };
    })?;

    sink.log(&Event::DocumentRewritten { backup: &backup, path, substitutions });
    return Ok(substitutions);
}

/// `<path>.bak`, appended to the full file name.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".bak");
    return PathBuf::from(name);
}

/// Split a file name into stem and extension (with its dot) at the last
/// `.`, so temp files keep the document's extension.
fn split_extension(path: &Path) -> (String, String) {
    let base = path.file_name().map(|n| return n.to_string_lossy().into_owned()).unwrap_or_default();
    return match base.rfind('.') {
        Some(dot) => {
            let (stem, ext) = base.split_at(dot);
            (stem.to_string(), ext.to_string())
        },
        None => (base, String::new()),
    };
}
