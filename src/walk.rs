//! Directory traversal: find documents whose file name matches a mask and
//! run the replacement protocol on each.

use std::path::Path;

use glob::{MatchOptions, Pattern};
use walkdir::WalkDir;

use crate::error::Error;
use crate::replace;
use crate::rule::Rule;
use crate::sink::{Event, Sink};

/// Masks apply to bare file names: `*` may match a leading dot, and case
/// is significant.
const MASK_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_leading_dot: false,
    require_literal_separator: true,
};

/// Totals for one traversal.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WalkReport {
    /// Replacement protocol runs (a file matched by two masks counts twice).
    pub rewrites: usize,
    /// Attributes substituted across all runs.
    pub substitutions: usize,
}

/// Drives the replacement protocol over a set of directories.
struct Walker<'a> {
    /// Compiled masks, paired with their source text for diagnostics.
    masks: Vec<(Pattern, &'a str)>,
    /// Accumulated totals.
    report: WalkReport,
    /// Rules handed to every replacement.
    rules: &'a [Rule],
    /// Diagnostic sink.
    sink: &'a dyn Sink,
}

impl Walker<'_> {
    /// Run every matching mask against one regular file. Each match is an
    /// independent replacement, so overlapping masks rewrite the same file
    /// more than once and the backup ends up holding the previous pass.
    ///
    /// # Errors
    ///
    /// Propagates the first replacement failure.
    fn visit_file(&mut self, path: &Path) -> Result<(), Error> {
        let name = path.file_name().map(|n| return n.to_string_lossy()).unwrap_or_default();
        for (pattern, mask) in &self.masks {
            if !pattern.matches_with(&name, MASK_OPTIONS) {
                self.sink.log(&Event::MaskSkipped { mask: *mask, path });
                continue;
            }
            self.sink.log(&Event::MaskMatched { mask: *mask, path });
            let substitutions = replace::apply_rules(path, self.rules, self.sink)?;
            self.report.rewrites = self.report.rewrites.saturating_add(1);
            self.report.substitutions = self.report.substitutions.saturating_add(substitutions);
        }
        return Ok(());
    }

    /// Visit every entry under `dir` in file-name order. A symlinked root
    /// is skipped like any other symlink.
    ///
    /// # Errors
    ///
    /// Returns `Error::Walk` for unreadable entries, or the first replacement failure.
    fn walk_dir(&mut self, dir: &Path) -> Result<(), Error> {
        for entry in WalkDir::new(dir).follow_links(false).follow_root_links(false).sort_by_file_name() {
            let entry = entry.map_err(|source| {
                let path = source.path().unwrap_or(dir).to_path_buf();
                return Error::Walk { path, source };
            })?;
            if entry.file_type().is_dir() {
                continue;
            }
            if !entry.file_type().is_file() {
                self.sink.log(&Event::NotRegular { path: entry.path() });
                continue;
            }
            self.visit_file(entry.path())?;
        }
        return Ok(());
    }
}

/// Compile masks up front so an invalid pattern aborts before any document
/// is touched.
///
/// # Errors
///
/// Returns `Error::Glob` for the first pattern that does not compile.
fn compile_masks(masks: &[String]) -> Result<Vec<(Pattern, &str)>, Error> {
    return masks
        .iter()
        .map(|mask| {
            let pattern = Pattern::new(mask).map_err(|e| {
                return Error::Glob { pattern: mask.clone(), reason: e.to_string() };
            })?;
            return Ok((pattern, mask.as_str()));
        })
        .collect();
}

/// Walk `dirs` in order and rewrite every regular file whose name matches
/// a mask. The first error stops the whole walk.
///
/// # Errors
///
/// Returns `Error::Glob` for an invalid mask, `Error::Walk` for traversal
/// failures, or any replacement error.
pub fn walk(masks: &[String], dirs: &[impl AsRef<Path>], rules: &[Rule], sink: &dyn Sink) -> Result<WalkReport, Error> {
    let mut walker = Walker { masks: compile_masks(masks)?, report: WalkReport::default(), rules, sink };
    for dir in dirs {
        walker.walk_dir(dir.as_ref())?;
    }
    return Ok(walker.report);
}
