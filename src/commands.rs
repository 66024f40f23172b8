//! The run pipeline: hash every tracked asset, rename them, then rewrite
//! matching documents.

use std::fs;

use crate::config::Config;
use crate::error::Error;
use crate::rule::Rule;
use crate::sink::{Event, Sink};
use crate::walk;

/// What a successful run changed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    /// Assets renamed to their hash-qualified names.
    pub assets: usize,
    /// Replacement protocol runs.
    pub documents: usize,
    /// Attributes substituted.
    pub references: usize,
}

/// Build one rule per tracked file, in config order.
///
/// # Errors
///
/// Returns `Error::Io` for the first asset that cannot be read.
pub fn build_rules(config: &Config, sink: &dyn Sink) -> Result<Vec<Rule>, Error> {
    let mut rules = Vec::with_capacity(config.files.len());
    for file in &config.files {
        let rule = Rule::build(&file.reference, &file.location)?;
        sink.log(&Event::RuleBuilt { rule: &rule });
        rules.push(rule);
    }
    return Ok(rules);
}

/// Move every asset to its hash-qualified location.
///
/// # Errors
///
/// Returns `Error::Rename` for the first rename that fails; earlier renames
/// are not undone.
pub fn rename_assets(rules: &[Rule], sink: &dyn Sink) -> Result<(), Error> {
    for rule in rules {
        fs::rename(rule.location(), rule.new_location()).map_err(|source| {
            return Error::Rename {
                from: rule.location().to_path_buf(),
                source,
                to: rule.new_location().to_path_buf(),
            };
        })?;
        sink.log(&Event::AssetRenamed { from: rule.location(), to: rule.new_location() });
    }
    return Ok(());
}

/// Hash all assets first, so a read failure leaves nothing renamed, then
/// rename them and rewrite the documents selected by the masks.
///
/// # Errors
///
/// Returns the first error from hashing, renaming, or the directory walk.
pub fn run(config: &Config, sink: &dyn Sink) -> Result<Summary, Error> {
    let rules = build_rules(config, sink)?;
    rename_assets(&rules, sink)?;
    let report = walk::walk(&config.mask, &config.dirs, &rules, sink)?;
    return Ok(Summary {
        assets: rules.len(),
        documents: report.rewrites,
        references: report.substitutions,
    });
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, clippy::unwrap_used, reason = "tests")]
mod tests {
    use std::path::{Path, PathBuf};

    use super::*;
    use crate::config::TrackedFile;
    use crate::sink::{Recording, Silent};

    fn tracked(reference: &str, location: &Path) -> TrackedFile {
        return TrackedFile { location: location.display().to_string(), reference: reference.to_string() };
    }

    #[test]
    fn renames_assets_and_rewrites_documents() {
        let dir = tempfile::tempdir().unwrap();
        let assets = dir.path().join("assets");
        let site = dir.path().join("site");
        fs::create_dir_all(&assets).unwrap();
        fs::create_dir_all(&site).unwrap();
        fs::write(assets.join("app.js"), "console.log(1);\n").unwrap();
        fs::write(assets.join("site.css"), "body { color: red; }\n").unwrap();
        let page = "<link rel=stylesheet href=\"/css/site.css\">\n<script src=\"app.js\"></script>\n";
        fs::write(site.join("index.html"), page).unwrap();

        let config = Config {
            dirs: vec![site.clone()],
            files: vec![tracked("app.js", &assets.join("app.js")), tracked("/css/site.css", &assets.join("site.css"))],
            mask: vec!["*.html".to_string()],
        };
        let summary = run(&config, &Silent).unwrap();

        assert_eq!(summary, Summary { assets: 2, documents: 1, references: 2 });
        assert!(!assets.join("app.js").exists());
        assert!(assets.join("app-6a9f696c.js").exists());
        assert!(assets.join("site-a8e7618a.css").exists());
        assert_eq!(
            fs::read_to_string(site.join("index.html")).unwrap(),
            "<link rel=stylesheet href=\"/css/site-a8e7618a.css\">\n<script src=\"app-6a9f696c.js\"></script>\n"
        );
        assert_eq!(fs::read_to_string(site.join("index.html.bak")).unwrap(), page);
    }

    #[test]
    fn hashing_failure_renames_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("app.js");
        fs::write(&present, "console.log(1);\n").unwrap();

        let config = Config {
            dirs: vec![],
            files: vec![tracked("app.js", &present), tracked("gone.js", &dir.path().join("gone.js"))],
            mask: vec![],
        };
        let err = run(&config, &Silent).unwrap_err();

        assert!(matches!(err, Error::Io { .. }));
        assert!(present.exists());
    }

    #[test]
    fn rename_failure_names_both_paths() {
        let dir = tempfile::tempdir().unwrap();
        let rule = Rule::with_hash("a.js", &dir.path().join("a.js").display().to_string(), 0x1);
        let err = rename_assets(&[rule], &Silent).unwrap_err();
        let Error::Rename { from, to, .. } = err else {
            panic!("expected rename error");
        };
        assert_eq!(from, dir.path().join("a.js"));
        assert_eq!(to, PathBuf::from(dir.path().join("a-1.js")));
    }

    #[test]
    fn reports_rules_and_renames() {
        let dir = tempfile::tempdir().unwrap();
        let asset = dir.path().join("app.js");
        fs::write(&asset, "console.log(1);\n").unwrap();
        let config = Config { dirs: vec![], files: vec![tracked("app.js", &asset)], mask: vec![] };

        let sink = Recording::default();
        run(&config, &sink).unwrap();

        assert_eq!(sink.matching("rule[ref='app.js'").len(), 1);
        assert_eq!(sink.matching("renamed").len(), 1);
    }
}
