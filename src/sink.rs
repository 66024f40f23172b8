//! Diagnostic events and the sinks that receive them.
//!
//! Components never log through global state; each takes a `&dyn Sink`.
//! The default is [`Silent`]; `--verbose` swaps in [`Tracing`].

use std::fmt;
use std::path::Path;

use crate::config::Config;
use crate::rule::Rule;

/// Something worth reporting in verbose mode.
#[derive(Debug, Clone, Copy)]
pub enum Event<'a> {
    /// An asset file was moved to its hash-qualified name.
    AssetRenamed {
        /// Original location.
        from: &'a Path,
        /// Hash-qualified location.
        to: &'a Path,
    },
    /// An attribute value was compared against a rule's reference.
    Compared {
        /// Whether the two were equal.
        matched: bool,
        /// Rule reference.
        reference: &'a str,
        /// Attribute value from the document.
        value: &'a str,
    },
    /// The validated configuration the run will use.
    ConfigLoaded {
        /// The loaded config.
        config: &'a Config,
    },
    /// A document was rewritten and its original moved aside.
    DocumentRewritten {
        /// Where the previous content now lives.
        backup: &'a Path,
        /// Rewritten document.
        path: &'a Path,
        /// Number of attributes substituted.
        substitutions: usize,
    },
    /// A script or stylesheet tag is about to be checked against the rules.
    ElementInspected {
        /// Lowercased element name.
        element: &'a str,
    },
    /// A file name matched a mask.
    MaskMatched {
        /// The mask.
        mask: &'a str,
        /// The file.
        path: &'a Path,
    },
    /// A file name did not match a mask.
    MaskSkipped {
        /// The mask.
        mask: &'a str,
        /// The file.
        path: &'a Path,
    },
    /// A traversal entry was not a regular file.
    NotRegular {
        /// The skipped entry.
        path: &'a Path,
    },
    /// An attribute value was replaced.
    Replaced {
        /// Value before substitution.
        from: &'a str,
        /// Value after substitution.
        to: &'a str,
    },
    /// A renaming rule was derived from an asset.
    RuleBuilt {
        /// The new rule.
        rule: &'a Rule,
    },
}

impl Event<'_> {
    /// Whether the event describes a filesystem change rather than a
    /// per-comparison detail.
    pub fn is_change(&self) -> bool {
        return matches!(
            self,
            Event::AssetRenamed { .. } | Event::DocumentRewritten { .. } | Event::RuleBuilt { .. }
        );
    }
}

impl fmt::Display for Event<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return match *self {
            Event::AssetRenamed { from, to } => {
                write!(f, "renamed {} -> {}", from.display(), to.display())
            },
            Event::Compared { matched, reference, value } => {
                write!(f, "trying to compare '{value}' to '{reference}': {matched}")
            },
            Event::ConfigLoaded { config } => write!(f, "{config}"),
            Event::DocumentRewritten { backup, path, substitutions } => write!(
                f,
                "rewrote {} ({substitutions} references, backup {})",
                path.display(),
                backup.display()
            ),
            Event::ElementInspected { element } => write!(f, "applying rules to <{element}>"),
            Event::MaskMatched { mask, path } => {
                write!(f, "replacing values in {} (matched by {mask})", path.display())
            },
            Event::MaskSkipped { mask, path } => write!(f, "{} not matched by {mask}", path.display()),
            Event::NotRegular { path } => write!(f, "{} is not a regular file", path.display()),
            Event::Replaced { from, to } => write!(f, "replacing '{from}' to '{to}'"),
            Event::RuleBuilt { rule } => write!(
                f,
                "rule[ref='{}',location='{}',new_ref='{}',new_location='{}']",
                rule.reference(),
                rule.location().display(),
                rule.new_reference(),
                rule.new_location().display()
            ),
        };
    }
}

/// Receiver for diagnostic events.
pub trait Sink {
    /// Record one event.
    fn log(&self, event: &Event<'_>);
}

/// Drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl Sink for Silent {
    fn log(&self, _event: &Event<'_>) {}
}

/// Forwards events to `tracing`: filesystem changes at info level,
/// everything else at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct Tracing;

impl Sink for Tracing {
    fn log(&self, event: &Event<'_>) {
        if event.is_change() {
            tracing::info!("{event}");
        } else {
            tracing::debug!("{event}");
        }
    }
}

/// Captures rendered events for assertions.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct Recording {
    /// Rendered events in arrival order.
    pub events: std::cell::RefCell<Vec<String>>,
}

#[cfg(test)]
impl Recording {
    /// Rendered events that contain `needle`.
    pub fn matching(&self, needle: &str) -> Vec<String> {
        return self.events.borrow().iter().filter(|e| return e.contains(needle)).cloned().collect();
    }
}

#[cfg(test)]
impl Sink for Recording {
    fn log(&self, event: &Event<'_>) {
        self.events.borrow_mut().push(event.to_string());
    }
}
