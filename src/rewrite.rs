//! Reference substitution over a document's token stream.

use std::io::{BufRead, Write};

use crate::error::StreamError;
use crate::rule::Rule;
use crate::sink::{Event, Sink};
use crate::token::{Tag, Token, Tokenizer};

/// Copy `input` to `output`, replacing script `src` and stylesheet `href`
/// values that exactly equal a rule's reference with that rule's new
/// reference. Every other byte is copied verbatim.
///
/// Returns the number of attributes substituted.
///
/// # Errors
///
/// Returns `StreamError::Read` if the tokenizer's input fails, or
/// `StreamError::Io` if writing `output` fails.
pub fn rewrite<R: BufRead, W: Write>(
    input: R,
    mut output: W,
    rules: &[Rule],
    sink: &dyn Sink,
) -> Result<usize, StreamError> {
    let mut substitutions = 0_usize;
    for token in Tokenizer::new(input) {
        let mut token = token?;
        match &mut token {
            Token::SelfClosingTag(tag) | Token::StartTag(tag) => {
                if apply_rules(tag, rules, sink) {
                    substitutions = substitutions.saturating_add(1);
                }
            },
            Token::Other(_) | Token::Text(_) => {},
        }
        output.write_all(token.as_bytes())?;
    }
    output.flush()?;
    return Ok(substitutions);
}

/// Substitute the first `src`/`href` of a script or stylesheet tag.
/// Returns whether the tag changed.
fn apply_rules(tag: &mut Tag, rules: &[Rule], sink: &dyn Sink) -> bool {
    let Some(key) = reference_attribute(tag) else {
        return false;
    };
    sink.log(&Event::ElementInspected { element: tag.name() });

    // Duplicate keys: only the first one counts.
    let Some(index) = tag.find(key) else {
        return false;
    };
    let Some(value) = tag.attributes().get(index).map(|a| return a.value().to_string()) else {
        return false;
    };
    let Some(rule) = first_match(&value, rules, sink) else {
        return false;
    };

    sink.log(&Event::Replaced { from: &value, to: rule.new_reference() });
    tag.replace_value(index, rule.new_reference());
    return true;
}

/// First rule, in order, whose reference equals `value` exactly.
pub fn first_match<'r>(value: &str, rules: &'r [Rule], sink: &dyn Sink) -> Option<&'r Rule> {
    for rule in rules {
        let matched = value == rule.reference();
        sink.log(&Event::Compared { matched, reference: rule.reference(), value });
        if matched {
            return Some(rule);
        }
    }
    return None;
}

/// The attribute that carries an asset reference for this element, if any.
fn reference_attribute(tag: &Tag) -> Option<&'static str> {
    return match tag.name() {
        "link" if tag.has_attribute_value("rel", "stylesheet") => Some("href"),
        "script" => Some("src"),
        _ => None,
    };
}
