//! Streaming, lossless HTML tokenizer.
//!
//! Every token keeps the exact source bytes it was read from, so writing the
//! tokens back in order reproduces the input byte-for-byte. Only tags are
//! parsed further (element name, attributes with value spans); everything
//! else is opaque.

use std::io::{self, BufRead};
use std::ops::Range;
use std::sync::LazyLock;

use regex::bytes::Regex;

use crate::error::StreamError;

/// Elements whose content is raw text: no markup is recognized until the
/// matching end tag. `noscript` is not one of them, so its fallback links
/// are seen as tags.
const RAW_TEXT_ELEMENTS: [&str; 4] = ["script", "style", "textarea", "title"];

/// Attribute syntax inside a tag: key, then an optional `=` followed by a
/// double-quoted, single-quoted, or unquoted value.
///
/// # Panics
///
/// Panics on first use if the pattern is invalid (compile-time invariant).
#[allow(clippy::expect_used, reason = "hardcoded pattern")]
static ATTRIBUTE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r#"(?-u)([^\s"'>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+)))?"#)
        .expect("valid regex");
});

/// One attribute of a tag. The value is decoded; `span` locates its raw
/// text inside the tag's source bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Key as written.
    key: String,
    /// How the value was quoted in the source.
    quote: Quote,
    /// Byte range of the raw value text (inside the quotes, if any).
    span: Range<usize>,
    /// Value with character references decoded.
    value: String,
}

impl Attribute {
    /// Decoded value. Empty for a bare attribute such as `defer`.
    pub fn value(&self) -> &str {
        return &self.value;
    }
}

/// Quoting style of an attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quote {
    /// `key="value"`
    Double,
    /// `key` with no `=` at all.
    Missing,
    /// `key='value'`
    Single,
    /// `key=value`
    Unquoted,
}

/// A start or self-closing tag with its source bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// Attributes in source order, duplicates included.
    attributes: Vec<Attribute>,
    /// Element name, ASCII-lowercased.
    name: String,
    /// Exact source bytes from `<` to `>`.
    raw: Vec<u8>,
}

impl Tag {
    /// Attributes in source order.
    pub fn attributes(&self) -> &[Attribute] {
        return &self.attributes;
    }

    /// Index of the first attribute whose key matches, ignoring ASCII case.
    pub fn find(&self, key: &str) -> Option<usize> {
        return self.attributes.iter().position(|a| return a.key.eq_ignore_ascii_case(key));
    }

    /// Whether any attribute has `key` with `value`, both ignoring ASCII case.
    pub fn has_attribute_value(&self, key: &str, value: &str) -> bool {
        return self.attributes.iter().any(|a| {
            return a.key.eq_ignore_ascii_case(key) && a.value.eq_ignore_ascii_case(value);
        });
    }

    /// Whether the tag ends in `/>`.
    pub fn is_self_closing(&self) -> bool {
        return self.raw.len() > 2 && self.raw.ends_with(b"/>");
    }

    /// Element name, ASCII-lowercased.
    pub fn name(&self) -> &str {
        return &self.name;
    }

    /// Parse a complete tag from its source bytes (`<` through `>`, or up
    /// to end of input for a truncated tag).
    pub fn parse(raw: Vec<u8>) -> Self {
        let body = raw.get(1..).unwrap_or_default();
        let name_len = body
            .iter()
            .position(|b| return b.is_ascii_whitespace() || *b == b'/' || *b == b'>')
            .unwrap_or(body.len());
        let name = String::from_utf8_lossy(body.get(..name_len).unwrap_or_default()).to_ascii_lowercase();

        let region_start = name_len.saturating_add(1);
        let region_end = if raw.ends_with(b">") { raw.len().saturating_sub(1) } else { raw.len() };
        let region = raw.get(region_start..region_end).unwrap_or_default();
        let attributes = parse_attributes(region, region_start);

        return Self { attributes, name, raw };
    }

    /// Exact source bytes of the tag.
    pub fn raw(&self) -> &[u8] {
        return &self.raw;
    }

    /// Replace the value of the attribute at `index`, re-encoding it for the
    /// attribute's quoting style. Every other byte of the tag is kept.
    pub fn replace_value(&mut self, index: usize, new_value: &str) {
        let Some(attr) = self.attributes.get(index) else {
            return;
        };
        let encoded = match attr.quote {
            Quote::Double => escape_value(new_value, Some('"')),
            Quote::Missing => format!("=\"{}\"", escape_value(new_value, Some('"'))),
            Quote::Single => escape_value(new_value, Some('\'')),
            Quote::Unquoted if needs_quotes(new_value) => {
                format!("\"{}\"", escape_value(new_value, Some('"')))
            },
            Quote::Unquoted => escape_value(new_value, None),
        };

        let mut raw = Vec::with_capacity(self.raw.len().saturating_add(encoded.len()));
        raw.extend_from_slice(self.raw.get(..attr.span.start).unwrap_or_default());
        raw.extend_from_slice(encoded.as_bytes());
        raw.extend_from_slice(self.raw.get(attr.span.end..).unwrap_or_default());
        *self = Self::parse(raw);
    }
}

/// One lexical unit of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Comments, doctype, end tags, processing instructions, and any
    /// construct cut short by end of input.
    Other(Vec<u8>),
    /// `<name ... />`
    SelfClosingTag(Tag),
    /// `<name ...>`
    StartTag(Tag),
    /// Character data between markup.
    Text(Vec<u8>),
}

impl Token {
    /// Exact bytes this token reconstructs to.
    pub fn as_bytes(&self) -> &[u8] {
        return match self {
            Token::Other(raw) | Token::Text(raw) => raw.as_slice(),
            Token::SelfClosingTag(tag) | Token::StartTag(tag) => tag.raw(),
        };
    }
}

/// Pull tokenizer over a buffered reader. Consumed once; yields `Err` when
/// the reader fails, and ends cleanly at end of input. Constructs have no
/// size bound: a tag is buffered whole however long it is.
pub struct Tokenizer<R> {
    /// Bytes consumed so far.
    offset: u64,
    /// End-tag name that closes the current raw-text element, if inside one.
    raw_text_end: Option<&'static str>,
    /// Source of document bytes.
    reader: R,
}

impl<R: BufRead> Tokenizer<R> {
    /// Consume one byte into `raw`.
    ///
    /// # Errors
    ///
    /// Returns `StreamError::Read` on read failure.
    fn bump(&mut self, raw: &mut Vec<u8>) -> Result<Option<u8>, StreamError> {
        let Some(byte) = self.peek()? else {
            return Ok(None);
        };
        self.reader.consume(1);
        self.offset = self.offset.saturating_add(1);
        raw.push(byte);
        return Ok(Some(byte));
    }

    /// Start tokenizing `reader`.
    pub fn new(reader: R) -> Self {
        return Self { offset: 0, raw_text_end: None, reader };
    }

    /// Look at the next byte without consuming it.
    fn peek(&mut self) -> Result<Option<u8>, StreamError> {
        loop {
            match self.reader.fill_buf() {
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {},
                Err(source) => return Err(StreamError::Read { offset: self.offset, source }),
                Ok(buf) => return Ok(buf.first().copied()),
            }
        }
    }

    /// Read the next token, or `None` at end of input.
    fn read_token(&mut self) -> Result<Option<Token>, StreamError> {
        let Some(first) = self.peek()? else {
            return Ok(None);
        };
        if first != b'<' {
            return Ok(Some(Token::Text(self.read_text()?)));
        }
        if let Some(element) = self.raw_text_end {
            return Ok(Some(self.read_raw_text_close(element)?));
        }
        return Ok(Some(self.read_markup()?));
    }

    /// Read from `<` through the next `>` that is not inside a quoted
    /// attribute value.
    fn read_tag_body(&mut self, raw: &mut Vec<u8>) -> Result<(), StreamError> {
        let mut quote: Option<u8> = None;
        let mut after_equals = false;
        while let Some(byte) = self.bump(raw)? {
            if let Some(q) = quote {
                if byte == q {
                    quote = None;
                }
                continue;
            }
            match byte {
                b'>' => return Ok(()),
                b'"' | b'\'' if after_equals => {
                    quote = Some(byte);
                    after_equals = false;
                },
                b'=' => after_equals = true,
                b if b.is_ascii_whitespace() => {},
                _ => after_equals = false,
            }
        }
        return Ok(());
    }

    /// Dispatch on the byte after `<`.
    fn read_markup(&mut self) -> Result<Token, StreamError> {
        let mut raw = Vec::new();
        self.bump(&mut raw)?;

        let Some(next) = self.peek()? else {
            return Ok(Token::Text(raw));
        };
        match next {
            b'!' => {
                self.bump(&mut raw)?;
                if self.skip_literal(&mut raw, b"--")? {
                    self.read_through(&mut raw, b"-->")?;
                } else {
                    self.read_through(&mut raw, b">")?;
                }
                return Ok(Token::Other(raw));
            },
            b'/' | b'?' => {
                self.read_through(&mut raw, b">")?;
                return Ok(Token::Other(raw));
            },
            b if b.is_ascii_alphabetic() => {
                self.read_tag_body(&mut raw)?;
                if !raw.ends_with(b">") {
                    return Ok(Token::Other(raw));
                }
                let tag = Tag::parse(raw);
                if tag.is_self_closing() {
                    return Ok(Token::SelfClosingTag(tag));
                }
                self.raw_text_end = RAW_TEXT_ELEMENTS.iter().find(|e| return **e == tag.name()).copied();
                return Ok(Token::StartTag(tag));
            },
            _ => return Ok(Token::Text(raw)),
        }
    }

    /// Inside a raw-text element at `<`: either the closing end tag, or
    /// text that merely starts with `<`.
    fn read_raw_text_close(&mut self, element: &'static str) -> Result<Token, StreamError> {
        let mut raw = Vec::new();
        self.bump(&mut raw)?;
        if !self.skip_literal(&mut raw, b"/")? {
            return Ok(Token::Text(raw));
        }
        for expected in element.bytes() {
            match self.peek()? {
                Some(b) if b.eq_ignore_ascii_case(&expected) => {
                    self.bump(&mut raw)?;
                },
                _ => return Ok(Token::Text(raw)),
            }
        }
        match self.peek()? {
            Some(b) if b.is_ascii_whitespace() || b == b'/' || b == b'>' => {},
            None => {},
            Some(_) => return Ok(Token::Text(raw)),
        }
        self.raw_text_end = None;
        self.read_through(&mut raw, b">")?;
        return Ok(Token::Other(raw));
    }

    /// Read a run of character data up to the next `<`. Only called after
    /// `peek` has filled the buffer.
    fn read_text(&mut self) -> Result<Vec<u8>, StreamError> {
        let offset = self.offset;
        let buf = self.reader.fill_buf().map_err(|source| return StreamError::Read { offset, source })?;
        let len = buf.iter().position(|b| return *b == b'<').unwrap_or(buf.len());
        let text = buf.get(..len).unwrap_or_default().to_vec();
        self.reader.consume(len);
        self.offset = self.offset.saturating_add(u64::try_from(len).unwrap_or(u64::MAX));
        return Ok(text);
    }

    /// Consume bytes until `raw` ends with `terminator` or input ends.
    fn read_through(&mut self, raw: &mut Vec<u8>, terminator: &[u8]) -> Result<(), StreamError> {
        while self.bump(raw)?.is_some() {
            if raw.ends_with(terminator) {
                return Ok(());
            }
        }
        return Ok(());
    }

    /// Consume `literal` if the input continues with it, ignoring ASCII
    /// case. Stops at the first mismatch, leaving the mismatched byte unread.
    fn skip_literal(&mut self, raw: &mut Vec<u8>, literal: &[u8]) -> Result<bool, StreamError> {
        for expected in literal {
            match self.peek()? {
                Some(b) if b.eq_ignore_ascii_case(expected) => {
                    self.bump(raw)?;
                },
                _ => return Ok(false),
            }
        }
        return Ok(true);
    }
}

impl<R: BufRead> Iterator for Tokenizer<R> {
    type Item = Result<Token, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        return self.read_token().transpose();
    }
}

/// Decode the character references the tokenizer understands.
/// Unknown or malformed references are kept literally.
fn decode_character_references(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    if !text.contains('&') {
        return text.into_owned();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest: &str = &text;
    while let Some(amp) = rest.find('&') {
        let (before, tail) = rest.split_at(amp);
        out.push_str(before);
        if let Some((ch, len)) = decode_reference(tail) {
            out.push(ch);
            rest = tail.get(len..).unwrap_or_default();
        } else {
            out.push('&');
            rest = tail.get(1..).unwrap_or_default();
        }
    }
    out.push_str(rest);
    return out;
}

/// Decode one `&...;` reference at the start of `tail`, returning the
/// character and the number of bytes it spans.
fn decode_reference(tail: &str) -> Option<(char, usize)> {
    let semi = tail.find(';').filter(|i| return *i <= 10)?;
    let name = tail.get(1..semi)?;
    let ch = match name {
        "amp" => '&',
        "apos" => '\'',
        "gt" => '>',
        "lt" => '<',
        "nbsp" => '\u{a0}',
        "quot" => '"',
        _ => {
            let digits = name.strip_prefix('#')?;
            let code = match digits.strip_prefix('x').or_else(|| return digits.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => digits.parse::<u32>().ok()?,
            };
            char::from_u32(code)?
        },
    };
    return Some((ch, semi.saturating_add(1)));
}

/// Escape `value` for an attribute delimited by `quote`.
fn escape_value(value: &str, quote: Option<char>) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' if quote == Some('"') => out.push_str("&quot;"),
            '\'' if quote == Some('\'') => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    return out;
}

/// Whether an unquoted attribute value must be quoted to stay one value.
fn needs_quotes(value: &str) -> bool {
    return value.is_empty()
        || value.chars().any(|c| return c.is_ascii_whitespace() || matches!(c, '"' | '\'' | '=' | '<' | '>' | '`'));
}

/// Parse attributes from the part of a tag after its name. `base` is the
/// offset of `region` within the tag's source bytes.
fn parse_attributes(region: &[u8], base: usize) -> Vec<Attribute> {
    let mut attributes = Vec::new();
    for cap in ATTRIBUTE_PATTERN.captures_iter(region) {
        let Some(key) = cap.get(1) else {
            continue;
        };
        let (quote, value) = if let Some(v) = cap.get(2) {
            (Quote::Double, v)
        } else if let Some(v) = cap.get(3) {
            (Quote::Single, v)
        } else if let Some(v) = cap.get(4) {
            (Quote::Unquoted, v)
        } else {
            attributes.push(Attribute {
                key: String::from_utf8_lossy(key.as_bytes()).into_owned(),
                quote: Quote::Missing,
                span: base.saturating_add(key.end())..base.saturating_add(key.end()),
                value: String::new(),
            });
            continue;
        };
        attributes.push(Attribute {
            key: String::from_utf8_lossy(key.as_bytes()).into_owned(),
            quote,
            span: base.saturating_add(value.start())..base.saturating_add(value.end()),
            value: decode_character_references(value.as_bytes()),
        });
    }
    return attributes;
}
