//! Tag-Length-Value framing for EMVCo payloads
//!
//! Each group is a 2-digit tag, a 2-digit zero-padded length and the value.
//! Lengths count characters, so a value may hold at most 99 of them.

use thiserror::Error;

/// Largest value a 2-digit length field can describe.
pub const MAX_VALUE_LEN: usize = 99;

/// TLV framing errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TlvError {
    #[error("Invalid tag {0:?}: expected two ASCII digits")]
    InvalidTag(String),

    #[error("Value for tag {tag} is {len} characters long (max 99)")]
    ValueTooLong { tag: String, len: usize },

    #[error("Truncated TLV group at offset {offset}")]
    Truncated { offset: usize },

    #[error("Invalid length field at offset {offset}")]
    InvalidLength { offset: usize },
}

/// Builder that frames values into a TLV string.
#[derive(Debug, Default, Clone)]
pub struct TlvWriter {
    buf: String,
}

impl TlvWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `{tag}{len:02}{value}`.
    pub fn append_field(&mut self, tag: &str, value: &str) -> Result<&mut Self, TlvError> {
        if tag.len() != 2 || !tag.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TlvError::InvalidTag(tag.to_string()));
        }

        let len = value.chars().count();
        if len > MAX_VALUE_LEN {
            return Err(TlvError::ValueTooLong { tag: tag.to_string(), len });
        }

        self.buf.push_str(tag);
        self.buf.push_str(&format!("{:02}", len));
        self.buf.push_str(value);
        Ok(self)
    }

    /// Appends a nested TLV structure as the value of `tag`.
    pub fn append_nested(&mut self, tag: &str, inner: &TlvWriter) -> Result<&mut Self, TlvError> {
        self.append_field(tag, inner.as_str())
    }

    /// Appends text without framing (e.g. the `6304` CRC header).
    pub fn append_raw(&mut self, text: &str) -> &mut Self {
        self.buf.push_str(text);
        self
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn finish(self) -> String {
        self.buf
    }
}

/// A single TLV group borrowed from the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TlvField<'a> {
    pub tag: &'a str,
    pub value: &'a str,
}

/// Iterator over the TLV groups of a string.
///
/// Stops after the first error; trailing bytes that do not form a complete
/// group are reported as [`TlvError::Truncated`].
pub struct TlvReader<'a> {
    text: &'a str,
    pos: usize,
    failed: bool,
}

impl<'a> TlvReader<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text, pos: 0, failed: false }
    }

    /// Collects every group, failing on the first framing error.
    pub fn read_all(text: &'a str) -> Result<Vec<TlvField<'a>>, TlvError> {
        TlvReader::new(text).collect()
    }

    fn next_field(&mut self) -> Result<TlvField<'a>, TlvError> {
        let offset = self.pos;
        let rest = &self.text[offset..];

        let (tag, rest) = split_chars(rest, 2).ok_or(TlvError::Truncated { offset })?;
        if !tag.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TlvError::InvalidTag(tag.to_string()));
        }

        let (len_str, rest) = split_chars(rest, 2).ok_or(TlvError::Truncated { offset })?;
        if !len_str.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TlvError::InvalidLength { offset });
        }
        let value_len: usize = len_str
            .parse()
            .map_err(|_| TlvError::InvalidLength { offset })?;

        let (value, rest) = split_chars(rest, value_len).ok_or(TlvError::Truncated { offset })?;

        self.pos = self.text.len() - rest.len();
        Ok(TlvField { tag, value })
    }
}

impl<'a> Iterator for TlvReader<'a> {
    type Item = Result<TlvField<'a>, TlvError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.text.len() {
            return None;
        }
        let field = self.next_field();
        if field.is_err() {
            self.failed = true;
        }
        Some(field)
    }
}

/// Splits off the first `n` characters, or `None` if there are fewer.
fn split_chars(s: &str, n: usize) -> Option<(&str, &str)> {
    if n == 0 {
        return Some(("", s));
    }
    match s.char_indices().nth(n) {
        Some((idx, _)) => Some(s.split_at(idx)),
        None if s.chars().count() == n => Some((s, "")),
        None => None,
    }
}
