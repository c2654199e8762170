//! Fragment-aware JSON token cursor.
//!
//! [`Reader`] walks a byte buffer one token at a time. The buffer does not have
//! to hold a complete document: when a token is cut off at the end of a
//! non-final buffer, [`Reader::read`] returns `Ok(false)` and leaves the reader
//! exactly where it was. The caller keeps the unconsumed tail
//! (`buf[bytes_consumed()..]`), appends more input, and continues with a new
//! reader built from [`Reader::into_state`].
//!
//! ```rust
//! use serde_mapstream::reader::{Reader, ReaderState, TokenKind};
//!
//! let mut reader = Reader::new(br#"{"a":1,"b"#, false, ReaderState::default());
//! assert!(reader.read().unwrap());
//! assert_eq!(reader.token(), TokenKind::StartObject);
//! assert!(reader.read().unwrap()); // "a":
//! assert!(reader.read().unwrap()); // 1
//! assert!(!reader.read().unwrap()); // "b is cut off
//! assert_eq!(reader.bytes_consumed(), 7);
//! ```

use crate::{Error, Result};
use std::borrow::Cow;

/// The kind of token the reader is positioned on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TokenKind {
    #[default]
    None,
    StartObject,
    EndObject,
    StartArray,
    EndArray,
    PropertyName,
    String,
    Number,
    True,
    False,
    Null,
}

impl TokenKind {
    #[must_use]
    pub const fn is_start(self) -> bool {
        matches!(self, TokenKind::StartObject | TokenKind::StartArray)
    }

    #[must_use]
    pub const fn is_end(self) -> bool {
        matches!(self, TokenKind::EndObject | TokenKind::EndArray)
    }

    /// Human-readable token name used in error messages.
    #[must_use]
    pub const fn describe(self) -> &'static str {
        match self {
            TokenKind::None => "no token",
            TokenKind::StartObject => "start of object",
            TokenKind::EndObject => "end of object",
            TokenKind::StartArray => "start of array",
            TokenKind::EndArray => "end of array",
            TokenKind::PropertyName => "property name",
            TokenKind::String => "string",
            TokenKind::Number => "number",
            TokenKind::True | TokenKind::False => "boolean",
            TokenKind::Null => "null",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Container {
    Object,
    Array,
}

/// What the grammar allows next.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
enum Expect {
    #[default]
    Value,
    NameOrEnd,
    Name,
    CommaOrEnd,
    ValueOrEnd,
    Done,
}

impl Expect {
    const fn describe(self) -> &'static str {
        match self {
            Expect::Value => "a value",
            Expect::NameOrEnd => "a property name or '}'",
            Expect::Name => "a property name",
            Expect::CommaOrEnd => "',' or the end of the container",
            Expect::ValueOrEnd => "a value or ']'",
            Expect::Done => "end of input",
        }
    }
}

/// Tokenizer state carried from one buffer to the next.
#[derive(Clone, Debug, Default)]
pub struct ReaderState {
    containers: Vec<Container>,
    expect: Expect,
    token: TokenKind,
    token_depth: usize,
    /// Absolute document offset of the first byte of the next buffer.
    offset: usize,
}

impl ReaderState {
    /// Absolute number of bytes consumed from the document so far.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }
}

/// A JSON token cursor over a (possibly partial) byte buffer.
#[derive(Clone, Debug)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
    is_final: bool,
    state: ReaderState,
    value_start: usize,
    value_end: usize,
    escaped: bool,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8], is_final: bool, state: ReaderState) -> Self {
        Reader {
            buf,
            pos: 0,
            is_final,
            state,
            value_start: 0,
            value_end: 0,
            escaped: false,
        }
    }

    /// A reader over a complete document.
    #[must_use]
    pub fn from_slice(buf: &'a [u8]) -> Self {
        Self::new(buf, true, ReaderState::default())
    }

    #[must_use]
    pub fn token(&self) -> TokenKind {
        self.state.token
    }

    /// Nesting depth of the current token; a start token and its matching end
    /// token report the same depth.
    #[must_use]
    pub fn token_depth(&self) -> usize {
        self.state.token_depth
    }

    #[must_use]
    pub fn bytes_consumed(&self) -> usize {
        self.pos
    }

    /// Absolute offset in the document, across buffers.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.state.offset + self.pos
    }

    #[must_use]
    pub fn is_final_block(&self) -> bool {
        self.is_final
    }

    /// Returns `true` once the top-level value has been fully read.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state.expect == Expect::Done
    }

    /// Ends this buffer and returns the state to continue with on the next one.
    #[must_use]
    pub fn into_state(mut self) -> ReaderState {
        self.state.offset += self.pos;
        self.state
    }

    /// Advances to the next token.
    ///
    /// Returns `Ok(false)` without moving when the next token is not fully
    /// buffered, or when a final buffer holds nothing after the top-level value.
    pub fn read(&mut self) -> Result<bool> {
        let mut pos = self.pos;
        let mut expect = self.state.expect;
        loop {
            pos = self.skip_whitespace(pos);
            let Some(&byte) = self.buf.get(pos) else {
                if expect == Expect::Done {
                    return Ok(false);
                }
                return self.need_more(expect.describe());
            };
            match expect {
                Expect::Done => {
                    return Err(self.syntax_at(pos, "trailing characters after the top-level value"))
                }
                Expect::CommaOrEnd => match byte {
                    b',' => {
                        pos += 1;
                        expect = match self.state.containers.last() {
                            Some(Container::Object) => Expect::Name,
                            _ => Expect::Value,
                        };
                    }
                    b'}' | b']' => return self.close_container(pos, byte),
                    _ => return Err(self.syntax_at(pos, "expected ',' or the end of the container")),
                },
                Expect::NameOrEnd if byte == b'}' => return self.close_container(pos, byte),
                Expect::NameOrEnd | Expect::Name => return self.read_property_name(pos),
                Expect::ValueOrEnd if byte == b']' => return self.close_container(pos, byte),
                Expect::ValueOrEnd | Expect::Value => return self.read_value_token(pos, byte),
            }
        }
    }

    /// Like [`read`](Self::read), but when `requires_read_ahead` is set and the
    /// new token opens a container, succeeds only if the whole container is
    /// buffered.
    pub fn read_with_read_ahead(&mut self, requires_read_ahead: bool) -> Result<bool> {
        if !requires_read_ahead || self.is_final {
            return self.read();
        }
        let checkpoint = self.clone();
        if !self.read()? {
            return Ok(false);
        }
        if self.state.token.is_start() && !self.clone().try_skip()? {
            *self = checkpoint;
            return Ok(false);
        }
        Ok(true)
    }

    /// Skips the current value (or the value of the current property name).
    ///
    /// Only moves when the whole value is buffered; otherwise returns
    /// `Ok(false)` and leaves the reader untouched.
    pub fn try_skip(&mut self) -> Result<bool> {
        let mut probe = self.clone();
        if probe.state.token == TokenKind::PropertyName && !probe.read()? {
            return Ok(false);
        }
        if probe.state.token.is_start() {
            let depth = probe.state.token_depth;
            loop {
                if !probe.read()? {
                    return Ok(false);
                }
                if probe.state.token.is_end() && probe.state.token_depth == depth {
                    break;
                }
            }
        }
        *self = probe;
        Ok(true)
    }

    /// Skips the current value, failing if it is not fully buffered.
    pub fn skip(&mut self) -> Result<()> {
        if self.try_skip()? {
            Ok(())
        } else {
            Err(Error::unexpected_eof(self.offset(), "the rest of the skipped value"))
        }
    }

    /// Raw bytes of the current string, property name or number, with escapes
    /// left in place.
    #[must_use]
    pub fn raw_value(&self) -> &'a [u8] {
        &self.buf[self.value_start..self.value_end]
    }

    /// Returns `true` if the current string or property name contains escapes.
    #[must_use]
    pub fn is_escaped(&self) -> bool {
        self.escaped
    }

    /// The unescaped text of the current string or property name.
    pub fn string(&self) -> Result<Cow<'a, str>> {
        if !matches!(self.state.token, TokenKind::String | TokenKind::PropertyName) {
            return Err(Error::syntax(self.offset(), "expected a string token"));
        }
        let raw = self.raw_value();
        if !self.escaped {
            return std::str::from_utf8(raw)
                .map(Cow::Borrowed)
                .map_err(|_| Error::syntax(self.offset(), "invalid UTF-8 in string"));
        }
        unescape(raw)
            .map(Cow::Owned)
            .map_err(|msg| Error::syntax(self.offset(), msg))
    }

    /// The text of the current number token.
    #[must_use]
    pub fn number_text(&self) -> Option<&'a str> {
        if self.state.token != TokenKind::Number {
            return None;
        }
        // Validated as ASCII when the token was read.
        std::str::from_utf8(self.raw_value()).ok()
    }

    #[must_use]
    pub fn i64(&self) -> Option<i64> {
        self.number_text()?.parse().ok()
    }

    #[must_use]
    pub fn u64(&self) -> Option<u64> {
        self.number_text()?.parse().ok()
    }

    #[must_use]
    pub fn f64(&self) -> Option<f64> {
        self.number_text()?.parse().ok()
    }

    #[must_use]
    pub fn bool(&self) -> Option<bool> {
        match self.state.token {
            TokenKind::True => Some(true),
            TokenKind::False => Some(false),
            _ => None,
        }
    }

    fn skip_whitespace(&self, mut pos: usize) -> usize {
        while let Some(b' ' | b'\t' | b'\n' | b'\r') = self.buf.get(pos) {
            pos += 1;
        }
        pos
    }

    fn need_more(&self, expected: &str) -> Result<bool> {
        if self.is_final {
            Err(Error::unexpected_eof(self.state.offset + self.buf.len(), expected))
        } else {
            Ok(false)
        }
    }

    fn syntax_at(&self, pos: usize, msg: &str) -> Error {
        Error::syntax(self.state.offset + pos, msg)
    }

    fn after_value(&self) -> Expect {
        if self.state.containers.is_empty() {
            Expect::Done
        } else {
            Expect::CommaOrEnd
        }
    }

    fn commit(&mut self, token: TokenKind, depth: usize, next: usize, span: (usize, usize)) {
        self.state.token = token;
        self.state.token_depth = depth;
        self.pos = next;
        self.value_start = span.0;
        self.value_end = span.1;
    }

    fn close_container(&mut self, pos: usize, byte: u8) -> Result<bool> {
        let (container, token) = if byte == b'}' {
            (Container::Object, TokenKind::EndObject)
        } else {
            (Container::Array, TokenKind::EndArray)
        };
        if self.state.containers.last() != Some(&container) {
            return Err(self.syntax_at(pos, "mismatched closing bracket"));
        }
        self.state.containers.pop();
        let depth = self.state.containers.len();
        self.commit(token, depth, pos + 1, (pos, pos));
        self.escaped = false;
        self.state.expect = self.after_value();
        Ok(true)
    }

    fn read_property_name(&mut self, pos: usize) -> Result<bool> {
        if self.buf[pos] != b'"' {
            return Err(self.syntax_at(pos, "expected a property name"));
        }
        let Some((end, escaped)) = self.scan_string(pos)? else {
            return self.need_more("the end of a property name");
        };
        let colon = self.skip_whitespace(end + 1);
        match self.buf.get(colon) {
            None => return self.need_more("':'"),
            Some(b':') => {}
            Some(_) => return Err(self.syntax_at(colon, "expected ':' after a property name")),
        }
        let depth = self.state.containers.len();
        self.commit(TokenKind::PropertyName, depth, colon + 1, (pos + 1, end));
        self.escaped = escaped;
        self.state.expect = Expect::Value;
        Ok(true)
    }

    fn read_value_token(&mut self, pos: usize, byte: u8) -> Result<bool> {
        let depth = self.state.containers.len();
        match byte {
            b'{' | b'[' => {
                let (container, token, expect) = if byte == b'{' {
                    (Container::Object, TokenKind::StartObject, Expect::NameOrEnd)
                } else {
                    (Container::Array, TokenKind::StartArray, Expect::ValueOrEnd)
                };
                self.state.containers.push(container);
                self.commit(token, depth, pos + 1, (pos, pos));
                self.escaped = false;
                self.state.expect = expect;
                return Ok(true);
            }
            b'"' => {
                let Some((end, escaped)) = self.scan_string(pos)? else {
                    return self.need_more("the end of a string");
                };
                self.commit(TokenKind::String, depth, end + 1, (pos + 1, end));
                self.escaped = escaped;
            }
            b't' | b'f' | b'n' => {
                let (literal, token): (&[u8], _) = match byte {
                    b't' => (b"true", TokenKind::True),
                    b'f' => (b"false", TokenKind::False),
                    _ => (b"null", TokenKind::Null),
                };
                let available = &self.buf[pos..];
                if available.len() < literal.len() {
                    if !literal.starts_with(available) {
                        return Err(self.syntax_at(pos, "invalid literal"));
                    }
                    return self.need_more("the rest of a literal");
                }
                if !available.starts_with(literal) {
                    return Err(self.syntax_at(pos, "invalid literal"));
                }
                self.commit(token, depth, pos + literal.len(), (pos, pos + literal.len()));
                self.escaped = false;
            }
            b'-' | b'0'..=b'9' => {
                let mut end = pos;
                while let Some(b'0'..=b'9' | b'-' | b'+' | b'.' | b'e' | b'E') = self.buf.get(end) {
                    end += 1;
                }
                if end == self.buf.len() && !self.is_final {
                    return Ok(false);
                }
                if !is_valid_number(&self.buf[pos..end]) {
                    return Err(self.syntax_at(pos, "invalid number"));
                }
                self.commit(TokenKind::Number, depth, end, (pos, end));
                self.escaped = false;
            }
            _ => return Err(self.syntax_at(pos, "unexpected character")),
        }
        self.state.expect = self.after_value();
        Ok(true)
    }

    /// Finds the closing quote of the string starting at `pos`.
    fn scan_string(&self, pos: usize) -> Result<Option<(usize, bool)>> {
        let mut i = pos + 1;
        let mut escaped = false;
        while let Some(&byte) = self.buf.get(i) {
            match byte {
                b'"' => return Ok(Some((i, escaped))),
                b'\\' => {
                    escaped = true;
                    i += 2;
                }
                0x00..=0x1F => return Err(self.syntax_at(i, "control character in string")),
                _ => i += 1,
            }
        }
        Ok(None)
    }
}

fn is_valid_number(bytes: &[u8]) -> bool {
    let digits = |mut i: usize| {
        let start = i;
        while bytes.get(i).is_some_and(u8::is_ascii_digit) {
            i += 1;
        }
        (i, i > start)
    };

    let mut i = usize::from(bytes.first() == Some(&b'-'));
    match bytes.get(i) {
        Some(b'0') => i += 1,
        Some(b'1'..=b'9') => i = digits(i).0,
        _ => return false,
    }
    if bytes.get(i) == Some(&b'.') {
        let (next, any) = digits(i + 1);
        if !any {
            return false;
        }
        i = next;
    }
    if let Some(b'e' | b'E') = bytes.get(i) {
        i += 1;
        if let Some(b'+' | b'-') = bytes.get(i) {
            i += 1;
        }
        let (next, any) = digits(i);
        if !any {
            return false;
        }
        i = next;
    }
    i == bytes.len()
}

fn unescape(raw: &[u8]) -> std::result::Result<String, &'static str> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        let byte = raw[i];
        if byte != b'\\' {
            out.push(byte);
            i += 1;
            continue;
        }
        let escape = *raw.get(i + 1).ok_or("truncated escape sequence")?;
        i += 2;
        match escape {
            b'"' => out.push(b'"'),
            b'\\' => out.push(b'\\'),
            b'/' => out.push(b'/'),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0C),
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'u' => {
                let first = hex4(raw, i)?;
                i += 4;
                let code = if (0xD800..0xDC00).contains(&first) {
                    if raw.get(i) != Some(&b'\\') || raw.get(i + 1) != Some(&b'u') {
                        return Err("unpaired surrogate in unicode escape");
                    }
                    let second = hex4(raw, i + 2)?;
                    if !(0xDC00..0xE000).contains(&second) {
                        return Err("invalid low surrogate in unicode escape");
                    }
                    i += 6;
                    0x10000 + ((first - 0xD800) << 10) + (second - 0xDC00)
                } else {
                    first
                };
                let ch = char::from_u32(code).ok_or("invalid unicode code point")?;
                let mut tmp = [0u8; 4];
                out.extend_from_slice(ch.encode_utf8(&mut tmp).as_bytes());
            }
            _ => return Err("invalid escape sequence"),
        }
    }
    String::from_utf8(out).map_err(|_| "invalid UTF-8 in string")
}

fn hex4(raw: &[u8], at: usize) -> std::result::Result<u32, &'static str> {
    let digits = raw.get(at..at + 4).ok_or("truncated unicode escape")?;
    if !digits.iter().all(u8::is_ascii_hexdigit) {
        return Err("invalid unicode escape");
    }
    let text = std::str::from_utf8(digits).map_err(|_| "invalid unicode escape")?;
    u32::from_str_radix(text, 16).map_err(|_| "invalid unicode escape")
}
