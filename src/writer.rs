//! Buffered JSON token writer.
//!
//! [`Writer`] emits JSON into an in-memory buffer and takes care of separators
//! and indentation. Streaming writes drain the buffer with
//! [`Writer::take_output`] between suspensions; the separator state survives
//! the drain, so the next chunk continues exactly where the previous one ended.
//!
//! ```rust
//! use serde_mapstream::writer::Writer;
//!
//! let mut writer = Writer::compact();
//! writer.write_start_object();
//! writer.write_property_name("a");
//! writer.write_i64(1);
//! writer.write_end_object();
//! assert_eq!(writer.into_inner(), r#"{"a":1}"#);
//! ```

use crate::{Error, Result, SerializerOptions};
use std::fmt::Write as _;

pub struct Writer {
    output: String,
    indented: bool,
    indent: usize,
    /// One entry per open container: whether it has a member yet.
    scopes: Vec<bool>,
    after_name: bool,
}

impl Writer {
    pub fn new(options: &SerializerOptions) -> Self {
        Writer {
            output: String::with_capacity(256),
            indented: options.write_indented,
            indent: options.indent,
            scopes: Vec::new(),
            after_name: false,
        }
    }

    /// A writer producing compact output.
    #[must_use]
    pub fn compact() -> Self {
        Self::new(&SerializerOptions::default())
    }

    /// Number of bytes written since the last drain.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.output.len()
    }

    /// Drains the buffered output, keeping the separator state.
    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.output)
    }

    pub fn into_inner(self) -> String {
        self.output
    }

    /// Number of containers currently open.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn write_start_object(&mut self) {
        self.begin_value();
        self.output.push('{');
        self.scopes.push(false);
    }

    pub fn write_end_object(&mut self) {
        self.end_container('}');
    }

    pub fn write_start_array(&mut self) {
        self.begin_value();
        self.output.push('[');
        self.scopes.push(false);
    }

    pub fn write_end_array(&mut self) {
        self.end_container(']');
    }

    pub fn write_property_name(&mut self, name: &str) {
        self.begin_value();
        self.write_escaped(name);
        self.end_property_name();
    }

    /// Writes a data key, escaping a leading `$` as `\u0024` so the key is not
    /// read back as `$id`, `$ref` or `$type`.
    pub fn write_data_property_name(&mut self, name: &str) {
        let Some(rest) = name.strip_prefix('$') else {
            return self.write_property_name(name);
        };
        self.begin_value();
        self.output.push_str("\"\\u0024");
        self.escape_chars(rest);
        self.output.push('"');
        self.end_property_name();
    }

    fn end_property_name(&mut self) {
        self.output.push(':');
        if self.indented {
            self.output.push(' ');
        }
        self.after_name = true;
    }

    pub fn write_string(&mut self, value: &str) {
        self.begin_value();
        self.write_escaped(value);
    }

    pub fn write_i64(&mut self, value: i64) {
        self.begin_value();
        let _ = write!(self.output, "{value}");
    }

    pub fn write_u64(&mut self, value: u64) {
        self.begin_value();
        let _ = write!(self.output, "{value}");
    }

    /// Writes a float in its shortest round-trip form.
    ///
    /// JSON has no representation for NaN or the infinities, so those fail.
    pub fn write_f64(&mut self, value: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(Error::custom(format!("cannot write non-finite number {value}")));
        }
        self.begin_value();
        let _ = write!(self.output, "{value:?}");
        Ok(())
    }

    /// Writes already-validated number text verbatim.
    pub fn write_number_text(&mut self, text: &str) {
        self.begin_value();
        self.output.push_str(text);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.begin_value();
        self.output.push_str(if value { "true" } else { "false" });
    }

    pub fn write_null(&mut self) {
        self.begin_value();
        self.output.push_str("null");
    }

    fn begin_value(&mut self) {
        if self.after_name {
            self.after_name = false;
            return;
        }
        let Some(has_members) = self.scopes.last_mut() else {
            return;
        };
        if *has_members {
            self.output.push(',');
        }
        *has_members = true;
        if self.indented {
            self.newline();
        }
    }

    fn end_container(&mut self, close: char) {
        let had_members = self.scopes.pop().unwrap_or(false);
        if had_members && self.indented {
            self.newline();
        }
        self.output.push(close);
    }

    fn newline(&mut self) {
        self.output.push('\n');
        let width = self.scopes.len() * self.indent;
        self.output.extend(std::iter::repeat(' ').take(width));
    }

    fn write_escaped(&mut self, s: &str) {
        self.output.push('"');
        self.escape_chars(s);
        self.output.push('"');
    }

    fn escape_chars(&mut self, s: &str) {
        for ch in s.chars() {
            match ch {
                '"' => self.output.push_str("\\\""),
                '\\' => self.output.push_str("\\\\"),
                '\n' => self.output.push_str("\\n"),
                '\r' => self.output.push_str("\\r"),
                '\t' => self.output.push_str("\\t"),
                '\u{0008}' => self.output.push_str("\\b"),
                '\u{000C}' => self.output.push_str("\\f"),
                c if c < '\u{0020}' => {
                    let _ = write!(self.output, "\\u{:04x}", c as u32);
                }
                _ => self.output.push(ch),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact_nesting() {
        let mut writer = Writer::compact();
        writer.write_start_object();
        writer.write_property_name("list");
        writer.write_start_array();
        writer.write_i64(-1);
        writer.write_bool(true);
        writer.write_null();
        writer.write_end_array();
        writer.write_property_name("empty");
        writer.write_start_object();
        writer.write_end_object();
        writer.write_end_object();
        assert_eq!(writer.into_inner(), r#"{"list":[-1,true,null],"empty":{}}"#);
    }

    #[test]
    fn test_indented_output() {
        let options = SerializerOptions::pretty();
        let mut writer = Writer::new(&options);
        writer.write_start_object();
        writer.write_property_name("a");
        writer.write_u64(1);
        writer.write_property_name("b");
        writer.write_start_array();
        writer.write_string("x");
        writer.write_end_array();
        writer.write_end_object();
        assert_eq!(writer.into_inner(), "{\n  \"a\": 1,\n  \"b\": [\n    \"x\"\n  ]\n}");
    }

    #[test]
    fn test_data_key_with_leading_dollar() {
        let mut writer = Writer::compact();
        writer.write_start_object();
        writer.write_data_property_name("$id");
        writer.write_i64(1);
        writer.write_data_property_name("a$\"");
        writer.write_i64(2);
        writer.write_data_property_name("$");
        writer.write_i64(3);
        writer.write_end_object();
        assert_eq!(writer.into_inner(), r#"{"\u0024id":1,"a$\"":2,"\u0024":3}"#);
    }

    #[test]
    fn test_escapes() {
        let mut writer = Writer::compact();
        writer.write_string("q\"b\\n\n\u{1}");
        assert_eq!(writer.into_inner(), r#""q\"b\\n\n\u0001""#);
    }

    #[test]
    fn test_floats() {
        let mut writer = Writer::compact();
        writer.write_start_array();
        writer.write_f64(1.0).unwrap();
        writer.write_f64(0.1).unwrap();
        writer.write_end_array();
        assert_eq!(writer.into_inner(), "[1.0,0.1]");

        let mut writer = Writer::compact();
        assert!(writer.write_f64(f64::NAN).is_err());
        assert!(writer.write_f64(f64::INFINITY).is_err());
    }

    #[test]
    fn test_take_output_keeps_separators() {
        let mut writer = Writer::compact();
        writer.write_start_object();
        writer.write_property_name("a");
        writer.write_i64(1);
        let first = writer.take_output();
        assert_eq!(writer.pending(), 0);
        writer.write_property_name("b");
        writer.write_i64(2);
        writer.write_end_object();
        assert_eq!(first + &writer.into_inner(), r#"{"a":1,"b":2}"#);
    }
}
