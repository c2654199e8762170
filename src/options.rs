//! Configuration options for map reading and writing.
//!
//! This module provides the knobs that change how the codec interprets a
//! document:
//!
//! - [`SerializerOptions`]: Main configuration struct
//! - [`ReferenceHandling`]: Whether `$id`/`$ref` metadata is read and written
//! - [`NumberHandling`]: Whether numbers may be quoted
//!
//! Options derive `serde` traits with `#[serde(default)]`, so a partial JSON
//! configuration file deserializes onto the defaults.
//!
//! ## Examples
//!
//! ```rust
//! use serde_mapstream::{NumberHandling, ReferenceHandling, SerializerOptions};
//!
//! let options = SerializerOptions::new()
//!     .with_reference_handling(ReferenceHandling::Preserve)
//!     .with_number_handling(NumberHandling::AllowReadingFromString)
//!     .with_default_buffer_size(64);
//! assert!(options.preserves_references());
//! ```

use serde::{Deserialize, Serialize};

/// How object identity is represented in documents.
///
/// With [`ReferenceHandling::Preserve`], containers that carry identity are
/// written with a `$id` property the first time and as `{"$ref": "<id>"}` on
/// every later occurrence, and readers interpret those properties.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceHandling {
    #[default]
    Ignore,
    Preserve,
}

/// How numeric element converters treat quoted numbers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberHandling {
    /// Numbers must be JSON number tokens.
    #[default]
    Strict,
    /// Numbers may also be read from JSON strings such as `"42"`.
    AllowReadingFromString,
    /// Numbers are written as JSON strings and may be read from them.
    WriteAsString,
}

impl NumberHandling {
    #[must_use]
    pub const fn reads_from_string(self) -> bool {
        !matches!(self, NumberHandling::Strict)
    }
}

/// Configuration options for the codec.
///
/// # Examples
///
/// ```rust
/// use serde_mapstream::SerializerOptions;
///
/// // Defaults: no reference preservation, strict numbers, compact output
/// let options = SerializerOptions::new();
/// assert_eq!(options.max_depth, 64);
///
/// // Pretty-printed output with 4-space indentation
/// let options = SerializerOptions::pretty().with_indent(4);
/// assert!(options.write_indented);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerializerOptions {
    pub reference_handling: ReferenceHandling,
    /// Skip metadata-shaped properties found after regular properties instead
    /// of failing with [`Error::UnexpectedMetadata`](crate::Error::UnexpectedMetadata).
    pub allow_out_of_order_metadata: bool,
    pub number_handling: NumberHandling,
    /// Read chunk size for [`from_reader`](crate::from_reader) and flush
    /// threshold for [`to_writer`](crate::to_writer).
    pub default_buffer_size: usize,
    pub max_depth: usize,
    pub write_indented: bool,
    pub indent: usize,
}

impl Default for SerializerOptions {
    fn default() -> Self {
        SerializerOptions {
            reference_handling: ReferenceHandling::default(),
            allow_out_of_order_metadata: false,
            number_handling: NumberHandling::default(),
            default_buffer_size: 16 * 1024,
            max_depth: 64,
            write_indented: false,
            indent: 2,
        }
    }
}

impl SerializerOptions {
    /// Creates default options.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_mapstream::SerializerOptions;
    ///
    /// let options = SerializerOptions::new();
    /// assert!(!options.write_indented);
    /// assert!(!options.allow_out_of_order_metadata);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options for indented output.
    #[must_use]
    pub fn pretty() -> Self {
        SerializerOptions {
            write_indented: true,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_reference_handling(mut self, handling: ReferenceHandling) -> Self {
        self.reference_handling = handling;
        self
    }

    #[must_use]
    pub fn with_out_of_order_metadata(mut self, allow: bool) -> Self {
        self.allow_out_of_order_metadata = allow;
        self
    }

    #[must_use]
    pub fn with_number_handling(mut self, handling: NumberHandling) -> Self {
        self.number_handling = handling;
        self
    }

    /// Sets the chunk size used by streaming reads and the output size at
    /// which streaming writes suspend to flush.
    ///
    /// A size of zero is clamped to one byte.
    #[must_use]
    pub fn with_default_buffer_size(mut self, size: usize) -> Self {
        self.default_buffer_size = size.max(1);
        self
    }

    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Sets the indentation size (number of spaces per level).
    ///
    /// Only affects indented output.
    #[must_use]
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    #[must_use]
    pub fn preserves_references(&self) -> bool {
        self.reference_handling == ReferenceHandling::Preserve
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let options: SerializerOptions =
            serde_json::from_str(r#"{"reference_handling": "preserve", "indent": 4}"#).unwrap();
        assert_eq!(options.reference_handling, ReferenceHandling::Preserve);
        assert_eq!(options.indent, 4);
        assert_eq!(options.max_depth, 64);
        assert_eq!(options.number_handling, NumberHandling::Strict);
    }

    #[test]
    fn test_buffer_size_is_clamped() {
        let options = SerializerOptions::new().with_default_buffer_size(0);
        assert_eq!(options.default_buffer_size, 1);
    }

    #[test]
    fn test_number_handling_reads_from_string() {
        assert!(!NumberHandling::Strict.reads_from_string());
        assert!(NumberHandling::AllowReadingFromString.reads_from_string());
        assert!(NumberHandling::WriteAsString.reads_from_string());
    }
}
