//! Error types for map reading and writing.
//!
//! Every fatal condition the codec can hit maps to one [`Error`] variant. Errors
//! raised while a document is being read carry the JSON path of the property
//! being processed (`$.outer.inner`) so a caller can produce a useful diagnostic.
//!
//! ## Error Categories
//!
//! - **Token errors**: malformed JSON ([`Error::Syntax`]) or a truncated final buffer
//!   ([`Error::UnexpectedEof`])
//! - **Shape errors**: the document does not fit the target type
//!   ([`Error::TypeMismatch`], [`Error::KeyConversion`], [`Error::UnsupportedConstruction`])
//! - **Metadata errors**: `$id`/`$ref`/`$type` used where they are not allowed
//!   ([`Error::UnexpectedMetadata`], [`Error::MetadataCombinationInvalid`],
//!   [`Error::UnresolvedReference`])
//!
//! Running out of buffered input is *not* an error: readers report it through
//! [`Progress::Incomplete`](crate::Progress::Incomplete).
//!
//! ## Examples
//!
//! ```rust
//! use serde_mapstream::{from_str, Codec, Error, ValueMap};
//!
//! let codec = Codec::default();
//! let result: Result<ValueMap, Error> = from_str("[1, 2]", &codec);
//! assert!(matches!(result, Err(Error::TypeMismatch { .. })));
//! ```

use std::fmt;
use thiserror::Error;

/// Represents all possible errors that can occur while reading or writing maps.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// IO error during reading or writing
    #[error("IO error: {0}")]
    Io(String),

    /// Malformed JSON at a byte offset of the document
    #[error("Syntax error at offset {offset}: {msg}")]
    Syntax { offset: usize, msg: String },

    /// The final buffer ended in the middle of a value
    #[error("Unexpected end of input at offset {offset}: expected {expected}")]
    UnexpectedEof { offset: usize, expected: String },

    /// The current token cannot start a value of the expected type
    #[error("Type mismatch at {path}: expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: String,
        found: String,
    },

    /// The type descriptor cannot produce an empty instance
    #[error("Cannot construct an instance of {type_name} at {path}")]
    UnsupportedConstruction { path: String, type_name: String },

    /// A metadata-shaped property where metadata is not allowed
    #[error("Unexpected metadata property '{name}' at {path}")]
    UnexpectedMetadata { path: String, name: String },

    /// A property name that is not a valid key of the target key type
    #[error("Cannot convert property name '{name}' to {type_name} at {path}: {reason}")]
    KeyConversion {
        path: String,
        name: String,
        type_name: String,
        reason: String,
    },

    /// Conflicting or malformed `$id`/`$ref`/`$type` properties
    #[error("Invalid metadata at {path}: {msg}")]
    MetadataCombinationInvalid { path: String, msg: String },

    /// A `$ref` naming an id that was never registered
    #[error("Reference '{id}' at {path} could not be resolved")]
    UnresolvedReference { path: String, id: String },

    /// Nesting deeper than `SerializerOptions::max_depth`
    #[error("Maximum depth of {max} exceeded at {path}")]
    DepthExceeded { path: String, max: usize },

    /// No converter is registered for a type
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    /// Custom error
    #[error("Error: {0}")]
    Custom(String),
}

impl Error {
    /// Creates a syntax error at the given absolute byte offset.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_mapstream::Error;
    ///
    /// let err = Error::syntax(12, "expected ':'");
    /// assert!(err.to_string().contains("offset 12"));
    /// ```
    pub fn syntax(offset: usize, msg: &str) -> Self {
        Error::Syntax {
            offset,
            msg: msg.to_string(),
        }
    }

    /// Creates an unexpected end-of-input error.
    pub fn unexpected_eof(offset: usize, expected: &str) -> Self {
        Error::UnexpectedEof {
            offset,
            expected: expected.to_string(),
        }
    }

    /// Creates a type mismatch error.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_mapstream::Error;
    ///
    /// let err = Error::type_mismatch("$.a", "object", "number");
    /// assert!(err.to_string().contains("expected object"));
    /// ```
    pub fn type_mismatch(path: &str, expected: &str, found: &str) -> Self {
        Error::TypeMismatch {
            path: path.to_string(),
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    pub fn unsupported_construction(path: &str, type_name: &str) -> Self {
        Error::UnsupportedConstruction {
            path: path.to_string(),
            type_name: type_name.to_string(),
        }
    }

    pub fn unexpected_metadata(path: &str, name: &str) -> Self {
        Error::UnexpectedMetadata {
            path: path.to_string(),
            name: name.to_string(),
        }
    }

    /// Creates a key conversion error for a property name that does not parse
    /// as the map's key type.
    pub fn key_conversion(path: &str, name: &str, type_name: &str, reason: &str) -> Self {
        Error::KeyConversion {
            path: path.to_string(),
            name: name.to_string(),
            type_name: type_name.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn metadata_invalid(path: &str, msg: &str) -> Self {
        Error::MetadataCombinationInvalid {
            path: path.to_string(),
            msg: msg.to_string(),
        }
    }

    pub fn unresolved_reference(path: &str, id: &str) -> Self {
        Error::UnresolvedReference {
            path: path.to_string(),
            id: id.to_string(),
        }
    }

    pub fn depth_exceeded(path: &str, max: usize) -> Self {
        Error::DepthExceeded {
            path: path.to_string(),
            max,
        }
    }

    /// Creates an unsupported type error for types with no registered converter.
    pub fn unsupported_type(msg: &str) -> Self {
        Error::UnsupportedType(msg.to_string())
    }

    /// Creates a custom error with a display message.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_mapstream::Error;
    ///
    /// let err = Error::custom("something went wrong");
    /// assert!(err.to_string().contains("something went wrong"));
    /// ```
    pub fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }

    /// Creates an I/O error for reader/writer failures.
    pub fn io(msg: &str) -> Self {
        Error::Io(msg.to_string())
    }

    /// Returns the JSON path attached to this error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        match self {
            Error::TypeMismatch { path, .. }
            | Error::UnsupportedConstruction { path, .. }
            | Error::UnexpectedMetadata { path, .. }
            | Error::KeyConversion { path, .. }
            | Error::MetadataCombinationInvalid { path, .. }
            | Error::UnresolvedReference { path, .. }
            | Error::DepthExceeded { path, .. } => Some(path),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
