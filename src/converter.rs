//! The per-type converter contract.
//!
//! A [`Converter<T>`] reads one `T` from a [`Reader`] positioned on the value's
//! first token, and writes one `T` to a [`Writer`]. Converters for containers
//! may suspend: a read returns [`Progress::Incomplete`] when the buffer runs
//! out, a write returns `Ok(false)` when the output should be flushed. Either
//! way the progress made so far lives in the current stack frame, and the
//! caller re-invokes the converter with the same frame once it can continue.
//!
//! Converters are invoked through [`read_value`] and [`write_value`], which
//! manage the frame for the value's nesting level.

use crate::reader::Reader;
use crate::state::{ReadStack, WriteStack};
use crate::writer::Writer;
use crate::{Codec, Error, Result};
use std::borrow::Cow;

/// Outcome of a read step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress<T> {
    Ready(T),
    /// More input is needed; re-invoke with the same frames.
    Incomplete,
}

impl<T> Progress<T> {
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Progress::Ready(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Progress<U> {
        match self {
            Progress::Ready(value) => Progress::Ready(f(value)),
            Progress::Incomplete => Progress::Incomplete,
        }
    }

    pub fn ready(self) -> Option<T> {
        match self {
            Progress::Ready(value) => Some(value),
            Progress::Incomplete => None,
        }
    }
}

/// Reads and writes values of type `T`.
pub trait Converter<T>: Send + Sync + 'static {
    /// Name used in error messages.
    fn type_name(&self) -> Cow<'static, str> {
        Cow::Borrowed(std::any::type_name::<T>())
    }

    /// Reads a value starting at the current token.
    fn on_try_read(
        &self,
        reader: &mut Reader<'_>,
        codec: &Codec,
        stack: &mut ReadStack,
    ) -> Result<Progress<T>>;

    /// Writes `value`. Returns `Ok(false)` if the write suspended.
    fn on_try_write(
        &self,
        writer: &mut Writer,
        value: &T,
        codec: &Codec,
        stack: &mut WriteStack,
    ) -> Result<bool>;

    /// Whether [`read_direct`](Self::read_direct) can read a complete value
    /// without frame bookkeeping.
    fn supports_direct_read(&self) -> bool {
        false
    }

    /// Reads a complete value without suspending.
    fn read_direct(&self, reader: &mut Reader<'_>, codec: &Codec, stack: &mut ReadStack) -> Result<T> {
        match self.on_try_read(reader, codec, stack)? {
            Progress::Ready(value) => Ok(value),
            Progress::Incomplete => Err(Error::unexpected_eof(reader.offset(), &self.type_name())),
        }
    }

    /// Whether the whole value must be buffered before [`on_try_read`](Self::on_try_read).
    fn requires_read_ahead(&self) -> bool {
        false
    }

    /// Reads a value from an unescaped property name.
    fn read_as_property_name(&self, name: Cow<'_, str>, _codec: &Codec, path: &str) -> Result<T> {
        Err(Error::key_conversion(
            path,
            &name,
            &self.type_name(),
            "type cannot be read from a property name",
        ))
    }

    /// Renders a value as a property name.
    fn write_as_property_name<'v>(&self, _value: &'v T, _codec: &Codec) -> Result<Cow<'v, str>> {
        Err(Error::unsupported_type(&format!(
            "{} cannot be written as a property name",
            self.type_name()
        )))
    }

    /// Whether this is one of the converters registered by default.
    fn is_builtin(&self) -> bool {
        false
    }
}

/// Reads one value in a new nesting level.
///
/// The reader must be positioned on the value's first token, unless the level
/// is being resumed after a suspension.
pub fn read_value<T: 'static>(
    converter: &dyn Converter<T>,
    reader: &mut Reader<'_>,
    codec: &Codec,
    stack: &mut ReadStack,
) -> Result<Progress<T>> {
    if stack.depth() >= codec.options.max_depth {
        return Err(Error::depth_exceeded(&stack.path(), codec.options.max_depth));
    }
    stack.push();
    let result = converter.on_try_read(reader, codec, stack);
    stack.pop(!matches!(result, Ok(Progress::Incomplete)));
    result
}

/// Writes one value in a new nesting level.
pub fn write_value<T: 'static>(
    converter: &dyn Converter<T>,
    writer: &mut Writer,
    value: &T,
    codec: &Codec,
    stack: &mut WriteStack,
) -> Result<bool> {
    if stack.depth() >= codec.options.max_depth {
        return Err(Error::depth_exceeded(&stack.path(), codec.options.max_depth));
    }
    stack.push();
    let result = converter.on_try_write(writer, value, codec, stack);
    stack.pop(!matches!(result, Ok(false)));
    result
}

/// The type mismatch error for a converter that cannot start at the current token.
pub(crate) fn mismatch(type_name: &str, reader: &Reader<'_>, stack: &ReadStack) -> Error {
    Error::type_mismatch(&stack.path(), type_name, reader.token().describe())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_helpers() {
        let ready = Progress::Ready(2);
        assert!(ready.is_ready());
        assert_eq!(ready.map(|v| v * 2), Progress::Ready(4));
        assert_eq!(Progress::<i32>::Incomplete.ready(), None);
    }

    #[test]
    fn test_depth_limit() {
        let codec = Codec::new(crate::SerializerOptions::new().with_max_depth(1));
        let converter = codec.converter::<crate::ValueMap>().unwrap();
        let mut reader = Reader::from_slice(br#"{"a":1}"#);
        reader.read().unwrap();
        let mut stack = ReadStack::new(false);
        stack.push();
        let err = read_value(&*converter, &mut reader, &codec, &mut stack).unwrap_err();
        assert!(matches!(err, Error::DepthExceeded { max: 1, .. }));
    }
}
