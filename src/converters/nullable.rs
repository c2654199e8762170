use crate::converter::{Converter, Progress};
use crate::reader::{Reader, TokenKind};
use crate::state::{ObjectState, ReadStack, WriteStack};
use crate::writer::Writer;
use crate::{Codec, Result};
use std::borrow::Cow;
use std::sync::{Arc, OnceLock};

/// `Option<T>`: JSON `null` is `None`, anything else is read by the converter
/// for `T`.
///
/// The inner converter runs in the same frame, so a suspended inner read
/// resumes through this converter unchanged.
pub struct NullableConverter<T: 'static> {
    inner: OnceLock<Arc<dyn Converter<T>>>,
}

impl<T: 'static> NullableConverter<T> {
    /// Wraps whatever converter the codec has registered for `T`.
    ///
    /// The inner converter is looked up on first use. Until then
    /// [`requires_read_ahead`](Converter::requires_read_ahead) reports `true`,
    /// so the first value is buffered whole whatever the inner converter is.
    #[must_use]
    pub fn new() -> Self {
        NullableConverter {
            inner: OnceLock::new(),
        }
    }

    /// Wraps a specific converter.
    #[must_use]
    pub fn wrapping(inner: Arc<dyn Converter<T>>) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(inner);
        NullableConverter { inner: cell }
    }

    fn inner(&self, codec: &Codec) -> Result<Arc<dyn Converter<T>>> {
        if let Some(inner) = self.inner.get() {
            return Ok(Arc::clone(inner));
        }
        let inner = codec.converter::<T>()?;
        let _ = self.inner.set(Arc::clone(&inner));
        Ok(inner)
    }
}

impl<T: 'static> Default for NullableConverter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Converter<Option<T>> for NullableConverter<T> {
    fn type_name(&self) -> Cow<'static, str> {
        Cow::Owned(format!("Option<{}>", std::any::type_name::<T>()))
    }

    fn on_try_read(
        &self,
        reader: &mut Reader<'_>,
        codec: &Codec,
        stack: &mut ReadStack,
    ) -> Result<Progress<Option<T>>> {
        let starting = stack.current().object_state == ObjectState::None;
        if starting && reader.token() == TokenKind::Null {
            return Ok(Progress::Ready(None));
        }
        Ok(self.inner(codec)?.on_try_read(reader, codec, stack)?.map(Some))
    }

    fn on_try_write(
        &self,
        writer: &mut Writer,
        value: &Option<T>,
        codec: &Codec,
        stack: &mut WriteStack,
    ) -> Result<bool> {
        match value {
            None => {
                writer.write_null();
                Ok(true)
            }
            Some(inner) => self.inner(codec)?.on_try_write(writer, inner, codec, stack),
        }
    }

    fn requires_read_ahead(&self) -> bool {
        self.inner.get().map_or(true, |inner| inner.requires_read_ahead())
    }

    fn is_builtin(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::IndexMapShape;
    use crate::{from_reader, from_str, to_string, SerializerOptions, Value};
    use indexmap::IndexMap;

    #[test]
    fn test_null_and_present() {
        let codec = Codec::default();
        assert_eq!(from_str::<Option<i64>>("null", &codec).unwrap(), None);
        assert_eq!(from_str::<Option<i64>>("7", &codec).unwrap(), Some(7));
        assert_eq!(to_string(&None::<String>, &codec).unwrap(), "null");
        assert_eq!(to_string(&Some("x".to_string()), &codec).unwrap(), r#""x""#);
    }

    #[test]
    fn test_unresolved_inner_reads_ahead() {
        let converter = NullableConverter::<Value>::new();
        assert!(converter.requires_read_ahead());

        let mut codec = Codec::new(SerializerOptions::new().with_default_buffer_size(3));
        codec
            .register::<Option<Value>>(NullableConverter::<Value>::new())
            .register_map(IndexMapShape::<String, Option<Value>>::new());
        let doc = br#"{"a":{"x":[1,2,3]},"b":null}"#;
        let map: IndexMap<String, Option<Value>> = from_reader(&doc[..], &codec).unwrap();
        assert_eq!(map["a"].as_ref().map(ToString::to_string).as_deref(), Some(r#"{"x":[1,2,3]}"#));
        assert_eq!(map["b"], None);
    }
}
