use crate::converter::{mismatch, Converter, Progress};
use crate::reader::{Reader, TokenKind};
use crate::state::{ReadStack, WriteStack};
use crate::writer::Writer;
use crate::{Codec, Error, Result};
use std::borrow::Cow;
use std::fmt::Display;
use std::marker::PhantomData;
use std::str::FromStr;

/// Converter for any type with a string form, such as fieldless enums.
///
/// Values are written as JSON strings with `Display` and read back with
/// `FromStr`, both as values and as property names.
///
/// ```rust
/// use serde_mapstream::converters::FromStrConverter;
/// use serde_mapstream::map::BTreeMapShape;
/// use serde_mapstream::{from_str, Codec};
/// use std::collections::BTreeMap;
/// use std::str::FromStr;
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
/// enum Color { Red, Green }
///
/// impl FromStr for Color {
///     type Err = String;
///     fn from_str(s: &str) -> Result<Self, String> {
///         match s {
///             "red" => Ok(Color::Red),
///             "green" => Ok(Color::Green),
///             other => Err(format!("unknown color '{other}'")),
///         }
///     }
/// }
///
/// impl std::fmt::Display for Color {
///     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
///         f.write_str(match self { Color::Red => "red", Color::Green => "green" })
///     }
/// }
///
/// let mut codec = Codec::default();
/// codec.register(FromStrConverter::<Color>::new());
/// codec.register_map(BTreeMapShape::<Color, i64>::new());
///
/// let map: BTreeMap<Color, i64> = from_str(r#"{"green": 2, "red": 1}"#, &codec).unwrap();
/// assert_eq!(map.keys().copied().collect::<Vec<_>>(), [Color::Red, Color::Green]);
/// assert!(from_str::<BTreeMap<Color, i64>>(r#"{"blue": 3}"#, &codec).is_err());
/// ```
pub struct FromStrConverter<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> FromStrConverter<T> {
    #[must_use]
    pub fn new() -> Self {
        FromStrConverter {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for FromStrConverter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromStrConverter<T>
where
    T: FromStr + Display + 'static,
    T::Err: Display,
{
    fn parse(&self, text: &str) -> std::result::Result<T, String> {
        text.parse::<T>().map_err(|e| e.to_string())
    }
}

impl<T> Converter<T> for FromStrConverter<T>
where
    T: FromStr + Display + 'static,
    T::Err: Display,
{
    fn on_try_read(
        &self,
        reader: &mut Reader<'_>,
        codec: &Codec,
        stack: &mut ReadStack,
    ) -> Result<Progress<T>> {
        self.read_direct(reader, codec, stack).map(Progress::Ready)
    }

    fn supports_direct_read(&self) -> bool {
        true
    }

    fn read_direct(&self, reader: &mut Reader<'_>, _codec: &Codec, stack: &mut ReadStack) -> Result<T> {
        if reader.token() != TokenKind::String {
            return Err(mismatch(&self.type_name(), reader, stack));
        }
        let text = reader.string()?;
        self.parse(&text)
            .map_err(|reason| Error::type_mismatch(&stack.path(), &self.type_name(), &reason))
    }

    fn on_try_write(
        &self,
        writer: &mut Writer,
        value: &T,
        _codec: &Codec,
        _stack: &mut WriteStack,
    ) -> Result<bool> {
        writer.write_string(&value.to_string());
        Ok(true)
    }

    fn read_as_property_name(&self, name: Cow<'_, str>, _codec: &Codec, path: &str) -> Result<T> {
        self.parse(&name)
            .map_err(|reason| Error::key_conversion(path, &name, &self.type_name(), &reason))
    }

    fn write_as_property_name<'v>(&self, value: &'v T, _codec: &Codec) -> Result<Cow<'v, str>> {
        Ok(Cow::Owned(value.to_string()))
    }
}
