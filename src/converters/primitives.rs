//! Strings, booleans and numbers.
//!
//! All of these read a complete value from a single token, so they support
//! direct reads and never suspend. Numbers honour
//! [`NumberHandling`](crate::NumberHandling); every type here can also be used
//! as a map key.

use crate::converter::{mismatch, Converter, Progress};
use crate::reader::{Reader, TokenKind};
use crate::state::{ReadStack, WriteStack};
use crate::writer::Writer;
use crate::{Codec, Error, NumberHandling, Result};
use std::borrow::Cow;

#[derive(Debug, Default, Clone, Copy)]
pub struct StringConverter;

impl Converter<String> for StringConverter {
    fn type_name(&self) -> Cow<'static, str> {
        Cow::Borrowed("String")
    }

    fn on_try_read(
        &self,
        reader: &mut Reader<'_>,
        codec: &Codec,
        stack: &mut ReadStack,
    ) -> Result<Progress<String>> {
        self.read_direct(reader, codec, stack).map(Progress::Ready)
    }

    fn supports_direct_read(&self) -> bool {
        true
    }

    fn read_direct(&self, reader: &mut Reader<'_>, _codec: &Codec, stack: &mut ReadStack) -> Result<String> {
        if reader.token() != TokenKind::String {
            return Err(mismatch(&self.type_name(), reader, stack));
        }
        Ok(reader.string()?.into_owned())
    }

    fn on_try_write(
        &self,
        writer: &mut Writer,
        value: &String,
        _codec: &Codec,
        _stack: &mut WriteStack,
    ) -> Result<bool> {
        writer.write_string(value);
        Ok(true)
    }

    fn read_as_property_name(&self, name: Cow<'_, str>, _codec: &Codec, _path: &str) -> Result<String> {
        Ok(name.into_owned())
    }

    fn write_as_property_name<'v>(&self, value: &'v String, _codec: &Codec) -> Result<Cow<'v, str>> {
        Ok(Cow::Borrowed(value))
    }

    fn is_builtin(&self) -> bool {
        true
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct BoolConverter;

impl Converter<bool> for BoolConverter {
    fn type_name(&self) -> Cow<'static, str> {
        Cow::Borrowed("bool")
    }

    fn on_try_read(
        &self,
        reader: &mut Reader<'_>,
        codec: &Codec,
        stack: &mut ReadStack,
    ) -> Result<Progress<bool>> {
        self.read_direct(reader, codec, stack).map(Progress::Ready)
    }

    fn supports_direct_read(&self) -> bool {
        true
    }

    fn read_direct(&self, reader: &mut Reader<'_>, _codec: &Codec, stack: &mut ReadStack) -> Result<bool> {
        reader.bool().ok_or_else(|| mismatch(&self.type_name(), reader, stack))
    }

    fn on_try_write(
        &self,
        writer: &mut Writer,
        value: &bool,
        _codec: &Codec,
        _stack: &mut WriteStack,
    ) -> Result<bool> {
        writer.write_bool(*value);
        Ok(true)
    }

    fn read_as_property_name(&self, name: Cow<'_, str>, _codec: &Codec, path: &str) -> Result<bool> {
        name.parse()
            .map_err(|_| Error::key_conversion(path, &name, "bool", "expected 'true' or 'false'"))
    }

    fn write_as_property_name<'v>(&self, value: &'v bool, _codec: &Codec) -> Result<Cow<'v, str>> {
        Ok(Cow::Borrowed(if *value { "true" } else { "false" }))
    }

    fn is_builtin(&self) -> bool {
        true
    }
}

/// Text of the current numeric token, quoted numbers included when allowed.
fn number_text<'a>(
    type_name: &str,
    reader: &Reader<'a>,
    codec: &Codec,
    stack: &ReadStack,
) -> Result<Cow<'a, str>> {
    match reader.token() {
        TokenKind::Number => reader
            .number_text()
            .map(Cow::Borrowed)
            .ok_or_else(|| mismatch(type_name, reader, stack)),
        TokenKind::String if codec.options.number_handling.reads_from_string() => reader.string(),
        _ => Err(mismatch(type_name, reader, stack)),
    }
}

macro_rules! integer_converter {
    ($name:ident, $ty:ty) => {
        #[derive(Debug, Default, Clone, Copy)]
        pub struct $name;

        impl Converter<$ty> for $name {
            fn type_name(&self) -> Cow<'static, str> {
                Cow::Borrowed(stringify!($ty))
            }

            fn on_try_read(
                &self,
                reader: &mut Reader<'_>,
                codec: &Codec,
                stack: &mut ReadStack,
            ) -> Result<Progress<$ty>> {
                self.read_direct(reader, codec, stack).map(Progress::Ready)
            }

            fn supports_direct_read(&self) -> bool {
                true
            }

            fn read_direct(&self, reader: &mut Reader<'_>, codec: &Codec, stack: &mut ReadStack) -> Result<$ty> {
                let text = number_text(&self.type_name(), reader, codec, stack)?;
                text.parse::<$ty>().map_err(|_| {
                    Error::type_mismatch(&stack.path(), stringify!($ty), &format!("number {text}"))
                })
            }

            fn on_try_write(
                &self,
                writer: &mut Writer,
                value: &$ty,
                codec: &Codec,
                _stack: &mut WriteStack,
            ) -> Result<bool> {
                if codec.options.number_handling == NumberHandling::WriteAsString {
                    writer.write_string(&value.to_string());
                } else {
                    writer.write_number_text(&value.to_string());
                }
                Ok(true)
            }

            fn read_as_property_name(&self, name: Cow<'_, str>, _codec: &Codec, path: &str) -> Result<$ty> {
                name.parse::<$ty>()
                    .map_err(|e| Error::key_conversion(path, &name, stringify!($ty), &e.to_string()))
            }

            fn write_as_property_name<'v>(&self, value: &'v $ty, _codec: &Codec) -> Result<Cow<'v, str>> {
                Ok(Cow::Owned(value.to_string()))
            }

            fn is_builtin(&self) -> bool {
                true
            }
        }
    };
}

integer_converter!(I32Converter, i32);
integer_converter!(I64Converter, i64);
integer_converter!(U32Converter, u32);
integer_converter!(U64Converter, u64);

#[derive(Debug, Default, Clone, Copy)]
pub struct F64Converter;

impl F64Converter {
    fn parse(text: &str) -> Option<f64> {
        text.parse::<f64>().ok().filter(|f| f.is_finite())
    }
}

impl Converter<f64> for F64Converter {
    fn type_name(&self) -> Cow<'static, str> {
        Cow::Borrowed("f64")
    }

    fn on_try_read(
        &self,
        reader: &mut Reader<'_>,
        codec: &Codec,
        stack: &mut ReadStack,
    ) -> Result<Progress<f64>> {
        self.read_direct(reader, codec, stack).map(Progress::Ready)
    }

    fn supports_direct_read(&self) -> bool {
        true
    }

    fn read_direct(&self, reader: &mut Reader<'_>, codec: &Codec, stack: &mut ReadStack) -> Result<f64> {
        let text = number_text(&self.type_name(), reader, codec, stack)?;
        Self::parse(&text)
            .ok_or_else(|| Error::type_mismatch(&stack.path(), "f64", &format!("number {text}")))
    }

    fn on_try_write(
        &self,
        writer: &mut Writer,
        value: &f64,
        codec: &Codec,
        _stack: &mut WriteStack,
    ) -> Result<bool> {
        if codec.options.number_handling == NumberHandling::WriteAsString {
            if !value.is_finite() {
                return Err(Error::custom(format!("cannot write non-finite number {value}")));
            }
            writer.write_string(&format!("{value:?}"));
        } else {
            writer.write_f64(*value)?;
        }
        Ok(true)
    }

    fn read_as_property_name(&self, name: Cow<'_, str>, _codec: &Codec, path: &str) -> Result<f64> {
        Self::parse(&name).ok_or_else(|| Error::key_conversion(path, &name, "f64", "not a finite number"))
    }

    fn write_as_property_name<'v>(&self, value: &'v f64, _codec: &Codec) -> Result<Cow<'v, str>> {
        Ok(Cow::Owned(format!("{value:?}")))
    }

    fn is_builtin(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SerializerOptions;

    fn read<T: 'static>(converter: &dyn Converter<T>, json: &str, codec: &Codec) -> Result<T> {
        let mut reader = Reader::from_slice(json.as_bytes());
        reader.read()?;
        let mut stack = ReadStack::new(false);
        stack.push();
        converter.read_direct(&mut reader, codec, &mut stack)
    }

    fn write<T: 'static>(converter: &dyn Converter<T>, value: &T, codec: &Codec) -> String {
        let mut writer = Writer::compact();
        let mut stack = WriteStack::default();
        assert!(converter.on_try_write(&mut writer, value, codec, &mut stack).unwrap());
        writer.into_inner()
    }

    #[test]
    fn test_strict_numbers() {
        let codec = Codec::default();
        assert_eq!(read::<i64>(&I64Converter, "-12", &codec).unwrap(), -12);
        assert_eq!(read::<f64>(&F64Converter, "2.5e1", &codec).unwrap(), 25.0);
        assert!(matches!(
            read::<i64>(&I64Converter, "\"12\"", &codec),
            Err(Error::TypeMismatch { .. })
        ));
        assert!(matches!(
            read::<i32>(&I32Converter, "1.5", &codec),
            Err(Error::TypeMismatch { .. })
        ));
        assert!(matches!(
            read::<u32>(&U32Converter, "-1", &codec),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_quoted_numbers() {
        let codec = Codec::new(
            SerializerOptions::new().with_number_handling(NumberHandling::AllowReadingFromString),
        );
        assert_eq!(read::<u64>(&U64Converter, "\"42\"", &codec).unwrap(), 42);
        assert_eq!(read::<u64>(&U64Converter, "42", &codec).unwrap(), 42);
        assert_eq!(write::<u64>(&U64Converter, &42, &codec), "42");

        let codec =
            Codec::new(SerializerOptions::new().with_number_handling(NumberHandling::WriteAsString));
        assert_eq!(write::<i64>(&I64Converter, &-3, &codec), "\"-3\"");
        assert_eq!(write::<f64>(&F64Converter, &0.5, &codec), "\"0.5\"");
    }

    #[test]
    fn test_keys() {
        let codec = Codec::default();
        assert_eq!(
            I64Converter.read_as_property_name(Cow::Borrowed("17"), &codec, "$").unwrap(),
            17
        );
        let err = I64Converter
            .read_as_property_name(Cow::Borrowed("x"), &codec, "$.x")
            .unwrap_err();
        assert!(matches!(err, Error::KeyConversion { ref path, .. } if path == "$.x"));
        assert!(BoolConverter
            .read_as_property_name(Cow::Borrowed("true"), &codec, "$")
            .unwrap());
        assert_eq!(
            F64Converter.write_as_property_name(&1.0, &codec).unwrap(),
            "1.0"
        );
    }

    #[test]
    fn test_strings_and_bools() {
        let codec = Codec::default();
        assert_eq!(read::<String>(&StringConverter, r#""a\tb""#, &codec).unwrap(), "a\tb");
        assert!(read::<String>(&StringConverter, "null", &codec).is_err());
        assert!(!read::<bool>(&BoolConverter, "false", &codec).unwrap());
        assert_eq!(write::<String>(&StringConverter, &"q\"".to_string(), &codec), r#""q\"""#);
    }
}
