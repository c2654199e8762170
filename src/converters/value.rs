use crate::converter::{Converter, Progress};
use crate::reader::{Reader, TokenKind};
use crate::state::{ReadStack, WriteStack};
use crate::writer::Writer;
use crate::{Codec, Error, Number, Result, Value, ValueMap};
use std::borrow::Cow;

/// Dynamic [`Value`]s.
///
/// A value is read in one go, so the whole of it must be buffered first; the
/// converter asks for read-ahead and never suspends.
#[derive(Debug, Default, Clone, Copy)]
pub struct ValueConverter;

impl ValueConverter {
    fn read_current(reader: &mut Reader<'_>, depth: usize, codec: &Codec, stack: &ReadStack) -> Result<Value> {
        if depth > codec.options.max_depth {
            return Err(Error::depth_exceeded(&stack.path(), codec.options.max_depth));
        }
        Ok(match reader.token() {
            TokenKind::Null => Value::Null,
            TokenKind::True => Value::Bool(true),
            TokenKind::False => Value::Bool(false),
            TokenKind::Number => {
                let text = reader.number_text().unwrap_or_default();
                let number = Number::parse(text)
                    .ok_or_else(|| Error::syntax(reader.offset(), "number out of range"))?;
                Value::Number(number)
            }
            TokenKind::String => Value::String(reader.string()?.into_owned()),
            TokenKind::StartArray => {
                let mut items = Vec::new();
                loop {
                    Self::advance(reader)?;
                    if reader.token() == TokenKind::EndArray {
                        break;
                    }
                    items.push(Self::read_current(reader, depth + 1, codec, stack)?);
                }
                Value::Array(items)
            }
            TokenKind::StartObject => {
                let mut map = ValueMap::new();
                loop {
                    Self::advance(reader)?;
                    if reader.token() == TokenKind::EndObject {
                        break;
                    }
                    let name = reader.string()?.into_owned();
                    Self::advance(reader)?;
                    let item = Self::read_current(reader, depth + 1, codec, stack)?;
                    map.insert(name, item);
                }
                Value::Object(map)
            }
            other => return Err(Error::type_mismatch(&stack.path(), "value", other.describe())),
        })
    }

    fn advance(reader: &mut Reader<'_>) -> Result<()> {
        if reader.read()? {
            Ok(())
        } else {
            Err(Error::unexpected_eof(reader.offset(), "the rest of a buffered value"))
        }
    }

    fn write(writer: &mut Writer, value: &Value) -> Result<()> {
        match value {
            Value::Null => writer.write_null(),
            Value::Bool(b) => writer.write_bool(*b),
            Value::Number(Number::Integer(i)) => writer.write_i64(*i),
            Value::Number(Number::Float(f)) => writer.write_f64(*f)?,
            Value::String(s) => writer.write_string(s),
            Value::Array(items) => {
                writer.write_start_array();
                for item in items {
                    Self::write(writer, item)?;
                }
                writer.write_end_array();
            }
            Value::Object(map) => {
                writer.write_start_object();
                for (key, item) in map {
                    writer.write_property_name(key);
                    Self::write(writer, item)?;
                }
                writer.write_end_object();
            }
        }
        Ok(())
    }
}

impl Converter<Value> for ValueConverter {
    fn type_name(&self) -> Cow<'static, str> {
        Cow::Borrowed("Value")
    }

    fn on_try_read(
        &self,
        reader: &mut Reader<'_>,
        codec: &Codec,
        stack: &mut ReadStack,
    ) -> Result<Progress<Value>> {
        self.read_direct(reader, codec, stack).map(Progress::Ready)
    }

    fn supports_direct_read(&self) -> bool {
        true
    }

    fn read_direct(&self, reader: &mut Reader<'_>, codec: &Codec, stack: &mut ReadStack) -> Result<Value> {
        Self::read_current(reader, stack.depth(), codec, stack)
    }

    fn requires_read_ahead(&self) -> bool {
        true
    }

    fn on_try_write(
        &self,
        writer: &mut Writer,
        value: &Value,
        _codec: &Codec,
        _stack: &mut WriteStack,
    ) -> Result<bool> {
        Self::write(writer, value)?;
        Ok(true)
    }

    fn read_as_property_name(&self, name: Cow<'_, str>, _codec: &Codec, _path: &str) -> Result<Value> {
        Ok(Value::String(name.into_owned()))
    }

    fn write_as_property_name<'v>(&self, value: &'v Value, _codec: &Codec) -> Result<Cow<'v, str>> {
        match value {
            Value::String(s) => Ok(Cow::Borrowed(s)),
            other => Err(Error::unsupported_type(&format!(
                "a {} value cannot be written as a property name",
                other.kind()
            ))),
        }
    }

    fn is_builtin(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value;

    fn read(json: &str) -> Result<Value> {
        let codec = Codec::default();
        let mut reader = Reader::from_slice(json.as_bytes());
        reader.read()?;
        let mut stack = ReadStack::new(false);
        stack.push();
        ValueConverter.read_direct(&mut reader, &codec, &mut stack)
    }

    #[test]
    fn test_read_nested() {
        let value = read(r#"{"a": [1, 2.5, "x", null], "b": {"c": false}}"#).unwrap();
        assert_eq!(
            value,
            value!({ "a": [1, 2.5, "x", null], "b": { "c": false } })
        );
    }

    #[test]
    fn test_write_round_trip() {
        let value = value!({ "list": [true, { "k": -1 }], "s": "q\"" });
        let mut writer = Writer::compact();
        ValueConverter::write(&mut writer, &value).unwrap();
        let json = writer.into_inner();
        assert_eq!(json, r#"{"list":[true,{"k":-1}],"s":"q\""}"#);
        assert_eq!(read(&json).unwrap(), value);
    }

    #[test]
    fn test_truncated_value() {
        assert!(matches!(read(r#"[1, [2"#), Err(Error::UnexpectedEof { .. })));
    }
}
