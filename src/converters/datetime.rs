use crate::converter::{mismatch, Converter, Progress};
use crate::reader::{Reader, TokenKind};
use crate::state::{ReadStack, WriteStack};
use crate::writer::Writer;
use crate::{Codec, Error, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use std::borrow::Cow;

/// RFC 3339 timestamps, normalised to UTC.
#[derive(Debug, Default, Clone, Copy)]
pub struct DateTimeConverter;

impl DateTimeConverter {
    fn parse(text: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
        DateTime::parse_from_rfc3339(text).map(|dt| dt.with_timezone(&Utc))
    }

    fn format(value: &DateTime<Utc>) -> String {
        value.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }
}

impl Converter<DateTime<Utc>> for DateTimeConverter {
    fn type_name(&self) -> Cow<'static, str> {
        Cow::Borrowed("DateTime<Utc>")
    }

    fn on_try_read(
        &self,
        reader: &mut Reader<'_>,
        codec: &Codec,
        stack: &mut ReadStack,
    ) -> Result<Progress<DateTime<Utc>>> {
        self.read_direct(reader, codec, stack).map(Progress::Ready)
    }

    fn supports_direct_read(&self) -> bool {
        true
    }

    fn read_direct(
        &self,
        reader: &mut Reader<'_>,
        _codec: &Codec,
        stack: &mut ReadStack,
    ) -> Result<DateTime<Utc>> {
        if reader.token() != TokenKind::String {
            return Err(mismatch(&self.type_name(), reader, stack));
        }
        let text = reader.string()?;
        Self::parse(&text).map_err(|e| {
            Error::type_mismatch(&stack.path(), "RFC 3339 timestamp", &format!("'{text}' ({e})"))
        })
    }

    fn on_try_write(
        &self,
        writer: &mut Writer,
        value: &DateTime<Utc>,
        _codec: &Codec,
        _stack: &mut WriteStack,
    ) -> Result<bool> {
        writer.write_string(&Self::format(value));
        Ok(true)
    }

    fn read_as_property_name(
        &self,
        name: Cow<'_, str>,
        _codec: &Codec,
        path: &str,
    ) -> Result<DateTime<Utc>> {
        Self::parse(&name)
            .map_err(|e| Error::key_conversion(path, &name, "DateTime<Utc>", &e.to_string()))
    }

    fn write_as_property_name<'v>(
        &self,
        value: &'v DateTime<Utc>,
        _codec: &Codec,
    ) -> Result<Cow<'v, str>> {
        Ok(Cow::Owned(Self::format(value)))
    }

    fn is_builtin(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_offsets_normalise_to_utc() {
        let codec = Codec::default();
        let mut reader = Reader::from_slice(br#""2024-03-01T12:00:00+02:00""#);
        reader.read().unwrap();
        let mut stack = ReadStack::new(false);
        stack.push();
        let dt = DateTimeConverter.read_direct(&mut reader, &codec, &mut stack).unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap());
        assert_eq!(
            DateTimeConverter.write_as_property_name(&dt, &codec).unwrap(),
            "2024-03-01T10:00:00Z"
        );
    }

    #[test]
    fn test_invalid_key() {
        let codec = Codec::default();
        let err = DateTimeConverter
            .read_as_property_name(Cow::Borrowed("yesterday"), &codec, "$.yesterday")
            .unwrap_err();
        assert!(matches!(err, Error::KeyConversion { .. }));
    }
}
