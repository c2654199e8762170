//! Leading `$id`, `$ref` and `$type` properties.
//!
//! Metadata must come first in an object. [`read_metadata`] consumes it one
//! token at a time and records what it has seen in the current frame, so it
//! can stop whenever the buffer runs out and continue on the next call.
//!
//! When it finishes it has either consumed a whole `{"$ref": "..."}` object, or
//! left the reader on the first ordinary property name (or the end of the
//! object) with the frame's property state at `NameRead`.

use crate::reader::{Reader, TokenKind};
use crate::state::{MetadataFlags, PropertyState, ReadStack};
use crate::{Error, Result};
use tracing::trace;

/// Which metadata properties the current converter understands.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct MetadataRules {
    /// `$id` and `$ref`, with reference preservation on.
    pub references: bool,
    /// `$type`, for converters with a dispatcher.
    pub type_discriminator: bool,
}

impl MetadataRules {
    pub(crate) fn any(self) -> bool {
        self.references || self.type_discriminator
    }
}

/// Whether a raw, still-escaped property name looks like metadata.
///
/// Writing the `$` as `$` makes the property an ordinary one.
pub(crate) fn is_metadata_shaped(raw_name: &[u8]) -> bool {
    raw_name.first() == Some(&b'$')
}

fn property_of(kind: MetadataFlags) -> &'static str {
    if kind == MetadataFlags::ID {
        "$id"
    } else if kind == MetadataFlags::REF {
        "$ref"
    } else {
        "$type"
    }
}

/// Reads the metadata block of the object whose start token was just read.
///
/// Returns `Ok(false)` if more input is needed.
pub(crate) fn read_metadata(
    reader: &mut Reader<'_>,
    rules: MetadataRules,
    stack: &mut ReadStack,
) -> Result<bool> {
    loop {
        if let Some(kind) = stack.current().metadata_property {
            if !reader.read()? {
                return Ok(false);
            }
            let value = metadata_value(reader, kind, stack)?;
            trace!(property = property_of(kind), %value, "read metadata");
            let frame = stack.current_mut();
            if kind == MetadataFlags::ID {
                frame.metadata_id = Some(value);
            } else if kind == MetadataFlags::REF {
                frame.reference_id = Some(value);
            } else {
                frame.type_discriminator = Some(value);
            }
            frame.metadata_property = None;
            frame.property_name = None;
            continue;
        }

        if stack.current().metadata.contains(MetadataFlags::REF) {
            if !reader.read()? {
                return Ok(false);
            }
            if reader.token() != TokenKind::EndObject {
                return Err(Error::metadata_invalid(
                    &stack.path(),
                    "$ref must be the only property of an object",
                ));
            }
            return Ok(true);
        }

        if !reader.read()? {
            return Ok(false);
        }
        if reader.token() == TokenKind::EndObject {
            stack.current_mut().property_state = PropertyState::NameRead;
            return Ok(true);
        }
        let kind = match reader.raw_value() {
            b"$id" if rules.references => MetadataFlags::ID,
            b"$ref" if rules.references => MetadataFlags::REF,
            b"$type" if rules.type_discriminator => MetadataFlags::TYPE,
            _ => {
                stack.current_mut().property_state = PropertyState::NameRead;
                return Ok(true);
            }
        };

        let seen = stack.current().metadata;
        let name = property_of(kind);
        if seen.contains(kind) {
            return Err(Error::metadata_invalid(
                &stack.path(),
                &format!("duplicate {name} property"),
            ));
        }
        if kind == MetadataFlags::REF && !seen.is_empty() {
            return Err(Error::metadata_invalid(
                &stack.path(),
                "$ref cannot be combined with other metadata",
            ));
        }
        let frame = stack.current_mut();
        frame.metadata |= kind;
        frame.metadata_property = Some(kind);
        frame.property_name = Some(name.to_string());
    }
}

fn metadata_value(reader: &Reader<'_>, kind: MetadataFlags, stack: &ReadStack) -> Result<String> {
    match reader.token() {
        TokenKind::String => Ok(reader.string()?.into_owned()),
        TokenKind::Number if kind == MetadataFlags::TYPE => {
            Ok(reader.number_text().unwrap_or_default().to_string())
        }
        other => Err(Error::metadata_invalid(
            &stack.path(),
            &format!(
                "{} value must be a string, found {}",
                property_of(kind),
                other.describe()
            ),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::ReaderState;

    const ALL: MetadataRules = MetadataRules {
        references: true,
        type_discriminator: true,
    };

    fn start(reader: &mut Reader<'_>) -> ReadStack {
        assert!(reader.read().unwrap());
        assert_eq!(reader.token(), TokenKind::StartObject);
        let mut stack = ReadStack::new(true);
        stack.push();
        stack
    }

    #[test]
    fn test_id_then_property() {
        let mut reader = Reader::from_slice(br#"{"$id":"1","$type":7,"a":1}"#);
        let mut stack = start(&mut reader);
        assert!(read_metadata(&mut reader, ALL, &mut stack).unwrap());
        let frame = stack.current();
        assert_eq!(frame.metadata_id.as_deref(), Some("1"));
        assert_eq!(frame.type_discriminator.as_deref(), Some("7"));
        assert_eq!(frame.property_state, PropertyState::NameRead);
        assert_eq!(reader.token(), TokenKind::PropertyName);
        assert_eq!(reader.string().unwrap(), "a");
    }

    #[test]
    fn test_ref_consumes_end_of_object() {
        let mut reader = Reader::from_slice(br#"{"$ref":"4"}"#);
        let mut stack = start(&mut reader);
        assert!(read_metadata(&mut reader, ALL, &mut stack).unwrap());
        assert_eq!(stack.current().reference_id.as_deref(), Some("4"));
        assert_eq!(reader.token(), TokenKind::EndObject);
    }

    #[test]
    fn test_resumes_across_buffers() {
        let doc = br#"{"$id":"12","b":true}"#;
        let mut reader = Reader::new(&doc[..8], false, ReaderState::default());
        let mut stack = start(&mut reader);
        assert!(!read_metadata(&mut reader, ALL, &mut stack).unwrap());
        assert_eq!(stack.current().metadata_property, Some(MetadataFlags::ID));

        let consumed = reader.bytes_consumed();
        let mut reader = Reader::new(&doc[consumed..], true, reader.into_state());
        assert!(read_metadata(&mut reader, ALL, &mut stack).unwrap());
        assert_eq!(stack.current().metadata_id.as_deref(), Some("12"));
        assert_eq!(reader.string().unwrap(), "b");
    }

    #[test]
    fn test_invalid_combinations() {
        for doc in [
            &br#"{"$ref":"1","a":2}"#[..],
            br#"{"$id":"1","$ref":"2"}"#,
            br#"{"$id":"1","$id":"2"}"#,
            br#"{"$id":1}"#,
        ] {
            let mut reader = Reader::from_slice(doc);
            let mut stack = start(&mut reader);
            let err = read_metadata(&mut reader, ALL, &mut stack).unwrap_err();
            assert!(
                matches!(err, Error::MetadataCombinationInvalid { .. }),
                "{}",
                String::from_utf8_lossy(doc)
            );
        }
    }

    #[test]
    fn test_unrecognized_metadata_is_left_for_the_caller() {
        let rules = MetadataRules {
            references: false,
            type_discriminator: true,
        };
        let mut reader = Reader::from_slice(br#"{"$id":"1"}"#);
        let mut stack = start(&mut reader);
        assert!(read_metadata(&mut reader, rules, &mut stack).unwrap());
        assert!(stack.current().metadata.is_empty());
        assert_eq!(reader.token(), TokenKind::PropertyName);
        assert!(is_metadata_shaped(reader.raw_value()));
        assert!(!is_metadata_shaped(br"$id"));
    }
}
