//! # serde_mapstream
//!
//! Resumable map and dictionary converters for a streaming JSON serializer.
//!
//! A map converter reads a JSON object into a keyed collection, and writes a
//! keyed collection back out as a JSON object. Reads can run over a document
//! that arrives in arbitrary pieces: when the buffered bytes end in the middle
//! of a property, the converter records exactly how far it got and continues
//! from there when more input arrives. Writes can likewise pause whenever the
//! output buffer fills up.
//!
//! ## Key Features
//!
//! - **Resumable**: reads suspend at any token boundary and produce the same
//!   map no matter how the input was split
//! - **Typed keys**: property names are converted to `String`, integers,
//!   booleans, or any `FromStr` type
//! - **Reference preservation**: `$id`/`$ref` metadata for maps with shared
//!   identity, including maps that contain themselves
//! - **Polymorphism**: a `$type` property hands the object to a derived converter
//! - **Pluggable containers**: `HashMap`, `IndexMap`, `BTreeMap`, or any type
//!   implementing [`map::MapShape`]
//!
//! ## Quick Start
//!
//! ```rust
//! use serde_mapstream::map::BTreeMapShape;
//! use serde_mapstream::{from_str, to_string, Codec};
//! use std::collections::BTreeMap;
//!
//! let mut codec = Codec::default();
//! codec.register_map(BTreeMapShape::<u32, String>::new());
//!
//! let map: BTreeMap<u32, String> = from_str(r#"{"2":"b","1":"a"}"#, &codec).unwrap();
//! assert_eq!(map[&1], "a");
//! assert_eq!(to_string(&map, &codec).unwrap(), r#"{"1":"a","2":"b"}"#);
//! ```
//!
//! ### Untyped maps with the value! macro
//!
//! ```rust
//! use serde_mapstream::{to_string, value, Codec, Value};
//!
//! let data = value!({
//!     "name": "Alice",
//!     "tags": ["rust", "json"]
//! });
//!
//! if let Value::Object(map) = &data {
//!     assert_eq!(map.get("name").and_then(Value::as_str), Some("Alice"));
//! }
//! ```
//!
//! ### Reading in pieces
//!
//! ```rust
//! use serde_mapstream::{from_reader, Codec, SerializerOptions, ValueMap};
//!
//! let codec = Codec::new(SerializerOptions::new().with_default_buffer_size(4));
//! let map: ValueMap = from_reader(&br#"{"first":1,"second":[true,false]}"#[..], &codec).unwrap();
//! assert_eq!(map.len(), 2);
//! ```
//!
//! ## Layers
//!
//! - [`reader`] and [`writer`]: the token-level cursor and emitter
//! - [`state`]: per-level progress frames for suspended reads and writes
//! - [`converter`]: the [`Converter`] contract and the frame-managing entry points
//! - [`map`]: the map converter and the shapes of the supported containers
//! - [`stream`]: incremental reading of a whole document

pub mod converter;
pub mod converters;
pub mod error;
pub mod macros;
pub mod map;
mod metadata;
pub mod options;
pub mod polymorphism;
pub mod reader;
pub mod references;
pub mod registry;
pub mod state;
pub mod stream;
pub mod value;
mod value_map;
pub mod writer;

pub use converter::{Converter, Progress};
pub use error::{Error, Result};
pub use options::{NumberHandling, ReferenceHandling, SerializerOptions};
pub use registry::Codec;
pub use value::{Number, Value};
pub use value_map::ValueMap;

use converter::{read_value, write_value};
use reader::Reader;
use state::{ReadStack, WriteStack};
use std::io;
use stream::StreamReader;
use writer::Writer;

/// Reads a `T` from a complete JSON document.
///
/// # Examples
///
/// ```rust
/// use serde_mapstream::{from_str, Codec, Value, ValueMap};
///
/// let map: ValueMap = from_str(r#"{"a":1,"b":2}"#, &Codec::default()).unwrap();
/// let keys: Vec<_> = map.keys().cloned().collect();
/// assert_eq!(keys, ["a", "b"]);
/// assert_eq!(map.get("b"), Some(&Value::from(2)));
/// ```
///
/// # Errors
///
/// Returns an error if the document is malformed, does not fit `T`, or has
/// anything but whitespace after the top-level value.
pub fn from_str<T: 'static>(s: &str, codec: &Codec) -> Result<T> {
    from_slice(s.as_bytes(), codec)
}

/// Reads a `T` from a complete JSON document held as bytes.
///
/// # Errors
///
/// See [`from_str`].
pub fn from_slice<T: 'static>(v: &[u8], codec: &Codec) -> Result<T> {
    let converter = codec.converter::<T>()?;
    let mut reader = Reader::from_slice(v);
    if !reader.read()? {
        return Err(Error::unexpected_eof(reader.offset(), "a value"));
    }
    let mut stack = ReadStack::new(false);
    let value = match read_value(&*converter, &mut reader, codec, &mut stack)? {
        Progress::Ready(value) => value,
        Progress::Incomplete => {
            return Err(Error::unexpected_eof(reader.offset(), &converter.type_name()))
        }
    };
    if reader.read()? {
        return Err(Error::syntax(reader.offset(), "trailing characters after the top-level value"));
    }
    Ok(value)
}

/// Reads a `T` from an I/O stream, `default_buffer_size` bytes at a time.
///
/// # Errors
///
/// Returns an error if reading from `rdr` fails, or for any reason
/// [`from_str`] would.
pub fn from_reader<R, T>(mut rdr: R, codec: &Codec) -> Result<T>
where
    R: io::Read,
    T: 'static,
{
    let mut stream = StreamReader::<T>::new(codec)?;
    let mut chunk = vec![0; codec.options.default_buffer_size.max(1)];
    loop {
        let n = match rdr.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        stream.feed(&chunk[..n])?;
    }
    stream.finish()
}

/// Writes `value` as a JSON string.
///
/// # Examples
///
/// ```rust
/// use serde_mapstream::{to_string, value, Codec, ValueMap};
///
/// let map: ValueMap = [("x".to_string(), value!(1))].into_iter().collect();
/// assert_eq!(to_string(&map, &Codec::default()).unwrap(), r#"{"x":1}"#);
/// ```
///
/// # Errors
///
/// Returns an error if no converter is registered for `T` or a value cannot
/// be represented in JSON.
pub fn to_string<T: 'static>(value: &T, codec: &Codec) -> Result<String> {
    let converter = codec.converter::<T>()?;
    let mut writer = Writer::new(&codec.options);
    let mut stack = WriteStack::new(false, usize::MAX);
    write_value(&*converter, &mut writer, value, codec, &mut stack)?;
    Ok(writer.into_inner())
}

/// Writes `value` to an I/O stream, flushing whenever roughly
/// `default_buffer_size` bytes are buffered.
///
/// # Errors
///
/// Returns an error if writing to `wtr` fails, or for any reason
/// [`to_string`] would.
pub fn to_writer<W, T>(mut wtr: W, value: &T, codec: &Codec) -> Result<()>
where
    W: io::Write,
    T: 'static,
{
    let converter = codec.converter::<T>()?;
    let mut writer = Writer::new(&codec.options);
    let mut stack = WriteStack::new(true, codec.options.default_buffer_size.max(1));
    loop {
        let done = write_value(&*converter, &mut writer, value, codec, &mut stack)?;
        wtr.write_all(writer.take_output().as_bytes())?;
        if done {
            break;
        }
        tracing::trace!("write suspended, output flushed");
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::IndexMapShape;
    use indexmap::IndexMap;

    fn codec() -> Codec {
        let mut codec = Codec::new(SerializerOptions::new().with_default_buffer_size(8));
        codec.register_map(IndexMapShape::<String, Option<String>>::new());
        codec
    }

    #[test]
    fn test_from_str_rejects_trailing_data() {
        let err = from_str::<ValueMap>("{} {}", &Codec::default()).unwrap_err();
        assert!(matches!(err, Error::Syntax { .. }));
    }

    #[test]
    fn test_from_str_empty_input() {
        assert!(from_str::<ValueMap>("  ", &Codec::default()).is_err());
    }

    #[test]
    fn test_writer_round_trip_in_small_chunks() {
        let codec = codec();
        let mut map = IndexMap::new();
        for i in 0..20 {
            let value = (i % 3 != 0).then(|| format!("value-{i}"));
            map.insert(format!("key-{i}"), value);
        }
        let mut out = Vec::new();
        to_writer(&mut out, &map, &codec).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, to_string(&map, &codec).unwrap());

        let back: IndexMap<String, Option<String>> = from_reader(text.as_bytes(), &codec).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn test_unregistered_type() {
        let err = from_str::<IndexMap<u8, u8>>("{}", &Codec::default()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedType(_)));
    }

    #[test]
    fn test_root_value_from_small_chunks() {
        let codec = Codec::new(SerializerOptions::new().with_default_buffer_size(4));
        let doc = br#"{"a":[1,2],"b":3}"#;
        let value: Value = from_reader(&doc[..], &codec).unwrap();
        assert_eq!(value.to_string(), r#"{"a":[1,2],"b":3}"#);

        let number: Value = from_reader(&b" 12345 "[..], &codec).unwrap();
        assert_eq!(number, Value::from(12345));
    }
}
