//! Reading a document that arrives in pieces.
//!
//! [`StreamReader`] keeps the unconsumed tail of the input, the tokenizer
//! state and the read stack between calls. Each [`feed`](StreamReader::feed)
//! runs the root converter as far as the buffered bytes allow; the converter
//! suspends at the first token that is not complete yet and resumes from the
//! same place on the next call.
//!
//! ```rust
//! use serde_mapstream::stream::StreamReader;
//! use serde_mapstream::{Codec, Value, ValueMap};
//!
//! let codec = Codec::default();
//! let mut stream = StreamReader::<ValueMap>::new(&codec).unwrap();
//! stream.feed(br#"{"a":1,"b"#).unwrap();
//! assert!(!stream.is_complete());
//! stream.feed(br#"":2}"#).unwrap();
//!
//! let map = stream.finish().unwrap();
//! assert_eq!(map.get("b"), Some(&Value::from(2)));
//! ```

use crate::converter::{read_value, Converter, Progress};
use crate::reader::{Reader, ReaderState};
use crate::state::ReadStack;
use crate::{Codec, Error, Result};
use std::sync::Arc;
use tracing::{debug, trace};

/// Incremental reader for one top-level value of type `T`.
pub struct StreamReader<'c, T: 'static> {
    codec: &'c Codec,
    converter: Arc<dyn Converter<T>>,
    pending: Vec<u8>,
    state: ReaderState,
    stack: ReadStack,
    started: bool,
    value: Option<T>,
}

impl<'c, T: 'static> StreamReader<'c, T> {
    /// Fails if no converter is registered for `T`.
    pub fn new(codec: &'c Codec) -> Result<Self> {
        Ok(StreamReader {
            codec,
            converter: codec.converter::<T>()?,
            pending: Vec::with_capacity(codec.options.default_buffer_size),
            state: ReaderState::default(),
            stack: ReadStack::new(true),
            started: false,
            value: None,
        })
    }

    /// Appends `chunk` and reads as far as possible.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<()> {
        self.pending.extend_from_slice(chunk);
        debug!(
            chunk = chunk.len(),
            buffered = self.pending.len(),
            offset = self.state.offset(),
            "buffer refilled"
        );
        self.step(false)
    }

    /// Returns `true` once the top-level value has been read.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.value.is_some()
    }

    /// Number of bytes held back because they do not form a complete token yet.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.pending.len()
    }

    /// Marks the end of input and returns the value.
    pub fn finish(mut self) -> Result<T> {
        self.step(true)?;
        self.value
            .take()
            .ok_or_else(|| Error::unexpected_eof(self.state.offset(), "the rest of the document"))
    }

    fn step(&mut self, is_final: bool) -> Result<()> {
        let mut reader = Reader::new(&self.pending, is_final, std::mem::take(&mut self.state));
        let outcome = advance(
            &*self.converter,
            &mut reader,
            self.codec,
            &mut self.stack,
            &mut self.started,
            &mut self.value,
        );
        let consumed = reader.bytes_consumed();
        self.state = reader.into_state();
        outcome?;
        self.pending.drain(..consumed);
        trace!(consumed, remaining = self.pending.len(), "buffer drained");
        Ok(())
    }
}

fn advance<T: 'static>(
    converter: &dyn Converter<T>,
    reader: &mut Reader<'_>,
    codec: &Codec,
    stack: &mut ReadStack,
    started: &mut bool,
    value: &mut Option<T>,
) -> Result<()> {
    if value.is_some() {
        // Only whitespace may follow the top-level value.
        reader.read()?;
        return Ok(());
    }
    if !*started {
        if !reader.read_with_read_ahead(converter.requires_read_ahead())? {
            return Ok(());
        }
        *started = true;
    }
    match read_value(converter, reader, codec, stack)? {
        Progress::Ready(read) => {
            *value = Some(read);
            reader.read()?;
        }
        Progress::Incomplete => {
            trace!(depth = stack.depth(), "read suspended, waiting for input");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ValueMap;

    #[test]
    fn test_byte_at_a_time() {
        let codec = Codec::default();
        let doc = r#"{"list":[1,2],"inner":{"x":"é"},"n":null}"#.as_bytes();
        let mut stream = StreamReader::<ValueMap>::new(&codec).unwrap();
        for byte in doc {
            stream.feed(std::slice::from_ref(byte)).unwrap();
        }
        assert!(stream.is_complete());
        let map = stream.finish().unwrap();
        assert_eq!(map.len(), 3);
        assert_eq!(map.get("inner").unwrap().to_string(), r#"{"x":"é"}"#);
    }

    #[test]
    fn test_truncated_document() {
        let codec = Codec::default();
        let mut stream = StreamReader::<ValueMap>::new(&codec).unwrap();
        stream.feed(br#"{"a":1,"b"#).unwrap();
        assert!(stream.buffered() > 0);
        let err = stream.finish().unwrap_err();
        assert!(matches!(err, Error::UnexpectedEof { .. }));
    }

    #[test]
    fn test_trailing_garbage() {
        let codec = Codec::default();
        let mut stream = StreamReader::<ValueMap>::new(&codec).unwrap();
        stream.feed(b"{} ").unwrap();
        assert!(stream.is_complete());
        assert!(matches!(stream.feed(b"x"), Err(Error::Syntax { .. })));
    }
}
