use super::{MapShape, MapTypeInfo};
use crate::converter::{mismatch, read_value, Converter, Progress};
use crate::metadata::{is_metadata_shaped, read_metadata, MetadataRules};
use crate::reader::{Reader, TokenKind};
use crate::state::{ObjectState, PolymorphicState, PropertyState, ReadFrame, ReadStack, WriteStack};
use crate::writer::Writer;
use crate::{Codec, Error, NumberHandling, Result};
use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::{debug, trace};

/// Reads and writes a map type described by a [`MapShape`].
///
/// Reads take one of two paths. When the stack does not support continuation
/// and the map cannot carry metadata, the whole object is read in a single
/// loop with no frame bookkeeping. Otherwise every step is recorded in the
/// current frame, so the read can suspend at any token and resume later.
/// Both paths produce the same map for the same document.
pub struct MapConverter<S: MapShape> {
    shape: S,
    info: MapTypeInfo<S>,
    keys: OnceLock<Arc<dyn Converter<S::Key>>>,
    values: OnceLock<Arc<dyn Converter<S::Value>>>,
}

type Delegate<T> = Arc<dyn Converter<T>>;

impl<S: MapShape> MapConverter<S> {
    #[must_use]
    pub fn new(shape: S) -> Self {
        let info = MapTypeInfo::new(shape.type_name());
        Self::with_info(shape, info)
    }

    #[must_use]
    pub fn with_info(shape: S, info: MapTypeInfo<S>) -> Self {
        MapConverter {
            shape,
            info,
            keys: OnceLock::new(),
            values: OnceLock::new(),
        }
    }

    #[must_use]
    pub fn shape(&self) -> &S {
        &self.shape
    }

    #[must_use]
    pub fn info(&self) -> &MapTypeInfo<S> {
        &self.info
    }

    fn keys(&self, codec: &Codec) -> Result<Arc<dyn Converter<S::Key>>> {
        if let Some(keys) = self.keys.get() {
            return Ok(Arc::clone(keys));
        }
        let keys = match self.info.key_converter() {
            Some(keys) => Arc::clone(keys),
            None => codec.converter::<S::Key>()?,
        };
        let _ = self.keys.set(Arc::clone(&keys));
        Ok(keys)
    }

    fn values(&self, codec: &Codec) -> Result<Arc<dyn Converter<S::Value>>> {
        if let Some(values) = self.values.get() {
            return Ok(Arc::clone(values));
        }
        let values = match self.info.value_converter() {
            Some(values) => Arc::clone(values),
            None => codec.converter::<S::Value>()?,
        };
        let _ = self.values.set(Arc::clone(&values));
        Ok(values)
    }

    fn metadata_rules(&self, codec: &Codec) -> MetadataRules {
        MetadataRules {
            references: codec.options.preserves_references(),
            type_discriminator: self.info.dispatcher().is_some(),
        }
    }

    /// Whether objects of this type may start with `$` properties.
    #[must_use]
    pub fn can_contain_metadata(&self, codec: &Codec) -> bool {
        self.metadata_rules(codec).any()
    }

    fn create(&self, stack: &ReadStack) -> Result<S::Staging> {
        let mut staging = self
            .info
            .create(&self.shape)
            .ok_or_else(|| Error::unsupported_construction(&stack.path(), &self.info.type_name))?;
        if let Some(hooks) = self.info.hooks() {
            hooks.on_deserializing(&mut staging);
        }
        Ok(staging)
    }

    fn string_keys(keys: &dyn Converter<S::Key>) -> bool {
        keys.is_builtin() && TypeId::of::<S::Key>() == TypeId::of::<String>()
    }

    /// Converts the current property name into the pending key. String keys
    /// are skipped: the name itself is moved into the key by `take_key`.
    fn decode_key(&self, keys: &dyn Converter<S::Key>, codec: &Codec, stack: &mut ReadStack) -> Result<()> {
        if Self::string_keys(keys) {
            return Ok(());
        }
        let name = stack.current().property_name.as_deref().unwrap_or_default();
        let key = keys.read_as_property_name(Cow::Borrowed(name), codec, &stack.path())?;
        stack.current_mut().pending_key = Some(Box::new(key));
        Ok(())
    }

    fn take_key(frame: &mut ReadFrame) -> Result<S::Key> {
        let key: Option<Box<dyn Any>> = match frame.pending_key.take() {
            Some(key) => Some(key),
            None => frame.property_name.take().map(|name| Box::new(name) as Box<dyn Any>),
        };
        key.and_then(|key| key.downcast::<S::Key>().ok())
            .map(|key| *key)
            .ok_or_else(|| Error::custom("map value read without its key"))
    }

    fn finish(&self, staging: S::Staging, stack: &mut ReadStack) -> Result<S::Output> {
        let mut map = self.shape.convert_collection(staging);
        if let Some(hooks) = self.info.hooks() {
            hooks.on_deserialized(&mut map);
        }
        if let Some(id) = stack.current_mut().metadata_id.take() {
            let path = stack.path();
            stack.references.register(&id, map.clone(), &path)?;
        }
        trace!(type_name = %self.info.type_name, depth = stack.depth(), "map read complete");
        Ok(map)
    }

    fn read_fast(
        &self,
        reader: &mut Reader<'_>,
        codec: &Codec,
        stack: &mut ReadStack,
    ) -> Result<Progress<S::Output>> {
        debug_assert!(!stack.supports_continuation, "fast path cannot suspend");
        if reader.token() != TokenKind::StartObject {
            return Err(mismatch(&self.info.type_name, reader, stack));
        }
        let mut staging = self.create(stack)?;
        let keys = self.keys(codec)?;
        let values = self.values(codec)?;
        let direct = values.supports_direct_read() && codec.options.number_handling == NumberHandling::Strict;

        loop {
            if !reader.read()? {
                return Err(Error::unexpected_eof(reader.offset(), "a property name or '}'"));
            }
            if reader.token() == TokenKind::EndObject {
                break;
            }
            stack.current_mut().property_name = Some(reader.string()?.into_owned());
            self.decode_key(&*keys, codec, stack)?;

            if !reader.read_with_read_ahead(values.requires_read_ahead())? {
                return Err(Error::unexpected_eof(reader.offset(), &values.type_name()));
            }
            let value = if direct {
                values.read_direct(reader, codec, stack)?
            } else {
                match read_value(&*values, reader, codec, stack)? {
                    Progress::Ready(value) => value,
                    Progress::Incomplete => {
                        return Err(Error::unexpected_eof(reader.offset(), &values.type_name()))
                    }
                }
            };
            let key = Self::take_key(stack.current_mut())?;
            self.shape.add(&mut staging, key, value);
        }
        self.finish(staging, stack).map(Progress::Ready)
    }

    fn run_delegate(
        &self,
        delegate: Delegate<S::Output>,
        reader: &mut Reader<'_>,
        codec: &Codec,
        stack: &mut ReadStack,
    ) -> Result<Progress<S::Output>> {
        stack.current_mut().polymorphic = PolymorphicState::ReEntryStarted;
        let progress = delegate.on_try_read(reader, codec, stack)?;
        if !progress.is_ready() {
            trace!(delegate = %delegate.type_name(), "polymorphic read suspended");
            let frame = stack.current_mut();
            frame.polymorphic = PolymorphicState::ReEntrySuspended;
            frame.delegate = Some(Box::new(delegate));
        }
        Ok(progress)
    }

    fn read_resumable(
        &self,
        reader: &mut Reader<'_>,
        codec: &Codec,
        stack: &mut ReadStack,
    ) -> Result<Progress<S::Output>> {
        if stack.current().polymorphic == PolymorphicState::ReEntrySuspended {
            let delegate = stack
                .current_mut()
                .delegate
                .take()
                .and_then(|delegate| delegate.downcast::<Delegate<S::Output>>().ok())
                .ok_or_else(|| Error::custom("suspended polymorphic read lost its converter"))?;
            return self.run_delegate(*delegate, reader, codec, stack);
        }

        let rules = self.metadata_rules(codec);

        if stack.current().object_state == ObjectState::None {
            if reader.token() != TokenKind::StartObject {
                return Err(mismatch(&self.info.type_name, reader, stack));
            }
            stack.current_mut().object_state = ObjectState::StartTokenSeen;
            trace!(type_name = %self.info.type_name, depth = stack.depth(), "map read started");
        }

        if stack.current().object_state == ObjectState::StartTokenSeen {
            if rules.any() {
                if !read_metadata(reader, rules, stack)? {
                    trace!(path = %stack.path(), "suspended in metadata");
                    return Ok(Progress::Incomplete);
                }
                if let Some(id) = stack.current().reference_id.clone() {
                    let value = stack.references.resolve::<S::Output>(&id, &stack.path())?;
                    trace!(id = %id, "resolved reference");
                    return Ok(Progress::Ready(value));
                }
            }
            stack.current_mut().object_state = ObjectState::MetadataRead;
        }

        if stack.current().object_state == ObjectState::MetadataRead {
            let frame = stack.current();
            if let (Some(dispatcher), Some(discriminator), PolymorphicState::None) = (
                self.info.dispatcher(),
                frame.type_discriminator.as_deref(),
                frame.polymorphic,
            ) {
                match dispatcher.resolve(discriminator) {
                    Some(delegate) => {
                        debug!(
                            discriminator,
                            delegate = %delegate.type_name(),
                            "dispatching polymorphic read"
                        );
                        return self.run_delegate(delegate, reader, codec, stack);
                    }
                    None if dispatcher.ignores_unrecognized() => {
                        debug!(discriminator, "unrecognized discriminator, reading base type");
                    }
                    None => {
                        return Err(Error::metadata_invalid(
                            &stack.path(),
                            &format!("unrecognized $type '{discriminator}'"),
                        ))
                    }
                }
            }

            let staging = self.create(stack)?;
            if let Some(handle) = self.shape.early_handle(&staging) {
                if let Some(id) = stack.current_mut().metadata_id.take() {
                    let path = stack.path();
                    stack.references.register(&id, handle, &path)?;
                }
            }
            let frame = stack.current_mut();
            frame.return_value = Some(Box::new(staging));
            frame.object_state = ObjectState::ObjectCreated;
        }

        let mut staging = stack
            .current_mut()
            .return_value
            .take()
            .and_then(|staging| staging.downcast::<S::Staging>().ok())
            .ok_or_else(|| Error::custom("map read resumed without its container"))?;

        if !self.read_elements(&mut staging, reader, codec, stack, rules)? {
            trace!(path = %stack.path(), state = ?stack.current().property_state, "map read suspended");
            stack.current_mut().return_value = Some(staging);
            return Ok(Progress::Incomplete);
        }
        self.finish(*staging, stack).map(Progress::Ready)
    }

    /// Reads pairs until the end of the object. Returns `Ok(false)` if more
    /// input is needed.
    fn read_elements(
        &self,
        staging: &mut S::Staging,
        reader: &mut Reader<'_>,
        codec: &Codec,
        stack: &mut ReadStack,
        rules: MetadataRules,
    ) -> Result<bool> {
        let keys = self.keys(codec)?;
        let values = self.values(codec)?;

        loop {
            if stack.current().property_state == PropertyState::None {
                if !reader.read()? {
                    return Ok(false);
                }
                stack.current_mut().property_state = PropertyState::NameRead;
            }

            // The name token is only current in the invocation that read it.
            if stack.current().property_state == PropertyState::NameRead {
                if reader.token() == TokenKind::EndObject {
                    return Ok(true);
                }
                stack.current_mut().property_name = Some(reader.string()?.into_owned());
                if rules.any() && is_metadata_shaped(reader.raw_value()) {
                    let name = stack.current().property_name.as_deref().unwrap_or_default();
                    if !codec.options.allow_out_of_order_metadata {
                        return Err(Error::unexpected_metadata(&stack.path(), name));
                    }
                    trace!(name, "skipping out-of-order metadata");
                    stack.current_mut().skip_pending = true;
                } else {
                    self.decode_key(&*keys, codec, stack)?;
                }
                stack.current_mut().property_state = PropertyState::NameResolved;
            }

            if stack.current().property_state == PropertyState::NameResolved {
                if stack.current().skip_pending {
                    if !reader.try_skip()? {
                        return Ok(false);
                    }
                    stack.current_mut().end_property();
                    continue;
                }
                if !reader.read_with_read_ahead(values.requires_read_ahead())? {
                    return Ok(false);
                }
                stack.current_mut().property_state = PropertyState::ValueAdvanced;
            }

            let value = match read_value(&*values, reader, codec, stack)? {
                Progress::Ready(value) => value,
                Progress::Incomplete => return Ok(false),
            };
            let frame = stack.current_mut();
            frame.property_state = PropertyState::ValueRead;
            let key = Self::take_key(frame)?;
            self.shape.add(staging, key, value);
            frame.end_property();
        }
    }

    /// Writes `map` as an object, or `null` when absent.
    ///
    /// Returns `Ok(false)` if the write suspended; call again with the same
    /// stack to continue.
    pub fn write_map(
        &self,
        writer: &mut Writer,
        map: Option<&S::Output>,
        codec: &Codec,
        stack: &mut WriteStack,
    ) -> Result<bool> {
        let Some(map) = map else {
            writer.write_null();
            return Ok(true);
        };

        if !stack.current().wrote_start {
            if self.can_contain_metadata(codec) {
                stack.current_mut().escape_metadata_names = true;
            }
            let mut id = None;
            if codec.options.preserves_references() {
                if let Some(identity) = self.shape.identity(map) {
                    let (assigned, seen) = stack.references.get_or_assign(identity);
                    if seen {
                        writer.write_start_object();
                        writer.write_property_name("$ref");
                        writer.write_string(&assigned);
                        writer.write_end_object();
                        let frame = stack.current_mut();
                        frame.wrote_start = true;
                        frame.wrote_end = true;
                        return Ok(true);
                    }
                    id = Some(assigned);
                }
            }
            if let Some(hooks) = self.info.hooks() {
                hooks.on_serializing(map);
            }
            writer.write_start_object();
            if let Some(id) = id {
                writer.write_property_name("$id");
                writer.write_string(&id);
            }
            if let Some(discriminator) = self.info.discriminator() {
                writer.write_property_name("$type");
                writer.write_string(discriminator);
            }
            stack.current_mut().wrote_start = true;
        }

        let keys = self.keys(codec)?;
        let values = self.values(codec)?;
        if !self.shape.write_elements(writer, map, &*keys, &*values, codec, stack)? {
            trace!(index = stack.current().index, "map write suspended");
            return Ok(false);
        }

        if !stack.current().wrote_end {
            writer.write_end_object();
            stack.current_mut().wrote_end = true;
        }
        if let Some(hooks) = self.info.hooks() {
            hooks.on_serialized(map);
        }
        Ok(true)
    }
}

impl<S: MapShape> Converter<S::Output> for MapConverter<S> {
    fn type_name(&self) -> Cow<'static, str> {
        self.info.type_name.clone()
    }

    fn on_try_read(
        &self,
        reader: &mut Reader<'_>,
        codec: &Codec,
        stack: &mut ReadStack,
    ) -> Result<Progress<S::Output>> {
        let fast = !stack.supports_continuation
            && !self.can_contain_metadata(codec)
            && stack.current().object_state == ObjectState::None;
        if fast {
            self.read_fast(reader, codec, stack)
        } else {
            self.read_resumable(reader, codec, stack)
        }
    }

    fn on_try_write(
        &self,
        writer: &mut Writer,
        value: &S::Output,
        codec: &Codec,
        stack: &mut WriteStack,
    ) -> Result<bool> {
        if self.info.dispatcher().is_some() {
            stack.current_mut().escape_metadata_names = true;
        }
        let delegate = match stack.current_mut().delegate.take() {
            Some(delegate) => delegate
                .downcast::<Delegate<S::Output>>()
                .map(|delegate| *delegate)
                .map_err(|_| Error::custom("suspended polymorphic write lost its converter"))
                .map(Some)?,
            None if !stack.current().wrote_start => self
                .info
                .dispatcher()
                .and_then(|dispatcher| dispatcher.select_for_write(value)),
            None => None,
        };

        match delegate {
            Some(delegate) => {
                let done = delegate.on_try_write(writer, value, codec, stack)?;
                if !done {
                    stack.current_mut().delegate = Some(Box::new(delegate));
                }
                Ok(done)
            }
            None => self.write_map(writer, Some(value), codec, stack),
        }
    }
}

impl<S: MapShape + fmt::Debug> fmt::Debug for MapConverter<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapConverter")
            .field("shape", &self.shape)
            .field("info", &self.info)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::IndexMapShape;
    use crate::reader::ReaderState;
    use indexmap::IndexMap;

    fn codec() -> Codec {
        let mut codec = Codec::default();
        codec.register_map(IndexMapShape::<String, i64>::new());
        codec
    }

    fn read_split(json: &str, at: usize, codec: &Codec) -> Result<IndexMap<String, i64>> {
        let converter = codec.converter::<IndexMap<String, i64>>()?;
        let bytes = json.as_bytes();
        let mut stack = ReadStack::new(true);

        let mut reader = Reader::new(&bytes[..at], false, ReaderState::default());
        let mut started = reader.read()?;
        let mut result = Progress::Incomplete;
        if started {
            result = read_value(&*converter, &mut reader, codec, &mut stack)?;
        }
        let consumed = reader.bytes_consumed();
        let state = reader.into_state();

        if let Progress::Ready(map) = result {
            return Ok(map);
        }
        let mut reader = Reader::new(&bytes[consumed..], true, state);
        if !started {
            started = reader.read()?;
            assert!(started);
        }
        match read_value(&*converter, &mut reader, codec, &mut stack)? {
            Progress::Ready(map) => Ok(map),
            Progress::Incomplete => panic!("final buffer left the map incomplete"),
        }
    }

    #[test]
    fn test_every_split_point_gives_the_same_map() {
        let codec = codec();
        let json = r#"{"a":1, "b" : 2,"c":-30}"#;
        for at in 0..=json.len() {
            let map = read_split(json, at, &codec).unwrap();
            let pairs: Vec<_> = map.iter().map(|(k, v)| (k.as_str(), *v)).collect();
            assert_eq!(pairs, [("a", 1), ("b", 2), ("c", -30)], "split at {at}");
        }
    }

    #[test]
    fn test_suspension_keeps_partial_container() {
        let codec = codec();
        let converter = codec.converter::<IndexMap<String, i64>>().unwrap();
        let mut reader = Reader::new(br#"{"a":1,"b"#, false, ReaderState::default());
        reader.read().unwrap();
        let mut stack = ReadStack::new(true);
        stack.push();
        let progress = converter.on_try_read(&mut reader, &codec, &mut stack).unwrap();
        assert_eq!(progress, Progress::Incomplete);
        let frame = stack.current();
        assert_eq!(frame.object_state, ObjectState::ObjectCreated);
        assert_eq!(frame.property_state, PropertyState::None);
        let staging = frame
            .return_value
            .as_ref()
            .and_then(|s| s.downcast_ref::<IndexMap<String, i64>>())
            .unwrap();
        assert_eq!(staging.len(), 1);
    }

    #[test]
    fn test_string_key_is_the_decoded_name() {
        let codec = codec();
        let converter = codec.converter::<IndexMap<String, i64>>().unwrap();
        let mut reader = Reader::new(br#"{"a\u0062":"#, false, ReaderState::default());
        reader.read().unwrap();
        let mut stack = ReadStack::new(true);
        stack.push();
        let progress = converter.on_try_read(&mut reader, &codec, &mut stack).unwrap();
        assert_eq!(progress, Progress::Incomplete);
        let frame = stack.current();
        assert_eq!(frame.property_state, PropertyState::NameResolved);
        assert_eq!(frame.property_name.as_deref(), Some("ab"));
        assert!(frame.pending_key.is_none());

        let json = r#"{"a\u0062":1,"c\"":2}"#;
        for at in 0..=json.len() {
            let map = read_split(json, at, &codec).unwrap();
            assert_eq!(map.keys().collect::<Vec<_>>(), ["ab", "c\""], "split at {at}");
        }
    }

    #[test]
    fn test_wrong_start_token() {
        let codec = codec();
        let err = read_split("[1]", 3, &codec).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
    }

    #[test]
    fn test_bad_key() {
        let mut codec = Codec::default();
        codec.register_map(IndexMapShape::<i64, i64>::new());
        let err = crate::from_str::<IndexMap<i64, i64>>(r#"{"1":1,"x":2}"#, &codec).unwrap_err();
        assert!(matches!(err, Error::KeyConversion { ref name, .. } if name == "x"));
        assert_eq!(err.path(), Some("$.x"));
    }
}
