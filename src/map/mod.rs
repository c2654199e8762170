//! Map/dictionary converters.
//!
//! A map type plugs into the codec through a [`MapShape`]: the three
//! per-container extension points (create an empty staging container, add a
//! pair, convert the staging container into the final value) plus the routine
//! that walks the final value's pairs when writing. [`MapConverter`] drives a
//! shape through the resumable read and write protocol.
//!
//! # Read stages
//!
//! ```text
//!   StartTokenSeen ──► MetadataRead ──► ObjectCreated ──► element loop ──► finalize
//!         │                 │  │                              │
//!         │            $ref │  │ $type                        │ per pair:
//!         │                 ▼  ▼                              │ NameRead ► NameResolved
//!         │          resolved  delegate to the                │ ► ValueAdvanced ► ValueRead
//!         │          value     dispatched converter           │
//! ```
//!
//! Every stage is recorded in the current [`ReadFrame`](crate::state::ReadFrame)
//! before the next one starts, so a read that runs out of input returns
//! [`Progress::Incomplete`](crate::Progress::Incomplete) and picks up from the
//! same stage when re-invoked.
//!
//! Shapes shipped with the crate are in [`shapes`]; custom containers implement
//! [`MapShape`] directly.

mod converter;
pub mod shapes;

pub use converter::MapConverter;
pub use shapes::{
    BTreeMapShape, HashMapShape, IndexMapShape, SharedMap, SharedMapShape, ValueMapShape,
};

use crate::converter::{write_value, Converter};
use crate::polymorphism::PolymorphicDispatcher;
use crate::state::WriteStack;
use crate::writer::Writer;
use crate::{Codec, Result};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// The per-container extension points of a map type.
pub trait MapShape: Send + Sync + 'static {
    type Key: 'static;
    type Value: 'static;
    /// Container pairs are added to while reading.
    type Staging: 'static;
    /// The value handed to the caller.
    type Output: Clone + 'static;

    fn type_name(&self) -> Cow<'static, str> {
        Cow::Borrowed(std::any::type_name::<Self::Output>())
    }

    /// An empty staging container, or `None` if the shape cannot make one
    /// without a factory.
    fn create_default(&self) -> Option<Self::Staging>;

    fn add(&self, staging: &mut Self::Staging, key: Self::Key, value: Self::Value);

    /// One-time transformation of the filled staging container.
    fn convert_collection(&self, staging: Self::Staging) -> Self::Output;

    /// A handle to the final value that is usable while the staging container
    /// is still being filled.
    ///
    /// Shapes with shared identity return one so that a `$id` can be
    /// registered before the container's own pairs are read; nested `$ref`s
    /// to the container then resolve to it. Other shapes register at
    /// finalization.
    fn early_handle(&self, _staging: &Self::Staging) -> Option<Self::Output> {
        None
    }

    /// Identity of a value for reference preservation on write.
    fn identity(&self, _map: &Self::Output) -> Option<usize> {
        None
    }

    /// Writes the pairs of `map`, usually through [`write_pairs`].
    fn write_elements(
        &self,
        writer: &mut Writer,
        map: &Self::Output,
        keys: &dyn Converter<Self::Key>,
        values: &dyn Converter<Self::Value>,
        codec: &Codec,
        stack: &mut WriteStack,
    ) -> Result<bool>;
}

/// Lifecycle callbacks around reading and writing a map.
#[allow(unused_variables)]
pub trait MapHooks<S: MapShape>: Send + Sync + 'static {
    /// Runs on the new staging container, before any pair is added.
    fn on_deserializing(&self, staging: &mut S::Staging) {}

    /// Runs on the final value after a complete read.
    fn on_deserialized(&self, map: &mut S::Output) {}

    /// Runs before the start of the object is written.
    fn on_serializing(&self, map: &S::Output) {}

    /// Runs after the end of the object is written.
    fn on_serialized(&self, map: &S::Output) {}
}

/// Per-type description of a map: construction, hooks, element converters and
/// polymorphism.
pub struct MapTypeInfo<S: MapShape> {
    pub type_name: Cow<'static, str>,
    factory: Option<Arc<dyn Fn() -> S::Staging + Send + Sync>>,
    hooks: Option<Arc<dyn MapHooks<S>>>,
    key_converter: Option<Arc<dyn Converter<S::Key>>>,
    value_converter: Option<Arc<dyn Converter<S::Value>>>,
    dispatcher: Option<PolymorphicDispatcher<S::Output>>,
    discriminator: Option<String>,
}

impl<S: MapShape> MapTypeInfo<S> {
    #[must_use]
    pub fn new(type_name: impl Into<Cow<'static, str>>) -> Self {
        MapTypeInfo {
            type_name: type_name.into(),
            factory: None,
            hooks: None,
            key_converter: None,
            value_converter: None,
            dispatcher: None,
            discriminator: None,
        }
    }

    /// Constructs staging containers with `factory` instead of
    /// [`MapShape::create_default`].
    #[must_use]
    pub fn with_factory(mut self, factory: impl Fn() -> S::Staging + Send + Sync + 'static) -> Self {
        self.factory = Some(Arc::new(factory));
        self
    }

    #[must_use]
    pub fn with_hooks(mut self, hooks: impl MapHooks<S>) -> Self {
        self.hooks = Some(Arc::new(hooks));
        self
    }

    /// Uses `converter` for keys instead of the codec's converter for the key type.
    #[must_use]
    pub fn with_key_converter(mut self, converter: Arc<dyn Converter<S::Key>>) -> Self {
        self.key_converter = Some(converter);
        self
    }

    #[must_use]
    pub fn with_value_converter(mut self, converter: Arc<dyn Converter<S::Value>>) -> Self {
        self.value_converter = Some(converter);
        self
    }

    /// Dispatches reads with a `$type` property to derived converters.
    #[must_use]
    pub fn with_dispatcher(mut self, dispatcher: PolymorphicDispatcher<S::Output>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Writes `$type` with this discriminator.
    #[must_use]
    pub fn with_discriminator(mut self, discriminator: impl Into<String>) -> Self {
        self.discriminator = Some(discriminator.into());
        self
    }

    pub(crate) fn create(&self, shape: &S) -> Option<S::Staging> {
        match &self.factory {
            Some(factory) => Some(factory()),
            None => shape.create_default(),
        }
    }

    pub(crate) fn hooks(&self) -> Option<&dyn MapHooks<S>> {
        self.hooks.as_deref()
    }

    pub(crate) fn key_converter(&self) -> Option<&Arc<dyn Converter<S::Key>>> {
        self.key_converter.as_ref()
    }

    pub(crate) fn value_converter(&self) -> Option<&Arc<dyn Converter<S::Value>>> {
        self.value_converter.as_ref()
    }

    pub(crate) fn dispatcher(&self) -> Option<&PolymorphicDispatcher<S::Output>> {
        self.dispatcher.as_ref()
    }

    pub(crate) fn discriminator(&self) -> Option<&str> {
        self.discriminator.as_deref()
    }
}

impl<S: MapShape> fmt::Debug for MapTypeInfo<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapTypeInfo")
            .field("type_name", &self.type_name)
            .field("has_factory", &self.factory.is_some())
            .field("has_hooks", &self.hooks.is_some())
            .field("polymorphic", &self.dispatcher.is_some())
            .field("discriminator", &self.discriminator)
            .finish()
    }
}

/// Writes key/value pairs as properties, resumably.
///
/// The frame's `index` counts the pairs already written, and `wrote_name`
/// marks a pair whose value suspended after its name was emitted. A resumed
/// call skips those, so no pair is written twice. When the stack supports
/// continuation, the write suspends before a new pair once the buffered output
/// reaches the flush threshold.
pub fn write_pairs<'m, K: 'static, V: 'static>(
    writer: &mut Writer,
    pairs: impl Iterator<Item = (&'m K, &'m V)>,
    keys: &dyn Converter<K>,
    values: &dyn Converter<V>,
    codec: &Codec,
    stack: &mut WriteStack,
) -> Result<bool> {
    let start = stack.current().index;
    for (key, value) in pairs.skip(start) {
        if !stack.current().wrote_name {
            if stack.supports_continuation && writer.pending() >= stack.flush_threshold {
                return Ok(false);
            }
            let name = keys.write_as_property_name(key, codec)?;
            if stack.current().escape_metadata_names {
                writer.write_data_property_name(&name);
            } else {
                writer.write_property_name(&name);
            }
            let frame = stack.current_mut();
            frame.wrote_name = true;
            frame.property_name = Some(name.into_owned());
        }
        if !write_value(values, writer, value, codec, stack)? {
            return Ok(false);
        }
        let frame = stack.current_mut();
        frame.index += 1;
        frame.wrote_name = false;
        frame.property_name = None;
    }
    Ok(true)
}
