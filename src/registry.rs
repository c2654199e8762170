//! Converter lookup by type.
//!
//! A [`Codec`] pairs [`SerializerOptions`] with a [`TypeRegistry`] that maps a
//! Rust type to the converter used for it. The default codec knows the
//! primitives, `chrono::DateTime<Utc>`, a few `Option`s, [`Value`] and
//! [`ValueMap`]; typed maps are added with [`Codec::register_map`].
//!
//! ```rust
//! use serde_mapstream::map::IndexMapShape;
//! use serde_mapstream::{from_str, Codec};
//! use indexmap::IndexMap;
//!
//! let mut codec = Codec::default();
//! codec.register_map(IndexMapShape::<String, i64>::new());
//!
//! let map: IndexMap<String, i64> = from_str(r#"{"a":1,"b":2}"#, &codec).unwrap();
//! assert_eq!(map.get_index(1), Some((&"b".to_string(), &2)));
//! ```

use crate::converter::Converter;
use crate::map::{MapConverter, MapShape};
use crate::{converters, Error, Result, SerializerOptions};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Type to converter table.
#[derive(Default)]
pub struct TypeRegistry {
    converters: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl TypeRegistry {
    /// Sets the converter for `T`, replacing any earlier one.
    pub fn insert<T: 'static>(&mut self, converter: Arc<dyn Converter<T>>) {
        self.converters.insert(TypeId::of::<T>(), Box::new(converter));
    }

    #[must_use]
    pub fn get<T: 'static>(&self) -> Option<Arc<dyn Converter<T>>> {
        self.converters
            .get(&TypeId::of::<T>())?
            .downcast_ref::<Arc<dyn Converter<T>>>()
            .cloned()
    }

    #[must_use]
    pub fn contains<T: 'static>(&self) -> bool {
        self.converters.contains_key(&TypeId::of::<T>())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.converters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("converters", &self.converters.len())
            .finish()
    }
}

/// Options plus converters: everything a read or write needs.
#[derive(Debug)]
pub struct Codec {
    pub options: SerializerOptions,
    registry: TypeRegistry,
}

impl Codec {
    /// Creates a codec with the built-in converters registered.
    #[must_use]
    pub fn new(options: SerializerOptions) -> Self {
        let mut registry = TypeRegistry::default();
        converters::register_builtins(&mut registry);
        Codec { options, registry }
    }

    /// Creates a codec with no converters at all.
    #[must_use]
    pub fn empty(options: SerializerOptions) -> Self {
        Codec {
            options,
            registry: TypeRegistry::default(),
        }
    }

    /// Registers `converter` for `T`.
    pub fn register<T: 'static>(&mut self, converter: impl Converter<T>) -> &mut Self {
        self.registry.insert::<T>(Arc::new(converter));
        self
    }

    pub fn register_arc<T: 'static>(&mut self, converter: Arc<dyn Converter<T>>) -> &mut Self {
        self.registry.insert::<T>(converter);
        self
    }

    /// Registers a map converter with default type information for a shape.
    pub fn register_map<S: MapShape>(&mut self, shape: S) -> &mut Self {
        self.register::<S::Output>(MapConverter::new(shape))
    }

    /// Looks up the converter for `T`.
    pub fn converter<T: 'static>(&self) -> Result<Arc<dyn Converter<T>>> {
        self.registry.get::<T>().ok_or_else(|| {
            Error::unsupported_type(&format!(
                "no converter registered for {}",
                std::any::type_name::<T>()
            ))
        })
    }

    #[must_use]
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::new(SerializerOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Value, ValueMap};

    #[test]
    fn test_builtins_are_registered() {
        let codec = Codec::default();
        assert!(codec.registry().contains::<String>());
        assert!(codec.registry().contains::<i64>());
        assert!(codec.registry().contains::<Value>());
        assert!(codec.registry().contains::<ValueMap>());
        assert!(codec.converter::<String>().unwrap().is_builtin());
    }

    #[test]
    fn test_missing_converter() {
        let codec = Codec::empty(SerializerOptions::new());
        assert!(codec.registry().is_empty());
        assert!(matches!(
            codec.converter::<String>(),
            Err(Error::UnsupportedType(_))
        ));
    }
}
