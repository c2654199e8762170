//! Shapes for the standard map types.
//!
//! | shape | output | key order when written |
//! |-------|--------|------------------------|
//! | [`HashMapShape`] | `HashMap<K, V>` | unspecified |
//! | [`IndexMapShape`] | `IndexMap<K, V>` | insertion |
//! | [`BTreeMapShape`] | `BTreeMap<K, V>` | sorted |
//! | [`SharedMapShape`] | [`SharedMap<K, V>`] | insertion |
//! | [`ValueMapShape`] | [`ValueMap`] | insertion |
//!
//! A duplicate key keeps the value read last. [`SharedMap`] is the only shape
//! with identity, so it is the only one written with `$id` when references
//! are preserved.

use super::{write_pairs, MapShape};
use crate::converter::Converter;
use crate::state::WriteStack;
use crate::writer::Writer;
use crate::{Codec, Result, Value, ValueMap};
use indexmap::IndexMap;
use std::cell::{Ref, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;
use std::rc::Rc;

macro_rules! owned_shape {
    ($(#[$doc:meta])* $shape:ident, $map:ident, [$($bound:tt)+]) => {
        $(#[$doc])*
        pub struct $shape<K, V>(PhantomData<fn() -> (K, V)>);

        impl<K, V> $shape<K, V> {
            #[must_use]
            pub fn new() -> Self {
                $shape(PhantomData)
            }
        }

        impl<K, V> Default for $shape<K, V> {
            fn default() -> Self {
                Self::new()
            }
        }

        impl<K, V> fmt::Debug for $shape<K, V> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(stringify!($shape))
            }
        }

        impl<K, V> MapShape for $shape<K, V>
        where
            K: $($bound)+ + Clone + 'static,
            V: Clone + 'static,
        {
            type Key = K;
            type Value = V;
            type Staging = $map<K, V>;
            type Output = $map<K, V>;

            fn create_default(&self) -> Option<Self::Staging> {
                Some($map::new())
            }

            fn add(&self, staging: &mut Self::Staging, key: K, value: V) {
                staging.insert(key, value);
            }

            fn convert_collection(&self, staging: Self::Staging) -> Self::Output {
                staging
            }

            fn write_elements(
                &self,
                writer: &mut Writer,
                map: &Self::Output,
                keys: &dyn Converter<K>,
                values: &dyn Converter<V>,
                codec: &Codec,
                stack: &mut WriteStack,
            ) -> Result<bool> {
                write_pairs(writer, map.iter(), keys, values, codec, stack)
            }
        }
    };
}

owned_shape!(
    /// `std::collections::HashMap`.
    ///
    /// Iteration order is only stable for an unmodified map, which is enough
    /// for a suspended write to resume where it left off.
    HashMapShape, HashMap, [Eq + Hash]
);

owned_shape!(
    /// `indexmap::IndexMap`, keeping document order.
    IndexMapShape, IndexMap, [Eq + Hash]
);

owned_shape!(
    /// `std::collections::BTreeMap`.
    BTreeMapShape, BTreeMap, [Ord]
);

/// An insertion-ordered map with shared identity.
///
/// Clones are handles to the same map. Reading `{"$id":"1","self":{"$ref":"1"}}`
/// into a `SharedMap` produces a map that contains itself.
pub struct SharedMap<K, V>(Rc<RefCell<IndexMap<K, V>>>);

impl<K: Eq + Hash, V> SharedMap<K, V> {
    #[must_use]
    pub fn new() -> Self {
        SharedMap(Rc::new(RefCell::new(IndexMap::new())))
    }

    /// Borrows the contents. Panics if the map is being filled.
    #[must_use]
    pub fn borrow(&self) -> Ref<'_, IndexMap<K, V>> {
        self.0.borrow()
    }

    pub fn insert(&self, key: K, value: V) -> Option<V> {
        self.0.borrow_mut().insert(key, value)
    }

    #[must_use]
    pub fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.0.borrow().get(key).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }
}

impl<K, V> SharedMap<K, V> {
    /// Returns `true` if both handles point at the same map.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Address of the shared map; equal for all handles to it.
    #[must_use]
    pub fn identity(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }
}

impl<K: Eq + Hash, V> Default for SharedMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Clone for SharedMap<K, V> {
    fn clone(&self) -> Self {
        SharedMap(Rc::clone(&self.0))
    }
}

// Contents may contain the map itself.
impl<K, V> fmt::Debug for SharedMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedMap")
            .field("at", &format_args!("{:#x}", self.identity()))
            .field("len", &self.0.try_borrow().map(|m| m.len()).ok())
            .finish()
    }
}

/// Shape of [`SharedMap`]. The map handed out early for `$id` registration
/// is the one being filled.
pub struct SharedMapShape<K, V>(PhantomData<fn() -> (K, V)>);

impl<K, V> SharedMapShape<K, V> {
    #[must_use]
    pub fn new() -> Self {
        SharedMapShape(PhantomData)
    }
}

impl<K, V> Default for SharedMapShape<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> fmt::Debug for SharedMapShape<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedMapShape")
    }
}

impl<K, V> MapShape for SharedMapShape<K, V>
where
    K: Eq + Hash + 'static,
    V: 'static,
{
    type Key = K;
    type Value = V;
    type Staging = SharedMap<K, V>;
    type Output = SharedMap<K, V>;

    fn create_default(&self) -> Option<Self::Staging> {
        Some(SharedMap::new())
    }

    fn add(&self, staging: &mut Self::Staging, key: K, value: V) {
        staging.insert(key, value);
    }

    fn convert_collection(&self, staging: Self::Staging) -> Self::Output {
        staging
    }

    fn early_handle(&self, staging: &Self::Staging) -> Option<Self::Output> {
        Some(staging.clone())
    }

    fn identity(&self, map: &Self::Output) -> Option<usize> {
        Some(map.identity())
    }

    fn write_elements(
        &self,
        writer: &mut Writer,
        map: &Self::Output,
        keys: &dyn Converter<K>,
        values: &dyn Converter<V>,
        codec: &Codec,
        stack: &mut WriteStack,
    ) -> Result<bool> {
        let contents = map.borrow();
        write_pairs(writer, contents.iter(), keys, values, codec, stack)
    }
}

/// Shape of the untyped [`ValueMap`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ValueMapShape;

impl MapShape for ValueMapShape {
    type Key = String;
    type Value = Value;
    type Staging = ValueMap;
    type Output = ValueMap;

    fn type_name(&self) -> std::borrow::Cow<'static, str> {
        std::borrow::Cow::Borrowed("ValueMap")
    }

    fn create_default(&self) -> Option<ValueMap> {
        Some(ValueMap::new())
    }

    fn add(&self, staging: &mut ValueMap, key: String, value: Value) {
        staging.insert(key, value);
    }

    fn convert_collection(&self, staging: ValueMap) -> ValueMap {
        staging
    }

    fn write_elements(
        &self,
        writer: &mut Writer,
        map: &ValueMap,
        keys: &dyn Converter<String>,
        values: &dyn Converter<Value>,
        codec: &Codec,
        stack: &mut WriteStack,
    ) -> Result<bool> {
        write_pairs(writer, map.iter(), keys, values, codec, stack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{from_str, to_string};

    #[test]
    fn test_sorted_and_ordered_output() {
        let mut codec = Codec::default();
        codec
            .register_map(BTreeMapShape::<String, i64>::new())
            .register_map(IndexMapShape::<String, i64>::new());
        let json = r#"{"b":2,"a":1}"#;

        let sorted: BTreeMap<String, i64> = from_str(json, &codec).unwrap();
        assert_eq!(to_string(&sorted, &codec).unwrap(), r#"{"a":1,"b":2}"#);

        let ordered: IndexMap<String, i64> = from_str(json, &codec).unwrap();
        assert_eq!(to_string(&ordered, &codec).unwrap(), json);
    }

    #[test]
    fn test_duplicate_key_keeps_last_value() {
        let mut codec = Codec::default();
        codec.register_map(HashMapShape::<String, bool>::new());
        let map: HashMap<String, bool> = from_str(r#"{"k":true,"k":false}"#, &codec).unwrap();
        assert_eq!(map.len(), 1);
        assert!(!map["k"]);
    }

    #[test]
    fn test_shared_map_handles() {
        let map = SharedMap::<String, i64>::new();
        let handle = map.clone();
        handle.insert("x".to_string(), 1);
        assert!(map.ptr_eq(&handle));
        assert_eq!(map.get(&"x".to_string()), Some(1));
        assert!(!map.ptr_eq(&SharedMap::new()));
    }
}
