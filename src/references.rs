//! Document-scoped object identity for `$id`/`$ref` metadata.
//!
//! On read, containers are registered under the id found in their `$id`
//! property and `$ref` properties are resolved against that table. On write,
//! containers with an identity get sequential ids (`"1"`, `"2"`, ...) the first
//! time they are seen.

use crate::{Error, Result};
use std::any::Any;
use std::collections::HashMap;
use tracing::debug;

/// Id to value table for one read.
#[derive(Debug, Default)]
pub struct ReadReferences {
    values: HashMap<String, Box<dyn Any>>,
}

impl ReadReferences {
    /// Registers `value` under `id`. Ids are unique within a document.
    pub fn register<T: 'static>(&mut self, id: &str, value: T, path: &str) -> Result<()> {
        if self.values.contains_key(id) {
            return Err(Error::metadata_invalid(
                path,
                &format!("duplicate $id '{id}'"),
            ));
        }
        debug!(id, path, "registered reference");
        self.values.insert(id.to_string(), Box::new(value));
        Ok(())
    }

    /// Returns a handle to the value registered under `id`.
    pub fn resolve<T: Clone + 'static>(&self, id: &str, path: &str) -> Result<T> {
        let value = self
            .values
            .get(id)
            .ok_or_else(|| Error::unresolved_reference(path, id))?;
        value.downcast_ref::<T>().cloned().ok_or_else(|| {
            Error::type_mismatch(
                path,
                std::any::type_name::<T>(),
                &format!("reference '{id}' of another type"),
            )
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Identity to id table for one write.
#[derive(Debug, Default)]
pub struct WriteReferences {
    ids: HashMap<usize, String>,
}

impl WriteReferences {
    /// Returns the id for `identity` and whether it was already assigned.
    pub fn get_or_assign(&mut self, identity: usize) -> (String, bool) {
        if let Some(id) = self.ids.get(&identity) {
            return (id.clone(), true);
        }
        let id = (self.ids.len() + 1).to_string();
        self.ids.insert(identity, id.clone());
        (id, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn test_register_and_resolve() {
        let mut refs = ReadReferences::default();
        let shared = Rc::new(5);
        refs.register("1", Rc::clone(&shared), "$").unwrap();
        let resolved: Rc<i32> = refs.resolve("1", "$.x").unwrap();
        assert!(Rc::ptr_eq(&shared, &resolved));
    }

    #[test]
    fn test_duplicate_id() {
        let mut refs = ReadReferences::default();
        refs.register("1", 1u8, "$").unwrap();
        let err = refs.register("1", 2u8, "$.a").unwrap_err();
        assert!(matches!(err, Error::MetadataCombinationInvalid { .. }));
    }

    #[test]
    fn test_resolve_failures() {
        let mut refs = ReadReferences::default();
        refs.register("1", 1u8, "$").unwrap();
        assert!(matches!(
            refs.resolve::<u8>("2", "$.a"),
            Err(Error::UnresolvedReference { .. })
        ));
        assert!(matches!(
            refs.resolve::<String>("1", "$.a"),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_sequential_write_ids() {
        let mut refs = WriteReferences::default();
        assert_eq!(refs.get_or_assign(0x10), ("1".to_string(), false));
        assert_eq!(refs.get_or_assign(0x20), ("2".to_string(), false));
        assert_eq!(refs.get_or_assign(0x10), ("1".to_string(), true));
    }
}
