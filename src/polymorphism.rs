//! `$type`-based dispatch to derived converters.
//!
//! A base map type carries a [`PolymorphicDispatcher`] in its
//! [`MapTypeInfo`](crate::map::MapTypeInfo). When a document starts with a
//! `$type` property, the base converter hands the rest of the read to the
//! converter registered for that discriminator. The frame records that the
//! hand-off happened, so a resumed read goes straight back to the same
//! derived converter.

use crate::converter::Converter;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

type WriteSelector<T> = Arc<dyn Fn(&T) -> Option<String> + Send + Sync>;

/// Discriminator to converter table for one base type.
pub struct PolymorphicDispatcher<T: 'static> {
    derived: HashMap<String, Arc<dyn Converter<T>>>,
    ignore_unrecognized: bool,
    selector: Option<WriteSelector<T>>,
}

impl<T: 'static> PolymorphicDispatcher<T> {
    #[must_use]
    pub fn new() -> Self {
        PolymorphicDispatcher {
            derived: HashMap::new(),
            ignore_unrecognized: false,
            selector: None,
        }
    }

    /// Reads documents tagged with `discriminator` through `converter`.
    #[must_use]
    pub fn with_derived(mut self, discriminator: impl Into<String>, converter: impl Converter<T>) -> Self {
        self.derived.insert(discriminator.into(), Arc::new(converter));
        self
    }

    /// Reads documents with an unknown discriminator as the base type instead
    /// of failing.
    #[must_use]
    pub fn ignore_unrecognized(mut self, ignore: bool) -> Self {
        self.ignore_unrecognized = ignore;
        self
    }

    /// Picks the discriminator to write a value with; `None` writes the value
    /// as the base type.
    #[must_use]
    pub fn with_write_selector(mut self, selector: impl Fn(&T) -> Option<String> + Send + Sync + 'static) -> Self {
        self.selector = Some(Arc::new(selector));
        self
    }

    #[must_use]
    pub fn resolve(&self, discriminator: &str) -> Option<Arc<dyn Converter<T>>> {
        self.derived.get(discriminator).cloned()
    }

    #[must_use]
    pub fn ignores_unrecognized(&self) -> bool {
        self.ignore_unrecognized
    }

    /// The derived converter to write `value` with, if any.
    #[must_use]
    pub fn select_for_write(&self, value: &T) -> Option<Arc<dyn Converter<T>>> {
        let selector = self.selector.as_ref()?;
        self.resolve(&selector(value)?)
    }
}

impl<T: 'static> Default for PolymorphicDispatcher<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> fmt::Debug for PolymorphicDispatcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut discriminators: Vec<_> = self.derived.keys().collect();
        discriminators.sort();
        f.debug_struct("PolymorphicDispatcher")
            .field("derived", &discriminators)
            .field("ignore_unrecognized", &self.ignore_unrecognized)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converters::I64Converter;

    #[test]
    fn test_resolve_and_select() {
        let dispatcher = PolymorphicDispatcher::<i64>::new()
            .with_derived("num", I64Converter)
            .with_write_selector(|v| (*v > 0).then(|| "num".to_string()));
        assert!(dispatcher.resolve("num").is_some());
        assert!(dispatcher.resolve("other").is_none());
        assert!(dispatcher.select_for_write(&1).is_some());
        assert!(dispatcher.select_for_write(&-1).is_none());
        assert!(!dispatcher.ignores_unrecognized());
    }
}
