//! Built-in element converters.
//!
//! These cover the element types most maps hold and are registered in every
//! [`Codec::new`](crate::Codec::new):
//!
//! - `String`, `bool`, `i32`, `i64`, `u32`, `u64`, `f64`
//! - `chrono::DateTime<Utc>` as RFC 3339 strings
//! - [`Value`](crate::Value) and [`ValueMap`](crate::ValueMap)
//! - `Option<String>`, `Option<i64>`, `Option<f64>`, `Option<bool>`, `Option<Value>`
//!
//! [`FromStrConverter`] and [`NullableConverter`] are registered per type by
//! the user.

mod datetime;
mod from_str;
mod nullable;
mod primitives;
mod value;

pub use datetime::DateTimeConverter;
pub use from_str::FromStrConverter;
pub use nullable::NullableConverter;
pub use primitives::{
    BoolConverter, F64Converter, I32Converter, I64Converter, StringConverter, U32Converter,
    U64Converter,
};
pub use value::ValueConverter;

use crate::converter::Converter;
use crate::map::{MapConverter, ValueMapShape};
use crate::registry::TypeRegistry;
use crate::{Value, ValueMap};
use chrono::{DateTime, Utc};
use std::sync::Arc;

fn builtin<T: 'static>(registry: &mut TypeRegistry, converter: impl Converter<T>) {
    registry.insert::<T>(Arc::new(converter));
}

pub(crate) fn register_builtins(registry: &mut TypeRegistry) {
    builtin::<String>(registry, StringConverter);
    builtin::<bool>(registry, BoolConverter);
    builtin::<i32>(registry, I32Converter);
    builtin::<i64>(registry, I64Converter);
    builtin::<u32>(registry, U32Converter);
    builtin::<u64>(registry, U64Converter);
    builtin::<f64>(registry, F64Converter);
    builtin::<DateTime<Utc>>(registry, DateTimeConverter);
    builtin::<Value>(registry, ValueConverter);
    builtin::<ValueMap>(registry, MapConverter::new(ValueMapShape));

    builtin::<Option<String>>(registry, NullableConverter::<String>::wrapping(Arc::new(StringConverter)));
    builtin::<Option<i64>>(registry, NullableConverter::<i64>::wrapping(Arc::new(I64Converter)));
    builtin::<Option<f64>>(registry, NullableConverter::<f64>::wrapping(Arc::new(F64Converter)));
    builtin::<Option<bool>>(registry, NullableConverter::<bool>::wrapping(Arc::new(BoolConverter)));
    builtin::<Option<Value>>(registry, NullableConverter::<Value>::wrapping(Arc::new(ValueConverter)));
}
