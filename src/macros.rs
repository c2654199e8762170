/// Builds a [`Value`](crate::Value) from JSON-like syntax.
///
/// ```rust
/// use serde_mapstream::{value, Value};
///
/// let v = value!({ "tags": ["a", "b"], "count": 2, "missing": null });
/// assert_eq!(v.as_object().and_then(|o| o.get("count")), Some(&Value::from(2)));
/// ```
#[macro_export]
macro_rules! value {
    (null) => {
        $crate::Value::Null
    };

    (true) => {
        $crate::Value::Bool(true)
    };

    (false) => {
        $crate::Value::Bool(false)
    };

    ([]) => {
        $crate::Value::Array(vec![])
    };

    ([ $($elem:tt),* $(,)? ]) => {
        $crate::Value::Array(vec![$($crate::value!($elem)),*])
    };

    ({}) => {
        $crate::Value::Object($crate::ValueMap::new())
    };

    ({ $($key:literal : $value:tt),* $(,)? }) => {{
        let mut object = $crate::ValueMap::new();
        $(
            object.insert($key.to_string(), $crate::value!($value));
        )*
        $crate::Value::Object(object)
    }};

    // Any other expression goes through `From`.
    ($other:expr) => {
        $crate::Value::from($other)
    };
}
