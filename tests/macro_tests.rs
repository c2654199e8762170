use serde_mapstream::{from_str, to_string, value, Codec, Number, Value, ValueMap};

#[test]
fn test_value_macro_scalars() {
    assert_eq!(value!(null), Value::Null);
    assert_eq!(value!(false), Value::Bool(false));
    assert_eq!(value!(42), Value::Number(Number::Integer(42)));
    assert_eq!(value!(-123), Value::Number(Number::Integer(-123)));
    assert_eq!(value!(2.5), Value::Number(Number::Float(2.5)));
    assert_eq!(value!(""), Value::String(String::new()));
}

#[test]
fn test_value_macro_arrays() {
    assert_eq!(value!([]), Value::Array(vec![]));
    assert_eq!(
        value!([1, "hello", true, null]),
        Value::Array(vec![
            Value::Number(Number::Integer(1)),
            Value::String("hello".to_string()),
            Value::Bool(true),
            Value::Null,
        ])
    );
}

#[test]
fn test_value_macro_object_keeps_order() {
    let obj = value!({
        "zeta": 1,
        "alpha": { "id": 123, "name": "Bob" },
        "tags": ["admin", "developer"]
    });

    let map = obj.as_object().expect("object");
    let keys: Vec<_> = map.keys().map(String::as_str).collect();
    assert_eq!(keys, ["zeta", "alpha", "tags"]);

    let alpha = map.get("alpha").and_then(Value::as_object).expect("nested object");
    assert_eq!(alpha.get("id").and_then(Value::as_i64), Some(123));
    assert_eq!(alpha.get("name").and_then(Value::as_str), Some("Bob"));
    assert_eq!(map.get("tags").and_then(Value::as_array).map(Vec::len), Some(2));
}

#[test]
fn test_value_macro_expressions() {
    let name = "Carol".to_string();
    let missing: Option<i64> = None;
    let obj = value!({ "name": name, "score": missing });
    let map = obj.as_object().unwrap();
    assert_eq!(map.get("name"), Some(&Value::from("Carol")));
    assert!(map.get("score").unwrap().is_null());
}

#[test]
fn test_macro_value_matches_parsed_document() {
    let codec = Codec::default();
    let built = value!({ "a": [1, 2.5], "b": { "c": null } });
    let Value::Object(built) = built else {
        panic!("expected object");
    };

    let text = to_string(&built, &codec).unwrap();
    assert_eq!(text, r#"{"a":[1,2.5],"b":{"c":null}}"#);

    let parsed: ValueMap = from_str(&text, &codec).unwrap();
    assert_eq!(parsed, built);
}
