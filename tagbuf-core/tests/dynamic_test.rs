//! Tests for dynamically typed values.

use tagbuf_core::codec::MAX_DYNAMIC_DEPTH;
use tagbuf_core::{AnyValue, DynArray, ObjectDataOutput, Serializer, TagbufError, WireTag};
use tagbuf_derive::Described;
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Described)]
#[tagbuf(name = "events.Click")]
struct Click {
    x: i32,
    y: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Described)]
#[tagbuf(name = "events.Key")]
struct Key {
    code: u16,
    text: Option<String>,
}

#[derive(Debug, Default, Described)]
struct Event {
    id: Uuid,
    payload: AnyValue,
    extras: DynArray,
}

#[test]
fn test_any_value_roundtrip() {
    let serializer = Serializer::new();
    serializer.register::<Click>();

    let value = AnyValue::new(Click { x: 10, y: -4 });
    let bytes = serializer.serialize(&value).unwrap();
    assert_eq!(bytes[0], WireTag::Dynamic as u8);
    assert_eq!(bytes.len(), serializer.size_of(&value).unwrap());

    let decoded: AnyValue = serializer.deserialize(&bytes).unwrap();
    assert_eq!(decoded.downcast_ref::<Click>(), Some(&Click { x: 10, y: -4 }));
}

#[test]
fn test_null_any_value() {
    let serializer = Serializer::new();
    let bytes = serializer.serialize(&AnyValue::null()).unwrap();
    assert_eq!(bytes, [WireTag::Empty as u8]);
    assert!(serializer.deserialize::<AnyValue>(&bytes).unwrap().is_null());
}

#[test]
fn test_builtin_values_need_no_registration() {
    let serializer = Serializer::new();
    let decoded: AnyValue = serializer
        .copy(&AnyValue::new("plain".to_string()))
        .unwrap();
    assert_eq!(decoded.downcast_ref::<String>().map(String::as_str), Some("plain"));

    let number: AnyValue = serializer.copy(&AnyValue::new(7u64)).unwrap();
    assert_eq!(number.downcast::<u64>().ok(), Some(7));
}

#[test]
fn test_unregistered_type_fails_to_decode() {
    let writer = Serializer::new();
    let bytes = writer.serialize(&AnyValue::new(Key::default())).unwrap();

    let reader = Serializer::new();
    let err = reader.deserialize::<AnyValue>(&bytes).unwrap_err();
    assert!(matches!(err, TagbufError::Decode(_)));

    reader.register::<Key>();
    let decoded: AnyValue = reader.deserialize(&bytes).unwrap();
    assert!(decoded.is::<Key>());
}

#[test]
fn test_composite_with_dynamic_members() {
    let serializer = Serializer::new();
    serializer.register::<Click>();
    serializer.register::<Key>();

    let mut extras = DynArray::new();
    extras.push(Key {
        code: 13,
        text: Some("\n".to_string()),
    });
    extras.push(3.5f64);
    extras.0.push(AnyValue::null());
    let event = Event {
        id: Uuid::new_v4(),
        payload: AnyValue::new(Click { x: 1, y: 2 }),
        extras,
    };

    let decoded: Event = serializer.copy(&event).unwrap();
    assert_eq!(decoded.id, event.id);
    assert_eq!(decoded.payload.downcast_ref::<Click>(), Some(&Click { x: 1, y: 2 }));
    assert_eq!(decoded.extras.len(), 3);
    assert_eq!(
        decoded.extras.get(0).and_then(|v| v.downcast_ref::<Key>()),
        Some(&Key {
            code: 13,
            text: Some("\n".to_string()),
        })
    );
    assert_eq!(
        decoded.extras.get(1).and_then(|v| v.downcast_ref::<f64>()),
        Some(&3.5)
    );
    assert!(decoded.extras.get(2).is_some_and(AnyValue::is_null));
}

#[test]
fn test_null_payload_member_is_omitted() {
    let serializer = Serializer::new();
    let empty = Event::default();
    let decoded: Event = serializer.copy(&empty).unwrap();
    assert!(decoded.payload.is_null());
    assert!(decoded.extras.is_empty());
}

#[test]
fn test_built_types_are_resolvable_without_registration() {
    let serializer = Serializer::new();
    // Building Click's codec makes it known as a dynamic type.
    serializer.codec::<Click>().unwrap();
    let decoded: AnyValue = serializer.copy(&AnyValue::new(Click::default())).unwrap();
    assert!(decoded.is::<Click>());
    assert!(serializer.registry().is_registered("events.Click"));
}

fn nested(levels: usize) -> AnyValue {
    let mut value = AnyValue::new(1u8);
    for _ in 1..levels {
        value = AnyValue::new(value);
    }
    value
}

#[test]
fn test_deepest_allowed_nesting_roundtrips() {
    let serializer = Serializer::new();
    let value = nested(MAX_DYNAMIC_DEPTH);
    let bytes = serializer.serialize(&value).unwrap();
    assert_eq!(bytes.len(), serializer.size_of(&value).unwrap());

    let mut decoded: AnyValue = serializer.deserialize(&bytes).unwrap();
    for _ in 1..MAX_DYNAMIC_DEPTH {
        decoded = decoded.downcast::<AnyValue>().ok().unwrap();
    }
    assert_eq!(decoded.downcast_ref::<u8>(), Some(&1));
}

#[test]
fn test_too_deep_nesting_is_rejected_on_write() {
    let serializer = Serializer::new();
    let value = nested(MAX_DYNAMIC_DEPTH + 1);
    assert!(matches!(
        serializer.size_of(&value).unwrap_err(),
        TagbufError::Encode(_)
    ));
    assert!(matches!(
        serializer.serialize(&value).unwrap_err(),
        TagbufError::Encode(_)
    ));
    let mut output = ObjectDataOutput::new();
    assert!(matches!(
        serializer.serialize_into(&value, &mut output).unwrap_err(),
        TagbufError::Encode(_)
    ));

    // The depth counters are released after a failure.
    assert!(serializer.copy(&nested(MAX_DYNAMIC_DEPTH)).is_ok());
}

#[test]
fn test_too_deep_input_is_rejected_on_read() {
    let serializer = Serializer::new();
    let bytes = serializer.serialize(&nested(MAX_DYNAMIC_DEPTH)).unwrap();
    // Repeat the outer header (tag and discriminator) to add one more level.
    let mut deeper = bytes[..9].to_vec();
    deeper.extend_from_slice(&bytes);
    let err = serializer.deserialize::<AnyValue>(&deeper).unwrap_err();
    assert!(matches!(err, TagbufError::Decode(_)));
    assert!(err.to_string().contains("nested deeper than 64"));
}
