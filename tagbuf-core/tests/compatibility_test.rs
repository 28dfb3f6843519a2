//! Tests for reading data written by other versions of a type.

use tagbuf_core::{
    DataOutput, ObjectDataOutput, Serializer, SerializerConfig, TagbufError, WireTag,
};
use tagbuf_derive::Described;

#[derive(Debug, Clone, Default, PartialEq, Described)]
#[tagbuf(name = "Profile")]
struct ProfileV1 {
    user: String,
    age: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Described)]
#[tagbuf(name = "Profile")]
struct ProfileV2 {
    age: u8,
    user: String,
    nickname: String,
    settings: Vec<String>,
}

#[test]
fn test_extra_member_is_skipped() {
    let serializer = Serializer::new();
    let newer = ProfileV2 {
        age: 41,
        user: "grace".to_string(),
        nickname: "amazing".to_string(),
        settings: vec!["dark".to_string(), "compact".to_string()],
    };
    let older: ProfileV1 = serializer.change_type(&newer).unwrap();
    assert_eq!(
        older,
        ProfileV1 {
            user: "grace".to_string(),
            age: 41,
        }
    );
}

#[test]
fn test_missing_member_keeps_default() {
    let serializer = Serializer::new();
    let older = ProfileV1 {
        user: "linus".to_string(),
        age: 30,
    };
    let newer: ProfileV2 = serializer.change_type(&older).unwrap();
    assert_eq!(newer.user, "linus");
    assert_eq!(newer.age, 30);
    assert_eq!(newer.nickname, "");
    assert!(newer.settings.is_empty());
}

#[test]
fn test_member_tags_are_stable_across_builds() {
    let value = ProfileV1 {
        user: "ken".to_string(),
        age: 7,
    };
    let first = Serializer::new().serialize(&value).unwrap();
    let second = Serializer::new().serialize(&value).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_member_order_does_not_matter() {
    let serializer = Serializer::new();
    let newer = ProfileV2 {
        age: 3,
        user: "ritchie".to_string(),
        ..ProfileV2::default()
    };
    let roundtrip: ProfileV2 = serializer
        .change_type::<ProfileV1, ProfileV2>(&serializer.change_type(&newer).unwrap())
        .unwrap();
    assert_eq!(roundtrip, newer);
}

#[derive(Debug, Default, PartialEq, Described)]
struct Envelope {
    id: u32,
    profile: ProfileV1,
}

#[test]
fn test_decode_error_names_member_path() {
    let serializer = Serializer::new();
    let value = Envelope {
        id: 1,
        profile: ProfileV1 {
            user: "dennis".to_string(),
            age: 70,
        },
    };
    let mut bytes = serializer.serialize(&value).unwrap();
    // `age` is the last member written: its category tag, then one byte.
    let age_tag = bytes.len() - 2;
    assert_eq!(bytes[age_tag], WireTag::UInt8 as u8);
    bytes[age_tag] = WireTag::Float64 as u8;

    match serializer.deserialize::<Envelope>(&bytes) {
        Err(TagbufError::Decode(err)) => {
            assert_eq!(err.frames().len(), 2, "unexpected member path: {err}");
            assert_eq!(err.frames()[0].type_name, "Envelope");
            assert_eq!(err.frames()[0].member, "profile");
            assert_eq!(err.owner(), Some("Profile"));
            assert_eq!(err.member(), Some("age"));
        }
        other => panic!("expected decode error, got {other:?}"),
    }
}

#[test]
fn test_wrong_category_is_decode_error() {
    let serializer = Serializer::new();
    let bytes = serializer.serialize(&"text".to_string()).unwrap();
    let err = serializer.deserialize::<u64>(&bytes).unwrap_err();
    assert!(matches!(err, TagbufError::Decode(_)));
}

#[test]
fn test_empty_tag_reads_default_value() {
    let serializer = Serializer::new();
    let mut output = ObjectDataOutput::new();
    output.write_byte(WireTag::Empty as i8).unwrap();
    let value: ProfileV2 = serializer.deserialize(&output.into_bytes()).unwrap();
    assert_eq!(value, ProfileV2::default());
}

#[test]
fn test_collection_length_limit() {
    let config = SerializerConfig::builder()
        .max_collection_len(4)
        .build()
        .unwrap();
    let limited = Serializer::with_config(config);
    let bytes = Serializer::new()
        .serialize(&vec!["x".to_string(); 5])
        .unwrap();
    let err = limited.deserialize::<Vec<String>>(&bytes).unwrap_err();
    assert!(matches!(err, TagbufError::Decode(_)));

    let packed = Serializer::new().serialize(&vec![0u16; 5]).unwrap();
    assert!(limited.deserialize::<Vec<u16>>(&packed).is_err());
}

#[test]
fn test_fixed_array_length_mismatch() {
    let serializer = Serializer::new();
    let bytes = serializer.serialize(&vec![1.0f64, 2.0]).unwrap();
    assert!(serializer.deserialize::<[f64; 3]>(&bytes).is_err());
    let exact: [f64; 2] = serializer.deserialize(&bytes).unwrap();
    assert_eq!(exact, [1.0, 2.0]);
}
