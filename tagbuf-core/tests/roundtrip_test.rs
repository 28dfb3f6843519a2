//! Round-trip tests for derived and hand-described types.

use std::collections::{BTreeMap, HashMap};

use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use tagbuf_core::{CompositeBuilder, Described, Serializer, TypeDescriptor, WireTag};
use tagbuf_derive::Described;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Described)]
enum Status {
    #[default]
    Pending,
    Active = 10,
    Suspended,
    Closed = -1,
}

#[derive(Debug, Clone, Default, PartialEq, Described)]
struct Address {
    street: String,
    city: String,
    zip: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Described)]
#[tagbuf(name = "Customer")]
struct Customer {
    id: Uuid,
    name: String,
    #[tagbuf(rename = "emailAddress")]
    email: Option<String>,
    status: Status,
    balance: Decimal,
    joined: chrono::DateTime<Utc>,
    addresses: Vec<Address>,
    scores: Vec<i32>,
    tags: BTreeMap<String, String>,
    #[tagbuf(skip)]
    session: Option<String>,
}

fn sample_customer() -> Customer {
    let mut tags = BTreeMap::new();
    tags.insert("tier".to_string(), "gold".to_string());
    tags.insert("region".to_string(), "emea".to_string());
    Customer {
        id: Uuid::new_v4(),
        name: "Ada".to_string(),
        email: Some("ada@example.com".to_string()),
        status: Status::Suspended,
        balance: Decimal::new(123_456, 2),
        joined: Utc.with_ymd_and_hms(2024, 2, 29, 12, 30, 0).unwrap(),
        addresses: vec![
            Address {
                street: "1 Main St".to_string(),
                city: "Springfield".to_string(),
                zip: Some(12345),
            },
            Address::default(),
        ],
        scores: vec![3, -7, i32::MAX],
        tags,
        session: Some("cached".to_string()),
    }
}

#[test]
fn test_derived_composite_roundtrip() {
    let serializer = Serializer::new();
    let customer = sample_customer();

    let bytes = serializer.serialize(&customer).unwrap();
    assert_eq!(bytes[0], WireTag::Object as u8);
    assert_eq!(bytes.len(), serializer.size_of(&customer).unwrap());

    let decoded: Customer = serializer.deserialize(&bytes).unwrap();
    let expected = Customer {
        session: None,
        ..customer
    };
    assert_eq!(decoded, expected);
}

#[test]
fn test_enum_discriminants_follow_declaration() {
    use tagbuf_core::DescribedEnum;

    assert_eq!(Status::Pending.to_repr(), 0);
    assert_eq!(Status::Active.to_repr(), 10);
    assert_eq!(Status::Suspended.to_repr(), 11);
    assert_eq!(Status::Closed.to_repr(), -1);
    assert_eq!(Status::from_repr(11), Some(Status::Suspended));
    assert_eq!(Status::from_repr(5), None);
}

#[test]
fn test_unknown_enum_value_decodes_to_default() {
    let serializer = Serializer::new();
    let mut bytes = serializer.serialize(&Status::Active).unwrap();
    assert_eq!(bytes[0], WireTag::Enum as u8);
    let last = bytes.len() - 1;
    bytes[last] = 99;
    let decoded: Status = serializer.deserialize(&bytes).unwrap();
    assert_eq!(decoded, Status::Pending);
}

#[test]
fn test_builtin_values_roundtrip() {
    let serializer = Serializer::new();

    assert!(serializer.copy(&true).unwrap());
    assert_eq!(serializer.copy(&-5i8).unwrap(), -5);
    assert_eq!(serializer.copy(&u16::MAX).unwrap(), u16::MAX);
    assert_eq!(serializer.copy(&u64::MAX).unwrap(), u64::MAX);
    assert_eq!(serializer.copy(&1.5f32).unwrap(), 1.5);
    assert_eq!(serializer.copy(&-0.25f64).unwrap(), -0.25);
    assert_eq!(serializer.copy(&"héllo".to_string()).unwrap(), "héllo");

    let id = Uuid::new_v4();
    assert_eq!(serializer.copy(&id).unwrap(), id);

    let amount = Decimal::new(-987_654_321, 4);
    assert_eq!(serializer.copy(&amount).unwrap(), amount);

    let at = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
    assert_eq!(serializer.copy(&at).unwrap(), at);
}

#[test]
fn test_optional_values_roundtrip() {
    let serializer = Serializer::new();
    let some: Option<Vec<String>> = Some(vec!["a".to_string()]);
    assert_eq!(serializer.copy(&some).unwrap(), some);
    let none: Option<Vec<String>> = None;
    assert_eq!(serializer.copy(&none).unwrap(), None);
    let nested: Option<Option<u8>> = Some(None);
    assert_eq!(serializer.copy(&nested).unwrap(), Some(None));
}

#[test]
fn test_collections_roundtrip() {
    let serializer = Serializer::new();

    let mut map: HashMap<u32, Vec<Address>> = HashMap::new();
    map.insert(1, vec![Address::default()]);
    map.insert(
        2,
        vec![Address {
            city: "Oslo".to_string(),
            ..Address::default()
        }],
    );
    assert_eq!(serializer.copy(&map).unwrap(), map);

    let grid: [[u8; 3]; 2] = [[1, 2, 3], [4, 5, 6]];
    assert_eq!(serializer.copy(&grid).unwrap(), grid);

    let empty: Vec<Address> = Vec::new();
    assert!(serializer.copy(&empty).unwrap().is_empty());
}

#[test]
fn test_primitive_array_of_1000_ints_is_packed() {
    let serializer = Serializer::new();
    let values: Vec<i32> = (0..1000).map(|i| i * 7 - 3500).collect();
    let bytes = serializer.serialize(&values).unwrap();

    assert_eq!(bytes[0], WireTag::PrimitiveList as u8);
    assert_eq!(bytes[1], WireTag::Int32 as u8);
    assert_eq!(bytes.len(), 2 + 4 + 1000 * 4);

    let decoded: Vec<i32> = serializer.deserialize(&bytes).unwrap();
    assert_eq!(decoded, values);
}

#[derive(Debug, Clone, Default, PartialEq, Described)]
struct Page<T> {
    items: Vec<T>,
    next: Option<String>,
}

#[test]
fn test_generic_composite_roundtrip() {
    let serializer = Serializer::new();
    let page = Page {
        items: vec![Address::default(), Address::default()],
        next: Some("cursor-2".to_string()),
    };
    assert_eq!(serializer.copy(&page).unwrap(), page);

    let numbers = Page {
        items: vec![1u64, 2, 3],
        next: None,
    };
    assert_eq!(serializer.copy(&numbers).unwrap(), numbers);
    assert_ne!(
        Page::<u64>::describe().name(),
        Page::<Address>::describe().name()
    );
}

/// `a` and `b` have both accessors, `c` can only be read.
#[derive(Debug, Default, PartialEq)]
struct Triple {
    a: i32,
    b: i32,
    c: i32,
}

impl Triple {
    fn a(&self) -> i32 {
        self.a
    }

    fn set_a(&mut self, value: i32) {
        self.a = value;
    }

    fn b(&self) -> i32 {
        self.b
    }

    fn set_b(&mut self, value: i32) {
        self.b = value;
    }

    fn c(&self) -> i32 {
        self.c
    }
}

impl Described for Triple {
    fn describe() -> TypeDescriptor {
        let shape = CompositeBuilder::<Self>::new()
            .property("A", Triple::a, Triple::set_a)
            .property("B", Triple::b, Triple::set_b)
            .getter_only("C", Triple::c)
            .build();
        TypeDescriptor::of::<Self>("Triple", shape)
    }
}

#[test]
fn test_member_without_setter_returns_to_default() {
    let serializer = Serializer::new();
    let value = Triple { a: 1, b: 2, c: 3 };
    let decoded: Triple = serializer.copy(&value).unwrap();
    assert_eq!(decoded, Triple { a: 1, b: 2, c: 0 });
}

#[test]
fn test_absent_members_are_omitted() {
    let serializer = Serializer::new();
    let bare = Address::default();
    let with_zip = Address {
        zip: Some(1),
        ..Address::default()
    };
    let bare_len = serializer.serialize(&bare).unwrap().len();
    let zip_len = serializer.serialize(&with_zip).unwrap().len();
    assert!(zip_len > bare_len);
    assert_eq!(serializer.copy(&bare).unwrap(), bare);
}

#[test]
fn test_absent_members_written_when_omission_disabled() {
    let config = tagbuf_core::SerializerConfig::builder()
        .omit_absent_members(false)
        .build()
        .unwrap();
    let verbose = Serializer::with_config(config);
    let compact = Serializer::new();
    let value = Address::default();

    let verbose_bytes = verbose.serialize(&value).unwrap();
    assert!(verbose_bytes.len() > compact.serialize(&value).unwrap().len());
    assert_eq!(verbose_bytes.len(), verbose.size_of(&value).unwrap());
    assert_eq!(compact.deserialize::<Address>(&verbose_bytes).unwrap(), value);
}
