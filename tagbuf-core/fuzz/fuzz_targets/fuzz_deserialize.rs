#![no_main]

use std::collections::HashMap;

use libfuzzer_sys::fuzz_target;

use tagbuf_core::{AnyValue, DynArray, Serializer};
use tagbuf_derive::Described;

#[derive(Debug, Default, Described)]
struct FuzzRecord {
    flag: bool,
    small: i8,
    count: u32,
    ratio: f64,
    name: String,
    note: Option<String>,
    values: Vec<i64>,
    labels: Vec<String>,
    index: HashMap<String, u16>,
    payload: AnyValue,
    extras: DynArray,
}

fuzz_target!(|data: &[u8]| {
    let serializer = Serializer::new();
    serializer.register::<FuzzRecord>();

    // Arbitrary input must fail cleanly, never panic.
    if let Ok(record) = serializer.deserialize::<FuzzRecord>(data) {
        let bytes = serializer
            .serialize(&record)
            .expect("decoded record must re-encode");
        assert_eq!(bytes.len(), serializer.size_of(&record).unwrap_or_default());
    }
    let _ = serializer.deserialize::<AnyValue>(data);
    let _ = serializer.deserialize::<Vec<Option<String>>>(data);
});
