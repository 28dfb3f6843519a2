//! Registry tests: concurrent first use, caching and build failures.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use tagbuf_core::{
    CodecRegistry, CompositeBuilder, Described, Serializer, TagbufError, TypeDescriptor,
};
use tagbuf_derive::Described;

static SENSOR_DESCRIBES: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug, Default, PartialEq)]
struct Sensor {
    id: u32,
    reading: f64,
}

impl Described for Sensor {
    fn describe() -> TypeDescriptor {
        SENSOR_DESCRIBES.fetch_add(1, Ordering::SeqCst);
        let shape = CompositeBuilder::<Self>::new()
            .field("id", |s| &s.id, |s, v| s.id = v)
            .field("reading", |s| &s.reading, |s, v| s.reading = v)
            .build();
        TypeDescriptor::of::<Self>("Sensor", shape)
    }
}

#[test]
fn test_concurrent_first_use_builds_once() {
    const THREADS: usize = 16;
    let registry = CodecRegistry::default();
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let registry = registry.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                registry.codec::<Sensor>().unwrap()
            })
        })
        .collect();

    let codecs: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for codec in &codecs[1..] {
        assert!(Arc::ptr_eq(&codecs[0], codec));
    }
    assert_eq!(SENSOR_DESCRIBES.load(Ordering::SeqCst), 1);
    assert_eq!(codecs[0].type_name(), "Sensor");
}

#[test]
fn test_codecs_are_shared_across_threads() {
    let serializer = Serializer::new();
    let handles: Vec<_> = (0..8u32)
        .map(|i| {
            let serializer = serializer.clone();
            thread::spawn(move || {
                let value = vec![format!("item-{i}"); i as usize];
                let copy = serializer.copy(&value).unwrap();
                assert_eq!(copy, value);
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert!(serializer.registry().is_published::<Vec<String>>());
}

#[test]
fn test_registries_are_independent() {
    let first = CodecRegistry::default();
    let second = CodecRegistry::default();
    first.codec::<Vec<u32>>().unwrap();
    assert!(first.is_published::<Vec<u32>>());
    assert!(!second.is_published::<Vec<u32>>());
}

#[derive(Debug, Default, Described)]
struct Tree {
    label: String,
    children: Vec<Tree>,
}

#[test]
fn test_recursive_type_fails_every_time() {
    let registry = CodecRegistry::default();
    for _ in 0..2 {
        match registry.codec::<Tree>() {
            Err(TagbufError::RecursiveTypeNotSupported { type_name, cycle }) => {
                assert_eq!(type_name, "Tree");
                assert!(cycle.contains("Tree -> "), "cycle: {cycle}");
            }
            other => panic!("expected recursion error, got {other:?}"),
        }
    }
    assert!(!registry.is_published::<Tree>());
    assert!(!registry.is_published::<Vec<Tree>>());
    // Member types resolved before the cycle was found stay usable.
    assert!(registry.is_published::<String>());
}

#[derive(Debug, Default, Described)]
struct Collide {
    first: u8,
    #[tagbuf(rename = "first")]
    second: u8,
}

#[test]
fn test_duplicate_member_names_are_rejected() {
    let err = Serializer::new().codec::<Collide>().unwrap_err();
    assert!(matches!(err, TagbufError::DuplicateMemberTag { .. }));
    assert!(err.is_build_error());
}
