//! Tests for the events the registry and codecs log.

use std::io;
use std::sync::{Arc, Mutex};

use tagbuf_core::{AnyValue, Serializer, TagbufError};
use tagbuf_derive::Described;
use tracing_subscriber::EnvFilter;

/// Collects formatted log lines in memory.
#[derive(Clone, Default)]
struct LogCapture {
    lines: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.lines.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lines.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Runs `f` with every `tagbuf_core` event down to TRACE captured.
fn captured<R>(f: impl FnOnce() -> R) -> (R, String) {
    let capture = LogCapture::default();
    let writer = capture.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("tagbuf_core=trace"))
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, capture.contents())
}

#[derive(Debug, Default, Described)]
struct Tree {
    label: String,
    children: Vec<Tree>,
}

#[derive(Debug, Clone, Default, PartialEq, Described)]
#[tagbuf(name = "Profile")]
struct ProfileV1 {
    user: String,
}

#[derive(Debug, Clone, Default, PartialEq, Described)]
#[tagbuf(name = "Profile")]
struct ProfileV2 {
    user: String,
    nickname: String,
}

#[test]
fn test_failed_build_is_logged() {
    let serializer = Serializer::new();
    let (result, logs) = captured(|| serializer.codec::<Tree>());
    assert!(matches!(result, Err(TagbufError::RecursiveTypeNotSupported { .. })));
    assert!(logs.contains("WARN"), "logs: {logs}");
    assert!(logs.contains("codec build failed"), "logs: {logs}");
    assert!(logs.contains("Tree"), "logs: {logs}");
}

#[test]
fn test_built_codecs_are_logged() {
    let serializer = Serializer::new();
    let (result, logs) = captured(|| serializer.codec::<Vec<String>>());
    assert!(result.is_ok());
    assert!(logs.contains("built codec"), "logs: {logs}");
}

#[test]
fn test_unknown_member_skip_is_traced() {
    let serializer = Serializer::new();
    let newer = ProfileV2 {
        user: "ada".to_string(),
        nickname: "countess".to_string(),
    };
    let (older, logs) = captured(|| serializer.change_type::<ProfileV2, ProfileV1>(&newer));
    assert_eq!(older.unwrap().user, "ada");
    assert!(logs.contains("TRACE"), "logs: {logs}");
    assert!(logs.contains("skipping unknown member"), "logs: {logs}");
}

#[test]
fn test_dynamic_name_collision_warns_and_refuses_to_write() {
    let serializer = Serializer::new();
    let (_, logs) = captured(|| {
        serializer.register::<ProfileV1>();
        serializer.register::<ProfileV2>();
    });
    assert!(
        logs.contains("dynamic type name already taken"),
        "logs: {logs}"
    );

    let first = AnyValue::new(ProfileV1 {
        user: "ada".to_string(),
    });
    let decoded: AnyValue = serializer.copy(&first).unwrap();
    assert_eq!(decoded.downcast_ref::<ProfileV1>(), first.downcast_ref::<ProfileV1>());

    // Written anyway, it would read back as the first registration.
    let second = AnyValue::new(ProfileV2::default());
    for err in [
        serializer.serialize(&second).unwrap_err(),
        serializer.size_of(&second).unwrap_err(),
    ] {
        assert!(matches!(err, TagbufError::Encode(_)), "{err:?}");
        assert!(err.to_string().contains("registered to Profile"), "{err}");
    }
}
