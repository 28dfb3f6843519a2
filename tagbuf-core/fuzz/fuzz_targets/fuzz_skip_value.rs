#![no_main]

use libfuzzer_sys::fuzz_target;

use tagbuf_core::wire::skip_value;
use tagbuf_core::{DataInput, ObjectDataInput};

fuzz_target!(|data: &[u8]| {
    let mut input = ObjectDataInput::new(data);
    while input.remaining() > 0 {
        let before = input.position();
        if skip_value(&mut input).is_err() {
            break;
        }
        assert!(input.position() > before, "skip_value must make progress");
    }
});
