//! Fuzz target: `CommandEnvelope::parse`
//!
//! Arbitrary request bodies must either parse or be rejected, never
//! panic.  A parsed envelope never keeps `cmd` or `obj` in its fields.
//!
//! cargo fuzz run fuzz_command_envelope

#![no_main]

use libfuzzer_sys::fuzz_target;
use meshnode::app::commands::{CommandEnvelope, CommandId};

fuzz_target!(|data: &[u8]| {
    if let Ok(envelope) = CommandEnvelope::parse(data) {
        assert!(!envelope.fields.contains_key("cmd"));
        assert!(!envelope.fields.contains_key("obj"));
        let _ = CommandId::lookup(&envelope.cmd);
    }
});
