//! Fuzz target: `provisioning::parse_reply`
//!
//! Only a 16-byte payload may yield a peer address, and that address
//! must be exactly those bytes.
//!
//! cargo fuzz run fuzz_provisioning_reply

#![no_main]

use libfuzzer_sys::fuzz_target;
use meshnode::app::provisioning;

fuzz_target!(|data: &[u8]| {
    match provisioning::parse_reply(data) {
        Ok(addr) => {
            assert_eq!(data.len(), 16);
            assert_eq!(&addr.octets()[..], data);
        }
        Err(_) => assert_ne!(data.len(), 16),
    }
});
