//! Fuzz target: the captive-portal DNS responder.
//!
//! Every reply must echo the query ID, set QR and end with the portal
//! address; malformed packets are dropped rather than answered.
//!
//! cargo fuzz run fuzz_dns_answer

#![no_main]

use coompel::adapters::portal::{dns_answer, AP_ADDRESS};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some(reply) = dns_answer(data, AP_ADDRESS) else {
        return;
    };
    assert!(data.len() >= 12);
    assert_eq!(reply[..2], data[..2]);
    assert_eq!(reply[2] & 0x80, 0x80);
    assert_eq!(reply[reply.len() - 4..], AP_ADDRESS);
});
