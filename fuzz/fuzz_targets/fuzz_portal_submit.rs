//! Fuzz target: captive-portal `/connect` body handling.
//!
//! Invariants checked:
//! - No panics under any byte sequence
//! - Credentials are queued only when the reply reports success
//! - Queued credentials always pass validation
//!
//! cargo fuzz run fuzz_portal_submit

#![no_main]

use coompel::adapters::portal;
use coompel::adapters::wifi::validate_credentials;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let link = portal::new_link();
    let reply = portal::submit(&link, data);

    match portal::take_pending(&link) {
        Some(creds) => {
            assert!(reply.success, "credentials queued for a failed reply");
            assert!(validate_credentials(&creds.ssid, &creds.password).is_ok());
        }
        None => assert!(!reply.success, "successful reply queued nothing"),
    }
});
