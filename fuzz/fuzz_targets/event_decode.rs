//! Fuzz target for event and invitation decoding
//!
//! Feeds arbitrary text to the channel decoders and the invitation parser to
//! find:
//! - Parser panics on malformed JSON or unexpected payload shapes
//! - Events that decode but cannot be encoded again
//! - Encodings that do not decode back to the same event
//!
//! The fuzzer should NEVER panic. All invalid inputs should return an error.

#![no_main]

use libfuzzer_sys::fuzz_target;
use studyroom_proto::{invite, InboundEvent, OutboundEvent};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(event) = InboundEvent::decode(text) {
        let encoded = event.encode().expect("decoded inbound event must encode");
        let decoded = InboundEvent::decode(&encoded).expect("encoded inbound event must decode");
        assert_eq!(decoded, event);
    }

    if let Ok(event) = OutboundEvent::decode(text) {
        let encoded = event.encode().expect("decoded outbound event must encode");
        let decoded = OutboundEvent::decode(&encoded).expect("encoded outbound event must decode");
        assert_eq!(decoded, event);
    }

    let _ = invite::parse_invite(text);
});
