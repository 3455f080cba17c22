//! Fuzz target: `FrameDecoder::push`
//!
//! Drives arbitrary byte sequences into the streaming frame decoder and
//! asserts that it never panics, never yields more than its staging
//! capacity, and that every yielded payload survives a re-encode.
//!
//! cargo fuzz run fuzz_frame_decoder

#![no_main]

use libfuzzer_sys::fuzz_target;
use studio_rpc::rpc::framing::{FrameDecoder, encode_frame};

const STAGING: usize = 64;

fuzz_target!(|data: &[u8]| {
    let mut decoder = FrameDecoder::<STAGING>::new();

    for &b in data {
        if let Some(payload) = decoder.push(b) {
            assert!(payload.len() <= STAGING, "payload exceeds staging buffer");

            // Re-encoding and decoding a yielded payload is lossless.
            let owned = payload.to_vec();
            let mut frame = [0u8; 2 * STAGING + 2];
            let n = encode_frame(&owned, &mut frame).expect("worst case fits");
            let mut again = FrameDecoder::<STAGING>::new();
            let decoded = frame[..n].iter().find_map(|&x| again.push(x).map(<[u8]>::to_vec));
            assert_eq!(decoded.as_deref(), Some(owned.as_slice()));
        }
    }

    // After a reset the decoder must accept bytes cleanly again.
    decoder.reset();
    for &b in data {
        let _ = decoder.push(b);
    }
});
