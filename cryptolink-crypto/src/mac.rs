//! The HMAC-SHA-256 frame suffix carried by every record.

use cryptolink_types::HMAC_SIZE;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::trace_secret;

type HmacSha256 = Hmac<Sha256>;

fn compute(key: &[u8; HMAC_SIZE], payload: &[u8]) -> [u8; HMAC_SIZE] {
    let mut mac =
        HmacSha256::new_from_slice(key).expect("HMAC-SHA-256 accepts keys of any length");
    mac.update(payload);
    mac.finalize().into_bytes().into()
}

/// Appends `HMAC-SHA256(key, buf[..payload_len])` at `buf[payload_len..]`.
///
/// `buf` must have room for `payload_len + HMAC_SIZE` bytes. Returns the
/// total record length to hand to [`Link::write_all`](../cryptolink_core/trait.Link.html).
pub fn frame_outbound(key: &[u8; HMAC_SIZE], buf: &mut [u8], payload_len: usize) -> usize {
    let tag = compute(key, &buf[..payload_len]);
    buf[payload_len..payload_len + HMAC_SIZE].copy_from_slice(&tag);
    payload_len + HMAC_SIZE
}

/// Verifies `buf[..received_len - HMAC_SIZE]` against its trailing MAC.
///
/// Returns the effective payload length on a match, `0` on any rejection
/// (too short to contain a MAC, or a mismatch) — a bad record is simply
/// treated as a zero-length one, never as an error the caller must branch
/// on separately.
pub fn verify_inbound(key: &[u8; HMAC_SIZE], buf: &[u8], received_len: usize) -> usize {
    if received_len <= HMAC_SIZE {
        trace_secret!("rejected record: {received_len} bytes is too short to carry a MAC");
        return 0;
    }
    let payload_len = received_len - HMAC_SIZE;
    let expected = compute(key, &buf[..payload_len]);
    let actual = &buf[payload_len..received_len];
    if bool::from(expected.ct_eq(actual)) {
        trace_secret!("accepted record: MAC verified, payload_len={payload_len}");
        payload_len
    } else {
        trace_secret!("rejected record: MAC mismatch");
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; HMAC_SIZE] = cryptolink_types::PSK;

    #[test]
    fn round_trips() {
        let mut buf = [0u8; 64];
        buf[..20].copy_from_slice(&[7u8; 20]);
        let total = frame_outbound(&KEY, &mut buf, 20);
        assert_eq!(total, 52);
        assert_eq!(verify_inbound(&KEY, &buf, total), 20);
    }

    #[test]
    fn single_bit_flip_zeroes_length() {
        let mut buf = [0u8; 64];
        buf[..20].copy_from_slice(&[7u8; 20]);
        let total = frame_outbound(&KEY, &mut buf, 20);
        buf[0] ^= 1;
        assert_eq!(verify_inbound(&KEY, &buf, total), 0);
    }

    #[test]
    fn short_record_rejected_without_computing_mac() {
        let buf = [0u8; HMAC_SIZE];
        assert_eq!(verify_inbound(&KEY, &buf, HMAC_SIZE), 0);
        assert_eq!(verify_inbound(&KEY, &buf, 10), 0);
    }
}
