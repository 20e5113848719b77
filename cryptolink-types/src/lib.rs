//! Wire-format constants and record layouts for the secure session protocol.
//!
//! This crate carries no logic beyond byte-layout and is `no_std` +
//! alloc-free: the shapes on the wire are a separate, reusable concern
//! from the crypto operating on them.
#![no_std]

use zerocopy::{little_endian, AsBytes, FromBytes, FromZeroes};

/// RSA modulus size in bytes (RSA-2048).
pub const RSA_SIZE: usize = 256;
/// Size of a peer's RSA public key in canonical DER (SPKI) form.
pub const DER_SIZE: usize = 294;
/// AES-256 key size in bytes.
pub const AES_KEY_SIZE: usize = 32;
/// AES block size in bytes.
pub const AES_BLOCK: usize = 16;
/// HMAC-SHA-256 output size in bytes.
pub const HMAC_SIZE: usize = 32;
/// RSA public exponent used for key generation.
pub const RSA_EXP: u64 = 65_537;
/// Inactivity deadline enforced on the command channel, in milliseconds.
pub const KEEP_ALIVE_MS: u64 = 60_000;
/// Format-version sentinel living at plaintext byte 15 of every command record.
pub const FORMAT_MARKER: u8 = 0x09;

/// Capacity of the scratch buffer used for the top-level (record-boundary)
/// read. It is a capacity bound, not every record's exact length — see
/// [`Link::read_exact`](../cryptolink_core/trait.Link.html) for how a
/// shorter record is handled.
pub const MAX_TOP_LEVEL_RECORD: usize = DER_SIZE + RSA_SIZE;

/// Payload length of a phase-1 handshake request (the peer's DER public key).
pub const PHASE1_REQUEST_LEN: usize = DER_SIZE;
/// Payload length of the phase-1 response the engine sends back (two RSA blocks).
pub const PHASE1_RESPONSE_A_LEN: usize = 2 * RSA_SIZE;
/// Payload length of the phase-1 request-B the peer sends (three RSA blocks).
pub const PHASE1_REQUEST_B_LEN: usize = 3 * RSA_SIZE;
/// Payload length of the phase-1 final `"OKAY"` acknowledgement.
pub const PHASE1_RESPONSE_B_LEN: usize = RSA_SIZE;
/// Payload length of a phase-2 (session establishment) request.
pub const PHASE2_REQUEST_LEN: usize = 2 * RSA_SIZE;
/// Payload length of the phase-2 response (the session packet).
pub const PHASE2_RESPONSE_LEN: usize = RSA_SIZE;
/// Payload length of a command-channel record in either direction.
pub const COMMAND_LEN: usize = AES_BLOCK;

/// Pre-shared secret, identical on both peers. Keys the HMAC framing and is
/// signed (directly, with no additional hash) to authenticate each handshake.
pub const PSK: [u8; HMAC_SIZE] = [
    0x29, 0x49, 0xde, 0xc2, 0x3e, 0x1e, 0x34, 0xb5, 0x2d, 0x22, 0xb5, 0xba, 0x4c, 0x34, 0x23, 0x3a,
    0x9d, 0x3f, 0xe2, 0x97, 0x14, 0xbe, 0x24, 0x62, 0x81, 0x0c, 0x86, 0xb1, 0xf6, 0x92, 0x54, 0xd6,
];

/// Command-channel opcode, carried at plaintext byte 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    Close = 0x00,
    ToggleLed = 0x01,
    GetTemperature = 0x02,
}

impl Opcode {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x00 => Some(Self::Close),
            0x01 => Some(Self::ToggleLed),
            0x02 => Some(Self::GetTemperature),
            _ => None,
        }
    }
}

/// Status byte carried at response plaintext byte 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StatusCode {
    Okay = 0,
    Error = 1,
    Expired = 2,
    HashError = 3,
    BadRequest = 4,
    InvalidSession = 5,
}

/// What the dispatcher learned from the most recent record, returned to the
/// outer loop by `Engine::step()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestTag {
    /// Nothing actionable happened (handshake step completed internally, or
    /// the record was rejected and a response already sent/suppressed).
    None,
    HandshakePhase1,
    HandshakePhase2,
    ToggleLed,
    GetTemperature,
    Close,
    Error,
}

/// The 16-byte command-channel plaintext, both directions.
///
/// Layout: `[opcode, session_id (8 bytes LE), reserved (6 bytes), marker]`.
#[derive(Debug, Clone, Copy, FromBytes, FromZeroes, AsBytes)]
#[repr(C)]
pub struct CommandPlaintext {
    pub opcode: u8,
    pub session_id: little_endian::U64,
    pub reserved: [u8; 6],
    pub marker: u8,
}

impl CommandPlaintext {
    pub fn request(opcode: u8, session_id: u64) -> Self {
        Self {
            opcode,
            session_id: little_endian::U64::new(session_id),
            reserved: [0; 6],
            marker: FORMAT_MARKER,
        }
    }
}

/// The 16-byte command-channel response plaintext.
///
/// Layout: `[status, payload (15 bytes, ASCII, zero-padded)]`.
#[derive(Debug, Clone, Copy, FromBytes, FromZeroes, AsBytes)]
#[repr(C)]
pub struct ResponsePlaintext {
    pub status: u8,
    pub payload: [u8; AES_BLOCK - 1],
}

impl ResponsePlaintext {
    pub fn new(status: StatusCode, payload: &[u8]) -> Self {
        let mut out = Self {
            status: status as u8,
            payload: [0; AES_BLOCK - 1],
        };
        let n = payload.len().min(out.payload.len());
        out.payload[..n].copy_from_slice(&payload[..n]);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_match_wire_formats() {
        assert_eq!(core::mem::size_of::<CommandPlaintext>(), AES_BLOCK);
        assert_eq!(core::mem::size_of::<ResponsePlaintext>(), AES_BLOCK);
        assert_eq!(PHASE1_REQUEST_LEN, 294);
        assert_eq!(PHASE1_RESPONSE_A_LEN, 512);
        assert_eq!(PHASE1_REQUEST_B_LEN, 768);
        assert_eq!(PHASE1_RESPONSE_B_LEN, 256);
        assert_eq!(PHASE2_REQUEST_LEN, 512);
        assert_eq!(PHASE2_RESPONSE_LEN, 256);
        assert_eq!(COMMAND_LEN, 16);
        assert_eq!(MAX_TOP_LEVEL_RECORD, 550);
    }

    #[test]
    fn command_plaintext_roundtrips_session_id() {
        let cmd = CommandPlaintext::request(0x02, 0xDEAD_BEEF_0000_0001);
        assert_eq!(cmd.session_id.get(), 0xDEAD_BEEF_0000_0001);
        assert_eq!(cmd.marker, FORMAT_MARKER);
    }
}
