//! Cryptographic primitive glue for the secure session protocol: RSA-2048
//! key exchange material, AES-256-CBC single-block stepping, and the
//! HMAC-SHA-256 record framing that authenticates every record on the wire.
//!
//! `no_std` + `alloc` (the `rsa` crate needs a heap for its bignum work).
//! The crypto crate knows nothing about sessions, handshake phases, or
//! opcodes — that lives one layer up in `cryptolink-core`.
#![no_std]

extern crate alloc;

#[cfg(any(test, cryptolink_unsafe_logging))]
extern crate std;

/// Emits a trace line only in test builds or when the
/// `cryptolink_unsafe_logging` cfg is set. Gated this way because the only
/// things worth tracing here are key material and decrypted plaintext.
macro_rules! trace_secret {
    ($($t:tt)*) => {
        match core::format_args!($($t)*) {
            #[cfg(any(test, cryptolink_unsafe_logging))]
            args => ::std::eprintln!("{args}"),
            #[cfg(not(any(test, cryptolink_unsafe_logging)))]
            _ => {}
        };
    }
}
pub(crate) use trace_secret;

mod aes_cbc;
mod mac;
mod rsa_ops;

pub use aes_cbc::{cbc_step_decrypt, cbc_step_encrypt};
pub use mac::{frame_outbound, verify_inbound};
pub use rsa_ops::{
    der_decode, der_encode, generate_keypair, rsa_decrypt, rsa_encrypt, rsa_sign_digest,
    rsa_verify_digest, KeyPair,
};

pub use rsa::{RsaPrivateKey, RsaPublicKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptoError {
    /// DER public key failed to parse, or was not an RSA key.
    MalformedKey,
    /// RSA encrypt/decrypt/sign/verify failed (includes signature mismatch).
    Rejected,
    /// A ciphertext decrypted to the wrong length for its context.
    WrongLength,
}

impl core::fmt::Display for CryptoError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg = match self {
            Self::MalformedKey => "malformed or non-RSA public key",
            Self::Rejected => "RSA operation rejected",
            Self::WrongLength => "decrypted plaintext had unexpected length",
        };
        f.write_str(msg)
    }
}
