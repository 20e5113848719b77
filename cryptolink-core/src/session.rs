//! Session state — identity, keys, IVs, liveness.
//!
//! A plain struct owned by [`Engine`](crate::Engine); there is exactly one
//! of these per process, since this engine supports exactly one concurrent
//! session.

use cryptolink_crypto::{KeyPair, RsaPublicKey};
use cryptolink_types::{AES_BLOCK, AES_KEY_SIZE, DER_SIZE, HMAC_SIZE, PSK};
use zeroize::Zeroize;

pub struct SessionState {
    /// The peer's RSA-2048 public key, populated by the handshake and
    /// replaced on each new one. `None` before the first phase 1.
    pub peer_pub: Option<RsaPublicKey>,

    /// This engine's own RSA-2048 keypair, generated once at `init()` and
    /// held for the process lifetime.
    pub own_keys: KeyPair,
    /// `own_keys.public`, pre-encoded to its canonical 294-byte DER form so
    /// the handshake never has to re-encode it per record.
    pub own_pub_der: [u8; DER_SIZE],

    /// `0` means no session; any non-zero value is a live session.
    pub session_id: u64,
    /// Valid only while `session_id != 0`.
    pub aes_key: [u8; AES_KEY_SIZE],
    /// Encryption-direction IV. Equal to `dec_iv` immediately after the
    /// handshake; the two evolve independently thereafter.
    pub enc_iv: [u8; AES_BLOCK],
    /// Decryption-direction IV.
    pub dec_iv: [u8; AES_BLOCK],

    /// Monotonic timestamp (caller-supplied milliseconds) of the most
    /// recent successful command record. Meaningless while `session_id == 0`.
    pub last_seen_ms: u64,

    /// Compile-time pre-shared secret, kept as a field so the rest of the
    /// engine never has to know it's a `const` rather than provisioned
    /// per-instance.
    pub hmac_key: [u8; HMAC_SIZE],
}

impl SessionState {
    pub fn new(own_keys: KeyPair, own_pub_der: [u8; DER_SIZE]) -> Self {
        Self {
            peer_pub: None,
            own_keys,
            own_pub_der,
            session_id: 0,
            aes_key: [0; AES_KEY_SIZE],
            enc_iv: [0; AES_BLOCK],
            dec_iv: [0; AES_BLOCK],
            last_seen_ms: 0,
            hmac_key: PSK,
        }
    }

    /// `session_id != 0`, per the data model's invariant.
    pub fn is_live(&self) -> bool {
        self.session_id != 0
    }

    /// Clears session identity only — the AES/HMAC contexts are retained so
    /// the next handshake can reuse them. This matters in practice: the
    /// EXPIRED/CLOSE responses themselves are still AES-encrypted under the
    /// *about-to-be-invalidated* key before the dispatcher refuses any
    /// further command on this session, which is possible only because the
    /// session's AES state is still valid at the point of detection — so
    /// `aes_key` is deliberately left in place here and only wiped on
    /// `Drop`, once nothing can reach it anymore.
    pub fn close(&mut self) {
        self.session_id = 0;
    }

    /// Installs a freshly-negotiated session, called once at the end of
    /// phase 2.
    pub fn establish(
        &mut self,
        session_id: u64,
        aes_key: [u8; AES_KEY_SIZE],
        iv: [u8; AES_BLOCK],
        now_ms: u64,
    ) {
        self.session_id = session_id;
        self.aes_key = aes_key;
        self.enc_iv = iv;
        self.dec_iv = iv;
        self.last_seen_ms = now_ms;
    }
}

impl Drop for SessionState {
    /// Wipes the negotiated AES key and both IVs once this engine's whole
    /// `SessionState` goes away (normally: process exit). A plain derive
    /// doesn't reach here because `own_keys`/`peer_pub` (the `rsa` crate's
    /// key types) don't implement `Zeroize`, so the wipe is scoped to the
    /// fields that do.
    fn drop(&mut self) {
        self.aes_key.zeroize();
        self.enc_iv.zeroize();
        self.dec_iv.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    fn state() -> SessionState {
        let mut rng = OsRng;
        let keys = cryptolink_crypto::generate_keypair(&mut rng).unwrap();
        let mut der = [0u8; DER_SIZE];
        cryptolink_crypto::der_encode(&keys.public, &mut der).unwrap();
        SessionState::new(keys, der)
    }

    #[test]
    fn starts_with_no_session() {
        let s = state();
        assert!(!s.is_live());
    }

    #[test]
    fn establish_then_close_clears_identity_but_keeps_aes_state() {
        let mut s = state();
        s.establish(42, [1; AES_KEY_SIZE], [2; AES_BLOCK], 1_000);
        assert!(s.is_live());
        s.close();
        assert!(!s.is_live());
        assert_eq!(s.aes_key, [1; AES_KEY_SIZE]);
    }
}
