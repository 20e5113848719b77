//! Single-block AES-256-CBC stepping.
//!
//! The engine never buffers a multi-block message: every record is exactly
//! one 16-byte block, and the two directions keep independently-evolving
//! IVs rather than a single shared counter. That rules out using
//! `cbc::Encryptor`/`Decryptor` as a streaming object held across calls —
//! instead each call here is handed the IV it should use and returns the
//! IV the caller should use next (the ciphertext block itself, per CBC).

use aes::Aes256;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use cryptolink_types::{AES_BLOCK, AES_KEY_SIZE};

type Encryptor = cbc::Encryptor<Aes256>;
type Decryptor = cbc::Decryptor<Aes256>;

/// Encrypts one 16-byte `block` in place under `key`/`iv`. Returns the
/// ciphertext block, which is also the IV to pass on the next call.
pub fn cbc_step_encrypt(
    key: &[u8; AES_KEY_SIZE],
    iv: &[u8; AES_BLOCK],
    block: &mut [u8; AES_BLOCK],
) -> [u8; AES_BLOCK] {
    let enc = Encryptor::new(key.into(), iv.into());
    enc.encrypt_block_mut(block.into());
    *block
}

/// Decrypts one 16-byte `block` in place under `key`/`iv`. The IV to pass
/// on the next call is the *original* ciphertext, so the caller must save
/// it before calling this (the block is overwritten with plaintext).
pub fn cbc_step_decrypt(
    key: &[u8; AES_KEY_SIZE],
    iv: &[u8; AES_BLOCK],
    block: &mut [u8; AES_BLOCK],
) {
    let dec = Decryptor::new(key.into(), iv.into());
    dec.decrypt_block_mut(block.into());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_then_decrypt_recovers_plaintext() {
        let key = [0x11u8; AES_KEY_SIZE];
        let iv = [0x22u8; AES_BLOCK];
        let plaintext = [0xABu8; AES_BLOCK];

        let mut enc_block = plaintext;
        let ciphertext = cbc_step_encrypt(&key, &iv, &mut enc_block);
        assert_ne!(ciphertext, plaintext);

        let mut dec_block = ciphertext;
        cbc_step_decrypt(&key, &iv, &mut dec_block);
        assert_eq!(dec_block, plaintext);
    }

    #[test]
    fn iv_lockstep_matches_independent_chains() {
        let key = [0x33u8; AES_KEY_SIZE];
        let mut enc_iv = [0x44u8; AES_BLOCK];
        let mut dec_iv = enc_iv;

        let mut block = [1u8; AES_BLOCK];
        enc_iv = cbc_step_encrypt(&key, &enc_iv, &mut block);
        let ciphertext1 = block;

        let mut recv = ciphertext1;
        cbc_step_decrypt(&key, &dec_iv, &mut recv);
        dec_iv = ciphertext1;
        assert_eq!(recv, [1u8; AES_BLOCK]);

        let mut block2 = [2u8; AES_BLOCK];
        enc_iv = cbc_step_encrypt(&key, &enc_iv, &mut block2);
        let ciphertext2 = block2;

        let mut recv2 = ciphertext2;
        cbc_step_decrypt(&key, &dec_iv, &mut recv2);
        let _ = dec_iv;
        assert_eq!(recv2, [2u8; AES_BLOCK]);
    }
}
