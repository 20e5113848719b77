//! RSA-2048 key material — generation, DER (SPKI) codec, PKCS#1 v1.5
//! encrypt/decrypt, and sign/verify of the raw 32-byte PSK digest.
//!
//! PKCS1v15 throughout, not OAEP/PSS, for both encryption and signing.

use alloc::vec::Vec;

use cryptolink_types::{DER_SIZE, HMAC_SIZE, RSA_EXP, RSA_SIZE};
use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::pkcs8::{DecodePublicKey, EncodePublicKey};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;

use crate::{trace_secret, CryptoError};

/// An RSA-2048 keypair generated fresh for one handshake. The private half
/// never touches the wire; only its public half is ever DER-encoded.
pub struct KeyPair {
    pub private: RsaPrivateKey,
    pub public: RsaPublicKey,
}

/// Generates a fresh RSA-2048 keypair with the public exponent fixed at
/// [`RSA_EXP`] (65537), matching mbedtls's default.
pub fn generate_keypair<R: rsa::rand_core::CryptoRngCore>(rng: &mut R) -> Result<KeyPair, CryptoError> {
    let exp = BigUint::from(RSA_EXP);
    let private =
        RsaPrivateKey::new_with_exp(rng, RSA_SIZE * 8, &exp).map_err(|_| CryptoError::Rejected)?;
    let public = RsaPublicKey::from(&private);
    Ok(KeyPair { private, public })
}

/// Encodes `key` as canonical DER (SubjectPublicKeyInfo), writing exactly
/// [`DER_SIZE`] bytes into `out`.
pub fn der_encode(key: &RsaPublicKey, out: &mut [u8; DER_SIZE]) -> Result<(), CryptoError> {
    let der = key
        .to_public_key_der()
        .map_err(|_| CryptoError::MalformedKey)?;
    let bytes = der.as_bytes();
    if bytes.len() != DER_SIZE {
        return Err(CryptoError::WrongLength);
    }
    out.copy_from_slice(bytes);
    Ok(())
}

/// Parses a peer's DER-encoded (SubjectPublicKeyInfo) RSA-2048 public key.
pub fn der_decode(der: &[u8; DER_SIZE]) -> Result<RsaPublicKey, CryptoError> {
    let key = RsaPublicKey::from_public_key_der(der).map_err(|_| {
        trace_secret!("rejected peer DER public key: not a valid RSA SubjectPublicKeyInfo");
        CryptoError::MalformedKey
    })?;
    if key.size() != RSA_SIZE {
        trace_secret!("rejected peer DER public key: wrong modulus size");
        return Err(CryptoError::WrongLength);
    }
    trace_secret!("accepted peer DER public key");
    Ok(key)
}

/// Encrypts `plaintext` (at most ~214 bytes under PKCS1v15 for a 2048-bit
/// key) to `peer`, writing exactly [`RSA_SIZE`] bytes of ciphertext.
pub fn rsa_encrypt<R: rsa::rand_core::CryptoRngCore>(
    rng: &mut R,
    peer: &RsaPublicKey,
    plaintext: &[u8],
    out: &mut [u8; RSA_SIZE],
) -> Result<(), CryptoError> {
    let ciphertext = peer
        .encrypt(rng, Pkcs1v15Encrypt, plaintext)
        .map_err(|_| CryptoError::Rejected)?;
    if ciphertext.len() != RSA_SIZE {
        return Err(CryptoError::WrongLength);
    }
    out.copy_from_slice(&ciphertext);
    Ok(())
}

/// Decrypts one [`RSA_SIZE`]-byte RSA ciphertext block with our own private
/// key, returning the recovered plaintext.
pub fn rsa_decrypt(
    private: &RsaPrivateKey,
    ciphertext: &[u8; RSA_SIZE],
) -> Result<Vec<u8>, CryptoError> {
    private.decrypt(Pkcs1v15Encrypt, ciphertext).map_err(|_| {
        trace_secret!("RSA decrypt rejected a ciphertext block");
        CryptoError::Rejected
    })
}

/// Signs the 32-byte PSK directly as a pre-hashed PKCS#1 v1.5 `SHA-256`
/// digest — the firmware passes the PSK straight to `mbedtls_pk_sign` as
/// the already-computed hash, never re-hashing it, so we match that here
/// rather than hashing it ourselves.
pub fn rsa_sign_digest(
    private: &RsaPrivateKey,
    digest: &[u8; HMAC_SIZE],
    out: &mut [u8; RSA_SIZE],
) -> Result<(), CryptoError> {
    let signing_key = SigningKey::<Sha256>::new_with_prefix(private.clone());
    let signature = signing_key
        .try_sign_prehash(digest)
        .map_err(|_| CryptoError::Rejected)?;
    let bytes = signature.to_bytes();
    if bytes.len() != RSA_SIZE {
        return Err(CryptoError::WrongLength);
    }
    out.copy_from_slice(&bytes);
    Ok(())
}

/// Verifies a signature over the 32-byte PSK digest against `peer`.
pub fn rsa_verify_digest(
    peer: &RsaPublicKey,
    digest: &[u8; HMAC_SIZE],
    signature: &[u8; RSA_SIZE],
) -> Result<(), CryptoError> {
    let verifying_key = VerifyingKey::<Sha256>::new(peer.clone());
    let signature = Signature::try_from(signature.as_slice()).map_err(|_| {
        trace_secret!("rejected handshake signature: malformed PKCS#1 v1.5 signature bytes");
        CryptoError::MalformedKey
    })?;
    verifying_key.verify_prehash(digest, &signature).map_err(|_| {
        trace_secret!("rejected handshake signature: PSK digest verification failed");
        CryptoError::Rejected
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn der_round_trips() {
        let mut rng = OsRng;
        let kp = generate_keypair(&mut rng).unwrap();
        let mut der = [0u8; DER_SIZE];
        der_encode(&kp.public, &mut der).unwrap();
        let decoded = der_decode(&der).unwrap();
        assert_eq!(decoded, kp.public);
    }

    #[test]
    fn rsa_round_trips() {
        let mut rng = OsRng;
        let kp = generate_keypair(&mut rng).unwrap();
        let plaintext = b"handshake phase payload";
        let mut ciphertext = [0u8; RSA_SIZE];
        rsa_encrypt(&mut rng, &kp.public, plaintext, &mut ciphertext).unwrap();
        let recovered = rsa_decrypt(&kp.private, &ciphertext).unwrap();
        assert_eq!(recovered, plaintext);
    }

    #[test]
    fn sign_then_verify_psk_digest_succeeds() {
        let mut rng = OsRng;
        let kp = generate_keypair(&mut rng).unwrap();
        let digest = cryptolink_types::PSK;
        let mut signature = [0u8; RSA_SIZE];
        rsa_sign_digest(&kp.private, &digest, &mut signature).unwrap();
        assert!(rsa_verify_digest(&kp.public, &digest, &signature).is_ok());
    }

    #[test]
    fn verify_rejects_wrong_digest() {
        let mut rng = OsRng;
        let kp = generate_keypair(&mut rng).unwrap();
        let digest = cryptolink_types::PSK;
        let mut signature = [0u8; RSA_SIZE];
        rsa_sign_digest(&kp.private, &digest, &mut signature).unwrap();
        let wrong_digest = [0u8; HMAC_SIZE];
        assert!(rsa_verify_digest(&kp.public, &wrong_digest, &signature).is_err());
    }
}
