//! Sealed-box message encryption over wallet-attached keypairs
//!
//! Anonymous public-key encryption: the sender generates an ephemeral X25519
//! keypair, derives a symmetric key from the Diffie-Hellman shared secret and
//! both public keys, and seals the message with XChaCha20-Poly1305. The
//! ephemeral public key is prepended to the ciphertext, so only the
//! recipient's keypair is needed to open the box.
//!
//! This utility is independent of the molecular signature machinery.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    Key, XChaCha20Poly1305, XNonce,
};
use rand::rngs::OsRng;
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};

use crate::crypto::shake::shake256;
use crate::errors::{CovalentError, CovalentResult};
use crate::util::from_hex;

/// X25519 public key size in bytes
pub const PUBLIC_KEY_SIZE: usize = 32;

/// X25519 secret key size in bytes
pub const SECRET_KEY_SIZE: usize = 32;

/// Poly1305 authentication tag size in bytes
const TAG_SIZE: usize = 16;

/// Bytes a sealed box adds on top of the plaintext: ephemeral key + tag
pub const SEAL_OVERHEAD: usize = PUBLIC_KEY_SIZE + TAG_SIZE;

/// Generates a fresh X25519 keypair as `(public, secret)` byte vectors.
pub fn generate_encryption_keypair() -> (Vec<u8>, Vec<u8>) {
    let secret = StaticSecret::random_from_rng(OsRng);
    let public = PublicKey::from(&secret);

    (public.as_bytes().to_vec(), secret.to_bytes().to_vec())
}

/// Encrypts a message with the recipient's public key.
///
/// Returns the sealed box as a lowercase hex string of
/// `ephemeral_public_key || ciphertext || tag`. An empty message encrypts to
/// an empty string.
pub fn encrypt_message(message: &str, recipient_public: &[u8]) -> CovalentResult<String> {
    if message.is_empty() {
        return Ok(String::new());
    }

    let recipient = public_key_from(recipient_public)?;

    let ephemeral_secret = EphemeralSecret::random_from_rng(OsRng);
    let ephemeral_public = PublicKey::from(&ephemeral_secret);
    let shared = ephemeral_secret.diffie_hellman(&recipient);

    let key = seal_key(shared.as_bytes(), &ephemeral_public, &recipient);
    let nonce = seal_nonce(&ephemeral_public, &recipient);

    let cipher = XChaCha20Poly1305::new(Key::from_slice(&key));
    let ciphertext = cipher
        .encrypt(XNonce::from_slice(&nonce), message.as_bytes())
        .map_err(|_| CovalentError::Crypto("sealed-box encryption failed".to_string()))?;

    let mut sealed = ephemeral_public.as_bytes().to_vec();
    sealed.extend_from_slice(&ciphertext);

    Ok(hex::encode(sealed))
}

/// Opens a sealed box with the recipient's keypair.
///
/// Accepts the hex string produced by [`encrypt_message`] and returns the
/// plaintext as UTF-8. An empty input decrypts to an empty string.
pub fn decrypt_message(
    encrypted_message: &str,
    recipient_public: &[u8],
    recipient_secret: &[u8],
) -> CovalentResult<String> {
    if encrypted_message.is_empty() {
        return Ok(String::new());
    }

    let recipient = public_key_from(recipient_public)?;
    let secret = secret_key_from(recipient_secret)?;

    let sealed = from_hex(encrypted_message)?;

    if sealed.len() < SEAL_OVERHEAD {
        return Err(CovalentError::Crypto(
            "sealed box shorter than its overhead".to_string(),
        ));
    }

    if sealed.len() == SEAL_OVERHEAD {
        return Ok(String::new());
    }

    let (ephemeral_bytes, ciphertext) = sealed.split_at(PUBLIC_KEY_SIZE);
    let mut ephemeral_array = [0u8; PUBLIC_KEY_SIZE];
    ephemeral_array.copy_from_slice(ephemeral_bytes);
    let ephemeral = PublicKey::from(ephemeral_array);

    let shared = secret.diffie_hellman(&ephemeral);

    let key = seal_key(shared.as_bytes(), &ephemeral, &recipient);
    let nonce = seal_nonce(&ephemeral, &recipient);

    let cipher = XChaCha20Poly1305::new(Key::from_slice(&key));
    let plaintext = cipher
        .decrypt(XNonce::from_slice(&nonce), ciphertext)
        .map_err(|_| CovalentError::Crypto("sealed-box decryption failed".to_string()))?;

    String::from_utf8(plaintext)
        .map_err(|_| CovalentError::Crypto("decrypted message is not valid UTF-8".to_string()))
}

/// Symmetric key bound to the shared secret and both public keys
fn seal_key(shared: &[u8], ephemeral: &PublicKey, recipient: &PublicKey) -> Vec<u8> {
    let mut input = Vec::with_capacity(shared.len() + PUBLIC_KEY_SIZE * 2);
    input.extend_from_slice(shared);
    input.extend_from_slice(ephemeral.as_bytes());
    input.extend_from_slice(recipient.as_bytes());

    shake256(&input, 256)
}

/// Deterministic nonce bound to both public keys, as in a classic sealed box
fn seal_nonce(ephemeral: &PublicKey, recipient: &PublicKey) -> Vec<u8> {
    let mut input = Vec::with_capacity(PUBLIC_KEY_SIZE * 2);
    input.extend_from_slice(ephemeral.as_bytes());
    input.extend_from_slice(recipient.as_bytes());

    shake256(&input, 192)
}

fn public_key_from(bytes: &[u8]) -> CovalentResult<PublicKey> {
    let array: [u8; PUBLIC_KEY_SIZE] =
        bytes
            .try_into()
            .map_err(|_| CovalentError::KeySizeMismatch {
                expected: PUBLIC_KEY_SIZE,
                actual: bytes.len(),
            })?;

    Ok(PublicKey::from(array))
}

fn secret_key_from(bytes: &[u8]) -> CovalentResult<StaticSecret> {
    let array: [u8; SECRET_KEY_SIZE] =
        bytes
            .try_into()
            .map_err(|_| CovalentError::KeySizeMismatch {
                expected: SECRET_KEY_SIZE,
                actual: bytes.len(),
            })?;

    Ok(StaticSecret::from(array))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let (public, secret) = generate_encryption_keypair();

        let sealed = encrypt_message("a private note", &public).unwrap();
        let opened = decrypt_message(&sealed, &public, &secret).unwrap();

        assert_eq!(opened, "a private note");
    }

    #[test]
    fn test_empty_message() {
        let (public, secret) = generate_encryption_keypair();

        assert_eq!(encrypt_message("", &public).unwrap(), "");
        assert_eq!(decrypt_message("", &public, &secret).unwrap(), "");
    }

    #[test]
    fn test_overhead_size() {
        let (public, _) = generate_encryption_keypair();

        let sealed = encrypt_message("abc", &public).unwrap();
        // hex doubles the byte length
        assert_eq!(sealed.len(), (SEAL_OVERHEAD + 3) * 2);
    }

    #[test]
    fn test_wrong_key_size() {
        let result = encrypt_message("msg", &[0u8; 31]);
        assert!(matches!(
            result,
            Err(CovalentError::KeySizeMismatch {
                expected: 32,
                actual: 31
            })
        ));
    }

    #[test]
    fn test_wrong_recipient_fails() {
        let (public, _) = generate_encryption_keypair();
        let (other_public, other_secret) = generate_encryption_keypair();

        let sealed = encrypt_message("for someone else", &public).unwrap();
        let result = decrypt_message(&sealed, &other_public, &other_secret);

        assert!(matches!(result, Err(CovalentError::Crypto(_))));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let (public, secret) = generate_encryption_keypair();

        let sealed = encrypt_message("integrity matters", &public).unwrap();
        let mut bytes = from_hex(&sealed).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;

        let result = decrypt_message(&hex::encode(bytes), &public, &secret);
        assert!(matches!(result, Err(CovalentError::Crypto(_))));
    }
}
