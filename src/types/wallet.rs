//! Wallets: one-time signing keys derived from a user secret
//!
//! A wallet is a derived record, not stored key material: `(secret, token,
//! position)` deterministically yields the 8192-bit signing key, the public
//! address, and the bundle hash that identifies the user across positions.
//! Fresh positions make every signing key single-use.

use num_bigint::BigUint;

use crate::crypto::sealed::{decrypt_message, generate_encryption_keypair};
use crate::crypto::shake::shake256_hex;
use crate::errors::{CovalentError, CovalentResult};
use crate::util::{chunk_str, random_string};

/// Token slug assigned to wallets created without an explicit token
pub const DEFAULT_TOKEN: &str = "USER";

/// Length of a generated position in hex characters
pub const DEFAULT_SALT_LENGTH: usize = 64;

/// Alphabet for generated positions
const POSITION_ALPHABET: &str = "abcdef0123456789";

/// A derived signing identity for one `(secret, token, position)` triple.
///
/// `key` is the 2048-hex-char WOTS+ seed, `address` the 64-hex-char public
/// wallet address, `bundle` the user's stable identity hash. The attached
/// X25519 keypair serves message encryption only and never touches the
/// signature machinery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wallet {
    pub position: String,
    pub token: String,
    pub key: String,
    pub address: String,
    pub bundle: String,
    pub public_key: Vec<u8>,
    pub private_key: Vec<u8>,
}

impl Wallet {
    /// Derives a wallet for `token` at a freshly generated position.
    pub fn new(secret: &str, token: &str) -> CovalentResult<Self> {
        Self::with_position(secret, token, None, DEFAULT_SALT_LENGTH)
    }

    /// Derives a wallet for the default `USER` token.
    pub fn from_secret(secret: &str) -> CovalentResult<Self> {
        Self::new(secret, DEFAULT_TOKEN)
    }

    /// Derives a wallet at an explicit position, or at a fresh random
    /// position of `salt_length` hex characters when `position` is `None`.
    pub fn with_position(
        secret: &str,
        token: &str,
        position: Option<String>,
        salt_length: usize,
    ) -> CovalentResult<Self> {
        let position =
            position.unwrap_or_else(|| random_string(salt_length, POSITION_ALPHABET));

        let key = Self::generate_wallet_key(secret, token, &position)?;
        let address = Self::generate_wallet_address(&key);
        let bundle = Self::generate_bundle_hash(secret);
        let (public_key, private_key) = generate_encryption_keypair();

        Ok(Self {
            position,
            token: token.to_string(),
            key,
            address,
            bundle,
            public_key,
            private_key,
        })
    }

    /// Hashes the user secret to produce the wallet bundle.
    pub fn generate_bundle_hash(secret: &str) -> String {
        shake256_hex(secret, 256)
    }

    /// Derives the 2048-hex-char signing key for `(secret, token, position)`.
    ///
    /// The secret and position are hexadecimal big integers; their sum,
    /// rendered back to hex and suffixed with the token slug, is squeezed
    /// twice through SHAKE256 at 8192 bits.
    pub fn generate_wallet_key(
        secret: &str,
        token: &str,
        position: &str,
    ) -> CovalentResult<String> {
        let secret_value = parse_hex_uint(secret)?;
        let position_value = parse_hex_uint(position)?;

        // Adding the position to the user secret produces the indexed key
        let indexed_key = secret_value + position_value;

        let mut intermediate_sponge = format!("{:x}", indexed_key);
        intermediate_sponge.push_str(token);

        Ok(shake256_hex(&shake256_hex(&intermediate_sponge, 8192), 8192))
    }

    /// Derives the public wallet address from a signing key.
    ///
    /// Each of the 16 key fragments is hashed through 16 rounds of SHAKE256,
    /// which is why a signature chain walk of `8 - h` rounds plus a
    /// verification walk of `8 + h` rounds lands exactly on this address.
    pub fn generate_wallet_address(key: &str) -> String {
        let mut digest_sponge = String::with_capacity(key.len());

        for fragment in chunk_str(key, 128) {
            let mut working_fragment = fragment;

            for _ in 0..16 {
                working_fragment = shake256_hex(&working_fragment, 512);
            }

            digest_sponge.push_str(&working_fragment);
        }

        shake256_hex(&shake256_hex(&digest_sponge, 8192), 256)
    }

    /// Replaces the wallet's message-encryption keypair with a fresh one.
    pub fn regenerate_encryption_keys(&mut self) {
        let (public_key, private_key) = generate_encryption_keypair();

        self.public_key = public_key;
        self.private_key = private_key;
    }

    /// Opens a sealed-box message addressed to this wallet.
    pub fn decrypt_my_message(&self, encrypted_message: &str) -> CovalentResult<String> {
        decrypt_message(encrypted_message, &self.public_key, &self.private_key)
    }
}

fn parse_hex_uint(input: &str) -> CovalentResult<BigUint> {
    BigUint::parse_bytes(input.as_bytes(), 16)
        .ok_or_else(|| CovalentError::InvalidHex(input.to_string()))
}
