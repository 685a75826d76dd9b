//! Cryptographic primitives: SHAKE256 hashing and sealed-box messaging

pub mod sealed;
pub mod shake;

pub use sealed::{decrypt_message, encrypt_message, generate_encryption_keypair};
pub use shake::{shake256, shake256_hex};
