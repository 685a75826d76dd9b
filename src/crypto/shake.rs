//! SHAKE256 extendable-output hashing
//!
//! Every digest in the ledger protocol is produced by SHAKE256 squeezed to a
//! caller-chosen length: 256 bits for addresses and bundles, 512 bits for
//! signature chain steps, 8192 bits for key material.

use sha3::{
    digest::{ExtendableOutput, Update, XofReader},
    Shake256,
};

/// SHAKE256 over `input`, squeezed to `output_bits / 8` bytes.
///
/// `output_bits` must be a positive multiple of 8. Empty input yields an
/// empty output, matching the rest of the protocol's treatment of empty
/// strings as absent data.
pub fn shake256(input: &[u8], output_bits: usize) -> Vec<u8> {
    if input.is_empty() || output_bits == 0 {
        return Vec::new();
    }

    let mut hasher = Shake256::default();
    hasher.update(input);

    let mut output = vec![0u8; output_bits / 8];
    hasher.finalize_xof().read(&mut output);

    output
}

/// SHAKE256 of a string, as a lowercase hex string of `output_bits / 4` chars.
pub fn shake256_hex(input: &str, output_bits: usize) -> String {
    hex::encode(shake256(input.as_bytes(), output_bits))
}
