//! String and number utilities shared by the wallet and molecule machinery

use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};
use rand::rngs::OsRng;
use rand::Rng;

use crate::errors::CovalentResult;

/// Decodes a lowercase hex string into bytes.
///
/// A trailing odd nibble is ignored; only complete byte pairs are decoded.
pub fn from_hex(input: &str) -> CovalentResult<Vec<u8>> {
    let bytes = input.as_bytes();
    let even_len = bytes.len() - (bytes.len() % 2);

    Ok(hex::decode(&bytes[..even_len])?)
}

/// Splits a string into chunks of `size` bytes; the last chunk may be shorter.
pub fn chunk_str(input: &str, size: usize) -> Vec<String> {
    if size == 0 {
        return Vec::new();
    }

    input
        .as_bytes()
        .chunks(size)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect()
}

/// Generates a random string of `length` characters drawn uniformly from
/// `alphabet` using the operating system's CSPRNG.
pub fn random_string(length: usize, alphabet: &str) -> String {
    let symbols: Vec<char> = alphabet.chars().collect();

    if symbols.is_empty() {
        return String::new();
    }

    let mut rng = OsRng;

    (0..length)
        .map(|_| symbols[rng.gen_range(0..symbols.len())])
        .collect()
}

/// Converts a hexadecimal number into another base rendered with the given
/// symbol table.
///
/// The conversion is exact big-integer division. Zero converts to the single
/// zero symbol; the caller is responsible for any left-padding. Empty input,
/// a symbol table shorter than `base_to`, or non-hex input all yield an
/// empty string.
pub fn charset_base_convert(hex_input: &str, base_to: u32, symbol_table: &str) -> String {
    let symbols: Vec<char> = symbol_table.chars().collect();

    if hex_input.is_empty() || symbols.len() < base_to as usize {
        return String::new();
    }

    let mut value = match BigUint::parse_bytes(hex_input.as_bytes(), 16) {
        Some(value) => value,
        None => return String::new(),
    };

    let base = BigUint::from(base_to);
    let mut converted = Vec::new();

    loop {
        // the remainder is always below base_to, so it fits in a u32
        let digit = (&value % &base).to_u32().unwrap_or(0) as usize;
        converted.push(symbols[digit]);
        value /= &base;

        if value.is_zero() {
            break;
        }
    }

    converted.iter().rev().collect()
}
