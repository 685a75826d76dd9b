//! Molecule verification
//!
//! Verification is read-only and has three independent legs: the molecular
//! hash must match the atoms, the one-time signature fragments must
//! reconstruct the sender's wallet address, and value movements must
//! conserve every token.

use std::collections::BTreeMap;

use num_bigint::BigUint;
use rust_decimal::Decimal;
use tracing::debug;

use crate::crypto::shake::shake256_hex;
use crate::errors::{CovalentError, CovalentResult};
use crate::types::atom::Atom;
use crate::types::molecule::Molecule;
use crate::util::chunk_str;

/// Verifies a molecule: hash integrity, signature, and value conservation.
///
/// Returns `false` for semantic failures; fails with [`CovalentError`] only
/// when an input is structurally unparseable.
pub fn verify(molecule: &Molecule) -> CovalentResult<bool> {
    Ok(verify_molecular_hash(molecule)
        && verify_ots(molecule)
        && verify_token_isotope_v(molecule)?)
}

/// Recomputes the molecular hash over the stored atom order and compares it
/// against the recorded one.
pub fn verify_molecular_hash(molecule: &Molecule) -> bool {
    if molecule.atoms.is_empty() || molecule.molecular_hash.is_empty() {
        return false;
    }

    Atom::hash_atoms_base17(&molecule.atoms) == molecule.molecular_hash
}

/// Checks the one-time signature by walking every fragment chunk the
/// remaining `8 + h` rounds of its hash chain and squeezing the result into
/// a wallet address, which must match the sender's.
///
/// Fragments are concatenated with atoms sorted by position as a hex big
/// integer, the canonical ordering the signer's distribution reconciles
/// against.
pub fn verify_ots(molecule: &Molecule) -> bool {
    if molecule.atoms.is_empty() || molecule.molecular_hash.is_empty() {
        return false;
    }

    let mut atoms = molecule.atoms.clone();
    atoms.sort_by_cached_key(|atom| {
        BigUint::parse_bytes(atom.position.as_bytes(), 16).unwrap_or_default()
    });

    let normalized_hash = Molecule::normalize(Molecule::enumerate(&molecule.molecular_hash));

    let ots: String = atoms
        .iter()
        .map(|atom| atom.ots_fragment.as_str())
        .collect();

    let mut key_fragments = String::with_capacity(ots.len());

    for (index, chunk) in chunk_str(&ots, 128).into_iter().enumerate() {
        let mut working_chunk = chunk;

        // complements the signer's walk so each chain totals 16 rounds
        let rounds = 8 + i32::from(normalized_hash.get(index).copied().unwrap_or(0));

        for _ in 0..rounds {
            working_chunk = shake256_hex(&working_chunk, 512);
        }

        key_fragments.push_str(&working_chunk);
    }

    let digest = shake256_hex(&key_fragments, 8192);
    let address = shake256_hex(&digest, 256);

    let matches = Some(address.as_str())
        == atoms.first().map(|atom| atom.wallet_address.as_str());

    if !matches {
        debug!("one-time signature does not reconstruct the sender address");
    }

    matches
}

/// Checks value conservation: for every token touched by V-isotope atoms,
/// the sum of their values must be exactly zero.
///
/// Fails with [`CovalentError::InvalidValue`] when a value does not parse as
/// a complete decimal number.
pub fn verify_token_isotope_v(molecule: &Molecule) -> CovalentResult<bool> {
    if molecule.atoms.is_empty() || molecule.molecular_hash.is_empty() {
        return Ok(false);
    }

    let mut sums: BTreeMap<&str, Decimal> = BTreeMap::new();

    for atom in &molecule.atoms {
        if atom.isotope != "V" {
            continue;
        }

        let value: Decimal = atom
            .value
            .parse()
            .map_err(|_| CovalentError::InvalidValue(atom.value.clone()))?;

        *sums.entry(atom.token.as_str()).or_default() += value;
    }

    Ok(sums.values().all(Decimal::is_zero))
}
