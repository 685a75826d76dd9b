//! Molecules: signed, ordered collections of atoms
//!
//! A molecule gathers the atoms of one transaction, binds them together with
//! a base-17 molecular hash, and carries a Winternitz-style one-time
//! signature distributed across the atoms as fragments.

use std::collections::BTreeMap;

use chrono::Utc;
use num_bigint::BigUint;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::crypto::shake::shake256_hex;
use crate::errors::{CovalentError, CovalentResult};
use crate::types::atom::{millis_string, Atom};
use crate::types::wallet::Wallet;
use crate::util::chunk_str;

/// An ordered, signed collection of atoms bound by a molecular hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Molecule {
    #[serde(default, deserialize_with = "nullable_string")]
    pub molecular_hash: String,
    #[serde(default)]
    pub cell_slug: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub bundle: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub atoms: Vec<Atom>,
    #[serde(default, with = "millis_string")]
    pub created_at: i64,
}

impl Molecule {
    /// Creates an empty molecule targeting the given ledger cell.
    pub fn new(cell_slug: impl Into<String>) -> Self {
        Self {
            molecular_hash: String::new(),
            cell_slug: cell_slug.into(),
            bundle: String::new(),
            status: String::new(),
            atoms: Vec::new(),
            created_at: Utc::now().timestamp_millis(),
        }
    }

    /// Appends the two atoms of a value transfer: a debit from the source
    /// wallet and a matching credit to the recipient. The remainder wallet's
    /// address and position ride along as metadata on the debit atom so the
    /// ledger can regenerate the sender's change wallet.
    pub fn init_value(
        &mut self,
        source_wallet: &Wallet,
        recipient_wallet: &Wallet,
        remainder_wallet: &Wallet,
        value: &str,
    ) -> CovalentResult<&[Atom]> {
        self.molecular_hash.clear();

        let position = parse_position(&source_wallet.position)?;

        // Debit atom removing tokens from the source
        let mut debit = Atom::new(format!("{:x}", position), &source_wallet.address, "V");
        debit.token = source_wallet.token.clone();
        debit.value = format!("-{}", value);
        debit.meta_type = "remainderWallet".to_string();
        debit.meta_id = remainder_wallet.address.clone();
        debit.meta.insert(
            "remainderPosition".to_string(),
            remainder_wallet.position.clone(),
        );
        self.atoms.push(debit);

        // Credit atom adding tokens to the recipient, at the next position
        let mut credit = Atom::new(
            format!("{:x}", position + 1u32),
            &recipient_wallet.address,
            "V",
        );
        credit.token = source_wallet.token.clone();
        credit.value = value.to_string();
        credit.meta_type = "walletBundle".to_string();
        credit.meta_id = recipient_wallet.bundle.clone();
        self.atoms.push(credit);

        Ok(&self.atoms)
    }

    /// Appends the single atom of a token issue. `token_meta` configures the
    /// new token; the recipient wallet's address and position are filled in
    /// unless the caller already provided `walletAddress` / `walletPosition`.
    pub fn init_token_creation(
        &mut self,
        source_wallet: &Wallet,
        recipient_wallet: &Wallet,
        amount: &str,
        token_meta: BTreeMap<String, String>,
    ) -> &[Atom] {
        self.molecular_hash.clear();

        let mut meta = token_meta;

        if !meta.contains_key("walletAddress") {
            meta.insert("address".to_string(), recipient_wallet.address.clone());
        }

        if !meta.contains_key("walletPosition") {
            meta.insert("position".to_string(), recipient_wallet.position.clone());
        }

        // The primary atom tells the ledger how much of the new token exists
        let mut atom = Atom::new(&source_wallet.position, &source_wallet.address, "C");
        atom.token = source_wallet.token.clone();
        atom.value = amount.to_string();
        atom.meta_type = "token".to_string();
        atom.meta_id = recipient_wallet.token.clone();
        atom.meta = meta;
        self.atoms.push(atom);

        &self.atoms
    }

    /// Appends a single metadata atom for the given subject.
    pub fn init_meta(
        &mut self,
        wallet: &Wallet,
        meta: BTreeMap<String, String>,
        meta_type: &str,
        meta_id: &str,
    ) -> &[Atom] {
        self.molecular_hash.clear();

        let mut atom = Atom::new(&wallet.position, &wallet.address, "M");
        atom.token = wallet.token.clone();
        atom.meta_type = meta_type.to_string();
        atom.meta_id = meta_id.to_string();
        atom.meta = meta;
        self.atoms.push(atom);

        &self.atoms
    }

    /// Signs the molecule with the user secret.
    ///
    /// Computes the molecular hash over the atoms in their current order,
    /// walks the per-molecule WOTS+ key `8 - h` rounds per chunk, and
    /// distributes the resulting 2048-hex-char signature across the atoms.
    /// Atoms must already be in ascending-position order; the builders emit
    /// them that way and the verifier reconciles fragments in that order.
    ///
    /// Returns the position of the last atom that received a fragment.
    pub fn sign(&mut self, secret: &str, anonymous: bool) -> CovalentResult<String> {
        let first_atom = self.atoms.first().ok_or(CovalentError::AtomsNotFound)?;

        if !anonymous {
            self.bundle = Wallet::generate_bundle_hash(secret);
        }

        self.molecular_hash = Atom::hash_atoms_base17(&self.atoms);

        // Generate the private signing key for this molecule
        let key = Wallet::generate_wallet_key(secret, &first_atom.token, &first_atom.position)?;

        debug!(
            atoms = self.atoms.len(),
            cell_slug = %self.cell_slug,
            "signing molecule"
        );

        let normalized_hash = Self::normalize(Self::enumerate(&self.molecular_hash));

        // Build the one-time signature: each of the 16 key chunks is walked
        // down its hash chain, leaving 8 - h[i] of the 16 total rounds
        let mut signature = String::with_capacity(key.len());

        for (index, chunk) in chunk_str(&key, 128).into_iter().enumerate() {
            let mut working_chunk = chunk;

            for _ in 0..(8 - i32::from(normalized_hash[index])) {
                working_chunk = shake256_hex(&working_chunk, 512);
            }

            signature.push_str(&working_chunk);
        }

        // Chunk the signature across the atoms; the last atom absorbs any
        // remainder so concatenation in atom order reproduces it exactly
        let atom_count = self.atoms.len();
        let piece_size = ((signature.len() as f64) / (atom_count as f64)).round().max(1.0) as usize;

        let mut remaining = signature.as_str();
        let mut last_position = String::new();

        for (index, atom) in self.atoms.iter_mut().enumerate() {
            let take = if index + 1 == atom_count {
                remaining.len()
            } else {
                piece_size.min(remaining.len())
            };

            let (fragment, rest) = remaining.split_at(take);
            atom.ots_fragment = fragment.to_string();
            remaining = rest;
            last_position = atom.position.clone();
        }

        Ok(last_position)
    }

    /// Maps each base-17 symbol of a molecular hash onto a signed integer in
    /// `[-8, 8]` per the fixed chain-length table. Unknown symbols are
    /// skipped.
    pub fn enumerate(hash: &str) -> Vec<i8> {
        hash.chars()
            .filter_map(|symbol| match symbol {
                '0' => Some(-8),
                '1' => Some(-7),
                '2' => Some(-6),
                '3' => Some(-5),
                '4' => Some(-4),
                '5' => Some(-3),
                '6' => Some(-2),
                '7' => Some(-1),
                '8' => Some(0),
                '9' => Some(1),
                'a' => Some(2),
                'b' => Some(3),
                'c' => Some(4),
                'd' => Some(5),
                'e' => Some(6),
                'f' => Some(7),
                'g' => Some(8),
                _ => None,
            })
            .collect()
    }

    /// Adjusts an enumerated hash until its symbols sum to exactly zero,
    /// keeping every value within `[-8, 8]`. A zero sum guarantees each
    /// signature leaks exactly half of the one-time key.
    pub fn normalize(mapped_hash: Vec<i8>) -> Vec<i8> {
        let mut normalized = mapped_hash;
        let mut total: i32 = normalized.iter().map(|&value| i32::from(value)).sum();

        // The adjustment direction is fixed up front; each pass walks the
        // whole vector and stops the moment the sum reaches zero
        let incrementing = total < 0;

        while total != 0 {
            for value in normalized.iter_mut() {
                let adjustable = if incrementing { *value < 8 } else { *value > -8 };

                if adjustable {
                    if incrementing {
                        *value += 1;
                        total += 1;
                    } else {
                        *value -= 1;
                        total -= 1;
                    }

                    if total == 0 {
                        break;
                    }
                }
            }
        }

        normalized
    }

    /// Serializes the molecule to its JSON wire form.
    pub fn to_json(&self) -> CovalentResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses a molecule from its JSON wire form.
    ///
    /// Every atom must carry a position, wallet address and isotope;
    /// anything less is rejected as malformed.
    pub fn from_json(json: &str) -> CovalentResult<Self> {
        let molecule: Molecule = serde_json::from_str(json)?;

        for atom in &molecule.atoms {
            if atom.position.is_empty() || atom.wallet_address.is_empty() || atom.isotope.is_empty()
            {
                return Err(CovalentError::AtomsMalformed);
            }
        }

        Ok(molecule)
    }
}

impl Default for Molecule {
    fn default() -> Self {
        Self::new("")
    }
}

pub(crate) fn parse_position(position: &str) -> CovalentResult<BigUint> {
    BigUint::parse_bytes(position.as_bytes(), 16)
        .ok_or_else(|| CovalentError::InvalidHex(position.to_string()))
}

fn nullable_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
