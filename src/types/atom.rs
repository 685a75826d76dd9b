//! Atoms: the smallest signed units of a molecule
//!
//! An atom records a single ledger operation. The canonical serialization of
//! an ordered atom sequence feeds the molecular hash, so the exact order of
//! appended fields here is part of the wire protocol and must not change.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::crypto::shake::shake256;
use crate::util::charset_base_convert;

/// Symbol table for base-17 molecular hashes
pub const BASE17_SYMBOLS: &str = "0123456789abcdefg";

/// Length of a molecular hash in base-17 symbols
pub const MOLECULAR_HASH_LENGTH: usize = 64;

/// A single immutable ledger operation.
///
/// `isotope` classifies the operation: `"V"` moves value, `"C"` creates a
/// token, `"M"` attaches metadata. `position` indexes the signing wallet's
/// one-time key and is a hexadecimal big integer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Atom {
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub wallet_address: String,
    #[serde(default)]
    pub isotope: String,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub meta_type: String,
    #[serde(default)]
    pub meta_id: String,
    /// Metadata entries; kept ordered so hashing is deterministic
    #[serde(default, with = "meta_wire")]
    pub meta: BTreeMap<String, String>,
    /// Slice of the molecule's one-time signature; empty until signing
    #[serde(default)]
    pub ots_fragment: String,
    /// Milliseconds since the Unix epoch
    #[serde(default, with = "millis_string")]
    pub created_at: i64,
}

impl Atom {
    /// Creates an atom with the three required fields and the current
    /// timestamp; everything else starts empty.
    pub fn new(
        position: impl Into<String>,
        wallet_address: impl Into<String>,
        isotope: impl Into<String>,
    ) -> Self {
        Self {
            position: position.into(),
            wallet_address: wallet_address.into(),
            isotope: isotope.into(),
            token: String::new(),
            value: String::new(),
            meta_type: String::new(),
            meta_id: String::new(),
            meta: BTreeMap::new(),
            ots_fragment: String::new(),
            created_at: Utc::now().timestamp_millis(),
        }
    }

    /// Canonical digest of an ordered atom sequence.
    ///
    /// For every atom the sponge absorbs the atom count, the scalar fields in
    /// declaration order, the meta entries in key order (an empty meta value
    /// is absorbed as the literal `null`), and the creation timestamp. The
    /// count is re-absorbed per atom; the ledger protocol demands it.
    pub fn hash_atoms(atoms: &[Atom]) -> Vec<u8> {
        let mut sponge = String::new();
        let count = atoms.len().to_string();

        for atom in atoms {
            sponge.push_str(&count);

            sponge.push_str(&atom.position);
            sponge.push_str(&atom.wallet_address);
            sponge.push_str(&atom.isotope);
            sponge.push_str(&atom.token);
            sponge.push_str(&atom.value);
            sponge.push_str(&atom.meta_type);
            sponge.push_str(&atom.meta_id);

            for (key, value) in &atom.meta {
                sponge.push_str(key);
                sponge.push_str(if value.is_empty() { "null" } else { value });
            }

            sponge.push_str(&atom.created_at.to_string());
        }

        shake256(sponge.as_bytes(), 256)
    }

    /// Canonical digest as lowercase hex.
    pub fn hash_atoms_hex(atoms: &[Atom]) -> String {
        hex::encode(Self::hash_atoms(atoms))
    }

    /// The molecular hash: canonical digest converted to base 17 and
    /// left-padded with `'0'` to 64 symbols.
    pub fn hash_atoms_base17(atoms: &[Atom]) -> String {
        let converted = charset_base_convert(&Self::hash_atoms_hex(atoms), 17, BASE17_SYMBOLS);

        let padding = MOLECULAR_HASH_LENGTH.saturating_sub(converted.len());

        let mut hash = String::with_capacity(MOLECULAR_HASH_LENGTH);
        hash.extend(std::iter::repeat('0').take(padding));
        hash.push_str(&converted);

        hash
    }
}

/// On the wire `meta` is a list of `{key, value}` objects; in memory it is an
/// ordered map. Entries missing either field are skipped on ingest.
mod meta_wire {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    struct MetaEntry {
        #[serde(default)]
        key: Option<String>,
        #[serde(default)]
        value: Option<String>,
    }

    pub fn serialize<S>(meta: &BTreeMap<String, String>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let entries: Vec<MetaEntry> = meta
            .iter()
            .map(|(key, value)| MetaEntry {
                key: Some(key.clone()),
                value: Some(value.clone()),
            })
            .collect();

        entries.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let entries = Vec::<MetaEntry>::deserialize(deserializer)?;

        Ok(entries
            .into_iter()
            .filter_map(|entry| Some((entry.key?, entry.value?)))
            .collect())
    }
}

/// Timestamps cross the wire as decimal strings of milliseconds.
pub(crate) mod millis_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(millis: &i64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&millis.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<i64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;

        Ok(raw.parse().unwrap_or(0))
    }
}
