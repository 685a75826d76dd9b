// End-to-end molecule lifecycle: build -> sign -> serialize -> parse -> verify

use std::collections::BTreeMap;

use covalent::{
    verify, verify_molecular_hash, verify_ots, verify_token_isotope_v, CovalentError, Molecule,
    Wallet,
};

const SECRET: &str = "0123456789abcdef";

fn user_secret() -> String {
    SECRET.repeat(128)
}

fn fresh_wallet(secret: &str) -> Wallet {
    Wallet::from_secret(secret).unwrap()
}

#[test]
fn value_transfer_round_trip() {
    let secret = user_secret();

    let source = fresh_wallet(&secret);
    let recipient = fresh_wallet(&secret);
    let remainder = fresh_wallet(&secret);

    let mut molecule = Molecule::new("main");
    molecule
        .init_value(&source, &recipient, &remainder, "100")
        .unwrap();
    molecule.sign(&secret, false).unwrap();

    // across the wire and back
    let json = molecule.to_json().unwrap();
    let received = Molecule::from_json(&json).unwrap();

    assert_eq!(received, molecule);
    assert!(verify(&received).unwrap());
}

#[test]
fn value_transfer_tamper_detection() {
    let secret = user_secret();

    let source = fresh_wallet(&secret);
    let recipient = fresh_wallet(&secret);
    let remainder = fresh_wallet(&secret);

    let mut molecule = Molecule::new("main");
    molecule
        .init_value(&source, &recipient, &remainder, "100")
        .unwrap();
    molecule.sign(&secret, false).unwrap();
    assert!(verify(&molecule).unwrap());

    let mut tampered = molecule.clone();
    tampered.atoms[1].value = "101".to_string();

    assert!(!verify_molecular_hash(&tampered));
    assert!(!verify(&tampered).unwrap());
}

#[test]
fn fragment_tamper_detection() {
    let secret = user_secret();

    let source = fresh_wallet(&secret);
    let recipient = fresh_wallet(&secret);
    let remainder = fresh_wallet(&secret);

    let mut molecule = Molecule::new("main");
    molecule
        .init_value(&source, &recipient, &remainder, "250")
        .unwrap();
    molecule.sign(&secret, false).unwrap();

    // replace one fragment with a same-length hex string
    let mut tampered = molecule.clone();
    let length = tampered.atoms[0].ots_fragment.len();
    tampered.atoms[0].ots_fragment = "a".repeat(length);

    assert!(verify_molecular_hash(&tampered));
    assert!(!verify_ots(&tampered));
    assert!(!verify(&tampered).unwrap());
}

#[test]
fn wrong_secret_fails_verification() {
    let secret = user_secret();
    let other_secret = "fedcba9876543210".repeat(128);

    let source = fresh_wallet(&secret);
    let recipient = fresh_wallet(&secret);
    let remainder = fresh_wallet(&secret);

    let mut molecule = Molecule::new("main");
    molecule
        .init_value(&source, &recipient, &remainder, "10")
        .unwrap();

    // signing with a different secret derives a different signing key, so
    // the fragments cannot reconstruct the source wallet's address
    molecule.sign(&other_secret, false).unwrap();

    assert!(verify_molecular_hash(&molecule));
    assert!(!verify_ots(&molecule));
}

#[test]
fn token_creation_round_trip() {
    let secret = user_secret();

    let source = fresh_wallet(&secret);
    let recipient = Wallet::new(&secret, "COIN").unwrap();

    let mut token_meta = BTreeMap::new();
    token_meta.insert("name".to_string(), "Example Coin".to_string());
    token_meta.insert("fungible".to_string(), "true".to_string());

    let mut molecule = Molecule::new("main");
    molecule.init_token_creation(&source, &recipient, "1000000", token_meta);
    molecule.sign(&secret, false).unwrap();

    let received = Molecule::from_json(&molecule.to_json().unwrap()).unwrap();

    assert!(verify(&received).unwrap());

    let atom = &received.atoms[0];
    assert_eq!(atom.isotope, "C");
    assert_eq!(atom.meta_id, "COIN");
    assert_eq!(
        atom.meta.get("address").map(String::as_str),
        Some(recipient.address.as_str())
    );
}

#[test]
fn metadata_round_trip() {
    let secret = user_secret();
    let wallet = fresh_wallet(&secret);

    let mut meta = BTreeMap::new();
    meta.insert("website".to_string(), "https://example.test".to_string());
    meta.insert("note".to_string(), String::new());

    let mut molecule = Molecule::new("main");
    molecule.init_meta(&wallet, meta, "profile", "profile-42");
    molecule.sign(&secret, false).unwrap();

    let received = Molecule::from_json(&molecule.to_json().unwrap()).unwrap();

    assert!(verify(&received).unwrap());
    assert_eq!(received.atoms[0].isotope, "M");
    assert_eq!(received.atoms[0].value, "");
}

#[test]
fn anonymous_signature_still_verifies() {
    let secret = user_secret();
    let wallet = fresh_wallet(&secret);

    let mut molecule = Molecule::new("main");
    molecule.init_meta(&wallet, BTreeMap::new(), "profile", "profile-1");
    molecule.sign(&secret, true).unwrap();

    assert!(molecule.bundle.is_empty());
    assert!(verify(&molecule).unwrap());
}

#[test]
fn conservation_violation_is_rejected() {
    let secret = user_secret();

    let source = fresh_wallet(&secret);
    let recipient = fresh_wallet(&secret);
    let remainder = fresh_wallet(&secret);

    let mut molecule = Molecule::new("main");
    molecule
        .init_value(&source, &recipient, &remainder, "100")
        .unwrap();

    // skim one unit off the credit before signing: hash and signature are
    // consistent, but the token no longer balances
    molecule.atoms[1].value = "99".to_string();
    molecule.sign(&secret, false).unwrap();

    assert!(verify_molecular_hash(&molecule));
    assert!(verify_ots(&molecule));
    assert!(!verify_token_isotope_v(&molecule).unwrap());
    assert!(!verify(&molecule).unwrap());
}

#[test]
fn malformed_atoms_are_rejected_on_ingest() {
    let json = r#"{
        "molecularHash": "",
        "cellSlug": "main",
        "bundle": "",
        "status": "",
        "createdAt": "1700000000000",
        "atoms": [
            {"position": "", "walletAddress": "abc", "isotope": "V"}
        ]
    }"#;

    assert!(matches!(
        Molecule::from_json(json),
        Err(CovalentError::AtomsMalformed)
    ));
}

#[test]
fn signing_an_empty_molecule_fails() {
    let mut molecule = Molecule::new("main");

    assert!(matches!(
        molecule.sign(&user_secret(), false),
        Err(CovalentError::AtomsNotFound)
    ));
}
