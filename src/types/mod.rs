//! Ledger entities: atoms, molecules and wallets

pub mod atom;
pub mod molecule;
pub mod wallet;

pub use atom::Atom;
pub use molecule::Molecule;
pub use wallet::Wallet;
