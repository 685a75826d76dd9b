use thiserror::Error;

/// Result alias used throughout the library
pub type CovalentResult<T> = Result<T, CovalentError>;

/// Main error type for the covalent client
#[derive(Debug, Error)]
pub enum CovalentError {
    /// Sign or verify was called on a molecule without atoms
    #[error("The molecule does not contain atoms")]
    AtomsNotFound,

    /// A deserialized atom is missing position, wallet address or isotope
    #[error("The required properties of the atom are not filled")]
    AtomsMalformed,

    /// A V-isotope value does not parse as a complete decimal number
    #[error("Invalid isotope \"V\" value: {0:?}")]
    InvalidValue(String),

    /// An encryption key has the wrong length
    #[error("Key size mismatch: expected {expected} bytes, got {actual}")]
    KeySizeMismatch { expected: usize, actual: usize },

    /// A string expected to be hexadecimal could not be parsed
    #[error("Invalid hexadecimal input: {0:?}")]
    InvalidHex(String),

    #[error("Hex decoding error: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Cryptography error: {0}")]
    Crypto(String),
}
