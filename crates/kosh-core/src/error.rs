//! Error types for Kosh Core
//!
//! Error taxonomy for key derivation, address encoding, record decoding and
//! chain service calls.

/// Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Kosh Core errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid mnemonic phrase
    #[error("Invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    /// Invalid derivation path
    #[error("Invalid derivation path: {0}")]
    InvalidPath(String),

    /// Key derivation error
    #[error("Key derivation error: {0}")]
    KeyDerivation(String),

    /// Invalid key
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Invalid address format
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Malformed encrypted payload or record
    #[error("Format error: {0}")]
    Format(String),

    /// Chain service / network error
    #[error("Network error: {0}")]
    Network(String),

    /// Input rejected by a precondition
    #[error("Validation error: {0}")]
    Validation(String),

    /// Chain parameter error
    #[error(transparent)]
    Params(#[from] kosh_params::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let error = Error::InvalidMnemonic("checksum".to_string());
        assert_eq!(error.to_string(), "Invalid mnemonic: checksum");
        let error = Error::Validation("too short".to_string());
        assert_eq!(error.to_string(), "Validation error: too short");
    }

    #[test]
    fn test_json_errors_convert() {
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error: Error = parse.into();
        assert!(matches!(error, Error::Serialization(_)));
    }
}
