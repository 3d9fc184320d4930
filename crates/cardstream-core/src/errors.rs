use crate::codes::SIGNATURE_VERIFY_FAILED;

/// Error types for gateway protocol operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The merchant secret used for signing is empty.
    #[error("Merchant secret must not be empty")]
    EmptySecret,

    /// A gateway message arrived without a signature.
    #[error("The response is not signed")]
    MissingSignature,

    /// The signature of a gateway message does not match its contents.
    #[error("The signature provided in the response does not match. This response might be fraudulent")]
    SignatureMismatch,

    /// A field required by the protocol is absent.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// A field is present but its value cannot be interpreted.
    #[error("Invalid value for field '{field}': {value}")]
    InvalidField { field: &'static str, value: String },

    /// The configured integration type is not one the gateway supports.
    #[error("Unknown integration type: {0}")]
    UnknownIntegration(String),

    /// An amount cannot be represented in minor units.
    #[error("Amount out of range: {0}")]
    AmountOutOfRange(String),
}

impl Error {
    /// The numeric gateway error code attached to this error, if any.
    pub fn code(&self) -> Option<i64> {
        match self {
            Error::SignatureMismatch | Error::MissingSignature => Some(SIGNATURE_VERIFY_FAILED),
            _ => None,
        }
    }

    /// Whether this error means the message could not be trusted.
    pub fn is_signature_error(&self) -> bool {
        matches!(self, Error::SignatureMismatch | Error::MissingSignature)
    }
}

/// A specialized `Result` type for gateway protocol operations.
pub type Result<T> = std::result::Result<T, Error>;
