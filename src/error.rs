//! The error type shared by every module.

use thiserror::Error;

/// Represents errors that can occur while issuing, transcoding or encoding certificates.
///
/// Every error is terminal for the call that raised it; nothing here is retried locally.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CertSmithError {
    /// Textual input matched none of the recognized representations, or the
    /// requested output encoding is unknown.
    #[error("Unsupported encoding format: {0}. Accepted formats are PEM, hex, base64 and base64url")]
    UnsupportedEncodingFormat(String),

    /// No registered signature formatter accepted the algorithm.
    #[error("No signature formatter accepts algorithm {0}")]
    SignatureConversionUnsupported(String),

    /// The signature does not fit the shape required by the algorithm or curve.
    #[error("Malformed signature: {0}")]
    MalformedSignature(String),

    /// Raised by a [`CryptoProvider`](crate::provider::CryptoProvider) when signing is rejected.
    #[error("Signing failed: {0}")]
    SigningFailure(String),

    /// Error during data encoding.
    #[error("Failed to encode data: {0}")]
    EncodingError(String),

    /// Error during data decoding.
    #[error("Failed to decode data: {0}")]
    DecodingError(String),

    /// Error due to invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Error while importing, exporting or using key material.
    #[error("Key error: {0}")]
    KeyError(String),

    /// Error related to certificate operations.
    #[error("Certificate error: {0}")]
    CertificateError(String),
}

pub type Result<T> = std::result::Result<T, CertSmithError>;

impl From<der::Error> for CertSmithError {
    /// Converts a `der::Error` into a `CertSmithError`.
    fn from(err: der::Error) -> Self {
        CertSmithError::DecodingError(err.to_string())
    }
}

impl From<pem::PemError> for CertSmithError {
    fn from(err: pem::PemError) -> Self {
        CertSmithError::DecodingError(err.to_string())
    }
}

impl From<hex::FromHexError> for CertSmithError {
    fn from(err: hex::FromHexError) -> Self {
        CertSmithError::DecodingError(err.to_string())
    }
}

impl From<base64::DecodeError> for CertSmithError {
    fn from(err: base64::DecodeError) -> Self {
        CertSmithError::DecodingError(err.to_string())
    }
}

impl From<pkcs8::spki::Error> for CertSmithError {
    fn from(err: pkcs8::spki::Error) -> Self {
        CertSmithError::KeyError(err.to_string())
    }
}

impl From<pkcs8::Error> for CertSmithError {
    fn from(err: pkcs8::Error) -> Self {
        CertSmithError::KeyError(err.to_string())
    }
}
