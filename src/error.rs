//! Error types for the signing engine.
//!
//! Validation problems are not errors: the compliance validator and the
//! certificate manager return structured results. This module covers the
//! hard failures that abort an operation.

use std::time::Duration;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Reasons a certificate archive cannot be used for signing.
///
/// The variant is kept for audit trails and tests. It is never part of the
/// user-facing message of [`Error::Credentials`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CertificateError {
    /// Archive could not be opened. Wrong password and corrupt archive are
    /// reported identically.
    #[error("certificate archive could not be opened")]
    Unreadable,

    /// Archive opened but holds no certificate or no private key
    #[error("certificate archive is missing a certificate or private key")]
    Incomplete,

    /// Validity window ended before the signing attempt
    #[error("certificate expired at {valid_to}")]
    Expired {
        /// End of the validity window (RFC 3339)
        valid_to: String,
    },

    /// Validity window has not started yet
    #[error("certificate is not valid before {valid_from}")]
    NotYetValid {
        /// Start of the validity window (RFC 3339)
        valid_from: String,
    },

    /// Private key does not belong to the certificate
    #[error("private key does not match the certificate public key")]
    KeyMismatch,

    /// Key type other than RSA
    #[error("unsupported key type: {0}")]
    UnsupportedKey(String),
}

/// Error types that can occur while rendering, signing or verifying.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Certificate archive or password unusable. The display message is
    /// deliberately generic.
    #[error("cannot sign with provided credentials")]
    Credentials(CertificateError),

    /// Placeholder insertion or cryptographic operation failed
    #[error("Signing failed: {0}")]
    Signing(String),

    /// PDF was already signed and no re-sign override was given
    #[error("Document is already signed; re-signing requires an explicit override")]
    AlreadySigned,

    /// Post-hoc digest comparison failed
    #[error("Integrity check failed: expected {expected}, computed {actual}")]
    Integrity {
        /// Digest recorded at signing time
        expected: String,
        /// Digest of the bytes presented now
        actual: String,
    },

    /// Invalid PDF structure
    #[error("Invalid PDF: {0}")]
    InvalidPdf(String),

    /// Unsupported feature
    #[error("Unsupported feature: {0}")]
    Unsupported(String),

    /// QR code could not be encoded
    #[error("Barcode error: {0}")]
    Barcode(String),

    /// Document handed to an operation for a different document type
    #[error("Document type mismatch: expected {expected}, found {found}")]
    DocumentTypeMismatch {
        /// Type the operation handles
        expected: String,
        /// Type of the document supplied
        found: String,
    },

    /// Operation did not finish within the configured bound
    #[error("Operation exceeded its {0:?} timeout")]
    Timeout(Duration),

    /// Worker pool could not be created or a worker went away
    #[error("Worker pool error: {0}")]
    Worker(String),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error must be treated as an authorization failure.
    pub fn is_credentials(&self) -> bool {
        matches!(self, Error::Credentials(_))
    }
}

impl From<CertificateError> for Error {
    fn from(err: CertificateError) -> Self {
        Error::Credentials(err)
    }
}
