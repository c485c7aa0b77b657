//! Signing requests and issue outcomes.

use zeroize::Zeroizing;

use crate::compliance::ValidationResult;
use crate::error::Error;
use crate::signatures::{SignOptions, SignatureResult};

/// Certificate material and options for one signing call.
///
/// Archive bytes and password are wiped when the request is dropped, which
/// happens as soon as the signing job finishes.
pub struct SigningRequest {
    pub(crate) archive: Zeroizing<Vec<u8>>,
    pub(crate) password: Zeroizing<String>,
    pub(crate) options: SignOptions,
}

impl SigningRequest {
    /// Create a request with default signing options.
    pub fn new(archive: Vec<u8>, password: impl Into<String>) -> Self {
        Self {
            archive: Zeroizing::new(archive),
            password: Zeroizing::new(password.into()),
            options: SignOptions::default(),
        }
    }

    /// Replace the signing options.
    pub fn with_options(mut self, options: SignOptions) -> Self {
        self.options = options;
        self
    }

    /// Allow re-signing a document that already carries a signature.
    pub fn allow_resign(mut self, allow: bool) -> Self {
        self.options.allow_resign = allow;
        self
    }

    /// Signing options.
    pub fn options(&self) -> &SignOptions {
        &self.options
    }
}

impl std::fmt::Debug for SigningRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningRequest")
            .field("archive", &format!("{} bytes", self.archive.len()))
            .field("password", &"[REDACTED]")
            .field("options", &self.options)
            .finish()
    }
}

/// Result of a successful issue call.
#[derive(Debug, Clone)]
pub struct DocumentOutcome {
    /// Rendered PDF, signed when a signature was requested
    pub document_bytes: Vec<u8>,
    /// Validation result the document passed with (warnings only)
    pub validation: ValidationResult,
    /// Signature provenance when the document was signed
    pub signature: Option<SignatureResult>,
    /// Non-blocking notices for the caller to display
    pub notices: Vec<String>,
}

impl DocumentOutcome {
    /// Whether the returned bytes are signed.
    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }
}

/// Why an issue call produced no outcome.
#[derive(Debug, thiserror::Error)]
pub enum IssueFailure {
    /// Validation found blocking errors; nothing was rendered
    #[error("document has {} blocking validation error(s)", .0.errors.len())]
    Rejected(ValidationResult),

    /// Rendering or signing failed
    #[error("{error}")]
    Failed {
        /// Underlying error
        error: Error,
        /// Rendered unsigned PDF when only signing failed, byte-identical to
        /// the renderer output
        unsigned_bytes: Option<Vec<u8>>,
    },
}

impl IssueFailure {
    pub(crate) fn failed(error: Error) -> Self {
        IssueFailure::Failed {
            error,
            unsigned_bytes: None,
        }
    }

    /// The underlying error, if this was not a validation rejection.
    pub fn error(&self) -> Option<&Error> {
        match self {
            IssueFailure::Rejected(_) => None,
            IssueFailure::Failed { error, .. } => Some(error),
        }
    }

    /// Validation result of a rejected document.
    pub fn validation(&self) -> Option<&ValidationResult> {
        match self {
            IssueFailure::Rejected(validation) => Some(validation),
            IssueFailure::Failed { .. } => None,
        }
    }

    /// Unsigned PDF handed back after a signing failure.
    pub fn unsigned_bytes(&self) -> Option<&[u8]> {
        match self {
            IssueFailure::Failed {
                unsigned_bytes: Some(bytes),
                ..
            } => Some(bytes),
            _ => None,
        }
    }

    /// Whether signing failed because of the certificate or password.
    pub fn is_credentials(&self) -> bool {
        self.error().is_some_and(Error::is_credentials)
    }
}
