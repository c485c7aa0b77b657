//! Digital signature types and data structures.

use chrono::{DateTime, Utc};
use const_oid::ObjectIdentifier;
use serde::{Deserialize, Serialize};

use crate::certificates::CertificateInfo;
use crate::config::DEFAULT_SIGNATURE_RESERVE;
use crate::error::{Error, Result};

/// Signature algorithm name recorded in [`SignatureResult::algorithm`].
pub const SIGNATURE_ALGORITHM: &str = "SHA256withRSA";

/// `/Filter` of the signature dictionary.
pub const SIGNATURE_FILTER: &str = "Adobe.PPKLite";

/// `/SubFilter` of the signature dictionary.
pub const SIGNATURE_SUB_FILTER: &str = "adbe.pkcs7.detached";

/// Digest algorithm used for document hashes and signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum HashAlgorithm {
    /// SHA-256
    #[default]
    #[serde(rename = "SHA-256", alias = "SHA256", alias = "sha256")]
    Sha256,
}

impl HashAlgorithm {
    /// Get the OID for this digest algorithm.
    pub fn oid(&self) -> ObjectIdentifier {
        match self {
            HashAlgorithm::Sha256 => const_oid::db::rfc5912::ID_SHA_256,
        }
    }

    /// Get the name of this algorithm.
    pub fn name(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "SHA-256",
        }
    }
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for HashAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().replace('-', "").as_str() {
            "SHA256" => Ok(HashAlgorithm::Sha256),
            _ => Err(Error::Unsupported(format!("hash algorithm {}", s))),
        }
    }
}

/// Options for signing a PDF.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignOptions {
    /// Reason for signing
    pub reason: Option<String>,
    /// Location where the document was signed
    pub location: Option<String>,
    /// Contact information
    pub contact_info: Option<String>,
    /// Name of the signer written to `/Name`; defaults to the certificate
    /// holder name
    pub signer_name: Option<String>,
    /// Embed the signing time as a signed CMS attribute
    pub include_timestamp: bool,
    /// Sign even if the PDF already carries a signature
    pub allow_resign: bool,
    /// Bytes reserved for the DER signature container
    pub reserve_bytes: usize,
}

impl Default for SignOptions {
    fn default() -> Self {
        Self {
            reason: None,
            location: None,
            contact_info: None,
            signer_name: None,
            include_timestamp: true,
            allow_resign: false,
            reserve_bytes: DEFAULT_SIGNATURE_RESERVE,
        }
    }
}

impl SignOptions {
    /// Create default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the reason for signing.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Set the signing location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Set contact information.
    pub fn with_contact_info(mut self, contact: impl Into<String>) -> Self {
        self.contact_info = Some(contact.into());
        self
    }

    /// Set the signer name.
    pub fn with_signer_name(mut self, name: impl Into<String>) -> Self {
        self.signer_name = Some(name.into());
        self
    }

    /// Enable or disable the signing-time attribute.
    pub fn with_timestamp(mut self, include: bool) -> Self {
        self.include_timestamp = include;
        self
    }

    /// Allow signing a PDF that is already signed.
    pub fn allow_resign(mut self, allow: bool) -> Self {
        self.allow_resign = allow;
        self
    }

    /// Set the reserved signature capacity in bytes.
    pub fn with_reserve_bytes(mut self, bytes: usize) -> Self {
        self.reserve_bytes = bytes;
        self
    }
}

/// Provenance of a signing operation, persisted alongside the signed PDF.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureResult {
    /// Base64 of the DER encoded CMS container
    pub signature_value: String,
    /// Always [`SIGNATURE_ALGORITHM`]
    pub algorithm: String,
    /// When the signature was produced
    pub signed_at: DateTime<Utc>,
    /// Signing certificate snapshot
    pub certificate: CertificateInfo,
    /// Hex digest of the unsigned document bytes
    pub document_hash: String,
    /// Algorithm of `document_hash`
    pub hash_algorithm: HashAlgorithm,
    /// Length of the unsigned document
    pub original_size: usize,
    /// `/ByteRange` of the signature
    pub byte_range: [i64; 4],
    /// Name of the signature form field
    pub field_name: String,
    /// Fingerprint of the document model that was rendered and signed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_fingerprint: Option<String>,
}

/// Signed PDF bytes together with their provenance.
#[derive(Debug, Clone)]
pub struct SignedPdf {
    /// Complete signed file
    pub bytes: Vec<u8>,
    /// Signing provenance
    pub result: SignatureResult,
}

/// Information about the latest signature in a PDF, gathered by scanning.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SignatureInfo {
    /// True when `/Contents` holds a non-empty value
    pub signed: bool,
    /// Signature form field name
    pub field_name: Option<String>,
    /// Name of the signer
    pub signer_name: Option<String>,
    /// Signing time (`/M`, PDF date string)
    pub signing_time: Option<String>,
    /// Reason for signing
    pub reason: Option<String>,
    /// Signing location
    pub location: Option<String>,
    /// Contact information
    pub contact_info: Option<String>,
    /// Signature sub-filter
    pub sub_filter: Option<String>,
    /// Byte range of the signed data
    pub byte_range: Option<[i64; 4]>,
    /// Offset of the signature dictionary object
    pub dictionary_offset: usize,
}

/// Verification status of a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VerificationStatus {
    /// Signature is valid
    Valid,
    /// Signature is cryptographically valid but the signer certificate was
    /// outside its validity window at signing time or its issuer is not
    /// trusted
    ValidWithWarnings,
    /// Signature is invalid or the signed bytes were modified
    Invalid,
    /// No signature present
    NotSigned,
}

impl VerificationStatus {
    /// Check if the status indicates a valid signature.
    pub fn is_valid(&self) -> bool {
        matches!(self, VerificationStatus::Valid)
    }

    /// Check if the status indicates any form of validity (including warnings).
    pub fn is_ok(&self) -> bool {
        matches!(self, VerificationStatus::Valid | VerificationStatus::ValidWithWarnings)
    }
}

/// Result of signature verification.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationResult {
    /// Overall verification status
    pub status: VerificationStatus,
    /// Signature dictionary contents
    pub signature_info: SignatureInfo,
    /// Signer certificate, when it could be read from the container
    pub signer: Option<CertificateInfo>,
    /// Signing time from the CMS signed attributes
    pub signing_time: Option<DateTime<Utc>>,
    /// Verification messages (errors, warnings)
    pub messages: Vec<String>,
    /// Whether the byte range leaves out anything but the placeholder
    pub document_modified: bool,
    /// Whether the signer's issuer is on the trusted list
    pub certificate_trusted: bool,
}

impl VerificationResult {
    pub(crate) fn new(signature_info: SignatureInfo) -> Self {
        Self {
            status: VerificationStatus::Invalid,
            signature_info,
            signer: None,
            signing_time: None,
            messages: Vec::new(),
            document_modified: false,
            certificate_trusted: false,
        }
    }

    pub(crate) fn invalid(mut self, message: impl Into<String>) -> Self {
        self.status = VerificationStatus::Invalid;
        self.messages.push(message.into());
        self
    }
}
