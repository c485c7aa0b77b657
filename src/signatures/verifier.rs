//! Signature verification.

use chrono::Utc;
use sha2::{Digest, Sha256};

use super::byterange::ByteRangeCalculator;
use super::container::ParsedContainer;
use super::inspect::get_signature_info;
use super::types::{VerificationResult, VerificationStatus};
use crate::certificates::{certificate_public_key, CertificateInfo};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::parser::decode_hex;

/// Verifies the latest signature of a PDF.
///
/// The signer certificate is taken from the CMS container. Its issuer is
/// compared with the trusted-issuer list; no chain is built.
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    trusted_issuers: Vec<String>,
}

impl Default for SignatureVerifier {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl SignatureVerifier {
    /// Create a verifier trusting the issuers listed in `config`.
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            trusted_issuers: config.trusted_issuers.clone(),
        }
    }

    fn is_trusted(&self, issuer: &str) -> bool {
        let issuer = issuer.to_lowercase();
        self.trusted_issuers
            .iter()
            .map(|t| t.trim().to_lowercase())
            .any(|t| !t.is_empty() && issuer.contains(&t))
    }

    /// Verify the latest signature of `pdf`.
    ///
    /// Malformed or tampered signatures produce an `Invalid` result, not an
    /// error.
    pub fn verify(&self, pdf: &[u8]) -> Result<VerificationResult> {
        let Some(info) = get_signature_info(pdf) else {
            let mut result = VerificationResult::new(Default::default());
            result.status = VerificationStatus::NotSigned;
            result.messages.push("document has no signature".to_string());
            return Ok(result);
        };
        if !info.signed {
            let mut result = VerificationResult::new(info);
            result.status = VerificationStatus::NotSigned;
            result.messages.push("signature placeholder was never filled".to_string());
            return Ok(result);
        }

        let byte_range = info.byte_range;
        let result = VerificationResult::new(info);
        let Some(byte_range) = byte_range else {
            return Ok(result.invalid("signature has no valid /ByteRange"));
        };
        if let Err(e) = ByteRangeCalculator::validate_byte_range(&byte_range, pdf.len()) {
            let mut result = result.invalid(e.to_string());
            result.document_modified = true;
            return Ok(result);
        }

        // The gap must be exactly the hex /Contents value.
        let gap = &pdf[byte_range[1] as usize..byte_range[2] as usize];
        if gap.len() < 2 || gap[0] != b'<' || gap[gap.len() - 1] != b'>' {
            let mut result = result.invalid("ByteRange gap is not the /Contents value");
            result.document_modified = true;
            return Ok(result);
        }
        let container_bytes = match decode_hex(&gap[1..gap.len() - 1]) {
            Ok(bytes) => bytes,
            Err(e) => return Ok(result.invalid(e.to_string())),
        };
        let container = match ParsedContainer::parse(&container_bytes) {
            Ok(container) => container,
            Err(e) => return Ok(result.invalid(e.to_string())),
        };

        let mut hasher = Sha256::new();
        hasher.update(&pdf[..byte_range[1] as usize]);
        hasher.update(&pdf[byte_range[2] as usize..]);
        let digest = hasher.finalize();

        let mut result = result;
        result.signing_time = container.signing_time;
        if let Some(expected) = &container.message_digest {
            if expected.as_slice() != digest.as_slice() {
                let mut result = result.invalid("document was modified after signing");
                result.document_modified = true;
                return Ok(result);
            }
        }

        let Some(certificate) = &container.certificate else {
            return Ok(result.invalid("signature container has no signer certificate"));
        };
        let public_key = match certificate_public_key(certificate) {
            Ok(key) => key,
            Err(e) => return Ok(result.invalid(e.to_string())),
        };
        let signed_content = if container.message_digest.is_none() {
            let mut content = pdf[..byte_range[1] as usize].to_vec();
            content.extend_from_slice(&pdf[byte_range[2] as usize..]);
            content
        } else {
            Vec::new()
        };
        if let Err(e) = container.verify_signature(&public_key, &signed_content) {
            return Ok(result.invalid(e.to_string()));
        }

        let signer = match CertificateInfo::from_der(certificate) {
            Ok(signer) => signer,
            Err(e) => return Ok(result.invalid(e.to_string())),
        };

        result.status = VerificationStatus::Valid;
        result.certificate_trusted = self.is_trusted(&signer.issuer);
        if !result.certificate_trusted {
            result.status = VerificationStatus::ValidWithWarnings;
            result.messages.push(format!("issuer is not trusted: {}", signer.issuer));
        }
        let checked_at = result.signing_time.unwrap_or_else(Utc::now);
        if !signer.is_valid_at(checked_at) {
            result.status = VerificationStatus::ValidWithWarnings;
            result
                .messages
                .push(format!("certificate was not valid at {}", checked_at.to_rfc3339()));
        }
        result.signer = Some(signer);

        log::debug!("signature verified with status {:?}", result.status);
        Ok(result)
    }
}
