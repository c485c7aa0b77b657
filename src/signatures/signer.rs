//! PDF signing.
//!
//! Signing runs as a three state pipeline:
//!
//! ```text
//! PreparedSignature --digest()--> DigestedSignature --embed()--> SignedPdf
//! ```
//!
//! Each transition consumes the previous state, and the intermediate states
//! keep their bytes private, so a half-built file can never be handed out.
//! A failed signing attempt leaves the caller's input untouched; retrying
//! means preparing again from the original bytes.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use super::byterange::ByteRangeCalculator;
use super::container::build_signed_data;
use super::incremental::{append_signature_field, SignatureFields};
use super::inspect::{hash_document, is_signed};
use super::types::{HashAlgorithm, SignOptions, SignatureResult, SignedPdf, SIGNATURE_ALGORITHM};
use crate::certificates::{CertificateInfo, CertificateManager, SigningCredentials};
use crate::config::EngineConfig;
use crate::error::{CertificateError, Error, Result};

/// Signs PDFs with certificates from PKCS#12 archives.
#[derive(Debug, Clone, Default)]
pub struct SignatureEngine {
    certificates: CertificateManager,
}

impl SignatureEngine {
    /// Create an engine using the certificate policy from `config`.
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            certificates: CertificateManager::new(config),
        }
    }

    /// The certificate manager used to open archives.
    pub fn certificates(&self) -> &CertificateManager {
        &self.certificates
    }

    /// Sign `pdf` with the archive's certificate.
    pub fn sign(&self, pdf: &[u8], archive: &[u8], password: &str, options: &SignOptions) -> Result<SignedPdf> {
        self.prepare(pdf, archive, password, options)?.digest().embed()
    }

    /// Sign `pdf` with credentials already in memory.
    pub fn sign_with_credentials(
        &self,
        pdf: &[u8],
        credentials: SigningCredentials,
        options: &SignOptions,
    ) -> Result<SignedPdf> {
        let certificate = CertificateInfo::from_der(credentials.certificate())?;
        PreparedSignature::new(pdf, credentials, certificate, options, Utc::now())?
            .digest()
            .embed()
    }

    /// Open the archive and append the signature placeholder.
    pub fn prepare(
        &self,
        pdf: &[u8],
        archive: &[u8],
        password: &str,
        options: &SignOptions,
    ) -> Result<PreparedSignature> {
        self.prepare_at(pdf, archive, password, options, Utc::now())
    }

    /// [`prepare`](Self::prepare) with an explicit signing time.
    pub fn prepare_at(
        &self,
        pdf: &[u8],
        archive: &[u8],
        password: &str,
        options: &SignOptions,
        now: DateTime<Utc>,
    ) -> Result<PreparedSignature> {
        let (credentials, validation) = self.certificates.open_for_signing(archive, password, now)?;
        for warning in &validation.warnings {
            log::warn!("signing certificate: {}", warning);
        }
        let certificate = validation
            .info
            .ok_or(Error::Credentials(CertificateError::Incomplete))?;
        PreparedSignature::new(pdf, credentials, certificate, options, now)
    }
}

/// A PDF with the signature placeholder appended and the `/ByteRange`
/// filled in.
pub struct PreparedSignature {
    bytes: Vec<u8>,
    original_size: usize,
    calculator: ByteRangeCalculator,
    contents_offset: usize,
    byte_range: [i64; 4],
    field_name: String,
    credentials: SigningCredentials,
    certificate: CertificateInfo,
    signed_at: DateTime<Utc>,
    include_timestamp: bool,
}

impl PreparedSignature {
    fn new(
        pdf: &[u8],
        credentials: SigningCredentials,
        certificate: CertificateInfo,
        options: &SignOptions,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        if now < certificate.valid_from {
            return Err(Error::Credentials(CertificateError::NotYetValid {
                valid_from: certificate.valid_from.to_rfc3339(),
            }));
        }
        if now > certificate.valid_to {
            return Err(Error::Credentials(CertificateError::Expired {
                valid_to: certificate.valid_to.to_rfc3339(),
            }));
        }
        if !options.allow_resign && is_signed(pdf) {
            return Err(Error::AlreadySigned);
        }
        if options.reserve_bytes == 0 {
            return Err(Error::Signing("signature reserve must be greater than zero".to_string()));
        }

        let mut original = pdf.to_vec();
        if !matches!(original.last(), Some(b'\n') | Some(b'\r')) {
            original.push(b'\n');
        }
        let original_size = original.len();

        let signer_name = options
            .signer_name
            .as_deref()
            .or(certificate.holder_name.as_deref());
        let fields = SignatureFields {
            name: signer_name,
            reason: options.reason.as_deref(),
            location: options.location.as_deref(),
            contact_info: options.contact_info.as_deref(),
        };
        let calculator = ByteRangeCalculator::new(options.reserve_bytes);
        let update = append_signature_field(&original, &calculator, &fields, now)?;

        let mut bytes = update.bytes;
        let byte_range = calculator.calculate_byte_range(bytes.len(), update.contents_offset);
        let formatted = ByteRangeCalculator::format_byte_range(&byte_range)?;
        bytes[update.byte_range_offset..update.byte_range_offset + formatted.len()]
            .copy_from_slice(formatted.as_bytes());

        log::debug!(
            "prepared signature field {} with ByteRange {:?}",
            update.field_name,
            byte_range
        );
        Ok(Self {
            bytes,
            original_size,
            calculator,
            contents_offset: update.contents_offset,
            byte_range,
            field_name: update.field_name,
            credentials,
            certificate,
            signed_at: now,
            include_timestamp: options.include_timestamp,
        })
    }

    /// The `/ByteRange` written into the signature dictionary.
    pub fn byte_range(&self) -> [i64; 4] {
        self.byte_range
    }

    /// Length of the prepared file; the signed file has the same length.
    pub fn prepared_len(&self) -> usize {
        self.bytes.len()
    }

    /// Length of the unsigned revision.
    pub fn original_size(&self) -> usize {
        self.original_size
    }

    /// Name of the signature form field.
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// Hash the unsigned revision and the signable ranges.
    pub fn digest(self) -> DigestedSignature {
        let document_hash = hash_document(&self.bytes[..self.original_size]);
        let gap_end = self.contents_offset + self.calculator.placeholder_size();
        let mut hasher = Sha256::new();
        hasher.update(&self.bytes[..self.contents_offset]);
        hasher.update(&self.bytes[gap_end..]);
        DigestedSignature {
            signable_digest: hasher.finalize().to_vec(),
            document_hash,
            prepared: self,
        }
    }
}

impl std::fmt::Debug for PreparedSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedSignature")
            .field("len", &self.bytes.len())
            .field("byte_range", &self.byte_range)
            .field("field_name", &self.field_name)
            .finish_non_exhaustive()
    }
}

/// A prepared signature whose digests have been computed.
pub struct DigestedSignature {
    prepared: PreparedSignature,
    document_hash: String,
    signable_digest: Vec<u8>,
}

impl DigestedSignature {
    /// Hex SHA-256 of the unsigned revision.
    pub fn document_hash(&self) -> &str {
        &self.document_hash
    }

    /// SHA-256 of everything except the `/Contents` value.
    pub fn signable_digest(&self) -> &[u8] {
        &self.signable_digest
    }

    /// Build the CMS container and splice it into the placeholder.
    pub fn embed(self) -> Result<SignedPdf> {
        let DigestedSignature {
            prepared,
            document_hash,
            signable_digest,
        } = self;
        let signing_time = prepared.include_timestamp.then_some(prepared.signed_at);
        let der = build_signed_data(&prepared.credentials, &signable_digest, signing_time)?;

        let mut bytes = prepared.bytes;
        let prepared_len = bytes.len();
        prepared
            .calculator
            .insert_signature(&mut bytes, prepared.contents_offset, &der)?;
        debug_assert_eq!(bytes.len(), prepared_len);

        log::info!(
            "embedded {} byte signature in field {} ({} bytes total)",
            der.len(),
            prepared.field_name,
            bytes.len()
        );
        Ok(SignedPdf {
            bytes,
            result: SignatureResult {
                signature_value: STANDARD.encode(&der),
                algorithm: SIGNATURE_ALGORITHM.to_string(),
                signed_at: prepared.signed_at,
                certificate: prepared.certificate,
                document_hash,
                hash_algorithm: HashAlgorithm::Sha256,
                original_size: prepared.original_size,
                byte_range: prepared.byte_range,
                field_name: prepared.field_name,
                content_fingerprint: None,
            },
        })
    }
}

impl std::fmt::Debug for DigestedSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DigestedSignature")
            .field("prepared", &self.prepared)
            .field("document_hash", &self.document_hash)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signatures::{get_signature_info, unsigned_revision};
    use crate::writer::{PdfWriter, StandardFont};
    use rsa::pkcs1v15::{Signature, SigningKey};
    use rsa::{RsaPrivateKey, RsaPublicKey};
    use std::str::FromStr;
    use std::time::{Duration, SystemTime};
    use x509_cert::builder::{Builder, CertificateBuilder, Profile};
    use x509_cert::der::Encode;
    use x509_cert::name::Name;
    use x509_cert::serial_number::SerialNumber;
    use x509_cert::spki::SubjectPublicKeyInfoOwned;
    use x509_cert::time::{Time, Validity};

    fn whole_seconds(t: SystemTime) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(t.duration_since(SystemTime::UNIX_EPOCH).unwrap().as_secs())
    }

    fn credentials(not_after: SystemTime) -> SigningCredentials {
        let mut rng = rand::thread_rng();
        let key = RsaPrivateKey::new(&mut rng, 1024).unwrap();
        let signer = SigningKey::<Sha256>::new(key.clone());
        let validity = Validity {
            not_before: Time::try_from(whole_seconds(SystemTime::now() - Duration::from_secs(86_400))).unwrap(),
            not_after: Time::try_from(whole_seconds(not_after)).unwrap(),
        };
        let cert = CertificateBuilder::new(
            Profile::Root,
            SerialNumber::from(42u32),
            validity,
            Name::from_str("CN=Dra. Ana Ribeiro:12345678901,O=Teste,C=BR").unwrap(),
            SubjectPublicKeyInfoOwned::from_key(RsaPublicKey::from(&key)).unwrap(),
            &signer,
        )
        .unwrap()
        .build::<Signature>()
        .unwrap();
        SigningCredentials::new(cert.to_der().unwrap(), key).unwrap()
    }

    fn sample_pdf() -> Vec<u8> {
        let mut writer = PdfWriter::new();
        writer.add_a4_page().add_text("Receita", 72.0, 720.0, StandardFont::Helvetica, 12.0);
        writer.finish().unwrap()
    }

    fn valid_credentials() -> SigningCredentials {
        credentials(SystemTime::now() + Duration::from_secs(365 * 86_400))
    }

    #[test]
    fn test_sign_with_credentials() {
        let pdf = sample_pdf();
        let options = SignOptions::new().with_reason("Prescrição").with_location("São Paulo");
        let signed = SignatureEngine::default()
            .sign_with_credentials(&pdf, valid_credentials(), &options)
            .unwrap();

        assert!(signed.bytes.starts_with(&pdf));
        assert_eq!(signed.result.original_size, pdf.len());
        assert_eq!(signed.result.document_hash, hash_document(&pdf));
        assert_eq!(signed.result.algorithm, "SHA256withRSA");
        assert_eq!(signed.result.field_name, "Signature1");
        assert_eq!(signed.result.byte_range[0], 0);
        assert_eq!(
            (signed.result.byte_range[2] + signed.result.byte_range[3]) as usize,
            signed.bytes.len()
        );

        let info = get_signature_info(&signed.bytes).unwrap();
        assert!(info.signed);
        assert_eq!(info.reason.as_deref(), Some("Prescrição"));
        assert_eq!(info.location.as_deref(), Some("São Paulo"));
        assert_eq!(info.signer_name.as_deref(), Some("Dra. Ana Ribeiro"));
        assert_eq!(info.byte_range, Some(signed.result.byte_range));
        assert_eq!(unsigned_revision(&signed.bytes), pdf.as_slice());
    }

    #[test]
    fn test_state_machine_preserves_length() {
        let pdf = sample_pdf();
        let credentials = valid_credentials();
        let certificate = CertificateInfo::from_der(credentials.certificate()).unwrap();
        let prepared =
            PreparedSignature::new(&pdf, credentials, certificate, &SignOptions::default(), Utc::now()).unwrap();
        let prepared_len = prepared.prepared_len();
        let range = prepared.byte_range();
        let digested = prepared.digest();
        assert_eq!(digested.document_hash(), hash_document(&pdf));
        assert_eq!(digested.signable_digest().len(), 32);
        let signed = digested.embed().unwrap();
        assert_eq!(signed.bytes.len(), prepared_len);
        assert_eq!(signed.result.byte_range, range);
    }

    #[test]
    fn test_expired_credentials_rejected() {
        let pdf = sample_pdf();
        let expired = credentials(SystemTime::now() - Duration::from_secs(1));
        let err = SignatureEngine::default()
            .sign_with_credentials(&pdf, expired, &SignOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::Credentials(CertificateError::Expired { .. })));
        assert_eq!(err.to_string(), "cannot sign with provided credentials");
    }

    #[test]
    fn test_already_signed_requires_override() {
        let pdf = sample_pdf();
        let engine = SignatureEngine::default();
        let signed = engine
            .sign_with_credentials(&pdf, valid_credentials(), &SignOptions::default())
            .unwrap();

        let err = engine
            .sign_with_credentials(&signed.bytes, valid_credentials(), &SignOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::AlreadySigned));

        let resigned = engine
            .sign_with_credentials(&signed.bytes, valid_credentials(), &SignOptions::new().allow_resign(true))
            .unwrap();
        assert_eq!(resigned.result.field_name, "Signature2");
        assert!(resigned.bytes.starts_with(&signed.bytes));
    }

    #[test]
    fn test_reserve_too_small() {
        let pdf = sample_pdf();
        let err = SignatureEngine::default()
            .sign_with_credentials(&pdf, valid_credentials(), &SignOptions::new().with_reserve_bytes(16))
            .unwrap_err();
        assert!(matches!(err, Error::Signing(_)));
    }

    #[test]
    fn test_missing_trailing_newline_is_normalized() {
        let mut pdf = sample_pdf();
        while matches!(pdf.last(), Some(b'\n') | Some(b'\r')) {
            pdf.pop();
        }
        let signed = SignatureEngine::default()
            .sign_with_credentials(&pdf, valid_credentials(), &SignOptions::default())
            .unwrap();
        assert_eq!(signed.result.original_size, pdf.len() + 1);
        assert_eq!(&signed.bytes[..pdf.len()], pdf.as_slice());
    }
}
