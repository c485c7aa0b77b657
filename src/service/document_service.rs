//! The validate, render and sign pipeline.
//!
//! Signing runs on the worker pool under the configured timeout.

use std::sync::Arc;

use super::pool::WorkerPool;
use super::request::{DocumentOutcome, IssueFailure, SigningRequest};
use crate::certificates::CertificateInfo;
use crate::compliance::{ComplianceValidator, MedicationClassifier, StaticMedicationTable, ValidationResult};
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::model::{DocumentType, MedicalDocument};
use crate::render::DocumentRenderer;
use crate::signatures::{SignatureEngine, SignatureResult};

/// Name tokens ignored when comparing a doctor's name with a certificate
/// holder name.
const HONORIFICS: &[&str] = &["dr", "dra", "doutor", "doutora", "prof", "profa"];

/// Outcome type of the issue operations.
pub type IssueResult = std::result::Result<DocumentOutcome, IssueFailure>;

/// Validates, renders and signs documents, one operation per document type.
///
/// Configuration, classifier and worker pool are fixed at construction; the
/// service holds no per-document state, so one instance can serve
/// concurrent callers.
pub struct DocumentService {
    config: EngineConfig,
    validator: ComplianceValidator,
    renderer: DocumentRenderer,
    engine: SignatureEngine,
    pool: WorkerPool,
}

impl std::fmt::Debug for DocumentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentService")
            .field("config", &self.config)
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

impl DocumentService {
    /// Create a service with the built-in medication table.
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::with_classifier(config, Arc::new(StaticMedicationTable::new()))
    }

    /// Create a service with a custom medication classifier.
    pub fn with_classifier(config: EngineConfig, classifier: Arc<dyn MedicationClassifier>) -> Result<Self> {
        config.validate()?;
        let pool = WorkerPool::new(config.worker_threads)?;
        Ok(Self {
            validator: ComplianceValidator::new(classifier.clone()),
            renderer: DocumentRenderer::new(config.clone()).with_classifier(classifier),
            engine: SignatureEngine::new(&config),
            pool,
            config,
        })
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// A signing request using the configured signature reserve.
    pub fn signing_request(&self, archive: Vec<u8>, password: impl Into<String>) -> SigningRequest {
        let options = crate::signatures::SignOptions::default()
            .with_reserve_bytes(self.config.signature_reserve_bytes);
        SigningRequest::new(archive, password).with_options(options)
    }

    /// Validate a document without rendering it.
    pub fn validate(&self, document: &MedicalDocument) -> ValidationResult {
        self.validator.validate(document)
    }

    /// Issue a prescription.
    pub fn issue_prescription(&self, document: &mut MedicalDocument, signing: Option<SigningRequest>) -> IssueResult {
        self.issue(DocumentType::Prescription, document, signing)
    }

    /// Issue a medical certificate.
    pub fn issue_certificate(&self, document: &mut MedicalDocument, signing: Option<SigningRequest>) -> IssueResult {
        self.issue(DocumentType::Certificate, document, signing)
    }

    /// Issue a referral.
    pub fn issue_referral(&self, document: &mut MedicalDocument, signing: Option<SigningRequest>) -> IssueResult {
        self.issue(DocumentType::Referral, document, signing)
    }

    /// Issue an exam request.
    pub fn issue_exam_request(&self, document: &mut MedicalDocument, signing: Option<SigningRequest>) -> IssueResult {
        self.issue(DocumentType::ExamRequest, document, signing)
    }

    /// Issue a medical report.
    pub fn issue_report(&self, document: &mut MedicalDocument, signing: Option<SigningRequest>) -> IssueResult {
        self.issue(DocumentType::Report, document, signing)
    }

    /// Validate, render and optionally sign `document`.
    ///
    /// On success the document records the new signature; a signature that
    /// no longer matches the content is dropped first.
    pub fn issue(
        &self,
        expected: DocumentType,
        document: &mut MedicalDocument,
        signing: Option<SigningRequest>,
    ) -> IssueResult {
        let found = document.document_type();
        if found != expected {
            return Err(IssueFailure::failed(Error::DocumentTypeMismatch {
                expected: expected.to_string(),
                found: found.to_string(),
            }));
        }

        let mut notices = Vec::new();
        let fingerprint = document.content_fingerprint();
        let stale = document
            .signature()
            .is_some_and(|s| s.content_fingerprint.as_deref() != Some(fingerprint.as_str()));
        if stale {
            document.take_signature();
            log::info!("document {} changed since it was signed; signature discarded", document.id);
            notices.push("O conteúdo foi alterado após a assinatura; a assinatura anterior foi descartada.".to_string());
        }

        let validation = self.validator.validate(document);
        if validation.has_errors() {
            log::info!(
                "document {} rejected with {} validation error(s)",
                document.id,
                validation.errors.len()
            );
            return Err(IssueFailure::Rejected(validation));
        }
        document.apply_classifications(&validation);

        let timeout = self.config.operation_timeout();
        let renderer = self.renderer.clone();
        let snapshot = document.clone();
        let rendered = self
            .pool
            .run(timeout, move || renderer.render(&snapshot))
            .map_err(IssueFailure::failed)?;

        let Some(request) = signing else {
            return Ok(DocumentOutcome {
                document_bytes: rendered,
                validation,
                signature: None,
                notices,
            });
        };

        if document.signature().is_some() && !request.options.allow_resign {
            log::warn!("document {} is already signed; re-signing not allowed", document.id);
            return Err(IssueFailure::Failed {
                error: Error::AlreadySigned,
                unsigned_bytes: Some(rendered),
            });
        }

        let engine = self.engine.clone();
        let unsigned = rendered.clone();
        let signed = self.pool.run(timeout, move || {
            engine.sign(&unsigned, &request.archive, &request.password, &request.options)
        });
        let signed = match signed {
            Ok(signed) => signed,
            Err(error) => {
                log::warn!("signing document {} failed: {}", document.id, error);
                return Err(IssueFailure::Failed {
                    error,
                    unsigned_bytes: Some(rendered),
                });
            },
        };

        let mut signature: SignatureResult = signed.result;
        signature.content_fingerprint = Some(fingerprint);
        if let Some(notice) = identity_notice(&document.doctor.name, &signature.certificate) {
            notices.push(notice);
        }
        document.set_signature(signature.clone());
        log::info!("document {} signed", document.id);

        Ok(DocumentOutcome {
            document_bytes: signed.bytes,
            validation,
            signature: Some(signature),
            notices,
        })
    }
}

/// Lowercase, strip diacritics and honorifics, collapse whitespace.
fn normalize_name(name: &str) -> String {
    let folded: String = name
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            'ñ' => 'n',
            '.' | ',' => ' ',
            other => other,
        })
        .collect();
    folded
        .split_whitespace()
        .filter(|token| !HONORIFICS.contains(token))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Notice for a doctor name that does not match the certificate holder.
fn identity_notice(doctor_name: &str, certificate: &CertificateInfo) -> Option<String> {
    match certificate.holder_name.as_deref() {
        Some(holder) if !holder.trim().is_empty() => {
            if normalize_name(holder) == normalize_name(doctor_name) {
                None
            } else {
                Some(format!(
                    "O nome do médico no documento difere do titular do certificado ({}).",
                    holder.trim()
                ))
            }
        },
        _ => Some("Não foi possível confirmar a identidade do titular do certificado.".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(holder: Option<&str>) -> CertificateInfo {
        CertificateInfo {
            subject: "CN=Test".to_string(),
            issuer: "CN=Test CA".to_string(),
            serial: "01".to_string(),
            valid_from: chrono::Utc::now(),
            valid_to: chrono::Utc::now(),
            holder_id: None,
            holder_name: holder.map(str::to_string),
        }
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("Dra.  Ana   Ribeiro"), "ana ribeiro");
        assert_eq!(normalize_name("JOÃO CONCEIÇÃO"), "joao conceicao");
    }

    #[test]
    fn test_identity_notice() {
        assert!(identity_notice("Dra. Ana Ribeiro", &info(Some("ANA RIBEIRO"))).is_none());
        assert!(identity_notice("Dr. Carlos Souza", &info(Some("ANA RIBEIRO"))).is_some());
        let unknown = identity_notice("Dr. Carlos Souza", &info(None)).unwrap();
        assert!(unknown.contains("confirmar"));
    }
}
