//! Integration tests for the validate → render → sign pipeline.

mod common;

use medsign::model::{CertificateContent, DocumentContent, DoctorInfo, ExamRequestContent};
use medsign::render::DocumentRenderer;
use medsign::signatures::{get_signature_info, verify_integrity, SignatureVerifier};
use medsign::{DocumentService, EngineConfig, Error, IssueFailure, MedicalDocument};

fn service() -> DocumentService {
    DocumentService::new(EngineConfig::default()).unwrap()
}

fn contains(haystack: &[u8], needle: &str) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle.as_bytes())
}

#[test]
fn test_signed_prescription() {
    let service = service();
    let mut document = common::prescription();

    let validation = service.validate(&document);
    assert!(validation.is_valid, "{:?}", validation.errors);

    let request = service.signing_request(common::valid_archive(), common::PASSWORD);
    let outcome = service.issue_prescription(&mut document, Some(request)).unwrap();

    assert!(outcome.is_signed());
    assert!(outcome.document_bytes.starts_with(b"%PDF-"));
    assert!(contains(&outcome.document_bytes, "Amoxicilina 500mg"));
    assert!(outcome.notices.is_empty(), "{:?}", outcome.notices);

    let signature = outcome.signature.as_ref().unwrap();
    assert_eq!(signature.algorithm, "SHA256withRSA");
    assert!(signature.certificate.subject.contains("Dra. Ana Ribeiro:12345678901"));
    assert_eq!(
        signature.content_fingerprint.as_deref(),
        Some(document.content_fingerprint().as_str())
    );
    assert_eq!(document.signature(), Some(signature));

    let report = SignatureVerifier::default().verify(&outcome.document_bytes).unwrap();
    assert!(report.status.is_ok(), "{:?}", report.messages);
    verify_integrity(
        &outcome.document_bytes,
        &signature.document_hash,
        signature.hash_algorithm,
    )
    .unwrap();
}

#[test]
fn test_unsigned_issue() {
    let service = service();
    let mut document = common::prescription();
    let outcome = service.issue_prescription(&mut document, None).unwrap();

    assert!(!outcome.is_signed());
    assert!(get_signature_info(&outcome.document_bytes).is_none());
    assert!(document.signature().is_none());
}

#[test]
fn test_holder_name_mismatch_notice() {
    let service = service();
    let mut document = common::prescription_with(
        DoctorInfo::new("Dr. Carlos Souza", "654321")
            .with_license_state("RJ")
            .with_specialty("Pediatria"),
        vec![common::amoxicillin()],
    );

    let request = service.signing_request(common::valid_archive(), common::PASSWORD);
    let outcome = service.issue_prescription(&mut document, Some(request)).unwrap();

    assert!(outcome.is_signed());
    assert_eq!(outcome.notices.len(), 1);
    assert!(outcome.notices[0].contains("Dra. Ana Ribeiro"));
}

#[test]
fn test_holder_name_matches_without_honorific() {
    let service = service();
    let mut document = common::prescription_with(
        DoctorInfo::new("ANA RIBEIRO", "123456").with_specialty("Clínica Médica"),
        vec![common::amoxicillin()],
    );
    let request = service.signing_request(common::valid_archive(), common::PASSWORD);
    let outcome = service.issue_prescription(&mut document, Some(request)).unwrap();
    assert!(outcome.notices.is_empty(), "{:?}", outcome.notices);
}

#[test]
fn test_expired_certificate_returns_unsigned_pdf() {
    let service = service();
    let mut document = common::prescription();

    let request = service.signing_request(common::expired_archive(), common::PASSWORD);
    let failure = service.issue_prescription(&mut document, Some(request)).unwrap_err();

    assert!(failure.is_credentials());
    assert_eq!(failure.to_string(), "cannot sign with provided credentials");
    let unsigned = failure.unsigned_bytes().unwrap();
    let fresh = DocumentRenderer::default().render(&document).unwrap();
    assert_eq!(unsigned, fresh.as_slice());
    assert!(document.signature().is_none());
}

#[test]
fn test_wrong_password_is_credentials_failure() {
    let service = service();
    let mut document = common::prescription();
    let request = service.signing_request(common::valid_archive(), "outra-senha");
    let failure = service.issue_prescription(&mut document, Some(request)).unwrap_err();
    assert!(failure.is_credentials());
    assert!(failure.unsigned_bytes().is_some());
}

#[test]
fn test_validation_rejection() {
    let service = service();
    let mut document = common::prescription();
    document.doctor.license_number = String::new();

    let request = service.signing_request(common::valid_archive(), common::PASSWORD);
    let failure = service.issue_prescription(&mut document, Some(request)).unwrap_err();

    let IssueFailure::Rejected(validation) = &failure else {
        panic!("expected rejection, got {:?}", failure);
    };
    assert_eq!(validation.errors.len(), 1);
    assert_eq!(validation.errors[0].field, "doctor.license_number");
    assert!(failure.unsigned_bytes().is_none());
}

#[test]
fn test_already_signed_document_is_refused() {
    let service = service();
    let mut document = common::prescription();

    let first = service.signing_request(common::valid_archive(), common::PASSWORD);
    service.issue_prescription(&mut document, Some(first)).unwrap();

    let second = service.signing_request(common::valid_archive(), common::PASSWORD);
    let failure = service.issue_prescription(&mut document, Some(second)).unwrap_err();
    assert!(matches!(failure.error(), Some(Error::AlreadySigned)));
    assert!(failure.unsigned_bytes().is_some());

    let resign = service
        .signing_request(common::valid_archive(), common::PASSWORD)
        .allow_resign(true);
    let outcome = service.issue_prescription(&mut document, Some(resign)).unwrap();
    assert!(outcome.is_signed());
}

#[test]
fn test_edit_discards_signature() {
    let service = service();
    let mut document = common::prescription();
    let request = service.signing_request(common::valid_archive(), common::PASSWORD);
    service.issue_prescription(&mut document, Some(request)).unwrap();
    assert!(document.signature().is_some());

    let previous = document.edit_content(|content| {
        if let DocumentContent::Prescription(p) = content {
            p.notes = Some("Tomar após as refeições".to_string());
        }
    });
    assert!(previous.is_some());
    assert!(document.signature().is_none());

    // A fresh signature is allowed without the re-sign override.
    let request = service.signing_request(common::valid_archive(), common::PASSWORD);
    let outcome = service.issue_prescription(&mut document, Some(request)).unwrap();
    assert!(outcome.is_signed());
}

#[test]
fn test_stale_signature_is_discarded_with_notice() {
    let service = service();
    let mut document = common::prescription();
    let request = service.signing_request(common::valid_archive(), common::PASSWORD);
    service.issue_prescription(&mut document, Some(request)).unwrap();

    // Direct field edits bypass edit_content; the fingerprint catches them.
    document.patient.name = "Maria Souza Lima".to_string();

    let outcome = service.issue_prescription(&mut document, None).unwrap();
    assert!(!outcome.is_signed());
    assert!(document.signature().is_none());
    assert_eq!(outcome.notices.len(), 1);
    assert!(outcome.notices[0].contains("assinatura anterior foi descartada"));
}

#[test]
fn test_document_type_mismatch() {
    let service = service();
    let mut document = common::prescription();
    let failure = service.issue_certificate(&mut document, None).unwrap_err();
    assert!(matches!(failure.error(), Some(Error::DocumentTypeMismatch { .. })));
}

#[test]
fn test_other_document_types() {
    let service = service();

    let mut certificate = MedicalDocument::new(
        DocumentContent::Certificate(CertificateContent {
            text: "Atesto para os devidos fins que a paciente necessita de repouso.".to_string(),
            leave_days: Some(3),
            cid: None,
        }),
        common::patient(),
        common::doctor(),
        chrono::Utc::now(),
    );
    let outcome = service.issue_certificate(&mut certificate, None).unwrap();
    assert!(outcome.document_bytes.starts_with(b"%PDF-"));

    let mut exams = MedicalDocument::new(
        DocumentContent::ExamRequest(ExamRequestContent {
            exams: vec!["Hemograma completo".to_string(), "Glicemia de jejum".to_string()],
            clinical_indication: Some("Rotina".to_string()),
        }),
        common::patient(),
        common::doctor(),
        chrono::Utc::now(),
    );
    let request = service.signing_request(common::valid_archive(), common::PASSWORD);
    let outcome = service.issue_exam_request(&mut exams, Some(request)).unwrap();
    assert!(outcome.is_signed());
    assert!(contains(&outcome.document_bytes, "Hemograma completo"));
}
