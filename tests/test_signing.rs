//! Integration tests for signing, inspection and verification.

mod common;

use medsign::render::DocumentRenderer;
use medsign::signatures::{
    get_signature_info, hash_document, is_signed, unsigned_revision, verify_integrity, HashAlgorithm,
    SignOptions, SignatureEngine, SignatureVerifier, VerificationStatus,
};
use medsign::{CertificateError, Error};

fn rendered() -> Vec<u8> {
    DocumentRenderer::default()
        .render(&common::prescription())
        .expect("render")
}

fn options() -> SignOptions {
    SignOptions::new()
        .with_reason("Prescrição médica")
        .with_location("São Paulo - SP")
        .with_contact_info("contato@clinica.example")
}

mod round_trip {
    use super::*;

    #[test]
    fn test_sign_then_inspect() {
        let pdf = rendered();
        assert!(!is_signed(&pdf));

        let signed = SignatureEngine::default()
            .sign(&pdf, &common::valid_archive(), common::PASSWORD, &options())
            .unwrap();

        let info = get_signature_info(&signed.bytes).unwrap();
        assert!(info.signed);
        assert_eq!(info.reason.as_deref(), Some("Prescrição médica"));
        assert_eq!(info.location.as_deref(), Some("São Paulo - SP"));
        assert_eq!(info.contact_info.as_deref(), Some("contato@clinica.example"));
        assert_eq!(info.signer_name.as_deref(), Some("Dra. Ana Ribeiro"));
        assert_eq!(info.field_name.as_deref(), Some("Signature1"));
        assert_eq!(info.sub_filter.as_deref(), Some("adbe.pkcs7.detached"));
        assert!(is_signed(&signed.bytes));
    }

    #[test]
    fn test_explicit_signer_name() {
        let pdf = rendered();
        let signed = SignatureEngine::default()
            .sign(
                &pdf,
                &common::valid_archive(),
                common::PASSWORD,
                &options().with_signer_name("Ana Ribeiro (CRM/SP 123456)"),
            )
            .unwrap();
        let info = get_signature_info(&signed.bytes).unwrap();
        assert_eq!(info.signer_name.as_deref(), Some("Ana Ribeiro (CRM/SP 123456)"));
    }

    #[test]
    fn test_signature_result() {
        let pdf = rendered();
        let signed = SignatureEngine::default()
            .sign(&pdf, &common::valid_archive(), common::PASSWORD, &options())
            .unwrap();
        let result = &signed.result;

        assert_eq!(result.algorithm, "SHA256withRSA");
        assert_eq!(result.hash_algorithm, HashAlgorithm::Sha256);
        assert_eq!(result.document_hash, hash_document(&pdf));
        assert_eq!(result.original_size, pdf.len());
        assert!(result.certificate.subject.contains("ICP-Brasil"));
        assert_eq!(result.certificate.holder_name.as_deref(), Some("Dra. Ana Ribeiro"));
        assert_eq!(result.certificate.holder_id.as_deref(), Some("12345678901"));
        assert!(!result.signature_value.is_empty());
    }
}

mod byte_range {
    use super::*;

    #[test]
    fn test_signed_length_equals_prepared_length() {
        let pdf = rendered();
        let prepared = SignatureEngine::default()
            .prepare(&pdf, &common::valid_archive(), common::PASSWORD, &options())
            .unwrap();
        let prepared_len = prepared.prepared_len();
        let signed = prepared.digest().embed().unwrap();
        assert_eq!(signed.bytes.len(), prepared_len);
    }

    #[test]
    fn test_byte_range_covers_file_except_contents() {
        let pdf = rendered();
        let signed = SignatureEngine::default()
            .sign(&pdf, &common::valid_archive(), common::PASSWORD, &options())
            .unwrap();
        let [start, first_len, second_start, second_len] = signed.result.byte_range;
        assert_eq!(start, 0);
        assert_eq!((second_start + second_len) as usize, signed.bytes.len());
        assert_eq!(signed.bytes[first_len as usize], b'<');
        assert_eq!(signed.bytes[second_start as usize - 1], b'>');
        // 16 KiB of capacity as hex digits plus the delimiters
        assert_eq!(second_start - first_len, 16 * 1024 * 2 + 2);
    }
}

mod verification {
    use super::*;

    #[test]
    fn test_verify_valid_signature() {
        let pdf = rendered();
        let signed = SignatureEngine::default()
            .sign(&pdf, &common::valid_archive(), common::PASSWORD, &options())
            .unwrap();

        let report = SignatureVerifier::default().verify(&signed.bytes).unwrap();
        assert_eq!(report.status, VerificationStatus::Valid, "{:?}", report.messages);
        assert!(report.certificate_trusted);
        assert!(!report.document_modified);
        assert!(report.signing_time.is_some());
        let signer = report.signer.unwrap();
        assert_eq!(signer.holder_name.as_deref(), Some("Dra. Ana Ribeiro"));
    }

    #[test]
    fn test_untrusted_issuer_is_a_warning() {
        let now = std::time::SystemTime::now();
        let archive = common::archive_with(
            "CN=Dra. Ana Ribeiro:12345678901,O=Autoridade Desconhecida,C=BR",
            now - common::DAY,
            now + 30 * common::DAY * 12,
        );
        let signed = SignatureEngine::default()
            .sign(&rendered(), &archive, common::PASSWORD, &options())
            .unwrap();
        let report = SignatureVerifier::default().verify(&signed.bytes).unwrap();
        assert_eq!(report.status, VerificationStatus::ValidWithWarnings);
        assert!(!report.certificate_trusted);
    }

    #[test]
    fn test_tampered_signed_range_is_invalid() {
        let pdf = rendered();
        let signed = SignatureEngine::default()
            .sign(&pdf, &common::valid_archive(), common::PASSWORD, &options())
            .unwrap();

        // Flip a byte inside the original revision (the PDF header comment).
        let mut tampered = signed.bytes.clone();
        tampered[1] = b'Q';
        let report = SignatureVerifier::default().verify(&tampered).unwrap();
        assert_eq!(report.status, VerificationStatus::Invalid);
        assert!(report.document_modified);
    }

    #[test]
    fn test_appended_bytes_are_detected() {
        let pdf = rendered();
        let signed = SignatureEngine::default()
            .sign(&pdf, &common::valid_archive(), common::PASSWORD, &options())
            .unwrap();
        let mut extended = signed.bytes.clone();
        extended.extend_from_slice(b"% trailing garbage\n");
        let report = SignatureVerifier::default().verify(&extended).unwrap();
        assert_eq!(report.status, VerificationStatus::Invalid);
        assert!(report.document_modified);
    }

    #[test]
    fn test_unsigned_pdf() {
        let report = SignatureVerifier::default().verify(&rendered()).unwrap();
        assert_eq!(report.status, VerificationStatus::NotSigned);
    }
}

mod integrity {
    use super::*;

    #[test]
    fn test_verify_integrity_with_recorded_hash() {
        let pdf = rendered();
        let signed = SignatureEngine::default()
            .sign(&pdf, &common::valid_archive(), common::PASSWORD, &options())
            .unwrap();

        assert_eq!(unsigned_revision(&signed.bytes), pdf.as_slice());
        verify_integrity(&signed.bytes, &signed.result.document_hash, signed.result.hash_algorithm).unwrap();
    }

    #[test]
    fn test_verify_integrity_detects_tampering() {
        let pdf = rendered();
        let signed = SignatureEngine::default()
            .sign(&pdf, &common::valid_archive(), common::PASSWORD, &options())
            .unwrap();

        let mut tampered = signed.bytes.clone();
        tampered[2] = b'X';
        let err = verify_integrity(&tampered, &signed.result.document_hash, HashAlgorithm::Sha256).unwrap_err();
        assert!(matches!(err, Error::Integrity { .. }));
    }

    #[test]
    fn test_verify_integrity_rejects_appended_update() {
        let pdf = rendered();
        let signed = SignatureEngine::default()
            .sign(&pdf, &common::valid_archive(), common::PASSWORD, &options())
            .unwrap();

        let mut forged = signed.bytes.clone();
        forged.extend_from_slice(b"99 0 obj\n<< /Type /Page /Contents (FORGED CONTENT) >>\nendobj\n%%EOF\n");
        // The original revision is untouched, so only the coverage check catches this.
        assert_eq!(unsigned_revision(&forged), pdf.as_slice());
        let err = verify_integrity(&forged, &signed.result.document_hash, signed.result.hash_algorithm).unwrap_err();
        assert!(matches!(err, Error::Integrity { .. }));
    }

    #[test]
    fn test_unsigned_pdf_hashes_whole_file() {
        let pdf = rendered();
        verify_integrity(&pdf, &hash_document(&pdf), HashAlgorithm::Sha256).unwrap();
    }
}

mod refusals {
    use super::*;

    #[test]
    fn test_already_signed_is_refused() {
        let engine = SignatureEngine::default();
        let signed = engine
            .sign(&rendered(), &common::valid_archive(), common::PASSWORD, &options())
            .unwrap();
        let err = engine
            .sign(&signed.bytes, &common::valid_archive(), common::PASSWORD, &options())
            .unwrap_err();
        assert!(matches!(err, Error::AlreadySigned));
    }

    #[test]
    fn test_resign_with_override() {
        let engine = SignatureEngine::default();
        let signed = engine
            .sign(&rendered(), &common::valid_archive(), common::PASSWORD, &options())
            .unwrap();
        let resigned = engine
            .sign(
                &signed.bytes,
                &common::valid_archive(),
                common::PASSWORD,
                &options().allow_resign(true),
            )
            .unwrap();
        assert_eq!(resigned.result.field_name, "Signature2");
        assert_eq!(unsigned_revision(&resigned.bytes), signed.bytes.as_slice());

        let report = SignatureVerifier::default().verify(&resigned.bytes).unwrap();
        assert!(report.status.is_ok(), "{:?}", report.messages);
    }

    #[test]
    fn test_expired_certificate() {
        let err = SignatureEngine::default()
            .sign(&rendered(), &common::expired_archive(), common::PASSWORD, &options())
            .unwrap_err();
        assert!(matches!(err, Error::Credentials(CertificateError::Expired { .. })));
        assert_eq!(err.to_string(), "cannot sign with provided credentials");
    }

    #[test]
    fn test_wrong_password() {
        let err = SignatureEngine::default()
            .sign(&rendered(), &common::valid_archive(), "errada", &options())
            .unwrap_err();
        assert!(matches!(err, Error::Credentials(CertificateError::Unreadable)));
        assert_eq!(err.to_string(), "cannot sign with provided credentials");
    }

    #[test]
    fn test_key_mismatch() {
        let err = SignatureEngine::default()
            .sign(&rendered(), &common::mismatched_archive(), common::PASSWORD, &options())
            .unwrap_err();
        assert!(err.is_credentials());
    }
}

mod hashing {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_hash_is_stable_hex(data in proptest::collection::vec(any::<u8>(), 0..512)) {
            let hash = hash_document(&data);
            prop_assert_eq!(hash.len(), 64);
            prop_assert!(hash.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)));
            prop_assert_eq!(hash_document(&data), hash);
        }

        #[test]
        fn prop_single_byte_change_alters_hash(
            data in proptest::collection::vec(any::<u8>(), 1..512),
            index in any::<prop::sample::Index>(),
            flip in 1u8..=255,
        ) {
            let mut changed = data.clone();
            let i = index.index(changed.len());
            changed[i] ^= flip;
            prop_assert_ne!(hash_document(&data), hash_document(&changed));
        }
    }
}
