//! Integration tests for PKCS#12 certificate handling.

mod common;

use std::time::{Duration, SystemTime};

use chrono::Utc;
use medsign::certificates::{
    extract_certificate_info, validate_certificate, CertificateManager, CertificateWarning, SigningCredentials,
};
use medsign::{CertificateError, EngineConfig};

#[test]
fn test_valid_certificate_has_no_errors() {
    let result = validate_certificate(&common::valid_archive(), common::PASSWORD);
    assert!(result.valid);
    assert!(result.errors.is_empty(), "{:?}", result.errors);
    assert!(result.warnings.is_empty(), "{:?}", result.warnings);

    let info = result.info.unwrap();
    assert_eq!(info.holder_name.as_deref(), Some("Dra. Ana Ribeiro"));
    assert_eq!(info.holder_id.as_deref(), Some("12345678901"));
}

#[test]
fn test_expired_certificate_single_error() {
    let result = validate_certificate(&common::expired_archive(), common::PASSWORD);
    assert!(!result.valid);
    assert_eq!(result.errors.len(), 1);
    assert!(matches!(result.errors[0], CertificateError::Expired { .. }));
    assert!(result.info.is_some());
}

#[test]
fn test_validity_window_boundaries() {
    let now = SystemTime::now();
    let archive = common::archive_with(
        &format!("CN={},O=ICP-Brasil,C=BR", common::HOLDER_CN),
        now - common::DAY,
        now + 100 * common::DAY,
    );
    let manager = CertificateManager::default();
    let info = manager.extract_certificate_info(&archive, common::PASSWORD).unwrap();

    let at_start = manager.validate_certificate_at(&archive, common::PASSWORD, info.valid_from);
    assert!(at_start.valid, "{:?}", at_start.errors);

    let at_end = manager.validate_certificate_at(&archive, common::PASSWORD, info.valid_to);
    assert!(at_end.valid, "{:?}", at_end.errors);

    let after = manager.validate_certificate_at(
        &archive,
        common::PASSWORD,
        info.valid_to + chrono::Duration::seconds(1),
    );
    assert!(matches!(after.errors.as_slice(), [CertificateError::Expired { .. }]));

    let before = manager.validate_certificate_at(
        &archive,
        common::PASSWORD,
        info.valid_from - chrono::Duration::seconds(1),
    );
    assert!(matches!(before.errors.as_slice(), [CertificateError::NotYetValid { .. }]));
}

#[test]
fn test_expiring_soon_warns() {
    let now = SystemTime::now();
    let archive = common::archive_with(
        &format!("CN={},O=ICP-Brasil,C=BR", common::HOLDER_CN),
        now - common::DAY,
        now + 10 * common::DAY,
    );
    let result = validate_certificate(&archive, common::PASSWORD);
    assert!(result.valid);
    assert!(result
        .warnings
        .iter()
        .any(|w| matches!(w, CertificateWarning::ExpiresSoon { .. })));
}

#[test]
fn test_untrusted_issuer_warns() {
    let now = SystemTime::now();
    let archive = common::archive_with(
        &format!("CN={},O=Outra AC,C=BR", common::HOLDER_CN),
        now - common::DAY,
        now + 365 * common::DAY,
    );
    let result = validate_certificate(&archive, common::PASSWORD);
    assert!(result.valid);
    assert!(matches!(
        result.warnings.as_slice(),
        [CertificateWarning::UntrustedIssuer { .. }]
    ));

    let trusting = CertificateManager::new(&EngineConfig::new().with_trusted_issuers(["Outra AC"]));
    assert!(trusting.validate_certificate(&archive, common::PASSWORD).warnings.is_empty());
}

#[test]
fn test_wrong_password_is_unreadable() {
    let result = validate_certificate(&common::valid_archive(), "senha-errada");
    assert!(!result.valid);
    assert_eq!(result.errors, vec![CertificateError::Unreadable]);
    assert!(result.info.is_none());
}

#[test]
fn test_key_mismatch() {
    let result = validate_certificate(&common::mismatched_archive(), common::PASSWORD);
    assert!(!result.valid);
    assert_eq!(result.errors, vec![CertificateError::KeyMismatch]);
}

#[test]
fn test_open_for_signing() {
    let manager = CertificateManager::default();
    let (credentials, validation) = manager
        .open_for_signing(&common::valid_archive(), common::PASSWORD, Utc::now())
        .unwrap();
    assert!(validation.valid);
    assert!(credentials.chain().is_empty());

    let err = manager
        .open_for_signing(&common::expired_archive(), common::PASSWORD, Utc::now())
        .unwrap_err();
    assert!(err.is_credentials());
    assert_eq!(err.to_string(), "cannot sign with provided credentials");
}

#[test]
fn test_extract_certificate_info() {
    let info = extract_certificate_info(&common::valid_archive(), common::PASSWORD).unwrap();
    assert!(info.subject.contains("Dra. Ana Ribeiro:12345678901"));
    assert!(info.issuer.contains("ICP-Brasil"));
    assert_eq!(info.holder_name.as_deref(), Some("Dra. Ana Ribeiro"));
    assert_eq!(info.holder_id.as_deref(), Some("12345678901"));
    assert!(info.valid_from < info.valid_to);
    assert!(info.is_valid_at(Utc::now()));
}

#[test]
fn test_common_name_without_id() {
    let now = SystemTime::now();
    let archive = common::archive_with(
        "CN=Ana Ribeiro,O=ICP-Brasil,C=BR",
        now - common::DAY,
        now + 365 * common::DAY,
    );
    let info = extract_certificate_info(&archive, common::PASSWORD).unwrap();
    assert!(info.holder_id.is_none());
}

#[test]
fn test_credentials_from_pkcs12() {
    let credentials = SigningCredentials::from_pkcs12(&common::valid_archive(), common::PASSWORD).unwrap();
    assert!(!credentials.certificate().is_empty());

    let err = SigningCredentials::from_pkcs12(b"not an archive", common::PASSWORD).unwrap_err();
    assert_eq!(err, CertificateError::Unreadable);
}

#[test]
fn test_credentials_reject_foreign_key() {
    let now = SystemTime::now();
    let cert = common::certificate(
        &format!("CN={},O=ICP-Brasil,C=BR", common::HOLDER_CN),
        now - common::DAY,
        now + Duration::from_secs(3600),
    );
    let err = SigningCredentials::new(cert, common::other_key().clone()).unwrap_err();
    assert_eq!(err, CertificateError::KeyMismatch);
}
