//! Shared fixtures: test certificates, PKCS#12 archives and documents.
#![allow(dead_code)]

use std::str::FromStr;
use std::sync::OnceLock;
use std::time::{Duration, SystemTime};

use chrono::{TimeZone, Utc};
use medsign::model::{DocumentContent, DoctorInfo, MedicationItem, PatientInfo, PrescriptionContent};
use medsign::MedicalDocument;
use rsa::pkcs1v15::{Signature, SigningKey};
use rsa::pkcs8::EncodePrivateKey;
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use x509_cert::builder::{Builder, CertificateBuilder, Profile};
use x509_cert::der::Encode;
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::SubjectPublicKeyInfoOwned;
use x509_cert::time::{Time, Validity};

pub const PASSWORD: &str = "senha-de-teste";
pub const HOLDER_CN: &str = "Dra. Ana Ribeiro:12345678901";
pub const DAY: Duration = Duration::from_secs(86_400);

fn generate_key() -> RsaPrivateKey {
    let mut rng = rand::thread_rng();
    RsaPrivateKey::new(&mut rng, 1024).expect("key generation")
}

pub fn signing_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(generate_key)
}

pub fn other_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(generate_key)
}

/// `t` truncated to whole seconds, as X.509 validity is encoded.
pub fn whole_seconds(t: SystemTime) -> SystemTime {
    let secs = t.duration_since(SystemTime::UNIX_EPOCH).expect("after epoch").as_secs();
    SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
}

/// Self-issued certificate for `signing_key()`.
pub fn certificate(subject: &str, not_before: SystemTime, not_after: SystemTime) -> Vec<u8> {
    let key = signing_key();
    let signer = SigningKey::<Sha256>::new(key.clone());
    let validity = Validity {
        not_before: Time::try_from(whole_seconds(not_before)).expect("not_before"),
        not_after: Time::try_from(whole_seconds(not_after)).expect("not_after"),
    };
    let spki = SubjectPublicKeyInfoOwned::from_key(RsaPublicKey::from(key)).expect("spki");
    let builder = CertificateBuilder::new(
        Profile::Root,
        SerialNumber::from(0x2024u32),
        validity,
        Name::from_str(subject).expect("subject"),
        spki,
        &signer,
    )
    .expect("builder");
    builder.build::<Signature>().expect("certificate").to_der().expect("der")
}

/// PKCS#12 archive holding `cert` and `key`.
pub fn pack(cert: &[u8], key: &RsaPrivateKey, password: &str) -> Vec<u8> {
    let key_der = key.to_pkcs8_der().expect("pkcs8");
    p12::PFX::new(cert, key_der.as_bytes(), None, password, "medsign-test")
        .expect("pfx")
        .to_der()
}

pub fn archive_with(subject: &str, not_before: SystemTime, not_after: SystemTime) -> Vec<u8> {
    pack(&certificate(subject, not_before, not_after), signing_key(), PASSWORD)
}

/// Certificate valid from yesterday for one year, issued under ICP-Brasil.
pub fn valid_archive() -> Vec<u8> {
    let now = SystemTime::now();
    archive_with(
        &format!("CN={},O=ICP-Brasil,C=BR", HOLDER_CN),
        now - DAY,
        now + 365 * DAY,
    )
}

/// Certificate that expired one second ago.
pub fn expired_archive() -> Vec<u8> {
    let now = SystemTime::now();
    archive_with(
        &format!("CN={},O=ICP-Brasil,C=BR", HOLDER_CN),
        now - 30 * DAY,
        now - Duration::from_secs(1),
    )
}

/// Archive whose private key does not belong to the certificate.
pub fn mismatched_archive() -> Vec<u8> {
    let now = SystemTime::now();
    let cert = certificate(&format!("CN={},O=ICP-Brasil,C=BR", HOLDER_CN), now - DAY, now + 365 * DAY);
    pack(&cert, other_key(), PASSWORD)
}

pub fn doctor() -> DoctorInfo {
    DoctorInfo::new("Dra. Ana Ribeiro", "123456")
        .with_license_state("SP")
        .with_specialty("Clínica Médica")
}

pub fn patient() -> PatientInfo {
    PatientInfo::new("Maria Souza").with_document_id("123.456.789-09")
}

pub fn prescription_with(doctor: DoctorInfo, medications: Vec<MedicationItem>) -> MedicalDocument {
    MedicalDocument::new(
        DocumentContent::Prescription(PrescriptionContent {
            medications,
            notes: None,
        }),
        patient(),
        doctor,
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
    )
}

pub fn amoxicillin() -> MedicationItem {
    MedicationItem::new("Amoxicilina 500mg", "500mg", "8/8h", "7 dias")
}

pub fn prescription() -> MedicalDocument {
    prescription_with(doctor(), vec![amoxicillin()])
}
