//! Digital signatures for rendered documents.
//!
//! Signatures are appended as an incremental update: the unsigned file is
//! kept byte for byte, followed by a signature dictionary (`/Filter
//! /Adobe.PPKLite`, `/SubFilter /adbe.pkcs7.detached`), a `/FT /Sig` widget
//! on the first page and an AcroForm with `/SigFlags 3`. The `/Contents`
//! value is a detached CMS `SignedData` (SHA256withRSA) over every byte of
//! the file except the `/Contents` value itself.
//!
//! ## Example
//!
//! ```ignore
//! use medsign::signatures::{SignOptions, SignatureEngine, SignatureVerifier};
//!
//! let engine = SignatureEngine::default();
//! let options = SignOptions::new().with_reason("Prescrição médica");
//! let signed = engine.sign(&pdf_bytes, &p12_bytes, &password, &options)?;
//!
//! let report = SignatureVerifier::default().verify(&signed.bytes)?;
//! assert!(report.status.is_ok());
//! ```
//!
//! Only classic cross-reference tables are supported as input; files whose
//! latest revision uses a cross-reference stream are rejected.

mod byterange;
mod container;
mod incremental;
mod inspect;
mod signer;
mod types;
mod verifier;

pub use byterange::{ByteRangeCalculator, BYTE_RANGE_WIDTH};
pub use inspect::{get_signature_info, hash_document, is_signed, unsigned_revision, verify_integrity};
pub use signer::{DigestedSignature, PreparedSignature, SignatureEngine};
pub use types::{
    HashAlgorithm, SignOptions, SignatureInfo, SignatureResult, SignedPdf, VerificationResult,
    VerificationStatus, SIGNATURE_ALGORITHM, SIGNATURE_FILTER, SIGNATURE_SUB_FILTER,
};
pub use verifier::SignatureVerifier;
