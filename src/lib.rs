// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::too_many_arguments)]
#![allow(clippy::needless_range_loop)]
#![allow(clippy::should_implement_trait)]
#![allow(clippy::large_enum_variant)]

//! # medsign
//!
//! Compliance validation, PDF rendering and digital signing for Brazilian
//! medical documents.
//!
//! ## Components
//!
//! - **Compliance Validator** ([`compliance`]): regulatory rules for
//!   prescriptions, certificates, referrals, exam requests and reports,
//!   including controlled-substance templates.
//! - **PDF Renderer** ([`render`], [`writer`]): deterministic PDF output with
//!   a verification QR code on every page.
//! - **Certificate Manager** ([`certificates`]): PKCS#12 archives, holder
//!   identity and validity checks.
//! - **Signature Engine** ([`signatures`]): incremental-update PAdES-style
//!   signatures (`adbe.pkcs7.detached`, SHA256withRSA), inspection and
//!   verification.
//! - **Document Service** ([`service`]): validate → render → sign per
//!   document type on a bounded worker pool.
//!
//! ## Quick Start
//!
//! ```ignore
//! use medsign::model::MedicalDocument;
//! use medsign::service::DocumentService;
//! use medsign::EngineConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let service = DocumentService::new(EngineConfig::default())?;
//! let mut document = MedicalDocument::from_json(&std::fs::read_to_string("receita.json")?)?;
//!
//! let request = service.signing_request(std::fs::read("medico.p12")?, "senha");
//! let outcome = service.issue_prescription(&mut document, Some(request))?;
//! std::fs::write("receita.pdf", &outcome.document_bytes)?;
//! for notice in &outcome.notices {
//!     println!("{}", notice);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Logging
//!
//! The library logs through the [`log`] facade. Passwords, key material and
//! patient identifiers are never logged; documents are referred to by id.

#![warn(missing_docs)]

// Error handling
pub mod error;

// Configuration
pub mod config;

// PDF objects and the minimal parser used by signature updates
pub mod object;
pub mod parser;

// Document model
pub mod model;

// Compliance validation
pub mod compliance;

// PDF writing and document rendering
pub mod render;
pub mod writer;

// Certificates and signatures
pub mod certificates;
pub mod signatures;

// Orchestration
pub mod service;

// Re-exports
pub use config::EngineConfig;
pub use error::{CertificateError, Error, Result};
pub use model::{DocumentType, MedicalDocument};
pub use service::{DocumentOutcome, DocumentService, IssueFailure, SigningRequest};
pub use signatures::{SignOptions, SignatureResult, SignatureVerifier};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_name() {
        assert_eq!(NAME, "medsign");
    }
}
