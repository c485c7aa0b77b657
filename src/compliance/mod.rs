//! Regulatory compliance validation for medical documents.
//!
//! ## Rules
//!
//! - Doctor name and council license (CRM) are mandatory; a missing specialty
//!   is only a warning.
//! - Patient name is mandatory; a missing CPF is only a warning.
//! - Prescriptions need at least one medication, each with name, dosage,
//!   frequency and duration.
//! - Each medication is classified through a [`MedicationClassifier`]. The
//!   strictest classification decides the [`PrescriptionTemplate`]:
//!   - special control (C lists): special-control form in duplicate, with
//!     quantities spelled out;
//!   - psychotropics and narcotics (A and B lists): notification form,
//!     quantities spelled out;
//!   - antimicrobials: duplicate copy for pharmacy retention, numerals only.
//! - A controlled class without a known list is flagged for manual review.
//!
//! ## Example
//!
//! ```ignore
//! use medsign::compliance::ComplianceValidator;
//!
//! let result = ComplianceValidator::default().validate(&document);
//! for error in &result.errors {
//!     eprintln!("{}", error);
//! }
//! ```

mod classifier;
mod number_words;
mod types;
mod validator;

pub use classifier::{MedicationClassifier, StaticMedicationTable};
pub use number_words::{number_to_words, spell_numerals, with_words, MAX_SPELLED};
pub use types::{
    Classification, ControlCategory, ErrorCode, PrescriptionTemplate, ValidationError,
    ValidationResult, ValidationWarning, WarningCode,
};
pub use validator::ComplianceValidator;
