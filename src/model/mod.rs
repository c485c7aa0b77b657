//! Medical document data model.
//!
//! A [`MedicalDocument`] carries the identity of the patient and the doctor,
//! the type-specific content, and optionally the signature produced when it
//! was last signed. Content can only be changed through
//! [`MedicalDocument::edit_content`], which drops that signature.

mod document;
mod medication;

pub use document::{
    CertificateContent, DocumentContent, DocumentType, ExamRequestContent, MedicalDocument,
    PrescriptionContent, ReferralContent, ReportContent,
};
pub use medication::{DoctorInfo, MedicationItem, PatientInfo};

pub(crate) use document::hex_lower;
