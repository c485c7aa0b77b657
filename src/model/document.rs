//! Medical documents, their typed content and the attached signature record.
//!
//! A signature records the content fingerprint it was made over. Once the
//! document's fingerprint moves on, that signature is stale.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::medication::{DoctorInfo, MedicationItem, PatientInfo};
use crate::compliance::ValidationResult;
use crate::signatures::SignatureResult;

/// Kind of medical document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    /// Medication prescription
    Prescription,
    /// Medical certificate (leave or attendance)
    Certificate,
    /// Referral to another specialty
    Referral,
    /// Request for laboratory or imaging exams
    ExamRequest,
    /// Free-form medical report
    Report,
}

impl DocumentType {
    /// Printed document title.
    pub fn title(&self) -> &'static str {
        match self {
            DocumentType::Prescription => "Receituário",
            DocumentType::Certificate => "Atestado Médico",
            DocumentType::Referral => "Encaminhamento",
            DocumentType::ExamRequest => "Solicitação de Exames",
            DocumentType::Report => "Relatório Médico",
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DocumentType::Prescription => "PRESCRIPTION",
            DocumentType::Certificate => "CERTIFICATE",
            DocumentType::Referral => "REFERRAL",
            DocumentType::ExamRequest => "EXAM_REQUEST",
            DocumentType::Report => "REPORT",
        };
        write!(f, "{}", s)
    }
}

/// Prescription body.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PrescriptionContent {
    /// Prescribed medications, in print order
    #[serde(default)]
    pub medications: Vec<MedicationItem>,
    /// General notes printed after the medications
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Medical certificate body.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CertificateContent {
    /// Narrative text
    #[serde(default)]
    pub text: String,
    /// Days of leave, printed with numerals and words
    #[serde(default, alias = "leaveDays", skip_serializing_if = "Option::is_none")]
    pub leave_days: Option<u32>,
    /// ICD-10 code, printed only when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cid: Option<String>,
}

/// Referral body.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReferralContent {
    /// Specialty the patient is referred to
    #[serde(default, alias = "targetSpecialty")]
    pub target_specialty: String,
    /// Reason for the referral
    #[serde(default)]
    pub reason: String,
    /// Clinical summary for the receiving doctor
    #[serde(default, alias = "clinicalSummary", skip_serializing_if = "Option::is_none")]
    pub clinical_summary: Option<String>,
}

/// Exam request body.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExamRequestContent {
    /// Requested exams, one per line
    #[serde(default)]
    pub exams: Vec<String>,
    /// Clinical indication
    #[serde(default, alias = "clinicalIndication", skip_serializing_if = "Option::is_none")]
    pub clinical_indication: Option<String>,
}

/// Report body.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReportContent {
    /// Report title
    #[serde(default)]
    pub title: String,
    /// Report text; blank lines separate paragraphs
    #[serde(default)]
    pub body: String,
}

/// Type-specific content, tagged by `type` in JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentContent {
    /// Prescription
    Prescription(PrescriptionContent),
    /// Medical certificate
    Certificate(CertificateContent),
    /// Referral
    Referral(ReferralContent),
    /// Exam request
    ExamRequest(ExamRequestContent),
    /// Report
    Report(ReportContent),
}

impl DocumentContent {
    /// Document type of this content.
    pub fn document_type(&self) -> DocumentType {
        match self {
            DocumentContent::Prescription(_) => DocumentType::Prescription,
            DocumentContent::Certificate(_) => DocumentType::Certificate,
            DocumentContent::Referral(_) => DocumentType::Referral,
            DocumentContent::ExamRequest(_) => DocumentType::ExamRequest,
            DocumentContent::Report(_) => DocumentType::Report,
        }
    }
}

/// A medical document as exchanged with callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicalDocument {
    /// Stable document identifier
    pub id: Uuid,
    content: DocumentContent,
    /// Patient identity
    pub patient: PatientInfo,
    /// Issuing doctor
    pub doctor: DoctorInfo,
    /// Issuance timestamp (UTC)
    #[serde(alias = "issuedAt")]
    pub issued_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    signature: Option<SignatureResult>,
}

impl MedicalDocument {
    /// Create a document with a fresh id.
    pub fn new(
        content: DocumentContent,
        patient: PatientInfo,
        doctor: DoctorInfo,
        issued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            content,
            patient,
            doctor,
            issued_at,
            signature: None,
        }
    }

    /// Replace the generated id, e.g. when rebuilding a persisted document.
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    /// Parse a document from JSON.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Type-specific content.
    pub fn content(&self) -> &DocumentContent {
        &self.content
    }

    /// Document type.
    pub fn document_type(&self) -> DocumentType {
        self.content.document_type()
    }

    /// Prescription content, if this is a prescription.
    pub fn prescription(&self) -> Option<&PrescriptionContent> {
        match &self.content {
            DocumentContent::Prescription(p) => Some(p),
            _ => None,
        }
    }

    /// Mutate the content. Any existing signature is discarded and
    /// returned, since it no longer covers the document.
    pub fn edit_content<F>(&mut self, f: F) -> Option<SignatureResult>
    where
        F: FnOnce(&mut DocumentContent),
    {
        f(&mut self.content);
        let previous = self.signature.take();
        if previous.is_some() {
            log::info!("document {} edited after signing; signature discarded", self.id);
        }
        previous
    }

    /// Signature from the last signing, if any.
    pub fn signature(&self) -> Option<&SignatureResult> {
        self.signature.as_ref()
    }

    /// Record a signature.
    pub fn set_signature(&mut self, signature: SignatureResult) {
        self.signature = Some(signature);
    }

    /// Remove and return the recorded signature.
    pub fn take_signature(&mut self) -> Option<SignatureResult> {
        self.signature.take()
    }

    /// Copy the validator's classifications onto the medication items.
    pub fn apply_classifications(&mut self, validation: &ValidationResult) {
        if let DocumentContent::Prescription(p) = &mut self.content {
            for (item, classification) in p.medications.iter_mut().zip(&validation.classifications) {
                item.category = Some(classification.category);
            }
        }
    }

    /// SHA-256 over the canonical JSON form of the document, hex encoded.
    ///
    /// The signature and derived medication categories are excluded, so the
    /// value only changes when identity, content or issuance time change.
    /// Object keys are sorted by `serde_json::Value`.
    pub fn content_fingerprint(&self) -> String {
        let mut value = match serde_json::to_value(self) {
            Ok(v) => v,
            // Serializing plain structs with string keys cannot fail.
            Err(_) => return String::new(),
        };
        if let Some(obj) = value.as_object_mut() {
            obj.remove("signature");
            if let Some(meds) = obj
                .get_mut("content")
                .and_then(|c| c.get_mut("medications"))
                .and_then(|m| m.as_array_mut())
            {
                for med in meds {
                    if let Some(m) = med.as_object_mut() {
                        m.remove("category");
                    }
                }
            }
        }
        let canonical = value.to_string();
        hex_lower(&Sha256::digest(canonical.as_bytes()))
    }
}

pub(crate) fn hex_lower(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance::ControlCategory;

    fn sample() -> MedicalDocument {
        let issued = DateTime::parse_from_rfc3339("2024-05-10T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        MedicalDocument::new(
            DocumentContent::Prescription(PrescriptionContent {
                medications: vec![MedicationItem::new("Dipirona", "1 comprimido", "6/6h", "3 dias")],
                notes: None,
            }),
            PatientInfo::new("Maria Souza"),
            DoctorInfo::new("Dr. Carlos Lima", "12345"),
            issued,
        )
    }

    #[test]
    fn test_json_shape() {
        let doc = sample();
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["content"]["type"], "PRESCRIPTION");
        assert!(json.get("signature").is_none());

        let back: MedicalDocument = serde_json::from_value(json).unwrap();
        assert_eq!(back.document_type(), DocumentType::Prescription);
        assert_eq!(back.content_fingerprint(), doc.content_fingerprint());
    }

    #[test]
    fn test_fingerprint_ignores_category() {
        let doc = sample();
        let before = doc.content_fingerprint();
        let mut classified = doc.clone();
        classified.edit_content(|c| {
            if let DocumentContent::Prescription(p) = c {
                p.medications[0].category = Some(ControlCategory::Regular);
            }
        });
        assert_eq!(before, classified.content_fingerprint());
        assert_eq!(before.len(), 64);
    }

    #[test]
    fn test_fingerprint_changes_with_content() {
        let doc = sample();
        let mut edited = doc.clone();
        edited.edit_content(|c| {
            if let DocumentContent::Prescription(p) = c {
                p.medications[0].duration = "5 dias".to_string();
            }
        });
        assert_ne!(doc.content_fingerprint(), edited.content_fingerprint());
    }

    #[test]
    fn test_document_type_display() {
        assert_eq!(DocumentType::ExamRequest.to_string(), "EXAM_REQUEST");
        assert_eq!(DocumentType::Certificate.title(), "Atestado Médico");
    }
}
