//! Rule-based validation of medical documents.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use super::classifier::{MedicationClassifier, StaticMedicationTable};
use super::types::{
    Classification, ErrorCode, PrescriptionTemplate, ValidationError, ValidationResult,
    ValidationWarning, WarningCode,
};
use crate::model::{
    CertificateContent, DocumentContent, ExamRequestContent, MedicalDocument, PrescriptionContent,
    ReferralContent, ReportContent,
};

/// Tolerated clock skew before an issuance timestamp counts as future.
const FUTURE_TOLERANCE_MINUTES: i64 = 5;

/// Validates documents against the prescription and identity rules.
///
/// Validation is pure: the same document, classifier and reference time
/// always give the same result.
#[derive(Clone)]
pub struct ComplianceValidator {
    classifier: Arc<dyn MedicationClassifier>,
}

impl std::fmt::Debug for ComplianceValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComplianceValidator").finish_non_exhaustive()
    }
}

impl Default for ComplianceValidator {
    fn default() -> Self {
        Self::new(Arc::new(StaticMedicationTable::new()))
    }
}

impl ComplianceValidator {
    /// Create a validator using the given classifier.
    pub fn new(classifier: Arc<dyn MedicationClassifier>) -> Self {
        Self { classifier }
    }

    /// Classifier used for medications.
    pub fn classifier(&self) -> &Arc<dyn MedicationClassifier> {
        &self.classifier
    }

    /// Validate a document against the current time.
    pub fn validate(&self, document: &MedicalDocument) -> ValidationResult {
        self.validate_at(document, Utc::now())
    }

    /// Validate a document against a caller-supplied reference time.
    pub fn validate_at(&self, document: &MedicalDocument, now: DateTime<Utc>) -> ValidationResult {
        let mut result = ValidationResult::new();

        check_identity(document, &mut result);

        match document.content() {
            DocumentContent::Prescription(p) => self.check_prescription(p, &mut result),
            DocumentContent::Certificate(c) => check_certificate(c, &mut result),
            DocumentContent::Referral(r) => check_referral(r, &mut result),
            DocumentContent::ExamRequest(e) => check_exam_request(e, &mut result),
            DocumentContent::Report(r) => check_report(r, &mut result),
        }

        if document.issued_at > now + Duration::minutes(FUTURE_TOLERANCE_MINUTES) {
            result.add_warning(
                ValidationWarning::new(
                    WarningCode::FutureIssuance,
                    "issuance timestamp is in the future",
                )
                .with_field("issued_at"),
            );
        }

        log::debug!(
            "validated document {}: {} error(s), {} warning(s)",
            document.id,
            result.errors.len(),
            result.warnings.len()
        );
        result
    }

    fn check_prescription(&self, prescription: &PrescriptionContent, result: &mut ValidationResult) {
        if prescription.medications.is_empty() {
            result.add_error(ValidationError::new(
                ErrorCode::MissingMedications,
                "medications",
                "a prescription needs at least one medication",
            ));
            result.template = Some(PrescriptionTemplate::Simple);
            return;
        }

        let mut template = PrescriptionTemplate::Simple;
        for (i, item) in prescription.medications.iter().enumerate() {
            let required = [
                (&item.name, "name", ErrorCode::MissingMedicationName),
                (&item.dosage, "dosage", ErrorCode::MissingDosage),
                (&item.frequency, "frequency", ErrorCode::MissingFrequency),
                (&item.duration, "duration", ErrorCode::MissingDuration),
            ];
            for (value, field, code) in required {
                if is_blank(value) {
                    result.add_error(ValidationError::new(
                        code,
                        format!("medications[{}].{}", i, field),
                        format!("medication {} is missing its {}", i + 1, field),
                    ));
                }
            }

            let classification = if is_blank(&item.name) {
                Classification::regular()
            } else {
                self.classifier.classify(&item.name)
            };

            if classification.needs_manual_review() {
                result.add_warning(
                    ValidationWarning::new(
                        WarningCode::ManualReviewRequired,
                        format!(
                            "'{}' looks {} but its regulatory list is unknown; review manually",
                            item.name.trim(),
                            classification.category
                        ),
                    )
                    .with_field(format!("medications[{}].name", i)),
                );
            }
            if classification.category.is_controlled() && item.quantity.is_none() {
                result.add_warning(
                    ValidationWarning::new(
                        WarningCode::MissingControlledQuantity,
                        format!("controlled medication '{}' has no explicit quantity", item.name.trim()),
                    )
                    .with_field(format!("medications[{}].quantity", i)),
                );
            }
            if classification.category.requires_spelled_quantity() {
                result.spelled_quantities_required = true;
            }

            template = template.max(classification.category.template());
            result.classifications.push(classification);
        }
        result.template = Some(template);
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn check_identity(document: &MedicalDocument, result: &mut ValidationResult) {
    if is_blank(&document.doctor.name) {
        result.add_error(ValidationError::new(
            ErrorCode::MissingDoctorName,
            "doctor.name",
            "doctor name is required",
        ));
    }
    if is_blank(&document.doctor.license_number) {
        result.add_error(ValidationError::new(
            ErrorCode::MissingLicenseNumber,
            "doctor.license_number",
            "doctor license number (CRM) is required",
        ));
    }
    if document.doctor.specialty.as_deref().map_or(true, is_blank) {
        result.add_warning(
            ValidationWarning::new(WarningCode::MissingSpecialty, "doctor specialty is not set")
                .with_field("doctor.specialty"),
        );
    }
    if is_blank(&document.patient.name) {
        result.add_error(ValidationError::new(
            ErrorCode::MissingPatientName,
            "patient.name",
            "patient name is required",
        ));
    }
    if document.patient.document_id.as_deref().map_or(true, is_blank) {
        result.add_warning(
            ValidationWarning::new(
                WarningCode::MissingPatientId,
                "patient secondary identifier (CPF) is missing",
            )
            .with_field("patient.document_id"),
        );
    }
}

fn check_certificate(certificate: &CertificateContent, result: &mut ValidationResult) {
    if is_blank(&certificate.text) {
        result.add_error(ValidationError::new(
            ErrorCode::MissingCertificateText,
            "text",
            "certificate text is required",
        ));
    }
}

fn check_referral(referral: &ReferralContent, result: &mut ValidationResult) {
    if is_blank(&referral.target_specialty) {
        result.add_error(ValidationError::new(
            ErrorCode::MissingReferralSpecialty,
            "target_specialty",
            "referral target specialty is required",
        ));
    }
    if is_blank(&referral.reason) {
        result.add_error(ValidationError::new(
            ErrorCode::MissingReferralReason,
            "reason",
            "referral reason is required",
        ));
    }
    if referral.clinical_summary.as_deref().map_or(true, is_blank) {
        result.add_warning(
            ValidationWarning::new(WarningCode::MissingClinicalSummary, "no clinical summary for the receiving doctor")
                .with_field("clinical_summary"),
        );
    }
}

fn check_exam_request(request: &ExamRequestContent, result: &mut ValidationResult) {
    if request.exams.is_empty() {
        result.add_error(ValidationError::new(
            ErrorCode::MissingExams,
            "exams",
            "at least one exam must be requested",
        ));
    }
    for (i, exam) in request.exams.iter().enumerate() {
        if is_blank(exam) {
            result.add_error(ValidationError::new(
                ErrorCode::EmptyExam,
                format!("exams[{}]", i),
                format!("exam {} is blank", i + 1),
            ));
        }
    }
    if request.clinical_indication.as_deref().map_or(true, is_blank) {
        result.add_warning(
            ValidationWarning::new(WarningCode::MissingClinicalIndication, "no clinical indication given")
                .with_field("clinical_indication"),
        );
    }
}

fn check_report(report: &ReportContent, result: &mut ValidationResult) {
    if is_blank(&report.title) {
        result.add_error(ValidationError::new(
            ErrorCode::MissingReportTitle,
            "title",
            "report title is required",
        ));
    }
    if is_blank(&report.body) {
        result.add_error(ValidationError::new(
            ErrorCode::MissingReportBody,
            "body",
            "report body is required",
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance::ControlCategory;
    use crate::model::{DoctorInfo, MedicationItem, PatientInfo};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn prescription(meds: Vec<MedicationItem>) -> MedicalDocument {
        MedicalDocument::new(
            DocumentContent::Prescription(PrescriptionContent {
                medications: meds,
                notes: None,
            }),
            PatientInfo::new("Maria Souza").with_document_id("123.456.789-00"),
            DoctorInfo::new("Dra. Ana Ribeiro", "123456").with_specialty("Clínica Geral"),
            now(),
        )
    }

    #[test]
    fn test_complete_prescription_is_valid() {
        let doc = prescription(vec![MedicationItem::new("Dipirona 500 mg", "1 comprimido", "6/6h", "3 dias")]);
        let result = ComplianceValidator::default().validate_at(&doc, now());
        assert!(result.is_valid, "{:?}", result.errors);
        assert!(result.warnings.is_empty(), "{:?}", result.warnings);
        assert_eq!(result.template, Some(PrescriptionTemplate::Simple));
        assert!(!result.spelled_quantities_required);
    }

    #[test]
    fn test_missing_license_is_single_error() {
        let mut doc = prescription(vec![MedicationItem::new("Dipirona", "1 cp", "6/6h", "3 dias")]);
        doc.doctor.license_number = "  ".to_string();
        let result = ComplianceValidator::default().validate_at(&doc, now());
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].field, "doctor.license_number");
        assert_eq!(result.errors[0].code, ErrorCode::MissingLicenseNumber);
    }

    #[test]
    fn test_empty_prescription() {
        let doc = prescription(vec![]);
        let result = ComplianceValidator::default().validate_at(&doc, now());
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].field, "medications");
    }

    #[test]
    fn test_medication_fields_tagged() {
        let doc = prescription(vec![
            MedicationItem::new("Dipirona", "1 cp", "6/6h", "3 dias"),
            MedicationItem::new("Ibuprofeno", "", "8/8h", ""),
        ]);
        let result = ComplianceValidator::default().validate_at(&doc, now());
        let fields: Vec<&str> = result.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["medications[1].dosage", "medications[1].duration"]);
    }

    #[test]
    fn test_special_control_template() {
        let doc = prescription(vec![
            MedicationItem::new("Sertralina 50 mg", "1 comprimido", "1x ao dia", "30 dias").with_quantity(30, "comprimidos"),
            MedicationItem::new("Amoxicilina 500 mg", "1 cápsula", "8/8h", "7 dias").with_quantity(21, "cápsulas"),
        ]);
        let result = ComplianceValidator::default().validate_at(&doc, now());
        assert!(result.is_valid);
        assert_eq!(result.template, Some(PrescriptionTemplate::SpecialControl));
        assert!(result.spelled_quantities_required);
        assert_eq!(result.classifications[1].category, ControlCategory::Antimicrobial);
    }

    #[test]
    fn test_antimicrobial_only_keeps_numerals() {
        let doc = prescription(vec![MedicationItem::new("Azitromicina", "500 mg", "1x ao dia", "3 dias")
            .with_quantity(3, "comprimidos")]);
        let result = ComplianceValidator::default().validate_at(&doc, now());
        assert_eq!(result.template, Some(PrescriptionTemplate::AntimicrobialRetention));
        assert!(!result.spelled_quantities_required);
    }

    #[test]
    fn test_unknown_schedule_is_warned() {
        let doc = prescription(vec![MedicationItem::new("Flunitrazepam 1 mg", "1 cp", "à noite", "10 dias")
            .with_quantity(10, "comprimidos")]);
        let result = ComplianceValidator::default().validate_at(&doc, now());
        assert!(result.is_valid);
        assert_eq!(result.template, Some(PrescriptionTemplate::Notification));
        assert!(result
            .warnings
            .iter()
            .any(|w| w.code == WarningCode::ManualReviewRequired));
    }

    #[test]
    fn test_controlled_without_quantity_warns() {
        let doc = prescription(vec![MedicationItem::new("Clonazepam 2 mg", "1 cp", "à noite", "30 dias")]);
        let result = ComplianceValidator::default().validate_at(&doc, now());
        assert!(result
            .warnings
            .iter()
            .any(|w| w.code == WarningCode::MissingControlledQuantity));
    }

    #[test]
    fn test_identity_warnings() {
        let mut doc = prescription(vec![MedicationItem::new("Dipirona", "1 cp", "6/6h", "3 dias")]);
        doc.patient.document_id = None;
        doc.doctor.specialty = None;
        let result = ComplianceValidator::default().validate_at(&doc, now());
        assert!(result.is_valid);
        let codes: Vec<WarningCode> = result.warnings.iter().map(|w| w.code).collect();
        assert_eq!(codes, vec![WarningCode::MissingSpecialty, WarningCode::MissingPatientId]);
    }

    #[test]
    fn test_future_issuance() {
        let doc = prescription(vec![MedicationItem::new("Dipirona", "1 cp", "6/6h", "3 dias")]);
        let validator = ComplianceValidator::default();
        let earlier = now() - Duration::minutes(10);
        let result = validator.validate_at(&doc, earlier);
        assert!(result.warnings.iter().any(|w| w.code == WarningCode::FutureIssuance));

        let slightly_earlier = now() - Duration::minutes(4);
        let result = validator.validate_at(&doc, slightly_earlier);
        assert!(!result.warnings.iter().any(|w| w.code == WarningCode::FutureIssuance));
    }

    #[test]
    fn test_other_document_types() {
        let patient = PatientInfo::new("João").with_document_id("1");
        let doctor = DoctorInfo::new("Dr. X", "1").with_specialty("Ortopedia");
        let validator = ComplianceValidator::default();

        let cert = MedicalDocument::new(
            DocumentContent::Certificate(CertificateContent::default()),
            patient.clone(),
            doctor.clone(),
            now(),
        );
        assert_eq!(validator.validate_at(&cert, now()).errors[0].field, "text");

        let exams = MedicalDocument::new(
            DocumentContent::ExamRequest(ExamRequestContent {
                exams: vec!["Hemograma".into(), " ".into()],
                clinical_indication: Some("Check-up".into()),
            }),
            patient.clone(),
            doctor.clone(),
            now(),
        );
        let result = validator.validate_at(&exams, now());
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].field, "exams[1]");

        let referral = MedicalDocument::new(
            DocumentContent::Referral(ReferralContent {
                target_specialty: "Cardiologia".into(),
                reason: "Sopro".into(),
                clinical_summary: None,
            }),
            patient.clone(),
            doctor.clone(),
            now(),
        );
        let result = validator.validate_at(&referral, now());
        assert!(result.is_valid);
        assert_eq!(result.warnings[0].code, WarningCode::MissingClinicalSummary);

        let report = MedicalDocument::new(
            DocumentContent::Report(ReportContent {
                title: "Laudo".into(),
                body: String::new(),
            }),
            patient,
            doctor,
            now(),
        );
        assert_eq!(validator.validate_at(&report, now()).errors[0].code, ErrorCode::MissingReportBody);
    }
}
