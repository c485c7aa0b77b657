//! Compliance validation types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Regulatory control category of a medication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlCategory {
    /// Not controlled
    Regular,
    /// Special control (lists C1, C5 and similar)
    SpecialControl,
    /// Psychotropic or narcotic (lists A and B)
    Psychotropic,
    /// Antimicrobial subject to prescription retention
    Antimicrobial,
}

impl ControlCategory {
    /// Whether the medication is subject to any control.
    pub fn is_controlled(&self) -> bool {
        !matches!(self, ControlCategory::Regular)
    }

    /// Whether quantities must be written out in words.
    pub fn requires_spelled_quantity(&self) -> bool {
        matches!(self, ControlCategory::SpecialControl | ControlCategory::Psychotropic)
    }

    /// Template this category requires on its own.
    pub fn template(&self) -> PrescriptionTemplate {
        match self {
            ControlCategory::Regular => PrescriptionTemplate::Simple,
            ControlCategory::SpecialControl => PrescriptionTemplate::SpecialControl,
            ControlCategory::Psychotropic => PrescriptionTemplate::Notification,
            ControlCategory::Antimicrobial => PrescriptionTemplate::AntimicrobialRetention,
        }
    }
}

impl fmt::Display for ControlCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ControlCategory::Regular => "regular",
            ControlCategory::SpecialControl => "special control",
            ControlCategory::Psychotropic => "psychotropic",
            ControlCategory::Antimicrobial => "antimicrobial",
        };
        write!(f, "{}", name)
    }
}

/// Outcome of classifying one medication name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    /// Control category
    pub category: ControlCategory,
    /// Regulatory list, e.g. "B1" or "RDC 20/2011". `None` for a controlled
    /// category means the class was recognised but the list is unknown.
    pub schedule: Option<String>,
}

impl Classification {
    /// Uncontrolled medication.
    pub fn regular() -> Self {
        Self {
            category: ControlCategory::Regular,
            schedule: None,
        }
    }

    /// Controlled medication on a known list.
    pub fn scheduled(category: ControlCategory, schedule: impl Into<String>) -> Self {
        Self {
            category,
            schedule: Some(schedule.into()),
        }
    }

    /// Controlled class recognised without list metadata.
    pub fn unscheduled(category: ControlCategory) -> Self {
        Self {
            category,
            schedule: None,
        }
    }

    /// Whether a controlled classification lacks its list.
    pub fn needs_manual_review(&self) -> bool {
        self.category.is_controlled() && self.schedule.is_none()
    }
}

/// Prescription layout required by the strictest medication on it.
///
/// Variants are ordered from least to most restrictive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrescriptionTemplate {
    /// Plain single-copy prescription
    Simple,
    /// Duplicate copy, pharmacy retains the first
    AntimicrobialRetention,
    /// Special-control prescription in duplicate
    SpecialControl,
    /// Notification form for psychotropics and narcotics
    Notification,
}

impl PrescriptionTemplate {
    /// Printed title.
    pub fn title(&self) -> &'static str {
        match self {
            PrescriptionTemplate::Simple => "Receituário",
            PrescriptionTemplate::AntimicrobialRetention => "Receituário - Antimicrobiano",
            PrescriptionTemplate::SpecialControl => "Receituário de Controle Especial",
            PrescriptionTemplate::Notification => "Notificação de Receita",
        }
    }

    /// Labels of the copies to print, one entry per copy. A single unlabeled
    /// copy is represented by one `None`.
    pub fn vias(&self) -> Vec<Option<&'static str>> {
        match self {
            PrescriptionTemplate::AntimicrobialRetention | PrescriptionTemplate::SpecialControl => {
                vec![Some("1ª via - Farmácia"), Some("2ª via - Paciente")]
            },
            PrescriptionTemplate::Simple | PrescriptionTemplate::Notification => vec![None],
        }
    }
}

impl fmt::Display for PrescriptionTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title())
    }
}

/// Result of compliance validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// True when there are no blocking errors.
    pub is_valid: bool,
    /// Blocking errors, in rule order.
    pub errors: Vec<ValidationError>,
    /// Advisory warnings, in rule order.
    pub warnings: Vec<ValidationWarning>,
    /// Required prescription template (prescriptions only).
    pub template: Option<PrescriptionTemplate>,
    /// Whether at least one quantity must be spelled out in words.
    pub spelled_quantities_required: bool,
    /// Classification of each medication, index-aligned.
    pub classifications: Vec<Classification>,
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationResult {
    /// Create an empty, valid result.
    pub fn new() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            template: None,
            spelled_quantities_required: false,
            classifications: Vec::new(),
        }
    }

    /// Add a blocking error.
    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
        self.is_valid = false;
    }

    /// Add a warning.
    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Check if there are any errors.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Check if there are any warnings.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Errors attached to `field`.
    pub fn errors_for<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a ValidationError> {
        self.errors.iter().filter(move |e| e.field == field)
    }
}

/// Blocking, field-tagged validation error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Error code
    pub code: ErrorCode,
    /// Field path, e.g. `medications[0].dosage`
    pub field: String,
    /// Human-readable message
    pub message: String,
}

impl ValidationError {
    /// Create a new validation error.
    pub fn new(code: ErrorCode, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} (at {})", self.code, self.message, self.field)
    }
}

/// Non-blocking validation warning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationWarning {
    /// Warning code
    pub code: WarningCode,
    /// Field path, when the warning concerns one field
    pub field: Option<String>,
    /// Human-readable message
    pub message: String,
}

impl ValidationWarning {
    /// Create a new warning.
    pub fn new(code: WarningCode, message: impl Into<String>) -> Self {
        Self {
            code,
            field: None,
            message: message.into(),
        }
    }

    /// Set the field.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(ref field) = self.field {
            write!(f, " (at {})", field)?;
        }
        Ok(())
    }
}

/// Error codes for blocking violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    /// Prescription without medications
    MissingMedications,
    /// Medication without name
    MissingMedicationName,
    /// Medication without dosage
    MissingDosage,
    /// Medication without frequency
    MissingFrequency,
    /// Medication without duration
    MissingDuration,
    /// Doctor without license number
    MissingLicenseNumber,
    /// Doctor without name
    MissingDoctorName,
    /// Patient without name
    MissingPatientName,
    /// Certificate without text
    MissingCertificateText,
    /// Referral without target specialty
    MissingReferralSpecialty,
    /// Referral without reason
    MissingReferralReason,
    /// Exam request without exams
    MissingExams,
    /// Blank exam line
    EmptyExam,
    /// Report without title
    MissingReportTitle,
    /// Report without body
    MissingReportBody,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            ErrorCode::MissingMedications => "RX-001",
            ErrorCode::MissingMedicationName => "RX-002",
            ErrorCode::MissingDosage => "RX-003",
            ErrorCode::MissingFrequency => "RX-004",
            ErrorCode::MissingDuration => "RX-005",
            ErrorCode::MissingLicenseNumber => "DOC-001",
            ErrorCode::MissingDoctorName => "DOC-002",
            ErrorCode::MissingPatientName => "PAT-001",
            ErrorCode::MissingCertificateText => "CERT-001",
            ErrorCode::MissingReferralSpecialty => "REF-001",
            ErrorCode::MissingReferralReason => "REF-002",
            ErrorCode::MissingExams => "EXAM-001",
            ErrorCode::EmptyExam => "EXAM-002",
            ErrorCode::MissingReportTitle => "REP-001",
            ErrorCode::MissingReportBody => "REP-002",
        };
        write!(f, "{}", code)
    }
}

/// Warning codes for advisory findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WarningCode {
    /// Patient without secondary identifier
    MissingPatientId,
    /// Doctor without specialty
    MissingSpecialty,
    /// Controlled class recognised without list metadata
    ManualReviewRequired,
    /// Controlled medication without explicit quantity
    MissingControlledQuantity,
    /// Referral without clinical summary
    MissingClinicalSummary,
    /// Exam request without clinical indication
    MissingClinicalIndication,
    /// Issuance timestamp in the future
    FutureIssuance,
}

impl fmt::Display for WarningCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            WarningCode::MissingPatientId => "PAT-101",
            WarningCode::MissingSpecialty => "DOC-101",
            WarningCode::ManualReviewRequired => "RX-101",
            WarningCode::MissingControlledQuantity => "RX-102",
            WarningCode::MissingClinicalSummary => "REF-101",
            WarningCode::MissingClinicalIndication => "EXAM-101",
            WarningCode::FutureIssuance => "DATE-101",
        };
        write!(f, "{}", code)
    }
}
