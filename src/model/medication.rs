//! Medication items and the people named on a document.

use serde::{Deserialize, Serialize};

use crate::compliance::ControlCategory;

/// One prescribed medication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicationItem {
    /// Commercial or generic name, optionally with strength
    pub name: String,
    /// Dose per administration, e.g. "1 comprimido de 2 mg"
    #[serde(default)]
    pub dosage: String,
    /// e.g. "a cada 8 horas"
    #[serde(default)]
    pub frequency: String,
    /// e.g. "por 7 dias"
    #[serde(default)]
    pub duration: String,
    /// Free-text instructions for the patient
    #[serde(default)]
    pub instructions: String,
    /// Total quantity to dispense
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    /// Unit for `quantity`, e.g. "comprimidos"
    #[serde(default, alias = "quantityUnit", skip_serializing_if = "Option::is_none")]
    pub quantity_unit: Option<String>,
    /// Controlled-substance category derived by the validator.
    /// Not part of the content fingerprint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<ControlCategory>,
}

impl MedicationItem {
    /// Create an item with the mandatory fields.
    pub fn new(
        name: impl Into<String>,
        dosage: impl Into<String>,
        frequency: impl Into<String>,
        duration: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            dosage: dosage.into(),
            frequency: frequency.into(),
            duration: duration.into(),
            instructions: String::new(),
            quantity: None,
            quantity_unit: None,
            category: None,
        }
    }

    /// Set instructions.
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    /// Set quantity to dispense.
    pub fn with_quantity(mut self, quantity: u32, unit: impl Into<String>) -> Self {
        self.quantity = Some(quantity);
        self.quantity_unit = Some(unit.into());
        self
    }
}

/// Prescribing doctor.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DoctorInfo {
    /// Full name as registered with the council
    pub name: String,
    /// Council registration (CRM) number
    #[serde(default, alias = "crmNumber", alias = "licenseNumber")]
    pub license_number: String,
    /// State of registration, e.g. "SP"
    #[serde(default, alias = "licenseState", skip_serializing_if = "Option::is_none")]
    pub license_state: Option<String>,
    /// Medical specialty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,
}

impl DoctorInfo {
    /// Create doctor info with name and license number.
    pub fn new(name: impl Into<String>, license_number: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            license_number: license_number.into(),
            license_state: None,
            specialty: None,
        }
    }

    /// Set license state.
    pub fn with_license_state(mut self, state: impl Into<String>) -> Self {
        self.license_state = Some(state.into());
        self
    }

    /// Set specialty.
    pub fn with_specialty(mut self, specialty: impl Into<String>) -> Self {
        self.specialty = Some(specialty.into());
        self
    }

    /// License label as printed, e.g. "CRM/SP 123456".
    pub fn license_label(&self) -> String {
        match &self.license_state {
            Some(state) if !state.trim().is_empty() => {
                format!("CRM/{} {}", state.trim(), self.license_number.trim())
            },
            _ => format!("CRM {}", self.license_number.trim()),
        }
    }
}

/// Patient identity.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PatientInfo {
    /// Full name
    pub name: String,
    /// Secondary identifier (CPF)
    #[serde(default, alias = "cpf", alias = "documentId", skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    /// Date of birth
    #[serde(default, alias = "birthDate", skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<chrono::NaiveDate>,
}

impl PatientInfo {
    /// Create patient info with a name only.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            document_id: None,
            birth_date: None,
        }
    }

    /// Set the secondary identifier.
    pub fn with_document_id(mut self, id: impl Into<String>) -> Self {
        self.document_id = Some(id.into());
        self
    }
}
