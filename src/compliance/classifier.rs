//! Medication classification.
//!
//! The validator depends only on the [`MedicationClassifier`] trait, so a
//! deployment can plug in a classifier backed by the current regulatory
//! lists. [`StaticMedicationTable`] is a built-in table of common drugs.

use super::types::{Classification, ControlCategory};

/// Classifies a medication name into a control category.
pub trait MedicationClassifier: Send + Sync {
    /// Classify a medication by its prescribed name.
    fn classify(&self, name: &str) -> Classification;
}

/// One known substance.
#[derive(Debug, Clone)]
struct TableEntry {
    /// Normalized substring matched against the normalized name
    substance: &'static str,
    category: ControlCategory,
    schedule: &'static str,
}

const fn entry(substance: &'static str, category: ControlCategory, schedule: &'static str) -> TableEntry {
    TableEntry {
        substance,
        category,
        schedule,
    }
}

const KNOWN_SUBSTANCES: &[TableEntry] = &[
    // Narcotics and psychotropics
    entry("morfina", ControlCategory::Psychotropic, "A1"),
    entry("oxicodona", ControlCategory::Psychotropic, "A1"),
    entry("fentanil", ControlCategory::Psychotropic, "A1"),
    entry("metadona", ControlCategory::Psychotropic, "A1"),
    entry("codeina", ControlCategory::Psychotropic, "A2"),
    entry("tramadol", ControlCategory::Psychotropic, "A2"),
    entry("metilfenidato", ControlCategory::Psychotropic, "A3"),
    entry("lisdexanfetamina", ControlCategory::Psychotropic, "A3"),
    entry("clonazepam", ControlCategory::Psychotropic, "B1"),
    entry("diazepam", ControlCategory::Psychotropic, "B1"),
    entry("alprazolam", ControlCategory::Psychotropic, "B1"),
    entry("lorazepam", ControlCategory::Psychotropic, "B1"),
    entry("bromazepam", ControlCategory::Psychotropic, "B1"),
    entry("midazolam", ControlCategory::Psychotropic, "B1"),
    entry("zolpidem", ControlCategory::Psychotropic, "B1"),
    entry("fenobarbital", ControlCategory::Psychotropic, "B1"),
    entry("sibutramina", ControlCategory::Psychotropic, "B2"),
    // Special control
    entry("sertralina", ControlCategory::SpecialControl, "C1"),
    entry("fluoxetina", ControlCategory::SpecialControl, "C1"),
    entry("escitalopram", ControlCategory::SpecialControl, "C1"),
    entry("paroxetina", ControlCategory::SpecialControl, "C1"),
    entry("amitriptilina", ControlCategory::SpecialControl, "C1"),
    entry("nortriptilina", ControlCategory::SpecialControl, "C1"),
    entry("venlafaxina", ControlCategory::SpecialControl, "C1"),
    entry("carbamazepina", ControlCategory::SpecialControl, "C1"),
    entry("valproato", ControlCategory::SpecialControl, "C1"),
    entry("acido valproico", ControlCategory::SpecialControl, "C1"),
    entry("topiramato", ControlCategory::SpecialControl, "C1"),
    entry("gabapentina", ControlCategory::SpecialControl, "C1"),
    entry("pregabalina", ControlCategory::SpecialControl, "C1"),
    entry("quetiapina", ControlCategory::SpecialControl, "C1"),
    entry("risperidona", ControlCategory::SpecialControl, "C1"),
    entry("haloperidol", ControlCategory::SpecialControl, "C1"),
    entry("olanzapina", ControlCategory::SpecialControl, "C1"),
    entry("isotretinoina", ControlCategory::SpecialControl, "C2"),
    entry("testosterona", ControlCategory::SpecialControl, "C5"),
    // Antimicrobials under retention rules
    entry("amoxicilina", ControlCategory::Antimicrobial, "RDC 20/2011"),
    entry("clavulanato", ControlCategory::Antimicrobial, "RDC 20/2011"),
    entry("azitromicina", ControlCategory::Antimicrobial, "RDC 20/2011"),
    entry("claritromicina", ControlCategory::Antimicrobial, "RDC 20/2011"),
    entry("cefalexina", ControlCategory::Antimicrobial, "RDC 20/2011"),
    entry("ceftriaxona", ControlCategory::Antimicrobial, "RDC 20/2011"),
    entry("ciprofloxacino", ControlCategory::Antimicrobial, "RDC 20/2011"),
    entry("levofloxacino", ControlCategory::Antimicrobial, "RDC 20/2011"),
    entry("doxiciclina", ControlCategory::Antimicrobial, "RDC 20/2011"),
    entry("metronidazol", ControlCategory::Antimicrobial, "RDC 20/2011"),
    entry("sulfametoxazol", ControlCategory::Antimicrobial, "RDC 20/2011"),
    entry("nitrofurantoina", ControlCategory::Antimicrobial, "RDC 20/2011"),
];

/// Word endings that identify a controlled class without a known list.
const CLASS_SUFFIXES: &[(&str, ControlCategory)] = &[
    ("zepam", ControlCategory::Psychotropic),
    ("zolam", ControlCategory::Psychotropic),
    ("barbital", ControlCategory::Psychotropic),
    ("cilina", ControlCategory::Antimicrobial),
    ("micina", ControlCategory::Antimicrobial),
    ("floxacino", ControlCategory::Antimicrobial),
    ("ciclina", ControlCategory::Antimicrobial),
];

/// Built-in classifier over a static table of common substances.
///
/// Matching is case and accent insensitive. A name that matches no known
/// substance but ends like a controlled class (e.g. "-zepam") is classified
/// in that class without schedule metadata, which the validator flags for
/// manual review.
#[derive(Debug, Clone, Default)]
pub struct StaticMedicationTable;

impl StaticMedicationTable {
    /// Create the default table.
    pub fn new() -> Self {
        Self
    }
}

impl MedicationClassifier for StaticMedicationTable {
    fn classify(&self, name: &str) -> Classification {
        let normalized = normalize(name);

        if let Some(hit) = KNOWN_SUBSTANCES
            .iter()
            .find(|e| normalized.contains(e.substance))
        {
            return Classification::scheduled(hit.category, hit.schedule);
        }

        for word in normalized.split(|c: char| !c.is_alphanumeric()) {
            if let Some((_, category)) = CLASS_SUFFIXES
                .iter()
                .find(|(suffix, _)| word.len() > suffix.len() && word.ends_with(suffix))
            {
                log::debug!("medication classified by suffix heuristic as {}", category);
                return Classification::unscheduled(*category);
            }
        }

        Classification::regular()
    }
}

/// Lowercase and strip Portuguese diacritics.
pub(crate) fn normalize(text: &str) -> String {
    text.chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'ê' | 'è' | 'ë' => 'e',
            'í' | 'î' | 'ì' | 'ï' => 'i',
            'ó' | 'ô' | 'õ' | 'ò' | 'ö' => 'o',
            'ú' | 'û' | 'ù' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_substances() {
        let table = StaticMedicationTable::new();
        let c = table.classify("Clonazepam 2 mg");
        assert_eq!(c.category, ControlCategory::Psychotropic);
        assert_eq!(c.schedule.as_deref(), Some("B1"));

        let c = table.classify("SERTRALINA 50mg");
        assert_eq!(c.category, ControlCategory::SpecialControl);
        assert_eq!(c.schedule.as_deref(), Some("C1"));

        let c = table.classify("Amoxicilina + Clavulanato de potássio");
        assert_eq!(c.category, ControlCategory::Antimicrobial);
        assert_eq!(c.schedule.as_deref(), Some("RDC 20/2011"));
    }

    #[test]
    fn test_accent_insensitive() {
        let table = StaticMedicationTable::new();
        assert_eq!(table.classify("Codeína 30 mg").schedule.as_deref(), Some("A2"));
        assert_eq!(table.classify("Ácido Valproico").category, ControlCategory::SpecialControl);
    }

    #[test]
    fn test_suffix_heuristic_without_schedule() {
        let table = StaticMedicationTable::new();
        let c = table.classify("Flunitrazepam 1 mg");
        assert_eq!(c.category, ControlCategory::Psychotropic);
        assert!(c.schedule.is_none());
        assert!(c.needs_manual_review());

        let c = table.classify("Eritromicina 500 mg");
        assert_eq!(c.category, ControlCategory::Antimicrobial);
        assert!(c.schedule.is_none());
    }

    #[test]
    fn test_regular() {
        let table = StaticMedicationTable::new();
        let c = table.classify("Dipirona sódica 500 mg");
        assert_eq!(c, Classification::regular());
        assert_eq!(table.classify("Paracetamol").category, ControlCategory::Regular);
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("ÁCIDO Ção"), "acido cao");
    }
}
