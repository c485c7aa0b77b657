//! Type-specific document bodies.

use super::layout::{Block, TextLine};
use crate::compliance::{
    spell_numerals, with_words, Classification, MedicationClassifier, PrescriptionTemplate,
};
use crate::model::{
    CertificateContent, DocumentContent, ExamRequestContent, MedicationItem, PrescriptionContent,
    ReferralContent, ReportContent,
};

const ITEM_INDENT: f32 = 14.0;

/// Body blocks and printed title for a document.
pub(crate) struct Body {
    pub title: &'static str,
    pub blocks: Vec<Block>,
}

pub(crate) fn build(content: &DocumentContent, classifier: &dyn MedicationClassifier) -> Body {
    match content {
        DocumentContent::Prescription(p) => prescription(p, classifier),
        DocumentContent::Certificate(c) => Body {
            title: content.document_type().title(),
            blocks: certificate(c),
        },
        DocumentContent::Referral(r) => Body {
            title: content.document_type().title(),
            blocks: referral(r),
        },
        DocumentContent::ExamRequest(e) => Body {
            title: content.document_type().title(),
            blocks: exam_request(e),
        },
        DocumentContent::Report(r) => Body {
            title: content.document_type().title(),
            blocks: report(r),
        },
    }
}

fn prescription(content: &PrescriptionContent, classifier: &dyn MedicationClassifier) -> Body {
    let classified: Vec<(&MedicationItem, Classification)> = content
        .medications
        .iter()
        .map(|item| (item, classifier.classify(&item.name)))
        .collect();
    let template = classified
        .iter()
        .map(|(_, c)| c.category.template())
        .max()
        .unwrap_or(PrescriptionTemplate::Simple);

    let mut items = Vec::new();
    for (i, (item, classification)) in classified.iter().enumerate() {
        items.extend(medication(i + 1, item, classification));
    }
    if let Some(notes) = content.notes.as_deref().filter(|n| !n.trim().is_empty()) {
        items.push(Block::Line(TextLine::bold("Observações").space_before(10.0)));
        items.extend(paragraphs(notes));
    }

    let mut blocks = Vec::new();
    for via in template.vias() {
        if let Some(label) = via {
            blocks.push(Block::Via(label));
        }
        blocks.extend(items.iter().cloned());
    }

    Body {
        title: template.title(),
        blocks,
    }
}

fn medication(number: usize, item: &MedicationItem, classification: &Classification) -> Vec<Block> {
    let spelled = classification.category.requires_spelled_quantity();
    let mut blocks = vec![Block::Line(
        TextLine::bold(format!("{}. {}", number, item.name.trim())).space_before(8.0),
    )];

    let dosage = if spelled && item.quantity.is_none() {
        spell_numerals(item.dosage.trim())
    } else {
        item.dosage.trim().to_string()
    };
    let posology = [dosage.as_str(), item.frequency.trim(), item.duration.trim()]
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" - ");
    blocks.push(Block::Line(TextLine::body(posology).indent(ITEM_INDENT)));

    if let Some(quantity) = item.quantity {
        let amount = if spelled {
            with_words(u64::from(quantity))
        } else {
            quantity.to_string()
        };
        let text = match item.quantity_unit.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
            Some(unit) => format!("Quantidade: {} {}", amount, unit),
            None => format!("Quantidade: {}", amount),
        };
        blocks.push(Block::Line(TextLine::body(text).indent(ITEM_INDENT)));
    }
    if !item.instructions.trim().is_empty() {
        blocks.push(Block::Line(
            TextLine::body(format!("Instruções: {}", item.instructions.trim())).indent(ITEM_INDENT),
        ));
    }
    if let Some(schedule) = &classification.schedule {
        if classification.category.is_controlled() {
            blocks.push(Block::Line(
                TextLine::body(format!("Medicamento controlado - Lista {}", schedule)).indent(ITEM_INDENT),
            ));
        }
    }
    blocks
}

fn certificate(content: &CertificateContent) -> Vec<Block> {
    let mut blocks = paragraphs(&content.text);
    if let Some(days) = content.leave_days {
        let unit = if days == 1 { "dia" } else { "dias" };
        blocks.push(Block::Line(
            TextLine::body(format!("Período de afastamento: {} {}", with_words(u64::from(days)), unit))
                .space_before(10.0),
        ));
    }
    if let Some(cid) = content.cid.as_deref().filter(|c| !c.trim().is_empty()) {
        blocks.push(Block::Line(TextLine::body(format!("CID-10: {}", cid.trim()))));
    }
    blocks
}

fn referral(content: &ReferralContent) -> Vec<Block> {
    let mut blocks = vec![
        Block::Line(TextLine::bold(format!("Encaminhamento para: {}", content.target_specialty.trim()))),
        Block::Line(TextLine::bold("Motivo").space_before(10.0)),
    ];
    blocks.extend(paragraphs(&content.reason));
    if let Some(summary) = content.clinical_summary.as_deref().filter(|s| !s.trim().is_empty()) {
        blocks.push(Block::Line(TextLine::bold("Resumo clínico").space_before(10.0)));
        blocks.extend(paragraphs(summary));
    }
    blocks
}

fn exam_request(content: &ExamRequestContent) -> Vec<Block> {
    let mut blocks = vec![Block::Line(TextLine::bold("Solicito os seguintes exames:"))];
    for (i, exam) in content.exams.iter().enumerate() {
        blocks.push(Block::Line(
            TextLine::body(format!("{}. {}", i + 1, exam.trim()))
                .indent(ITEM_INDENT)
                .space_before(if i == 0 { 6.0 } else { 0.0 }),
        ));
    }
    if let Some(indication) = content
        .clinical_indication
        .as_deref()
        .filter(|s| !s.trim().is_empty())
    {
        blocks.push(Block::Line(TextLine::bold("Indicação clínica").space_before(10.0)));
        blocks.extend(paragraphs(indication));
    }
    blocks
}

fn report(content: &ReportContent) -> Vec<Block> {
    let mut blocks = vec![Block::Line(TextLine::bold(content.title.trim()))];
    let mut body = paragraphs(&content.body);
    if let Some(Block::Line(first)) = body.first_mut() {
        first.space_before = 8.0;
    }
    blocks.extend(body);
    blocks
}

/// Split text into paragraphs on blank lines; single newlines are folded.
fn paragraphs(text: &str) -> Vec<Block> {
    fn flush(current: &mut Vec<&str>, blocks: &mut Vec<Block>) {
        if !current.is_empty() {
            let space = if blocks.is_empty() { 0.0 } else { 6.0 };
            blocks.push(Block::Line(TextLine::body(current.join(" ")).space_before(space)));
            current.clear();
        }
    }

    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            flush(&mut current, &mut blocks);
        } else {
            current.push(line.trim());
        }
    }
    flush(&mut current, &mut blocks);
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance::StaticMedicationTable;

    fn texts(blocks: &[Block]) -> Vec<String> {
        blocks
            .iter()
            .filter_map(|b| match b {
                Block::Line(l) => Some(l.text.clone()),
                Block::Via(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_controlled_quantity_in_words() {
        let content = DocumentContent::Prescription(PrescriptionContent {
            medications: vec![MedicationItem::new("Clonazepam 2 mg", "1 comprimido", "à noite", "30 dias")
                .with_quantity(30, "comprimidos")],
            notes: None,
        });
        let body = build(&content, &StaticMedicationTable::new());
        assert_eq!(body.title, "Notificação de Receita");
        let lines = texts(&body.blocks);
        assert!(lines.contains(&"Quantidade: 30 (trinta) comprimidos".to_string()));
        assert!(lines.contains(&"Medicamento controlado - Lista B1".to_string()));
    }

    #[test]
    fn test_controlled_without_quantity_spells_dosage() {
        let content = DocumentContent::Prescription(PrescriptionContent {
            medications: vec![MedicationItem::new("Sertralina 50 mg", "1 comprimido", "1x ao dia", "60 dias")],
            notes: None,
        });
        let body = build(&content, &StaticMedicationTable::new());
        let lines = texts(&body.blocks);
        assert!(lines.contains(&"1 (um) comprimido - 1x ao dia - 60 dias".to_string()));
    }

    #[test]
    fn test_duplicate_vias() {
        let content = DocumentContent::Prescription(PrescriptionContent {
            medications: vec![MedicationItem::new("Amoxicilina 500 mg", "1 cápsula", "8/8h", "7 dias")
                .with_quantity(21, "cápsulas")],
            notes: Some("Retornar em 7 dias".into()),
        });
        let body = build(&content, &StaticMedicationTable::new());
        let vias: Vec<&str> = body
            .blocks
            .iter()
            .filter_map(|b| match b {
                Block::Via(l) => Some(*l),
                Block::Line(_) => None,
            })
            .collect();
        assert_eq!(vias, vec!["1ª via - Farmácia", "2ª via - Paciente"]);
        let lines = texts(&body.blocks);
        assert_eq!(lines.iter().filter(|l| l.as_str() == "Quantidade: 21 cápsulas").count(), 2);
    }

    #[test]
    fn test_paragraphs() {
        let blocks = paragraphs("linha um\nlinha dois\n\nsegundo parágrafo");
        assert_eq!(texts(&blocks), vec!["linha um linha dois", "segundo parágrafo"]);
    }

    #[test]
    fn test_certificate_leave_days() {
        let blocks = certificate(&CertificateContent {
            text: "Atesto para os devidos fins.".into(),
            leave_days: Some(3),
            cid: Some("J11".into()),
        });
        let lines = texts(&blocks);
        assert!(lines.contains(&"Período de afastamento: 3 (três) dias".to_string()));
        assert!(lines.contains(&"CID-10: J11".to_string()));
    }
}
