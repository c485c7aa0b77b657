//! Document to PDF rendering.

use std::sync::Arc;

use super::body;
use super::layout::{paginate, wrap_text, FontMetrics, PageLayout, SimpleFontMetrics};
use crate::compliance::{MedicationClassifier, StaticMedicationTable};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::model::MedicalDocument;
use crate::writer::{
    BarcodeGenerator, ContentStreamBuilder, PdfWriter, PdfWriterConfig, QrCodeOptions,
    QrErrorCorrection, StandardFont,
};

const MARGIN: f32 = 50.0;
/// Height reserved at the top of every page for the identity header.
const HEADER_HEIGHT: f32 = 100.0;
/// Height reserved at the bottom of every page for the footer and QR code.
const FOOTER_HEIGHT: f32 = 140.0;
/// Characters of the content fingerprint carried in the verification URL.
const FINGERPRINT_PREFIX_LEN: usize = 16;

/// Renders medical documents to PDF.
///
/// Output depends only on the document and the configuration: no clock is
/// read and object order is fixed, so rendering twice yields identical
/// bytes.
#[derive(Clone)]
pub struct DocumentRenderer {
    config: EngineConfig,
    classifier: Arc<dyn MedicationClassifier>,
}

impl std::fmt::Debug for DocumentRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentRenderer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for DocumentRenderer {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

struct PageHeader<'a> {
    document: &'a MedicalDocument,
    title: &'a str,
    via: Option<&'a str>,
    page_number: usize,
    page_count: usize,
}

impl DocumentRenderer {
    /// Create a renderer with the built-in medication table.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            classifier: Arc::new(StaticMedicationTable::new()),
        }
    }

    /// Use a different medication classifier.
    pub fn with_classifier(mut self, classifier: Arc<dyn MedicationClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// URL encoded in the QR code: `{base}/{id}?h={fingerprint prefix}`.
    pub fn verification_url(&self, document: &MedicalDocument) -> String {
        let fingerprint = document.content_fingerprint();
        let prefix = &fingerprint[..FINGERPRINT_PREFIX_LEN.min(fingerprint.len())];
        format!(
            "{}/{}?h={}",
            self.config.verification_base_url.trim_end_matches('/'),
            document.id,
            prefix
        )
    }

    /// Render a document to PDF bytes.
    pub fn render(&self, document: &MedicalDocument) -> Result<Vec<u8>> {
        let width = self.config.page_width;
        let height = self.config.page_height;

        let body = body::build(document.content(), self.classifier.as_ref());
        let pages = paginate(
            &body.blocks,
            height - MARGIN - HEADER_HEIGHT,
            FOOTER_HEIGHT,
            width - 2.0 * MARGIN,
        );

        let url = self.verification_url(document);
        let qr = BarcodeGenerator::qr_matrix(
            &url,
            &QrCodeOptions::new().error_correction(QrErrorCorrection::Medium),
        )?;

        let writer_config = PdfWriterConfig::default()
            .with_title(body.title)
            .with_author(document.doctor.name.trim())
            .with_subject(format!("{} {}", document.document_type(), document.id))
            .with_creation_date(document.issued_at)
            .with_compress(self.config.compress_streams);
        let mut writer = PdfWriter::with_config(writer_config);

        let page_count = pages.len();
        for (index, layout) in pages.iter().enumerate() {
            let mut page = writer.add_page(width, height);
            let content = page.content();
            self.draw_header(
                content,
                &PageHeader {
                    document,
                    title: body.title,
                    via: layout.via,
                    page_number: index + 1,
                    page_count,
                },
            );
            draw_body(content, layout);
            self.draw_footer(content, document, &url);
            qr.draw(
                content,
                width - MARGIN - self.config.qr_size,
                MARGIN - 10.0,
                self.config.qr_size,
            );
            page.finish();
        }

        let bytes = writer.finish()?;
        log::info!(
            "rendered {} {} into {} page(s), {} bytes",
            document.document_type(),
            document.id,
            page_count,
            bytes.len()
        );
        Ok(bytes)
    }

    fn draw_header(&self, content: &mut ContentStreamBuilder, header: &PageHeader<'_>) {
        let width = self.config.page_width;
        let top = self.config.page_height - MARGIN;
        let doctor = &header.document.doctor;
        let patient = &header.document.patient;

        content.fill_gray(0.0);
        content
            .set_font(StandardFont::HelveticaBold.resource_name(), 13.0)
            .text(doctor.name.trim(), MARGIN, top);

        let mut credentials = doctor.license_label();
        if let Some(specialty) = doctor.specialty.as_deref().filter(|s| !s.trim().is_empty()) {
            credentials.push_str(" - ");
            credentials.push_str(specialty.trim());
        }
        content
            .set_font(StandardFont::Helvetica.resource_name(), 9.0)
            .text(&credentials, MARGIN, top - 14.0);

        content
            .set_font(StandardFont::HelveticaBold.resource_name(), 15.0)
            .text(header.title, MARGIN, top - 40.0);
        if let Some(via) = header.via {
            let via_width = SimpleFontMetrics::default().text_width(via, 9.0);
            content
                .set_font(StandardFont::Helvetica.resource_name(), 9.0)
                .text(via, width - MARGIN - via_width, top - 40.0);
        }

        let mut patient_line = format!("Paciente: {}", patient.name.trim());
        if let Some(id) = patient.document_id.as_deref().filter(|s| !s.trim().is_empty()) {
            patient_line.push_str(&format!(" - CPF: {}", id.trim()));
        }
        content
            .set_font(StandardFont::Helvetica.resource_name(), 10.0)
            .text(&patient_line, MARGIN, top - 60.0);

        content
            .set_font(StandardFont::Courier.resource_name(), 7.0)
            .text(&format!("Documento {}", header.document.id), MARGIN, top - 76.0);
        let page_label = format!("Página {} de {}", header.page_number, header.page_count);
        let label_width = SimpleFontMetrics::default().text_width(&page_label, 9.0);
        content
            .set_font(StandardFont::Helvetica.resource_name(), 9.0)
            .text(&page_label, width - MARGIN - label_width, top - 76.0);

        content
            .set_line_width(0.5)
            .stroke_gray(0.4)
            .line(MARGIN, top - 84.0, width - MARGIN, top - 84.0);
    }

    fn draw_footer(&self, content: &mut ContentStreamBuilder, document: &MedicalDocument, url: &str) {
        let width = self.config.page_width;
        let text_width = width - 2.0 * MARGIN - self.config.qr_size - 12.0;

        content
            .set_line_width(0.5)
            .stroke_gray(0.4)
            .line(MARGIN, FOOTER_HEIGHT - 10.0, width - MARGIN, FOOTER_HEIGHT - 10.0);

        content.fill_gray(0.0);
        content
            .set_font(StandardFont::Helvetica.resource_name(), 9.0)
            .text(
                &format!("Emitido em {}", document.issued_at.format("%d/%m/%Y %H:%M UTC")),
                MARGIN,
                FOOTER_HEIGHT - 28.0,
            );
        content
            .set_font(StandardFont::Helvetica.resource_name(), 8.0)
            .text("Verifique a autenticidade deste documento em:", MARGIN, FOOTER_HEIGHT - 44.0);

        let metrics = SimpleFontMetrics::monospace();
        let mut y = FOOTER_HEIGHT - 56.0;
        for row in wrap_text(url, text_width, 7.0, &metrics) {
            content
                .set_font(StandardFont::Courier.resource_name(), 7.0)
                .text(&row, MARGIN, y);
            y -= 9.0;
        }
        content.end_text();
    }
}

fn draw_body(content: &mut ContentStreamBuilder, layout: &PageLayout) {
    content.fill_gray(0.0);
    for row in &layout.rows {
        content
            .set_font(row.font.resource_name(), row.size)
            .text(&row.text, MARGIN + row.x, row.y);
    }
    content.end_text();
}
