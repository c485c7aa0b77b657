//! PDF document writer.
//!
//! Assembles complete PDF documents with proper structure:
//! header, body, xref table, and trailer. Object numbering and font
//! resources are fixed so the same pages always produce the same bytes.

use super::content_stream::ContentStreamBuilder;
use super::object_serializer::ObjectSerializer;
use crate::error::Result;
use crate::object::{Object, ObjectRef};
use std::collections::{BTreeMap, HashMap};
use std::io::Write;

/// Standard Type 1 fonts available to every page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StandardFont {
    /// Helvetica
    Helvetica,
    /// Helvetica-Bold
    HelveticaBold,
    /// Courier, used for identifiers and hashes
    Courier,
}

impl StandardFont {
    /// All fonts, in resource order.
    pub const ALL: [StandardFont; 3] =
        [StandardFont::Helvetica, StandardFont::HelveticaBold, StandardFont::Courier];

    /// Resource name used in content streams.
    pub fn resource_name(&self) -> &'static str {
        match self {
            StandardFont::Helvetica => "F1",
            StandardFont::HelveticaBold => "F2",
            StandardFont::Courier => "F3",
        }
    }

    /// PostScript base font name.
    pub fn base_font(&self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
            StandardFont::HelveticaBold => "Helvetica-Bold",
            StandardFont::Courier => "Courier",
        }
    }
}

/// Configuration for PDF generation.
#[derive(Debug, Clone)]
pub struct PdfWriterConfig {
    /// PDF version (e.g., "1.7")
    pub version: String,
    /// Document title
    pub title: Option<String>,
    /// Document author
    pub author: Option<String>,
    /// Document subject
    pub subject: Option<String>,
    /// Creator application
    pub creator: Option<String>,
    /// Creation date, already in PDF date format (`D:YYYYMMDDHHmmSSZ`)
    pub creation_date: Option<String>,
    /// Whether to compress streams
    pub compress: bool,
}

impl Default for PdfWriterConfig {
    fn default() -> Self {
        Self {
            version: "1.7".to_string(),
            title: None,
            author: None,
            subject: None,
            creator: Some(format!("{} {}", crate::NAME, crate::VERSION)),
            creation_date: None,
            compress: false,
        }
    }
}

impl PdfWriterConfig {
    /// Set document title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set document author.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Set document subject.
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Set creation date from a UTC timestamp.
    pub fn with_creation_date(mut self, at: chrono::DateTime<chrono::Utc>) -> Self {
        self.creation_date = Some(pdf_date(&at));
        self
    }

    /// Enable or disable FlateDecode compression of content streams.
    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }
}

/// Format a timestamp as a PDF date string.
pub fn pdf_date(at: &chrono::DateTime<chrono::Utc>) -> String {
    at.format("D:%Y%m%d%H%M%SZ").to_string()
}

/// Compress data using Flate/Deflate compression.
fn compress_data(data: &[u8]) -> std::io::Result<Vec<u8>> {
    use flate2::write::ZlibEncoder;
    use flate2::Compression;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// A page being built.
pub struct PageBuilder<'a> {
    writer: &'a mut PdfWriter,
    page_index: usize,
}

impl<'a> PageBuilder<'a> {
    /// Add text to the page.
    pub fn add_text(
        &mut self,
        text: &str,
        x: f32,
        y: f32,
        font: StandardFont,
        font_size: f32,
    ) -> &mut Self {
        self.content()
            .set_font(font.resource_name(), font_size)
            .text(text, x, y);
        self
    }

    /// Direct access to the page content stream.
    pub fn content(&mut self) -> &mut ContentStreamBuilder {
        &mut self.writer.pages[self.page_index].content_builder
    }

    /// Page width in points.
    pub fn width(&self) -> f32 {
        self.writer.pages[self.page_index].width
    }

    /// Finish building this page and return to the writer.
    pub fn finish(self) -> &'a mut PdfWriter {
        self.writer.pages[self.page_index].content_builder.end_text();
        self.writer
    }
}

struct PageData {
    width: f32,
    height: f32,
    content_builder: ContentStreamBuilder,
}

/// PDF document writer.
///
/// Object layout: 1 catalog, 2 page tree, then one object per font, one
/// page/content pair per page, and the info dictionary last.
pub struct PdfWriter {
    config: PdfWriterConfig,
    pages: Vec<PageData>,
}

impl PdfWriter {
    /// Create a new PDF writer with default config.
    pub fn new() -> Self {
        Self::with_config(PdfWriterConfig::default())
    }

    /// Create a PDF writer with custom config.
    pub fn with_config(config: PdfWriterConfig) -> Self {
        Self {
            config,
            pages: Vec::new(),
        }
    }

    /// Number of pages added so far.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Add a page with the given dimensions.
    pub fn add_page(&mut self, width: f32, height: f32) -> PageBuilder<'_> {
        let page_index = self.pages.len();
        self.pages.push(PageData {
            width,
            height,
            content_builder: ContentStreamBuilder::new(),
        });
        PageBuilder {
            writer: self,
            page_index,
        }
    }

    /// Add an A4 sized page (210mm x 297mm).
    pub fn add_a4_page(&mut self) -> PageBuilder<'_> {
        self.add_page(595.0, 842.0)
    }

    /// Build the complete PDF document.
    pub fn finish(self) -> Result<Vec<u8>> {
        let serializer = ObjectSerializer::compact();
        let mut objects: BTreeMap<u32, Object> = BTreeMap::new();

        let catalog_id = 1;
        let pages_id = 2;
        let mut next_id = 3;

        let mut font_resources: HashMap<String, Object> = HashMap::new();
        for font in StandardFont::ALL {
            let font_obj = ObjectSerializer::dict(vec![
                ("Type", ObjectSerializer::name("Font")),
                ("Subtype", ObjectSerializer::name("Type1")),
                ("BaseFont", ObjectSerializer::name(font.base_font())),
                ("Encoding", ObjectSerializer::name("WinAnsiEncoding")),
            ]);
            objects.insert(next_id, font_obj);
            font_resources.insert(
                font.resource_name().to_string(),
                Object::Reference(ObjectRef::new(next_id, 0)),
            );
            next_id += 1;
        }

        let mut page_refs: Vec<Object> = Vec::with_capacity(self.pages.len());
        for page_data in &self.pages {
            let page_id = next_id;
            let content_id = next_id + 1;
            next_id += 2;

            let raw_content = page_data.content_builder.build()?;
            let (content_bytes, is_compressed) = if self.config.compress {
                (compress_data(&raw_content)?, true)
            } else {
                (raw_content, false)
            };

            let mut content_dict = HashMap::new();
            content_dict.insert("Length".to_string(), Object::Integer(content_bytes.len() as i64));
            if is_compressed {
                content_dict.insert("Filter".to_string(), Object::Name("FlateDecode".to_string()));
            }

            let page_obj = ObjectSerializer::dict(vec![
                ("Type", ObjectSerializer::name("Page")),
                ("Parent", ObjectSerializer::reference(pages_id, 0)),
                (
                    "MediaBox",
                    ObjectSerializer::rect(0.0, 0.0, page_data.width as f64, page_data.height as f64),
                ),
                ("Contents", ObjectSerializer::reference(content_id, 0)),
                (
                    "Resources",
                    ObjectSerializer::dict(vec![("Font", Object::Dictionary(font_resources.clone()))]),
                ),
            ]);

            page_refs.push(Object::Reference(ObjectRef::new(page_id, 0)));
            objects.insert(page_id, page_obj);
            objects.insert(
                content_id,
                Object::Stream {
                    dict: content_dict,
                    data: bytes::Bytes::from(content_bytes),
                },
            );
        }

        objects.insert(
            pages_id,
            ObjectSerializer::dict(vec![
                ("Type", ObjectSerializer::name("Pages")),
                ("Kids", Object::Array(page_refs)),
                ("Count", ObjectSerializer::integer(self.pages.len() as i64)),
            ]),
        );
        objects.insert(
            catalog_id,
            ObjectSerializer::dict(vec![
                ("Type", ObjectSerializer::name("Catalog")),
                ("Pages", ObjectSerializer::reference(pages_id, 0)),
            ]),
        );

        let info_id = next_id;
        let mut info_entries = Vec::new();
        if let Some(title) = &self.config.title {
            info_entries.push(("Title", ObjectSerializer::text(title)));
        }
        if let Some(author) = &self.config.author {
            info_entries.push(("Author", ObjectSerializer::text(author)));
        }
        if let Some(subject) = &self.config.subject {
            info_entries.push(("Subject", ObjectSerializer::text(subject)));
        }
        if let Some(creator) = &self.config.creator {
            info_entries.push(("Creator", ObjectSerializer::text(creator)));
        }
        if let Some(date) = &self.config.creation_date {
            info_entries.push(("CreationDate", ObjectSerializer::string(date)));
        }
        objects.insert(info_id, ObjectSerializer::dict(info_entries));
        let size = info_id + 1;

        let mut output = Vec::new();
        writeln!(output, "%PDF-{}", self.config.version)?;
        output.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");

        let mut xref_offsets: Vec<usize> = Vec::with_capacity(objects.len());
        for (id, obj) in &objects {
            xref_offsets.push(output.len());
            output.extend_from_slice(&serializer.serialize_indirect(*id, 0, obj));
        }

        let xref_start = output.len();
        writeln!(output, "xref")?;
        writeln!(output, "0 {}", size)?;
        writeln!(output, "0000000000 65535 f ")?;
        for offset in &xref_offsets {
            writeln!(output, "{:010} 00000 n ", offset)?;
        }

        let trailer = ObjectSerializer::dict(vec![
            ("Size", ObjectSerializer::integer(size as i64)),
            ("Root", ObjectSerializer::reference(catalog_id, 0)),
            ("Info", ObjectSerializer::reference(info_id, 0)),
        ]);

        writeln!(output, "trailer")?;
        output.extend_from_slice(&serializer.serialize(&trailer));
        writeln!(output)?;
        writeln!(output, "startxref")?;
        writeln!(output, "{}", xref_start)?;
        writeln!(output, "%%EOF")?;

        log::debug!("wrote PDF with {} page(s), {} bytes", self.pages.len(), output.len());
        Ok(output)
    }
}

impl Default for PdfWriter {
    fn default() -> Self {
        Self::new()
    }
}
