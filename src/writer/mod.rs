//! Low-level PDF writing.
//!
//! ## Architecture
//!
//! ```text
//! [ContentStreamBuilder] (text and path operations → content stream bytes)
//!     ↓
//! [PdfWriter] (assembles pages, fonts, info, xref and trailer)
//!     ↓
//! [ObjectSerializer] (serializes PDF objects)
//!     ↓
//! PDF bytes
//! ```
//!
//! QR codes are produced by [`barcode`] and drawn straight into a page's
//! content stream.
//!
//! ```ignore
//! use medsign::writer::{PdfWriter, StandardFont};
//!
//! let mut writer = PdfWriter::new();
//! writer.add_a4_page().add_text("Receita", 72.0, 770.0, StandardFont::HelveticaBold, 14.0);
//! let bytes = writer.finish()?;
//! ```

pub mod barcode;
mod content_stream;
mod object_serializer;
mod pdf_writer;

pub use barcode::{BarcodeGenerator, QrCodeOptions, QrErrorCorrection, QrMatrix};
pub use content_stream::{win_ansi_byte, ContentStreamBuilder, ContentStreamOp};
pub use object_serializer::{encode_text_string, ObjectSerializer};
pub use pdf_writer::{pdf_date, PageBuilder, PdfWriter, PdfWriterConfig, StandardFont};
