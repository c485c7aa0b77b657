//! PDF rendering of medical documents.
//!
//! Every page carries the doctor and patient identity, the document id,
//! "page n of N", the issuance timestamp and a QR code pointing at the
//! verification URL. Prescriptions that need a retained copy are printed
//! once per via, each via starting on a new page.

mod body;
mod layout;
mod renderer;

pub use layout::{
    paginate, wrap_text, Block, FontMetrics, PageLayout, PlacedRow, SimpleFontMetrics, TextLine,
};
pub use renderer::DocumentRenderer;
