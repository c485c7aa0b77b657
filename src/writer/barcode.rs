//! QR code generation for PDF pages.
//!
//! Codes are drawn as vector modules directly into a content stream, so no
//! image XObject is needed and output stays byte-for-byte deterministic.
//!
//! ```ignore
//! use medsign::writer::barcode::{BarcodeGenerator, QrCodeOptions};
//!
//! let matrix = BarcodeGenerator::qr_matrix("https://verify.example/abc", &QrCodeOptions::default())?;
//! matrix.draw(&mut content, 480.0, 40.0, 72.0);
//! ```

use super::content_stream::ContentStreamBuilder;
use crate::error::{Error, Result};

/// QR code error correction level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QrErrorCorrection {
    /// Low (~7% correction capability)
    Low,
    /// Medium (~15% correction capability)
    #[default]
    Medium,
    /// Quartile (~25% correction capability)
    Quartile,
    /// High (~30% correction capability)
    High,
}

/// Options for QR code generation.
#[derive(Debug, Clone)]
pub struct QrCodeOptions {
    /// Error correction level
    pub error_correction: QrErrorCorrection,
    /// Quiet zone (border) in modules
    pub quiet_zone: u32,
}

impl Default for QrCodeOptions {
    fn default() -> Self {
        Self {
            error_correction: QrErrorCorrection::Medium,
            quiet_zone: 2,
        }
    }
}

impl QrCodeOptions {
    /// Create new QR code options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set error correction level.
    pub fn error_correction(mut self, level: QrErrorCorrection) -> Self {
        self.error_correction = level;
        self
    }

    /// Set quiet zone size in modules.
    pub fn quiet_zone(mut self, modules: u32) -> Self {
        self.quiet_zone = modules;
        self
    }
}

/// Module grid of an encoded QR code, quiet zone included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrMatrix {
    width: usize,
    dark: Vec<bool>,
}

impl QrMatrix {
    /// Modules per side, quiet zone included.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Whether the module at (x, y) is dark. Row 0 is the top row.
    pub fn is_dark(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.width && self.dark[y * self.width + x]
    }

    /// Number of dark modules.
    pub fn dark_count(&self) -> usize {
        self.dark.iter().filter(|d| **d).count()
    }

    /// Draw the code as filled rectangles with its lower-left corner at
    /// (x, y) and the given side length in points.
    ///
    /// Horizontally adjacent dark modules are merged into one rectangle.
    pub fn draw(&self, content: &mut ContentStreamBuilder, x: f32, y: f32, size: f32) {
        if self.width == 0 {
            return;
        }
        let module = size / self.width as f32;

        content.save_state();
        content.fill_gray(1.0).rect(x, y, size, size).fill();
        content.fill_gray(0.0);
        for row in 0..self.width {
            let top = y + size - (row as f32 + 1.0) * module;
            let mut col = 0;
            while col < self.width {
                if !self.is_dark(col, row) {
                    col += 1;
                    continue;
                }
                let start = col;
                while col < self.width && self.is_dark(col, row) {
                    col += 1;
                }
                let run = (col - start) as f32;
                content.rect(x + start as f32 * module, top, run * module, module);
            }
        }
        content.fill();
        content.restore_state();
    }
}

/// QR code generator.
pub struct BarcodeGenerator;

impl BarcodeGenerator {
    /// Encode `data` into a module grid.
    pub fn qr_matrix(data: &str, options: &QrCodeOptions) -> Result<QrMatrix> {
        use qrcode::{EcLevel, QrCode};

        let ec_level = match options.error_correction {
            QrErrorCorrection::Low => EcLevel::L,
            QrErrorCorrection::Medium => EcLevel::M,
            QrErrorCorrection::Quartile => EcLevel::Q,
            QrErrorCorrection::High => EcLevel::H,
        };

        let code = QrCode::with_error_correction_level(data, ec_level)
            .map_err(|e| Error::Barcode(format!("QR code encoding error: {}", e)))?;

        let qr_width = code.width();
        let quiet = options.quiet_zone as usize;
        let width = qr_width + quiet * 2;
        let mut dark = vec![false; width * width];

        for (y, row) in code.to_colors().chunks(qr_width).enumerate() {
            for (x, &module) in row.iter().enumerate() {
                if module == qrcode::Color::Dark {
                    dark[(y + quiet) * width + x + quiet] = true;
                }
            }
        }

        Ok(QrMatrix { width, dark })
    }
}
