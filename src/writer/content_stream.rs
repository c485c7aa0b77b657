//! PDF content stream generation.
//!
//! Builds page content streams from text and path operations. Text is
//! encoded with WinAnsiEncoding so Portuguese accents render with the
//! standard Type 1 fonts.

use std::io::Write;

use crate::error::Result;

/// Content stream operation.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentStreamOp {
    /// Save graphics state (q)
    SaveState,
    /// Restore graphics state (Q)
    RestoreState,
    /// Begin text object (BT)
    BeginText,
    /// End text object (ET)
    EndText,
    /// Set font (Tf)
    SetFont(String, f32),
    /// Set text matrix (Tm)
    SetTextMatrix(f32, f32, f32, f32, f32, f32),
    /// Show text string (Tj)
    ShowText(String),
    /// Set fill gray level (g)
    SetFillColorGray(f32),
    /// Set stroke gray level (G)
    SetStrokeColorGray(f32),
    /// Set line width (w)
    SetLineWidth(f32),
    /// Move to (m)
    MoveTo(f32, f32),
    /// Line to (l)
    LineTo(f32, f32),
    /// Rectangle (re)
    Rectangle(f32, f32, f32, f32),
    /// Stroke path (S)
    Stroke,
    /// Fill path (f)
    Fill,
}

/// Builder for PDF content streams.
#[derive(Debug, Default)]
pub struct ContentStreamBuilder {
    operations: Vec<ContentStreamOp>,
    current_font: Option<String>,
    current_font_size: f32,
    in_text_object: bool,
}

impl ContentStreamBuilder {
    /// Create a new content stream builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an operation to the stream.
    pub fn op(&mut self, op: ContentStreamOp) -> &mut Self {
        self.operations.push(op);
        self
    }

    /// Number of operations recorded so far.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Whether no operation has been recorded.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Begin a text object.
    pub fn begin_text(&mut self) -> &mut Self {
        if !self.in_text_object {
            self.op(ContentStreamOp::BeginText);
            self.in_text_object = true;
            // Tf does not survive ET, so force it to be re-emitted.
            self.current_font = None;
        }
        self
    }

    /// End a text object.
    pub fn end_text(&mut self) -> &mut Self {
        if self.in_text_object {
            self.op(ContentStreamOp::EndText);
            self.in_text_object = false;
        }
        self
    }

    /// Set font for text operations.
    pub fn set_font(&mut self, font_name: &str, size: f32) -> &mut Self {
        self.begin_text();
        if self.current_font.as_deref() != Some(font_name) || self.current_font_size != size {
            self.op(ContentStreamOp::SetFont(font_name.to_string(), size));
            self.current_font = Some(font_name.to_string());
            self.current_font_size = size;
        }
        self
    }

    /// Add text at a position.
    pub fn text(&mut self, text: &str, x: f32, y: f32) -> &mut Self {
        self.begin_text();
        self.op(ContentStreamOp::SetTextMatrix(1.0, 0.0, 0.0, 1.0, x, y));
        self.op(ContentStreamOp::ShowText(text.to_string()));
        self
    }

    /// Set fill gray level (0 = black, 1 = white).
    pub fn fill_gray(&mut self, level: f32) -> &mut Self {
        self.op(ContentStreamOp::SetFillColorGray(level))
    }

    /// Set stroke gray level.
    pub fn stroke_gray(&mut self, level: f32) -> &mut Self {
        self.op(ContentStreamOp::SetStrokeColorGray(level))
    }

    /// Set line width.
    pub fn set_line_width(&mut self, width: f32) -> &mut Self {
        self.op(ContentStreamOp::SetLineWidth(width))
    }

    /// Draw a straight line and stroke it.
    pub fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) -> &mut Self {
        self.end_text();
        self.op(ContentStreamOp::MoveTo(x1, y1));
        self.op(ContentStreamOp::LineTo(x2, y2));
        self.op(ContentStreamOp::Stroke)
    }

    /// Add a rectangle to the current path.
    pub fn rect(&mut self, x: f32, y: f32, width: f32, height: f32) -> &mut Self {
        self.end_text();
        self.op(ContentStreamOp::Rectangle(x, y, width, height))
    }

    /// Stroke the current path.
    pub fn stroke(&mut self) -> &mut Self {
        self.op(ContentStreamOp::Stroke)
    }

    /// Fill the current path.
    pub fn fill(&mut self) -> &mut Self {
        self.op(ContentStreamOp::Fill)
    }

    /// Save graphics state.
    pub fn save_state(&mut self) -> &mut Self {
        self.end_text();
        self.op(ContentStreamOp::SaveState)
    }

    /// Restore graphics state.
    pub fn restore_state(&mut self) -> &mut Self {
        self.end_text();
        self.op(ContentStreamOp::RestoreState)
    }

    /// Build the content stream to bytes.
    ///
    /// An open text object is closed implicitly.
    pub fn build(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();

        for op in &self.operations {
            write_op(&mut buf, op)?;
            writeln!(buf)?;
        }
        if self.in_text_object {
            writeln!(buf, "ET")?;
        }

        Ok(buf)
    }
}

fn write_op<W: Write>(w: &mut W, op: &ContentStreamOp) -> std::io::Result<()> {
    match op {
        ContentStreamOp::SaveState => write!(w, "q"),
        ContentStreamOp::RestoreState => write!(w, "Q"),
        ContentStreamOp::BeginText => write!(w, "BT"),
        ContentStreamOp::EndText => write!(w, "ET"),
        ContentStreamOp::SetFont(name, size) => write!(w, "/{} {} Tf", name, num(*size)),
        ContentStreamOp::SetTextMatrix(a, b, c, d, e, f) => write!(
            w,
            "{} {} {} {} {} {} Tm",
            num(*a),
            num(*b),
            num(*c),
            num(*d),
            num(*e),
            num(*f)
        ),
        ContentStreamOp::ShowText(text) => {
            write!(w, "(")?;
            write_escaped_string(w, text)?;
            write!(w, ") Tj")
        },
        ContentStreamOp::SetFillColorGray(g) => write!(w, "{} g", num(*g)),
        ContentStreamOp::SetStrokeColorGray(g) => write!(w, "{} G", num(*g)),
        ContentStreamOp::SetLineWidth(width) => write!(w, "{} w", num(*width)),
        ContentStreamOp::MoveTo(x, y) => write!(w, "{} {} m", num(*x), num(*y)),
        ContentStreamOp::LineTo(x, y) => write!(w, "{} {} l", num(*x), num(*y)),
        ContentStreamOp::Rectangle(x, y, width, h) => {
            write!(w, "{} {} {} {} re", num(*x), num(*y), num(*width), num(*h))
        },
        ContentStreamOp::Stroke => write!(w, "S"),
        ContentStreamOp::Fill => write!(w, "f"),
    }
}

/// Format a coordinate with at most two decimals.
fn num(value: f32) -> String {
    let formatted = format!("{:.2}", value);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Write text as an escaped WinAnsi literal string body.
fn write_escaped_string<W: Write>(w: &mut W, text: &str) -> std::io::Result<()> {
    for byte in text.chars().map(win_ansi_byte) {
        match byte {
            b'(' => write!(w, "\\(")?,
            b')' => write!(w, "\\)")?,
            b'\\' => write!(w, "\\\\")?,
            b'\n' | b'\r' | b'\t' => write!(w, " ")?,
            _ => w.write_all(&[byte])?,
        }
    }
    Ok(())
}

/// Map a character to its WinAnsiEncoding byte, `?` when unmapped.
pub fn win_ansi_byte(ch: char) -> u8 {
    match ch {
        '\u{20}'..='\u{7E}' | '\u{A0}'..='\u{FF}' => ch as u8,
        '\n' | '\r' | '\t' => ch as u8,
        '€' => 0x80,
        '‚' => 0x82,
        '„' => 0x84,
        '…' => 0x85,
        '•' => 0x95,
        '‘' => 0x91,
        '’' => 0x92,
        '“' => 0x93,
        '”' => 0x94,
        '–' => 0x96,
        '—' => 0x97,
        '™' => 0x99,
        _ => b'?',
    }
}
