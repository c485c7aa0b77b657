//! Text measurement, wrapping and pagination.

use crate::writer::StandardFont;

/// Trait for measuring text width.
pub trait FontMetrics {
    /// Width of `text` at `font_size`, in points.
    fn text_width(&self, text: &str, font_size: f32) -> f32;
}

/// Average-width approximation of the standard fonts.
#[derive(Debug, Clone, Copy)]
pub struct SimpleFontMetrics {
    /// Average character width as proportion of font size
    pub char_width_ratio: f32,
}

impl Default for SimpleFontMetrics {
    fn default() -> Self {
        Self {
            char_width_ratio: 0.5,
        }
    }
}

impl SimpleFontMetrics {
    /// Create metrics for monospace fonts.
    pub fn monospace() -> Self {
        Self {
            char_width_ratio: 0.6,
        }
    }

    /// Metrics appropriate for `font`.
    pub fn for_font(font: StandardFont) -> Self {
        match font {
            StandardFont::Courier => Self::monospace(),
            StandardFont::Helvetica | StandardFont::HelveticaBold => Self::default(),
        }
    }
}

impl FontMetrics for SimpleFontMetrics {
    fn text_width(&self, text: &str, font_size: f32) -> f32 {
        text.chars().count() as f32 * font_size * self.char_width_ratio
    }
}

/// Wrap text to fit within a given width.
///
/// Words longer than the width are hard-split so nothing overflows.
pub fn wrap_text(text: &str, max_width: f32, font_size: f32, metrics: &dyn FontMetrics) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current_line = String::new();

    for word in text.split_whitespace() {
        let test_line = if current_line.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current_line, word)
        };

        if metrics.text_width(&test_line, font_size) <= max_width {
            current_line = test_line;
            continue;
        }

        if !current_line.is_empty() {
            lines.push(std::mem::take(&mut current_line));
        }
        if metrics.text_width(word, font_size) <= max_width {
            current_line = word.to_string();
        } else {
            for ch in word.chars() {
                current_line.push(ch);
                if metrics.text_width(&current_line, font_size) > max_width {
                    current_line.pop();
                    lines.push(std::mem::take(&mut current_line));
                    current_line.push(ch);
                }
            }
        }
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }

    lines
}

/// One logical body line before wrapping.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    /// Text to print
    pub text: String,
    /// Font
    pub font: StandardFont,
    /// Font size in points
    pub size: f32,
    /// Left indent in points
    pub indent: f32,
    /// Extra space above the line
    pub space_before: f32,
}

impl TextLine {
    /// Regular body text.
    pub fn body(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            font: StandardFont::Helvetica,
            size: 10.0,
            indent: 0.0,
            space_before: 0.0,
        }
    }

    /// Bold body text.
    pub fn bold(text: impl Into<String>) -> Self {
        Self {
            font: StandardFont::HelveticaBold,
            size: 11.0,
            ..Self::body(text)
        }
    }

    /// Set indent.
    pub fn indent(mut self, indent: f32) -> Self {
        self.indent = indent;
        self
    }

    /// Set extra space above.
    pub fn space_before(mut self, space: f32) -> Self {
        self.space_before = space;
        self
    }

    /// Vertical advance for one wrapped row of this line.
    pub fn leading(&self) -> f32 {
        self.size * 1.4
    }
}

/// Element of the body flow.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    /// A line of text, wrapped as needed
    Line(TextLine),
    /// Start a new copy of the document with its label; forces a page break
    /// unless at the very beginning
    Via(&'static str),
}

/// A positioned row of text on a page.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedRow {
    /// Text to print
    pub text: String,
    /// Font
    pub font: StandardFont,
    /// Font size
    pub size: f32,
    /// X offset from the left margin
    pub x: f32,
    /// Baseline, absolute page coordinate
    pub y: f32,
}

/// Body content assigned to one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLayout {
    /// Copy label shown in the header, if any
    pub via: Option<&'static str>,
    /// Rows in drawing order
    pub rows: Vec<PlacedRow>,
}

/// Distribute blocks over pages whose body area spans `top` down to
/// `bottom` with `width` points available.
pub fn paginate(blocks: &[Block], top: f32, bottom: f32, width: f32) -> Vec<PageLayout> {
    let mut pages = vec![PageLayout::default()];
    let mut y = top;

    for block in blocks {
        match block {
            Block::Via(label) => {
                let current = pages.len() - 1;
                if !pages[current].rows.is_empty() || pages[current].via.is_some() {
                    pages.push(PageLayout::default());
                    y = top;
                }
                let last = pages.len() - 1;
                pages[last].via = Some(*label);
            },
            Block::Line(line) => {
                let metrics = SimpleFontMetrics::for_font(line.font);
                let rows = wrap_text(&line.text, width - line.indent, line.size, &metrics);
                for (i, row) in rows.into_iter().enumerate() {
                    let advance = line.leading() + if i == 0 { line.space_before } else { 0.0 };
                    let last = pages.len() - 1;
                    if y - advance < bottom && !pages[last].rows.is_empty() {
                        let via = pages[last].via;
                        pages.push(PageLayout { via, rows: Vec::new() });
                        y = top;
                    }
                    let last = pages.len() - 1;
                    // Space above is dropped at the top of a page.
                    y -= if pages[last].rows.is_empty() { line.leading() } else { advance };
                    pages[last].rows.push(PlacedRow {
                        text: row,
                        font: line.font,
                        size: line.size,
                        x: line.indent,
                        y,
                    });
                }
            },
        }
    }

    pages
}
