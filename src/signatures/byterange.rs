//! ByteRange calculation for PDF signatures.
//!
//! The ByteRange `[0 a b c]` covers everything except the hex `/Contents`
//! value (delimiters included). Both placeholders are written at a fixed
//! width during preparation and overwritten in place, so no offset moves
//! after the range is computed.

use crate::error::{Error, Result};

/// Width of the `/ByteRange` array text, brackets included. Four ten-digit
/// integers fit.
pub const BYTE_RANGE_WIDTH: usize = 46;

/// Calculator for PDF signature byte ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRangeCalculator {
    /// Size of the `/Contents` placeholder (hex digits + 2 for angle brackets)
    placeholder_size: usize,
}

impl ByteRangeCalculator {
    /// Create a calculator reserving `reserve_bytes` for the DER signature.
    ///
    /// The placeholder holds `reserve_bytes * 2` hex digits plus the angle
    /// brackets.
    pub fn new(reserve_bytes: usize) -> Self {
        Self {
            placeholder_size: reserve_bytes * 2 + 2,
        }
    }

    /// Get the placeholder size (for the /Contents value).
    pub fn placeholder_size(&self) -> usize {
        self.placeholder_size
    }

    /// Largest DER container that fits.
    pub fn capacity(&self) -> usize {
        (self.placeholder_size - 2) / 2
    }

    /// `<000…0>` at the reserved width.
    pub fn contents_placeholder(&self) -> String {
        format!("<{}>", "0".repeat(self.placeholder_size - 2))
    }

    /// `[0 0 0 0]` padded to [`BYTE_RANGE_WIDTH`].
    pub fn byte_range_placeholder() -> String {
        pad_byte_range("[0 0 0 0".to_string())
    }

    /// Calculate the ByteRange array given the position of the /Contents value.
    ///
    /// `contents_offset` points at the opening `<`.
    pub fn calculate_byte_range(&self, file_size: usize, contents_offset: usize) -> [i64; 4] {
        let after_sig_start = contents_offset + self.placeholder_size;
        [
            0,
            contents_offset as i64,
            after_sig_start as i64,
            file_size as i64 - after_sig_start as i64,
        ]
    }

    /// Format a ByteRange padded to [`BYTE_RANGE_WIDTH`].
    pub fn format_byte_range(byte_range: &[i64; 4]) -> Result<String> {
        let text = format!("[{} {} {} {}", byte_range[0], byte_range[1], byte_range[2], byte_range[3]);
        if text.len() + 1 > BYTE_RANGE_WIDTH {
            return Err(Error::Signing(format!("ByteRange {} exceeds reserved width", text)));
        }
        Ok(pad_byte_range(text))
    }

    /// Concatenate the two ranges covered by the signature.
    pub fn extract_signed_bytes(pdf_data: &[u8], byte_range: &[i64; 4]) -> Result<Vec<u8>> {
        let (first, second) = ranges(byte_range, pdf_data.len())?;
        let mut signed_bytes = Vec::with_capacity(first.len() + second.len());
        signed_bytes.extend_from_slice(&pdf_data[first]);
        signed_bytes.extend_from_slice(&pdf_data[second]);
        Ok(signed_bytes)
    }

    /// Check that a ByteRange covers the whole file except one gap.
    pub fn validate_byte_range(byte_range: &[i64; 4], file_size: usize) -> Result<()> {
        let [offset1, length1, offset2, length2] = *byte_range;

        if offset1 != 0 {
            return Err(Error::InvalidPdf(format!("ByteRange must start at 0, got {}", offset1)));
        }
        if byte_range.iter().any(|v| *v < 0) {
            return Err(Error::InvalidPdf("ByteRange contains negative values".to_string()));
        }
        let actual_end = offset2
            .checked_add(length2)
            .ok_or_else(|| Error::InvalidPdf(format!("ByteRange {:?} overflows", byte_range)))?;
        if actual_end != file_size as i64 {
            return Err(Error::InvalidPdf(format!(
                "ByteRange must end at file size {}, got {}",
                file_size, actual_end
            )));
        }
        if length1 > offset2 {
            return Err(Error::InvalidPdf(format!(
                "ByteRange first range ({}) overlaps with second range start ({})",
                length1, offset2
            )));
        }
        Ok(())
    }

    /// Write the DER container into the placeholder at `contents_offset`,
    /// zero padded to the reserved width.
    pub fn insert_signature(&self, pdf_data: &mut [u8], contents_offset: usize, der: &[u8]) -> Result<()> {
        if der.len() > self.capacity() {
            return Err(Error::Signing(format!(
                "signature ({} bytes) exceeds reserved space ({} bytes)",
                der.len(),
                self.capacity()
            )));
        }
        let end = contents_offset + self.placeholder_size;
        if end > pdf_data.len() || pdf_data[contents_offset] != b'<' || pdf_data[end - 1] != b'>' {
            return Err(Error::Signing("signature placeholder not found at recorded offset".to_string()));
        }

        let mut value = String::with_capacity(self.placeholder_size);
        value.push('<');
        for byte in der {
            value.push_str(&format!("{:02X}", byte));
        }
        value.push_str(&"0".repeat(self.placeholder_size - 2 - der.len() * 2));
        value.push('>');

        pdf_data[contents_offset..end].copy_from_slice(value.as_bytes());
        Ok(())
    }
}

impl Default for ByteRangeCalculator {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_SIGNATURE_RESERVE)
    }
}

fn pad_byte_range(mut text: String) -> String {
    while text.len() < BYTE_RANGE_WIDTH - 1 {
        text.push(' ');
    }
    text.push(']');
    text
}

fn ranges(
    byte_range: &[i64; 4],
    len: usize,
) -> Result<(std::ops::Range<usize>, std::ops::Range<usize>)> {
    let to_usize = |v: i64| {
        usize::try_from(v).map_err(|_| Error::InvalidPdf(format!("negative ByteRange value {}", v)))
    };
    let end = |offset: i64, length: i64| {
        offset
            .checked_add(length)
            .ok_or_else(|| Error::InvalidPdf(format!("ByteRange {:?} overflows", byte_range)))
            .and_then(to_usize)
    };
    let first = to_usize(byte_range[0])?..end(byte_range[0], byte_range[1])?;
    let second = to_usize(byte_range[2])?..end(byte_range[2], byte_range[3])?;
    if first.end > len || second.end > len || first.start > first.end || second.start > second.end {
        return Err(Error::InvalidPdf(format!(
            "ByteRange {:?} exceeds file size {}",
            byte_range, len
        )));
    }
    Ok((first, second))
}
