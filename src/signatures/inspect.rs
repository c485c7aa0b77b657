//! Lightweight signature scans.
//!
//! These functions locate the latest signature dictionary with a byte-level
//! search and parse only that dictionary, so they work on any classic-xref
//! PDF without building a document model.

use lazy_static::lazy_static;
use regex::bytes::Regex;
use sha2::{Digest, Sha256};

use super::byterange::ByteRangeCalculator;
use super::incremental::find_last;
use super::types::{HashAlgorithm, SignatureInfo};
use crate::error::{Error, Result};
use crate::model::hex_lower;
use crate::object::Object;
use crate::parser::parse_indirect_object;

lazy_static! {
    static ref BYTE_RANGE: Regex = Regex::new(r"(?-u)/ByteRange\s*\[").unwrap();
    static ref OBJECT_HEADER: Regex = Regex::new(r"(?-u)(?:^|\s)(\d+)\s+(\d+)\s+obj\b").unwrap();
}

/// Offset of the last object header starting before `end`.
fn enclosing_object(pdf: &[u8], end: usize) -> Option<usize> {
    OBJECT_HEADER
        .captures_iter(&pdf[..end])
        .last()
        .and_then(|caps| caps.get(1))
        .map(|m| m.start())
}

/// Decode a PDF text string: UTF-16BE with a byte order mark, otherwise
/// single-byte.
pub(crate) fn decode_text(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks(2)
            .map(|pair| u16::from_be_bytes([pair[0], *pair.get(1).unwrap_or(&0)]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        bytes.iter().map(|&b| b as char).collect()
    }
}

fn text_entry(dict: &std::collections::HashMap<String, Object>, key: &str) -> Option<String> {
    match dict.get(key) {
        Some(Object::String(bytes)) => Some(decode_text(bytes)),
        Some(Object::Name(name)) => Some(name.clone()),
        _ => None,
    }
}

fn byte_range(value: Option<&Object>) -> Option<[i64; 4]> {
    match value {
        Some(Object::Array(items)) if items.len() == 4 => {
            let mut range = [0i64; 4];
            for (slot, item) in range.iter_mut().zip(items) {
                match item {
                    Object::Integer(n) => *slot = *n,
                    _ => return None,
                }
            }
            Some(range)
        },
        _ => None,
    }
}

/// Name of the form field whose `/V` points at the signature object.
fn field_name(pdf: &[u8], id: u32, gen: u16) -> Option<String> {
    let pattern = Regex::new(&format!(r"(?-u)/V\s+{}\s+{}\s+R\b", id, gen)).ok()?;
    let found = pattern.find_iter(pdf).last()?;
    let offset = enclosing_object(pdf, found.start())?;
    let (_, widget) = parse_indirect_object(pdf, offset).ok()?;
    text_entry(widget.as_dict()?, "T")
}

/// Describe the latest signature dictionary, if the PDF has one.
pub fn get_signature_info(pdf: &[u8]) -> Option<SignatureInfo> {
    let marker = BYTE_RANGE.find_iter(pdf).last()?;
    let offset = enclosing_object(pdf, marker.start())?;
    let (obj_ref, object) = parse_indirect_object(pdf, offset).ok()?;
    let dict = object.as_dict()?;

    let signed = match dict.get("Contents") {
        Some(Object::String(bytes)) => bytes.iter().any(|b| *b != 0),
        _ => false,
    };

    Some(SignatureInfo {
        signed,
        field_name: field_name(pdf, obj_ref.id, obj_ref.gen),
        signer_name: text_entry(dict, "Name"),
        signing_time: text_entry(dict, "M"),
        reason: text_entry(dict, "Reason"),
        location: text_entry(dict, "Location"),
        contact_info: text_entry(dict, "ContactInfo"),
        sub_filter: text_entry(dict, "SubFilter"),
        byte_range: byte_range(dict.get("ByteRange")),
        dictionary_offset: offset,
    })
}

/// Whether the PDF carries a signature with a non-empty `/Contents`.
pub fn is_signed(pdf: &[u8]) -> bool {
    get_signature_info(pdf).is_some_and(|info| info.signed)
}

/// The revision that preceded the latest signature: everything up to and
/// including the end-of-line after the last `%%EOF` before the signature
/// dictionary. Unsigned files are returned whole.
pub fn unsigned_revision(pdf: &[u8]) -> &[u8] {
    let Some(info) = get_signature_info(pdf) else {
        return pdf;
    };
    let Some(eof) = find_last(&pdf[..info.dictionary_offset], b"%%EOF") else {
        return pdf;
    };
    let mut end = eof + b"%%EOF".len();
    match pdf.get(end..end + 2) {
        Some(b"\r\n") => end += 2,
        _ if matches!(pdf.get(end), Some(b'\r') | Some(b'\n')) => end += 1,
        _ => {},
    }
    &pdf[..end]
}

/// Lowercase hex SHA-256 of `bytes`.
pub fn hash_document(bytes: &[u8]) -> String {
    hex_lower(&Sha256::digest(bytes))
}

/// Recompute the digest of the unsigned revision and compare it with the
/// one recorded at signing time (case-insensitive hex).
///
/// A signed document must also end where its latest `/ByteRange` ends;
/// bytes appended after signing fail the check.
pub fn verify_integrity(pdf: &[u8], expected_hash: &str, algorithm: HashAlgorithm) -> Result<()> {
    let actual = match algorithm {
        HashAlgorithm::Sha256 => hash_document(unsigned_revision(pdf)),
    };
    let expected = expected_hash.trim().to_ascii_lowercase();
    if let Some(info) = get_signature_info(pdf).filter(|info| info.signed) {
        let covered = info
            .byte_range
            .is_some_and(|range| ByteRangeCalculator::validate_byte_range(&range, pdf.len()).is_ok());
        if !covered {
            log::warn!("signed revision does not cover all {} bytes", pdf.len());
            return Err(Error::Integrity { expected, actual });
        }
    }
    if actual == expected {
        Ok(())
    } else {
        log::warn!("integrity check failed for {} byte document", pdf.len());
        Err(Error::Integrity { expected, actual })
    }
}
