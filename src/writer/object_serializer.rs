//! PDF object serialization.
//!
//! Serializes PDF objects to their byte representation according to
//! ISO 32000-1:2008. Dictionary keys are always written in sorted order so
//! that identical input produces identical bytes.

use crate::object::{Object, ObjectRef};
use std::collections::HashMap;

/// Serializer for PDF objects.
///
/// Converts PDF Object types to their byte representation following
/// the PDF syntax rules.
#[derive(Debug, Clone, Default)]
pub struct ObjectSerializer {
    /// Whether to use compact formatting (minimal whitespace)
    compact: bool,
}

impl ObjectSerializer {
    /// Create a new object serializer with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a compact serializer (minimal whitespace).
    pub fn compact() -> Self {
        Self { compact: true }
    }

    /// Serialize an object to bytes.
    pub fn serialize(&self, obj: &Object) -> Vec<u8> {
        let mut buf = Vec::new();
        self.write_object(&mut buf, obj);
        buf
    }

    /// Serialize an object to a string (for debugging).
    pub fn serialize_to_string(&self, obj: &Object) -> String {
        String::from_utf8_lossy(&self.serialize(obj)).to_string()
    }

    /// Serialize an indirect object definition.
    ///
    /// Format: `{id} {gen} obj\n{object}\nendobj\n`
    pub fn serialize_indirect(&self, id: u32, gen: u16, obj: &Object) -> Vec<u8> {
        let mut buf = format!("{} {} obj\n", id, gen).into_bytes();
        self.write_object(&mut buf, obj);
        buf.extend_from_slice(b"\nendobj\n");
        buf
    }

    fn write_object(&self, buf: &mut Vec<u8>, obj: &Object) {
        match obj {
            Object::Null => buf.extend_from_slice(b"null"),
            Object::Boolean(b) => buf.extend_from_slice(if *b { b"true" } else { b"false" }),
            Object::Integer(i) => buf.extend_from_slice(i.to_string().as_bytes()),
            Object::Real(r) => write_real(buf, *r),
            Object::String(s) => write_string(buf, s),
            Object::Name(n) => write_name(buf, n),
            Object::Array(arr) => self.write_array(buf, arr),
            Object::Dictionary(dict) => self.write_dictionary(buf, dict),
            Object::Stream { dict, data } => self.write_stream(buf, dict, data),
            Object::Reference(r) => buf.extend_from_slice(r.to_string().as_bytes()),
        }
    }

    fn write_array(&self, buf: &mut Vec<u8>, arr: &[Object]) {
        buf.push(b'[');
        for (i, obj) in arr.iter().enumerate() {
            if i > 0 {
                buf.push(b' ');
            }
            self.write_object(buf, obj);
        }
        buf.push(b']');
    }

    fn write_dictionary(&self, buf: &mut Vec<u8>, dict: &HashMap<String, Object>) {
        buf.extend_from_slice(b"<<");

        let mut keys: Vec<_> = dict.keys().collect();
        keys.sort();

        for key in keys {
            if let Some(value) = dict.get(key) {
                if self.compact {
                    buf.push(b' ');
                } else {
                    buf.extend_from_slice(b"\n  ");
                }
                write_name(buf, key);
                buf.push(b' ');
                self.write_object(buf, value);
            }
        }

        if self.compact {
            if !dict.is_empty() {
                buf.push(b' ');
            }
        } else if !dict.is_empty() {
            buf.push(b'\n');
        }
        buf.extend_from_slice(b">>");
    }

    fn write_stream(&self, buf: &mut Vec<u8>, dict: &HashMap<String, Object>, data: &[u8]) {
        let mut dict_with_length = dict.clone();
        dict_with_length
            .entry("Length".to_string())
            .or_insert(Object::Integer(data.len() as i64));

        self.write_dictionary(buf, &dict_with_length);
        buf.extend_from_slice(b"\nstream\n");
        buf.extend_from_slice(data);
        buf.extend_from_slice(b"\nendstream");
    }
}

/// Write a real number, trimming trailing zeros.
fn write_real(buf: &mut Vec<u8>, value: f64) {
    if value.fract() == 0.0 {
        buf.extend_from_slice((value as i64).to_string().as_bytes());
    } else {
        let formatted = format!("{:.4}", value);
        let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
        buf.extend_from_slice(trimmed.as_bytes());
    }
}

/// Write a PDF string.
///
/// Printable ASCII uses literal syntax `(...)`; anything else is written as a
/// hex string `<...>`.
fn write_string(buf: &mut Vec<u8>, data: &[u8]) {
    let is_printable = data
        .iter()
        .all(|&b| b == b'\n' || b == b'\r' || b == b'\t' || (0x20..=0x7E).contains(&b));

    if is_printable {
        buf.push(b'(');
        for &byte in data {
            match byte {
                b'(' => buf.extend_from_slice(b"\\("),
                b')' => buf.extend_from_slice(b"\\)"),
                b'\\' => buf.extend_from_slice(b"\\\\"),
                b'\n' => buf.extend_from_slice(b"\\n"),
                b'\r' => buf.extend_from_slice(b"\\r"),
                b'\t' => buf.extend_from_slice(b"\\t"),
                _ => buf.push(byte),
            }
        }
        buf.push(b')');
    } else {
        buf.push(b'<');
        for byte in data {
            buf.extend_from_slice(format!("{:02X}", byte).as_bytes());
        }
        buf.push(b'>');
    }
}

/// Write a PDF name, escaping delimiters and non-regular bytes as `#xx`.
fn write_name(buf: &mut Vec<u8>, name: &str) {
    buf.push(b'/');
    for byte in name.bytes() {
        match byte {
            b'!'
            | b'"'
            | b'$'..=b'&'
            | b'\''
            | b'*'..=b'.'
            | b'0'..=b'9'
            | b';'
            | b'='
            | b'?'
            | b'@'
            | b'A'..=b'Z'
            | b'^'..=b'z'
            | b'|'
            | b'~' => buf.push(byte),
            _ => buf.extend_from_slice(format!("#{:02X}", byte).as_bytes()),
        }
    }
}

/// Encode a text string for use outside content streams (document info,
/// signature dictionary).
///
/// ASCII text is kept as-is; anything else becomes UTF-16BE with a byte
/// order mark.
pub fn encode_text_string(text: &str) -> Vec<u8> {
    if text.is_ascii() {
        return text.as_bytes().to_vec();
    }
    let mut out = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        out.extend_from_slice(&unit.to_be_bytes());
    }
    out
}

/// Helper functions for building PDF objects.
impl ObjectSerializer {
    /// Create a Name object.
    pub fn name(s: &str) -> Object {
        Object::Name(s.to_string())
    }

    /// Create a String object from a Rust string.
    pub fn string(s: &str) -> Object {
        Object::String(s.as_bytes().to_vec())
    }

    /// Create a text String object, UTF-16 encoded when needed.
    pub fn text(s: &str) -> Object {
        Object::String(encode_text_string(s))
    }

    /// Create an Integer object.
    pub fn integer(i: i64) -> Object {
        Object::Integer(i)
    }

    /// Create an Array object.
    pub fn array(items: Vec<Object>) -> Object {
        Object::Array(items)
    }

    /// Create a Dictionary object.
    pub fn dict(entries: Vec<(&str, Object)>) -> Object {
        let map: HashMap<String, Object> = entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        Object::Dictionary(map)
    }

    /// Create a Reference object.
    pub fn reference(id: u32, gen: u16) -> Object {
        Object::Reference(ObjectRef::new(id, gen))
    }

    /// Create a rectangle array [x, y, width, height] -> [llx, lly, urx, ury].
    pub fn rect(x: f64, y: f64, width: f64, height: f64) -> Object {
        Object::Array(vec![
            Object::Real(x),
            Object::Real(y),
            Object::Real(x + width),
            Object::Real(y + height),
        ])
    }
}
