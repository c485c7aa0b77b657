//! Incremental update carrying a signature field.
//!
//! The original bytes are never touched. The update appends the signature
//! dictionary, a `/FT /Sig` widget on the first page, rewritten copies of
//! the catalog and the page, a cross-reference section for those objects
//! and a trailer pointing back at the previous one through `/Prev`.

use std::collections::{BTreeMap, HashMap};
use std::io::Write;

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::bytes::Regex;

use super::byterange::ByteRangeCalculator;
use super::types::{SIGNATURE_FILTER, SIGNATURE_SUB_FILTER};
use crate::error::{Error, Result};
use crate::object::{Object, ObjectRef};
use crate::parser::{parse_indirect_object, parse_object};
use crate::writer::{pdf_date, ObjectSerializer};

lazy_static! {
    static ref STARTXREF: Regex = Regex::new(r"(?-u)startxref\s+(\d+)\s+%%EOF").unwrap();
}

/// Page tree depth guard.
const MAX_PAGE_TREE_DEPTH: usize = 32;

/// Widget annotation flags: Print | Locked.
const WIDGET_FLAGS: i64 = 132;

/// The latest trailer of a file.
#[derive(Debug, Clone)]
pub(crate) struct Trailer {
    pub root: ObjectRef,
    pub size: u32,
    pub info: Option<ObjectRef>,
    pub id: Option<Object>,
    pub startxref: usize,
}

/// Text entries of the signature dictionary.
#[derive(Debug, Clone, Default)]
pub(crate) struct SignatureFields<'a> {
    pub name: Option<&'a str>,
    pub reason: Option<&'a str>,
    pub location: Option<&'a str>,
    pub contact_info: Option<&'a str>,
}

/// File with the update appended and the placeholder positions.
#[derive(Debug)]
pub(crate) struct PreparedUpdate {
    pub bytes: Vec<u8>,
    /// Offset of the `<` opening the `/Contents` placeholder
    pub contents_offset: usize,
    /// Offset of the `[` opening the `/ByteRange` placeholder
    pub byte_range_offset: usize,
    pub field_name: String,
}

/// Last position of `needle` in `haystack`.
pub(crate) fn find_last(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).rposition(|w| w == needle)
}

pub(crate) fn read_trailer(pdf: &[u8]) -> Result<Trailer> {
    let caps = STARTXREF
        .captures_iter(pdf)
        .last()
        .ok_or_else(|| Error::InvalidPdf("startxref not found".to_string()))?;
    let startxref = std::str::from_utf8(&caps[1])
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .ok_or_else(|| Error::InvalidPdf("malformed startxref".to_string()))?;

    let before = &pdf[..caps.get(0).map_or(0, |m| m.start())];
    let trailer_pos = find_last(before, b"trailer")
        .ok_or_else(|| Error::Unsupported("cross-reference streams".to_string()))?;
    let (_, trailer) = parse_object(&before[trailer_pos + b"trailer".len()..])
        .map_err(|_| Error::InvalidPdf("malformed trailer dictionary".to_string()))?;
    let dict = trailer
        .as_dict()
        .ok_or_else(|| Error::InvalidPdf("trailer is not a dictionary".to_string()))?;

    let root = dict
        .get("Root")
        .and_then(Object::as_reference)
        .ok_or_else(|| Error::InvalidPdf("trailer has no /Root".to_string()))?;
    let size = match dict.get("Size") {
        Some(Object::Integer(n)) if *n > 0 => {
            u32::try_from(*n).map_err(|_| Error::InvalidPdf(format!("trailer /Size {} out of range", n)))?
        },
        _ => return Err(Error::InvalidPdf("trailer has no valid /Size".to_string())),
    };

    Ok(Trailer {
        root,
        size,
        info: dict.get("Info").and_then(Object::as_reference),
        id: dict.get("ID").cloned(),
        startxref,
    })
}

/// Offset of the latest definition of `obj_ref`.
pub(crate) fn find_object_offset(pdf: &[u8], obj_ref: ObjectRef) -> Option<usize> {
    let header = format!("{} {} obj", obj_ref.id, obj_ref.gen);
    let header = header.as_bytes();
    let mut end = pdf.len();
    while let Some(pos) = find_last(&pdf[..end], header) {
        let starts_token = pos == 0 || pdf[pos - 1].is_ascii_whitespace();
        let ends_token = pdf
            .get(pos + header.len())
            .map_or(true, |c| !c.is_ascii_alphanumeric());
        if starts_token && ends_token {
            return Some(pos);
        }
        end = pos + header.len() - 1;
    }
    None
}

fn load_object(pdf: &[u8], obj_ref: ObjectRef) -> Result<Object> {
    let offset = find_object_offset(pdf, obj_ref)
        .ok_or_else(|| Error::InvalidPdf(format!("object {} not found", obj_ref)))?;
    let (found, object) = parse_indirect_object(pdf, offset)?;
    if found != obj_ref {
        return Err(Error::InvalidPdf(format!("expected object {}, found {}", obj_ref, found)));
    }
    Ok(object)
}

fn load_dict(pdf: &[u8], obj_ref: ObjectRef) -> Result<HashMap<String, Object>> {
    match load_object(pdf, obj_ref)? {
        Object::Dictionary(dict) => Ok(dict),
        other => Err(Error::InvalidPdf(format!(
            "object {} is a {}, expected a dictionary",
            obj_ref,
            other.type_name()
        ))),
    }
}

/// First leaf of the page tree.
pub(crate) fn first_page(pdf: &[u8], catalog: &HashMap<String, Object>) -> Result<(ObjectRef, HashMap<String, Object>)> {
    let mut node_ref = catalog
        .get("Pages")
        .and_then(Object::as_reference)
        .ok_or_else(|| Error::InvalidPdf("catalog has no /Pages".to_string()))?;

    for _ in 0..MAX_PAGE_TREE_DEPTH {
        let node = load_dict(pdf, node_ref)?;
        if matches!(node.get("Type"), Some(Object::Name(t)) if t == "Page") {
            return Ok((node_ref, node));
        }
        node_ref = match node.get("Kids") {
            Some(Object::Array(kids)) => kids.iter().find_map(Object::as_reference),
            _ => None,
        }
        .ok_or_else(|| Error::InvalidPdf("document has no pages".to_string()))?;
    }
    Err(Error::InvalidPdf("page tree too deep".to_string()))
}

/// Resolve an entry that is either an inline array or a reference to one.
fn resolve_array(pdf: &[u8], value: Option<&Object>) -> Result<(Vec<Object>, Option<ObjectRef>)> {
    match value {
        None => Ok((Vec::new(), None)),
        Some(Object::Array(items)) => Ok((items.clone(), None)),
        Some(Object::Reference(r)) => match load_object(pdf, *r)? {
            Object::Array(items) => Ok((items, Some(*r))),
            _ => Err(Error::InvalidPdf(format!("object {} is not an array", r))),
        },
        Some(other) => Err(Error::InvalidPdf(format!("expected an array, found {}", other.type_name()))),
    }
}

/// Append a signature field update to `original`.
///
/// `original` must end with an end-of-line marker so the update starts on
/// a fresh line.
pub(crate) fn append_signature_field(
    original: &[u8],
    calculator: &ByteRangeCalculator,
    fields: &SignatureFields<'_>,
    signed_at: DateTime<Utc>,
) -> Result<PreparedUpdate> {
    let trailer = read_trailer(original)?;
    let mut catalog = load_dict(original, trailer.root)?;
    let (page_ref, mut page) = first_page(original, &catalog)?;

    let sig_id = trailer.size;
    let widget_id = trailer.size + 1;
    let sig_ref = ObjectRef::new(sig_id, 0);
    let widget_ref = ObjectRef::new(widget_id, 0);

    // Objects rewritten in this revision, keyed by id.
    let mut rewritten: BTreeMap<u32, (u16, Object)> = BTreeMap::new();

    let (mut form, form_ref) = match catalog.get("AcroForm") {
        Some(Object::Reference(r)) => (load_dict(original, *r)?, Some(*r)),
        Some(Object::Dictionary(d)) => (d.clone(), None),
        _ => (HashMap::new(), None),
    };
    let (mut form_fields, _) = resolve_array(original, form.get("Fields"))?;
    let field_name = format!("Signature{}", form_fields.len() + 1);
    form_fields.push(Object::Reference(widget_ref));
    form.insert("Fields".to_string(), Object::Array(form_fields));
    form.insert("SigFlags".to_string(), Object::Integer(3));
    match form_ref {
        Some(r) => {
            rewritten.insert(r.id, (r.gen, Object::Dictionary(form)));
        },
        None => {
            catalog.insert("AcroForm".to_string(), Object::Dictionary(form));
        },
    }
    rewritten.insert(trailer.root.id, (trailer.root.gen, Object::Dictionary(catalog)));

    let (mut annots, annots_ref) = resolve_array(original, page.get("Annots"))?;
    annots.push(Object::Reference(widget_ref));
    match annots_ref {
        Some(r) => {
            rewritten.insert(r.id, (r.gen, Object::Array(annots)));
        },
        None => {
            page.insert("Annots".to_string(), Object::Array(annots));
        },
    }
    rewritten.insert(page_ref.id, (page_ref.gen, Object::Dictionary(page)));

    let widget = ObjectSerializer::dict(vec![
        ("Type", ObjectSerializer::name("Annot")),
        ("Subtype", ObjectSerializer::name("Widget")),
        ("FT", ObjectSerializer::name("Sig")),
        ("T", ObjectSerializer::text(&field_name)),
        ("V", Object::Reference(sig_ref)),
        ("F", ObjectSerializer::integer(WIDGET_FLAGS)),
        (
            "Rect",
            ObjectSerializer::array(vec![Object::Integer(0), Object::Integer(0), Object::Integer(0), Object::Integer(0)]),
        ),
        ("P", Object::Reference(page_ref)),
    ]);

    let serializer = ObjectSerializer::compact();
    let mut out = original.to_vec();
    let mut offsets: BTreeMap<u32, (u16, usize)> = BTreeMap::new();

    offsets.insert(sig_id, (0, out.len()));
    write!(
        out,
        "{} 0 obj\n<< /Type /Sig /Filter /{} /SubFilter /{} /ByteRange ",
        sig_id, SIGNATURE_FILTER, SIGNATURE_SUB_FILTER
    )?;
    let byte_range_offset = out.len();
    out.extend_from_slice(ByteRangeCalculator::byte_range_placeholder().as_bytes());
    out.extend_from_slice(b" /Contents ");
    let contents_offset = out.len();
    out.extend_from_slice(calculator.contents_placeholder().as_bytes());
    out.extend_from_slice(b" /M ");
    out.extend_from_slice(&serializer.serialize(&ObjectSerializer::string(&pdf_date(&signed_at))));
    let text_entries = [
        ("Name", fields.name),
        ("Reason", fields.reason),
        ("Location", fields.location),
        ("ContactInfo", fields.contact_info),
    ];
    for (key, value) in text_entries {
        if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
            write!(out, " /{} ", key)?;
            out.extend_from_slice(&serializer.serialize(&ObjectSerializer::text(value.trim())));
        }
    }
    out.extend_from_slice(b" >>\nendobj\n");

    offsets.insert(widget_id, (0, out.len()));
    out.extend_from_slice(&serializer.serialize_indirect(widget_id, 0, &widget));

    for (id, (gen, object)) in &rewritten {
        offsets.insert(*id, (*gen, out.len()));
        out.extend_from_slice(&serializer.serialize_indirect(*id, *gen, object));
    }

    let xref_offset = out.len();
    writeln!(out, "xref")?;
    let entries: Vec<(u32, u16, usize)> = offsets.iter().map(|(id, (gen, off))| (*id, *gen, *off)).collect();
    let mut start = 0;
    while start < entries.len() {
        let mut end = start + 1;
        while end < entries.len() && entries[end].0 == entries[end - 1].0 + 1 {
            end += 1;
        }
        writeln!(out, "{} {}", entries[start].0, end - start)?;
        for (_, gen, offset) in &entries[start..end] {
            writeln!(out, "{:010} {:05} n ", offset, gen)?;
        }
        start = end;
    }

    let mut trailer_entries = vec![
        ("Size", ObjectSerializer::integer(i64::from(widget_id) + 1)),
        ("Root", Object::Reference(trailer.root)),
        ("Prev", ObjectSerializer::integer(trailer.startxref as i64)),
    ];
    if let Some(info) = trailer.info {
        trailer_entries.push(("Info", Object::Reference(info)));
    }
    if let Some(id) = trailer.id {
        trailer_entries.push(("ID", id));
    }
    writeln!(out, "trailer")?;
    out.extend_from_slice(&serializer.serialize(&ObjectSerializer::dict(trailer_entries)));
    writeln!(out)?;
    writeln!(out, "startxref")?;
    writeln!(out, "{}", xref_offset)?;
    writeln!(out, "%%EOF")?;

    log::debug!(
        "appended signature field {} as objects {} and {} ({} bytes)",
        field_name,
        sig_id,
        widget_id,
        out.len() - original.len()
    );
    Ok(PreparedUpdate {
        bytes: out,
        contents_offset,
        byte_range_offset,
        field_name,
    })
}
