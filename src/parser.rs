//! PDF object syntax parser.
//!
//! Covers direct objects (ISO 32000-1 §7.3) and indirect object headers.
//! Streams are never parsed: the signing path only reads catalog, page tree
//! and signature dictionaries.

use std::collections::HashMap;

use nom::{
    branch::alt,
    bytes::complete::{tag, take_till, take_while},
    character::complete::{char, digit1, one_of},
    combinator::{map, opt, recognize, value},
    error::{Error as NomError, ErrorKind},
    sequence::{pair, preceded, tuple},
    IResult,
};

use crate::error::{Error, Result};
use crate::object::{Object, ObjectRef};

fn is_whitespace(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\r' | b'\n' | 0x00 | 0x0C)
}

fn is_delimiter(c: u8) -> bool {
    matches!(c, b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%')
}

fn is_regular(c: u8) -> bool {
    !is_whitespace(c) && !is_delimiter(c)
}

fn fail<T>(input: &[u8], kind: ErrorKind) -> IResult<&[u8], T> {
    Err(nom::Err::Error(NomError::new(input, kind)))
}

/// Skip whitespace and comments.
fn ws(input: &[u8]) -> IResult<&[u8], ()> {
    let mut rest = input;
    loop {
        let (after_space, _) = take_while(is_whitespace)(rest)?;
        let comment: IResult<&[u8], &[u8]> =
            preceded(char('%'), take_till(|c| c == b'\r' || c == b'\n'))(after_space);
        match comment {
            Ok((after_comment, _)) => rest = after_comment,
            Err(_) => return Ok((after_space, ())),
        }
    }
}

fn number(input: &[u8]) -> IResult<&[u8], Object> {
    let (rest, text) = recognize(pair(
        opt(one_of("+-")),
        alt((
            recognize(pair(digit1, opt(pair(char('.'), opt(digit1))))),
            recognize(pair(char('.'), digit1)),
        )),
    ))(input)?;
    let text = String::from_utf8_lossy(text);
    if !text.contains('.') {
        if let Ok(i) = text.parse::<i64>() {
            return Ok((rest, Object::Integer(i)));
        }
    }
    match text.parse::<f64>() {
        Ok(r) => Ok((rest, Object::Real(r))),
        Err(_) => fail(input, ErrorKind::Float),
    }
}

fn reference(input: &[u8]) -> IResult<&[u8], Object> {
    let (rest, (id, _, gen, _, _)) = tuple((digit1, ws, digit1, ws, char('R')))(input)?;
    if rest.first().is_some_and(|c| is_regular(*c)) {
        return fail(input, ErrorKind::Char);
    }
    let id = String::from_utf8_lossy(id).parse::<u32>();
    let gen = String::from_utf8_lossy(gen).parse::<u16>();
    match (id, gen) {
        (Ok(id), Ok(gen)) => Ok((rest, Object::Reference(ObjectRef::new(id, gen)))),
        _ => fail(input, ErrorKind::Digit),
    }
}

fn literal_string(input: &[u8]) -> IResult<&[u8], Object> {
    let (body, _) = char('(')(input)?;
    let mut depth = 1usize;
    let mut i = 0;
    while i < body.len() {
        match body[i] {
            b'\\' => i += 2,
            b'(' => {
                depth += 1;
                i += 1;
            },
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok((&body[i + 1..], Object::String(unescape_literal(&body[..i]))));
                }
                i += 1;
            },
            _ => i += 1,
        }
    }
    fail(input, ErrorKind::Char)
}

/// Decode the escape sequences of a literal string body (§7.3.4.2).
pub fn unescape_literal(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] != b'\\' || i + 1 >= raw.len() {
            out.push(raw[i]);
            i += 1;
            continue;
        }
        let next = raw[i + 1];
        i += 2;
        match next {
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0C),
            b'\r' => {
                if raw.get(i) == Some(&b'\n') {
                    i += 1;
                }
            },
            b'\n' => {},
            b'0'..=b'7' => {
                let mut code = u32::from(next - b'0');
                let mut digits = 1;
                while digits < 3 && i < raw.len() && (b'0'..=b'7').contains(&raw[i]) {
                    code = code * 8 + u32::from(raw[i] - b'0');
                    i += 1;
                    digits += 1;
                }
                out.push((code & 0xFF) as u8);
            },
            other => out.push(other),
        }
    }
    out
}

fn hex_string(input: &[u8]) -> IResult<&[u8], Object> {
    let (rest, _) = char('<')(input)?;
    let (rest, body) = take_till(|c| c == b'>')(rest)?;
    let (rest, _) = char('>')(rest)?;
    match decode_hex(body) {
        Ok(bytes) => Ok((rest, Object::String(bytes))),
        Err(_) => fail(input, ErrorKind::HexDigit),
    }
}

/// Decode hex digits, ignoring whitespace; an odd trailing digit is
/// padded with 0 (§7.3.4.3).
pub fn decode_hex(hex: &[u8]) -> Result<Vec<u8>> {
    let digits: Vec<u8> = hex.iter().copied().filter(|c| !is_whitespace(*c)).collect();
    let mut out = Vec::with_capacity(digits.len().div_ceil(2));
    for chunk in digits.chunks(2) {
        let hi = hex_value(chunk[0])?;
        let lo = match chunk.get(1) {
            Some(c) => hex_value(*c)?,
            None => 0,
        };
        out.push(hi << 4 | lo);
    }
    Ok(out)
}

fn hex_value(c: u8) -> Result<u8> {
    match c {
        b'0'..=b'9' => Ok(c - b'0'),
        b'a'..=b'f' => Ok(c - b'a' + 10),
        b'A'..=b'F' => Ok(c - b'A' + 10),
        _ => Err(Error::InvalidPdf(format!("invalid hex digit 0x{:02x}", c))),
    }
}

fn name(input: &[u8]) -> IResult<&[u8], String> {
    let (rest, raw) = preceded(char('/'), take_while(is_regular))(input)?;
    let mut decoded = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'#' && i + 2 < raw.len() {
            if let (Ok(hi), Ok(lo)) = (hex_value(raw[i + 1]), hex_value(raw[i + 2])) {
                decoded.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        decoded.push(raw[i]);
        i += 1;
    }
    Ok((rest, String::from_utf8_lossy(&decoded).into_owned()))
}

fn array(input: &[u8]) -> IResult<&[u8], Object> {
    let (mut rest, _) = char('[')(input)?;
    let mut items = Vec::new();
    loop {
        let (after_ws, _) = ws(rest)?;
        if let Ok((after, _)) = char::<&[u8], NomError<&[u8]>>(']')(after_ws) {
            return Ok((after, Object::Array(items)));
        }
        let (after, item) = parse_object(after_ws)?;
        items.push(item);
        rest = after;
    }
}

fn dictionary(input: &[u8]) -> IResult<&[u8], Object> {
    let (mut rest, _) = tag("<<")(input)?;
    let mut entries = HashMap::new();
    loop {
        let (after_ws, _) = ws(rest)?;
        if let Ok((after, _)) = tag::<&str, &[u8], NomError<&[u8]>>(">>")(after_ws) {
            return Ok((after, Object::Dictionary(entries)));
        }
        let (after_key, key) = name(after_ws)?;
        let (after_value, val) = parse_object(after_key)?;
        entries.insert(key, val);
        rest = after_value;
    }
}

fn keyword(input: &[u8]) -> IResult<&[u8], Object> {
    alt((
        value(Object::Boolean(true), tag("true")),
        value(Object::Boolean(false), tag("false")),
        value(Object::Null, tag("null")),
    ))(input)
}

/// Parse one direct object, skipping leading whitespace and comments.
pub fn parse_object(input: &[u8]) -> IResult<&[u8], Object> {
    let (input, _) = ws(input)?;
    alt((
        dictionary,
        array,
        hex_string,
        literal_string,
        map(name, Object::Name),
        reference,
        number,
        keyword,
    ))(input)
}

/// Parse an `N G obj` header.
pub fn parse_object_header(input: &[u8]) -> IResult<&[u8], ObjectRef> {
    let (rest, (_, id, _, gen, _, _)) = tuple((ws, digit1, ws, digit1, ws, tag("obj")))(input)?;
    let id = String::from_utf8_lossy(id).parse::<u32>();
    let gen = String::from_utf8_lossy(gen).parse::<u16>();
    match (id, gen) {
        (Ok(id), Ok(gen)) => Ok((rest, ObjectRef::new(id, gen))),
        _ => fail(input, ErrorKind::Digit),
    }
}

/// Parse the indirect object starting at `offset`, returning its reference
/// and direct value.
pub fn parse_indirect_object(data: &[u8], offset: usize) -> Result<(ObjectRef, Object)> {
    let input = data
        .get(offset..)
        .ok_or_else(|| Error::InvalidPdf(format!("object offset {} beyond end of file", offset)))?;
    let (rest, obj_ref) = parse_object_header(input)
        .map_err(|_| Error::InvalidPdf(format!("no object header at offset {}", offset)))?;
    let (_, object) = parse_object(rest)
        .map_err(|_| Error::InvalidPdf(format!("malformed object {}", obj_ref)))?;
    Ok((obj_ref, object))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Object {
        parse_object(input.as_bytes()).unwrap().1
    }

    #[test]
    fn test_scalars() {
        assert_eq!(parse("42"), Object::Integer(42));
        assert_eq!(parse("-3.5"), Object::Real(-3.5));
        assert_eq!(parse(".5"), Object::Real(0.5));
        assert_eq!(parse("true"), Object::Boolean(true));
        assert_eq!(parse("null"), Object::Null);
        assert_eq!(parse("/Type"), Object::Name("Type".into()));
        assert_eq!(parse("/A#20B"), Object::Name("A B".into()));
    }

    #[test]
    fn test_reference_vs_integers() {
        assert_eq!(parse("12 0 R"), Object::Reference(ObjectRef::new(12, 0)));
        assert_eq!(
            parse("[1 2 3]"),
            Object::Array(vec![Object::Integer(1), Object::Integer(2), Object::Integer(3)])
        );
        assert_eq!(
            parse("[1 0 R 2]"),
            Object::Array(vec![Object::Reference(ObjectRef::new(1, 0)), Object::Integer(2)])
        );
    }

    #[test]
    fn test_strings() {
        assert_eq!(parse("(a\\(b\\)c)"), Object::String(b"a(b)c".to_vec()));
        assert_eq!(parse("(nested (parens) ok)"), Object::String(b"nested (parens) ok".to_vec()));
        assert_eq!(parse("(\\101\\n)"), Object::String(b"A\n".to_vec()));
        assert_eq!(parse("<48 65 6C6C6F>"), Object::String(b"Hello".to_vec()));
        assert_eq!(parse("<4>"), Object::String(vec![0x40]));
    }

    #[test]
    fn test_dictionary_with_comments() {
        let obj = parse("<< /Type /Catalog % comment\n /Pages 2 0 R /Empty <<>> >>");
        let dict = obj.as_dict().unwrap();
        assert_eq!(dict.get("Type"), Some(&Object::Name("Catalog".into())));
        assert_eq!(dict.get("Pages"), Some(&Object::Reference(ObjectRef::new(2, 0))));
        assert_eq!(dict.get("Empty"), Some(&Object::Dictionary(HashMap::new())));
    }

    #[test]
    fn test_indirect_object() {
        let data = b"junk\n7 0 obj\n<< /Kids [3 0 R] >>\nendobj\n";
        let (obj_ref, obj) = parse_indirect_object(data, 4).unwrap();
        assert_eq!(obj_ref, ObjectRef::new(7, 0));
        assert!(obj.as_dict().unwrap().contains_key("Kids"));
        assert!(parse_indirect_object(data, 0).is_err());
    }
}
