//! Brazilian Portuguese cardinal numbers.
//!
//! Controlled prescriptions must state quantities in words as well as
//! numerals, e.g. "30 (trinta) comprimidos".

use lazy_static::lazy_static;
use regex::Regex;

/// Largest value [`number_to_words`] spells out.
pub const MAX_SPELLED: u64 = 999_999_999;

const UNITS: [&str; 20] = [
    "zero", "um", "dois", "três", "quatro", "cinco", "seis", "sete", "oito", "nove", "dez", "onze",
    "doze", "treze", "quatorze", "quinze", "dezesseis", "dezessete", "dezoito", "dezenove",
];

const TENS: [&str; 10] = [
    "", "", "vinte", "trinta", "quarenta", "cinquenta", "sessenta", "setenta", "oitenta", "noventa",
];

const HUNDREDS: [&str; 10] = [
    "",
    "cento",
    "duzentos",
    "trezentos",
    "quatrocentos",
    "quinhentos",
    "seiscentos",
    "setecentos",
    "oitocentos",
    "novecentos",
];

lazy_static! {
    static ref NUMBER: Regex = Regex::new(r"\d+(?:[.,]\d+)?").unwrap();
}

/// Spell out `n` in words. Returns `None` above [`MAX_SPELLED`].
///
/// ```
/// use medsign::compliance::number_to_words;
/// assert_eq!(number_to_words(101).as_deref(), Some("cento e um"));
/// assert_eq!(number_to_words(1001).as_deref(), Some("mil e um"));
/// ```
pub fn number_to_words(n: u64) -> Option<String> {
    if n > MAX_SPELLED {
        return None;
    }
    if n == 0 {
        return Some(UNITS[0].to_string());
    }

    let millions = n / 1_000_000;
    let thousands = (n / 1_000) % 1_000;
    let units = n % 1_000;

    // (words, group value) for each non-zero group, most significant first
    let mut groups: Vec<(String, u64)> = Vec::with_capacity(3);
    if millions > 0 {
        let words = if millions == 1 {
            "um milhão".to_string()
        } else {
            format!("{} milhões", below_thousand(millions))
        };
        groups.push((words, millions));
    }
    if thousands > 0 {
        let words = if thousands == 1 {
            "mil".to_string()
        } else {
            format!("{} mil", below_thousand(thousands))
        };
        groups.push((words, thousands));
    }
    if units > 0 {
        groups.push((below_thousand(units), units));
    }

    let last = groups.len() - 1;
    let mut out = String::new();
    for (i, (words, value)) in groups.iter().enumerate() {
        if i > 0 {
            let joins_with_e = i == last && (*value < 100 || value % 100 == 0);
            out.push_str(if joins_with_e { " e " } else { " " });
        }
        out.push_str(words);
    }
    Some(out)
}

fn below_thousand(n: u64) -> String {
    debug_assert!(n > 0 && n < 1000);
    if n == 100 {
        return "cem".to_string();
    }
    let hundreds = (n / 100) as usize;
    let rest = n % 100;

    let mut parts: Vec<&str> = Vec::with_capacity(3);
    if hundreds > 0 {
        parts.push(HUNDREDS[hundreds]);
    }
    if rest > 0 {
        if rest < 20 {
            parts.push(UNITS[rest as usize]);
        } else {
            parts.push(TENS[(rest / 10) as usize]);
            if rest % 10 > 0 {
                parts.push(UNITS[(rest % 10) as usize]);
            }
        }
    }
    parts.join(" e ")
}

/// Numeral followed by its words in parentheses, e.g. "30 (trinta)".
pub fn with_words(n: u64) -> String {
    match number_to_words(n) {
        Some(words) => format!("{} ({})", n, words),
        None => n.to_string(),
    }
}

/// Annotate every whole number in `text` with its words.
///
/// Decimal values such as "2,5" are left alone.
pub fn spell_numerals(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    let mut last = 0;
    for m in NUMBER.find_iter(text) {
        out.push_str(&text[last..m.start()]);
        let token = m.as_str();
        match token.parse::<u64>() {
            Ok(n) => out.push_str(&with_words(n)),
            Err(_) => out.push_str(token),
        }
        last = m.end();
    }
    out.push_str(&text[last..]);
    out
}
