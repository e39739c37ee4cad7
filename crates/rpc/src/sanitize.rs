//! Output sanitization for text leaving the gateway.
//!
//! Results are encoded as XML, which can neither carry arbitrary control
//! characters nor, for older clients, anything outside ASCII. Text is first
//! escaped to ASCII with numeric character references and then stripped of the
//! code points XML forbids or discourages.

use std::borrow::Cow;

use serde_json::{Map, Value};

/// Inclusive code point ranges that are illegal or discouraged in XML.
const ILLEGAL_RANGES: &[(u32, u32)] = &[
    (0x00, 0x08),
    (0x0b, 0x0c),
    (0x0e, 0x1f),
    (0x7f, 0x84),
    (0x86, 0x9f),
    (0xfdd0, 0xfddf),
    (0xfffe, 0xffff),
];

/// Whether `c` falls in one of the XML-illegal ranges, including the
/// `xFFFE-xFFFF` noncharacters of every supplementary plane.
fn is_illegal(c: char) -> bool {
    let cp = u32::from(c);
    if cp > 0xffff {
        return cp & 0xffff >= 0xfffe;
    }
    ILLEGAL_RANGES.iter().any(|&(lo, hi)| (lo..=hi).contains(&cp))
}

/// Replace every non-ASCII code point with its decimal character reference.
fn escape_non_ascii(text: &str) -> Cow<'_, str> {
    if text.is_ascii() {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 16);
    for c in text.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            out.push_str("&#");
            out.push_str(&u32::from(c).to_string());
            out.push(';');
        }
    }
    Cow::Owned(out)
}

/// Drop every illegal code point.
fn strip_illegal(text: Cow<'_, str>) -> Cow<'_, str> {
    if !text.chars().any(is_illegal) {
        return text;
    }
    Cow::Owned(text.chars().filter(|&c| !is_illegal(c)).collect())
}

/// Make `text` safe for XML output.
///
/// `"Hello…"` becomes `"Hello&#8230;"`; control characters other than tab,
/// newline and carriage return are removed. Empty input is returned as is.
/// Applying `clean` twice gives the same result as applying it once.
pub fn clean(text: &str) -> Cow<'_, str> {
    if text.is_empty() {
        return Cow::Borrowed(text);
    }
    strip_illegal(escape_non_ascii(text))
}

/// [`clean`] for optional text; `None` passes through.
pub fn clean_opt(text: Option<&str>) -> Option<Cow<'_, str>> {
    text.map(clean)
}

/// Clean every string and map key inside `value`.
///
/// Map keys that clean to the same text collapse into one entry: the key keeps
/// the position of its first occurrence and the value of its last.
pub fn clean_value(value: Value) -> Value {
    match value {
        Value::String(text) => match clean(&text) {
            Cow::Borrowed(_) => Value::String(text),
            Cow::Owned(cleaned) => Value::String(cleaned),
        },
        Value::Array(items) => Value::Array(items.into_iter().map(clean_value).collect()),
        Value::Object(entries) => Value::Object(
            entries
                .into_iter()
                .map(|(key, item)| (clean(&key).into_owned(), clean_value(item)))
                .collect::<Map<String, Value>>(),
        ),
        other => other,
    }
}
