//! Markup-to-text conversion for feed titles.
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<!--.*?-->|</?([a-zA-Z][a-zA-Z0-9]*)?[^>]*>").expect("valid tag regex")
});
static ENTITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z][a-zA-Z0-9]{1,31});")
        .expect("valid entity regex")
});
static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Tags that break a line when rendered; everything else is inline.
fn is_block_tag(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        "br" | "p" | "div" | "li" | "ul" | "ol" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6"
            | "blockquote" | "tr" | "td" | "th" | "hr"
    )
}

fn named_entity(name: &str) -> Option<char> {
    let c = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => ' ',
        "ndash" => '\u{2013}',
        "mdash" => '\u{2014}',
        "lsquo" => '\u{2018}',
        "rsquo" => '\u{2019}',
        "ldquo" => '\u{201C}',
        "rdquo" => '\u{201D}',
        "hellip" => '\u{2026}',
        "laquo" => '\u{00AB}',
        "raquo" => '\u{00BB}',
        "iexcl" => '\u{00A1}',
        "iquest" => '\u{00BF}',
        "ordf" => '\u{00AA}',
        "ordm" => '\u{00BA}',
        "aacute" => 'á',
        "agrave" => 'à',
        "acirc" => 'â',
        "atilde" => 'ã',
        "ccedil" => 'ç',
        "eacute" => 'é',
        "ecirc" => 'ê',
        "iacute" => 'í',
        "oacute" => 'ó',
        "ocirc" => 'ô',
        "otilde" => 'õ',
        "uacute" => 'ú',
        "Aacute" => 'Á',
        "Agrave" => 'À',
        "Acirc" => 'Â',
        "Atilde" => 'Ã',
        "Ccedil" => 'Ç',
        "Eacute" => 'É',
        "Ecirc" => 'Ê',
        "Iacute" => 'Í',
        "Oacute" => 'Ó',
        "Ocirc" => 'Ô',
        "Otilde" => 'Õ',
        "Uacute" => 'Ú',
        _ => return None,
    };
    Some(c)
}

fn decode_entity(body: &str) -> Option<char> {
    if let Some(num) = body.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };
        return char::from_u32(code);
    }
    named_entity(body)
}

/// Decode character references. Unknown ones are left as written.
pub fn decode_entities(s: &str) -> String {
    ENTITY_RE
        .replace_all(s, |caps: &Captures| match decode_entity(&caps[1]) {
            Some(c) => c.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Render an HTML fragment as the plain text a reader would see: tags and
/// comments dropped, entities decoded, whitespace collapsed and trimmed.
pub fn to_plain_text(s: &str) -> String {
    // Tags go first so that an encoded `&lt;b&gt;` survives as literal text.
    let without_tags = TAG_RE.replace_all(s, |caps: &Captures| match caps.get(1) {
        Some(name) if !is_block_tag(name.as_str()) => "",
        _ => " ",
    });
    let decoded = decode_entities(&without_tags);
    WS_RE.replace_all(&decoded, " ").trim().to_string()
}
