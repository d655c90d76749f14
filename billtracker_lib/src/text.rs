//! Bill text normalization.
//!
//! A `getBillText` payload can carry its content in several mutually
//! exclusive shapes. [`resolve_text`] walks them in a fixed preference order
//! and returns the first viable body, a link-only sentinel, or nothing.

use std::sync::OnceLock;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use legiscan_api::types::BillText;
use regex::Regex;
use serde::Serialize;

/// Plain text shorter than this is treated as noise.
pub const MIN_TEXT_CHARS: usize = 100;

/// Decoded documents shorter than this (after cleaning) are treated as noise.
pub const MIN_DOCUMENT_CHARS: usize = 500;

/// Prefix of the sentinel stored when only a link to the text exists.
pub const LINK_ONLY_PREFIX: &str = "Full text available at: ";

/// One candidate content shape, in preference order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSource<'a> {
    AltText(&'a str),
    Text(&'a str),
    Document(&'a str),
    AltDocument(&'a str),
    Link(&'a str),
}

/// Outcome of text resolution for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ResolvedText {
    /// Cleaned body text.
    Body(String),
    /// No usable inline content; sentinel string referencing the link.
    LinkOnly(String),
    /// Nothing usable and no link.
    Missing,
}

impl ResolvedText {
    /// The string to persist as the bill's full text, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Body(s) | Self::LinkOnly(s) => Some(s),
            Self::Missing => None,
        }
    }

    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Body(s) => Some(s),
            _ => None,
        }
    }
}

/// Whether a document MIME type can be reduced to text. A missing type is
/// given the benefit of the doubt; decoding still rejects binary content.
pub fn is_textual_mime(mime: Option<&str>) -> bool {
    let Some(mime) = mime.map(|m| m.trim().to_ascii_lowercase()) else {
        return true;
    };
    mime.is_empty() || mime.starts_with("text/") || mime.contains("html") || mime.contains("xml")
}

/// Populated content shapes of `text`, most preferred first.
///
/// `state_link` is listed ahead of `url` for the link fallback since it
/// points at the legislature's own copy. `doc` is skipped when its MIME type
/// is not textual.
pub fn sources(text: &BillText) -> Vec<TextSource<'_>> {
    fn non_empty(v: &Option<String>) -> Option<&str> {
        v.as_deref().filter(|s| !s.trim().is_empty())
    }

    let mut out = Vec::new();
    if let Some(s) = non_empty(&text.alt_bill_text) {
        out.push(TextSource::AltText(s));
    }
    if let Some(s) = non_empty(&text.text) {
        out.push(TextSource::Text(s));
    }
    if let Some(s) = non_empty(&text.doc).filter(|_| is_textual_mime(text.mime.as_deref())) {
        out.push(TextSource::Document(s));
    }
    if let Some(s) = non_empty(&text.alt_doc) {
        out.push(TextSource::AltDocument(s));
    }
    if let Some(s) = non_empty(&text.state_link).or_else(|| non_empty(&text.url)) {
        out.push(TextSource::Link(s));
    }
    out
}

impl TextSource<'_> {
    /// The resolved text for this source, or `None` if it is not viable.
    pub fn extract(&self) -> Option<ResolvedText> {
        match *self {
            Self::AltText(raw) | Self::Text(raw) => {
                let body = strip_nulls(&maybe_base64(raw)).trim().to_string();
                (body.chars().count() > MIN_TEXT_CHARS).then_some(ResolvedText::Body(body))
            }
            Self::Document(blob) | Self::AltDocument(blob) => decode_document(blob)
                .filter(|body| body.chars().count() >= MIN_DOCUMENT_CHARS)
                .map(ResolvedText::Body),
            Self::Link(link) => Some(ResolvedText::LinkOnly(format!(
                "{}{}",
                LINK_ONLY_PREFIX,
                link.trim()
            ))),
        }
    }
}

/// Resolve a payload into a single cleaned string or a link sentinel.
pub fn resolve_text(text: &BillText) -> ResolvedText {
    for source in sources(text) {
        if let Some(resolved) = source.extract() {
            return resolved;
        }
        tracing::debug!("Doc {}: {:?} not viable", text.doc_id, source_name(&source));
    }
    ResolvedText::Missing
}

fn source_name(source: &TextSource<'_>) -> &'static str {
    match source {
        TextSource::AltText(_) => "alt_bill_text",
        TextSource::Text(_) => "text",
        TextSource::Document(_) => "doc",
        TextSource::AltDocument(_) => "alt_doc",
        TextSource::Link(_) => "link",
    }
}

/// Strings without any whitespace are assumed to be base64; anything that
/// fails to decode into valid UTF-8 is kept as-is.
fn maybe_base64(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.chars().any(char::is_whitespace) {
        return trimmed.to_string();
    }
    STANDARD
        .decode(trimmed)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| trimmed.to_string())
}

/// Base64-decode a document blob and reduce it to plain text.
///
/// Blobs that do not decode to valid UTF-8 (PDFs, word processor files) yield `None`.
pub fn decode_document(blob: &str) -> Option<String> {
    let compact: String = blob.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD.decode(compact).ok()?;
    let raw = String::from_utf8(bytes).ok()?;
    Some(clean_markup(&raw))
}

fn block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>|<!--.*?-->")
            .expect("block pattern is valid")
    })
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<[^>]*>").expect("tag pattern is valid"))
}

/// Strip HTML tags and control bytes, decode common entities, collapse whitespace.
pub fn clean_markup(raw: &str) -> String {
    let without_blocks = block_re().replace_all(raw, " ");
    let without_tags = tag_re().replace_all(&without_blocks, " ");
    let decoded = without_tags
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    decoded
        .chars()
        .filter(|c| *c != '\0')
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Remove embedded NUL characters.
pub fn strip_nulls(input: &str) -> String {
    input.replace('\0', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(s: &str) -> String {
        STANDARD.encode(s.as_bytes())
    }

    fn long_sentence(n: usize) -> String {
        "The Legislature finds and declares the following. ".repeat(n)
    }

    fn payload() -> BillText {
        BillText {
            doc_id: 1,
            ..BillText::default()
        }
    }

    #[test]
    fn alt_text_wins_over_text() {
        let alt = long_sentence(4);
        let text = BillText {
            alt_bill_text: Some(alt.clone()),
            text: Some(long_sentence(10)),
            ..payload()
        };
        assert_eq!(resolve_text(&text), ResolvedText::Body(alt.trim().to_string()));
    }

    #[test]
    fn short_alt_text_falls_through_to_text() {
        let text = BillText {
            alt_bill_text: Some("too short".to_string()),
            text: Some(long_sentence(3)),
            ..payload()
        };
        assert_eq!(
            resolve_text(&text),
            ResolvedText::Body(long_sentence(3).trim().to_string())
        );
    }

    #[test]
    fn text_without_whitespace_is_base64_decoded() {
        let body = long_sentence(3);
        let text = BillText {
            text: Some(encode(&body)),
            ..payload()
        };
        assert_eq!(resolve_text(&text), ResolvedText::Body(body.trim().to_string()));
    }

    #[test]
    fn text_with_whitespace_is_used_as_is() {
        let body = format!("SECTION 1. {}", long_sentence(3));
        let text = BillText {
            text: Some(body.clone()),
            ..payload()
        };
        assert_eq!(resolve_text(&text), ResolvedText::Body(body.trim().to_string()));
    }

    #[test]
    fn undecodable_token_is_kept_verbatim() {
        let token = "not-base64!".repeat(15);
        assert_eq!(maybe_base64(&token), token);
    }

    #[test]
    fn doc_blob_is_decoded_and_cleaned() {
        let html = format!(
            "<html><head><style>p {{ color: red; }}</style></head><body>\0<p>{}</p>\
             <script>alert(1)</script><p>Fiscal&nbsp;note &amp; appendix</p></body></html>",
            long_sentence(12)
        );
        let text = BillText {
            doc: Some(encode(&html)),
            ..payload()
        };
        let ResolvedText::Body(body) = resolve_text(&text) else {
            panic!("expected body");
        };
        assert!(body.chars().count() >= MIN_DOCUMENT_CHARS);
        assert!(!body.contains('<'));
        assert!(!body.contains('\0'));
        assert!(!body.contains("color: red"));
        assert!(!body.contains("alert(1)"));
        assert!(!body.contains("  "));
        assert!(body.ends_with("Fiscal note & appendix"));
    }

    #[test]
    fn short_doc_falls_through_to_alt_doc() {
        let alt = format!("<p>{}</p>", long_sentence(12));
        let text = BillText {
            doc: Some(encode("<p>stub</p>")),
            alt_doc: Some(encode(&alt)),
            ..payload()
        };
        let resolved = resolve_text(&text);
        assert_eq!(resolved, ResolvedText::Body(clean_markup(&alt)));
    }

    #[test]
    fn wrapped_base64_doc_decodes() {
        let encoded = encode(&long_sentence(12));
        let wrapped: String = encoded
            .as_bytes()
            .chunks(76)
            .map(|c| std::str::from_utf8(c).unwrap())
            .collect::<Vec<_>>()
            .join("\n");
        assert!(decode_document(&wrapped).is_some());
    }

    fn pdf_like_bytes() -> Vec<u8> {
        let mut bytes = b"%PDF-1.4\n1 0 obj\n<< /Length 2000 >>\nstream\n".to_vec();
        bytes.extend((0..2000u32).map(|i| (i * 37 % 256) as u8));
        bytes.extend_from_slice(b"\nendstream\nendobj\n%%EOF");
        bytes
    }

    #[test]
    fn pdf_doc_falls_through_to_link() {
        let text = BillText {
            mime: Some("application/pdf".to_string()),
            doc: Some(STANDARD.encode(pdf_like_bytes())),
            url: Some("https://legiscan.com/CA/text/AB1".to_string()),
            ..payload()
        };
        assert_eq!(
            resolve_text(&text),
            ResolvedText::LinkOnly(
                "Full text available at: https://legiscan.com/CA/text/AB1".to_string()
            )
        );
    }

    #[test]
    fn binary_alt_doc_is_rejected() {
        assert!(decode_document(&STANDARD.encode(pdf_like_bytes())).is_none());
        let text = BillText {
            alt_doc: Some(STANDARD.encode(pdf_like_bytes())),
            ..payload()
        };
        assert_eq!(resolve_text(&text), ResolvedText::Missing);
    }

    #[test]
    fn html_mime_doc_is_decoded() {
        assert!(is_textual_mime(Some("text/html")));
        assert!(is_textual_mime(Some("application/xhtml+xml")));
        assert!(is_textual_mime(None));
        assert!(!is_textual_mime(Some("application/pdf")));
        let text = BillText {
            mime: Some("text/html".to_string()),
            doc: Some(encode(&format!("<p>{}</p>", long_sentence(12)))),
            ..payload()
        };
        assert!(resolve_text(&text).body().is_some());
    }

    #[test]
    fn link_sentinel_prefers_state_link() {
        let text = BillText {
            url: Some("https://legiscan.com/CA/text/AB1".to_string()),
            state_link: Some("https://leginfo.legislature.ca.gov/AB1".to_string()),
            ..payload()
        };
        assert_eq!(
            resolve_text(&text),
            ResolvedText::LinkOnly(
                "Full text available at: https://leginfo.legislature.ca.gov/AB1".to_string()
            )
        );
    }

    #[test]
    fn link_sentinel_used_when_content_not_viable() {
        let text = BillText {
            text: Some("short".to_string()),
            url: Some("https://legiscan.com/CA/text/AB1".to_string()),
            ..payload()
        };
        let resolved = resolve_text(&text);
        assert!(matches!(resolved, ResolvedText::LinkOnly(_)));
        assert!(resolved.body().is_none());
    }

    #[test]
    fn nothing_viable_is_missing() {
        let text = BillText {
            text: Some("short".to_string()),
            ..payload()
        };
        assert_eq!(resolve_text(&text), ResolvedText::Missing);
        assert_eq!(resolve_text(&payload()).as_str(), None);
    }

    #[test]
    fn sources_follow_preference_order() {
        let text = BillText {
            alt_doc: Some("ad".to_string()),
            doc: Some("d".to_string()),
            text: Some("t".to_string()),
            alt_bill_text: Some("a".to_string()),
            url: Some("u".to_string()),
            ..payload()
        };
        assert_eq!(
            sources(&text),
            vec![
                TextSource::AltText("a"),
                TextSource::Text("t"),
                TextSource::Document("d"),
                TextSource::AltDocument("ad"),
                TextSource::Link("u"),
            ]
        );
    }

    #[test]
    fn nulls_are_stripped_from_plain_text() {
        let body = format!("{}\0{}", long_sentence(2), long_sentence(1));
        let text = BillText {
            text: Some(body),
            ..payload()
        };
        let resolved = resolve_text(&text);
        assert!(!resolved.as_str().unwrap().contains('\0'));
    }
}
