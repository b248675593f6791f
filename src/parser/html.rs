use std::collections::HashMap;

use select::document::Document;
use select::predicate::Name;

use super::ParsedContent;

/// Decodes HTML as UTF-8 (falling back to Latin-1 on decode failure) and
/// returns it verbatim — this engine deliberately does not strip tags in the
/// core; downstream extraction handles semantic distillation. Only the
/// `<title>` is pulled out as metadata, since it's cheap and commonly useful
/// for the annotation/resource-link name.
pub fn parse(bytes: &[u8], media_type: &str) -> ParsedContent {
    let text = decode(bytes);
    let mut extra_metadata = HashMap::new();

    if let Some(title) = extract_title(&text) {
        extra_metadata.insert("title".to_string(), title);
    }

    ParsedContent {
        text,
        original_media_type: media_type.to_string(),
        extra_metadata,
    }
}

fn decode(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

fn extract_title(html: &str) -> Option<String> {
    let document = Document::from(html);
    document
        .find(Name("title"))
        .next()
        .map(|node| node.text().trim().to_string())
        .filter(|t| !t.is_empty())
}
