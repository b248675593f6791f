use std::collections::HashMap;

use super::ParsedContent;

/// The identity parser: always matches, never fails. Input is treated as
/// UTF-8 text (lossy on invalid sequences rather than failing the scrape
/// over an encoding quirk).
pub fn parse(bytes: &[u8], media_type: &str) -> ParsedContent {
    let text = String::from_utf8_lossy(bytes).into_owned();
    let mut extra_metadata = HashMap::new();
    extra_metadata.insert("original_type".to_string(), media_type.to_string());

    ParsedContent {
        text,
        original_media_type: media_type.to_string(),
        extra_metadata,
    }
}
