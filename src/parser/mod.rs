mod html;
mod passthrough;
mod pdf;

use std::collections::HashMap;

use crate::error::ScrapeError;

/// Decoded output of the Parser Chain: UTF-8 text plus whatever metadata the
/// winning parser could cheaply pull out along the way.
#[derive(Debug, Clone)]
pub struct ParsedContent {
    pub text: String,
    pub original_media_type: String,
    pub extra_metadata: HashMap<String, String>,
}

/// Run a fetched byte blob through the chain: PDF, then HTML, then
/// passthrough. The first parser whose predicate matches the (stripped)
/// media type wins; passthrough always matches as a last resort.
pub fn parse(bytes: &[u8], media_type: Option<&str>) -> Result<ParsedContent, ScrapeError> {
    let media_type = media_type.unwrap_or("application/octet-stream");
    let lower = media_type.to_ascii_lowercase();

    if lower.contains("pdf") {
        return pdf::parse(bytes, media_type);
    }
    if lower.contains("html") {
        return Ok(html::parse(bytes, media_type));
    }
    Ok(passthrough::parse(bytes, media_type))
}
