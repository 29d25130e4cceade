//! Media-type helpers for response-shape detection.

/// Text-bearing MIME prefixes and exact types. Anything else is treated as a
/// binary attachment.
const TEXTUAL_TYPES: &[&str] = &[
    "application/json",
    "application/problem+json",
    "application/xml",
    "application/x-www-form-urlencoded",
    "application/javascript",
];

/// Whether a content type denotes binary file data rather than a textual
/// payload. The parameter part (`; charset=...`) is ignored.
#[must_use]
pub fn is_binary(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    if essence.is_empty() || essence.starts_with("text/") {
        return false;
    }
    if TEXTUAL_TYPES.contains(&essence.as_str()) || essence.ends_with("+json") || essence.ends_with("+xml") {
        return false;
    }
    true
}

/// Extracts the file name from a `content-disposition` header value, if the
/// header marks the body as an attachment.
#[must_use]
pub fn attachment_file_name(disposition: &str) -> Option<String> {
    let lower = disposition.to_ascii_lowercase();
    if !lower.contains("attachment") {
        return None;
    }
    for part in disposition.split(';') {
        let part = part.trim();
        if let Some(raw) = part.strip_prefix("filename=") {
            let name = raw.trim_matches('"').trim();
            if !name.is_empty() {
                return Some(name.to_string());
            }
        }
    }
    // An attachment without a usable name is still an attachment.
    Some(String::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_and_text_types_are_not_binary() {
        assert!(!is_binary("application/json"));
        assert!(!is_binary("application/json; charset=utf-8"));
        assert!(!is_binary("text/html"));
        assert!(!is_binary("text/plain; charset=utf-8"));
        assert!(!is_binary("application/hal+json"));
        assert!(!is_binary(""));
    }

    #[test]
    fn pdf_and_octet_stream_are_binary() {
        assert!(is_binary("application/pdf"));
        assert!(is_binary("application/octet-stream"));
        assert!(is_binary("image/png"));
        assert!(is_binary("application/zip; name=archive.zip"));
    }

    #[test]
    fn attachment_disposition_yields_file_name() {
        assert_eq!(
            attachment_file_name(r#"attachment; filename="report.pdf""#),
            Some("report.pdf".to_string())
        );
        assert_eq!(
            attachment_file_name("attachment"),
            Some(String::new())
        );
        assert_eq!(attachment_file_name("inline"), None);
    }
}
