//! Content-type detection from raw file bytes.

/// Fallback content type for unrecognised binary data.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Content type reported for zero-length files.
pub const EMPTY: &str = "application/x-empty";

/// Number of leading bytes inspected by the text heuristics.
const TEXT_SAMPLE_LEN: usize = 8 * 1024;

/// Determines a content type from a file's bytes.
pub trait ContentSniffer: Send + Sync {
    fn sniff(&self, bytes: &[u8]) -> String;
}

/// Magic-number and text-heuristic sniffer.
#[derive(Debug, Clone, Copy, Default)]
pub struct MagicSniffer;

/// Known binary signatures, checked in order.
const SIGNATURES: &[(&[u8], &str)] = &[
    (&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A], "image/png"),
    (&[0xFF, 0xD8, 0xFF], "image/jpeg"),
    (b"GIF87a", "image/gif"),
    (b"GIF89a", "image/gif"),
    (b"%PDF-", "application/pdf"),
    (&[b'P', b'K', 0x03, 0x04], "application/zip"),
    (&[0x1F, 0x8B], "application/gzip"),
];

impl ContentSniffer for MagicSniffer {
    fn sniff(&self, bytes: &[u8]) -> String {
        if bytes.is_empty() {
            return EMPTY.into();
        }

        for (magic, mime) in SIGNATURES {
            if bytes.starts_with(magic) {
                return (*mime).into();
            }
        }

        // RIFF....WEBP
        if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            return "image/webp".into();
        }

        match leading_text(bytes) {
            Some(text) => classify_text(text).into(),
            None => OCTET_STREAM.into(),
        }
    }
}

/// The leading text of `bytes` if it looks like UTF-8 text.
fn leading_text(bytes: &[u8]) -> Option<&str> {
    let sample = &bytes[..bytes.len().min(TEXT_SAMPLE_LEN)];
    if sample.contains(&0) {
        return None;
    }
    let valid = match std::str::from_utf8(sample) {
        Ok(text) => text,
        // A multi-byte character cut by the sample boundary is still text.
        Err(e) if e.error_len().is_none() && bytes.len() > TEXT_SAMPLE_LEN => {
            std::str::from_utf8(&sample[..e.valid_up_to()]).ok()?
        }
        Err(_) => return None,
    };

    let control = valid
        .chars()
        .filter(|c| c.is_control() && !matches!(*c, '\n' | '\r' | '\t' | '\x0C'))
        .count();
    if control * 20 > valid.chars().count() {
        return None;
    }
    Some(valid.trim_start_matches('\u{FEFF}'))
}

fn classify_text(text: &str) -> &'static str {
    let head = text.trim_start();
    let lower: String = head.chars().take(64).collect::<String>().to_ascii_lowercase();

    if lower.starts_with("<!doctype html") || lower.starts_with("<html") {
        "text/html"
    } else if lower.starts_with("<?xml") {
        "text/xml"
    } else if looks_like_json(head) {
        "application/json"
    } else {
        "text/plain"
    }
}

/// Cheap structural check: balanced outer brackets after trimming.
fn looks_like_json(text: &str) -> bool {
    let trimmed = text.trim_end();
    (trimmed.starts_with('{') && trimmed.ends_with('}'))
        || (trimmed.starts_with('[') && trimmed.ends_with(']'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sniff(bytes: &[u8]) -> String {
        MagicSniffer.sniff(bytes)
    }

    #[test]
    fn plain_text() {
        assert_eq!(sniff(b"Paris is the capital of France.\n"), "text/plain");
        assert_eq!(sniff("Zürich liegt am See.".as_bytes()), "text/plain");
    }

    #[test]
    fn markup_and_json() {
        assert_eq!(sniff(b"<!DOCTYPE html><html></html>"), "text/html");
        assert_eq!(sniff(b"  <?xml version=\"1.0\"?><a/>"), "text/xml");
        assert_eq!(sniff(b"{\"a\": 1}\n"), "application/json");
        assert_eq!(sniff(b"{ not closed"), "text/plain");
    }

    #[test]
    fn binary_signatures() {
        assert_eq!(
            sniff(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0]),
            "image/png"
        );
        assert_eq!(sniff(&[0xFF, 0xD8, 0xFF, 0xE0]), "image/jpeg");
        assert_eq!(sniff(b"%PDF-1.7\n"), "application/pdf");
        assert_eq!(sniff(b"RIFF\x10\x00\x00\x00WEBPVP8 "), "image/webp");
    }

    #[test]
    fn unknown_binary_and_empty() {
        assert_eq!(sniff(&[0x00, 0x01, 0x02, 0xFE]), OCTET_STREAM);
        assert_eq!(sniff(&[0xC3, 0x28, 0x41]), OCTET_STREAM);
        assert_eq!(sniff(b""), EMPTY);
    }

    #[test]
    fn truncated_multibyte_at_sample_boundary_is_text() {
        let mut bytes = vec![b'a'; TEXT_SAMPLE_LEN - 1];
        bytes.extend_from_slice("é".as_bytes());
        assert_eq!(sniff(&bytes), "text/plain");
    }

    #[test]
    fn truncated_multibyte_at_end_of_short_file_is_binary() {
        assert_eq!(sniff(&[0xE2, 0x82]), OCTET_STREAM);
        assert_eq!(sniff(b"caf\xC3"), OCTET_STREAM);
    }
}
