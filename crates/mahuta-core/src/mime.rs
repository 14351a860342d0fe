//! Content-type detection from leading bytes.
//!
//! Used when an indexing request carries no content type. Detection is
//! best-effort: `None` means "unknown" and never fails the request.

/// Number of leading bytes inspected.
pub const SNIFF_LEN: usize = 512;

const SIGNATURES: &[(&[u8], &str)] = &[
    (b"%PDF-", "application/pdf"),
    (b"\x89PNG\r\n\x1a\n", "image/png"),
    (b"\xff\xd8\xff", "image/jpeg"),
    (b"GIF87a", "image/gif"),
    (b"GIF89a", "image/gif"),
    (b"PK\x03\x04", "application/zip"),
    (b"\x1f\x8b", "application/gzip"),
    (b"%!PS", "application/postscript"),
    (b"ID3", "audio/mpeg"),
    (b"OggS", "audio/ogg"),
    (b"fLaC", "audio/flac"),
    (b"\x00asm", "application/wasm"),
];

/// Guess a MIME type from the first bytes of a payload.
pub fn sniff(head: &[u8]) -> Option<&'static str> {
    if head.is_empty() {
        return None;
    }
    if let Some((_, mime)) = SIGNATURES.iter().find(|(magic, _)| head.starts_with(magic)) {
        return Some(*mime);
    }
    if head.len() >= 12 && &head[0..4] == b"RIFF" && &head[8..12] == b"WEBP" {
        return Some("image/webp");
    }
    if head.len() >= 12 && &head[4..8] == b"ftyp" {
        return Some("video/mp4");
    }
    sniff_text(head)
}

fn sniff_text(head: &[u8]) -> Option<&'static str> {
    let sample = &head[..head.len().min(SNIFF_LEN)];
    let text = match std::str::from_utf8(sample) {
        Ok(t) => t,
        // A multi-byte character may straddle the sample boundary.
        Err(e) if e.error_len().is_none() => std::str::from_utf8(&sample[..e.valid_up_to()]).ok()?,
        Err(_) => return None,
    };
    if text.chars().any(|c| c.is_control() && !c.is_whitespace()) {
        return None;
    }
    let trimmed = text.trim_start().trim_start_matches('\u{feff}');
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("<?xml") {
        Some("application/xml")
    } else if lower.starts_with("<!doctype html") || lower.starts_with("<html") {
        Some("text/html")
    } else if trimmed.starts_with('{') || trimmed.starts_with('[') {
        Some("application/json")
    } else {
        Some("text/plain")
    }
}
