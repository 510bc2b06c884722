//! Image signature sniffing.

/// MIME type recognised from the leading bytes of an encoded image.
pub fn sniff(bytes: &[u8]) -> Option<&'static str> {
    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n";
    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF];
    const KTX2: &[u8] = b"\xABKTX 20\xBB\r\n\x1a\n";

    if bytes.starts_with(PNG) {
        Some("image/png")
    } else if bytes.starts_with(JPEG) {
        Some("image/jpeg")
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else if bytes.starts_with(KTX2) {
        Some("image/ktx2")
    } else {
        None
    }
}

/// File extension for a MIME type, `bin` when unknown.
pub fn extension(mime_type: &str) -> &'static str {
    match mime_type {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        "image/ktx2" => "ktx2",
        _ => "bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_signatures() {
        assert_eq!(sniff(b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR"), Some("image/png"));
        assert_eq!(sniff(&[0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10]), Some("image/jpeg"));
        assert_eq!(sniff(b"RIFF\x24\0\0\0WEBPVP8 "), Some("image/webp"));
        assert_eq!(sniff(b"\xABKTX 20\xBB\r\n\x1a\n\0\0"), Some("image/ktx2"));
    }

    #[test]
    fn test_sniff_rejects_short_or_unknown() {
        assert_eq!(sniff(b""), None);
        assert_eq!(sniff(b"RIFF\0\0\0\0"), None);
        assert_eq!(sniff(b"GIF89a"), None);
    }

    #[test]
    fn test_extension() {
        assert_eq!(extension("image/jpeg"), "jpg");
        assert_eq!(extension("image/gif"), "bin");
    }
}
