//! `multipart/related` bodies for single-request uploads.
//!
//! Layout: a JSON metadata part followed by the raw media part, each opened
//! by `--boundary` and the whole body closed by `--boundary--`.

/// `Content-Type` header value for a body built with `boundary`.
pub fn content_type(boundary: &str) -> String {
    format!("multipart/related; boundary={}", boundary)
}

/// A boundary that is unique per request.
pub fn new_boundary() -> String {
    format!("carebook-{}", uuid::Uuid::new_v4().simple())
}

/// Encode metadata and media into one `multipart/related` body.
pub fn encode(metadata_json: &[u8], media_type: &str, media: &[u8], boundary: &str) -> Vec<u8> {
    let mut body = Vec::with_capacity(metadata_json.len() + media.len() + 4 * boundary.len() + 128);

    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata_json);
    body.extend_from_slice(b"\r\n");

    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", media_type).as_bytes());
    body.extend_from_slice(media);
    body.extend_from_slice(b"\r\n");

    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_layout() {
        let body = encode(br#"{"name":"a.png"}"#, "image/png", b"\x89PNG", "B0");
        let expected: &[u8] = b"--B0\r\n\
Content-Type: application/json; charset=UTF-8\r\n\r\n\
{\"name\":\"a.png\"}\r\n\
--B0\r\n\
Content-Type: image/png\r\n\r\n\
\x89PNG\r\n\
--B0--\r\n";
        assert_eq!(body, expected);
    }

    #[test]
    fn test_binary_media_is_untouched() {
        let media: Vec<u8> = (0u8..=255).collect();
        let body = encode(b"{}", "application/octet-stream", &media, "xyz");
        assert!(body.windows(media.len()).any(|w| w == media.as_slice()));
    }

    #[test]
    fn test_boundaries_are_unique() {
        let a = new_boundary();
        let b = new_boundary();
        assert_ne!(a, b);
        assert_eq!(content_type(&a), format!("multipart/related; boundary={}", a));
    }
}
