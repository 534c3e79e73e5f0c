//! Content-type detection from file bytes.

const GIF87A: &[u8] = b"GIF87a";
const GIF89A: &[u8] = b"GIF89a";
const EBML_MAGIC: &[u8] = &[0x1A, 0x45, 0xDF, 0xA3];

/// Guess a MIME type from the leading bytes.
pub fn sniff_mime(data: &[u8]) -> Option<&'static str> {
    if let Ok(format) = image::guess_format(data) {
        return Some(format.to_mime_type());
    }
    if data.len() >= 12 && &data[4..8] == b"ftyp" {
        return Some(if &data[8..10] == b"qt" {
            "video/quicktime"
        } else {
            "video/mp4"
        });
    }
    if data.starts_with(EBML_MAGIC) {
        return Some("video/webm");
    }
    None
}

/// GIF by signature or by a content type mentioning gif.
pub fn is_gif(data: &[u8], content_type: &str) -> bool {
    content_type.to_ascii_lowercase().contains("gif")
        || data.starts_with(GIF87A)
        || data.starts_with(GIF89A)
}
