//! Which attachments the bot can show to the model.

use buddy_core::message::IncomingMessage;

/// Container extensions treated as video when the MIME type is missing.
const VIDEO_EXTENSIONS: &[&str] = &[".mp4", ".webm", ".mov", ".mkv", ".avi"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Photo,
    Sticker,
    Animation,
    Document,
}

/// One downloadable attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaDescriptor {
    pub file_id: String,
    /// MIME type declared by the sender.
    pub mime_type: Option<String>,
    pub file_name: Option<String>,
    pub kind: MediaKind,
    /// Still preview to use when frames cannot be extracted.
    pub fallback_file_id: Option<String>,
}

impl MediaDescriptor {
    fn new(file_id: &str, kind: MediaKind) -> Self {
        Self {
            file_id: file_id.to_string(),
            mime_type: None,
            file_name: None,
            kind,
            fallback_file_id: None,
        }
    }

    /// Animations and anything declared as a video container.
    pub fn is_video(&self) -> bool {
        self.kind == MediaKind::Animation
            || is_video_by_meta(self.mime_type.as_deref(), self.file_name.as_deref())
    }
}

/// `video/*` MIME type, or a known container extension.
pub fn is_video_by_meta(mime_type: Option<&str>, file_name: Option<&str>) -> bool {
    if mime_type.is_some_and(|m| m.to_ascii_lowercase().starts_with("video/")) {
        return true;
    }
    file_name.is_some_and(|name| {
        let name = name.to_ascii_lowercase();
        VIDEO_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
    })
}

/// Whether the message carries an attachment the bot can materialize.
pub fn has_supported_media(msg: &IncomingMessage) -> bool {
    !extract_media_items(msg).is_empty()
}

/// The attachments of one message, in the order they should be sent.
///
/// Checks photo, sticker, animation and document in that order and takes
/// the first present. Never fails: unsupported input yields nothing.
pub fn extract_media_items(msg: &IncomingMessage) -> Vec<MediaDescriptor> {
    // Variants come in ascending resolution.
    if let Some(photo) = msg.photo.last() {
        return vec![MediaDescriptor::new(&photo.file_id, MediaKind::Photo)];
    }

    if let Some(sticker) = &msg.sticker {
        if sticker.is_animated {
            return Vec::new();
        }
        let mut item = MediaDescriptor::new(&sticker.file_id, MediaKind::Sticker);
        if sticker.is_video {
            item.mime_type = Some("video/webm".into());
        }
        return vec![item];
    }

    if let Some(animation) = &msg.animation {
        return vec![MediaDescriptor {
            file_id: animation.file_id.clone(),
            mime_type: animation.mime_type.clone(),
            file_name: animation.file_name.clone(),
            kind: MediaKind::Animation,
            fallback_file_id: animation.thumbnail.as_ref().map(|t| t.file_id.clone()),
        }];
    }

    if let Some(doc) = &msg.document {
        let is_image = doc
            .mime_type
            .as_deref()
            .is_some_and(|m| m.to_ascii_lowercase().starts_with("image/"));
        let is_gif_name = doc
            .file_name
            .as_deref()
            .is_some_and(|n| n.to_ascii_lowercase().ends_with(".gif"));
        if is_image || is_gif_name {
            return vec![MediaDescriptor {
                file_id: doc.file_id.clone(),
                mime_type: doc.mime_type.clone(),
                file_name: doc.file_name.clone(),
                kind: MediaKind::Document,
                fallback_file_id: None,
            }];
        }
    }

    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{message, photo};
    use buddy_core::message::{Animation, Document, Sticker};

    #[test]
    fn test_photo_takes_largest_variant() {
        let mut msg = message(1);
        msg.photo = vec![photo("s"), photo("m"), photo("l")];
        let items = extract_media_items(&msg);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].file_id, "l");
        assert_eq!(items[0].kind, MediaKind::Photo);
        assert!(has_supported_media(&msg));
    }

    #[test]
    fn test_animated_sticker_skipped() {
        let mut msg = message(1);
        msg.sticker = Some(Sticker {
            file_id: "st".into(),
            is_animated: true,
            is_video: false,
        });
        assert!(!has_supported_media(&msg));
        assert!(extract_media_items(&msg).is_empty());
    }

    #[test]
    fn test_video_sticker_goes_through_frames() {
        let mut msg = message(1);
        msg.sticker = Some(Sticker {
            file_id: "vs".into(),
            is_animated: false,
            is_video: true,
        });
        let items = extract_media_items(&msg);
        assert_eq!(items[0].kind, MediaKind::Sticker);
        assert!(items[0].is_video());
    }

    #[test]
    fn test_animation_records_thumbnail() {
        let mut msg = message(1);
        msg.animation = Some(Animation {
            file_id: "an".into(),
            mime_type: Some("video/mp4".into()),
            file_name: Some("a.mp4".into()),
            thumbnail: Some(photo("thumb")),
        });
        let items = extract_media_items(&msg);
        assert_eq!(items[0].fallback_file_id.as_deref(), Some("thumb"));
        assert!(items[0].is_video());
    }

    #[test]
    fn test_documents() {
        let mut msg = message(1);
        msg.document = Some(Document {
            file_id: "d".into(),
            mime_type: Some("application/pdf".into()),
            file_name: Some("report.pdf".into()),
        });
        assert!(!has_supported_media(&msg));

        msg.document = Some(Document {
            file_id: "d".into(),
            mime_type: None,
            file_name: Some("FUNNY.GIF".into()),
        });
        assert!(has_supported_media(&msg));

        msg.document = Some(Document {
            file_id: "d".into(),
            mime_type: Some("Image/PNG".into()),
            file_name: None,
        });
        let items = extract_media_items(&msg);
        assert_eq!(items[0].kind, MediaKind::Document);
        assert!(!items[0].is_video());
    }

    #[test]
    fn test_text_only_has_no_media() {
        let msg = message(1);
        assert!(!has_supported_media(&msg));
        assert!(extract_media_items(&msg).is_empty());
    }

    #[test]
    fn test_video_by_meta() {
        assert!(is_video_by_meta(Some("VIDEO/quicktime"), None));
        assert!(is_video_by_meta(None, Some("clip.MKV")));
        assert!(!is_video_by_meta(Some("image/gif"), Some("x.gif")));
        assert!(!is_video_by_meta(None, None));
    }
}
