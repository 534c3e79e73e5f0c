//! Attachments to inline `data:` URLs.

use crate::classify::{extract_media_items, MediaDescriptor};
use crate::frames::{extract_video_frames, FrameExtractor};
use crate::gif::gif_frames_to_png;
use crate::sniff::{is_gif, sniff_mime};
use base64::Engine;
use buddy_core::{
    config::MediaConfig,
    error::{BuddyError, MediaError},
    message::{DownloadedFile, IncomingMessage},
    traits::Channel,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Per-kind download ceilings, in bytes.
#[derive(Debug, Clone, Copy)]
pub struct MediaLimits {
    pub max_image_bytes: usize,
    pub max_video_bytes: usize,
}

impl From<&MediaConfig> for MediaLimits {
    fn from(cfg: &MediaConfig) -> Self {
        Self {
            max_image_bytes: cfg.max_image_bytes,
            max_video_bytes: cfg.max_video_bytes,
        }
    }
}

/// Downloads attachments and turns them into model-ready images.
pub struct Materializer {
    channel: Arc<dyn Channel>,
    extractor: Arc<dyn FrameExtractor>,
    limits: MediaLimits,
}

impl Materializer {
    pub fn new(
        channel: Arc<dyn Channel>,
        extractor: Arc<dyn FrameExtractor>,
        limits: MediaLimits,
    ) -> Self {
        Self {
            channel,
            extractor,
            limits,
        }
    }

    /// Every attachment of `messages`, in order, as `data:` URLs.
    ///
    /// The first failing attachment aborts the batch.
    pub async fn download_as_data_urls(
        &self,
        messages: &[IncomingMessage],
    ) -> Result<Vec<String>, MediaError> {
        let mut urls = Vec::new();
        for msg in messages {
            for item in extract_media_items(msg) {
                urls.extend(self.materialize_item(&item).await?);
            }
        }
        if urls.is_empty() {
            return Err(MediaError::NoSupportedMedia);
        }
        info!(
            "materialized {} image(s) from {} message(s)",
            urls.len(),
            messages.len()
        );
        Ok(urls)
    }

    async fn materialize_item(&self, item: &MediaDescriptor) -> Result<Vec<String>, MediaError> {
        let video = item.is_video();
        let limit = if video {
            self.limits.max_video_bytes
        } else {
            self.limits.max_image_bytes
        };

        let file = self.download(&item.file_id, limit).await?;
        debug!(
            "downloaded {:?} {} ({} bytes)",
            item.kind,
            item.file_id,
            file.bytes.len()
        );

        if !video && !served_as_video(&file) {
            return file_to_data_urls(file, item.mime_type.as_deref()).await;
        }

        match extract_video_frames(self.extractor.as_ref(), &file.bytes).await {
            Ok(frames) => Ok(frames
                .iter()
                .map(|png| to_data_url(png, "image/png"))
                .collect()),
            Err(e) => {
                let Some(fallback_id) = item.fallback_file_id.as_deref() else {
                    return Err(e);
                };
                warn!("video frames failed ({e}), using thumbnail");
                match self.download(fallback_id, self.limits.max_image_bytes).await {
                    Ok(thumb) => file_to_data_urls(thumb, None).await,
                    Err(fallback_err) => {
                        warn!("thumbnail download failed: {fallback_err}");
                        Err(e)
                    }
                }
            }
        }
    }

    async fn download(&self, file_id: &str, limit: usize) -> Result<DownloadedFile, MediaError> {
        self.channel
            .download_file(file_id, limit)
            .await
            .map_err(|e| match e {
                BuddyError::Media(m) => m,
                other => MediaError::Download(other.to_string()),
            })
    }
}

/// Whether the server header, or failing that the bytes, say video.
fn served_as_video(file: &DownloadedFile) -> bool {
    file.content_type
        .as_deref()
        .or_else(|| sniff_mime(&file.bytes))
        .is_some_and(|t| t.starts_with("video/"))
}

/// Resolve the content type and emit one or more images.
///
/// Order: server header, byte sniffing, then the sender's declared type.
async fn file_to_data_urls(
    file: DownloadedFile,
    declared: Option<&str>,
) -> Result<Vec<String>, MediaError> {
    let sniffed = sniff_mime(&file.bytes);
    let content_type = file
        .content_type
        .as_deref()
        .or(sniffed)
        .or(declared)
        .unwrap_or_default()
        .to_ascii_lowercase();

    if is_gif(&file.bytes, &content_type) || sniffed == Some("image/gif") {
        let data = file.bytes;
        let frames = tokio::task::spawn_blocking(move || gif_frames_to_png(&data))
            .await
            .map_err(|e| MediaError::Decode(format!("gif decode task failed: {e}")))??;
        return Ok(frames
            .iter()
            .map(|png| to_data_url(png, "image/png"))
            .collect());
    }

    if content_type.starts_with("image/") {
        return Ok(vec![to_data_url(&file.bytes, &content_type)]);
    }
    if let Some(mime) = sniffed.filter(|m| m.starts_with("image/")) {
        return Ok(vec![to_data_url(&file.bytes, mime)]);
    }

    Err(MediaError::UnsupportedType(if content_type.is_empty() {
        "unknown".into()
    } else {
        content_type
    }))
}

fn to_data_url(data: &[u8], mime: &str) -> String {
    let b64 = base64::engine::general_purpose::STANDARD.encode(data);
    format!("data:{mime};base64,{b64}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        gif_bytes, message, photo, png_bytes, FileServer, ScriptedExtractor,
    };
    use buddy_core::message::{Animation, Document};

    const LIMITS: MediaLimits = MediaLimits {
        max_image_bytes: 2 * 1024 * 1024,
        max_video_bytes: 10 * 1024 * 1024,
    };

    fn materializer(server: FileServer, extractor: ScriptedExtractor) -> Materializer {
        Materializer::new(Arc::new(server), Arc::new(extractor), LIMITS)
    }

    fn photo_message(id: i64, file_id: &str) -> IncomingMessage {
        let mut msg = message(id);
        msg.photo = vec![photo(file_id)];
        msg
    }

    fn animation_message(thumb: Option<&str>) -> IncomingMessage {
        let mut msg = message(1);
        msg.animation = Some(Animation {
            file_id: "anim".into(),
            mime_type: Some("video/mp4".into()),
            file_name: Some("a.mp4".into()),
            thumbnail: thumb.map(photo),
        });
        msg
    }

    #[tokio::test]
    async fn test_photo_uses_header_content_type() {
        let server = FileServer::new().with("p1", png_bytes(), Some("image/png"));
        let m = materializer(server, ScriptedExtractor::new(Ok(1.0)));
        let urls = m
            .download_as_data_urls(&[photo_message(1, "p1")])
            .await
            .unwrap();
        assert_eq!(urls.len(), 1);
        assert!(urls[0].starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn test_missing_header_falls_back_to_sniffing() {
        let server = FileServer::new().with("p1", png_bytes(), None);
        let m = materializer(server, ScriptedExtractor::new(Ok(1.0)));
        let urls = m
            .download_as_data_urls(&[photo_message(1, "p1")])
            .await
            .unwrap();
        assert!(urls[0].starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn test_album_order_preserved() {
        let server = FileServer::new()
            .with("a", png_bytes(), Some("image/png"))
            .with("b", vec![0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3], Some("image/jpeg"));
        let m = materializer(server, ScriptedExtractor::new(Ok(1.0)));
        let urls = m
            .download_as_data_urls(&[photo_message(1, "a"), photo_message(2, "b")])
            .await
            .unwrap();
        assert_eq!(urls.len(), 2);
        assert!(urls[0].starts_with("data:image/png"));
        assert!(urls[1].starts_with("data:image/jpeg"));
    }

    #[tokio::test]
    async fn test_gif_document_sampled_into_three_pngs() {
        let server = FileServer::new().with("g", gif_bytes(6), None);
        let mut msg = message(1);
        msg.document = Some(Document {
            file_id: "g".into(),
            mime_type: None,
            file_name: Some("fun.gif".into()),
        });
        let m = materializer(server, ScriptedExtractor::new(Ok(1.0)));
        let urls = m.download_as_data_urls(&[msg]).await.unwrap();
        assert_eq!(urls.len(), 3);
        assert!(urls.iter().all(|u| u.starts_with("data:image/png;base64,")));
    }

    #[tokio::test]
    async fn test_oversized_photo_aborts_batch() {
        let server = FileServer::new()
            .with("ok", png_bytes(), Some("image/png"))
            .with("big", vec![0u8; LIMITS.max_image_bytes + 1], Some("image/png"));
        let m = materializer(server, ScriptedExtractor::new(Ok(1.0)));
        let err = m
            .download_as_data_urls(&[photo_message(1, "ok"), photo_message(2, "big")])
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::TooLarge { .. }));
    }

    #[tokio::test]
    async fn test_video_gets_larger_ceiling() {
        let server = FileServer::new().with(
            "anim",
            vec![0u8; LIMITS.max_image_bytes + 1],
            Some("video/mp4"),
        );
        let m = materializer(server, ScriptedExtractor::new(Ok(4.0)));
        let urls = m
            .download_as_data_urls(&[animation_message(None)])
            .await
            .unwrap();
        assert_eq!(urls.len(), 3);
    }

    #[tokio::test]
    async fn test_video_failure_uses_thumbnail() {
        let server = FileServer::new()
            .with("anim", b"not a video".to_vec(), Some("video/mp4"))
            .with("thumb", png_bytes(), Some("image/png"));
        let m = materializer(server, ScriptedExtractor::new(Err(())));
        let urls = m
            .download_as_data_urls(&[animation_message(Some("thumb"))])
            .await
            .unwrap();
        assert_eq!(urls.len(), 1);
        assert!(urls[0].starts_with("data:image/png"));
    }

    #[tokio::test]
    async fn test_video_failure_without_thumbnail_propagates() {
        let server = FileServer::new().with("anim", b"x".to_vec(), Some("video/mp4"));
        let m = materializer(server, ScriptedExtractor::new(Ok(-1.0)));
        let err = m
            .download_as_data_urls(&[animation_message(None)])
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::InvalidDuration(_)));
    }

    #[tokio::test]
    async fn test_document_served_as_video_gets_frames() {
        let server = FileServer::new().with("clip", b"\x00\x00\x00\x18ftypmp42".to_vec(), None);
        let mut msg = message(1);
        msg.document = Some(Document {
            file_id: "clip".into(),
            mime_type: Some("image/png".into()),
            file_name: Some("clip.png".into()),
        });
        let m = materializer(server, ScriptedExtractor::new(Ok(4.0)));
        let urls = m.download_as_data_urls(&[msg]).await.unwrap();
        assert_eq!(urls.len(), 3);
        assert!(urls.iter().all(|u| u.starts_with("data:image/png;base64,")));
    }

    #[tokio::test]
    async fn test_unsupported_type() {
        let server = FileServer::new().with("p", b"%PDF-1.7".to_vec(), Some("application/pdf"));
        let m = materializer(server, ScriptedExtractor::new(Ok(1.0)));
        let err = m
            .download_as_data_urls(&[photo_message(1, "p")])
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::UnsupportedType(t) if t == "application/pdf"));
    }

    #[tokio::test]
    async fn test_no_media_at_all() {
        let m = materializer(FileServer::new(), ScriptedExtractor::new(Ok(1.0)));
        let err = m.download_as_data_urls(&[message(1)]).await.unwrap_err();
        assert!(matches!(err, MediaError::NoSupportedMedia));
    }

    #[tokio::test]
    async fn test_download_failure_mapped() {
        let m = materializer(FileServer::new(), ScriptedExtractor::new(Ok(1.0)));
        let err = m
            .download_as_data_urls(&[photo_message(1, "missing")])
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::Download(_)));
    }
}
