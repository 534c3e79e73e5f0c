//! Fixtures shared by the unit tests of this crate.

use crate::frames::FrameExtractor;
use async_trait::async_trait;
use buddy_core::{
    error::{BuddyError, MediaError},
    message::{
        BotIdentity, Chat, ChatKind, ChatMember, DownloadedFile, IncomingMessage, OutgoingMessage,
        PhotoSize, SentMessage,
    },
    traits::Channel,
};
use image::codecs::gif::GifEncoder;
use image::{DynamicImage, Frame, ImageFormat, Rgba, RgbaImage};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub fn message(id: i64) -> IncomingMessage {
    IncomingMessage {
        message_id: id,
        chat: Chat {
            id: -100,
            kind: ChatKind::Supergroup,
        },
        from: None,
        text: None,
        caption: None,
        date: chrono::Utc::now(),
        photo: Vec::new(),
        sticker: None,
        animation: None,
        document: None,
        media_group_id: None,
        reply_to: None,
    }
}

pub fn photo(file_id: &str) -> PhotoSize {
    PhotoSize {
        file_id: file_id.to_string(),
        width: 64,
        height: 64,
        file_size: None,
    }
}

pub fn png_bytes() -> Vec<u8> {
    let img = RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 255]));
    let mut out = Vec::new();
    DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .unwrap();
    out
}

/// An animated GIF with `frames` solid-colour frames.
pub fn gif_bytes(frames: u8) -> Vec<u8> {
    let mut out = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut out);
        let frames = (0..frames)
            .map(|i| Frame::new(RgbaImage::from_pixel(4, 4, Rgba([i * 20, 0, 0, 255]))));
        encoder.encode_frames(frames).unwrap();
    }
    out
}

/// Channel double that serves files from memory and enforces `max_bytes`.
#[derive(Default)]
pub struct FileServer {
    files: HashMap<String, DownloadedFile>,
}

impl FileServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, file_id: &str, bytes: Vec<u8>, content_type: Option<&str>) -> Self {
        self.files.insert(
            file_id.to_string(),
            DownloadedFile {
                bytes,
                content_type: content_type.map(String::from),
            },
        );
        self
    }
}

#[async_trait]
impl Channel for FileServer {
    fn name(&self) -> &str {
        "files"
    }

    async fn me(&self) -> Result<BotIdentity, BuddyError> {
        Err(BuddyError::Channel("not a bot".into()))
    }

    async fn start(&self) -> Result<tokio::sync::mpsc::Receiver<IncomingMessage>, BuddyError> {
        Err(BuddyError::Channel("not a bot".into()))
    }

    async fn send(&self, _message: OutgoingMessage) -> Result<SentMessage, BuddyError> {
        Err(BuddyError::Channel("not a bot".into()))
    }

    async fn download_file(
        &self,
        file_id: &str,
        max_bytes: usize,
    ) -> Result<DownloadedFile, BuddyError> {
        let file = self
            .files
            .get(file_id)
            .ok_or_else(|| BuddyError::Channel(format!("no such file {file_id}")))?;
        if file.bytes.len() > max_bytes {
            return Err(MediaError::TooLarge {
                size: file.bytes.len(),
                limit: max_bytes,
            }
            .into());
        }
        Ok(file.clone())
    }

    async fn chat_member(&self, _chat_id: i64, _user_id: i64) -> Result<ChatMember, BuddyError> {
        Err(BuddyError::Channel("not a bot".into()))
    }

    async fn leave_chat(&self, _chat_id: i64) -> Result<(), BuddyError> {
        Ok(())
    }

    async fn stop(&self) -> Result<(), BuddyError> {
        Ok(())
    }
}

/// Frame extractor with a fixed duration and a set of failing timestamps.
/// Records every file it is handed, with the bytes found there.
pub struct ScriptedExtractor {
    duration: Result<f64, ()>,
    failing: Vec<f64>,
    seen: Mutex<Vec<(PathBuf, Vec<u8>)>>,
}

impl ScriptedExtractor {
    /// `Err(())` makes every duration lookup fail.
    pub fn new(duration: Result<f64, ()>) -> Self {
        Self {
            duration,
            failing: Vec::new(),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_at(mut self, timestamps: &[f64]) -> Self {
        self.failing = timestamps.to_vec();
        self
    }

    pub fn seen(&self) -> Vec<(PathBuf, Vec<u8>)> {
        self.seen.lock().unwrap().clone()
    }

    fn record(&self, video: &Path) {
        let bytes = std::fs::read(video).unwrap_or_default();
        self.seen.lock().unwrap().push((video.to_path_buf(), bytes));
    }
}

#[async_trait]
impl FrameExtractor for ScriptedExtractor {
    async fn probe_duration(&self, video: &Path) -> Result<f64, MediaError> {
        self.record(video);
        self.duration
            .map_err(|_| MediaError::Tool("ffprobe exited with 1".into()))
    }

    async fn extract_frame(&self, video: &Path, timestamp: f64) -> Result<Vec<u8>, MediaError> {
        self.record(video);
        if self.failing.iter().any(|t| (t - timestamp).abs() < 1e-6) {
            return Err(MediaError::Tool("ffmpeg exited with 1".into()));
        }
        Ok(png_bytes())
    }
}
