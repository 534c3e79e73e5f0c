use thiserror::Error;

/// Top-level error type for Buddy.
#[derive(Debug, Error)]
pub enum BuddyError {
    /// A completion call failed (transport, HTTP status, or parse error).
    #[error("provider error: {0}")]
    Provider(String),

    /// The web-search routing call failed. Callers degrade to "no search".
    #[error("routing error: {0}")]
    Routing(String),

    /// The summarizer returned nothing but whitespace.
    #[error("empty summary")]
    EmptySummary,

    /// The transport refused the markup of an outgoing message.
    #[error("send rejected by transport: {0}")]
    SendRejected(String),

    /// Error from the messaging channel.
    #[error("channel error: {0}")]
    Channel(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Storage error.
    #[error("memory error: {0}")]
    Memory(String),

    /// Media retrieval or decoding error.
    #[error(transparent)]
    Media(#[from] MediaError),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failures while turning attachments into inline images.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("file too large ({size} bytes), limit is {limit} bytes")]
    TooLarge { size: usize, limit: usize },

    #[error("unsupported media type: {0}")]
    UnsupportedType(String),

    #[error("no supported media found")]
    NoSupportedMedia,

    #[error("video duration is invalid: {0:.4}")]
    InvalidDuration(f64),

    #[error("no video frames extracted")]
    NoFramesExtracted,

    #[error("failed to decode media: {0}")]
    Decode(String),

    #[error("failed to download media: {0}")]
    Download(String),

    /// External frame-extraction tool missing, failed, or timed out.
    #[error("frame extraction failed: {0}")]
    Tool(String),
}
