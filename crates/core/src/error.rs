/// Result alias that carries the custom [`TourError`] type.
pub type Result<T> = std::result::Result<T, TourError>;

/// Common error type for the core crate.
///
/// None of these are fatal: the component that reported one stays in the
/// state it was in before the failing call and the call can be retried.
#[derive(Debug, thiserror::Error)]
pub enum TourError {
    /// Free-form message for conditions that do not warrant their own variant.
    #[error("{0}")]
    Message(String),
    /// A caller passed a value the operation cannot work with.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    #[error("no audio URL to load")]
    MissingAudioUrl,
    #[error("audio is already loading or loaded")]
    AudioAlreadyLoaded,
    #[error("a timeline is already loading")]
    TimelineAlreadyLoaded,
    #[error("operation is not allowed once playback has started")]
    AlreadyStarted,
    #[error("a timeline event handler must be set before adding events")]
    MissingEventHandler,
    #[error("seek and play controls must be assigned before start")]
    ControlsUnassigned,
    #[error("tour has not been built")]
    NotBuilt,
    /// The asset could not be found at the given URL.
    #[error("asset not found: {0}")]
    AssetNotFound(String),
    #[error("timeline document has no `events` list")]
    MissingEventList,
    /// A single timeline entry was rejected during ingestion.
    #[error("timeline event {index} rejected: {reason}")]
    InvalidEvent { index: usize, reason: String },
    /// A page element referenced by id does not exist.
    #[error("no element with id `{0}`")]
    UnknownTarget(String),
    #[error("gallery manifest has no `images` list")]
    MissingImageList,
    #[error("an image with rank {0} is already in the gallery")]
    RankConflict(u64),
    #[error("image viewer has no {0} image")]
    NoViewerImage(&'static str),
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl TourError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for TourError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for TourError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
