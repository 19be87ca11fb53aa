use std::fmt;

use mime::Mime;
use serde::{Deserialize, Serialize};

/// Default ceiling for a single recorded answer.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// Container formats accepted for recorded answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Mp4,
    Webm,
    QuickTime,
}

impl MediaKind {
    pub const fn extension(self) -> &'static str {
        match self {
            MediaKind::Mp4 => "mp4",
            MediaKind::Webm => "webm",
            MediaKind::QuickTime => "mov",
        }
    }

    pub const fn content_type(self) -> &'static str {
        match self {
            MediaKind::Mp4 => "video/mp4",
            MediaKind::Webm => "video/webm",
            MediaKind::QuickTime => "video/quicktime",
        }
    }

    fn from_mime(mime: &Mime) -> Option<Self> {
        if !mime.type_().as_str().eq_ignore_ascii_case("video") {
            return None;
        }
        match mime.subtype().as_str().to_ascii_lowercase().as_str() {
            "mp4" => Some(MediaKind::Mp4),
            "webm" => Some(MediaKind::Webm),
            "quicktime" => Some(MediaKind::QuickTime),
            _ => None,
        }
    }
}

/// Size and type gate applied before anything reaches the media store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadPolicy {
    pub max_bytes: usize,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl UploadPolicy {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }

    pub fn validate(&self, content_type: &str, size: usize) -> Result<MediaKind, RejectedUpload> {
        let mime: Mime = content_type.trim().parse().map_err(|_| {
            RejectedUpload::new(RejectionReason::UnsupportedType(content_type.to_string()))
        })?;
        let kind = MediaKind::from_mime(&mime).ok_or_else(|| {
            RejectedUpload::new(RejectionReason::UnsupportedType(
                mime.essence_str().to_string(),
            ))
        })?;

        if size == 0 {
            return Err(RejectedUpload::new(RejectionReason::Empty));
        }
        if size > self.max_bytes {
            return Err(RejectedUpload::new(RejectionReason::TooLarge {
                size,
                max: self.max_bytes,
            }));
        }

        Ok(kind)
    }
}

/// Upload refused before or at submission time. Callers may fix the file and resubmit.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("upload rejected: {reason}")]
pub struct RejectedUpload {
    pub reason: RejectionReason,
}

impl RejectedUpload {
    pub fn new(reason: RejectionReason) -> Self {
        Self { reason }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    Empty,
    TooLarge { size: usize, max: usize },
    UnsupportedType(String),
    UnknownMedia(String),
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::Empty => write!(f, "recording is empty"),
            RejectionReason::TooLarge { size, max } => {
                write!(f, "recording is {size} bytes, limit is {max} bytes")
            }
            RejectionReason::UnsupportedType(content_type) => write!(
                f,
                "content type '{content_type}' is not allowed (expected MP4, WebM, or QuickTime video)"
            ),
            RejectionReason::UnknownMedia(media) => {
                write!(f, "media reference '{media}' was never uploaded")
            }
        }
    }
}
