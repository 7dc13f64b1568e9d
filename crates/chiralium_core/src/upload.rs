//! Upload header validation for blob entities.
//!
//! # Responsibility
//! - Decide from `Content-Type` / `Content-Length` alone whether an inbound
//!   upload may become a blob entity.
//! - Publish the standard accepted-type lists blob entities pick from.
//!
//! # Invariants
//! - Validation is pure: it reads headers and nothing else.
//! - A length equal to the limit is accepted; only larger ones are rejected.
//! - One MB is 1,000,000 bytes.
//! - `Content-Length` must be a plain non-negative integer. Values such as
//!   `abc` or `20000000 bytes` are rejected rather than read leniently.

use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const CONTENT_TYPE: &str = "Content-Type";
pub const CONTENT_LENGTH: &str = "Content-Length";

/// Size limit used when a blob entity does not declare its own (in MB).
pub const DEFAULT_MAXIMUM_FILE_SIZE_MB: u64 = 30;

const BYTES_PER_MB: u64 = 1_000_000;

/// Standard accepted content-type lists.
pub mod file_types {
    pub const IMAGE: &[&str] = &[
        "image/jpeg",
        "image/png",
        "image/gif",
        "image/webp",
        "image/svg+xml",
        "image/tiff",
    ];

    pub const TEXT: &[&str] = &[
        "text/plain",
        "text/html",
        "application/pdf",
        "application/rtf",
    ];

    /// .doc, .docx, .ppt, .pptx, .xls, .xlsx
    pub const MS_OFFICE: &[&str] = &[
        "application/msword",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "application/vnd.ms-powerpoint",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "application/vnd.ms-excel",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    ];

    pub const AUDIO: &[&str] = &[
        "audio/mpeg",
        "audio/ogg",
        "audio/opus",
        "audio/wav",
        "audio/webm",
    ];

    pub const VIDEO: &[&str] = &["video/mpeg", "video/mp4", "video/webm"];

    pub const ARCHIVE: &[&str] = &[
        "application/vnd.rar",
        "application/zip",
        "application/x-7z-compressed",
    ];
}

/// Read access to inbound request headers. Lookups are case-insensitive.
pub trait UploadHeaders {
    fn header(&self, name: &str) -> Option<&str>;
}

impl UploadHeaders for HashMap<String, String> {
    fn header(&self, name: &str) -> Option<&str> {
        self.iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Minimal owned header set, enough to describe an inbound upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadRequest {
    headers: Vec<(String, String)>,
}

impl UploadRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_content_type(self, value: impl Into<String>) -> Self {
        self.with_header(CONTENT_TYPE, value)
    }

    pub fn with_content_length(self, bytes: u64) -> Self {
        self.with_header(CONTENT_LENGTH, bytes.to_string())
    }
}

impl UploadHeaders for UploadRequest {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Why an upload was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadRejection {
    MissingContentType,
    UnacceptedContentType(String),
    MissingContentLength,
    InvalidContentLength(String),
    TooLarge { bytes: u64, max_bytes: u64 },
}

impl Display for UploadRejection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingContentType => write!(f, "missing {CONTENT_TYPE} header"),
            Self::UnacceptedContentType(value) => write!(f, "content type `{value}` is not accepted"),
            Self::MissingContentLength => write!(f, "missing {CONTENT_LENGTH} header"),
            Self::InvalidContentLength(value) => {
                write!(f, "content length `{value}` is not a byte count")
            }
            Self::TooLarge { bytes, max_bytes } => {
                write!(f, "upload of {bytes} bytes exceeds the {max_bytes} byte limit")
            }
        }
    }
}

impl Error for UploadRejection {}

/// Checks upload headers and reports the first reason for refusal.
///
/// `accepted = None` accepts any present content type. Content lengths
/// that are not non-negative integers are refused.
pub fn validate_upload(
    headers: &(impl UploadHeaders + ?Sized),
    accepted: Option<&[&str]>,
    maximum_file_size_mb: u64,
) -> Result<(), UploadRejection> {
    let content_type = headers
        .header(CONTENT_TYPE)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(UploadRejection::MissingContentType)?;
    if let Some(accepted) = accepted {
        if !accepted.iter().any(|accepted| *accepted == content_type) {
            return Err(UploadRejection::UnacceptedContentType(
                content_type.to_string(),
            ));
        }
    }

    let raw_length = headers
        .header(CONTENT_LENGTH)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(UploadRejection::MissingContentLength)?;
    let bytes = raw_length
        .parse::<u64>()
        .map_err(|_| UploadRejection::InvalidContentLength(raw_length.to_string()))?;
    let max_bytes = maximum_file_size_mb.saturating_mul(BYTES_PER_MB);
    if bytes > max_bytes {
        return Err(UploadRejection::TooLarge { bytes, max_bytes });
    }

    Ok(())
}

/// Boolean form of `validate_upload`.
pub fn check_validity(
    headers: &(impl UploadHeaders + ?Sized),
    accepted: Option<&[&str]>,
    maximum_file_size_mb: u64,
) -> bool {
    validate_upload(headers, accepted, maximum_file_size_mb).is_ok()
}
