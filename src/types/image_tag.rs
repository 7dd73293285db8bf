// ABOUTME: Validated image tags and the per-publish tag scheme.
// ABOUTME: Unique tags combine a UTC timestamp with the build context digest.

use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImageTagError {
    #[error("image tag cannot be empty")]
    Empty,

    #[error("image tag exceeds maximum length of 128 characters")]
    TooLong,

    #[error("image tag cannot start with '{0}'")]
    InvalidStart(char),

    #[error("invalid character in image tag: '{0}'")]
    InvalidChar(char),
}

/// A registry tag: `[A-Za-z0-9_][A-Za-z0-9_.-]{0,127}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageTag(String);

impl ImageTag {
    pub const LATEST: &'static str = "latest";

    pub fn new(value: &str) -> Result<Self, ImageTagError> {
        let first = value.chars().next().ok_or(ImageTagError::Empty)?;
        if value.len() > 128 {
            return Err(ImageTagError::TooLong);
        }
        if first == '.' || first == '-' {
            return Err(ImageTagError::InvalidStart(first));
        }
        if let Some(c) = value
            .chars()
            .find(|c| !c.is_ascii_alphanumeric() && !matches!(c, '_' | '.' | '-'))
        {
            return Err(ImageTagError::InvalidChar(c));
        }
        Ok(Self(value.to_string()))
    }

    /// The mutable `latest` tag.
    pub fn latest() -> Self {
        Self(Self::LATEST.to_string())
    }

    /// Tag identifying one publish: `<yyyymmddHHMMSS>-<content digest>`.
    ///
    /// Two publishes of the same context share the digest suffix, so the
    /// registry content they reference can be matched across runs.
    pub fn for_build(at: DateTime<Utc>, content_digest: &str) -> Self {
        Self(format!("{}-{}", at.format("%Y%m%d%H%M%S"), content_digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_latest(&self) -> bool {
        self.0 == Self::LATEST
    }
}

impl fmt::Display for ImageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
