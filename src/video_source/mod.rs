//! Video source abstraction for Tubechat.
//!
//! Parses YouTube links and provides a trait-based interface for fetching
//! transcripts, so the pipeline can be driven by fakes in tests.

mod youtube;

pub use youtube::YoutubeTranscriptFetcher;

use crate::error::{Result, TubechatError};
use crate::transcript::Transcript;
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use url::Url;

/// Hosts that serve YouTube videos.
const YOUTUBE_HOSTS: &[&str] = &[
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "music.youtube.com",
    "youtube-nocookie.com",
    "www.youtube-nocookie.com",
];

/// Short-link hosts; the video ID is the first path segment.
const SHORT_HOSTS: &[&str] = &["youtu.be", "www.youtu.be"];

/// Path prefixes followed by a video ID (`/shorts/ID`, `/embed/ID`, ...).
const ID_PATH_PREFIXES: &[&str] = &["shorts", "embed", "live", "v"];

fn video_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").expect("Invalid regex"))
}

/// A validated reference to a YouTube video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRef {
    /// The 11-character YouTube video ID.
    pub video_id: String,
    /// Canonical watch URL.
    pub url: String,
}

impl VideoRef {
    /// Canonical watch link for a video ID.
    pub fn from_id(video_id: &str) -> Self {
        Self {
            video_id: video_id.to_string(),
            url: format!("https://www.youtube.com/watch?v={}", video_id),
        }
    }

    /// Placeholder title used until real metadata is fetched.
    pub fn display_title(&self) -> String {
        format!("Video (ID: {})", self.video_id)
    }

    /// Watch URL that starts playback at the given second.
    pub fn url_with_timestamp(&self, seconds: f64) -> String {
        format!("{}&t={}s", self.url, seconds as u32)
    }
}

/// Parse and validate a YouTube link.
///
/// Accepts watch, shorts, embed, live and youtu.be links, with or without a
/// scheme. Anything else is `InvalidInput`.
pub fn parse_video_url(input: &str) -> Result<VideoRef> {
    let input = input.trim();
    if input.is_empty() {
        return Err(TubechatError::InvalidInput(
            "Please enter a YouTube URL".to_string(),
        ));
    }

    let with_scheme = if input.contains("://") {
        input.to_string()
    } else {
        format!("https://{}", input)
    };

    let invalid = || {
        TubechatError::InvalidInput(format!("Not a recognized YouTube video URL: {}", input))
    };

    let url = Url::parse(&with_scheme).map_err(|_| invalid())?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(invalid());
    }

    let host = url.host_str().ok_or_else(invalid)?.to_ascii_lowercase();
    let mut segments = url
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect::<Vec<_>>())
        .unwrap_or_default()
        .into_iter();

    let candidate = if SHORT_HOSTS.contains(&host.as_str()) {
        segments.next().map(|s| s.to_string())
    } else if YOUTUBE_HOSTS.contains(&host.as_str()) {
        match segments.next() {
            Some("watch") => url
                .query_pairs()
                .find(|(k, _)| k == "v")
                .map(|(_, v)| v.into_owned()),
            Some(prefix) if ID_PATH_PREFIXES.contains(&prefix) => {
                segments.next().map(|s| s.to_string())
            }
            _ => None,
        }
    } else {
        None
    };

    match candidate {
        Some(id) if video_id_regex().is_match(&id) => Ok(VideoRef::from_id(&id)),
        _ => Err(invalid()),
    }
}

/// Trait for transcript providers.
#[async_trait]
pub trait TranscriptFetcher: Send + Sync {
    /// Fetch the transcript of a video.
    ///
    /// Fails with `TranscriptUnavailable` when the video has no usable captions.
    async fn fetch(&self, video: &VideoRef) -> Result<Transcript>;
}
