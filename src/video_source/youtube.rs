//! YouTube transcript fetching via `yt-transcript-rs`.

use super::{TranscriptFetcher, VideoRef};
use crate::config::YoutubeSettings;
use crate::error::{Result, TubechatError};
use crate::transcript::{Transcript, TranscriptSegment};
use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};
use yt_transcript_rs::api::YouTubeTranscriptApi;

/// Fetches published captions (manual or auto-generated) from YouTube.
pub struct YoutubeTranscriptFetcher {
    languages: Vec<String>,
    fallback_to_any_language: bool,
}

impl YoutubeTranscriptFetcher {
    /// Create a fetcher preferring English captions.
    pub fn new() -> Self {
        Self::with_settings(&YoutubeSettings::default())
    }

    /// Create a fetcher from configuration.
    pub fn with_settings(settings: &YoutubeSettings) -> Self {
        Self {
            languages: settings.languages.clone(),
            fallback_to_any_language: settings.fallback_to_any_language,
        }
    }

    fn api() -> Result<YouTubeTranscriptApi> {
        YouTubeTranscriptApi::new(None, None, None).map_err(|e| {
            TubechatError::TranscriptUnavailable(format!("Failed to initialize transcript client: {}", e))
        })
    }

    async fn fetch_in(
        api: &YouTubeTranscriptApi,
        video_id: &str,
        languages: &[&str],
    ) -> Result<Transcript> {
        let fetched = api
            .fetch_transcript(video_id, languages, false)
            .await
            .map_err(|e| TubechatError::TranscriptUnavailable(e.to_string()))?;

        let segments = fetched
            .snippets
            .iter()
            .map(|s| TranscriptSegment::new(s.start, s.start + s.duration, s.text.clone()))
            .collect();

        Ok(Transcript::new(video_id.to_string(), segments)
            .with_language(fetched.language_code.clone()))
    }

    /// Language codes of every caption track the video has.
    async fn available_languages(api: &YouTubeTranscriptApi, video_id: &str) -> Result<Vec<String>> {
        let list = api
            .list_transcripts(video_id)
            .await
            .map_err(|e| TubechatError::TranscriptUnavailable(e.to_string()))?;

        let mut codes: Vec<String> = list
            .manually_created_transcripts
            .keys()
            .chain(list.generated_transcripts.keys())
            .cloned()
            .collect();
        codes.sort();
        codes.dedup();
        Ok(codes)
    }
}

impl Default for YoutubeTranscriptFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TranscriptFetcher for YoutubeTranscriptFetcher {
    #[instrument(skip(self), fields(video_id = %video.video_id))]
    async fn fetch(&self, video: &VideoRef) -> Result<Transcript> {
        let api = Self::api()?;
        let preferred: Vec<&str> = self.languages.iter().map(String::as_str).collect();

        info!("Fetching transcript for {}", video.video_id);

        let transcript = match Self::fetch_in(&api, &video.video_id, &preferred).await {
            Ok(transcript) => transcript,
            Err(e) if self.fallback_to_any_language => {
                warn!(
                    "No transcript in {:?} ({}), trying any available language",
                    self.languages, e
                );
                let codes = Self::available_languages(&api, &video.video_id).await?;
                if codes.is_empty() {
                    return Err(TubechatError::TranscriptUnavailable(format!(
                        "No captions are available for video {}",
                        video.video_id
                    )));
                }
                let codes: Vec<&str> = codes.iter().map(String::as_str).collect();
                Self::fetch_in(&api, &video.video_id, &codes).await?
            }
            Err(e) => return Err(e),
        };

        if transcript.is_empty() {
            return Err(TubechatError::TranscriptUnavailable(format!(
                "The transcript for video {} is empty",
                video.video_id
            )));
        }

        debug!(
            "Fetched {} caption segments ({:.0}s)",
            transcript.segments.len(),
            transcript.duration_seconds
        );
        Ok(transcript)
    }
}
