// Common data models for the metadata and download subsystems

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use super::qualities::{AudioQuality, VideoQuality};

/// One raw encoding from the upstream catalog, as reported by the
/// extraction collaborator. Only the attributes the normalizer consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawFormat {
    /// Format ID (e.g., "137", "140")
    pub format_id: String,
    /// Free-text quality annotation (e.g., "720p", "medium", "Premium")
    pub format_note: Option<String>,
    /// Video codec (avc1, vp9, none)
    pub vcodec: Option<String>,
    /// Audio codec (mp4a, opus, none)
    pub acodec: Option<String>,
    /// Reported size in bytes, when the upstream knows it
    pub filesize: Option<u64>,
}

/// Video metadata as returned by the extraction collaborator, before
/// normalization.
#[derive(Debug, Clone)]
pub struct ExtractedVideo {
    pub id: String,
    pub title: String,
    pub duration_seconds: u64,
    pub uploader: String,
    pub upload_date: String,
    pub description: String,
    pub thumbnail: String,
    pub formats: Vec<RawFormat>,
}

/// One playlist item from a flat extraction pass.
#[derive(Debug, Clone)]
pub struct PlaylistEntry {
    pub id: String,
    pub title: String,
    pub thumbnail: String,
    pub duration_seconds: u64,
    pub uploader: String,
    pub upload_date: String,
}

/// Playlist metadata as returned by the extraction collaborator.
///
/// Entries are `Option` so private or deleted items survive the trip
/// without failing the whole playlist.
#[derive(Debug, Clone)]
pub struct ExtractedPlaylist {
    pub id: String,
    pub title: String,
    pub uploader: String,
    pub description: String,
    pub thumbnail: Option<String>,
    pub entries: Vec<Option<PlaylistEntry>>,
}

/// One recognized video tier with its estimated muxed size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoQualityInfo {
    pub quality: VideoQuality,
    /// Estimated bytes, including the best available audio track
    pub filesize: u64,
    /// Whether a downloaded artifact already exists for this tier.
    /// Attached at read time only, never trusted from storage.
    #[serde(default, skip_serializing)]
    pub cached: bool,
}

/// One recognized audio tier with its estimated size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioQualityInfo {
    pub quality: AudioQuality,
    pub filesize: u64,
    #[serde(default, skip_serializing)]
    pub cached: bool,
}

/// Normalized video metadata, as cached and returned to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaRecord {
    pub video_id: String,
    pub title: String,
    pub duration_seconds: u64,
    pub uploader: String,
    pub upload_date: String,
    pub description: String,
    pub thumbnail: String,
    pub video_qualities: Vec<VideoQualityInfo>,
    pub audio_qualities: Vec<AudioQualityInfo>,
}

/// Lightweight per-item summary inside a playlist record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistItem {
    pub video_id: String,
    pub title: String,
    pub thumbnail: String,
    pub duration_seconds: u64,
    pub uploader: String,
    pub upload_date: String,
}

/// Normalized playlist metadata, as cached and returned to callers.
///
/// `total_videos` counts every catalog entry, including unavailable ones;
/// `videos` holds only the entries that were actually retrievable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistRecord {
    pub playlist_id: String,
    pub title: String,
    pub uploader: String,
    pub description: String,
    pub thumbnail: String,
    pub total_videos: usize,
    pub videos: Vec<PlaylistItem>,
}

/// Download configuration handed to the extraction collaborator.
///
/// Closed set of typed fields; anything upstream-specific goes through
/// `extra`, which implementations may consume or ignore.
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Format selection expression (e.g., "bv*[height<=720]+ba/best")
    pub format_spec: String,
    /// Directory downloaded files land in
    pub output_dir: PathBuf,
    /// Output filename template, extractor-specific
    pub output_template: Option<String>,
    /// Path to a cookies.txt file
    pub cookie_file: Option<PathBuf>,
    /// Retry count passed through to the extraction tool
    pub retries: u32,
    /// SOCKS5/HTTP proxy URL
    pub proxy: Option<String>,
    /// Opaque passthrough options for the extraction tool
    pub extra: HashMap<String, serde_json::Value>,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            format_spec: "bv*+ba/best".to_string(),
            output_dir: dirs::download_dir().unwrap_or_else(|| PathBuf::from(".")),
            output_template: None,
            cookie_file: None,
            retries: 3,
            proxy: None,
            extra: HashMap::new(),
        }
    }
}

impl DownloadOptions {
    pub fn with_format_spec(mut self, spec: impl Into<String>) -> Self {
        self.format_spec = spec.into();
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_cookie_file(mut self, path: Option<PathBuf>) -> Self {
        self.cookie_file = path;
        self
    }

    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// One request to materialize a media file at a given quality.
///
/// Purely in-memory; owned by the download manager from submission until
/// completion.
#[derive(Debug, Clone)]
pub struct DownloadTask {
    pub video_id: String,
    pub url: String,
    /// Opaque to the queue; only ever compared as part of the key
    pub quality_tag: String,
    pub options: DownloadOptions,
}

impl DownloadTask {
    pub fn new(
        video_id: impl Into<String>,
        url: impl Into<String>,
        quality_tag: impl Into<String>,
        options: DownloadOptions,
    ) -> Self {
        Self {
            video_id: video_id.into(),
            url: url.into(),
            quality_tag: quality_tag.into(),
            options,
        }
    }

    /// Deduplication key: one download per (video, quality) at a time.
    pub fn key(&self) -> String {
        format!("{}_{}", self.video_id, self.quality_tag)
    }
}
