// Collaborator trait definitions

use async_trait::async_trait;

use super::errors::{CacheError, ExtractError};
use super::models::{
    DownloadOptions, ExtractedPlaylist, ExtractedVideo, MediaRecord, PlaylistRecord,
};

/// Upstream extraction collaborator.
///
/// Implementations own the mechanics of talking to the media site.
/// `download` may wrap a blocking tool; implementations must off-load that
/// work (child process, `spawn_blocking`) so callers can await it from the
/// cooperative runtime.
#[async_trait]
pub trait MediaExtractor: Send + Sync {
    /// Name of the extractor (for logging)
    fn name(&self) -> &'static str;

    /// Fetch the raw metadata and encoding catalog for a single video
    async fn fetch_video(&self, url: &str) -> Result<ExtractedVideo, ExtractError>;

    /// Fetch flat playlist metadata
    async fn fetch_playlist(&self, url: &str) -> Result<ExtractedPlaylist, ExtractError>;

    /// Download one media file; returns when the file is fully on disk
    async fn download(&self, url: &str, options: &DownloadOptions) -> Result<(), ExtractError>;
}

/// Persistent metadata cache collaborator.
///
/// The narrow read/write contract the resolver depends on. Reads return
/// `Ok(None)` on a miss; errors are reserved for storage-level failures.
#[async_trait]
pub trait MetadataCache: Send + Sync {
    async fn get_video(&self, video_id: &str) -> Result<Option<MediaRecord>, CacheError>;

    async fn put_video(&self, record: &MediaRecord) -> Result<(), CacheError>;

    async fn get_playlist(&self, playlist_id: &str) -> Result<Option<PlaylistRecord>, CacheError>;

    async fn put_playlist(&self, record: &PlaylistRecord) -> Result<(), CacheError>;

    /// Whether a previously downloaded artifact exists for this
    /// (video, quality tag) pair
    async fn has_artifact(&self, video_id: &str, quality_tag: &str) -> Result<bool, CacheError>;
}
