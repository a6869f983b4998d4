// Cache-or-fetch metadata resolution

use std::sync::Arc;

use log::{info, warn};

use super::errors::ResolveError;
use super::formats::build_quality_lists;
use super::models::{MediaRecord, PlaylistItem, PlaylistRecord};
use super::traits::{MediaExtractor, MetadataCache};

/// Canonical watch URL for a video id.
pub fn video_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

/// Canonical URL for a playlist id.
pub fn playlist_url(playlist_id: &str) -> String {
    format!("https://www.youtube.com/playlist?list={}", playlist_id)
}

/// Resolves per-item metadata through the cache, falling back to the
/// extraction collaborator on a miss.
///
/// Both collaborators are injected; the resolver holds no global state.
pub struct MetadataResolver {
    cache: Arc<dyn MetadataCache>,
    extractor: Arc<dyn MediaExtractor>,
}

impl MetadataResolver {
    pub fn new(cache: Arc<dyn MetadataCache>, extractor: Arc<dyn MediaExtractor>) -> Self {
        Self { cache, extractor }
    }

    /// Resolve metadata for a single video.
    ///
    /// Cache hits are returned as stored, without re-running
    /// normalization. On a miss the catalog is fetched, normalized and
    /// persisted before being returned; a failed persist fails the call so
    /// callers never hold data the cache will not serve again.
    pub async fn resolve_video(&self, video_id: &str) -> Result<MediaRecord, ResolveError> {
        if video_id.trim().is_empty() {
            return Err(ResolveError::InvalidId);
        }

        match self.cache.get_video(video_id).await {
            Ok(Some(record)) => {
                info!("cache hit for video {}", video_id);
                return Ok(record);
            }
            Ok(None) => info!("cache miss for video {}, extracting", video_id),
            Err(e) => warn!("cache read failed for video {}: {}, extracting", video_id, e),
        }

        let extracted = self.extractor.fetch_video(&video_url(video_id)).await?;

        if extracted.formats.is_empty() {
            warn!("no formats available for video {}", video_id);
            return Err(ResolveError::NotAvailable(video_id.to_string()));
        }

        let (video_qualities, audio_qualities) = build_quality_lists(&extracted.formats);

        let record = MediaRecord {
            video_id: video_id.to_string(),
            title: extracted.title,
            duration_seconds: extracted.duration_seconds,
            uploader: extracted.uploader,
            upload_date: extracted.upload_date,
            description: extracted.description,
            thumbnail: extracted.thumbnail,
            video_qualities,
            audio_qualities,
        };

        self.cache
            .put_video(&record)
            .await
            .map_err(|e| ResolveError::StorageFailure(video_id.to_string(), e))?;

        info!("stored metadata for video {}", video_id);
        Ok(record)
    }

    /// Resolve metadata for a playlist.
    ///
    /// Unavailable entries (private/deleted) are dropped rather than
    /// failing the whole playlist; `total_videos` still counts them. When
    /// the catalog carries no thumbnail of its own, the first available
    /// entry's thumbnail stands in.
    pub async fn resolve_playlist(&self, playlist_id: &str) -> Result<PlaylistRecord, ResolveError> {
        if playlist_id.trim().is_empty() {
            return Err(ResolveError::InvalidId);
        }

        match self.cache.get_playlist(playlist_id).await {
            Ok(Some(record)) => {
                info!("cache hit for playlist {}", playlist_id);
                return Ok(record);
            }
            Ok(None) => info!("cache miss for playlist {}, extracting", playlist_id),
            Err(e) => warn!(
                "cache read failed for playlist {}: {}, extracting",
                playlist_id, e
            ),
        }

        let extracted = self
            .extractor
            .fetch_playlist(&playlist_url(playlist_id))
            .await?;

        let total_videos = extracted.entries.len();
        let videos: Vec<PlaylistItem> = extracted
            .entries
            .into_iter()
            .flatten()
            .map(|entry| PlaylistItem {
                video_id: entry.id,
                title: entry.title,
                thumbnail: entry.thumbnail,
                duration_seconds: entry.duration_seconds,
                uploader: entry.uploader,
                upload_date: entry.upload_date,
            })
            .collect();

        let thumbnail = match extracted.thumbnail {
            Some(url) if !url.is_empty() => url,
            _ => videos
                .first()
                .map(|v| v.thumbnail.clone())
                .unwrap_or_default(),
        };

        let record = PlaylistRecord {
            playlist_id: playlist_id.to_string(),
            title: extracted.title,
            uploader: extracted.uploader,
            description: extracted.description,
            thumbnail,
            total_videos,
            videos,
        };

        self.cache
            .put_playlist(&record)
            .await
            .map_err(|e| ResolveError::StorageFailure(playlist_id.to_string(), e))?;

        info!(
            "stored metadata for playlist {} ({} of {} entries available)",
            playlist_id,
            record.videos.len(),
            record.total_videos
        );
        Ok(record)
    }

    /// Mark which quality tiers already have a downloaded artifact.
    ///
    /// A lookup failure on this side channel never fails the read; the
    /// affected entry just stays `cached = false`.
    pub async fn mark_cached_qualities(&self, record: &mut MediaRecord) {
        for entry in &mut record.video_qualities {
            entry.cached = self
                .artifact_exists(&record.video_id, entry.quality.label())
                .await;
        }
        for entry in &mut record.audio_qualities {
            entry.cached = self
                .artifact_exists(&record.video_id, entry.quality.label())
                .await;
        }
    }

    async fn artifact_exists(&self, video_id: &str, quality_tag: &str) -> bool {
        match self.cache.has_artifact(video_id, quality_tag).await {
            Ok(exists) => exists,
            Err(e) => {
                warn!(
                    "artifact lookup failed for {}_{}: {}",
                    video_id, quality_tag, e
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::errors::{CacheError, ExtractError};
    use crate::downloader::models::{
        DownloadOptions, ExtractedPlaylist, ExtractedVideo, PlaylistEntry, RawFormat,
    };
    use crate::downloader::qualities::VideoQuality;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn make_raw_format(note: &str, filesize: Option<u64>) -> RawFormat {
        RawFormat {
            format_id: note.to_string(),
            format_note: Some(note.to_string()),
            vcodec: None,
            acodec: None,
            filesize,
        }
    }

    fn make_extracted_video(id: &str, formats: Vec<RawFormat>) -> ExtractedVideo {
        ExtractedVideo {
            id: id.to_string(),
            title: "A title".to_string(),
            duration_seconds: 63,
            uploader: "someone".to_string(),
            upload_date: "20240110".to_string(),
            description: String::new(),
            thumbnail: format!("https://img.example/{}/hq.jpg", id),
            formats,
        }
    }

    /// Extractor stub that counts invocations and serves canned data.
    struct StubExtractor {
        video: Option<ExtractedVideo>,
        playlist: Option<ExtractedPlaylist>,
        fetch_calls: AtomicUsize,
    }

    impl StubExtractor {
        fn with_video(video: ExtractedVideo) -> Self {
            Self {
                video: Some(video),
                playlist: None,
                fetch_calls: AtomicUsize::new(0),
            }
        }

        fn with_playlist(playlist: ExtractedPlaylist) -> Self {
            Self {
                video: None,
                playlist: Some(playlist),
                fetch_calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.fetch_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MediaExtractor for StubExtractor {
        fn name(&self) -> &'static str {
            "stub"
        }

        async fn fetch_video(&self, _url: &str) -> Result<ExtractedVideo, ExtractError> {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            self.video
                .clone()
                .ok_or_else(|| ExtractError::Other("no canned video".to_string()))
        }

        async fn fetch_playlist(&self, _url: &str) -> Result<ExtractedPlaylist, ExtractError> {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            self.playlist
                .clone()
                .ok_or_else(|| ExtractError::Other("no canned playlist".to_string()))
        }

        async fn download(
            &self,
            _url: &str,
            _options: &DownloadOptions,
        ) -> Result<(), ExtractError> {
            Ok(())
        }
    }

    /// In-memory cache with switchable failure modes.
    #[derive(Default)]
    struct MemoryCache {
        videos: Mutex<HashMap<String, MediaRecord>>,
        playlists: Mutex<HashMap<String, PlaylistRecord>>,
        artifacts: Mutex<HashMap<(String, String), bool>>,
        fail_writes: bool,
        fail_artifact_lookups: bool,
    }

    #[async_trait]
    impl MetadataCache for MemoryCache {
        async fn get_video(&self, video_id: &str) -> Result<Option<MediaRecord>, CacheError> {
            Ok(self.videos.lock().unwrap().get(video_id).cloned())
        }

        async fn put_video(&self, record: &MediaRecord) -> Result<(), CacheError> {
            if self.fail_writes {
                return Err(CacheError("write refused".to_string()));
            }
            self.videos
                .lock()
                .unwrap()
                .insert(record.video_id.clone(), record.clone());
            Ok(())
        }

        async fn get_playlist(
            &self,
            playlist_id: &str,
        ) -> Result<Option<PlaylistRecord>, CacheError> {
            Ok(self.playlists.lock().unwrap().get(playlist_id).cloned())
        }

        async fn put_playlist(&self, record: &PlaylistRecord) -> Result<(), CacheError> {
            if self.fail_writes {
                return Err(CacheError("write refused".to_string()));
            }
            self.playlists
                .lock()
                .unwrap()
                .insert(record.playlist_id.clone(), record.clone());
            Ok(())
        }

        async fn has_artifact(
            &self,
            video_id: &str,
            quality_tag: &str,
        ) -> Result<bool, CacheError> {
            if self.fail_artifact_lookups {
                return Err(CacheError("lookup refused".to_string()));
            }
            Ok(*self
                .artifacts
                .lock()
                .unwrap()
                .get(&(video_id.to_string(), quality_tag.to_string()))
                .unwrap_or(&false))
        }
    }

    #[tokio::test]
    async fn test_second_resolve_served_from_cache() {
        let extractor = Arc::new(StubExtractor::with_video(make_extracted_video(
            "vid1",
            vec![make_raw_format("720p", Some(1_000))],
        )));
        let cache = Arc::new(MemoryCache::default());
        let resolver = MetadataResolver::new(cache, extractor.clone());

        let first = resolver.resolve_video("vid1").await.unwrap();
        let second = resolver.resolve_video("vid1").await.unwrap();

        assert_eq!(extractor.calls(), 1);
        assert_eq!(first.video_id, second.video_id);
        assert_eq!(second.video_qualities[0].quality, VideoQuality::P720);
    }

    #[tokio::test]
    async fn test_empty_catalog_is_not_available_and_not_cached() {
        let extractor = Arc::new(StubExtractor::with_video(make_extracted_video(
            "vid2",
            Vec::new(),
        )));
        let cache = Arc::new(MemoryCache::default());
        let resolver = MetadataResolver::new(cache.clone(), extractor);

        let err = resolver.resolve_video("vid2").await.unwrap_err();
        assert!(matches!(err, ResolveError::NotAvailable(ref id) if id == "vid2"));
        assert!(cache.videos.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_storage_failure_withholds_extracted_record() {
        let extractor = Arc::new(StubExtractor::with_video(make_extracted_video(
            "vid3",
            vec![make_raw_format("480p", Some(10))],
        )));
        let cache = Arc::new(MemoryCache {
            fail_writes: true,
            ..Default::default()
        });
        let resolver = MetadataResolver::new(cache, extractor);

        let err = resolver.resolve_video("vid3").await.unwrap_err();
        assert!(matches!(err, ResolveError::StorageFailure(..)));
    }

    #[tokio::test]
    async fn test_empty_id_rejected() {
        let extractor = Arc::new(StubExtractor::with_video(make_extracted_video(
            "x",
            Vec::new(),
        )));
        let resolver = MetadataResolver::new(Arc::new(MemoryCache::default()), extractor);

        assert!(matches!(
            resolver.resolve_video("  ").await.unwrap_err(),
            ResolveError::InvalidId
        ));
        assert!(matches!(
            resolver.resolve_playlist("").await.unwrap_err(),
            ResolveError::InvalidId
        ));
    }

    fn make_playlist_entry(id: &str) -> PlaylistEntry {
        PlaylistEntry {
            id: id.to_string(),
            title: format!("video {}", id),
            thumbnail: format!("https://img.example/{}/hq.jpg", id),
            duration_seconds: 10,
            uploader: "someone".to_string(),
            upload_date: "20240110".to_string(),
        }
    }

    #[tokio::test]
    async fn test_playlist_skips_unavailable_entries_but_counts_them() {
        let extractor = Arc::new(StubExtractor::with_playlist(ExtractedPlaylist {
            id: "pl1".to_string(),
            title: "mix".to_string(),
            uploader: "someone".to_string(),
            description: String::new(),
            thumbnail: Some("https://img.example/pl1.jpg".to_string()),
            entries: vec![
                Some(make_playlist_entry("a")),
                None, // private video
                Some(make_playlist_entry("b")),
            ],
        }));
        let resolver = MetadataResolver::new(Arc::new(MemoryCache::default()), extractor);

        let record = resolver.resolve_playlist("pl1").await.unwrap();

        assert_eq!(record.total_videos, 3);
        assert_eq!(record.videos.len(), 2);
        assert_eq!(record.thumbnail, "https://img.example/pl1.jpg");
    }

    #[tokio::test]
    async fn test_playlist_thumbnail_backfilled_from_first_entry() {
        let extractor = Arc::new(StubExtractor::with_playlist(ExtractedPlaylist {
            id: "pl2".to_string(),
            title: "mix".to_string(),
            uploader: "someone".to_string(),
            description: String::new(),
            thumbnail: None,
            entries: vec![Some(make_playlist_entry("first")), Some(make_playlist_entry("second"))],
        }));
        let resolver = MetadataResolver::new(Arc::new(MemoryCache::default()), extractor);

        let record = resolver.resolve_playlist("pl2").await.unwrap();
        assert_eq!(record.thumbnail, "https://img.example/first/hq.jpg");
    }

    #[tokio::test]
    async fn test_cached_flags_reflect_artifacts() {
        let extractor = Arc::new(StubExtractor::with_video(make_extracted_video(
            "vid4",
            vec![
                make_raw_format("720p", Some(1_000)),
                make_raw_format("1080p", Some(2_000)),
            ],
        )));
        let cache = Arc::new(MemoryCache::default());
        cache
            .artifacts
            .lock()
            .unwrap()
            .insert(("vid4".to_string(), "720p".to_string()), true);
        let resolver = MetadataResolver::new(cache, extractor);

        let mut record = resolver.resolve_video("vid4").await.unwrap();
        resolver.mark_cached_qualities(&mut record).await;

        assert!(record.video_qualities[0].cached);
        assert!(!record.video_qualities[1].cached);
    }

    #[tokio::test]
    async fn test_artifact_lookup_failure_degrades_to_uncached() {
        let extractor = Arc::new(StubExtractor::with_video(make_extracted_video(
            "vid5",
            vec![make_raw_format("720p", Some(1_000))],
        )));
        let cache = Arc::new(MemoryCache {
            fail_artifact_lookups: true,
            ..Default::default()
        });
        let resolver = MetadataResolver::new(cache, extractor);

        let mut record = resolver.resolve_video("vid5").await.unwrap();
        resolver.mark_cached_qualities(&mut record).await;

        assert!(record.video_qualities.iter().all(|q| !q.cached));
    }
}
