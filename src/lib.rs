//! Cache-backed metadata resolution and bounded download orchestration
//! for externally hosted video content.
//!
//! Two entry points:
//!
//! - [`MetadataResolver`] turns a video or playlist id into a normalized,
//!   cache-backed record of quality tiers and estimated sizes.
//! - [`DownloadManager`] accepts fire-and-forget download tasks, bounds
//!   concurrency against the rate-limited upstream and deduplicates
//!   in-flight work.
//!
//! Storage and extraction are collaborator traits ([`MetadataCache`],
//! [`MediaExtractor`]) injected at construction; [`YtDlpExtractor`] is the
//! bundled extractor backed by the yt-dlp binary.

pub mod downloader;

pub use downloader::{
    AudioQuality, AudioQualityInfo, CacheError, DownloadManager, DownloadManagerConfig,
    DownloadOptions, DownloadTask, ExtractError, MediaExtractor, MediaRecord, MetadataCache,
    MetadataResolver, PlaylistRecord, ResolveError, SubmitError, VideoQuality, VideoQualityInfo,
    YtDlpConfig, YtDlpExtractor,
};
