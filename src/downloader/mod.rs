// Downloader module - metadata resolution and download orchestration

pub mod errors;
pub mod formats;
pub mod manager;
pub mod models;
pub mod qualities;
pub mod resolver;
pub mod traits;
pub mod ytdlp;

pub use errors::{CacheError, ExtractError, ResolveError, SubmitError};
pub use manager::{DownloadManager, DownloadManagerConfig};
pub use models::{
    AudioQualityInfo, DownloadOptions, DownloadTask, ExtractedPlaylist, ExtractedVideo,
    MediaRecord, PlaylistEntry, PlaylistItem, PlaylistRecord, RawFormat, VideoQualityInfo,
};
pub use qualities::{AudioQuality, VideoQuality};
pub use resolver::{playlist_url, video_url, MetadataResolver};
pub use traits::{MediaExtractor, MetadataCache};
pub use ytdlp::{YtDlpConfig, YtDlpExtractor};
