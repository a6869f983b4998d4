// MediaExtractor backed by the native `yt-dlp` binary
//
// Metadata comes from `--dump-json` / `--dump-single-json`; downloads run
// the binary to completion as a child process, so the blocking work never
// touches the cooperative scheduler.

use async_trait::async_trait;
use log::{debug, warn};
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::{timeout, Duration};

use super::errors::ExtractError;
use super::models::{
    DownloadOptions, ExtractedPlaylist, ExtractedVideo, PlaylistEntry, RawFormat,
};
use super::traits::MediaExtractor;

/// Configuration for the yt-dlp extractor.
#[derive(Debug, Clone)]
pub struct YtDlpConfig {
    /// Explicit binary path; discovered when `None`
    pub binary_path: Option<String>,
    /// Socket timeout for metadata requests, seconds
    pub timeout_seconds: u64,
    /// Hard ceiling on a single download, seconds
    pub download_timeout_seconds: u64,
    /// Retry count passed to the tool for metadata fetches
    pub retries: u32,
    /// Path to a cookies.txt file used for metadata fetches
    pub cookies_path: Option<String>,
    /// SOCKS5/HTTP proxy URL
    pub proxy: Option<String>,
    /// YouTube player client (android, web, tv)
    pub player_client: Option<String>,
}

impl Default for YtDlpConfig {
    fn default() -> Self {
        Self {
            binary_path: None,
            timeout_seconds: 30,
            download_timeout_seconds: 600,
            retries: 3,
            cookies_path: None,
            proxy: None,
            player_client: None,
        }
    }
}

impl YtDlpConfig {
    pub fn with_binary_path(mut self, path: Option<String>) -> Self {
        self.binary_path = path;
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn with_cookies_path(mut self, path: Option<String>) -> Self {
        self.cookies_path = path;
        self
    }

    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn with_player_client(mut self, client: Option<String>) -> Self {
        self.player_client = client;
        self
    }
}

/// yt-dlp CLI extractor.
pub struct YtDlpExtractor {
    binary: String,
    config: YtDlpConfig,
}

impl YtDlpExtractor {
    pub fn new(config: YtDlpConfig) -> Self {
        let binary = config
            .binary_path
            .clone()
            .unwrap_or_else(find_ytdlp);
        Self { binary, config }
    }

    fn common_args(&self) -> Vec<String> {
        let mut args = vec![
            "--no-warnings".to_string(),
            "--socket-timeout".to_string(),
            self.config.timeout_seconds.to_string(),
            "--retries".to_string(),
            self.config.retries.to_string(),
        ];
        if let Some(path) = &self.config.cookies_path {
            args.push("--cookies".to_string());
            args.push(path.clone());
        }
        if let Some(proxy) = &self.config.proxy {
            args.push("--proxy".to_string());
            args.push(proxy.clone());
        }
        if let Some(client) = &self.config.player_client {
            args.push("--extractor-args".to_string());
            args.push(format!("youtube:player_client={}", client));
        }
        args
    }

    async fn run(&self, args: Vec<String>, timeout_secs: u64) -> Result<Vec<u8>, ExtractError> {
        let output = timeout(
            Duration::from_secs(timeout_secs),
            Command::new(&self.binary)
                .args(&args)
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| ExtractError::NetworkTimeout)?
        .map_err(|e| ExtractError::ToolNotFound(format!("{}: {}", self.binary, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(ExtractError::from(stderr));
        }
        Ok(output.stdout)
    }
}

#[async_trait]
impl MediaExtractor for YtDlpExtractor {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn fetch_video(&self, url: &str) -> Result<ExtractedVideo, ExtractError> {
        let mut args = vec!["--dump-json".to_string(), "--no-playlist".to_string()];
        args.extend(self.common_args());
        args.push(url.to_string());

        let stdout = self.run(args, self.config.timeout_seconds + 10).await?;
        let json: serde_json::Value = serde_json::from_slice(&stdout)
            .map_err(|e| ExtractError::Parse(format!("invalid JSON: {}", e)))?;
        parse_video(&json)
    }

    async fn fetch_playlist(&self, url: &str) -> Result<ExtractedPlaylist, ExtractError> {
        let mut args = vec![
            "--dump-single-json".to_string(),
            "--flat-playlist".to_string(),
        ];
        args.extend(self.common_args());
        args.push(url.to_string());

        let stdout = self.run(args, self.config.timeout_seconds + 10).await?;
        let json: serde_json::Value = serde_json::from_slice(&stdout)
            .map_err(|e| ExtractError::Parse(format!("invalid JSON: {}", e)))?;
        Ok(parse_playlist(&json))
    }

    async fn download(&self, url: &str, options: &DownloadOptions) -> Result<(), ExtractError> {
        let mut args = vec![
            "-f".to_string(),
            options.format_spec.clone(),
            "-P".to_string(),
            options.output_dir.to_string_lossy().to_string(),
            "--retries".to_string(),
            options.retries.to_string(),
            "--no-warnings".to_string(),
        ];
        if let Some(template) = &options.output_template {
            args.push("-o".to_string());
            args.push(template.clone());
        }
        if let Some(path) = &options.cookie_file {
            args.push("--cookies".to_string());
            args.push(path.to_string_lossy().to_string());
        }
        if let Some(proxy) = options.proxy.as_ref().or(self.config.proxy.as_ref()) {
            args.push("--proxy".to_string());
            args.push(proxy.clone());
        }
        for key in options.extra.keys() {
            debug!("ignoring passthrough option {} (unsupported by CLI extractor)", key);
        }
        args.push(url.to_string());

        self.run(args, self.config.download_timeout_seconds)
            .await
            .map(|_| ())
    }
}

/// Find the yt-dlp binary across common install locations, then PATH.
fn find_ytdlp() -> String {
    let common_paths = [
        "/opt/homebrew/bin/yt-dlp",
        "/usr/local/bin/yt-dlp",
        "/usr/bin/yt-dlp",
    ];
    for path in common_paths {
        if std::path::Path::new(path).exists() {
            return path.to_string();
        }
    }
    warn!("yt-dlp not found in common locations, relying on PATH");
    "yt-dlp".to_string()
}

fn parse_video(json: &serde_json::Value) -> Result<ExtractedVideo, ExtractError> {
    let formats = json["formats"]
        .as_array()
        .map(|array| array.iter().map(parse_raw_format).collect())
        .unwrap_or_default();

    Ok(ExtractedVideo {
        id: json["id"].as_str().unwrap_or("unknown").to_string(),
        title: json["title"].as_str().unwrap_or("Unknown").to_string(),
        duration_seconds: json["duration"].as_f64().unwrap_or(0.0) as u64,
        uploader: json["uploader"].as_str().unwrap_or("Unknown").to_string(),
        upload_date: json["upload_date"].as_str().unwrap_or("").to_string(),
        description: json["description"].as_str().unwrap_or("").to_string(),
        thumbnail: json["thumbnail"].as_str().unwrap_or("").to_string(),
        formats,
    })
}

fn parse_raw_format(f: &serde_json::Value) -> RawFormat {
    RawFormat {
        format_id: f["format_id"].as_str().unwrap_or("").to_string(),
        format_note: f["format_note"].as_str().map(|s| s.to_string()),
        vcodec: f["vcodec"].as_str().map(|s| s.to_string()),
        acodec: f["acodec"].as_str().map(|s| s.to_string()),
        filesize: f["filesize"].as_u64(),
    }
}

fn parse_playlist(json: &serde_json::Value) -> ExtractedPlaylist {
    let entries = json["entries"]
        .as_array()
        .map(|array| {
            array
                .iter()
                .map(|entry| {
                    if entry.is_null() {
                        None
                    } else {
                        Some(parse_playlist_entry(entry))
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    ExtractedPlaylist {
        id: json["id"].as_str().unwrap_or("unknown").to_string(),
        title: json["title"].as_str().unwrap_or("Unknown Playlist").to_string(),
        uploader: json["uploader"].as_str().unwrap_or("Unknown").to_string(),
        description: json["description"].as_str().unwrap_or("").to_string(),
        thumbnail: first_thumbnail(json),
        entries,
    }
}

fn parse_playlist_entry(entry: &serde_json::Value) -> PlaylistEntry {
    PlaylistEntry {
        id: entry["id"].as_str().unwrap_or("").to_string(),
        title: entry["title"].as_str().unwrap_or("Unknown Video").to_string(),
        thumbnail: first_thumbnail(entry).unwrap_or_default(),
        duration_seconds: entry["duration"].as_f64().unwrap_or(0.0) as u64,
        uploader: entry["uploader"].as_str().unwrap_or("Unknown").to_string(),
        upload_date: entry["upload_date"].as_str().unwrap_or("").to_string(),
    }
}

/// First thumbnail with a URL, either the flat field or the list form.
fn first_thumbnail(json: &serde_json::Value) -> Option<String> {
    if let Some(url) = json["thumbnail"].as_str() {
        if !url.is_empty() {
            return Some(url.to_string());
        }
    }
    json["thumbnails"]
        .as_array()?
        .iter()
        .find_map(|t| t["url"].as_str())
        .map(|s| s.to_string())
}
