// Closed quality tier enumerations
//
// The normalizer only ever emits tiers from these two sets, in the order
// they are declared here. Labels match yt-dlp's `format_note` vocabulary.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Video quality tiers, ordered by increasing resolution.
///
/// `Premium` is the enhanced-bitrate tier some videos expose above the
/// numeric resolutions; it sorts last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum VideoQuality {
    #[serde(rename = "144p")]
    P144,
    #[serde(rename = "240p")]
    P240,
    #[serde(rename = "360p")]
    P360,
    #[serde(rename = "480p")]
    P480,
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "1080p")]
    P1080,
    #[serde(rename = "1440p")]
    P1440,
    #[serde(rename = "2160p")]
    P2160,
    Premium,
}

impl VideoQuality {
    /// Every tier, in ascending resolution order.
    pub const ALL: [VideoQuality; 9] = [
        VideoQuality::P144,
        VideoQuality::P240,
        VideoQuality::P360,
        VideoQuality::P480,
        VideoQuality::P720,
        VideoQuality::P1080,
        VideoQuality::P1440,
        VideoQuality::P2160,
        VideoQuality::Premium,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            VideoQuality::P144 => "144p",
            VideoQuality::P240 => "240p",
            VideoQuality::P360 => "360p",
            VideoQuality::P480 => "480p",
            VideoQuality::P720 => "720p",
            VideoQuality::P1080 => "1080p",
            VideoQuality::P1440 => "1440p",
            VideoQuality::P2160 => "2160p",
            VideoQuality::Premium => "Premium",
        }
    }
}

impl fmt::Display for VideoQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Audio quality tiers, ordered by increasing bitrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioQuality {
    Low,
    Medium,
    High,
}

impl AudioQuality {
    /// Every tier, in ascending bitrate order.
    pub const ALL: [AudioQuality; 3] =
        [AudioQuality::Low, AudioQuality::Medium, AudioQuality::High];

    pub fn label(&self) -> &'static str {
        match self {
            AudioQuality::Low => "low",
            AudioQuality::Medium => "medium",
            AudioQuality::High => "high",
        }
    }
}

impl fmt::Display for AudioQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
