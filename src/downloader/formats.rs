// Format catalog normalization
//
// Maps the raw encoding catalog for one video into the two closed tier
// lists. Pure: no I/O, deterministic for a given catalog order.

use log::debug;

use super::models::{AudioQualityInfo, RawFormat, VideoQualityInfo};
use super::qualities::{AudioQuality, VideoQuality};

/// Build the video and audio quality lists for one catalog.
///
/// For each tier, in enumeration order, the first raw format whose
/// `format_note` contains the tier label is taken; its reported size (0 if
/// unknown) becomes the estimate. Tiers with no matching format are
/// omitted entirely.
///
/// After both lists are built, the size of the last (highest bitrate)
/// audio entry is added to every video entry. A video-only stream has to
/// be muxed with an audio track, and the best audio is what download
/// format specs ask for. This over-counts when a lower tier would pair
/// with a smaller track; the estimate is intentionally kept that simple.
pub fn build_quality_lists(
    formats: &[RawFormat],
) -> (Vec<VideoQualityInfo>, Vec<AudioQualityInfo>) {
    let mut video = scan_video_tiers(formats);
    let audio = scan_audio_tiers(formats);

    if let Some(best_audio) = audio.last() {
        for entry in &mut video {
            entry.filesize += best_audio.filesize;
        }
    }

    (video, audio)
}

fn scan_video_tiers(formats: &[RawFormat]) -> Vec<VideoQualityInfo> {
    let mut out = Vec::new();
    for quality in VideoQuality::ALL {
        match find_by_note(formats, quality.label()) {
            Some(matched) => {
                out.push(VideoQualityInfo {
                    quality,
                    filesize: matched.filesize.unwrap_or(0),
                    cached: false,
                });
            }
            None => debug!("video tier {} not present in catalog", quality),
        }
    }
    out
}

fn scan_audio_tiers(formats: &[RawFormat]) -> Vec<AudioQualityInfo> {
    let mut out = Vec::new();
    for quality in AudioQuality::ALL {
        match find_by_note(formats, quality.label()) {
            Some(matched) => {
                out.push(AudioQualityInfo {
                    quality,
                    filesize: matched.filesize.unwrap_or(0),
                    cached: false,
                });
            }
            None => debug!("audio tier {} not present in catalog", quality),
        }
    }
    out
}

fn find_by_note<'a>(formats: &'a [RawFormat], label: &str) -> Option<&'a RawFormat> {
    formats
        .iter()
        .find(|f| f.format_note.as_deref().map_or(false, |note| note.contains(label)))
}
