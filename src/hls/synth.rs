//! Synthesized playlists served in place of the origin hierarchy.

use std::fmt::Write;

/// Default subtitle group id
pub const DEFAULT_GROUP_ID: &str = "subs";
/// Default subtitle rendition name
pub const DEFAULT_NAME: &str = "English";
/// Default subtitle language (BCP 47)
pub const DEFAULT_LANGUAGE: &str = "en";
/// Default advertised bandwidth of the single variant stream
pub const DEFAULT_BANDWIDTH: u64 = 1_280_000;

/// Attributes of the subtitle rendition and its variant stream.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleTrack {
    pub group_id: String,
    pub name: String,
    pub language: String,
    pub bandwidth: u64,
}

impl Default for SubtitleTrack {
    fn default() -> Self {
        Self {
            group_id: DEFAULT_GROUP_ID.to_string(),
            name: DEFAULT_NAME.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            bandwidth: DEFAULT_BANDWIDTH,
        }
    }
}

/// Build the master playlist: one subtitle rendition pointing at
/// `subtitles_url` and one variant stream pointing at `fragments_url`.
pub fn build_master(fragments_url: &str, subtitles_url: &str, track: &SubtitleTrack) -> String {
    let mut playlist = String::with_capacity(512);

    let _ = writeln!(playlist, "#EXTM3U");
    let _ = writeln!(
        playlist,
        r#"#EXT-X-MEDIA:TYPE=SUBTITLES,GROUP-ID="{}",NAME="{}",DEFAULT=NO,FORCED=NO,URI="{}",LANGUAGE="{}""#,
        track.group_id, track.name, subtitles_url, track.language
    );
    let _ = writeln!(
        playlist,
        r#"#EXT-X-STREAM-INF:BANDWIDTH={},SUBTITLES="{}""#,
        track.bandwidth, track.group_id
    );
    let _ = write!(playlist, "{}", fragments_url);

    playlist
}

/// Build the subtitle media playlist.
///
/// The subtitle resource is a single segment spanning the whole program, so
/// the playlist always holds exactly one `#EXTINF` entry. The target duration
/// is the integer floor of `total_duration`.
pub fn build_subtitle_playlist(total_duration: f64, subtitle_url: &str) -> String {
    let target_duration = total_duration.max(0.0).floor() as u64;
    let mut playlist = String::with_capacity(256 + subtitle_url.len());

    let _ = writeln!(playlist, "#EXTM3U");
    let _ = writeln!(playlist, "#EXT-X-VERSION:3");
    let _ = writeln!(playlist, "#EXT-X-MEDIA-SEQUENCE:1");
    let _ = writeln!(playlist, "#EXT-X-PLAYLIST-TYPE:VOD");
    let _ = writeln!(playlist, "#EXT-X-ALLOW-CACHE:NO");
    let _ = writeln!(playlist, "#EXT-X-TARGETDURATION:{}", target_duration);
    let _ = writeln!(playlist, "#EXTINF:{:.3}, no desc", total_duration);
    let _ = writeln!(playlist, "{}", subtitle_url);
    let _ = write!(playlist, "#EXT-X-ENDLIST");

    playlist
}
