use axum::{
    extract::Query,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::fmt::Write;
use tracing::info;

/// Default number of segments in the demo playlist
const DEFAULT_SEGMENTS: u32 = 6;
/// Default segment duration in seconds
const DEFAULT_SEGMENT_DURATION: f64 = 6.006;
/// Cue spacing of the demo subtitles in seconds
const CUE_SECONDS: u32 = 4;

/// Query parameters for the demo playlist
#[derive(Debug, Deserialize)]
pub struct DemoParams {
    /// Number of segments (1-100, default: 6)
    segments: Option<u32>,
    /// Duration of each segment in seconds (0.5-30, default: 6.006)
    duration: Option<f64>,
}

impl DemoParams {
    fn num_segments(&self) -> u32 {
        self.segments.unwrap_or(DEFAULT_SEGMENTS).clamp(1, 100)
    }

    fn segment_duration(&self) -> f64 {
        self.duration
            .filter(|d| d.is_finite())
            .unwrap_or(DEFAULT_SEGMENT_DURATION)
            .clamp(0.5, 30.0)
    }
}

/// Build an on-demand media playlist with relative segment URIs, the shape
/// the interceptor expects from an origin.
fn build_demo_playlist(num_segments: u32, segment_duration: f64) -> String {
    let mut playlist = String::with_capacity(64 * num_segments as usize + 128);

    let _ = writeln!(playlist, "#EXTM3U");
    let _ = writeln!(playlist, "#EXT-X-VERSION:3");
    let _ = writeln!(
        playlist,
        "#EXT-X-TARGETDURATION:{}",
        segment_duration.ceil() as u64
    );
    let _ = writeln!(playlist, "#EXT-X-MEDIA-SEQUENCE:0");
    let _ = writeln!(playlist, "#EXT-X-PLAYLIST-TYPE:VOD");

    for idx in 0..num_segments {
        let _ = writeln!(playlist, "#EXTINF:{:.3},", segment_duration);
        let _ = writeln!(playlist, "segment-{}.ts", idx);
    }

    let _ = writeln!(playlist, "#EXT-X-ENDLIST");

    playlist
}

fn vtt_timestamp(secs: u32) -> String {
    format!("{:02}:{:02}:{:02}.000", secs / 3600, (secs / 60) % 60, secs % 60)
}

/// Build a WebVTT document with one numbered cue every few seconds
fn build_demo_vtt(total_secs: u32) -> String {
    let mut vtt = String::from("WEBVTT\n");
    let mut start = 0;
    let mut cue = 1;

    while start < total_secs {
        let end = (start + CUE_SECONDS).min(total_secs);
        let _ = writeln!(vtt);
        let _ = writeln!(vtt, "{}", cue);
        let _ = writeln!(vtt, "{} --> {}", vtt_timestamp(start), vtt_timestamp(end));
        let _ = writeln!(vtt, "Demo subtitle {}", cue);
        start = end;
        cue += 1;
    }

    vtt
}

/// Demo origin playlist
///
/// # Usage
/// ```text
/// GET /demo/playlist.m3u8                         → 6 × 6.006s segments
/// GET /demo/playlist.m3u8?segments=20&duration=4  → 20 × 4s segments
/// ```
pub async fn serve_demo_playlist(Query(params): Query<DemoParams>) -> Response {
    let num_segments = params.num_segments();
    let duration = params.segment_duration();

    info!(
        "Serving demo playlist: {} segments of {:.3}s",
        num_segments, duration
    );

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/vnd.apple.mpegurl")],
        build_demo_playlist(num_segments, duration),
    )
        .into_response()
}

/// Demo subtitle resource covering one minute
pub async fn serve_demo_subtitles() -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/vtt")],
        build_demo_vtt(60),
    )
        .into_response()
}
