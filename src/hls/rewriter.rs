use crate::hls::model::{ManifestError, ManifestLine, RewrittenManifest, SegmentEntry};
use tracing::debug;
use url::Url;

/// Directory of a manifest URL: query, fragment and last path segment removed.
///
/// `https://h/st/playlist.m3u8?token=1` becomes `https://h/st/`.
///
/// The result is the normalized form of the URL, not a textual prefix of
/// `base_url`: the host is lowercased and characters such as spaces are
/// percent-encoded (`https://H/a b/x.m3u8` becomes `https://h/a%20b/`).
pub fn directory_of(base_url: &str) -> Result<Url, ManifestError> {
    Url::parse(base_url)
        .and_then(|url| url.join("./"))
        .map_err(|_| ManifestError::InvalidBaseUrl(base_url.to_string()))
}

/// Rewrite raw manifest bytes. See [`rewrite`].
pub fn rewrite_bytes(raw: &[u8], base_url: &str) -> Result<RewrittenManifest, ManifestError> {
    let text = std::str::from_utf8(raw).map_err(|_| ManifestError::InvalidUtf8)?;
    rewrite(text, base_url)
}

/// Rewrite every segment URI of a media playlist to an absolute URL and sum
/// the segment durations.
///
/// Every line is copied verbatim except the URI line that closes an `#EXTINF`
/// entry, which becomes `directory_of(base_url) + uri`. Tags and comments
/// between an `#EXTINF` and its URI (byte ranges, program date time) pass
/// through untouched. URIs that are already absolute are kept as they are.
///
/// # Errors
/// [`ManifestError::MissingUri`] when an `#EXTINF` reaches end of input or
/// another `#EXTINF` without a URI, [`ManifestError::InvalidDuration`] when the
/// duration is not a finite non-negative number.
pub fn rewrite(raw: &str, base_url: &str) -> Result<RewrittenManifest, ManifestError> {
    let directory = directory_of(base_url)?;

    let mut text = String::with_capacity(raw.len() + 256);
    let mut segments = Vec::new();
    let mut total_duration = 0.0;
    // (line number, duration) of an #EXTINF still waiting for its URI
    let mut pending: Option<(usize, f64)> = None;

    for (idx, line) in raw.split('\n').enumerate() {
        let line_no = idx + 1;
        if idx > 0 {
            text.push('\n');
        }

        match ManifestLine::classify(line) {
            ManifestLine::Duration(payload) => {
                if let Some((open, _)) = pending {
                    return Err(ManifestError::MissingUri { line: open });
                }
                let duration = parse_duration(payload).ok_or_else(|| {
                    ManifestError::InvalidDuration {
                        line: line_no,
                        value: payload.to_string(),
                    }
                })?;
                total_duration += duration;
                pending = Some((line_no, duration));
                text.push_str(line);
            }
            ManifestLine::Uri(uri) => match pending.take() {
                Some((_, duration)) => {
                    text.push_str(&absolutize(&directory, uri));
                    if line.ends_with('\r') {
                        text.push('\r');
                    }
                    segments.push(SegmentEntry {
                        duration,
                        raw_uri: uri.to_string(),
                    });
                }
                None => text.push_str(line),
            },
            ManifestLine::Blank | ManifestLine::Comment(_) | ManifestLine::Tag(_) => {
                text.push_str(line);
            }
        }
    }

    if let Some((open, _)) = pending {
        return Err(ManifestError::MissingUri { line: open });
    }

    debug!(
        "Rewrote {} segments against {} (total {:.3}s)",
        segments.len(),
        directory,
        total_duration
    );

    Ok(RewrittenManifest {
        text,
        total_duration,
        segments,
    })
}

/// Duration payload of an `#EXTINF` line: the number before the first comma.
fn parse_duration(payload: &str) -> Option<f64> {
    let value = payload.split(',').next().unwrap_or(payload).trim();
    value
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d >= 0.0)
}

/// `scheme://...` where the scheme is `ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )`.
fn is_absolute(uri: &str) -> bool {
    let Some((scheme, _)) = uri.split_once("://") else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn absolutize(directory: &Url, uri: &str) -> String {
    if is_absolute(uri) {
        return uri.to_string();
    }
    // Root-relative paths resolve against the host, not the directory
    if uri.starts_with('/')
        && let Ok(resolved) = directory.join(uri)
    {
        return resolved.to_string();
    }
    format!("{}{}", directory, uri)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://h/st/playlist.m3u8";

    #[test]
    fn rewrites_relative_segments_and_sums_durations() {
        let input = "#EXTM3U\n#EXTINF:9.009,\nseg0.ts\n#EXTINF:9.009,\nseg1.ts\n#EXT-X-ENDLIST";
        let out = rewrite(input, BASE).unwrap();

        assert_eq!(
            out.text,
            "#EXTM3U\n#EXTINF:9.009,\nhttps://h/st/seg0.ts\n#EXTINF:9.009,\nhttps://h/st/seg1.ts\n#EXT-X-ENDLIST"
        );
        assert_eq!(out.total_duration, 18.018);
        assert_eq!(out.segment_count(), 2);
        assert_eq!(out.segments[0].raw_uri, "seg0.ts");
    }

    #[test]
    fn zero_segments_is_identity() {
        let input = "#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-ENDLIST\n";
        let out = rewrite(input, BASE).unwrap();
        assert_eq!(out.text, input);
        assert_eq!(out.total_duration, 0.0);
        assert!(out.segments.is_empty());
    }

    #[test]
    fn non_segment_lines_preserved_in_order() {
        let input = "#EXTM3U\n#EXT-X-TARGETDURATION:10\n\n# comment\n#EXTINF:4.0,title\na/b.ts\n#EXT-X-DISCONTINUITY\n#EXTINF:6,\nc.ts\n#EXT-X-ENDLIST";
        let out = rewrite(input, BASE).unwrap();

        let in_lines: Vec<&str> = input.split('\n').collect();
        let out_lines: Vec<&str> = out.text.split('\n').collect();
        assert_eq!(in_lines.len(), out_lines.len());

        let mut rewritten = 0;
        for (a, b) in in_lines.iter().zip(&out_lines) {
            if a != b {
                assert_eq!(*b, format!("https://h/st/{}", a));
                rewritten += 1;
            }
        }
        assert_eq!(rewritten, 2);
        assert_eq!(out.total_duration, 10.0);
    }

    #[test]
    fn query_string_stripped_from_base() {
        let out = rewrite(
            "#EXTINF:2.0,\nseg.ts",
            "https://cdn.example.com/vod/x/index.m3u8?token=abc#frag",
        )
        .unwrap();
        assert_eq!(out.text, "#EXTINF:2.0,\nhttps://cdn.example.com/vod/x/seg.ts");
    }

    #[test]
    fn segment_query_is_kept() {
        let out = rewrite("#EXTINF:2.0,\nseg.ts?sig=1", BASE).unwrap();
        assert!(out.text.ends_with("https://h/st/seg.ts?sig=1"));
    }

    #[test]
    fn absolute_segment_uri_untouched() {
        let input = "#EXTINF:2.0,\nhttps://other.example.com/seg.ts";
        let out = rewrite(input, BASE).unwrap();
        assert_eq!(out.text, input);
        assert_eq!(out.segment_count(), 1);
    }

    #[test]
    fn colon_in_relative_segment_name_is_rewritten() {
        let out = rewrite("#EXTINF:2.0,\nseg-1:2.ts", BASE).unwrap();
        assert_eq!(out.text, "#EXTINF:2.0,\nhttps://h/st/seg-1:2.ts");

        let out = rewrite("#EXTINF:2.0,\nchunk:7.ts", BASE).unwrap();
        assert_eq!(out.text, "#EXTINF:2.0,\nhttps://h/st/chunk:7.ts");
    }

    #[test]
    fn absolute_detection_requires_scheme_and_authority() {
        assert!(is_absolute("https://cdn/seg.ts"));
        assert!(is_absolute("s3+http://bucket/seg.ts"));
        assert!(!is_absolute("seg-1:2.ts"));
        assert!(!is_absolute("1http://x/seg.ts"));
        assert!(!is_absolute("a/b://c.ts"));
        assert!(!is_absolute("://c.ts"));
    }

    #[test]
    fn directory_is_normalized() {
        let dir = directory_of("https://H/st%20x/a b/playlist.m3u8").unwrap();
        assert_eq!(dir.as_str(), "https://h/st%20x/a%20b/");
    }

    #[test]
    fn root_relative_uri_resolves_against_host() {
        let out = rewrite("#EXTINF:2.0,\n/media/seg.ts", BASE).unwrap();
        assert!(out.text.ends_with("\nhttps://h/media/seg.ts"));
    }

    #[test]
    fn tags_between_extinf_and_uri_pass_through() {
        let input = "#EXTINF:3.5,\n#EXT-X-BYTERANGE:1000@0\nmain.ts\n#EXT-X-ENDLIST";
        let out = rewrite(input, BASE).unwrap();
        assert_eq!(
            out.text,
            "#EXTINF:3.5,\n#EXT-X-BYTERANGE:1000@0\nhttps://h/st/main.ts\n#EXT-X-ENDLIST"
        );
        assert_eq!(out.total_duration, 3.5);
    }

    #[test]
    fn crlf_line_endings_preserved() {
        let input = "#EXTM3U\r\n#EXTINF:1.5,\r\nseg.ts\r\n#EXT-X-ENDLIST\r\n";
        let out = rewrite(input, BASE).unwrap();
        assert_eq!(
            out.text,
            "#EXTM3U\r\n#EXTINF:1.5,\r\nhttps://h/st/seg.ts\r\n#EXT-X-ENDLIST\r\n"
        );
        assert_eq!(out.total_duration, 1.5);
    }

    #[test]
    fn trailing_extinf_is_malformed() {
        let err = rewrite("#EXTM3U\n#EXTINF:9.009,", BASE).unwrap_err();
        assert_eq!(err, ManifestError::MissingUri { line: 2 });
    }

    #[test]
    fn trailing_extinf_followed_only_by_blank_is_malformed() {
        let err = rewrite("#EXTM3U\n#EXTINF:9.009,\n", BASE).unwrap_err();
        assert_eq!(err, ManifestError::MissingUri { line: 2 });
    }

    #[test]
    fn consecutive_extinf_is_malformed() {
        let err = rewrite("#EXTINF:1,\n#EXTINF:2,\nseg.ts", BASE).unwrap_err();
        assert_eq!(err, ManifestError::MissingUri { line: 1 });
    }

    #[test]
    fn unparsable_duration_is_malformed() {
        let err = rewrite("#EXTINF:abc,\nseg.ts", BASE).unwrap_err();
        assert!(matches!(err, ManifestError::InvalidDuration { line: 1, .. }));
    }

    #[test]
    fn negative_duration_is_malformed() {
        let err = rewrite("#EXTINF:-1.0,\nseg.ts", BASE).unwrap_err();
        assert!(matches!(err, ManifestError::InvalidDuration { .. }));
    }

    #[test]
    fn duration_without_comma_accepted() {
        let out = rewrite("#EXTINF:7.25\nseg.ts", BASE).unwrap();
        assert_eq!(out.total_duration, 7.25);
    }

    #[test]
    fn relative_base_url_rejected() {
        let err = rewrite("#EXTM3U", "playlist.m3u8").unwrap_err();
        assert!(matches!(err, ManifestError::InvalidBaseUrl(_)));
    }

    #[test]
    fn invalid_utf8_rejected() {
        let err = rewrite_bytes(&[0xff, 0xfe, 0x00], BASE).unwrap_err();
        assert_eq!(err, ManifestError::InvalidUtf8);
    }

    #[test]
    fn rewritten_playlist_parses_as_media_playlist() {
        let input = "#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-TARGETDURATION:10\n#EXTINF:9.009,\nseg0.ts\n#EXTINF:9.009,\nseg1.ts\n#EXT-X-ENDLIST\n";
        let out = rewrite(input, BASE).unwrap();

        match m3u8_rs::parse_playlist_res(out.text.as_bytes()) {
            Ok(m3u8_rs::Playlist::MediaPlaylist(pl)) => {
                assert_eq!(pl.segments.len(), 2);
                assert_eq!(pl.segments[1].uri, "https://h/st/seg1.ts");
            }
            other => panic!("Expected media playlist, got {:?}", other),
        }
    }
}
