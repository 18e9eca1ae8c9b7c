//! End-to-end tests for the Substitch interceptor.
//!
//! Starts a real Axum server on a random port whose default manifest and
//! subtitle URLs point at its own demo endpoints, then drives the session the
//! way a player-side resource loader would.
//!
//! SSRF note: the server's own address is loopback, which the validator
//! rejects for user-supplied manifest URLs. Config-sourced URLs are
//! operator-trusted, so the tests create sessions with an empty body.

use m3u8_rs::Playlist;
use std::net::SocketAddr;
use substitch::config::Config;
use substitch::server::build_router;

// ── Test server helpers ───────────────────────────────────────────────────────

async fn start_server(demo_query: &str) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test server");
    let addr = listener.local_addr().unwrap();

    let config = Config {
        port: 0,
        is_dev: true,
        manifest_url: format!("http://{}/demo/playlist.m3u8{}", addr, demo_query),
        subtitle_url: format!("http://{}/demo/subtitles.vtt", addr),
        session_ttl_secs: 300,
        worker_threads: 2,
        ready_timeout_secs: 0,
        fetch_timeout_secs: 5,
        subtitle_name: "English".to_string(),
        subtitle_language: "en".to_string(),
        stream_bandwidth: 1_280_000,
    };

    let app = build_router(config).await;

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    addr
}

/// Virtual endpoints of a freshly created session.
struct TestSession {
    id: String,
    main_url: String,
    fragments_url: String,
    subtitles_url: String,
}

async fn create_session(client: &reqwest::Client, addr: SocketAddr) -> TestSession {
    let resp = client
        .post(format!("http://{}/sessions", addr))
        .json(&serde_json::json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);

    let body: serde_json::Value = resp.json().await.unwrap();
    let field = |name: &str| body[name].as_str().unwrap().to_string();
    TestSession {
        id: field("session_id"),
        main_url: field("main_url"),
        fragments_url: field("fragments_url"),
        subtitles_url: field("subtitles_url"),
    }
}

async fn load(
    client: &reqwest::Client,
    addr: SocketAddr,
    session: &TestSession,
    virtual_url: &str,
) -> reqwest::Response {
    client
        .get(format!("http://{}/sessions/{}/load", addr, session.id))
        .query(&[("url", virtual_url)])
        .send()
        .await
        .unwrap()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn health_check() {
    let addr = start_server("").await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("http://{}/health", addr))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn subtitle_track_attached_to_demo_stream() {
    let addr = start_server("?segments=3&duration=4").await;
    let client = reqwest::Client::new();
    let session = create_session(&client, addr).await;

    assert_eq!(
        session.main_url,
        format!("main://{}/demo/playlist.m3u8?segments=3&duration=4", addr)
    );

    // Master: one variant + one subtitle rendition, both virtual
    let resp = load(&client, addr, &session, &session.main_url).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "application/vnd.apple.mpegurl"
    );
    let master = resp.bytes().await.unwrap();
    match m3u8_rs::parse_playlist_res(&master) {
        Ok(Playlist::MasterPlaylist(pl)) => {
            assert_eq!(pl.variants.len(), 1);
            assert_eq!(pl.variants[0].uri, session.fragments_url);
            assert_eq!(pl.alternatives.len(), 1);
            assert_eq!(
                pl.alternatives[0].uri.as_deref(),
                Some(session.subtitles_url.as_str())
            );
            assert_eq!(pl.alternatives[0].language.as_deref(), Some("en"));
        }
        other => panic!("Expected master playlist, got {:?}", other),
    }

    // Fragments: origin segments made absolute
    let resp = load(&client, addr, &session, &session.fragments_url).await;
    assert_eq!(resp.status(), 200);
    let fragments = resp.bytes().await.unwrap();
    match m3u8_rs::parse_playlist_res(&fragments) {
        Ok(Playlist::MediaPlaylist(pl)) => {
            assert_eq!(pl.segments.len(), 3);
            for (idx, segment) in pl.segments.iter().enumerate() {
                assert_eq!(
                    segment.uri,
                    format!("http://{}/demo/segment-{}.ts", addr, idx)
                );
                assert_eq!(segment.duration, 4.0);
            }
        }
        other => panic!("Expected media playlist, got {:?}", other),
    }

    // Subtitles: one entry spanning the whole 12 seconds
    let resp = load(&client, addr, &session, &session.subtitles_url).await;
    assert_eq!(resp.status(), 200);
    let subtitles = resp.text().await.unwrap();
    assert!(subtitles.contains("#EXT-X-TARGETDURATION:12\n"));
    assert!(subtitles.contains(&format!(
        "#EXTINF:12.000, no desc\nhttp://{}/demo/subtitles.vtt\n",
        addr
    )));

    // The subtitle resource itself is reachable
    let vtt = client
        .get(format!("http://{}/demo/subtitles.vtt", addr))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(vtt.starts_with("WEBVTT"));
}

#[tokio::test]
async fn concurrent_reads_after_ready_are_consistent() {
    let addr = start_server("?segments=10&duration=6").await;
    let client = reqwest::Client::new();
    let session = create_session(&client, addr).await;

    let master = load(&client, addr, &session, &session.main_url).await;
    assert_eq!(master.status(), 200);

    let session = std::sync::Arc::new(session);
    let handles: Vec<_> = (0..16)
        .map(|i| {
            let client = client.clone();
            let session = session.clone();
            tokio::spawn(async move {
                let url = if i % 2 == 0 {
                    &session.fragments_url
                } else {
                    &session.subtitles_url
                };
                let resp = load(&client, addr, &session, url).await;
                assert_eq!(resp.status(), 200);
                (i % 2, resp.text().await.unwrap())
            })
        })
        .collect();

    let mut fragments = Vec::new();
    let mut subtitles = Vec::new();
    for handle in handles {
        let (kind, body) = handle.await.unwrap();
        if kind == 0 {
            fragments.push(body);
        } else {
            subtitles.push(body);
        }
    }

    assert!(fragments.windows(2).all(|w| w[0] == w[1]));
    assert!(subtitles.windows(2).all(|w| w[0] == w[1]));
    assert!(subtitles[0].contains("#EXTINF:60.000, no desc"));
    assert_eq!(fragments[0].matches("#EXTINF:6.000,").count(), 10);
}

#[tokio::test]
async fn sessions_are_isolated() {
    let addr = start_server("").await;
    let client = reqwest::Client::new();
    let first = create_session(&client, addr).await;
    let second = create_session(&client, addr).await;

    let resp = load(&client, addr, &first, &first.main_url).await;
    assert_eq!(resp.status(), 200);

    // Second session has not seen a Main request yet
    let resp = load(&client, addr, &second, &second.fragments_url).await;
    assert_eq!(resp.status(), 503);

    let resp = load(&client, addr, &first, &first.fragments_url).await;
    assert_eq!(resp.status(), 200);
}
