use super::*;
use crate::feed::FeedLink;
use crate::test_helpers::ScriptedProbe;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SAMPLE_VTT: &str = "WEBVTT\n\n00:00:00.000 --> 00:00:04.000\nHerzlich willkommen bei B2P.\n";

fn http_probe() -> HttpProbe {
    HttpProbe::new(reqwest::Client::new(), &TranscriptConfig::default())
}

fn resolver(probe: Arc<dyn TranscriptProbe>) -> TranscriptResolver {
    TranscriptResolver::new(probe, &TranscriptConfig::default())
}

// --- Candidate selection ---

#[test]
fn test_candidate_prefers_declared_vtt_link() {
    let entry = FeedEntry {
        link: Some("https://example.com/ep1".to_string()),
        links: vec![
            FeedLink::new("https://example.com/ep1", "alternate", None),
            FeedLink::new("https://cdn.example.com/ep1.mp3", "enclosure", Some("audio/mpeg")),
            FeedLink::new(
                "https://example.com/files/ep1.vtt",
                "transcript",
                Some("TEXT/VTT; charset=utf-8"),
            ),
        ],
        ..Default::default()
    };

    assert_eq!(
        feed_transcript_candidate(&entry).as_deref(),
        Some("https://example.com/files/ep1.vtt")
    );
}

#[test]
fn test_candidate_derived_from_episode_link() {
    let entry = FeedEntry {
        link: Some("https://example.com/ep1".to_string()),
        ..Default::default()
    };
    assert_eq!(
        feed_transcript_candidate(&entry).as_deref(),
        Some("https://example.com/ep1/transcript.vtt")
    );

    let entry = FeedEntry {
        link: Some("https://example.com/ep1/".to_string()),
        ..Default::default()
    };
    assert_eq!(
        feed_transcript_candidate(&entry).as_deref(),
        Some("https://example.com/ep1/transcript.vtt")
    );
}

#[test]
fn test_candidate_skips_vtt_link_without_href() {
    let entry = FeedEntry {
        link: Some("https://example.com/ep9".to_string()),
        links: vec![FeedLink::new("", "transcript", Some("text/vtt"))],
        ..Default::default()
    };
    assert_eq!(
        feed_transcript_candidate(&entry).as_deref(),
        Some("https://example.com/ep9/transcript.vtt")
    );
}

#[test]
fn test_no_candidate_without_links() {
    assert!(feed_transcript_candidate(&FeedEntry::default()).is_none());
}

#[test]
fn test_candidate_derived_from_permalink_guid() {
    let feed = r#"<?xml version="1.0"?>
<rss version="2.0">
    <channel>
        <title>T</title>
        <link>https://example.com</link>
        <description>D</description>
        <item>
            <title>Folge 7</title>
            <guid>https://example.com/episodes/7/</guid>
        </item>
    </channel>
</rss>"#;

    let entries = crate::feed::parse_feed(feed).unwrap();
    assert_eq!(
        feed_transcript_candidate(&entries[0]).as_deref(),
        Some("https://example.com/episodes/7/transcript.vtt")
    );
}

#[test]
fn test_expand_template() {
    let config = TranscriptConfig::default();
    assert_eq!(
        expand_template(&config.raw_url_template, "007"),
        "https://raw.githubusercontent.com/b2p-hub/b2p-vtts/main/007.vtt"
    );
    assert_eq!(
        expand_template(&config.cdn_url_template, "007"),
        "https://cdn.jsdelivr.net/gh/b2p-hub/b2p-vtts@main/007.vtt"
    );
}

#[test]
fn test_vtt_signature_detection() {
    assert!(has_vtt_signature(b"WEBVTT\n\n"));
    assert!(has_vtt_signature(b"  \r\nWEBVTT - Folge 3"));
    assert!(has_vtt_signature(b"\xEF\xBB\xBFWEBVTT\n"));
    assert!(!has_vtt_signature(b"<!DOCTYPE html>"));
    assert!(!has_vtt_signature(b"webvtt"));
    assert!(!has_vtt_signature(b""));
}

#[test]
fn test_transcript_source_serializes_snake_case() {
    assert_eq!(TranscriptSource::Feed.to_string(), "feed");
    assert_eq!(TranscriptSource::GithubRaw.to_string(), "github_raw");
}

// --- has_real_vtt over HTTP ---

#[tokio::test]
async fn test_has_real_vtt_accepts_vtt_content_type() {
    let mock_server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/ep1/transcript.vtt"))
        .respond_with(ResponseTemplate::new(200).insert_header("Content-Type", "text/vtt"))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ep1/transcript.vtt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SAMPLE_VTT))
        .expect(0)
        .mount(&mock_server)
        .await;

    let url = format!("{}/ep1/transcript.vtt", mock_server.uri());
    let check = has_real_vtt(&http_probe(), &url, 2048).await;
    assert_eq!(check, VttCheck::Confirmed(VttEvidence::ContentType));
}

#[tokio::test]
async fn test_has_real_vtt_sniffs_body_when_content_type_is_unrelated() {
    let mock_server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/t.vtt"))
        .respond_with(
            ResponseTemplate::new(200).insert_header("Content-Type", "application/octet-stream"),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/t.vtt"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(SAMPLE_VTT)
                .insert_header("Content-Type", "application/octet-stream"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let url = format!("{}/t.vtt", mock_server.uri());
    let check = has_real_vtt(&http_probe(), &url, 2048).await;
    assert_eq!(check, VttCheck::Confirmed(VttEvidence::Signature));
    assert!(check.is_real());
}

#[tokio::test]
async fn test_has_real_vtt_rejects_not_found_without_get() {
    let mock_server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/missing.vtt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/missing.vtt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SAMPLE_VTT))
        .expect(0)
        .mount(&mock_server)
        .await;

    let url = format!("{}/missing.vtt", mock_server.uri());
    let check = has_real_vtt(&http_probe(), &url, 2048).await;
    assert_eq!(check, VttCheck::Rejected(RejectReason::HttpStatus(404)));
}

#[tokio::test]
async fn test_has_real_vtt_rejects_html_page() {
    let mock_server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/ep2/transcript.vtt"))
        .respond_with(ResponseTemplate::new(200).insert_header("Content-Type", "text/html"))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ep2/transcript.vtt"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<!DOCTYPE html><html><body>Nicht gefunden</body></html>")
                .insert_header("Content-Type", "text/html"),
        )
        .mount(&mock_server)
        .await;

    let url = format!("{}/ep2/transcript.vtt", mock_server.uri());
    let check = has_real_vtt(&http_probe(), &url, 2048).await;
    assert_eq!(check, VttCheck::Rejected(RejectReason::MissingSignature));
}

#[tokio::test]
async fn test_has_real_vtt_follows_redirects_on_head() {
    let mock_server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/old.vtt"))
        .respond_with(
            ResponseTemplate::new(307)
                .insert_header("Location", format!("{}/new.vtt", mock_server.uri()).as_str()),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/new.vtt"))
        .respond_with(ResponseTemplate::new(200).insert_header("Content-Type", "text/vtt"))
        .mount(&mock_server)
        .await;

    let url = format!("{}/old.vtt", mock_server.uri());
    let check = has_real_vtt(&http_probe(), &url, 2048).await;
    assert_eq!(check, VttCheck::Confirmed(VttEvidence::ContentType));
}

#[tokio::test]
async fn test_has_real_vtt_unreachable_host_is_rejection() {
    // Port 9 (discard) is not listening on the test host
    let check = has_real_vtt(&http_probe(), "http://127.0.0.1:9/transcript.vtt", 2048).await;
    assert!(matches!(
        check,
        VttCheck::Rejected(RejectReason::Unreachable(_))
    ));
}

#[tokio::test]
async fn test_sniff_reads_bounded_prefix() {
    let mock_server = MockServer::start().await;

    let mut body = String::from("WEBVTT\n\n");
    body.push_str(&"00:00:00.000 --> 00:00:01.000\nBla\n\n".repeat(1000));

    Mock::given(method("GET"))
        .and(path("/long.vtt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&mock_server)
        .await;

    let url = format!("{}/long.vtt", mock_server.uri());
    let response = http_probe().sniff(&url, 2048).await.unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.prefix.len(), 2048);
    assert!(response.prefix.starts_with(VTT_SIGNATURE));
}

#[tokio::test]
async fn test_sniff_error_status_has_empty_prefix() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/gone.vtt"))
        .respond_with(ResponseTemplate::new(410).set_body_string(SAMPLE_VTT))
        .mount(&mock_server)
        .await;

    let url = format!("{}/gone.vtt", mock_server.uri());
    let response = http_probe().sniff(&url, 2048).await.unwrap();
    assert_eq!(response.status, 410);
    assert!(response.prefix.is_empty());
}

// --- Resolver decisions ---

#[tokio::test]
async fn test_resolver_selects_validated_feed_candidate() {
    let probe = Arc::new(ScriptedProbe::vtt());
    let resolver = resolver(probe.clone());
    let entry = FeedEntry {
        link: Some("https://example.com/ep1".to_string()),
        ..Default::default()
    };

    let resolution = resolver.resolve(&entry, "001").await;

    assert_eq!(
        resolution.feed_url.as_deref(),
        Some("https://example.com/ep1/transcript.vtt")
    );
    assert_eq!(resolution.final_url, "https://example.com/ep1/transcript.vtt");
    assert_eq!(resolution.source, TranscriptSource::Feed);
    assert_eq!(
        resolution.raw_url,
        "https://raw.githubusercontent.com/b2p-hub/b2p-vtts/main/001.vtt"
    );
    assert_eq!(
        resolution.cdn_url,
        "https://cdn.jsdelivr.net/gh/b2p-hub/b2p-vtts@main/001.vtt"
    );
    assert_eq!(
        probe.requests(),
        vec!["HEAD https://example.com/ep1/transcript.vtt".to_string()]
    );
}

#[tokio::test]
async fn test_resolver_falls_back_to_raw_on_not_found() {
    let probe = Arc::new(ScriptedProbe::not_found());
    let resolver = resolver(probe);
    let entry = FeedEntry {
        link: Some("https://example.com/ep12".to_string()),
        ..Default::default()
    };

    let resolution = resolver.resolve(&entry, "012").await;

    assert_eq!(
        resolution.feed_url.as_deref(),
        Some("https://example.com/ep12/transcript.vtt")
    );
    assert_eq!(resolution.source, TranscriptSource::GithubRaw);
    assert_eq!(resolution.final_url, resolution.raw_url);
    assert_eq!(
        resolution.check,
        Some(VttCheck::Rejected(RejectReason::HttpStatus(404)))
    );
}

#[tokio::test]
async fn test_resolver_head_failure_falls_through_to_get() {
    let probe = Arc::new(ScriptedProbe::new(
        Err(ProbeError("connection reset".to_string())),
        Ok(SniffResponse {
            status: 200,
            prefix: SAMPLE_VTT.as_bytes().to_vec(),
        }),
    ));
    let resolver = resolver(probe.clone());
    let entry = FeedEntry {
        link: Some("https://example.com/ep3".to_string()),
        ..Default::default()
    };

    let resolution = resolver.resolve(&entry, "003").await;

    assert_eq!(resolution.source, TranscriptSource::Feed);
    assert_eq!(
        resolution.check,
        Some(VttCheck::Confirmed(VttEvidence::Signature))
    );
    assert_eq!(probe.requests().len(), 2);
}

#[tokio::test]
async fn test_resolver_without_candidate_never_probes() {
    let probe = Arc::new(ScriptedProbe::vtt());
    let resolver = resolver(probe.clone());

    let resolution = resolver.resolve(&FeedEntry::default(), "042").await;

    assert!(resolution.feed_url.is_none());
    assert!(resolution.check.is_none());
    assert_eq!(resolution.source, TranscriptSource::GithubRaw);
    assert_eq!(
        resolution.final_url,
        "https://raw.githubusercontent.com/b2p-hub/b2p-vtts/main/042.vtt"
    );
    assert!(probe.requests().is_empty());
}
