mod common;

use chrono::{TimeZone, Utc};
use common::init_tracing;
use pretty_assertions::assert_eq;
use rss_relay::media::md5_hex;
use rss_relay::{Downloader, FeedParser, FeedSource, FetchConfig, Fetcher, RelayError, RssFeedSource};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Example channel</title>
    <link>https://example.com</link>
    <description>Latest posts</description>
    <item>
      <title>Second</title>
      <link>https://example.com/2</link>
      <description><![CDATA[<p>Second <b>post</b></p>]]></description>
      <guid>https://example.com/2</guid>
      <pubDate>Thu, 02 May 2024 09:00:00 GMT</pubDate>
    </item>
    <item>
      <title>First</title>
      <link>https://example.com/1</link>
      <description>First post</description>
      <guid>https://example.com/1</guid>
      <pubDate>Wed, 01 May 2024 09:00:00 GMT</pubDate>
    </item>
  </channel>
</rss>"#;

const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom example</title>
  <id>urn:uuid:60a76c80-d399-11d9-b93C-0003939e0af6</id>
  <updated>2024-05-03T18:30:02Z</updated>
  <entry>
    <title>Atom entry</title>
    <id>urn:uuid:1225c695-cfb8-4ebb-aaaa-80da344efa6a</id>
    <updated>2024-05-03T18:30:02Z</updated>
    <content type="html">Body &lt;br&gt; text</content>
  </entry>
</feed>"#;

fn quick_config() -> FetchConfig {
    FetchConfig {
        user_agent: "RSS-Relay-Test/1.0".to_string(),
        timeout_seconds: 5,
        max_retries: 0,
        retry_delay_seconds: 1,
        ..FetchConfig::default()
    }
}

#[test]
fn test_parse_rss() {
    let feed = FeedParser::new().parse_feed(RSS).unwrap();

    assert_eq!(feed.title.as_deref(), Some("Example channel"));
    assert_eq!(feed.entries.len(), 2);

    let newest = feed.newest().unwrap();
    assert_eq!(newest.id, "https://example.com/2");
    assert_eq!(newest.title, "Second");
    assert_eq!(newest.link.as_deref(), Some("https://example.com/2"));
    assert_eq!(newest.raw_content, "<p>Second <b>post</b></p>");
    assert_eq!(
        newest.published_at,
        Some(Utc.with_ymd_and_hms(2024, 5, 2, 9, 0, 0).unwrap())
    );
}

#[test]
fn test_parse_atom_uses_content_and_updated() {
    let feed = FeedParser::new().parse_feed(ATOM).unwrap();

    let entry = feed.newest().unwrap();
    assert_eq!(entry.id, "urn:uuid:1225c695-cfb8-4ebb-aaaa-80da344efa6a");
    assert_eq!(entry.raw_content, "Body <br> text");
    assert_eq!(
        entry.published_at,
        Some(Utc.with_ymd_and_hms(2024, 5, 3, 18, 30, 2).unwrap())
    );
}

#[test]
fn test_parse_garbage_fails() {
    let result = FeedParser::new().parse_feed("this is not a feed");

    assert!(matches!(result, Err(RelayError::Parse(_))));
}

#[tokio::test]
async fn test_fetch_feed_returns_body_and_validators() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .and(header("user-agent", "RSS-Relay-Test/1.0"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("etag", "\"v1\"")
                .insert_header("last-modified", "Thu, 02 May 2024 09:00:00 GMT")
                .set_body_string(RSS),
        )
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(quick_config()).unwrap();
    let result = fetcher
        .fetch_feed(&format!("{}/feed.xml", server.uri()), None, None)
        .await
        .unwrap();

    assert_eq!(result.http_status, 200);
    assert_eq!(result.etag.as_deref(), Some("\"v1\""));
    assert_eq!(result.last_modified.as_deref(), Some("Thu, 02 May 2024 09:00:00 GMT"));
    assert_eq!(result.content.as_deref(), Some(RSS));
}

#[tokio::test]
async fn test_fetch_feed_server_error() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(quick_config()).unwrap();
    let err = fetcher
        .fetch_feed(&format!("{}/feed.xml", server.uri()), None, None)
        .await
        .unwrap_err();

    match err {
        RelayError::Fetch { reason, .. } => assert!(reason.contains("503")),
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_source_replays_cached_feed_when_not_modified() {
    init_tracing();
    let server = MockServer::start().await;

    // Mounted first so it wins once the validator is sent
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .and(header("if-none-match", "\"v1\""))
        .respond_with(ResponseTemplate::new(304))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(200).insert_header("etag", "\"v1\"").set_body_string(RSS))
        .expect(1)
        .mount(&server)
        .await;

    let source = RssFeedSource::new(quick_config()).unwrap();
    let url = format!("{}/feed.xml", server.uri());

    let first = source.fetch(&url).await.unwrap();
    let second = source.fetch(&url).await.unwrap();

    let first = first.unwrap();
    assert_eq!(first.entries.len(), 2);
    assert_eq!(second, Some(first));
}

#[tokio::test]
async fn test_source_rejects_unparsable_body() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not a feed</html>"))
        .mount(&server)
        .await;

    let source = RssFeedSource::new(quick_config()).unwrap();
    let result = source.fetch(&format!("{}/feed.xml", server.uri())).await;

    assert!(matches!(result, Err(RelayError::Parse(_))));
}

#[tokio::test]
async fn test_media_hash_is_streamed_md5() {
    init_tracing();
    let server = MockServer::start().await;
    let body: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();

    Mock::given(method("GET"))
        .and(path("/media/a.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/media/missing.png"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(quick_config()).unwrap();

    let md5 = fetcher.content_md5(&format!("{}/media/a.png", server.uri())).await.unwrap();
    assert_eq!(md5, md5_hex(&body));

    let err = fetcher
        .content_md5(&format!("{}/media/missing.png", server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::Fetch { .. }));
}

#[tokio::test]
async fn test_media_over_size_cap_is_rejected() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/media/huge.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 1024 * 1024 + 1]))
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(FetchConfig {
        max_media_size_mb: 1,
        ..quick_config()
    })
    .unwrap();

    let err = fetcher
        .content_md5(&format!("{}/media/huge.mp4", server.uri()))
        .await
        .unwrap_err();

    match err {
        RelayError::Fetch { reason, .. } => assert!(reason.contains("too large")),
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_feed_over_size_cap_is_rejected() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b' '; 1024 * 1024 + 1]))
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(FetchConfig {
        max_feed_size_mb: 1,
        ..quick_config()
    })
    .unwrap();

    let err = fetcher
        .fetch_feed(&format!("{}/feed.xml", server.uri()), None, None)
        .await
        .unwrap_err();

    match err {
        RelayError::Fetch { reason, .. } => assert!(reason.contains("Feed too large: 1048577 bytes")),
        other => panic!("unexpected error: {}", other),
    }
}
