//! Full run over HTTP against a mock listing API and media host.

mod common;

use common::{file_count, run_to_completion, test_config};
use serde_json::json;
use std::time::Duration;
use subreddit_dl::{StopReason, run_pipeline};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn post(id: &str, media_base: &str) -> serde_json::Value {
    json!({
        "kind": "t3",
        "data": {
            "id": id,
            "title": format!("Mountain {}", id),
            "url": format!("{}/media/{}.png", media_base, id),
            "subreddit": "EarthPorn",
            "over_18": false,
            "is_self": false,
            "post_hint": "image",
            "created_utc": 1_700_000_000.0,
            "preview": {
                "images": [{
                    "source": {
                        "url": format!("{}/preview/{}.png", media_base, id),
                        "width": 4000,
                        "height": 3000
                    }
                }]
            }
        }
    })
}

fn listing(children: Vec<serde_json::Value>, after: Option<&str>) -> serde_json::Value {
    json!({
        "kind": "Listing",
        "data": { "after": after, "children": children }
    })
}

#[tokio::test]
async fn downloads_from_listing_api_over_http() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/r/EarthPorn/top.json"))
        .and(query_param("t", "week"))
        .and(query_param_is_missing("after"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(
            vec![post("a", &base), post("b", &base)],
            Some("t3_b"),
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/r/EarthPorn/top.json"))
        .and(query_param("after", "t3_b"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(listing(vec![post("c", &base)], None)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(wiremock::matchers::path_regex(r"^/media/.+\.png$"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(vec![0x89, b'P', b'N', b'G']),
        )
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let mut config = test_config(temp_dir.path(), &["r/EarthPorn"], 3);
    config.listing.base_url = base.clone();
    config.listing.sort = "top".parse().unwrap();
    config.listing.timeframe = "week".parse().unwrap();

    let handle = run_pipeline(config, CancellationToken::new()).await.unwrap();
    let (_, summary) = run_to_completion(handle, Duration::from_secs(10)).await;

    assert_eq!(summary.saved, 3);
    assert_eq!(summary.stop_reason, StopReason::TargetReached);
    assert_eq!(file_count(temp_dir.path()), 3);
    assert_eq!(
        std::fs::read(temp_dir.path().join("Mountain_a.png")).unwrap(),
        vec![0x89, b'P', b'N', b'G']
    );
}

#[tokio::test]
async fn missing_subreddit_ends_the_run_with_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/r/doesnotexist/hot.json"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let mut config = test_config(temp_dir.path(), &["doesnotexist"], 5);
    config.listing.base_url = server.uri();

    let handle = run_pipeline(config, CancellationToken::new()).await.unwrap();
    let (_, summary) = run_to_completion(handle, Duration::from_secs(10)).await;

    assert_eq!(summary.saved, 0);
    assert_eq!(summary.stop_reason, StopReason::SourcesExhausted);
    assert_eq!(summary.errors.len(), 1);
    assert!(summary.errors[0].contains("404"));
}
