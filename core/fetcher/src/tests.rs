use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use light_indexer_interfaces::{CheckpointSourceInterface, FetchRequest};
use light_indexer_test_utils::fixtures::{s3_source, test_config, DocumentBuilder, META_PROTOCOL};
use light_indexer_test_utils::mock::MockSource;
use light_indexer_test_utils::server::{base_url, DocumentServer};
use light_indexer_types::{BlockTip, CommitteeSource, FetchError, SourceDa};
use pretty_assertions::assert_eq;
use url::Url;

use crate::{DaOrigin, Fetcher, S3Origin};

fn latest() -> FetchRequest {
    FetchRequest {
        meta_protocol: META_PROTOCOL.to_string(),
        target: None,
        since: None,
    }
}

fn at_tip(height: u64, hash: &str) -> FetchRequest {
    FetchRequest {
        meta_protocol: META_PROTOCOL.to_string(),
        target: Some(BlockTip {
            height,
            hash: hash.to_string(),
        }),
        since: Some(height - 10),
    }
}

fn namespace(network: &str) -> SourceDa {
    SourceDa {
        network: network.to_string(),
        namespace_id: "00000000000000000000000000000000000000000000000000000000deadbeef"
            .to_string(),
        name: "b".to_string(),
    }
}

#[test]
fn test_s3_object_key() {
    let origin = S3Origin::new(reqwest::Client::new(), s3_source("a"), None);
    assert_eq!(
        origin.object_key(&at_tip(800000, "00ff")),
        "checkpoint-a-brc-20-800000-00ff.json"
    );
    assert_eq!(origin.object_key(&latest()), "checkpoint-a-brc-20-latest.json");
}

#[test]
fn test_s3_virtual_hosted_url() {
    let origin = S3Origin::new(reqwest::Client::new(), s3_source("a"), None);
    let url = origin.object_url("checkpoint-a-brc-20-latest.json").unwrap();
    assert_eq!(
        url.as_str(),
        "https://a-checkpoints.s3.us-west-2.amazonaws.com/checkpoint-a-brc-20-latest.json"
    );
}

#[test]
fn test_s3_path_style_url() {
    let endpoint = Url::parse("http://127.0.0.1:9000/").unwrap();
    let origin = S3Origin::new(reqwest::Client::new(), s3_source("a"), Some(endpoint));
    let url = origin.object_url("checkpoint-a-brc-20-latest.json").unwrap();
    assert_eq!(
        url.as_str(),
        "http://127.0.0.1:9000/a-checkpoints/checkpoint-a-brc-20-latest.json"
    );
}

#[test]
fn test_da_blob_url() {
    let gateway = Url::parse("https://gateway.example/v1/").unwrap();
    let origin = DaOrigin::new(reqwest::Client::new(), namespace("celestia"), Some(gateway));

    let url = origin.blob_url(&at_tip(800000, "00ff")).unwrap();
    assert_eq!(
        url.as_str(),
        "https://gateway.example/v1/namespaces/\
         00000000000000000000000000000000000000000000000000000000deadbeef/checkpoints/800000/00ff\
         ?name=b&metaProtocol=brc-20&since=799990"
    );

    let url = origin.blob_url(&latest()).unwrap();
    assert!(url.path().ends_with("/checkpoints/latest"));
    assert_eq!(url.query(), Some("name=b&metaProtocol=brc-20"));
}

#[tokio::test]
async fn test_da_unknown_network() {
    let origin = DaOrigin::new(reqwest::Client::new(), namespace("avail"), None);
    assert_eq!(
        origin.fetch(&latest()).await.unwrap_err(),
        FetchError::UnknownNetwork("avail".to_string())
    );
}

#[tokio::test]
async fn test_s3_fetch_from_endpoint() {
    let server = DocumentServer::new();
    let document = DocumentBuilder::new("a", 800000).build();
    server.put(
        "/a-checkpoints/checkpoint-a-brc-20-800000-00ff.json",
        document.clone(),
    );
    let addr = server.spawn();

    let origin = S3Origin::new(reqwest::Client::new(), s3_source("a"), Some(base_url(addr)));
    let body = origin.fetch(&at_tip(800000, "00ff")).await.unwrap();
    assert_eq!(body.as_ref(), document.as_slice());
    assert_eq!(
        server.requests(),
        vec!["/a-checkpoints/checkpoint-a-brc-20-800000-00ff.json".to_string()]
    );
}

#[tokio::test]
async fn test_s3_fetch_errors() {
    let server = DocumentServer::new();
    server.respond(
        "/a-checkpoints/checkpoint-a-brc-20-latest.json",
        StatusCode::INTERNAL_SERVER_ERROR,
        b"oops".to_vec(),
    );
    server.put("/b-checkpoints/checkpoint-b-brc-20-latest.json", Vec::new());
    let addr = server.spawn();
    let endpoint = Some(base_url(addr));

    let origin = S3Origin::new(reqwest::Client::new(), s3_source("a"), endpoint.clone());
    assert!(matches!(
        origin.fetch(&latest()).await,
        Err(FetchError::Status { status: 500, .. })
    ));

    let origin = S3Origin::new(reqwest::Client::new(), s3_source("b"), endpoint.clone());
    assert!(matches!(
        origin.fetch(&latest()).await,
        Err(FetchError::Malformed(_))
    ));

    let origin = S3Origin::new(reqwest::Client::new(), s3_source("c"), endpoint);
    assert!(matches!(
        origin.fetch(&latest()).await,
        Err(FetchError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_s3_fetch_unreachable() {
    // Nothing listens on the discard port.
    let endpoint = Url::parse("http://127.0.0.1:9/").unwrap();
    let origin = S3Origin::new(reqwest::Client::new(), s3_source("a"), Some(endpoint));
    assert!(matches!(
        origin.fetch(&latest()).await,
        Err(FetchError::Unreachable(_))
    ));
}

#[tokio::test]
async fn test_da_fetch_through_gateway() {
    let server = DocumentServer::new();
    let document = DocumentBuilder::new("b", 800000).build();
    server.put(
        "/namespaces/00000000000000000000000000000000000000000000000000000000deadbeef/checkpoints/latest",
        document.clone(),
    );
    let addr = server.spawn();

    let origin = DaOrigin::new(
        reqwest::Client::new(),
        namespace("celestia"),
        Some(base_url(addr)),
    );
    let body = origin.fetch(&latest()).await.unwrap();
    assert_eq!(body.as_ref(), document.as_slice());
    assert!(server.requests()[0].ends_with("?name=b&metaProtocol=brc-20"));
}

#[tokio::test]
async fn test_fetch_all_isolates_slow_source() {
    let fast = MockSource::s3("a");
    fast.set_document(DocumentBuilder::new("a", 800000).build());
    let slow = MockSource::s3("b");
    slow.set_document(DocumentBuilder::new("b", 800000).build());
    slow.set_delay(Duration::from_secs(5));
    let failing = MockSource::s3("c");
    failing.set_error(FetchError::Unreachable("connection refused".to_string()));

    let origins: Vec<Arc<dyn CheckpointSourceInterface>> =
        vec![fast.clone(), slow.clone(), failing.clone()];
    let fetcher = Fetcher::new(origins, Duration::from_millis(100));

    let request = at_tip(800000, "00ff");
    let outcomes = fetcher.fetch_all(&request).await;
    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes[0].source, CommitteeSource::S3(s3_source("a")));
    assert!(outcomes[0].result.is_ok());
    assert_eq!(
        outcomes[1].result,
        Err(FetchError::Timeout(Duration::from_millis(100)))
    );
    assert_eq!(
        outcomes[2].result,
        Err(FetchError::Unreachable("connection refused".to_string()))
    );

    assert_eq!(fast.calls(), 1);
    assert_eq!(slow.last_request(), Some(request));
}

#[test]
fn test_from_config_skips_denied_sources() {
    let mut config = test_config(&["a", "b", "c"], "http://127.0.0.1:8332");
    config.committee_indexers.da.push(namespace("celestia"));
    config.fetcher.da_gateways = BTreeMap::from([(
        "celestia".to_string(),
        Url::parse("https://gateway.example/").unwrap(),
    )]);

    let fetcher = Fetcher::from_config(&config, |source| source.committee() == "c").unwrap();
    let committees: Vec<&str> = fetcher.sources().map(|source| source.committee()).collect();
    assert_eq!(committees, vec!["a", "b", "b"]);
    assert!(!fetcher.is_empty());

    let fetcher = Fetcher::from_config(&config, |_| true).unwrap();
    assert!(fetcher.is_empty());
}
