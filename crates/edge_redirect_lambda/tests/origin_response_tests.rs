use std::sync::Mutex;

use edge_redirect_core::contract::PrefixListing;
use edge_redirect_lambda::adapters::object_store::PrefixLister;
use edge_redirect_lambda::handlers::origin_response::{handle_origin_response, HandlerError};
use serde_json::{json, Value};

const FORBIDDEN_EVENT: &str = include_str!("fixtures/origin_response_forbidden.json");

/// In-memory bucket answering prefix listings the way S3 does with a `/`
/// delimiter.
struct InMemoryBucket {
    keys: Vec<&'static str>,
    prefixes_seen: Mutex<Vec<String>>,
}

impl InMemoryBucket {
    fn with_keys(keys: &[&'static str]) -> Self {
        Self {
            keys: keys.to_vec(),
            prefixes_seen: Mutex::new(Vec::new()),
        }
    }

    fn prefixes_seen(&self) -> Vec<String> {
        self.prefixes_seen.lock().expect("poisoned mutex").clone()
    }
}

impl PrefixLister for InMemoryBucket {
    fn list_prefix(&self, prefix: &str, delimiter: &str) -> Result<PrefixListing, String> {
        self.prefixes_seen
            .lock()
            .expect("poisoned mutex")
            .push(prefix.to_string());

        let mut listing = PrefixListing::default();
        for key in self.keys.iter().filter(|key| key.starts_with(prefix)) {
            let rest = &key[prefix.len()..];
            match rest.find(delimiter) {
                Some(index) => {
                    let common = format!("{prefix}{}", &rest[..index + delimiter.len()]);
                    if !listing.common_prefixes.contains(&common) {
                        listing.common_prefixes.push(common);
                    }
                }
                None => listing.contents.push(key.to_string()),
            }
        }
        Ok(listing)
    }
}

struct UnreachableBucket;

impl PrefixLister for UnreachableBucket {
    fn list_prefix(&self, _prefix: &str, _delimiter: &str) -> Result<PrefixListing, String> {
        Err("failed to list s3 prefix: dispatch failure: timeout".to_string())
    }
}

fn forbidden_event() -> Value {
    serde_json::from_str(FORBIDDEN_EVENT).expect("fixture should parse")
}

#[test]
fn redirects_directory_prefix_from_cloudfront_event() {
    let bucket = InMemoryBucket::with_keys(&[
        "releases/v2+1/index.html",
        "releases/v2+1/notes.txt",
        "releases/v3/index.html",
    ]);

    let value = handle_origin_response(forbidden_event(), &bucket).expect("handler succeeds");

    assert_eq!(bucket.prefixes_seen(), vec!["releases/v2+1".to_string()]);
    assert_eq!(value["status"], json!("302"));
    assert_eq!(value["statusDescription"], json!("Found"));
    assert_eq!(value["body"], json!(""));
    assert_eq!(
        value["headers"]["location"],
        json!([{ "key": "Location", "value": "/releases/v2%2B1/" }])
    );
    assert_eq!(value["headers"]["server"][0]["value"], json!("AmazonS3"));
}

#[test]
fn missing_object_passes_original_response_through() {
    let bucket = InMemoryBucket::with_keys(&["releases/v3/index.html"]);
    let event = forbidden_event();

    let response = handle_origin_response(event.clone(), &bucket).expect("handler succeeds");

    assert_eq!(response, event["Records"][0]["cf"]["response"]);
}

#[test]
fn null_body_from_origin_is_passed_through_verbatim() {
    let bucket = InMemoryBucket::with_keys(&[]);
    let mut event = forbidden_event();
    event["Records"][0]["cf"]["response"]["body"] = Value::Null;

    let response = handle_origin_response(event.clone(), &bucket).expect("handler succeeds");

    assert_eq!(
        serde_json::to_string(&response).expect("response serializes"),
        serde_json::to_string(&event["Records"][0]["cf"]["response"]).expect("input serializes")
    );
}

#[test]
fn sibling_key_sharing_the_prefix_still_counts() {
    // S3 prefixes are plain string matches, so `releases/v2+1.tar.gz` is a
    // content entry under `releases/v2+1`.
    let bucket = InMemoryBucket::with_keys(&["releases/v2+1.tar.gz"]);

    let response = handle_origin_response(forbidden_event(), &bucket).expect("handler succeeds");

    assert_eq!(response["status"], json!("302"));
}

#[test]
fn repeated_invocations_give_the_same_answer() {
    let bucket = InMemoryBucket::with_keys(&["releases/v2+1/index.html"]);

    let first = handle_origin_response(forbidden_event(), &bucket).expect("first succeeds");
    let second = handle_origin_response(forbidden_event(), &bucket).expect("second succeeds");

    assert_eq!(first, second);
    assert_eq!(bucket.prefixes_seen().len(), 2);
}

#[test]
fn unreachable_backend_fails_instead_of_passing_through() {
    let error = handle_origin_response(forbidden_event(), &UnreachableBucket)
        .expect_err("backend failure must not be masked");

    match error {
        HandlerError::Listing { prefix, message } => {
            assert_eq!(prefix, "releases/v2+1");
            assert!(message.contains("timeout"));
        }
        other => panic!("unexpected error: {other}"),
    }
}
