//! Redirect decision for "not found" origin responses.
//!
//! S3 answers 403 rather than 404 for a missing key when the caller may not
//! list the bucket. A 403 on a path that has objects beneath it means the
//! client asked for a directory without its trailing slash.

use percent_encoding::percent_decode_str;

use crate::contract::{
    CfResponse, HeaderEntry, OriginExchange, StatusField, FORBIDDEN_STATUS, FOUND_DESCRIPTION,
    FOUND_STATUS,
};

const INDEX_SUFFIX: &str = "/index.html";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassReason {
    NotForbidden,
    DirectoryShaped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectPlan {
    PassThrough(PassReason),
    Probe { prefix: String },
}

pub fn plan(exchange: &OriginExchange) -> RedirectPlan {
    if exchange.status != FORBIDDEN_STATUS {
        return RedirectPlan::PassThrough(PassReason::NotForbidden);
    }
    if is_directory_shaped(&exchange.uri) {
        return RedirectPlan::PassThrough(PassReason::DirectoryShaped);
    }
    RedirectPlan::Probe {
        prefix: listing_prefix(&exchange.uri),
    }
}

/// Paths that already resolve to an index document.
pub fn is_directory_shaped(uri: &str) -> bool {
    uri.ends_with('/') || uri.ends_with(INDEX_SUFFIX)
}

/// Object key prefix for a request path: literal leading `/` removed, then
/// percent-decoded, so an encoded `%2F` survives as part of the key. Broken
/// escapes stay literal and `+` is not a space.
pub fn listing_prefix(uri: &str) -> String {
    percent_decode_str(uri.trim_start_matches('/'))
        .decode_utf8_lossy()
        .into_owned()
}

/// Redirect target: the still-encoded path with a trailing slash. Only the
/// path is emitted so the client stays on the host it asked for.
pub fn redirect_location(uri: &str) -> String {
    format!("{uri}/")
}

pub fn apply_redirect(response: &mut CfResponse, location: &str) {
    response.status = Some(match &response.status {
        Some(status) => status.with_code(FOUND_STATUS),
        None => StatusField::Number(FOUND_STATUS),
    });
    response.status_description = Some(FOUND_DESCRIPTION.to_string());
    response.body = Some(String::new());
    response
        .headers
        .get_or_insert_with(Default::default)
        .insert(
            "location".to_string(),
            vec![HeaderEntry::new("Location", location)],
        );
}
