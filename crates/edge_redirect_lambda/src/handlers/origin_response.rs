use std::time::Instant;

use edge_redirect_core::contract::{OriginResponseEvent, ValidationError, LISTING_DELIMITER};
use edge_redirect_core::redirect::{apply_redirect, plan, redirect_location, RedirectPlan};
use serde_json::{json, Value};

use crate::adapters::object_store::PrefixLister;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    MalformedEvent(ValidationError),
    Listing { prefix: String, message: String },
    Serialization(String),
}

impl std::fmt::Display for HandlerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedEvent(error) => write!(f, "malformed origin-response event: {error}"),
            Self::Listing { prefix, message } => {
                write!(f, "listing prefix {prefix:?} failed: {message}")
            }
            Self::Serialization(message) => {
                write!(f, "failed to serialize redirect response: {message}")
            }
        }
    }
}

impl std::error::Error for HandlerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::MalformedEvent(error) => Some(error),
            Self::Listing { .. } | Self::Serialization(_) => None,
        }
    }
}

/// Returns the event's origin response, turned into a `302` to `uri + "/"`
/// when S3 said 403 for a path that has objects beneath it. Any other
/// outcome hands back the response JSON exactly as it arrived.
pub fn handle_origin_response(
    event: Value,
    lister: &dyn PrefixLister,
) -> Result<Value, HandlerError> {
    let original_response = event.pointer("/Records/0/cf/response").cloned();
    let event = serde_json::from_value::<OriginResponseEvent>(event)
        .map_err(|error| reject(ValidationError::new(error.to_string())))?;
    let mut exchange = event.into_exchange().map_err(reject)?;
    let original_response = original_response.ok_or_else(|| {
        reject(ValidationError::new("event record is missing `cf.response`"))
    })?;

    let prefix = match plan(&exchange) {
        RedirectPlan::PassThrough(_) => return Ok(original_response),
        RedirectPlan::Probe { prefix } => prefix,
    };

    let started_at = Instant::now();
    let listing = match lister.list_prefix(&prefix, LISTING_DELIMITER) {
        Ok(value) => value,
        Err(message) => {
            log_redirect_error(
                "listing_failed",
                json!({
                    "request_id": exchange.config.request_id.clone(),
                    "event_type": exchange.config.event_type.clone(),
                    "uri": exchange.uri.clone(),
                    "prefix": prefix.clone(),
                    "duration_ms": started_at.elapsed().as_millis(),
                    "error": message.clone(),
                }),
            );
            return Err(HandlerError::Listing { prefix, message });
        }
    };

    if listing.is_empty() {
        log_redirect_info(
            "listing_empty",
            json!({
                "request_id": exchange.config.request_id.clone(),
                "event_type": exchange.config.event_type.clone(),
                "uri": exchange.uri.clone(),
                "prefix": prefix,
                "duration_ms": started_at.elapsed().as_millis(),
            }),
        );
        return Ok(original_response);
    }

    let location = redirect_location(&exchange.uri);
    apply_redirect(&mut exchange.response, &location);
    log_redirect_info(
        "redirect_issued",
        json!({
            "request_id": exchange.config.request_id.clone(),
            "distribution_id": exchange.config.distribution_id.clone(),
            "event_type": exchange.config.event_type.clone(),
            "host": exchange.host.clone(),
            "uri": exchange.uri.clone(),
            "prefix": prefix,
            "location": location,
            "entries_seen": listing.entry_count(),
            "duration_ms": started_at.elapsed().as_millis(),
        }),
    );
    serde_json::to_value(&exchange.response)
        .map_err(|error| HandlerError::Serialization(error.to_string()))
}

fn reject(error: ValidationError) -> HandlerError {
    log_redirect_error("event_rejected", json!({ "error": error.message() }));
    HandlerError::MalformedEvent(error)
}

fn log_redirect_info(event: &str, details: Value) {
    eprintln!(
        "{}",
        json!({
            "component": "directory_redirect",
            "event": event,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}

fn log_redirect_error(event: &str, details: Value) {
    eprintln!(
        "{}",
        json!({
            "component": "directory_redirect",
            "level": "error",
            "event": event,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}
