use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const FORBIDDEN_STATUS: u16 = 403;
pub const FOUND_STATUS: u16 = 302;
pub const FOUND_DESCRIPTION: &str = "Found";
pub const LISTING_DELIMITER: &str = "/";

/// Lower-cased header name mapped to the CloudFront `{key, value}` entries.
pub type Headers = BTreeMap<String, Vec<HeaderEntry>>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HeaderEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub value: String,
}

impl HeaderEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OriginResponseEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<EventRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cf: Option<CloudFrontPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CloudFrontPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<CfConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<CfRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<CfResponse>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CfConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distribution_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CfRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default)]
    pub headers: Headers,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The origin response as CloudFront hands it over. Fields this crate does
/// not touch are kept in `extra` so they serialize back unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CfResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusField>,
    #[serde(
        rename = "statusDescription",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub status_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Headers>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// CloudFront sends the status as a string, test harnesses often send a
/// number. The original representation is kept on write-back.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum StatusField {
    Number(u16),
    Text(String),
}

impl StatusField {
    pub fn code(&self) -> Result<u16, ValidationError> {
        match self {
            Self::Number(code) => Ok(*code),
            Self::Text(text) => text.trim().parse::<u16>().map_err(|_| {
                ValidationError::new(format!("response status must be numeric, got {text:?}"))
            }),
        }
    }

    pub fn with_code(&self, code: u16) -> Self {
        match self {
            Self::Number(_) => Self::Number(code),
            Self::Text(_) => Self::Text(code.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PrefixListing {
    pub common_prefixes: Vec<String>,
    pub contents: Vec<String>,
}

impl PrefixListing {
    pub fn is_empty(&self) -> bool {
        self.common_prefixes.is_empty() && self.contents.is_empty()
    }

    pub fn entry_count(&self) -> usize {
        self.common_prefixes.len() + self.contents.len()
    }
}

/// The fields the redirect decision reads, pulled out of the event once,
/// plus the response that will be returned.
#[derive(Debug, Clone, PartialEq)]
pub struct OriginExchange {
    pub uri: String,
    pub status: u16,
    pub host: String,
    pub config: CfConfig,
    pub response: CfResponse,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {}

impl OriginResponseEvent {
    /// Extracts the first record's request and response, failing with a
    /// message naming the first missing or malformed field.
    pub fn into_exchange(self) -> Result<OriginExchange, ValidationError> {
        let record = self
            .records
            .into_iter()
            .next()
            .ok_or_else(|| ValidationError::new("event must contain at least one record"))?;
        let payload = record
            .cf
            .ok_or_else(|| ValidationError::new("event record is missing `cf`"))?;
        let request = payload
            .request
            .ok_or_else(|| ValidationError::new("event record is missing `cf.request`"))?;
        let response = payload
            .response
            .ok_or_else(|| ValidationError::new("event record is missing `cf.response`"))?;

        let uri = request
            .uri
            .ok_or_else(|| ValidationError::new("request is missing `uri`"))?;
        if !uri.starts_with('/') {
            return Err(ValidationError::new(format!(
                "request uri must start with '/', got {uri:?}"
            )));
        }

        let host = request
            .headers
            .get("host")
            .and_then(|entries| entries.first())
            .map(|entry| entry.value.trim())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ValidationError::new("request is missing a `host` header"))?
            .to_string();

        let status = response
            .status
            .as_ref()
            .ok_or_else(|| ValidationError::new("response is missing `status`"))?
            .code()?;

        Ok(OriginExchange {
            uri,
            status,
            host,
            config: payload.config.unwrap_or_default(),
            response,
        })
    }
}
