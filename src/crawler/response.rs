//! GraphQL search request and response model

use crate::state::QuotaInfo;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};

/// Search document; page size and cursor are passed as variables,
/// a null `after` requests the first page
pub const SEARCH_DOCUMENT: &str = r#"
query SearchRepositories($q: String!, $first: Int!, $after: String) {
  search(query: $q, type: REPOSITORY, first: $first, after: $after) {
    pageInfo {
      hasNextPage
      endCursor
    }
    nodes {
      ... on Repository {
        id
        name
        owner { login }
        stargazerCount
        createdAt
        updatedAt
      }
    }
  }
  rateLimit {
    remaining
    resetAt
  }
}
"#;

#[derive(Debug, Serialize)]
pub struct SearchRequest<'a> {
    pub query: &'static str,
    pub variables: SearchVariables<'a>,
}

#[derive(Debug, Serialize)]
pub struct SearchVariables<'a> {
    pub q: &'a str,
    pub first: u32,
    pub after: Option<&'a str>,
}

impl<'a> SearchRequest<'a> {
    pub fn new(search_text: &'a str, page_size: u32, cursor: Option<&'a str>) -> Self {
        Self {
            query: SEARCH_DOCUMENT,
            variables: SearchVariables {
                q: search_text,
                first: page_size,
                after: cursor,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GraphQlResponse {
    #[serde(default)]
    pub data: Option<ResponseData>,
    #[serde(default)]
    pub errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlError {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ResponseData {
    #[serde(default)]
    pub search: Option<SearchConnection>,
    #[serde(rename = "rateLimit", default)]
    pub rate_limit: Option<RateLimitNode>,
}

#[derive(Debug, Deserialize)]
pub struct SearchConnection {
    #[serde(rename = "pageInfo")]
    pub page_info: PageInfo,
    #[serde(default)]
    pub nodes: Vec<Option<RepositoryNode>>,
}

#[derive(Debug, Deserialize)]
pub struct PageInfo {
    #[serde(rename = "hasNextPage")]
    pub has_next_page: bool,
    #[serde(rename = "endCursor")]
    pub end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RepositoryNode {
    pub id: String,
    pub name: String,
    pub owner: OwnerNode,
    #[serde(rename = "stargazerCount")]
    pub stargazer_count: i64,
    #[serde(rename = "createdAt")]
    pub created_at: Option<String>,
    #[serde(rename = "updatedAt")]
    pub updated_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OwnerNode {
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub struct RateLimitNode {
    pub remaining: u32,
    #[serde(rename = "resetAt")]
    pub reset_at: Option<DateTime<Utc>>,
}

impl From<RateLimitNode> for QuotaInfo {
    fn from(node: RateLimitNode) -> Self {
        QuotaInfo {
            remaining: node.remaining,
            reset_at: node.reset_at,
        }
    }
}

/// Reads quota telemetry from `x-ratelimit-*` response headers
pub fn quota_from_headers(headers: &HeaderMap) -> Option<QuotaInfo> {
    let remaining = headers
        .get("x-ratelimit-remaining")?
        .to_str()
        .ok()?
        .trim()
        .parse::<u32>()
        .ok()?;
    let reset_at = headers
        .get("x-ratelimit-reset")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<i64>().ok())
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single());
    Some(QuotaInfo {
        remaining,
        reset_at,
    })
}

/// Normalized repository payload produced by the page fetcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedRecord {
    pub external_id: String,
    pub owner: String,
    pub name: String,
    pub stars: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FetchedRecord {
    /// `owner/name`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl RepositoryNode {
    /// Converts the node, substituting `fetched_at` for missing or
    /// unparsable timestamps
    pub fn into_record(self, fetched_at: DateTime<Utc>) -> FetchedRecord {
        FetchedRecord {
            created_at: parse_timestamp(self.created_at.as_deref()).unwrap_or(fetched_at),
            updated_at: parse_timestamp(self.updated_at.as_deref()).unwrap_or(fetched_at),
            external_id: self.id,
            owner: self.owner.login,
            name: self.name,
            stars: self.stargazer_count,
        }
    }
}

fn parse_timestamp(value: Option<&str>) -> Option<DateTime<Utc>> {
    let value = value?;
    match DateTime::parse_from_rfc3339(value) {
        Ok(ts) => Some(ts.with_timezone(&Utc)),
        Err(e) => {
            tracing::debug!("Unparsable timestamp '{}': {}", value, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_request_serializes_null_cursor() {
        let request = SearchRequest::new("language:Rust", 100, None);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["variables"]["q"], "language:Rust");
        assert_eq!(json["variables"]["first"], 100);
        assert!(json["variables"]["after"].is_null());
        assert!(json["query"].as_str().unwrap().contains("type: REPOSITORY"));
    }

    #[test]
    fn test_parse_search_response() {
        let body = r#"{
            "data": {
                "search": {
                    "pageInfo": { "hasNextPage": true, "endCursor": "Y3Vyc29yOjEwMA==" },
                    "nodes": [
                        {
                            "id": "R_1",
                            "name": "tokio",
                            "owner": { "login": "tokio-rs" },
                            "stargazerCount": 25000,
                            "createdAt": "2016-08-01T12:00:00Z",
                            "updatedAt": "2024-05-01T08:30:00Z"
                        },
                        null
                    ]
                },
                "rateLimit": { "remaining": 4999, "resetAt": "2024-05-01T09:00:00Z" }
            }
        }"#;

        let response: GraphQlResponse = serde_json::from_str(body).unwrap();
        let data = response.data.unwrap();
        let search = data.search.unwrap();
        assert!(search.page_info.has_next_page);
        assert_eq!(search.page_info.end_cursor.as_deref(), Some("Y3Vyc29yOjEwMA=="));
        assert_eq!(search.nodes.len(), 2);

        let quota: QuotaInfo = data.rate_limit.unwrap().into();
        assert_eq!(quota.remaining, 4999);
        assert!(quota.reset_at.is_some());
    }

    #[test]
    fn test_node_into_record() {
        let node = RepositoryNode {
            id: "R_1".to_string(),
            name: "serde".to_string(),
            owner: OwnerNode {
                login: "serde-rs".to_string(),
            },
            stargazer_count: 9000,
            created_at: Some("2014-12-24T17:49:19Z".to_string()),
            updated_at: Some("not a date".to_string()),
        };
        let fetched_at = Utc::now();
        let record = node.into_record(fetched_at);

        assert_eq!(record.full_name(), "serde-rs/serde");
        assert_eq!(record.created_at.to_rfc3339(), "2014-12-24T17:49:19+00:00");
        assert_eq!(record.updated_at, fetched_at);
    }

    #[test]
    fn test_quota_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("42"));
        headers.insert("x-ratelimit-reset", HeaderValue::from_static("1700000000"));

        let quota = quota_from_headers(&headers).unwrap();
        assert_eq!(quota.remaining, 42);
        assert_eq!(quota.reset_at.unwrap().timestamp(), 1_700_000_000);

        assert!(quota_from_headers(&HeaderMap::new()).is_none());
    }
}
