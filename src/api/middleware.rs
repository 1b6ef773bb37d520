/// Request plumbing shared by the API handlers
use crate::audit::RequestContext;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts, http::HeaderMap};
use std::convert::Infallible;

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer ").map(|t| t.to_string()))
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string())
}

/// Build the audit request context from the incoming request: path, full
/// URL, and whatever the client reports about itself. Never fails.
#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let page = parts.uri.path().to_string();
        let url = match header_string(&parts.headers, "host") {
            Some(host) => format!("http://{}{}", host, parts.uri),
            None => parts.uri.to_string(),
        };

        Ok(RequestContext {
            page,
            url,
            user_agent: header_string(&parts.headers, "user-agent"),
            language: header_string(&parts.headers, "accept-language"),
            platform: header_string(&parts.headers, "x-client-platform"),
            screen_resolution: header_string(&parts.headers, "x-client-screen"),
        })
    }
}
