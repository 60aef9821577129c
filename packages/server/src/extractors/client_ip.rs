use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::HeaderMap, http::request::Parts};

/// Best-effort client address taken from proxy headers.
///
/// Uses the first hop of `X-Forwarded-For`, then `X-Real-IP`. `None` when
/// neither header is present.
pub struct ClientIp(pub Option<String>);

pub fn client_ip_from_headers(headers: &HeaderMap) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    forwarded
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        })
        .map(|ip| ip.chars().take(64).collect())
}

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ClientIp(client_ip_from_headers(&parts.headers)))
    }
}
