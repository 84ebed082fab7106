use axum::{
    extract::Request,
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use biblib_model::AbsoluteUid;
use tracing::debug;

/// Absolute identity of the caller, set by the gateway.
pub const USER_ID_HEADER: &str = "x-adsws-uid";
/// Rate-limit multiplier granted to the caller by the gateway.
pub const RATE_LIMIT_LEVEL_HEADER: &str = "x-adsws-ratelimit-level";

/// Caller details lifted from gateway headers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestContext {
    pub identity: Option<AbsoluteUid>,
    pub rate_limit_level: Option<f64>,
    pub authorization: Option<String>,
}

impl RequestContext {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let header_str =
            |name: &str| headers.get(name).and_then(|value| value.to_str().ok());

        let identity = header_str(USER_ID_HEADER).and_then(|raw| {
            match raw.trim().parse::<AbsoluteUid>() {
                Ok(uid) => Some(uid),
                Err(_) => {
                    debug!(value = raw, "ignoring unparseable user id header");
                    None
                }
            }
        });

        let rate_limit_level = header_str(RATE_LIMIT_LEVEL_HEADER)
            .and_then(|raw| raw.trim().parse::<f64>().ok());

        let authorization =
            header_str(header::AUTHORIZATION.as_str()).map(str::to_string);

        Self {
            identity,
            rate_limit_level,
            authorization,
        }
    }
}

/// Attach a [`RequestContext`] to every request.
pub async fn request_context_middleware(
    mut request: Request,
    next: Next,
) -> Response {
    let context = RequestContext::from_headers(request.headers());
    request.extensions_mut().insert(context);
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn reads_gateway_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("42"));
        headers.insert(RATE_LIMIT_LEVEL_HEADER, HeaderValue::from_static("2.5"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));

        let context = RequestContext::from_headers(&headers);
        assert_eq!(context.identity, Some(AbsoluteUid(42)));
        assert_eq!(context.rate_limit_level, Some(2.5));
        assert_eq!(context.authorization.as_deref(), Some("Bearer abc"));
    }

    #[test]
    fn garbage_identity_is_anonymous() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("not-a-number"));
        headers.insert(RATE_LIMIT_LEVEL_HEADER, HeaderValue::from_static("lots"));

        let context = RequestContext::from_headers(&headers);
        assert_eq!(context, RequestContext::default());
    }
}
