//! Cookie transport for the session token pair.

use axum::http::{header, HeaderMap};
use spendwise_auth::RefreshedToken;

pub const ACCESS_COOKIE: &str = "accessToken";
pub const REFRESH_COOKIE: &str = "refreshToken";

/// Scope of both session cookies.
pub const COOKIE_PATH: &str = "/api";

/// Value of the named cookie across all `Cookie` headers.
pub fn find(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().to_string())
}

/// `Set-Cookie` value re-attaching a refreshed access token.
pub fn refreshed_access(refreshed: &RefreshedToken) -> String {
    format!(
        "{}={}; HttpOnly; Path={}; Max-Age={}; SameSite=None; Secure",
        ACCESS_COOKIE,
        refreshed.raw,
        COOKIE_PATH,
        refreshed.ttl.num_seconds()
    )
}

/// `Set-Cookie` value that clears `name`.
pub fn cleared(name: &str) -> String {
    format!("{name}=; HttpOnly; Path={COOKIE_PATH}; Max-Age=0; SameSite=None; Secure")
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;
    use chrono::Duration;

    use super::*;

    #[test]
    fn finds_cookies_across_headers() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("theme=dark; accessToken=aaa"));
        headers.append(header::COOKIE, HeaderValue::from_static("refreshToken=rrr"));

        assert_eq!(find(&headers, ACCESS_COOKIE).as_deref(), Some("aaa"));
        assert_eq!(find(&headers, REFRESH_COOKIE).as_deref(), Some("rrr"));
        assert_eq!(find(&headers, "missing"), None);
    }

    #[test]
    fn cookie_names_must_match_exactly() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("xaccessToken=nope"));
        assert_eq!(find(&headers, ACCESS_COOKIE), None);
    }

    #[test]
    fn refreshed_cookie_carries_transport_flags() {
        let cookie = refreshed_access(&RefreshedToken {
            raw: "tok".to_string(),
            ttl: Duration::hours(1),
            notice: spendwise_auth::REFRESH_NOTICE,
        });
        assert_eq!(
            cookie,
            "accessToken=tok; HttpOnly; Path=/api; Max-Age=3600; SameSite=None; Secure"
        );
    }
}
