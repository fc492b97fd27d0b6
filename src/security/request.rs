//! Credential extraction from request headers.

use axum::http::{
    header::{AUTHORIZATION, COOKIE},
    HeaderMap,
};

pub const TOKEN_COOKIE_NAME: &str = "token";
const USER_EMAIL_HEADER: &str = "x-user-email";

/// Token from the `Authorization: Bearer` header, falling back to the `token` cookie.
#[must_use]
pub fn token_from(headers: &HeaderMap) -> Option<String> {
    bearer_token(headers).or_else(|| cookie_token(headers))
}

/// Token from the `token` cookie, falling back to the `Authorization` header.
#[must_use]
pub fn token_from_cookie_first(headers: &HeaderMap) -> Option<String> {
    cookie_token(headers).or_else(|| bearer_token(headers))
}

pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(char::is_whitespace)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

pub(crate) fn cookie_token(headers: &HeaderMap) -> Option<String> {
    for header in headers.get_all(COOKIE) {
        let Ok(value) = header.to_str() else {
            continue;
        };
        for pair in value.split(';') {
            let mut parts = pair.trim().splitn(2, '=');
            let key = parts.next().map(str::trim);
            let val = parts.next().map(str::trim);
            if let (Some(TOKEN_COOKIE_NAME), Some(val)) = (key, val) {
                if !val.is_empty() {
                    return Some(val.to_string());
                }
            }
        }
    }
    None
}

/// Strip surrounding whitespace and one pair of double quotes.
#[must_use]
pub fn unquote(token: &str) -> &str {
    let trimmed = token.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .map_or(trimmed, str::trim)
}

/// Email asserted by the `x-user-email` header, if any.
#[must_use]
pub fn user_email_from(headers: &HeaderMap) -> Option<String> {
    headers
        .get(USER_EMAIL_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|email| !email.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        headers.insert(COOKIE, HeaderValue::from_static("token=def"));
        assert_eq!(token_from(&headers), Some("abc".to_string()));
        assert_eq!(token_from_cookie_first(&headers), Some("def".to_string()));
    }

    #[test]
    fn cookie_is_found_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("language=en; token=xyz; welcomebanner_status=dismiss"),
        );
        assert_eq!(token_from(&headers), Some("xyz".to_string()));
    }

    #[test]
    fn other_schemes_and_empty_values_are_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));
        assert_eq!(token_from(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        headers.insert(COOKIE, HeaderValue::from_static("token="));
        assert_eq!(token_from(&headers), None);
    }

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        for value in ["BEARER abc", "BeArEr abc", "bearer  abc "] {
            headers.insert(AUTHORIZATION, HeaderValue::from_static(value));
            assert_eq!(token_from(&headers), Some("abc".to_string()), "{value}");
        }

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearerabc"));
        assert_eq!(token_from(&headers), None);
    }

    #[test]
    fn similar_cookie_names_do_not_match() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("mytoken=abc; token2=def"));
        assert_eq!(token_from(&headers), None);
    }

    #[test]
    fn unquote_strips_quotes_and_whitespace() {
        assert_eq!(unquote("  \"abc\" "), "abc");
        assert_eq!(unquote("abc"), "abc");
        assert_eq!(unquote("\"abc"), "\"abc");
        assert_eq!(unquote(""), "");
    }

    #[test]
    fn user_email_header_is_trimmed() {
        let mut headers = HeaderMap::new();
        assert_eq!(user_email_from(&headers), None);
        headers.insert(USER_EMAIL_HEADER, HeaderValue::from_static(" a@b.c "));
        assert_eq!(user_email_from(&headers), Some("a@b.c".to_string()));
    }
}
