//! Session Extractors
//!
//! Axum extractor that turns the session cookie into a [`SessionState`].

use crate::config::IdentityConfig;
use crate::handlers::SharedState;
use crate::session::SessionState;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::COOKIE, request::Parts, HeaderMap},
};

/// Session attached to the current request
///
/// `token` is `None` when the request carried no cookie, an unknown one, or an
/// expired one; the state is then empty.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub token: Option<String>,
    pub state: SessionState,
}

#[async_trait]
impl FromRequestParts<SharedState> for Session {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        app: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = cookie_value(&parts.headers, &app.cookie.name) else {
            return Ok(Session::default());
        };

        match app.sessions.load(&token).await {
            Some(state) => Ok(Session {
                token: Some(token),
                state,
            }),
            None => {
                tracing::debug!("Ignoring unknown session cookie");
                Ok(Session::default())
            }
        }
    }
}

/// Session cookie attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub name: String,
    pub secure: bool,
}

impl SessionCookie {
    pub fn from_config(config: &IdentityConfig) -> Self {
        Self {
            name: config.session_cookie_name.clone(),
            secure: config.session_cookie_secure,
        }
    }

    /// `Set-Cookie` value carrying `token`
    pub fn header_value(&self, token: &str) -> String {
        self.with_attributes(format!("{}={}", self.name, token))
    }

    /// `Set-Cookie` value telling the client to drop the cookie
    pub fn clear_value(&self) -> String {
        self.with_attributes(format!("{}=; Max-Age=0", self.name))
    }

    fn with_attributes(&self, mut cookie: String) -> String {
        cookie.push_str("; Path=/; HttpOnly; SameSite=Lax");
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

/// Value of the cookie called `name`, across all `Cookie` headers
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_cookie_value_finds_named_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("theme=dark; session=abc123; lang=en"));

        assert_eq!(cookie_value(&headers, "session"), Some("abc123".to_string()));
        assert_eq!(cookie_value(&headers, "theme"), Some("dark".to_string()));
        assert_eq!(cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn test_cookie_value_spans_multiple_headers() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("theme=dark"));
        headers.append(COOKIE, HeaderValue::from_static("session=xyz"));

        assert_eq!(cookie_value(&headers, "session"), Some("xyz".to_string()));
    }

    #[test]
    fn test_cookie_value_does_not_match_prefix() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("session_old=1"));

        assert_eq!(cookie_value(&headers, "session"), None);
    }

    #[test]
    fn test_header_value_attributes() {
        let cookie = SessionCookie {
            name: "session".into(),
            secure: false,
        };
        assert_eq!(
            cookie.header_value("tok"),
            "session=tok; Path=/; HttpOnly; SameSite=Lax"
        );

        let secure = SessionCookie {
            secure: true,
            ..cookie
        };
        assert!(secure.header_value("tok").ends_with("; Secure"));
    }

    #[test]
    fn test_clear_value_expires_cookie() {
        let cookie = SessionCookie {
            name: "session".into(),
            secure: true,
        };
        assert_eq!(
            cookie.clear_value(),
            "session=; Max-Age=0; Path=/; HttpOnly; SameSite=Lax; Secure"
        );
    }
}
