use http::header::{self, HeaderMap};

use crate::constants;

/// What the decoder needs to know about the HTTP request carrying the body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestInfo {
    content_length: Option<u64>,
    content_type: Option<String>,
    user_agent: Option<String>,
}

impl RequestInfo {
    pub fn new() -> RequestInfo {
        RequestInfo::default()
    }

    /// Collects the content length, content type and user agent from request headers.
    ///
    /// The user agent is taken from the first header whose name contains
    /// `agent`, which also picks up proxies' forwarded agent headers.
    pub fn from_headers(headers: &HeaderMap) -> RequestInfo {
        let content_length = headers
            .get(header::CONTENT_LENGTH)
            .and_then(|val| val.to_str().ok())
            .and_then(|val| val.trim().parse::<u64>().ok());

        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|val| val.to_str().ok())
            .map(|val| val.to_owned());

        let user_agent = headers
            .iter()
            .find(|(name, _)| name.as_str().contains("agent"))
            .and_then(|(_, val)| val.to_str().ok())
            .map(|val| val.to_owned());

        RequestInfo {
            content_length,
            content_type,
            user_agent,
        }
    }

    pub fn content_length(mut self, length: u64) -> RequestInfo {
        self.content_length = Some(length);
        self
    }

    pub fn content_type<T: Into<String>>(mut self, content_type: T) -> RequestInfo {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn user_agent<T: Into<String>>(mut self, user_agent: T) -> RequestInfo {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn declared_length(&self) -> Option<u64> {
        self.content_length
    }

    pub fn get_content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn get_user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    /// Extracts the boundary from a `multipart/form-data; boundary=<token>`
    /// content type. Any other content type yields `None`.
    pub fn boundary(&self) -> Option<String> {
        let content_type = self.content_type.as_deref()?;

        constants::MULTIPART_CONTENT_TYPE_RE
            .captures(content_type.as_bytes())
            .and_then(|cap| cap.get(1))
            .map(|m| String::from_utf8_lossy(m.as_bytes()).into_owned())
    }

    /// Flash and Shockwave uploaders may end the body without a clean terminal boundary.
    pub fn is_legacy_client(&self) -> bool {
        self.user_agent
            .as_deref()
            .map(|agent| {
                constants::LEGACY_AGENT_SIGNATURES
                    .iter()
                    .any(|signature| agent.contains(signature))
            })
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary() {
        let request = RequestInfo::new().content_type("multipart/form-data; boundary=ABCDEFG");
        assert_eq!(request.boundary(), Some("ABCDEFG".to_owned()));

        let request = RequestInfo::new().content_type("multipart/form-data; boundary=------ABCDEFG");
        assert_eq!(request.boundary(), Some("------ABCDEFG".to_owned()));

        let request = RequestInfo::new().content_type("boundary=------ABCDEFG");
        assert_eq!(request.boundary(), None);

        let request = RequestInfo::new().content_type("text/plain; boundary=------ABCDEFG");
        assert_eq!(request.boundary(), None);

        let request = RequestInfo::new().content_type("multipart/form-data;boundary=ABCDEFG");
        assert_eq!(request.boundary(), None);

        assert_eq!(RequestInfo::new().boundary(), None);
    }

    #[test]
    fn test_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_LENGTH, "1234".parse().unwrap());
        headers.insert(header::CONTENT_TYPE, "multipart/form-data; boundary=X".parse().unwrap());
        headers.insert(header::USER_AGENT, "Shockwave Flash".parse().unwrap());

        let request = RequestInfo::from_headers(&headers);
        assert_eq!(request.declared_length(), Some(1234));
        assert_eq!(request.boundary(), Some("X".to_owned()));
        assert_eq!(request.get_user_agent(), Some("Shockwave Flash"));
        assert!(request.is_legacy_client());
    }

    #[test]
    fn test_legacy_client_is_case_sensitive() {
        assert!(RequestInfo::new().user_agent("Adobe Flash Player 11").is_legacy_client());
        assert!(!RequestInfo::new().user_agent("flash").is_legacy_client());
        assert!(!RequestInfo::new().user_agent("Mozilla/5.0").is_legacy_client());
        assert!(!RequestInfo::new().is_legacy_client());
    }
}
