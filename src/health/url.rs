// ABOUTME: Health probe URL construction from the public endpoint and configured path.
// ABOUTME: Endpoints without a scheme are plain HTTP.

use super::ProbeError;
use hyper::Uri;
use std::fmt;

/// A validated plain-HTTP probe target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthUrl {
    uri: Uri,
    host: String,
    port: u16,
}

impl HealthUrl {
    /// Join `endpoint` (e.g. an ALB DNS name) and `path`.
    pub fn build(endpoint: &str, path: &str) -> Result<Self, ProbeError> {
        let endpoint = endpoint.trim().trim_end_matches('/');
        if endpoint.is_empty() {
            return Err(ProbeError::InvalidUrl("empty endpoint".into()));
        }
        let with_scheme = if endpoint.contains("://") {
            endpoint.to_string()
        } else {
            format!("http://{}", endpoint)
        };
        let raw = format!("{}/{}", with_scheme, path.trim_start_matches('/'));
        let uri: Uri = raw
            .parse()
            .map_err(|e| ProbeError::InvalidUrl(format!("{}: {}", raw, e)))?;

        match uri.scheme_str() {
            Some("http") => {}
            Some(other) => return Err(ProbeError::UnsupportedScheme(other.to_string())),
            None => return Err(ProbeError::InvalidUrl(raw)),
        }
        let host = uri
            .host()
            .ok_or_else(|| ProbeError::InvalidUrl(raw.clone()))?
            .to_string();
        let port = uri.port_u16().unwrap_or(80);
        Ok(Self { uri, host, port })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `host[:port]` for the Host header.
    pub fn authority(&self) -> String {
        match self.uri.port_u16() {
            Some(port) => format!("{}:{}", self.host, port),
            None => self.host.clone(),
        }
    }

    /// Path and query for the request line.
    pub fn path_and_query(&self) -> &str {
        self.uri.path_and_query().map(|p| p.as_str()).unwrap_or("/")
    }
}

impl fmt::Display for HealthUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_host_gets_http_scheme() {
        let url = HealthUrl::build("agent-alb-123.ap-northeast-1.elb.amazonaws.com", "/health").unwrap();
        assert_eq!(
            url.to_string(),
            "http://agent-alb-123.ap-northeast-1.elb.amazonaws.com/health"
        );
        assert_eq!(url.port(), 80);
        assert_eq!(url.path_and_query(), "/health");
    }

    #[test]
    fn explicit_port_and_trailing_slash() {
        let url = HealthUrl::build("http://127.0.0.1:8000/", "health").unwrap();
        assert_eq!(url.host(), "127.0.0.1");
        assert_eq!(url.port(), 8000);
        assert_eq!(url.authority(), "127.0.0.1:8000");
        assert_eq!(url.to_string(), "http://127.0.0.1:8000/health");
    }

    #[test]
    fn https_is_rejected() {
        let err = HealthUrl::build("https://api.example.com", "/health").unwrap_err();
        assert!(matches!(err, ProbeError::UnsupportedScheme(s) if s == "https"));
    }

    #[test]
    fn empty_endpoint_is_invalid() {
        assert!(matches!(
            HealthUrl::build("  ", "/health"),
            Err(ProbeError::InvalidUrl(_))
        ));
    }
}
