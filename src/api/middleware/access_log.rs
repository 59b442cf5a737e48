//! Access log middleware
//!
//! Writes one combined-log-format line per completed request to the
//! application log file:
//!
//! ```text
//! 127.0.0.1 - - [10/Oct/2000:13:55:36 +0000] "GET /health HTTP/1.1" 200 7 "-" "curl/8.0"
//! ```

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, HeaderMap, Method, Request, Version},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};

use super::finish::on_finish;
use crate::AppState;

/// One request/response pair in combined log format
#[derive(Debug, Clone)]
pub struct AccessLogEntry {
    pub remote_addr: Option<IpAddr>,
    pub timestamp: DateTime<Utc>,
    pub method: Method,
    /// Path and query as received
    pub url: String,
    pub version: Version,
    pub status: u16,
    /// `None` renders as `-`
    pub response_bytes: Option<u64>,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
}

impl fmt::Display for AccessLogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.remote_addr {
            Some(addr) => write!(f, "{}", addr)?,
            None => f.write_str("-")?,
        }
        write!(
            f,
            " - - [{}] \"{} {} HTTP/{}\" {} ",
            self.timestamp.format("%d/%b/%Y:%H:%M:%S +0000"),
            self.method,
            self.url,
            http_version(self.version),
            self.status,
        )?;
        match self.response_bytes {
            Some(bytes) => write!(f, "{}", bytes)?,
            None => f.write_str("-")?,
        }
        write!(
            f,
            " \"{}\" \"{}\"",
            self.referrer.as_deref().unwrap_or("-"),
            self.user_agent.as_deref().unwrap_or("-"),
        )
    }
}

fn http_version(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2.0",
        Version::HTTP_3 => "3.0",
        _ => "1.1",
    }
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

/// Middleware writing the access log line once the response is sent
pub async fn access_log_middleware(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let method = request.method().clone();
    let url = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let version = request.version();
    let headers = request.headers();
    let referrer = header_str(headers, "referer").or_else(|| header_str(headers, "referrer"));
    let user_agent = header_str(headers, header::USER_AGENT.as_str());

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let content_length = response
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    let logger = state.logger.clone();

    on_finish(response, move |bytes_sent| {
        let response_bytes = match (bytes_sent, content_length) {
            (0, None) => None,
            (0, Some(len)) => Some(len),
            (sent, _) => Some(sent),
        };
        let entry = AccessLogEntry {
            remote_addr,
            timestamp: Utc::now(),
            method,
            url,
            version,
            status,
            response_bytes,
            referrer,
            user_agent,
        };
        logger.log_line(&entry.to_string());
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_entry() -> AccessLogEntry {
        AccessLogEntry {
            remote_addr: Some("10.0.0.1".parse().unwrap()),
            timestamp: Utc.with_ymd_and_hms(2000, 10, 10, 13, 55, 36).unwrap(),
            method: Method::GET,
            url: "/health".to_string(),
            version: Version::HTTP_11,
            status: 200,
            response_bytes: Some(7),
            referrer: None,
            user_agent: Some("curl/8.0".to_string()),
        }
    }

    #[test]
    fn test_combined_format() {
        assert_eq!(
            sample_entry().to_string(),
            r#"10.0.0.1 - - [10/Oct/2000:13:55:36 +0000] "GET /health HTTP/1.1" 200 7 "-" "curl/8.0""#
        );
    }

    #[test]
    fn test_missing_fields_render_as_dash() {
        let entry = AccessLogEntry {
            remote_addr: None,
            method: Method::POST,
            url: "/nope?x=1".to_string(),
            version: Version::HTTP_10,
            status: 404,
            response_bytes: None,
            user_agent: None,
            ..sample_entry()
        };
        assert_eq!(
            entry.to_string(),
            r#"- - - [10/Oct/2000:13:55:36 +0000] "POST /nope?x=1 HTTP/1.0" 404 - "-" "-""#
        );
    }

    #[test]
    fn test_ipv6_and_referrer() {
        let entry = AccessLogEntry {
            remote_addr: Some("::1".parse().unwrap()),
            version: Version::HTTP_2,
            referrer: Some("http://example.com/".to_string()),
            ..sample_entry()
        };
        assert_eq!(
            entry.to_string(),
            r#"::1 - - [10/Oct/2000:13:55:36 +0000] "GET /health HTTP/2.0" 200 7 "http://example.com/" "curl/8.0""#
        );
    }

    #[test]
    fn test_header_lookup() {
        let mut headers = HeaderMap::new();
        headers.insert(header::REFERER, "http://a/".parse().unwrap());
        assert_eq!(header_str(&headers, "referer").as_deref(), Some("http://a/"));
        assert_eq!(header_str(&headers, "user-agent"), None);
    }
}
