//! Request handling and transformation.
//!
//! # Responsibilities
//! - Buffer the inbound request so every attempt can replay it
//! - Strip hop-by-hop headers and append X-Forwarded-For
//! - Rewrite the URI onto the selected backend endpoint
//!
//! # Design Decisions
//! - Body size is bounded before anything is forwarded
//! - Original request is consumed once; each attempt gets a fresh copy
//! - Host header is dropped so the client sets it from the backend authority

use axum::body::{Body, Bytes};
use axum::http::{
    header::{self, HeaderMap, HeaderName, HeaderValue},
    Method, Request, Uri, Version,
};
use std::net::IpAddr;
use thiserror::Error;
use url::Url;

use crate::http::upstream::ForwardError;

pub static X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

const HOP_BY_HOP: [&str; 9] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("request body exceeds {limit} bytes or could not be read")]
    Body { limit: usize },
}

/// Inbound request buffered for replay across attempts.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
}

impl ProxyRequest {
    /// Consume an inbound request, reading at most `limit` body bytes.
    pub async fn from_incoming(
        request: Request<Body>,
        client_ip: Option<IpAddr>,
        limit: usize,
    ) -> Result<Self, RequestError> {
        let (parts, body) = request.into_parts();
        let body = axum::body::to_bytes(body, limit)
            .await
            .map_err(|_| RequestError::Body { limit })?;

        let mut headers = parts.headers;
        strip_hop_by_hop(&mut headers);
        headers.remove(header::HOST);
        if let Some(ip) = client_ip {
            append_forwarded_for(&mut headers, ip);
        }

        Ok(Self {
            method: parts.method,
            uri: parts.uri,
            headers,
            body,
        })
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Fresh request for one forward attempt.
    pub fn build(&self) -> Request<Body> {
        let mut request = Request::new(Body::from(self.body.clone()));
        *request.method_mut() = self.method.clone();
        *request.uri_mut() = self.uri.clone();
        *request.version_mut() = Version::HTTP_11;
        *request.headers_mut() = self.headers.clone();
        request
    }
}

impl From<Request<Bytes>> for ProxyRequest {
    fn from(request: Request<Bytes>) -> Self {
        let (parts, body) = request.into_parts();
        Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
        }
    }
}

/// Remove connection-scoped headers, including any named in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in named {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

fn append_forwarded_for(headers: &mut HeaderMap, ip: IpAddr) {
    let value = match headers.get(&X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(prior) => format!("{prior}, {ip}"),
        None => ip.to_string(),
    };
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(X_FORWARDED_FOR.clone(), value);
    }
}

/// Map a client-facing URI onto `endpoint`, joining paths and queries.
pub fn target_uri(endpoint: &Url, original: &Uri) -> Result<Uri, ForwardError> {
    let host = endpoint
        .host_str()
        .ok_or_else(|| ForwardError::InvalidRequest(format!("{endpoint} has no host")))?;
    let authority = match endpoint.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };

    let base = endpoint.path().trim_end_matches('/');
    let path = original.path();
    let mut target = if path.starts_with('/') {
        format!("{}://{}{}{}", endpoint.scheme(), authority, base, path)
    } else {
        format!("{}://{}{}/{}", endpoint.scheme(), authority, base, path)
    };

    match (endpoint.query(), original.query()) {
        (Some(a), Some(b)) => target.push_str(&format!("?{a}&{b}")),
        (Some(q), None) | (None, Some(q)) => target.push_str(&format!("?{q}")),
        (None, None) => {}
    }

    target
        .parse()
        .map_err(|e| ForwardError::InvalidRequest(format!("{target}: {e}")))
}
