//! Reverse proxy module
//!
//! Forwards a routed request to a plain-HTTP upstream. The upstream sees the
//! internal (rewritten) path; the original client-visible path travels in
//! `X-Original-Path`.

use http_body_util::{BodyExt, Full, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::{self, HeaderMap, HeaderName, HeaderValue};
use hyper::http::request::Parts;
use hyper::{Request, Response, StatusCode, Uri};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::net::IpAddr;
use std::time::Duration;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");
const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");
const X_ORIGINAL_PATH: HeaderName = HeaderName::from_static("x-original-path");

/// Headers that describe a single connection and must not be forwarded
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Upstream failure while proxying
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("failed to build upstream request: {0}")]
    Request(#[from] hyper::http::Error),

    #[error("failed to read request body: {0}")]
    Body(BoxError),

    #[error("upstream request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),

    #[error("upstream did not respond within {0:?}")]
    Timeout(Duration),

    #[error("failed to read upstream response: {0}")]
    ResponseBody(#[from] hyper::Error),
}

impl ProxyError {
    /// Status returned to the client for this failure
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Request(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Body(e) if e.is::<http_body_util::LengthLimitError>() => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            Self::Body(_) => StatusCode::BAD_REQUEST,
            Self::Upstream(_) | Self::ResponseBody(_) => StatusCode::BAD_GATEWAY,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

/// Parsed `http://host[:port][/base]` upstream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upstream {
    authority: String,
    base_path: String,
}

impl Upstream {
    pub fn parse(value: &str) -> Result<Self, String> {
        let url = url::Url::parse(value).map_err(|e| e.to_string())?;
        if url.scheme() != "http" {
            return Err(format!(
                "unsupported scheme '{}', only http is supported",
                url.scheme()
            ));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err("must not carry a query or fragment".to_string());
        }
        let host = url.host_str().ok_or_else(|| "missing host".to_string())?;
        let authority = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };

        Ok(Self {
            authority,
            base_path: url.path().trim_end_matches('/').to_string(),
        })
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Upstream URI for an internal request URI; the query is carried over
    pub fn target_uri(&self, internal: &Uri) -> Result<Uri, hyper::http::Error> {
        let path_and_query = internal.path_and_query().map_or("/", |pq| pq.as_str());
        Uri::builder()
            .scheme("http")
            .authority(self.authority.as_str())
            .path_and_query(format!("{}{path_and_query}", self.base_path))
            .build()
    }
}

/// Client-side facts added as `X-Forwarded-*` headers
#[derive(Debug, Clone, Copy)]
pub struct Forwarded<'a> {
    pub client_ip: IpAddr,
    pub host: &'a str,
    pub original_path: &'a str,
}

/// Shared HTTP client for all proxy routes
#[derive(Clone)]
pub struct ProxyClient {
    client: Client<HttpConnector, Full<Bytes>>,
    timeout: Duration,
}

impl ProxyClient {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder(TokioExecutor::new()).build_http();
        Self { client, timeout }
    }

    /// Forward a request and buffer the upstream response
    pub async fn forward<B>(
        &self,
        upstream: &Upstream,
        parts: &Parts,
        body: B,
        internal_uri: &Uri,
        forwarded: &Forwarded<'_>,
        max_body_size: u64,
    ) -> Result<Response<Full<Bytes>>, ProxyError>
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let limit = usize::try_from(max_body_size).unwrap_or(usize::MAX);
        let body = Limited::new(body, limit)
            .collect()
            .await
            .map_err(ProxyError::Body)?
            .to_bytes();

        let mut builder = Request::builder()
            .method(parts.method.clone())
            .uri(upstream.target_uri(internal_uri)?);
        if let Some(headers) = builder.headers_mut() {
            copy_end_to_end_headers(&parts.headers, headers);
            if let Ok(host) = HeaderValue::from_str(upstream.authority()) {
                headers.insert(header::HOST, host);
            }
            append_forwarded(headers, &parts.headers, forwarded);
        }
        let request = builder.body(Full::new(body))?;

        let response = tokio::time::timeout(self.timeout, self.client.request(request))
            .await
            .map_err(|_| ProxyError::Timeout(self.timeout))??;

        let (mut head, body) = response.into_parts();
        let bytes = body.collect().await?.to_bytes();
        strip_hop_by_hop(&mut head.headers);

        Ok(Response::from_parts(head, Full::new(bytes)))
    }
}

/// Copy every header except hop-by-hop ones, `Host`, and those named in `Connection`
fn copy_end_to_end_headers(from: &HeaderMap, to: &mut HeaderMap) {
    let listed = connection_listed(from);
    for (name, value) in from {
        if *name == header::HOST || HOP_BY_HOP.contains(name) || listed.contains(name) {
            continue;
        }
        to.append(name.clone(), value.clone());
    }
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in connection_listed(headers) {
        headers.remove(name);
    }
    for name in &HOP_BY_HOP {
        headers.remove(name);
    }
}

fn connection_listed(headers: &HeaderMap) -> Vec<HeaderName> {
    headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect()
}

fn append_forwarded(headers: &mut HeaderMap, original: &HeaderMap, forwarded: &Forwarded<'_>) {
    let client_ip = forwarded.client_ip.to_string();
    let chain = match original.get(&X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(existing) => format!("{existing}, {client_ip}"),
        None => client_ip,
    };

    let pairs = [
        (X_FORWARDED_FOR, chain.as_str()),
        (X_FORWARDED_HOST, forwarded.host),
        (X_FORWARDED_PROTO, "http"),
        (X_ORIGINAL_PATH, forwarded.original_path),
    ];
    for (name, value) in pairs {
        if value.is_empty() {
            continue;
        }
        if let Ok(value) = HeaderValue::from_str(value) {
            headers.insert(name, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::server::conn::http1;
    use hyper::service::service_fn;
    use hyper_util::rt::TokioIo;
    use std::convert::Infallible;
    use std::net::{Ipv4Addr, SocketAddr};
    use tokio::net::TcpListener;

    #[test]
    fn test_parse_upstream() {
        let up = Upstream::parse("http://127.0.0.1:8000/api/").unwrap();
        assert_eq!(up.authority(), "127.0.0.1:8000");
        let uri: Uri = "/movies/all?skip=0&limit=24".parse().unwrap();
        assert_eq!(
            up.target_uri(&uri).unwrap().to_string(),
            "http://127.0.0.1:8000/api/movies/all?skip=0&limit=24"
        );

        let up = Upstream::parse("http://backend").unwrap();
        assert_eq!(up.authority(), "backend");
        assert_eq!(
            up.target_uri(&"/x".parse().unwrap()).unwrap().to_string(),
            "http://backend/x"
        );
    }

    #[test]
    fn test_parse_upstream_rejects() {
        assert!(Upstream::parse("https://api.example.com").is_err());
        assert!(Upstream::parse("http://api.example.com/?a=1").is_err());
        assert!(Upstream::parse("api.example.com").is_err());
    }

    #[test]
    fn test_hop_by_hop_headers_not_copied() {
        let mut from = HeaderMap::new();
        from.insert(header::CONNECTION, HeaderValue::from_static("keep-alive, x-secret"));
        from.insert("x-secret", HeaderValue::from_static("1"));
        from.insert(header::HOST, HeaderValue::from_static("ask.mindefy.tech"));
        from.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer t"));
        from.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));

        let mut to = HeaderMap::new();
        copy_end_to_end_headers(&from, &mut to);

        assert_eq!(to.len(), 1);
        assert_eq!(to[header::AUTHORIZATION], "Bearer t");
    }

    #[test]
    fn test_forwarded_for_chain() {
        let mut original = HeaderMap::new();
        original.insert(X_FORWARDED_FOR, HeaderValue::from_static("10.0.0.1"));
        let mut headers = HeaderMap::new();
        let forwarded = Forwarded {
            client_ip: IpAddr::V4(Ipv4Addr::new(192, 168, 1, 7)),
            host: "ask.mindefy.tech",
            original_path: "/login",
        };
        append_forwarded(&mut headers, &original, &forwarded);

        assert_eq!(headers[&X_FORWARDED_FOR], "10.0.0.1, 192.168.1.7");
        assert_eq!(headers[&X_FORWARDED_HOST], "ask.mindefy.tech");
        assert_eq!(headers[&X_ORIGINAL_PATH], "/login");
    }

    #[test]
    fn test_error_status() {
        assert_eq!(
            ProxyError::Timeout(Duration::from_secs(1)).status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        let other: BoxError = "truncated".into();
        assert_eq!(ProxyError::Body(other).status(), StatusCode::BAD_REQUEST);
    }

    /// Upstream that echoes the request line and selected headers
    async fn spawn_echo_upstream() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                tokio::spawn(async move {
                    let service = service_fn(|req: Request<hyper::body::Incoming>| async move {
                        let original = req
                            .headers()
                            .get(&X_ORIGINAL_PATH)
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or("-")
                            .to_string();
                        let line = format!("{} {} {original}", req.method(), req.uri());
                        Ok::<_, Infallible>(
                            Response::builder()
                                .header(header::CONNECTION, "close")
                                .body(Full::new(Bytes::from(line)))
                                .unwrap(),
                        )
                    });
                    let _ = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await;
                });
            }
        });
        addr
    }

    #[tokio::test]
    async fn test_forward_to_upstream() {
        let addr = spawn_echo_upstream().await;
        let upstream = Upstream::parse(&format!("http://{addr}/api")).unwrap();
        let client = ProxyClient::new(Duration::from_secs(5));

        let (parts, body) = Request::builder()
            .method("POST")
            .uri("/inception?tab=similar")
            .header(header::HOST, "movie-recommendation.mindefy.tech")
            .body(Full::new(Bytes::from_static(b"{}")))
            .unwrap()
            .into_parts();
        let internal: Uri = "/movies/inception?tab=similar".parse().unwrap();
        let forwarded = Forwarded {
            client_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            host: "movie-recommendation.mindefy.tech",
            original_path: "/inception",
        };

        let resp = client
            .forward(&upstream, &parts, body, &internal, &forwarded, 1024)
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(!resp.headers().contains_key(header::CONNECTION));

        let text = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(text, "POST /api/movies/inception?tab=similar /inception");
    }

    #[tokio::test]
    async fn test_forward_rejects_large_body() {
        let upstream = Upstream::parse("http://127.0.0.1:9").unwrap();
        let client = ProxyClient::new(Duration::from_secs(1));
        let (parts, body) = Request::builder()
            .method("POST")
            .uri("/api/askdocs/rag-chat")
            .body(Full::new(Bytes::from(vec![b'x'; 64])))
            .unwrap()
            .into_parts();
        let forwarded = Forwarded {
            client_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            host: "",
            original_path: "/api/askdocs/rag-chat",
        };

        let err = client
            .forward(&upstream, &parts, body, &parts.uri.clone(), &forwarded, 16)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_forward_connection_refused_is_bad_gateway() {
        // Bind then drop to get a port nobody listens on
        let addr = TcpListener::bind("127.0.0.1:0").await.unwrap().local_addr().unwrap();
        let upstream = Upstream::parse(&format!("http://{addr}")).unwrap();
        let client = ProxyClient::new(Duration::from_secs(2));
        let (parts, body) = Request::builder()
            .uri("/api/movies/all")
            .body(Full::new(Bytes::new()))
            .unwrap()
            .into_parts();
        let forwarded = Forwarded {
            client_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            host: "",
            original_path: "/api/movies/all",
        };

        let err = client
            .forward(&upstream, &parts, body, &parts.uri.clone(), &forwarded, 1024)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }
}
