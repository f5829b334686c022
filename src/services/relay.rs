//! Streaming reverse proxy for resolved media URLs.
//!
//! Relays the remote resource to the caller without buffering the body;
//! the payload is often multi-megabyte video. Hop-by-hop headers are
//! stripped in both directions and the outgoing response always carries a
//! fixed `Cache-Control` regardless of what the origin sent.

use axum::body::Body;
use axum::http::{HeaderMap, HeaderValue, Response, header};
use url::Url;

use crate::error::RelayError;

/// Headers meaningful only on a single connection hop. A proxy must not
/// forward these unchanged.
pub const HOP_BY_HOP: [&str; 7] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
];

/// Embeds stay valid for half a day; the CDN URLs themselves expire on
/// roughly that horizon.
const RELAY_CACHE_CONTROL: &str = "max-age=43200";

/// Clone the inbound headers for forwarding, dropping hop-by-hop headers
/// and the host (reqwest rewrites it for the remote target).
pub fn sanitize_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut outbound = inbound.clone();
    for name in HOP_BY_HOP {
        outbound.remove(name);
    }
    outbound.remove(header::HOST);
    outbound
}

/// Stream the resource at `media_url` back to the caller. Any failure to
/// parse or reach the URL is terminal for this request; there is no
/// fallback once a URL has been chosen.
pub async fn relay(
    client: &reqwest::Client,
    media_url: &str,
    inbound_headers: &HeaderMap,
) -> Result<Response<Body>, RelayError> {
    let remote = Url::parse(media_url)?;
    tracing::debug!(host = %remote.host_str().unwrap_or(""), "relaying media from origin");

    let upstream = client
        .get(remote)
        .headers(sanitize_headers(inbound_headers))
        .send()
        .await?;

    let status = upstream.status();
    let mut headers = upstream.headers().clone();
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(RELAY_CACHE_CONTROL),
    );

    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = headers;

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::routing::get;
    use http_body_util::BodyExt;
    use std::sync::{Arc, Mutex};

    #[test]
    fn sanitize_strips_hop_by_hop_and_host() {
        let mut inbound = HeaderMap::new();
        inbound.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        inbound.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        inbound.insert(header::HOST, HeaderValue::from_static("embed.example"));
        inbound.insert(header::ACCEPT, HeaderValue::from_static("video/mp4"));
        inbound.insert(header::RANGE, HeaderValue::from_static("bytes=0-1023"));

        let outbound = sanitize_headers(&inbound);
        assert!(outbound.get(header::CONNECTION).is_none());
        assert!(outbound.get(header::TRANSFER_ENCODING).is_none());
        assert!(outbound.get(header::HOST).is_none());
        // End-to-end headers pass through.
        assert_eq!(
            outbound.get(header::ACCEPT),
            Some(&HeaderValue::from_static("video/mp4"))
        );
        assert_eq!(
            outbound.get(header::RANGE),
            Some(&HeaderValue::from_static("bytes=0-1023"))
        );
    }

    #[tokio::test]
    async fn relays_body_and_forces_cache_control() {
        let seen: Arc<Mutex<Option<HeaderMap>>> = Arc::new(Mutex::new(None));
        let seen_by_origin = seen.clone();

        let router = Router::new().route(
            "/v/clip.mp4",
            get(move |headers: HeaderMap| {
                let seen = seen_by_origin.clone();
                async move {
                    *seen.lock().unwrap() = Some(headers);
                    "media-bytes"
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let mut inbound = HeaderMap::new();
        inbound.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        inbound.insert(header::ACCEPT, HeaderValue::from_static("video/mp4"));

        let client = reqwest::Client::new();
        let url = format!("http://{addr}/v/clip.mp4");
        let response = relay(&client, &url, &inbound).await.unwrap();

        // Origin sent no Cache-Control; the relay forces one anyway.
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL),
            Some(&HeaderValue::from_static("max-age=43200"))
        );

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"media-bytes");

        // The outbound request must not carry the inbound Connection header.
        let origin_headers = seen.lock().unwrap().clone().expect("origin was hit");
        assert!(origin_headers.get(header::CONNECTION).is_none());
        assert_eq!(
            origin_headers.get(header::ACCEPT),
            Some(&HeaderValue::from_static("video/mp4"))
        );
    }

    #[tokio::test]
    async fn unparsable_url_is_terminal() {
        let client = reqwest::Client::new();
        let err = relay(&client, "not a url", &HeaderMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::BadUrl(_)));
    }

    #[tokio::test]
    async fn unreachable_origin_is_terminal() {
        let client = reqwest::Client::new();
        // Port 1 on loopback: nothing listens there.
        let err = relay(&client, "http://127.0.0.1:1/v.mp4", &HeaderMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::Upstream(_)));
    }
}
