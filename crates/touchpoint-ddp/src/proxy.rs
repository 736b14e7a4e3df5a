//! HTTP CONNECT tunnelling for outbound proxies.

use base64::Engine;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::http::Uri;
use touchpoint_common::TransportError;
use tracing::debug;

/// Upper bound on the proxy's response head.
const MAX_RESPONSE_HEAD: usize = 8 * 1024;

/// Open a TCP tunnel to the host of `target` through the HTTP proxy at
/// `proxy`. The returned stream is positioned right after the proxy's
/// response head, ready for the TLS/WebSocket handshake.
pub(crate) async fn tunnel(proxy: &str, target: &str) -> Result<TcpStream, TransportError> {
    let proxy_uri: Uri = proxy
        .parse()
        .map_err(|e| TransportError::Connect(format!("invalid proxy url {proxy:?}: {e}")))?;
    if proxy_uri.scheme_str() != Some("http") {
        return Err(TransportError::Connect(format!(
            "unsupported proxy scheme in {proxy:?}, only http:// is supported"
        )));
    }
    let proxy_host = proxy_uri
        .host()
        .ok_or_else(|| TransportError::Connect(format!("proxy url {proxy:?} has no host")))?;
    let proxy_port = proxy_uri.port_u16().unwrap_or(80);

    let authority = target_authority(target)?;
    debug!(proxy = %proxy_host, target = %authority, "Opening proxy tunnel");

    let mut stream = TcpStream::connect((proxy_host, proxy_port))
        .await
        .map_err(|e| TransportError::Connect(format!("proxy connect failed: {e}")))?;

    let request = connect_request(&authority, proxy_authorization(&proxy_uri).as_deref());
    stream
        .write_all(request.as_bytes())
        .await
        .map_err(|e| TransportError::Connect(format!("proxy write failed: {e}")))?;

    let head = read_response_head(&mut stream).await?;
    let status_line = head.lines().next().unwrap_or_default();
    match parse_status(status_line) {
        Some(code) if (200..300).contains(&code) => Ok(stream),
        _ => Err(TransportError::Connect(format!(
            "proxy refused tunnel: {status_line}"
        ))),
    }
}

/// `host:port` of a ws/wss URL, with the scheme's default port filled in.
pub(crate) fn target_authority(target: &str) -> Result<String, TransportError> {
    let uri: Uri = target
        .parse()
        .map_err(|e| TransportError::Connect(format!("invalid url {target:?}: {e}")))?;
    let host = uri
        .host()
        .ok_or_else(|| TransportError::Connect(format!("url {target:?} has no host")))?;
    let port = uri.port_u16().unwrap_or(match uri.scheme_str() {
        Some("wss") | Some("https") => 443,
        _ => 80,
    });
    Ok(format!("{host}:{port}"))
}

pub(crate) fn connect_request(authority: &str, authorization: Option<&str>) -> String {
    let mut request = format!("CONNECT {authority} HTTP/1.1\r\nHost: {authority}\r\n");
    if let Some(auth) = authorization {
        request.push_str(&format!("Proxy-Authorization: {auth}\r\n"));
    }
    request.push_str("\r\n");
    request
}

/// Basic credentials from the userinfo part of the proxy URL, if any.
pub(crate) fn proxy_authorization(proxy: &Uri) -> Option<String> {
    let (userinfo, _) = proxy.authority()?.as_str().rsplit_once('@')?;
    let (user, pass) = userinfo.split_once(':').unwrap_or((userinfo, ""));
    let user = urlencoding::decode(user).ok()?;
    let pass = urlencoding::decode(pass).ok()?;
    let encoded = base64::engine::general_purpose::STANDARD.encode(format!("{user}:{pass}"));
    Some(format!("Basic {encoded}"))
}

pub(crate) fn parse_status(status_line: &str) -> Option<u16> {
    let mut parts = status_line.split_whitespace();
    let version = parts.next()?;
    if !version.starts_with("HTTP/") {
        return None;
    }
    parts.next()?.parse().ok()
}

/// Read byte by byte up to the blank line, so nothing past the response
/// head is consumed.
async fn read_response_head(stream: &mut TcpStream) -> Result<String, TransportError> {
    let mut head = Vec::with_capacity(256);
    while !head.ends_with(b"\r\n\r\n") {
        if head.len() >= MAX_RESPONSE_HEAD {
            return Err(TransportError::Protocol(
                "proxy response head too large".into(),
            ));
        }
        let byte = stream
            .read_u8()
            .await
            .map_err(|e| TransportError::Connect(format!("proxy read failed: {e}")))?;
        head.push(byte);
    }
    Ok(String::from_utf8_lossy(&head).into_owned())
}
