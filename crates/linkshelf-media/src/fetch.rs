//! Fetching remote images on behalf of the browser.
//!
//! Only public hosts are contacted: every hop, redirects included, is
//! resolved first and refused when any address is loopback, private,
//! link-local or otherwise reserved. The body is served under the type its
//! magic bytes identify, so only the raster formats of [`detect_image_mime`]
//! ever leave this module.

use std::{
  net::{IpAddr, Ipv4Addr},
  time::Duration,
};

use bytes::{Bytes, BytesMut};
use reqwest::{
  Url,
  header::{CONTENT_TYPE, LOCATION},
  redirect::Policy,
};
use tokio::net::lookup_host;
use tracing::debug;

use crate::{Error, Result};

const MAX_REDIRECTS: usize = 5;

/// A fetched image body with the content type to serve it as.
#[derive(Debug, Clone)]
pub struct FetchedImage {
  pub bytes:        Bytes,
  pub content_type: &'static str,
}

#[derive(Debug, Clone)]
pub struct ImageFetcher {
  client:        reqwest::Client,
  max_bytes:     u64,
  allow_private: bool,
}

impl ImageFetcher {
  pub fn new(timeout: Duration, max_bytes: u64) -> Result<Self> {
    let client = reqwest::Client::builder()
      .timeout(timeout)
      .redirect(Policy::none())
      .build()?;
    Ok(Self { client, max_bytes, allow_private: false })
  }

  /// Also contact loopback and private-network hosts.
  pub fn allow_private_hosts(mut self, allow: bool) -> Self {
    self.allow_private = allow;
    self
  }

  /// GET `raw_url` and return its body if it is an image within the size
  /// bound. Only `http` and `https` URLs are followed.
  pub async fn fetch(&self, raw_url: &str) -> Result<FetchedImage> {
    let mut url = parse_http_url(raw_url)?;
    let mut redirects = 0;

    let mut resp = loop {
      self.check_host(&url).await?;
      let resp = self.client.get(url.clone()).send().await?;
      if !resp.status().is_redirection() {
        break resp;
      }

      let Some(location) = resp.headers().get(LOCATION).and_then(|v| v.to_str().ok()) else {
        return Err(Error::UpstreamStatus(resp.status().as_u16()));
      };
      if redirects == MAX_REDIRECTS {
        return Err(Error::TooManyRedirects);
      }
      redirects += 1;

      let next = url
        .join(location)
        .map_err(|_| Error::UnsupportedUrl(location.to_owned()))?;
      let next = parse_http_url(next.as_str())?;
      debug!(from = %url, to = %next, "following redirect");
      url = next;
    };

    let status = resp.status();
    if !status.is_success() {
      return Err(Error::UpstreamStatus(status.as_u16()));
    }

    if let Some(len) = resp.content_length()
      && len > self.max_bytes
    {
      return Err(Error::TooLarge { size: len, max: self.max_bytes });
    }

    let declared = resp
      .headers()
      .get(CONTENT_TYPE)
      .and_then(|v| v.to_str().ok())
      .map(|v| v.split(';').next().unwrap_or(v).trim().to_ascii_lowercase());

    if let Some(ct) = declared.as_deref()
      && !(ct.starts_with("image/") || ct == "application/octet-stream")
    {
      return Err(Error::NotAnImage(ct.to_owned()));
    }

    let mut body = BytesMut::new();
    while let Some(chunk) = resp.chunk().await? {
      if (body.len() + chunk.len()) as u64 > self.max_bytes {
        return Err(Error::TooLarge {
          size: (body.len() + chunk.len()) as u64,
          max:  self.max_bytes,
        });
      }
      body.extend_from_slice(&chunk);
    }
    let bytes = body.freeze();

    let content_type = detect_image_mime(&bytes).ok_or_else(|| {
      Error::NotAnImage(declared.unwrap_or_else(|| "unrecognised body".to_owned()))
    })?;

    debug!(url = raw_url, size = bytes.len(), content_type, "fetched image");
    Ok(FetchedImage { bytes, content_type })
  }

  async fn check_host(&self, url: &Url) -> Result<()> {
    if self.allow_private {
      return Ok(());
    }

    let host = url
      .host_str()
      .ok_or_else(|| Error::UnsupportedUrl(url.to_string()))?
      .trim_start_matches('[')
      .trim_end_matches(']');
    let port = url.port_or_known_default().unwrap_or(80);

    let addrs: Vec<IpAddr> = match host.parse::<IpAddr>() {
      Ok(ip) => vec![ip],
      Err(_) => lookup_host((host, port))
        .await
        .map_err(|_| Error::Unresolvable(host.to_owned()))?
        .map(|addr| addr.ip())
        .collect(),
    };

    if addrs.is_empty() || !addrs.iter().all(is_public_ip) {
      debug!(host, ?addrs, "refusing non-public host");
      return Err(Error::ForbiddenHost(host.to_owned()));
    }
    Ok(())
  }
}

fn parse_http_url(raw: &str) -> Result<Url> {
  let url = Url::parse(raw).map_err(|_| Error::UnsupportedUrl(raw.to_owned()))?;
  if !matches!(url.scheme(), "http" | "https") {
    return Err(Error::UnsupportedUrl(raw.to_owned()));
  }
  Ok(url)
}

/// Whether `ip` is routable on the public internet.
pub fn is_public_ip(ip: &IpAddr) -> bool {
  match ip {
    IpAddr::V4(v4) => is_public_v4(v4),
    IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
      Some(v4) => is_public_v4(&v4),
      None => {
        let first = v6.segments()[0];
        let unique_local = (first & 0xfe00) == 0xfc00;
        let link_local = (first & 0xffc0) == 0xfe80;
        !(v6.is_loopback() || v6.is_unspecified() || v6.is_multicast() || unique_local || link_local)
      }
    },
  }
}

fn is_public_v4(ip: &Ipv4Addr) -> bool {
  let [a, b, ..] = ip.octets();
  // 100.64.0.0/10 is carrier-grade NAT.
  let shared = a == 100 && (b & 0xc0) == 64;
  !(ip.is_loopback()
    || ip.is_private()
    || ip.is_link_local()
    || ip.is_unspecified()
    || ip.is_broadcast()
    || ip.is_multicast()
    || ip.is_documentation()
    || shared
    || a == 0)
}

/// Detect an image MIME type from its magic bytes.
pub fn detect_image_mime(bytes: &[u8]) -> Option<&'static str> {
  if bytes.starts_with(b"\x89PNG") {
    Some("image/png")
  } else if bytes.starts_with(b"\xFF\xD8\xFF") {
    Some("image/jpeg")
  } else if bytes.starts_with(b"GIF8") {
    Some("image/gif")
  } else if bytes.starts_with(b"RIFF") && bytes.get(8..12) == Some(b"WEBP") {
    Some("image/webp")
  } else {
    None
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn fetcher() -> ImageFetcher { ImageFetcher::new(Duration::from_secs(1), 1024).unwrap() }

  #[test]
  fn detects_common_formats() {
    assert_eq!(detect_image_mime(b"\x89PNG\r\n\x1a\n"), Some("image/png"));
    assert_eq!(detect_image_mime(b"\xFF\xD8\xFF\xE0"), Some("image/jpeg"));
    assert_eq!(detect_image_mime(b"GIF89a"), Some("image/gif"));
    assert_eq!(detect_image_mime(b"RIFF\0\0\0\0WEBPVP8 "), Some("image/webp"));
    assert_eq!(detect_image_mime(b"<html>"), None);
  }

  #[tokio::test]
  async fn rejects_non_http_schemes() {
    for url in ["ftp://example.com/a.png", "file:///etc/passwd", "data:image/png;base64,AA"] {
      assert!(matches!(fetcher().fetch(url).await, Err(Error::UnsupportedUrl(_))));
    }
  }

  #[tokio::test]
  async fn rejects_unparseable_urls() {
    assert!(matches!(fetcher().fetch("not a url").await, Err(Error::UnsupportedUrl(_))));
  }

  // ── Host filtering ──────────────────────────────────────────────────────────

  #[test]
  fn classifies_public_addresses() {
    for public in ["8.8.8.8", "1.1.1.1", "2606:4700:4700::1111"] {
      assert!(is_public_ip(&public.parse().unwrap()), "{public}");
    }
    for reserved in [
      "127.0.0.1",
      "10.1.2.3",
      "172.16.0.1",
      "192.168.1.1",
      "169.254.169.254",
      "100.64.0.1",
      "0.0.0.0",
      "::1",
      "fd00::1",
      "fe80::1",
      "::ffff:127.0.0.1",
    ] {
      assert!(!is_public_ip(&reserved.parse().unwrap()), "{reserved}");
    }
  }

  #[tokio::test]
  async fn refuses_private_hosts_by_default() {
    for url in [
      "http://127.0.0.1:9/a.png",
      "http://[::1]/a.png",
      "http://169.254.169.254/latest/meta-data",
      "http://10.0.0.1/a.png",
      "http://localhost/a.png",
    ] {
      let result = fetcher().fetch(url).await;
      assert!(matches!(result, Err(Error::ForbiddenHost(_))), "{url}: {result:?}");
    }
  }

  // ── Against a local server ──────────────────────────────────────────────────

  const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

  fn local_fetcher() -> ImageFetcher {
    ImageFetcher::new(Duration::from_secs(5), 1024)
      .unwrap()
      .allow_private_hosts(true)
  }

  fn http_response(status: &str, content_type: &str, body: &[u8]) -> Vec<u8> {
    let mut out = format!(
      "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\n\
       Connection: close\r\n\r\n",
      body.len()
    )
    .into_bytes();
    out.extend_from_slice(body);
    out
  }

  /// Answer a single request with `response` verbatim and return the origin.
  async fn serve_once(response: Vec<u8>) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
      let Ok((mut socket, _)) = listener.accept().await else { return };
      let mut request = Vec::new();
      let mut buf = [0u8; 1024];
      while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut buf).await {
          Ok(0) | Err(_) => return,
          Ok(n) => request.extend_from_slice(&buf[..n]),
        }
      }
      let _ = socket.write_all(&response).await;
      let _ = socket.shutdown().await;
    });

    format!("http://{addr}")
  }

  #[tokio::test]
  async fn fetches_an_image() {
    let origin = serve_once(http_response("200 OK", "image/png", PNG)).await;
    let image = local_fetcher().fetch(&format!("{origin}/a.png")).await.unwrap();
    assert_eq!(image.content_type, "image/png");
    assert_eq!(image.bytes.as_ref(), PNG);
  }

  #[tokio::test]
  async fn octet_stream_is_sniffed() {
    let origin = serve_once(http_response("200 OK", "application/octet-stream", PNG)).await;
    let image = local_fetcher().fetch(&format!("{origin}/blob")).await.unwrap();
    assert_eq!(image.content_type, "image/png");
  }

  #[tokio::test]
  async fn svg_is_not_served() {
    let svg = b"<svg xmlns=\"http://www.w3.org/2000/svg\"><script>alert(1)</script></svg>";
    let origin = serve_once(http_response("200 OK", "image/svg+xml", svg)).await;
    let result = local_fetcher().fetch(&format!("{origin}/x.svg")).await;
    assert!(matches!(result, Err(Error::NotAnImage(ref ct)) if ct == "image/svg+xml"), "{result:?}");
  }

  #[tokio::test]
  async fn declared_type_does_not_override_magic_bytes() {
    let jpeg = b"\xFF\xD8\xFF\xE0rest";
    let origin = serve_once(http_response("200 OK", "image/png", jpeg)).await;
    let image = local_fetcher().fetch(&format!("{origin}/a.png")).await.unwrap();
    assert_eq!(image.content_type, "image/jpeg");
  }

  #[tokio::test]
  async fn rejects_error_statuses() {
    let origin = serve_once(http_response("404 Not Found", "text/plain", b"nope")).await;
    let result = local_fetcher().fetch(&format!("{origin}/missing.png")).await;
    assert!(matches!(result, Err(Error::UpstreamStatus(404))), "{result:?}");
  }

  #[tokio::test]
  async fn rejects_non_image_content() {
    let origin = serve_once(http_response("200 OK", "text/html; charset=utf-8", b"<html></html>")).await;
    let result = local_fetcher().fetch(&format!("{origin}/page")).await;
    assert!(matches!(result, Err(Error::NotAnImage(ref ct)) if ct == "text/html"), "{result:?}");
  }

  #[tokio::test]
  async fn rejects_declared_length_over_limit() {
    let mut body = PNG.to_vec();
    body.resize(2048, 0);
    let origin = serve_once(http_response("200 OK", "image/png", &body)).await;
    let result = local_fetcher().fetch(&format!("{origin}/big.png")).await;
    assert!(matches!(result, Err(Error::TooLarge { size: 2048, max: 1024 })), "{result:?}");
  }

  #[tokio::test]
  async fn rejects_streamed_body_over_limit() {
    let mut response = b"HTTP/1.1 200 OK\r\nContent-Type: image/png\r\n\
      Transfer-Encoding: chunked\r\nConnection: close\r\n\r\n"
      .to_vec();
    let mut chunk = PNG.to_vec();
    chunk.resize(600, 0);
    for _ in 0..2 {
      response.extend_from_slice(format!("{:x}\r\n", chunk.len()).as_bytes());
      response.extend_from_slice(&chunk);
      response.extend_from_slice(b"\r\n");
    }
    response.extend_from_slice(b"0\r\n\r\n");

    let origin = serve_once(response).await;
    let result = local_fetcher().fetch(&format!("{origin}/stream.png")).await;
    assert!(matches!(result, Err(Error::TooLarge { max: 1024, .. })), "{result:?}");
  }

  #[tokio::test]
  async fn follows_redirects() {
    let target = serve_once(http_response("200 OK", "image/png", PNG)).await;
    let redirect = format!(
      "HTTP/1.1 302 Found\r\nLocation: {target}/final.png\r\nContent-Length: 0\r\n\
       Connection: close\r\n\r\n"
    );
    let origin = serve_once(redirect.into_bytes()).await;

    let image = local_fetcher().fetch(&format!("{origin}/start")).await.unwrap();
    assert_eq!(image.content_type, "image/png");
  }
}
