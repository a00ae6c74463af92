/*
 * client.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Astrolabio, a Gemini protocol client.
 *
 * Astrolabio is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Astrolabio is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Astrolabio.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Gemini client: one TLS connection per request, certificate checked against the trust
//! store, redirects followed in a bounded loop.
//!
//! Connections are closed as soon as the header shows there is no body (redirects, input,
//! failures). For success responses the connection lives inside the body and is released
//! when the caller drops or closes the response.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tokio_rustls::rustls::client::ClientConfig;
use tracing::debug;
use url::Url;

use crate::config::{DEFAULT_MAX_REDIRECTS, DEFAULT_TIMEOUT};
use crate::error::{GeminiError, Result};
use crate::net::{default_client_config, TlsStreamWrapper};
use crate::protocol::gemini::response::{read_response, Response};
use crate::trust::TrustStore;
use crate::uri::{check_gemini_url, host_and_port, parse_gemini_url, resolve_redirect};

/// Gemini client. Cheap to clone; all clones share the trust store.
#[derive(Clone)]
pub struct GeminiClient {
    trust: Arc<TrustStore>,
    tls_config: Option<Arc<ClientConfig>>,
    timeout: Duration,
    follow_redirects: bool,
    max_redirects: usize,
}

impl GeminiClient {
    /// Client with default timeout (30 s), redirects followed up to 5 times.
    pub fn new(trust: Arc<TrustStore>) -> Self {
        Self {
            trust,
            tls_config: None,
            timeout: DEFAULT_TIMEOUT,
            follow_redirects: true,
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }

    /// Bound for connect + handshake, and separately for sending the request and reading the header.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// When false, redirect responses are returned to the caller as-is.
    pub fn with_follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = follow;
        self
    }

    pub fn with_max_redirects(mut self, max: usize) -> Self {
        self.max_redirects = max;
        self
    }

    /// Custom TLS config. It must not validate against CAs, or self-signed servers will fail.
    pub fn with_tls_config(mut self, config: Arc<ClientConfig>) -> Self {
        self.tls_config = Some(config);
        self
    }

    pub fn trust_store(&self) -> &Arc<TrustStore> {
        &self.trust
    }

    /// Fetch `url`, following redirects if enabled.
    pub async fn get(&self, url: &str) -> Result<Response> {
        let url = parse_gemini_url(url)?;
        self.get_url(url).await
    }

    /// Fetch an already parsed URL, following redirects if enabled.
    pub async fn get_url(&self, url: Url) -> Result<Response> {
        let mut url = url;
        let mut redirects = 0usize;
        loop {
            let response = self.fetch(&url).await?;
            if !response.status().is_redirect() || !self.follow_redirects {
                return Ok(response);
            }
            if redirects >= self.max_redirects {
                return Err(GeminiError::TooManyRedirects(self.max_redirects));
            }
            let target = response.meta().trim();
            if target.is_empty() {
                return Err(GeminiError::RedirectMissingUrl);
            }
            let next = resolve_redirect(&url, target)?;
            debug!(
                from = %url,
                to = %next,
                status = response.status().code(),
                redirects = redirects + 1,
                "following redirect"
            );
            redirects += 1;
            url = next;
        }
    }

    /// One request on one connection. No redirect handling.
    async fn fetch(&self, url: &Url) -> Result<Response> {
        check_gemini_url(url)?;
        let (host, port) = host_and_port(url)?;
        let addr = format!("{}:{}", host, port);
        let config = match &self.tls_config {
            Some(c) => c.clone(),
            None => default_client_config().map_err(|source| GeminiError::ConnectFailure {
                host: addr.clone(),
                source,
            })?,
        };

        debug!(host = %host, port, "connecting");
        let stream = match timeout(
            self.timeout,
            TlsStreamWrapper::connect_implicit_tls(&host, port, config),
        )
        .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => return Err(GeminiError::ConnectFailure { host: addr, source }),
            Err(_) => {
                return Err(GeminiError::ConnectFailure {
                    host: addr,
                    source: io::Error::new(io::ErrorKind::TimedOut, "TLS connect timed out"),
                })
            }
        };

        // Disk writes and policy prompts block; they run on the blocking pool.
        let trust = self.trust.clone();
        let certificates = stream.peer_certificates().to_vec();
        let verify_host = host.clone();
        let outcome = tokio::task::spawn_blocking(move || trust.verify(&verify_host, &certificates))
            .await
            .map_err(|e| GeminiError::Io(io::Error::new(io::ErrorKind::Other, e)))??;
        debug!(host = %host, outcome = ?outcome, "certificate accepted");

        let exchange = async {
            let mut stream = stream;
            write_request(&mut stream, url).await?;
            read_response(stream, url.clone()).await
        };
        let (response, unread) = match timeout(self.timeout, exchange).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(GeminiError::ConnectFailure {
                    host: addr,
                    source: io::Error::new(
                        io::ErrorKind::TimedOut,
                        "timed out waiting for response header",
                    ),
                })
            }
        };
        debug!(
            url = %url,
            status = response.status().code(),
            meta = %response.meta(),
            "response header"
        );

        if let Some(conn) = unread {
            let mut conn = conn.into_inner();
            let _ = timeout(self.timeout, conn.shutdown()).await;
        }
        Ok(response)
    }
}

/// Request line: the absolute URL followed by CRLF.
async fn write_request<S>(stream: &mut S, url: &Url) -> Result<()>
where
    S: AsyncWrite + Unpin,
{
    stream.write_all(url.as_str().as_bytes()).await?;
    stream.write_all(b"\r\n").await?;
    stream.flush().await?;
    Ok(())
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("trust", &self.trust)
            .field("timeout", &self.timeout)
            .field("follow_redirects", &self.follow_redirects)
            .field("max_redirects", &self.max_redirects)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(dir: &tempfile::TempDir) -> GeminiClient {
        let store = TrustStore::open(dir.path().join("known_hosts.json")).unwrap();
        GeminiClient::new(Arc::new(store))
    }

    #[tokio::test]
    async fn non_gemini_scheme_rejected_before_connecting() {
        let dir = tempfile::tempdir().unwrap();
        match client(&dir).get("https://example.com/").await {
            Err(GeminiError::UnsupportedScheme(s)) => assert_eq!(s, "https"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn invalid_url_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            client(&dir).get("gemini://").await,
            Err(GeminiError::InvalidUrl { .. })
        ));
    }

    #[tokio::test]
    async fn refused_connection_is_connect_failure() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let dir = tempfile::tempdir().unwrap();
        let url = format!("gemini://127.0.0.1:{}/", port);
        assert!(matches!(
            client(&dir).get(&url).await,
            Err(GeminiError::ConnectFailure { .. })
        ));
    }

    #[test]
    fn defaults() {
        let dir = tempfile::tempdir().unwrap();
        let c = client(&dir);
        assert_eq!(c.timeout, DEFAULT_TIMEOUT);
        assert_eq!(c.max_redirects, 5);
        assert!(c.follow_redirects);
    }
}
