/*
 * response.rs
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

//! Gemini response: header line `<STATUS><SPACE><META><CR><LF>` followed by the body
//! (success only). The body is the rest of the stream and is read lazily.

use std::fmt;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::BytesMut;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader, ReadBuf};
use url::Url;

use crate::config::MAX_META_LEN;
use crate::error::{GeminiError, Result};
use crate::protocol::gemini::status::StatusCode;

/// Longest header line we read: two digits, space, meta, CR, LF, plus one byte so that an
/// over-long meta is detected rather than silently truncated.
const MAX_HEADER_LINE: usize = 2 + 1 + MAX_META_LEN + 2 + 1;

/// MIME type rendered as a gemtext document.
pub const GEMTEXT_MIME: &str = "text/gemini";

/// Response body: the connection after the header. Dropping it closes the connection.
pub struct Body {
    inner: Box<dyn AsyncRead + Send + Unpin>,
}

impl Body {
    pub fn new<R>(reader: R) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        Self {
            inner: Box::new(reader),
        }
    }
}

impl AsyncRead for Body {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Body { .. }")
    }
}

/// One response per request. The body is present iff the status is a success.
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    meta: String,
    body: Option<Body>,
    url: Url,
}

impl Response {
    /// Assemble a response from a parsed header. The reader becomes the body for success
    /// statuses; otherwise it is handed back unread so the caller can close it.
    pub fn assemble<R>(status: StatusCode, meta: String, url: Url, reader: R) -> (Self, Option<R>)
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        if status.is_success() {
            let response = Self {
                status,
                meta,
                body: Some(Body::new(reader)),
                url,
            };
            (response, None)
        } else {
            let response = Self {
                status,
                meta,
                body: None,
                url,
            };
            (response, Some(reader))
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// MIME type (success), error text (failure), target (redirect) or prompt (input).
    pub fn meta(&self) -> &str {
        &self.meta
    }

    /// URL that produced this response (the last one, after redirects).
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    /// MIME type from the meta up to the first `;`. Empty for non-success responses.
    pub fn mime_type(&self) -> &str {
        if !self.status.is_success() {
            return "";
        }
        self.meta.split(';').next().unwrap_or("").trim()
    }

    /// True when the document should be rendered as gemtext (no MIME type, or text/gemini).
    pub fn is_gemtext(&self) -> bool {
        let mime = self.mime_type();
        mime.is_empty() || mime.eq_ignore_ascii_case(GEMTEXT_MIME)
    }

    /// Borrow the lazy body stream.
    pub fn body_mut(&mut self) -> Result<&mut Body> {
        self.body.as_mut().ok_or(GeminiError::NoBody)
    }

    /// Take ownership of the body; the caller then owns the connection.
    pub fn take_body(&mut self) -> Option<Body> {
        self.body.take()
    }

    /// Read the whole body and release the connection.
    pub async fn read_body(&mut self) -> Result<Vec<u8>> {
        let mut body = self.body.take().ok_or(GeminiError::NoBody)?;
        let mut out = Vec::new();
        body.read_to_end(&mut out).await?;
        Ok(out)
    }

    /// Release the body and its connection. No-op if there is no body.
    pub fn close(&mut self) {
        self.body.take();
    }
}

/// Parse a header line (terminator optional). No space means status only, empty meta.
pub fn parse_header(line: &str) -> Result<(StatusCode, String)> {
    let line = line.strip_suffix('\n').unwrap_or(line);
    let line = line.strip_suffix('\r').unwrap_or(line);
    let (token, meta) = match line.find(' ') {
        Some(i) => (&line[..i], &line[i + 1..]),
        None => (line, ""),
    };
    let status = parse_status(token)?;
    if meta.len() > MAX_META_LEN {
        return Err(GeminiError::MetaTooLong(meta.len()));
    }
    Ok((status, meta.to_string()))
}

/// Exactly two ASCII digits in 10..=69.
fn parse_status(token: &str) -> Result<StatusCode> {
    if token.len() != 2 || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(GeminiError::MalformedHeader(format!(
            "invalid status code {:?} (expected two digits)",
            token
        )));
    }
    let code: u8 = token
        .parse()
        .map_err(|_| GeminiError::MalformedHeader(format!("invalid status code {:?}", token)))?;
    StatusCode::new(code).ok_or_else(|| {
        GeminiError::MalformedHeader(format!("status code out of range: {} (expected 10-69)", code))
    })
}

/// Read and parse the header line. Reads at most `MAX_HEADER_LINE` bytes; the rest of the
/// stream is left in the reader.
pub async fn read_header<R>(reader: &mut R) -> Result<(StatusCode, String)>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = BytesMut::with_capacity(128);
    let mut terminated = false;
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Err(GeminiError::MalformedHeader(
                "connection closed before end of header".to_string(),
            ));
        }
        let room = MAX_HEADER_LINE - line.len();
        let window = &available[..available.len().min(room)];
        if let Some(pos) = window.iter().position(|&b| b == b'\n') {
            line.extend_from_slice(&window[..=pos]);
            reader.consume(pos + 1);
            terminated = true;
            break;
        }
        let n = window.len();
        line.extend_from_slice(window);
        reader.consume(n);
        if line.len() >= MAX_HEADER_LINE {
            break;
        }
    }
    // A truncated line may end inside a multi-byte character; drop the partial tail so an
    // over-long meta still reports its length.
    let valid = match std::str::from_utf8(&line) {
        Err(e) if !terminated && e.error_len().is_none() => &line[..e.valid_up_to()],
        _ => &line[..],
    };
    let text = std::str::from_utf8(valid)
        .map_err(|_| GeminiError::MalformedHeader("header is not valid UTF-8".to_string()))?;
    parse_header(text)
}

/// Decode a response from a stream. For success the buffered stream becomes the body;
/// otherwise it is returned so the caller can close the connection.
pub async fn read_response<R>(reader: R, url: Url) -> Result<(Response, Option<BufReader<R>>)>
where
    R: AsyncRead + Send + Unpin + 'static,
{
    let mut reader = BufReader::new(reader);
    let (status, meta) = read_header(&mut reader).await?;
    Ok(Response::assemble(status, meta, url, reader))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> Url {
        Url::parse("gemini://example.com/").unwrap()
    }

    async fn decode(raw: &'static [u8]) -> Result<Response> {
        read_response(raw, url()).await.map(|(r, _)| r)
    }

    #[tokio::test]
    async fn success_has_body() {
        let mut r = decode(b"20 text/gemini\r\n# Hello\n").await.unwrap();
        assert_eq!(r.status(), StatusCode::SUCCESS);
        assert_eq!(r.meta(), "text/gemini");
        assert!(r.has_body());
        assert!(r.is_gemtext());
        assert_eq!(r.read_body().await.unwrap(), b"# Hello\n");
        assert!(!r.has_body());
    }

    #[tokio::test]
    async fn failure_has_no_body() {
        let (mut r, unread) = read_response(&b"51 not found\r\n"[..], url()).await.unwrap();
        assert_eq!(r.status().code(), 51);
        assert_eq!(r.meta(), "not found");
        assert!(unread.is_some());
        assert!(matches!(r.body_mut(), Err(GeminiError::NoBody)));
        assert!(matches!(r.read_body().await, Err(GeminiError::NoBody)));
        assert_eq!(r.mime_type(), "");
    }

    #[tokio::test]
    async fn meta_of_1025_bytes_too_long() {
        let mut raw = b"20 ".to_vec();
        raw.extend(std::iter::repeat(b'a').take(1025));
        raw.extend_from_slice(b"\r\n");
        let raw: &'static [u8] = Box::leak(raw.into_boxed_slice());
        assert!(matches!(decode(raw).await, Err(GeminiError::MetaTooLong(1025))));
    }

    #[tokio::test]
    async fn meta_of_1024_bytes_accepted() {
        let mut raw = b"20 ".to_vec();
        raw.extend(std::iter::repeat(b'a').take(1024));
        raw.extend_from_slice(b"\r\nbody");
        let raw: &'static [u8] = Box::leak(raw.into_boxed_slice());
        let mut r = decode(raw).await.unwrap();
        assert_eq!(r.meta().len(), 1024);
        assert_eq!(r.read_body().await.unwrap(), b"body");
    }

    #[tokio::test]
    async fn unterminated_long_line_too_long() {
        let mut raw = b"20 ".to_vec();
        raw.extend(std::iter::repeat(b'x').take(4000));
        let raw: &'static [u8] = Box::leak(raw.into_boxed_slice());
        assert!(matches!(decode(raw).await, Err(GeminiError::MetaTooLong(_))));
    }

    #[tokio::test]
    async fn long_multibyte_meta_too_long() {
        let mut raw = b"20 ".to_vec();
        for _ in 0..600 {
            raw.extend_from_slice("é".as_bytes());
        }
        raw.extend_from_slice(b"\r\n");
        let raw: &'static [u8] = Box::leak(raw.into_boxed_slice());
        match decode(raw).await {
            Err(GeminiError::MetaTooLong(n)) => assert!(n > MAX_META_LEN, "{}", n),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn invalid_utf8_header_malformed() {
        assert!(matches!(
            decode(b"20 text/\xff\xfe\r\n").await,
            Err(GeminiError::MalformedHeader(_))
        ));
    }

    #[tokio::test]
    async fn close_releases_body() {
        let mut r = decode(b"20 text/plain\r\nhello").await.unwrap();
        assert!(r.has_body());
        r.close();
        assert!(!r.has_body());
        assert!(matches!(r.read_body().await, Err(GeminiError::NoBody)));
        r.close();
        assert!(!r.has_body());
    }

    #[tokio::test]
    async fn close_without_body_is_noop() {
        let mut r = decode(b"51 not found\r\n").await.unwrap();
        r.close();
        assert_eq!(r.status(), StatusCode::NOT_FOUND);
        assert_eq!(r.meta(), "not found");
        assert!(!r.has_body());
        assert!(matches!(r.read_body().await, Err(GeminiError::NoBody)));
    }

    #[tokio::test]
    async fn one_digit_status_malformed() {
        match decode(b"9 x\r\n").await {
            Err(GeminiError::MalformedHeader(msg)) => assert!(msg.contains("\"9\"")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn eof_before_newline_malformed() {
        assert!(matches!(decode(b"20 text/gemini").await, Err(GeminiError::MalformedHeader(_))));
        assert!(matches!(decode(b"").await, Err(GeminiError::MalformedHeader(_))));
    }

    #[test]
    fn bad_status_tokens() {
        for line in ["2x ok", "100 big", "09 low", "70 high", "ab", " 20 lead"] {
            assert!(
                matches!(parse_header(line), Err(GeminiError::MalformedHeader(_))),
                "{}",
                line
            );
        }
    }

    #[test]
    fn no_space_is_status_only() {
        let (s, meta) = parse_header("20\r\n").unwrap();
        assert_eq!(s, StatusCode::SUCCESS);
        assert_eq!(meta, "");
    }

    #[test]
    fn bare_lf_and_extra_spaces() {
        let (s, meta) = parse_header("30 gemini://example.com/ x\n").unwrap();
        assert!(s.is_redirect());
        assert_eq!(meta, "gemini://example.com/ x");
        let (_, meta) = parse_header("44  5\r\n").unwrap();
        assert_eq!(meta, " 5");
    }

    #[tokio::test]
    async fn mime_type_strips_parameters() {
        let r = decode(b"20 text/plain; charset=utf-8\r\n").await.unwrap();
        assert_eq!(r.mime_type(), "text/plain");
        assert!(!r.is_gemtext());
        let r = decode(b"20 \r\n").await.unwrap();
        assert_eq!(r.mime_type(), "");
        assert!(r.is_gemtext());
    }
}
