/*
 * uri.rs
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

//! Gemini URLs: gemini://host[:port]/path[?query]. Port defaults to 1965.
//! Redirect targets may be absolute or relative to the URL that was requested.
//! Input answers (status 1x) are sent back percent-encoded as the whole query.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use url::{Host, Url};

use crate::config::DEFAULT_PORT;
use crate::error::{GeminiError, Result};

/// The only scheme this client speaks.
pub const GEMINI_SCHEME: &str = "gemini";

/// Query set: encode everything except RFC 3986 unreserved characters, so spaces become %20.
const QUERY: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

fn invalid(url: &str, reason: impl Into<String>) -> GeminiError {
    GeminiError::InvalidUrl {
        url: url.to_string(),
        reason: reason.into(),
    }
}

/// Parse a URL and check that it is a gemini URL with a host.
pub fn parse_gemini_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| invalid(raw, e.to_string()))?;
    check_gemini_url(&url)?;
    Ok(url)
}

/// Scheme must be gemini and the authority must name a host.
pub fn check_gemini_url(url: &Url) -> Result<()> {
    if url.scheme() != GEMINI_SCHEME {
        return Err(GeminiError::UnsupportedScheme(url.scheme().to_string()));
    }
    match url.host() {
        Some(Host::Domain(d)) if d.is_empty() => Err(invalid(url.as_str(), "empty host")),
        Some(_) => Ok(()),
        None => Err(invalid(url.as_str(), "missing host")),
    }
}

/// Host (without brackets for IPv6) and port, defaulting to 1965.
/// The host string is also the key used by the trust store.
pub fn host_and_port(url: &Url) -> Result<(String, u16)> {
    let host = match url.host() {
        Some(Host::Domain(d)) if !d.is_empty() => d.to_ascii_lowercase(),
        Some(Host::Ipv4(addr)) => addr.to_string(),
        Some(Host::Ipv6(addr)) => addr.to_string(),
        _ => return Err(invalid(url.as_str(), "missing host")),
    };
    Ok((host, url.port().unwrap_or(DEFAULT_PORT)))
}

/// Resolve a redirect target (the meta of a 3x response) against the URL just requested.
pub fn resolve_redirect(base: &Url, target: &str) -> Result<Url> {
    base.join(target.trim())
        .map_err(|e| invalid(target, format!("invalid redirect URL: {}", e)))
}

/// Percent-encode user input for use as a query string.
pub fn encode_query(input: &str) -> String {
    utf8_percent_encode(input, QUERY).to_string()
}

/// URL for answering an input prompt: same URL with the query replaced by the encoded input.
pub fn with_query(url: &Url, input: &str) -> Url {
    let mut out = url.clone();
    out.set_fragment(None);
    out.set_query(Some(&encode_query(input)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_port() {
        let u = parse_gemini_url("gemini://example.com/index.gmi").unwrap();
        assert_eq!(host_and_port(&u).unwrap(), ("example.com".to_string(), 1965));
    }

    #[test]
    fn explicit_port_and_case() {
        let u = parse_gemini_url("gemini://Example.COM:1966/").unwrap();
        assert_eq!(host_and_port(&u).unwrap(), ("example.com".to_string(), 1966));
    }

    #[test]
    fn ipv6_host_without_brackets() {
        let u = parse_gemini_url("gemini://[::1]:1965/").unwrap();
        assert_eq!(host_and_port(&u).unwrap().0, "::1");
    }

    #[test]
    fn other_scheme_rejected() {
        match parse_gemini_url("https://example.com/") {
            Err(GeminiError::UnsupportedScheme(s)) => assert_eq!(s, "https"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn garbage_is_invalid() {
        assert!(matches!(
            parse_gemini_url("not a url"),
            Err(GeminiError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn relative_and_absolute_redirects() {
        let base = parse_gemini_url("gemini://example.com/a/b.gmi").unwrap();
        assert_eq!(
            resolve_redirect(&base, "c.gmi").unwrap().as_str(),
            "gemini://example.com/a/c.gmi"
        );
        assert_eq!(
            resolve_redirect(&base, "/root").unwrap().as_str(),
            "gemini://example.com/root"
        );
        assert_eq!(
            resolve_redirect(&base, "gemini://other.org/x").unwrap().as_str(),
            "gemini://other.org/x"
        );
    }

    #[test]
    fn query_encodes_spaces_and_reserved() {
        let base = parse_gemini_url("gemini://example.com/search?old#frag").unwrap();
        let u = with_query(&base, "rust & tls?");
        assert_eq!(u.as_str(), "gemini://example.com/search?rust%20%26%20tls%3F");
    }
}
