/*
 * error.rs
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

//! Protocol and trust errors.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors from the Gemini client, the response decoder, or the trust store.
#[derive(Debug, Error)]
pub enum GeminiError {
    /// URL could not be parsed, or has no host.
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("unsupported URL scheme: {0} (expected gemini)")]
    UnsupportedScheme(String),

    /// TCP connect, TLS handshake, or header read failed or timed out.
    #[error("failed to connect to {host}: {source}")]
    ConnectFailure {
        host: String,
        #[source]
        source: io::Error,
    },

    #[error("no peer certificates")]
    NoPeerCertificate,

    #[error("certificate for {host} rejected: {reason}")]
    CertificateRejected { host: String, reason: RejectReason },

    /// Status token is not two digits in 10..=69, or the header line is unusable.
    #[error("malformed response header: {0}")]
    MalformedHeader(String),

    #[error("meta string too long: {0} bytes (max 1024)")]
    MetaTooLong(usize),

    #[error("no response body")]
    NoBody,

    #[error("too many redirects (max {0})")]
    TooManyRedirects(usize),

    #[error("redirect without URL")]
    RedirectMissingUrl,

    /// Writing or creating the trust-store file failed.
    #[error("failed to persist known hosts to {path}: {source}")]
    PersistenceFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The trust-store file exists but is not a valid known-hosts document.
    #[error("malformed known hosts file {path}: {source}")]
    MalformedTrustStore {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Request write or body read failed after the connection was established.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Which trust transition refused the certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// First certificate seen for the host was refused.
    FirstSeen,
    /// Host presented a different certificate than the stored one.
    Changed,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::FirstSeen => write!(f, "certificate rejected by user"),
            RejectReason::Changed => write!(f, "certificate changed and was rejected"),
        }
    }
}

pub type Result<T> = std::result::Result<T, GeminiError>;

impl GeminiError {
    /// True for errors raised by the trust decision rather than by the network or the server.
    pub fn is_trust_failure(&self) -> bool {
        matches!(
            self,
            GeminiError::NoPeerCertificate | GeminiError::CertificateRejected { .. }
        )
    }
}
