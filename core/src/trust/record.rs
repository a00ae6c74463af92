/*
 * record.rs
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

//! Known host records and certificate fingerprints.

use std::collections::HashMap;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio_rustls::rustls::pki_types::CertificateDer;
use x509_parser::parse_x509_certificate;

/// Version written to new known hosts files.
pub const KNOWN_HOSTS_VERSION: &str = "1.0";

/// How long an acceptance decision stays valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustLevel {
    Permanent,
    Session,
    Once,
}

/// What we remember about one host's certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateRecord {
    /// Lowercase hex SHA-256 of the DER certificate.
    pub fingerprint: String,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub trust: TrustLevel,
    #[serde(default)]
    pub not_after: Option<DateTime<Utc>>,
    #[serde(default)]
    pub subject: String,
}

impl CertificateRecord {
    /// Candidate record for a certificate seen now. Trust starts as Permanent; the policy decides.
    pub fn from_certificate(cert: &CertificateDer<'_>, now: DateTime<Utc>) -> Self {
        let (subject, not_after) = certificate_details(cert.as_ref());
        Self {
            fingerprint: fingerprint(cert.as_ref()),
            first_seen: now,
            last_seen: now,
            trust: TrustLevel::Permanent,
            not_after,
            subject,
        }
    }

    /// True if the certificate's validity period has ended at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.not_after.map(|t| t < now).unwrap_or(false)
    }
}

/// Persisted form: `{ "version": "1.0", "hosts": { hostname: record } }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownHosts {
    pub version: String,
    #[serde(default)]
    pub hosts: HashMap<String, CertificateRecord>,
}

impl Default for KnownHosts {
    fn default() -> Self {
        Self {
            version: KNOWN_HOSTS_VERSION.to_string(),
            hosts: HashMap::new(),
        }
    }
}

/// SHA-256 over the raw DER bytes, lowercase hex.
pub fn fingerprint(der: &[u8]) -> String {
    bytes_to_hex(&Sha256::digest(der))
}

fn bytes_to_hex(b: &[u8]) -> String {
    const HEX: &[u8] = b"0123456789abcdef";
    let mut s = String::with_capacity(b.len() * 2);
    for &x in b {
        s.push(HEX[(x >> 4) as usize] as char);
        s.push(HEX[(x & 15) as usize] as char);
    }
    s
}

/// Subject and notAfter, or empty/None when the certificate does not parse.
fn certificate_details(der: &[u8]) -> (String, Option<DateTime<Utc>>) {
    match parse_x509_certificate(der) {
        Ok((_, cert)) => {
            let not_after = Utc
                .timestamp_opt(cert.validity().not_after.timestamp(), 0)
                .single();
            (cert.subject().to_string(), not_after)
        }
        Err(_) => (String::new(), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_sha256_hex() {
        // SHA-256("abc")
        assert_eq!(
            fingerprint(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn unparsable_certificate_still_recorded() {
        let now = Utc::now();
        let cert = CertificateDer::from(vec![1u8, 2, 3]);
        let r = CertificateRecord::from_certificate(&cert, now);
        assert_eq!(r.fingerprint.len(), 64);
        assert_eq!(r.subject, "");
        assert_eq!(r.not_after, None);
        assert_eq!(r.first_seen, now);
        assert!(!r.is_expired(now));
    }

    #[test]
    fn real_certificate_details() {
        let key = rcgen::KeyPair::generate().unwrap();
        let mut params = rcgen::CertificateParams::new(vec!["example.com".to_string()]).unwrap();
        params
            .distinguished_name
            .push(rcgen::DnType::CommonName, "example.com");
        let cert = params.self_signed(&key).unwrap();
        let r = CertificateRecord::from_certificate(cert.der(), Utc::now());
        assert!(r.subject.contains("example.com"), "{}", r.subject);
        assert!(r.not_after.is_some());
        assert_eq!(r.fingerprint, fingerprint(cert.der().as_ref()));
    }

    #[test]
    fn trust_level_serialized_lowercase() {
        assert_eq!(serde_json::to_string(&TrustLevel::Session).unwrap(), "\"session\"");
        let t: TrustLevel = serde_json::from_str("\"once\"").unwrap();
        assert_eq!(t, TrustLevel::Once);
    }
}
